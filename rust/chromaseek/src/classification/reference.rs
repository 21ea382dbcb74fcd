//! SEC style classification relative to a main (reference) peak.

use super::nearest_to;
use crate::models::{
    Peak,
    PeakClass,
};

/// Index of the peak closest to `target`, earliest on ties.
pub fn select_main_peak(peaks: &[Peak], target: f64) -> Option<usize> {
    nearest_to(peaks, target)
}

/// Labels position-sorted `peaks` relative to the main peak.
///
/// Earlier peaks are HMW (aggregates elute first), later peaks up to and
/// including `lmw_cutoff` are LMW, later peaks past the cutoff are left
/// unclassified and excluded from the totals.
pub fn classify_reference_relative(
    peaks: &[Peak],
    main_peak_position: f64,
    lmw_cutoff: Option<f64>,
) -> Vec<PeakClass> {
    let Some(main) = select_main_peak(peaks, main_peak_position) else {
        return Vec::new();
    };
    let main_position = peaks[main].position;
    let cutoff = lmw_cutoff.unwrap_or(f64::INFINITY);

    peaks
        .iter()
        .enumerate()
        .map(|(i, peak)| {
            if i == main {
                PeakClass::Main
            } else if peak.position < main_position {
                PeakClass::Hmw
            } else if peak.position > main_position && peak.position <= cutoff {
                PeakClass::Lmw
            } else {
                PeakClass::Unclassified
            }
        })
        .collect()
}
