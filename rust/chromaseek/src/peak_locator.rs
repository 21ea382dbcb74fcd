//! Local maxima detection on a smoothed trace.
//!
//! Candidates are the local maxima of the signal (flat tops count once, at
//! their midpoint). They are then thinned so no two survivors are closer than
//! the minimum separation (taller one wins), and finally filtered on
//! topographic prominence.

use crate::errors::{
    ChromaError,
    Result,
};
use crate::models::Trace;
use serde::Serialize;
use std::cmp::Ordering;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PeakCandidate {
    pub index: usize,
    pub height: f64,
    pub prominence: f64,
}

/// Finds the candidate peaks of `trace`.
///
/// * `prominence`: minimum prominence, in signal units. Must be > 0.
/// * `min_separation`: minimum distance between returned peaks, in position
///   units. Converted into samples with the mean sampling interval.
///
/// The result is sorted by index. An empty result is not an error.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip(trace), level = "trace")
)]
pub fn locate_peaks(
    trace: &Trace,
    prominence: f64,
    min_separation: f64,
) -> Result<Vec<PeakCandidate>> {
    if !(prominence > 0.0 && prominence.is_finite()) {
        return Err(ChromaError::invalid_parameter(
            "peaks.prominence",
            format!("must be a positive number, got {}", prominence),
        ));
    }
    if !(min_separation >= 0.0 && min_separation.is_finite()) {
        return Err(ChromaError::invalid_parameter(
            "peaks.min_separation",
            format!("must be >= 0, got {}", min_separation),
        ));
    }

    let signal = trace.signal();
    let maxima = local_maxima(signal);
    if maxima.is_empty() {
        return Ok(Vec::new());
    }

    let distance = separation_in_samples(min_separation, trace.mean_interval()?);
    let kept = enforce_distance(signal, &maxima, distance);

    let out = kept
        .into_iter()
        .map(|index| PeakCandidate {
            index,
            height: signal[index],
            prominence: peak_prominence(signal, index),
        })
        .filter(|c| c.prominence >= prominence)
        .collect();
    Ok(out)
}

/// Keeps the `max_peaks` tallest candidates, returned in index order.
///
/// Height ties keep the earlier candidate.
pub fn select_tallest(mut candidates: Vec<PeakCandidate>, max_peaks: usize) -> Vec<PeakCandidate> {
    if candidates.len() <= max_peaks {
        return candidates;
    }
    candidates.sort_by(by_height_desc);
    candidates.truncate(max_peaks);
    candidates.sort_by_key(|c| c.index);
    candidates
}

fn by_height_desc(a: &PeakCandidate, b: &PeakCandidate) -> Ordering {
    b.height
        .total_cmp(&a.height)
        .then_with(|| a.index.cmp(&b.index))
}

/// Minimum number of samples between two peaks so that they are at least
/// `separation` position units apart on a uniform grid.
pub fn separation_in_samples(separation: f64, interval: f64) -> usize {
    if separation <= 0.0 || interval <= 0.0 {
        return 1;
    }
    let ratio = separation / interval;
    // 0.3 / 0.1 is 2.9999999999999996, that is 3 samples, not 4
    let rounded = ratio.round();
    let samples = if (ratio - rounded).abs() < 1e-9 {
        rounded
    } else {
        ratio.ceil()
    };
    (samples as usize).max(1)
}

/// Indices of local maxima. The first and last samples never qualify.
/// A plateau that rises on the left and falls on the right yields its
/// midpoint (rounded down).
fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let n = signal.len();
    let mut out = Vec::new();
    if n < 3 {
        return out;
    }

    let mut i = 1;
    while i < n - 1 {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < n - 1 && signal[ahead] == signal[i] {
                ahead += 1;
            }
            if signal[ahead] < signal[i] {
                out.push((i + ahead - 1) / 2);
                i = ahead;
                continue;
            }
        }
        i += 1;
    }
    out
}

/// Greedy thinning, tallest first. Every peak closer than `distance` samples
/// to an already kept one is dropped. Returns indices in ascending order.
fn enforce_distance(signal: &[f64], maxima: &[usize], distance: usize) -> Vec<usize> {
    if distance <= 1 {
        return maxima.to_vec();
    }

    let mut order: Vec<usize> = (0..maxima.len()).collect();
    order.sort_by(|&a, &b| {
        signal[maxima[b]]
            .total_cmp(&signal[maxima[a]])
            .then_with(|| maxima[a].cmp(&maxima[b]))
    });

    let mut keep = vec![true; maxima.len()];
    for &slot in order.iter() {
        if !keep[slot] {
            continue;
        }
        let center = maxima[slot];
        // maxima is sorted, so neighbours within reach are contiguous
        let mut k = slot;
        while k > 0 && center - maxima[k - 1] < distance {
            k -= 1;
            keep[k] = false;
        }
        let mut k = slot + 1;
        while k < maxima.len() && maxima[k] - center < distance {
            keep[k] = false;
            k += 1;
        }
    }

    maxima
        .iter()
        .zip(keep.iter())
        .filter_map(|(&idx, &k)| if k { Some(idx) } else { None })
        .collect()
}

/// Height of the peak above the higher of its two bases. Each base is the
/// minimum between the peak and the first strictly higher sample (or the
/// trace edge) on that side.
fn peak_prominence(signal: &[f64], index: usize) -> f64 {
    let height = signal[index];

    let mut left_min = height;
    for &val in signal[..index].iter().rev() {
        if val > height {
            break;
        }
        left_min = left_min.min(val);
    }

    let mut right_min = height;
    for &val in signal[index + 1..].iter() {
        if val > height {
            break;
        }
        right_min = right_min.min(val);
    }

    height - left_min.max(right_min)
}
