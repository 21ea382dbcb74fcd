//! Isoelectric point (pI) calibration for cIEF runs.
//!
//! pI markers are spiked into every injection, so the calibration is fit
//! per trace from the earliest and latest resolved peaks.

use super::CalibrationModel;
use super::mw::CalibrationSummary;
use crate::errors::{
    ChromaError,
    Result,
};
use crate::models::Peak;
use serde::{
    Deserialize,
    Serialize,
};

/// pI of the usual marker kit, in elution order.
pub const DEFAULT_PI_MARKERS: [f64; 4] = [10.0, 9.5, 5.5, 4.0];

/// A resolved peak assigned to a marker pI.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PiMarker {
    /// Apex index of the marker peak.
    pub index: usize,
    pub position: f64,
    pub pi: f64,
}

/// Picks the marker peaks among `peaks`.
///
/// Only peaks after `baseline_cutoff` are considered. The first half of
/// `pi_values` (rounded up) goes to the earliest peaks, the rest to the
/// latest ones, both in elution order.
pub fn select_pi_markers(
    peaks: &[Peak],
    baseline_cutoff: f64,
    pi_values: &[f64],
) -> Result<Vec<PiMarker>> {
    let mut candidates: Vec<&Peak> = peaks
        .iter()
        .filter(|p| p.position > baseline_cutoff)
        .collect();
    if candidates.len() < pi_values.len() {
        return Err(ChromaError::insufficient_data(
            candidates.len(),
            pi_values.len(),
            format!("pI marker peaks after {}", baseline_cutoff),
        ));
    }
    candidates.sort_by(|a, b| a.position.total_cmp(&b.position));

    let front = pi_values.len().div_ceil(2);
    let back = pi_values.len() - front;
    let chosen = candidates[..front]
        .iter()
        .chain(candidates[candidates.len() - back..].iter());

    Ok(chosen
        .zip(pi_values.iter())
        .map(|(peak, &pi)| PiMarker {
            index: peak.index,
            position: peak.position,
            pi,
        })
        .collect())
}

/// `pI = slope * position + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiCalibration {
    model: CalibrationModel,
    markers: Vec<PiMarker>,
}

impl PiCalibration {
    pub fn fit(markers: &[PiMarker]) -> Result<Self> {
        let points: Vec<(f64, f64)> = markers.iter().map(|m| (m.position, m.pi)).collect();
        let model =
            CalibrationModel::fit(&points).map_err(|e| e.append_to_context(" (pI markers)"))?;
        Ok(Self {
            model,
            markers: markers.to_vec(),
        })
    }

    /// Selects the markers with [`select_pi_markers`] and fits on them.
    pub fn from_peaks(peaks: &[Peak], baseline_cutoff: f64, pi_values: &[f64]) -> Result<Self> {
        let markers = select_pi_markers(peaks, baseline_cutoff, pi_values)?;
        Self::fit(&markers)
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn markers(&self) -> &[PiMarker] {
        &self.markers
    }

    pub fn is_marker(&self, peak: &Peak) -> bool {
        self.markers.iter().any(|m| m.index == peak.index)
    }

    pub fn summary(&self) -> CalibrationSummary {
        CalibrationSummary {
            slope: self.model.slope,
            intercept: self.model.intercept,
            r_squared: self.model.r_squared,
        }
    }

    pub fn estimate_pi(&self, position: f64) -> f64 {
        self.model.predict(position)
    }

    /// Copies of `peaks` with `estimated_pi` filled in.
    pub fn annotate(&self, peaks: &[Peak]) -> Vec<Peak> {
        peaks
            .iter()
            .map(|p| p.with_estimated_pi(self.estimate_pi(p.position)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peak::test_utils::mock_peak;

    fn run_with_markers() -> Vec<Peak> {
        // Two front markers, two sample species, two back markers
        [0.5, 2.0, 3.0, 6.0, 7.0, 12.0, 13.0]
            .iter()
            .enumerate()
            .map(|(i, &pos)| mock_peak(i * 10, pos, 10.0, 10.0))
            .collect()
    }

    #[test]
    fn test_markers_are_first_two_and_last_two() {
        let markers = select_pi_markers(&run_with_markers(), 1.0, &DEFAULT_PI_MARKERS).unwrap();
        let positions: Vec<f64> = markers.iter().map(|m| m.position).collect();
        assert_eq!(positions, vec![2.0, 3.0, 12.0, 13.0]);
        let pis: Vec<f64> = markers.iter().map(|m| m.pi).collect();
        assert_eq!(pis, DEFAULT_PI_MARKERS.to_vec());
    }

    #[test]
    fn test_too_few_peaks_after_cutoff() {
        let peaks = run_with_markers();
        let err = select_pi_markers(&peaks, 6.5, &DEFAULT_PI_MARKERS).unwrap_err();
        assert!(matches!(
            err,
            ChromaError::InsufficientData {
                real: 3,
                expected: 4,
                ..
            }
        ));
    }

    #[test]
    fn test_fit_and_annotate() {
        let peaks = run_with_markers();
        let calibration = PiCalibration::from_peaks(&peaks, 1.0, &DEFAULT_PI_MARKERS).unwrap();
        // pI falls as the position grows
        assert!(calibration.summary().slope < 0.0);
        assert_eq!(calibration.markers().len(), 4);

        let annotated = calibration.annotate(&peaks);
        let species: Vec<&Peak> = annotated.iter().filter(|p| !calibration.is_marker(p)).collect();
        assert_eq!(species.len(), 3);
        let pi_6 = species[1].estimated_pi.unwrap();
        let pi_7 = species[2].estimated_pi.unwrap();
        assert!(pi_6 > pi_7);
        assert!(pi_6 < 9.5 && pi_7 > 4.0);
    }

    #[test]
    fn test_exact_markers_round_trip() {
        let markers: Vec<PiMarker> = [(1.0, 10.0), (2.0, 9.0), (5.0, 6.0), (6.0, 5.0)]
            .iter()
            .enumerate()
            .map(|(index, &(position, pi))| PiMarker {
                index,
                position,
                pi,
            })
            .collect();
        let calibration = PiCalibration::fit(&markers).unwrap();
        assert!((calibration.summary().slope + 1.0).abs() < 1e-12);
        assert!((calibration.estimate_pi(3.5) - 7.5).abs() < 1e-12);
    }
}
