use super::{
    CalibrationModel,
    PREDICTION_CONFIDENCE,
};
use crate::errors::{
    ChromaError,
    Result,
};
use crate::models::Peak;
use serde::{
    Deserialize,
    Serialize,
};
use tracing::warn;

/// A ladder peak with its known molecular weight.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MwStandard {
    pub position: f64,
    pub molecular_weight: f64,
}

/// Molecular weight at a position, with its 95% prediction interval.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MwEstimate {
    pub position: f64,
    pub estimated_mw: f64,
    /// Half the width of `[lower, upper]`. `None` for a two point calibration.
    pub uncertainty: Option<f64>,
    pub lower: Option<f64>,
    pub upper: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CalibrationSummary {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
}

/// `ln(MW) = slope * position + intercept`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MwCalibration {
    model: CalibrationModel,
}

impl MwCalibration {
    /// Fits the log-linear calibration.
    ///
    /// Standards with a missing (non-finite) or non-positive molecular weight
    /// are dropped before fitting. Fewer than two remaining standards, or
    /// standards that all share a position, fail with `InsufficientData`.
    ///
    /// # Example
    ///
    /// ```
    /// use chromaseek::calibration::{MwCalibration, MwStandard};
    ///
    /// let standards: Vec<MwStandard> = [(1.0, 3.0f64), (2.0, 5.0), (4.0, 9.0)]
    ///     .iter()
    ///     .map(|&(position, ln_mw)| MwStandard {
    ///         position,
    ///         molecular_weight: ln_mw.exp(),
    ///     })
    ///     .collect();
    /// let calibration = MwCalibration::fit(&standards).unwrap();
    /// assert!((calibration.slope() - 2.0).abs() < 1e-9);
    /// assert!((calibration.estimate_mw(3.0) - 7f64.exp()).abs() < 1e-6);
    /// ```
    pub fn fit(standards: &[MwStandard]) -> Result<Self> {
        let points: Vec<(f64, f64)> = standards
            .iter()
            .filter(|s| s.molecular_weight.is_finite() && s.molecular_weight > 0.0)
            .map(|s| (s.position, s.molecular_weight.ln()))
            .collect();
        let model = CalibrationModel::fit(&points)
            .map_err(|e| e.append_to_context(" (molecular weight standards)"))?;
        Ok(Self { model })
    }

    pub fn from_model(model: CalibrationModel) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &CalibrationModel {
        &self.model
    }

    pub fn slope(&self) -> f64 {
        self.model.slope
    }

    pub fn intercept(&self) -> f64 {
        self.model.intercept
    }

    pub fn r_squared(&self) -> f64 {
        self.model.r_squared
    }

    pub fn summary(&self) -> CalibrationSummary {
        CalibrationSummary {
            slope: self.model.slope,
            intercept: self.model.intercept,
            r_squared: self.model.r_squared,
        }
    }

    pub fn estimate_mw(&self, position: f64) -> f64 {
        self.model.predict(position).exp()
    }

    pub fn estimate(&self, position: f64) -> MwEstimate {
        let log_mw = self.model.predict(position);
        let estimated_mw = log_mw.exp();
        match self
            .model
            .prediction_half_width(position, PREDICTION_CONFIDENCE)
        {
            Ok(half_width) => {
                let lower = (log_mw - half_width).exp();
                let upper = (log_mw + half_width).exp();
                MwEstimate {
                    position,
                    estimated_mw,
                    uncertainty: Some((upper - lower) / 2.0),
                    lower: Some(lower),
                    upper: Some(upper),
                }
            }
            Err(_) => MwEstimate {
                position,
                estimated_mw,
                uncertainty: None,
                lower: None,
                upper: None,
            },
        }
    }

    /// Copies of `peaks` with `estimated_mw` filled in.
    pub fn annotate(&self, peaks: &[Peak]) -> Vec<Peak> {
        peaks
            .iter()
            .map(|p| p.with_estimated_mw(self.estimate_mw(p.position)))
            .collect()
    }
}

/// Pairs the peaks found in a ladder run with the ladder's known molecular
/// weights, both in elution order.
///
/// Surplus peaks or weights are ignored (with a warning). Fails when nothing
/// can be paired.
pub fn pair_standards(peaks: &[Peak], molecular_weights: &[f64]) -> Result<Vec<MwStandard>> {
    if peaks.len() != molecular_weights.len() {
        warn!(
            "Found {} ladder peaks for {} molecular weights, pairing in order",
            peaks.len(),
            molecular_weights.len()
        );
    }
    let mut positions: Vec<f64> = peaks.iter().map(|p| p.position).collect();
    positions.sort_by(f64::total_cmp);

    let out: Vec<MwStandard> = positions
        .into_iter()
        .zip(molecular_weights.iter())
        .map(|(position, &molecular_weight)| MwStandard {
            position,
            molecular_weight,
        })
        .collect();
    if out.is_empty() {
        return Err(ChromaError::insufficient_data(
            0,
            CalibrationModel::MIN_POINTS,
            "no ladder peak could be paired with a molecular weight",
        ));
    }
    Ok(out)
}
