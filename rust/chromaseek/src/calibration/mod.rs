//! Ordinary least squares calibration and its prediction intervals.
//!
//! The same straight line fit backs every calibration: retention position vs
//! log(molecular weight) (see [`mw`]), position vs isoelectric point (see
//! [`pi`]) and response area vs concentration (see [`standard_curve`]).

pub mod mw;
pub mod pi;
pub mod standard_curve;

use crate::errors::{
    ChromaError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};
use statrs::distribution::{
    ContinuousCDF,
    StudentsT,
};

pub use mw::{
    CalibrationSummary,
    MwCalibration,
    MwEstimate,
    MwStandard,
    pair_standards,
};
pub use pi::{
    DEFAULT_PI_MARKERS,
    PiCalibration,
    PiMarker,
    select_pi_markers,
};
pub use standard_curve::{
    Quantitation,
    StandardCurve,
    StandardPoint,
};

/// Confidence level used for every prediction interval.
pub const PREDICTION_CONFIDENCE: f64 = 0.95;

/// `y = slope * x + intercept`, plus what is needed for prediction
/// intervals.
///
/// Immutable once fit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationModel {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Residual standard error, `sqrt(SSR / (n - 2))`. Zero for a 2 point fit.
    pub standard_error: f64,
    pub degrees_of_freedom: usize,
    pub mean_x: f64,
    /// Sum of squared deviations of x from its mean (Sxx).
    pub sum_sq_x: f64,
    pub n: usize,
}

impl CalibrationModel {
    pub const MIN_POINTS: usize = 2;

    /// Fits `y` on `x`. Non-finite pairs are ignored.
    ///
    /// Fails with `InsufficientData` with fewer than two usable points or
    /// when all x values coincide.
    pub fn fit(points: &[(f64, f64)]) -> Result<Self> {
        let pts: Vec<(f64, f64)> = points
            .iter()
            .copied()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect();
        let n = pts.len();
        if n < Self::MIN_POINTS {
            return Err(ChromaError::insufficient_data(
                n,
                Self::MIN_POINTS,
                "calibration points",
            ));
        }

        let nf = n as f64;
        let mean_x = pts.iter().map(|(x, _)| x).sum::<f64>() / nf;
        let mean_y = pts.iter().map(|(_, y)| y).sum::<f64>() / nf;
        let sum_sq_x: f64 = pts.iter().map(|(x, _)| (x - mean_x).powi(2)).sum();
        let sum_xy: f64 = pts
            .iter()
            .map(|(x, y)| (x - mean_x) * (y - mean_y))
            .sum();
        let sum_sq_y: f64 = pts.iter().map(|(_, y)| (y - mean_y).powi(2)).sum();

        let scale = pts.iter().map(|(x, _)| x.abs()).fold(1.0, f64::max);
        if sum_sq_x <= f64::EPSILON * scale * scale * nf {
            return Err(ChromaError::insufficient_data(
                1,
                Self::MIN_POINTS,
                "calibration positions are all identical, the fit is ill-conditioned",
            ));
        }

        let slope = sum_xy / sum_sq_x;
        let intercept = mean_y - slope * mean_x;

        let ssr: f64 = pts
            .iter()
            .map(|(x, y)| (y - (slope * x + intercept)).powi(2))
            .sum();
        let r_squared = if sum_sq_y > 0.0 {
            (1.0 - ssr / sum_sq_y).clamp(0.0, 1.0)
        } else {
            // Flat response, a perfect (horizontal) fit
            1.0
        };

        let degrees_of_freedom = n - 2;
        let standard_error = if degrees_of_freedom > 0 {
            (ssr / degrees_of_freedom as f64).sqrt()
        } else {
            0.0
        };

        Ok(Self {
            slope,
            intercept,
            r_squared,
            standard_error,
            degrees_of_freedom,
            mean_x,
            sum_sq_x,
            n,
        })
    }

    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// `x` such that `predict(x) == y`.
    pub fn inverse_predict(&self, y: f64) -> Result<f64> {
        if self.slope == 0.0 {
            return Err(ChromaError::insufficient_data(
                0,
                1,
                "calibration slope is zero, it cannot be inverted",
            ));
        }
        Ok((y - self.intercept) / self.slope)
    }

    /// Half width of the prediction interval of a new observation at `x`:
    /// `t * s * sqrt(1 + 1/n + (x - mean_x)^2 / Sxx)`.
    pub fn prediction_half_width(&self, x: f64, confidence: f64) -> Result<f64> {
        if self.degrees_of_freedom < 1 {
            return Err(ChromaError::insufficient_data(
                self.n,
                3,
                "prediction intervals need at least one residual degree of freedom",
            ));
        }
        if !(confidence > 0.0 && confidence < 1.0) {
            return Err(ChromaError::invalid_parameter(
                "confidence",
                format!("must be within (0, 1), got {}", confidence),
            ));
        }
        let t = t_critical(confidence, self.degrees_of_freedom)?;
        let leverage = 1.0 + 1.0 / self.n as f64 + (x - self.mean_x).powi(2) / self.sum_sq_x;
        Ok(t * self.standard_error * leverage.sqrt())
    }

    /// Uncertainty of [`CalibrationModel::inverse_predict`] at `y`: the
    /// prediction half width at the inverted `x`, divided by `|slope|` to move
    /// it to x units.
    pub fn inverse_uncertainty(&self, y: f64, confidence: f64) -> Result<f64> {
        let x = self.inverse_predict(y)?;
        Ok(self.prediction_half_width(x, confidence)? / self.slope.abs())
    }
}

/// Two-sided critical value of the Student-t distribution.
fn t_critical(confidence: f64, degrees_of_freedom: usize) -> Result<f64> {
    let dist = StudentsT::new(0.0, 1.0, degrees_of_freedom as f64)
        .map_err(|e| ChromaError::invalid_parameter("degrees_of_freedom", e))?;
    Ok(dist.inverse_cdf(0.5 + confidence / 2.0))
}
