//! Savitzky-Golay smoothing.
//!
//! Every output point is the value, at that point, of a polynomial fit by
//! least squares over a window of `window` samples centered on it.
//! Near the edges (where the window would fall off the trace) the polynomial
//! fit over the first/last full window is evaluated instead, so the output
//! has the same length as the input and polynomials of degree <= `polynomial`
//! are reproduced exactly everywhere.

use crate::errors::{
    ChromaError,
    Result,
};
use crate::models::Trace;
use crate::utils::math::solve_linear_system;

/// Pre-computed Savitzky-Golay convolution weights.
#[derive(Debug, Clone, PartialEq)]
pub struct SavitzkyGolay {
    window: usize,
    polynomial: usize,
    /// Weights for the center of the window.
    center: Vec<f64>,
    /// Weights for the first `window / 2` points, applied to the first window.
    leading: Vec<Vec<f64>>,
    /// Weights for the last `window / 2` points, applied to the last window.
    trailing: Vec<Vec<f64>>,
}

impl SavitzkyGolay {
    pub const MIN_WINDOW: usize = 3;
    pub const DEFAULT_WINDOW: usize = 11;
    pub const DEFAULT_POLYNOMIAL: usize = 3;

    pub fn try_new(window: usize, polynomial: usize) -> Result<Self> {
        if window < Self::MIN_WINDOW {
            return Err(ChromaError::invalid_parameter(
                "smoothing.window",
                format!("window must be >= {}, got {}", Self::MIN_WINDOW, window),
            ));
        }
        if window % 2 == 0 {
            return Err(ChromaError::invalid_parameter(
                "smoothing.window",
                format!("window must be odd, got {}", window),
            ));
        }
        if polynomial >= window {
            return Err(ChromaError::invalid_parameter(
                "smoothing.polynomial",
                format!(
                    "polynomial order ({}) must be smaller than the window ({})",
                    polynomial, window
                ),
            ));
        }

        let half = window / 2;
        let center = fit_weights(window, polynomial, 0.0)?;
        let leading = (0..half)
            .map(|i| fit_weights(window, polynomial, i as f64 - half as f64))
            .collect::<Result<Vec<_>>>()?;
        let trailing = (0..half)
            .map(|i| fit_weights(window, polynomial, (i + 1) as f64))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            window,
            polynomial,
            center,
            leading,
            trailing,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn polynomial(&self) -> usize {
        self.polynomial
    }

    pub fn smooth_values(&self, data: &[f64]) -> Result<Vec<f64>> {
        if data.len() < self.window {
            return Err(ChromaError::insufficient_data(
                data.len(),
                self.window,
                "trace shorter than the smoothing window",
            ));
        }

        let half = self.window / 2;
        let n = data.len();
        let mut out = Vec::with_capacity(n);

        let first_window = &data[..self.window];
        for weights in self.leading.iter() {
            out.push(dot(weights, first_window));
        }
        for start in 0..=(n - self.window) {
            out.push(dot(&self.center, &data[start..start + self.window]));
        }
        let last_window = &data[n - self.window..];
        for weights in self.trailing.iter() {
            out.push(dot(weights, last_window));
        }

        debug_assert_eq!(out.len(), n);
        debug_assert_eq!(self.leading.len(), half);
        Ok(out)
    }

    /// New trace with the same positions and the smoothed signal.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn smooth(&self, trace: &Trace) -> Result<Trace> {
        let smoothed = self.smooth_values(trace.signal())?;
        Ok(trace.with_signal(smoothed))
    }
}

/// Convenience wrapper, builds the filter and applies it once.
pub fn smooth(trace: &Trace, window: usize, polynomial: usize) -> Result<Trace> {
    SavitzkyGolay::try_new(window, polynomial)?.smooth(trace)
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Weights `w` such that `sum(w_j * y_j)` is the least squares polynomial
/// evaluated at `t`, with the window samples sitting at `j - window / 2`.
///
/// For the design matrix `A` (`A_jk = x_j^k`) the fitted value at `t` is
/// `tvec' (A'A)^-1 A' y`, so `w = A (A'A)^-1 tvec`.
fn fit_weights(window: usize, polynomial: usize, t: f64) -> Result<Vec<f64>> {
    let half = (window / 2) as f64;
    let ncoef = polynomial + 1;
    let xs: Vec<f64> = (0..window).map(|j| j as f64 - half).collect();

    let mut normal = vec![vec![0.0; ncoef]; ncoef];
    for (r, row) in normal.iter_mut().enumerate() {
        for (c, val) in row.iter_mut().enumerate() {
            *val = xs.iter().map(|x| x.powi((r + c) as i32)).sum();
        }
    }
    let tvec: Vec<f64> = (0..ncoef).map(|k| t.powi(k as i32)).collect();

    let z = solve_linear_system(normal, tvec).ok_or_else(|| {
        ChromaError::invalid_parameter(
            "smoothing.polynomial",
            format!(
                "ill-conditioned fit for window {} and order {}",
                window, polynomial
            ),
        )
    })?;

    Ok(xs
        .iter()
        .map(|x| {
            z.iter()
                .enumerate()
                .map(|(k, zk)| x.powi(k as i32) * zk)
                .sum()
        })
        .collect())
}
