use crate::errors::{
    ChromaError,
    Result,
};
use serde::Serialize;

/// A single channel of a chromatographic/electrophoretic run.
///
/// Positions are retention times or volumes (whatever the instrument
/// reports), they are monotonically non-decreasing and finite.
/// The signal is usually absorbance.
///
/// Traces are immutable once built, anything that "changes" a trace
/// (smoothing, windowing) returns a new one.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Trace {
    positions: Vec<f64>,
    signal: Vec<f64>,
}

impl Trace {
    pub const MIN_LEN: usize = 2;

    pub fn try_new(positions: Vec<f64>, signal: Vec<f64>) -> Result<Self> {
        if positions.len() != signal.len() {
            return Err(ChromaError::invalid_trace(format!(
                "positions ({}) and signal ({}) have different lengths",
                positions.len(),
                signal.len()
            )));
        }
        if positions.len() < Self::MIN_LEN {
            return Err(ChromaError::insufficient_data(
                positions.len(),
                Self::MIN_LEN,
                "trace length",
            ));
        }
        if let Some(i) = positions.iter().position(|x| !x.is_finite()) {
            return Err(ChromaError::invalid_trace(format!(
                "non-finite position at index {}",
                i
            )));
        }
        if let Some(i) = signal.iter().position(|x| !x.is_finite()) {
            return Err(ChromaError::invalid_trace(format!(
                "non-finite signal at index {}",
                i
            )));
        }
        if let Some(i) = positions.windows(2).position(|w| w[1] < w[0]) {
            return Err(ChromaError::invalid_trace(format!(
                "positions decrease between index {} and {}",
                i,
                i + 1
            )));
        }

        Ok(Self { positions, signal })
    }

    /// Builds a trace from `(position, signal)` pairs.
    pub fn from_pairs(pairs: impl IntoIterator<Item = (f64, f64)>) -> Result<Self> {
        let (positions, signal): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        Self::try_new(positions, signal)
    }

    /// Same positions, different signal. Only used by the in-crate
    /// transformations that preserve length and finiteness.
    pub(crate) fn with_signal(&self, signal: Vec<f64>) -> Self {
        debug_assert_eq!(signal.len(), self.positions.len());
        Self {
            positions: self.positions.clone(),
            signal,
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn positions(&self) -> &[f64] {
        &self.positions
    }

    pub fn signal(&self) -> &[f64] {
        &self.signal
    }

    pub fn position(&self, idx: usize) -> f64 {
        self.positions[idx]
    }

    pub fn signal_at(&self, idx: usize) -> f64 {
        self.signal[idx]
    }

    pub fn first_position(&self) -> f64 {
        self.positions[0]
    }

    pub fn last_position(&self) -> f64 {
        self.positions[self.positions.len() - 1]
    }

    /// Average sampling interval, `(last - first) / (n - 1)`.
    ///
    /// Used to convert position-unit windows (separations, search windows)
    /// into sample counts. Fails if all positions are the same.
    pub fn mean_interval(&self) -> Result<f64> {
        let span = self.last_position() - self.first_position();
        if span <= 0.0 {
            return Err(ChromaError::invalid_trace(
                "zero position span, cannot derive a sampling interval",
            ));
        }
        Ok(span / (self.len() - 1) as f64)
    }

    /// Index of the maximum signal within `[low, high]` (inclusive, position units).
    ///
    /// Ties resolve to the earliest index.
    pub fn argmax_between(&self, low: f64, high: f64) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;
        for (i, (&pos, &val)) in self.positions.iter().zip(self.signal.iter()).enumerate() {
            if pos < low || pos > high {
                continue;
            }
            match best {
                Some((_, best_val)) if val <= best_val => {}
                _ => best = Some((i, val)),
            }
        }
        best.map(|(i, _)| i)
    }

    /// The part of the trace strictly after `position`.
    ///
    /// Returns `None` if fewer than [`Trace::MIN_LEN`] samples remain.
    pub fn after(&self, position: f64) -> Option<Trace> {
        let start = self.positions.partition_point(|&x| x <= position);
        if self.len() - start < Self::MIN_LEN {
            return None;
        }
        Some(Self {
            positions: self.positions[start..].to_vec(),
            signal: self.signal[start..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_bad_traces() {
        assert!(matches!(
            Trace::try_new(vec![0.0], vec![1.0]),
            Err(ChromaError::InsufficientData { .. })
        ));
        assert!(matches!(
            Trace::try_new(vec![0.0, 1.0], vec![1.0]),
            Err(ChromaError::InvalidTrace { .. })
        ));
        assert!(matches!(
            Trace::try_new(vec![0.0, f64::NAN], vec![1.0, 2.0]),
            Err(ChromaError::InvalidTrace { .. })
        ));
        assert!(matches!(
            Trace::try_new(vec![1.0, 0.5], vec![1.0, 2.0]),
            Err(ChromaError::InvalidTrace { .. })
        ));
    }

    #[test]
    fn test_mean_interval() {
        let trace = Trace::try_new(vec![0.0, 0.1, 0.3, 0.4], vec![0.0; 4]).unwrap();
        assert!((trace.mean_interval().unwrap() - 0.4 / 3.0).abs() < 1e-12);

        let flat = Trace::try_new(vec![1.0, 1.0], vec![0.0, 0.0]).unwrap();
        assert!(flat.mean_interval().is_err());
    }

    #[test]
    fn test_after_and_argmax() {
        let trace = Trace::from_pairs((0..10).map(|i| (i as f64, (i % 4) as f64))).unwrap();
        let tail = trace.after(6.0).unwrap();
        assert_eq!(tail.positions(), &[7.0, 8.0, 9.0]);
        assert!(trace.after(8.0).is_none());

        // 3.0 and 7.0 both have signal 3, earliest wins
        assert_eq!(trace.argmax_between(0.0, 9.0), Some(3));
        assert_eq!(trace.argmax_between(4.0, 9.0), Some(7));
        assert_eq!(trace.argmax_between(20.0, 30.0), None);
    }
}
