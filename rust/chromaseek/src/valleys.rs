//! Valley search around candidate apexes.
//!
//! A candidate is only kept when both of its bounding valleys drop to at most
//! `height * (1 - drop_ratio)`. Failing candidates are dropped outright, there
//! is no relaxed second search and no merging into a neighbour (shoulders are
//! lost on purpose).

use crate::errors::{
    ChromaError,
    Result,
};
use crate::models::Trace;
use crate::peak_locator::PeakCandidate;
use tracing::debug;

/// Integration bounds of an accepted candidate, as trace indices.
///
/// `start < apex < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPeak {
    pub apex: usize,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValleyResolver {
    search_window: f64,
    drop_ratio: f64,
}

impl ValleyResolver {
    pub const DEFAULT_SEARCH_WINDOW: f64 = 3.0;
    pub const DEFAULT_DROP_RATIO: f64 = 0.2;

    pub fn try_new(search_window: f64, drop_ratio: f64) -> Result<Self> {
        if !(search_window > 0.0 && search_window.is_finite()) {
            return Err(ChromaError::invalid_parameter(
                "valleys.search_window",
                format!("must be a positive number, got {}", search_window),
            ));
        }
        if !(0.0..=1.0).contains(&drop_ratio) {
            return Err(ChromaError::invalid_parameter(
                "valleys.drop_ratio",
                format!("must be within [0, 1], got {}", drop_ratio),
            ));
        }
        Ok(Self {
            search_window,
            drop_ratio,
        })
    }

    pub fn search_window(&self) -> f64 {
        self.search_window
    }

    pub fn drop_ratio(&self) -> f64 {
        self.drop_ratio
    }

    /// Search reach in samples on each side of the apex.
    fn reach(&self, trace: &Trace) -> Result<usize> {
        let interval = trace.mean_interval()?;
        let samples = (self.search_window / interval).floor();
        // Anything wider than the trace reaches both ends
        if samples >= trace.len() as f64 {
            return Ok(trace.len());
        }
        Ok((samples as usize).max(1))
    }

    /// Resolves a single apex on `trace` (the smoothed trace the candidate
    /// was located on). Returns `None` when the candidate is rejected.
    pub fn resolve(&self, trace: &Trace, apex: usize) -> Result<Option<ResolvedPeak>> {
        let reach = self.reach(trace)?;
        Ok(self.resolve_with_reach(trace, apex, reach))
    }

    fn resolve_with_reach(&self, trace: &Trace, apex: usize, reach: usize) -> Option<ResolvedPeak> {
        let signal = trace.signal();
        let n = signal.len();
        if apex == 0 || apex + 1 >= n {
            debug!("Rejecting candidate at index {}: apex on the trace edge", apex);
            return None;
        }

        let height = signal[apex];
        let max_valley = height * (1.0 - self.drop_ratio);

        let left_lo = apex.saturating_sub(reach);
        let right_hi = apex.saturating_add(reach).min(n - 1);
        let start = argmin(signal, left_lo, apex)?;
        let end = argmin(signal, apex + 1, right_hi + 1)?;

        if signal[start] > max_valley || signal[end] > max_valley {
            debug!(
                "Rejecting candidate at {:.3} (height {:.4}): valleys {:.4}/{:.4} above {:.4}",
                trace.position(apex),
                height,
                signal[start],
                signal[end],
                max_valley,
            );
            return None;
        }

        Some(ResolvedPeak { apex, start, end })
    }

    /// Resolves every candidate, keeping the accepted ones in input order.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn resolve_all(
        &self,
        trace: &Trace,
        candidates: &[PeakCandidate],
    ) -> Result<Vec<ResolvedPeak>> {
        if candidates.is_empty() {
            return Ok(Vec::new());
        }
        let reach = self.reach(trace)?;
        Ok(candidates
            .iter()
            .filter_map(|c| self.resolve_with_reach(trace, c.index, reach))
            .collect())
    }
}

impl Default for ValleyResolver {
    fn default() -> Self {
        Self {
            search_window: Self::DEFAULT_SEARCH_WINDOW,
            drop_ratio: Self::DEFAULT_DROP_RATIO,
        }
    }
}

/// Index of the minimum of `signal[lo..hi]`, first occurrence on ties.
fn argmin(signal: &[f64], lo: usize, hi: usize) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &val) in signal.iter().enumerate().take(hi).skip(lo) {
        match best {
            Some((_, best_val)) if val >= best_val => {}
            _ => best = Some((i, val)),
        }
    }
    best.map(|(i, _)| i)
}
