use crate::models::{
    Peak,
    Trace,
};
use crate::valleys::ResolvedPeak;
use tracing::debug;

/// Trapezoidal integral of `y` over `x`.
///
/// # Example
///
/// ```
/// use chromaseek::integration::trapezoid;
///
/// let x = [0.0, 1.0, 2.0];
/// let y = [0.0, 2.0, 0.0];
/// assert_eq!(trapezoid(&x, &y), 2.0);
/// ```
pub fn trapezoid(x: &[f64], y: &[f64]) -> f64 {
    x.windows(2)
        .zip(y.windows(2))
        .map(|(xw, yw)| (xw[1] - xw[0]) * (yw[0] + yw[1]) * 0.5)
        .sum()
}

/// Integrates the signal above the straight line joining the two valleys.
///
/// Returns `None` for peaks whose area is not strictly positive, those are
/// never emitted.
pub fn integrate_peak(trace: &Trace, resolved: &ResolvedPeak) -> Option<Peak> {
    let ResolvedPeak { apex, start, end } = *resolved;
    debug_assert!(start < apex && apex < end && end < trace.len());

    let positions = &trace.positions()[start..=end];
    let signal = &trace.signal()[start..=end];

    let mut peak = Peak {
        index: apex,
        position: trace.position(apex),
        height: trace.signal_at(apex),
        area: 0.0,
        start_position: trace.position(start),
        end_position: trace.position(end),
        baseline_left: trace.signal_at(start),
        baseline_right: trace.signal_at(end),
        class_label: None,
        estimated_mw: None,
        estimated_pi: None,
    };

    let corrected: Vec<f64> = positions
        .iter()
        .zip(signal.iter())
        .map(|(&x, &y)| y - peak.baseline_at(x))
        .collect();
    let area = trapezoid(positions, &corrected);

    // Repeated positions can collapse the bounds onto the apex
    if !(peak.start_position < peak.position && peak.position < peak.end_position) {
        debug!(
            "Discarding peak at {:.3}: degenerate bounds [{:.3}, {:.3}]",
            peak.position, peak.start_position, peak.end_position
        );
        return None;
    }
    if !(area > 0.0 && area.is_finite()) {
        debug!(
            "Discarding peak at {:.3}: non-positive area ({})",
            peak.position, area
        );
        return None;
    }
    peak.area = area;
    Some(peak)
}

#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, level = "trace")
)]
pub fn integrate_all(trace: &Trace, resolved: &[ResolvedPeak]) -> Vec<Peak> {
    resolved
        .iter()
        .filter_map(|r| integrate_peak(trace, r))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_triangle_on_sloped_baseline() {
        // Triangle of height 2 over a baseline going from 1 to 3
        let trace = Trace::try_new(
            vec![0.0, 1.0, 2.0, 3.0, 4.0],
            vec![1.0, 2.5, 4.0, 3.5, 3.0],
        )
        .unwrap();
        let peak = integrate_peak(
            &trace,
            &ResolvedPeak {
                apex: 2,
                start: 0,
                end: 4,
            },
        )
        .unwrap();
        assert!((peak.area - 4.0).abs() < 1e-12);
        assert_eq!(peak.start_position, 0.0);
        assert_eq!(peak.end_position, 4.0);
        assert_eq!(peak.baseline_left, 1.0);
        assert_eq!(peak.baseline_right, 3.0);
        assert_eq!(peak.height, 4.0);
    }

    #[test]
    fn test_dip_is_discarded() {
        let trace = Trace::try_new(vec![0.0, 1.0, 2.0], vec![1.0, 0.5, 1.0]).unwrap();
        let resolved = [ResolvedPeak {
            apex: 1,
            start: 0,
            end: 2,
        }];
        assert!(integrate_all(&trace, &resolved).is_empty());
    }

    #[test]
    fn test_apex_sharing_a_bound_position_is_discarded() {
        // The right valley sits at the same position as the apex
        let trace = Trace::try_new(
            vec![0.0, 0.5, 1.0, 1.0, 2.0],
            vec![0.0, 1.0, 3.0, 1.0, 0.0],
        )
        .unwrap();
        let resolved = ResolvedPeak {
            apex: 2,
            start: 0,
            end: 3,
        };
        assert!(integrate_peak(&trace, &resolved).is_none());

        let widened = ResolvedPeak {
            apex: 2,
            start: 0,
            end: 4,
        };
        let peak = integrate_peak(&trace, &widened).unwrap();
        assert!(peak.start_position < peak.position && peak.position < peak.end_position);
    }
}
