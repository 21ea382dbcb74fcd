//! Percent composition of classified peaks.

use crate::models::{
    Peak,
    PeakClass,
};
use crate::utils::math::round_to;
use serde::{
    Serialize,
    Serializer,
};
use std::collections::BTreeMap;
use std::fmt::Display;
use tracing::warn;

const CLOSURE_TOLERANCE: f64 = 1e-2;

/// Areas and percentages per class for one sample.
///
/// Unclassified peaks are reported with their area but never enter the
/// percentage base. When nothing was classified every percentage is 0.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub percentages: BTreeMap<PeakClass, f64>,
    pub areas: BTreeMap<PeakClass, f64>,
    /// Sum of the classified areas, the denominator of the percentages.
    pub total_area: f64,
}

impl ClassificationResult {
    /// Summarizes classified peaks. Every class in `vocabulary` gets an
    /// entry, even when no peak carries it.
    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn from_classified(peaks: &[Peak], vocabulary: &[PeakClass]) -> Self {
        let mut areas: BTreeMap<PeakClass, f64> =
            vocabulary.iter().map(|&class| (class, 0.0)).collect();
        for peak in peaks.iter() {
            *areas.entry(peak.class_or_unclassified()).or_insert(0.0) += peak.area;
        }

        let total_area: f64 = areas
            .iter()
            .filter(|(class, _)| class.is_classified())
            .map(|(_, area)| area)
            .sum();

        let percentages: BTreeMap<PeakClass, f64> = areas
            .iter()
            .filter(|(class, _)| class.is_classified())
            .map(|(&class, &area)| {
                let pct = if total_area > 0.0 {
                    area / total_area * 100.0
                } else {
                    0.0
                };
                (class, pct)
            })
            .collect();

        let out = Self {
            percentages,
            areas,
            total_area,
        };
        out.check_closure();
        out
    }

    pub fn percent(&self, class: PeakClass) -> f64 {
        self.percentages.get(&class).copied().unwrap_or(0.0)
    }

    pub fn area(&self, class: PeakClass) -> f64 {
        self.areas.get(&class).copied().unwrap_or(0.0)
    }

    pub fn is_empty(&self) -> bool {
        self.total_area <= 0.0
    }

    pub fn percent_sum(&self) -> f64 {
        self.percentages.values().sum()
    }

    fn check_closure(&self) {
        if self.is_empty() {
            return;
        }
        let sum = self.percent_sum();
        if (sum - 100.0).abs() > CLOSURE_TOLERANCE {
            warn!(
                "Class percentages add up to {:.4} instead of 100 (total area {})",
                sum, self.total_area
            );
        }
    }
}

/// A percentage as it appears in a report.
///
/// `AtLeast(x)` is the limit of detection bound and serializes as the
/// string `">x"` with two decimals, plain values serialize as numbers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PercentValue {
    Value(f64),
    AtLeast(f64),
}

impl PercentValue {
    /// The numeric part, bound or not.
    pub fn value(&self) -> f64 {
        match self {
            Self::Value(x) | Self::AtLeast(x) => *x,
        }
    }

    pub fn is_bound(&self) -> bool {
        matches!(self, Self::AtLeast(_))
    }
}

impl Display for PercentValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Value(x) => write!(f, "{}", x),
            Self::AtLeast(x) => write!(f, ">{:.2}", x),
        }
    }
}

impl Serialize for PercentValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Self::Value(x) => serializer.serialize_f64(*x),
            Self::AtLeast(_) => serializer.serialize_str(&self.to_string()),
        }
    }
}

/// Limit of detection policy for reference-relative reports.
///
/// The percentage is rounded to 2 decimals. A value that lands on exactly
/// 100 means the other classes are below what can be measured, it is
/// replaced by the bound `100 - floor / total * 100` (clamped at 0, also
/// rounded to 2 decimals).
///
/// # Example
///
/// ```
/// use chromaseek::composition::{apply_lod_policy, PercentValue};
///
/// assert_eq!(apply_lod_policy(100.0, 200_000.0, 1000.0), PercentValue::AtLeast(99.5));
/// assert_eq!(apply_lod_policy(97.256, 200_000.0, 1000.0), PercentValue::Value(97.26));
/// ```
pub fn apply_lod_policy(percent: f64, total_area: f64, lod_area_floor: f64) -> PercentValue {
    let rounded = round_to(percent, 2);
    if rounded == 100.0 && total_area > 0.0 {
        let bound = (100.0 - lod_area_floor / total_area * 100.0).max(0.0);
        PercentValue::AtLeast(round_to(bound, 2))
    } else {
        PercentValue::Value(rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::peak::test_utils::mock_peak;

    const REDUCED: [PeakClass; 4] = [
        PeakClass::Lmw,
        PeakClass::LightChain,
        PeakClass::HeavyChain,
        PeakClass::Hmw,
    ];

    #[test]
    fn test_percentages_close_to_100() {
        let peaks = vec![
            mock_peak(1, 1.0, 1.0, 10.0).with_class(PeakClass::Lmw),
            mock_peak(2, 2.0, 1.0, 30.0).with_class(PeakClass::LightChain),
            mock_peak(3, 3.0, 1.0, 25.0).with_class(PeakClass::Unclassified),
            mock_peak(4, 4.0, 1.0, 60.0).with_class(PeakClass::HeavyChain),
        ];
        let result = ClassificationResult::from_classified(&peaks, &REDUCED);
        assert_eq!(result.total_area, 100.0);
        assert_eq!(result.percent(PeakClass::LightChain), 30.0);
        assert_eq!(result.percent(PeakClass::Hmw), 0.0);
        assert_eq!(result.area(PeakClass::Unclassified), 25.0);
        assert!(!result.percentages.contains_key(&PeakClass::Unclassified));
        assert!((result.percent_sum() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_peaks_is_all_zero() {
        let result = ClassificationResult::from_classified(&[], &REDUCED);
        assert!(result.is_empty());
        assert_eq!(result.percentages.len(), 4);
        assert!(result.percentages.values().all(|&p| p == 0.0));
    }

    #[test]
    fn test_lod_policy() {
        assert_eq!(
            apply_lod_policy(99.999, 50_000.0, 1000.0),
            PercentValue::AtLeast(98.0)
        );
        // Floor larger than the total area
        assert_eq!(
            apply_lod_policy(100.0, 500.0, 1000.0),
            PercentValue::AtLeast(0.0)
        );
        assert_eq!(apply_lod_policy(0.0, 0.0, 1000.0), PercentValue::Value(0.0));
    }

    #[test]
    fn test_percent_value_serialization() {
        let json = serde_json::to_string(&vec![
            PercentValue::Value(12.5),
            PercentValue::AtLeast(99.5),
        ])
        .unwrap();
        assert_eq!(json, r#"[12.5,">99.50"]"#);
        assert_eq!(PercentValue::AtLeast(98.0).to_string(), ">98.00");
    }
}
