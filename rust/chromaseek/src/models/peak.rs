use serde::{
    Deserialize,
    Serialize,
};
use std::fmt::Display;

/// Species a resolved peak can be assigned to.
///
/// The ordering of the variants is the elution order in CE-SDS
/// (fragments first, aggregates last) and is what `BTreeMap`s keyed
/// by class iterate in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PeakClass {
    #[serde(rename = "LMW")]
    Lmw,
    LightChain,
    HeavyChain,
    Intact,
    Main,
    #[serde(rename = "HMW")]
    Hmw,
    Unclassified,
}

impl PeakClass {
    pub fn is_classified(&self) -> bool {
        !matches!(self, PeakClass::Unclassified)
    }

    /// Short name used in report headers.
    pub fn short_name(&self) -> &'static str {
        match self {
            PeakClass::Lmw => "LMW",
            PeakClass::LightChain => "LightChain",
            PeakClass::HeavyChain => "HeavyChain",
            PeakClass::Intact => "Intact",
            PeakClass::Main => "Main",
            PeakClass::Hmw => "HMW",
            PeakClass::Unclassified => "Unclassified",
        }
    }
}

impl Display for PeakClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PeakClass::LightChain => "Light Chain",
            PeakClass::HeavyChain => "Heavy Chain",
            PeakClass::Main => "Main Peak",
            other => other.short_name(),
        };
        write!(f, "{}", name)
    }
}

/// A resolved and integrated peak.
///
/// Invariants (enforced by the integrator, the only producer):
/// * `start_position < position < end_position`
/// * `area > 0`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Peak {
    /// Apex index in the trace the peak was resolved on.
    pub index: usize,
    pub position: f64,
    /// Smoothed signal at the apex.
    pub height: f64,
    /// Area above the valley-to-valley baseline.
    pub area: f64,
    pub start_position: f64,
    pub end_position: f64,
    /// Signal at the left valley.
    pub baseline_left: f64,
    /// Signal at the right valley.
    pub baseline_right: f64,
    pub class_label: Option<PeakClass>,
    /// Only set when a molecular weight calibration was supplied.
    pub estimated_mw: Option<f64>,
    /// Only set when pI markers were found in the trace (cIEF).
    pub estimated_pi: Option<f64>,
}

impl Peak {
    pub fn width(&self) -> f64 {
        self.end_position - self.start_position
    }

    /// Baseline value at `position`, linear between the two valleys.
    pub fn baseline_at(&self, position: f64) -> f64 {
        let span = self.end_position - self.start_position;
        if span <= 0.0 {
            return self.baseline_left;
        }
        let frac = (position - self.start_position) / span;
        self.baseline_left + frac * (self.baseline_right - self.baseline_left)
    }

    pub fn with_class(&self, class: PeakClass) -> Self {
        Self {
            class_label: Some(class),
            ..self.clone()
        }
    }

    pub fn with_estimated_mw(&self, mw: f64) -> Self {
        Self {
            estimated_mw: Some(mw),
            ..self.clone()
        }
    }

    pub fn with_estimated_pi(&self, pi: f64) -> Self {
        Self {
            estimated_pi: Some(pi),
            ..self.clone()
        }
    }

    pub fn class_or_unclassified(&self) -> PeakClass {
        self.class_label.unwrap_or(PeakClass::Unclassified)
    }
}


#[cfg(test)]
mod tests {
    use super::test_utils::mock_peak;
    use super::*;

    #[test]
    fn test_baseline_interpolation() {
        let peak = Peak {
            baseline_left: 1.0,
            baseline_right: 3.0,
            ..mock_peak(10, 5.0, 10.0, 4.0)
        };
        assert_eq!(peak.baseline_at(4.5), 1.0);
        assert_eq!(peak.baseline_at(5.0), 2.0);
        assert_eq!(peak.baseline_at(5.5), 3.0);
        assert_eq!(peak.width(), 1.0);
    }

    #[test]
    fn test_class_serde_names() {
        let names: Vec<String> = [PeakClass::Lmw, PeakClass::LightChain, PeakClass::Hmw]
            .iter()
            .map(|c| serde_json::to_string(c).unwrap())
            .collect();
        assert_eq!(names, vec!["\"LMW\"", "\"LightChain\"", "\"HMW\""]);
        assert_eq!(PeakClass::HeavyChain.to_string(), "Heavy Chain");
    }
}
