use crate::calibration::DEFAULT_PI_MARKERS;
use crate::classification::ClassificationMode;
use crate::errors::{
    ChromaError,
    Result,
};
use crate::smoothing::SavitzkyGolay;
use crate::valleys::ValleyResolver;
use serde::{
    Deserialize,
    Serialize,
};

/// Everything needed to take one trace to a classified composition.
///
/// Every section has defaults, so `{}` is a valid (reduced CE-SDS) config.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub smoothing: SmoothingConfig,
    #[serde(default)]
    pub peaks: PeakDetectionConfig,
    #[serde(default)]
    pub valleys: ValleyConfig,
    #[serde(default)]
    pub marker: Option<MarkerConfig>,
    /// cIEF only, pI markers spiked into every injection.
    #[serde(default)]
    pub pi_markers: Option<PiMarkerConfig>,
    #[serde(default)]
    pub classification: ClassificationMode,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothingConfig {
    pub window: usize,
    pub polynomial: usize,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            window: SavitzkyGolay::DEFAULT_WINDOW,
            polynomial: SavitzkyGolay::DEFAULT_POLYNOMIAL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakDetectionConfig {
    /// Signal units.
    pub prominence: f64,
    /// Position units.
    pub min_separation: f64,
    /// Keep only this many of the tallest candidates. `None` keeps all.
    #[serde(default)]
    pub max_peaks: Option<usize>,
}

impl Default for PeakDetectionConfig {
    fn default() -> Self {
        Self {
            prominence: 0.05,
            min_separation: 0.3,
            max_peaks: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValleyConfig {
    /// Position units, on each side of the apex.
    pub search_window: f64,
    pub drop_ratio: f64,
}

impl Default for ValleyConfig {
    fn default() -> Self {
        Self {
            search_window: ValleyResolver::DEFAULT_SEARCH_WINDOW,
            drop_ratio: ValleyResolver::DEFAULT_DROP_RATIO,
        }
    }
}

/// Internal size marker (CE-SDS 10 kDa marker). The marker apex is searched
/// in the raw trace around `position`, only what comes `skip` after it is
/// analysed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MarkerConfig {
    pub position: f64,
    #[serde(default = "MarkerConfig::default_search_half_width")]
    pub search_half_width: f64,
    #[serde(default = "MarkerConfig::default_skip")]
    pub skip: f64,
}

impl MarkerConfig {
    fn default_search_half_width() -> f64 {
        0.5
    }

    fn default_skip() -> f64 {
        0.3
    }

    pub fn at(position: f64) -> Self {
        Self {
            position,
            search_half_width: Self::default_search_half_width(),
            skip: Self::default_skip(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiMarkerConfig {
    /// Peaks at or before this position are never markers.
    #[serde(default = "PiMarkerConfig::default_baseline_cutoff")]
    pub baseline_cutoff: f64,
    /// Marker pI values in elution order.
    #[serde(default = "PiMarkerConfig::default_values")]
    pub values: Vec<f64>,
}

impl PiMarkerConfig {
    fn default_baseline_cutoff() -> f64 {
        1.0
    }

    fn default_values() -> Vec<f64> {
        DEFAULT_PI_MARKERS.to_vec()
    }
}

impl Default for PiMarkerConfig {
    fn default() -> Self {
        Self {
            baseline_cutoff: Self::default_baseline_cutoff(),
            values: Self::default_values(),
        }
    }
}

impl AnalysisConfig {
    pub fn with_classification(mut self, mode: ClassificationMode) -> Self {
        self.classification = mode;
        self
    }

    /// Checks every parameter, the first problem found is returned.
    pub fn validate(&self) -> Result<()> {
        SavitzkyGolay::try_new(self.smoothing.window, self.smoothing.polynomial)?;

        let peaks = &self.peaks;
        if !(peaks.prominence > 0.0 && peaks.prominence.is_finite()) {
            return Err(ChromaError::invalid_parameter(
                "peaks.prominence",
                format!("must be a positive number, got {}", peaks.prominence),
            ));
        }
        if !(peaks.min_separation >= 0.0 && peaks.min_separation.is_finite()) {
            return Err(ChromaError::invalid_parameter(
                "peaks.min_separation",
                format!("must be >= 0, got {}", peaks.min_separation),
            ));
        }
        if peaks.max_peaks == Some(0) {
            return Err(ChromaError::invalid_parameter(
                "peaks.max_peaks",
                "must be at least 1 (leave it out to keep every peak)",
            ));
        }

        ValleyResolver::try_new(self.valleys.search_window, self.valleys.drop_ratio)?;

        if let Some(marker) = &self.marker {
            if !marker.position.is_finite() {
                return Err(ChromaError::invalid_parameter(
                    "marker.position",
                    format!("must be finite, got {}", marker.position),
                ));
            }
            if !(marker.search_half_width >= 0.0 && marker.search_half_width.is_finite()) {
                return Err(ChromaError::invalid_parameter(
                    "marker.search_half_width",
                    format!("must be >= 0, got {}", marker.search_half_width),
                ));
            }
            if !(marker.skip >= 0.0 && marker.skip.is_finite()) {
                return Err(ChromaError::invalid_parameter(
                    "marker.skip",
                    format!("must be >= 0, got {}", marker.skip),
                ));
            }
        }

        if let Some(pi_markers) = &self.pi_markers {
            if !pi_markers.baseline_cutoff.is_finite() {
                return Err(ChromaError::invalid_parameter(
                    "pi_markers.baseline_cutoff",
                    format!("must be finite, got {}", pi_markers.baseline_cutoff),
                ));
            }
            if pi_markers.values.len() < 2 || pi_markers.values.iter().any(|v| !v.is_finite()) {
                return Err(ChromaError::invalid_parameter(
                    "pi_markers.values",
                    format!("needs at least two finite pI values, got {:?}", pi_markers.values),
                ));
            }
        }

        self.classification.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_json_is_default() {
        let config: AnalysisConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, AnalysisConfig::default());
        assert_eq!(config.smoothing.window, 11);
        assert_eq!(config.smoothing.polynomial, 3);
        assert_eq!(config.valleys.drop_ratio, 0.2);
        assert_eq!(config.classification, ClassificationMode::Reduced);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_full_json() {
        let config: AnalysisConfig = serde_json::from_str(
            r#"{
                "smoothing": {"window": 15, "polynomial": 2},
                "peaks": {"prominence": 2.0, "min_separation": 0.3, "max_peaks": 4},
                "valleys": {"search_window": 3.0, "drop_ratio": 0.2},
                "marker": {"position": 5.5},
                "classification": {"mode": "non_reduced", "intact_position": 21.0}
            }"#,
        )
        .unwrap();
        assert_eq!(config.peaks.max_peaks, Some(4));
        assert_eq!(config.marker, Some(MarkerConfig::at(5.5)));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_errors() {
        let mut config = AnalysisConfig::default();
        config.smoothing.window = 10;
        assert!(matches!(
            config.validate(),
            Err(ChromaError::InvalidParameter {
                param: "smoothing.window",
                ..
            })
        ));

        let mut config = AnalysisConfig::default();
        config.peaks.prominence = -1.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.peaks.max_peaks = Some(0);
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.valleys.drop_ratio = 2.0;
        assert!(config.validate().is_err());

        let mut config = AnalysisConfig::default();
        config.marker = Some(MarkerConfig {
            position: 5.0,
            search_half_width: -1.0,
            skip: 0.3,
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_pi_markers_section() {
        let config: AnalysisConfig =
            serde_json::from_str(r#"{"pi_markers": {"baseline_cutoff": 2.5}}"#).unwrap();
        let pi_markers = config.pi_markers.clone().unwrap();
        assert_eq!(pi_markers.baseline_cutoff, 2.5);
        assert_eq!(pi_markers.values, vec![10.0, 9.5, 5.5, 4.0]);
        assert!(config.validate().is_ok());

        let single = AnalysisConfig {
            pi_markers: Some(PiMarkerConfig {
                values: vec![7.0],
                ..PiMarkerConfig::default()
            }),
            ..AnalysisConfig::default()
        };
        assert!(matches!(
            single.validate(),
            Err(ChromaError::InvalidParameter {
                param: "pi_markers.values",
                ..
            })
        ));
    }
}
