//! Rule based assignment of resolved peaks to species.
//!
//! Every rule runs in two stages: select the anchor peak(s) first (pure
//! functions returning indices into the position-sorted peak list), then
//! label every peak from its position relative to the anchors.

pub mod reference;
pub mod two_tallest;

use crate::errors::{
    ChromaError,
    Result,
};
use crate::models::{
    Peak,
    PeakClass,
};
use serde::{
    Deserialize,
    Serialize,
};

pub use reference::{
    classify_reference_relative,
    select_main_peak,
};
pub use two_tallest::{
    ChainAnchors,
    classify_non_reduced,
    classify_reduced,
    select_chain_anchors,
    select_intact_anchor,
};

/// Default area below which a minor component is not considered detectable.
pub const DEFAULT_LOD_AREA_FLOOR: f64 = 1000.0;

fn default_lod_area_floor() -> f64 {
    DEFAULT_LOD_AREA_FLOOR
}

/// How the resolved peaks of a sample get labelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum ClassificationMode {
    /// Reduced CE-SDS: the two tallest peaks are light and heavy chain.
    #[default]
    Reduced,
    /// Non-reduced CE-SDS: one intact species with fragments before it
    /// and aggregates after it.
    NonReduced {
        #[serde(default)]
        intact_position: Option<f64>,
    },
    /// SEC style, everything relative to the peak closest to a reference
    /// position.
    ReferenceRelative {
        main_peak_position: f64,
        #[serde(default)]
        lmw_cutoff: Option<f64>,
        #[serde(default = "default_lod_area_floor")]
        lod_area_floor: f64,
    },
}

impl ClassificationMode {
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Reduced => Ok(()),
            Self::NonReduced { intact_position } => {
                if let Some(pos) = intact_position {
                    if !pos.is_finite() {
                        return Err(ChromaError::invalid_parameter(
                            "classification.intact_position",
                            format!("must be finite, got {}", pos),
                        ));
                    }
                }
                Ok(())
            }
            Self::ReferenceRelative {
                main_peak_position,
                lmw_cutoff,
                lod_area_floor,
            } => {
                if !main_peak_position.is_finite() {
                    return Err(ChromaError::invalid_parameter(
                        "classification.main_peak_position",
                        format!("must be finite, got {}", main_peak_position),
                    ));
                }
                if let Some(cutoff) = lmw_cutoff {
                    if cutoff.is_nan() {
                        return Err(ChromaError::invalid_parameter(
                            "classification.lmw_cutoff",
                            "must be a number",
                        ));
                    }
                }
                if !(*lod_area_floor >= 0.0 && lod_area_floor.is_finite()) {
                    return Err(ChromaError::invalid_parameter(
                        "classification.lod_area_floor",
                        format!("must be >= 0, got {}", lod_area_floor),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Classes that take part in the percentage base for this mode,
    /// in report order.
    pub fn vocabulary(&self) -> &'static [PeakClass] {
        match self {
            Self::Reduced => &[
                PeakClass::Lmw,
                PeakClass::LightChain,
                PeakClass::HeavyChain,
                PeakClass::Hmw,
            ],
            Self::NonReduced { .. } => &[
                PeakClass::Lmw,
                PeakClass::LightChain,
                PeakClass::Intact,
                PeakClass::Hmw,
            ],
            Self::ReferenceRelative { .. } => &[PeakClass::Hmw, PeakClass::Main, PeakClass::Lmw],
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Reduced => "reduced",
            Self::NonReduced { .. } => "non_reduced",
            Self::ReferenceRelative { .. } => "reference_relative",
        }
    }
}

/// Labels `peaks` according to `mode`.
///
/// The returned peaks are sorted by position (ties by apex index), every one
/// of them carries a `class_label`. The input is not modified.
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip(peaks), level = "trace")
)]
pub fn classify(peaks: &[Peak], mode: &ClassificationMode) -> Vec<Peak> {
    let mut sorted = peaks.to_vec();
    sort_by_position(&mut sorted);

    let labels = match mode {
        ClassificationMode::Reduced => classify_reduced(&sorted),
        ClassificationMode::NonReduced { intact_position } => {
            classify_non_reduced(&sorted, *intact_position)
        }
        ClassificationMode::ReferenceRelative {
            main_peak_position,
            lmw_cutoff,
            ..
        } => classify_reference_relative(&sorted, *main_peak_position, *lmw_cutoff),
    };

    sorted
        .iter()
        .zip(labels)
        .map(|(peak, class)| peak.with_class(class))
        .collect()
}

pub(crate) fn sort_by_position(peaks: &mut [Peak]) {
    peaks.sort_by(|a, b| {
        a.position
            .total_cmp(&b.position)
            .then_with(|| a.index.cmp(&b.index))
    });
}

/// Index of the tallest peak, earliest on ties.
pub(crate) fn tallest(peaks: &[Peak]) -> Option<usize> {
    let mut best: Option<usize> = None;
    for (i, peak) in peaks.iter().enumerate() {
        match best {
            Some(b) if peak.height <= peaks[b].height => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Index of the peak closest to `target`, earliest on ties.
pub(crate) fn nearest_to(peaks: &[Peak], target: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, peak) in peaks.iter().enumerate() {
        let dist = (peak.position - target).abs();
        match best {
            Some((_, best_dist)) if dist >= best_dist => {}
            _ => best = Some((i, dist)),
        }
    }
    best.map(|(i, _)| i)
}
