//! Electrophoretic (CE-SDS) rules, anchored on the tallest peaks.
//!
//! All functions here expect `peaks` sorted by position and return one
//! label per input peak, in the same order.
//!
//! NOTE: the rules assume the tallest peaks ARE the chains (or the intact
//! species). Nothing checks that against known migration positions, a
//! sample dominated by a fragment gets mislabelled.

use super::{
    nearest_to,
    tallest,
};
use crate::models::{
    Peak,
    PeakClass,
};

/// Light and heavy chain anchors, as indices into the position-sorted peaks.
///
/// `light < heavy` always.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChainAnchors {
    pub light: usize,
    pub heavy: usize,
}

/// Picks the two tallest peaks (earliest wins height ties), the earlier of
/// the two is the light chain.
///
/// Returns `None` with fewer than two peaks.
pub fn select_chain_anchors(peaks: &[Peak]) -> Option<ChainAnchors> {
    if peaks.len() < 2 {
        return None;
    }
    let mut ranked: Vec<usize> = (0..peaks.len()).collect();
    ranked.sort_by(|&a, &b| {
        peaks[b]
            .height
            .total_cmp(&peaks[a].height)
            .then_with(|| a.cmp(&b))
    });
    let (first, second) = (ranked[0], ranked[1]);
    Some(ChainAnchors {
        light: first.min(second),
        heavy: first.max(second),
    })
}

/// Reduced mode labels.
///
/// Peaks before the light chain are LMW, after the heavy chain HMW.
/// Anything in between stays unclassified (and out of the percentage base).
/// Without two anchors nothing is classified.
pub fn classify_reduced(peaks: &[Peak]) -> Vec<PeakClass> {
    let Some(anchors) = select_chain_anchors(peaks) else {
        return vec![PeakClass::Unclassified; peaks.len()];
    };

    (0..peaks.len())
        .map(|i| {
            if i == anchors.light {
                PeakClass::LightChain
            } else if i == anchors.heavy {
                PeakClass::HeavyChain
            } else if i < anchors.light {
                PeakClass::Lmw
            } else if i > anchors.heavy {
                PeakClass::Hmw
            } else {
                PeakClass::Unclassified
            }
        })
        .collect()
}

/// The intact anchor: closest to `target` when one is given, the tallest
/// peak otherwise. Ties go to the earlier peak.
pub fn select_intact_anchor(peaks: &[Peak], target: Option<f64>) -> Option<usize> {
    match target {
        Some(target) => nearest_to(peaks, target),
        None => tallest(peaks),
    }
}

/// Non-reduced mode labels.
///
/// Before the intact peak: a single peak is LMW; with two or more, the
/// earliest is LMW, the second the free light chain, any further ones are
/// left unclassified. Everything after the intact peak is HMW.
pub fn classify_non_reduced(peaks: &[Peak], intact_position: Option<f64>) -> Vec<PeakClass> {
    let Some(intact) = select_intact_anchor(peaks, intact_position) else {
        return Vec::new();
    };

    (0..peaks.len())
        .map(|i| match i {
            i if i == intact => PeakClass::Intact,
            i if i > intact => PeakClass::Hmw,
            0 => PeakClass::Lmw,
            1 => PeakClass::LightChain,
            _ => PeakClass::Unclassified,
        })
        .collect()
}
