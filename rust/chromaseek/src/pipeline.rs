//! End to end processing of a sample.
//!
//! raw trace -> (marker exclusion) -> smoothing -> peak location ->
//! (max peaks) -> valley resolution -> integration -> (pI markers) ->
//! classification -> composition -> report row.
//!
//! Nothing in here keeps state between samples, batches are processed
//! in parallel.

use crate::calibration::{
    MwCalibration,
    PiCalibration,
};
use crate::classification::classify;
use crate::composition::ClassificationResult;
use crate::config::{
    AnalysisConfig,
    MarkerConfig,
};
use crate::errors::Result;
use crate::integration::integrate_all;
use crate::models::{
    Peak,
    Sample,
    Trace,
};
use crate::peak_locator::{
    PeakCandidate,
    locate_peaks,
    select_tallest,
};
use crate::report::ReportRow;
use crate::smoothing::SavitzkyGolay;
use crate::valleys::ValleyResolver;
use rayon::prelude::*;
use serde::Serialize;
use tracing::{
    debug,
    info,
    warn,
};

/// Apex of the internal size marker, found on the raw signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MarkerHit {
    pub position: f64,
    pub height: f64,
}

/// Intermediate results of [`PeakDetector::detect`].
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub marker: Option<MarkerHit>,
    /// Raw trace that was analysed (after marker exclusion). `None` when
    /// nothing was left to analyse.
    pub analysed: Option<Trace>,
    pub smoothed: Option<Trace>,
    pub candidates: Vec<PeakCandidate>,
    /// Resolved and integrated peaks, unlabelled, in position order.
    pub peaks: Vec<Peak>,
}

impl Detection {
    fn empty(marker: Option<MarkerHit>) -> Self {
        Self {
            marker,
            analysed: None,
            smoothed: None,
            candidates: Vec::new(),
            peaks: Vec::new(),
        }
    }
}

/// Stages 1 to 4 (smoothing to integration) with validated parameters.
#[derive(Debug, Clone)]
pub struct PeakDetector {
    smoother: SavitzkyGolay,
    prominence: f64,
    min_separation: f64,
    max_peaks: Option<usize>,
    resolver: ValleyResolver,
    marker: Option<MarkerConfig>,
}

impl PeakDetector {
    pub fn from_config(config: &AnalysisConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            smoother: SavitzkyGolay::try_new(config.smoothing.window, config.smoothing.polynomial)?,
            prominence: config.peaks.prominence,
            min_separation: config.peaks.min_separation,
            max_peaks: config.peaks.max_peaks,
            resolver: ValleyResolver::try_new(
                config.valleys.search_window,
                config.valleys.drop_ratio,
            )?,
            marker: config.marker,
        })
    }

    fn find_marker(&self, trace: &Trace) -> Option<MarkerHit> {
        let marker = self.marker.as_ref()?;
        let idx = trace.argmax_between(
            marker.position - marker.search_half_width,
            marker.position + marker.search_half_width,
        )?;
        Some(MarkerHit {
            position: trace.position(idx),
            height: trace.signal_at(idx),
        })
    }

    #[cfg_attr(
        feature = "instrumentation",
        tracing::instrument(skip_all, level = "trace")
    )]
    pub fn detect(&self, trace: &Trace) -> Result<Detection> {
        let marker = self.find_marker(trace);

        let analysed = match &self.marker {
            Some(marker_config) => {
                let anchor = match &marker {
                    Some(hit) => hit.position,
                    None => {
                        debug!(
                            "No marker found around {}, analysing after {}",
                            marker_config.position, marker_config.skip
                        );
                        0.0
                    }
                };
                match trace.after(anchor + marker_config.skip) {
                    Some(tail) => tail,
                    None => {
                        debug!("Nothing left to analyse after the marker");
                        return Ok(Detection::empty(marker));
                    }
                }
            }
            None => trace.clone(),
        };

        let smoothed = self.smoother.smooth(&analysed)?;
        let mut candidates = locate_peaks(&smoothed, self.prominence, self.min_separation)?;
        if let Some(max_peaks) = self.max_peaks {
            candidates = select_tallest(candidates, max_peaks);
        }
        let resolved = self.resolver.resolve_all(&smoothed, &candidates)?;
        let peaks = integrate_all(&smoothed, &resolved);
        debug!(
            "{} candidates, {} resolved, {} integrated",
            candidates.len(),
            resolved.len(),
            peaks.len()
        );

        Ok(Detection {
            marker,
            analysed: Some(analysed),
            smoothed: Some(smoothed),
            candidates,
            peaks,
        })
    }
}

/// Everything reported for one sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SampleReport {
    pub sample_id: String,
    pub mode: &'static str,
    pub marker: Option<MarkerHit>,
    /// Fit on the pI markers of this trace, when they were configured and found.
    pub pi_calibration: Option<PiCalibration>,
    /// Labelled peaks in position order, pI markers excluded.
    pub peaks: Vec<Peak>,
    pub composition: ClassificationResult,
    pub row: ReportRow,
}

/// Runs the whole pipeline on one sample.
///
/// A sample without peaks is not an error, it gets an empty peak list and
/// all-zero percentages.
///
/// # Example
///
/// ```
/// use chromaseek::{analyze_sample, AnalysisConfig, PeakClass, Sample, Trace};
///
/// // Three gaussian peaks, at 5, 8 and 12 minutes
/// let trace = Trace::from_pairs((0..=1600).map(|i| {
///     let t = i as f64 * 0.01;
///     let y: f64 = [(5.0, 50.0), (8.0, 100.0), (12.0, 90.0)]
///         .iter()
///         .map(|(c, h)| h * (-(t - c) * (t - c) / (2.0 * 0.2 * 0.2)).exp())
///         .sum();
///     (t, y)
/// }))
/// .unwrap();
///
/// let report = analyze_sample(&Sample::new("demo", trace), &AnalysisConfig::default(), None).unwrap();
/// let labels: Vec<PeakClass> = report.peaks.iter().map(|p| p.class_or_unclassified()).collect();
/// assert_eq!(labels, vec![PeakClass::Lmw, PeakClass::LightChain, PeakClass::HeavyChain]);
/// ```
#[cfg_attr(
    feature = "instrumentation",
    tracing::instrument(skip_all, fields(sample = %sample.id), level = "trace")
)]
pub fn analyze_sample(
    sample: &Sample,
    config: &AnalysisConfig,
    calibration: Option<&MwCalibration>,
) -> Result<SampleReport> {
    let with_id = |e: crate::errors::ChromaError| e.append_to_context(&format!(" (sample {})", sample.id));

    let detector = PeakDetector::from_config(config).map_err(with_id)?;
    let detection = detector.detect(&sample.trace).map_err(with_id)?;
    Ok(summarize(sample, config, detection, calibration))
}

fn fit_pi_markers(
    sample: &Sample,
    config: &AnalysisConfig,
    peaks: &[Peak],
) -> Option<PiCalibration> {
    let markers = config.pi_markers.as_ref()?;
    match PiCalibration::from_peaks(peaks, markers.baseline_cutoff, &markers.values) {
        Ok(pi_calibration) => Some(pi_calibration),
        Err(e) => {
            warn!("No pI calibration for {}: {}", sample.id, e);
            None
        }
    }
}

fn summarize(
    sample: &Sample,
    config: &AnalysisConfig,
    detection: Detection,
    calibration: Option<&MwCalibration>,
) -> SampleReport {
    let mode = &config.classification;
    let pi_calibration = fit_pi_markers(sample, config, &detection.peaks);
    let species: Vec<Peak> = match &pi_calibration {
        Some(pi) => detection
            .peaks
            .into_iter()
            .filter(|p| !pi.is_marker(p))
            .collect(),
        None => detection.peaks,
    };

    let mut peaks = classify(&species, mode);
    if let Some(calibration) = calibration {
        peaks = calibration.annotate(&peaks);
    }
    if let Some(pi) = &pi_calibration {
        peaks = pi.annotate(&peaks);
    }
    let composition = ClassificationResult::from_classified(&peaks, mode.vocabulary());
    let row = ReportRow::build(
        sample,
        mode,
        &peaks,
        &composition,
        detection.analysed.as_ref(),
        calibration,
    );

    SampleReport {
        sample_id: sample.id.clone(),
        mode: mode.name(),
        marker: detection.marker,
        pi_calibration,
        peaks,
        composition,
        row,
    }
}

/// [`analyze_sample`] over many samples, in parallel.
///
/// The output is in input order, a failing sample does not affect the others.
pub fn analyze_batch(
    samples: &[Sample],
    config: &AnalysisConfig,
    calibration: Option<&MwCalibration>,
) -> Vec<Result<SampleReport>> {
    let start = std::time::Instant::now();
    let out: Vec<Result<SampleReport>> = samples
        .par_iter()
        .map(|sample| analyze_sample(sample, config, calibration))
        .collect();

    let failed = out.iter().filter(|r| r.is_err()).count();
    if failed > 0 {
        warn!("{} of {} samples failed", failed, samples.len());
    }
    info!(
        "Analysed {} samples in {:?}",
        samples.len(),
        start.elapsed()
    );
    out
}
