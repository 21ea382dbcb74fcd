//! Per sample report rows.
//!
//! The fields of a row depend on the classification mode. Percentages are
//! rounded here and nowhere else: one decimal for the CE-SDS modes, two
//! decimals (plus the limit of detection policy) for the reference mode.

use crate::calibration::MwCalibration;
use crate::classification::ClassificationMode;
use crate::composition::{
    ClassificationResult,
    PercentValue,
    apply_lod_policy,
};
use crate::models::{
    Peak,
    PeakClass,
    Sample,
    Trace,
};
use crate::utils::math::round_to;
use serde::Serialize;

const CE_SDS_DECIMALS: i32 = 1;
const SEC_DECIMALS: i32 = 2;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReducedRow {
    pub sample_id: String,
    #[serde(rename = "LMW_pct")]
    pub lmw_pct: PercentValue,
    #[serde(rename = "LightChain_pct")]
    pub light_chain_pct: PercentValue,
    #[serde(rename = "HeavyChain_pct")]
    pub heavy_chain_pct: PercentValue,
    #[serde(rename = "HMW_pct")]
    pub hmw_pct: PercentValue,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NonReducedRow {
    pub sample_id: String,
    #[serde(rename = "LMW_pct")]
    pub lmw_pct: PercentValue,
    #[serde(rename = "LightChain_pct")]
    pub light_chain_pct: PercentValue,
    #[serde(rename = "Intact_pct")]
    pub intact_pct: PercentValue,
    #[serde(rename = "HMW_pct")]
    pub hmw_pct: PercentValue,
}

/// Boundaries of the SEC regions, in position units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SecRegions {
    pub main_start: f64,
    pub main_end: f64,
    /// Earliest start of the peaks eluting before the main peak starts.
    pub hmw_start: Option<f64>,
    pub hmw_end: f64,
    pub lmw_start: f64,
    /// Latest end of the peaks eluting after the main peak ends, capped at
    /// the LMW cutoff.
    pub lmw_end: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceRow {
    pub sample_id: String,
    #[serde(rename = "HMW_pct")]
    pub hmw_pct: PercentValue,
    #[serde(rename = "Main_pct")]
    pub main_pct: PercentValue,
    #[serde(rename = "LMW_pct")]
    pub lmw_pct: PercentValue,
    pub hmw_area: f64,
    pub main_area: f64,
    pub lmw_area: f64,
    pub total_area: f64,
    /// Total area per unit of injection volume.
    pub normalized_total_area: Option<f64>,
    pub max_peak_height: Option<f64>,
    pub regions: Option<SecRegions>,
    /// Estimated at the raw signal maximum inside the main peak region.
    pub main_peak_mw: Option<f64>,
    pub mw_deviation_pct: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ReportRow {
    Reduced(ReducedRow),
    NonReduced(NonReducedRow),
    ReferenceRelative(ReferenceRow),
}

impl ReportRow {
    /// Builds the row for `sample`.
    ///
    /// `classified` are the labelled peaks, `trace` the raw trace they were
    /// found on (after marker exclusion).
    pub fn build(
        sample: &Sample,
        mode: &ClassificationMode,
        classified: &[Peak],
        composition: &ClassificationResult,
        trace: Option<&Trace>,
        calibration: Option<&MwCalibration>,
    ) -> Self {
        let ce_pct = |class: PeakClass| {
            PercentValue::Value(round_to(composition.percent(class), CE_SDS_DECIMALS))
        };

        match mode {
            ClassificationMode::Reduced => Self::Reduced(ReducedRow {
                sample_id: sample.id.clone(),
                lmw_pct: ce_pct(PeakClass::Lmw),
                light_chain_pct: ce_pct(PeakClass::LightChain),
                heavy_chain_pct: ce_pct(PeakClass::HeavyChain),
                hmw_pct: ce_pct(PeakClass::Hmw),
            }),
            ClassificationMode::NonReduced { .. } => Self::NonReduced(NonReducedRow {
                sample_id: sample.id.clone(),
                lmw_pct: ce_pct(PeakClass::Lmw),
                light_chain_pct: ce_pct(PeakClass::LightChain),
                intact_pct: ce_pct(PeakClass::Intact),
                hmw_pct: ce_pct(PeakClass::Hmw),
            }),
            ClassificationMode::ReferenceRelative {
                lmw_cutoff,
                lod_area_floor,
                ..
            } => Self::ReferenceRelative(build_reference_row(
                sample,
                classified,
                composition,
                trace,
                calibration,
                *lmw_cutoff,
                *lod_area_floor,
            )),
        }
    }

    pub fn sample_id(&self) -> &str {
        match self {
            Self::Reduced(row) => &row.sample_id,
            Self::NonReduced(row) => &row.sample_id,
            Self::ReferenceRelative(row) => &row.sample_id,
        }
    }

    /// `(column, percentage)` pairs in report order.
    pub fn percentages(&self) -> Vec<(&'static str, PercentValue)> {
        match self {
            Self::Reduced(row) => vec![
                ("LMW_pct", row.lmw_pct),
                ("LightChain_pct", row.light_chain_pct),
                ("HeavyChain_pct", row.heavy_chain_pct),
                ("HMW_pct", row.hmw_pct),
            ],
            Self::NonReduced(row) => vec![
                ("LMW_pct", row.lmw_pct),
                ("LightChain_pct", row.light_chain_pct),
                ("Intact_pct", row.intact_pct),
                ("HMW_pct", row.hmw_pct),
            ],
            Self::ReferenceRelative(row) => vec![
                ("HMW_pct", row.hmw_pct),
                ("Main_pct", row.main_pct),
                ("LMW_pct", row.lmw_pct),
            ],
        }
    }
}

fn build_reference_row(
    sample: &Sample,
    classified: &[Peak],
    composition: &ClassificationResult,
    trace: Option<&Trace>,
    calibration: Option<&MwCalibration>,
    lmw_cutoff: Option<f64>,
    lod_area_floor: f64,
) -> ReferenceRow {
    let total = composition.total_area;
    let sec_pct = |class: PeakClass| apply_lod_policy(composition.percent(class), total, lod_area_floor);

    let main = classified
        .iter()
        .find(|p| p.class_label == Some(PeakClass::Main));
    let regions = main.map(|main| sec_regions(classified, main, lmw_cutoff));

    let main_peak_mw = match (main, trace, calibration) {
        (Some(main), Some(trace), Some(calibration)) => trace
            .argmax_between(main.start_position, main.end_position)
            .map(|idx| calibration.estimate_mw(trace.position(idx))),
        _ => None,
    };
    let mw_deviation_pct = match (main_peak_mw, sample.expected_mw) {
        (Some(mw), Some(expected)) if expected != 0.0 => {
            Some(round_to((mw - expected) / expected * 100.0, SEC_DECIMALS))
        }
        _ => None,
    };

    let normalized_total_area = sample
        .injection_volume
        .filter(|v| *v > 0.0)
        .map(|v| round_to(total / v, SEC_DECIMALS));

    let max_peak_height = classified.iter().map(|p| p.height).reduce(f64::max);

    ReferenceRow {
        sample_id: sample.id.clone(),
        hmw_pct: sec_pct(PeakClass::Hmw),
        main_pct: sec_pct(PeakClass::Main),
        lmw_pct: sec_pct(PeakClass::Lmw),
        hmw_area: composition.area(PeakClass::Hmw),
        main_area: composition.area(PeakClass::Main),
        lmw_area: composition.area(PeakClass::Lmw),
        total_area: total,
        normalized_total_area,
        max_peak_height,
        regions,
        main_peak_mw,
        mw_deviation_pct,
    }
}

fn sec_regions(peaks: &[Peak], main: &Peak, lmw_cutoff: Option<f64>) -> SecRegions {
    let hmw_start = peaks
        .iter()
        .filter(|p| p.position < main.start_position)
        .map(|p| p.start_position)
        .reduce(f64::min);
    let lmw_end = peaks
        .iter()
        .filter(|p| p.position > main.end_position)
        .map(|p| p.end_position)
        .reduce(f64::max)
        .map(|end| match lmw_cutoff {
            Some(cutoff) => end.min(cutoff),
            None => end,
        });

    SecRegions {
        main_start: main.start_position,
        main_end: main.end_position,
        hmw_start,
        hmw_end: main.start_position,
        lmw_start: main.end_position,
        lmw_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classification::classify;
    use crate::models::peak::test_utils::mock_peak;

    fn sec_mode() -> ClassificationMode {
        ClassificationMode::ReferenceRelative {
            main_peak_position: 8.0,
            lmw_cutoff: Some(11.0),
            lod_area_floor: 1000.0,
        }
    }

    #[test]
    fn test_reduced_row_rounds_to_one_decimal() {
        let mode = ClassificationMode::Reduced;
        let peaks = classify(
            &[
                mock_peak(1, 5.0, 50.0, 1.0),
                mock_peak(2, 8.0, 100.0, 1.0),
                mock_peak(3, 12.0, 90.0, 1.0),
            ],
            &mode,
        );
        let composition = ClassificationResult::from_classified(&peaks, mode.vocabulary());
        let sample = Sample::new("s1", Trace::try_new(vec![0.0, 1.0], vec![0.0, 0.0]).unwrap());
        let row = ReportRow::build(&sample, &mode, &peaks, &composition, None, None);
        assert_eq!(row.sample_id(), "s1");
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["LMW_pct"], 33.3);
        assert_eq!(json["LightChain_pct"], 33.3);
        assert_eq!(json["HMW_pct"], 0.0);
        assert!(json.get("Intact_pct").is_none());
    }

    #[test]
    fn test_reference_row_with_lod_and_regions() {
        let mode = sec_mode();
        let peaks = classify(
            &[
                mock_peak(1, 6.0, 5.0, 400.0),
                mock_peak(2, 8.0, 100.0, 300_000.0),
                mock_peak(3, 10.0, 4.0, 200.0),
                mock_peak(4, 12.0, 4.0, 900.0),
            ],
            &mode,
        );
        let composition = ClassificationResult::from_classified(&peaks, mode.vocabulary());
        let sample = Sample::new("sec", Trace::try_new(vec![0.0, 1.0], vec![0.0, 0.0]).unwrap())
            .with_injection_volume(10.0);
        let row = match ReportRow::build(&sample, &mode, &peaks, &composition, None, None) {
            ReportRow::ReferenceRelative(row) => row,
            other => panic!("unexpected row {:?}", other),
        };
        assert_eq!(row.total_area, 300_600.0);
        assert_eq!(row.hmw_pct, PercentValue::Value(0.13));
        assert_eq!(row.main_pct, PercentValue::Value(99.8));
        assert_eq!(row.normalized_total_area, Some(30_060.0));
        assert_eq!(row.max_peak_height, Some(100.0));

        let regions = row.regions.unwrap();
        assert_eq!(regions.main_start, 7.5);
        assert_eq!(regions.hmw_start, Some(5.5));
        // Peak at 12 ends at 12.5, capped by the 11.0 cutoff
        assert_eq!(regions.lmw_end, Some(11.0));
    }

    #[test]
    fn test_reference_row_main_only_is_bounded() {
        let mode = sec_mode();
        let peaks = classify(&[mock_peak(2, 8.0, 100.0, 50_000.0)], &mode);
        let composition = ClassificationResult::from_classified(&peaks, mode.vocabulary());
        let sample = Sample::new("sec", Trace::try_new(vec![0.0, 1.0], vec![0.0, 0.0]).unwrap());
        let row = ReportRow::build(&sample, &mode, &peaks, &composition, None, None);
        let json = serde_json::to_value(&row).unwrap();
        assert_eq!(json["Main_pct"], ">98.00");
        assert_eq!(json["HMW_pct"], 0.0);
        assert_eq!(json["regions"]["hmw_start"], serde_json::Value::Null);
    }
}
