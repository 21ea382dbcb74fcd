use chromaseek::calibration::MwEstimate;
use chromaseek::pipeline::PeakDetector;
use chromaseek::report::ReportRow;
use chromaseek::{
    AnalysisConfig,
    ClassificationMode,
    MwCalibration,
    MwStandard,
    PeakClass,
    PercentValue,
    Sample,
    Trace,
    analyze_batch,
    analyze_sample,
};

/// Sum of gaussians `(center, height, sigma)` sampled every `step` on `[0, end]`.
fn synthetic_trace(peaks: &[(f64, f64, f64)], end: f64, step: f64) -> Trace {
    let n = (end / step).round() as usize;
    Trace::from_pairs((0..=n).map(|i| {
        let t = i as f64 * step;
        let y = peaks
            .iter()
            .map(|(c, h, s)| h * (-(t - c).powi(2) / (2.0 * s * s)).exp())
            .sum();
        (t, y)
    }))
    .unwrap()
}

fn reduced_sample() -> Sample {
    Sample::new(
        "reduced",
        synthetic_trace(
            &[(5.0, 50.0, 0.2), (8.0, 100.0, 0.2), (12.0, 90.0, 0.2)],
            16.0,
            0.01,
        ),
    )
}

fn sec_mode(main_peak_position: f64) -> ClassificationMode {
    ClassificationMode::ReferenceRelative {
        main_peak_position,
        lmw_cutoff: Some(14.0),
        lod_area_floor: 1000.0,
    }
}

#[test]
fn test_two_tallest_ordering() {
    let report = analyze_sample(&reduced_sample(), &AnalysisConfig::default(), None).unwrap();
    assert_eq!(report.peaks.len(), 3);

    let labelled: Vec<(f64, PeakClass)> = report
        .peaks
        .iter()
        .map(|p| (p.position, p.class_or_unclassified()))
        .collect();
    assert!((labelled[0].0 - 5.0).abs() < 0.02);
    assert_eq!(labelled[0].1, PeakClass::Lmw);
    assert!((labelled[1].0 - 8.0).abs() < 0.02);
    assert_eq!(labelled[1].1, PeakClass::LightChain);
    assert!((labelled[2].0 - 12.0).abs() < 0.02);
    assert_eq!(labelled[2].1, PeakClass::HeavyChain);

    // Areas follow the heights, same widths
    let areas: Vec<f64> = report.peaks.iter().map(|p| p.area).collect();
    assert!(areas[1] > areas[2] && areas[2] > areas[0]);
    for peak in report.peaks.iter() {
        assert!(peak.start_position < peak.position && peak.position < peak.end_position);
        assert!(peak.area > 0.0);
    }
}

#[test]
fn test_composition_closure() {
    let modes = [
        ClassificationMode::Reduced,
        ClassificationMode::NonReduced {
            intact_position: None,
        },
        sec_mode(8.0),
    ];
    for mode in modes {
        let config = AnalysisConfig::default().with_classification(mode.clone());
        let report = analyze_sample(&reduced_sample(), &config, None).unwrap();
        let sum = report.composition.percent_sum();
        assert!(
            (sum - 100.0).abs() < 0.01,
            "{} percentages add up to {}",
            mode.name(),
            sum
        );
    }
}

#[test]
fn test_flat_trace_has_no_peaks() {
    let trace = Trace::from_pairs((0..500).map(|i| (i as f64 * 0.02, 5.0))).unwrap();
    let modes = [ClassificationMode::Reduced, sec_mode(3.0)];
    for mode in modes {
        let config = AnalysisConfig::default().with_classification(mode);
        let report = analyze_sample(&Sample::new("flat", trace.clone()), &config, None).unwrap();
        assert!(report.peaks.is_empty());
        assert!(report.composition.percentages.values().all(|&p| p == 0.0));
        for (_, pct) in report.row.percentages() {
            assert_eq!(pct, PercentValue::Value(0.0));
        }
    }
}

#[test]
fn test_shoulder_spike_is_rejected() {
    // Narrow bump riding on the flank of a broad peak
    let trace = synthetic_trace(&[(10.0, 100.0, 1.5), (11.5, 20.0, 0.1)], 20.0, 0.02);
    let mut config = AnalysisConfig::default();
    config.valleys.search_window = 0.5;

    let detection = PeakDetector::from_config(&config)
        .unwrap()
        .detect(&trace)
        .unwrap();
    let smoothed = detection.smoothed.unwrap();
    let located_spike = detection
        .candidates
        .iter()
        .any(|c| (smoothed.position(c.index) - 11.5).abs() < 0.1);
    assert!(located_spike, "the spike should be located");
    assert!(
        detection
            .peaks
            .iter()
            .all(|p| (p.position - 11.5).abs() > 0.2),
        "the spike should not be resolved"
    );
}

#[test]
fn test_reference_relative_lod_bound() {
    let sample = Sample::new(
        "sec",
        synthetic_trace(&[(8.0, 10_000.0, 0.2)], 16.0, 0.01),
    );
    let config = AnalysisConfig::default().with_classification(sec_mode(8.0));
    let report = analyze_sample(&sample, &config, None).unwrap();
    assert_eq!(report.peaks.len(), 1);
    assert_eq!(report.peaks[0].class_label, Some(PeakClass::Main));

    let total = report.composition.total_area;
    let row = match &report.row {
        ReportRow::ReferenceRelative(row) => row,
        other => panic!("unexpected row {:?}", other),
    };
    let expected = ((100.0 - 1000.0 / total * 100.0) * 100.0).round() / 100.0;
    assert_eq!(row.main_pct, PercentValue::AtLeast(expected));

    let json = serde_json::to_value(&report.row).unwrap();
    let main_pct = json["Main_pct"].as_str().unwrap();
    assert!(main_pct.starts_with('>'));
    assert_eq!(json["HMW_pct"], 0.0);
    assert_eq!(json["LMW_pct"], 0.0);
}

#[test]
fn test_mw_calibration_round_trip() {
    // ln(MW) = 2 t + 1
    let standards: Vec<MwStandard> = (1..=5)
        .map(|i| {
            let t = i as f64 * 0.7;
            MwStandard {
                position: t,
                molecular_weight: (2.0 * t + 1.0).exp(),
            }
        })
        .collect();
    let calibration = MwCalibration::fit(&standards).unwrap();
    let summary = calibration.summary();
    assert!((summary.slope - 2.0).abs() < 1e-9);
    assert!((summary.intercept - 1.0).abs() < 1e-9);
    assert!((summary.r_squared - 1.0).abs() < 1e-12);

    let MwEstimate { estimated_mw, .. } = calibration.estimate(3.0);
    assert!((estimated_mw / 7f64.exp() - 1.0).abs() < 1e-9);
}

#[test]
fn test_sec_report_with_mw() {
    // ln(MW) = -0.5 t + 16, main species at 8.0
    let standards: Vec<MwStandard> = [4.0, 6.0, 10.0, 12.0]
        .iter()
        .map(|&t: &f64| MwStandard {
            position: t,
            molecular_weight: (-0.5 * t + 16.0).exp(),
        })
        .collect();
    let calibration = MwCalibration::fit(&standards).unwrap();

    let sample = Sample::new(
        "sec_mw",
        synthetic_trace(
            &[(6.5, 300.0, 0.2), (8.0, 10_000.0, 0.2), (10.0, 200.0, 0.2)],
            16.0,
            0.01,
        ),
    )
    .with_injection_volume(10.0)
    .with_expected_mw(160_000.0);
    let mut config = AnalysisConfig::default().with_classification(sec_mode(8.0));
    // Keep the main peak valleys inside its own base
    config.valleys.search_window = 0.6;
    let report = analyze_sample(&sample, &config, Some(&calibration)).unwrap();

    let classes: Vec<PeakClass> = report
        .peaks
        .iter()
        .map(|p| p.class_or_unclassified())
        .collect();
    assert_eq!(classes, vec![PeakClass::Hmw, PeakClass::Main, PeakClass::Lmw]);
    assert!(report.peaks.iter().all(|p| p.estimated_mw.is_some()));

    let row = match &report.row {
        ReportRow::ReferenceRelative(row) => row,
        other => panic!("unexpected row {:?}", other),
    };
    let expected_mw = 12f64.exp();
    let main_mw = row.main_peak_mw.unwrap();
    assert!((main_mw / expected_mw - 1.0).abs() < 1e-6);
    let deviation = ((expected_mw - 160_000.0) / 160_000.0 * 100.0 * 100.0).round() / 100.0;
    assert!((row.mw_deviation_pct.unwrap() - deviation).abs() < 0.011);

    let total = report.composition.total_area;
    assert!((row.normalized_total_area.unwrap() - total / 10.0).abs() < 0.01);
    let regions = row.regions.unwrap();
    assert!(regions.hmw_start.unwrap() < regions.hmw_end);
    assert!(regions.lmw_end.unwrap() > regions.lmw_start);
    assert!(!row.main_pct.is_bound());
}

#[test]
fn test_pipeline_is_idempotent() {
    let config = AnalysisConfig::default().with_classification(ClassificationMode::NonReduced {
        intact_position: Some(8.0),
    });
    let sample = reduced_sample();
    let first = analyze_sample(&sample, &config, None).unwrap();
    let second = analyze_sample(&sample, &config, None).unwrap();
    assert_eq!(first, second);

    let batch = analyze_batch(&[sample.clone(), sample], &config, None);
    for result in batch {
        assert_eq!(result.unwrap(), first);
    }
}

#[test]
fn test_invalid_config_is_reported() {
    let mut config = AnalysisConfig::default();
    config.smoothing.polynomial = 11;
    let err = analyze_sample(&reduced_sample(), &config, None).unwrap_err();
    assert!(matches!(
        err,
        chromaseek::ChromaError::InvalidParameter {
            param: "smoothing.polynomial",
            ..
        }
    ));
}

#[test]
fn test_repeated_positions_keep_bounds_around_apex() {
    let base = synthetic_trace(
        &[(5.0, 50.0, 0.2), (8.0, 100.0, 0.2), (12.0, 90.0, 0.2)],
        16.0,
        0.02,
    );
    // Every sample recorded twice
    let trace = Trace::from_pairs(
        base.positions()
            .iter()
            .zip(base.signal().iter())
            .flat_map(|(&x, &y)| [(x, y), (x, y)]),
    )
    .unwrap();

    let report = analyze_sample(&Sample::new("doubled", trace), &AnalysisConfig::default(), None)
        .unwrap();
    assert!(!report.peaks.is_empty());
    for peak in report.peaks.iter() {
        assert!(
            peak.start_position < peak.position && peak.position < peak.end_position,
            "bounds [{}, {}] do not surround {}",
            peak.start_position,
            peak.end_position,
            peak.position
        );
    }
}
