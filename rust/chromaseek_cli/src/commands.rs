use crate::cli::{
    AnalyzeArgs,
    CalibrateMwArgs,
    StandardCurveArgs,
    WriteTemplateArgs,
};
use crate::error::CliError;
use crate::io::{
    read_records,
    read_trace_file,
};
use chromaseek::calibration::{
    MwEstimate,
    Quantitation,
    pair_standards,
};
use chromaseek::{
    AnalysisConfig,
    MwCalibration,
    MwStandard,
    PeakDetector,
    Sample,
    SampleReport,
    StandardCurve,
    StandardPoint,
    analyze_batch,
};
use indicatif::{
    ProgressIterator,
    ProgressStyle,
};
use serde::de::DeserializeOwned;
use serde::{
    Deserialize,
    Serialize,
};
use std::path::{
    Path,
    PathBuf,
};
use tabled::builder::Builder;
use tabled::settings::Style;
use tracing::{
    info,
    warn,
};

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})";

/// Main function for the 'analyze' subcommand.
pub fn main_analyze(args: AnalyzeArgs) -> Result<(), CliError> {
    let config = build_config(&args)?;
    info!("Using analysis settings: {:#?}", config);
    let calibration = match &args.calibration {
        Some(path) => {
            let calibration: MwCalibration = read_json(path)?;
            info!("Using molecular weight calibration: {:?}", calibration.summary());
            Some(calibration)
        }
        None => None,
    };

    let samples = load_samples(&args.inputs)?
        .into_iter()
        .map(|sample| {
            let sample = match args.injection_volume {
                Some(volume) => sample.with_injection_volume(volume),
                None => sample,
            };
            match args.expected_mw {
                Some(mw) => sample.with_expected_mw(mw),
                None => sample,
            }
        })
        .collect::<Vec<_>>();
    info!("Loaded {} samples", samples.len());

    let mut reports: Vec<SampleReport> = Vec::with_capacity(samples.len());
    for (sample, result) in samples.iter().zip(analyze_batch(&samples, &config, calibration.as_ref())) {
        match result {
            Ok(report) => reports.push(report),
            Err(e) => warn!("Skipping {}: {}", sample.id, e),
        }
    }

    std::fs::create_dir_all(&args.output_dir)?;
    let reports_path = args.output_dir.join("reports.json");
    std::fs::write(&reports_path, serde_json::to_string_pretty(&reports)?)?;
    let rows: Vec<_> = reports.iter().map(|r| &r.row).collect();
    let summary_path = args.output_dir.join("summary.json");
    std::fs::write(&summary_path, serde_json::to_string_pretty(&rows)?)?;

    println!("{}", composition_table(&reports));
    println!("Wrote to {}", reports_path.display());
    println!("Wrote to {}", summary_path.display());
    Ok(())
}

fn build_config(args: &AnalyzeArgs) -> Result<AnalysisConfig, CliError> {
    let mut config = match &args.config {
        Some(path) => read_json::<AnalysisConfig>(path)?,
        None => {
            info!("No config provided, using defaults");
            AnalysisConfig::default()
        }
    };
    if let Some(prominence) = args.prominence {
        config.peaks.prominence = prominence;
    }
    if let Some(min_separation) = args.min_separation {
        config.peaks.min_separation = min_separation;
    }
    if args.max_peaks.is_some() {
        config.peaks.max_peaks = args.max_peaks;
    }
    if let Some(drop_ratio) = args.drop_ratio {
        config.valleys.drop_ratio = drop_ratio;
    }
    config.validate()?;
    Ok(config)
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, CliError> {
    let contents = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&contents)?)
}

fn load_samples(paths: &[PathBuf]) -> Result<Vec<Sample>, CliError> {
    let style = ProgressStyle::with_template(PROGRESS_TEMPLATE)?;
    let mut samples = Vec::new();
    for path in paths.iter().progress_with_style(style) {
        samples.extend(read_trace_file(path)?);
    }
    Ok(samples)
}

fn composition_table(reports: &[SampleReport]) -> String {
    let mut builder = Builder::default();
    let mut header = vec!["sample".to_string(), "mode".to_string(), "peaks".to_string()];
    // Columns follow the first report, mixed modes only happen across runs
    if let Some(first) = reports.first() {
        header.extend(first.row.percentages().iter().map(|(name, _)| name.to_string()));
    }
    builder.push_record(header);
    for report in reports {
        let mut record = vec![
            report.sample_id.clone(),
            report.mode.to_string(),
            report.peaks.len().to_string(),
        ];
        record.extend(report.row.percentages().iter().map(|(_, pct)| pct.to_string()));
        builder.push_record(record);
    }
    builder.build().with(Style::rounded()).to_string()
}

/// Table cell for values that only exist with enough calibration points.
fn optional_cell(value: Option<f64>, decimals: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.*}", decimals, v))
}

#[derive(Debug, Serialize)]
struct MwCalibrationOutput {
    calibration: MwCalibration,
    standards: Vec<MwStandard>,
    estimates: Vec<MwEstimate>,
}

/// Main function for the 'calibrate-mw' subcommand.
pub fn main_calibrate_mw(args: CalibrateMwArgs) -> Result<(), CliError> {
    let standards = match (&args.standards, &args.ladder) {
        (Some(path), None) => read_records::<MwStandard>(path)?,
        (None, Some(path)) => ladder_standards(path, &args.weights, args.config.as_deref())?,
        _ => {
            return Err(CliError::InvalidArguments(
                "Provide either --standards or --ladder".to_string(),
            ));
        }
    };
    info!("Fitting molecular weight calibration on {} standards", standards.len());

    let calibration = MwCalibration::fit(&standards)?;
    let summary = calibration.summary();
    info!(
        "ln(MW) = {:.5} * position + {:.5} (R2 = {:.5})",
        summary.slope, summary.intercept, summary.r_squared
    );

    let estimates: Vec<MwEstimate> = args.estimate.iter().map(|&x| calibration.estimate(x)).collect();
    if !estimates.is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["position", "estimated_mw", "lower", "upper"]);
        for est in estimates.iter() {
            builder.push_record([
                format!("{:.3}", est.position),
                format!("{:.1}", est.estimated_mw),
                optional_cell(est.lower, 1),
                optional_cell(est.upper, 1),
            ]);
        }
        println!("{}", builder.build().with(Style::rounded()));
    }

    // Only the calibration itself is read back by `analyze`
    std::fs::write(&args.output_path, serde_json::to_string_pretty(&calibration)?)?;
    let details_path = args.output_path.with_extension("details.json");
    let output = MwCalibrationOutput {
        calibration,
        standards,
        estimates,
    };
    std::fs::write(&details_path, serde_json::to_string_pretty(&output)?)?;
    println!("Wrote to {}", args.output_path.display());
    println!("Wrote to {}", details_path.display());
    Ok(())
}

fn ladder_standards(
    path: &Path,
    weights: &[f64],
    config: Option<&Path>,
) -> Result<Vec<MwStandard>, CliError> {
    let config = match config {
        Some(path) => read_json::<AnalysisConfig>(path)?,
        None => AnalysisConfig::default(),
    };
    let detector = PeakDetector::from_config(&config)?;
    let mut samples = read_trace_file(path)?;
    if samples.len() != 1 {
        return Err(CliError::DataReading(format!(
            "Expected a single ladder channel in {}, found {}",
            path.display(),
            samples.len()
        )));
    }
    let ladder = samples.remove(0);
    let detection = detector.detect(&ladder.trace)?;
    info!("Found {} ladder peaks", detection.peaks.len());
    Ok(pair_standards(&detection.peaks, weights)?)
}

#[derive(Debug, Deserialize)]
struct QuantitationInput {
    sample_id: String,
    #[serde(alias = "area")]
    response: f64,
    #[serde(default = "unit_dilution")]
    dilution: f64,
}

fn unit_dilution() -> f64 {
    1.0
}

#[derive(Debug, Serialize)]
struct QuantitationOutput {
    sample_id: String,
    response: f64,
    dilution: f64,
    #[serde(flatten)]
    result: Quantitation,
}

/// Main function for the 'standard-curve' subcommand.
pub fn main_standard_curve(args: StandardCurveArgs) -> Result<(), CliError> {
    let points: Vec<StandardPoint> = read_records(&args.standards)?;
    let curve = StandardCurve::fit(&points)?;
    let model = curve.model();
    info!(
        "response = {:.5} * concentration + {:.5} (R2 = {:.5}, {} points)",
        model.slope, model.intercept, model.r_squared, model.n
    );

    let inputs: Vec<QuantitationInput> = read_records(&args.samples)?;
    let mut outputs = Vec::with_capacity(inputs.len());
    for input in inputs {
        match curve.quantify(input.response, input.dilution) {
            Ok(result) => outputs.push(QuantitationOutput {
                sample_id: input.sample_id,
                response: input.response,
                dilution: input.dilution,
                result,
            }),
            Err(e) => warn!("Could not quantify {}: {}", input.sample_id, e),
        }
    }

    let mut builder = Builder::default();
    builder.push_record(["sample", "response", "dilution", "concentration", "+/-"]);
    for out in outputs.iter() {
        builder.push_record([
            out.sample_id.clone(),
            format!("{:.2}", out.response),
            format!("{}", out.dilution),
            format!("{:.4}", out.result.concentration),
            optional_cell(out.result.uncertainty, 4),
        ]);
    }
    println!("{}", builder.build().with(Style::rounded()));

    if let Some(path) = &args.output_path {
        std::fs::write(path, serde_json::to_string_pretty(&outputs)?)?;
        println!("Wrote to {}", path.display());
    }
    Ok(())
}

const REDUCED_TEMPLATE: &str = r#"{
    "smoothing": {
        "window": 11,
        "polynomial": 3
    },
    "peaks": {
        "prominence": 0.05,
        "min_separation": 0.3,
        "max_peaks": null
    },
    "valleys": {
        "search_window": 3.0,
        "drop_ratio": 0.2
    },
    "marker": {
        "position": 4.5,
        "search_half_width": 0.5,
        "skip": 0.3
    },
    "classification": {
        "mode": "reduced"
    }
}"#;

const NON_REDUCED_TEMPLATE: &str = r#"{
    "smoothing": {
        "window": 11,
        "polynomial": 3
    },
    "peaks": {
        "prominence": 0.05,
        "min_separation": 0.3,
        "max_peaks": null
    },
    "valleys": {
        "search_window": 3.0,
        "drop_ratio": 0.2
    },
    "marker": {
        "position": 4.5,
        "search_half_width": 0.5,
        "skip": 0.3
    },
    "classification": {
        "mode": "non_reduced",
        "intact_position": null
    }
}"#;

const SEC_TEMPLATE: &str = r#"{
    "smoothing": {
        "window": 11,
        "polynomial": 3
    },
    "peaks": {
        "prominence": 0.05,
        "min_separation": 0.3,
        "max_peaks": null
    },
    "valleys": {
        "search_window": 1.0,
        "drop_ratio": 0.2
    },
    "classification": {
        "mode": "reference_relative",
        "main_peak_position": 8.5,
        "lmw_cutoff": 12.0,
        "lod_area_floor": 1000.0
    }
}"#;

const CIEF_TEMPLATE: &str = r#"{
    "smoothing": {
        "window": 11,
        "polynomial": 3
    },
    "peaks": {
        "prominence": 1.0,
        "min_separation": 0.3,
        "max_peaks": null
    },
    "valleys": {
        "search_window": 3.0,
        "drop_ratio": 0.2
    },
    "pi_markers": {
        "baseline_cutoff": 1.0,
        "values": [10.0, 9.5, 5.5, 4.0]
    },
    "classification": {
        "mode": "reduced"
    }
}"#;

const MW_STANDARDS_TEMPLATE: &str = "position,molecular_weight
6.1,670000
7.4,158000
8.6,44000
9.5,17000
10.8,1350
";

/// Main function for the 'write-template' subcommand.
pub fn main_write_template(args: WriteTemplateArgs) -> Result<(), CliError> {
    let target_dir = args.output_path;
    std::fs::create_dir_all(&target_dir)?;

    let reduced_path = target_dir.join("reduced_template.json");
    let non_reduced_path = target_dir.join("non_reduced_template.json");
    let sec_path = target_dir.join("sec_template.json");
    let cief_path = target_dir.join("cief_template.json");
    std::fs::write(&reduced_path, REDUCED_TEMPLATE)?;
    std::fs::write(&non_reduced_path, NON_REDUCED_TEMPLATE)?;
    std::fs::write(&sec_path, SEC_TEMPLATE)?;
    std::fs::write(&cief_path, CIEF_TEMPLATE)?;
    println!(
        "Wrote analysis templates to:\n- {}\n- {}\n- {}\n- {}",
        reduced_path.display(),
        non_reduced_path.display(),
        sec_path.display(),
        cief_path.display()
    );

    let standards_path = target_dir.join("mw_standards_template.csv");
    std::fs::write(&standards_path, MW_STANDARDS_TEMPLATE)?;
    println!(
        "Wrote molecular weight standards template to: {}",
        standards_path.display()
    );
    Ok(())
}
