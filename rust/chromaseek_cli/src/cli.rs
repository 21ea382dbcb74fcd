use clap::{
    Parser,
    Subcommand,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Detect, integrate and classify the peaks of one or more traces.
    Analyze(AnalyzeArgs),
    /// Fit a molecular weight calibration from ladder standards.
    CalibrateMw(CalibrateMwArgs),
    /// Fit a standard curve and quantify samples against it.
    StandardCurve(StandardCurveArgs),
    /// Write template configuration files.
    WriteTemplate(WriteTemplateArgs),
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    /// CSV traces, first column is the position, every other column a channel.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    /// The path to the json file with the analysis settings.
    /// Defaults (reduced CE-SDS) are used when missing.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// The directory where the reports are written.
    #[arg(short, long)]
    pub output_dir: PathBuf,

    /// Molecular weight calibration, as written by `calibrate-mw`.
    #[arg(long)]
    pub calibration: Option<PathBuf>,

    /// Overrides `peaks.prominence`.
    #[arg(long)]
    pub prominence: Option<f64>,

    /// Overrides `peaks.min_separation`.
    #[arg(long)]
    pub min_separation: Option<f64>,

    /// Overrides `peaks.max_peaks`.
    #[arg(long)]
    pub max_peaks: Option<usize>,

    /// Overrides `valleys.drop_ratio`.
    #[arg(long)]
    pub drop_ratio: Option<f64>,

    /// Injection volume applied to every sample (normalizes SEC total areas).
    #[arg(long)]
    pub injection_volume: Option<f64>,

    /// Expected molecular weight of the main species (SEC MW deviation).
    #[arg(long)]
    pub expected_mw: Option<f64>,
}

#[derive(Parser, Debug, Clone)]
pub struct CalibrateMwArgs {
    /// CSV with `position` and `molecular_weight` columns.
    #[arg(short, long, conflicts_with = "ladder")]
    pub standards: Option<PathBuf>,

    /// Ladder trace (CSV), its peaks are paired in elution order with `--weights`.
    #[arg(short, long, requires = "weights")]
    pub ladder: Option<PathBuf>,

    /// Known molecular weights of the ladder, in elution order.
    #[arg(short, long, value_delimiter = ',')]
    pub weights: Vec<f64>,

    /// Analysis settings used to find the ladder peaks.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Where to write the calibration (json).
    #[arg(short, long)]
    pub output_path: PathBuf,

    /// Positions to report molecular weight estimates for.
    #[arg(short, long, value_delimiter = ',')]
    pub estimate: Vec<f64>,
}

#[derive(Parser, Debug, Clone)]
pub struct StandardCurveArgs {
    /// CSV with `concentration` and `response` (or `area`) columns.
    #[arg(short, long)]
    pub standards: PathBuf,

    /// CSV with `sample_id`, `response` (or `area`) and, optionally, `dilution` columns.
    #[arg(short = 'q', long)]
    pub samples: PathBuf,

    /// Where to write the quantitation results (json).
    #[arg(short, long)]
    pub output_path: Option<PathBuf>,
}

#[derive(Parser, Debug)]
pub struct WriteTemplateArgs {
    /// The path to the output files.
    #[arg(short, long)]
    pub output_path: PathBuf,
}
