#![doc = include_str!("../README.md")]

// Declare modules
pub mod calibration;
pub mod classification;
pub mod composition;
pub mod config;
pub mod errors;
pub mod integration;
pub mod models;
pub mod peak_locator;
pub mod pipeline;
pub mod report;
pub mod smoothing;
pub mod utils;
pub mod valleys;

// Re-export main structures
pub use crate::calibration::{
    CalibrationModel,
    MwCalibration,
    MwStandard,
    PiCalibration,
    StandardCurve,
    StandardPoint,
};
pub use crate::classification::{
    ClassificationMode,
    classify,
};
pub use crate::composition::{
    ClassificationResult,
    PercentValue,
};
pub use crate::config::AnalysisConfig;
pub use crate::models::{
    Peak,
    PeakClass,
    Sample,
    Trace,
};
pub use crate::pipeline::{
    PeakDetector,
    SampleReport,
    analyze_batch,
    analyze_sample,
};
pub use crate::report::ReportRow;

// Re-export errors
pub use crate::errors::{
    ChromaError,
    Result,
};
