use chromaseek::ChromaError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Analysis error: {0}")]
    Engine(#[from] ChromaError),

    #[error("Progress bar template error: {0}")]
    ProgressTemplate(#[from] indicatif::style::TemplateError),

    #[error("Logging setup error: {0}")]
    Logging(#[from] tracing::subscriber::SetGlobalDefaultError),

    #[error("Data reading error: {0}")]
    DataReading(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),
}
