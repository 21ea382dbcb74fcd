use std::fmt::Display;

/// Errors surfaced by the peak processing engine.
///
/// Every failure is scoped to a single trace/sample, nothing in here is
/// fatal for a batch. A trace without peaks is NOT an error, it produces
/// an empty peak list and an all-zero composition.
#[derive(Debug, Clone, PartialEq)]
pub enum ChromaError {
    /// Malformed configuration (even smoothing window, order >= window,
    /// non-positive thresholds ...).
    InvalidParameter {
        param: &'static str,
        context: String,
    },
    /// Not enough data to do the requested operation, for instance a trace
    /// shorter than the smoothing window or fewer than 2 calibration points.
    InsufficientData {
        real: usize,
        expected: usize,
        context: String,
    },
    /// The input trace itself is malformed (non-finite or decreasing positions,
    /// mismatched column lengths).
    InvalidTrace { context: String },
}

impl Display for ChromaError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChromaError::InvalidParameter { param, context } => {
                write!(f, "Invalid parameter `{}`: {}", param, context)
            }
            ChromaError::InsufficientData {
                real,
                expected,
                context,
            } => write!(
                f,
                "Insufficient data, got {} but expected at least {}: {}",
                real, expected, context
            ),
            ChromaError::InvalidTrace { context } => write!(f, "Invalid trace: {}", context),
        }
    }
}

impl std::error::Error for ChromaError {}

impl ChromaError {
    pub fn invalid_parameter(param: &'static str, context: impl Display) -> Self {
        Self::InvalidParameter {
            param,
            context: context.to_string(),
        }
    }

    pub fn insufficient_data(real: usize, expected: usize, context: impl Display) -> Self {
        Self::InsufficientData {
            real,
            expected,
            context: context.to_string(),
        }
    }

    pub fn invalid_trace(context: impl Display) -> Self {
        Self::InvalidTrace {
            context: context.to_string(),
        }
    }

    pub fn append_to_context(mut self, context: &str) -> Self {
        match &mut self {
            ChromaError::InvalidParameter {
                context: owned_context,
                ..
            } => owned_context.push_str(context),
            ChromaError::InsufficientData {
                context: owned_context,
                ..
            } => owned_context.push_str(context),
            ChromaError::InvalidTrace {
                context: owned_context,
            } => owned_context.push_str(context),
        }
        self
    }
}

pub type Result<T> = std::result::Result<T, ChromaError>;
