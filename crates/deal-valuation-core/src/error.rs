use thiserror::Error;

#[derive(Debug, Error)]
pub enum ValuationError {
    #[error("Invalid input for {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Unknown input field '{0}'")]
    UnknownField(String),

    #[error("Unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations")]
    ConvergenceFailure { function: String, iterations: u32 },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ValuationError {
    fn from(e: serde_json::Error) -> Self {
        ValuationError::SerializationError(e.to_string())
    }
}
