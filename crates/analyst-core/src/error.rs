use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalystError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    /// Mathematically undefined or economically meaningless input combination
    /// (discount rate at or below terminal growth, non-PSD correlation matrix,
    /// non-positive share count).
    #[error("Domain error: {0}")]
    Domain(String),

    #[error("Convergence failure: {function} did not converge after {iterations} iterations (delta: {last_delta:e})")]
    ConvergenceFailure {
        function: String,
        iterations: u32,
        last_delta: f64,
    },

    #[error("Insufficient data for {context}: need at least {required} observations, got {actual}")]
    InsufficientData {
        context: String,
        required: usize,
        actual: usize,
    },

    #[error("Division by zero in {context}")]
    DivisionByZero { context: String },

    #[error("Computation cancelled")]
    Cancelled,

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl AnalystError {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        AnalystError::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn insufficient(context: &str, required: usize, actual: usize) -> Self {
        AnalystError::InsufficientData {
            context: context.to_string(),
            required,
            actual,
        }
    }

    /// A Decimal computation whose result falls outside the representable range.
    pub(crate) fn overflow(context: &str) -> Self {
        AnalystError::Domain(format!("{context} overflows the decimal range"))
    }

    /// True for errors that describe the inputs of a single evaluation rather
    /// than a broken model (used to skip Monte Carlo trials).
    pub fn is_domain(&self) -> bool {
        matches!(self, AnalystError::Domain(_))
    }
}

impl From<serde_json::Error> for AnalystError {
    fn from(e: serde_json::Error) -> Self {
        AnalystError::SerializationError(e.to_string())
    }
}
