use thiserror::Error;

#[derive(Debug, Error)]
pub enum AggregateError {
    #[error("Unsupported pipeline stage '{0}'")]
    UnsupportedStage(String),

    #[error("Unsupported operator '{0}'")]
    UnsupportedOperator(String),

    #[error("Invalid argument for '{operator}': {reason}")]
    InvalidArgument { operator: String, reason: String },

    #[error("Invalid regular expression: {0}")]
    Regex(#[from] regex::Error),
}

impl AggregateError {
    pub fn invalid(operator: &str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument { operator: operator.to_string(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, AggregateError>;
