use thiserror::Error;

/// Failures raised while answering a question.
///
/// Components return `anyhow::Result` carrying one of these variants so that
/// callers can recover the kind with `downcast_ref`.
#[derive(Debug, Error)]
pub enum Error {
    #[error("Could not classify the question: {0}")]
    Classification(#[source] anyhow::Error),

    #[error("Could not translate the question into a pipeline: {0}")]
    Translation(#[source] anyhow::Error),

    #[error("Could not rephrase the question for retrieval: {0}")]
    Rephrase(#[source] anyhow::Error),

    #[error("Could not parse the generated pipeline: {reason}")]
    Parse {
        original: String,
        cleaned: String,
        reason: String,
    },

    #[error("Pipeline must contain at least one stage")]
    EmptyPipeline,

    #[error("Invalid pipeline stage: {0}")]
    InvalidStage(String),

    #[error("Pipeline execution failed: {0}")]
    Execution(#[source] anyhow::Error),

    #[error("Chart code generation failed: {0}")]
    Synthesis(#[source] anyhow::Error),

    #[error("Chart rendering failed: {0}")]
    Render(String),

    #[error("Conversation exceeded the limit of {limit} steps")]
    StepLimitExceeded { limit: usize },

    #[error("Retryable completion failure: {0}")]
    Retryable(#[source] anyhow::Error),

    #[error("Invalid tool call arguments: {0}")]
    ToolCallArgument(#[source] serde_json::Error),

    #[error("Tool {0} not found")]
    UnknownTool(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_step_limit_message() {
        let actual = Error::StepLimitExceeded { limit: 100 }.to_string();
        let expected = "Conversation exceeded the limit of 100 steps";
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_downcast_from_anyhow() {
        let fixture: anyhow::Error = Error::Execution(anyhow::anyhow!("boom")).into();
        let actual = fixture
            .downcast_ref::<Error>()
            .is_some_and(|e| matches!(e, Error::Execution(_)));
        assert!(actual);
    }
}
