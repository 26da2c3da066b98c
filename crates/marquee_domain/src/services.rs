use serde_json::Value;

use crate::{ChatCompletion, ChatMessage, ChatRequest, HistoryKind, Pipeline, SessionId};

/// Opaque chat-completion capability.
#[async_trait::async_trait]
pub trait CompletionService: Send + Sync + 'static {
    async fn chat(&self, request: ChatRequest) -> anyhow::Result<ChatCompletion>;
}

/// Executes aggregation pipelines against the movie collection.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync + 'static {
    /// Returns the raw documents produced by `pipeline`.
    async fn aggregate(&self, pipeline: &Pipeline) -> anyhow::Result<Vec<Value>>;
}

/// Append-only chat history keyed by session and conversation kind.
#[async_trait::async_trait]
pub trait HistoryStore: Send + Sync + 'static {
    async fn read(&self, session: &SessionId, kind: HistoryKind) -> Vec<ChatMessage>;
    async fn append(&self, session: &SessionId, kind: HistoryKind, messages: Vec<ChatMessage>);
}

/// Runs generated chart code with only `data` in scope.
#[async_trait::async_trait]
pub trait ChartSandbox: Send + Sync + 'static {
    /// Returns the value bound to `fig`, or `None` when the code did not
    /// bind one.
    async fn render(&self, code: &str, data: Value) -> anyhow::Result<Option<Value>>;
}
