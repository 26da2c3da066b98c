use derive_more::Display;
use derive_setters::Setters;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(transparent)]
pub struct ModelId(String);

impl ModelId {
    pub fn new<T: Into<String>>(id: T) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ModelId {
    fn from(value: String) -> Self {
        ModelId(value)
    }
}

impl From<&str> for ModelId {
    fn from(value: &str) -> Self {
        ModelId(value.to_string())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into, strip_option)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    /// Raw JSON text exactly as produced by the model.
    pub arguments: String,
}

impl ToolCall {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self { id: id.into(), name: name.into(), arguments: "{}".to_string() }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into, strip_option)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolCall>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    fn with_role(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), tool_calls: Vec::new(), tool_call_id: None }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content)
    }

    /// The observation returned for a tool call.
    pub fn tool_result(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self::with_role(Role::Tool, content).tool_call_id(call_id)
    }
}

/// A tool the model may call, with its argument schema.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

impl ToolDefinition {
    pub fn new<N: ToString>(name: N) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            input_schema: serde_json::json!({"type": "object", "properties": {}}),
        }
    }

    /// Builds the argument schema from a `JsonSchema` type.
    pub fn input<T: JsonSchema>(mut self) -> Self {
        let schema = schemars::schema_for!(T);
        self.input_schema = serde_json::to_value(&schema)
            .unwrap_or_else(|_| serde_json::json!({"type": "object"}));
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into, strip_option)]
pub struct ChatRequest {
    pub model: ModelId,
    pub messages: Vec<ChatMessage>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
}

impl ChatRequest {
    pub fn new(model: impl Into<ModelId>) -> Self {
        Self { model: model.into(), messages: Vec::new(), tools: Vec::new(), temperature: 0.0 }
    }

    pub fn add_message(mut self, message: ChatMessage) -> Self {
        self.messages.push(message);
        self
    }

    pub fn add_messages(mut self, messages: impl IntoIterator<Item = ChatMessage>) -> Self {
        self.messages.extend(messages);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(value: &str) -> Self {
        match value {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// The assistant turn produced by one completion call.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize, Setters)]
#[setters(into, strip_option)]
pub struct ChatCompletion {
    pub content: Option<String>,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: Option<FinishReason>,
}

impl ChatCompletion {
    pub fn text(content: impl Into<String>) -> Self {
        Self::default()
            .content(content)
            .finish_reason(FinishReason::Stop)
    }

    pub fn content_filtered() -> Self {
        Self::default().finish_reason(FinishReason::ContentFilter)
    }

    pub fn is_content_filtered(&self) -> bool {
        self.finish_reason == Some(FinishReason::ContentFilter)
    }

    pub fn text_or_empty(&self) -> &str {
        self.content.as_deref().unwrap_or_default()
    }

    /// The assistant message to replay into the next request.
    pub fn to_message(&self) -> ChatMessage {
        ChatMessage::assistant(self.text_or_empty()).tool_calls(self.tool_calls.clone())
    }
}
