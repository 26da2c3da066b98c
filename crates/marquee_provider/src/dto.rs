//! Wire types for the OpenAI-compatible chat completions endpoint.

use marquee_domain::{
    ChatCompletion, ChatMessage, ChatRequest, FinishReason, Role, ToolCall, ToolDefinition,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct Request {
    pub model: String,
    pub messages: Vec<Message>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<Vec<Tool>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCallDto>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallDto {
    pub id: String,
    #[serde(rename = "type", default = "function_type")]
    pub kind: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    #[serde(default)]
    pub arguments: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    #[serde(rename = "type")]
    pub kind: String,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, Serialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Response {
    #[serde(default)]
    pub choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Choice {
    pub message: Message,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
}

fn function_type() -> String {
    "function".to_string()
}

fn role_name(role: Role) -> &'static str {
    match role {
        Role::System => "system",
        Role::User => "user",
        Role::Assistant => "assistant",
        Role::Tool => "tool",
    }
}

impl From<ChatMessage> for Message {
    fn from(message: ChatMessage) -> Self {
        let tool_calls = (!message.tool_calls.is_empty()).then(|| {
            message
                .tool_calls
                .into_iter()
                .map(|call| ToolCallDto {
                    id: call.id,
                    kind: function_type(),
                    function: FunctionCall { name: call.name, arguments: call.arguments },
                })
                .collect()
        });
        Self {
            role: role_name(message.role).to_string(),
            content: Some(message.content),
            tool_calls,
            tool_call_id: message.tool_call_id,
        }
    }
}

impl From<ToolDefinition> for Tool {
    fn from(tool: ToolDefinition) -> Self {
        Self {
            kind: function_type(),
            function: FunctionDefinition {
                name: tool.name,
                description: tool.description,
                parameters: tool.input_schema,
            },
        }
    }
}

impl From<ChatRequest> for Request {
    fn from(request: ChatRequest) -> Self {
        let tools = (!request.tools.is_empty())
            .then(|| request.tools.into_iter().map(Tool::from).collect());
        Self {
            model: request.model.as_str().to_string(),
            messages: request.messages.into_iter().map(Message::from).collect(),
            temperature: request.temperature,
            tools,
        }
    }
}

impl From<Choice> for ChatCompletion {
    fn from(choice: Choice) -> Self {
        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| ToolCall::new(call.id, call.function.name).arguments(call.function.arguments))
            .collect::<Vec<_>>();
        ChatCompletion {
            content: choice.message.content,
            tool_calls,
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::from),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_serialization() {
        let fixture = ChatRequest::new("gpt-4o")
            .add_message(ChatMessage::system("sys"))
            .add_message(
                ChatMessage::assistant("").tool_calls(vec![
                    ToolCall::new("call_1", "get_movies").arguments(r#"{"query":"x"}"#),
                ]),
            )
            .add_message(ChatMessage::tool_result("call_1", "[]"))
            .tools(vec![ToolDefinition::new("not_able_to_parse").description("fallback")]);

        let actual = serde_json::to_value(Request::from(fixture)).unwrap();
        let expected = json!({
            "model": "gpt-4o",
            "temperature": 0.0,
            "messages": [
                {"role": "system", "content": "sys"},
                {"role": "assistant", "content": "", "tool_calls": [
                    {"id": "call_1", "type": "function", "function": {"name": "get_movies", "arguments": "{\"query\":\"x\"}"}}
                ]},
                {"role": "tool", "content": "[]", "tool_call_id": "call_1"}
            ],
            "tools": [
                {"type": "function", "function": {"name": "not_able_to_parse", "description": "fallback", "parameters": {"type": "object", "properties": {}}}}
            ]
        });
        assert_eq!(actual, expected);
    }

    #[test]
    fn test_choice_conversion() {
        let fixture: Response = serde_json::from_value(json!({
            "choices": [{
                "message": {"role": "assistant", "content": null, "tool_calls": [
                    {"id": "c1", "type": "function", "function": {"name": "get_movies", "arguments": "{}"}}
                ]},
                "finish_reason": "tool_calls"
            }]
        }))
        .unwrap();

        let actual = ChatCompletion::from(fixture.choices.into_iter().next().unwrap());
        let expected = ChatCompletion::default()
            .tool_calls(vec![ToolCall::new("c1", "get_movies")])
            .finish_reason(FinishReason::ToolCalls);
        assert_eq!(actual, expected);
    }
}
