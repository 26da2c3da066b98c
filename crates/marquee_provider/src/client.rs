use std::fmt;

use anyhow::Context;
use marquee_domain::{ChatCompletion, ChatRequest, CompletionService, RetryConfig};
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use tracing::debug;
use url::Url;

use crate::dto::{ErrorResponse, Request, Response};
use crate::error::Error;
use crate::retry::into_retry;

/// Chat completions over any OpenAI-compatible HTTP endpoint.
#[derive(Clone)]
pub struct OpenAIProvider {
    client: reqwest::Client,
    base_url: Url,
    api_key: Option<String>,
    retry_config: RetryConfig,
}

impl fmt::Debug for OpenAIProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAIProvider")
            .field("base_url", &self.base_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

impl OpenAIProvider {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        retry_config: RetryConfig,
    ) -> anyhow::Result<Self> {
        // `Url::join` drops the last segment unless the base ends with a slash.
        let base_url = if base_url.ends_with('/') {
            base_url.to_string()
        } else {
            format!("{base_url}/")
        };
        let base_url = Url::parse(&base_url)
            .with_context(|| format!("Invalid provider url: {base_url}"))?;
        Ok(Self { client: reqwest::Client::new(), base_url, api_key, retry_config })
    }

    fn url(&self, path: &str) -> anyhow::Result<Url> {
        self.base_url
            .join(path)
            .with_context(|| format!("Failed to append {path} to base URL: {}", self.base_url))
    }

    fn headers(&self) -> anyhow::Result<HeaderMap> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(api_key) = &self.api_key {
            let value = HeaderValue::from_str(&format!("Bearer {api_key}"))
                .context("API key is not a valid header value")?;
            headers.insert(AUTHORIZATION, value);
        }
        Ok(headers)
    }

    async fn send(&self, request: ChatRequest) -> anyhow::Result<ChatCompletion> {
        let url = self.url("chat/completions")?;
        let body = Request::from(request);
        debug!(url = %url, model = %body.model, messages = body.messages.len(), "Sending chat request");

        let response = self
            .client
            .post(url)
            .headers(self.headers()?)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            let message = serde_json::from_str::<ErrorResponse>(&text)
                .map(|e| e.error.message)
                .unwrap_or(text);
            return Err(Error::InvalidStatusCode { status: status.as_u16(), message }.into());
        }

        let response: Response = serde_json::from_str(&text)
            .map_err(|e| Error::Api(format!("Malformed completion response: {e}")))?;
        let choice = response.choices.into_iter().next().ok_or(Error::EmptyResponse)?;
        let completion = ChatCompletion::from(choice);
        debug!(
            finish_reason = ?completion.finish_reason,
            tool_calls = completion.tool_calls.len(),
            "Received chat completion"
        );
        Ok(completion)
    }
}

#[async_trait::async_trait]
impl CompletionService for OpenAIProvider {
    async fn chat(&self, request: ChatRequest) -> anyhow::Result<ChatCompletion> {
        self.send(request)
            .await
            .map_err(|e| into_retry(e, &self.retry_config))
    }
}

#[cfg(test)]
mod tests {
    use marquee_domain::{ChatMessage, Error as DomainError, FinishReason, ToolCall};
    use pretty_assertions::assert_eq;

    use super::*;

    fn fixture(server: &mockito::ServerGuard) -> OpenAIProvider {
        OpenAIProvider::new(&server.url(), Some("sk-test".to_string()), RetryConfig::default())
            .unwrap()
    }

    fn request() -> ChatRequest {
        ChatRequest::new("gpt-4o").add_message(ChatMessage::user("Top movies of 2015?"))
    }

    #[tokio::test]
    async fn test_chat_returns_text() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":"Movies"},"finish_reason":"stop"}]}"#)
            .create_async()
            .await;

        let actual = fixture(&server).chat(request()).await.unwrap();
        let expected = ChatCompletion::text("Movies");

        mock.assert_async().await;
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_chat_returns_tool_calls() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(
                r#"{"choices":[{"message":{"role":"assistant","content":null,"tool_calls":[{"id":"call_1","type":"function","function":{"name":"get_movies","arguments":"{\"query\":\"best dramas\"}"}}]},"finish_reason":"tool_calls"}]}"#,
            )
            .create_async()
            .await;

        let actual = fixture(&server).chat(request()).await.unwrap();
        let expected = ChatCompletion::default()
            .tool_calls(vec![
                ToolCall::new("call_1", "get_movies").arguments(r#"{"query":"best dramas"}"#),
            ])
            .finish_reason(FinishReason::ToolCalls);
        assert_eq!(actual, expected);
    }

    #[tokio::test]
    async fn test_chat_content_filter() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices":[{"message":{"role":"assistant","content":null},"finish_reason":"content_filter"}]}"#)
            .create_async()
            .await;

        let actual = fixture(&server).chat(request()).await.unwrap();
        assert!(actual.is_content_filtered());
    }

    #[tokio::test]
    async fn test_rate_limit_is_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body(r#"{"error":{"message":"Rate limit reached","type":"requests"}}"#)
            .create_async()
            .await;

        let actual = fixture(&server).chat(request()).await.unwrap_err();

        assert!(matches!(actual.downcast_ref::<DomainError>(), Some(DomainError::Retryable(_))));
        assert!(format!("{:#}", actual).contains("Rate limit reached"));
    }

    #[tokio::test]
    async fn test_bad_request_is_not_retryable() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(400)
            .with_body(r#"{"error":{"message":"Invalid model"}}"#)
            .create_async()
            .await;

        let actual = fixture(&server).chat(request()).await.unwrap_err();

        assert!(actual.downcast_ref::<DomainError>().is_none());
        let expected = Error::InvalidStatusCode { status: 400, message: "Invalid model".to_string() };
        assert_eq!(actual.downcast_ref::<Error>().map(|e| e.to_string()), Some(expected.to_string()));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider =
            OpenAIProvider::new("https://api.openai.com/v1", Some("sk-secret".to_string()), RetryConfig::default())
                .unwrap();
        let actual = format!("{provider:?}");
        assert!(!actual.contains("sk-secret"));
        assert!(actual.contains("https://api.openai.com/v1/"));
    }
}
