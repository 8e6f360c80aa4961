//! OpenAI-compatible provider implementation.
//!
//! Works with OpenAI and any endpoint exposing `/chat/completions` with the
//! same request/response shape. One request per `complete()` call: failures
//! are classified and returned, never retried.

use std::time::Duration;

use async_trait::async_trait;
use codecoach_config::AppConfig;
use codecoach_core::error::ProviderError;
use codecoach_core::message::{ChatMessage, Role};
use codecoach_core::provider::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Upstream error bodies are cut to this many characters in error messages.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// An OpenAI-compatible chat-completion provider.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            timeout,
            client,
        })
    }

    /// Create an OpenAI provider with the default timeout (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Result<Self, ProviderError> {
        Self::new(
            "openai",
            "https://api.openai.com/v1",
            api_key,
            Duration::from_secs(60),
        )
    }

    /// Build the provider from the startup configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| ProviderError::NotConfigured("OPENAI_API_KEY is not set".into()))?;

        Self::new(
            "openai",
            config.api_url.as_str(),
            api_key,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    /// Convert our messages to the OpenAI wire format.
    fn to_api_messages(messages: &[ChatMessage]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| ApiMessage {
                role: m.role.as_str().to_string(),
                content: Some(m.content.clone()),
            })
            .collect()
    }

    /// Classify a `reqwest` failure that happened before or while reading
    /// the upstream answer.
    fn classify_send_error(&self, err: reqwest::Error) -> ProviderError {
        if err.is_timeout() {
            ProviderError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            ProviderError::Transport(error_chain(&err))
        }
    }
}

#[async_trait]
impl codecoach_core::Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let status = response.status();

        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Provider returned error");
            return Err(ProviderError::Upstream {
                status_code: Some(status.as_u16()),
                message: upstream_error_message(status.as_u16(), &error_body),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        let api_response: ApiResponse =
            serde_json::from_slice(&bytes).map_err(|e| ProviderError::Upstream {
                status_code: Some(status.as_u16()),
                message: format!("Failed to parse response: {e}"),
            })?;

        let choice =
            api_response
                .choices
                .into_iter()
                .next()
                .ok_or_else(|| ProviderError::Upstream {
                    status_code: Some(status.as_u16()),
                    message: "No choices in response".into(),
                })?;

        let usage = api_response.usage.map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        });

        Ok(ProviderResponse {
            message: ChatMessage::new(Role::Assistant, choice.message.content.unwrap_or_default()),
            usage,
            model: api_response.model,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| self.classify_send_error(e))?;

        Ok(response.status().is_success())
    }
}

/// Pull a human-readable reason out of an upstream error body.
///
/// OpenAI-shaped bodies (`{"error": {"message": ...}}`) yield the message;
/// anything else is passed through, truncated.
fn upstream_error_message(status: u16, body: &str) -> String {
    let parsed = serde_json::from_str::<serde_json::Value>(body).ok();
    if let Some(message) = parsed
        .as_ref()
        .and_then(|v| v["error"]["message"].as_str())
        .filter(|m| !m.is_empty())
    {
        return message.to_string();
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {status}")
    } else {
        trimmed.chars().take(MAX_ERROR_BODY_CHARS).collect()
    }
}

/// Flatten an error and its sources into one line.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str(": ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::post;
    use axum::{Json, Router};
    use codecoach_core::Provider;

    fn request(text: &str) -> ProviderRequest {
        ProviderRequest {
            model: "gpt-3.5-turbo".into(),
            messages: vec![ChatMessage::system("You are Code Coach."), ChatMessage::user(text)],
            temperature: 0.7,
            max_tokens: Some(900),
        }
    }

    /// Serve `router` on an ephemeral port and return its `/v1` base URL.
    async fn spawn_upstream(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn provider_for(base_url: &str, timeout: Duration) -> OpenAiCompatProvider {
        OpenAiCompatProvider::new("test", base_url, "sk-test", timeout).unwrap()
    }

    #[test]
    fn openai_constructor() {
        let provider = OpenAiCompatProvider::openai("sk-test").unwrap();
        assert_eq!(provider.name(), "openai");
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }

    #[test]
    fn from_config_requires_key() {
        let config = AppConfig::default();
        assert!(matches!(
            OpenAiCompatProvider::from_config(&config),
            Err(ProviderError::NotConfigured(_))
        ));
    }

    #[test]
    fn from_config_uses_url_and_timeout() {
        let config = AppConfig {
            api_key: Some("sk-test".into()),
            api_url: "http://localhost:11434/v1/".into(),
            request_timeout_secs: 15,
            ..AppConfig::default()
        };
        let provider = OpenAiCompatProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "http://localhost:11434/v1");
        assert_eq!(provider.timeout, Duration::from_secs(15));
    }

    #[test]
    fn message_conversion() {
        let messages = vec![ChatMessage::system("You are helpful"), ChatMessage::user("Hello")];
        let api_messages = OpenAiCompatProvider::to_api_messages(&messages);
        assert_eq!(api_messages.len(), 2);
        assert_eq!(api_messages[0].role, "system");
        assert_eq!(api_messages[1].role, "user");
        assert_eq!(api_messages[1].content.as_deref(), Some("Hello"));
    }

    #[test]
    fn parse_completion_with_null_content() {
        let data = r#"{"model":"gpt-3.5-turbo","choices":[{"message":{"role":"assistant","content":null}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices[0].message.content.is_none());
        assert!(parsed.usage.is_none());
    }

    #[test]
    fn error_message_from_openai_body() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(upstream_error_message(401, body), "Incorrect API key provided");
    }

    #[test]
    fn error_message_falls_back_to_raw_body() {
        assert_eq!(upstream_error_message(502, "bad gateway"), "bad gateway");
        assert_eq!(upstream_error_message(503, "  "), "HTTP 503");
        let long = "x".repeat(2_000);
        assert_eq!(upstream_error_message(500, &long).len(), MAX_ERROR_BODY_CHARS);
    }

    #[tokio::test]
    async fn complete_extracts_first_choice() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                let auth = headers
                    .get("authorization")
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or_default()
                    .to_string();
                Json(serde_json::json!({
                    "model": body["model"],
                    "choices": [
                        {"message": {"role": "assistant", "content": format!(
                            "{}|{}|{}",
                            auth,
                            body["messages"][0]["role"].as_str().unwrap_or_default(),
                            body["max_tokens"]
                        )}},
                        {"message": {"role": "assistant", "content": "second choice"}}
                    ],
                    "usage": {"prompt_tokens": 20, "completion_tokens": 9, "total_tokens": 29}
                }))
            }),
        );
        let base = spawn_upstream(app).await;
        let provider = provider_for(&base, Duration::from_secs(5));

        let response = provider.complete(request("What is a protocol?")).await.unwrap();

        assert_eq!(response.message.role, Role::Assistant);
        assert_eq!(response.message.content, "Bearer sk-test|system|900");
        assert_eq!(response.model, "gpt-3.5-turbo");
        assert_eq!(response.usage.unwrap().total_tokens, 29);
    }

    #[tokio::test]
    async fn non_success_status_is_upstream_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(serde_json::json!({"error": {"message": "Rate limit reached"}})),
                )
            }),
        );
        let base = spawn_upstream(app).await;
        let provider = provider_for(&base, Duration::from_secs(5));

        let err = provider.complete(request("hi")).await.unwrap_err();
        match err {
            ProviderError::Upstream {
                status_code,
                message,
            } => {
                assert_eq!(status_code, Some(429));
                assert_eq!(message, "Rate limit reached");
            }
            other => panic!("expected upstream error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_payload_is_upstream_error() {
        let app = Router::new().route("/v1/chat/completions", post(|| async { "not json" }));
        let base = spawn_upstream(app).await;
        let provider = provider_for(&base, Duration::from_secs(5));

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(matches!(
            err,
            ProviderError::Upstream {
                status_code: Some(200),
                ..
            }
        ));
        assert_eq!(err.class(), "upstream_error");
    }

    #[tokio::test]
    async fn empty_choices_is_upstream_error() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async { Json(serde_json::json!({"model": "m", "choices": []})) }),
        );
        let base = spawn_upstream(app).await;
        let provider = provider_for(&base, Duration::from_secs(5));

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(err.to_string().contains("No choices"));
    }

    #[tokio::test]
    async fn slow_upstream_times_out() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                "too late"
            }),
        );
        let base = spawn_upstream(app).await;
        let provider = provider_for(&base, Duration::from_millis(200));

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout { .. }));
    }

    #[tokio::test]
    async fn refused_connection_is_transport_error() {
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let provider = provider_for(&format!("http://127.0.0.1:{port}/v1"), Duration::from_secs(5));

        let err = provider.complete(request("hi")).await.unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)));
        assert_eq!(err.class(), "transport_error");
    }

    #[tokio::test]
    async fn health_check_reports_status() {
        let app = Router::new().route(
            "/v1/models",
            axum::routing::get(|| async { Json(serde_json::json!({"data": []})) }),
        );
        let base = spawn_upstream(app).await;
        let provider = provider_for(&base, Duration::from_secs(5));
        assert!(provider.health_check().await.unwrap());
    }
}
