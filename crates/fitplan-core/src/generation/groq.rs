//! Groq chat-completions client.
//!
//! Groq exposes an OpenAI-compatible API. One request is sent per call with
//! a system message and a user message; failures are classified into
//! [`ProviderError`] and never retried.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::PlanGenerator;
use crate::error::ProviderError;

/// Base URL for the Groq API (OpenAI-compatible).
pub const DEFAULT_BASE_URL: &str = "https://api.groq.com/openai/v1";

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "openai/gpt-oss-120b";

/// Whole-request timeout used when none is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// Characters of an error body kept in a [`ProviderError`].
const ERROR_BODY_CHARS: usize = 200;

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Settings for [`GroqClient`].
#[derive(Debug, Clone)]
pub struct GroqConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GroqConfig {
    /// Config with the default model, endpoint and timeout.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_owned(),
            base_url: DEFAULT_BASE_URL.to_owned(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// [`PlanGenerator`] backed by Groq's chat-completions endpoint.
pub struct GroqClient {
    client: Client,
    config: GroqConfig,
}

impl GroqClient {
    pub fn new(config: GroqConfig) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }
}

#[async_trait]
impl PlanGenerator for GroqClient {
    fn name(&self) -> &str {
        "groq"
    }

    async fn generate(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, ProviderError> {
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        debug!(model = %self.config.model, "sending chat completion request to Groq");

        let response = self
            .client
            .post(self.completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "failed to send request to Groq");
                if e.is_timeout() {
                    ProviderError::Transport(format!(
                        "request timed out after {}s",
                        self.config.timeout.as_secs()
                    ))
                } else {
                    ProviderError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ProviderError::Transport(format!("failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }

        extract_content(&body)
    }
}

/// Map a non-success status and body onto a [`ProviderError`].
fn classify_error(status: StatusCode, body: &str) -> ProviderError {
    let message = serde_json::from_str::<ErrorResponse>(body)
        .map(|r| r.error.message)
        .unwrap_or_else(|_| body.chars().take(ERROR_BODY_CHARS).collect());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Unauthorized(message),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(message),
        _ => ProviderError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Pull the first choice's text out of a successful response body.
fn extract_content(body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::MalformedResponse(e.to_string()))?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|content| content.trim().to_owned())
        .filter(|content| !content.is_empty())
        .ok_or(ProviderError::EmptyCompletion)
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::extract::State;
    use axum::http::{HeaderMap, StatusCode as AxumStatus};
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{Value, json};

    use super::*;

    #[test]
    fn extracts_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"  {\"Mon\":{}}\n"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "{\"Mon\":{}}");
    }

    #[test]
    fn empty_choices_is_empty_completion() {
        assert_eq!(
            extract_content(r#"{"choices":[]}"#).unwrap_err(),
            ProviderError::EmptyCompletion
        );
        assert_eq!(
            extract_content(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap_err(),
            ProviderError::EmptyCompletion
        );
    }

    #[test]
    fn garbage_body_is_malformed() {
        assert!(matches!(
            extract_content("<html>").unwrap_err(),
            ProviderError::MalformedResponse(_)
        ));
    }

    #[test]
    fn classifies_status_codes() {
        let body = r#"{"error":{"message":"Invalid API Key","type":"invalid_request_error"}}"#;
        assert_eq!(
            classify_error(StatusCode::UNAUTHORIZED, body),
            ProviderError::Unauthorized("Invalid API Key".to_owned())
        );
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, body),
            ProviderError::RateLimited(_)
        ));

        let long = "x".repeat(500);
        match classify_error(StatusCode::BAD_GATEWAY, &long) {
            ProviderError::Api { status, message } => {
                assert_eq!(status, 502);
                assert_eq!(message.len(), ERROR_BODY_CHARS);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    // -----------------------------------------------------------------------
    // Round trip against a local stand-in for the chat-completions endpoint
    // -----------------------------------------------------------------------

    #[derive(Clone, Default)]
    struct Captured {
        auth: Arc<Mutex<Option<String>>>,
        body: Arc<Mutex<Option<Value>>>,
    }

    async fn serve(status: AxumStatus, reply: Value) -> (String, Captured) {
        let captured = Captured::default();
        let app = Router::new()
            .route(
                "/chat/completions",
                post(
                    move |State(c): State<Captured>, headers: HeaderMap, Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            *c.auth.lock().unwrap() = headers
                                .get("authorization")
                                .and_then(|v| v.to_str().ok())
                                .map(str::to_owned);
                            *c.body.lock().unwrap() = Some(body);
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    fn client_for(base_url: String) -> GroqClient {
        let mut config = GroqConfig::new("test-key");
        config.base_url = base_url;
        GroqClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn sends_system_and_user_messages() {
        let (url, captured) = serve(
            AxumStatus::OK,
            json!({"choices": [{"message": {"role": "assistant", "content": "{\"Mon\":{}}"}}]}),
        )
        .await;

        let client = client_for(url);
        let text = client.generate("persona", "make a plan").await.unwrap();
        assert_eq!(text, "{\"Mon\":{}}");

        assert_eq!(
            captured.auth.lock().unwrap().as_deref(),
            Some("Bearer test-key")
        );
        let body = captured.body.lock().unwrap().clone().unwrap();
        assert_eq!(body["model"], DEFAULT_MODEL);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][0]["content"], "persona");
        assert_eq!(body["messages"][1]["role"], "user");
        assert_eq!(body["messages"][1]["content"], "make a plan");
    }

    #[tokio::test]
    async fn surfaces_provider_rejection() {
        let (url, _captured) = serve(
            AxumStatus::UNAUTHORIZED,
            json!({"error": {"message": "Invalid API Key"}}),
        )
        .await;

        let err = client_for(url).generate("s", "u").await.unwrap_err();
        assert_eq!(err, ProviderError::Unauthorized("Invalid API Key".to_owned()));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_transport_error() {
        // Bind then drop so the port is very likely closed.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = client_for(format!("http://{addr}"))
            .generate("s", "u")
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Transport(_)), "got {err:?}");
    }
}
