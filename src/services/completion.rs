//! Client for the external text-completion service used by snippet generation.
//!
//! Calls are instrumented and log the model, status and token usage (never the contents).

use std::{env, sync::Arc, time::Duration};

use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
const TEMPERATURE: f32 = 0.8;

/// Failures of a completion round-trip.
#[derive(Debug, Error)]
pub enum CompletionError {
    /// The HTTP client could not be constructed.
    #[error("failed to build completion client")]
    ClientBuilder(#[source] reqwest::Error),
    /// The request never produced a response (network, timeout).
    #[error("completion request failed")]
    Transport(#[source] reqwest::Error),
    /// The service answered with a non-success status.
    #[error("completion service returned {status}: {message}")]
    Status {
        status: reqwest::StatusCode,
        message: String,
    },
    /// The response body could not be decoded.
    #[error("failed to decode completion response")]
    Decode(#[source] reqwest::Error),
    /// The response carried no message content.
    #[error("completion response was empty")]
    Empty,
}

/// "Send a prompt, receive text" seam between generation and the remote model.
pub trait CompletionClient: Send + Sync {
    /// Run one completion with a system and a user prompt, returning the raw text.
    fn complete(
        &self,
        system: String,
        user: String,
    ) -> BoxFuture<'static, Result<String, CompletionError>>;
}

/// OpenAI-compatible chat completions client.
#[derive(Clone)]
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: Arc<str>,
    base_url: Arc<str>,
    model: Arc<str>,
}

impl OpenAiClient {
    /// Construct a client for the given endpoint.
    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(CompletionError::ClientBuilder)?;

        Ok(Self {
            client,
            api_key: Arc::from(api_key.into()),
            base_url: Arc::from(base_url.into().trim_end_matches('/')),
            model: Arc::from(model.into()),
        })
    }

    /// Build the client from `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `OPENAI_MODEL`.
    ///
    /// Returns `Ok(None)` when no API key is configured.
    pub fn from_env() -> Result<Option<Self>, CompletionError> {
        let Ok(api_key) = env::var("OPENAI_API_KEY") else {
            return Ok(None);
        };
        let base_url = env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.into());
        Self::new(api_key, base_url, model).map(Some)
    }

    #[instrument(level = "info", skip(self, system, user), fields(model = %self.model))]
    async fn chat_json(&self, system: &str, user: &str) -> Result<String, CompletionError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatCompletionRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: TEMPERATURE,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, "application/json")
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(CompletionError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_error_message(&body).unwrap_or(body);
            return Err(CompletionError::Status { status, message });
        }

        let body: ChatCompletionResponse =
            response.json().await.map_err(CompletionError::Decode)?;
        if let Some(usage) = &body.usage {
            info!(
                prompt_tokens = ?usage.prompt_tokens,
                completion_tokens = ?usage.completion_tokens,
                total_tokens = ?usage.total_tokens,
                "completion usage"
            );
        }

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or(CompletionError::Empty)
    }
}

impl CompletionClient for OpenAiClient {
    fn complete(
        &self,
        system: String,
        user: String,
    ) -> BoxFuture<'static, Result<String, CompletionError>> {
        let client = self.clone();
        Box::pin(async move { client.chat_json(&system, &user).await })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct Usage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
    #[serde(default)]
    total_tokens: Option<u32>,
}

/// Pull `error.message` out of an OpenAI-style error body.
fn extract_error_message(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct Wrapper {
        error: Inner,
    }
    #[derive(Deserialize)]
    struct Inner {
        message: String,
    }

    serde_json::from_str::<Wrapper>(body)
        .ok()
        .map(|wrapper| wrapper.error.message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_openai_error_message() {
        let body = r#"{"error": {"message": "Invalid API key", "type": "auth"}}"#;
        assert_eq!(
            extract_error_message(body).as_deref(),
            Some("Invalid API key")
        );
        assert_eq!(extract_error_message("<html>"), None);
    }

    #[test]
    fn request_asks_for_json_object() {
        let request = ChatCompletionRequest {
            model: "m",
            messages: [
                ChatMessage {
                    role: "system",
                    content: "s",
                },
                ChatMessage {
                    role: "user",
                    content: "u",
                },
            ],
            temperature: 0.5,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["messages"][1]["role"], "user");
    }
}
