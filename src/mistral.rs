//! Mistral API client with bounded retry.
//!
//! Wraps the hosted chat-completion and embedding endpoints behind the
//! [`LlmClient`] trait so the chat pipeline can be tested against a scripted
//! mock. Transient failures (HTTP 429, 5xx, network errors) are retried with
//! exponential backoff governed by an injected [`RetryPolicy`]; other 4xx
//! responses fail immediately.
//!
//! # Error taxonomy
//!
//! - [`LlmError::RateLimited`] — 429 still occurring after all retries;
//!   surfaced to HTTP callers as 429 with a `retryAfter` hint.
//! - [`LlmError::Unavailable`] — no response received (network/timeout) → 503.
//! - [`LlmError::Upstream`] — a non-retryable error response → 500.
//! - [`LlmError::InvalidResponse`] — a 2xx body that does not match the
//!   expected schema → 500.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;

use crate::config::MistralConfig;

const MISTRAL_API_BASE: &str = "https://api.mistral.ai/v1";

/// A single message in a chat-completion request.
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: &'static str,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system",
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user",
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant",
            content: content.into(),
        }
    }
}

/// Errors from the LLM provider, already classified for the HTTP layer.
#[derive(Debug)]
pub enum LlmError {
    /// Provider returned 429 and retries are exhausted.
    RateLimited { retry_after_secs: u64 },
    /// Provider returned a non-retryable error response.
    Upstream { status: u16, message: String },
    /// No response received (connect failure, timeout) after retries.
    Unavailable(String),
    /// Response received but its body did not match the expected schema.
    InvalidResponse(String),
}

impl std::fmt::Display for LlmError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LlmError::RateLimited { retry_after_secs } => {
                write!(f, "provider rate limit (retry after {}s)", retry_after_secs)
            }
            LlmError::Upstream { status, message } => {
                write!(f, "provider error {}: {}", status, message)
            }
            LlmError::Unavailable(e) => write!(f, "provider unreachable: {}", e),
            LlmError::InvalidResponse(e) => write!(f, "invalid provider response: {}", e),
        }
    }
}

impl std::error::Error for LlmError {}

/// Bounded retry policy: attempt count plus capped exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &MistralConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(config.backoff_cap_secs),
        }
    }

    /// Delay before retry attempt `attempt` (1-based): 1s, 2s, 4s, ...
    /// capped at `max_delay`.
    pub fn delay(&self, attempt: u32) -> Duration {
        let exp = self.base_delay * 2u32.saturating_pow(attempt.saturating_sub(1));
        exp.min(self.max_delay)
    }

    /// Whether an HTTP status is worth retrying.
    pub fn is_retryable(&self, status: u16) -> bool {
        status == 429 || (500..600).contains(&status)
    }
}

/// Seam between the chat pipeline and the hosted provider.
///
/// Production uses [`MistralClient`]; tests inject scripted mocks.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a chat completion and return the assistant message content.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;

    /// Embed a batch of texts, returning one vector per input in order.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError>;
}

/// Client for the hosted Mistral API.
pub struct MistralClient {
    http: reqwest::Client,
    api_key: String,
    chat_model: String,
    embed_model: String,
    temperature: f32,
    retry: RetryPolicy,
}

impl MistralClient {
    pub fn new(config: &MistralConfig, api_key: String) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http,
            api_key,
            chat_model: config.chat_model.clone(),
            embed_model: config.embed_model.clone(),
            temperature: config.temperature,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// POST a JSON body with retry/backoff and return the parsed response.
    async fn post_with_retry(
        &self,
        url: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, LlmError> {
        let mut last_err: Option<LlmError> = None;

        for attempt in 0..=self.retry.max_retries {
            if attempt > 0 {
                tokio::time::sleep(self.retry.delay(attempt)).await;
            }

            let resp = self
                .http
                .post(url)
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        return response
                            .json()
                            .await
                            .map_err(|e| LlmError::InvalidResponse(e.to_string()));
                    }

                    if self.retry.is_retryable(status.as_u16()) {
                        last_err = Some(if status.as_u16() == 429 {
                            let retry_after_secs = response
                                .headers()
                                .get(reqwest::header::RETRY_AFTER)
                                .and_then(|v| v.to_str().ok())
                                .and_then(|v| v.parse().ok())
                                .unwrap_or(1);
                            LlmError::RateLimited { retry_after_secs }
                        } else {
                            let message = response.text().await.unwrap_or_default();
                            LlmError::Upstream {
                                status: status.as_u16(),
                                message,
                            }
                        });
                        continue;
                    }

                    // Non-retryable client error.
                    let message = response.text().await.unwrap_or_default();
                    return Err(LlmError::Upstream {
                        status: status.as_u16(),
                        message,
                    });
                }
                Err(e) => {
                    last_err = Some(LlmError::Unavailable(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| LlmError::Unavailable("retries exhausted".to_string())))
    }
}

#[async_trait]
impl LlmClient for MistralClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.chat_model,
            "temperature": self.temperature,
            "messages": messages,
        });

        let url = format!("{}/chat/completions", MISTRAL_API_BASE);
        let json = self.post_with_retry(&url, &body).await?;
        parse_completion_response(&json)
    }

    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, LlmError> {
        let body = serde_json::json!({
            "model": self.embed_model,
            "input": texts,
        });

        let url = format!("{}/embeddings", MISTRAL_API_BASE);
        let json = self.post_with_retry(&url, &body).await?;
        parse_embedding_response(&json)
    }
}

/// Extract `choices[0].message.content` from a chat-completion response.
fn parse_completion_response(json: &serde_json::Value) -> Result<String, LlmError> {
    json.get("choices")
        .and_then(|c| c.as_array())
        .and_then(|c| c.first())
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(|s| s.to_string())
        .ok_or_else(|| {
            LlmError::InvalidResponse("missing choices[0].message.content".to_string())
        })
}

/// Extract the `data[].embedding` arrays from an embeddings response.
fn parse_embedding_response(json: &serde_json::Value) -> Result<Vec<Vec<f32>>, LlmError> {
    let data = json
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| LlmError::InvalidResponse("missing data array".to_string()))?;

    let mut embeddings = Vec::with_capacity(data.len());
    for item in data {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| LlmError::InvalidResponse("missing embedding".to_string()))?;
        embeddings.push(
            embedding
                .iter()
                .map(|v| v.as_f64().unwrap_or(0.0) as f32)
                .collect(),
        );
    }

    Ok(embeddings)
}
