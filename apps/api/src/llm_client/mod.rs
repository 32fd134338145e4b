/// LLM Client — the single point of entry for all Claude API calls.
///
/// ARCHITECTURAL RULE: No other module may call the Anthropic API directly.
/// All LLM interactions MUST go through this module.
///
/// Every call streams: text deltas are yielded as they arrive so handlers can
/// forward them to the browser without buffering the full completion.
use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

pub mod prompts;
mod sse;

use sse::{extract_sse_event, parse_sse_data, StreamEvent};

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 4096;
const MAX_RETRIES: u32 = 3;

/// Models a caller may select. The first entry is the default.
pub const SUPPORTED_MODELS: &[&str] = &[
    "claude-sonnet-4-5",
    "claude-haiku-4-5",
    "claude-opus-4-1",
];

/// Resolves an optional model selector against the allowlist.
pub fn resolve_model(requested: Option<&str>) -> Option<&'static str> {
    match requested.map(str::trim).filter(|m| !m.is_empty()) {
        None => SUPPORTED_MODELS.first().copied(),
        Some(name) => SUPPORTED_MODELS.iter().copied().find(|m| *m == name),
    }
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited, retry after {retry_after}s")]
    RateLimited { retry_after: u64 },

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Stream error: {0}")]
    Stream(String),
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    message: String,
}

/// The single LLM client used by all services.
/// Wraps the Anthropic Messages API in streaming mode.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()?,
            api_key,
        })
    }

    /// Starts a streaming completion and returns a stream of text deltas.
    ///
    /// Retries connection failures and 5xx responses with exponential backoff
    /// before the stream starts. A 429 or 401 is returned immediately as a typed
    /// error. Dropping the returned stream aborts the upstream request.
    pub async fn stream_text(
        &self,
        model: &str,
        system: &str,
        prompt: &str,
    ) -> Result<impl Stream<Item = Result<String, LlmError>> + Send + 'static, LlmError> {
        let request_body = AnthropicRequest {
            model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        let mut last_error: Option<LlmError> = None;
        let mut response = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let sent = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let sent = match sent {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = sent.status();
            if status.is_server_error() {
                let body = sent.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                return Err(error_for_status(status, sent).await);
            }

            response = Some(sent);
            break;
        }

        let response = match response {
            Some(r) => r,
            None => {
                return Err(last_error.unwrap_or(LlmError::Stream(
                    "no response from LLM API".to_string(),
                )))
            }
        };

        debug!("LLM stream opened (model: {model})");

        Ok(stream! {
            let mut buffer: Vec<u8> = Vec::new();
            let mut byte_stream = std::pin::pin!(response.bytes_stream());

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(LlmError::Stream(e.to_string()));
                        return;
                    }
                };

                buffer.extend_from_slice(&chunk);

                while let Some(event) = extract_sse_event(&mut buffer) {
                    let event = match event {
                        Ok(event) => event,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };
                    match parse_sse_data(&event) {
                        Some(Ok(StreamEvent::TextDelta(text))) => yield Ok(text),
                        Some(Ok(StreamEvent::Stop)) => return,
                        Some(Ok(StreamEvent::Error(message))) => {
                            yield Err(LlmError::Stream(message));
                            return;
                        }
                        Some(Ok(StreamEvent::Other)) | None => {}
                        Some(Err(e)) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }
        })
    }
}

/// Maps a non-success, non-5xx status to a typed error.
async fn error_for_status(status: StatusCode, response: reqwest::Response) -> LlmError {
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse().ok())
            .unwrap_or(60);
        return LlmError::RateLimited { retry_after };
    }

    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<AnthropicError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);

    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return LlmError::Unauthorized(message);
    }

    LlmError::Api {
        status: status.as_u16(),
        message,
    }
}
