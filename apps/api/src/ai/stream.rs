//! Relays model text deltas to the browser as server-sent events.
//!
//! Each delta becomes a `data` event. A clean finish ends with a `done`
//! event; a provider failure mid-stream ends with a visible `[Error: ...]`
//! data event and no `done`.

use std::convert::Infallible;

use async_stream::stream;
use axum::response::sse::Event;
use futures::{Stream, StreamExt};
use tracing::warn;

use crate::llm_client::LlmError;

pub const DONE_EVENT: &str = "done";

#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Text(String),
    Error(String),
    Done,
}

/// SSE field values may not carry `\r`; multi-line data is split on `\n`.
fn normalize_line_endings(text: &str) -> String {
    text.replace("\r\n", "\n").replace('\r', "\n")
}

impl Frame {
    pub fn into_event(self) -> Event {
        match self {
            Frame::Text(text) => Event::default().data(normalize_line_endings(&text)),
            Frame::Error(message) => {
                Event::default().data(format!("[Error: {}]", normalize_line_endings(&message)))
            }
            Frame::Done => Event::default().event(DONE_EVENT).data("[DONE]"),
        }
    }
}

/// User-facing text for a mid-stream failure.
fn interruption_message(error: &LlmError) -> &'static str {
    match error {
        LlmError::RateLimited { .. } => "The AI service is busy. Please try again in a moment.",
        _ => "The AI response was interrupted. Please try again.",
    }
}

pub fn frames<S>(upstream: S) -> impl Stream<Item = Frame> + Send + 'static
where
    S: Stream<Item = Result<String, LlmError>> + Send + 'static,
{
    stream! {
        let mut upstream = std::pin::pin!(upstream);
        while let Some(item) = upstream.next().await {
            match item {
                Ok(text) if text.is_empty() => {}
                Ok(text) => yield Frame::Text(text),
                Err(e) => {
                    warn!("AI stream failed mid-response: {e}");
                    yield Frame::Error(interruption_message(&e).to_string());
                    return;
                }
            }
        }
        yield Frame::Done;
    }
}

pub fn sse_events<S>(upstream: S) -> impl Stream<Item = Result<Event, Infallible>> + Send + 'static
where
    S: Stream<Item = Result<String, LlmError>> + Send + 'static,
{
    frames(upstream).map(|frame| Ok(frame.into_event()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    async fn collect(items: Vec<Result<String, LlmError>>) -> Vec<Frame> {
        frames(stream::iter(items)).collect().await
    }

    #[tokio::test]
    async fn test_clean_stream_ends_with_done() {
        let out = collect(vec![Ok("Hel".to_string()), Ok("".to_string()), Ok("lo".to_string())]).await;
        assert_eq!(
            out,
            vec![
                Frame::Text("Hel".to_string()),
                Frame::Text("lo".to_string()),
                Frame::Done
            ]
        );
    }

    #[tokio::test]
    async fn test_error_emits_marker_and_stops() {
        let out = collect(vec![
            Ok("partial".to_string()),
            Err(LlmError::Stream("connection reset".to_string())),
            Ok("never".to_string()),
        ])
        .await;
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], Frame::Text("partial".to_string()));
        assert!(matches!(&out[1], Frame::Error(m) if m.contains("interrupted")));
    }

    #[test]
    fn test_carriage_returns_become_newlines() {
        assert_eq!(normalize_line_endings("a\r\nb\rc\nd"), "a\nb\nc\nd");
    }

    #[tokio::test]
    async fn test_carriage_return_in_delta_is_relayed() {
        let events: Vec<_> = sse_events(stream::iter(vec![Ok(
            "line one\r\nline two\rline three".to_string(),
        )]))
        .collect()
        .await;
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(Result::is_ok));
    }

    #[tokio::test]
    async fn test_empty_stream_is_just_done() {
        assert_eq!(collect(vec![]).await, vec![Frame::Done]);
    }
}
