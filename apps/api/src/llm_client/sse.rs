//! Server-sent event framing for the Anthropic streaming API.

use serde::Deserialize;

use super::LlmError;

/// The subset of provider stream events the client acts on.
#[derive(Debug, PartialEq)]
pub enum StreamEvent {
    TextDelta(String),
    Stop,
    Error(String),
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawEvent {
    #[serde(rename = "content_block_delta")]
    ContentBlockDelta { delta: RawDelta },
    #[serde(rename = "message_stop")]
    MessageStop,
    #[serde(rename = "error")]
    Error { error: RawError },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawDelta {
    #[serde(rename = "text_delta")]
    Text { text: String },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct RawError {
    message: String,
}

/// Removes and returns the next complete event from `buffer`, if any.
/// Events are separated by a blank line. Bytes are only decoded once the
/// whole event has arrived, so a character split across chunks is kept intact.
pub fn extract_sse_event(buffer: &mut Vec<u8>) -> Option<Result<String, LlmError>> {
    let idx = buffer.windows(2).position(|w| w == b"\n\n")?;
    let event: Vec<u8> = buffer.drain(..idx + 2).take(idx).collect();
    Some(String::from_utf8(event).map_err(|e| LlmError::Parse(format!("Invalid UTF-8: {e}"))))
}

/// Parses the `data:` line of one event. Returns `None` for events without data.
pub fn parse_sse_data(event: &str) -> Option<Result<StreamEvent, LlmError>> {
    let data = event
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim_start)
        .last()?;

    if data == "[DONE]" {
        return Some(Ok(StreamEvent::Stop));
    }

    let parsed = match serde_json::from_str::<RawEvent>(data) {
        Ok(raw) => raw,
        Err(e) => {
            return Some(Err(LlmError::Parse(format!(
                "Failed to parse stream event: {e}"
            ))))
        }
    };

    Some(Ok(match parsed {
        RawEvent::ContentBlockDelta {
            delta: RawDelta::Text { text },
        } => StreamEvent::TextDelta(text),
        RawEvent::ContentBlockDelta { .. } => StreamEvent::Other,
        RawEvent::MessageStop => StreamEvent::Stop,
        RawEvent::Error { error } => StreamEvent::Error(error.message),
        RawEvent::Other => StreamEvent::Other,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn next_event(buffer: &mut Vec<u8>) -> Option<String> {
        extract_sse_event(buffer).map(|event| event.unwrap())
    }

    #[test]
    fn test_extract_sse_event_splits_on_blank_line() {
        let mut buffer = b"event: ping\ndata: {\"type\":\"ping\"}\n\nevent: message_stop\ndata: {\"type\":\"message_stop\"}\n\n".to_vec();

        let first = next_event(&mut buffer).unwrap();
        assert!(first.contains("ping"));
        let second = next_event(&mut buffer).unwrap();
        assert!(second.contains("message_stop"));
        assert!(next_event(&mut buffer).is_none());
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_extract_sse_event_keeps_partial() {
        let mut buffer = b"event: content_block_delta\ndata: {\"type\"".to_vec();
        assert!(next_event(&mut buffer).is_none());
        assert!(buffer.starts_with(b"event: content_block_delta"));
    }

    #[test]
    fn test_character_split_across_chunks_is_reassembled() {
        let event = "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"caf\u{e9}\"}}\n\n";
        let bytes = event.as_bytes();
        let split = event.find('\u{e9}').unwrap() + 1;

        let mut buffer = bytes[..split].to_vec();
        assert!(next_event(&mut buffer).is_none());
        buffer.extend_from_slice(&bytes[split..]);

        let complete = next_event(&mut buffer).unwrap();
        assert_eq!(
            parse_sse_data(&complete).unwrap().unwrap(),
            StreamEvent::TextDelta("caf\u{e9}".to_string())
        );
    }

    #[test]
    fn test_invalid_utf8_event_is_parse_error() {
        let mut buffer = vec![b'd', b'a', b't', b'a', b':', 0xFF, b'\n', b'\n'];
        assert!(matches!(
            extract_sse_event(&mut buffer),
            Some(Err(LlmError::Parse(_)))
        ));
    }

    #[test]
    fn test_parse_text_delta() {
        let event = "event: content_block_delta\ndata: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Hello\"}}";
        let parsed = parse_sse_data(event).unwrap().unwrap();
        assert_eq!(parsed, StreamEvent::TextDelta("Hello".to_string()));
    }

    #[test]
    fn test_parse_message_stop() {
        let event = "event: message_stop\ndata: {\"type\":\"message_stop\"}";
        assert_eq!(parse_sse_data(event).unwrap().unwrap(), StreamEvent::Stop);
    }

    #[test]
    fn test_parse_error_event() {
        let event = "event: error\ndata: {\"type\":\"error\",\"error\":{\"type\":\"overloaded_error\",\"message\":\"Overloaded\"}}";
        assert_eq!(
            parse_sse_data(event).unwrap().unwrap(),
            StreamEvent::Error("Overloaded".to_string())
        );
    }

    #[test]
    fn test_parse_unknown_event_is_other() {
        let event = "event: message_start\ndata: {\"type\":\"message_start\",\"message\":{}}";
        assert_eq!(parse_sse_data(event).unwrap().unwrap(), StreamEvent::Other);
    }

    #[test]
    fn test_parse_event_without_data() {
        assert!(parse_sse_data("event: ping").is_none());
    }

    #[test]
    fn test_parse_invalid_json_is_error() {
        let result = parse_sse_data("data: {not json").unwrap();
        assert!(matches!(result, Err(LlmError::Parse(_))));
    }
}
