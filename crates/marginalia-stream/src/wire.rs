//! Wire message normalization
//!
//! The server emits two shapes on the push channel: a bare JSON payload, or
//! SSE framing (`event:` / `data:` lines, with multi-line `data:` payloads
//! to reassemble). Both normalize to a `ProcessingEvent`; anything that
//! fails to parse becomes a synthetic `parse_error` event instead of a
//! propagated exception.

use chrono::{DateTime, Utc};
use tracing::debug;

use marginalia_types::{ProcessingEvent, ProcessingStatus};

/// Raw payload fields, shared by both wire shapes.
#[derive(Debug, serde::Deserialize)]
struct WirePayload {
    #[serde(rename = "type", default)]
    event_type: Option<String>,
    #[serde(default)]
    status: Option<ProcessingStatus>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    timestamp: Option<DateTime<Utc>>,
}

impl WirePayload {
    fn into_event(self, framed_name: Option<&str>) -> ProcessingEvent {
        ProcessingEvent {
            event_type: self
                .event_type
                .or_else(|| framed_name.map(str::to_string))
                .unwrap_or_else(|| "message".to_string()),
            status: self.status,
            message: self.message.unwrap_or_default(),
            error: self.error,
            timestamp: self.timestamp.unwrap_or_else(Utc::now),
        }
    }
}

/// Normalize one wire message into a local event.
///
/// Detects the shape by looking for SSE field lines; a framed message with
/// a `data:` payload parses the reassembled payload as JSON, a bare message
/// parses the whole string. Malformed payloads yield a `parse_error` event.
pub fn parse_stream_message(raw: &str) -> ProcessingEvent {
    if looks_framed(raw) {
        parse_framed(raw)
    } else {
        match serde_json::from_str::<WirePayload>(raw) {
            Ok(payload) => payload.into_event(None),
            Err(err) => {
                debug!(%err, "malformed bare payload");
                ProcessingEvent::parse_error(err.to_string())
            }
        }
    }
}

fn looks_framed(raw: &str) -> bool {
    raw.lines()
        .any(|line| line.starts_with("event:") || line.starts_with("data:"))
}

fn parse_framed(raw: &str) -> ProcessingEvent {
    let mut event_name: Option<String> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in raw.lines() {
        if let Some(name) = line.strip_prefix("event:") {
            event_name = Some(name.trim().to_string());
        } else if let Some(data) = line.strip_prefix("data:") {
            data_lines.push(data.strip_prefix(' ').unwrap_or(data));
        }
        // Comment lines (":") and unknown fields are ignored, per SSE.
    }

    let name = event_name.as_deref();

    // A named event with no data payload (e.g. "event: ping" keep-alives)
    // still normalizes.
    if data_lines.is_empty() {
        return ProcessingEvent {
            event_type: name.unwrap_or("message").to_string(),
            status: None,
            message: String::new(),
            error: None,
            timestamp: Utc::now(),
        };
    }

    let data = data_lines.join("\n");
    match serde_json::from_str::<WirePayload>(&data) {
        Ok(payload) => payload.into_event(name),
        Err(err) => {
            debug!(%err, "malformed framed payload");
            ProcessingEvent::parse_error(err.to_string())
        }
    }
}
