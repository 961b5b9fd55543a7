//! Processing jobs and their event history
//!
//! A `ProcessingJob` tracks one asynchronous server-side pipeline (document
//! processing, or an agent exploration inside a rabbithole). It is created
//! when the user kicks off work or when a persisted job is rehydrated after
//! a reload, mutated by incoming stream events, and dropped from active
//! tracking once it reaches a terminal status.

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessingStatus {
    Queued,
    Connecting,
    Processing,
    Ready,
    Error,
}

impl ProcessingStatus {
    /// Terminal statuses end active tracking; the job stays in history.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProcessingStatus::Ready | ProcessingStatus::Error)
    }
}

/// Normalized local event produced from a wire message.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProcessingEvent {
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<ProcessingStatus>,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl ProcessingEvent {
    /// Synthetic event substituted for a payload that failed to parse.
    /// Deliberately carries no status so it can never advance a job to a
    /// terminal state on its own.
    pub fn parse_error(detail: impl Into<String>) -> Self {
        Self {
            event_type: "parse_error".to_string(),
            status: None,
            message: "received a malformed stream message".to_string(),
            error: Some(detail.into()),
            timestamp: Utc::now(),
        }
    }

    /// Keep-alive pings carry no state and are dropped by the driver.
    pub fn is_ping(&self) -> bool {
        self.event_type == "ping"
    }
}

#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ProcessingJob {
    pub job_id: String,
    pub title: String,
    pub status: ProcessingStatus,
    pub events: Vec<ProcessingEvent>,
    pub started_at: DateTime<Utc>,
    /// Connection attempts so far, surfaced to the UI as "attempt k of N".
    pub reconnect_attempts: u32,
}

impl ProcessingJob {
    pub fn new(job_id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            title: title.into(),
            status: ProcessingStatus::Queued,
            events: Vec::new(),
            started_at: Utc::now(),
            reconnect_attempts: 0,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Record an event and advance the status it carries, if any.
    /// Returns true when the status changed.
    pub fn apply_event(&mut self, event: ProcessingEvent) -> bool {
        let next = event.status;
        self.events.push(event);
        match next {
            Some(status) if status != self.status => {
                self.status = status;
                true
            }
            _ => false,
        }
    }
}
