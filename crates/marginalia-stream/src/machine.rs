//! Connection state machine
//!
//! Pure transition function for one tracked job's push connection. The
//! driver in `client` owns the transport and the clocks; this module only
//! decides what the next state is and which effects to run, which is what
//! makes the reconnect budget testable without a network.

use std::time::Duration;

use marginalia_types::{ProcessingEvent, ProcessingStatus};

/// Reconnection policy for a tracked job.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReconnectPolicy {
    /// Fixed delay between attempts.
    pub reconnect_delay: Duration,
    /// Attempt budget; exceeding it is a terminal error.
    pub max_attempts: u32,
    /// How long `Connecting` may last before the attempt counts as failed.
    pub watchdog: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            reconnect_delay: Duration::from_secs(3),
            max_attempts: 5,
            watchdog: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionState {
    Idle,
    /// Attempt `attempt` (1-based) is in flight, bounded by the watchdog.
    Connecting { attempt: u32 },
    Connected { attempt: u32 },
    /// Waiting out the reconnect delay after attempt `attempt` failed
    /// (transport error or watchdog expiry).
    Stuck { attempt: u32 },
    Completed,
    Errored { message: String },
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ConnectionState::Completed | ConnectionState::Errored { .. })
    }

    /// Attempt counter for the UI's "attempt k of N".
    pub fn attempt(&self) -> u32 {
        match self {
            ConnectionState::Connecting { attempt }
            | ConnectionState::Connected { attempt }
            | ConnectionState::Stuck { attempt } => *attempt,
            _ => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Input {
    /// Caller asked to start tracking.
    Open,
    /// Transport handshake succeeded.
    TransportOpened,
    /// A normalized event arrived.
    Message(ProcessingEvent),
    /// The transport failed or the stream ended before a terminal status.
    TransportError(String),
    /// `Connecting` outlived the watchdog.
    WatchdogFired,
    /// The reconnect delay elapsed.
    ReconnectDue,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Open the transport, racing it against `StartWatchdog`.
    Connect,
    CloseTransport,
    StartWatchdog(Duration),
    ScheduleReconnect(Duration),
    /// Record the event on the job.
    RecordEvent(ProcessingEvent),
    /// Mirror the job to durable storage.
    Persist,
    /// The job reached a terminal status; stop tracking it as active.
    MarkTerminal(ProcessingStatus),
}

/// Advance the state machine by one input.
pub fn transition(
    state: &ConnectionState,
    input: Input,
    policy: &ReconnectPolicy,
) -> (ConnectionState, Vec<Effect>) {
    use ConnectionState::*;

    if state.is_terminal() {
        // Terminal states absorb everything; stale callbacks are dropped.
        return (state.clone(), Vec::new());
    }

    match (state, input) {
        (Idle, Input::Open) => (
            Connecting { attempt: 1 },
            vec![Effect::Connect, Effect::StartWatchdog(policy.watchdog)],
        ),

        (Connecting { attempt }, Input::TransportOpened) => {
            (Connected { attempt: *attempt }, vec![Effect::Persist])
        }

        (Connecting { attempt }, Input::TransportError(_))
        | (Connecting { attempt }, Input::WatchdogFired) => retry_or_fail(*attempt, policy),

        // A message while nominally still connecting means the transport is
        // open; fold the handshake in and process the event.
        (Connecting { attempt }, Input::Message(event)) => {
            let (next, mut effects) = apply_message(*attempt, event);
            effects.insert(0, Effect::Persist);
            (next, effects)
        }

        (Connected { attempt }, Input::Message(event)) => apply_message(*attempt, event),

        (Connected { attempt }, Input::TransportError(_)) => retry_or_fail(*attempt, policy),

        (Stuck { attempt }, Input::ReconnectDue) => (
            Connecting {
                attempt: attempt + 1,
            },
            vec![Effect::Connect, Effect::StartWatchdog(policy.watchdog)],
        ),

        // Everything else (late watchdogs, duplicate opens) is a no-op.
        (state, _) => (state.clone(), Vec::new()),
    }
}

fn retry_or_fail(failed_attempt: u32, policy: &ReconnectPolicy) -> (ConnectionState, Vec<Effect>) {
    if failed_attempt >= policy.max_attempts {
        let message = format!(
            "connection lost and could not be re-established after {} attempts",
            policy.max_attempts
        );
        // Record a user-facing explanation on the job before it goes
        // terminal; there is no incoming event to carry one.
        let event = ProcessingEvent {
            event_type: "connection_failed".to_string(),
            status: Some(ProcessingStatus::Error),
            message: message.clone(),
            error: None,
            timestamp: chrono::Utc::now(),
        };
        (
            ConnectionState::Errored { message },
            vec![
                Effect::RecordEvent(event),
                Effect::CloseTransport,
                Effect::MarkTerminal(ProcessingStatus::Error),
                Effect::Persist,
            ],
        )
    } else {
        (
            ConnectionState::Stuck {
                attempt: failed_attempt,
            },
            vec![
                Effect::CloseTransport,
                Effect::ScheduleReconnect(policy.reconnect_delay),
                Effect::Persist,
            ],
        )
    }
}

fn apply_message(attempt: u32, event: ProcessingEvent) -> (ConnectionState, Vec<Effect>) {
    if event.is_ping() {
        // Keep-alives carry no state.
        return (ConnectionState::Connected { attempt }, Vec::new());
    }

    match event.status {
        Some(ProcessingStatus::Ready) => (
            ConnectionState::Completed,
            vec![
                Effect::RecordEvent(event),
                Effect::CloseTransport,
                Effect::MarkTerminal(ProcessingStatus::Ready),
                Effect::Persist,
            ],
        ),
        Some(ProcessingStatus::Error) => (
            ConnectionState::Errored {
                message: event.error.clone().unwrap_or_else(|| event.message.clone()),
            },
            vec![
                Effect::RecordEvent(event),
                Effect::CloseTransport,
                Effect::MarkTerminal(ProcessingStatus::Error),
                Effect::Persist,
            ],
        ),
        _ => (
            ConnectionState::Connected { attempt },
            vec![Effect::RecordEvent(event), Effect::Persist],
        ),
    }
}
