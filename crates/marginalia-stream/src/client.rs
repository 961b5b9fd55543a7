//! Effectful stream driver
//!
//! `StreamClient` owns the transport and the persistence seam and drives
//! one job at a time through the pure state machine: it opens the
//! connection under the watchdog, feeds normalized wire messages in,
//! honors the reconnect schedule, mirrors every non-terminal change to the
//! job store, and closes the transport the moment the job goes terminal.
//!
//! Cancellation is by dropping the `track` future (the owning view
//! unmounted, the tracked conversation changed): the transport stream is
//! dropped with it, so no stale connection outlives its owner.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::time::{sleep, timeout};
use tracing::{info, warn};

use marginalia_types::ProcessingJob;

use crate::error::StreamError;
use crate::machine::{transition, ConnectionState, Effect, Input, ReconnectPolicy};
use crate::persist::JobStore;
use crate::wire::parse_stream_message;

/// Transport seam: one push channel per job.
///
/// `connect` resolves once the channel is established; the returned stream
/// yields raw wire messages until the server closes it.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn connect(
        &self,
        job_id: &str,
    ) -> Result<BoxStream<'static, Result<String, StreamError>>, StreamError>;
}

/// Driver for tracked processing jobs.
pub struct StreamClient<T, S> {
    transport: T,
    jobs: S,
    policy: ReconnectPolicy,
    history: Vec<ProcessingJob>,
}

impl<T: StreamTransport, S: JobStore> StreamClient<T, S> {
    pub fn new(transport: T, jobs: S, policy: ReconnectPolicy) -> Self {
        Self {
            transport,
            jobs,
            policy,
            history: Vec::new(),
        }
    }

    pub fn policy(&self) -> &ReconnectPolicy {
        &self.policy
    }

    /// Jobs that reached a terminal status under this client.
    pub fn history(&self) -> &[ProcessingJob] {
        &self.history
    }

    /// Persisted active jobs, without re-establishing their connections.
    pub fn restore(&self) -> Result<Vec<ProcessingJob>, StreamError> {
        self.jobs.load_active()
    }

    /// Rehydrate persisted active jobs and track each to a terminal
    /// status, so a reload does not lose in-flight work.
    pub async fn resume_all(&mut self) -> Result<Vec<ProcessingJob>, StreamError> {
        let mut finished = Vec::new();
        for job in self.jobs.load_active()? {
            if job.is_terminal() {
                // Shouldn't be persisted; clean up rather than re-track.
                self.jobs.remove(&job.job_id)?;
                continue;
            }
            info!(job_id = %job.job_id, "resuming persisted job");
            finished.push(self.track(job).await?);
        }
        Ok(finished)
    }

    /// Track one job until it reaches a terminal status, and return it.
    ///
    /// The returned job carries the terminal status (`Ready` or `Error`),
    /// its full event history, and the attempt count. An `Err` here means
    /// the driver itself failed (persistence), not the connection.
    pub async fn track(&mut self, mut job: ProcessingJob) -> Result<ProcessingJob, StreamError> {
        if job.is_terminal() {
            return Err(StreamError::AlreadyTerminal(job.job_id));
        }

        let mut state = ConnectionState::Idle;
        let mut stream: Option<BoxStream<'static, Result<String, StreamError>>> = None;
        let mut inputs: VecDeque<Input> = VecDeque::from([Input::Open]);

        loop {
            let input = match inputs.pop_front() {
                Some(input) => input,
                None if state.is_terminal() => break,
                None => match stream.as_mut() {
                    Some(active) => match active.next().await {
                        Some(Ok(raw)) => Input::Message(parse_stream_message(&raw)),
                        Some(Err(err)) => Input::TransportError(err.to_string()),
                        None => {
                            Input::TransportError("stream ended before terminal status".to_string())
                        }
                    },
                    // No queued input and no open transport outside a
                    // terminal state cannot happen: every non-terminal
                    // transition queues its follow-up.
                    None => break,
                },
            };

            let (next, effects) = transition(&state, input, &self.policy);
            state = next;
            job.reconnect_attempts = job.reconnect_attempts.max(state.attempt());

            for effect in effects {
                self.run_effect(effect, &mut job, &mut stream, &mut inputs)
                    .await?;
            }
        }

        self.history.push(job.clone());
        Ok(job)
    }

    async fn run_effect(
        &mut self,
        effect: Effect,
        job: &mut ProcessingJob,
        stream: &mut Option<BoxStream<'static, Result<String, StreamError>>>,
        inputs: &mut VecDeque<Input>,
    ) -> Result<(), StreamError> {
        match effect {
            Effect::Connect => {
                info!(
                    job_id = %job.job_id,
                    attempt = job.reconnect_attempts,
                    max = self.policy.max_attempts,
                    "connecting"
                );
                match timeout(self.policy.watchdog, self.transport.connect(&job.job_id)).await {
                    Ok(Ok(opened)) => {
                        *stream = Some(opened);
                        inputs.push_back(Input::TransportOpened);
                    }
                    Ok(Err(err)) => {
                        warn!(job_id = %job.job_id, %err, "connect failed");
                        inputs.push_back(Input::TransportError(err.to_string()));
                    }
                    Err(_) => {
                        warn!(job_id = %job.job_id, "connect watchdog expired");
                        inputs.push_back(Input::WatchdogFired);
                    }
                }
            }
            // The watchdog is applied around the connect call above.
            Effect::StartWatchdog(_) => {}
            Effect::CloseTransport => {
                *stream = None;
            }
            Effect::ScheduleReconnect(delay) => {
                sleep(delay).await;
                inputs.push_back(Input::ReconnectDue);
            }
            Effect::RecordEvent(event) => {
                job.apply_event(event);
            }
            Effect::Persist => {
                if !job.is_terminal() {
                    self.jobs.save(job)?;
                }
            }
            Effect::MarkTerminal(status) => {
                job.status = status;
                self.jobs.remove(&job.job_id)?;
                info!(job_id = %job.job_id, ?status, "job reached terminal status");
            }
        }
        Ok(())
    }
}
