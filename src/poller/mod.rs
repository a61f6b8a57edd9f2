//! Polling client for asynchronous generation jobs
//!
//! A [`JobService`] accepts a request and either answers immediately or hands
//! back a [`JobHandle`]. [`JobPoller`] turns that into a single terminal
//! [`PollOutcome`], querying the job on a fixed interval until it finishes,
//! fails, runs out of attempts, or the caller cancels.

pub mod mock;

pub use mock::MockJobService;

use crate::{Error, Result};
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 30;
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Identifier of a remote job. Only meaningful to the service that issued it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobHandle(String);

impl JobHandle {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for JobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// What a service returns when a request is accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum Submission<T> {
    /// Work continues remotely and must be polled.
    Queued(JobHandle),
    /// The provider finished synchronously.
    Completed(T),
}

/// Remote job state as reported by one status query.
#[derive(Debug, Clone, PartialEq)]
pub enum JobStatus<T> {
    Pending,
    Processing,
    Succeeded(T),
    Failed(String),
}

impl<T> JobStatus<T> {
    fn state(&self) -> AttemptState {
        match self {
            JobStatus::Pending => AttemptState::Pending,
            JobStatus::Processing => AttemptState::Processing,
            JobStatus::Succeeded(_) => AttemptState::Succeeded,
            JobStatus::Failed(_) => AttemptState::Failed,
        }
    }
}

/// What a single attempt observed, reported to progress observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    Pending,
    Processing,
    Succeeded,
    Failed,
    TransportError,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollProgress {
    pub attempt: u32,
    pub max_attempts: u32,
    pub state: AttemptState,
}

/// Cause carried by [`PollOutcome::Error`].
#[derive(thiserror::Error, Debug)]
pub enum PollError {
    /// The request was rejected or never reached the service. Not retried.
    #[error("submission failed: {0}")]
    Submission(#[source] Error),

    /// The service reported that the job itself failed. Not retried.
    #[error("job failed: {0}")]
    JobFailure(String),

    /// Every remaining attempt hit a transport or protocol error; holds the last one.
    #[error("status query failed: {0}")]
    Transport(#[source] Error),
}

/// Terminal result of one [`JobPoller::submit_and_await`] call.
#[derive(Debug)]
pub enum PollOutcome<T> {
    Ready(T),
    /// Attempts ran out while the job was still pending or processing.
    TimedOut,
    Error(PollError),
    Cancelled,
}

impl<T> PollOutcome<T> {
    pub fn is_ready(&self) -> bool {
        matches!(self, PollOutcome::Ready(_))
    }
}

/// Attempt budget and fixed wait between status queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    max_attempts: u32,
    interval: Duration,
}

impl PollConfig {
    pub fn new(max_attempts: u32, interval: Duration) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::Config(
                "poll max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            max_attempts,
            interval,
        })
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

impl Default for PollConfig {
    /// 30 attempts, 10 seconds apart.
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: DEFAULT_INTERVAL,
        }
    }
}

/// A provider API that runs generation work as jobs.
///
/// `submit` covers the submission endpoint, `status` the status endpoint.
/// Non-success responses and malformed bodies are reported as `Err`.
#[async_trait]
pub trait JobService: Send + Sync {
    type Request: Send + Sync;
    type Output: Send;

    async fn submit(&self, request: &Self::Request) -> Result<Submission<Self::Output>>;
    async fn status(&self, handle: &JobHandle) -> Result<JobStatus<Self::Output>>;
}

type ProgressFn<'a> = &'a (dyn Fn(PollProgress) + Send + Sync);

/// Drives a [`JobService`] from submission to a terminal outcome.
///
/// Holds no state between calls; each `submit_and_await` starts again at
/// attempt 1.
pub struct JobPoller<'a, S: ?Sized> {
    service: &'a S,
    on_progress: Option<ProgressFn<'a>>,
    cancel: Option<CancellationToken>,
}

impl<'a, S> JobPoller<'a, S>
where
    S: JobService + ?Sized,
{
    pub fn new(service: &'a S) -> Self {
        Self {
            service,
            on_progress: None,
            cancel: None,
        }
    }

    /// Observer called once per status query. It cannot influence polling.
    pub fn with_progress(mut self, on_progress: ProgressFn<'a>) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub async fn submit_and_await(
        &self,
        request: &S::Request,
        config: &PollConfig,
    ) -> PollOutcome<S::Output> {
        if self.is_cancelled() {
            return PollOutcome::Cancelled;
        }

        let handle = match self.service.submit(request).await {
            Ok(Submission::Completed(result)) => {
                debug!("Job completed synchronously at submission");
                return PollOutcome::Ready(result);
            }
            Ok(Submission::Queued(handle)) => handle,
            Err(e) => {
                warn!("Job submission failed: {}", e);
                return PollOutcome::Error(PollError::Submission(e));
            }
        };

        info!("Submitted job {}", handle);
        self.await_job(&handle, config).await
    }

    /// Poll an already submitted job.
    pub async fn await_job(
        &self,
        handle: &JobHandle,
        config: &PollConfig,
    ) -> PollOutcome<S::Output> {
        let max_attempts = config.max_attempts();
        let mut last_error: Option<Error> = None;

        for attempt in 1..=max_attempts {
            if attempt > 1 && !self.wait(config.interval()).await {
                info!("[job {}] Cancelled before attempt {}", handle, attempt);
                return PollOutcome::Cancelled;
            }
            if self.is_cancelled() {
                info!("[job {}] Cancelled before attempt {}", handle, attempt);
                return PollOutcome::Cancelled;
            }

            match self.service.status(handle).await {
                Ok(status) => {
                    debug!(
                        "[job {}] attempt {}/{}: {:?}",
                        handle,
                        attempt,
                        max_attempts,
                        status.state()
                    );
                    self.notify(attempt, max_attempts, status.state());

                    match status {
                        JobStatus::Succeeded(result) => {
                            info!("[job {}] Succeeded after {} attempt(s)", handle, attempt);
                            return PollOutcome::Ready(result);
                        }
                        JobStatus::Failed(reason) => {
                            warn!("[job {}] Failed: {}", handle, reason);
                            return PollOutcome::Error(PollError::JobFailure(reason));
                        }
                        JobStatus::Pending | JobStatus::Processing => last_error = None,
                    }
                }
                Err(e) => {
                    warn!(
                        "[job {}] Status query failed (attempt {}/{}): {}",
                        handle, attempt, max_attempts, e
                    );
                    self.notify(attempt, max_attempts, AttemptState::TransportError);
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) => {
                warn!(
                    "[job {}] Giving up after {} attempts, status queries failing",
                    handle, max_attempts
                );
                PollOutcome::Error(PollError::Transport(e))
            }
            None => {
                warn!(
                    "[job {}] Timed out after {} attempts",
                    handle, max_attempts
                );
                PollOutcome::TimedOut
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|token| token.is_cancelled())
    }

    /// Returns `false` when the wait was cut short by cancellation.
    async fn wait(&self, interval: Duration) -> bool {
        match &self.cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => false,
                _ = tokio::time::sleep(interval) => true,
            },
            None => {
                tokio::time::sleep(interval).await;
                true
            }
        }
    }

    fn notify(&self, attempt: u32, max_attempts: u32, state: AttemptState) {
        if let Some(on_progress) = self.on_progress {
            on_progress(PollProgress {
                attempt,
                max_attempts,
                state,
            });
        }
    }
}
