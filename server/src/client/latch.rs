//! Resumable wait latch over a deployment's lifecycle events
//!
//! The latch polls a [`DeploymentEventsSource`] until the deployment
//! reaches a terminal state or a caller-supplied timeout expires. A
//! timeout is not final: `continue_wait_for_lifecycle_events` resumes
//! from the cumulative event cursor, so no event is reported twice and
//! none is skipped across continuations.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use crate::errors::LifelineError;
use crate::models::deployment::DeploymentStatus;
use crate::models::event::LifecycleEvent;

/// Where the latch reads events and status from. The REST client
/// provides the production implementation; tests script their own.
#[async_trait]
pub trait DeploymentEventsSource: Send + Sync {
    async fn events(&self, from: u64, to: Option<u64>)
        -> Result<Vec<LifecycleEvent>, LifelineError>;

    async fn status(&self) -> Result<DeploymentStatus, LifelineError>;
}

/// Latch tuning knobs
#[derive(Debug, Clone)]
pub struct LatchOptions {
    /// Delay between successive event fetches
    pub poll_interval: Duration,
}

impl Default for LatchOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
        }
    }
}

/// Where a wait left off
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitState {
    Waiting,
    Succeeded,
    Failed,
    TimedOut,
}

/// Blocks until a deployment completes, surviving timeouts
pub struct LifecycleEventsLatch {
    source: Arc<dyn DeploymentEventsSource>,
    options: LatchOptions,
    state: WaitState,
    next_event_index: u64,
    observed: Vec<LifecycleEvent>,
}

impl LifecycleEventsLatch {
    pub fn new(source: Arc<dyn DeploymentEventsSource>, options: LatchOptions) -> Self {
        Self {
            source,
            options,
            state: WaitState::Waiting,
            next_event_index: 0,
            observed: Vec::new(),
        }
    }

    /// Current wait state
    pub fn state(&self) -> WaitState {
        self.state
    }

    /// Every event observed so far, across all wait calls
    pub fn observed_events(&self) -> &[LifecycleEvent] {
        &self.observed
    }

    /// Index of the next event the latch has not yet seen
    pub fn next_event_index(&self) -> u64 {
        self.next_event_index
    }

    /// Wait for the deployment to complete, from the beginning
    pub async fn wait_for_lifecycle_events(
        &mut self,
        timeout: Duration,
    ) -> Result<(), LifelineError> {
        self.wait_until(Instant::now() + timeout).await
    }

    /// Resume a wait that previously timed out. The cursor carries
    /// over, so events reported before the timeout are not replayed.
    pub async fn continue_wait_for_lifecycle_events(
        &mut self,
        timeout: Duration,
    ) -> Result<(), LifelineError> {
        if self.state == WaitState::Succeeded || self.state == WaitState::Failed {
            return Err(LifelineError::ValidationError(
                "deployment wait already reached a terminal state".to_string(),
            ));
        }
        self.state = WaitState::Waiting;
        self.wait_until(Instant::now() + timeout).await
    }

    async fn wait_until(&mut self, deadline: Instant) -> Result<(), LifelineError> {
        loop {
            self.drain_new_events().await;

            match self.source.status().await {
                Ok(DeploymentStatus::Succeeded) => {
                    // Drain once more so events appended between the
                    // fetch and the status flip are not lost.
                    self.drain_new_events().await;
                    self.state = WaitState::Succeeded;
                    info!(
                        events = self.observed.len(),
                        "Deployment completed successfully"
                    );
                    return Ok(());
                }
                Ok(DeploymentStatus::Failed) => {
                    self.state = WaitState::Failed;
                    return Err(LifelineError::DeploymentFailed(
                        "deployment reported failure".to_string(),
                    ));
                }
                Ok(DeploymentStatus::Cancelled) => {
                    self.state = WaitState::Failed;
                    return Err(LifelineError::DeploymentFailed(
                        "deployment was cancelled".to_string(),
                    ));
                }
                Ok(DeploymentStatus::TimedOut) => {
                    self.state = WaitState::Failed;
                    return Err(LifelineError::DeploymentFailed(
                        "deployment timed out on the server".to_string(),
                    ));
                }
                Ok(DeploymentStatus::InProgress) => {}
                Err(err) => {
                    // Transient server hiccups don't abort the wait.
                    warn!(error = %err, "Status query failed, retrying");
                }
            }

            if Instant::now() >= deadline {
                self.state = WaitState::TimedOut;
                return Err(LifelineError::Timeout(
                    "timed out waiting for deployment lifecycle events; \
                     the wait can be continued"
                        .to_string(),
                ));
            }

            sleep(self.options.poll_interval).await;
        }
    }

    async fn drain_new_events(&mut self) {
        match self.source.events(self.next_event_index, None).await {
            Ok(events) => {
                for event in events {
                    // The server may replay a prefix; only advance past
                    // indices we have not seen.
                    if event.sequence_index < self.next_event_index {
                        continue;
                    }
                    self.next_event_index = event.sequence_index + 1;
                    info!(
                        index = event.sequence_index,
                        service = %event.service_name,
                        "{}",
                        event.description
                    );
                    self.observed.push(event);
                }
            }
            Err(err) => {
                debug!(error = %err, "Events fetch failed, will retry");
            }
        }
    }
}

/// Drive a latch to completion, optionally asking the caller whether to
/// keep waiting after each timeout. Non-interactive mode surfaces the
/// first timeout as an error.
pub async fn wait_with_continuation<F>(
    latch: &mut LifecycleEventsLatch,
    timeout: Duration,
    interactive: bool,
    mut prompt: F,
) -> Result<(), LifelineError>
where
    F: FnMut() -> bool,
{
    let mut result = latch.wait_for_lifecycle_events(timeout).await;
    loop {
        match result {
            Err(LifelineError::Timeout(_)) if interactive => {
                if !prompt() {
                    return Err(LifelineError::UserDeclinedContinuation(
                        "wait abandoned after timeout".to_string(),
                    ));
                }
                result = latch.continue_wait_for_lifecycle_events(timeout).await;
            }
            other => return other,
        }
    }
}
