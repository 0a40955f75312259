//! Single-slot access to the completion endpoint.
//!
//! At most one call is outstanding at any time. There is no queue and no
//! retry: a caller that finds the slot taken gets [`PipelineError::Busy`] and
//! must wait for the current call to resolve. Because only one call can be in
//! flight, results always come back in submission order.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::{AbortHandle, Abortable, Aborted};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::api::CompletionClient;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CompletionOutput, CompletionRequest};

/// Limits applied to each call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallPolicy {
    /// `None` waits for the endpoint indefinitely
    pub timeout: Option<Duration>,
}

impl CallPolicy {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
        }
    }
}

/// Guards the one outstanding completion call.
pub struct RequestPipeline {
    client: Arc<dyn CompletionClient>,
    policy: CallPolicy,
    busy: AtomicBool,
    in_flight: Mutex<Option<AbortHandle>>,
}

impl RequestPipeline {
    pub fn new(client: Arc<dyn CompletionClient>) -> Self {
        Self {
            client,
            policy: CallPolicy::default(),
            busy: AtomicBool::new(false),
            in_flight: Mutex::new(None),
        }
    }

    pub fn with_policy(mut self, policy: CallPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> CallPolicy {
        self.policy
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Claim the slot without issuing a call yet.
    ///
    /// The slot is released when the reservation is dropped, whether or not
    /// it was submitted.
    pub fn reserve(&self) -> PipelineResult<Reservation<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| {
                debug!("Completion slot busy, rejecting submission");
                PipelineError::Busy
            })?;
        Ok(Reservation { pipeline: self })
    }

    /// Claim the slot and run one call through it.
    pub async fn submit(
        &self,
        prompt: impl Into<String>,
        max_tokens: u32,
    ) -> PipelineResult<CompletionOutput> {
        let mut reservation = self.reserve()?;
        reservation.submit(prompt, max_tokens).await
    }

    /// Abort the in-flight call, which then resolves with
    /// [`PipelineError::Cancelled`]. Returns false when nothing is in flight.
    pub fn cancel(&self) -> bool {
        match self.in_flight.lock().take() {
            Some(handle) => {
                info!("Cancelling in-flight completion request");
                handle.abort();
                true
            }
            None => false,
        }
    }
}

/// Exclusive claim on the pipeline's slot.
pub struct Reservation<'a> {
    pipeline: &'a RequestPipeline,
}

impl Reservation<'_> {
    /// Issue the call and wait for it to resolve.
    ///
    /// The slot stays claimed until the reservation is dropped, so a caller
    /// can record the result before anyone else gets in.
    pub async fn submit(
        &mut self,
        prompt: impl Into<String>,
        max_tokens: u32,
    ) -> PipelineResult<CompletionOutput> {
        let request = CompletionRequest {
            prompt: prompt.into(),
            max_tokens,
        };
        let (handle, registration) = AbortHandle::new_pair();
        *self.pipeline.in_flight.lock() = Some(handle);

        info!(
            prompt_len = request.prompt.len(),
            max_tokens, "Submitting completion request"
        );
        let started = Instant::now();
        let call = Abortable::new(self.pipeline.client.complete(&request), registration);

        let outcome = match self.pipeline.policy.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    warn!("Completion request timed out after {:?}", limit);
                    return Err(PipelineError::TimedOut(limit));
                }
            },
            None => call.await,
        };

        self.pipeline.in_flight.lock().take();

        let result = match outcome {
            Ok(result) => result,
            Err(Aborted) => Err(PipelineError::Cancelled),
        };
        match &result {
            Ok(output) => debug!(
                elapsed_ms = started.elapsed().as_millis() as u64,
                reply_len = output.text.len(),
                "Completion request resolved"
            ),
            Err(e) => warn!("Completion request failed: {}", e),
        }
        result
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        self.pipeline.in_flight.lock().take();
        self.pipeline.busy.store(false, Ordering::Release);
    }
}
