//! Scripted completion client for testing.
//!
//! Replies are served in the order they were queued; once the queue is empty
//! the client echoes the prompt. A gate can hold every call until the test
//! releases it, which is how in-flight behaviour is exercised.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::Notify;

use crate::api::CompletionClient;
use crate::error::{PipelineError, PipelineResult};
use crate::types::{CompletionOutput, CompletionRequest};

/// Completion client that returns predefined results.
#[derive(Clone, Default)]
pub struct ScriptedClient {
    replies: Arc<Mutex<VecDeque<PipelineResult<String>>>>,
    captured: Arc<RwLock<Vec<CompletionRequest>>>,
    calls: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
    gate: Arc<RwLock<Option<Arc<Notify>>>>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful reply.
    pub fn reply(self, text: impl Into<String>) -> Self {
        self.replies.lock().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure.
    pub fn fail(self, error: PipelineError) -> Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    /// Make every subsequent call wait for a permit on the returned gate.
    pub fn hold(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.write() = Some(gate.clone());
        gate
    }

    /// Let calls through immediately again.
    pub fn release_all(&self) {
        if let Some(gate) = self.gate.write().take() {
            gate.notify_waiters();
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to the end rather than being dropped mid-flight.
    pub fn completed_count(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }

    pub fn captured_requests(&self) -> Vec<CompletionRequest> {
        self.captured.read().clone()
    }
}

#[async_trait]
impl CompletionClient for ScriptedClient {
    async fn complete(&self, request: &CompletionRequest) -> PipelineResult<CompletionOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.captured.write().push(request.clone());

        let gate = self.gate.read().clone();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        self.completed.fetch_add(1, Ordering::SeqCst);
        let next = self.replies.lock().pop_front();
        let text = match next {
            Some(reply) => reply?,
            None => format!("Echo: {}", request.prompt),
        };

        Ok(CompletionOutput {
            text,
            model: Some("scripted".to_string()),
            tokens_used: None,
        })
    }
}
