//! A single conversation with the assistant.
//!
//! [`ChatSession`] owns the transcript and feeds prompts through its
//! [`RequestPipeline`]. User input is appended immediately; the reply is
//! appended when the pipeline resolves. Failed calls still produce an
//! assistant message carrying a fallback text, so every accepted prompt is
//! answered.

use parking_lot::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::DEFAULT_MAX_TOKENS;
use crate::error::PipelineError;
use crate::pipeline::RequestPipeline;
use crate::transcript::Transcript;
use crate::types::{IgnoreReason, Message, MessageRole, SendOutcome};

/// Shown when the endpoint could not be reached or never answered.
pub const CONNECTION_FALLBACK: &str =
    "I apologize, but I encountered a connection error. Please try again.";

/// Shown when the endpoint answered with nothing usable.
pub const ERROR_FALLBACK: &str = "I apologize, but I encountered an error. Please try again.";

/// Opening line of every transcript.
pub fn greeting(assistant_name: &str, visitor_name: Option<&str>) -> String {
    let addressee = visitor_name.map(|name| format!(" {}", name)).unwrap_or_default();
    format!(
        "Hello{}! I'm {}, your advanced AI assistant. How can I help you today?",
        addressee, assistant_name
    )
}

/// Fallback text for a failed completion call.
pub fn fallback_for(error: &PipelineError) -> &'static str {
    if error.is_connection_failure() {
        CONNECTION_FALLBACK
    } else {
        ERROR_FALLBACK
    }
}

struct SessionLog {
    transcript: Transcript,
    /// Bumped on reset so replies to a discarded transcript are dropped
    generation: u64,
    closed: bool,
}

/// Ordered conversation plus the pipeline that extends it.
pub struct ChatSession {
    id: Uuid,
    greeting: String,
    max_tokens: u32,
    pipeline: RequestPipeline,
    log: Mutex<SessionLog>,
}

impl ChatSession {
    pub fn new(pipeline: RequestPipeline, greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        let id = Uuid::new_v4();
        debug!(session = %id, "Starting chat session");

        Self {
            id,
            max_tokens: DEFAULT_MAX_TOKENS,
            pipeline,
            log: Mutex::new(SessionLog {
                transcript: Transcript::with_greeting(greeting.clone()),
                generation: 0,
                closed: false,
            }),
            greeting,
        }
    }

    /// Token budget sent with each prompt.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    pub fn messages(&self) -> Vec<Message> {
        self.log.lock().transcript.messages().to_vec()
    }

    pub fn len(&self) -> usize {
        self.log.lock().transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().transcript.is_empty()
    }

    /// True while a reply is outstanding; further sends are ignored.
    pub fn is_busy(&self) -> bool {
        self.pipeline.is_busy()
    }

    pub fn is_closed(&self) -> bool {
        self.log.lock().closed
    }

    /// Submit user input.
    ///
    /// Blank input, input while a reply is outstanding, and input after
    /// teardown are ignored without touching the transcript.
    pub async fn send(&self, text: &str) -> SendOutcome {
        let prompt = text.trim();
        if prompt.is_empty() {
            return SendOutcome::Ignored(IgnoreReason::EmptyInput);
        }

        let mut reservation = match self.pipeline.reserve() {
            Ok(reservation) => reservation,
            Err(_) => {
                debug!(session = %self.id, "Ignoring send while a reply is outstanding");
                return SendOutcome::Ignored(IgnoreReason::Busy);
            }
        };

        let (user, generation) = {
            let mut log = self.log.lock();
            if log.closed {
                return SendOutcome::Ignored(IgnoreReason::Closed);
            }
            (log.transcript.append(MessageRole::User, prompt), log.generation)
        };

        let reply = match reservation.submit(prompt, self.max_tokens).await {
            Ok(output) if !output.text.trim().is_empty() => output.text,
            Ok(_) => {
                warn!(session = %self.id, "Completion endpoint returned an empty reply");
                ERROR_FALLBACK.to_string()
            }
            Err(e) => {
                info!(session = %self.id, "Answering with fallback after: {}", e);
                fallback_for(&e).to_string()
            }
        };

        let mut log = self.log.lock();
        if log.closed || log.generation != generation {
            debug!(session = %self.id, "Dropping reply to a discarded transcript");
            return SendOutcome::Discarded { user };
        }
        let assistant = log.transcript.append(MessageRole::Assistant, reply);
        drop(log);
        drop(reservation);

        SendOutcome::Completed { user, assistant }
    }

    /// Start a new chat: the transcript becomes a single fresh greeting.
    ///
    /// An outstanding call keeps running to completion and keeps the slot
    /// until then; its reply is dropped instead of appended.
    pub fn reset(&self) {
        let mut log = self.log.lock();
        log.transcript.restart(self.greeting.clone());
        log.generation += 1;
        drop(log);
        info!(session = %self.id, "Chat reset");
    }

    /// Abort the outstanding call; it is answered with the connection fallback.
    pub fn cancel_pending(&self) -> bool {
        self.pipeline.cancel()
    }

    /// Discard the transcript for good; later sends are ignored.
    ///
    /// Like [`Self::reset`], an outstanding call is left to finish and its
    /// reply is dropped.
    pub(crate) fn teardown(&self) {
        let mut log = self.log.lock();
        log.closed = true;
        log.transcript.clear();
        drop(log);
        info!(session = %self.id, "Chat session torn down");
    }
}

impl std::fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let log = self.log.lock();
        f.debug_struct("ChatSession")
            .field("id", &self.id)
            .field("messages", &log.transcript.len())
            .field("closed", &log.closed)
            .field("busy", &self.pipeline.is_busy())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::ScriptedClient;
    use std::sync::Arc;

    fn session(client: &ScriptedClient) -> ChatSession {
        ChatSession::new(
            RequestPipeline::new(Arc::new(client.clone())),
            greeting("Orii-O1", Some("Ada")),
        )
    }

    #[test]
    fn test_greeting_text() {
        assert_eq!(
            greeting("Orii-O1", Some("Ada")),
            "Hello Ada! I'm Orii-O1, your advanced AI assistant. How can I help you today?"
        );
        assert!(greeting("Orii-O1", None).starts_with("Hello! I'm Orii-O1"));
    }

    #[test]
    fn test_new_session_holds_greeting() {
        let chat = session(&ScriptedClient::new());
        let messages = chat.messages();

        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, 1);
        assert_eq!(messages[0].role, MessageRole::Assistant);
        assert!(messages[0].text.contains("Ada"));
    }

    #[tokio::test]
    async fn test_send_appends_user_then_assistant() {
        let client = ScriptedClient::new().reply("Rust is a systems language.");
        let chat = session(&client);

        let outcome = chat.send("  What is Rust?  ").await;

        let SendOutcome::Completed { user, assistant } = outcome.clone() else {
            panic!("expected a completed exchange, got {:?}", outcome);
        };
        assert_eq!(user.id, 2);
        assert_eq!(user.text, "What is Rust?");
        assert_eq!(assistant.id, 3);
        assert_eq!(assistant.text, "Rust is a systems language.");
        assert_eq!(client.captured_requests()[0].prompt, "What is Rust?");
        assert_eq!(client.captured_requests()[0].max_tokens, 150);
    }

    #[tokio::test]
    async fn test_blank_input_is_ignored() {
        let client = ScriptedClient::new();
        let chat = session(&client);

        assert_eq!(chat.send("").await, SendOutcome::Ignored(IgnoreReason::EmptyInput));
        assert_eq!(chat.send("   ").await, SendOutcome::Ignored(IgnoreReason::EmptyInput));
        assert_eq!(chat.len(), 1);
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_send_while_outstanding_is_ignored() {
        let client = ScriptedClient::new().reply("first answer");
        let gate = client.hold();
        let chat = session(&client);

        let first = chat.send("first");
        tokio::pin!(first);
        assert!(futures::poll!(first.as_mut()).is_pending());
        assert_eq!(chat.len(), 2);
        assert!(chat.is_busy());

        assert_eq!(chat.send("second").await, SendOutcome::Ignored(IgnoreReason::Busy));
        assert_eq!(chat.len(), 2);

        gate.notify_one();
        let outcome = first.await;
        assert_eq!(outcome.reply().map(|m| m.text.as_str()), Some("first answer"));
        assert_eq!(chat.len(), 3);
        assert_eq!(client.call_count(), 1);
    }

    #[tokio::test]
    async fn test_transport_error_yields_connection_fallback() {
        let client = ScriptedClient::new().fail(PipelineError::Transport("refused".into()));
        let chat = session(&client);

        let outcome = chat.send("hello").await;

        assert_eq!(outcome.reply().map(|m| m.text.as_str()), Some(CONNECTION_FALLBACK));
        assert_eq!(chat.len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_and_empty_replies_yield_error_fallback() {
        let client = ScriptedClient::new()
            .fail(PipelineError::MalformedResponse("missing 'response' field".into()))
            .reply("   ");
        let chat = session(&client);

        let first = chat.send("one").await;
        let second = chat.send("two").await;

        assert_eq!(first.reply().map(|m| m.text.as_str()), Some(ERROR_FALLBACK));
        assert_eq!(second.reply().map(|m| m.text.as_str()), Some(ERROR_FALLBACK));
        assert_eq!(chat.len(), 5);
    }

    #[tokio::test]
    async fn test_reset_restarts_ids() {
        let chat = session(&ScriptedClient::new());
        for prompt in ["a", "b", "c"] {
            chat.send(prompt).await;
        }
        assert_eq!(chat.len(), 7);

        chat.reset();

        let messages = chat.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, 1);
        assert_eq!(chat.send("again").await.reply().map(|m| m.id), Some(3));
    }

    #[tokio::test]
    async fn test_reset_lets_outstanding_call_finish_and_drops_reply() {
        let client = ScriptedClient::new().reply("stale");
        let gate = client.hold();
        let chat = session(&client);

        let pending = chat.send("before reset");
        tokio::pin!(pending);
        assert!(futures::poll!(pending.as_mut()).is_pending());

        chat.reset();

        assert!(futures::poll!(pending.as_mut()).is_pending());
        assert!(chat.is_busy());
        assert_eq!(chat.send("too early").await, SendOutcome::Ignored(IgnoreReason::Busy));
        assert_eq!(client.call_count(), 1);

        gate.notify_one();
        let outcome = pending.await;
        assert!(matches!(outcome, SendOutcome::Discarded { .. }));
        assert_eq!(client.completed_count(), 1);
        assert_eq!(chat.len(), 1);
        assert!(!chat.is_busy());
    }

    #[tokio::test]
    async fn test_teardown_lets_outstanding_call_finish() {
        let client = ScriptedClient::new().reply("late");
        let gate = client.hold();
        let chat = session(&client);

        let pending = chat.send("before sign-out");
        tokio::pin!(pending);
        assert!(futures::poll!(pending.as_mut()).is_pending());

        chat.teardown();
        assert!(chat.is_busy());

        gate.notify_one();
        assert!(matches!(pending.await, SendOutcome::Discarded { .. }));
        assert_eq!(client.completed_count(), 1);
        assert!(chat.is_empty());
    }

    #[tokio::test]
    async fn test_cancel_pending_answers_with_fallback() {
        let client = ScriptedClient::new();
        let _gate = client.hold();
        let chat = session(&client);

        let pending = chat.send("slow question");
        tokio::pin!(pending);
        assert!(futures::poll!(pending.as_mut()).is_pending());

        assert!(chat.cancel_pending());

        let outcome = pending.await;
        assert_eq!(outcome.reply().map(|m| m.text.as_str()), Some(CONNECTION_FALLBACK));
    }

    #[tokio::test]
    async fn test_teardown_closes_session() {
        let chat = session(&ScriptedClient::new());
        chat.send("hi").await;

        chat.teardown();

        assert!(chat.is_closed());
        assert!(chat.is_empty());
        assert_eq!(chat.send("anyone?").await, SendOutcome::Ignored(IgnoreReason::Closed));
    }

    #[tokio::test]
    async fn test_custom_token_budget() {
        let client = ScriptedClient::new();
        let chat = session(&client).with_max_tokens(512);

        chat.send("long answer please").await;

        assert_eq!(client.captured_requests()[0].max_tokens, 512);
    }
}
