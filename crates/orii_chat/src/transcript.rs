//! The append-only message log.

use crate::types::{Message, MessageId, MessageRole};

/// Ordered messages of one conversation.
///
/// Ids are allocated at append time as `last id + 1`, so display order is id
/// order. Only [`Transcript::restart`] removes messages.
#[derive(Debug, Clone, Default)]
pub struct Transcript {
    messages: Vec<Message>,
}

impl Transcript {
    /// A transcript holding a single assistant greeting with id 1.
    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        let mut transcript = Self::default();
        transcript.append(MessageRole::Assistant, greeting);
        transcript
    }

    pub fn append(&mut self, role: MessageRole, text: impl Into<String>) -> Message {
        let message = Message::new(self.last_id() + 1, role, text);
        self.messages.push(message.clone());
        message
    }

    /// Drop everything and start over from a fresh greeting.
    pub fn restart(&mut self, greeting: impl Into<String>) {
        *self = Self::with_greeting(greeting);
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn last_id(&self) -> MessageId {
        self.messages.last().map(|m| m.id).unwrap_or(0)
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
