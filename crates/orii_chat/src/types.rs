//! Core types for the conversation.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

/// Message id, unique and increasing within one transcript.
pub type MessageId = u64;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

/// A single chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    /// Role of the message sender
    pub role: MessageRole,
    pub text: String,
    /// When the message was appended
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub(crate) fn new(id: MessageId, role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            id,
            role,
            text: text.into(),
            created_at: Utc::now(),
        }
    }

    pub fn is_user(&self) -> bool {
        self.role == MessageRole::User
    }

    /// Local wall-clock time, `HH:MM`.
    pub fn display_time(&self) -> String {
        self.created_at.with_timezone(&Local).format("%H:%M").to_string()
    }
}

/// Body of a `POST /api/demo` call.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CompletionRequest {
    pub prompt: String,
    pub max_tokens: u32,
}

/// Successful result of a completion call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionOutput {
    pub text: String,
    /// Model name, when the endpoint reports one
    pub model: Option<String>,
    pub tokens_used: Option<u64>,
}

/// What became of a `send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Nothing was appended.
    Ignored(IgnoreReason),
    /// A user message and its reply were appended.
    Completed { user: Message, assistant: Message },
    /// The user message was appended but the transcript was reset or torn
    /// down before the reply arrived, so the reply was dropped.
    Discarded { user: Message },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    EmptyInput,
    /// A previous send is still waiting on the endpoint.
    Busy,
    /// The session was torn down by sign-out.
    Closed,
}

impl SendOutcome {
    pub fn reply(&self) -> Option<&Message> {
        match self {
            Self::Completed { assistant, .. } => Some(assistant),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_serializes_wire_names() {
        let message = Message::new(3, MessageRole::Assistant, "hi");
        let json = serde_json::to_value(&message).unwrap();

        assert_eq!(json["id"], 3);
        assert_eq!(json["role"], "assistant");
        assert_eq!(json["text"], "hi");
        assert!(json.get("createdAt").is_some());
    }

    #[test]
    fn test_display_time_is_hours_and_minutes() {
        let message = Message::new(1, MessageRole::User, "x");
        let shown = message.display_time();

        assert_eq!(shown.len(), 5);
        assert_eq!(&shown[2..3], ":");
    }
}
