//! Error types for the conversation pipeline.

use std::time::Duration;

use thiserror::Error;

/// Result type for a single completion call.
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Result type for chat operations.
pub type ChatResult<T> = Result<T, ChatError>;

/// Why a completion call produced no text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// Another call already holds the single slot.
    #[error("A completion request is already in flight")]
    Busy,

    /// Network failure or non-success HTTP status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A response arrived but lacked the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Request timed out after {0:?}")]
    TimedOut(Duration),

    #[error("Request was cancelled")]
    Cancelled,
}

impl PipelineError {
    /// Failures where the endpoint could not be reached or never answered.
    pub fn is_connection_failure(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::TimedOut(_) | Self::Cancelled)
    }
}

impl From<reqwest::Error> for PipelineError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::MalformedResponse(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

/// Chat system errors.
#[derive(Error, Debug)]
pub enum ChatError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error(transparent)]
    Auth(#[from] orii_auth::AuthError),

    /// No conversation exists because nobody is signed in.
    #[error("No active chat session; sign in first")]
    NoActiveSession,

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid contact form: {0}")]
    InvalidContactForm(String),

    /// Caller-supplied input that can never be sent, such as a blank prompt.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
