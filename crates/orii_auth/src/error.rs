//! Error types for the sign-in flow.

use thiserror::Error;

/// Result type alias for authentication operations.
pub type AuthResult<T> = Result<T, AuthError>;

/// Errors that can occur while driving the sign-in state machine.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The operation is not permitted from the current state.
    ///
    /// Correct UI wiring never triggers this; it indicates a programming error.
    #[error("Invalid transition: {operation} is not allowed while {state}")]
    InvalidTransition {
        operation: &'static str,
        state: &'static str,
    },

    #[error("{field} must not be empty")]
    EmptyInput { field: &'static str },

    #[error("Identity provider failed: {0}")]
    ProviderFailed(String),

    #[error("Could not send one-time passcode: {0}")]
    OtpDispatchFailed(String),

    #[error("The one-time passcode was rejected")]
    OtpRejected,

    #[error("Could not verify one-time passcode: {0}")]
    VerificationFailed(String),

    #[error("A passcode verification is already in progress")]
    VerificationInProgress,
}

impl AuthError {
    /// Whether the UI should offer the user another attempt.
    ///
    /// Collaborator failures and rejected codes leave the machine in its
    /// pre-attempt state, so the same operation may simply be retried.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ProviderFailed(_)
                | Self::OtpDispatchFailed(_)
                | Self::OtpRejected
                | Self::VerificationFailed(_)
        )
    }
}

/// Failure reported by an external identity or passcode collaborator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct CollaboratorError {
    pub message: String,
}

impl CollaboratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_classification() {
        assert!(AuthError::OtpRejected.is_retryable());
        assert!(AuthError::ProviderFailed("popup closed".into()).is_retryable());
        assert!(!AuthError::VerificationInProgress.is_retryable());
        assert!(!AuthError::InvalidTransition {
            operation: "submit_otp",
            state: "unauthenticated",
        }
        .is_retryable());
    }

    #[test]
    fn test_display_names_operation_and_state() {
        let err = AuthError::InvalidTransition {
            operation: "sign_out",
            state: "provider_pending",
        };
        assert_eq!(
            err.to_string(),
            "Invalid transition: sign_out is not allowed while provider_pending"
        );
    }
}
