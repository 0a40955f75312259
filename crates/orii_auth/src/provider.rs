//! External collaborators the sign-in flow depends on.
//!
//! The state machine only sequences calls to these traits; it never decides
//! whether an identity or passcode is valid. Real backends plug in here, and
//! the `simulated` module ships stand-ins with artificial latency.

use async_trait::async_trait;

use crate::error::CollaboratorError;

/// What an identity provider vouches for after a successful sign-in.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderAssertion {
    pub display_name: Option<String>,
    pub contact_handle: Option<String>,
}

/// One-step federated sign-in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask the provider to assert the visitor's identity.
    async fn assert_identity(&self) -> Result<ProviderAssertion, CollaboratorError>;
}

/// Two-step phone sign-in: dispatch a passcode, then verify it.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OtpService: Send + Sync {
    /// Send a one-time passcode to `phone_number`.
    async fn dispatch(&self, phone_number: &str) -> Result<(), CollaboratorError>;

    /// Check `code` against the passcode sent to `phone_number`.
    ///
    /// `Ok(false)` is a rejection; `Err` means the check itself failed.
    async fn verify(&self, phone_number: &str, code: &str) -> Result<bool, CollaboratorError>;
}
