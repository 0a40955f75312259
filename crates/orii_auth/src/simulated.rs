//! Simulated collaborators with fixed latency.
//!
//! Used until a real identity provider and SMS gateway are wired in. The
//! provider always vouches for the same demo account and the passcode
//! service accepts any non-blank code.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::CollaboratorError;
use crate::provider::{IdentityProvider, OtpService, ProviderAssertion};

/// Artificial round-trip times, in milliseconds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SimulatedDelays {
    pub provider_ms: u64,
    pub dispatch_ms: u64,
    pub verify_ms: u64,
}

impl Default for SimulatedDelays {
    fn default() -> Self {
        Self {
            provider_ms: 2000,
            dispatch_ms: 1500,
            verify_ms: 1500,
        }
    }
}

impl SimulatedDelays {
    /// No latency at all; handy for scripted runs.
    pub fn instant() -> Self {
        Self {
            provider_ms: 0,
            dispatch_ms: 0,
            verify_ms: 0,
        }
    }
}

async fn pause(ms: u64) {
    if ms > 0 {
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }
}

/// Identity provider that always signs in the demo account.
#[derive(Debug, Clone)]
pub struct SimulatedIdentityProvider {
    delay_ms: u64,
    assertion: ProviderAssertion,
}

impl SimulatedIdentityProvider {
    pub fn new(delays: SimulatedDelays) -> Self {
        Self {
            delay_ms: delays.provider_ms,
            assertion: ProviderAssertion {
                display_name: Some("User".to_string()),
                contact_handle: Some("user@gmail.com".to_string()),
            },
        }
    }

    pub fn with_assertion(mut self, assertion: ProviderAssertion) -> Self {
        self.assertion = assertion;
        self
    }
}

#[async_trait]
impl IdentityProvider for SimulatedIdentityProvider {
    async fn assert_identity(&self) -> Result<ProviderAssertion, CollaboratorError> {
        debug!("Simulating identity assertion ({} ms)", self.delay_ms);
        pause(self.delay_ms).await;
        Ok(self.assertion.clone())
    }
}

/// Passcode service that never sends anything and accepts any code.
#[derive(Debug, Clone)]
pub struct SimulatedOtpService {
    delays: SimulatedDelays,
}

impl SimulatedOtpService {
    pub fn new(delays: SimulatedDelays) -> Self {
        Self { delays }
    }
}

#[async_trait]
impl OtpService for SimulatedOtpService {
    async fn dispatch(&self, phone_number: &str) -> Result<(), CollaboratorError> {
        debug!(
            "Simulating passcode dispatch to {} ({} ms)",
            phone_number, self.delays.dispatch_ms
        );
        pause(self.delays.dispatch_ms).await;
        Ok(())
    }

    async fn verify(&self, _phone_number: &str, code: &str) -> Result<bool, CollaboratorError> {
        pause(self.delays.verify_ms).await;
        Ok(!code.trim().is_empty())
    }
}
