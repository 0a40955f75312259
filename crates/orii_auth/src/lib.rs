//! # orii_auth
//!
//! Sign-in flow for the Orii-O1 client.
//!
//! A visitor signs in through exactly one of two paths:
//!
//! - **Provider**: a single round trip to a federated identity provider.
//! - **Phone**: a passcode is dispatched to a phone number, then verified.
//!
//! [`AuthStateMachine`] sequences those round trips and yields an
//! [`Identity`]. It never judges credentials itself; that is delegated to the
//! [`IdentityProvider`] and [`OtpService`] collaborators.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use orii_auth::{AuthStateMachine, SimulatedDelays, SimulatedIdentityProvider, SimulatedOtpService};
//!
//! let delays = SimulatedDelays::default();
//! let machine = AuthStateMachine::new(
//!     Arc::new(SimulatedIdentityProvider::new(delays)),
//!     Arc::new(SimulatedOtpService::new(delays)),
//! );
//!
//! machine.submit_phone_number("+15551234567").await?;
//! let identity = machine.submit_otp("000000").await?;
//! ```

pub mod error;
pub mod machine;
pub mod provider;
pub mod simulated;
pub mod state;

pub use error::{AuthError, AuthResult, CollaboratorError};
pub use machine::AuthStateMachine;
pub use provider::{IdentityProvider, OtpService, ProviderAssertion};
pub use simulated::{SimulatedDelays, SimulatedIdentityProvider, SimulatedOtpService};
pub use state::{AuthMethod, AuthState, Identity};
