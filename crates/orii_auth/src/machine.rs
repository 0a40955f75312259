//! The sign-in state machine.
//!
//! ```text
//! Unauthenticated --start_provider_login--> ProviderPending --(ok)--> Authenticated
//! Unauthenticated --submit_phone_number---> PhoneNumberEntry --(ok)--> OtpPending
//! OtpPending      --submit_otp------------> Authenticated
//! OtpPending      --abandon_phone_login---> Unauthenticated
//! Authenticated   --sign_out--------------> Unauthenticated
//! ```
//!
//! Every operation checks the current state and moves to the next one in a
//! single step under the state channel's lock, before any collaborator is
//! awaited. A second caller therefore always observes the pending state and
//! is refused with [`AuthError::InvalidTransition`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::error::{AuthError, AuthResult};
use crate::provider::{IdentityProvider, OtpService};
use crate::state::{AuthState, Identity};

/// Drives a visitor from anonymous to signed in through one of two paths.
pub struct AuthStateMachine {
    state: watch::Sender<AuthState>,
    provider: Arc<dyn IdentityProvider>,
    otp: Arc<dyn OtpService>,
    verifying: AtomicBool,
}

impl AuthStateMachine {
    pub fn new(provider: Arc<dyn IdentityProvider>, otp: Arc<dyn OtpService>) -> Self {
        let (state, _) = watch::channel(AuthState::Unauthenticated);
        Self {
            state,
            provider,
            otp,
            verifying: AtomicBool::new(false),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    /// Observe state changes, e.g. to re-render a login view.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Sign in through the identity provider.
    pub async fn start_provider_login(&self) -> AuthResult<Identity> {
        const OP: &str = "start_provider_login";

        self.transition(|state| match state {
            AuthState::Unauthenticated => Ok(AuthState::ProviderPending),
            other => Err(invalid(OP, other)),
        })?;

        info!("Requesting identity assertion");
        let rollback = Rollback::new(self, AuthState::Unauthenticated);

        match self.provider.assert_identity().await {
            Ok(assertion) => {
                let identity = Identity::provider(assertion.display_name, assertion.contact_handle);
                rollback.commit(AuthState::Authenticated(identity.clone()));
                info!("Signed in via identity provider");
                Ok(identity)
            }
            Err(e) => {
                warn!("Identity assertion failed: {}", e);
                drop(rollback);
                Err(AuthError::ProviderFailed(e.message))
            }
        }
    }

    /// First step of the phone path: have a passcode sent to `phone_number`.
    ///
    /// The number is opaque here; any non-blank string is accepted.
    pub async fn submit_phone_number(&self, phone_number: &str) -> AuthResult<()> {
        const OP: &str = "submit_phone_number";

        let phone_number = phone_number.trim().to_string();
        self.transition(|state| match state {
            AuthState::Unauthenticated if phone_number.is_empty() => Err(AuthError::EmptyInput {
                field: "phone number",
            }),
            AuthState::Unauthenticated => Ok(AuthState::PhoneNumberEntry {
                phone_number: phone_number.clone(),
            }),
            other => Err(invalid(OP, other)),
        })?;

        info!("Requesting passcode dispatch");
        let rollback = Rollback::new(self, AuthState::Unauthenticated);

        match self.otp.dispatch(&phone_number).await {
            Ok(()) => {
                rollback.commit(AuthState::OtpPending { phone_number });
                Ok(())
            }
            Err(e) => {
                warn!("Passcode dispatch failed: {}", e);
                drop(rollback);
                Err(AuthError::OtpDispatchFailed(e.message))
            }
        }
    }

    /// Second step of the phone path: check the passcode the visitor entered.
    ///
    /// A rejected or unverifiable code leaves the machine waiting for another
    /// attempt at the same number.
    pub async fn submit_otp(&self, code: &str) -> AuthResult<Identity> {
        const OP: &str = "submit_otp";

        let phone_number = match &*self.state.borrow() {
            AuthState::OtpPending { phone_number } => phone_number.clone(),
            other => return Err(invalid(OP, other)),
        };

        let code = code.trim();
        if code.is_empty() {
            return Err(AuthError::EmptyInput { field: "passcode" });
        }

        let _verifying = VerifyingFlag::acquire(&self.verifying)?;
        debug!("Verifying passcode");

        match self.otp.verify(&phone_number, code).await {
            Ok(true) => {
                let identity = Identity::phone(phone_number.clone());
                self.transition(|state| match state {
                    AuthState::OtpPending { phone_number: pending } if *pending == phone_number => {
                        Ok(AuthState::Authenticated(identity.clone()))
                    }
                    other => Err(invalid(OP, other)),
                })?;
                info!("Signed in via phone");
                Ok(identity)
            }
            Ok(false) => {
                info!("Passcode rejected");
                Err(AuthError::OtpRejected)
            }
            Err(e) => {
                warn!("Passcode verification failed: {}", e);
                Err(AuthError::VerificationFailed(e.message))
            }
        }
    }

    /// Give up on the phone path after a passcode was sent.
    pub fn abandon_phone_login(&self) -> AuthResult<()> {
        const OP: &str = "abandon_phone_login";

        if self.verifying.load(Ordering::Acquire) {
            return Err(AuthError::VerificationInProgress);
        }
        self.transition(|state| match state {
            AuthState::OtpPending { .. } => Ok(AuthState::Unauthenticated),
            other => Err(invalid(OP, other)),
        })
    }

    /// Discard the identity and return to the start.
    pub fn sign_out(&self) -> AuthResult<Identity> {
        const OP: &str = "sign_out";

        let mut discarded = None;
        self.transition(|state| match state {
            AuthState::Authenticated(identity) => {
                discarded = Some(identity.clone());
                Ok(AuthState::Unauthenticated)
            }
            other => Err(invalid(OP, other)),
        })?;
        info!("Signed out");

        discarded.ok_or(AuthError::InvalidTransition {
            operation: OP,
            state: "unauthenticated",
        })
    }

    /// Check-and-set under the channel lock.
    fn transition<F>(&self, next: F) -> AuthResult<()>
    where
        F: FnOnce(&AuthState) -> AuthResult<AuthState>,
    {
        let mut outcome = Ok(());
        self.state.send_if_modified(|state| match next(state) {
            Ok(new_state) => {
                debug!(from = state.name(), to = new_state.name(), "Auth transition");
                *state = new_state;
                true
            }
            Err(e) => {
                outcome = Err(e);
                false
            }
        });
        outcome
    }

    fn set(&self, new_state: AuthState) {
        let previous = self.state.send_replace(new_state);
        debug!(
            from = previous.name(),
            to = self.state.borrow().name(),
            "Auth transition"
        );
    }
}

fn invalid(operation: &'static str, state: &AuthState) -> AuthError {
    AuthError::InvalidTransition {
        operation,
        state: state.name(),
    }
}

/// Restores the pre-attempt state unless the attempt commits.
///
/// Also covers a caller dropping the future mid-flight, which would
/// otherwise strand the machine in a pending state.
struct Rollback<'a> {
    machine: &'a AuthStateMachine,
    restore: Option<AuthState>,
}

impl<'a> Rollback<'a> {
    fn new(machine: &'a AuthStateMachine, restore: AuthState) -> Self {
        Self {
            machine,
            restore: Some(restore),
        }
    }

    fn commit(mut self, new_state: AuthState) {
        self.restore = None;
        self.machine.set(new_state);
    }
}

impl Drop for Rollback<'_> {
    fn drop(&mut self) {
        if let Some(state) = self.restore.take() {
            self.machine.set(state);
        }
    }
}

struct VerifyingFlag<'a>(&'a AtomicBool);

impl<'a> VerifyingFlag<'a> {
    fn acquire(flag: &'a AtomicBool) -> AuthResult<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| AuthError::VerificationInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for VerifyingFlag<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
