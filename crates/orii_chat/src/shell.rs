//! Ties sign-in to the chat lifecycle.
//!
//! No conversation exists until the [`AuthStateMachine`] reaches
//! `Authenticated`; signing out discards both the identity and the
//! conversation.

use std::sync::Arc;

use orii_auth::{AuthState, AuthStateMachine, Identity};
use tokio::sync::watch;
use tracing::info;

use crate::api::CompletionClient;
use crate::config::ChatConfig;
use crate::error::{ChatError, ChatResult};
use crate::pipeline::{CallPolicy, RequestPipeline};
use crate::session::{greeting, ChatSession};

/// Owns the sign-in flow and, once signed in, the conversation.
pub struct SessionShell {
    auth: AuthStateMachine,
    /// Marks auth transitions not yet reconciled
    auth_events: watch::Receiver<AuthState>,
    client: Arc<dyn CompletionClient>,
    config: ChatConfig,
    session: Option<Arc<ChatSession>>,
}

impl SessionShell {
    pub fn new(auth: AuthStateMachine, client: Arc<dyn CompletionClient>, config: ChatConfig) -> Self {
        let mut auth_events = auth.subscribe();
        auth_events.mark_changed();
        Self {
            auth,
            auth_events,
            client,
            config,
            session: None,
        }
    }

    pub fn auth(&self) -> &AuthStateMachine {
        &self.auth
    }

    pub fn auth_state(&self) -> AuthState {
        self.auth.state()
    }

    pub fn identity(&self) -> Option<Identity> {
        self.auth.identity()
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    /// The live conversation, if signed in.
    pub fn session(&self) -> Option<Arc<ChatSession>> {
        self.session.clone()
    }

    pub fn require_session(&self) -> ChatResult<Arc<ChatSession>> {
        self.session.clone().ok_or(ChatError::NoActiveSession)
    }

    pub async fn login_with_provider(&mut self) -> ChatResult<Arc<ChatSession>> {
        self.auth.start_provider_login().await?;
        self.reconcile();
        self.require_session()
    }

    pub async fn submit_phone_number(&self, phone_number: &str) -> ChatResult<()> {
        Ok(self.auth.submit_phone_number(phone_number).await?)
    }

    pub async fn submit_otp(&mut self, code: &str) -> ChatResult<Arc<ChatSession>> {
        self.auth.submit_otp(code).await?;
        self.reconcile();
        self.require_session()
    }

    pub fn abandon_phone_login(&self) -> ChatResult<()> {
        Ok(self.auth.abandon_phone_login()?)
    }

    /// "New chat": restart the current conversation from its greeting.
    pub fn new_chat(&self) -> ChatResult<()> {
        self.require_session()?.reset();
        Ok(())
    }

    /// Discard the identity and tear the conversation down.
    pub fn sign_out(&mut self) -> ChatResult<Identity> {
        let identity = self.auth.sign_out()?;
        self.reconcile();
        Ok(identity)
    }

    /// Bring the conversation in line with the sign-in state.
    ///
    /// Needed only when the machine is driven directly through [`Self::auth`].
    /// Any auth transition since the last call ends the current conversation,
    /// so a sign-out followed by a new sign-in never inherits the old one.
    pub fn reconcile(&mut self) {
        let changed = self.auth_events.has_changed().unwrap_or(true);
        if !changed {
            return;
        }
        let identity = self.auth_events.borrow_and_update().identity().cloned();

        if let Some(session) = self.session.take() {
            session.teardown();
        }
        if let Some(identity) = identity {
            self.session = Some(Arc::new(self.build_session(&identity)));
        }
    }

    fn build_session(&self, identity: &Identity) -> ChatSession {
        let policy = CallPolicy {
            timeout: self.config.request_timeout(),
        };
        let pipeline = RequestPipeline::new(self.client.clone()).with_policy(policy);
        let session = ChatSession::new(
            pipeline,
            greeting(&self.config.assistant_name, identity.greeting_name()),
        )
        .with_max_tokens(self.config.max_tokens);

        info!(
            session = %session.id(),
            method = ?identity.auth_method,
            "Chat session started"
        );
        session
    }
}
