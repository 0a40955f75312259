//! Sign-in states and the identity produced by a successful sign-in.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How the visitor proved who they are.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AuthMethod {
    /// One-step federated identity provider.
    Provider,
    /// Two-step phone number + one-time passcode.
    Phone,
}

/// An authenticated visitor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Identity {
    #[serde(rename = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Email address or phone number, depending on the method.
    #[serde(rename = "contactHandle", skip_serializing_if = "Option::is_none")]
    pub contact_handle: Option<String>,
    #[serde(rename = "authMethod")]
    pub auth_method: AuthMethod,
    #[serde(rename = "authenticatedAt")]
    pub authenticated_at: DateTime<Utc>,
}

impl Identity {
    pub fn provider(display_name: Option<String>, contact_handle: Option<String>) -> Self {
        Self {
            display_name,
            contact_handle,
            auth_method: AuthMethod::Provider,
            authenticated_at: Utc::now(),
        }
    }

    /// Identity for a verified phone number.
    ///
    /// A passcode proves only the number, so no display name is recorded and
    /// the visitor is greeted without one ("Hello! ...") rather than with a
    /// placeholder name.
    pub fn phone(phone_number: impl Into<String>) -> Self {
        Self {
            display_name: None,
            contact_handle: Some(phone_number.into()),
            auth_method: AuthMethod::Phone,
            authenticated_at: Utc::now(),
        }
    }

    /// Name to greet the visitor with, if any non-blank one is known.
    pub fn greeting_name(&self) -> Option<&str> {
        self.display_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Current position in the sign-in flow.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AuthState {
    #[default]
    Unauthenticated,
    /// Waiting on the identity provider's assertion.
    ProviderPending,
    /// Waiting on the passcode to be dispatched to the number.
    PhoneNumberEntry { phone_number: String },
    /// Passcode sent; waiting for the visitor to enter it.
    OtpPending { phone_number: String },
    Authenticated(Identity),
}

impl AuthState {
    /// Stable snake_case name, used in logs and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthenticated => "unauthenticated",
            Self::ProviderPending => "provider_pending",
            Self::PhoneNumberEntry { .. } => "phone_number_entry",
            Self::OtpPending { .. } => "otp_pending",
            Self::Authenticated(_) => "authenticated",
        }
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    /// True while an external collaborator call is outstanding.
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::ProviderPending | Self::PhoneNumberEntry { .. })
    }

    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Authenticated(identity) => Some(identity),
            _ => None,
        }
    }
}

impl std::fmt::Display for AuthState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
