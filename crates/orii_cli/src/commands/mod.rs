//! CLI command definitions.
//!
//! Each subcommand maps to one interaction with the Orii-O1 backend.

use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use orii_chat::{ApiClient, CallPolicy, ChatConfig};

pub mod ask;
pub mod chat;
pub mod contact;
pub mod health;
pub mod model_info;

/// Orii-O1 - talk to the Orii-O1 assistant from your terminal
#[derive(Parser)]
#[command(name = "orii")]
#[command(version, about = "Orii-O1 - talk to the Orii-O1 assistant from your terminal")]
#[command(long_about = r#"
Terminal client for the Orii-O1 assistant.

COMMANDS:
  chat        → Sign in and hold an interactive conversation
  ask         → Send a single prompt and print the reply
  health      → Check that the backend is up
  model-info  → Show the model's published capabilities
  contact     → Send a message to the Orii-Gen team

CONFIGURATION:
  .orii/settings.json   backendUrl, maxTokens, requestTimeoutSecs, assistantName
  ORII_BACKEND_URL, ORII_MAX_TOKENS, ORII_REQUEST_TIMEOUT_SECS
  Command-line flags override both.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Backend unreachable or misbehaving
  4 - Sign-in failed
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    #[command(flatten)]
    pub backend: BackendArgs,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and chat interactively
    Chat(chat::ChatArgs),

    /// Send one prompt and print the reply
    Ask(ask::AskArgs),

    /// Check backend health
    Health,

    /// Show model information
    #[command(name = "model-info")]
    ModelInfo(model_info::ModelInfoArgs),

    /// Submit the contact form
    Contact(contact::ContactArgs),
}

/// Overrides for the resolved configuration.
#[derive(Args, Debug, Default)]
pub struct BackendArgs {
    /// Backend base URL
    #[arg(long, global = true)]
    pub backend_url: Option<String>,

    /// Token budget per prompt
    #[arg(long, global = true)]
    pub max_tokens: Option<u32>,

    /// Give up on a request after this many seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,
}

impl BackendArgs {
    /// Settings file and environment, then these flags.
    pub fn resolve(&self) -> Result<ChatConfig> {
        self.resolve_in(&std::env::current_dir()?)
    }

    fn resolve_in(&self, root: &Path) -> Result<ChatConfig> {
        let config = ChatConfig::load(root)?;
        Ok(self.apply(config).validated()?)
    }

    fn apply(&self, mut config: ChatConfig) -> ChatConfig {
        if let Some(url) = &self.backend_url {
            config.backend_url = url.clone();
        }
        if let Some(max_tokens) = self.max_tokens {
            config.max_tokens = max_tokens;
        }
        if let Some(timeout) = self.timeout {
            config.request_timeout_secs = Some(timeout);
        }
        config
    }
}

pub fn call_policy(config: &ChatConfig) -> CallPolicy {
    CallPolicy {
        timeout: config.request_timeout(),
    }
}

pub fn api_client(config: &ChatConfig) -> ApiClient {
    ApiClient::new(config.clone())
}

pub fn describe_timeout(timeout: Option<Duration>) -> String {
    match timeout {
        Some(timeout) => format!("{}s", timeout.as_secs()),
        None => "none".to_string(),
    }
}
