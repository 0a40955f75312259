//! # orii_chat - Conversation client for Orii-O1
//!
//! This crate provides the conversational half of the client:
//! - An append-only transcript of user and assistant messages
//! - A single-slot pipeline to the completion endpoint
//! - Fallback replies so a failed call never stalls the transcript
//! - A shell that starts and tears down conversations as the visitor
//!   signs in and out
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐  identity  ┌─────────────────┐
//! │ AuthStateMachine│───────────▶│  SessionShell   │
//! └─────────────────┘            └────────┬────────┘
//!                                         │ owns
//!                                         ▼
//!                                ┌─────────────────┐
//!                                │   ChatSession   │──▶ Transcript
//!                                └────────┬────────┘
//!                                         │ one call at a time
//!                                         ▼
//!                                ┌─────────────────┐     POST /api/demo
//!                                │ RequestPipeline │───▶ CompletionClient
//!                                └─────────────────┘
//! ```

pub mod api;
pub mod config;
pub mod error;
pub mod mock;
pub mod pipeline;
pub mod session;
pub mod shell;
pub mod transcript;
pub mod types;

pub use api::{ApiClient, CompletionClient, ContactForm, ContactReceipt, HealthStatus, ModelInfo};
pub use config::ChatConfig;
pub use error::{ChatError, ChatResult, PipelineError, PipelineResult};
pub use pipeline::{CallPolicy, RequestPipeline, Reservation};
pub use session::{fallback_for, greeting, ChatSession, CONNECTION_FALLBACK, ERROR_FALLBACK};
pub use shell::SessionShell;
pub use transcript::Transcript;
pub use types::*;
