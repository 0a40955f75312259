//! Orii-O1 CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Backend unreachable or misbehaving
//! - 4: Sign-in failed

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use orii_chat::{ChatError, PipelineError};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const BACKEND_ERROR: u8 = 3;
    pub const AUTH_ERROR: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.json_logs);

    let result = run(cli).await;

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = cli.backend.resolve()?;

    match cli.command {
        Commands::Chat(args) => commands::chat::execute(args, config).await,
        Commands::Ask(args) => commands::ask::execute(args, config).await,
        Commands::Health => commands::health::execute(config).await,
        Commands::ModelInfo(args) => commands::model_info::execute(args, config).await,
        Commands::Contact(args) => commands::contact::execute(args, config).await,
    }
}

fn init_logging(verbose: bool, json: bool) {
    let default_level = if verbose { "orii=debug" } else { "orii=info" };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},warn", default_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let log_result = if json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let chat_error = e.chain().find_map(|cause| cause.downcast_ref::<ChatError>());

    match chat_error {
        Some(ChatError::Config(_))
        | Some(ChatError::InvalidContactForm(_))
        | Some(ChatError::InvalidInput(_)) => ExitCodes::INVALID_ARGS,
        Some(ChatError::Pipeline(_)) => ExitCodes::BACKEND_ERROR,
        Some(ChatError::Auth(_)) | Some(ChatError::NoActiveSession) => ExitCodes::AUTH_ERROR,
        Some(_) => ExitCodes::GENERAL_ERROR,
        None if e.chain().any(|cause| cause.downcast_ref::<PipelineError>().is_some()) => {
            ExitCodes::BACKEND_ERROR
        }
        None => ExitCodes::GENERAL_ERROR,
    }
}
