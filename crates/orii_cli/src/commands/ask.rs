//! Ask command - Send a single prompt and print the reply.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use orii_chat::{ChatConfig, ChatError, ChatResult, RequestPipeline};

use super::{api_client, call_policy, describe_timeout};

#[derive(Args)]
pub struct AskArgs {
    /// Prompt to send
    #[arg(required = true, num_args = 1..)]
    prompt: Vec<String>,
}

/// Join the prompt words, refusing a prompt with nothing to send.
pub fn prompt_text(words: &[String]) -> ChatResult<String> {
    let prompt = words.join(" ");
    let prompt = prompt.trim();
    if prompt.is_empty() {
        return Err(ChatError::InvalidInput("prompt must not be empty".to_string()));
    }
    Ok(prompt.to_string())
}

pub async fn execute(args: AskArgs, config: ChatConfig) -> Result<()> {
    let prompt = prompt_text(&args.prompt)?;

    info!(
        backend = %config.backend_url,
        timeout = %describe_timeout(config.request_timeout()),
        "Asking {}",
        config.assistant_name
    );
    let pipeline = RequestPipeline::new(Arc::new(api_client(&config))).with_policy(call_policy(&config));

    let output = pipeline
        .submit(prompt, config.max_tokens)
        .await
        .context("Completion request failed")?;

    if output.text.trim().is_empty() {
        anyhow::bail!("{} returned an empty reply", config.assistant_name);
    }
    println!("{}", output.text);
    if let Some(tokens) = output.tokens_used {
        info!("Tokens used: {}", tokens);
    }

    Ok(())
}
