//! Model-info command - Show the model's published capabilities.

use anyhow::{Context, Result};
use clap::Args;

use orii_chat::ChatConfig;

use super::api_client;

#[derive(Args)]
pub struct ModelInfoArgs {
    /// Print the raw JSON instead of a summary
    #[arg(long)]
    json: bool,
}

pub async fn execute(args: ModelInfoArgs, config: ChatConfig) -> Result<()> {
    let info = api_client(&config)
        .model_info()
        .await
        .context("Failed to fetch model info")?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    println!("🤖 {} {} by {}", info.name, info.version, info.company);
    if !info.capabilities.is_empty() {
        println!();
        println!("Capabilities:");
        for capability in &info.capabilities {
            println!("  - {}", capability);
        }
    }
    if !info.specifications.is_empty() {
        println!();
        println!("Specifications:");
        for (key, value) in &info.specifications {
            println!("  {:<16} {}", key, value);
        }
    }

    Ok(())
}
