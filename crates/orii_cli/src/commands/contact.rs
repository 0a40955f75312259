//! Contact command - Send a message to the Orii-Gen team.

use anyhow::{Context, Result};
use clap::Args;
use tracing::info;

use orii_chat::{ChatConfig, ContactForm};

use super::api_client;

#[derive(Args)]
pub struct ContactArgs {
    /// Your name
    #[arg(long)]
    name: String,

    /// Address to reply to
    #[arg(long)]
    email: String,

    /// Company, if any
    #[arg(long)]
    company: Option<String>,

    /// What you'd like to tell us
    #[arg(short, long)]
    message: String,
}

impl From<ContactArgs> for ContactForm {
    fn from(args: ContactArgs) -> Self {
        Self {
            name: args.name,
            email: args.email,
            company: args.company.filter(|c| !c.trim().is_empty()),
            message: args.message,
        }
    }
}

pub async fn execute(args: ContactArgs, config: ChatConfig) -> Result<()> {
    let form = ContactForm::from(args);
    info!("Submitting contact form for {}", form.email);

    let receipt = api_client(&config)
        .submit_contact(&form)
        .await
        .context("Failed to send contact form")?;

    println!("✅ {}", receipt.message);
    Ok(())
}
