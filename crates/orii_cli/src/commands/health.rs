//! Health command - Check that the backend is up.

use anyhow::{Context, Result};

use orii_chat::ChatConfig;

use super::api_client;

pub async fn execute(config: ChatConfig) -> Result<()> {
    let health = api_client(&config)
        .health()
        .await
        .with_context(|| format!("Health check against {} failed", config.backend_url))?;

    if health.status == "healthy" {
        println!("✅ {} {} is healthy", health.model, health.version);
        Ok(())
    } else {
        anyhow::bail!(
            "Backend reported status '{}' for {} {}",
            health.status,
            health.model,
            health.version
        )
    }
}
