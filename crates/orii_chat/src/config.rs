//! Client configuration.
//!
//! Values come from `.orii/settings.json` under the workspace root, then
//! from environment variables, then from whatever the caller overrides.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ChatError, ChatResult};

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8001";
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_ASSISTANT_NAME: &str = "Orii-O1";

pub const ENV_BACKEND_URL: &str = "ORII_BACKEND_URL";
pub const ENV_MAX_TOKENS: &str = "ORII_MAX_TOKENS";
pub const ENV_REQUEST_TIMEOUT: &str = "ORII_REQUEST_TIMEOUT_SECS";

/// Settings for talking to the completion backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatConfig {
    /// Base URL the `/api/...` paths are appended to
    pub backend_url: String,
    /// Token budget sent with every prompt
    pub max_tokens: u32,
    /// Per-request timeout; `None` waits indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    /// Name the assistant introduces itself with
    pub assistant_name: String,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            request_timeout_secs: None,
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
        }
    }
}

impl ChatConfig {
    /// Settings file, then environment.
    pub fn load(workspace_root: &Path) -> ChatResult<Self> {
        Self::from_settings(workspace_root)?.with_env()
    }

    /// Read `.orii/settings.json`, falling back to defaults when absent.
    pub fn from_settings(workspace_root: &Path) -> ChatResult<Self> {
        let settings_path = workspace_root.join(".orii").join("settings.json");
        if !settings_path.exists() {
            return Ok(Self::default());
        }

        debug!("Loading settings from {}", settings_path.display());
        let content = std::fs::read_to_string(&settings_path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validated()
    }

    /// Defaults overlaid with the environment.
    pub fn from_env() -> ChatResult<Self> {
        Self::default().with_env()
    }

    /// Overlay `ORII_*` environment variables.
    pub fn with_env(self) -> ChatResult<Self> {
        self.with_vars(|key| std::env::var(key).ok())
    }

    fn with_vars(mut self, var: impl Fn(&str) -> Option<String>) -> ChatResult<Self> {
        if let Some(url) = var(ENV_BACKEND_URL).filter(|v| !v.trim().is_empty()) {
            self.backend_url = url;
        }
        if let Some(raw) = var(ENV_MAX_TOKENS) {
            self.max_tokens = parse_number(ENV_MAX_TOKENS, &raw)?;
        }
        if let Some(raw) = var(ENV_REQUEST_TIMEOUT) {
            self.request_timeout_secs = Some(parse_number(ENV_REQUEST_TIMEOUT, &raw)?);
        }
        self.validated()
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// Full URL for an `/api/...` path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.backend_url.trim_end_matches('/'), path)
    }

    /// Reject values the backend could never accept.
    pub fn validated(self) -> ChatResult<Self> {
        if !self.backend_url.starts_with("http://") && !self.backend_url.starts_with("https://") {
            return Err(ChatError::Config(format!(
                "backend URL must start with http:// or https://, got '{}'",
                self.backend_url
            )));
        }
        if self.max_tokens == 0 {
            return Err(ChatError::Config("max tokens must be positive".to_string()));
        }
        if self.request_timeout_secs == Some(0) {
            return Err(ChatError::Config(
                "request timeout must be positive; omit it to wait indefinitely".to_string(),
            ));
        }
        Ok(self)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> ChatResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| ChatError::Config(format!("{} must be a positive integer, got '{}'", key, raw)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::tempdir;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ChatConfig::default();

        assert_eq!(config.max_tokens, 150);
        assert_eq!(config.request_timeout(), None);
        assert_eq!(config.endpoint("/api/demo"), "http://localhost:8001/api/demo");
    }

    #[test]
    fn test_missing_settings_file_yields_defaults() {
        let temp = tempdir().unwrap();

        let config = ChatConfig::from_settings(temp.path()).unwrap();

        assert_eq!(config, ChatConfig::default());
    }

    #[test]
    fn test_partial_settings_file() {
        let temp = tempdir().unwrap();
        std::fs::create_dir_all(temp.path().join(".orii")).unwrap();
        std::fs::write(
            temp.path().join(".orii").join("settings.json"),
            r#"{ "backendUrl": "https://api.orii.example/", "requestTimeoutSecs": 30 }"#,
        )
        .unwrap();

        let config = ChatConfig::from_settings(temp.path()).unwrap();

        assert_eq!(config.max_tokens, 150);
        assert_eq!(config.request_timeout(), Some(Duration::from_secs(30)));
        assert_eq!(config.endpoint("/api/health"), "https://api.orii.example/api/health");
    }

    #[test]
    fn test_env_overrides_settings() {
        let config = ChatConfig::default()
            .with_vars(vars(&[
                (ENV_BACKEND_URL, "https://staging.orii.example"),
                (ENV_MAX_TOKENS, "300"),
            ]))
            .unwrap();

        assert_eq!(config.backend_url, "https://staging.orii.example");
        assert_eq!(config.max_tokens, 300);
    }

    #[test]
    fn test_invalid_env_number_is_an_error() {
        let err = ChatConfig::default()
            .with_vars(vars(&[(ENV_MAX_TOKENS, "lots")]))
            .unwrap_err();

        assert!(matches!(err, ChatError::Config(_)));
    }

    #[test]
    fn test_rejects_non_http_url() {
        let err = ChatConfig::default()
            .with_vars(vars(&[(ENV_BACKEND_URL, "ftp://nope")]))
            .unwrap_err();

        assert!(err.to_string().contains("http://"));
    }
}
