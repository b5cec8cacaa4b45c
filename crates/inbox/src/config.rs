//! Configuration loading for the inbox
//!
//! Settings come from (later sources override earlier ones):
//! 1. JSON file (~/.config/studio/studio-inbox.json)
//! 2. Runtime environment variables

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::send::ResendSender;

/// Config filename in the Studio config directory
const CONFIG_FILE: &str = "studio-inbox.json";

/// Default database filename in the Studio config directory
const DATABASE_FILE: &str = "inbox.sqlite";

const ENV_API_KEY: &str = "RESEND_API_KEY";
const ENV_BASE_URL: &str = "RESEND_BASE_URL";
const ENV_DATABASE: &str = "STUDIO_INBOX_DB";
const ENV_FROM: &str = "STUDIO_INBOX_FROM";
const ENV_FROM_NAME: &str = "STUDIO_INBOX_FROM_NAME";

/// Inbox settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboxConfig {
    /// API key for the Resend mail API
    #[serde(default)]
    pub resend_api_key: Option<String>,
    /// Override for the Resend API host
    #[serde(default)]
    pub resend_base_url: Option<String>,
    /// SQLite database location
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    /// Default sender address for composed mail
    #[serde(default)]
    pub from_address: Option<String>,
    /// Default sender display name
    #[serde(default)]
    pub from_name: Option<String>,
}

impl InboxConfig {
    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Self> {
        let base = config::load_json_if_exists::<Self>(CONFIG_FILE)?.unwrap_or_default();
        Ok(base.with_overrides(|key| std::env::var(key).ok()))
    }

    /// Parse settings from a JSON string
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse inbox config JSON")
    }

    /// Apply overrides from a variable lookup (normally the environment)
    ///
    /// Empty values are ignored.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get(ENV_API_KEY) {
            self.resend_api_key = Some(key);
        }
        if let Some(url) = get(ENV_BASE_URL) {
            self.resend_base_url = Some(url);
        }
        if let Some(path) = get(ENV_DATABASE) {
            self.database_path = Some(PathBuf::from(path));
        }
        if let Some(from) = get(ENV_FROM) {
            self.from_address = Some(from);
        }
        if let Some(name) = get(ENV_FROM_NAME) {
            self.from_name = Some(name);
        }
        self
    }

    /// Database path, defaulting to inbox.sqlite in the config directory
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => config::config_path(DATABASE_FILE).context("Could not determine config directory"),
        }
    }

    /// Build the Resend client from the configured key
    pub fn resend_sender(&self) -> Result<ResendSender> {
        let key = self
            .resend_api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .with_context(|| format!("No Resend API key configured (set {} or resend_api_key)", ENV_API_KEY))?;

        let sender = ResendSender::new(key);
        Ok(match &self.resend_base_url {
            Some(url) => sender.with_base_url(url.as_str()),
            None => sender,
        })
    }

    /// Path of the config file in the Studio config directory
    pub fn default_config_path() -> Option<PathBuf> {
        config::config_path(CONFIG_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| vars.get(key).cloned()
    }

    #[test]
    fn test_parse_config_file() {
        let json = r#"{
            "resend_api_key": "re_file",
            "database_path": "/var/lib/studio/inbox.sqlite",
            "from_address": "hello@studio.dev"
        }"#;

        let config = InboxConfig::from_json(json).unwrap();
        assert_eq!(config.resend_api_key.as_deref(), Some("re_file"));
        assert_eq!(
            config.database_path().unwrap(),
            PathBuf::from("/var/lib/studio/inbox.sqlite")
        );
        assert_eq!(config.from_name, None);
    }

    #[test]
    fn test_environment_overrides_file_values() {
        let config = InboxConfig::from_json(r#"{ "resend_api_key": "re_file" }"#)
            .unwrap()
            .with_overrides(lookup(&[
                ("RESEND_API_KEY", "re_env"),
                ("STUDIO_INBOX_FROM", "team@studio.dev"),
                ("STUDIO_INBOX_FROM_NAME", ""),
            ]));

        assert_eq!(config.resend_api_key.as_deref(), Some("re_env"));
        assert_eq!(config.from_address.as_deref(), Some("team@studio.dev"));
        assert_eq!(config.from_name, None);
    }

    #[test]
    fn test_resend_sender_requires_key() {
        assert!(InboxConfig::default().resend_sender().is_err());

        let config = InboxConfig {
            resend_api_key: Some("re_key".to_string()),
            ..InboxConfig::default()
        };
        assert!(config.resend_sender().is_ok());
    }

    #[test]
    fn test_invalid_json() {
        assert!(InboxConfig::from_json(r#"{ "database_path": 5 }"#).is_err());
    }
}
