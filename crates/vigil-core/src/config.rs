//! Vigil configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Result, VigilError};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VigilConfig {
    #[serde(default)]
    pub source: SourceConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
}

impl Default for VigilConfig {
    fn default() -> Self {
        Self {
            source: SourceConfig::default(),
            scheduler: SchedulerConfig::default(),
            notify: NotifyConfig::default(),
        }
    }
}

impl VigilConfig {
    /// Load config from the default path (~/.vigil/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| VigilError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| VigilError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| VigilError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Vigil home directory (~/.vigil).
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".vigil")
    }
}

/// Report source configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Status page to poll.
    #[serde(default = "default_source_url")]
    pub url: String,
    /// Per-fetch timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub fetch_timeout_secs: u64,
}

fn default_source_url() -> String {
    "http://localhost:8080/status".into()
}
fn default_fetch_timeout() -> u64 {
    10
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_source_url(),
            fetch_timeout_secs: default_fetch_timeout(),
        }
    }
}

/// Scheduler engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// How late a wake may be (seconds) and still count as on-time.
    /// Anything later is a missed occurrence and is skipped.
    #[serde(default = "default_grace")]
    pub grace_secs: u64,
    /// Max destinations with pipelines in flight at once.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    /// How long shutdown waits for in-flight pipelines (seconds).
    #[serde(default = "default_drain")]
    pub drain_secs: u64,
    /// Schedule store file. Empty = ~/.vigil/destinations.json.
    #[serde(default)]
    pub store_path: String,
}

fn default_grace() -> u64 {
    60
}
fn default_max_concurrent() -> usize {
    4
}
fn default_drain() -> u64 {
    30
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            grace_secs: default_grace(),
            max_concurrent: default_max_concurrent(),
            drain_secs: default_drain(),
            store_path: String::new(),
        }
    }
}

impl SchedulerConfig {
    /// Resolve the store path, falling back to the Vigil home dir.
    pub fn resolved_store_path(&self) -> PathBuf {
        if self.store_path.is_empty() {
            VigilConfig::home_dir().join("destinations.json")
        } else {
            PathBuf::from(&self.store_path)
        }
    }
}

/// Notification transport configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotifyConfig {
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,
}

/// Telegram Bot API transport. The destination id is the chat id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

/// Generic HTTP webhook transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    pub url: String,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    #[serde(default = "bool_true")]
    pub enabled: bool,
}

fn bool_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = VigilConfig::default();
        assert_eq!(cfg.source.fetch_timeout_secs, 10);
        assert_eq!(cfg.scheduler.grace_secs, 60);
        assert_eq!(cfg.scheduler.max_concurrent, 4);
        assert!(cfg.notify.telegram.is_none());
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let cfg: VigilConfig = toml::from_str(
            r#"
            [source]
            url = "https://status.example.com/"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.source.url, "https://status.example.com/");
        assert_eq!(cfg.source.fetch_timeout_secs, 10);
        assert_eq!(cfg.scheduler.max_concurrent, 4);
    }

    #[test]
    fn test_load_from_rejects_bad_toml() {
        let dir = std::env::temp_dir().join("vigil-test-config");
        std::fs::create_dir_all(&dir).ok();
        let path = dir.join("bad.toml");
        std::fs::write(&path, "not [ valid").unwrap();
        assert!(matches!(
            VigilConfig::load_from(&path),
            Err(VigilError::Config(_))
        ));
        std::fs::remove_dir_all(&dir).ok();
    }
}
