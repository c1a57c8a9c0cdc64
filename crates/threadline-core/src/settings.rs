//! Engine settings loaded from a JSON file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::Result;

/// What happens to messages on the server once they are fetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// Delete everything on the server right after fetching, before any
    /// processing. A crash mid-batch loses the rest of the batch.
    #[default]
    Destructive,
    /// Delete only messages whose entry was committed; remember processed
    /// UIDs so a retried pull skips them.
    Acknowledged,
}

/// Engine-wide settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// `SQLite` database file.
    pub database_path: PathBuf,
    /// Seconds between mailbox pulls in daemon mode.
    pub poll_interval_secs: u64,
    /// Seconds between unreplied sweeps in daemon mode.
    pub notify_interval_secs: u64,
    /// Seconds between outbox dispatch runs in daemon mode.
    pub dispatch_interval_secs: u64,
    /// Server-side deletion policy.
    pub delivery: DeliveryMode,
    /// Lower bound of the unreplied window as a multiple of the account's
    /// window. `None` looks back without limit.
    pub unreplied_lookback_factor: Option<u32>,
    /// Send attempts before an outbox row is marked failed.
    pub outbox_max_attempts: u32,
    /// Outbox rows sent per dispatch run.
    pub outbox_batch_size: u32,
    /// `tracing` filter directive; `RUST_LOG` wins when set.
    pub log_filter: Option<String>,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            poll_interval_secs: 300,
            notify_interval_secs: 600,
            dispatch_interval_secs: 60,
            delivery: DeliveryMode::default(),
            unreplied_lookback_factor: Some(3),
            outbox_max_attempts: 3,
            outbox_batch_size: 50,
            log_filter: None,
        }
    }
}

impl EngineSettings {
    /// Loads settings, falling back to defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        if !tokio::fs::try_exists(path).await? {
            return Ok(Self::default());
        }

        let contents = tokio::fs::read_to_string(path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    /// Writes settings as pretty JSON, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be written.
    pub async fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, contents).await?;

        info!("Settings saved to {:?}", path);
        Ok(())
    }
}

/// Default settings file: `<config dir>/threadline/settings.json`.
#[must_use]
pub fn default_settings_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("threadline")
        .join("settings.json")
}

/// Default database file: `<data dir>/threadline/threadline.db`.
#[must_use]
pub fn default_database_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("threadline")
        .join("threadline.db")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{ "poll_interval_secs": 30, "delivery": "acknowledged" }"#)
                .unwrap();
        assert_eq!(settings.poll_interval_secs, 30);
        assert_eq!(settings.delivery, DeliveryMode::Acknowledged);
        assert_eq!(settings.unreplied_lookback_factor, Some(3));
        assert_eq!(settings.outbox_max_attempts, 3);
    }

    #[test]
    fn null_lookback_removes_lower_bound() {
        let settings: EngineSettings =
            serde_json::from_str(r#"{ "unreplied_lookback_factor": null }"#).unwrap();
        assert_eq!(settings.unreplied_lookback_factor, None);
    }

    #[tokio::test]
    async fn missing_file_gives_defaults() {
        let path = std::env::temp_dir().join("threadline-missing-settings.json");
        let settings = EngineSettings::load(&path).await.unwrap();
        assert_eq!(settings, EngineSettings::default());
    }

    #[tokio::test]
    async fn save_then_load() {
        let dir = std::env::temp_dir().join(format!("threadline-settings-{}", std::process::id()));
        let path = dir.join("settings.json");
        let settings = EngineSettings {
            notify_interval_secs: 42,
            ..EngineSettings::default()
        };

        settings.save(&path).await.unwrap();
        let loaded = EngineSettings::load(&path).await.unwrap();
        assert_eq!(loaded.notify_interval_secs, 42);

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }
}
