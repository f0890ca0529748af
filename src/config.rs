use std::{fs, path::Path};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::farm::DataSource;

fn default_name() -> String {
    "farm".to_string()
}

fn default_snapshot_path() -> String {
    "snapshot.json".to_string()
}

fn default_refresh_seconds() -> u64 {
    30
}

fn default_export_dir() -> String {
    "exports".to_string()
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_history() -> usize {
    50
}

fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub snapshot: SnapshotSettings,
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub notifications: NotificationSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotSettings {
    #[serde(default = "default_snapshot_path")]
    pub path: String,
    #[serde(default)]
    pub source: DataSource,
    #[serde(default = "default_refresh_seconds")]
    pub refresh_seconds: u64,
    #[serde(default = "default_export_dir")]
    pub export_dir: String,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        Self {
            path: default_snapshot_path(),
            source: DataSource::default(),
            refresh_seconds: default_refresh_seconds(),
            export_dir: default_export_dir(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSettings {
    #[serde(default = "default_history")]
    pub history: usize,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            history: default_history(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            snapshot: SnapshotSettings::default(),
            server: ServerSettings::default(),
            notifications: NotificationSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml_str(&data).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml_str(data: &str) -> Result<Self> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(data)?)
    }

    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let yaml = serde_yaml::to_string(self)?;
        fs::write(path.as_ref(), yaml)
            .with_context(|| format!("Failed to write {}", path.as_ref().display()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = DashboardConfig::from_yaml_str("").unwrap();
        assert_eq!(config.name, "farm");
        assert_eq!(config.snapshot.refresh_seconds, 30);
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.notifications.history, 50);
        assert_eq!(config.snapshot.source, DataSource::Savegame);
    }

    #[test]
    fn partial_sections_fill_in() {
        let config = DashboardConfig::from_yaml_str(
            "name: green_acres\nsnapshot:\n  source: live_api\nserver:\n  port: 9000\n",
        )
        .unwrap();
        assert_eq!(config.name, "green_acres");
        assert_eq!(config.snapshot.source, DataSource::LiveApi);
        assert_eq!(config.snapshot.path, "snapshot.json");
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn yaml_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.yaml");
        let mut config = DashboardConfig::default();
        config.name = "hilltop".into();
        config.to_yaml(&path).unwrap();
        let loaded = DashboardConfig::from_yaml(&path).unwrap();
        assert_eq!(loaded.name, "hilltop");
        assert_eq!(loaded.server.port, config.server.port);
    }
}
