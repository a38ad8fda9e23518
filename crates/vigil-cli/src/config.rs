//! Host configuration, loaded from TOML.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;
use vigil_alarms::CoordinatorConfig;
use vigil_journal::JournalConfig;
use vigil_settings::SettingsConfig;

/// Config file read when `--config` is not given.
pub const DEFAULT_CONFIG_PATH: &str = "vigil.toml";

/// Top-level configuration for the `vigil` binary.
///
/// ```toml
/// [journal]
/// dir = "logs"
///
/// [alarms]
/// store_path = "data/alarms.json"
///
/// [alarms.coordinator]
/// recipient = "monitor"
///
/// [settings.refresh]
/// refresh_interval_ms = 60000
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VigilConfig {
    pub journal: JournalConfig,
    pub alarms: AlarmsSection,
    pub settings: SettingsSection,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AlarmsSection {
    /// JSON file holding the alarm table.
    pub store_path: PathBuf,
    pub coordinator: CoordinatorConfig,
}

impl Default for AlarmsSection {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/alarms.json"),
            coordinator: CoordinatorConfig::default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsSection {
    /// JSON file holding the settings table.
    pub store_path: PathBuf,
    pub refresh: SettingsConfig,
}

impl Default for SettingsSection {
    fn default() -> Self {
        Self {
            store_path: PathBuf::from("data/settings.json"),
            refresh: SettingsConfig::default(),
        }
    }
}

impl VigilConfig {
    /// Load `path`, or [`DEFAULT_CONFIG_PATH`] when `None`. A missing file
    /// yields the defaults; a malformed one is an error.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_PATH));
        if !path.exists() {
            debug!(path = %path.display(), "no config file, using defaults");
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        Self::parse(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    pub fn parse(text: &str) -> anyhow::Result<Self> {
        Ok(toml::from_str(text)?)
    }
}
