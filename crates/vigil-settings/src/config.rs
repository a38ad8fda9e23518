use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings service configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    /// How often the refresh task drops every cached value (milliseconds).
    pub refresh_interval_ms: u64,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            refresh_interval_ms: 30 * 60 * 1000,
        }
    }
}

impl SettingsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_refresh_is_thirty_minutes() {
        assert_eq!(SettingsConfig::default().refresh_interval(), Duration::from_secs(1800));
    }

    #[test]
    fn parses_from_toml() {
        let config: SettingsConfig = toml::from_str("refresh_interval_ms = 250").unwrap();
        assert_eq!(config.refresh_interval(), Duration::from_millis(250));

        let empty: SettingsConfig = toml::from_str("").unwrap();
        assert_eq!(empty, SettingsConfig::default());
    }
}
