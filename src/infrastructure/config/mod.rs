//! Configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::application::errors::ConfigError;
use crate::infrastructure::adapters::telegram::DEFAULT_API_URL;

/// Host configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct Config {
    pub bot: BotConfig,
    pub plugins: PluginsConfig,
    pub long_polling: LongPollingConfig,
    pub console: ConsoleConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct BotConfig {
    pub name: String,
    pub token: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct PluginsConfig {
    /// Directory holding plugin bundles (one subdirectory per bundle)
    pub directory: PathBuf,
    /// Enable every available bundle at startup
    pub auto_enable: bool,
    /// Accept bundles whose manifest declares no api version
    pub allow_unversioned: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LongPollingConfig {
    pub timeout_seconds: u64,
    pub back_off_ms: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ConsoleConfig {
    pub queue_capacity: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bot: BotConfig::default(),
            plugins: PluginsConfig::default(),
            long_polling: LongPollingConfig::default(),
            console: ConsoleConfig::default(),
        }
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            name: "plugbot".to_string(),
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
        }
    }
}

impl Default for PluginsConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("./plugins"),
            auto_enable: true,
            allow_unversioned: false,
        }
    }
}

impl Default for LongPollingConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: 30,
            back_off_ms: 500,
        }
    }
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self { queue_capacity: 64 }
    }
}

impl Config {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn to_yaml(&self) -> String {
        serde_yaml::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_roundtrips_through_yaml() {
        let config = Config::default();
        let yaml = config.to_yaml();
        let parsed: Config = serde_yaml::from_str(&yaml).expect("roundtrip");
        assert_eq!(parsed.bot.name, "plugbot");
        assert!(parsed.plugins.auto_enable);
        assert_eq!(parsed.long_polling.timeout_seconds, 30);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let parsed: Config =
            serde_yaml::from_str("bot:\n  token: \"123:abc\"\n").expect("partial config");
        assert_eq!(parsed.bot.token.as_deref(), Some("123:abc"));
        assert_eq!(parsed.console.queue_capacity, 64);
    }
}
