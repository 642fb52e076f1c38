//! User configuration
//!
//! Read from `$XDG_CONFIG_HOME/dripcalc/config.toml` (or the file named by
//! `DRIPCALC_CONFIG`). A missing file means defaults. Environment variables
//! override file values.

use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{DripError, Result};

pub const CONFIG_ENV: &str = "DRIPCALC_CONFIG";
pub const OFFLINE_ENV: &str = "DRIPCALC_OFFLINE";
pub const YAHOO_URL_ENV: &str = "DRIPCALC_YAHOO_URL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Reinvest dividends unless the command line says otherwise
    pub drip: bool,
    /// Never touch the network; only local price files are accepted
    pub offline: bool,
    pub yahoo: YahooConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            drip: true,
            offline: false,
            yahoo: YahooConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct YahooConfig {
    pub base_url: String,
    pub user_agent: String,
    pub timeout_secs: u64,
}

impl Default for YahooConfig {
    fn default() -> Self {
        Self {
            base_url: "https://query1.finance.yahoo.com".to_string(),
            user_agent: "Mozilla/5.0 (compatible; dripcalc/0.1)".to_string(),
            timeout_secs: 30,
        }
    }
}

impl Config {
    /// Location of the config file, if one can be determined
    pub fn config_path() -> Option<PathBuf> {
        std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| dir_spec::config_home().map(|dir| dir.join("dripcalc").join("config.toml")))
    }

    /// Load the config file (if any) and apply environment overrides
    pub fn load() -> Result<Config> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => Self::from_file(&path)?,
            _ => Config::default(),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Config> {
        debug!("Loading config from {:?}", path);
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config = Self::from_toml_str(&text)
            .with_context(|| format!("Invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> std::result::Result<Config, DripError> {
        toml::from_str(text).map_err(|e| DripError::Config(e.to_string()))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(value) = std::env::var(OFFLINE_ENV) {
            self.offline = value != "0";
        }
        if let Ok(url) = std::env::var(YAHOO_URL_ENV) {
            if !url.trim().is_empty() {
                self.yahoo.base_url = url.trim_end_matches('/').to_string();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.drip);
        assert!(!config.offline);
        assert!(config.yahoo.base_url.starts_with("https://"));
        assert_eq!(config.yahoo.timeout_secs, 30);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
drip = false

[yahoo]
timeout_secs = 5
"#,
        )
        .unwrap();
        assert!(!config.drip);
        assert_eq!(config.yahoo.timeout_secs, 5);
        assert_eq!(config.yahoo.base_url, YahooConfig::default().base_url);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = Config::from_toml_str("drip = \"maybe\"").unwrap_err();
        assert!(err.to_string().starts_with("config error"));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "offline = true").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert!(config.offline);
        assert!(config.drip);
    }
}
