//! Application configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional
//! `wrldbldr-combat.toml` in the working directory, then `COMBAT_*`
//! environment variables (e.g. `COMBAT_SERVER_PORT=4000`).

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, Result};
use config::{Config, ConfigBuilder, Environment, File, FileFormat};
use serde::Deserialize;

use crate::application::services::MAX_BATCH_SIZE;
use crate::domain::aggregates::{SessionSettings, DEFAULT_CHAT_HISTORY};

/// Base name of the optional configuration file
pub const CONFIG_FILE: &str = "wrldbldr-combat";

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "COMBAT";

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server_host: String,
    pub server_port: u16,
    /// Actions executed per batch; the rest are dropped
    pub max_batch_size: usize,
    /// Initial approval flag for new sessions
    pub require_approval: bool,
    /// JSON file of extra creature templates
    pub creatures_path: Option<PathBuf>,
    /// Seed for reproducible dice
    pub dice_seed: Option<u64>,
    pub max_chat_history: usize,
}

impl AppConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let builder = Self::defaults()?
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix(ENV_PREFIX).try_parsing(true));
        Self::build(builder)
    }

    /// Load from TOML text layered over the defaults
    pub fn from_toml(text: &str) -> Result<Self> {
        let builder = Self::defaults()?.add_source(File::from_str(text, FileFormat::Toml));
        Self::build(builder)
    }

    fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
        Ok(Config::builder()
            .set_default("server_host", "0.0.0.0")?
            .set_default("server_port", 3000_i64)?
            .set_default("max_batch_size", MAX_BATCH_SIZE as i64)?
            .set_default("require_approval", false)?
            .set_default("max_chat_history", DEFAULT_CHAT_HISTORY as i64)?)
    }

    fn build(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let config: Self = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        anyhow::ensure!(config.max_batch_size > 0, "max_batch_size must be greater than 0");
        anyhow::ensure!(
            config.max_chat_history > 0,
            "max_chat_history must be greater than 0"
        );
        Ok(config)
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.server_host, self.server_port)
            .parse()
            .with_context(|| {
                format!(
                    "server_host '{}' and server_port {} do not form a socket address",
                    self.server_host, self.server_port
                )
            })
    }

    /// Settings every new session starts with
    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            require_approval: self.require_approval,
            max_chat_history: self.max_chat_history,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_host: "0.0.0.0".to_string(),
            server_port: 3000,
            max_batch_size: MAX_BATCH_SIZE,
            require_approval: false,
            creatures_path: None,
            dice_seed: None,
            max_chat_history: DEFAULT_CHAT_HISTORY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.server_host, "0.0.0.0");
        assert_eq!(config.server_port, 3000);
        assert_eq!(config.max_batch_size, 50);
        assert!(!config.require_approval);
        assert_eq!(config.creatures_path, None);
        assert_eq!(config.dice_seed, None);
        assert_eq!(config.max_chat_history, 200);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let config = AppConfig::from_toml(
            r#"
            server_port = 4100
            require_approval = true
            dice_seed = 7
            creatures_path = "monsters.json"
            "#,
        )
        .unwrap();
        assert_eq!(config.server_port, 4100);
        assert!(config.require_approval);
        assert_eq!(config.dice_seed, Some(7));
        assert_eq!(config.creatures_path, Some(PathBuf::from("monsters.json")));
        assert!(config.session_settings().require_approval);
    }

    #[test]
    fn test_invalid_values_fail() {
        assert!(AppConfig::from_toml("server_port = \"not a port\"").is_err());
        assert!(AppConfig::from_toml("max_batch_size = 0").is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig {
            server_host: "127.0.0.1".into(),
            server_port: 8080,
            ..AppConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().port(), 8080);

        let bad = AppConfig {
            server_host: "not a host".into(),
            ..AppConfig::default()
        };
        assert!(bad.socket_addr().is_err());
    }
}
