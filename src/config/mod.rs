use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub guard: GuardConfig,
    #[serde(default)]
    pub sessions: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            data_dir: default_data_dir(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

/// PIN screen-lock settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
    /// Minutes of operator inactivity before the screen locks
    #[serde(default = "default_inactivity_minutes")]
    pub inactivity_minutes: u64,
    /// Interval between inactivity checks in seconds
    #[serde(default = "default_watchdog_interval")]
    pub watchdog_interval_secs: u64,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            inactivity_minutes: default_inactivity_minutes(),
            watchdog_interval_secs: default_watchdog_interval(),
        }
    }
}

fn default_inactivity_minutes() -> u64 {
    10
}

fn default_watchdog_interval() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Interval between session expiry checks in seconds
    #[serde(default = "default_expiry_tick")]
    pub expiry_tick_secs: u64,
    /// Seed sample products into an empty catalog on first start
    #[serde(default = "default_seed_products")]
    pub seed_sample_products: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry_tick_secs: default_expiry_tick(),
            seed_sample_products: default_seed_products(),
        }
    }
}

fn default_expiry_tick() -> u64 {
    1
}

fn default_seed_products() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            info!("Loading configuration from {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&content)
                .with_context(|| "Failed to parse configuration file")?;
            Ok(config)
        } else {
            info!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = Config::default();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.guard.inactivity_minutes, 10);
        assert_eq!(config.guard.watchdog_interval_secs, 30);
        assert_eq!(config.sessions.expiry_tick_secs, 1);
    }

    #[test]
    fn partial_toml_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [server]
            port = 9090

            [guard]
            inactivity_minutes = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.guard.inactivity_minutes, 5);
        assert_eq!(config.guard.watchdog_interval_secs, 30);
    }
}
