//! Service configuration
//!
//! Layered: built-in defaults, then an optional `configs/config.*` file,
//! then process environment (`SERVER_HTTP_PORT`, `LOG_LEVEL`, ...).
//! A `.env` file is read into the environment first when present.

use config::{ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "configs/config";

/// Deployment environment (APP_ENV)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppEnv {
    Local,
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app_version: String,
    pub app_env: AppEnv,
    pub server_http_port: u16,

    /// debug | info | warn | error
    pub log_level: String,

    /// json | text
    pub log_format: String,

    /// Seconds
    pub http_read_timeout: u64,
    pub http_write_timeout: u64,
    pub http_inbound_timeout: u64,

    /// Multipart body limit in bytes
    pub http_max_upload_bytes: usize,
}

impl Config {
    /// Load from `.env`, `configs/config.*` and the environment
    pub fn load() -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Same layering with an explicit config file stem (file is optional)
    pub fn load_from(file_stem: &str) -> Result<Self, ConfigError> {
        let config: Config = defaults()?
            .add_source(File::with_name(file_stem).required(false))
            .add_source(Environment::default().try_parsing(true))
            .build()?
            .try_deserialize()?;

        config.validate()?;
        Ok(config)
    }

    /// Defaults plus explicit key/value overrides, no file or environment
    pub fn with_overrides<'a, I>(overrides: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let mut builder = defaults()?;
        for (key, value) in overrides {
            builder = builder.set_override(key, value)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.server_http_port == 0 {
            return Err(ConfigError::Message("server_http_port must be non-zero".to_string()));
        }

        if self.http_read_timeout == 0 || self.http_write_timeout == 0 || self.http_inbound_timeout == 0 {
            return Err(ConfigError::Message("http timeouts must be non-zero".to_string()));
        }

        if !matches!(self.log_level.to_lowercase().as_str(), "debug" | "info" | "warn" | "error") {
            return Err(ConfigError::Message(format!("unknown log_level: {}", self.log_level)));
        }

        if !matches!(self.log_format.to_lowercase().as_str(), "json" | "text") {
            return Err(ConfigError::Message(format!("unknown log_format: {}", self.log_format)));
        }

        Ok(())
    }

    pub fn inbound_timeout(&self) -> Duration {
        Duration::from_secs(self.http_inbound_timeout)
    }
}

fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>, ConfigError> {
    config::Config::builder()
        .set_default("app_version", crate::VERSION)?
        .set_default("app_env", "local")?
        .set_default("server_http_port", 8080)?
        .set_default("log_level", "info")?
        .set_default("log_format", "json")?
        .set_default("http_read_timeout", 10)?
        .set_default("http_write_timeout", 10)?
        .set_default("http_inbound_timeout", 10)?
        .set_default("http_max_upload_bytes", 32 * 1024 * 1024)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::with_overrides([("app_env", "local")]).unwrap();

        assert_eq!(config.server_http_port, 8080);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.log_format, "json");
        assert_eq!(config.app_env, AppEnv::Local);
        assert_eq!(config.inbound_timeout(), Duration::from_secs(10));
        assert_eq!(config.http_max_upload_bytes, 32 * 1024 * 1024);
    }

    #[test]
    fn test_overrides() {
        let config = Config::with_overrides([
            ("server_http_port", "9090"),
            ("log_level", "debug"),
            ("log_format", "text"),
            ("app_env", "production"),
        ])
        .unwrap();

        assert_eq!(config.server_http_port, 9090);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.app_env, AppEnv::Production);
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        assert!(Config::with_overrides([("log_level", "verbose")]).is_err());
        assert!(Config::with_overrides([("log_format", "xml")]).is_err());
        assert!(Config::with_overrides([("http_inbound_timeout", "0")]).is_err());
        assert!(Config::with_overrides([("server_http_port", "not-a-port")]).is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("recon.toml");
        std::fs::write(&path, "server_http_port = 7070\nlog_format = \"text\"\n").unwrap();

        let stem = dir.path().join("recon");
        let config = Config::load_from(stem.to_str().unwrap()).unwrap();

        assert_eq!(config.server_http_port, 7070);
        assert_eq!(config.log_format, "text");
    }
}
