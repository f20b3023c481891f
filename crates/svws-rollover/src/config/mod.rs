//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;
pub use validation::MAX_SAMPLE_SIZE;

use crate::error::{RolloverError, Result};
use std::path::Path;
use tracing::info;

impl Config {
    /// Load configuration from a YAML (or JSON) file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config = Self::from_yaml(&content)?;
        info!("Configuration loaded from {}", path.as_ref().display());
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// JSON documents are valid YAML, so `config.json` files parse as well.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Build a configuration from `MARIADB_*` environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a configuration from a variable lookup function.
    ///
    /// `MARIADB_HOST`, `MARIADB_USER`, `MARIADB_PASSWORD` and `MARIADB_DATABASE`
    /// are required; `MARIADB_PORT` defaults to 3306.
    pub fn from_vars<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        const REQUIRED: [&str; 4] = [
            "MARIADB_HOST",
            "MARIADB_USER",
            "MARIADB_PASSWORD",
            "MARIADB_DATABASE",
        ];

        let missing: Vec<&str> = REQUIRED
            .iter()
            .copied()
            .filter(|name| lookup(name).map_or(true, |v| v.is_empty()))
            .collect();
        if !missing.is_empty() {
            return Err(RolloverError::Config(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        let port = match lookup("MARIADB_PORT") {
            Some(raw) if !raw.is_empty() => raw.parse::<u16>().map_err(|_| {
                RolloverError::Config(format!("MARIADB_PORT is not a valid port: '{}'", raw))
            })?,
            _ => DatabaseConfig::default().port,
        };

        let config = Config {
            database: DatabaseConfig {
                host: lookup("MARIADB_HOST").unwrap_or_default(),
                port,
                user: lookup("MARIADB_USER").unwrap_or_default(),
                password: lookup("MARIADB_PASSWORD").unwrap_or_default(),
                database: lookup("MARIADB_DATABASE").unwrap_or_default(),
                ..DatabaseConfig::default()
            },
            rollover: RolloverConfig::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
