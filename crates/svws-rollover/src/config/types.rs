//! Configuration type definitions.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// MariaDB connection settings.
    pub database: DatabaseConfig,

    /// Rollover behavior configuration.
    #[serde(default)]
    pub rollover: RolloverConfig,
}

/// MariaDB connection configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Database host (default: "localhost").
    #[serde(default = "default_host")]
    pub host: String,

    /// Database port (default: 3306).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Username (default: "root").
    #[serde(default = "default_user")]
    pub user: String,

    /// Password (default: empty).
    #[serde(default)]
    pub password: String,

    /// Database name (default: "SVWS").
    #[serde(default = "default_database")]
    pub database: String,

    /// Connection-level autocommit default. A rollover run always disables
    /// autocommit for its own duration and restores this value afterwards.
    #[serde(default = "default_true")]
    pub autocommit: bool,

    /// TLS mode: disable, prefer, require, verify-ca, verify-full (default: "disable").
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            user: default_user(),
            password: String::new(),
            database: default_database(),
            autocommit: true,
            ssl_mode: default_ssl_mode(),
        }
    }
}

impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"[REDACTED]")
            .field("database", &self.database)
            .field("autocommit", &self.autocommit)
            .field("ssl_mode", &self.ssl_mode)
            .finish()
    }
}

/// Rollover behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RolloverConfig {
    /// Overrides the per-step sample size for before/after logging.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_size: Option<usize>,

    /// Default step subset when none is given on the command line.
    /// Empty means all steps.
    #[serde(default)]
    pub steps: Vec<String>,

    /// Compare table checksums before and after a dry run.
    #[serde(default)]
    pub verify_dry_run: bool,
}

impl RolloverConfig {
    /// Step subset to use when the caller did not request one.
    pub fn default_steps(&self) -> Option<&[String]> {
        if self.steps.is_empty() {
            None
        } else {
            Some(&self.steps)
        }
    }
}

// Default value functions for serde
fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    3306
}

fn default_user() -> String {
    "root".to_string()
}

fn default_database() -> String {
    "SVWS".to_string()
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_true() -> bool {
    true
}
