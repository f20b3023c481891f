//! Configuration validation.

use super::Config;
use crate::error::{RolloverError, Result};

/// Largest accepted sample size for before/after logging.
pub const MAX_SAMPLE_SIZE: usize = 100;

const SSL_MODES: &[&str] = &[
    "disable",
    "prefer",
    "require",
    "verify-ca",
    "verify_ca",
    "verify-full",
    "verify_identity",
];

/// Validate the configuration.
pub fn validate(config: &Config) -> Result<()> {
    let db = &config.database;
    if db.host.is_empty() {
        return Err(RolloverError::Config("database.host is required".into()));
    }
    if db.port == 0 {
        return Err(RolloverError::Config(
            "database.port must be between 1 and 65535".into(),
        ));
    }
    if db.user.is_empty() {
        return Err(RolloverError::Config("database.user is required".into()));
    }
    if db.database.is_empty() {
        return Err(RolloverError::Config("database.database is required".into()));
    }
    if !SSL_MODES.contains(&db.ssl_mode.to_lowercase().as_str()) {
        return Err(RolloverError::Config(format!(
            "database.ssl_mode must be one of disable, prefer, require, verify-ca, verify-full; got '{}'",
            db.ssl_mode
        )));
    }

    if let Some(size) = config.rollover.sample_size {
        if size > MAX_SAMPLE_SIZE {
            return Err(RolloverError::Config(format!(
                "rollover.sample_size must be at most {}, got {}",
                MAX_SAMPLE_SIZE, size
            )));
        }
    }

    Ok(())
}
