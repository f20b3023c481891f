//! MySQL/MariaDB database driver.
//!
//! This module provides MySQL-specific implementations for:
//! - [`MysqlDialect`]: SQL rendering for every rollover statement
//! - [`MysqlConnection`]: the [`Connection`](crate::core::Connection) the engine runs on
//!
//! # Supported Versions
//!
//! - MySQL 8.0+
//! - MariaDB 10.5+ (SVWS ships with MariaDB 11)

mod connection;
mod dialect;

pub use connection::MysqlConnection;
pub use dialect::{MysqlDialect, Statement};
