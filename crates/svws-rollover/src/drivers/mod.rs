//! Database driver implementations.
//!
//! - [`mysql`]: MySQL/MariaDB driver (dialect + connection)

pub mod mysql;

pub use mysql::{MysqlConnection, MysqlDialect, Statement};
