//! Core traits for the rollover engine.
//!
//! The engine talks to the database exclusively through [`Connection`]. The
//! MariaDB driver implements it over `mysql_async`; tests use an in-memory
//! double. Every value reaches the database as a bound parameter.

use async_trait::async_trait;

use crate::error::Result;

use super::value::{Row, SqlValue};

/// A single live database connection.
///
/// Implementations are driven strictly sequentially: the engine awaits every
/// statement before issuing the next one and never shares a connection between
/// tasks.
#[async_trait]
pub trait Connection: Send {
    /// Execute a statement that returns rows.
    async fn execute_query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>>;

    /// Execute a statement that modifies data and return the affected row count.
    async fn execute_update(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64>;

    /// Current autocommit setting of the session.
    fn autocommit(&self) -> bool;

    /// Enable or disable autocommit for the session.
    ///
    /// Disabling autocommit implicitly opens a transaction that lasts until
    /// [`commit`](Connection::commit) or [`rollback`](Connection::rollback).
    async fn set_autocommit(&mut self, enabled: bool) -> Result<()>;

    /// Commit the current transaction.
    async fn commit(&mut self) -> Result<()>;

    /// Roll back the current transaction.
    async fn rollback(&mut self) -> Result<()>;

    /// Short description of the connected endpoint for logging.
    fn describe(&self) -> String;
}
