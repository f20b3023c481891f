//! Run-scoped transaction handle.

use tracing::{debug, error, warn};

use crate::core::{Connection, Row};
use crate::drivers::{MysqlDialect, Statement};
use crate::error::Result;

/// One open transaction on a borrowed connection.
///
/// Autocommit is disabled on [`begin`](TransactionContext::begin) and the
/// previous setting is restored when the context is released through
/// [`commit`](TransactionContext::commit) or
/// [`rollback`](TransactionContext::rollback). Both consume the context, so
/// it is released at most once.
pub struct TransactionContext<'c> {
    conn: &'c mut dyn Connection,
    dialect: MysqlDialect,
    previous_autocommit: bool,
    released: bool,
}

impl<'c> TransactionContext<'c> {
    pub async fn begin(conn: &'c mut dyn Connection) -> Result<TransactionContext<'c>> {
        let previous_autocommit = conn.autocommit();
        conn.set_autocommit(false).await?;
        debug!("Transaction started on {}", conn.describe());

        Ok(Self {
            conn,
            dialect: MysqlDialect::new(),
            previous_autocommit,
            released: false,
        })
    }

    pub fn dialect(&self) -> &MysqlDialect {
        &self.dialect
    }

    pub async fn query(&mut self, stmt: &Statement) -> Result<Vec<Row>> {
        self.conn.execute_query(&stmt.sql, &stmt.params).await
    }

    pub async fn update(&mut self, stmt: &Statement) -> Result<u64> {
        self.conn.execute_update(&stmt.sql, &stmt.params).await
    }

    /// First column of the first row as an integer (`COUNT(*)` and friends).
    pub async fn query_scalar(&mut self, stmt: &Statement) -> Result<Option<i64>> {
        let rows = self.query(stmt).await?;
        Ok(rows.first().and_then(|r| r.get_i64(0)))
    }

    pub async fn savepoint(&mut self, name: &str) -> Result<()> {
        let stmt = self.dialect.savepoint(name);
        self.update(&stmt).await.map(|_| ())
    }

    pub async fn rollback_to_savepoint(&mut self, name: &str) -> Result<()> {
        let stmt = self.dialect.rollback_to_savepoint(name);
        self.update(&stmt).await.map(|_| ())
    }

    pub async fn release_savepoint(&mut self, name: &str) -> Result<()> {
        let stmt = self.dialect.release_savepoint(name);
        self.update(&stmt).await.map(|_| ())
    }

    /// Commit and restore autocommit. A failed commit is followed by a
    /// rollback attempt before the error is returned.
    pub async fn commit(mut self) -> Result<()> {
        self.released = true;
        if let Err(e) = self.conn.commit().await {
            error!("Commit failed: {}", e);
            if let Err(rb) = self.conn.rollback().await {
                error!("Rollback after failed commit also failed: {}", rb);
            }
            self.restore_autocommit().await;
            return Err(e);
        }
        self.restore_autocommit().await;
        Ok(())
    }

    /// Roll back and restore autocommit.
    pub async fn rollback(mut self) -> Result<()> {
        self.released = true;
        let result = self.conn.rollback().await;
        self.restore_autocommit().await;
        result
    }

    async fn restore_autocommit(&mut self) {
        if let Err(e) = self.conn.set_autocommit(self.previous_autocommit).await {
            warn!(
                "Failed to restore autocommit={} after transaction: {}",
                self.previous_autocommit, e
            );
        }
    }
}

impl Drop for TransactionContext<'_> {
    fn drop(&mut self) {
        if !self.released {
            warn!("Transaction dropped without commit or rollback; the server rolls it back when the session ends");
        }
    }
}
