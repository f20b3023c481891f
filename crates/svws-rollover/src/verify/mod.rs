//! Dry-run verification.
//!
//! Takes `CHECKSUM TABLE` of every table a run touches, once before the
//! transaction starts and once after the dry-run rollback. Identical
//! checksums prove the rollback left no trace.

use std::collections::BTreeMap;
use tracing::{debug, error, info};

use crate::core::Connection;
use crate::drivers::MysqlDialect;
use crate::error::Result;

/// Checksums keyed by table name. `None` when the server reports NULL
/// (table missing or engine without checksum support).
pub type TableChecksums = BTreeMap<String, Option<i64>>;

/// Outcome of comparing two checksum snapshots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChecksumComparison {
    pub tables: usize,
    pub mismatched: Vec<String>,
}

impl ChecksumComparison {
    pub fn is_identical(&self) -> bool {
        self.mismatched.is_empty()
    }
}

/// Checksum every table in `tables`.
pub async fn table_checksums(conn: &mut dyn Connection, tables: &[&str]) -> Result<TableChecksums> {
    let dialect = MysqlDialect::new();
    let mut checksums = TableChecksums::new();

    for table in tables {
        let stmt = dialect.checksum_table(table);
        let rows = conn.execute_query(&stmt.sql, &stmt.params).await?;
        // CHECKSUM TABLE returns (Table, Checksum)
        let checksum = rows.first().and_then(|r| r.get_i64(1));
        debug!("{}: checksum {:?}", table, checksum);
        checksums.insert(table.to_string(), checksum);
    }

    Ok(checksums)
}

/// Compare snapshots taken before and after a dry run.
pub fn compare(before: &TableChecksums, after: &TableChecksums) -> ChecksumComparison {
    let mismatched: Vec<String> = before
        .iter()
        .filter(|(table, checksum)| after.get(table.as_str()) != Some(*checksum))
        .map(|(table, _)| table.clone())
        .collect();

    if mismatched.is_empty() {
        info!("Dry run verified: {} table checksums unchanged", before.len());
    } else {
        for table in &mismatched {
            error!(
                "{}: checksum changed during dry run ({:?} -> {:?})",
                table,
                before.get(table).copied().flatten(),
                after.get(table).copied().flatten()
            );
        }
    }

    ChecksumComparison {
        tables: before.len(),
        mismatched,
    }
}
