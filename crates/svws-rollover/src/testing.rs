//! In-memory [`Connection`] used by the engine's unit tests.
//!
//! Models the rollover tables with their columns, the unique key of
//! `Schuljahresabschnitte`, autocommit transactions and savepoints. Statements
//! are recognised by comparing against the SQL the dialect renders for the
//! standard registry, so any drift between engine and dialect shows up as an
//! "unrecognised statement" failure.
//!
//! Statements are matched, not interpreted: a bulk UPDATE or preview SELECT
//! is evaluated with [`TransformKind::apply`] and `MemoryConnection::qualifies`,
//! never with the SQL expression the dialect rendered. The expression itself
//! is covered by the dialect's string tests and by the ignored tests in
//! `drivers::mysql::connection` that run it on a live server.

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};

use crate::core::{Connection, Row, SqlValue};
use crate::drivers::MysqlDialect;
use crate::error::{RolloverError, Result};
use crate::steps::{MigrationStep, StepRegistry, SEGMENT_TABLE, SEGMENT_YEAR_COLUMN};
use crate::transform::{add_year_formatted, TransformKind};

#[derive(Debug, Clone, PartialEq)]
struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<SqlValue>>,
    unique: Vec<Vec<usize>>,
}

impl Table {
    fn column(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    fn duplicate_key(&self) -> Option<String> {
        for key in &self.unique {
            let mut seen = Vec::new();
            for row in &self.rows {
                let values: Vec<&SqlValue> = key.iter().map(|&i| &row[i]).collect();
                if values.iter().any(|v| v.is_null()) {
                    continue;
                }
                if seen.contains(&values) {
                    let rendered: Vec<String> = values.iter().map(|v| v.to_string()).collect();
                    return Some(rendered.join("-"));
                }
                seen.push(values);
            }
        }
        None
    }
}

type Tables = BTreeMap<String, Table>;

#[derive(Debug, Clone)]
enum Handler {
    /// Evaluated with [`TransformKind::apply`], not the rendered SQL.
    Bulk(MigrationStep),
    Sample(MigrationStep),
    Mismatch(String, String),
    DistinctYears,
    CountYear,
    UpdateYear,
    CountRows(String),
    Checksum(String),
    Version,
}

pub(crate) struct MemoryConnection {
    tables: Tables,
    autocommit: bool,
    transaction_start: Option<Tables>,
    savepoints: Vec<(String, Tables)>,
    handlers: HashMap<String, Handler>,
    statements: Vec<String>,
    fail_on: Option<String>,
    late_segments: Vec<Vec<SqlValue>>,
    /// Return distinct years ascending regardless of `ORDER BY`.
    pub distinct_ascending: bool,
}

impl MemoryConnection {
    /// Empty tables for every step of the standard registry.
    pub fn standard() -> Self {
        let registry = StepRegistry::standard();
        let dialect = MysqlDialect::new();
        let mut tables = Tables::new();
        let mut handlers = HashMap::new();

        for step in registry.steps() {
            let table = tables.entry(step.table.to_string()).or_insert_with(|| Table {
                columns: vec!["ID".to_string()],
                rows: Vec::new(),
                unique: Vec::new(),
            });
            for column in step.columns {
                if table.column(column).is_none() {
                    table.columns.push(column.to_string());
                }
            }

            handlers.insert(
                dialect.count_rows(step.table).sql,
                Handler::CountRows(step.table.to_string()),
            );
            handlers.insert(
                dialect.checksum_table(step.table).sql,
                Handler::Checksum(step.table.to_string()),
            );

            if step.anchor_column.is_some() {
                continue;
            }
            handlers.insert(dialect.bulk_update(step).sql, Handler::Bulk(step.clone()));
            handlers.insert(dialect.sample(step, 1).sql, Handler::Sample(step.clone()));
            if step.transform == TransformKind::FormattedDateAddYear {
                for column in step.columns {
                    handlers.insert(
                        dialect.formatted_mismatch_count(step.table, column).sql,
                        Handler::Mismatch(step.table.to_string(), column.to_string()),
                    );
                }
            }
        }

        if let Some(segments) = tables.get_mut(SEGMENT_TABLE) {
            segments.columns.push("Abschnitt".to_string());
            let jahr = segments.column(SEGMENT_YEAR_COLUMN).unwrap_or(1);
            segments.unique.push(vec![jahr, segments.columns.len() - 1]);
        }

        handlers.insert(
            dialect.distinct_years(SEGMENT_TABLE, SEGMENT_YEAR_COLUMN).sql,
            Handler::DistinctYears,
        );
        handlers.insert(
            dialect.count_year(SEGMENT_TABLE, SEGMENT_YEAR_COLUMN, 0).sql,
            Handler::CountYear,
        );
        handlers.insert(
            dialect.update_year(SEGMENT_TABLE, SEGMENT_YEAR_COLUMN, 0, 0).sql,
            Handler::UpdateYear,
        );
        handlers.insert(dialect.server_version().sql, Handler::Version);

        Self {
            tables,
            autocommit: true,
            transaction_start: None,
            savepoints: Vec::new(),
            handlers,
            statements: Vec::new(),
            fail_on: None,
            late_segments: Vec::new(),
            distinct_ascending: false,
        }
    }

    /// Insert a row; unspecified columns are NULL.
    pub fn insert(&mut self, table: &str, values: &[(&str, SqlValue)]) {
        let table = self.tables.get_mut(table).expect("unknown table");
        let mut row = vec![SqlValue::Null; table.columns.len()];
        for (column, value) in values {
            let idx = table.column(column).expect("unknown column");
            row[idx] = value.clone();
        }
        table.rows.push(row);
    }

    /// Insert a `Schuljahresabschnitte` row.
    pub fn insert_segment(&mut self, id: i64, year: i64, abschnitt: i64) {
        self.insert(
            SEGMENT_TABLE,
            &[
                ("ID", id.into()),
                (SEGMENT_YEAR_COLUMN, year.into()),
                ("Abschnitt", abschnitt.into()),
            ],
        );
    }

    /// Queue a `Schuljahresabschnitte` row that appears right after the
    /// distinct-year scan, like a concurrent writer would.
    pub fn insert_segment_after_year_scan(&mut self, id: i64, year: i64, abschnitt: i64) {
        self.late_segments
            .push(vec![SqlValue::Int(id), SqlValue::Int(year), SqlValue::Int(abschnitt)]);
    }

    /// All values of one column, in insertion order.
    pub fn column_values(&self, table: &str, column: &str) -> Vec<SqlValue> {
        let table = &self.tables[table];
        let idx = table.column(column).expect("unknown column");
        table.rows.iter().map(|r| r[idx].clone()).collect()
    }

    /// Full copy of every table's rows for before/after comparisons.
    pub fn snapshot(&self) -> BTreeMap<String, Vec<Vec<SqlValue>>> {
        self.tables
            .iter()
            .map(|(name, t)| (name.clone(), t.rows.clone()))
            .collect()
    }

    /// Every SQL text received through `execute_query`/`execute_update`.
    pub fn statements(&self) -> &[String] {
        &self.statements
    }

    /// Fail every statement whose SQL contains `fragment`.
    pub fn fail_on(&mut self, fragment: &str) {
        self.fail_on = Some(fragment.to_string());
    }

    fn dispatch(&mut self, sql: &str, params: &[SqlValue]) -> Result<(Vec<Row>, u64)> {
        self.statements.push(sql.to_string());

        if let Some(fragment) = &self.fail_on {
            if sql.contains(fragment.as_str()) {
                return Err(RolloverError::query("memory", "simulated failure"));
            }
        }

        if let Some(name) = sql.strip_prefix("SAVEPOINT ") {
            self.savepoints.push((name.to_string(), self.tables.clone()));
            return Ok((Vec::new(), 0));
        }
        if let Some(name) = sql.strip_prefix("ROLLBACK TO SAVEPOINT ") {
            let pos = self.savepoint_position(name)?;
            self.tables = self.savepoints[pos].1.clone();
            self.savepoints.truncate(pos + 1);
            return Ok((Vec::new(), 0));
        }
        if let Some(name) = sql.strip_prefix("RELEASE SAVEPOINT ") {
            let pos = self.savepoint_position(name)?;
            self.savepoints.truncate(pos);
            return Ok((Vec::new(), 0));
        }

        let handler = self
            .handlers
            .get(sql)
            .cloned()
            .ok_or_else(|| RolloverError::query("memory", format!("unrecognised statement: {}", sql)))?;

        match handler {
            Handler::Bulk(step) => self.bulk_update(&step).map(|n| (Vec::new(), n)),
            Handler::Sample(step) => Ok((self.sample(&step, params), 0)),
            Handler::Mismatch(table, column) => {
                let count = self
                    .column_values(&table, &column)
                    .iter()
                    .filter(|v| {
                        !v.is_null() && !Self::qualifies(TransformKind::FormattedDateAddYear, v)
                    })
                    .count();
                Ok((vec![Row::new(vec![SqlValue::from(count)])], 0))
            }
            Handler::DistinctYears => {
                let mut years: Vec<SqlValue> = self
                    .column_values(SEGMENT_TABLE, SEGMENT_YEAR_COLUMN)
                    .into_iter()
                    .filter(|v| !v.is_null())
                    .collect();
                years.sort();
                years.dedup();
                if !self.distinct_ascending {
                    years.reverse();
                }
                if let Some(segments) = self.tables.get_mut(SEGMENT_TABLE) {
                    segments.rows.append(&mut self.late_segments);
                }
                Ok((years.into_iter().map(|y| Row::new(vec![y])).collect(), 0))
            }
            Handler::CountYear => {
                let count = self
                    .column_values(SEGMENT_TABLE, SEGMENT_YEAR_COLUMN)
                    .iter()
                    .filter(|v| *v == &params[0])
                    .count();
                Ok((vec![Row::new(vec![SqlValue::from(count)])], 0))
            }
            Handler::UpdateYear => self
                .update_year(&params[1], &params[0])
                .map(|n| (Vec::new(), n)),
            Handler::CountRows(table) => {
                let count = self.tables[&table].rows.len();
                Ok((vec![Row::new(vec![SqlValue::from(count)])], 0))
            }
            Handler::Checksum(table) => {
                let digest = Sha256::digest(format!("{:?}", self.tables[&table].rows));
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&digest[..8]);
                let checksum = i64::from_be_bytes(bytes) & i64::MAX;
                Ok((
                    vec![Row::new(vec![SqlValue::from(table), SqlValue::Int(checksum)])],
                    0,
                ))
            }
            Handler::Version => Ok((vec![Row::new(vec![SqlValue::from("11.4.2-MariaDB")])], 0)),
        }
    }

    fn savepoint_position(&self, quoted: &str) -> Result<usize> {
        self.savepoints
            .iter()
            .rposition(|(name, _)| name == quoted)
            .ok_or_else(|| RolloverError::query("memory", format!("SAVEPOINT {} does not exist", quoted)))
    }

    /// In-process counterpart of `MysqlDialect::qualifies_expr`.
    ///
    /// Zero dates arrive as text (`0000-00-00`) and never qualify for
    /// `DateAddYear`, matching the `MONTH(..) <> 0` filter.
    fn qualifies(kind: TransformKind, value: &SqlValue) -> bool {
        match (kind, value) {
            (_, SqlValue::Null) => false,
            (TransformKind::DateAddYear, SqlValue::Date(_) | SqlValue::DateTime(_)) => true,
            (TransformKind::DateAddYear, _) => false,
            (TransformKind::FormattedDateAddYear, SqlValue::Text(s)) => add_year_formatted(s).is_some(),
            (TransformKind::FormattedDateAddYear, _) => false,
            (TransformKind::IntegerYearAddYear, _) => true,
        }
    }

    fn bulk_update(&mut self, step: &MigrationStep) -> Result<u64> {
        let before = self.tables.clone();
        let table = self
            .tables
            .get_mut(step.table)
            .ok_or_else(|| RolloverError::query("memory", "unknown table"))?;
        let indexes: Vec<usize> = step.columns.iter().filter_map(|c| table.column(c)).collect();

        let mut changed = 0;
        for row in &mut table.rows {
            if !indexes.iter().any(|&i| Self::qualifies(step.transform, &row[i])) {
                continue;
            }
            let mut row_changed = false;
            for &i in &indexes {
                let next = step.transform.apply(&row[i]);
                if next != row[i] {
                    row[i] = next;
                    row_changed = true;
                }
            }
            if row_changed {
                changed += 1;
            }
        }

        self.check_unique(step.table, before)?;
        Ok(changed)
    }

    fn sample(&self, step: &MigrationStep, params: &[SqlValue]) -> Vec<Row> {
        let limit = params
            .last()
            .and_then(SqlValue::as_i64)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);
        self.column_values(step.table, step.columns[0])
            .into_iter()
            .filter(|v| Self::qualifies(step.transform, v))
            .take(limit)
            .map(|v| Row::new(vec![v.clone(), step.transform.apply(&v)]))
            .collect()
    }

    fn update_year(&mut self, from: &SqlValue, to: &SqlValue) -> Result<u64> {
        let before = self.tables.clone();
        let table = self
            .tables
            .get_mut(SEGMENT_TABLE)
            .ok_or_else(|| RolloverError::query("memory", "unknown table"))?;
        let idx = table
            .column(SEGMENT_YEAR_COLUMN)
            .ok_or_else(|| RolloverError::query("memory", "unknown column"))?;

        let mut changed = 0;
        for row in &mut table.rows {
            if &row[idx] == from {
                row[idx] = to.clone();
                changed += 1;
            }
        }

        self.check_unique(SEGMENT_TABLE, before)?;
        Ok(changed)
    }

    /// Undo the statement and fail when it broke a unique key.
    fn check_unique(&mut self, table: &str, before: Tables) -> Result<()> {
        if let Some(key) = self.tables[table].duplicate_key() {
            self.tables = before;
            return Err(RolloverError::query(
                "memory",
                format!("Duplicate entry '{}' for key 'PRIMARY'", key),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl Connection for MemoryConnection {
    async fn execute_query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        self.dispatch(sql, params).map(|(rows, _)| rows)
    }

    async fn execute_update(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        self.dispatch(sql, params).map(|(_, affected)| affected)
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        if enabled {
            self.transaction_start = None;
            self.savepoints.clear();
        } else if self.autocommit {
            self.transaction_start = Some(self.tables.clone());
        }
        self.autocommit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.savepoints.clear();
        if !self.autocommit {
            self.transaction_start = Some(self.tables.clone());
        }
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.savepoints.clear();
        if let Some(start) = &self.transaction_start {
            self.tables = start.clone();
        }
        Ok(())
    }

    fn describe(&self) -> String {
        "memory://svws".to_string()
    }
}
