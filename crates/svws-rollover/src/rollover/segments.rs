//! Constraint-safe renumbering of academic-year segments.
//!
//! `(Jahr, Abschnitt)` is unique, so moving every year up by one only works
//! highest year first: when year `y` moves to `y + 1`, the rows that held
//! `y + 1` have already moved on to `y + 2`. Any row still holding `y + 1` at
//! that point existed before the run and is a genuine collision.

use tracing::{debug, info, warn};

use super::StepOutcome;
use crate::core::Row;
use crate::error::{RolloverError, Result};
use crate::orchestrator::report::YearShift;
use crate::orchestrator::transaction::TransactionContext;

/// Distinct year values captured once at the start of the step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct YearSet {
    years: Vec<i64>,
}

impl YearSet {
    /// Build from arbitrary input; the result is deduplicated and sorted
    /// descending regardless of input order.
    pub fn new(mut years: Vec<i64>) -> Self {
        years.sort_unstable_by(|a, b| b.cmp(a));
        years.dedup();
        Self { years }
    }

    fn from_rows(rows: &[Row]) -> Self {
        Self::new(rows.iter().filter_map(|r| r.get_i64(0)).collect())
    }

    /// Years in the order they must be processed (strictly descending).
    pub fn processing_order(&self) -> &[i64] {
        &self.years
    }

    pub fn is_empty(&self) -> bool {
        self.years.is_empty()
    }

    pub fn len(&self) -> usize {
        self.years.len()
    }
}

/// Move every row of `table` from year `y` to `y + 1`.
pub async fn increment_segments(
    tx: &mut TransactionContext<'_>,
    table: &str,
    year_column: &str,
) -> Result<StepOutcome> {
    let dialect = *tx.dialect();
    let rows = tx.query(&dialect.distinct_years(table, year_column)).await?;
    let years = YearSet::from_rows(&rows);

    if years.is_empty() {
        warn!("{} contains no academic years, nothing to renumber", table);
        return Ok(StepOutcome::default());
    }

    debug!(
        "{}: renumbering {} years in order {:?}",
        table,
        years.len(),
        years.processing_order()
    );

    let mut outcome = StepOutcome::default();
    for &year in years.processing_order() {
        let target = year + 1;

        let conflicting = tx
            .query_scalar(&dialect.count_year(table, year_column, target))
            .await?
            .unwrap_or(0);
        if conflicting > 0 {
            return Err(RolloverError::ConstraintViolation {
                table: table.to_string(),
                year,
                target,
                conflicting,
            });
        }

        let rows = tx
            .update(&dialect.update_year(table, year_column, year, target))
            .await?;
        info!("Updated {} rows: {} {} -> {}", rows, year_column, year, target);

        outcome.rows_affected += rows;
        outcome.year_shifts.push(YearShift {
            from: year,
            to: target,
            rows,
        });
    }

    Ok(outcome)
}
