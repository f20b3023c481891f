//! Bulk table transformers.
//!
//! Each step is a single UPDATE covering all of its columns. A read-only
//! preview runs first so the audit log shows real (old, new) pairs without
//! touching the data twice.

use tracing::{debug, info};

use super::StepOutcome;
use crate::error::Result;
use crate::orchestrator::report::SamplePair;
use crate::orchestrator::transaction::TransactionContext;
use crate::steps::MigrationStep;
use crate::transform::TransformKind;

/// Advance every target column of `step` by one year.
pub async fn apply(
    tx: &mut TransactionContext<'_>,
    step: &MigrationStep,
    sample_size: usize,
) -> Result<StepOutcome> {
    let dialect = *tx.dialect();
    let mut outcome = StepOutcome::default();

    if sample_size > 0 {
        let rows = tx.query(&dialect.sample(step, sample_size)).await?;
        let column = step.columns[0];
        for row in &rows {
            if let (Some(old), Some(new)) = (row.get(0), row.get(1)) {
                debug!("{}.{}: {} -> {}", step.table, column, old, new);
                outcome.samples.push(SamplePair::new(column, old, new));
            }
        }
    }

    if step.transform == TransformKind::FormattedDateAddYear {
        let mut unmatched = 0u64;
        for column in step.columns {
            let count = tx
                .query_scalar(&dialect.formatted_mismatch_count(step.table, column))
                .await?
                .unwrap_or(0);
            if count > 0 {
                info!(
                    "{}.{}: {} value(s) are not valid D.M.YYYY dates and are left unchanged",
                    step.table, column, count
                );
            }
            unmatched += count.max(0) as u64;
        }
        outcome.unmatched_values = Some(unmatched);
    }

    outcome.rows_affected = tx.update(&dialect.bulk_update(step)).await?;
    info!(
        "{}: {} rows updated ({})",
        step.table, outcome.rows_affected, step.transform
    );

    Ok(outcome)
}
