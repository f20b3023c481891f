//! Step execution: the two strategies a [`MigrationStep`] can run with.
//!
//! - [`segments`]: constraint-safe renumbering of academic-year segments
//! - [`bulk`]: one UPDATE per table for date, formatted-date and year columns

pub mod bulk;
pub mod segments;

pub use segments::YearSet;

use crate::error::Result;
use crate::orchestrator::report::{SamplePair, YearShift};
use crate::orchestrator::transaction::TransactionContext;
use crate::steps::{MigrationStep, StepStrategy};

/// What a step did inside the transaction.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOutcome {
    pub rows_affected: u64,
    pub samples: Vec<SamplePair>,
    pub year_shifts: Vec<YearShift>,
    pub unmatched_values: Option<u64>,
}

/// Run one step on the open transaction.
pub async fn execute_step(
    tx: &mut TransactionContext<'_>,
    step: &MigrationStep,
    sample_size: usize,
) -> Result<StepOutcome> {
    match step.strategy() {
        StepStrategy::SegmentRenumbering { year_column } => {
            segments::increment_segments(tx, step.table, year_column).await
        }
        StepStrategy::BulkUpdate => bulk::apply(tx, step, sample_size).await,
    }
}
