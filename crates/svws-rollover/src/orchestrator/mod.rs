//! Rollover orchestrator - main workflow coordinator.
//!
//! Runs the selected steps in canonical order inside one transaction. Each
//! step gets its own savepoint; the first failure rolls back the whole run.
//! A dry run executes everything and then rolls back.

pub mod health;
pub mod report;
pub mod transaction;

pub use health::{health_check, HealthCheckResult};
pub use report::{RunReport, RunState, SamplePair, StepFailure, StepReport, YearShift};
pub use transaction::TransactionContext;

use chrono::Utc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::config::{Config, RolloverConfig};
use crate::core::Connection;
use crate::drivers::MysqlConnection;
use crate::error::{RolloverError, Result};
use crate::rollover::{execute_step, StepOutcome};
use crate::steps::{MigrationStep, StepRegistry};
use crate::verify;

/// Per-run settings.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Execute every step, then roll back.
    pub dry_run: bool,

    /// Overrides each step's sample size when set.
    pub sample_size: Option<usize>,

    /// Compare table checksums before and after a dry run.
    pub verify_dry_run: bool,

    /// Checked between steps; cancelling rolls back the run.
    pub cancel: CancellationToken,
}

impl RunOptions {
    /// Options seeded from the `rollover` config section.
    pub fn from_config(config: &RolloverConfig) -> Self {
        Self {
            sample_size: config.sample_size,
            verify_dry_run: config.verify_dry_run,
            ..Default::default()
        }
    }

    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_cancel(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }
}

/// Rollover orchestrator.
pub struct Orchestrator {
    registry: StepRegistry,
    options: RunOptions,
}

impl Orchestrator {
    /// Create an orchestrator over the standard step catalog.
    pub fn new(options: RunOptions) -> Self {
        Self {
            registry: StepRegistry::standard(),
            options,
        }
    }

    /// Use a different step registry.
    pub fn with_registry(mut self, registry: StepRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn registry(&self) -> &StepRegistry {
        &self.registry
    }

    pub fn options(&self) -> &RunOptions {
        &self.options
    }

    /// Connect with `config`, run, and disconnect.
    ///
    /// Step keys are resolved before connecting, so an unknown key never
    /// reaches the database.
    pub async fn run_with_config(
        &self,
        config: &Config,
        steps: Option<&[String]>,
    ) -> Result<RunReport> {
        self.registry.resolve_all(steps)?;

        let mut conn = MysqlConnection::connect(&config.database).await?;
        let result = self.run(&mut conn, steps).await;
        if let Err(e) = conn.disconnect().await {
            warn!("Failed to close connection cleanly: {}", e);
        }
        result
    }

    /// Run the selected steps (all when `steps` is `None`) on `conn`. An
    /// explicit empty selection is rejected before any statement is sent.
    ///
    /// Step failures produce a report with `success == false`; `Err` is
    /// reserved for failures outside any step (resolving keys, starting or
    /// committing the transaction, a failed dry-run rollback).
    pub async fn run(
        &self,
        conn: &mut dyn Connection,
        steps: Option<&[String]>,
    ) -> Result<RunReport> {
        let steps = self.registry.resolve_all(steps)?;
        let dry_run = self.options.dry_run;

        let run_id = Uuid::new_v4().to_string();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut state = RunState::Idle;

        info!(
            "Starting rollover run {} on {}: {} step(s){}",
            run_id,
            conn.describe(),
            steps.len(),
            if dry_run { " (dry run)" } else { "" }
        );

        let tables = StepRegistry::tables(&steps);
        let checksums_before = if dry_run && self.options.verify_dry_run {
            Some(verify::table_checksums(conn, &tables).await?)
        } else {
            None
        };

        let mut tx = TransactionContext::begin(conn).await?;
        transition(&mut state, RunState::Running);

        let mut reports = Vec::with_capacity(steps.len());
        let mut failed = false;

        for step in &steps {
            if self.options.cancel.is_cancelled() {
                warn!("Cancellation requested, stopping before step {}", step.key);
                reports.push(failed_report(step, &RolloverError::Cancelled, Duration::ZERO));
                failed = true;
                break;
            }

            let step_start = Instant::now();
            let sample_size = self.options.sample_size.unwrap_or(step.sample_size);
            info!("Step {}: {}", step.key, step.description);

            match run_in_savepoint(&mut tx, step, sample_size).await {
                Ok(outcome) => {
                    info!(
                        "Step {} complete: {} rows affected",
                        step.key, outcome.rows_affected
                    );
                    reports.push(success_report(step, outcome, step_start.elapsed()));
                }
                Err(e) => {
                    error!("Step {} failed: {}", step.key, e);
                    reports.push(failed_report(step, &e, step_start.elapsed()));
                    failed = true;
                    break;
                }
            }
        }

        if failed || dry_run {
            if failed {
                warn!("Rolling back all changes of run {}", run_id);
            } else {
                info!("Dry run complete, rolling back");
            }
            match tx.rollback().await {
                Ok(()) => {}
                Err(e) if !failed => return Err(e),
                Err(e) => error!("Rollback failed: {}", e),
            }
            transition(&mut state, RunState::RolledBack);
        } else {
            tx.commit().await?;
            transition(&mut state, RunState::Committed);
        }

        let dry_run_verified = match checksums_before {
            Some(before) => {
                let after = verify::table_checksums(conn, &tables).await?;
                Some(verify::compare(&before, &after).is_identical())
            }
            None => None,
        };

        let completed_at = Utc::now();
        let duration = start.elapsed().as_secs_f64();
        let success = !failed && dry_run_verified.unwrap_or(true);

        let report = RunReport {
            run_id,
            success,
            dry_run,
            state,
            steps: reports,
            started_at,
            completed_at,
            duration_seconds: duration,
            dry_run_verified,
        };

        if success {
            info!(
                "Rollover run {} finished: {} step(s), {} rows, {:?} in {:.2}s",
                report.run_id,
                report.steps.len(),
                report.rows_affected(),
                report.state,
                duration
            );
        } else {
            error!(
                "Rollover run {} failed after {:.2}s, all changes rolled back",
                report.run_id, duration
            );
        }

        Ok(report)
    }
}

fn transition(state: &mut RunState, next: RunState) {
    debug!("Run state {:?} -> {:?}", state, next);
    *state = next;
}

/// Execute one step behind its own savepoint. On failure the step's partial
/// work is undone before the error is returned.
async fn run_in_savepoint(
    tx: &mut TransactionContext<'_>,
    step: &MigrationStep,
    sample_size: usize,
) -> Result<StepOutcome> {
    tx.savepoint(step.key).await?;

    match execute_step(tx, step, sample_size).await {
        Ok(outcome) => {
            tx.release_savepoint(step.key).await?;
            Ok(outcome)
        }
        Err(e) => {
            if let Err(rb) = tx.rollback_to_savepoint(step.key).await {
                warn!("Failed to roll back to savepoint {}: {}", step.key, rb);
            }
            Err(e)
        }
    }
}

fn success_report(step: &MigrationStep, outcome: StepOutcome, elapsed: Duration) -> StepReport {
    StepReport {
        key: step.key.to_string(),
        table: step.table.to_string(),
        transform: step.transform.to_string(),
        rows_affected: outcome.rows_affected,
        success: true,
        samples: outcome.samples,
        year_shifts: outcome.year_shifts,
        unmatched_values: outcome.unmatched_values,
        error: None,
        duration_ms: elapsed.as_millis() as u64,
    }
}

fn failed_report(step: &MigrationStep, err: &RolloverError, elapsed: Duration) -> StepReport {
    StepReport {
        key: step.key.to_string(),
        table: step.table.to_string(),
        transform: step.transform.to_string(),
        rows_affected: 0,
        success: false,
        samples: Vec::new(),
        year_shifts: Vec::new(),
        unmatched_values: None,
        error: Some(StepFailure::from(err)),
        duration_ms: elapsed.as_millis() as u64,
    }
}
