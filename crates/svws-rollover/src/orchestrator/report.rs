//! Per-step and per-run execution reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::SqlValue;
use crate::error::{ErrorKind, RolloverError, Result};

/// Lifecycle of a run: `Idle -> Running -> {Committed, RolledBack}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Running,
    Committed,
    RolledBack,
}

/// Rows moved from one academic year to the next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct YearShift {
    pub from: i64,
    pub to: i64,
    pub rows: u64,
}

/// One (old, new) value pair captured before a bulk update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePair {
    pub column: String,
    pub old: String,
    pub new: String,
}

impl SamplePair {
    pub fn new(column: &str, old: &SqlValue, new: &SqlValue) -> Self {
        Self {
            column: column.to_string(),
            old: old.to_string(),
            new: new.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&RolloverError> for StepFailure {
    fn from(e: &RolloverError) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Outcome of a single step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub key: String,
    pub table: String,
    pub transform: String,
    pub rows_affected: u64,
    pub success: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub samples: Vec<SamplePair>,

    /// Per-year row counts (segment renumbering only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub year_shifts: Vec<YearShift>,

    /// Formatted values left untouched because they do not parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmatched_values: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<StepFailure>,

    pub duration_ms: u64,
}

/// Result of a rollover run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique run identifier.
    pub run_id: String,

    pub success: bool,
    pub dry_run: bool,

    /// Final transaction state.
    pub state: RunState,

    pub steps: Vec<StepReport>,

    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub duration_seconds: f64,

    /// Checksum comparison after a dry run, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dry_run_verified: Option<bool>,
}

impl RunReport {
    /// Total rows affected across all steps.
    pub fn rows_affected(&self) -> u64 {
        self.steps.iter().map(|s| s.rows_affected).sum()
    }

    /// The first step that failed, if any.
    pub fn failed_step(&self) -> Option<&StepReport> {
        self.steps.iter().find(|s| !s.success)
    }

    /// Exit code for the CLI: 0 on success, otherwise the code of the failing
    /// step's error kind.
    pub fn exit_code(&self) -> u8 {
        if self.success {
            return 0;
        }
        self.failed_step()
            .and_then(|s| s.error.as_ref())
            .map(|e| e.kind.exit_code())
            .unwrap_or(crate::error::EXIT_QUERY_ERROR)
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
