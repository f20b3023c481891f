//! Step registry: stable step keys mapped to their targets and transforms.
//!
//! The registry's order is the canonical execution order. Segment renumbering
//! comes first, followed by the per-table transforms, which have no
//! dependencies on each other but always run in the same order so logs are
//! reproducible.

mod catalog;

pub use catalog::{SEGMENT_STEP_KEY, SEGMENT_TABLE, SEGMENT_YEAR_COLUMN};

use serde::Serialize;
use std::collections::BTreeSet;

use crate::error::{RolloverError, Result};
use crate::transform::TransformKind;

/// One unit of the rollover: a table, its columns and how they advance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationStep {
    /// Stable key used on the command line and in reports.
    pub key: &'static str,
    /// Human-readable description for `list-steps`.
    pub description: &'static str,
    pub table: &'static str,
    pub columns: &'static [&'static str],
    pub transform: TransformKind,
    /// Year column of the anchor table. Only set for segment renumbering.
    pub anchor_column: Option<&'static str>,
    /// Number of (old, new) pairs captured for the audit log.
    pub sample_size: usize,
}

/// How the engine executes a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStrategy {
    /// Year-by-year renumbering, highest year first.
    SegmentRenumbering { year_column: &'static str },
    /// One UPDATE statement covering every target column.
    BulkUpdate,
}

impl MigrationStep {
    pub fn strategy(&self) -> StepStrategy {
        match self.anchor_column {
            Some(year_column) => StepStrategy::SegmentRenumbering { year_column },
            None => StepStrategy::BulkUpdate,
        }
    }
}

/// Ordered collection of rollover steps.
#[derive(Debug, Clone)]
pub struct StepRegistry {
    steps: Vec<MigrationStep>,
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl StepRegistry {
    /// The SVWS step catalog.
    pub fn standard() -> Self {
        Self::new(catalog::STANDARD_STEPS.to_vec())
    }

    /// Build a registry from explicit steps; their order becomes the
    /// canonical order.
    pub fn new(steps: Vec<MigrationStep>) -> Self {
        Self { steps }
    }

    /// All steps in canonical order.
    pub fn steps(&self) -> &[MigrationStep] {
        &self.steps
    }

    /// Step keys with their descriptions, in canonical order.
    pub fn list_steps(&self) -> Vec<(&'static str, &'static str)> {
        self.steps.iter().map(|s| (s.key, s.description)).collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.steps.iter().any(|s| s.key == key)
    }

    /// Look up a single step.
    pub fn resolve(&self, key: &str) -> Result<&MigrationStep> {
        self.steps
            .iter()
            .find(|s| s.key == key)
            .ok_or_else(|| RolloverError::UnknownStep(vec![key.to_string()]))
    }

    /// Resolve a requested subset into execution order.
    ///
    /// `None` selects every step; an explicit but empty selection is a
    /// [`RolloverError::Config`] error. Requested keys are deduplicated and
    /// returned in canonical order. Every unknown key is reported in a single
    /// [`RolloverError::UnknownStep`].
    pub fn resolve_all(&self, keys: Option<&[String]>) -> Result<Vec<&MigrationStep>> {
        let keys = match keys {
            None => return Ok(self.steps.iter().collect()),
            Some(keys) if keys.iter().all(|k| k.trim().is_empty()) => {
                return Err(RolloverError::Config(
                    "No steps selected; omit the step list to run every step".to_string(),
                ))
            }
            Some(keys) => keys,
        };

        let mut unknown: Vec<String> = Vec::new();
        let mut requested: BTreeSet<&str> = BTreeSet::new();
        for key in keys {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            if self.contains(key) {
                requested.insert(key);
            } else if !unknown.iter().any(|k| k == key) {
                unknown.push(key.to_string());
            }
        }

        if !unknown.is_empty() {
            return Err(RolloverError::UnknownStep(unknown));
        }

        Ok(self
            .steps
            .iter()
            .filter(|s| requested.contains(s.key))
            .collect())
    }

    /// Distinct tables touched by the given steps, in first-use order.
    pub fn tables<'a>(steps: &[&'a MigrationStep]) -> Vec<&'a str> {
        let mut tables: Vec<&str> = Vec::new();
        for step in steps {
            if !tables.contains(&step.table) {
                tables.push(step.table);
            }
        }
        tables
    }
}

/// Split a comma-separated `--steps` argument into keys.
pub fn parse_step_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}
