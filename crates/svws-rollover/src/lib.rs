//! # svws-rollover
//!
//! School-year rollover for SVWS MariaDB databases.
//!
//! Advances every temporal reference of a school database by exactly one
//! year so a snapshot of year N becomes usable for year N+1:
//!
//! - **Segment renumbering** of `Schuljahresabschnitte.Jahr`, highest year
//!   first so the `(Jahr, Abschnitt)` key never collides
//! - **Bulk transforms** for date columns, `D.M.YYYY` strings and integer
//!   year columns, one UPDATE per table, NULL-safe
//! - **One transaction** per run with a savepoint per step, step filtering
//!   and dry runs with optional checksum verification
//!
//! ## Example
//!
//! ```rust,no_run
//! use svws_rollover::{Config, Orchestrator, RunOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::load("config.json")?;
//!     let options = RunOptions::from_config(&config.rollover).dry_run(true);
//!     let report = Orchestrator::new(options)
//!         .run_with_config(&config, None)
//!         .await?;
//!     println!("Would update {} rows", report.rows_affected());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod core;
pub mod drivers;
pub mod error;
pub mod orchestrator;
pub mod rollover;
pub mod steps;
pub mod transform;
pub mod verify;

#[cfg(test)]
pub(crate) mod testing;

// Re-exports for convenient access
pub use config::{Config, DatabaseConfig, RolloverConfig};
pub use crate::core::{Connection, Row, SqlValue};
pub use drivers::{MysqlConnection, MysqlDialect};
pub use error::{ErrorKind, RolloverError, Result};
pub use orchestrator::{Orchestrator, RunOptions, RunReport, RunState, StepReport};
pub use steps::{parse_step_list, MigrationStep, StepRegistry};
pub use transform::TransformKind;
