//! Error types for the rollover library.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for rollover operations.
#[derive(Error, Debug)]
pub enum RolloverError {
    /// Configuration error (invalid YAML, missing fields, etc.)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Connection could not be established or was lost mid-run
    #[error("Connection error: {message}\n  Context: {context}")]
    Connection { message: String, context: String },

    /// One or more requested step keys are not registered
    #[error("Unknown step(s): {}", .0.join(", "))]
    UnknownStep(Vec<String>),

    /// A statement failed (syntax, permission, deadlock, ...)
    #[error("Query failed ({context}): {message}")]
    Query { context: String, message: String },

    /// Renumbering would make two rows share a protected year value
    #[error(
        "Constraint violation in {table}: {conflicting} row(s) already hold year {target} \
         while year {year} is being moved there"
    )]
    ConstraintViolation {
        table: String,
        year: i64,
        target: i64,
        conflicting: i64,
    },

    /// IO error (file operations)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// YAML serialization/deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Run was cancelled (SIGINT, etc.)
    #[error("Rollover cancelled")]
    Cancelled,
}

/// Serializable classification of a [`RolloverError`], kept in run reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Config,
    Connection,
    UnknownStep,
    Query,
    ConstraintViolation,
    Io,
    Cancelled,
}

pub const EXIT_CONFIG_ERROR: u8 = 1;
pub const EXIT_CONNECTION_ERROR: u8 = 2;
pub const EXIT_UNKNOWN_STEP: u8 = 3;
pub const EXIT_QUERY_ERROR: u8 = 4;
pub const EXIT_CONSTRAINT_VIOLATION: u8 = 5;
pub const EXIT_CANCELLED: u8 = 6;
pub const EXIT_IO_ERROR: u8 = 7;

impl ErrorKind {
    /// Process exit code for this kind of failure.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Config => EXIT_CONFIG_ERROR,
            ErrorKind::Connection => EXIT_CONNECTION_ERROR,
            ErrorKind::UnknownStep => EXIT_UNKNOWN_STEP,
            ErrorKind::Query => EXIT_QUERY_ERROR,
            ErrorKind::ConstraintViolation => EXIT_CONSTRAINT_VIOLATION,
            ErrorKind::Cancelled => EXIT_CANCELLED,
            ErrorKind::Io => EXIT_IO_ERROR,
        }
    }
}

impl RolloverError {
    /// Create a Connection error with context about where it occurred
    pub fn connection(message: impl ToString, context: impl Into<String>) -> Self {
        RolloverError::Connection {
            message: message.to_string(),
            context: context.into(),
        }
    }

    /// Create a Query error
    pub fn query(context: impl Into<String>, message: impl ToString) -> Self {
        RolloverError::Query {
            context: context.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RolloverError::Config(_) | RolloverError::Yaml(_) | RolloverError::Json(_) => {
                ErrorKind::Config
            }
            RolloverError::Connection { .. } => ErrorKind::Connection,
            RolloverError::UnknownStep(_) => ErrorKind::UnknownStep,
            RolloverError::Query { .. } => ErrorKind::Query,
            RolloverError::ConstraintViolation { .. } => ErrorKind::ConstraintViolation,
            RolloverError::Io(_) => ErrorKind::Io,
            RolloverError::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// Exit code used by the CLI.
    pub fn exit_code(&self) -> u8 {
        self.kind().exit_code()
    }

    /// Format error with full details including error chain
    pub fn format_detailed(&self) -> String {
        let mut output = format!("Error: {}\n", self);

        let mut source = std::error::Error::source(self);
        let mut depth = 1;
        while let Some(err) = source {
            output.push_str(&format!("\nCaused by:\n  {}: {}", depth, err));
            source = err.source();
            depth += 1;
        }

        output
    }
}

/// Result type alias for rollover operations.
pub type Result<T> = std::result::Result<T, RolloverError>;
