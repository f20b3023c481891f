//! Core abstractions shared by the engine and the database driver.
//!
//! - [`value`]: SQL value and row representation
//! - [`traits`]: the [`Connection`] collaborator the engine runs against

pub mod traits;
pub mod value;

pub use traits::Connection;
pub use value::{Row, SqlValue};
