//! Column transform taxonomy: how one value is advanced by one year.
//!
//! [`TransformKind`] is a closed enum. Its [`apply`](TransformKind::apply)
//! method is the in-process reference semantics; the MariaDB dialect renders
//! the equivalent NULL-safe SQL expression for bulk updates.

pub mod formatted_date;

use chrono::Months;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::SqlValue;

pub use formatted_date::{add_year as add_year_formatted, FormattedDate, FORMATTED_DATE_PATTERN};

/// How a column value for year N+1 is computed from its year-N value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransformKind {
    /// DATE/DATETIME column: `date + 1 year`; 29 February becomes 28 February.
    DateAddYear,

    /// `D.M.YYYY` / `DD.MM.YYYY` string: year + 1, same component widths,
    /// 29 February becomes 28 February. Strings that are not a real calendar
    /// day stay untouched.
    FormattedDateAddYear,

    /// Integer year column: `value + 1`.
    IntegerYearAddYear,
}

impl TransformKind {
    /// Compute the advanced value. NULL always stays NULL, and values of an
    /// unexpected shape are returned unchanged.
    pub fn apply(&self, value: &SqlValue) -> SqlValue {
        match (self, value) {
            (_, SqlValue::Null) => SqlValue::Null,
            (TransformKind::DateAddYear, SqlValue::Date(d)) => d
                .checked_add_months(Months::new(12))
                .map_or_else(|| value.clone(), SqlValue::Date),
            (TransformKind::DateAddYear, SqlValue::DateTime(dt)) => dt
                .checked_add_months(Months::new(12))
                .map_or_else(|| value.clone(), SqlValue::DateTime),
            (TransformKind::FormattedDateAddYear, SqlValue::Text(s)) => {
                add_year_formatted(s).map_or_else(|| value.clone(), SqlValue::Text)
            }
            (TransformKind::IntegerYearAddYear, SqlValue::Int(v)) => v
                .checked_add(1)
                .map_or_else(|| value.clone(), SqlValue::Int),
            _ => value.clone(),
        }
    }

    /// Whether `value` would be left untouched because it does not fit the
    /// expected format (never true for NULL).
    pub fn is_mismatch(&self, value: &SqlValue) -> bool {
        !value.is_null() && self.apply(value) == *value
    }

    pub fn name(&self) -> &'static str {
        match self {
            TransformKind::DateAddYear => "date_add_year",
            TransformKind::FormattedDateAddYear => "formatted_date_add_year",
            TransformKind::IntegerYearAddYear => "integer_year_add_year",
        }
    }
}

impl fmt::Display for TransformKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
