//! German-formatted date strings (`D.M.YYYY` / `DD.MM.YYYY`).
//!
//! Only strings naming a real calendar day are advanced. The year component is
//! rewritten; day and month tokens are carried over byte for byte, so every
//! component keeps its width. 29 February becomes 28 February, as it does for
//! DATE columns.

use chrono::NaiveDate;
use regex::Regex;
use std::sync::LazyLock;

/// Grammar of a formatted date: day 1-31, month 1-12 (each with optional
/// leading zero) and a four-digit year.
///
/// The same pattern is bound as the `REGEXP` parameter of the generated SQL.
/// The grammar alone still admits days a month does not have (`31.04.2024`);
/// [`FormattedDate::parse`] and the SQL filter both check the calendar on top.
/// `\z` instead of `$` keeps PCRE from accepting a trailing newline.
pub const FORMATTED_DATE_PATTERN: &str =
    r"^(0?[1-9]|[12][0-9]|3[01])\.(0?[1-9]|1[0-2])\.([0-9]{4})\z";

/// Largest year that can still be incremented without leaving the grammar.
pub const MAX_INCREMENTABLE_YEAR: u16 = 9998;

static FORMATTED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(FORMATTED_DATE_PATTERN).expect("formatted date pattern is valid")
});

/// A string that matched the formatted date grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormattedDate<'a> {
    pub day: &'a str,
    pub month: &'a str,
    pub year: u16,
}

impl<'a> FormattedDate<'a> {
    /// Parse `input`; `None` means the string is not a formatted date or
    /// names a day that does not exist (`30.02.2024`).
    pub fn parse(input: &'a str) -> Option<Self> {
        let caps = FORMATTED_DATE.captures(input)?;
        let date = Self {
            day: caps.get(1)?.as_str(),
            month: caps.get(2)?.as_str(),
            year: caps.get(3)?.as_str().parse().ok()?,
        };
        date.to_naive(date.year)?;
        Some(date)
    }

    fn to_naive(&self, year: u16) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            i32::from(year),
            self.month.parse().ok()?,
            self.day.parse().ok()?,
        )
    }

    /// Render with a different year, keeping day and month tokens unchanged.
    /// A leap day that does not exist in `year` is moved to the 28th.
    pub fn render_with_year(&self, year: u16) -> String {
        let day = match self.to_naive(year) {
            Some(_) => self.day,
            None => "28",
        };
        format!("{}.{}.{:04}", day, self.month, year)
    }
}

/// Return the input advanced by one year, or `None` when it is not a valid
/// formatted date or its year cannot be incremented. Callers leave such
/// values untouched.
pub fn add_year(input: &str) -> Option<String> {
    let date = FormattedDate::parse(input)?;
    if date.year > MAX_INCREMENTABLE_YEAR {
        return None;
    }
    Some(date.render_with_year(date.year + 1))
}
