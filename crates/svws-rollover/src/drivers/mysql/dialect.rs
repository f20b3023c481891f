//! MySQL/MariaDB SQL dialect.
//!
//! Renders every statement the rollover issues. Identifiers come from the
//! static step catalog and are backtick-quoted; values are always bound as
//! positional `?` parameters.

use crate::core::SqlValue;
use crate::steps::MigrationStep;
use crate::transform::formatted_date::MAX_INCREMENTABLE_YEAR;
use crate::transform::{TransformKind, FORMATTED_DATE_PATTERN};

/// SQL text plus its positional parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl Statement {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn with_params(sql: impl Into<String>, params: Vec<SqlValue>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

/// MySQL/MariaDB dialect implementation.
///
/// Compatible with MariaDB 10.5+ and MySQL 8.0+ (`REGEXP`, savepoints,
/// `CHECKSUM TABLE`).
#[derive(Debug, Clone, Copy, Default)]
pub struct MysqlDialect;

impl MysqlDialect {
    pub fn new() -> Self {
        Self
    }

    pub fn name(&self) -> &str {
        "mysql"
    }

    /// Quote an identifier with backticks, doubling embedded backticks.
    pub fn quote_ident(&self, name: &str) -> String {
        format!("`{}`", name.replace('`', "``"))
    }

    /// NULL-safe expression computing the year-advanced value of `column`.
    ///
    /// Values the transform does not apply to (see [`qualifies_expr`]) are
    /// returned unchanged, so a multi-column UPDATE never damages a column
    /// whose neighbour selected the row.
    ///
    /// [`qualifies_expr`]: MysqlDialect::qualifies_expr
    pub fn add_year_expr(&self, kind: TransformKind, column: &str) -> Statement {
        let col = self.quote_ident(column);
        match kind {
            TransformKind::DateAddYear => {
                let cond = self.qualifies_expr(kind, column);
                Statement::new(format!(
                    "CASE WHEN {} THEN DATE_ADD({col}, INTERVAL 1 YEAR) ELSE {col} END",
                    cond.sql,
                    col = col
                ))
            }
            TransformKind::IntegerYearAddYear => Statement::new(format!("{} + 1", col)),
            TransformKind::FormattedDateAddYear => {
                let cond = self.qualifies_expr(kind, column);
                let day_month = format!("SUBSTRING_INDEX({}, '.', 2)", col);
                Statement::with_params(
                    format!(
                        "CASE WHEN {cond} THEN CONCAT(\
                         CASE {dm} WHEN '29.02' THEN '28.02' WHEN '29.2' THEN '28.2' ELSE {dm} END, \
                         '.', LPAD({year} + 1, 4, '0')) \
                         ELSE {col} END",
                        cond = cond.sql,
                        dm = day_month,
                        year = formatted_part(&col, FormattedPart::Year),
                        col = col,
                    ),
                    cond.params,
                )
            }
        }
    }

    /// Row filter selecting values the transform applies to.
    ///
    /// Dates qualify when not NULL and not a zero date (`DATE_ADD` turns
    /// `0000-00-00` into NULL). Integers qualify when not NULL. Formatted
    /// strings qualify when they match the grammar, name a real calendar day
    /// and have a year below 9999; the calendar checks sit inside a `CASE` so
    /// no `CAST` ever sees a non-numeric token. Never NULL for formatted
    /// strings, so `NOT (...)` is safe.
    pub fn qualifies_expr(&self, kind: TransformKind, column: &str) -> Statement {
        let col = self.quote_ident(column);
        match kind {
            TransformKind::DateAddYear => Statement::new(format!(
                "MONTH({col}) <> 0 AND DAYOFMONTH({col}) <> 0",
                col = col
            )),
            TransformKind::IntegerYearAddYear => Statement::new(format!("{} IS NOT NULL", col)),
            TransformKind::FormattedDateAddYear => {
                let day = formatted_part(&col, FormattedPart::Day);
                let month = formatted_part(&col, FormattedPart::Month);
                let year = formatted_part(&col, FormattedPart::Year);
                Statement::with_params(
                    format!(
                        "CASE WHEN {col} REGEXP ? THEN ({year} <= {max} AND {day} <= \
                         CASE {month} \
                         WHEN 2 THEN IF({year} % 4 = 0 AND ({year} % 100 <> 0 OR {year} % 400 = 0), 29, 28) \
                         WHEN 4 THEN 30 WHEN 6 THEN 30 WHEN 9 THEN 30 WHEN 11 THEN 30 \
                         ELSE 31 END) \
                         ELSE 0 END",
                        col = col,
                        year = year,
                        max = MAX_INCREMENTABLE_YEAR,
                        day = day,
                        month = month,
                    ),
                    vec![SqlValue::from(FORMATTED_DATE_PATTERN)],
                )
            }
        }
    }

    /// Single UPDATE advancing every target column of a step.
    pub fn bulk_update(&self, step: &MigrationStep) -> Statement {
        let mut params = Vec::new();

        let assignments: Vec<String> = step
            .columns
            .iter()
            .map(|c| {
                let expr = self.add_year_expr(step.transform, c);
                params.extend(expr.params);
                format!("{} = {}", self.quote_ident(c), expr.sql)
            })
            .collect();

        let conditions: Vec<String> = step
            .columns
            .iter()
            .map(|c| {
                let cond = self.qualifies_expr(step.transform, c);
                params.extend(cond.params);
                cond.sql
            })
            .collect();

        Statement::with_params(
            format!(
                "UPDATE {} SET {} WHERE {}",
                self.quote_ident(step.table),
                assignments.join(", "),
                conditions.join(" OR ")
            ),
            params,
        )
    }

    /// Read-only preview of (old, new) pairs for the step's first column.
    ///
    /// The new value is computed with the same expression the UPDATE uses.
    pub fn sample(&self, step: &MigrationStep, limit: usize) -> Statement {
        let column = step.columns[0];
        let expr = self.add_year_expr(step.transform, column);
        let cond = self.qualifies_expr(step.transform, column);

        let mut params = expr.params;
        params.extend(cond.params);
        params.push(SqlValue::from(limit));

        Statement::with_params(
            format!(
                "SELECT {}, {} FROM {} WHERE {} LIMIT ?",
                self.quote_ident(column),
                expr.sql,
                self.quote_ident(step.table),
                cond.sql
            ),
            params,
        )
    }

    /// Count non-NULL values of `column` that are not advanced by the
    /// formatted date transform and will therefore be left untouched.
    pub fn formatted_mismatch_count(&self, table: &str, column: &str) -> Statement {
        let cond = self.qualifies_expr(TransformKind::FormattedDateAddYear, column);
        Statement::with_params(
            format!(
                "SELECT COUNT(*) FROM {} WHERE {} IS NOT NULL AND NOT ({})",
                self.quote_ident(table),
                self.quote_ident(column),
                cond.sql
            ),
            cond.params,
        )
    }

    /// Distinct year values of the anchor table.
    pub fn distinct_years(&self, table: &str, column: &str) -> Statement {
        let col = self.quote_ident(column);
        Statement::new(format!(
            "SELECT DISTINCT {} FROM {} WHERE {} IS NOT NULL ORDER BY {} DESC",
            col,
            self.quote_ident(table),
            col,
            col
        ))
    }

    /// Number of rows holding a given year.
    pub fn count_year(&self, table: &str, column: &str, year: i64) -> Statement {
        Statement::with_params(
            format!(
                "SELECT COUNT(*) FROM {} WHERE {} = ?",
                self.quote_ident(table),
                self.quote_ident(column)
            ),
            vec![SqlValue::Int(year)],
        )
    }

    /// Move every row of `from` to `to`.
    pub fn update_year(&self, table: &str, column: &str, from: i64, to: i64) -> Statement {
        let col = self.quote_ident(column);
        Statement::with_params(
            format!(
                "UPDATE {} SET {} = ? WHERE {} = ?",
                self.quote_ident(table),
                col,
                col
            ),
            vec![SqlValue::Int(to), SqlValue::Int(from)],
        )
    }

    pub fn count_rows(&self, table: &str) -> Statement {
        Statement::new(format!("SELECT COUNT(*) FROM {}", self.quote_ident(table)))
    }

    pub fn checksum_table(&self, table: &str) -> Statement {
        Statement::new(format!("CHECKSUM TABLE {}", self.quote_ident(table)))
    }

    pub fn server_version(&self) -> Statement {
        Statement::new("SELECT VERSION()")
    }

    pub fn set_autocommit(&self, enabled: bool) -> Statement {
        Statement::new(format!("SET autocommit = {}", u8::from(enabled)))
    }

    pub fn savepoint(&self, name: &str) -> Statement {
        Statement::new(format!("SAVEPOINT {}", self.quote_ident(name)))
    }

    pub fn rollback_to_savepoint(&self, name: &str) -> Statement {
        Statement::new(format!("ROLLBACK TO SAVEPOINT {}", self.quote_ident(name)))
    }

    pub fn release_savepoint(&self, name: &str) -> Statement {
        Statement::new(format!("RELEASE SAVEPOINT {}", self.quote_ident(name)))
    }
}

#[derive(Clone, Copy)]
enum FormattedPart {
    Day,
    Month,
    Year,
}

/// Numeric value of one component of a `D.M.YYYY` string in `col`.
fn formatted_part(col: &str, part: FormattedPart) -> String {
    let token = match part {
        FormattedPart::Day => format!("SUBSTRING_INDEX({}, '.', 1)", col),
        FormattedPart::Month => format!("SUBSTRING_INDEX(SUBSTRING_INDEX({}, '.', 2), '.', -1)", col),
        FormattedPart::Year => format!("SUBSTRING_INDEX({}, '.', -1)", col),
    };
    format!("CAST({} AS UNSIGNED)", token)
}
