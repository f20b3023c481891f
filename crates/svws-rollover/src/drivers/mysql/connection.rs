//! MySQL/MariaDB connection implementation.
//!
//! Implements the [`Connection`] trait over a single `mysql_async` connection.
//! The rollover needs exactly one session (one transaction), so no pool is
//! involved.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, NaiveDateTime, Timelike};
use mysql_async::prelude::*;
use mysql_async::{Conn, Opts, OptsBuilder, Params, SslOpts, Value};
use tracing::{debug, info, warn};

use super::dialect::MysqlDialect;
use crate::config::DatabaseConfig;
use crate::core::{Connection, Row, SqlValue};
use crate::error::{RolloverError, Result};

/// A live MySQL/MariaDB session.
pub struct MysqlConnection {
    conn: Conn,
    dialect: MysqlDialect,
    autocommit: bool,
    endpoint: String,
}

impl MysqlConnection {
    /// Connect using the given configuration and apply its autocommit default.
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let ssl_opts = match config.ssl_mode.to_lowercase().as_str() {
            "disable" => None,
            "prefer" | "require" => Some(SslOpts::default().with_danger_accept_invalid_certs(true)),
            "verify-ca" | "verify_ca" | "verify-full" | "verify_identity" => {
                Some(SslOpts::default())
            }
            _ => {
                warn!(
                    "Unknown ssl_mode '{}', defaulting to Preferred",
                    config.ssl_mode
                );
                Some(SslOpts::default().with_danger_accept_invalid_certs(true))
            }
        };

        let mut builder = OptsBuilder::default()
            .ip_or_hostname(config.host.clone())
            .tcp_port(config.port)
            .db_name(Some(config.database.clone()))
            .user(Some(config.user.clone()))
            .pass(Some(config.password.clone()))
            // Use utf8mb4 for full Unicode support
            .init(vec!["SET NAMES utf8mb4"]);

        if let Some(ssl) = ssl_opts {
            builder = builder.ssl_opts(ssl);
        }

        let endpoint = format!("{}:{}/{}", config.host, config.port, config.database);
        let opts: Opts = builder.into();
        let conn = Conn::new(opts)
            .await
            .map_err(|e| RolloverError::connection(e, format!("connecting to {}", endpoint)))?;

        let mut connection = Self {
            conn,
            dialect: MysqlDialect::new(),
            autocommit: true,
            endpoint,
        };
        connection.set_autocommit(config.autocommit).await?;

        info!("Successfully connected to MariaDB at {}", connection.endpoint);
        Ok(connection)
    }

    /// Close the connection.
    pub async fn disconnect(self) -> Result<()> {
        let endpoint = self.endpoint;
        self.conn
            .disconnect()
            .await
            .map_err(|e| RolloverError::connection(e, format!("disconnecting from {}", endpoint)))?;
        info!("Database connection closed");
        Ok(())
    }

    async fn run_plain(&mut self, sql: &str, context: &str) -> Result<()> {
        debug!("{}", sql);
        self.conn
            .query_drop(sql)
            .await
            .map_err(|e| map_error(e, context))
    }
}

#[async_trait]
impl Connection for MysqlConnection {
    async fn execute_query(&mut self, sql: &str, params: &[SqlValue]) -> Result<Vec<Row>> {
        debug!("query: {} {:?}", sql, params);
        let result = if params.is_empty() {
            self.conn.query::<mysql_async::Row, _>(sql).await
        } else {
            self.conn
                .exec::<mysql_async::Row, _, _>(sql, to_params(params))
                .await
        };
        let rows = result.map_err(|e| map_error(e, "executing query"))?;

        Ok(rows
            .into_iter()
            .map(|row| Row::new(row.unwrap().into_iter().map(from_mysql).collect()))
            .collect())
    }

    async fn execute_update(&mut self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        debug!("update: {} {:?}", sql, params);
        let result = if params.is_empty() {
            self.conn.query_drop(sql).await
        } else {
            self.conn.exec_drop(sql, to_params(params)).await
        };
        result.map_err(|e| map_error(e, "executing update"))?;

        Ok(self.conn.affected_rows())
    }

    fn autocommit(&self) -> bool {
        self.autocommit
    }

    async fn set_autocommit(&mut self, enabled: bool) -> Result<()> {
        let stmt = self.dialect.set_autocommit(enabled);
        self.run_plain(&stmt.sql, "setting autocommit").await?;
        self.autocommit = enabled;
        Ok(())
    }

    async fn commit(&mut self) -> Result<()> {
        self.run_plain("COMMIT", "committing transaction").await?;
        info!("Transaction committed");
        Ok(())
    }

    async fn rollback(&mut self) -> Result<()> {
        self.run_plain("ROLLBACK", "rolling back transaction").await?;
        info!("Transaction rolled back");
        Ok(())
    }

    fn describe(&self) -> String {
        format!("mysql://{}", self.endpoint)
    }
}

/// Server-side failures are query errors; everything else means the session
/// itself is unusable.
fn map_error(e: mysql_async::Error, context: &str) -> RolloverError {
    match e {
        mysql_async::Error::Server(server) => RolloverError::query(context, server),
        other => RolloverError::connection(other, context),
    }
}

fn to_params(params: &[SqlValue]) -> Params {
    Params::Positional(params.iter().map(to_mysql).collect())
}

/// Convert SqlValue to mysql_async::Value.
fn to_mysql(value: &SqlValue) -> Value {
    match value {
        SqlValue::Null => Value::NULL,
        SqlValue::Int(v) => Value::Int(*v),
        SqlValue::Text(s) => Value::Bytes(s.as_bytes().to_vec()),
        SqlValue::Date(d) => Value::Date(d.year() as u16, d.month() as u8, d.day() as u8, 0, 0, 0, 0),
        SqlValue::DateTime(dt) => Value::Date(
            dt.year() as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
            dt.nanosecond() / 1_000,
        ),
    }
}

/// Convert mysql_async::Value to SqlValue.
///
/// Text-protocol results arrive as bytes and become [`SqlValue::Text`];
/// zero dates (`0000-00-00`) are kept as text since they are not valid dates.
fn from_mysql(value: Value) -> SqlValue {
    match value {
        Value::NULL => SqlValue::Null,
        Value::Int(v) => SqlValue::Int(v),
        Value::UInt(v) => i64::try_from(v).map_or_else(|_| SqlValue::Text(v.to_string()), SqlValue::Int),
        Value::Float(v) => SqlValue::Text(v.to_string()),
        Value::Double(v) => SqlValue::Text(v.to_string()),
        Value::Bytes(b) => SqlValue::Text(String::from_utf8_lossy(&b).into_owned()),
        Value::Date(y, m, d, h, mi, s, us) => {
            match NaiveDate::from_ymd_opt(y as i32, m as u32, d as u32) {
                Some(date) if h == 0 && mi == 0 && s == 0 && us == 0 => SqlValue::Date(date),
                Some(date) => date
                    .and_hms_micro_opt(h as u32, mi as u32, s as u32, us)
                    .map_or_else(
                        || SqlValue::Text(format!("{:04}-{:02}-{:02}", y, m, d)),
                        |dt: NaiveDateTime| SqlValue::DateTime(dt),
                    ),
                None => SqlValue::Text(format!("{:04}-{:02}-{:02}", y, m, d)),
            }
        }
        Value::Time(neg, days, h, m, s, _) => SqlValue::Text(format!(
            "{}{}:{:02}:{:02}",
            if neg { "-" } else { "" },
            days * 24 + h as u32,
            m,
            s
        )),
    }
}
