//! Connection health check.

use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{info, warn};

use crate::config::DatabaseConfig;
use crate::core::{Connection, SqlValue};
use crate::drivers::{MysqlConnection, MysqlDialect};
use crate::error::Result;
use crate::steps::SEGMENT_TABLE;

/// Result of a health check.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub endpoint: String,
    pub latency_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_version: Option<String>,

    /// Rows in `Schuljahresabschnitte`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_rows: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Server version and segment row count from an open connection.
pub async fn probe(conn: &mut dyn Connection) -> Result<(String, i64)> {
    let dialect = MysqlDialect::new();

    let stmt = dialect.server_version();
    let rows = conn.execute_query(&stmt.sql, &stmt.params).await?;
    let version = rows
        .first()
        .and_then(|r| r.get(0))
        .and_then(SqlValue::as_str)
        .unwrap_or_default()
        .to_string();

    let stmt = dialect.count_rows(SEGMENT_TABLE);
    let rows = conn.execute_query(&stmt.sql, &stmt.params).await?;
    let segments = rows.first().and_then(|r| r.get_i64(0)).unwrap_or(0);

    Ok((version, segments))
}

/// Connect, probe and disconnect. Failures are recorded in the result
/// instead of being returned.
pub async fn health_check(config: &DatabaseConfig) -> HealthCheckResult {
    let endpoint = format!("{}:{}/{}", config.host, config.port, config.database);
    let start = Instant::now();

    let outcome: Result<(String, i64)> = async {
        let mut conn = MysqlConnection::connect(config).await?;
        let probed = probe(&mut conn).await;
        if let Err(e) = conn.disconnect().await {
            warn!("Failed to close connection cleanly: {}", e);
        }
        probed
    }
    .await;

    let latency_ms = start.elapsed().as_millis() as u64;
    match outcome {
        Ok((version, segments)) => {
            info!("MariaDB version: {}", version);
            info!("{} contains {} rows", SEGMENT_TABLE, segments);
            HealthCheckResult {
                healthy: true,
                endpoint,
                latency_ms,
                server_version: Some(version),
                segment_rows: Some(segments),
                error: None,
            }
        }
        Err(e) => {
            warn!("Health check failed: {}", e);
            HealthCheckResult {
                healthy: false,
                endpoint,
                latency_ms,
                server_version: None,
                segment_rows: None,
                error: Some(e.to_string()),
            }
        }
    }
}
