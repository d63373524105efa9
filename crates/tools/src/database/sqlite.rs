use std::str::FromStr;

use async_trait::async_trait;
use base64::Engine;
use proto::{DatabaseError, StepOutcome, ToolError};
use serde_json::Value;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions, SqliteRow};
use sqlx::{Column, Row, TypeInfo, ValueRef};
use tracing::{debug, info};

use super::driver::DatabaseDriver;
use super::statement::returns_rows;

/// SQLite driver backed by a single-connection sqlx pool.
///
/// One connection keeps `sqlite::memory:` databases alive between statements.
pub struct SqliteDriver {
    pool: SqlitePool,
}

impl SqliteDriver {
    /// Opens (or creates) the database at `db_url`.
    ///
    /// Accepts `sqlite:` URLs, `:memory:` and plain file paths (`~` expanded).
    pub async fn open(db_url: &str) -> Result<Self, DatabaseError> {
        let url = connection_url(db_url).await?;
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DatabaseError::InvalidUrl(format!("{db_url}: {e}")))?;
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Sqlx(e.to_string()))?;

        info!("SQLite database opened: {url}");
        Ok(Self { pool })
    }

    /// Opens a private in-memory database.
    pub async fn in_memory() -> Result<Self, DatabaseError> {
        Self::open("sqlite::memory:").await
    }
}

async fn connection_url(db_url: &str) -> Result<String, DatabaseError> {
    let trimmed = db_url.trim();
    if trimmed.is_empty() {
        return Err(DatabaseError::InvalidUrl("empty database url".to_string()));
    }
    if trimmed == ":memory:" {
        return Ok("sqlite::memory:".to_string());
    }
    if trimmed.starts_with("sqlite:") {
        return Ok(trimmed.to_string());
    }

    let path = if trimmed.starts_with('~') {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
        trimmed.replacen('~', &home, 1)
    } else {
        trimmed.to_string()
    };

    if let Some(parent) = std::path::Path::new(&path).parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| DatabaseError::Sqlx(e.to_string()))?;
    }
    Ok(format!("sqlite:{path}?mode=rwc"))
}

fn cell_to_json(row: &SqliteRow, idx: usize) -> Value {
    let storage = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_ascii_uppercase(),
        Err(_) => return Value::Null,
    };

    let decoded = match storage.as_str() {
        "INTEGER" | "INT" | "BIGINT" | "BOOLEAN" => {
            row.try_get_unchecked::<i64, _>(idx).map(Value::from)
        }
        "REAL" | "FLOAT" | "DOUBLE" | "NUMERIC" => {
            row.try_get_unchecked::<f64, _>(idx).map(Value::from)
        }
        "BLOB" => row.try_get_unchecked::<Vec<u8>, _>(idx).map(|bytes| {
            Value::String(base64::engine::general_purpose::STANDARD.encode(bytes))
        }),
        _ => row.try_get_unchecked::<String, _>(idx).map(Value::String),
    };
    decoded.unwrap_or(Value::Null)
}

fn row_to_json(row: &SqliteRow) -> Value {
    Value::Array(
        (0..row.columns().len())
            .map(|idx| cell_to_json(row, idx))
            .collect(),
    )
}

/// Column names of the first row, used for debug logging.
fn column_names(rows: &[SqliteRow]) -> Vec<String> {
    rows.first()
        .map(|row| row.columns().iter().map(|c| c.name().to_string()).collect())
        .unwrap_or_default()
}

#[async_trait]
impl DatabaseDriver for SqliteDriver {
    async fn perform(&self, statement: &str) -> Result<StepOutcome, ToolError> {
        if self.pool.is_closed() {
            return Err(ToolError::ExecutionFailed(
                "database connection is closed".to_string(),
            ));
        }

        let outcome = if returns_rows(statement) {
            match sqlx::query(statement).fetch_all(&self.pool).await {
                Ok(rows) => {
                    debug!(
                        columns = ?column_names(&rows),
                        rows = rows.len(),
                        "Query returned rows"
                    );
                    StepOutcome::ok(Value::Array(rows.iter().map(row_to_json).collect()))
                }
                Err(e) => StepOutcome::error(e.to_string()),
            }
        } else {
            match sqlx::query(statement).execute(&self.pool).await {
                Ok(done) => {
                    StepOutcome::ok(format!("{} row(s) affected", done.rows_affected()))
                }
                Err(e) => StepOutcome::error(e.to_string()),
            }
        };
        Ok(outcome)
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}
