use crate::common::sqlx_error_to_todo_error;
use crate::executor::{returns_rows, Backend, PoolSettings, QueryResult, Row, SqlExecutor, SqlValue};
use crate::placeholders;
use async_trait::async_trait;
use chrono::SecondsFormat;
use sqlx::query::Query;
use sqlx::sqlite::{
    SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow,
};
use sqlx::{Column, Row as _, Sqlite, SqlitePool, TypeInfo, ValueRef};
use std::str::FromStr;
use std::time::Duration;
use todo_core::error::{Result, TodoError};
use tokio::sync::OnceCell;

/// Schema applied on every start; every statement is `IF NOT EXISTS`
const SCHEMA: &str = include_str!("../schema/sqlite.sql");

/// SQLite implementation of the SqlExecutor trait
///
/// The pool is opened on the first statement, not at construction, so an
/// executor can be built before the database file or its directory exists.
#[derive(Debug)]
pub struct SqliteExecutor {
    options: SqliteConnectOptions,
    settings: PoolSettings,
    location: String,
    in_memory: bool,
    pool: OnceCell<SqlitePool>,
}

impl SqliteExecutor {
    /// Create a new SQLite executor for the given path or URL
    ///
    /// # Arguments
    /// * `database` - File path, `sqlite://` URL or `:memory:`
    ///
    /// # Examples
    /// ```rust,no_run
    /// use database::{PoolSettings, SqliteExecutor};
    ///
    /// // In-memory database for testing
    /// let executor = SqliteExecutor::new(":memory:", PoolSettings::default()).unwrap();
    ///
    /// // File-based database
    /// let executor = SqliteExecutor::new("data/todo.sqlite", PoolSettings::default()).unwrap();
    /// ```
    pub fn new(database: &str, settings: PoolSettings) -> Result<Self> {
        let path = database
            .strip_prefix("sqlite://")
            .or_else(|| database.strip_prefix("sqlite:"))
            .unwrap_or(database);

        let in_memory = path.is_empty() || path.starts_with(":memory:");

        let base = if in_memory {
            // Private in-memory database owned by this executor
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(sqlx_error_to_todo_error)?
                .journal_mode(SqliteJournalMode::Memory)
        } else {
            SqliteConnectOptions::new()
                .filename(path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
        };
        let options = base
            .busy_timeout(Duration::from_secs(5))
            .foreign_keys(true);

        Ok(Self {
            options,
            settings,
            location: if in_memory { ":memory:".to_string() } else { path.to_string() },
            in_memory,
            pool: OnceCell::new(),
        })
    }

    /// Get the pool, opening it on first use
    pub async fn pool(&self) -> Result<&SqlitePool> {
        self.pool
            .get_or_try_init(|| async {
                // An in-memory database lives only as long as a connection
                // holds it open, so pin exactly one connection.
                let pool_options = if self.in_memory {
                    SqlitePoolOptions::new()
                        .max_connections(1)
                        .min_connections(1)
                        .idle_timeout(None)
                        .max_lifetime(None)
                } else {
                    SqlitePoolOptions::new().max_connections(self.settings.max_connections)
                };

                let pool = pool_options
                    .acquire_timeout(self.settings.acquire_timeout)
                    .connect_with(self.options.clone())
                    .await
                    .map_err(sqlx_error_to_todo_error)?;

                tracing::info!(
                    location = %self.location,
                    in_memory = self.in_memory,
                    "SQLite pool opened"
                );
                Ok::<_, TodoError>(pool)
            })
            .await
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlValue],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Bool(v) => query.bind(*v),
            // Fixed-width text keeps lexical order equal to time order
            SqlValue::Timestamp(v) => query.bind(v.to_rfc3339_opts(SecondsFormat::Micros, true)),
        };
    }
    query
}

/// Decode by the value's runtime storage class; declared column types in
/// SQLite are advisory only.
fn decode_row(row: &SqliteRow) -> Result<Row> {
    let mut cells = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index).map_err(sqlx_error_to_todo_error)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INTEGER" | "BOOLEAN" => {
                    SqlValue::Integer(row.try_get(index).map_err(sqlx_error_to_todo_error)?)
                }
                "REAL" => SqlValue::Real(row.try_get(index).map_err(sqlx_error_to_todo_error)?),
                "BLOB" => {
                    let bytes: Vec<u8> = row.try_get(index).map_err(sqlx_error_to_todo_error)?;
                    SqlValue::Text(String::from_utf8_lossy(&bytes).into_owned())
                }
                _ => SqlValue::Text(row.try_get(index).map_err(sqlx_error_to_todo_error)?),
            }
        };
        cells.push((column.name().to_string(), value));
    }

    Ok(Row::new(cells))
}

#[async_trait]
impl SqlExecutor for SqliteExecutor {
    fn backend(&self) -> Backend {
        Backend::Sqlite
    }

    fn supports_returning(&self) -> bool {
        false
    }

    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult> {
        let expected = placeholders::count(sql);
        if expected != params.len() {
            return Err(TodoError::Database(format!(
                "Statement expects {expected} parameters, got {}",
                params.len()
            )));
        }

        let pool = self.pool().await?;
        tracing::debug!(backend = "sqlite", sql = %sql, "Executing statement");

        let query = bind_params(sqlx::query(sql), params);

        if returns_rows(sql) {
            let rows = query
                .fetch_all(pool)
                .await
                .map_err(sqlx_error_to_todo_error)?;
            let rows = rows.iter().map(decode_row).collect::<Result<Vec<_>>>()?;
            Ok(QueryResult::from_rows(rows))
        } else {
            let done = query.execute(pool).await.map_err(sqlx_error_to_todo_error)?;
            Ok(QueryResult {
                rows: Vec::new(),
                row_count: done.rows_affected(),
                last_insert_id: Some(done.last_insert_rowid()).filter(|id| *id > 0),
            })
        }
    }

    async fn bootstrap(&self) -> Result<()> {
        let pool = self.pool().await?;
        sqlx::raw_sql(SCHEMA)
            .execute(pool)
            .await
            .map_err(|e| TodoError::Database(format!("Schema bootstrap failed: {e}")))?;

        tracing::info!("SQLite schema is up to date");
        Ok(())
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }
}
