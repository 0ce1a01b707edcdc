use crate::common::sqlx_error_to_todo_error;
use crate::executor::{returns_rows, Backend, PoolSettings, QueryResult, Row, SqlExecutor, SqlValue};
use crate::placeholders;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use sqlx::postgres::{PgArguments, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Column, Decode, PgPool, Postgres, Row as _, Type, TypeInfo, ValueRef};
use todo_core::error::{Result, TodoError};
use tokio::sync::OnceCell;

const SCHEMA: &str = include_str!("../schema/postgres.sql");

/// PostgreSQL implementation of the SqlExecutor trait
///
/// Statements arrive with `?` placeholders and are rewritten to `$n` before
/// they reach the server.
#[derive(Debug)]
pub struct PostgresExecutor {
    url: String,
    settings: PoolSettings,
    pool: OnceCell<PgPool>,
}

impl PostgresExecutor {
    /// Create an executor for a `postgres://` or `postgresql://` URL
    ///
    /// No connection is attempted until the first statement runs.
    pub fn new(url: &str, settings: PoolSettings) -> Self {
        Self {
            url: url.to_string(),
            settings,
            pool: OnceCell::new(),
        }
    }

    /// Get the pool, connecting on first use
    pub async fn pool(&self) -> Result<&PgPool> {
        self.pool
            .get_or_try_init(|| async {
                let pool = PgPoolOptions::new()
                    .max_connections(self.settings.max_connections)
                    .acquire_timeout(self.settings.acquire_timeout)
                    .connect(&self.url)
                    .await
                    .map_err(sqlx_error_to_todo_error)?;

                tracing::info!(
                    max_connections = self.settings.max_connections,
                    "PostgreSQL pool opened"
                );
                Ok::<_, TodoError>(pool)
            })
            .await
    }
}

fn bind_params<'q>(
    mut query: Query<'q, Postgres, PgArguments>,
    params: &'q [SqlValue],
) -> Query<'q, Postgres, PgArguments> {
    for param in params {
        query = match param {
            SqlValue::Null => query.bind(None::<String>),
            SqlValue::Integer(v) => query.bind(*v),
            SqlValue::Real(v) => query.bind(*v),
            SqlValue::Text(v) => query.bind(v.as_str()),
            SqlValue::Bool(v) => query.bind(*v),
            SqlValue::Timestamp(v) => query.bind(*v),
        };
    }
    query
}

fn cell<'r, T>(row: &'r PgRow, index: usize) -> Result<T>
where
    T: Decode<'r, Postgres> + Type<Postgres>,
{
    row.try_get(index).map_err(sqlx_error_to_todo_error)
}

/// Decode by the column's declared type
fn decode_row(row: &PgRow) -> Result<Row> {
    let mut cells = Vec::with_capacity(row.len());

    for (index, column) in row.columns().iter().enumerate() {
        let raw = row.try_get_raw(index).map_err(sqlx_error_to_todo_error)?;
        let value = if raw.is_null() {
            SqlValue::Null
        } else {
            match raw.type_info().name() {
                "INT2" => SqlValue::Integer(cell::<i16>(row, index)?.into()),
                "INT4" => SqlValue::Integer(cell::<i32>(row, index)?.into()),
                "INT8" => SqlValue::Integer(cell(row, index)?),
                "BOOL" => SqlValue::Bool(cell(row, index)?),
                "FLOAT4" => SqlValue::Real(cell::<f32>(row, index)?.into()),
                "FLOAT8" => SqlValue::Real(cell(row, index)?),
                "TIMESTAMPTZ" => SqlValue::Timestamp(cell::<DateTime<Utc>>(row, index)?),
                "TIMESTAMP" => SqlValue::Timestamp(cell::<NaiveDateTime>(row, index)?.and_utc()),
                "TEXT" | "VARCHAR" | "BPCHAR" | "NAME" => SqlValue::Text(cell(row, index)?),
                other => {
                    return Err(TodoError::Database(format!(
                        "Unsupported column type {other} for '{}'",
                        column.name()
                    )))
                }
            }
        };
        cells.push((column.name().to_string(), value));
    }

    Ok(Row::new(cells))
}

#[async_trait]
impl SqlExecutor for PostgresExecutor {
    fn backend(&self) -> Backend {
        Backend::Postgres
    }

    fn supports_returning(&self) -> bool {
        true
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
        let numbered = placeholders::to_numbered(sql);
        tracing::debug!(backend = "postgres", sql = %numbered, "Executing statement");

        let query = bind_params(sqlx::query(&numbered), params);

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
                last_insert_id: None,
            })
        }
    }

    async fn bootstrap(&self) -> Result<()> {
        let pool = self.pool().await?;
        sqlx::raw_sql(SCHEMA)
            .execute(pool)
            .await
            .map_err(|e| TodoError::Database(format!("Schema bootstrap failed: {e}")))?;

        tracing::info!("PostgreSQL schema is up to date");
        Ok(())
    }

    async fn close(&self) {
        if let Some(pool) = self.pool.get() {
            pool.close().await;
        }
    }
}
