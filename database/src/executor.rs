//! Backend-independent statement execution.
//!
//! Every backend accepts statements written with `?` placeholders and hands
//! back a [`QueryResult`] whose cells have already been normalized into
//! [`SqlValue`]s, so repository code never sees driver-specific types.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use std::fmt;
use std::time::Duration;
use todo_core::error::{Result, TodoError};

/// The two interchangeable relational backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    /// Embedded, file-backed SQLite
    Sqlite,
    /// Networked PostgreSQL
    Postgres,
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Backend::Sqlite => write!(f, "sqlite"),
            Backend::Postgres => write!(f, "postgres"),
        }
    }
}

/// Connection pool sizing shared by both backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
        }
    }
}

/// A bound parameter or a decoded result cell
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Bool(bool),
    Timestamp(DateTime<Utc>),
}

impl From<i64> for SqlValue {
    fn from(value: i64) -> Self {
        SqlValue::Integer(value)
    }
}

impl From<i32> for SqlValue {
    fn from(value: i32) -> Self {
        SqlValue::Integer(value.into())
    }
}

impl From<bool> for SqlValue {
    fn from(value: bool) -> Self {
        SqlValue::Bool(value)
    }
}

impl From<&str> for SqlValue {
    fn from(value: &str) -> Self {
        SqlValue::Text(value.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(value: String) -> Self {
        SqlValue::Text(value)
    }
}

impl From<DateTime<Utc>> for SqlValue {
    fn from(value: DateTime<Utc>) -> Self {
        SqlValue::Timestamp(value)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// One result row, columns in select order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new(cells: Vec<(String, SqlValue)>) -> Self {
        Self { cells }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Raw cell lookup by column name
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.cells
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    fn require(&self, column: &str) -> Result<&SqlValue> {
        self.get(column)
            .ok_or_else(|| TodoError::Database(format!("Column '{column}' missing from row")))
    }

    fn unexpected(column: &str, expected: &str, value: &SqlValue) -> TodoError {
        TodoError::Database(format!(
            "Column '{column}' expected {expected}, found {value:?}"
        ))
    }

    pub fn get_i64(&self, column: &str) -> Result<i64> {
        match self.require(column)? {
            SqlValue::Integer(v) => Ok(*v),
            SqlValue::Text(s) => s
                .parse()
                .map_err(|_| Self::unexpected(column, "integer", &SqlValue::Text(s.clone()))),
            other => Err(Self::unexpected(column, "integer", other)),
        }
    }

    pub fn get_string(&self, column: &str) -> Result<String> {
        match self.require(column)? {
            SqlValue::Text(s) => Ok(s.clone()),
            other => Err(Self::unexpected(column, "text", other)),
        }
    }

    /// Boolean with coercion of the integer (0/1) and text encodings
    pub fn get_bool(&self, column: &str) -> Result<bool> {
        match self.require(column)? {
            SqlValue::Bool(b) => Ok(*b),
            SqlValue::Integer(0) => Ok(false),
            SqlValue::Integer(1) => Ok(true),
            SqlValue::Text(s) => match s.as_str() {
                "0" | "f" | "false" => Ok(false),
                "1" | "t" | "true" => Ok(true),
                _ => Err(Self::unexpected(column, "boolean", &SqlValue::Text(s.clone()))),
            },
            other => Err(Self::unexpected(column, "boolean", other)),
        }
    }

    /// UTC timestamp from a native timestamp or its text encoding
    pub fn get_timestamp(&self, column: &str) -> Result<DateTime<Utc>> {
        match self.require(column)? {
            SqlValue::Timestamp(ts) => Ok(*ts),
            SqlValue::Text(s) => parse_timestamp(s)
                .ok_or_else(|| Self::unexpected(column, "timestamp", &SqlValue::Text(s.clone()))),
            other => Err(Self::unexpected(column, "timestamp", other)),
        }
    }
}

fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    // SQLite's CURRENT_TIMESTAMP format, always UTC
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Normalized outcome of a single statement
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryResult {
    /// Returned rows; empty for statements without a result set
    pub rows: Vec<Row>,
    /// Rows returned, or rows affected for statements without a result set
    pub row_count: u64,
    /// Generated key of the last inserted row, where the backend reports one
    pub last_insert_id: Option<i64>,
}

impl QueryResult {
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let row_count = rows.len() as u64;
        Self {
            rows,
            row_count,
            last_insert_id: None,
        }
    }

    pub fn into_first_row(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

/// Statement executor over one relational backend.
///
/// Implementations create their connection pool lazily on first use, at most
/// once per executor, and never retry a failed statement.
#[async_trait]
pub trait SqlExecutor: Send + Sync + fmt::Debug {
    /// Which backend this executor talks to
    fn backend(&self) -> Backend;

    /// Whether `INSERT`/`UPDATE … RETURNING` hands back the written row
    fn supports_returning(&self) -> bool;

    /// Execute one statement written with `?` placeholders
    ///
    /// # Returns
    /// * `Ok(QueryResult)` - Rows (possibly none) and a count
    /// * `Err(TodoError::DuplicateKey)` - On unique constraint violation
    /// * `Err(TodoError::Database)` - On connection or statement failure
    async fn execute(&self, sql: &str, params: &[SqlValue]) -> Result<QueryResult>;

    /// Create the schema if it does not exist; safe to run on every start
    async fn bootstrap(&self) -> Result<()>;

    /// Close the pool if it was ever opened
    async fn close(&self);
}

/// Whether a statement produces a result set
pub fn returns_rows(sql: &str) -> bool {
    let upper = sql.trim_start().to_ascii_uppercase();
    upper.starts_with("SELECT")
        || upper.starts_with("WITH")
        || upper.starts_with("PRAGMA")
        || upper.contains(" RETURNING ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row() -> Row {
        Row::new(vec![
            ("id".to_string(), SqlValue::Integer(7)),
            ("title".to_string(), SqlValue::Text("Write spec".to_string())),
            ("completed".to_string(), SqlValue::Integer(1)),
            ("flag".to_string(), SqlValue::Bool(false)),
            (
                "created_at".to_string(),
                SqlValue::Text("2024-05-01T10:00:00.123456+00:00".to_string()),
            ),
            (
                "legacy_at".to_string(),
                SqlValue::Text("2024-05-01 10:00:00".to_string()),
            ),
            ("missing".to_string(), SqlValue::Null),
        ])
    }

    #[test]
    fn test_typed_getters() {
        let row = row();
        assert_eq!(row.get_i64("id").unwrap(), 7);
        assert_eq!(row.get_string("title").unwrap(), "Write spec");
        assert!(row.get_bool("completed").unwrap());
        assert!(!row.get_bool("flag").unwrap());
        assert_eq!(row.len(), 7);
    }

    #[test]
    fn test_timestamp_parsing() {
        let row = row();
        let created = row.get_timestamp("created_at").unwrap();
        assert_eq!(created.timestamp_subsec_micros(), 123456);

        let legacy = row.get_timestamp("legacy_at").unwrap();
        assert_eq!(legacy.to_rfc3339(), "2024-05-01T10:00:00+00:00");
    }

    #[test]
    fn test_getter_errors() {
        let row = row();
        assert!(row.get_i64("nope").unwrap_err().is_database());
        assert!(row.get_bool("missing").is_err());
        assert!(row.get_i64("title").is_err());
        assert!(row.get_bool("id").is_err());
    }

    #[test]
    fn test_returns_rows() {
        assert!(returns_rows("  select 1"));
        assert!(returns_rows("INSERT INTO t (a) VALUES (?) RETURNING id"));
        assert!(returns_rows("WITH x AS (SELECT 1) SELECT * FROM x"));
        assert!(!returns_rows("INSERT INTO t (a) VALUES (?)"));
        assert!(!returns_rows("DELETE FROM tasks WHERE id = ?"));
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(SqlValue::from(3_i32), SqlValue::Integer(3));
        assert_eq!(SqlValue::from("a"), SqlValue::Text("a".to_string()));
        assert_eq!(SqlValue::from(None::<i64>), SqlValue::Null);
        assert_eq!(SqlValue::from(Some(true)), SqlValue::Bool(true));
    }

    #[test]
    fn test_query_result_from_rows() {
        let result = QueryResult::from_rows(vec![row(), row()]);
        assert_eq!(result.row_count, 2);
        assert!(result.into_first_row().is_some());
        assert!(QueryResult::default().into_first_row().is_none());
    }
}
