//! Database crate for the task manager
//!
//! This crate provides the relational implementation of the repository
//! traits from `todo-core`. The same repository code runs against either an
//! embedded SQLite file or a networked PostgreSQL server; everything
//! backend-specific lives behind the [`SqlExecutor`] trait.
//!
//! # Features
//!
//! - `?` placeholders everywhere, translated to `$n` for PostgreSQL
//! - Lazily created connection pools, one per process
//! - Normalized result rows (booleans, integers and timestamps)
//! - Idempotent schema bootstrap with an optional demo seed
//!
//! # Usage
//!
//! ```rust
//! use database::{connect, PoolSettings, SqlTodoRepository};
//! use todo_core::repository::StoreHealth;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // No DATABASE_URL: embedded store (in-memory for this example)
//!     let executor = connect(None, ":memory:", PoolSettings::default())?;
//!     let repo = SqlTodoRepository::new(executor);
//!
//!     repo.bootstrap(None).await?;
//!     repo.health_check().await?;
//!     Ok(())
//! }
//! ```

mod common;
mod executor;
pub mod placeholders;
mod postgres;
mod repository;
mod sqlite;

pub use common::sqlx_error_to_todo_error;
pub use executor::{returns_rows, Backend, PoolSettings, QueryResult, Row, SqlExecutor, SqlValue};
pub use postgres::PostgresExecutor;
pub use repository::{DemoSeed, SqlTodoRepository};
pub use sqlite::SqliteExecutor;

use std::sync::Arc;
use todo_core::error::{Result, TodoError};

/// Pick the backend for this process
///
/// A configured connection string selects PostgreSQL (`postgres://` or
/// `postgresql://`) or an explicit SQLite file (`sqlite:`); without one the
/// embedded store at `sqlite_path` is used. No connection is opened here.
///
/// # Returns
/// * `Ok(executor)` - A lazily connecting executor
/// * `Err(TodoError::Configuration)` - If the URL scheme is not supported
pub fn connect(
    database_url: Option<&str>,
    sqlite_path: &str,
    settings: PoolSettings,
) -> Result<Arc<dyn SqlExecutor>> {
    match database_url.map(str::trim).filter(|url| !url.is_empty()) {
        Some(url) if url.starts_with("postgres://") || url.starts_with("postgresql://") => {
            tracing::info!(backend = %Backend::Postgres, "Using networked store");
            Ok(Arc::new(PostgresExecutor::new(url, settings)))
        }
        Some(url) if url.starts_with("sqlite:") => {
            tracing::info!(backend = %Backend::Sqlite, "Using embedded store from DATABASE_URL");
            Ok(Arc::new(SqliteExecutor::new(url, settings)?))
        }
        Some(url) => {
            let scheme = url.split(':').next().unwrap_or_default();
            Err(TodoError::Configuration(format!(
                "Unsupported database URL scheme '{scheme}'"
            )))
        }
        None => {
            tracing::info!(backend = %Backend::Sqlite, path = %sqlite_path, "Using embedded store");
            Ok(Arc::new(SqliteExecutor::new(sqlite_path, settings)?))
        }
    }
}

// Re-export commonly used types from todo-core for convenience
pub use todo_core::{
    models::{NewTask, NewUser, StoreStats, Task, UpdateTask, User},
    repository::{StoreHealth, TaskRepository, TodoRepository, UserRepository},
};
