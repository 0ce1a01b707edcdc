use crate::executor::Row;
use todo_core::{
    error::{Result, TodoError},
    models::{Task, User},
};

/// Columns selected for every user read
pub const USER_COLUMNS: &str = "id, name, email, password_hash, created_at, updated_at";

/// Columns selected for every task read
pub const TASK_COLUMNS: &str = "id, user_id, title, completed, created_at, updated_at";

/// Convert a normalized row to the User model
pub fn row_to_user(row: &Row) -> Result<User> {
    Ok(User {
        id: row.get_i64("id")?,
        name: row.get_string("name")?,
        email: row.get_string("email")?,
        password_hash: row.get_string("password_hash")?,
        created_at: row.get_timestamp("created_at")?,
        updated_at: row.get_timestamp("updated_at")?,
    })
}

/// Convert a normalized row to the Task model
pub fn row_to_task(row: &Row) -> Result<Task> {
    Ok(Task {
        id: row.get_i64("id")?,
        user_id: row.get_i64("user_id")?,
        title: row.get_string("title")?,
        completed: row.get_bool("completed")?,
        created_at: row.get_timestamp("created_at")?,
        updated_at: row.get_timestamp("updated_at")?,
    })
}

/// Convert SQLx error to TodoError
///
/// Unique violations become `DuplicateKey` so handlers can answer 409; every
/// other failure is a `Database` error.
pub fn sqlx_error_to_todo_error(err: sqlx::Error) -> TodoError {
    match &err {
        sqlx::Error::Database(db_err) => {
            let code = db_err.code().unwrap_or_default();
            let message = db_err.message();

            // SQLite 2067/1555, PostgreSQL SQLSTATE 23505
            if db_err.is_unique_violation()
                || code == "2067"
                || code == "1555"
                || code == "23505"
                || message.contains("UNIQUE constraint failed")
            {
                let key = db_err
                    .constraint()
                    .map(str::to_string)
                    .or_else(|| {
                        message
                            .strip_prefix("UNIQUE constraint failed: ")
                            .map(str::to_string)
                    })
                    .unwrap_or_else(|| "unknown".to_string());
                TodoError::DuplicateKey(key)
            } else if db_err.is_foreign_key_violation() {
                TodoError::Database(format!("Foreign key constraint error: {message}"))
            } else {
                TodoError::Database(format!("Database error: {message}"))
            }
        }
        sqlx::Error::RowNotFound => {
            // Absent rows are modelled as empty results, never as errors
            TodoError::Database("Unexpected RowNotFound error".to_string())
        }
        sqlx::Error::PoolTimedOut => TodoError::Database("Connection pool timeout".to_string()),
        sqlx::Error::Io(io_err) => TodoError::Database(format!("Database I/O error: {io_err}")),
        _ => TodoError::Database(format!("Database operation failed: {err}")),
    }
}
