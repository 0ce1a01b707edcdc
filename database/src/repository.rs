use crate::common::{row_to_task, row_to_user, TASK_COLUMNS, USER_COLUMNS};
use crate::executor::{Backend, Row, SqlExecutor, SqlValue};
use async_trait::async_trait;
use std::sync::Arc;
use todo_core::{
    error::{Result, TodoError},
    models::{timestamp_now, NewTask, NewUser, StoreStats, Task, UpdateTask, User},
    repository::{StoreHealth, TaskRepository, UserRepository},
};

/// Starter data for an empty embedded store
#[derive(Debug, Clone)]
pub struct DemoSeed {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    /// `(title, completed)` pairs, inserted oldest first
    pub tasks: Vec<(String, bool)>,
}

impl DemoSeed {
    /// Demo account login used by the seed
    pub const EMAIL: &'static str = "demo@example.com";

    /// The standard demo account with three starter tasks
    pub fn standard(password_hash: impl Into<String>) -> Self {
        Self {
            name: "Demo User".to_string(),
            email: Self::EMAIL.to_string(),
            password_hash: password_hash.into(),
            tasks: vec![
                ("Explore the task list".to_string(), true),
                ("Create your first task".to_string(), false),
                ("Mark a task as complete".to_string(), false),
            ],
        }
    }
}

/// How to re-select a row that a write could not return itself
enum ReadBack {
    /// Freshly inserted row: by generated id when the backend reports one,
    /// otherwise by the given natural-key clause
    Inserted {
        natural_key: &'static str,
        params: Vec<SqlValue>,
    },
    /// Existing row addressed by a key clause
    Existing {
        key: &'static str,
        params: Vec<SqlValue>,
    },
}

/// Relational implementation of the repository traits
///
/// Runs unchanged on either backend; the only backend-dependent step is how a
/// written row gets back to the caller, handled in [`Self::write_and_fetch`].
#[derive(Debug, Clone)]
pub struct SqlTodoRepository {
    executor: Arc<dyn SqlExecutor>,
}

impl SqlTodoRepository {
    pub fn new(executor: Arc<dyn SqlExecutor>) -> Self {
        Self { executor }
    }

    pub fn backend(&self) -> Backend {
        self.executor.backend()
    }

    /// Create the schema and, for an empty embedded store, apply the seed
    ///
    /// Safe to run on every start: existing rows are never touched.
    pub async fn bootstrap(&self, seed: Option<&DemoSeed>) -> Result<()> {
        self.executor.bootstrap().await?;

        if let Some(seed) = seed {
            if self.backend() != Backend::Sqlite {
                tracing::debug!(backend = %self.backend(), "Demo seed applies to the embedded store only");
            } else if self.stats().await?.users == 0 {
                self.apply_seed(seed).await?;
            }
        }

        let stats = self.stats().await?;
        tracing::info!(
            backend = %self.backend(),
            users = stats.users,
            tasks = stats.tasks,
            completed = stats.completed_tasks,
            "Store bootstrapped"
        );
        Ok(())
    }

    async fn apply_seed(&self, seed: &DemoSeed) -> Result<()> {
        let user = self
            .create_user(NewUser {
                name: seed.name.clone(),
                email: seed.email.clone(),
                password_hash: seed.password_hash.clone(),
            })
            .await?;

        for (title, completed) in &seed.tasks {
            let task = self.create_task(NewTask::new(user.id, title.clone())).await?;
            if *completed {
                self.update_task(user.id, task.id, UpdateTask::new().completed(true))
                    .await?;
            }
        }

        tracing::info!(email = %seed.email, tasks = seed.tasks.len(), "Demo data seeded");
        Ok(())
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        self.executor.close().await;
    }

    /// Run a single-row write and return the row as stored
    ///
    /// Backends with `RETURNING` get it appended; the others are followed by
    /// a read-back select. The two statements are not atomic.
    async fn write_and_fetch(
        &self,
        table: &'static str,
        columns: &'static str,
        sql: &str,
        params: Vec<SqlValue>,
        read_back: ReadBack,
    ) -> Result<Option<Row>> {
        if self.executor.supports_returning() {
            let sql = format!("{sql} RETURNING {columns}");
            let result = self.executor.execute(&sql, &params).await?;
            return Ok(result.into_first_row());
        }

        let written = self.executor.execute(sql, &params).await?;
        if written.row_count == 0 {
            return Ok(None);
        }

        let result = match read_back {
            ReadBack::Inserted { natural_key, params } => match written.last_insert_id {
                Some(id) => {
                    let sql = format!("SELECT {columns} FROM {table} WHERE id = ?");
                    self.executor.execute(&sql, &[id.into()]).await?
                }
                None => {
                    let sql = format!("SELECT {columns} FROM {table} WHERE {natural_key}");
                    self.executor.execute(&sql, &params).await?
                }
            },
            ReadBack::Existing { key, params } => {
                let sql = format!("SELECT {columns} FROM {table} WHERE {key}");
                self.executor.execute(&sql, &params).await?
            }
        };

        Ok(result.into_first_row())
    }

    async fn count(&self, sql: &str, params: &[SqlValue]) -> Result<u64> {
        let row = self
            .executor
            .execute(sql, params)
            .await?
            .into_first_row()
            .ok_or_else(|| TodoError::Database("Count query returned no rows".to_string()))?;
        let count = row.get_i64("count")?;
        u64::try_from(count)
            .map_err(|_| TodoError::Database(format!("Negative row count {count}")))
    }
}

#[async_trait]
impl UserRepository for SqlTodoRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        let now = timestamp_now();
        let row = self
            .write_and_fetch(
                "users",
                USER_COLUMNS,
                "INSERT INTO users (name, email, password_hash, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
                vec![
                    user.name.into(),
                    user.email.clone().into(),
                    user.password_hash.into(),
                    now.into(),
                    now.into(),
                ],
                ReadBack::Inserted {
                    natural_key: "email = ?",
                    params: vec![user.email.into()],
                },
            )
            .await?
            .ok_or_else(|| TodoError::Database("Inserted user could not be read back".to_string()))?;

        let user = row_to_user(&row)?;
        tracing::debug!(user_id = user.id, "User created");
        Ok(user)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        self.executor
            .execute(&sql, &[id.into()])
            .await?
            .into_first_row()
            .map(|row| row_to_user(&row))
            .transpose()
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = ?");
        self.executor
            .execute(&sql, &[email.into()])
            .await?
            .into_first_row()
            .map(|row| row_to_user(&row))
            .transpose()
    }
}

#[async_trait]
impl TaskRepository for SqlTodoRepository {
    async fn create_task(&self, task: NewTask) -> Result<Task> {
        let now = timestamp_now();
        let row = self
            .write_and_fetch(
                "tasks",
                TASK_COLUMNS,
                "INSERT INTO tasks (user_id, title, completed, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
                vec![
                    task.user_id.into(),
                    task.title.clone().into(),
                    false.into(),
                    now.into(),
                    now.into(),
                ],
                ReadBack::Inserted {
                    natural_key: "user_id = ? AND title = ? ORDER BY id DESC LIMIT 1",
                    params: vec![task.user_id.into(), task.title.into()],
                },
            )
            .await?
            .ok_or_else(|| TodoError::Database("Inserted task could not be read back".to_string()))?;

        let task = row_to_task(&row)?;
        tracing::debug!(task_id = task.id, user_id = task.user_id, "Task created");
        Ok(task)
    }

    async fn list_tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        let sql = format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE user_id = ? ORDER BY created_at DESC, id DESC"
        );
        self.executor
            .execute(&sql, &[user_id.into()])
            .await?
            .rows
            .iter()
            .map(row_to_task)
            .collect()
    }

    async fn get_task(&self, user_id: i64, task_id: i64) -> Result<Option<Task>> {
        let sql = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND user_id = ?");
        self.executor
            .execute(&sql, &[task_id.into(), user_id.into()])
            .await?
            .into_first_row()
            .map(|row| row_to_task(&row))
            .transpose()
    }

    async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        updates: UpdateTask,
    ) -> Result<Option<Task>> {
        let Some(current) = self.get_task(user_id, task_id).await? else {
            return Ok(None);
        };
        let next = updates.apply_to(&current);

        let row = self
            .write_and_fetch(
                "tasks",
                TASK_COLUMNS,
                "UPDATE tasks SET title = ?, completed = ?, updated_at = ? WHERE id = ? AND user_id = ?",
                vec![
                    next.title.into(),
                    next.completed.into(),
                    next.updated_at.into(),
                    task_id.into(),
                    user_id.into(),
                ],
                ReadBack::Existing {
                    key: "id = ? AND user_id = ?",
                    params: vec![task_id.into(), user_id.into()],
                },
            )
            .await?;

        row.map(|row| row_to_task(&row)).transpose()
    }

    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<bool> {
        let result = self
            .executor
            .execute(
                "DELETE FROM tasks WHERE id = ? AND user_id = ?",
                &[task_id.into(), user_id.into()],
            )
            .await?;
        Ok(result.row_count > 0)
    }
}

#[async_trait]
impl StoreHealth for SqlTodoRepository {
    async fn health_check(&self) -> Result<()> {
        self.executor.execute("SELECT 1", &[]).await?;
        Ok(())
    }

    async fn stats(&self) -> Result<StoreStats> {
        Ok(StoreStats {
            users: self.count("SELECT COUNT(*) AS count FROM users", &[]).await?,
            tasks: self.count("SELECT COUNT(*) AS count FROM tasks", &[]).await?,
            completed_tasks: self
                .count(
                    "SELECT COUNT(*) AS count FROM tasks WHERE completed = ?",
                    &[true.into()],
                )
                .await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::{PoolSettings, QueryResult};
    use crate::SqliteExecutor;
    use parking_lot::Mutex;

    async fn repository() -> SqlTodoRepository {
        let executor = SqliteExecutor::new(":memory:", PoolSettings::default()).unwrap();
        let repo = SqlTodoRepository::new(Arc::new(executor));
        repo.bootstrap(None).await.unwrap();
        repo
    }

    fn new_user(email: &str) -> NewUser {
        NewUser {
            name: "Ann".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$digest".to_string(),
        }
    }

    /// Records statements and answers them from a script
    #[derive(Debug, Default)]
    struct ScriptedExecutor {
        returning: bool,
        statements: Mutex<Vec<String>>,
        replies: Mutex<Vec<QueryResult>>,
    }

    #[async_trait]
    impl SqlExecutor for ScriptedExecutor {
        fn backend(&self) -> Backend {
            if self.returning {
                Backend::Postgres
            } else {
                Backend::Sqlite
            }
        }

        fn supports_returning(&self) -> bool {
            self.returning
        }

        async fn execute(&self, sql: &str, _params: &[SqlValue]) -> Result<QueryResult> {
            self.statements.lock().push(sql.to_string());
            let mut replies = self.replies.lock();
            Ok(if replies.is_empty() {
                QueryResult::default()
            } else {
                replies.remove(0)
            })
        }

        async fn bootstrap(&self) -> Result<()> {
            Ok(())
        }

        async fn close(&self) {}
    }

    fn user_row(id: i64) -> Row {
        let now = timestamp_now();
        Row::new(vec![
            ("id".to_string(), SqlValue::Integer(id)),
            ("name".to_string(), SqlValue::Text("Ann".to_string())),
            ("email".to_string(), SqlValue::Text("ann@x.com".to_string())),
            ("password_hash".to_string(), SqlValue::Text("d".to_string())),
            ("created_at".to_string(), SqlValue::Timestamp(now)),
            ("updated_at".to_string(), SqlValue::Timestamp(now)),
        ])
    }

    #[tokio::test]
    async fn test_returning_backend_skips_read_back() {
        let executor = Arc::new(ScriptedExecutor {
            returning: true,
            replies: Mutex::new(vec![QueryResult::from_rows(vec![user_row(9)])]),
            ..Default::default()
        });
        let repo = SqlTodoRepository::new(executor.clone());

        let user = repo.create_user(new_user("ann@x.com")).await.unwrap();
        assert_eq!(user.id, 9);

        let statements = executor.statements.lock();
        assert_eq!(statements.len(), 1);
        assert!(statements[0].ends_with(&format!("RETURNING {USER_COLUMNS}")));
    }

    #[tokio::test]
    async fn test_read_back_falls_back_to_natural_key() {
        let executor = Arc::new(ScriptedExecutor {
            returning: false,
            replies: Mutex::new(vec![
                QueryResult {
                    rows: Vec::new(),
                    row_count: 1,
                    last_insert_id: None,
                },
                QueryResult::from_rows(vec![user_row(3)]),
            ]),
            ..Default::default()
        });
        let repo = SqlTodoRepository::new(executor.clone());

        let user = repo.create_user(new_user("ann@x.com")).await.unwrap();
        assert_eq!(user.id, 3);

        let statements = executor.statements.lock();
        assert_eq!(statements.len(), 2);
        assert!(statements[1].ends_with("WHERE email = ?"));
    }

    #[tokio::test]
    async fn test_create_and_read_back_user() {
        let repo = repository().await;
        let user = repo.create_user(new_user("ann@x.com")).await.unwrap();
        assert_eq!(user.id, 1);
        assert_eq!(user.created_at, user.updated_at);

        let found = repo.get_user_by_email("ann@x.com").await.unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(repo.get_user_by_id(1).await.unwrap(), Some(user));
        assert!(repo.get_user_by_id(2).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_email_is_rejected_by_store() {
        let repo = repository().await;
        repo.create_user(new_user("ann@x.com")).await.unwrap();
        let err = repo.create_user(new_user("ann@x.com")).await.unwrap_err();
        assert!(err.is_conflict(), "got {err:?}");
        assert_eq!(repo.stats().await.unwrap().users, 1);
    }

    #[tokio::test]
    async fn test_tasks_listed_newest_first() {
        let repo = repository().await;
        let user = repo.create_user(new_user("ann@x.com")).await.unwrap();

        let first = repo.create_task(NewTask::new(user.id, "First")).await.unwrap();
        let second = repo.create_task(NewTask::new(user.id, "Second")).await.unwrap();
        assert!(!first.completed);

        let ids: Vec<i64> = repo
            .list_tasks(user.id)
            .await
            .unwrap()
            .iter()
            .map(|t| t.id)
            .collect();
        assert_eq!(ids, vec![second.id, first.id]);
    }

    #[tokio::test]
    async fn test_update_keeps_unspecified_fields() {
        let repo = repository().await;
        let user = repo.create_user(new_user("ann@x.com")).await.unwrap();
        let task = repo.create_task(NewTask::new(user.id, "Buy milk")).await.unwrap();

        let updated = repo
            .update_task(user.id, task.id, UpdateTask::new().completed(true))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.title, "Buy milk");
        assert!(updated.completed);
        assert!(updated.updated_at > task.updated_at);
        assert_eq!(updated.created_at, task.created_at);
    }

    #[tokio::test]
    async fn test_task_operations_are_owner_scoped() {
        let repo = repository().await;
        let ann = repo.create_user(new_user("ann@x.com")).await.unwrap();
        let bob = repo.create_user(new_user("bob@x.com")).await.unwrap();
        let task = repo.create_task(NewTask::new(ann.id, "Private")).await.unwrap();

        assert!(repo.get_task(bob.id, task.id).await.unwrap().is_none());
        assert!(repo
            .update_task(bob.id, task.id, UpdateTask::new().title("Hijacked"))
            .await
            .unwrap()
            .is_none());
        assert!(!repo.delete_task(bob.id, task.id).await.unwrap());

        let intact = repo.get_task(ann.id, task.id).await.unwrap().unwrap();
        assert_eq!(intact.title, "Private");

        assert!(repo.delete_task(ann.id, task.id).await.unwrap());
        assert!(repo.get_task(ann.id, task.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_seed_applies_once() {
        let repo = repository().await;
        let seed = DemoSeed::standard("$argon2id$digest");

        repo.bootstrap(Some(&seed)).await.unwrap();
        let stats = repo.stats().await.unwrap();
        assert_eq!(stats.users, 1);
        assert_eq!(stats.tasks, 3);
        assert_eq!(stats.completed_tasks, 1);

        repo.bootstrap(Some(&seed)).await.unwrap();
        assert_eq!(repo.stats().await.unwrap(), stats);
    }

    #[tokio::test]
    async fn test_seed_skipped_when_users_exist() {
        let repo = repository().await;
        repo.create_user(new_user("ann@x.com")).await.unwrap();

        repo.bootstrap(Some(&DemoSeed::standard("d"))).await.unwrap();
        assert!(repo.get_user_by_email(DemoSeed::EMAIL).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_health_check() {
        let repo = repository().await;
        repo.health_check().await.unwrap();
    }
}
