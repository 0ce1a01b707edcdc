//! Mock implementation of the repository traits
//!
//! Provides a thread-safe in-memory repository with:
//! - Error injection capabilities
//! - Call tracking for verification
//! - The same uniqueness and ownership rules as the relational store

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::{
    atomic::{AtomicI64, Ordering},
    Arc,
};
use todo_core::{
    models::timestamp_now, NewTask, NewUser, Result, StoreHealth, StoreStats, Task,
    TaskRepository, TodoError, UpdateTask, User, UserRepository,
};

/// Mock implementation of the repository traits for testing
///
/// Features:
/// - Thread-safe concurrent access
/// - Error injection for failure testing
/// - Call history tracking for verification
/// - Store-level email uniqueness, reported as `DuplicateKey`
#[derive(Clone)]
pub struct MockTodoRepository {
    users: Arc<Mutex<HashMap<i64, User>>>,
    tasks: Arc<Mutex<HashMap<i64, Task>>>,
    next_user_id: Arc<AtomicI64>,
    next_task_id: Arc<AtomicI64>,
    error_injection: Arc<Mutex<Option<TodoError>>>,
    method_errors: Arc<Mutex<HashMap<String, TodoError>>>,
    call_history: Arc<Mutex<Vec<String>>>,
}

impl Default for MockTodoRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTodoRepository {
    /// Create a new empty mock repository
    pub fn new() -> Self {
        Self {
            users: Arc::new(Mutex::new(HashMap::new())),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_user_id: Arc::new(AtomicI64::new(1)),
            next_task_id: Arc::new(AtomicI64::new(1)),
            error_injection: Arc::new(Mutex::new(None)),
            method_errors: Arc::new(Mutex::new(HashMap::new())),
            call_history: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Create mock repository with pre-populated users and tasks
    pub fn with_data(users: Vec<User>, tasks: Vec<Task>) -> Self {
        let repo = Self::new();
        let max_user = users.iter().map(|u| u.id).max().unwrap_or(0);
        let max_task = tasks.iter().map(|t| t.id).max().unwrap_or(0);

        repo.users.lock().extend(users.into_iter().map(|u| (u.id, u)));
        repo.tasks.lock().extend(tasks.into_iter().map(|t| (t.id, t)));
        repo.next_user_id.store(max_user + 1, Ordering::SeqCst);
        repo.next_task_id.store(max_task + 1, Ordering::SeqCst);
        repo
    }

    /// Inject error for next operation
    pub fn inject_error(&self, error: TodoError) {
        *self.error_injection.lock() = Some(error);
    }

    /// Inject error for the next call of one method only
    pub fn inject_error_on(&self, method: &str, error: TodoError) {
        self.method_errors.lock().insert(method.to_string(), error);
    }

    /// Clear error injection
    pub fn clear_error(&self) {
        *self.error_injection.lock() = None;
        self.method_errors.lock().clear();
    }

    /// Get history of called methods
    pub fn call_history(&self) -> Vec<String> {
        self.call_history.lock().clone()
    }

    /// Clear call history
    pub fn clear_history(&self) {
        self.call_history.lock().clear();
    }

    /// Assert method was called
    pub fn assert_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            history.iter().any(|call| call.starts_with(method)),
            "Method '{}' was not called. Call history: {:?}",
            method,
            *history
        );
    }

    /// Assert method was never called
    pub fn assert_not_called(&self, method: &str) {
        let history = self.call_history.lock();
        assert!(
            !history.iter().any(|call| call.starts_with(method)),
            "Method '{}' was called unexpectedly. Call history: {:?}",
            method,
            *history
        );
    }

    /// Number of stored users
    pub fn user_count(&self) -> usize {
        self.users.lock().len()
    }

    /// Number of stored tasks
    pub fn task_count(&self) -> usize {
        self.tasks.lock().len()
    }

    /// Snapshot of a stored task, ignoring ownership
    pub fn stored_task(&self, id: i64) -> Option<Task> {
        self.tasks.lock().get(&id).cloned()
    }

    /// Check if an error should be injected, consuming it if so
    fn check_error_injection(&self, method: &str) -> Result<()> {
        if let Some(error) = self.method_errors.lock().remove(method) {
            return Err(error);
        }
        if let Some(error) = self.error_injection.lock().take() {
            return Err(error);
        }
        Ok(())
    }

    /// Record method call with parameters in history, then apply any
    /// injected error
    fn record_call(&self, method: &str, params: &str) -> Result<()> {
        self.call_history.lock().push(format!("{method}({params})"));
        self.check_error_injection(method)
    }
}

#[async_trait]
impl UserRepository for MockTodoRepository {
    async fn create_user(&self, user: NewUser) -> Result<User> {
        self.record_call("create_user", &format!("email={}", user.email))?;

        let mut users = self.users.lock();
        if users.values().any(|u| u.email.eq_ignore_ascii_case(&user.email)) {
            return Err(TodoError::DuplicateKey("users.email".to_string()));
        }

        let now = timestamp_now();
        let created = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            name: user.name,
            email: user.email,
            password_hash: user.password_hash,
            created_at: now,
            updated_at: now,
        };
        users.insert(created.id, created.clone());
        Ok(created)
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.record_call("get_user_by_id", &format!("id={id}"))?;
        Ok(self.users.lock().get(&id).cloned())
    }

    async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.record_call("get_user_by_email", &format!("email={email}"))?;
        Ok(self
            .users
            .lock()
            .values()
            .find(|u| u.email == email)
            .cloned())
    }
}

#[async_trait]
impl TaskRepository for MockTodoRepository {
    async fn create_task(&self, task: NewTask) -> Result<Task> {
        self.record_call("create_task", &format!("user_id={}", task.user_id))?;

        if !self.users.lock().contains_key(&task.user_id) {
            return Err(TodoError::Database(
                "Foreign key constraint error: tasks.user_id".to_string(),
            ));
        }

        let now = timestamp_now();
        let created = Task {
            id: self.next_task_id.fetch_add(1, Ordering::SeqCst),
            user_id: task.user_id,
            title: task.title,
            completed: false,
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().insert(created.id, created.clone());
        Ok(created)
    }

    async fn list_tasks(&self, user_id: i64) -> Result<Vec<Task>> {
        self.record_call("list_tasks", &format!("user_id={user_id}"))?;

        let mut tasks: Vec<Task> = self
            .tasks
            .lock()
            .values()
            .filter(|t| t.is_owned_by(user_id))
            .cloned()
            .collect();
        tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(tasks)
    }

    async fn get_task(&self, user_id: i64, task_id: i64) -> Result<Option<Task>> {
        self.record_call("get_task", &format!("user_id={user_id}, task_id={task_id}"))?;
        Ok(self
            .tasks
            .lock()
            .get(&task_id)
            .filter(|t| t.is_owned_by(user_id))
            .cloned())
    }

    async fn update_task(
        &self,
        user_id: i64,
        task_id: i64,
        updates: UpdateTask,
    ) -> Result<Option<Task>> {
        self.record_call("update_task", &format!("user_id={user_id}, task_id={task_id}"))?;

        let mut tasks = self.tasks.lock();
        match tasks.get_mut(&task_id) {
            Some(task) if task.is_owned_by(user_id) => {
                *task = updates.apply_to(task);
                Ok(Some(task.clone()))
            }
            _ => Ok(None),
        }
    }

    async fn delete_task(&self, user_id: i64, task_id: i64) -> Result<bool> {
        self.record_call("delete_task", &format!("user_id={user_id}, task_id={task_id}"))?;

        let mut tasks = self.tasks.lock();
        if tasks.get(&task_id).is_some_and(|t| t.is_owned_by(user_id)) {
            tasks.remove(&task_id);
            Ok(true)
        } else {
            Ok(false)
        }
    }
}

#[async_trait]
impl StoreHealth for MockTodoRepository {
    async fn health_check(&self) -> Result<()> {
        self.record_call("health_check", "")
    }

    async fn stats(&self) -> Result<StoreStats> {
        self.record_call("stats", "")?;

        let tasks = self.tasks.lock();
        Ok(StoreStats {
            users: self.users.lock().len() as u64,
            tasks: tasks.len() as u64,
            completed_tasks: tasks.values().filter(|t| t.completed).count() as u64,
        })
    }
}
