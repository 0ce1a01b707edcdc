//! Integration tests for the mocks crate
//!
//! Exercises the mock repository through the core traits the way the HTTP
//! layer uses it.

use futures_util::future::join_all;
use mocks::*;
use todo_core::{
    NewTask, NewUser, StoreHealth, TaskRepository, TodoError, UpdateTask, UserRepository,
};

#[tokio::test]
async fn test_mock_repository_basic_operations() {
    let repo = MockTodoRepository::new();

    let user = repo
        .create_user(NewUser {
            name: "Ann".to_string(),
            email: "ann@x.com".to_string(),
            password_hash: "digest".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(user.id, 1);
    repo.assert_called("create_user");

    let task = repo.create_task(NewTask::new(user.id, "Write spec")).await.unwrap();
    assert!(!task.completed);

    let updated = repo
        .update_task(user.id, task.id, UpdateTask::new().completed(true))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(updated.title, "Write spec");
    assert!(updated.updated_at > task.updated_at);

    let stats = repo.stats().await.unwrap();
    assert_eq!((stats.users, stats.tasks, stats.completed_tasks), (1, 1, 1));
}

#[tokio::test]
async fn test_mock_repository_error_injection() {
    let repo = MockTodoRepository::with_data(vec![create_test_user()], vec![]);

    repo.inject_error(TodoError::Database("connection refused".to_string()));
    let result = repo.get_user_by_id(1).await;
    assert!(matches!(result, Err(TodoError::Database(_))));

    repo.inject_error(TodoError::Internal("boom".to_string()));
    repo.clear_error();
    assert!(repo.get_user_by_id(1).await.unwrap().is_some());
}

#[tokio::test]
async fn test_prepopulated_list_is_newest_first() {
    let user = create_test_user();
    let tasks = create_test_tasks(user.id, 4);
    let repo = MockTodoRepository::with_data(vec![user.clone()], tasks);

    let listed = repo.list_tasks(user.id).await.unwrap();
    let ids: Vec<i64> = listed.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![4, 3, 2, 1]);

    let next = repo.create_task(NewTask::new(user.id, "Fresh")).await.unwrap();
    assert_eq!(next.id, 5);
    assert_eq!(repo.list_tasks(user.id).await.unwrap()[0].id, 5);
}

#[tokio::test]
async fn test_concurrent_access() {
    let repo = MockTodoRepository::with_data(vec![create_test_user()], vec![]);

    let creates = (0..20).map(|i| {
        let repo = repo.clone();
        async move { repo.create_task(NewTask::new(1, format!("Task {i}"))).await }
    });
    let results = join_all(creates).await;
    assert!(results.iter().all(Result::is_ok));
    assert_eq!(repo.task_count(), 20);

    repo.clear_history();
    assert!(repo.call_history().is_empty());
}
