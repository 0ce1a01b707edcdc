use database::{
    connect, Backend, DemoSeed, NewTask, NewUser, PoolSettings, SqlTodoRepository, SqlValue,
    StoreHealth, TaskRepository, UserRepository,
};
use futures_util::future::join_all;
use std::path::Path;
use std::sync::Arc;

fn open(path: &Path) -> SqlTodoRepository {
    let executor = connect(None, path.to_str().unwrap(), PoolSettings::default()).unwrap();
    assert_eq!(executor.backend(), Backend::Sqlite);
    SqlTodoRepository::new(executor)
}

fn new_user(email: &str) -> NewUser {
    NewUser {
        name: "Ann".to_string(),
        email: email.to_string(),
        password_hash: "$argon2id$digest".to_string(),
    }
}

#[tokio::test]
async fn test_data_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.sqlite");

    let repo = open(&path);
    repo.bootstrap(None).await.unwrap();
    let user = repo.create_user(new_user("ann@x.com")).await.unwrap();
    let task = repo.create_task(NewTask::new(user.id, "Buy milk")).await.unwrap();
    repo.close().await;

    let reopened = open(&path);
    reopened.bootstrap(None).await.unwrap();
    let tasks = reopened.list_tasks(user.id).await.unwrap();
    assert_eq!(tasks, vec![task]);
    assert_eq!(reopened.stats().await.unwrap().users, 1);
}

#[tokio::test]
async fn test_bootstrap_twice_keeps_row_counts() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir.path().join("todo.sqlite"));
    let seed = DemoSeed::standard("$argon2id$digest");

    repo.bootstrap(Some(&seed)).await.unwrap();
    let first = repo.stats().await.unwrap();
    repo.bootstrap(Some(&seed)).await.unwrap();
    let second = repo.stats().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.users, 1);
    assert_eq!(first.tasks, 3);
}

#[tokio::test]
async fn test_deleting_user_cascades_to_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("todo.sqlite");
    let executor = connect(None, path.to_str().unwrap(), PoolSettings::default()).unwrap();
    let repo = SqlTodoRepository::new(Arc::clone(&executor));
    repo.bootstrap(None).await.unwrap();

    let user = repo.create_user(new_user("ann@x.com")).await.unwrap();
    repo.create_task(NewTask::new(user.id, "One")).await.unwrap();
    repo.create_task(NewTask::new(user.id, "Two")).await.unwrap();
    assert_eq!(repo.stats().await.unwrap().tasks, 2);

    let deleted = executor
        .execute("DELETE FROM users WHERE id = ?", &[SqlValue::Integer(user.id)])
        .await
        .unwrap();
    assert_eq!(deleted.row_count, 1);
    assert_eq!(repo.stats().await.unwrap().tasks, 0);
}

#[tokio::test]
async fn test_task_for_missing_user_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir.path().join("todo.sqlite"));
    repo.bootstrap(None).await.unwrap();

    let err = repo.create_task(NewTask::new(42, "Orphan")).await.unwrap_err();
    assert!(err.is_database(), "got {err:?}");
    assert_eq!(repo.stats().await.unwrap().tasks, 0);
}

#[tokio::test]
async fn test_concurrent_writers_share_one_pool() {
    let dir = tempfile::tempdir().unwrap();
    let repo = Arc::new(open(&dir.path().join("todo.sqlite")));
    repo.bootstrap(None).await.unwrap();
    let user_id = repo.create_user(new_user("ann@x.com")).await.unwrap().id;

    let handles = (0..10).map(|i| {
        let repo = Arc::clone(&repo);
        tokio::spawn(async move { repo.create_task(NewTask::new(user_id, format!("Task {i}"))).await })
    });

    for result in join_all(handles).await {
        result.unwrap().unwrap();
    }

    let tasks = repo.list_tasks(user_id).await.unwrap();
    assert_eq!(tasks.len(), 10);
    let mut ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 10);
}

#[tokio::test]
async fn test_missing_directory_is_a_database_error() {
    let dir = tempfile::tempdir().unwrap();
    let repo = open(&dir.path().join("missing").join("todo.sqlite"));
    let err = repo.health_check().await.unwrap_err();
    assert!(err.is_database(), "got {err:?}");
}
