//! Standard test fixtures for consistent testing

use crate::builders::{TaskBuilder, UserBuilder};
use chrono::Duration;
use todo_core::{models::timestamp_now, Task, User};

/// The canonical first user
pub fn create_test_user() -> User {
    UserBuilder::new().build()
}

/// A second user for ownership tests
pub fn create_other_user() -> User {
    UserBuilder::new()
        .with_id(2)
        .with_name("Bob")
        .with_email("bob@x.com")
        .build()
}

/// Create a basic incomplete task owned by user 1
pub fn create_test_task() -> Task {
    TaskBuilder::new().with_title("Buy milk").build()
}

/// Create `count` tasks for one user, one minute apart, oldest first
pub fn create_test_tasks(user_id: i64, count: usize) -> Vec<Task> {
    let start = timestamp_now() - Duration::minutes(count as i64);
    (1..=count)
        .map(|i| {
            let builder = TaskBuilder::new()
                .with_id(i as i64)
                .with_user_id(user_id)
                .with_title(format!("Task {i}"))
                .created_at(start + Duration::minutes(i as i64));
            if i % 2 == 0 {
                builder.completed().build()
            } else {
                builder.build()
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixture_tasks_are_ordered_oldest_first() {
        let tasks = create_test_tasks(1, 3);
        assert_eq!(tasks.len(), 3);
        assert!(tasks[0].created_at < tasks[2].created_at);
        assert_eq!(tasks.iter().filter(|t| t.completed).count(), 1);
    }

    #[test]
    fn test_users_are_distinct() {
        assert_ne!(create_test_user().email, create_other_user().email);
    }
}
