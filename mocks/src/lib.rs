//! Mock implementations and test utilities for the task manager
//!
//! This crate provides the testing infrastructure shared by the HTTP layer
//! and server tests:
//! - An in-memory repository with error injection and call tracking
//! - Fluent builders for users and tasks
//! - Standard fixtures

pub mod builders;
pub mod fixtures;
pub mod repository;

pub use builders::*;
pub use fixtures::*;
pub use repository::MockTodoRepository;
