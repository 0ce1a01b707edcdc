//! Task Manager Server Library
//!
//! Configuration loading, logging setup and application wiring for the
//! `todo-server` binary. Exposed as a library so integration tests can build
//! the same application the binary runs.

pub mod config;
pub mod setup;
pub mod telemetry;

pub use config::Config;
pub use setup::{create_repository, create_server, ensure_database_directory, initialize_app};
pub use telemetry::init_telemetry;
