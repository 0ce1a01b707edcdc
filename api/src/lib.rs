//! HTTP API for the task manager
//!
//! Provides the axum router, endpoint logic and JSON payloads. The crate is
//! generic over the repository so the same routes run against the relational
//! store in production and the in-memory mock in tests.

pub mod error;
pub mod handler;
pub mod request_logger;
pub mod serialization;
pub mod server;

pub use error::ApiError;
pub use handler::TodoHandler;
pub use serialization::{TaskPayload, UserEnvelope};
pub use server::ApiServer;
