//! HTTP server for the task manager
//!
//! JSON endpoints live under `/api`; every other path is answered from the
//! static client directory, falling back to its `index.html`.

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post, put},
    Json, Router,
};
use serde_json::json;
use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc};
use todo_core::{CredentialHasher, TodoRepository};
use tower_http::services::{ServeDir, ServeFile};
use tracing::info;

use crate::{
    error::{json_error_responses, ApiError},
    handler::TodoHandler,
    request_logger::api_request_logging_middleware,
    serialization::{parse_object, TaskPayload, UserEnvelope},
};

/// Shared server state for handlers
pub struct ApiState<R> {
    pub handler: TodoHandler<R>,
}

/// Task manager HTTP server
pub struct ApiServer<R> {
    handler: TodoHandler<R>,
    static_dir: Option<PathBuf>,
}

impl<R: TodoRepository + 'static> ApiServer<R> {
    /// Create a server over a repository
    pub fn new(repository: Arc<R>, hasher: CredentialHasher) -> Self {
        Self {
            handler: TodoHandler::new(repository, hasher),
            static_dir: None,
        }
    }

    /// Serve the pre-built client from `dir`
    pub fn with_static_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.static_dir = Some(dir.into());
        self
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn serve<F>(self, addr: &str, shutdown: F) -> Result<(), Box<dyn std::error::Error>>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let socket_addr: SocketAddr = addr
            .parse()
            .map_err(|e| format!("Invalid address '{addr}': {e}"))?;

        let app = self.router();
        let listener = tokio::net::TcpListener::bind(socket_addr).await?;
        info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("Server stopped");
        Ok(())
    }

    /// Build the router with all endpoints
    pub fn router(self) -> Router {
        let state = Arc::new(ApiState {
            handler: self.handler,
        });

        let api = Router::new()
            .route("/health", get(health_handler::<R>))
            .route("/auth/register", post(register_handler::<R>))
            .route("/auth/login", post(login_handler::<R>))
            .route(
                "/users/:user_id/tasks",
                get(list_tasks_handler::<R>).post(create_task_handler::<R>),
            )
            .route(
                "/users/:user_id/tasks/:task_id",
                put(update_task_handler::<R>).delete(delete_task_handler::<R>),
            )
            .fallback(not_found_handler)
            .layer(middleware::map_response(json_error_responses))
            .layer(middleware::from_fn(api_request_logging_middleware))
            .with_state(state);

        let app = Router::new().nest("/api", api);

        match self.static_dir {
            Some(dir) => {
                let index = ServeFile::new(dir.join("index.html"));
                app.fallback_service(ServeDir::new(dir).fallback(index))
            }
            None => app.fallback(not_found_handler),
        }
    }
}

type SharedState<R> = State<Arc<ApiState<R>>>;

async fn health_handler<R: TodoRepository>(
    State(state): SharedState<R>,
) -> Result<impl IntoResponse, ApiError> {
    state.handler.health().await?;
    Ok(Json(json!({ "status": "ok" })))
}

async fn register_handler<R: TodoRepository>(
    State(state): SharedState<R>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body = parse_object(&body)?;
    let user = state.handler.register(&body).await?;
    Ok((StatusCode::CREATED, Json(UserEnvelope { user })))
}

async fn login_handler<R: TodoRepository>(
    State(state): SharedState<R>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body = parse_object(&body)?;
    let user = state.handler.login(&body).await?;
    Ok(Json(UserEnvelope { user }))
}

async fn list_tasks_handler<R: TodoRepository>(
    State(state): SharedState<R>,
    Path(user_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let tasks = state.handler.list_tasks(&user_id).await?;
    Ok(Json(
        tasks.into_iter().map(TaskPayload::from).collect::<Vec<_>>(),
    ))
}

async fn create_task_handler<R: TodoRepository>(
    State(state): SharedState<R>,
    Path(user_id): Path<String>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body = parse_object(&body)?;
    let task = state.handler.create_task(&user_id, &body).await?;
    Ok((StatusCode::CREATED, Json(TaskPayload::from(task))))
}

async fn update_task_handler<R: TodoRepository>(
    State(state): SharedState<R>,
    Path((user_id, task_id)): Path<(String, String)>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let body = parse_object(&body)?;
    let task = state.handler.update_task(&user_id, &task_id, &body).await?;
    Ok(Json(TaskPayload::from(task)))
}

async fn delete_task_handler<R: TodoRepository>(
    State(state): SharedState<R>,
    Path((user_id, task_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    state.handler.delete_task(&user_id, &task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn not_found_handler() -> ApiError {
    ApiError::NotFound("Not found".to_string())
}
