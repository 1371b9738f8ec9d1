//! HTTP/WebSocket API for the dashboard.
//!
//! ## Endpoints
//!
//! - `GET /api/health` - server status (public)
//! - `POST /api/auth/login` - exchange the dashboard password for a JWT (public)
//! - `GET /api/ws` - live task events (JWT via subprotocol or `?token=`)
//! - `/api/projects/...` - projects, project docs and task creation
//! - `/api/tasks/...` - tasks, task docs, conversations and agent runs

mod agents;
mod auth;
mod projects;
mod routes;
mod tasks;
pub mod types;
mod ws;

pub use routes::{build_router, serve, AppState};

use axum::http::StatusCode;

use crate::agent_runner::AgentRunError;
use crate::db::DbError;

pub(crate) type ApiResult<T> = Result<T, (StatusCode, String)>;

pub(crate) fn internal_error(e: impl std::fmt::Display) -> (StatusCode, String) {
    (StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
}

pub(crate) fn db_error(e: DbError) -> (StatusCode, String) {
    match e {
        DbError::NotFound { .. } => (StatusCode::NOT_FOUND, e.to_string()),
        other => internal_error(other),
    }
}

pub(crate) fn run_error(e: AgentRunError) -> (StatusCode, String) {
    let status = match &e {
        AgentRunError::TaskNotFound(_) => StatusCode::NOT_FOUND,
        AgentRunError::UnknownAgentType(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, e.to_string())
}

pub(crate) fn not_found(entity: &str, id: i64) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("{} {} not found", entity, id))
}
