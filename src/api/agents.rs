//! Agent run endpoints under `/api/tasks/:id/agent-runs`.
//!
//! - `GET /` - every run of the task, oldest first
//! - `GET /running` - the active run, or `null`
//! - `POST /` - start a phase (`{"agent_type": "implementation"}`); 409 while another run is active
//! - `POST /force-complete` - mark stuck runs completed (`{"count": n}`)

use std::sync::Arc;

use axum::{
    extract::{Extension, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

use super::auth::AuthUser;
use super::routes::AppState;
use super::types::{ForceCompleteResponse, StartAgentRunRequest};
use super::{db_error, run_error, ApiResult};
use crate::agent_runner::{RunOptions, RunStarted};
use crate::db::{AgentRun, AgentType};
use crate::events::Broadcast;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id/agent-runs", get(list_agent_runs).post(start_agent_run))
        .route("/:id/agent-runs/running", get(get_running_agent))
        .route("/:id/agent-runs/force-complete", post(force_complete))
}

async fn list_agent_runs(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<AgentRun>>> {
    state.db.list_agent_runs(task_id).map(Json).map_err(db_error)
}

async fn get_running_agent(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Option<AgentRun>>> {
    state
        .runner
        .get_running_agent_for_task(task_id)
        .await
        .map(Json)
        .map_err(run_error)
}

async fn start_agent_run(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
    Extension(user): Extension<AuthUser>,
    Json(req): Json<StartAgentRunRequest>,
) -> ApiResult<(StatusCode, Json<RunStarted>)> {
    let agent_type = req.agent_type.parse::<AgentType>().map_err(run_error)?;

    if let Some(active) = state
        .runner
        .get_running_agent_for_task(task_id)
        .await
        .map_err(run_error)?
    {
        return Err((
            StatusCode::CONFLICT,
            format!(
                "Agent run {} ({}) is already active for task {}",
                active.id, active.agent_type, task_id
            ),
        ));
    }

    let options = RunOptions {
        broadcast: Some(state.events.clone() as Arc<dyn Broadcast>),
        user_id: Some(user.id),
    };
    let started = state
        .runner
        .start_agent_run(task_id, agent_type, options)
        .await
        .map_err(|e| {
            tracing::error!(task_id, "Failed to start {} agent: {}", agent_type, e);
            run_error(e)
        })?;
    Ok((StatusCode::CREATED, Json(started)))
}

async fn force_complete(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<ForceCompleteResponse>> {
    let count = state
        .runner
        .force_complete_running_agents(task_id)
        .await
        .map_err(run_error)?;
    Ok(Json(ForceCompleteResponse { count }))
}
