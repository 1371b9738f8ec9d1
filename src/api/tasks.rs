//! Task endpoints: task rows, task documentation and conversations.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::routes::AppState;
use super::types::DocBody;
use super::{db_error, internal_error, not_found, ApiResult};
use crate::db::{Conversation, Task, TaskUpdate, TaskWithProject};
use crate::docs;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/:id", get(get_task).put(update_task).delete(delete_task))
        .route("/:id/doc", get(get_task_doc).put(put_task_doc))
        .route("/:id/conversations", get(list_conversations))
}

fn load_task(state: &AppState, id: i64) -> ApiResult<TaskWithProject> {
    state
        .db
        .get_task_with_project(id)
        .map_err(db_error)?
        .ok_or_else(|| not_found("Task", id))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<TaskWithProject>> {
    load_task(&state, id).map(Json)
}

async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<TaskUpdate>,
) -> ApiResult<Json<Task>> {
    if update.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err((StatusCode::BAD_REQUEST, "Task title cannot be empty".to_string()));
    }
    state
        .db
        .update_task(id, update)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Task", id))
}

async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.db.delete_task(id).map_err(db_error)? {
        tracing::info!("Deleted task {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Task", id))
    }
}

async fn get_task_doc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DocBody>> {
    let TaskWithProject { project, .. } = load_task(&state, id)?;
    let content = docs::read_task_doc(&project.repo_path, id)
        .await
        .map_err(internal_error)?;
    Ok(Json(DocBody { content }))
}

async fn put_task_doc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<DocBody>,
) -> ApiResult<Json<DocBody>> {
    let TaskWithProject { project, .. } = load_task(&state, id)?;
    docs::write_task_doc(&project.repo_path, id, &body.content)
        .await
        .map_err(internal_error)?;
    Ok(Json(body))
}

async fn list_conversations(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Conversation>>> {
    load_task(&state, id)?;
    state.db.list_conversations(id).map(Json).map_err(db_error)
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use axum::http::StatusCode;
    use serde_json::json;
    use tempfile::tempdir;

    use crate::api::routes::test_support::{send, state};
    use crate::api::AppState;
    use crate::db::NewProject;

    fn seed_task(state: &Arc<AppState>, repo: &Path) -> i64 {
        let project = state
            .db
            .create_project(NewProject {
                name: "demo".to_string(),
                repo_path: repo.to_path_buf(),
                description: None,
            })
            .unwrap();
        state.db.create_task(project.id, "Add login page").unwrap().id
    }

    #[tokio::test]
    async fn test_get_and_update_task() {
        let dir = tempdir().unwrap();
        let state = state(true, dir.path());
        let id = seed_task(&state, dir.path());

        let (status, body) = send(&state, "GET", &format!("/api/tasks/{}", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["task"]["title"], "Add login page");
        assert_eq!(body["project"]["name"], "demo");

        let (status, body) = send(
            &state,
            "PUT",
            &format!("/api/tasks/{}", id),
            Some(json!({ "status": "completed", "workflow_complete": true })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "completed");
        assert_eq!(body["workflow_complete"], true);
        assert_eq!(body["title"], "Add login page");

        let (status, _) = send(
            &state,
            "PUT",
            &format!("/api/tasks/{}", id),
            Some(json!({ "title": "" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_task_doc_round_trip() {
        let dir = tempdir().unwrap();
        let state = state(true, dir.path());
        let id = seed_task(&state, dir.path());
        let uri = format!("/api/tasks/{}/doc", id);

        let (status, _) = send(&state, "PUT", &uri, Some(json!({ "content": "## Plan\n" }))).await;
        assert_eq!(status, StatusCode::OK);
        assert!(dir
            .path()
            .join(format!(".claude-ui/tasks/task-{}.md", id))
            .exists());

        let (status, doc) = send(&state, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["content"], "## Plan\n");
    }

    #[tokio::test]
    async fn test_delete_task_and_missing_task() {
        let dir = tempdir().unwrap();
        let state = state(true, dir.path());
        let id = seed_task(&state, dir.path());
        state.db.create_conversation(id).unwrap();

        let (status, convs) =
            send(&state, "GET", &format!("/api/tasks/{}/conversations", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(convs.as_array().unwrap().len(), 1);

        let (status, _) = send(&state, "DELETE", &format!("/api/tasks/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        for uri in [
            format!("/api/tasks/{}", id),
            format!("/api/tasks/{}/doc", id),
            format!("/api/tasks/{}/conversations", id),
        ] {
            let (status, _) = send(&state, "GET", &uri, None).await;
            assert_eq!(status, StatusCode::NOT_FOUND, "{}", uri);
        }
    }
}
