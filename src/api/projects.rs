//! Project endpoints.
//!
//! - `GET /` / `POST /` - list / create projects
//! - `GET|PUT|DELETE /:id` - single project
//! - `GET|PUT /:id/doc` - project documentation (`<repo>/.claude-ui/project.md`)
//! - `GET|POST /:id/tasks` - tasks of the project

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::routes::AppState;
use super::types::{CreateTaskRequest, DocBody};
use super::{db_error, internal_error, not_found, ApiResult};
use crate::db::{NewProject, Project, ProjectUpdate, Task};
use crate::docs;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/:id",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/:id/doc", get(get_project_doc).put(put_project_doc))
        .route("/:id/tasks", get(list_tasks).post(create_task))
}

fn load_project(state: &AppState, id: i64) -> ApiResult<Project> {
    state
        .db
        .get_project(id)
        .map_err(db_error)?
        .ok_or_else(|| not_found("Project", id))
}

async fn list_projects(State(state): State<Arc<AppState>>) -> ApiResult<Json<Vec<Project>>> {
    state.db.list_projects().map(Json).map_err(db_error)
}

async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewProject>,
) -> ApiResult<(StatusCode, Json<Project>)> {
    if req.name.trim().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Project name is required".to_string()));
    }
    if req.repo_path.as_os_str().is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Repository path is required".to_string()));
    }
    let project = state.db.create_project(req).map_err(db_error)?;
    tracing::info!("Created project {}: {}", project.id, project.name);
    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Project>> {
    load_project(&state, id).map(Json)
}

async fn update_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(update): Json<ProjectUpdate>,
) -> ApiResult<Json<Project>> {
    state
        .db
        .update_project(id, update)
        .map_err(db_error)?
        .map(Json)
        .ok_or_else(|| not_found("Project", id))
}

async fn delete_project(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<StatusCode> {
    if state.db.delete_project(id).map_err(db_error)? {
        tracing::info!("Deleted project {}", id);
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("Project", id))
    }
}

async fn get_project_doc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<DocBody>> {
    let project = load_project(&state, id)?;
    let content = docs::read_project_doc(&project.repo_path)
        .await
        .map_err(internal_error)?;
    Ok(Json(DocBody { content }))
}

async fn put_project_doc(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<DocBody>,
) -> ApiResult<Json<DocBody>> {
    let project = load_project(&state, id)?;
    docs::write_project_doc(&project.repo_path, &body.content)
        .await
        .map_err(internal_error)?;
    Ok(Json(body))
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> ApiResult<Json<Vec<Task>>> {
    load_project(&state, id)?;
    state.db.list_tasks(id).map(Json).map_err(db_error)
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(req): Json<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "Task title is required".to_string()));
    }
    load_project(&state, id)?;
    let task = state.db.create_task(id, title).map_err(db_error)?;
    tracing::info!("Created task {} in project {}", task.id, id);
    Ok((StatusCode::CREATED, Json(task)))
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use serde_json::json;
    use tempfile::tempdir;

    use crate::api::routes::test_support::{send, state};

    #[tokio::test]
    async fn test_project_crud() {
        let dir = tempdir().unwrap();
        let state = state(true, dir.path());
        let repo = dir.path().to_string_lossy().to_string();

        let (status, created) = send(
            &state,
            "POST",
            "/api/projects",
            Some(json!({ "name": "demo", "repo_path": repo })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let id = created["id"].as_i64().unwrap();

        let (status, updated) = send(
            &state,
            "PUT",
            &format!("/api/projects/{}", id),
            Some(json!({ "description": "Demo app" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["name"], "demo");
        assert_eq!(updated["description"], "Demo app");

        let (status, list) = send(&state, "GET", "/api/projects", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list.as_array().unwrap().len(), 1);

        let (status, _) = send(&state, "DELETE", &format!("/api/projects/{}", id), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = send(&state, "GET", &format!("/api/projects/{}", id), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_create_project_validation() {
        let dir = tempdir().unwrap();
        let state = state(true, dir.path());
        let (status, _) = send(
            &state,
            "POST",
            "/api/projects",
            Some(json!({ "name": "  ", "repo_path": "/tmp" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_project_doc_and_tasks() {
        let dir = tempdir().unwrap();
        let state = state(true, dir.path());
        let repo = dir.path().to_string_lossy().to_string();
        let (_, created) = send(
            &state,
            "POST",
            "/api/projects",
            Some(json!({ "name": "demo", "repo_path": repo })),
        )
        .await;
        let id = created["id"].as_i64().unwrap();

        let (status, doc) = send(&state, "GET", &format!("/api/projects/{}/doc", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(doc["content"], "");

        let (status, _) = send(
            &state,
            "PUT",
            &format!("/api/projects/{}/doc", id),
            Some(json!({ "content": "# Demo\n" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(dir.path().join(".claude-ui/project.md").exists());

        let (status, task) = send(
            &state,
            "POST",
            &format!("/api/projects/{}/tasks", id),
            Some(json!({ "title": "Add login page" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(task["status"], "pending");
        assert_eq!(task["workflow_complete"], false);

        let (status, tasks) = send(&state, "GET", &format!("/api/projects/{}/tasks", id), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(tasks.as_array().unwrap().len(), 1);

        let (status, _) = send(&state, "GET", "/api/projects/404/tasks", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
