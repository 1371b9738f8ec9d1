//! Request and response bodies shared across the API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
    /// Expiry as unix seconds.
    pub exp: i64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub dev_mode: bool,
    pub auth_required: bool,
}

/// Markdown document body (project or task doc).
#[derive(Debug, Serialize, Deserialize)]
pub struct DocBody {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct StartAgentRunRequest {
    pub agent_type: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ForceCompleteResponse {
    pub count: usize,
}
