use thiserror::Error;

use crate::claude::ClaudeError;
use crate::db::DbError;

#[derive(Debug, Error)]
pub enum AgentRunError {
    #[error("Task {0} not found")]
    TaskNotFound(i64),

    #[error("Unknown agent type: {0}")]
    UnknownAgentType(String),

    #[error(transparent)]
    Store(#[from] DbError),

    #[error(transparent)]
    Conversation(#[from] ClaudeError),

    #[error("Failed to read task documentation: {0}")]
    Docs(#[from] std::io::Error),
}

pub type AgentRunResult<T> = Result<T, AgentRunError>;
