//! Row types for the dashboard database.

use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent_runner::AgentRunError;

/// Lifecycle status of a task as shown on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
        }
    }

    pub(crate) fn from_db(value: &str) -> Self {
        match value {
            "in_progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Pending,
        }
    }
}

/// Agent phase run against a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentType {
    /// Produces the plan document; never chains.
    Planification,
    Implementation,
    Review,
}

impl AgentType {
    pub const ALL: [AgentType; 3] = [Self::Planification, Self::Implementation, Self::Review];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Planification => "planification",
            Self::Implementation => "implementation",
            Self::Review => "review",
        }
    }

    /// Next phase of the implementation/review cycle, if this phase chains at all.
    pub fn next_in_chain(&self) -> Option<AgentType> {
        match self {
            Self::Planification => None,
            Self::Implementation => Some(Self::Review),
            Self::Review => Some(Self::Implementation),
        }
    }
}

impl std::fmt::Display for AgentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentType {
    type Err = AgentRunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AgentRunError::UnknownAgentType(s.to_string()))
    }
}

/// Status of a single agent run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentRunStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl AgentRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Running or pending runs count as "active" for the one-agent-per-task guard.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub(crate) fn from_db(value: &str) -> Self {
        match value {
            "running" => Self::Running,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

impl std::fmt::Display for AgentRunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A project: a local repository the agents work in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: i64,
    pub name: String,
    /// Root of the repository; documentation lives under `.claude-ui/` here.
    pub repo_path: PathBuf,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub project_id: i64,
    pub title: String,
    pub status: TaskStatus,
    /// Halts the implementation/review chain once set.
    pub workflow_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A task together with its owning project.
#[derive(Debug, Clone, Serialize)]
pub struct TaskWithProject {
    pub task: Task,
    pub project: Project,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub task_id: i64,
    /// Session id assigned by the Claude runtime, filled in once known.
    pub claude_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: i64,
    pub task_id: i64,
    pub agent_type: AgentType,
    pub status: AgentRunStatus,
    pub conversation_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    /// Set only when the run transitions to `completed`.
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NewProject {
    pub name: String,
    pub repo_path: PathBuf,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectUpdate {
    pub name: Option<String>,
    pub repo_path: Option<PathBuf>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub status: Option<TaskStatus>,
    pub workflow_complete: Option<bool>,
}

impl TaskUpdate {
    pub fn status(status: TaskStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.status.is_none() && self.workflow_complete.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_type_parsing() {
        assert_eq!("review".parse::<AgentType>().unwrap(), AgentType::Review);
        assert_eq!(
            "planification".parse::<AgentType>().unwrap(),
            AgentType::Planification
        );

        let err = "deploy".parse::<AgentType>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown agent type: deploy");
        assert!("Review".parse::<AgentType>().is_err());
    }

    #[test]
    fn test_chain_cycle() {
        assert_eq!(AgentType::Implementation.next_in_chain(), Some(AgentType::Review));
        assert_eq!(AgentType::Review.next_in_chain(), Some(AgentType::Implementation));
        assert_eq!(AgentType::Planification.next_in_chain(), None);
    }

    #[test]
    fn test_task_status_serde() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert_eq!(TaskStatus::from_db("in_progress"), TaskStatus::InProgress);
    }
}
