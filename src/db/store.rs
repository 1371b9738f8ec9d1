//! The persistence boundary the agent runner depends on.

use std::sync::Arc;

use async_trait::async_trait;

use super::{
    AgentRun, AgentRunStatus, AgentType, Conversation, Database, DbResult, Task, TaskUpdate,
    TaskWithProject,
};

/// Storage operations needed to drive agent runs.
///
/// `Database` is the production implementation; tests wrap it to observe calls.
#[async_trait]
pub trait RunStore: Send + Sync {
    async fn get_task_with_project(&self, task_id: i64) -> DbResult<Option<TaskWithProject>>;

    async fn get_task(&self, task_id: i64) -> DbResult<Option<Task>>;

    async fn update_task(&self, task_id: i64, update: TaskUpdate) -> DbResult<Option<Task>>;

    async fn create_agent_run(
        &self,
        task_id: i64,
        agent_type: AgentType,
        conversation_id: Option<i64>,
    ) -> DbResult<AgentRun>;

    async fn agent_runs_for_task(&self, task_id: i64) -> DbResult<Vec<AgentRun>>;

    async fn link_conversation(&self, run_id: i64, conversation_id: i64) -> DbResult<()>;

    async fn update_agent_run_status(&self, run_id: i64, status: AgentRunStatus) -> DbResult<()>;

    async fn force_complete_agent_runs(&self, task_id: i64) -> DbResult<usize>;

    async fn create_conversation(&self, task_id: i64) -> DbResult<Conversation>;

    async fn update_claude_session_id(&self, conversation_id: i64, session_id: &str)
        -> DbResult<()>;
}

pub type SharedRunStore = Arc<dyn RunStore>;

#[async_trait]
impl RunStore for Database {
    async fn get_task_with_project(&self, task_id: i64) -> DbResult<Option<TaskWithProject>> {
        Database::get_task_with_project(self, task_id)
    }

    async fn get_task(&self, task_id: i64) -> DbResult<Option<Task>> {
        Database::get_task(self, task_id)
    }

    async fn update_task(&self, task_id: i64, update: TaskUpdate) -> DbResult<Option<Task>> {
        Database::update_task(self, task_id, update)
    }

    async fn create_agent_run(
        &self,
        task_id: i64,
        agent_type: AgentType,
        conversation_id: Option<i64>,
    ) -> DbResult<AgentRun> {
        Database::create_agent_run(self, task_id, agent_type, conversation_id)
    }

    async fn agent_runs_for_task(&self, task_id: i64) -> DbResult<Vec<AgentRun>> {
        self.list_agent_runs(task_id)
    }

    async fn link_conversation(&self, run_id: i64, conversation_id: i64) -> DbResult<()> {
        self.link_agent_run_conversation(run_id, conversation_id)
    }

    async fn update_agent_run_status(&self, run_id: i64, status: AgentRunStatus) -> DbResult<()> {
        Database::update_agent_run_status(self, run_id, status)
    }

    async fn force_complete_agent_runs(&self, task_id: i64) -> DbResult<usize> {
        Database::force_complete_agent_runs(self, task_id)
    }

    async fn create_conversation(&self, task_id: i64) -> DbResult<Conversation> {
        Database::create_conversation(self, task_id)
    }

    async fn update_claude_session_id(
        &self,
        conversation_id: i64,
        session_id: &str,
    ) -> DbResult<()> {
        Database::update_claude_session_id(self, conversation_id, session_id)
    }
}
