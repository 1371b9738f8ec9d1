//! Agent run orchestration.
//!
//! Starts one agent phase for a task, tracks it until the Claude turn ends and,
//! for the implementation/review pair, chains into the complementary phase:
//!
//! ```text
//!   planification (terminal)
//!
//!   implementation ──ok──▶ review ──ok──▶ implementation ──▶ ...
//!         │                  │
//!         └── stops when the turn fails, the task's workflow is complete,
//!             or another run is already active for the task
//! ```
//!
//! "One active run per task" is a check-then-act guard over plain row reads,
//! not a lock. Two near-simultaneous starts for the same task can both pass it.

mod error;

pub use error::{AgentRunError, AgentRunResult};

use std::sync::Arc;
use std::time::Duration;

use async_recursion::async_recursion;
use serde::Serialize;
use tokio::sync::mpsc;

use crate::claude::{ConversationEvent, ConversationRequest, PermissionMode, SharedAdapter};
use crate::db::{
    AgentRun, AgentRunStatus, AgentType, Conversation, SharedRunStore, TaskStatus, TaskUpdate,
    TaskWithProject,
};
use crate::docs;
use crate::events::{Broadcast, TaskEvent};
use crate::notify::{CompletionNotice, SharedNotifier};
use crate::prompts;

/// Pause before a chained phase starts.
pub const DEFAULT_CHAIN_DELAY: Duration = Duration::from_secs(2);

/// Per-call options for [`AgentRunner::start_agent_run`].
#[derive(Clone, Default)]
pub struct RunOptions {
    /// Where lifecycle events for the run are published.
    pub broadcast: Option<Arc<dyn Broadcast>>,
    /// User to notify when the turn ends.
    pub user_id: Option<String>,
}

impl RunOptions {
    fn emit(&self, task_id: i64, event: TaskEvent) {
        if let Some(broadcast) = &self.broadcast {
            broadcast.broadcast(task_id, event);
        }
    }
}

/// What the caller gets back once a phase is underway.
#[derive(Debug, Clone, Serialize)]
pub struct RunStarted {
    pub agent_run: AgentRun,
    pub conversation: Conversation,
    pub claude_session_id: Option<String>,
}

#[derive(Clone)]
pub struct AgentRunner {
    store: SharedRunStore,
    adapter: SharedAdapter,
    notifier: SharedNotifier,
    chain_delay: Duration,
}

impl AgentRunner {
    pub fn new(store: SharedRunStore, adapter: SharedAdapter, notifier: SharedNotifier) -> Self {
        Self {
            store,
            adapter,
            notifier,
            chain_delay: DEFAULT_CHAIN_DELAY,
        }
    }

    pub fn with_chain_delay(mut self, delay: Duration) -> Self {
        self.chain_delay = delay;
        self
    }

    /// Same as [`start_agent_run`](Self::start_agent_run) for an agent type given by name.
    ///
    /// The name is validated before anything is written.
    pub async fn start_agent_run_by_name(
        &self,
        task_id: i64,
        agent_type: &str,
        options: RunOptions,
    ) -> AgentRunResult<RunStarted> {
        let agent_type = agent_type.parse::<AgentType>()?;
        self.start_agent_run(task_id, agent_type, options).await
    }

    /// Start one agent phase for a task.
    ///
    /// Returns once Claude has assigned the conversation a session id, or the turn
    /// ended without one. Row writes happen strictly in order (run, conversation,
    /// link) and are not rolled back if a later step fails.
    #[async_recursion]
    pub async fn start_agent_run(
        &self,
        task_id: i64,
        agent_type: AgentType,
        options: RunOptions,
    ) -> AgentRunResult<RunStarted> {
        let TaskWithProject { task, project } = self
            .store
            .get_task_with_project(task_id)
            .await?
            .ok_or(AgentRunError::TaskNotFound(task_id))?;

        if task.status == TaskStatus::Pending {
            self.store
                .update_task(task_id, TaskUpdate::status(TaskStatus::InProgress))
                .await?;
        }

        let run = self.store.create_agent_run(task_id, agent_type, None).await?;
        let conversation = self.store.create_conversation(task_id).await?;
        self.store.link_conversation(run.id, conversation.id).await?;
        let agent_run = AgentRun {
            conversation_id: Some(conversation.id),
            ..run
        };

        let doc_path = docs::task_doc_relative_path(task_id);
        let message = prompts::message_for(agent_type, &doc_path, task_id);
        let context = docs::build_context_prompt(&project.repo_path, task_id).await?;

        let turn = self
            .adapter
            .start_conversation(ConversationRequest {
                task_id,
                conversation_id: conversation.id,
                message,
                working_dir: project.repo_path.clone(),
                custom_system_prompt: (!context.is_empty()).then_some(context),
                permission_mode: PermissionMode::BypassPermissions,
                resume_session_id: None,
                broadcast: options.broadcast.clone(),
                user_id: options.user_id.clone(),
            })
            .await?;

        tracing::info!(
            task_id,
            agent_run_id = agent_run.id,
            conversation_id = conversation.id,
            agent_type = %agent_type,
            "Agent run started"
        );

        let lifecycle = RunLifecycle {
            runner: self.clone(),
            task_id,
            task_title: task.title,
            agent_type,
            run_id: agent_run.id,
            conversation_id: conversation.id,
            options,
        };

        // The start resolves with the session id Claude assigns. A turn that ends
        // before announcing one is handed to the lifecycle as its first event.
        let mut events = turn.events;
        let (claude_session_id, pending) = match events.recv().await {
            Some(ConversationEvent::SessionCreated { claude_session_id }) => {
                lifecycle.on_session_created(claude_session_id.clone()).await;
                (Some(claude_session_id), None)
            }
            early => (turn.claude_session_id, Some(early)),
        };
        tokio::spawn(lifecycle.drive(events, pending));

        Ok(RunStarted {
            agent_run,
            conversation,
            claude_session_id,
        })
    }

    /// First running or pending run of the task, if any.
    pub async fn get_running_agent_for_task(&self, task_id: i64) -> AgentRunResult<Option<AgentRun>> {
        let runs = self.store.agent_runs_for_task(task_id).await?;
        Ok(runs.into_iter().find(|run| run.status.is_active()))
    }

    /// Mark every running/pending run of the task as completed and return how many changed.
    ///
    /// Only bookkeeping changes; a CLI process still attached to one of those runs keeps going.
    /// No chaining follows.
    pub async fn force_complete_running_agents(&self, task_id: i64) -> AgentRunResult<usize> {
        let count = self.store.force_complete_agent_runs(task_id).await?;
        tracing::info!(task_id, count, "Force-completed running agents");
        Ok(count)
    }

    /// Start `next` after `completed` finished, unless the workflow is done or another run is active.
    async fn chain_next_phase(
        &self,
        task_id: i64,
        completed: AgentType,
        next: AgentType,
        options: RunOptions,
    ) {
        // Re-read: the user or the reviewer may have closed the workflow during the turn.
        let task = match self.store.get_task(task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                tracing::debug!(task_id, "Task deleted during run, not chaining");
                return;
            }
            Err(e) => {
                tracing::warn!(task_id, "Failed to reload task before chaining: {}", e);
                return;
            }
        };
        if task.workflow_complete {
            tracing::info!(task_id, agent_type = %completed, "Workflow complete, stopping chain");
            return;
        }

        match self.get_running_agent_for_task(task_id).await {
            Ok(Some(active)) => {
                tracing::info!(
                    task_id,
                    active_run_id = active.id,
                    active_agent_type = %active.agent_type,
                    "Another agent is already running, not chaining"
                );
                return;
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(task_id, "Failed to check running agents before chaining: {}", e);
                return;
            }
        }

        tracing::info!(
            task_id,
            from = %completed,
            to = %next,
            delay_ms = self.chain_delay.as_millis() as u64,
            "Chaining next agent phase"
        );
        tokio::time::sleep(self.chain_delay).await;

        if let Err(e) = self.start_agent_run(task_id, next, options).await {
            tracing::error!(task_id, agent_type = %next, "Chained agent run failed to start: {}", e);
            self.record_failed_start(task_id, next).await;
        }
    }

    /// Leave a `failed` run behind so a broken chain shows up in the task's history.
    async fn record_failed_start(&self, task_id: i64, agent_type: AgentType) {
        let result = async {
            let run = self.store.create_agent_run(task_id, agent_type, None).await?;
            self.store
                .update_agent_run_status(run.id, AgentRunStatus::Failed)
                .await
        }
        .await;
        if let Err(e) = result {
            tracing::error!(task_id, agent_type = %agent_type, "Failed to record failed chain start: {}", e);
        }
    }
}

/// Follows one conversation turn to its end.
struct RunLifecycle {
    runner: AgentRunner,
    task_id: i64,
    task_title: String,
    agent_type: AgentType,
    run_id: i64,
    conversation_id: i64,
    options: RunOptions,
}

impl RunLifecycle {
    /// `pending` is an event already taken off the channel (`Some(None)` if it had closed).
    async fn drive(
        self,
        mut events: mpsc::Receiver<ConversationEvent>,
        mut pending: Option<Option<ConversationEvent>>,
    ) {
        let mut had_error = None;
        loop {
            let event = match pending.take() {
                Some(event) => event,
                None => events.recv().await,
            };
            match event {
                Some(ConversationEvent::SessionCreated { claude_session_id }) => {
                    self.on_session_created(claude_session_id).await;
                }
                Some(ConversationEvent::StreamingComplete { had_error: err, .. }) => {
                    had_error = Some(err);
                    break;
                }
                None => break,
            }
        }

        let had_error = had_error.unwrap_or_else(|| {
            tracing::warn!(
                task_id = self.task_id,
                conversation_id = self.conversation_id,
                "Conversation ended without a completion event"
            );
            true
        });
        self.on_streaming_complete(had_error).await;
    }

    async fn on_session_created(&self, claude_session_id: String) {
        if let Err(e) = self
            .runner
            .store
            .update_claude_session_id(self.conversation_id, &claude_session_id)
            .await
        {
            tracing::warn!(
                conversation_id = self.conversation_id,
                "Failed to store Claude session id: {}",
                e
            );
        }

        self.options.emit(
            self.task_id,
            TaskEvent::StreamingStarted {
                task_id: self.task_id,
                conversation_id: self.conversation_id,
                claude_session_id,
            },
        );
    }

    async fn on_streaming_complete(self, had_error: bool) {
        let status = if had_error {
            AgentRunStatus::Failed
        } else {
            AgentRunStatus::Completed
        };
        if let Err(e) = self
            .runner
            .store
            .update_agent_run_status(self.run_id, status)
            .await
        {
            tracing::error!(run_id = self.run_id, "Failed to update agent run status: {}", e);
        }
        tracing::info!(
            task_id = self.task_id,
            agent_run_id = self.run_id,
            agent_type = %self.agent_type,
            status = %status,
            "Agent run finished"
        );

        self.options.emit(
            self.task_id,
            TaskEvent::StreamingEnded {
                task_id: self.task_id,
                conversation_id: self.conversation_id,
            },
        );

        if let Some(user_id) = self.options.user_id.as_deref() {
            self.notify_user(user_id).await;
        }

        if had_error {
            return;
        }
        if let Some(next) = self.agent_type.next_in_chain() {
            self.runner
                .chain_next_phase(self.task_id, self.agent_type, next, self.options)
                .await;
        }
    }

    async fn notify_user(&self, user_id: &str) {
        let workflow_complete = match self.runner.store.get_task(self.task_id).await {
            Ok(Some(task)) => task.workflow_complete,
            _ => false,
        };
        let notice = CompletionNotice {
            agent_type: self.agent_type,
            workflow_complete,
        };

        if let Err(e) = self
            .runner
            .notifier
            .notify_claude_complete(
                user_id,
                &self.task_title,
                self.task_id,
                self.conversation_id,
                notice,
            )
            .await
        {
            tracing::warn!(user_id, task_id = self.task_id, "Completion notification failed: {}", e);
        }
        if let Err(e) = self.runner.notifier.update_user_badge(user_id).await {
            tracing::warn!(user_id, "Badge update failed: {}", e);
        }
    }
}
