//! Conversation adapter for the Claude Code runtime.
//!
//! The agent runner never talks to the CLI directly. It hands a
//! [`ConversationRequest`] to a [`ConversationAdapter`] and gets back a
//! [`ConversationTurn`] whose event channel reports, in order:
//!
//! 1. at most one [`ConversationEvent::SessionCreated`] once Claude assigns a session id
//! 2. exactly one [`ConversationEvent::StreamingComplete`] when the turn ends
//!
//! Everything the agent actually does (tool calls, edits, tests) happens
//! inside the external process.

mod cli;
pub mod stream;

pub use cli::ClaudeCli;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::events::Broadcast;

#[derive(Debug, Error)]
pub enum ClaudeError {
    #[error("Failed to spawn Claude CLI '{binary}': {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Claude CLI I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Claude CLI {0} pipe unavailable")]
    MissingPipe(&'static str),
}

/// Tool permission mode passed to the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionMode {
    Default,
    AcceptEdits,
    Plan,
    /// Every tool call is allowed without prompting.
    BypassPermissions,
}

impl PermissionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::AcceptEdits => "acceptEdits",
            Self::Plan => "plan",
            Self::BypassPermissions => "bypassPermissions",
        }
    }
}

/// Everything needed to start (or resume) one conversation turn.
#[derive(Clone)]
pub struct ConversationRequest {
    pub task_id: i64,
    /// Local conversation row the turn belongs to.
    pub conversation_id: i64,
    pub message: String,
    /// Repository the agent works in.
    pub working_dir: PathBuf,
    /// Extra context appended to Claude's system prompt.
    pub custom_system_prompt: Option<String>,
    pub permission_mode: PermissionMode,
    /// Continue an existing Claude session instead of starting a fresh one.
    pub resume_session_id: Option<String>,
    pub broadcast: Option<Arc<dyn Broadcast>>,
    pub user_id: Option<String>,
}

impl std::fmt::Debug for ConversationRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationRequest")
            .field("task_id", &self.task_id)
            .field("conversation_id", &self.conversation_id)
            .field("working_dir", &self.working_dir)
            .field("permission_mode", &self.permission_mode)
            .field("resume_session_id", &self.resume_session_id)
            .field("user_id", &self.user_id)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversationEvent {
    SessionCreated {
        claude_session_id: String,
    },
    StreamingComplete {
        claude_session_id: Option<String>,
        had_error: bool,
    },
}

/// A turn in flight.
#[derive(Debug)]
pub struct ConversationTurn {
    pub conversation_id: i64,
    /// Session id known at start time (only when resuming).
    pub claude_session_id: Option<String>,
    pub events: mpsc::Receiver<ConversationEvent>,
}

#[async_trait]
pub trait ConversationAdapter: Send + Sync {
    /// Start the turn. Returns once the turn is underway; completion is reported on the event channel.
    async fn start_conversation(
        &self,
        request: ConversationRequest,
    ) -> Result<ConversationTurn, ClaudeError>;
}

pub type SharedAdapter = Arc<dyn ConversationAdapter>;
