//! # Claude UI
//!
//! Backend for a task board that drives Claude Code agents through a
//! plan / implement / review workflow.
//!
//! ## Architecture
//!
//! ```text
//!   dashboard ──HTTP──▶ api ──▶ agent_runner ──▶ claude (ConversationAdapter)
//!       ▲                │           │                    │
//!       │                ▼           ▼                    │ stream-json
//!       └──WebSocket── events ◀──────┴────────────────────┘
//!                        db (SQLite)   docs (<repo>/.claude-ui/*.md)
//! ```
//!
//! ## Run flow
//! 1. A phase is requested for a task (`planification`, `implementation` or `review`)
//! 2. The runner records an agent run and a conversation, then starts a Claude turn
//!    with the project and task documentation as extra system context
//! 3. Output is relayed to WebSocket subscribers while the turn streams
//! 4. When the turn ends the run is marked completed/failed, the user is notified,
//!    and implementation/review chain into each other until the workflow is complete
//!
//! ## Modules
//! - `agent_runner`: phase orchestration and chaining
//! - `claude`: conversation adapter and the Claude CLI implementation
//! - `db`: SQLite persistence
//! - `docs`: per-repository markdown documentation
//! - `api`: HTTP and WebSocket surface

pub mod agent_runner;
pub mod api;
pub mod claude;
pub mod config;
pub mod db;
pub mod docs;
pub mod events;
pub mod notify;
pub mod prompts;

pub use agent_runner::{AgentRunError, AgentRunner, RunOptions};
pub use config::Config;
pub use db::Database;
