//! Task events pushed to dashboard clients over the WebSocket relay.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Capacity of the broadcast ring; slow subscribers skip ahead instead of blocking.
const EVENT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TaskEvent {
    /// Claude assigned a session id to the conversation.
    StreamingStarted {
        task_id: i64,
        conversation_id: i64,
        claude_session_id: String,
    },
    /// The streaming turn ended (successfully or not).
    StreamingEnded { task_id: i64, conversation_id: i64 },
    /// One raw stream-json message from the Claude CLI.
    ClaudeOutput {
        task_id: i64,
        conversation_id: i64,
        data: serde_json::Value,
    },
}

/// A task event along with the task it belongs to, as carried by the hub.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub task_id: i64,
    pub event: TaskEvent,
}

/// Sink for task events.
pub trait Broadcast: Send + Sync {
    fn broadcast(&self, task_id: i64, event: TaskEvent);
}

/// Fan-out hub that WebSocket connections subscribe to.
#[derive(Debug, Clone)]
pub struct EventHub {
    tx: broadcast::Sender<Envelope>,
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new()
    }
}

impl EventHub {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Envelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Broadcast for EventHub {
    fn broadcast(&self, task_id: i64, event: TaskEvent) {
        // No subscribers is the normal state when no dashboard is open.
        let _ = self.tx.send(Envelope { task_id, event });
    }
}
