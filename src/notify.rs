//! Completion notifications for dashboard users.
//!
//! When an agent turn ends the runner tells the user (if one started the run)
//! and refreshes their badge. Delivery is best effort: failures are logged by
//! the caller and never affect the run itself.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::json;

use crate::db::{AgentType, Database};

/// Details attached to a completion notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CompletionNotice {
    pub agent_type: AgentType,
    pub workflow_complete: bool,
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify_claude_complete(
        &self,
        user_id: &str,
        task_title: &str,
        task_id: i64,
        conversation_id: i64,
        notice: CompletionNotice,
    ) -> anyhow::Result<()>;

    async fn update_user_badge(&self, user_id: &str) -> anyhow::Result<()>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Notifier that only logs. Used when no push endpoint is configured.
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify_claude_complete(
        &self,
        user_id: &str,
        task_title: &str,
        task_id: i64,
        conversation_id: i64,
        notice: CompletionNotice,
    ) -> anyhow::Result<()> {
        tracing::info!(
            user_id,
            task_id,
            conversation_id,
            agent_type = %notice.agent_type,
            workflow_complete = notice.workflow_complete,
            "Claude finished working on '{}'",
            task_title
        );
        Ok(())
    }

    async fn update_user_badge(&self, user_id: &str) -> anyhow::Result<()> {
        tracing::debug!(user_id, "Badge refresh requested");
        Ok(())
    }
}

/// Posts notifications as JSON to a push gateway.
///
/// Payloads:
/// - `{"type": "claude-complete", "user_id", "title", "body", "task_id", "conversation_id", "agent_type", "workflow_complete"}`
/// - `{"type": "badge", "user_id", "count"}` where `count` is the number of tasks waiting on the user
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    db: Database,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, db: Database) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            db,
        }
    }

    async fn post(&self, payload: serde_json::Value) -> anyhow::Result<()> {
        let resp = self.client.post(&self.url).json(&payload).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            anyhow::bail!("Push gateway returned {}: {}", status, text);
        }
        Ok(())
    }
}

/// Title and body shown to the user when a phase finishes.
pub fn completion_message(task_title: &str, notice: CompletionNotice) -> (String, String) {
    let title = format!("Claude finished: {}", task_title);
    let body = if notice.workflow_complete {
        format!("{} phase done. Workflow marked complete.", capitalize(notice.agent_type.as_str()))
    } else {
        format!("{} phase done.", capitalize(notice.agent_type.as_str()))
    };
    (title, body)
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify_claude_complete(
        &self,
        user_id: &str,
        task_title: &str,
        task_id: i64,
        conversation_id: i64,
        notice: CompletionNotice,
    ) -> anyhow::Result<()> {
        let (title, body) = completion_message(task_title, notice);
        self.post(json!({
            "type": "claude-complete",
            "user_id": user_id,
            "title": title,
            "body": body,
            "task_id": task_id,
            "conversation_id": conversation_id,
            "agent_type": notice.agent_type,
            "workflow_complete": notice.workflow_complete,
        }))
        .await
    }

    async fn update_user_badge(&self, user_id: &str) -> anyhow::Result<()> {
        let count = self.db.count_tasks_awaiting_attention()?;
        self.post(json!({
            "type": "badge",
            "user_id": user_id,
            "count": count,
        }))
        .await
    }
}
