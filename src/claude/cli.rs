//! Adapter that runs each turn as a `claude --print` subprocess.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::sync::mpsc;

use super::stream::parse_line;
use super::{ClaudeError, ConversationAdapter, ConversationEvent, ConversationRequest, ConversationTurn};
use crate::events::{Broadcast, TaskEvent};

/// Lines of stderr kept for the failure log.
const STDERR_TAIL_LINES: usize = 20;

/// Runs conversations through the Claude Code CLI.
#[derive(Debug, Clone)]
pub struct ClaudeCli {
    binary: PathBuf,
}

impl ClaudeCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Command-line arguments for a request. The message itself goes to stdin.
    pub fn build_args(request: &ConversationRequest) -> Vec<String> {
        let mut args = vec![
            "--print".to_string(),
            "--output-format".to_string(),
            "stream-json".to_string(),
            "--verbose".to_string(),
            "--permission-mode".to_string(),
            request.permission_mode.as_str().to_string(),
        ];
        if let Some(prompt) = request
            .custom_system_prompt
            .as_deref()
            .filter(|p| !p.trim().is_empty())
        {
            args.push("--append-system-prompt".to_string());
            args.push(prompt.to_string());
        }
        if let Some(session_id) = &request.resume_session_id {
            args.push("--resume".to_string());
            args.push(session_id.clone());
        }
        args
    }
}

#[async_trait]
impl ConversationAdapter for ClaudeCli {
    async fn start_conversation(
        &self,
        request: ConversationRequest,
    ) -> Result<ConversationTurn, ClaudeError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(Self::build_args(&request))
            .current_dir(&request.working_dir)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ClaudeError::Spawn {
            binary: self.binary.display().to_string(),
            source,
        })?;

        tracing::info!(
            task_id = request.task_id,
            conversation_id = request.conversation_id,
            pid = child.id().unwrap_or(0),
            resume = request.resume_session_id.is_some(),
            "Claude CLI started"
        );

        let mut stdin = child.stdin.take().ok_or(ClaudeError::MissingPipe("stdin"))?;
        stdin.write_all(request.message.as_bytes()).await?;
        stdin.shutdown().await?;
        drop(stdin);

        let stdout = child.stdout.take().ok_or(ClaudeError::MissingPipe("stdout"))?;
        let stderr = child.stderr.take().ok_or(ClaudeError::MissingPipe("stderr"))?;

        let (tx, rx) = mpsc::channel(8);
        let relay = OutputRelay {
            task_id: request.task_id,
            conversation_id: request.conversation_id,
            session_id: request.resume_session_id.clone(),
            broadcast: request.broadcast.clone(),
            events: tx,
        };
        tokio::spawn(relay.run(child, stdout, stderr));

        Ok(ConversationTurn {
            conversation_id: request.conversation_id,
            claude_session_id: request.resume_session_id,
            events: rx,
        })
    }
}

/// Forwards CLI output to the dashboard and reports the turn lifecycle.
struct OutputRelay {
    task_id: i64,
    conversation_id: i64,
    session_id: Option<String>,
    broadcast: Option<Arc<dyn Broadcast>>,
    events: mpsc::Sender<ConversationEvent>,
}

impl OutputRelay {
    async fn run(mut self, mut child: Child, stdout: ChildStdout, stderr: ChildStderr) {
        let stderr_task = tokio::spawn(collect_stderr_tail(stderr));

        let mut had_error = false;
        let mut announced = false;
        let mut lines = BufReader::new(stdout).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(task_id = self.task_id, "Failed reading Claude output: {}", e);
                    had_error = true;
                    break;
                }
            };
            let Some((parsed, value)) = parse_line(&line) else {
                continue;
            };

            if let Some(session_id) = parsed.session_id.as_ref().filter(|s| !s.is_empty()) {
                if !announced {
                    announced = true;
                    self.session_id = Some(session_id.clone());
                    let _ = self
                        .events
                        .send(ConversationEvent::SessionCreated {
                            claude_session_id: session_id.clone(),
                        })
                        .await;
                }
            }
            if parsed.is_failed_result() {
                had_error = true;
            }

            if let Some(broadcast) = &self.broadcast {
                broadcast.broadcast(
                    self.task_id,
                    TaskEvent::ClaudeOutput {
                        task_id: self.task_id,
                        conversation_id: self.conversation_id,
                        data: value,
                    },
                );
            }
        }

        match child.wait().await {
            Ok(status) if status.success() => {}
            Ok(status) => {
                had_error = true;
                let tail = stderr_task.await.unwrap_or_default();
                tracing::warn!(
                    task_id = self.task_id,
                    conversation_id = self.conversation_id,
                    "Claude CLI exited with {}: {}",
                    status,
                    tail
                );
            }
            Err(e) => {
                had_error = true;
                tracing::error!(task_id = self.task_id, "Failed to wait for Claude CLI: {}", e);
            }
        }

        tracing::info!(
            task_id = self.task_id,
            conversation_id = self.conversation_id,
            had_error,
            "Claude turn finished"
        );

        let _ = self
            .events
            .send(ConversationEvent::StreamingComplete {
                claude_session_id: self.session_id.take(),
                had_error,
            })
            .await;
    }
}

async fn collect_stderr_tail(stderr: ChildStderr) -> String {
    let mut tail: VecDeque<String> = VecDeque::with_capacity(STDERR_TAIL_LINES);
    let mut lines = BufReader::new(stderr).lines();
    while let Ok(Some(line)) = lines.next_line().await {
        if tail.len() == STDERR_TAIL_LINES {
            tail.pop_front();
        }
        tail.push_back(line);
    }
    Vec::from(tail).join("\n")
}
