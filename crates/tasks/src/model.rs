//! Task data model: a single `Task` entity covers both one-shot commands
//! and recurring schedules.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Command,
    Schedule,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Completed,
    Failed,
    Cancelled,
    Stopped,
}

impl TaskStatus {
    /// Schedules never reach a terminal status except `cancelled`; one-shot
    /// commands are terminal at completed/failed/cancelled/stopped.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled | TaskStatus::Stopped
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub name: Option<String>,
    pub task_type: TaskType,
    pub command: String,
    pub workdir: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_run: Option<DateTime<Utc>>,
    pub next_run: Option<DateTime<Utc>>,
    /// Schedules only.
    pub interval_ms: Option<u64>,
    /// Set on the per-tick command `Task`s a schedule spawns.
    pub parent_task_id: Option<Uuid>,
    pub exit_code: Option<i32>,
    pub pid: Option<u32>,
    pub error: Option<String>,
    pub log_path: Option<String>,
    pub tail: VecDeque<String>,
    pub attempts: u32,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
    pub background: bool,
    /// When queued with a future retry, the dispatch loop won't launch it
    /// before this instant.
    #[serde(default)]
    pub retry_at: Option<DateTime<Utc>>,
}

impl Task {
    pub fn push_tail_line(&mut self, line: String, max_lines: usize) {
        self.tail.push_back(line);
        while self.tail.len() > max_lines {
            self.tail.pop_front();
        }
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, Clone)]
pub struct RunCommandRequest {
    pub command: String,
    pub name: Option<String>,
    pub workdir: Option<String>,
    pub background: bool,
    pub dedupe_running: bool,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone)]
pub struct ScheduleCommandRequest {
    pub command: String,
    pub name: Option<String>,
    pub workdir: Option<String>,
    pub interval_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub timeout_ms: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskHealth {
    pub running: usize,
    pub queued: usize,
    pub schedules: usize,
    pub finished: usize,
    pub max_concurrent: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueuePreview {
    pub depth: usize,
    pub preview: Vec<Uuid>,
}

#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("command must not be empty")]
    MissingCommand,
    #[error("intervalMs must be >= 1000")]
    BadInterval,
}
