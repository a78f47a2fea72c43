use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Background task manager
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TasksConfig {
    #[serde(default = "d_max_concurrent_processes")]
    pub max_concurrent_processes: usize,
    #[serde(default = "d_task_retry_limit")]
    pub task_retry_limit: u32,
    #[serde(default = "d_task_retry_delay_ms")]
    pub task_retry_delay_ms: u64,
    #[serde(default = "d_max_stored_tasks")]
    pub max_stored_tasks: usize,
    #[serde(default = "d_max_finished_tasks")]
    pub max_finished_tasks: usize,
    #[serde(default = "d_tail_lines")]
    pub tail_lines: usize,
    #[serde(default = "d_persist_debounce_ms")]
    pub persist_debounce_ms: u64,
}

impl Default for TasksConfig {
    fn default() -> Self {
        Self {
            max_concurrent_processes: d_max_concurrent_processes(),
            task_retry_limit: d_task_retry_limit(),
            task_retry_delay_ms: d_task_retry_delay_ms(),
            max_stored_tasks: d_max_stored_tasks(),
            max_finished_tasks: d_max_finished_tasks(),
            tail_lines: d_tail_lines(),
            persist_debounce_ms: d_persist_debounce_ms(),
        }
    }
}

fn d_max_concurrent_processes() -> usize {
    4
}
fn d_task_retry_limit() -> u32 {
    3
}
fn d_task_retry_delay_ms() -> u64 {
    2_000
}
fn d_max_stored_tasks() -> usize {
    2_000
}
fn d_max_finished_tasks() -> usize {
    200
}
fn d_tail_lines() -> usize {
    120
}
fn d_persist_debounce_ms() -> u64 {
    250
}

impl TasksConfig {
    /// Clamp `maxRetries` per-command input to the spec's 0–20 range.
    pub fn clamp_max_retries(value: u32) -> u32 {
        value.min(20)
    }

    /// Clamp `retryDelayMs` per-command input to the spec's 250ms–1h range.
    pub fn clamp_retry_delay_ms(value: u64) -> u64 {
        value.clamp(250, 3_600_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retry_delay_floored_at_250ms() {
        assert_eq!(TasksConfig::clamp_retry_delay_ms(10), 250);
    }

    #[test]
    fn retry_delay_capped_at_1h() {
        assert_eq!(TasksConfig::clamp_retry_delay_ms(10_000_000), 3_600_000);
    }

    #[test]
    fn max_retries_capped_at_20() {
        assert_eq!(TasksConfig::clamp_max_retries(99), 20);
    }
}
