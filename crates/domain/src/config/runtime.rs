use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Orchestrator limits
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "d_prompt_timeout_ms")]
    pub prompt_timeout_ms: u64,
    #[serde(default = "d_max_prompt_retries")]
    pub max_prompt_retries: u32,
    #[serde(default = "d_max_queue_depth")]
    pub max_queue_depth: usize,
    #[serde(default = "d_max_overflow_compaction_attempts")]
    pub max_overflow_compaction_attempts: u32,
    #[serde(default = "d_max_session_lanes")]
    pub max_session_lanes: usize,
    #[serde(default = "d_max_session_idle_minutes")]
    pub max_session_idle_minutes: u64,
    #[serde(default = "d_raw_compaction_threshold")]
    pub raw_compaction_threshold: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            prompt_timeout_ms: d_prompt_timeout_ms(),
            max_prompt_retries: d_max_prompt_retries(),
            max_queue_depth: d_max_queue_depth(),
            max_overflow_compaction_attempts: d_max_overflow_compaction_attempts(),
            max_session_lanes: d_max_session_lanes(),
            max_session_idle_minutes: d_max_session_idle_minutes(),
            raw_compaction_threshold: d_raw_compaction_threshold(),
        }
    }
}

fn d_prompt_timeout_ms() -> u64 {
    120_000
}
fn d_max_prompt_retries() -> u32 {
    3
}
fn d_max_queue_depth() -> usize {
    64
}
fn d_max_overflow_compaction_attempts() -> u32 {
    2
}
fn d_max_session_lanes() -> usize {
    128
}
fn d_max_session_idle_minutes() -> u64 {
    60
}
fn d_raw_compaction_threshold() -> usize {
    120
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = RuntimeConfig::default();
        assert_eq!(cfg.max_overflow_compaction_attempts, 2);
        assert_eq!(cfg.raw_compaction_threshold, 120);
    }
}
