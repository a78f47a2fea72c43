use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Autonomous loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AutonomousConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "d_goal")]
    pub goal: String,
    /// Tick interval; clamped to >=5s by the loop itself.
    #[serde(default = "d_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "d_skip_when_queue_above")]
    pub skip_when_queue_above: usize,
    #[serde(default = "d_max_consecutive_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default = "d_stale_pending_hours")]
    pub stale_pending_hours: u64,
    #[serde(default = "d_stale_in_progress_idle_hours")]
    pub stale_in_progress_idle_hours: u64,
}

impl Default for AutonomousConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            goal: d_goal(),
            interval_ms: d_interval_ms(),
            skip_when_queue_above: d_skip_when_queue_above(),
            max_consecutive_failures: d_max_consecutive_failures(),
            stale_pending_hours: d_stale_pending_hours(),
            stale_in_progress_idle_hours: d_stale_in_progress_idle_hours(),
        }
    }
}

fn d_goal() -> String {
    "Review open objectives and make useful progress.".into()
}
fn d_interval_ms() -> u64 {
    300_000
}
fn d_skip_when_queue_above() -> usize {
    8
}
fn d_max_consecutive_failures() -> u32 {
    5
}
fn d_stale_pending_hours() -> u64 {
    72
}
fn d_stale_in_progress_idle_hours() -> u64 {
    24
}

impl AutonomousConfig {
    /// Effective tick interval, floored at 5s per the runtime spec.
    pub fn effective_interval_ms(&self) -> u64 {
        self.interval_ms.max(5_000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interval_floored_at_5s() {
        let mut cfg = AutonomousConfig::default();
        cfg.interval_ms = 100;
        assert_eq!(cfg.effective_interval_ms(), 5_000);
    }

    #[test]
    fn disabled_by_default() {
        assert!(!AutonomousConfig::default().enabled);
    }
}
