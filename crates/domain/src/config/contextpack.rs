use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Context pack subsystem
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextpackConfig {
    #[serde(default = "d_max_per_file_chars")]
    pub max_per_file_chars: usize,
    #[serde(default = "d_total_max_chars")]
    pub total_max_chars: usize,
    #[serde(default = "d_core_context_summarize_threshold")]
    pub core_context_summarize_threshold: usize,
    #[serde(default = "d_summary_cache_capacity")]
    pub summary_cache_capacity: usize,
}

impl Default for ContextpackConfig {
    fn default() -> Self {
        Self {
            max_per_file_chars: d_max_per_file_chars(),
            total_max_chars: d_total_max_chars(),
            core_context_summarize_threshold: d_core_context_summarize_threshold(),
            summary_cache_capacity: d_summary_cache_capacity(),
        }
    }
}

fn d_max_per_file_chars() -> usize {
    4_000
}
fn d_total_max_chars() -> usize {
    20_000
}
fn d_core_context_summarize_threshold() -> usize {
    12_000
}
fn d_summary_cache_capacity() -> usize {
    64
}
