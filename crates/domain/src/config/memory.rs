use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Memory tuning
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingProviderKind {
    Auto,
    OpenAi,
    Gemini,
    Local,
}

impl Default for EmbeddingProviderKind {
    fn default() -> Self {
        Self::Auto
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default)]
    pub provider: EmbeddingProviderKind,
    #[serde(default = "d_embed_model")]
    pub model: String,
    #[serde(default = "d_dims")]
    pub dims: usize,
    #[serde(default = "d_batch_size")]
    pub batch_size: usize,
    #[serde(default = "d_true")]
    pub cache_enabled: bool,
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: EmbeddingProviderKind::Auto,
            model: d_embed_model(),
            dims: d_dims(),
            batch_size: d_batch_size(),
            cache_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "d_vector_weight")]
    pub vector_weight: f64,
    #[serde(default = "d_text_weight")]
    pub text_weight: f64,
    #[serde(default = "d_min_score")]
    pub min_score: f64,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            vector_weight: d_vector_weight(),
            text_weight: d_text_weight(),
            min_score: d_min_score(),
        }
    }
}

impl SearchConfig {
    /// Normalize `vector_weight + text_weight == 1`, preserving their ratio.
    /// Falls back to the spec defaults (0.65/0.35) if both are zero.
    pub fn normalized(&self) -> (f64, f64) {
        let sum = self.vector_weight + self.text_weight;
        if sum <= 0.0 {
            return (0.65, 0.35);
        }
        (self.vector_weight / sum, self.text_weight / sum)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default)]
    pub vector: VectorConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default = "d_true")]
    pub session_memory_enabled: bool,
    #[serde(default)]
    pub extra_paths: Vec<String>,
    /// Case-insensitive substrings flagging a raw entry as an unloggable
    /// health-ping (spec.md §9 Open Question 1 — kept configurable).
    #[serde(default = "d_health_ping_patterns")]
    pub health_ping_patterns: Vec<String>,
    /// Case-insensitive substrings flagging a turn as important enough to
    /// survive into the pre-compaction flush and the soul journal.
    #[serde(default = "d_importance_patterns")]
    pub importance_patterns: Vec<String>,
    #[serde(default = "d_compaction_batch_size")]
    pub compaction_batch_size: usize,
    #[serde(default = "d_compaction_keep_recent")]
    pub compaction_keep_recent: usize,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            vector: VectorConfig::default(),
            search: SearchConfig::default(),
            session_memory_enabled: true,
            extra_paths: Vec::new(),
            health_ping_patterns: d_health_ping_patterns(),
            importance_patterns: d_importance_patterns(),
            compaction_batch_size: d_compaction_batch_size(),
            compaction_keep_recent: d_compaction_keep_recent(),
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_embed_model() -> String {
    "text-embedding-local".into()
}
fn d_dims() -> usize {
    256
}
fn d_batch_size() -> usize {
    16
}
fn d_vector_weight() -> f64 {
    0.65
}
fn d_text_weight() -> f64 {
    0.35
}
fn d_min_score() -> f64 {
    0.12
}
fn d_health_ping_patterns() -> Vec<String> {
    vec!["ping".into(), "heartbeat check".into(), "are you there".into()]
}
fn d_importance_patterns() -> Vec<String> {
    vec![
        "remember".into(),
        "important".into(),
        "never forget".into(),
        "always".into(),
        "promise".into(),
        "commitment".into(),
    ]
}
fn d_compaction_batch_size() -> usize {
    250
}
fn d_compaction_keep_recent() -> usize {
    80
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_weights_normalize() {
        let cfg = SearchConfig {
            vector_weight: 0.65,
            text_weight: 0.35,
            min_score: 0.12,
        };
        let (v, t) = cfg.normalized();
        assert!((v - 0.65).abs() < 1e-9);
        assert!((t - 0.35).abs() < 1e-9);
    }

    #[test]
    fn search_weights_normalize_arbitrary_ratio() {
        let cfg = SearchConfig {
            vector_weight: 2.0,
            text_weight: 2.0,
            min_score: 0.12,
        };
        let (v, t) = cfg.normalized();
        assert!((v - 0.5).abs() < 1e-9);
        assert!((t - 0.5).abs() < 1e-9);
    }

    #[test]
    fn search_weights_fallback_when_zero() {
        let cfg = SearchConfig {
            vector_weight: 0.0,
            text_weight: 0.0,
            min_score: 0.12,
        };
        assert_eq!(cfg.normalized(), (0.65, 0.35));
    }
}
