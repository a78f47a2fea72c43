use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    User,
    Assistant,
}

/// A single raw conversation turn, appended to `memory/raw.jsonl`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEntry {
    pub id: uuid::Uuid,
    pub actor: Actor,
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub session_key: Option<String>,
}

/// A long-term note, appended to `memory/compact.jsonl` and mirrored
/// into the main long-term markdown file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LongTermNote {
    pub id: uuid::Uuid,
    pub title: String,
    pub content: String,
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub compacted_range: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    MemoryMain,
    MemoryDaily,
    Session,
    Extra,
    Soul,
    Compact,
    Raw,
}

impl SourceType {
    /// Additive score boost folded into the combined hybrid-search score.
    pub fn source_boost(self) -> f64 {
        match self {
            SourceType::MemoryMain => 0.05,
            SourceType::Soul => 0.04,
            SourceType::MemoryDaily => 0.02,
            SourceType::Session => 0.02,
            SourceType::Compact => 0.01,
            SourceType::Extra => 0.0,
            SourceType::Raw => 0.0,
        }
    }
}

/// A derived, indexable unit of text. Rebuilt from markdown on demand;
/// the embedding cache (keyed by `content_hash`) avoids recomputing
/// vectors for unchanged text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub content_hash: String,
    pub text: String,
    pub source_path: String,
    pub source_type: SourceType,
    pub start_line: usize,
    pub end_line: usize,
    /// Session key owning this chunk, when `source_type == Session`.
    #[serde(default)]
    pub session_key: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMode {
    Global,
    SessionStrict,
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub limit: usize,
    pub session_key: Option<String>,
    pub mode: SearchMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    pub score: f64,
    pub bm25: f64,
    pub cosine: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct WorkingMemoryContext {
    pub main_excerpts: Vec<String>,
    pub soul_excerpts: Vec<String>,
    pub daily_excerpts: Vec<String>,
}
