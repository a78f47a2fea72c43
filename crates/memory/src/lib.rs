//! Multi-layer memory: raw conversation log, markdown tiers (daily,
//! session, long-term, SOUL), a BM25 + vector hybrid search index, and
//! threshold-triggered compaction into durable summaries.

pub mod bm25;
pub mod chunking;
pub mod embedder;
pub mod index;
pub mod store;
pub mod types;
pub mod watch;

pub use embedder::{resolve_embedder, Embedder};
pub use store::MemoryStore;
pub use types::{
    Actor, Chunk, LongTermNote, RawEntry, SearchHit, SearchMode, SearchQuery, SourceType,
    WorkingMemoryContext,
};
pub use watch::MemoryWatcher;
