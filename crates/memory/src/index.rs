//! On-disk knowledge index and embedding cache.
//!
//! The index is a superset mirror of in-memory state (invariant (c) of
//! the memory data model): every successful sync persists it before the
//! in-memory view is considered current. The embedding cache only grows
//! except during an explicit rebuild, so identical text anywhere in the
//! corpus reuses a previously computed vector.

use std::collections::HashMap;
use std::path::PathBuf;

use nxa_domain::error::Result;
use serde::{Deserialize, Serialize};

use crate::embedder::Embedder;
use crate::types::{Chunk, SourceType};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub content_hash: String,
    pub text: String,
    pub path: String,
    pub source_type: SourceType,
    pub start_line: usize,
    pub end_line: usize,
    pub session_key: Option<String>,
    pub vector: Vec<f32>,
}

pub struct KnowledgeIndex {
    index_path: PathBuf,
    cache_path: PathBuf,
    entries: Vec<IndexEntry>,
    cache: HashMap<String, Vec<f32>>,
}

impl KnowledgeIndex {
    pub fn load_at(index_path: PathBuf, cache_path: PathBuf) -> Result<Self> {
        let entries: Vec<IndexEntry> = nxa_fsutil::read_json_or_default(&index_path)?;
        let cache: HashMap<String, Vec<f32>> = nxa_fsutil::read_json_or_default(&cache_path)?;
        Ok(Self {
            index_path,
            cache_path,
            entries,
            cache,
        })
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Rebuild the index from freshly chunked markdown, reusing cached
    /// vectors for any chunk whose hash is already known and only
    /// sending genuinely new hashes to the embedding provider.
    pub async fn sync(&mut self, chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<()> {
        let mut to_embed: Vec<String> = Vec::new();
        let mut to_embed_hashes: Vec<String> = Vec::new();

        for chunk in &chunks {
            if !self.cache.contains_key(&chunk.content_hash) {
                to_embed.push(chunk.text.clone());
                to_embed_hashes.push(chunk.content_hash.clone());
            }
        }

        if !to_embed.is_empty() {
            let vectors = embedder.embed(&to_embed).await?;
            for (hash, vector) in to_embed_hashes.into_iter().zip(vectors) {
                self.cache.insert(hash, vector);
            }
        }

        self.entries = chunks
            .into_iter()
            .map(|chunk| {
                let vector = self.cache.get(&chunk.content_hash).cloned().unwrap_or_default();
                IndexEntry {
                    content_hash: chunk.content_hash,
                    text: chunk.text,
                    path: chunk.source_path,
                    source_type: chunk.source_type,
                    start_line: chunk.start_line,
                    end_line: chunk.end_line,
                    session_key: chunk.session_key,
                    vector,
                }
            })
            .collect();

        self.persist().await
    }

    /// Explicit rebuild: clear the embedding cache so every chunk is
    /// re-sent to the provider (e.g. after a model/dimension change).
    pub async fn rebuild(&mut self, chunks: Vec<Chunk>, embedder: &dyn Embedder) -> Result<()> {
        self.cache.clear();
        self.sync(chunks, embedder).await
    }

    async fn persist(&self) -> Result<()> {
        nxa_fsutil::write_json_atomic_async(self.index_path.clone(), &self.entries).await?;
        nxa_fsutil::write_json_atomic_async(self.cache_path.clone(), &self.cache).await?;
        Ok(())
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::content_hash;
    use crate::embedder::LocalHashEmbedder;

    fn chunk(text: &str, path: &str) -> Chunk {
        Chunk {
            content_hash: content_hash(text),
            text: text.to_string(),
            source_path: path.to_string(),
            source_type: SourceType::MemoryMain,
            start_line: 1,
            end_line: 1,
            session_key: None,
        }
    }

    fn load(dir: &std::path::Path) -> KnowledgeIndex {
        KnowledgeIndex::load_at(dir.join("memory-index.json"), dir.join("embedding-cache.json")).unwrap()
    }

    #[tokio::test]
    async fn sync_populates_entries_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = load(dir.path());
        let embedder = LocalHashEmbedder::new(16);

        index
            .sync(vec![chunk("hello world", "a.md")], &embedder)
            .await
            .unwrap();

        assert_eq!(index.entries().len(), 1);
        assert_eq!(index.cache_len(), 1);
    }

    #[tokio::test]
    async fn duplicate_hash_across_files_reuses_cached_vector() {
        let dir = tempfile::tempdir().unwrap();
        let mut index = load(dir.path());
        let embedder = LocalHashEmbedder::new(16);

        index
            .sync(
                vec![chunk("same text", "a.md"), chunk("same text", "b.md")],
                &embedder,
            )
            .await
            .unwrap();

        assert_eq!(index.cache_len(), 1);
        assert_eq!(index.entries().len(), 2);
        assert_eq!(index.entries()[0].vector, index.entries()[1].vector);
    }

    #[tokio::test]
    async fn reload_recovers_persisted_cache() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut index = load(dir.path());
            let embedder = LocalHashEmbedder::new(16);
            index.sync(vec![chunk("persisted", "a.md")], &embedder).await.unwrap();
        }
        let reloaded = load(dir.path());
        assert_eq!(reloaded.cache_len(), 1);
        assert_eq!(reloaded.entries().len(), 1);
    }
}
