//! Multi-layer memory store: raw JSONL log, markdown tiers, chunked
//! knowledge index, hybrid search, and threshold-triggered compaction.

use chrono::{Duration as ChronoDuration, Utc};
use nxa_domain::config::{HomeLayout, MemoryConfig};
use nxa_domain::error::Result;
use parking_lot::RwLock;
use regex::RegexBuilder;
use uuid::Uuid;

use crate::bm25::{doc_stats, tokenize, Bm25Corpus};
use crate::chunking::{chunk_section_based, chunk_sliding_window};
use crate::embedder::{cosine_similarity, Embedder};
use crate::index::KnowledgeIndex;
use crate::types::{
    Actor, Chunk, LongTermNote, RawEntry, SearchHit, SearchMode, SearchQuery, SourceType,
    WorkingMemoryContext,
};

const DUPLICATE_WINDOW_HOURS: i64 = 6;

pub struct MemoryStore {
    layout: HomeLayout,
    config: MemoryConfig,
    embedder: Box<dyn Embedder>,
    raw: RwLock<Vec<RawEntry>>,
    index: tokio::sync::Mutex<KnowledgeIndex>,
    health_ping_re: regex::Regex,
    importance_re: regex::Regex,
}

impl MemoryStore {
    pub fn new(layout: HomeLayout, config: MemoryConfig, embedder: Box<dyn Embedder>) -> Result<Self> {
        let raw: Vec<RawEntry> = nxa_fsutil::read_jsonl(&layout.raw_jsonl())?;
        let index = KnowledgeIndex::load_at(layout.memory_index_json(), layout.embedding_cache_json())?;
        let health_ping_re = build_pattern_regex(&config.health_ping_patterns);
        let importance_re = build_pattern_regex(&config.importance_patterns);

        Ok(Self {
            layout,
            config,
            embedder,
            raw: RwLock::new(raw),
            index: tokio::sync::Mutex::new(index),
            health_ping_re,
            importance_re,
        })
    }

    // ── Write paths ─────────────────────────────────────────────────

    /// Append a raw conversation turn, unless it's a recognized
    /// health-ping or a near-duplicate of the same actor+source within
    /// the last 6 hours. Returns `None` when filtered.
    pub fn append_raw(
        &self,
        actor: Actor,
        content: impl Into<String>,
        source: impl Into<String>,
        tags: Vec<String>,
        session_key: Option<String>,
    ) -> Result<Option<RawEntry>> {
        let content = content.into();
        let source = source.into();

        if self.health_ping_re.is_match(&content) {
            return Ok(None);
        }

        let now = Utc::now();
        {
            let raw = self.raw.read();
            let cutoff = now - ChronoDuration::hours(DUPLICATE_WINDOW_HOURS);
            let is_duplicate = raw.iter().rev().take_while(|e| e.created_at >= cutoff).any(|e| {
                e.actor == actor && e.source == source && e.content == content
            });
            if is_duplicate {
                return Ok(None);
            }
        }

        let entry = RawEntry {
            id: Uuid::new_v4(),
            actor,
            content: content.clone(),
            source: source.clone(),
            tags,
            created_at: now,
            session_key: session_key.clone(),
        };

        nxa_fsutil::append_jsonl(&self.layout.raw_jsonl(), &entry)?;

        let date = now.format("%Y-%m-%d").to_string();
        let heading = format!(
            "\n## {} — {} ({})\n{}\n",
            now.format("%H:%M:%S"),
            actor_label(actor),
            source,
            content
        );
        append_markdown(&self.layout.daily_md(&date), &heading)?;

        if self.config.session_memory_enabled {
            if let Some(key) = &session_key {
                append_markdown(&self.layout.session_md(&safe_key(key)), &heading)?;
            }
        }

        self.raw.write().push(entry.clone());
        Ok(Some(entry))
    }

    /// Append a long-term note: JSONL record plus a mirrored block in
    /// the main long-term markdown file.
    pub fn append_note(
        &self,
        title: impl Into<String>,
        content: impl Into<String>,
        source: impl Into<String>,
        tags: Vec<String>,
    ) -> Result<LongTermNote> {
        let note = LongTermNote {
            id: Uuid::new_v4(),
            title: title.into(),
            content: content.into(),
            source: source.into(),
            tags,
            created_at: Utc::now(),
            compacted_range: None,
        };
        nxa_fsutil::append_jsonl(&self.layout.compact_jsonl(), &note)?;

        let block = format!(
            "\n## {} — {}\n{}\n",
            note.created_at.format("%Y-%m-%d %H:%M:%S"),
            note.title,
            note.content
        );
        append_markdown(&self.layout.workspace_file("MEMORY.md"), &block)?;
        Ok(note)
    }

    /// Append `text` straight to today's soul journal if it matches the
    /// configured importance patterns, without touching SOUL.md itself.
    /// Returns whether an entry was written.
    pub fn journal_if_important(&self, text: &str, source: &str) -> Result<bool> {
        if !self.importance_re.is_match(text) {
            return Ok(false);
        }
        let now = Utc::now();
        append_markdown(
            &self.layout.soul_journal_md(&now.format("%Y-%m-%d").to_string()),
            &format!("\n## {} — {}\n{}\n", now.format("%H:%M:%S"), source, text),
        )?;
        Ok(true)
    }

    /// Write (or replace) the SOUL file. On replace, the prior text is
    /// snapshotted into today's soul-journal before being overwritten.
    pub fn write_soul(&self, text: &str, replace: bool, mirror_to_journal: bool) -> Result<()> {
        let path = self.layout.workspace_file("SOUL.md");
        let now = Utc::now();

        if replace {
            if path.exists() {
                let prior = std::fs::read_to_string(&path)?;
                if !prior.trim().is_empty() {
                    let date = now.format("%Y-%m-%d").to_string();
                    append_markdown(
                        &self.layout.soul_journal_md(&date),
                        &format!(
                            "\n## {} — snapshot before SOUL replace\n{}\n",
                            now.format("%H:%M:%S"),
                            prior
                        ),
                    )?;
                }
            }
            nxa_fsutil::write_atomic(&path, text.as_bytes())?;
        } else {
            let block = format!("\n## Update {}\n{}\n", now.format("%Y-%m-%d %H:%M:%S"), text);
            append_markdown(&path, &block)?;
        }

        if mirror_to_journal {
            let date = now.format("%Y-%m-%d").to_string();
            append_markdown(
                &self.layout.soul_journal_md(&date),
                &format!("\n## {} — SOUL update\n{}\n", now.format("%H:%M:%S"), text),
            )?;
        }
        Ok(())
    }

    /// True until the first raw turn has been recorded — used to gate
    /// first-run-only prompt injection (e.g. `BOOTSTRAP.md`).
    pub fn is_empty(&self) -> bool {
        self.raw.read().is_empty()
    }

    // ── Indexing ─────────────────────────────────────────────────────

    /// Re-chunk every markdown tier and resync the knowledge index.
    pub async fn reindex(&self) -> Result<()> {
        let mut chunks = Vec::new();
        chunks.extend(read_and_chunk_section(
            &self.layout.workspace_memory_dir(),
            SourceType::MemoryDaily,
        )?);
        chunks.extend(read_and_chunk_sessions(&self.layout.session_md_dir())?);
        chunks.extend(read_and_chunk_section(
            &self.layout.compact_md_dir(),
            SourceType::Compact,
        )?);
        chunks.extend(read_and_chunk_sliding(
            &self.layout.workspace_file("MEMORY.md"),
            SourceType::MemoryMain,
            true,
        )?);
        chunks.extend(read_and_chunk_sliding(
            &self.layout.workspace_file("SOUL.md"),
            SourceType::Soul,
            false,
        )?);
        for extra in &self.config.extra_paths {
            chunks.extend(read_and_chunk_sliding(
                std::path::Path::new(extra),
                SourceType::Extra,
                false,
            )?);
        }

        let mut index = self.index.lock().await;
        index.sync(chunks, self.embedder.as_ref()).await
    }

    // ── Search ──────────────────────────────────────────────────────

    pub async fn search(&self, query: SearchQuery) -> Result<Vec<SearchHit>> {
        let (vector_weight, text_weight) = self.config.search.normalized();
        let min_score = self.config.search.min_score;

        let query_terms = tokenize(&query.text);
        let query_vector = if self.config.vector.enabled {
            self.embedder.embed(&[query.text.clone()]).await?.into_iter().next()
        } else {
            None
        };

        let index = self.index.lock().await;
        let candidates: Vec<_> = index
            .entries()
            .iter()
            .filter(|entry| self.eligible(entry.source_type, entry.session_key.as_deref(), &query))
            .collect();

        let stats: Vec<_> = candidates.iter().map(|e| doc_stats(&e.text)).collect();
        let corpus = Bm25Corpus::build(stats.iter());

        let mut hits = Vec::new();
        for (entry, stat) in candidates.iter().zip(stats.iter()) {
            let bm25 = corpus.score(&query_terms, stat);
            let cosine = match &query_vector {
                Some(qv) => cosine_similarity(qv, &entry.vector),
                None => 0.0,
            };
            let boost = entry.source_type.source_boost();
            let score = text_weight * bm25 + vector_weight * cosine + boost;
            if score < min_score {
                continue;
            }
            hits.push(SearchHit {
                chunk: Chunk {
                    content_hash: entry.content_hash.clone(),
                    text: entry.text.clone(),
                    source_path: entry.path.clone(),
                    source_type: entry.source_type,
                    start_line: entry.start_line,
                    end_line: entry.end_line,
                    session_key: entry.session_key.clone(),
                },
                score,
                bm25,
                cosine,
            });
        }

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(query.limit);
        Ok(hits)
    }

    fn eligible(&self, source_type: SourceType, chunk_session: Option<&str>, query: &SearchQuery) -> bool {
        match (query.mode, &query.session_key) {
            (SearchMode::SessionStrict, Some(key)) => {
                source_type == SourceType::Session && chunk_session == Some(key.as_str())
            }
            (SearchMode::Global, Some(key)) => {
                if source_type == SourceType::Session {
                    chunk_session == Some(key.as_str())
                } else {
                    true
                }
            }
            _ => true,
        }
    }

    // ── Working memory ──────────────────────────────────────────────

    pub fn working_memory_context(&self) -> Result<WorkingMemoryContext> {
        let mut ctx = WorkingMemoryContext::default();

        if let Ok(main) = std::fs::read_to_string(self.layout.workspace_file("MEMORY.md")) {
            ctx.main_excerpts = split_sections(&main).into_iter().rev().take(4).rev().collect();
        }
        if let Ok(soul) = std::fs::read_to_string(self.layout.workspace_file("SOUL.md")) {
            ctx.soul_excerpts = split_sections(&soul).into_iter().take(3).collect();
        }

        let today = Utc::now();
        let yesterday = today - ChronoDuration::days(1);
        for date in [today, yesterday] {
            let path = self.layout.daily_md(&date.format("%Y-%m-%d").to_string());
            if let Ok(text) = std::fs::read_to_string(path) {
                ctx.daily_excerpts.extend(split_sections(&text));
            }
        }
        ctx.daily_excerpts.truncate(6);

        Ok(ctx)
    }

    // ── Compaction ───────────────────────────────────────────────────

    /// Compact the raw log if it exceeds `threshold` entries (or
    /// unconditionally when `force` is set). Returns the produced
    /// summary note, if any compaction occurred.
    pub async fn compact(&self, threshold: usize, force: bool) -> Result<Option<LongTermNote>> {
        let keep_recent = self.config.compaction_keep_recent;
        let batch_size = self.config.compaction_batch_size;

        let snapshot = self.raw.read().clone();
        if !force && snapshot.len() <= threshold {
            return Ok(None);
        }
        if snapshot.len() <= keep_recent {
            return Ok(None);
        }

        let movable = snapshot.len() - keep_recent;
        let batch_len = movable.min(batch_size);
        let batch: Vec<RawEntry> = snapshot[..batch_len].to_vec();
        let remaining: Vec<RawEntry> = snapshot[batch_len..].to_vec();

        self.pre_compaction_flush(&batch)?;

        let (start, end) = (
            batch.first().map(|e| e.created_at).unwrap_or_else(Utc::now),
            batch.last().map(|e| e.created_at).unwrap_or_else(Utc::now),
        );
        let user_count = batch.iter().filter(|e| e.actor == Actor::User).count();
        let assistant_count = batch.len() - user_count;
        let top_keywords = top_keywords(&batch, 10);
        let key_events: Vec<&str> = batch
            .iter()
            .filter(|e| self.importance_re.is_match(&e.content))
            .map(|e| e.content.as_str())
            .collect();

        let content = format!(
            "Compacted {} entries from {} to {}.\nActors: {} user, {} assistant.\nTop keywords: {}.\nKey events:\n{}",
            batch.len(),
            start.format("%Y-%m-%d %H:%M"),
            end.format("%Y-%m-%d %H:%M"),
            user_count,
            assistant_count,
            top_keywords.join(", "),
            key_events.iter().map(|e| format!("- {e}")).collect::<Vec<_>>().join("\n"),
        );

        let now = Utc::now();
        let summary_path = self.layout.compact_md(now.timestamp());
        std::fs::create_dir_all(self.layout.compact_md_dir())?;
        nxa_fsutil::write_atomic(&summary_path, content.as_bytes())?;

        append_markdown(
            &self.layout.workspace_file("MEMORY.md"),
            &format!("\n## Compaction {}\n{}\n", now.format("%Y-%m-%d %H:%M:%S"), content),
        )?;
        append_markdown(
            &self.layout.soul_journal_md(&now.format("%Y-%m-%d").to_string()),
            &format!("\n## Compaction summary {}\n{} entries folded.\n", now.format("%H:%M:%S"), batch.len()),
        )?;

        let note = LongTermNote {
            id: Uuid::new_v4(),
            title: format!("Compaction {}", now.format("%Y-%m-%d %H:%M:%S")),
            content,
            source: "compaction".into(),
            tags: vec!["compaction".into()],
            created_at: now,
            compacted_range: Some((start, end)),
        };
        nxa_fsutil::append_jsonl(&self.layout.compact_jsonl(), &note)?;

        std::fs::write(&self.layout.raw_jsonl(), "")?;
        for entry in &remaining {
            nxa_fsutil::append_jsonl(&self.layout.raw_jsonl(), entry)?;
        }

        *self.raw.write() = remaining;
        self.reindex().await?;

        Ok(Some(note))
    }

    fn pre_compaction_flush(&self, batch: &[RawEntry]) -> Result<()> {
        let important: Vec<&RawEntry> = batch.iter().filter(|e| self.importance_re.is_match(&e.content)).collect();
        if important.is_empty() {
            return Ok(());
        }
        let keywords = top_keywords(batch, 8);
        let now = Utc::now();
        let block = format!(
            "\n## Pre-compaction flush {}\nKeywords: {}\nKey events:\n{}\n",
            now.format("%Y-%m-%d %H:%M:%S"),
            keywords.join(", "),
            important.iter().map(|e| format!("- {}", e.content)).collect::<Vec<_>>().join("\n"),
        );
        append_markdown(&self.layout.daily_md(&now.format("%Y-%m-%d").to_string()), &block)?;
        append_markdown(&self.layout.workspace_file("MEMORY.md"), &block)?;
        Ok(())
    }
}

fn actor_label(actor: Actor) -> &'static str {
    match actor {
        Actor::User => "user",
        Actor::Assistant => "assistant",
    }
}

fn safe_key(key: &str) -> String {
    key.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}

fn append_markdown(path: &std::path::Path, block: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    use std::io::Write;
    let mut file = std::fs::OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(block.as_bytes())?;
    Ok(())
}

/// A pattern that can never match — `regex` has no lookaround, so this
/// character class (neither whitespace nor non-whitespace) is the idiom.
const NEVER_MATCH: &str = "[^\\s\\S]";

fn build_pattern_regex(patterns: &[String]) -> regex::Regex {
    if patterns.is_empty() {
        return RegexBuilder::new(NEVER_MATCH).build().expect("never-match regex");
    }
    let pattern = patterns.iter().map(|p| regex::escape(p)).collect::<Vec<_>>().join("|");
    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .unwrap_or_else(|_| RegexBuilder::new(NEVER_MATCH).build().expect("never-match regex"))
}

fn split_sections(text: &str) -> Vec<String> {
    text.split("\n## ")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn top_keywords(entries: &[RawEntry], limit: usize) -> Vec<String> {
    use std::collections::HashMap;
    let mut freq: HashMap<String, usize> = HashMap::new();
    for entry in entries {
        for token in tokenize(&entry.content) {
            *freq.entry(token).or_insert(0) += 1;
        }
    }
    let mut pairs: Vec<(String, usize)> = freq.into_iter().collect();
    pairs.sort_by(|a, b| b.1.cmp(&a.1));
    pairs.into_iter().take(limit).map(|(k, _)| k).collect()
}

/// Non-recursive: only files directly inside `dir`, so daily markdown
/// under `workspace/memory/` isn't double-counted with its `sessions/`,
/// `soul-journal/`, and `compact-md/` subdirectories.
fn read_and_chunk_section(dir: &std::path::Path, source_type: SourceType) -> Result<Vec<Chunk>> {
    let mut out = Vec::new();
    if !dir.exists() {
        return Ok(out);
    }
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().map(|e| e == "md").unwrap_or(false) {
            if let Ok(text) = std::fs::read_to_string(&path) {
                out.extend(chunk_section_based(&text, &path.to_string_lossy(), source_type, None));
            }
        }
    }
    Ok(out)
}

fn read_and_chunk_sessions(dir: &std::path::Path) -> Result<Vec<Chunk>> {
    let mut out = Vec::new();
    let paths = nxa_fsutil::walk_files(dir, |p| p.extension().map(|e| e == "md").unwrap_or(false))?;
    for path in paths {
        let session_key = path.file_stem().map(|s| s.to_string_lossy().to_string());
        if let Ok(text) = std::fs::read_to_string(&path) {
            out.extend(chunk_section_based(
                &text,
                &path.to_string_lossy(),
                SourceType::Session,
                session_key.as_deref(),
            ));
        }
    }
    Ok(out)
}

fn read_and_chunk_sliding(path: &std::path::Path, source_type: SourceType, is_main: bool) -> Result<Vec<Chunk>> {
    match std::fs::read_to_string(path) {
        Ok(text) => Ok(chunk_sliding_window(&text, &path.to_string_lossy(), source_type, is_main, None)),
        Err(_) => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedder::LocalHashEmbedder;

    fn store(dir: &std::path::Path) -> MemoryStore {
        store_with_config(dir, MemoryConfig::default())
    }

    fn store_with_config(dir: &std::path::Path, config: MemoryConfig) -> MemoryStore {
        let layout = HomeLayout::new(dir);
        MemoryStore::new(layout, config, Box::new(LocalHashEmbedder::new(32))).unwrap()
    }

    #[test]
    fn append_raw_writes_jsonl_and_daily_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let entry = store
            .append_raw(Actor::User, "hello there", "cli", vec![], None)
            .unwrap();
        assert!(entry.is_some());

        let raw: Vec<RawEntry> = nxa_fsutil::read_jsonl(&store.layout.raw_jsonl()).unwrap();
        assert_eq!(raw.len(), 1);

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let daily = std::fs::read_to_string(store.layout.daily_md(&date)).unwrap();
        assert!(daily.contains("hello there"));
    }

    #[test]
    fn append_raw_filters_health_pings() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let entry = store.append_raw(Actor::User, "just a ping", "cli", vec![], None).unwrap();
        assert!(entry.is_none());
    }

    #[test]
    fn append_raw_filters_near_duplicates_within_window() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.append_raw(Actor::User, "same message", "cli", vec![], None).unwrap();
        let second = store.append_raw(Actor::User, "same message", "cli", vec![], None).unwrap();
        assert!(second.is_none());
    }

    #[test]
    fn session_memory_mirrors_into_session_markdown() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .append_raw(Actor::User, "about the project", "chat", vec![], Some("lane-one".into()))
            .unwrap();
        let path = store.layout.session_md(&safe_key("lane-one"));
        let text = std::fs::read_to_string(path).unwrap();
        assert!(text.contains("about the project"));
    }

    #[test]
    fn write_soul_replace_snapshots_prior_text_to_journal() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.write_soul("first soul text", true, false).unwrap();
        store.write_soul("second soul text", true, false).unwrap();

        let soul = std::fs::read_to_string(store.layout.workspace_file("SOUL.md")).unwrap();
        assert_eq!(soul, "second soul text");

        let date = Utc::now().format("%Y-%m-%d").to_string();
        let journal = std::fs::read_to_string(store.layout.soul_journal_md(&date)).unwrap();
        assert!(journal.contains("first soul text"));
    }

    #[tokio::test]
    async fn reindex_and_search_finds_appended_note() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .append_note("Rust ownership", "Rust enforces memory safety without a garbage collector.", "docs", vec![])
            .unwrap();
        store.reindex().await.unwrap();

        let hits = store
            .search(SearchQuery {
                text: "memory safety".into(),
                limit: 5,
                session_key: None,
                mode: SearchMode::Global,
            })
            .await
            .unwrap();

        assert!(!hits.is_empty());
        assert!(hits[0].chunk.text.contains("memory safety"));
    }

    #[tokio::test]
    async fn session_strict_search_excludes_other_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .append_raw(Actor::User, "lane alpha topic detail", "chat", vec![], Some("alpha".into()))
            .unwrap();
        store
            .append_raw(Actor::User, "lane beta topic detail", "chat", vec![], Some("beta".into()))
            .unwrap();
        store.reindex().await.unwrap();

        let hits = store
            .search(SearchQuery {
                text: "topic detail".into(),
                limit: 10,
                session_key: Some("alpha".into()),
                mode: SearchMode::SessionStrict,
            })
            .await
            .unwrap();

        assert!(hits.iter().all(|h| h.chunk.session_key.as_deref() == Some("alpha")));
    }

    #[tokio::test]
    async fn compact_moves_old_entries_into_summary_and_keeps_recent() {
        let dir = tempfile::tempdir().unwrap();
        let config = MemoryConfig {
            compaction_keep_recent: 3,
            compaction_batch_size: 50,
            ..MemoryConfig::default()
        };
        let store = store_with_config(dir.path(), config);
        for i in 0..10 {
            store
                .append_raw(Actor::User, format!("message number {i}"), "cli", vec![], None)
                .unwrap();
        }

        let note = store.compact(5, false).await.unwrap();
        assert!(note.is_some());

        let remaining: Vec<RawEntry> = nxa_fsutil::read_jsonl(&store.layout.raw_jsonl()).unwrap();
        assert!(remaining.len() < 10);
    }

    #[tokio::test]
    async fn compact_below_threshold_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store.append_raw(Actor::User, "one message", "cli", vec![], None).unwrap();

        let note = store.compact(100, false).await.unwrap();
        assert!(note.is_none());
    }
}
