//! Process-wide observability sink.
//!
//! Every component calls [`EventBus::emit`] instead of writing its own
//! side-channel log. Events get a monotonic `seq`, land in a bounded
//! in-memory ring for `getRecent`/dashboard replay, broadcast
//! synchronously to live SSE subscribers, and are appended to a JSONL
//! file on a debounced background task with single-backup rotation.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use nxa_domain::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc};

const DEFAULT_BUFFER_SIZE: usize = 1000;
const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;
const DEFAULT_FLUSH_DEBOUNCE_MS: u64 = 500;

/// A single emitted event, ordered by `seq` across every emitter in the
/// process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub seq: u64,
    pub ts_ms: i64,
    pub kind: String,
    pub payload: serde_json::Value,
}

struct Inner {
    ring: VecDeque<EventRecord>,
    buffer_size: usize,
}

/// Handle returned by [`EventBus::spawn`]; drop it to stop the flusher.
pub struct EventBusHandle {
    pub bus: EventBus,
    pub flusher: tokio::task::JoinHandle<()>,
}

#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Mutex<Inner>>,
    next_seq: Arc<AtomicU64>,
    listeners: broadcast::Sender<EventRecord>,
    writer_tx: mpsc::UnboundedSender<EventRecord>,
}

impl EventBus {
    /// Build the bus and spawn its background JSONL flusher.
    pub fn spawn(path: PathBuf) -> EventBusHandle {
        Self::spawn_with(path, DEFAULT_BUFFER_SIZE, DEFAULT_MAX_FILE_BYTES, DEFAULT_FLUSH_DEBOUNCE_MS)
    }

    pub fn spawn_with(
        path: PathBuf,
        buffer_size: usize,
        max_file_bytes: u64,
        flush_debounce_ms: u64,
    ) -> EventBusHandle {
        let (listeners, _) = broadcast::channel(256);
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();

        let bus = EventBus {
            inner: Arc::new(Mutex::new(Inner {
                ring: VecDeque::with_capacity(buffer_size),
                buffer_size,
            })),
            next_seq: Arc::new(AtomicU64::new(1)),
            listeners,
            writer_tx,
        };

        let flusher = tokio::spawn(run_flusher(writer_rx, path, max_file_bytes, flush_debounce_ms));

        EventBusHandle { bus, flusher }
    }

    /// Record an event: assign seq + timestamp, push into the ring,
    /// broadcast to live listeners, and queue it for the JSONL writer.
    pub fn emit(&self, kind: impl Into<String>, payload: serde_json::Value) -> EventRecord {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        let record = EventRecord {
            seq,
            ts_ms: chrono::Utc::now().timestamp_millis(),
            kind: kind.into(),
            payload,
        };

        {
            let mut inner = self.inner.lock();
            if inner.ring.len() >= inner.buffer_size {
                inner.ring.pop_front();
            }
            inner.ring.push_back(record.clone());
        }

        // Best-effort: no subscribers is not an error.
        let _ = self.listeners.send(record.clone());
        // Best-effort: the flusher task outlives any single emit call
        // except during shutdown, when a dropped receiver is expected.
        let _ = self.writer_tx.send(record.clone());

        record
    }

    /// Most recent `limit` events, oldest first.
    pub fn get_recent(&self, limit: usize) -> Vec<EventRecord> {
        let inner = self.inner.lock();
        let len = inner.ring.len();
        let skip = len.saturating_sub(limit);
        inner.ring.iter().skip(skip).cloned().collect()
    }

    /// Subscribe to the live event stream (e.g. for dashboard SSE).
    pub fn subscribe(&self) -> broadcast::Receiver<EventRecord> {
        self.listeners.subscribe()
    }
}

async fn run_flusher(
    mut rx: mpsc::UnboundedReceiver<EventRecord>,
    path: PathBuf,
    max_file_bytes: u64,
    debounce_ms: u64,
) {
    let mut pending: Vec<EventRecord> = Vec::new();
    loop {
        let recv = tokio::time::timeout(std::time::Duration::from_millis(debounce_ms), rx.recv()).await;
        match recv {
            Ok(Some(record)) => {
                pending.push(record);
                // Drain whatever else has queued up without waiting again.
                while let Ok(more) = rx.try_recv() {
                    pending.push(more);
                }
            }
            Ok(None) => {
                // Channel closed: flush what's left and exit.
                if !pending.is_empty() {
                    flush_batch(&path, &pending, max_file_bytes).await;
                }
                return;
            }
            Err(_elapsed) => {
                // Debounce window elapsed with nothing new; fall through
                // to flush whatever accumulated since the last round.
            }
        }

        if !pending.is_empty() {
            flush_batch(&path, &pending, max_file_bytes).await;
            pending.clear();
        }
    }
}

async fn flush_batch(path: &std::path::Path, batch: &[EventRecord], max_file_bytes: u64) {
    if let Err(err) = rotate_if_needed(path, max_file_bytes).await {
        tracing::warn!(error = %err, "event log rotation failed");
    }
    for record in batch {
        if let Err(err) = nxa_fsutil::append_jsonl_async(path.to_path_buf(), record.clone()).await {
            tracing::warn!(error = %err, "failed to append event to jsonl log");
        }
    }
}

/// Rotate `path` to `path.1` (overwriting any previous backup) if it
/// would exceed `max_file_bytes` after this batch. Single backup only,
/// matching spec's `.1` rotation scheme.
async fn rotate_if_needed(path: &std::path::Path, max_file_bytes: u64) -> Result<()> {
    let path = path.to_path_buf();
    tokio::task::spawn_blocking(move || {
        let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        if size < max_file_bytes {
            return Ok(());
        }
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "events.jsonl".to_string());
        let backup = path.with_file_name(format!("{file_name}.1"));
        std::fs::rename(&path, &backup)?;
        Ok::<(), nxa_domain::error::Error>(())
    })
    .await
    .map_err(|e| nxa_domain::error::Error::Other(format!("join error in rotate_if_needed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn emit_assigns_monotonic_seq() {
        let dir = tempfile::tempdir().unwrap();
        let handle = EventBus::spawn(dir.path().join("events.jsonl"));
        let a = handle.bus.emit("task.start", serde_json::json!({"id": "1"}));
        let b = handle.bus.emit("task.end", serde_json::json!({"id": "1"}));
        assert_eq!(b.seq, a.seq + 1);
    }

    #[tokio::test]
    async fn get_recent_respects_ring_bound() {
        let dir = tempfile::tempdir().unwrap();
        let handle = EventBus::spawn_with(dir.path().join("events.jsonl"), 3, DEFAULT_MAX_FILE_BYTES, 50);
        for i in 0..10 {
            handle.bus.emit("tick", serde_json::json!({ "i": i }));
        }
        let recent = handle.bus.get_recent(10);
        assert_eq!(recent.len(), 3);
        assert_eq!(recent.last().unwrap().payload["i"], 9);
    }

    #[tokio::test]
    async fn subscriber_receives_live_events() {
        let dir = tempfile::tempdir().unwrap();
        let handle = EventBus::spawn(dir.path().join("events.jsonl"));
        let mut rx = handle.bus.subscribe();
        handle.bus.emit("ping", serde_json::json!({}));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.kind, "ping");
    }

    #[tokio::test]
    async fn events_eventually_flush_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let handle = EventBus::spawn_with(path.clone(), 100, DEFAULT_MAX_FILE_BYTES, 20);
        handle.bus.emit("task.start", serde_json::json!({"id": "x"}));
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        let lines: Vec<EventRecord> = nxa_fsutil::read_jsonl(&path).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].kind, "task.start");
    }
}
