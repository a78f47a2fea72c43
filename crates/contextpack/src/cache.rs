//! SHA-1-keyed cache for the compressed "core markdown context" — the
//! concatenation of identity/user/agents/bootstrap/heartbeat/tools/runtime
//! tool list passed to the prompt composer. Computing a compressed form is
//! expensive (it goes through the agent session itself), so once a given
//! raw concatenation has been compressed, later turns with the same inputs
//! reuse the cached result instead of recompressing.

use std::collections::VecDeque;
use std::future::Future;

use parking_lot::Mutex;
use sha1::{Digest, Sha1};

struct Inner {
    entries: std::collections::HashMap<String, String>,
    order: VecDeque<String>,
    capacity: usize,
}

/// Bounded, FIFO-evicted cache from input hash to compressed text.
pub struct SummaryCache {
    inner: Mutex<Inner>,
}

impl SummaryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: std::collections::HashMap::new(),
                order: VecDeque::new(),
                capacity,
            }),
        }
    }

    /// Return `raw` unchanged if it's within `threshold`. Otherwise look up
    /// (or compute and cache) a compressed form keyed by the SHA-1 of
    /// `raw`, via the caller-supplied `summarize` closure.
    pub async fn compact_if_needed<F, Fut>(&self, raw: &str, threshold: usize, summarize: F) -> String
    where
        F: FnOnce(&str) -> Fut,
        Fut: Future<Output = String>,
    {
        if raw.len() <= threshold {
            return raw.to_string();
        }

        let key = sha1_hex(raw);
        if let Some(hit) = self.inner.lock().entries.get(&key).cloned() {
            return hit;
        }

        let compressed = summarize(raw).await;
        self.insert(key, compressed.clone());
        compressed
    }

    fn insert(&self, key: String, value: String) {
        let mut inner = self.inner.lock();
        if inner.entries.len() >= inner.capacity {
            if let Some(oldest) = inner.order.pop_front() {
                inner.entries.remove(&oldest);
            }
        }
        inner.order.push_back(key.clone());
        inner.entries.insert(key, value);
    }
}

pub fn sha1_hex(input: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(input.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passes_through_under_threshold() {
        let cache = SummaryCache::new(4);
        let out = cache.compact_if_needed("short", 100, |s| async move { format!("SUMMARY:{s}") }).await;
        assert_eq!(out, "short");
    }

    #[tokio::test]
    async fn compresses_and_caches_over_threshold() {
        let cache = SummaryCache::new(4);
        let raw = "x".repeat(200);
        let calls = std::sync::atomic::AtomicUsize::new(0);

        let summarize = |s: &str| {
            calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let s = s.to_string();
            async move { format!("compressed:{}", s.len()) }
        };

        let first = cache.compact_if_needed(&raw, 10, summarize).await;
        let second = cache.compact_if_needed(&raw, 10, summarize).await;
        assert_eq!(first, "compressed:200");
        assert_eq!(second, "compressed:200");
        assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 1);
    }

    #[test]
    fn hash_is_stable() {
        assert_eq!(sha1_hex("abc"), sha1_hex("abc"));
        assert_ne!(sha1_hex("abc"), sha1_hex("abd"));
    }
}
