//! Per-lane agent session registry.
//!
//! One [`LaneEntry`] per lane key, holding the boxed agent session the
//! orchestrator drives turns through. Capacity is bounded by idle timeout
//! and LRU eviction, `maxSessionLanes`-wide, except a lane with a turn
//! currently in flight is never evicted — [`SessionRegistry::begin_turn`]'s
//! guard is what the eviction sweep checks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use nxa_domain::error::{Error, Result};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;

const SUBSCRIBE_CHANNEL_CAPACITY: usize = 256;

/// The external collaborator boundary: an agent session this registry owns
/// the lifecycle of but not the implementation of. The orchestrator's
/// concrete LLM client binds to this at its call sites.
#[async_trait::async_trait]
pub trait AgentSession: Send + Sync {
    async fn prompt(&self, text: &str) -> Result<String>;

    /// Last-resort context-overflow recovery: ask the concrete session to
    /// drop its own history down to a small head+tail window. Sessions
    /// that don't keep any history of their own (or can't trim it) return
    /// `Ok(false)` — the default — and the caller falls back to
    /// memory-level compaction only.
    async fn compact_history(&self) -> Result<bool> {
        Ok(false)
    }
}

/// A streamed session lifecycle event (prompt sent, chunk received, turn
/// finished), fanned out to dashboard/SSE subscribers of one lane.
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub lane_key: String,
    pub kind: String,
    pub payload: serde_json::Value,
}

pub struct LaneEntry {
    pub lane_key: String,
    pub base_lane_key: String,
    pub created_at: DateTime<Utc>,
    session: Arc<dyn AgentSession>,
    last_used_at: Mutex<DateTime<Utc>>,
    running: AtomicBool,
    message_count: AtomicU64,
    events: broadcast::Sender<SessionEvent>,
}

impl LaneEntry {
    fn new(lane_key: String, base_lane_key: String, session: Arc<dyn AgentSession>) -> Self {
        let (events, _) = broadcast::channel(SUBSCRIBE_CHANNEL_CAPACITY);
        let now = Utc::now();
        Self {
            lane_key,
            base_lane_key,
            created_at: now,
            session,
            last_used_at: Mutex::new(now),
            running: AtomicBool::new(false),
            message_count: AtomicU64::new(0),
            events,
        }
    }

    pub fn session(&self) -> &Arc<dyn AgentSession> {
        &self.session
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn publish(&self, kind: impl Into<String>, payload: serde_json::Value) {
        let _ = self.events.send(SessionEvent {
            lane_key: self.lane_key.clone(),
            kind: kind.into(),
            payload,
        });
    }

    pub fn info(&self) -> LaneSessionInfo {
        LaneSessionInfo {
            lane_key: self.lane_key.clone(),
            base_lane_key: self.base_lane_key.clone(),
            created_at: self.created_at,
            last_used_at: *self.last_used_at.lock(),
            message_count: self.message_count.load(Ordering::SeqCst),
            running: self.is_running(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct LaneSessionInfo {
    pub lane_key: String,
    pub base_lane_key: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub message_count: u64,
    pub running: bool,
}

/// Releases a lane's running flag and bumps `last_used_at` when dropped,
/// whatever the reason the turn ended — the eviction sweep only ever sees
/// a lane as "currently running" for as long as this guard is alive.
pub struct TurnGuard {
    entry: Arc<LaneEntry>,
}

impl Drop for TurnGuard {
    fn drop(&mut self) {
        self.entry.running.store(false, Ordering::SeqCst);
        *self.entry.last_used_at.lock() = Utc::now();
    }
}

pub struct SessionRegistry {
    lanes: RwLock<HashMap<String, Arc<LaneEntry>>>,
    max_lanes: usize,
    max_idle: ChronoDuration,
}

impl SessionRegistry {
    pub fn new(max_lanes: usize, max_idle_minutes: u64) -> Self {
        Self {
            lanes: RwLock::new(HashMap::new()),
            max_lanes,
            max_idle: ChronoDuration::minutes(max_idle_minutes as i64),
        }
    }

    /// Look up an existing lane's session, or create one via `factory`.
    /// Capacity is swept before a new entry is admitted; an existing lane
    /// is always returned regardless of current occupancy.
    pub fn acquire_or_create<F>(&self, lane_key: &str, base_lane_key: &str, factory: F) -> Arc<LaneEntry>
    where
        F: FnOnce() -> Arc<dyn AgentSession>,
    {
        if let Some(entry) = self.lanes.read().get(lane_key) {
            return entry.clone();
        }

        let mut lanes = self.lanes.write();
        if let Some(entry) = lanes.get(lane_key) {
            return entry.clone();
        }

        self.evict_locked(&mut lanes);
        let entry = Arc::new(LaneEntry::new(lane_key.to_string(), base_lane_key.to_string(), factory()));
        lanes.insert(lane_key.to_string(), entry.clone());
        entry
    }

    /// Mark a lane as having a turn in flight. Hold the returned guard for
    /// the duration of that turn.
    pub fn begin_turn(&self, entry: &Arc<LaneEntry>) -> TurnGuard {
        entry.running.store(true, Ordering::SeqCst);
        entry.message_count.fetch_add(1, Ordering::SeqCst);
        TurnGuard { entry: entry.clone() }
    }

    pub fn get(&self, lane_key: &str) -> Option<Arc<LaneEntry>> {
        self.lanes.read().get(lane_key).cloned()
    }

    /// Manual archive: remove a lane regardless of idle timers. Refuses a
    /// lane with a turn in flight.
    pub fn archive(&self, lane_key: &str) -> Result<()> {
        let mut lanes = self.lanes.write();
        match lanes.get(lane_key) {
            Some(entry) if entry.is_running() => Err(Error::Validation(format!(
                "lane {lane_key} has a turn in flight and cannot be archived"
            ))),
            Some(_) => {
                lanes.remove(lane_key);
                Ok(())
            }
            None => Err(Error::NotFound(format!("lane {lane_key}"))),
        }
    }

    pub fn list(&self) -> Vec<LaneSessionInfo> {
        self.lanes.read().values().map(|e| e.info()).collect()
    }

    /// Idle-timeout and LRU sweep, safe to call periodically or inline
    /// before admitting a new lane. Never touches a lane with a turn in
    /// flight.
    pub fn sweep(&self) {
        self.evict_locked(&mut self.lanes.write());
    }

    fn evict_locked(&self, lanes: &mut HashMap<String, Arc<LaneEntry>>) {
        let now = Utc::now();
        let idle_keys: Vec<String> = lanes
            .iter()
            .filter(|(_, e)| !e.is_running() && now - *e.last_used_at.lock() > self.max_idle)
            .map(|(k, _)| k.clone())
            .collect();
        for key in idle_keys {
            lanes.remove(&key);
        }

        while lanes.len() >= self.max_lanes {
            let victim = lanes
                .iter()
                .filter(|(_, e)| !e.is_running())
                .min_by_key(|(_, e)| *e.last_used_at.lock())
                .map(|(k, _)| k.clone());
            match victim {
                Some(key) => {
                    lanes.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoSession;

    #[async_trait::async_trait]
    impl AgentSession for EchoSession {
        async fn prompt(&self, text: &str) -> Result<String> {
            Ok(text.to_string())
        }
    }

    fn echo() -> Arc<dyn AgentSession> {
        Arc::new(EchoSession)
    }

    #[test]
    fn reuses_existing_lane() {
        let registry = SessionRegistry::new(10, 60);
        let a = registry.acquire_or_create("lane-1", "lane-1", echo);
        let b = registry.acquire_or_create("lane-1", "lane-1", echo);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn evicts_idle_lane_beyond_timeout() {
        let registry = SessionRegistry::new(10, 0);
        let entry = registry.acquire_or_create("lane-1", "lane-1", echo);
        *entry.last_used_at.lock() = Utc::now() - ChronoDuration::minutes(5);
        drop(entry);

        registry.acquire_or_create("lane-2", "lane-2", echo);
        assert!(registry.get("lane-1").is_none());
    }

    #[test]
    fn never_evicts_a_running_lane() {
        let registry = SessionRegistry::new(1, 60);
        let entry = registry.acquire_or_create("lane-1", "lane-1", echo);
        let _guard = registry.begin_turn(&entry);

        // Capacity is 1 and already full with a running lane; a second
        // lane must still be admitted rather than evicting the first.
        registry.acquire_or_create("lane-2", "lane-2", echo);
        assert!(registry.get("lane-1").is_some());
        assert!(registry.get("lane-2").is_some());
    }

    #[test]
    fn lru_eviction_picks_the_least_recently_used() {
        let registry = SessionRegistry::new(2, 60);
        let old = registry.acquire_or_create("lane-old", "lane-old", echo);
        *old.last_used_at.lock() = Utc::now() - ChronoDuration::minutes(30);
        registry.acquire_or_create("lane-mid", "lane-mid", echo);

        registry.acquire_or_create("lane-new", "lane-new", echo);
        assert!(registry.get("lane-old").is_none());
        assert!(registry.get("lane-mid").is_some());
        assert!(registry.get("lane-new").is_some());
    }

    #[test]
    fn archive_refuses_a_running_lane() {
        let registry = SessionRegistry::new(10, 60);
        let entry = registry.acquire_or_create("lane-1", "lane-1", echo);
        let _guard = registry.begin_turn(&entry);
        assert!(registry.archive("lane-1").is_err());
    }

    #[tokio::test]
    async fn turn_guard_clears_running_on_drop() {
        let registry = SessionRegistry::new(10, 60);
        let entry = registry.acquire_or_create("lane-1", "lane-1", echo);
        {
            let _guard = registry.begin_turn(&entry);
            assert!(entry.is_running());
        }
        assert!(!entry.is_running());
    }
}
