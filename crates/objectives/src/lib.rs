//! Durable priority objective queue.
//!
//! Single JSON file, rewritten atomically on every mutation. Mirrors the
//! load-on-start / persist-on-write shape of a cron schedule store, but
//! keyed on objective lifecycle (priority pick, staleness expiry)
//! instead of cron timers.

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use nxa_domain::error::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveStatus {
    Pending,
    InProgress,
    Blocked,
    Completed,
    Failed,
    Cancelled,
}

impl ObjectiveStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Note {
    pub at: DateTime<Utc>,
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Objective {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    /// 1 = highest priority, 5 = lowest.
    pub priority: u8,
    pub status: ObjectiveStatus,
    pub source: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub run_count: u32,
    pub last_run_at: Option<DateTime<Utc>>,
    pub notes: Vec<Note>,
}

impl Objective {
    fn new(title: String, description: String, priority: u8, source: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            title,
            description,
            priority: priority.clamp(1, 5),
            status: ObjectiveStatus::Pending,
            source,
            created_at: now,
            updated_at: now,
            run_count: 0,
            last_run_at: None,
            notes: Vec::new(),
        }
    }

    fn push_note(&mut self, text: impl Into<String>) {
        self.notes.push(Note {
            at: Utc::now(),
            text: text.into(),
        });
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ObjectiveStats {
    pub pending: usize,
    pub in_progress: usize,
    pub blocked: usize,
    pub completed: usize,
    pub failed: usize,
    pub cancelled: usize,
}

pub struct ObjectiveStore {
    inner: RwLock<HashMap<Uuid, Objective>>,
    persist_path: PathBuf,
}

impl ObjectiveStore {
    pub async fn new(state_dir: &std::path::Path) -> Result<Self> {
        let persist_path = state_dir.join("objectives.json");
        let loaded: Vec<Objective> = nxa_fsutil::read_json_or_default(&persist_path)?;
        let map = loaded.into_iter().map(|o| (o.id, o)).collect();
        tracing::info!(count = map.len(), path = %persist_path.display(), "loaded objective queue");
        Ok(Self {
            inner: RwLock::new(map),
            persist_path,
        })
    }

    async fn persist(&self, map: &HashMap<Uuid, Objective>) -> Result<()> {
        let mut list: Vec<&Objective> = map.values().collect();
        list.sort_by_key(|o| o.created_at);
        nxa_fsutil::write_json_atomic_async(self.persist_path.clone(), &list).await
    }

    pub async fn add(
        &self,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: u8,
        source: impl Into<String>,
    ) -> Result<Objective> {
        let title = title.into();
        if title.trim().is_empty() {
            return Err(nxa_domain::error::Error::Validation(
                "objective title must not be empty".into(),
            ));
        }
        let objective = Objective::new(title, description.into(), priority, source.into());
        let mut map = self.inner.write().await;
        map.insert(objective.id, objective.clone());
        self.persist(&map).await?;
        Ok(objective)
    }

    pub async fn list(&self, status: Option<ObjectiveStatus>) -> Vec<Objective> {
        let map = self.inner.read().await;
        let mut out: Vec<Objective> = map
            .values()
            .filter(|o| status.map_or(true, |s| o.status == s))
            .cloned()
            .collect();
        out.sort_by_key(|o| o.created_at);
        out
    }

    pub async fn get_by_id(&self, id: Uuid) -> Option<Objective> {
        self.inner.read().await.get(&id).cloned()
    }

    /// Arbitrary status/notes update — the only operation permitted to
    /// move an objective into or out of a terminal status.
    pub async fn update(
        &self,
        id: Uuid,
        status: Option<ObjectiveStatus>,
        note: Option<String>,
    ) -> Result<Option<Objective>> {
        let mut map = self.inner.write().await;
        let Some(objective) = map.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(status) = status {
            objective.status = status;
        }
        if let Some(text) = note {
            objective.push_note(text);
        }
        objective.updated_at = Utc::now();
        let result = objective.clone();
        self.persist(&map).await?;
        Ok(Some(result))
    }

    /// Select (without mutating) the objective the autonomous loop should
    /// work on next: the oldest in-progress objective, or else the
    /// highest-priority (lowest number) pending objective, oldest first.
    pub async fn pick_for_autonomous(&self) -> Option<Objective> {
        let map = self.inner.read().await;

        let in_progress = map
            .values()
            .filter(|o| o.status == ObjectiveStatus::InProgress)
            .min_by_key(|o| o.updated_at);
        if let Some(o) = in_progress {
            return Some(o.clone());
        }

        map.values()
            .filter(|o| o.status == ObjectiveStatus::Pending)
            .min_by_key(|o| (o.priority, o.created_at))
            .cloned()
    }

    /// Promote an objective to in-progress and bump its run counter,
    /// unless it has already reached a terminal status.
    pub async fn mark_picked(&self, id: Uuid) -> Result<Option<Objective>> {
        let mut map = self.inner.write().await;
        let Some(objective) = map.get_mut(&id) else {
            return Ok(None);
        };
        if objective.status.is_terminal() {
            return Ok(Some(objective.clone()));
        }
        objective.status = ObjectiveStatus::InProgress;
        objective.run_count += 1;
        let now = Utc::now();
        objective.last_run_at = Some(now);
        objective.updated_at = now;
        let result = objective.clone();
        self.persist(&map).await?;
        Ok(Some(result))
    }

    /// Cancel pending objectives past `pending_max_age_hours` and block
    /// in-progress objectives idle past `in_progress_max_idle_hours`.
    /// Returns the number of objectives changed.
    pub async fn expire_stale(
        &self,
        pending_max_age_hours: u64,
        in_progress_max_idle_hours: u64,
    ) -> Result<usize> {
        let now = Utc::now();
        let mut map = self.inner.write().await;
        let mut changed = 0usize;

        for objective in map.values_mut() {
            if objective.status.is_terminal() {
                continue;
            }
            match objective.status {
                ObjectiveStatus::Pending => {
                    let age_hours = (now - objective.created_at).num_hours().max(0) as u64;
                    if age_hours >= pending_max_age_hours {
                        objective.status = ObjectiveStatus::Cancelled;
                        objective.updated_at = now;
                        objective.push_note(format!(
                            "auto-cancelled: pending for {age_hours}h (threshold {pending_max_age_hours}h)"
                        ));
                        changed += 1;
                    }
                }
                ObjectiveStatus::InProgress => {
                    let idle_hours = (now - objective.updated_at).num_hours().max(0) as u64;
                    if idle_hours >= in_progress_max_idle_hours {
                        objective.status = ObjectiveStatus::Blocked;
                        objective.updated_at = now;
                        objective.push_note(format!(
                            "auto-blocked: idle for {idle_hours}h (threshold {in_progress_max_idle_hours}h)"
                        ));
                        changed += 1;
                    }
                }
                _ => {}
            }
        }

        if changed > 0 {
            self.persist(&map).await?;
        }
        Ok(changed)
    }

    pub async fn stats(&self) -> ObjectiveStats {
        let map = self.inner.read().await;
        let mut stats = ObjectiveStats {
            pending: 0,
            in_progress: 0,
            blocked: 0,
            completed: 0,
            failed: 0,
            cancelled: 0,
        };
        for o in map.values() {
            match o.status {
                ObjectiveStatus::Pending => stats.pending += 1,
                ObjectiveStatus::InProgress => stats.in_progress += 1,
                ObjectiveStatus::Blocked => stats.blocked += 1,
                ObjectiveStatus::Completed => stats.completed += 1,
                ObjectiveStatus::Failed => stats.failed += 1,
                ObjectiveStatus::Cancelled => stats.cancelled += 1,
            }
        }
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn store() -> (ObjectiveStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let store = ObjectiveStore::new(dir.path()).await.unwrap();
        (store, dir)
    }

    #[tokio::test]
    async fn add_rejects_empty_title() {
        let (store, _dir) = store().await;
        let err = store.add("   ", "desc", 1, "test").await.unwrap_err();
        assert!(matches!(err, nxa_domain::error::Error::Validation(_)));
    }

    #[tokio::test]
    async fn pick_prefers_oldest_in_progress_over_pending() {
        let (store, _dir) = store().await;
        let a = store.add("a", "", 1, "test").await.unwrap();
        let _b = store.add("b", "", 1, "test").await.unwrap();
        store.mark_picked(a.id).await.unwrap();

        let picked = store.pick_for_autonomous().await.unwrap();
        assert_eq!(picked.id, a.id);
    }

    #[tokio::test]
    async fn pick_falls_back_to_highest_priority_pending() {
        let (store, _dir) = store().await;
        let low = store.add("low", "", 5, "test").await.unwrap();
        let high = store.add("high", "", 1, "test").await.unwrap();
        let _ = low;

        let picked = store.pick_for_autonomous().await.unwrap();
        assert_eq!(picked.id, high.id);
    }

    #[tokio::test]
    async fn mark_picked_is_noop_on_terminal_objective() {
        let (store, _dir) = store().await;
        let o = store.add("x", "", 1, "test").await.unwrap();
        store
            .update(o.id, Some(ObjectiveStatus::Completed), None)
            .await
            .unwrap();

        let result = store.mark_picked(o.id).await.unwrap().unwrap();
        assert_eq!(result.status, ObjectiveStatus::Completed);
        assert_eq!(result.run_count, 0);
    }

    #[tokio::test]
    async fn expire_stale_cancels_old_pending_and_blocks_idle_in_progress() {
        let (store, _dir) = store().await;
        let pending = store.add("p", "", 1, "test").await.unwrap();
        let running = store.add("r", "", 1, "test").await.unwrap();
        store.mark_picked(running.id).await.unwrap();

        // Force both timestamps into the past by going through update,
        // which is the only mutator the store exposes beyond add/mark_picked.
        {
            let mut map = store.inner.write().await;
            let p = map.get_mut(&pending.id).unwrap();
            p.created_at = Utc::now() - chrono::Duration::hours(100);
            let r = map.get_mut(&running.id).unwrap();
            r.updated_at = Utc::now() - chrono::Duration::hours(100);
        }

        let changed = store.expire_stale(72, 24).await.unwrap();
        assert_eq!(changed, 2);

        let p = store.get_by_id(pending.id).await.unwrap();
        assert_eq!(p.status, ObjectiveStatus::Cancelled);
        let r = store.get_by_id(running.id).await.unwrap();
        assert_eq!(r.status, ObjectiveStatus::Blocked);
    }

    #[tokio::test]
    async fn stats_counts_by_status() {
        let (store, _dir) = store().await;
        store.add("a", "", 1, "test").await.unwrap();
        let b = store.add("b", "", 1, "test").await.unwrap();
        store
            .update(b.id, Some(ObjectiveStatus::Failed), None)
            .await
            .unwrap();

        let stats = store.stats().await;
        assert_eq!(stats.pending, 1);
        assert_eq!(stats.failed, 1);
    }
}
