//! Keyed FIFO work scheduler.
//!
//! Work submitted under the same lane key runs strictly one at a time, in
//! submission order, while different lanes run fully concurrently. A single
//! depth counter spans every lane so the whole queue can be capacity-bounded
//! regardless of how the work is distributed across keys.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use nxa_domain::error::{Error, Result};
use nxa_eventbus::EventBus;
use tokio::sync::Mutex as AsyncMutex;

struct LaneState {
    /// Held for the duration of one unit of work on this lane; tokio's
    /// mutex wakes waiters in acquire order, which is what gives lanes
    /// their FIFO property.
    turn: AsyncMutex<()>,
    pending: AtomicUsize,
}

/// One row of [`LaneQueue::snapshot`].
#[derive(Debug, Clone)]
pub struct LaneSnapshot {
    pub lane_key: String,
    pub pending: usize,
}

/// Point-in-time view of queue occupancy, for health/dashboard reporting.
#[derive(Debug, Clone)]
pub struct QueueSnapshot {
    pub depth: usize,
    pub max_depth: usize,
    pub lanes: Vec<LaneSnapshot>,
}

pub struct LaneQueue {
    lanes: DashMap<String, Arc<LaneState>>,
    depth: AtomicUsize,
    max_depth: usize,
    events: Option<EventBus>,
}

impl LaneQueue {
    pub fn new(max_depth: usize, events: Option<EventBus>) -> Self {
        Self {
            lanes: DashMap::new(),
            depth: AtomicUsize::new(0),
            max_depth,
            events,
        }
    }

    /// Run `work` serialized against every other enqueue on `lane_key`.
    ///
    /// Depth is reserved, and checked against `max_depth`, before the work
    /// is attached to the lane's chain — a lane already full of queued work
    /// cannot itself cause an overflow rejection once this call is admitted.
    /// Returns [`Error::QueueOverflow`] without ever touching the lane.
    pub async fn enqueue<F, Fut, T>(&self, lane_key: &str, work: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let depth = self.depth.fetch_add(1, Ordering::SeqCst) + 1;
        if depth > self.max_depth {
            self.depth.fetch_sub(1, Ordering::SeqCst);
            return Err(Error::QueueOverflow {
                depth: depth - 1,
                limit: self.max_depth,
            });
        }

        let lane = self
            .lanes
            .entry(lane_key.to_string())
            .or_insert_with(|| {
                Arc::new(LaneState {
                    turn: AsyncMutex::new(()),
                    pending: AtomicUsize::new(0),
                })
            })
            .clone();
        lane.pending.fetch_add(1, Ordering::SeqCst);
        let _reservation = ReservationGuard {
            queue: self,
            lane_key: lane_key.to_string(),
            lane: lane.clone(),
        };

        self.emit("enqueue", lane_key, depth);

        let _turn = lane.turn.lock().await;
        self.emit("start", lane_key, depth);
        let result = work().await;
        self.emit("end", lane_key, depth);

        Ok(result)
    }

    fn emit(&self, kind: &str, lane_key: &str, depth: usize) {
        if let Some(events) = &self.events {
            events.emit(
                format!("lanequeue.{kind}"),
                serde_json::json!({ "laneKey": lane_key, "depth": depth }),
            );
        }
    }

    /// Total reserved depth across every lane (queued + actively running).
    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let lanes = self
            .lanes
            .iter()
            .map(|entry| LaneSnapshot {
                lane_key: entry.key().clone(),
                pending: entry.value().pending.load(Ordering::SeqCst),
            })
            .collect();
        QueueSnapshot {
            depth: self.depth(),
            max_depth: self.max_depth,
            lanes,
        }
    }
}

/// Releases the depth + pending reservation when the enqueued call's future
/// is dropped, whether that's normal completion, an early return, or a
/// panic unwinding through the held `await` — the lane must never stay
/// reserved past the call that reserved it.
struct ReservationGuard<'a> {
    queue: &'a LaneQueue,
    lane_key: String,
    lane: Arc<LaneState>,
}

impl Drop for ReservationGuard<'_> {
    fn drop(&mut self) {
        self.queue.depth.fetch_sub(1, Ordering::SeqCst);
        let prev = self.lane.pending.fetch_sub(1, Ordering::SeqCst);
        if prev == 1 {
            self.queue
                .lanes
                .remove_if(&self.lane_key, |_, state| state.pending.load(Ordering::SeqCst) == 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn runs_independent_lanes_concurrently() {
        let queue = Arc::new(LaneQueue::new(10, None));
        let a = queue.clone();
        let b = queue.clone();

        let start = tokio::time::Instant::now();
        let (r1, r2) = tokio::join!(
            a.enqueue("lane-a", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                1
            }),
            b.enqueue("lane-b", || async {
                tokio::time::sleep(Duration::from_millis(50)).await;
                2
            }),
        );
        assert_eq!(r1.unwrap(), 1);
        assert_eq!(r2.unwrap(), 2);
        assert!(start.elapsed() < Duration::from_millis(95));
    }

    #[tokio::test]
    async fn serializes_same_lane() {
        let queue = Arc::new(LaneQueue::new(10, None));
        let order = Arc::new(parking_lot_like_mutex());

        async fn push(order: &Arc<std::sync::Mutex<Vec<u32>>>, n: u32) {
            tokio::time::sleep(Duration::from_millis(10)).await;
            order.lock().unwrap().push(n);
        }

        fn parking_lot_like_mutex() -> std::sync::Mutex<Vec<u32>> {
            std::sync::Mutex::new(Vec::new())
        }

        let o1 = order.clone();
        let o2 = order.clone();
        let q1 = queue.clone();
        let q2 = queue.clone();

        let first = q1.enqueue("lane-x", move || async move { push(&o1, 1).await });
        // Give the first call time to claim the lane's turn before the second is issued.
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = q2.enqueue("lane-x", move || async move { push(&o2, 2).await });

        let (r1, r2) = tokio::join!(first, second);
        r1.unwrap();
        r2.unwrap();
        assert_eq!(*order.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn rejects_over_capacity_before_touching_lane() {
        let queue = Arc::new(LaneQueue::new(1, None));
        let blocker = queue.clone();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let blocking_call = tokio::spawn(async move {
            blocker
                .enqueue("lane-a", || async move {
                    let _ = rx.await;
                })
                .await
        });

        tokio::time::sleep(Duration::from_millis(10)).await;
        let result = queue.enqueue("lane-b", || async { 1 }).await;
        assert!(matches!(result, Err(Error::QueueOverflow { .. })));

        tx.send(()).unwrap();
        blocking_call.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn lane_entry_is_removed_once_drained() {
        let queue = LaneQueue::new(10, None);
        queue.enqueue("lane-a", || async { 1 }).await.unwrap();
        assert!(queue.snapshot().lanes.is_empty());
        assert_eq!(queue.depth(), 0);
    }
}
