//! Point-in-time dashboard snapshot, persisted to `state/dashboard.json`
//! after every turn so a dashboard process can render current state
//! without holding a live connection into the orchestrator.

use chrono::{DateTime, Utc};
use nxa_domain::config::HomeLayout;
use nxa_domain::error::Result;
use nxa_lanequeue::QueueSnapshot;
use nxa_objectives::ObjectiveStats;
use nxa_sessions::LaneSessionInfo;
use nxa_tasks::TaskHealth;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub updated_at: DateTime<Utc>,
    pub queue: QueueSnapshotDto,
    pub lanes: Vec<LaneSnapshotDto>,
    pub task_health: TaskHealth,
    pub objective_stats: ObjectiveStats,
    pub last_lane_key: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshotDto {
    pub depth: usize,
    pub max_depth: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LaneSnapshotDto {
    pub lane_key: String,
    pub message_count: u64,
    pub running: bool,
}

impl From<&QueueSnapshot> for QueueSnapshotDto {
    fn from(s: &QueueSnapshot) -> Self {
        Self { depth: s.depth, max_depth: s.max_depth }
    }
}

impl From<&LaneSessionInfo> for LaneSnapshotDto {
    fn from(info: &LaneSessionInfo) -> Self {
        Self {
            lane_key: info.lane_key.clone(),
            message_count: info.message_count,
            running: info.running,
        }
    }
}

pub async fn persist(home: &HomeLayout, snapshot: &DashboardSnapshot) -> Result<()> {
    nxa_fsutil::write_json_atomic_async(home.dashboard_json(), snapshot).await
}
