//! `AppState`: the single object every HTTP handler and CLI command
//! reaches into, grouped by concern the way the teacher's own
//! `AppState` was grouped.

use std::sync::Arc;

use nxa_domain::config::HomeLayout;
use nxa_eventbus::EventBus;
use nxa_memory::MemoryStore;
use nxa_objectives::ObjectiveStore;
use nxa_runtime::Runtime;
use nxa_skills::SkillsRegistry;
use nxa_tasks::TaskManager;

use nxa_autonomous::AutonomousLoop;

#[derive(Clone)]
pub struct AppState {
    // ── Core services ───────────────────────────────────────────────
    pub runtime: Arc<Runtime>,
    pub autonomous: Arc<AutonomousLoop>,
    pub home: HomeLayout,

    // ── Durable collaborators surfaced directly by the HTTP API ──────
    pub memory: Arc<MemoryStore>,
    pub objectives: Arc<ObjectiveStore>,
    pub tasks: Arc<TaskManager>,
    pub skills: Arc<SkillsRegistry>,

    // ── Observability ────────────────────────────────────────────────
    pub events: Option<EventBus>,

    // ── Security ──────────────────────────────────────────────────────
    pub dashboard_token: Option<String>,
}
