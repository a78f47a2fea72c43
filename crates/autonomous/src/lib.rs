//! The autonomous loop: a periodic tick that drives the same orchestrator
//! a channel adapter would, but with a self-synthesized prompt instead of
//! an external message.
//!
//! One [`AutonomousLoop`] per process, ticked on an interval by
//! [`spawn_loop`]. Each tick either finds reason to skip (disabled,
//! already running, too much outstanding load) or picks an objective (or
//! falls back to a standing maintenance goal), hands it to
//! [`nxa_runtime::Runtime::handle_incoming`] under the `autonomous`
//! source, and folds the result into a consecutive-failure counter that
//! trips a circuit breaker.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use nxa_domain::config::AutonomousConfig;
use nxa_eventbus::EventBus;
use nxa_objectives::{Objective, ObjectiveStore};
use nxa_runtime::{IncomingMessage, Runtime};
use nxa_tasks::TaskManager;
use parking_lot::{Mutex, RwLock};

/// Aggregate status returned by [`AutonomousLoop::snapshot`], matching the
/// fields a dashboard needs to render the autonomous controller's state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct AutonomousState {
    pub enabled: bool,
    pub running: bool,
    pub last_tick_at: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
    pub consecutive_failures: u32,
    pub max_consecutive_failures: u32,
    pub total_ticks: u64,
    pub skipped_ticks: u64,
    pub disabled_reason: Option<String>,
    pub interval_ms: u64,
    pub skip_when_queue_above: usize,
    pub stale_pending_hours: u64,
    pub stale_in_progress_idle_hours: u64,
}

struct TickState {
    running: bool,
    last_tick_at: Option<DateTime<Utc>>,
    last_error: Option<String>,
    consecutive_failures: u32,
    total_ticks: u64,
    skipped_ticks: u64,
    disabled_reason: Option<String>,
}

impl TickState {
    fn new() -> Self {
        Self {
            running: false,
            last_tick_at: None,
            last_error: None,
            consecutive_failures: 0,
            total_ticks: 0,
            skipped_ticks: 0,
            disabled_reason: None,
        }
    }
}

/// Outcome of one tick's body, once past the skip gates. Mirrors the
/// completed/recoverable-failed split a tool-calling agent loop reports,
/// just collapsed to what the circuit breaker needs to know.
enum TickOutcome {
    Skipped(&'static str),
    Succeeded,
    Failed(String),
}

pub struct AutonomousLoop {
    config: RwLock<AutonomousConfig>,
    state: Mutex<TickState>,
    runtime: Arc<Runtime>,
    objectives: Arc<ObjectiveStore>,
    tasks: Arc<TaskManager>,
    events: Option<EventBus>,
}

impl AutonomousLoop {
    pub fn new(
        config: AutonomousConfig,
        runtime: Arc<Runtime>,
        objectives: Arc<ObjectiveStore>,
        tasks: Arc<TaskManager>,
        events: Option<EventBus>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config: RwLock::new(config),
            state: Mutex::new(TickState::new()),
            runtime,
            objectives,
            tasks,
            events,
        })
    }

    /// Replace the live config. Per spec, reconfiguring always clears a
    /// tripped circuit breaker so the loop resumes ticking.
    pub fn reconfigure(&self, config: AutonomousConfig) {
        *self.config.write() = config;
        self.state.lock().disabled_reason = None;
    }

    pub fn snapshot(&self) -> AutonomousState {
        let config = self.config.read();
        let state = self.state.lock();
        AutonomousState {
            enabled: config.enabled,
            running: state.running,
            last_tick_at: state.last_tick_at,
            last_error: state.last_error.clone(),
            consecutive_failures: state.consecutive_failures,
            max_consecutive_failures: config.max_consecutive_failures,
            total_ticks: state.total_ticks,
            skipped_ticks: state.skipped_ticks,
            disabled_reason: state.disabled_reason.clone(),
            interval_ms: config.effective_interval_ms(),
            skip_when_queue_above: config.skip_when_queue_above,
            stale_pending_hours: config.stale_pending_hours,
            stale_in_progress_idle_hours: config.stale_in_progress_idle_hours,
        }
    }

    fn emit(&self, kind: &str, payload: serde_json::Value) {
        if let Some(events) = &self.events {
            events.emit(kind, payload);
        }
    }

    /// One iteration. Never panics and never propagates an error — every
    /// failure mode is folded into the consecutive-failure counter.
    pub async fn tick(&self) {
        {
            let config = self.config.read();
            let mut state = self.state.lock();
            if !config.enabled {
                state.skipped_ticks += 1;
                return;
            }
            if state.disabled_reason.is_some() {
                state.skipped_ticks += 1;
                return;
            }
            if state.running {
                state.skipped_ticks += 1;
                return;
            }
            state.running = true;
        }

        let outcome = self.run_tick_body().await;

        let mut state = self.state.lock();
        state.running = false;
        state.total_ticks += 1;
        state.last_tick_at = Some(Utc::now());

        match outcome {
            TickOutcome::Skipped(reason) => {
                state.skipped_ticks += 1;
                tracing::debug!(reason, "autonomous tick skipped");
                self.emit("autonomous.skipped", serde_json::json!({ "reason": reason }));
            }
            TickOutcome::Succeeded => {
                state.consecutive_failures = 0;
                state.last_error = None;
                self.emit("autonomous.tick", serde_json::json!({ "outcome": "succeeded" }));
            }
            TickOutcome::Failed(detail) => {
                state.consecutive_failures += 1;
                state.last_error = Some(detail.clone());
                let max = self.config.read().max_consecutive_failures;
                if state.consecutive_failures >= max {
                    let reason = format!("{} consecutive failures (last: {detail})", state.consecutive_failures);
                    tracing::warn!(reason = %reason, "autonomous loop tripped circuit breaker");
                    state.disabled_reason = Some(reason);
                }
                self.emit(
                    "autonomous.tick",
                    serde_json::json!({ "outcome": "failed", "detail": detail }),
                );
            }
        }
    }

    async fn run_tick_body(&self) -> TickOutcome {
        let config = self.config.read().clone();

        let runtime_state = self.runtime.get_state(false, 0).await;
        let runtime_busy = runtime_state.lanes.iter().any(|l| l.running);
        if runtime_busy || runtime_state.queue_depth > config.skip_when_queue_above {
            return TickOutcome::Skipped("runtime_busy");
        }

        let health = self.tasks.get_health();
        if health.queued > 3 * health.max_concurrent.max(1) {
            return TickOutcome::Skipped("task_manager_pressure");
        }

        if let Err(e) = self
            .objectives
            .expire_stale(config.stale_pending_hours, config.stale_in_progress_idle_hours)
            .await
        {
            return TickOutcome::Failed(format!("objective expiry failed: {e}"));
        }

        let picked = self.objectives.pick_for_autonomous().await;
        let prompt_text = match &picked {
            Some(objective) => objective_prompt(objective),
            None => config.goal.clone(),
        };

        if let Some(objective) = &picked {
            if let Err(e) = self.objectives.mark_picked(objective.id).await {
                return TickOutcome::Failed(format!("failed to mark objective picked: {e}"));
            }
        }

        let incoming = IncomingMessage {
            source: "autonomous".to_string(),
            channel_id: "loop".to_string(),
            user_id: "autonomous".to_string(),
            session_id: None,
            text: prompt_text,
        };

        let reply = self.runtime.handle_incoming(incoming).await;
        if reply.starts_with("Runtime error:") {
            TickOutcome::Failed(reply)
        } else {
            TickOutcome::Succeeded
        }
    }
}

fn objective_prompt(objective: &Objective) -> String {
    format!(
        "Work on the following objective:\n\nTitle: {}\nPriority: {}\nDescription: {}",
        objective.title, objective.priority, objective.description
    )
}

/// Spawn the interval-driven tick loop, mirroring the one-`tokio::spawn`-
/// per-periodic-task shape used throughout this codebase's own background
/// jobs (session flush, stale pruning, schedule runner).
pub fn spawn_loop(controller: Arc<AutonomousLoop>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let interval_ms = controller.config.read().effective_interval_ms();
            tokio::time::sleep(Duration::from_millis(interval_ms)).await;
            controller.tick().await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxa_domain::config::{
        ContextpackConfig, HomeLayout, MemoryConfig, RuntimeConfig, SkillsConfig,
    };
    use nxa_lanequeue::LaneQueue;
    use nxa_memory::embedder::LocalHashEmbedder;
    use nxa_memory::MemoryStore;
    use nxa_runtime::{AlwaysAuthenticated, RuntimeDeps};
    use nxa_sessions::{AgentSession, SessionRegistry};
    use nxa_skills::SkillsRegistry;

    struct EchoSession;

    #[async_trait::async_trait]
    impl AgentSession for EchoSession {
        async fn prompt(&self, text: &str) -> nxa_domain::error::Result<String> {
            Ok(format!("echo: {text}"))
        }
    }

    async fn build_controller(dir: &std::path::Path, config: AutonomousConfig) -> Arc<AutonomousLoop> {
        let home = HomeLayout::new(dir);
        std::fs::create_dir_all(home.workspace_dir()).unwrap();
        std::fs::create_dir_all(home.root().join("state")).unwrap();

        let memory = Arc::new(
            MemoryStore::new(home.clone(), MemoryConfig::default(), Box::new(LocalHashEmbedder::new(64)))
                .unwrap(),
        );
        let objectives = Arc::new(ObjectiveStore::new(&home.root().join("state")).await.unwrap());
        let tasks = TaskManager::spawn(home.clone(), Default::default(), None);
        let skills = Arc::new(SkillsRegistry::empty());

        let runtime = Arc::new(Runtime::new(RuntimeDeps {
            config: RuntimeConfig::default(),
            contextpack_config: ContextpackConfig::default(),
            skills_config: SkillsConfig::default(),
            home,
            sessions: Arc::new(SessionRegistry::new(128, 60)),
            lane_queue: Arc::new(LaneQueue::new(64, None)),
            memory,
            objectives: objectives.clone(),
            tasks: tasks.clone(),
            skills,
            context_builder: nxa_contextpack::ContextPackBuilder::new(4_000, 20_000),
            summary_cache: nxa_contextpack::SummaryCache::new(8),
            events: None,
            auth: Arc::new(AlwaysAuthenticated),
            session_factory: Arc::new(|| Arc::new(EchoSession) as Arc<dyn AgentSession>),
        }));

        AutonomousLoop::new(config, runtime, objectives, tasks, None)
    }

    #[tokio::test]
    async fn disabled_loop_skips_without_running() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutonomousConfig::default();
        assert!(!config.enabled);
        let controller = build_controller(dir.path(), config).await;

        controller.tick().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.total_ticks, 0);
        assert_eq!(snapshot.skipped_ticks, 1);
    }

    #[tokio::test]
    async fn enabled_loop_falls_back_to_maintenance_goal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AutonomousConfig::default();
        config.enabled = true;
        config.goal = "Tidy up.".to_string();
        let controller = build_controller(dir.path(), config).await;

        controller.tick().await;

        let snapshot = controller.snapshot();
        assert_eq!(snapshot.total_ticks, 1);
        assert_eq!(snapshot.consecutive_failures, 0);
        assert!(snapshot.last_error.is_none());
    }

    #[tokio::test]
    async fn circuit_breaker_trips_after_max_consecutive_failures() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = AutonomousConfig::default();
        config.enabled = true;
        config.max_consecutive_failures = 2;
        let controller = build_controller(dir.path(), config).await;

        // Force failures directly through the tick-state bookkeeping path
        // rather than contriving a failing session, since the circuit
        // breaker logic lives entirely in `tick`'s outcome handling.
        for _ in 0..2 {
            let mut state = controller.state.lock();
            state.consecutive_failures += 1;
            let max = controller.config.read().max_consecutive_failures;
            if state.consecutive_failures >= max {
                state.disabled_reason = Some("forced".to_string());
            }
        }

        let snapshot = controller.snapshot();
        assert!(snapshot.disabled_reason.is_some());

        controller.tick().await;
        let snapshot = controller.snapshot();
        assert_eq!(snapshot.skipped_ticks, 1, "tripped breaker should skip further ticks");
    }

    #[tokio::test]
    async fn reconfigure_clears_disabled_reason() {
        let dir = tempfile::tempdir().unwrap();
        let config = AutonomousConfig::default();
        let controller = build_controller(dir.path(), config.clone()).await;
        controller.state.lock().disabled_reason = Some("stale".to_string());

        controller.reconfigure(config);

        assert!(controller.snapshot().disabled_reason.is_none());
    }
}
