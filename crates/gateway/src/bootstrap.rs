//! Wires every collaborator crate into one [`AppState`], the way the
//! teacher's own `bootstrap::build_app_state` assembled its `AppState`
//! from a loaded `Config` before any server or CLI command ran.

use std::sync::Arc;

use nxa_autonomous::AutonomousLoop;
use nxa_contextpack::{ContextPackBuilder, SummaryCache};
use nxa_domain::config::Config;
use nxa_eventbus::EventBus;
use nxa_lanequeue::LaneQueue;
use nxa_memory::MemoryStore;
use nxa_objectives::ObjectiveStore;
use nxa_runtime::{Runtime, RuntimeDeps};
use nxa_sessions::{AgentSession, SessionRegistry};
use nxa_skills::SkillsRegistry;
use nxa_tasks::TaskManager;

use crate::auth_provider::FileAuthProvider;
use crate::session_adapter::ProcessSession;
use crate::state::AppState;

/// Build the full [`AppState`], creating every on-disk directory the
/// home layout expects and starting the event-bus flusher task.
pub async fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    let home = config.layout();
    for dir in home.all_dirs() {
        tokio::fs::create_dir_all(&dir).await?;
    }

    let events_handle = EventBus::spawn(home.events_jsonl());
    let events = events_handle.bus;
    tokio::spawn(async move {
        if let Err(e) = events_handle.flusher.await {
            tracing::warn!(error = %e, "event bus flusher task ended unexpectedly");
        }
    });

    let openai_key = std::env::var("OPENAI_API_KEY").ok();
    let gemini_key = std::env::var("GEMINI_API_KEY").ok();
    let embedder = nxa_memory::resolve_embedder(
        config.memory.vector.provider,
        &config.memory.vector.model,
        config.memory.vector.dims,
        openai_key.as_deref(),
        gemini_key.as_deref(),
    );
    let memory = Arc::new(MemoryStore::new(home.clone(), config.memory.clone(), embedder)?);

    let objectives = Arc::new(ObjectiveStore::new(&home.state_dir()).await?);
    let tasks = TaskManager::spawn(home.clone(), config.tasks.clone(), Some(events.clone()));
    let skills = Arc::new(SkillsRegistry::load(&home.skills_dir(), None, &home.skills_json())?);

    let sessions = Arc::new(SessionRegistry::new(
        config.runtime.max_session_lanes,
        config.runtime.max_session_idle_minutes,
    ));
    let lane_queue = Arc::new(LaneQueue::new(config.runtime.max_queue_depth, Some(events.clone())));

    let auth: Arc<dyn nxa_runtime::AuthSnapshotProvider> = Arc::new(FileAuthProvider::new(home.auth_json()));

    let provider = config.llm.default_provider;
    let model = config.llm.default_model.clone();
    let session_factory: Arc<dyn Fn() -> Arc<dyn AgentSession> + Send + Sync> =
        Arc::new(move || Arc::new(ProcessSession::new(provider, model.clone())) as Arc<dyn AgentSession>);

    let runtime = Arc::new(Runtime::new(RuntimeDeps {
        config: config.runtime.clone(),
        contextpack_config: config.contextpack.clone(),
        skills_config: config.skills.clone(),
        home: home.clone(),
        sessions,
        lane_queue,
        memory: memory.clone(),
        objectives: objectives.clone(),
        tasks: tasks.clone(),
        skills: skills.clone(),
        context_builder: ContextPackBuilder::new(config.contextpack.max_per_file_chars, config.contextpack.total_max_chars),
        summary_cache: SummaryCache::new(config.contextpack.summary_cache_capacity),
        events: Some(events.clone()),
        auth,
        session_factory,
    }));

    let autonomous =
        AutonomousLoop::new(config.autonomous.clone(), runtime.clone(), objectives.clone(), tasks.clone(), Some(events.clone()));

    Ok(AppState {
        runtime,
        autonomous,
        home,
        memory,
        objectives,
        tasks,
        skills,
        events: Some(events),
        dashboard_token: config.dashboard.token.clone(),
    })
}
