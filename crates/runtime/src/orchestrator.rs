//! The runtime orchestrator: `handle_incoming` and its auxiliary ops.
//!
//! One [`Runtime`] per process, wiring together the lane queue, session
//! registry, memory store, objective queue, task manager, skills
//! registry, and context-pack builder that every turn touches. The
//! concrete LLM client is supplied as a `session_factory` closure — this
//! crate only ever talks to it through [`nxa_sessions::AgentSession`].

use std::sync::Arc;
use std::time::Duration;

use nxa_contextpack::{ContextPackBuilder, SummaryCache};
use nxa_domain::config::{ContextpackConfig, HomeLayout, RuntimeConfig, SkillsConfig};
use nxa_domain::error::Error;
use nxa_eventbus::{EventBus, EventRecord};
use nxa_lanequeue::{LaneQueue, QueueSnapshot};
use nxa_memory::{Actor, MemoryStore, SearchMode, SearchQuery};
use nxa_objectives::{ObjectiveStats, ObjectiveStore};
use nxa_sessions::{AgentSession, LaneSessionInfo, SessionRegistry};
use nxa_skills::SkillsRegistry;
use nxa_tasks::{TaskHealth, TaskManager};

use crate::auth::{AuthSnapshotProvider, AUTH_REQUIRED_MESSAGE};
use crate::channel_health::ChannelHealthRegistry;
use crate::dashboard::{self, DashboardSnapshot, LaneSnapshotDto, QueueSnapshotDto};
use crate::incoming::{IncomingMessage, SafeIncoming};
use crate::prompt::{self, PromptInputs};

type SessionFactory = dyn Fn() -> Arc<dyn AgentSession> + Send + Sync;

/// Everything `Runtime::new` needs; one field per injected collaborator.
pub struct RuntimeDeps {
    pub config: RuntimeConfig,
    pub contextpack_config: ContextpackConfig,
    pub skills_config: SkillsConfig,
    pub home: HomeLayout,
    pub sessions: Arc<SessionRegistry>,
    pub lane_queue: Arc<LaneQueue>,
    pub memory: Arc<MemoryStore>,
    pub objectives: Arc<ObjectiveStore>,
    pub tasks: Arc<TaskManager>,
    pub skills: Arc<SkillsRegistry>,
    pub context_builder: ContextPackBuilder,
    pub summary_cache: SummaryCache,
    pub events: Option<EventBus>,
    pub auth: Arc<dyn AuthSnapshotProvider>,
    pub session_factory: Arc<SessionFactory>,
}

pub struct Runtime {
    config: RuntimeConfig,
    contextpack_config: ContextpackConfig,
    skills_config: SkillsConfig,
    home: HomeLayout,
    sessions: Arc<SessionRegistry>,
    lane_queue: Arc<LaneQueue>,
    memory: Arc<MemoryStore>,
    objectives: Arc<ObjectiveStore>,
    tasks: Arc<TaskManager>,
    skills: Arc<SkillsRegistry>,
    context_builder: ContextPackBuilder,
    summary_cache: SummaryCache,
    events: Option<EventBus>,
    auth: Arc<dyn AuthSnapshotProvider>,
    channel_health: ChannelHealthRegistry,
    session_factory: Arc<SessionFactory>,
}

/// Aggregate status returned by [`Runtime::get_state`].
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuntimeState {
    pub queue_depth: usize,
    pub max_queue_depth: usize,
    pub lanes: Vec<LaneSessionInfoDto>,
    pub task_health: TaskHealth,
    pub objective_stats: ObjectiveStats,
    pub authenticated: bool,
    pub recent_events: Option<Vec<EventRecord>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LaneSessionInfoDto {
    pub lane_key: String,
    pub base_lane_key: String,
    pub message_count: u64,
    pub running: bool,
}

impl From<&LaneSessionInfo> for LaneSessionInfoDto {
    fn from(info: &LaneSessionInfo) -> Self {
        Self {
            lane_key: info.lane_key.clone(),
            base_lane_key: info.base_lane_key.clone(),
            message_count: info.message_count,
            running: info.running,
        }
    }
}

impl Runtime {
    pub fn new(deps: RuntimeDeps) -> Self {
        Self {
            config: deps.config,
            contextpack_config: deps.contextpack_config,
            skills_config: deps.skills_config,
            home: deps.home,
            sessions: deps.sessions,
            lane_queue: deps.lane_queue,
            memory: deps.memory,
            objectives: deps.objectives,
            tasks: deps.tasks,
            skills: deps.skills,
            context_builder: deps.context_builder,
            summary_cache: deps.summary_cache,
            events: deps.events,
            auth: deps.auth,
            channel_health: ChannelHealthRegistry::new(),
            session_factory: deps.session_factory,
        }
    }

    fn emit(&self, kind: &str, payload: serde_json::Value) {
        if let Some(events) = &self.events {
            events.emit(kind, payload);
        }
    }

    /// The public entry point: one incoming message in, one reply out.
    /// Never returns an `Err` — failures are folded into the reply text
    /// per the canonical "authentication required" / "Runtime error: "
    /// conventions so every caller has one string to show the user.
    pub async fn handle_incoming(&self, incoming: IncomingMessage) -> String {
        if !self.auth.is_authenticated().await {
            return AUTH_REQUIRED_MESSAGE.to_string();
        }

        let safe = incoming.sanitized();
        if !self.channel_health.is_healthy(&safe.channel_id) {
            return format!("Runtime error: channel {} reported unhealthy", safe.channel_id);
        }

        let lane_key = safe.lane_key();
        let depth = self.lane_queue.depth();
        if depth >= self.config.max_queue_depth {
            return format!(
                "Runtime error: queue depth {depth} >= limit {}",
                self.config.max_queue_depth
            );
        }

        let text = incoming.text;
        let result = self
            .lane_queue
            .enqueue(&lane_key, || async { self.run_turn(&safe, &lane_key, &text).await })
            .await;

        match result {
            Ok(reply) => reply,
            Err(e) => format!("Runtime error: {e}"),
        }
    }

    /// Steps 4a–4g of one turn, run with the lane's serialization already
    /// held by the caller's `lane_queue.enqueue`.
    async fn run_turn(&self, safe: &SafeIncoming, lane_key: &str, text: &str) -> String {
        let factory = self.session_factory.clone();
        let entry = self
            .sessions
            .acquire_or_create(lane_key, &safe.base_lane_key(), move || (*factory)());
        let _guard = self.sessions.begin_turn(&entry);

        let source_tag = format!("{}:{}", safe.source, safe.channel_id);
        let _ = self.memory.append_raw(
            Actor::User,
            text.to_string(),
            source_tag.clone(),
            Vec::new(),
            Some(lane_key.to_string()),
        );

        let memory_hits = self
            .memory
            .search(SearchQuery {
                text: text.to_string(),
                limit: 6,
                session_key: Some(lane_key.to_string()),
                mode: SearchMode::SessionStrict,
            })
            .await
            .unwrap_or_default();

        let working_memory = self.memory.working_memory_context().unwrap_or_default();
        let objectives = self
            .objectives
            .list(None)
            .await
            .into_iter()
            .filter(|o| !o.status.is_terminal())
            .collect::<Vec<_>>();
        let tasks = self.tasks.list(false);
        let skills_preview = self
            .skills
            .render_prompt_preview(self.skills_config.max_prompt_skills, self.skills_config.max_prompt_chars);
        let is_first_run = self.memory.is_empty();

        let prompt_text = prompt::compose(
            &self.context_builder,
            &self.summary_cache,
            self.contextpack_config.core_context_summarize_threshold,
            &self.home,
            entry.session(),
            PromptInputs {
                incoming: safe,
                lane_key,
                queue_depth: self.lane_queue.depth(),
                max_queue_depth: self.config.max_queue_depth,
                is_first_run,
                memory_hits: &memory_hits,
                working_memory: &working_memory,
                objectives: &objectives,
                tasks: &tasks,
                skills_preview: &skills_preview,
                user_text: text,
            },
        )
        .await;

        self.emit(
            "runtime.prompt",
            serde_json::json!({ "laneKey": lane_key, "chars": prompt_text.len() }),
        );

        let reply = match self.call_with_recovery(&entry, &prompt_text).await {
            Ok(text) => text,
            Err(detail) => {
                self.persist_dashboard(Some(lane_key)).await;
                return format!("Runtime error: {detail}");
            }
        };

        let _ = self.memory.append_raw(
            Actor::Assistant,
            reply.clone(),
            source_tag,
            Vec::new(),
            Some(lane_key.to_string()),
        );
        let _ = self.memory.journal_if_important(&reply, lane_key);
        let _ = self.memory.compact(self.config.raw_compaction_threshold, false).await;
        self.sessions.sweep();
        self.persist_dashboard(Some(lane_key)).await;

        reply
    }

    /// Step 4e–4f: call `session.prompt`, retrying through context-overflow
    /// recovery cycles independently of the overall retry cap.
    async fn call_with_recovery(
        &self,
        entry: &nxa_sessions::LaneEntry,
        prompt_text: &str,
    ) -> Result<String, String> {
        let mut attempt = 0u32;
        let mut overflow_attempts = 0u32;

        loop {
            attempt += 1;
            let call = tokio::time::timeout(
                Duration::from_millis(self.config.prompt_timeout_ms),
                entry.session().prompt(prompt_text),
            )
            .await;

            match call {
                Ok(Ok(text)) => return Ok(text),
                Ok(Err(e)) => {
                    let detail = e.to_string();
                    if Error::looks_like_context_overflow(&detail)
                        && overflow_attempts < self.config.max_overflow_compaction_attempts
                    {
                        overflow_attempts += 1;
                        self.recover_from_overflow(entry).await;
                        if attempt < self.config.max_prompt_retries {
                            continue;
                        }
                    } else if attempt < self.config.max_prompt_retries {
                        continue;
                    }
                    return Err(detail);
                }
                Err(_elapsed) => {
                    if attempt < self.config.max_prompt_retries {
                        continue;
                    }
                    return Err(format!("prompt timed out after {}ms", self.config.prompt_timeout_ms));
                }
            }
        }
    }

    /// Prefer compacting the shared memory log; fall back to asking the
    /// session itself to drop history only when that produced nothing
    /// (too few raw entries to fold yet, or the session has no history of
    /// its own to trim).
    async fn recover_from_overflow(&self, entry: &nxa_sessions::LaneEntry) {
        match self.memory.compact(self.config.raw_compaction_threshold, true).await {
            Ok(Some(_)) => {}
            _ => {
                let _ = entry.session().compact_history().await;
            }
        }
    }

    async fn persist_dashboard(&self, last_lane_key: Option<&str>) {
        let queue: QueueSnapshot = self.lane_queue.snapshot();
        let lanes: Vec<LaneSnapshotDto> = self.sessions.list().iter().map(LaneSnapshotDto::from).collect();
        let task_health = self.tasks.get_health();
        let objective_stats = self.objectives.stats().await;

        let snapshot = DashboardSnapshot {
            updated_at: chrono::Utc::now(),
            queue: QueueSnapshotDto::from(&queue),
            lanes,
            task_health,
            objective_stats,
            last_lane_key: last_lane_key.map(|s| s.to_string()),
        };

        if let Err(e) = dashboard::persist(&self.home, &snapshot).await {
            tracing::warn!(error = %e, "failed to persist dashboard snapshot");
        }
    }

    // ── Auxiliary operations ──────────────────────────────────────────

    pub async fn get_state(&self, include_events: bool, events_limit: usize) -> RuntimeState {
        RuntimeState {
            queue_depth: self.lane_queue.depth(),
            max_queue_depth: self.config.max_queue_depth,
            lanes: self.sessions.list().iter().map(LaneSessionInfoDto::from).collect(),
            task_health: self.tasks.get_health(),
            objective_stats: self.objectives.stats().await,
            authenticated: self.auth.is_authenticated().await,
            recent_events: if include_events {
                self.events.as_ref().map(|e| e.get_recent(events_limit))
            } else {
                None
            },
        }
    }

    pub fn list_conversation_sessions(&self) -> Vec<LaneSessionInfo> {
        self.sessions.list()
    }

    pub fn create_conversation_session(
        &self,
        source: &str,
        channel: &str,
        session_id: Option<&str>,
    ) -> LaneSessionInfo {
        let safe = IncomingMessage {
            source: source.to_string(),
            channel_id: channel.to_string(),
            user_id: String::new(),
            session_id: session_id.map(|s| s.to_string()),
            text: String::new(),
        }
        .sanitized();

        let factory = self.session_factory.clone();
        let entry = self
            .sessions
            .acquire_or_create(&safe.lane_key(), &safe.base_lane_key(), move || (*factory)());
        entry.info()
    }

    pub fn archive_conversation_session(&self, lane_key: &str) -> nxa_domain::error::Result<()> {
        self.sessions.archive(lane_key)
    }

    pub fn set_channel_health(&self, channel_id: &str, healthy: bool) {
        self.channel_health.set_channel_health(channel_id, healthy);
    }

    /// No background task is owned directly by the orchestrator itself —
    /// this just records the shutdown and flushes a final snapshot so a
    /// dashboard reading `dashboard.json` sees it was a clean stop.
    pub async fn shutdown(&self) {
        self.emit("runtime.shutdown", serde_json::json!({}));
        self.persist_dashboard(None).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxa_domain::config::MemoryConfig;
    use nxa_memory::embedder::LocalHashEmbedder;

    struct EchoSession;

    #[async_trait::async_trait]
    impl AgentSession for EchoSession {
        async fn prompt(&self, text: &str) -> nxa_domain::error::Result<String> {
            Ok(format!("echo: {text}"))
        }
    }

    struct AlwaysAuthenticated;

    #[async_trait::async_trait]
    impl crate::auth::AuthSnapshotProvider for AlwaysAuthenticated {
        async fn is_authenticated(&self) -> bool {
            true
        }
    }

    struct NeverAuthenticated;

    #[async_trait::async_trait]
    impl crate::auth::AuthSnapshotProvider for NeverAuthenticated {
        async fn is_authenticated(&self) -> bool {
            false
        }
    }

    async fn build_runtime(
        dir: &std::path::Path,
        max_queue_depth: usize,
        auth: Arc<dyn AuthSnapshotProvider>,
    ) -> Runtime {
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

        let mut config = RuntimeConfig::default();
        config.max_queue_depth = max_queue_depth;

        Runtime::new(RuntimeDeps {
            config,
            contextpack_config: ContextpackConfig::default(),
            skills_config: SkillsConfig::default(),
            home,
            sessions: Arc::new(SessionRegistry::new(128, 60)),
            lane_queue: Arc::new(LaneQueue::new(max_queue_depth, None)),
            memory,
            objectives,
            tasks,
            skills,
            context_builder: ContextPackBuilder::new(4_000, 20_000),
            summary_cache: SummaryCache::new(8),
            events: None,
            auth,
            session_factory: Arc::new(|| Arc::new(EchoSession) as Arc<dyn AgentSession>),
        })
    }

    fn incoming(text: &str) -> IncomingMessage {
        IncomingMessage {
            source: "cli".into(),
            channel_id: "local".into(),
            user_id: "u".into(),
            session_id: None,
            text: text.to_string(),
        }
    }

    #[tokio::test]
    async fn rejects_unauthenticated_callers() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = build_runtime(dir.path(), 64, Arc::new(NeverAuthenticated)).await;

        let reply = runtime.handle_incoming(incoming("hello")).await;
        assert_eq!(reply, AUTH_REQUIRED_MESSAGE);
    }

    #[tokio::test]
    async fn happy_path_turn_returns_session_reply() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = build_runtime(dir.path(), 64, Arc::new(AlwaysAuthenticated)).await;

        let reply = runtime.handle_incoming(incoming("hello there")).await;
        assert!(reply.contains("echo:"));

        let state = runtime.get_state(false, 0).await;
        assert_eq!(state.lanes.len(), 1);
        assert!(state.authenticated);
    }

    #[tokio::test]
    async fn rejects_when_queue_is_already_at_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = build_runtime(dir.path(), 0, Arc::new(AlwaysAuthenticated)).await;

        let reply = runtime.handle_incoming(incoming("hello")).await;
        assert!(reply.starts_with("Runtime error: queue depth"));
    }

    #[tokio::test]
    async fn unhealthy_channel_is_rejected_before_enqueue() {
        let dir = tempfile::tempdir().unwrap();
        let runtime = build_runtime(dir.path(), 64, Arc::new(AlwaysAuthenticated)).await;
        runtime.set_channel_health("local", false);

        let reply = runtime.handle_incoming(incoming("hello")).await;
        assert_eq!(reply, "Runtime error: channel local reported unhealthy");
    }
}

