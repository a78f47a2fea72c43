//! Deterministic assembly of the text handed to `session.prompt`.
//!
//! Builds on [`nxa_contextpack::ContextPackBuilder`] for the core
//! identity/user/agents file set, then layers the bounded snapshots the
//! orchestrator itself is responsible for: objectives, tasks, memory
//! hits, working memory, and the enabled-skills preview.

use std::sync::Arc;

use nxa_contextpack::{ContextPackBuilder, SessionMode, SummaryCache, WorkspaceFile};
use nxa_domain::config::HomeLayout;
use nxa_memory::{SearchHit, WorkingMemoryContext};
use nxa_objectives::Objective;
use nxa_sessions::AgentSession;
use nxa_tasks::Task;

use crate::incoming::SafeIncoming;

const WORKSPACE_FILE_NAMES: &[&str] = &[
    "AGENTS.md",
    "SOUL.md",
    "USER.md",
    "IDENTITY.md",
    "TOOLS.md",
    "BOOTSTRAP.md",
    "HEARTBEAT.md",
    "MEMORY.md",
];

const BEHAVIOUR_RULES: &str = "\
Follow the user's instructions precisely. Prefer small, verifiable steps \
over large speculative changes. State uncertainty rather than guessing.";

const MAX_OBJECTIVES: usize = 8;
const MAX_TASKS: usize = 8;

pub struct PromptInputs<'a> {
    pub incoming: &'a SafeIncoming,
    pub lane_key: &'a str,
    pub queue_depth: usize,
    pub max_queue_depth: usize,
    pub is_first_run: bool,
    pub memory_hits: &'a [SearchHit],
    pub working_memory: &'a WorkingMemoryContext,
    pub objectives: &'a [Objective],
    pub tasks: &'a [Task],
    pub skills_preview: &'a str,
    pub user_text: &'a str,
}

/// Read the fixed workspace file set off disk, marking anything missing
/// rather than failing — `ContextPackBuilder` injects a missing-file
/// marker for those instead of erroring.
fn read_workspace_files(home: &HomeLayout) -> Vec<WorkspaceFile> {
    WORKSPACE_FILE_NAMES
        .iter()
        .map(|name| WorkspaceFile {
            name: name.to_string(),
            content: std::fs::read_to_string(home.workspace_file(name)).ok(),
        })
        .collect()
}

/// Compose the full prompt for one turn.
pub async fn compose(
    builder: &ContextPackBuilder,
    cache: &SummaryCache,
    summarize_threshold: usize,
    home: &HomeLayout,
    session: &Arc<dyn AgentSession>,
    inputs: PromptInputs<'_>,
) -> String {
    let files = read_workspace_files(home);
    let user_facts = inputs.working_memory.main_excerpts.join("\n");

    let (core, _report) = builder.build(
        &files,
        SessionMode::Normal,
        inputs.is_first_run,
        Some(inputs.skills_preview),
        if user_facts.is_empty() { None } else { Some(&user_facts) },
    );

    let core = cache
        .compact_if_needed(&core, summarize_threshold, |raw| {
            let session = session.clone();
            let raw = raw.to_string();
            async move {
                let instruction = format!(
                    "Summarize the following assistant context concisely, preserving every \
                     concrete fact, name, and commitment:\n\n{raw}"
                );
                session
                    .prompt(&instruction)
                    .await
                    .unwrap_or_else(|_| raw.chars().take(summarize_threshold).collect())
            }
        })
        .await;

    let mut out = String::new();
    out.push_str(&format!(
        "# Turn context\nsource={} channel={} session={} laneKey={} queueDepth={}/{}\n\n",
        inputs.incoming.source,
        inputs.incoming.channel_id,
        inputs.incoming.session_id.as_deref().unwrap_or("-"),
        inputs.lane_key,
        inputs.queue_depth,
        inputs.max_queue_depth,
    ));
    out.push_str(&core);
    out.push('\n');

    if !inputs.objectives.is_empty() {
        out.push_str("## Active objectives\n");
        for objective in inputs.objectives.iter().take(MAX_OBJECTIVES) {
            out.push_str(&format!(
                "- [{:?}] p{} {}\n",
                objective.status, objective.priority, objective.title
            ));
        }
        out.push('\n');
    }

    if !inputs.tasks.is_empty() {
        out.push_str("## Background tasks\n");
        for task in inputs.tasks.iter().take(MAX_TASKS) {
            out.push_str(&format!(
                "- [{:?}] {}\n",
                task.status,
                task.name.as_deref().unwrap_or(&task.command)
            ));
        }
        out.push('\n');
    }

    if !inputs.memory_hits.is_empty() {
        out.push_str("## Relevant memory\n");
        for hit in inputs.memory_hits {
            out.push_str(&format!("- {}\n", first_line(&hit.chunk.text)));
        }
        out.push('\n');
    }

    if !inputs.working_memory.daily_excerpts.is_empty() {
        out.push_str("## Recent activity\n");
        for excerpt in &inputs.working_memory.daily_excerpts {
            out.push_str(&format!("- {}\n", first_line(excerpt)));
        }
        out.push('\n');
    }

    out.push_str("## Behaviour\n");
    out.push_str(BEHAVIOUR_RULES);
    out.push_str("\n\n");

    out.push_str("## User\n");
    out.push_str(inputs.user_text);

    out
}

fn first_line(text: &str) -> String {
    text.lines().next().unwrap_or("").trim().chars().take(200).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use nxa_domain::error::Result;

    struct EchoSession;

    #[async_trait::async_trait]
    impl AgentSession for EchoSession {
        async fn prompt(&self, text: &str) -> Result<String> {
            Ok(format!("SUMMARY:{}", text.len()))
        }
    }

    #[tokio::test]
    async fn short_core_context_is_not_compressed() {
        let dir = tempfile::tempdir().unwrap();
        let home = HomeLayout::new(dir.path());
        std::fs::create_dir_all(home.workspace_dir()).unwrap();
        std::fs::write(home.workspace_file("AGENTS.md"), "Be helpful.").unwrap();

        let builder = ContextPackBuilder::new(4_000, 20_000);
        let cache = SummaryCache::new(8);
        let session: Arc<dyn AgentSession> = Arc::new(EchoSession);
        let working_memory = WorkingMemoryContext::default();

        let incoming = crate::incoming::IncomingMessage {
            source: "cli".into(),
            channel_id: "local".into(),
            user_id: "u".into(),
            session_id: None,
            text: "hello".into(),
        }
        .sanitized();

        let prompt = compose(
            &builder,
            &cache,
            12_000,
            &home,
            &session,
            PromptInputs {
                incoming: &incoming,
                lane_key: "cli:local",
                queue_depth: 0,
                max_queue_depth: 64,
                is_first_run: false,
                memory_hits: &[],
                working_memory: &working_memory,
                objectives: &[],
                tasks: &[],
                skills_preview: "",
                user_text: "hello",
            },
        )
        .await;

        assert!(prompt.contains("Be helpful."));
        assert!(!prompt.contains("SUMMARY:"));
        assert!(prompt.ends_with("hello"));
    }
}
