use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Home directory layout
//
// <home>/
//   config.json
//   agent/{auth.json, models.json}
//   state/{objectives.json, tasks.json, dashboard.json, events.jsonl,
//          memory-index.json, embedding-cache.json, skills.json,
//          lane-sessions/<laneKey>/…}
//   memory/{raw.jsonl, compact.jsonl}
//   workspace/
//     IDENTITY.md USER.md AGENTS.md BOOTSTRAP.md HEARTBEAT.md TOOLS.md MEMORY.md SOUL.md
//     memory/{YYYY-MM-DD.md, sessions/<safeKey>.md, soul-journal/YYYY-MM-DD.md, compact-md/compact-<ts>.md}
//   chrome/shots/<file>
//   logs/<taskId>.log
//   skills/<skillId>/SKILL.md
//   docs/{RUNBOOK.md, START_HERE.md}
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeConfig {
    #[serde(default = "d_home")]
    pub path: PathBuf,
}

impl Default for HomeConfig {
    fn default() -> Self {
        Self { path: d_home() }
    }
}

fn d_home() -> PathBuf {
    PathBuf::from("./data")
}

/// Resolved absolute paths derived from the configured home directory.
/// Constructed once at startup; every component that touches disk takes
/// a `&HomeLayout` rather than re-deriving paths.
#[derive(Debug, Clone)]
pub struct HomeLayout {
    root: PathBuf,
}

impl HomeLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config_json(&self) -> PathBuf {
        self.root.join("config.json")
    }

    pub fn agent_dir(&self) -> PathBuf {
        self.root.join("agent")
    }
    pub fn auth_json(&self) -> PathBuf {
        self.agent_dir().join("auth.json")
    }
    pub fn models_json(&self) -> PathBuf {
        self.agent_dir().join("models.json")
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join("state")
    }
    pub fn objectives_json(&self) -> PathBuf {
        self.state_dir().join("objectives.json")
    }
    pub fn tasks_json(&self) -> PathBuf {
        self.state_dir().join("tasks.json")
    }
    pub fn dashboard_json(&self) -> PathBuf {
        self.state_dir().join("dashboard.json")
    }
    pub fn events_jsonl(&self) -> PathBuf {
        self.state_dir().join("events.jsonl")
    }
    pub fn memory_index_json(&self) -> PathBuf {
        self.state_dir().join("memory-index.json")
    }
    pub fn embedding_cache_json(&self) -> PathBuf {
        self.state_dir().join("embedding-cache.json")
    }
    pub fn skills_json(&self) -> PathBuf {
        self.state_dir().join("skills.json")
    }
    pub fn lane_sessions_dir(&self, lane_key_safe: &str) -> PathBuf {
        self.state_dir().join("lane-sessions").join(lane_key_safe)
    }

    pub fn memory_dir(&self) -> PathBuf {
        self.root.join("memory")
    }
    pub fn raw_jsonl(&self) -> PathBuf {
        self.memory_dir().join("raw.jsonl")
    }
    pub fn compact_jsonl(&self) -> PathBuf {
        self.memory_dir().join("compact.jsonl")
    }

    pub fn workspace_dir(&self) -> PathBuf {
        self.root.join("workspace")
    }
    pub fn workspace_file(&self, name: &str) -> PathBuf {
        self.workspace_dir().join(name)
    }
    pub fn workspace_memory_dir(&self) -> PathBuf {
        self.workspace_dir().join("memory")
    }
    pub fn daily_md(&self, date: &str) -> PathBuf {
        self.workspace_memory_dir().join(format!("{date}.md"))
    }
    pub fn session_md_dir(&self) -> PathBuf {
        self.workspace_memory_dir().join("sessions")
    }
    pub fn session_md(&self, safe_key: &str) -> PathBuf {
        self.session_md_dir().join(format!("{safe_key}.md"))
    }
    pub fn soul_journal_dir(&self) -> PathBuf {
        self.workspace_memory_dir().join("soul-journal")
    }
    pub fn soul_journal_md(&self, date: &str) -> PathBuf {
        self.soul_journal_dir().join(format!("{date}.md"))
    }
    pub fn compact_md_dir(&self) -> PathBuf {
        self.workspace_memory_dir().join("compact-md")
    }
    pub fn compact_md(&self, ts: i64) -> PathBuf {
        self.compact_md_dir().join(format!("compact-{ts}.md"))
    }

    pub fn chrome_shots_dir(&self) -> PathBuf {
        self.root.join("chrome").join("shots")
    }
    pub fn logs_dir(&self) -> PathBuf {
        self.root.join("logs")
    }
    pub fn task_log(&self, task_id: &str) -> PathBuf {
        self.logs_dir().join(format!("{task_id}.log"))
    }
    pub fn skills_dir(&self) -> PathBuf {
        self.root.join("skills")
    }
    pub fn skill_dir(&self, skill_id: &str) -> PathBuf {
        self.skills_dir().join(skill_id)
    }
    pub fn docs_dir(&self) -> PathBuf {
        self.root.join("docs")
    }

    /// All directories that must exist before the runtime touches any
    /// file within them. Created with mode 0700 on first run.
    pub fn all_dirs(&self) -> Vec<PathBuf> {
        vec![
            self.root.clone(),
            self.agent_dir(),
            self.state_dir(),
            self.memory_dir(),
            self.workspace_dir(),
            self.workspace_memory_dir(),
            self.session_md_dir(),
            self.soul_journal_dir(),
            self.compact_md_dir(),
            self.chrome_shots_dir(),
            self.logs_dir(),
            self.skills_dir(),
            self.docs_dir(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_expected_paths() {
        let layout = HomeLayout::new("/tmp/nxclaw-home");
        assert_eq!(
            layout.objectives_json(),
            PathBuf::from("/tmp/nxclaw-home/state/objectives.json")
        );
        assert_eq!(
            layout.task_log("t1"),
            PathBuf::from("/tmp/nxclaw-home/logs/t1.log")
        );
        assert_eq!(
            layout.session_md("source_chan"),
            PathBuf::from("/tmp/nxclaw-home/workspace/memory/sessions/source_chan.md")
        );
    }

    #[test]
    fn all_dirs_includes_root() {
        let layout = HomeLayout::new("/tmp/nxclaw-home");
        assert!(layout.all_dirs().contains(&PathBuf::from("/tmp/nxclaw-home")));
    }
}
