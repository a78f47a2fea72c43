use std::path::{Path, PathBuf};

use parking_lot::RwLock;

use nxa_domain::error::{Error, Result};

use crate::loader;
use crate::manifest::ReadinessStatus;
use crate::state::SkillsState;
use crate::types::SkillEntry;

/// In-memory skills registry: catalog of loaded entries plus the persisted
/// enabled/disabled overrides.
pub struct SkillsRegistry {
    entries: RwLock<Vec<SkillEntry>>,
    skills_root: PathBuf,
    extra_dir: Option<PathBuf>,
    state_path: PathBuf,
    state: RwLock<SkillsState>,
}

impl SkillsRegistry {
    pub fn load(skills_root: &Path, extra_dir: Option<&Path>, state_path: &Path) -> Result<Self> {
        let entries = loader::scan_all(skills_root, extra_dir)?;
        let ready = entries.iter().filter(|e| e.is_ready()).count();
        tracing::info!(
            skills_count = entries.len(),
            ready_count = ready,
            "skills registry loaded"
        );
        let state = SkillsState::load(state_path)?;
        Ok(Self {
            entries: RwLock::new(entries),
            skills_root: skills_root.to_path_buf(),
            extra_dir: extra_dir.map(|p| p.to_path_buf()),
            state_path: state_path.to_path_buf(),
            state: RwLock::new(state),
        })
    }

    pub fn empty() -> Self {
        Self {
            entries: RwLock::new(Vec::new()),
            skills_root: PathBuf::new(),
            extra_dir: None,
            state_path: PathBuf::new(),
            state: RwLock::new(SkillsState::default()),
        }
    }

    /// Render the full index (all skills, including disabled/blocked ones).
    /// Used for dashboard / debug views.
    pub fn render_index(&self) -> String {
        let entries = self.entries.read();
        entries
            .iter()
            .map(|e| e.render_index_line())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Render the index for LLM injection: only ready, enabled skills, plus
    /// a one-line summary of what was left out (keeps prompts tight).
    pub fn render_ready_index(&self) -> String {
        let entries = self.entries.read();
        let state = self.state.read();
        let mut lines = Vec::new();
        let mut hidden = 0usize;

        for entry in entries.iter() {
            if entry.is_ready() && state.is_enabled(&entry.name) {
                lines.push(entry.render_index_line());
            } else {
                hidden += 1;
            }
        }

        if hidden > 0 {
            lines.push(format!(
                "({hidden} additional skill{} not shown - disabled, missing deps, or unsupported platform)",
                if hidden == 1 { "" } else { "s" }
            ));
        }

        lines.join("\n")
    }

    /// Render a bounded preview for prompt-context injection, capped by
    /// both skill count and total character budget.
    pub fn render_prompt_preview(&self, max_skills: usize, max_chars: usize) -> String {
        let entries = self.entries.read();
        let state = self.state.read();
        let mut lines = Vec::new();
        let mut total = 0usize;
        let mut shown = 0usize;
        let mut omitted = 0usize;

        for entry in entries.iter() {
            if !entry.is_ready() || !state.is_enabled(&entry.name) {
                continue;
            }
            if shown >= max_skills {
                omitted += 1;
                continue;
            }
            let line = entry.render_index_line();
            if total + line.len() + 1 > max_chars {
                omitted += 1;
                continue;
            }
            total += line.len() + 1;
            shown += 1;
            lines.push(line);
        }

        if omitted > 0 {
            lines.push(format!("({omitted} more skill{} available", if omitted == 1 { "" } else { "s" }));
        }

        lines.join("\n")
    }

    pub fn read_doc(&self, skill_name: &str) -> Result<String> {
        let exists = self.entries.read().iter().any(|e| e.name == skill_name);
        if !exists {
            return Err(Error::NotFound(format!("skill not found: {skill_name}")));
        }
        let root = self.root_for(skill_name);
        match loader::load_skill_doc(&root, skill_name)? {
            Some(doc) => Ok(doc),
            None => Err(Error::NotFound(format!(
                "SKILL.md not found for {skill_name}"
            ))),
        }
    }

    /// Read a bundled resource from within a skill's directory.
    /// Only allows reading from `references/`, `scripts/`, `assets/` subdirs.
    /// Blocks path traversal (`..`, absolute paths, symlinks out of tree).
    pub fn read_resource(&self, skill_name: &str, relative_path: &str) -> Result<String> {
        let exists = self.entries.read().iter().any(|e| e.name == skill_name);
        if !exists {
            return Err(Error::NotFound(format!("skill not found: {skill_name}")));
        }

        if relative_path.contains("..") || relative_path.starts_with('/') {
            return Err(Error::Validation("path traversal blocked".into()));
        }

        let allowed_prefixes = ["references/", "scripts/", "assets/"];
        if !allowed_prefixes.iter().any(|p| relative_path.starts_with(p)) {
            return Err(Error::Validation(format!(
                "resource path must start with references/, scripts/, or assets/ (got: {relative_path})"
            )));
        }

        let root = self.root_for(skill_name);
        let skill_dir = root.join(skill_name);
        let full_path = skill_dir.join(relative_path);

        let canonical = full_path
            .canonicalize()
            .map_err(|_| Error::NotFound(format!("resource not found: {relative_path}")))?;
        let canonical_root = skill_dir
            .canonicalize()
            .map_err(|_| Error::NotFound(skill_name.to_string()))?;
        if !canonical.starts_with(&canonical_root) {
            return Err(Error::Validation("path traversal blocked (symlink)".into()));
        }

        std::fs::read_to_string(&canonical)
            .map_err(|_| Error::NotFound(format!("resource not found: {relative_path}")))
    }

    pub fn list(&self) -> Vec<SkillEntry> {
        self.entries.read().clone()
    }

    /// List only skills that are both ready and enabled.
    pub fn list_ready(&self) -> Vec<SkillEntry> {
        let state = self.state.read();
        self.entries
            .read()
            .iter()
            .filter(|e| e.is_ready() && state.is_enabled(&e.name))
            .cloned()
            .collect()
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.state.read().is_enabled(name)
    }

    pub fn set_enabled(&self, name: &str, enabled: bool) -> Result<()> {
        let mut state = self.state.write();
        state.set_enabled(name, enabled);
        state.save(&self.state_path)
    }

    /// Summary counts for dashboard display.
    pub fn readiness_summary(&self) -> ReadinessSummary {
        let entries = self.entries.read();
        let mut summary = ReadinessSummary {
            total: entries.len(),
            ..Default::default()
        };
        for entry in entries.iter() {
            match entry
                .readiness
                .as_ref()
                .map(|r| r.status)
                .unwrap_or(ReadinessStatus::Ready)
            {
                ReadinessStatus::Ready => summary.ready += 1,
                ReadinessStatus::MissingDeps => summary.missing_deps += 1,
                ReadinessStatus::UnsupportedPlatform => summary.unsupported += 1,
            }
        }
        summary
    }

    pub fn reload(&self) -> Result<usize> {
        let new_entries = loader::scan_all(&self.skills_root, self.extra_dir.as_deref())?;
        let count = new_entries.len();
        let ready = new_entries.iter().filter(|e| e.is_ready()).count();
        *self.entries.write() = new_entries;
        tracing::info!(
            skills_count = count,
            ready_count = ready,
            "skills registry reloaded"
        );
        Ok(count)
    }

    /// Resolve which root directory a given skill was loaded from — the
    /// primary skills root, or the extra (e.g. Codex) directory.
    fn root_for(&self, skill_name: &str) -> PathBuf {
        if let Some(ref extra) = self.extra_dir {
            if extra.join(skill_name).exists() {
                return extra.clone();
            }
        }
        self.skills_root.clone()
    }
}

/// Counts for dashboard readiness display.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ReadinessSummary {
    pub total: usize,
    pub ready: usize,
    pub missing_deps: usize,
    pub unsupported: usize,
}
