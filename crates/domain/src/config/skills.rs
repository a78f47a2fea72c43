use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Skills subsystem
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillsConfig {
    #[serde(default = "d_true")]
    pub enabled: bool,
    #[serde(default = "d_max_catalog_entries")]
    pub max_catalog_entries: usize,
    #[serde(default = "d_max_skill_file_bytes")]
    pub max_skill_file_bytes: u64,
    #[serde(default = "d_max_install_files")]
    pub max_install_files: usize,
    #[serde(default = "d_max_install_bytes")]
    pub max_install_bytes: u64,
    #[serde(default = "d_install_timeout_ms")]
    pub install_timeout_ms: u64,
    #[serde(default = "d_max_prompt_skills")]
    pub max_prompt_skills: usize,
    #[serde(default = "d_max_prompt_chars")]
    pub max_prompt_chars: usize,
    /// Extra directory to scan for skills, alongside the home skills dir
    /// (e.g. a Codex-format skills directory shared with another agent).
    #[serde(default)]
    pub codex_skills_dir: Option<String>,
    #[serde(default)]
    pub auto_enable_on_install: bool,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_catalog_entries: d_max_catalog_entries(),
            max_skill_file_bytes: d_max_skill_file_bytes(),
            max_install_files: d_max_install_files(),
            max_install_bytes: d_max_install_bytes(),
            install_timeout_ms: d_install_timeout_ms(),
            max_prompt_skills: d_max_prompt_skills(),
            max_prompt_chars: d_max_prompt_chars(),
            codex_skills_dir: None,
            auto_enable_on_install: false,
        }
    }
}

fn d_true() -> bool {
    true
}
fn d_max_catalog_entries() -> usize {
    200
}
fn d_max_skill_file_bytes() -> u64 {
    256 * 1024
}
fn d_max_install_files() -> usize {
    500
}
fn d_max_install_bytes() -> u64 {
    20 * 1024 * 1024
}
fn d_install_timeout_ms() -> u64 {
    30_000
}
fn d_max_prompt_skills() -> usize {
    12
}
fn d_max_prompt_chars() -> usize {
    2_000
}
