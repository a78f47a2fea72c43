//! Third-party and built-in skill packages: discovery, manifest parsing,
//! readiness checks, install/uninstall, and bounded prompt-context previews.
//!
//! Two on-disk formats are supported: the legacy `skill.toml` entry plus an
//! optional `SKILL.md`, and a ClawHub/OpenClaw "SkillPack" consisting of
//! `SKILL.md` alone. [`loader::scan_skills`] tries the former first.

pub mod aliases;
pub mod installer;
pub mod loader;
pub mod manifest;
pub mod registry;
pub mod state;
pub mod types;

pub use aliases::ToolAliasMap;
pub use registry::{ReadinessSummary, SkillsRegistry};
pub use state::SkillsState;
pub use types::{RiskTier, SkillEntry};
