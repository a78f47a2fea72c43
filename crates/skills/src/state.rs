//! Persisted enabled/disabled overrides for installed skills (`skills.json`).
//!
//! A skill is enabled by default once loaded; `skills disable <name>` records
//! an override here so the choice survives a restart.

use std::collections::HashSet;
use std::path::Path;

use nxa_domain::error::Result;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SkillsState {
    #[serde(default)]
    disabled: HashSet<String>,
}

impl SkillsState {
    pub fn load(path: &Path) -> Result<Self> {
        nxa_fsutil::read_json_or_default(path)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        nxa_fsutil::write_json_atomic(path, self)
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        !self.disabled.contains(name)
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        if enabled {
            self.disabled.remove(name);
        } else {
            self.disabled.insert(name.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enabled_by_default() {
        let state = SkillsState::default();
        assert!(state.is_enabled("git-helper"));
    }

    #[test]
    fn disable_then_reenable() {
        let mut state = SkillsState::default();
        state.set_enabled("git-helper", false);
        assert!(!state.is_enabled("git-helper"));
        state.set_enabled("git-helper", true);
        assert!(state.is_enabled("git-helper"));
    }

    #[test]
    fn round_trips_through_disk() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("skills.json");

        let mut state = SkillsState::default();
        state.set_enabled("sonoscli", false);
        state.save(&path).unwrap();

        let reloaded = SkillsState::load(&path).unwrap();
        assert!(!reloaded.is_enabled("sonoscli"));
        assert!(reloaded.is_enabled("git-helper"));
    }
}
