pub mod autonomous;
pub mod chrome;
pub mod contextpack;
pub mod dashboard;
pub mod home;
pub mod llm;
pub mod memory;
pub mod runtime;
pub mod skills;
pub mod tasks;

pub use autonomous::AutonomousConfig;
pub use chrome::{ChromeConfig, ChromeMode};
pub use contextpack::ContextpackConfig;
pub use dashboard::DashboardConfig;
pub use home::{HomeConfig, HomeLayout};
pub use llm::{LlmConfig, ProviderFamily};
pub use memory::{EmbeddingProviderKind, MemoryConfig, SearchConfig, VectorConfig};
pub use runtime::RuntimeConfig;
pub use skills::SkillsConfig;
pub use tasks::TasksConfig;

use serde::{Deserialize, Serialize};

/// Top-level configuration, as loaded from `<home>/config.json` and
/// overlaid with environment variables. Every section defaults
/// independently, so a config file only needs to mention the fields it
/// overrides.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub home: HomeConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub autonomous: AutonomousConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub chrome: ChromeConfig,
    #[serde(default)]
    pub skills: SkillsConfig,
    #[serde(default)]
    pub dashboard: DashboardConfig,
    #[serde(default)]
    pub tasks: TasksConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub contextpack: ContextpackConfig,
}

impl Config {
    /// Load from a JSON file if it exists, falling back to all-defaults
    /// when it doesn't (first run).
    pub fn load_or_default(path: &std::path::Path) -> crate::error::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        let cfg: Self = serde_json::from_str(&raw)?;
        Ok(cfg)
    }

    pub fn layout(&self) -> HomeLayout {
        HomeLayout::new(self.home.path.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_round_trip_through_json() {
        let cfg = Config::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dashboard.port, cfg.dashboard.port);
        assert_eq!(back.runtime.max_queue_depth, cfg.runtime.max_queue_depth);
    }

    #[test]
    fn partial_json_fills_in_defaults() {
        let partial = r#"{"dashboard": {"port": 9999}}"#;
        let cfg: Config = serde_json::from_str(partial).unwrap();
        assert_eq!(cfg.dashboard.port, 9999);
        assert_eq!(cfg.dashboard.host, "127.0.0.1");
        assert_eq!(cfg.runtime.prompt_timeout_ms, 120_000);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let cfg = Config::load_or_default(std::path::Path::new("/nonexistent/nxclaw/config.json"))
            .unwrap();
        assert_eq!(cfg.dashboard.port, 4610);
    }
}
