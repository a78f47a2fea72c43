pub mod auth;
pub mod objective;
pub mod onboard;
pub mod skills;
pub mod start;
pub mod status;

use clap::{Parser, Subcommand};

/// nxclaw — an autonomous agent runtime.
#[derive(Debug, Parser)]
#[command(name = "nxclaw", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Record or check provider authentication.
    Auth {
        /// Provider to authenticate against (defaults to the configured one).
        #[arg(long)]
        provider: Option<String>,
        /// Only report whether the agent is currently authenticated.
        #[arg(long)]
        status: bool,
    },
    /// First-run setup: directories, default config, workspace scaffold.
    Onboard {
        /// Skip interactive prompts and accept every default.
        #[arg(long)]
        quick: bool,
    },
    /// Print a one-shot snapshot of queue depth, lanes, and task health.
    Status,
    /// Skill catalog and installation management.
    Skills {
        #[command(subcommand)]
        action: skills::SkillsAction,
    },
    /// Autonomous objective queue management.
    Objective {
        #[command(subcommand)]
        action: objective::ObjectiveAction,
    },
    /// Start the runtime: channel adapters, autonomous loop, and dashboard.
    Start {
        /// Run a single prompt through the runtime and exit instead of serving.
        #[arg(long)]
        once: Option<String>,
        /// Don't start the Slack adapter even if configured.
        #[arg(long)]
        no_slack: bool,
        /// Don't start the Telegram adapter even if configured.
        #[arg(long)]
        no_telegram: bool,
        /// Don't bind the HTTP dashboard.
        #[arg(long)]
        no_dashboard: bool,
    },
}

/// Load the configuration from `NXCLAW_CONFIG` (or `config.json` in the
/// current directory by default), shared by every subcommand so the
/// lookup logic lives in one place.
pub fn load_config() -> anyhow::Result<nxa_domain::config::Config> {
    let path = std::env::var("NXCLAW_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    nxa_domain::config::Config::load_or_default(std::path::Path::new(&path))
        .map_err(|e| anyhow::anyhow!("loading {path}: {e}"))
}
