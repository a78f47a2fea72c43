//! `nxclaw skills` — catalog, install, and enable/disable management
//! over the on-disk skill registry.

use std::sync::Arc;

use clap::Subcommand;
use nxa_domain::config::Config;
use nxa_skills::SkillsRegistry;

#[derive(Debug, Subcommand)]
pub enum SkillsAction {
    /// Show the full catalog, including skills missing a dependency.
    Catalog,
    /// Show only skills ready to use right now.
    List,
    /// Install a skill pack from a local directory.
    Install { value: String },
    /// Re-scan the skills directory and reload the registry's manifest cache.
    Bootstrap,
    /// Enable a disabled skill.
    Enable { value: String },
    /// Disable an enabled skill.
    Disable { value: String },
    /// Print a skill's SKILL.md.
    Show { value: String },
    /// Uninstall a third-party skill pack (`owner/repo`).
    Remove { value: String },
}

pub async fn skills(config: Config, action: SkillsAction) -> anyhow::Result<()> {
    let layout = config.layout();
    let registry = Arc::new(SkillsRegistry::load(&layout.skills_dir(), None, &layout.skills_json())?);

    match action {
        SkillsAction::Catalog => println!("{}", registry.render_index()),
        SkillsAction::List => println!("{}", registry.render_ready_index()),
        SkillsAction::Install { value } => {
            let source = std::path::Path::new(&value);
            let repo = source
                .file_name()
                .and_then(|n| n.to_str())
                .ok_or_else(|| anyhow::anyhow!("{value}: cannot derive a skill name from this path"))?;
            let result = nxa_skills::installer::install_from_dir(&layout.skills_dir(), "local", repo, source, "local", None)?;
            println!("installed {} -> {}", value, result.skill_dir.display());
        }
        SkillsAction::Bootstrap => {
            let count = registry.reload()?;
            println!("reloaded {count} skills");
        }
        SkillsAction::Enable { value } => {
            registry.set_enabled(&value, true)?;
            println!("enabled {value}");
        }
        SkillsAction::Disable { value } => {
            registry.set_enabled(&value, false)?;
            println!("disabled {value}");
        }
        SkillsAction::Show { value } => println!("{}", registry.read_doc(&value)?),
        SkillsAction::Remove { value } => {
            let (owner, repo) = value
                .split_once('/')
                .ok_or_else(|| anyhow::anyhow!("expected owner/repo, got {value}"))?;
            let result = nxa_skills::installer::uninstall(&layout.skills_dir(), owner, repo)?;
            println!("removed: {}", result.removed);
        }
    }

    Ok(())
}
