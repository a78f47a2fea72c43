//! `nxclaw onboard` — first-run scaffold: every directory
//! [`HomeLayout::all_dirs`] expects, a default `config.json`, and the
//! workspace markdown files the prompt composer reads.

use nxa_domain::config::Config;

const WORKSPACE_FILES: &[&str] =
    &["IDENTITY.md", "USER.md", "AGENTS.md", "BOOTSTRAP.md", "HEARTBEAT.md", "TOOLS.md", "MEMORY.md", "SOUL.md"];

pub async fn onboard(quick: bool) -> anyhow::Result<()> {
    let config_path = std::env::var("NXCLAW_CONFIG").unwrap_or_else(|_| "config.json".to_string());
    let config_path = std::path::Path::new(&config_path);

    if config_path.exists() && !quick {
        anyhow::bail!("{} already exists — remove it first or pass --quick to proceed anyway", config_path.display());
    }

    let config = Config::default();
    let layout = config.layout();

    for dir in layout.all_dirs() {
        tokio::fs::create_dir_all(&dir).await?;
    }

    for name in WORKSPACE_FILES {
        let path = layout.workspace_file(name);
        if !path.exists() {
            tokio::fs::write(&path, format!("# {name}\n\n")).await?;
        }
    }

    nxa_fsutil::write_json_atomic(config_path, &config)?;

    eprintln!();
    eprintln!("  nxclaw initialized");
    eprintln!();
    eprintln!("  Created:");
    eprintln!("    {}", config_path.display());
    eprintln!("    {}  (home directory)", layout.root().display());
    eprintln!();
    eprintln!("  Next: `nxclaw auth`, then `nxclaw start`.");

    Ok(())
}
