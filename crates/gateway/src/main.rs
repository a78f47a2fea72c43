use clap::Parser;
use tracing_subscriber::EnvFilter;

use nxa_gateway::cli::{self, Cli, Command};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            init_tracing();
            let config = cli::load_config()?;
            cli::start::start(config, None, false, false, false).await
        }
        Some(Command::Start { once, no_slack, no_telegram, no_dashboard }) => {
            init_tracing();
            let config = cli::load_config()?;
            cli::start::start(config, once, no_slack, no_telegram, no_dashboard).await
        }
        Some(Command::Auth { provider, status }) => {
            let config = cli::load_config()?;
            cli::auth::auth(config, provider, status).await
        }
        Some(Command::Onboard { quick }) => cli::onboard::onboard(quick).await,
        Some(Command::Status) => {
            let config = cli::load_config()?;
            cli::status::status(config).await
        }
        Some(Command::Skills { action }) => {
            let config = cli::load_config()?;
            cli::skills::skills(config, action).await
        }
        Some(Command::Objective { action }) => {
            let config = cli::load_config()?;
            cli::objective::objective(config, action).await
        }
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,nxa_gateway=debug")))
        .json()
        .init();
}
