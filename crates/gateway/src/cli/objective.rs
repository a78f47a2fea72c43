//! `nxclaw objective` — manage the autonomous loop's priority queue from
//! the command line.

use clap::Subcommand;
use nxa_domain::config::Config;
use nxa_objectives::{ObjectiveStatus, ObjectiveStore};

#[derive(Debug, Subcommand)]
pub enum ObjectiveAction {
    /// Add a new objective. `value` is the title; `--description` and
    /// `--priority` refine it further.
    Add {
        value: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "3")]
        priority: u8,
    },
    /// List objectives, optionally filtered by status.
    List {
        #[arg(long)]
        status: Option<String>,
    },
    /// Update an objective's status or append a note. `value` is its id.
    Update {
        value: String,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        note: Option<String>,
    },
}

pub async fn objective(config: Config, action: ObjectiveAction) -> anyhow::Result<()> {
    let layout = config.layout();
    let store = ObjectiveStore::new(&layout.state_dir()).await?;

    match action {
        ObjectiveAction::Add { value, description, priority } => {
            let objective = store.add(value, description, priority, "cli").await?;
            println!("added {} ({})", objective.id, objective.title);
        }
        ObjectiveAction::List { status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            for objective in store.list(status).await {
                println!(
                    "{} [{:?}] p{} — {}",
                    objective.id, objective.status, objective.priority, objective.title
                );
            }
        }
        ObjectiveAction::Update { value, status, note } => {
            let id = value.parse().map_err(|_| anyhow::anyhow!("{value}: not a valid objective id"))?;
            let status = status.as_deref().map(parse_status).transpose()?;
            match store.update(id, status, note).await? {
                Some(objective) => println!("updated {} -> {:?}", objective.id, objective.status),
                None => anyhow::bail!("no objective with id {value}"),
            }
        }
    }

    Ok(())
}

fn parse_status(raw: &str) -> anyhow::Result<ObjectiveStatus> {
    match raw {
        "pending" => Ok(ObjectiveStatus::Pending),
        "in_progress" | "in-progress" => Ok(ObjectiveStatus::InProgress),
        "blocked" => Ok(ObjectiveStatus::Blocked),
        "completed" => Ok(ObjectiveStatus::Completed),
        "failed" => Ok(ObjectiveStatus::Failed),
        "cancelled" => Ok(ObjectiveStatus::Cancelled),
        other => anyhow::bail!("unknown objective status: {other}"),
    }
}
