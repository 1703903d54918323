use clap::Subcommand;
use provctl_audit::EventStore;

use provctl::output;
use provctl::setup::Services;

/// Event log subcommands
#[derive(Subcommand)]
pub enum EventCommands {
    /// Show recorded events, oldest first
    List {
        /// Only events for this cluster and its node pools
        #[arg(long)]
        cluster: Option<String>,

        /// Show only the most recent N events
        #[arg(short = 'n', long)]
        limit: Option<usize>,

        /// Print the events as JSON
        #[arg(long)]
        json: bool,
    },

    /// Rebuild state from the event log and check it against persisted state
    Replay {
        /// Only replay events recorded after this RFC 3339 timestamp and
        /// print the result without comparing
        #[arg(long)]
        since: Option<jiff::Timestamp>,

        /// Print the replayed state as JSON
        #[arg(long)]
        json: bool,
    },
}

pub async fn execute(command: EventCommands, services: &Services) -> eyre::Result<()> {
    match command {
        EventCommands::List {
            cluster,
            limit,
            json,
        } => {
            let mut events = services.events.events().await?;
            if let Some(cluster) = cluster {
                let pool_prefix = format!("{cluster}/");
                events.retain(|e| e.resource.id == cluster || e.resource.id.starts_with(&pool_prefix));
            }
            if let Some(limit) = limit {
                let skip = events.len().saturating_sub(limit);
                events = events.split_off(skip);
            }

            if json {
                return output::print_json(&events);
            }
            output::print_events(&events);
        }

        EventCommands::Replay { since: Some(since), .. } => {
            let state = services.events.replay_events(Some(since)).await?;
            output::print_json(&state)?;
        }

        EventCommands::Replay { since: None, json } => {
            let divergence = services.replay_divergence().await?;
            if json {
                output::print_json(&services.events.replay_events(None).await?)?;
            } else {
                output::print_replay_divergence(&divergence);
            }
            if !divergence.is_empty() {
                return Err(eyre::eyre!(
                    "event log and persisted state disagree on {} resources",
                    divergence.len()
                ));
            }
        }
    }
    Ok(())
}
