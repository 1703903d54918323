use clap::{Subcommand, ValueEnum};
use provctl_engine::TriggerReason;

use provctl::config::{ProvctlConfig, RetentionConfig};
use provctl::output;
use provctl::setup::Services;

/// Snapshot subcommands
#[derive(Subcommand)]
pub enum SnapshotCommands {
    /// Snapshot the current state
    Create {
        /// Free-form description
        #[arg(short, long, default_value = "Manual snapshot")]
        description: String,

        /// Why the snapshot is being taken
        #[arg(long, value_enum, default_value = "manual")]
        reason: Reason,
    },

    /// List snapshots, newest first
    List {
        /// Print the listing as JSON
        #[arg(long)]
        json: bool,
    },

    /// Replace the current state with a snapshot's
    Restore {
        /// Snapshot id
        id: String,

        /// Show what would change without writing anything
        #[arg(long)]
        dry_run: bool,
    },

    /// Delete snapshots outside the retention policy
    Prune {
        /// Delete snapshots older than this many days
        #[arg(long)]
        max_age_days: Option<u64>,

        /// Keep at most this many snapshots
        #[arg(long)]
        max_count: Option<usize>,
    },

    /// Check a snapshot's checksum
    Verify {
        /// Snapshot id
        id: String,
    },

    /// Delete one snapshot
    Delete {
        /// Snapshot id
        id: String,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Reason {
    Manual,
    PreUpgrade,
    PreDelete,
    PreApply,
    Scheduled,
}

impl From<Reason> for TriggerReason {
    fn from(reason: Reason) -> Self {
        match reason {
            Reason::Manual => Self::Manual,
            Reason::PreUpgrade => Self::PreUpgrade,
            Reason::PreDelete => Self::PreDelete,
            Reason::PreApply => Self::PreApply,
            Reason::Scheduled => Self::Scheduled,
        }
    }
}

pub async fn execute(
    command: SnapshotCommands,
    services: &Services,
    config: &ProvctlConfig,
) -> eyre::Result<()> {
    let snapshots = &services.snapshots;
    match command {
        SnapshotCommands::Create {
            description,
            reason,
        } => {
            let snapshot = snapshots.create_snapshot(&description, reason.into()).await?;
            println!(
                "Created {} ({} clusters, {} node pools)",
                snapshot.id, snapshot.metadata.cluster_count, snapshot.metadata.node_pool_count
            );
        }

        SnapshotCommands::List { json } => {
            let listing = snapshots.list_snapshots()?;
            if json {
                return output::print_json(&listing);
            }
            output::print_snapshots(&listing);
        }

        SnapshotCommands::Restore { id, dry_run } => {
            let result = snapshots.restore_snapshot(&id, dry_run).await?;
            output::print_restore(&result);
        }

        SnapshotCommands::Prune {
            max_age_days,
            max_count,
        } => {
            let policy = if max_age_days.is_none() && max_count.is_none() {
                config.retention.policy()
            } else {
                RetentionConfig {
                    max_age_days,
                    max_count,
                }
                .policy()
            };
            let deleted = snapshots.prune_snapshots(&policy)?;
            for id in &deleted {
                println!("  deleted {id}");
            }
            println!("Pruned {} snapshot(s).", deleted.len());
        }

        SnapshotCommands::Verify { id } => {
            let snapshot = snapshots.verify_snapshot(&id)?;
            println!("{} is intact (checksum {})", snapshot.id, snapshot.checksum);
        }

        SnapshotCommands::Delete { id } => {
            snapshots.delete_snapshot(&id)?;
            println!("Deleted {id}");
        }
    }
    Ok(())
}
