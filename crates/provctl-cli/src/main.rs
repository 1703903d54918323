//! provctl: provision clusters across clouds and keep them converged.

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand};
use eyre::Result;
use tracing_subscriber::EnvFilter;

use provctl::config;
use provctl::setup::Services;

mod commands;

use commands::cluster::{self, NewCluster};
use commands::drift::DriftCommands;
use commands::events::EventCommands;
use commands::settings::ConfigCommands;
use commands::snapshot::SnapshotCommands;

#[derive(Parser)]
#[command(name = "provctl")]
#[command(about = "Multi-cloud cluster provisioning and reconciliation", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, env = "PROVCTL_CONFIG")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    #[command(flatten)]
    Operation(Operation),

    /// Manage the config file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

/// Commands that work against the configured state, providers, and logs.
#[derive(Subcommand)]
enum Operation {
    /// Create a new cluster
    Create {
        /// Cluster name
        name: String,

        /// Cluster id (defaults to the name)
        #[arg(long)]
        id: Option<String>,

        /// Cloud provider
        #[arg(long, default_value = "aws")]
        provider: String,

        /// Cloud region
        #[arg(long, default_value = "us-west-2")]
        region: String,

        /// Kubernetes version of the control plane
        #[arg(long = "kubernetes-version", default_value = "1.28")]
        version: String,
    },

    /// Converge infrastructure to a desired state document
    Apply {
        /// Desired state document
        file: PathBuf,

        /// Print the plan without applying it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show what apply would change
    Plan {
        /// Desired state document
        file: PathBuf,
    },

    /// Delete a cluster and its node pools
    Delete {
        /// Cluster id
        cluster_id: String,
    },

    /// List clusters in the persisted state
    List {
        /// Print the full state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Reconcile periodically until interrupted
    Reconcile {
        /// Desired state document
        file: PathBuf,

        /// Seconds between cycles (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,

        /// Run a single cycle and exit
        #[arg(long)]
        once: bool,
    },

    /// Detect and remediate configuration drift
    Drift {
        #[command(subcommand)]
        command: DriftCommands,
    },

    /// Manage state snapshots
    Snapshot {
        #[command(subcommand)]
        command: SnapshotCommands,
    },

    /// Inspect the audit event log
    Events {
        #[command(subcommand)]
        command: EventCommands,
    },
}

fn init_tracing(verbose: bool, json: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.log_json);

    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    match cli.command {
        Commands::Config { command } => commands::settings::execute(command, &config_path),
        Commands::Operation(operation) => run(operation, &config_path).await,
    }
}

async fn run(operation: Operation, config_path: &Path) -> Result<()> {
    let config = config::load_or_default(config_path)?;
    let services = Services::build(&config).await?;

    match operation {
        Operation::Create {
            name,
            id,
            provider,
            region,
            version,
        } => {
            let new = NewCluster {
                name: &name,
                id: id.as_deref(),
                provider: &provider,
                region: &region,
                version: &version,
            };
            cluster::create(&services, new).await
        }
        Operation::Apply { file, dry_run } => cluster::apply(&services, &config, &file, dry_run).await,
        Operation::Plan { file } => cluster::plan(&services, &file).await,
        Operation::Delete { cluster_id } => cluster::delete(&services, &config, &cluster_id).await,
        Operation::List { json } => cluster::list(&services, json).await,
        Operation::Reconcile {
            file,
            interval,
            once,
        } => {
            let period = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.reconcile_interval());
            cluster::reconcile(&services, &file, period, once).await
        }
        Operation::Drift { command } => commands::drift::execute(command, &services, &config).await,
        Operation::Snapshot { command } => {
            commands::snapshot::execute(command, &services, &config).await
        }
        Operation::Events { command } => commands::events::execute(command, &services).await,
    }
}
