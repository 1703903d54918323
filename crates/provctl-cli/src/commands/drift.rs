use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Subcommand;
use provctl_engine::{DriftWatcher, FileDesiredState, TriggerReason};

use provctl::config::ProvctlConfig;
use provctl::output;
use provctl::setup::Services;

use crate::commands::{load_desired, shutdown_on_ctrl_c};

/// Drift subcommands
#[derive(Subcommand)]
pub enum DriftCommands {
    /// Compare live infrastructure against a desired state
    Detect {
        /// Desired state document
        file: PathBuf,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Detect drift and push remediable resources back to the desired state
    Remediate {
        /// Desired state document
        file: PathBuf,
    },

    /// Check for drift periodically until interrupted
    Watch {
        /// Desired state document
        file: PathBuf,

        /// Seconds between checks (defaults to the configured interval)
        #[arg(long)]
        interval: Option<u64>,

        /// Remediate drift as soon as it is found
        #[arg(long)]
        auto_remediate: bool,
    },
}

pub async fn execute(
    command: DriftCommands,
    services: &Services,
    config: &ProvctlConfig,
) -> eyre::Result<()> {
    match command {
        DriftCommands::Detect { file, json } => {
            let desired = load_desired(&file).await?;
            let report = services.detector().detect_drift(&desired).await?;
            if json {
                return output::print_json(&report);
            }
            output::print_drift_report(&report);
            Ok(())
        }

        DriftCommands::Remediate { file } => {
            let desired = load_desired(&file).await?;
            let detector = services.detector();
            let report = detector.detect_drift(&desired).await?;
            output::print_drift_report(&report);
            if report.summary.remediatable == 0 {
                return Ok(());
            }

            if config.auto_snapshot {
                services
                    .snapshots
                    .create_snapshot("Before drift remediation", TriggerReason::DriftRemediate)
                    .await?;
            }
            let outcome = detector.remediate(&desired, &report).await?;
            output::print_remediation(&outcome);
            if !outcome.is_success() {
                return Err(eyre::eyre!("{} remediation(s) failed", outcome.failed()));
            }
            Ok(())
        }

        DriftCommands::Watch {
            file,
            interval,
            auto_remediate,
        } => {
            let period = interval
                .map(|secs| Duration::from_secs(secs.max(1)))
                .unwrap_or_else(|| config.drift_interval());
            let mut watcher = DriftWatcher::new(
                services.detector(),
                Arc::new(FileDesiredState::new(&file)),
                period,
            )
            .with_auto_remediate(auto_remediate);
            if config.auto_snapshot {
                watcher = watcher.with_snapshots(Arc::clone(&services.snapshots));
            }

            println!(
                "Watching {} for drift every {}s (Ctrl-C to stop)",
                file.display(),
                period.as_secs()
            );
            watcher.run(shutdown_on_ctrl_c()).await;
            Ok(())
        }
    }
}
