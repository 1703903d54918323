pub mod cluster;
pub mod drift;
pub mod events;
pub mod settings;
pub mod snapshot;

use std::path::Path;

use eyre::WrapErr;
use provctl_core::State;
use provctl_engine::{DesiredStateSource, FileDesiredState};
use tokio::sync::watch;

/// Read a desired-state document, expanding declared worker pools.
pub async fn load_desired(path: &Path) -> eyre::Result<State> {
    FileDesiredState::new(path)
        .load()
        .await
        .wrap_err_with(|| format!("failed to load desired state from {}", path.display()))
}

/// A shutdown signal that flips to `true` on Ctrl-C.
pub fn shutdown_on_ctrl_c() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                tracing::info!("interrupt received, stopping after the current cycle");
                let _ = tx.send(true);
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                // Keep the sender alive so the loop only stops on its own.
                std::future::pending::<()>().await;
            }
        }
    });
    rx
}
