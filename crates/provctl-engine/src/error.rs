use provctl_audit::AuditError;
use provctl_core::{CoreError, ResourceId, ResourceKind};
use provctl_storage::StorageError;
use thiserror::Error;

/// Failure reported by a cloud provider for a single operation.
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{kind} {id} not found")]
    NotFound { kind: ResourceKind, id: String },

    #[error("{kind} {id} rejected: {reason}")]
    Rejected {
        kind: ResourceKind,
        id: String,
        reason: String,
    },

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{resource}: provider {provider:?} is not registered")]
    ProviderNotFound {
        provider: String,
        resource: ResourceId,
    },

    #[error("provider operation failed for {resource}")]
    Provider {
        resource: ResourceId,
        #[source]
        source: ProviderError,
    },

    #[error("snapshot {snapshot_id} failed integrity check: expected {expected}, computed {actual}")]
    Integrity {
        snapshot_id: String,
        expected: String,
        actual: String,
    },

    #[error("transaction aborted while {stage}")]
    Transaction {
        stage: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("{resource}: cannot remediate: {reason}")]
    Remediation { resource: ResourceId, reason: String },

    #[error("snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("snapshot already exists: {0}")]
    SnapshotExists(String),

    #[error("invalid snapshot id: {0:?}")]
    InvalidSnapshotId(String),

    #[error("invalid state: {0}")]
    InvalidState(#[from] CoreError),

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Attach resource identity to a provider failure.
    pub fn provider(resource: &ResourceId, source: ProviderError) -> Self {
        Self::Provider {
            resource: resource.clone(),
            source,
        }
    }

    pub(crate) fn transaction(
        stage: &'static str,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Transaction {
            stage,
            source: Box::new(source),
        }
    }

    /// The resource this error is about, when there is one.
    pub fn resource(&self) -> Option<&ResourceId> {
        match self {
            Self::ProviderNotFound { resource, .. }
            | Self::Provider { resource, .. }
            | Self::Remediation { resource, .. } => Some(resource),
            _ => None,
        }
    }
}

/// Walk the full error chain and join all causes into one string.
///
/// Wrapper errors often have terse `Display` impls but useful detail in the
/// source chain.
pub fn format_err_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}
