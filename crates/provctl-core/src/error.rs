use thiserror::Error;

use crate::ids::ResourceKind;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{kind} stored under key {key:?} but its id is {id:?}")]
    KeyMismatch {
        kind: ResourceKind,
        key: String,
        id: String,
    },
}
