use thiserror::Error;

use crate::prefab::PrefabId;

/// Problems found while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid spawn config: {0}")]
    InvalidSpawn(String),

    #[error("prefab {prefab}: {reason}")]
    InvalidPrefab { prefab: PrefabId, reason: String },

    #[error("unknown prefab {0} referenced")]
    UnknownPrefab(PrefabId),
}

/// Actor creation failures.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SpawnError {
    #[error("no prefab named {0}")]
    UnknownPrefab(PrefabId),
}
