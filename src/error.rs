//! Token store error types
//!
//! Size-based fallback and corruption are absorbed inside the store; what
//! reaches the caller is one of these, with enough context (namespace, name,
//! operation, path) to diagnose without revealing secret values.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::ConfigError;
use crate::ring::RingError;

#[derive(Error, Debug)]
pub enum TokenStoreError {
    #[error(transparent)]
    Ring(#[from] RingError),

    #[error("invalid {namespace} token for {name:?}: {source}")]
    InvalidToken {
        namespace: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot serialize {namespace} token for {name:?}: {source}")]
    Serialization {
        namespace: String,
        name: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to {op} token file {path:?}: {source}")]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot generate cryptographic {what}: {source}")]
    Randomness {
        what: &'static str,
        #[source]
        source: rand::Error,
    },

    #[error("cannot encrypt {namespace} token for {name:?}")]
    Encryption { namespace: String, name: String },

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("token store task failed: {0}")]
    Task(String),
}

impl TokenStoreError {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            TokenStoreError::Ring(RingError::NotFound { .. }) => "RING_NOT_FOUND",
            TokenStoreError::Ring(RingError::TooBig { .. }) => "RING_TOO_BIG",
            TokenStoreError::Ring(RingError::Backend { .. }) => "RING_BACKEND_ERROR",
            TokenStoreError::InvalidToken { .. } => "INVALID_TOKEN",
            TokenStoreError::Serialization { .. } => "SERIALIZATION_ERROR",
            TokenStoreError::Io { .. } => "IO_ERROR",
            TokenStoreError::Randomness { .. } => "RANDOMNESS_FAILURE",
            TokenStoreError::Encryption { .. } => "ENCRYPTION_ERROR",
            TokenStoreError::Config(_) => "CONFIG_ERROR",
            TokenStoreError::Task(_) => "TASK_ERROR",
        }
    }
}

/// Token store result type
pub type StoreResult<T> = Result<T, TokenStoreError>;
