//! Secret Ring
//!
//! Typed, per-namespace handle over an OS secure-secret store.
//!
//! - `put(name, Some(secret))` stores, `put(name, None)` deletes
//! - backend failures become `NotFound` / `TooBig` / `Backend`
//! - no caching: every call goes to the backend

pub mod backend;
pub mod memory;

use std::fmt;
use std::sync::Arc;

use zeroize::{Zeroize, ZeroizeOnDrop};

pub use backend::{BackendError, KeyringBackend, SecretBackend};
pub use memory::MemoryBackend;

/// Opaque secret held in the ring. Zeroized on drop, never printed.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}

/// Ring errors, classified so callers can react to absence and size limits.
#[derive(Debug, thiserror::Error)]
pub enum RingError {
    #[error("no secret {name:?} in keyring {namespace:?}")]
    NotFound { namespace: String, name: String },

    #[error("secret {name:?} too large for keyring {namespace:?}")]
    TooBig { namespace: String, name: String },

    #[error("keyring {op} failed for {name:?} in {namespace:?}: {source}")]
    Backend {
        namespace: String,
        name: String,
        op: &'static str,
        #[source]
        source: BackendError,
    },
}

/// Handle to one namespace of the secret backend.
#[derive(Clone)]
pub struct SecretRing {
    namespace: String,
    backend: Arc<dyn SecretBackend>,
}

impl fmt::Debug for SecretRing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretRing")
            .field("namespace", &self.namespace)
            .finish_non_exhaustive()
    }
}

impl SecretRing {
    pub fn open(namespace: impl Into<String>, backend: Arc<dyn SecretBackend>) -> Self {
        Self {
            namespace: namespace.into(),
            backend,
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Stores `secret` under `name`, or deletes the entry when `secret` is `None`.
    ///
    /// Deleting an absent entry succeeds.
    pub fn put(&self, name: &str, secret: Option<&Secret>) -> Result<(), RingError> {
        match secret {
            None => match self.backend.delete(&self.namespace, name) {
                Ok(()) | Err(BackendError::NoEntry) => Ok(()),
                Err(err) => Err(self.backend_error(name, "delete", err)),
            },
            Some(secret) => match self.backend.set(&self.namespace, name, secret.expose()) {
                Ok(()) => Ok(()),
                Err(BackendError::TooLarge(reason)) => {
                    tracing::debug!(
                        namespace = %self.namespace,
                        entry = name,
                        bytes = secret.len(),
                        reason = %reason,
                        "keyring rejected secret on size"
                    );
                    Err(RingError::TooBig {
                        namespace: self.namespace.clone(),
                        name: name.to_string(),
                    })
                }
                Err(err) => Err(self.backend_error(name, "set", err)),
            },
        }
    }

    pub fn get(&self, name: &str) -> Result<Secret, RingError> {
        match self.backend.get(&self.namespace, name) {
            Ok(value) => Ok(Secret::new(value)),
            Err(BackendError::NoEntry) => Err(RingError::NotFound {
                namespace: self.namespace.clone(),
                name: name.to_string(),
            }),
            Err(err) => Err(self.backend_error(name, "get", err)),
        }
    }

    fn backend_error(&self, name: &str, op: &'static str, source: BackendError) -> RingError {
        RingError::Backend {
            namespace: self.namespace.clone(),
            name: name.to_string(),
            op,
            source,
        }
    }
}
