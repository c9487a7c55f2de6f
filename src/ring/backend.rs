//! Secure secret backends
//!
//! `SecretBackend` is the seam between the ring and the OS secret store.
//! - `KeyringBackend`: macOS Keychain / Windows Credential Manager / Secret Service
//! - `MemoryBackend` (see `memory.rs`): in-process fake for tests and ephemeral use

use keyring::Entry;

/// Backend failure as reported by the secret store itself.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    #[error("no matching entry")]
    NoEntry,

    #[error("secret exceeds backend size limit: {0}")]
    TooLarge(String),

    #[error("{0}")]
    Platform(String),
}

/// OS secure-secret store, addressed by (namespace, name).
///
/// Implementations must report a missing entry as [`BackendError::NoEntry`]
/// and a size rejection on `set` as [`BackendError::TooLarge`].
pub trait SecretBackend: Send + Sync {
    fn set(&self, namespace: &str, name: &str, secret: &str) -> Result<(), BackendError>;
    fn get(&self, namespace: &str, name: &str) -> Result<String, BackendError>;
    fn delete(&self, namespace: &str, name: &str) -> Result<(), BackendError>;
}

/// Backend over the platform credential store via the `keyring` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct KeyringBackend;

impl KeyringBackend {
    fn entry(namespace: &str, name: &str) -> Result<Entry, BackendError> {
        Entry::new(namespace, name).map_err(map_keyring_error)
    }
}

impl SecretBackend for KeyringBackend {
    fn set(&self, namespace: &str, name: &str, secret: &str) -> Result<(), BackendError> {
        Self::entry(namespace, name)?
            .set_password(secret)
            .map_err(map_keyring_error)
    }

    fn get(&self, namespace: &str, name: &str) -> Result<String, BackendError> {
        Self::entry(namespace, name)?
            .get_password()
            .map_err(map_keyring_error)
    }

    fn delete(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        Self::entry(namespace, name)?
            .delete_password()
            .map_err(map_keyring_error)
    }
}

pub(crate) fn map_keyring_error(err: keyring::Error) -> BackendError {
    match err {
        keyring::Error::NoEntry => BackendError::NoEntry,
        // only the secret itself counts as "too large"; an oversized name is a caller error
        keyring::Error::TooLong(attribute, limit) if attribute == "password" => {
            BackendError::TooLarge(format!("{} is limited to {} characters", attribute, limit))
        }
        other => BackendError::Platform(other.to_string()),
    }
}
