use std::collections::HashMap;
use std::sync::Mutex;

use super::backend::{BackendError, SecretBackend};

/// In-process secret backend.
///
/// Behaves like an OS keyring with an optional per-secret size limit, so
/// the too-big fallback path can be exercised without touching the real
/// platform store.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    entries: Mutex<HashMap<(String, String), String>>,
    max_secret_len: Option<usize>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rejects secrets longer than `limit` bytes with [`BackendError::TooLarge`].
    pub fn with_max_secret_len(limit: usize) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            max_secret_len: Some(limit),
        }
    }

    pub fn contains(&self, namespace: &str, name: &str) -> bool {
        self.entries
            .lock()
            .map(|entries| entries.contains_key(&(namespace.to_string(), name.to_string())))
            .unwrap_or(false)
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(
        &self,
    ) -> Result<std::sync::MutexGuard<'_, HashMap<(String, String), String>>, BackendError> {
        self.entries
            .lock()
            .map_err(|_| BackendError::Platform("memory backend lock poisoned".to_string()))
    }
}

impl SecretBackend for MemoryBackend {
    fn set(&self, namespace: &str, name: &str, secret: &str) -> Result<(), BackendError> {
        if let Some(limit) = self.max_secret_len {
            if secret.len() > limit {
                return Err(BackendError::TooLarge(format!(
                    "{} bytes exceeds limit of {}",
                    secret.len(),
                    limit
                )));
            }
        }
        self.lock()?
            .insert((namespace.to_string(), name.to_string()), secret.to_string());
        Ok(())
    }

    fn get(&self, namespace: &str, name: &str) -> Result<String, BackendError> {
        self.lock()?
            .get(&(namespace.to_string(), name.to_string()))
            .cloned()
            .ok_or(BackendError::NoEntry)
    }

    fn delete(&self, namespace: &str, name: &str) -> Result<(), BackendError> {
        self.lock()?
            .remove(&(namespace.to_string(), name.to_string()))
            .map(|_| ())
            .ok_or(BackendError::NoEntry)
    }
}
