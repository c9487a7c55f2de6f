//! Tiered token store
//!
//! Single get/put contract over two physical backends:
//! - the `<service>` keyring namespace (fast path)
//! - `EncryptedFileStore` when the keyring rejects the payload as too big
//!
//! Callers cannot tell which tier holds a token. A slot lives in at most one
//! tier at a time.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::config::{ConfigProvider, StoreConfig};
use crate::error::{StoreResult, TokenStoreError};
use crate::ring::{KeyringBackend, RingError, Secret, SecretBackend, SecretRing};
use crate::store::{EncryptedFileStore, PutOutcome};

pub struct TieredTokenStore {
    ring: SecretRing,
    files: EncryptedFileStore,
}

impl TieredTokenStore {
    /// Both rings (`<service>` and `<service>-keys`) share `backend`.
    pub fn new(config: &StoreConfig, backend: Arc<dyn SecretBackend>) -> Self {
        let ring = SecretRing::open(config.service(), backend.clone());
        let keys = SecretRing::open(config.key_namespace(), backend);
        Self::from_parts(ring, EncryptedFileStore::new(keys, config.token_dir()))
    }

    /// Store over the platform keyring.
    pub fn with_keyring(config: &StoreConfig) -> Self {
        Self::new(config, Arc::new(KeyringBackend))
    }

    /// Keyring-backed store configured from the environment (`.env.local`,
    /// `.env`, `$RINGVAULT_TOKEN_DIR`, XDG config dir).
    pub fn open_default(service: &str) -> StoreResult<Self> {
        ConfigProvider::load_dotenv();
        let config = StoreConfig::from_provider(&ConfigProvider::new(), service)?;
        tracing::debug!(
            service,
            token_dir = %config.token_dir().display(),
            "opening token store"
        );
        Ok(Self::with_keyring(&config))
    }

    pub fn from_parts(ring: SecretRing, files: EncryptedFileStore) -> Self {
        Self { ring, files }
    }

    pub fn namespace(&self) -> &str {
        self.ring.namespace()
    }

    pub fn file_store(&self) -> &EncryptedFileStore {
        &self.files
    }

    /// Token stored under `name`, or `None`.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        match self.ring.get(name) {
            Ok(secret) => serde_json::from_str(secret.expose())
                .map(Some)
                .map_err(|source| TokenStoreError::InvalidToken {
                    namespace: self.ring.namespace().to_string(),
                    name: name.to_string(),
                    source,
                }),
            Err(RingError::NotFound { .. }) => self.files.get(name),
            Err(err) => Err(err.into()),
        }
    }

    /// Stores `token` under `name`; `None` clears the slot.
    pub fn put<T: Serialize>(&self, name: &str, token: Option<&T>) -> StoreResult<PutOutcome> {
        let Some(token) = token else {
            self.remove(name)?;
            return Ok(PutOutcome::Removed);
        };

        let payload = Zeroizing::new(serde_json::to_string(token).map_err(|source| {
            TokenStoreError::Serialization {
                namespace: self.ring.namespace().to_string(),
                name: name.to_string(),
                source,
            }
        })?);

        match self.ring.put(name, Some(&Secret::new(payload.as_str()))) {
            Ok(()) => {
                // a previous oversized token may still sit in the file tier
                self.files.discard(name);
                Ok(PutOutcome::Stored)
            }
            Err(RingError::TooBig { .. }) => {
                tracing::info!(
                    namespace = %self.ring.namespace(),
                    entry = name,
                    bytes = payload.len(),
                    "token too large for keyring, storing it in an encrypted file"
                );
                let outcome = self.files.store(name, payload.as_bytes())?;
                // drop a stale ring entry so it cannot shadow the new token
                self.ring.put(name, None)?;
                Ok(outcome)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Clears `name` from both tiers.
    pub fn remove(&self, name: &str) -> StoreResult<()> {
        self.ring.put(name, None)?;
        self.files.remove(name)
    }
}
