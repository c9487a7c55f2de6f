//! Encrypted file token store
//!
//! Fallback for tokens too large for the keyring:
//! 1. the token is sealed with a fresh key + nonce into `token_<hash>.bin`
//! 2. only the hex key goes into the `<service>-keys` ring
//!
//! A key without a readable, authentic file is corrupt and gets purged
//! (self-heal); reads then resolve to "no token".

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use zeroize::Zeroizing;

use crate::error::{StoreResult, TokenStoreError};
use crate::ring::{RingError, Secret, SecretRing};
use crate::store::crypto::{self, EntropySource, OsEntropy};
use crate::store::filename::token_path;
use crate::store::PutOutcome;

pub struct EncryptedFileStore {
    keys: SecretRing,
    token_dir: PathBuf,
    entropy: Arc<dyn EntropySource>,
}

impl EncryptedFileStore {
    /// `keys` is the ring holding file keys; files go into `token_dir`.
    pub fn new(keys: SecretRing, token_dir: impl Into<PathBuf>) -> Self {
        Self {
            keys,
            token_dir: token_dir.into(),
            entropy: Arc::new(OsEntropy),
        }
    }

    pub fn with_entropy(mut self, entropy: Arc<dyn EntropySource>) -> Self {
        self.entropy = entropy;
        self
    }

    pub fn key_ring(&self) -> &SecretRing {
        &self.keys
    }

    pub fn token_dir(&self) -> &Path {
        &self.token_dir
    }

    /// Path of the encrypted file for `name`.
    pub fn path_for(&self, name: &str) -> PathBuf {
        token_path(&self.token_dir, self.keys.namespace(), name)
    }

    /// Reads the token stored under `name`.
    ///
    /// `Ok(None)` when nothing was stored through this path, or when the
    /// stored entry turned out to be corrupt (it is purged in that case).
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> StoreResult<Option<T>> {
        let Some(plaintext) = self.load(name)? else {
            return Ok(None);
        };

        match serde_json::from_slice(&plaintext) {
            Ok(token) => Ok(Some(token)),
            Err(source) => {
                self.self_heal(name);
                Err(TokenStoreError::InvalidToken {
                    namespace: self.keys.namespace().to_string(),
                    name: name.to_string(),
                    source,
                })
            }
        }
    }

    /// Encrypts `token` to disk and registers its key.
    pub fn put<T: Serialize>(&self, name: &str, token: &T) -> StoreResult<PutOutcome> {
        let payload = Zeroizing::new(serde_json::to_vec(token).map_err(|source| {
            TokenStoreError::Serialization {
                namespace: self.keys.namespace().to_string(),
                name: name.to_string(),
                source,
            }
        })?);
        self.store(name, &payload)
    }

    /// Deletes the key entry and the file. Missing pieces are not an error.
    pub fn remove(&self, name: &str) -> StoreResult<()> {
        self.keys.put(name, None)?;

        let path = self.path_for(name);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(TokenStoreError::Io {
                op: "remove",
                path,
                source,
            }),
        }
    }

    /// Decrypted payload for `name`, or `None` if absent or corrupt.
    pub(crate) fn load(&self, name: &str) -> StoreResult<Option<Zeroizing<Vec<u8>>>> {
        // 1. key lookup
        let encoded = match self.keys.get(name) {
            Ok(secret) => secret,
            Err(RingError::NotFound { .. }) => return Ok(None),
            Err(err) => return Err(err.into()),
        };

        // 2. key decode
        let Some(key) = crypto::decode_key(encoded.expose().trim()) else {
            tracing::warn!(
                namespace = %self.keys.namespace(),
                entry = name,
                "malformed token file key"
            );
            self.self_heal(name);
            return Ok(None);
        };

        // 3. file read
        let path = self.path_for(name);
        let sealed = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(source) => {
                self.self_heal(name);
                return Err(TokenStoreError::Io {
                    op: "read",
                    path,
                    source,
                });
            }
        };

        // 4. authenticate + decrypt
        match crypto::open(&key, &sealed) {
            Some(plaintext) => Ok(Some(plaintext)),
            None => {
                tracing::warn!(
                    namespace = %self.keys.namespace(),
                    entry = name,
                    path = %path.display(),
                    "cannot decrypt token file"
                );
                self.self_heal(name);
                Ok(None)
            }
        }
    }

    pub(crate) fn store(&self, name: &str, payload: &[u8]) -> StoreResult<PutOutcome> {
        let key = crypto::generate_key(self.entropy.as_ref()).map_err(|source| {
            TokenStoreError::Randomness {
                what: "key",
                source,
            }
        })?;
        let nonce = crypto::generate_nonce(self.entropy.as_ref()).map_err(|source| {
            TokenStoreError::Randomness {
                what: "nonce",
                source,
            }
        })?;

        let sealed =
            crypto::seal(&key, &nonce, payload).map_err(|_| TokenStoreError::Encryption {
                namespace: self.keys.namespace().to_string(),
                name: name.to_string(),
            })?;

        crypto::create_private_dir(&self.token_dir).map_err(|source| TokenStoreError::Io {
            op: "create directory for",
            path: self.token_dir.clone(),
            source,
        })?;

        // file first: a crash before the key lands orphans a file, not a key
        let path = self.path_for(name);
        crypto::write_owner_only(&path, &sealed).map_err(|source| TokenStoreError::Io {
            op: "write",
            path: path.clone(),
            source,
        })?;

        let encoded = crypto::encode_key(&key);
        match self.keys.put(name, Some(&Secret::new(encoded.as_str()))) {
            Ok(()) => {
                tracing::debug!(
                    namespace = %self.keys.namespace(),
                    entry = name,
                    bytes = payload.len(),
                    "token stored in encrypted file"
                );
                Ok(PutOutcome::Stored)
            }
            Err(RingError::TooBig { .. }) => {
                tracing::warn!(
                    namespace = %self.keys.namespace(),
                    entry = name,
                    bytes = payload.len(),
                    "keyring rejected the file key as too large, token not persisted"
                );
                self.discard(name);
                Ok(PutOutcome::NotPersisted)
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Best-effort removal of any file-tier state for `name`.
    pub(crate) fn discard(&self, name: &str) {
        if let Err(err) = self.keys.put(name, None) {
            tracing::warn!(
                namespace = %self.keys.namespace(),
                entry = name,
                error = %err,
                "no token key to remove"
            );
        }

        let path = self.path_for(name);
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                path = %path.display(),
                error = %err,
                "cannot remove token file"
            ),
        }
    }

    fn self_heal(&self, name: &str) {
        tracing::warn!(
            namespace = %self.keys.namespace(),
            entry = name,
            "purging corrupt token entry"
        );
        self.discard(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::MemoryBackend;
    use crate::store::crypto::{KEY_LEN, NONCE_LEN};
    use crate::token::OAuthToken;
    use tempfile::tempdir;

    struct FailingEntropy;

    impl EntropySource for FailingEntropy {
        fn fill(&self, _buf: &mut [u8]) -> Result<(), rand::Error> {
            Err(rand::Error::new("entropy source unavailable"))
        }
    }

    fn store_in(dir: &Path, backend: Arc<MemoryBackend>) -> EncryptedFileStore {
        EncryptedFileStore::new(SecretRing::open("svc-keys", backend), dir)
    }

    fn sample_token() -> OAuthToken {
        OAuthToken {
            access_token: "ya29.a0AfH6SMB".to_string(),
            token_type: "Bearer".to_string(),
            refresh_token: Some("1//0gLy".to_string()),
            expiry: None,
        }
    }

    #[test]
    fn test_round_trip() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = store_in(dir.path(), backend.clone());

        assert_eq!(store.put("alice", &sample_token()).unwrap(), PutOutcome::Stored);
        let token: OAuthToken = store.get("alice").unwrap().unwrap();
        assert_eq!(token, sample_token());

        // only the key lives in the ring
        let key = store.key_ring().get("alice").unwrap();
        assert_eq!(key.len(), KEY_LEN * 2);
        assert!(!key.expose().contains("ya29"));
        assert!(store.path_for("alice").exists());
    }

    #[test]
    fn test_missing_key_is_absent_not_error() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path(), Arc::new(MemoryBackend::new()));

        let token: Option<OAuthToken> = store.get("nobody").unwrap();
        assert!(token.is_none());
    }

    #[test]
    fn test_fresh_key_and_nonce_per_put() {
        let dir = tempdir().unwrap();
        let store = store_in(dir.path(), Arc::new(MemoryBackend::new()));

        store.put("alice", &sample_token()).unwrap();
        let first_key = store.key_ring().get("alice").unwrap();
        let first_file = std::fs::read(store.path_for("alice")).unwrap();

        store.put("alice", &sample_token()).unwrap();
        let second_key = store.key_ring().get("alice").unwrap();
        let second_file = std::fs::read(store.path_for("alice")).unwrap();

        assert_ne!(first_key, second_key);
        assert_ne!(first_file[..NONCE_LEN], second_file[..NONCE_LEN]);
        assert_ne!(first_file, second_file);
    }

    #[test]
    fn test_tampered_file_self_heals() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = store_in(dir.path(), backend.clone());
        store.put("alice", &sample_token()).unwrap();

        let path = store.path_for("alice");
        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        std::fs::write(&path, &bytes).unwrap();

        let token: Option<OAuthToken> = store.get("alice").unwrap();
        assert!(token.is_none());
        assert!(!backend.contains("svc-keys", "alice"));
        assert!(!path.exists());

        let again: Option<OAuthToken> = store.get("alice").unwrap();
        assert!(again.is_none());
    }

    #[test]
    fn test_missing_file_self_heals_with_io_error() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = store_in(dir.path(), backend.clone());
        store.put("alice", &sample_token()).unwrap();

        std::fs::remove_file(store.path_for("alice")).unwrap();

        let err = store.get::<OAuthToken>("alice").unwrap_err();
        assert!(matches!(err, TokenStoreError::Io { op: "read", .. }));
        assert!(!backend.contains("svc-keys", "alice"));

        // the orphaned key is gone, so the slot now reads as absent
        assert!(store.get::<OAuthToken>("alice").unwrap().is_none());
    }

    #[test]
    fn test_malformed_key_self_heals() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = store_in(dir.path(), backend.clone());
        store.put("alice", &sample_token()).unwrap();

        store
            .key_ring()
            .put("alice", Some(&Secret::new("not-hex")))
            .unwrap();

        assert!(store.get::<OAuthToken>("alice").unwrap().is_none());
        assert!(!backend.contains("svc-keys", "alice"));
        assert!(!store.path_for("alice").exists());
    }

    #[test]
    fn test_undecodable_payload_is_invalid_token() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = store_in(dir.path(), backend.clone());
        store.put("alice", &"just a string").unwrap();

        let err = store.get::<OAuthToken>("alice").unwrap_err();
        assert!(matches!(err, TokenStoreError::InvalidToken { .. }));
        assert!(!backend.contains("svc-keys", "alice"));
    }

    #[test]
    fn test_randomness_failure_is_fatal() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store =
            store_in(dir.path(), backend.clone()).with_entropy(Arc::new(FailingEntropy));

        let err = store.put("alice", &sample_token()).unwrap_err();
        assert!(matches!(err, TokenStoreError::Randomness { what: "key", .. }));
        assert!(backend.is_empty());
        assert!(!store.path_for("alice").exists());
    }

    #[test]
    fn test_key_too_big_is_not_persisted() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::with_max_secret_len(16));
        let store = store_in(dir.path(), backend.clone());

        let outcome = store.put("alice", &sample_token()).unwrap();
        assert_eq!(outcome, PutOutcome::NotPersisted);
        assert!(!outcome.is_persisted());
        assert!(!store.path_for("alice").exists());
        assert!(store.get::<OAuthToken>("alice").unwrap().is_none());
    }

    #[test]
    fn test_remove_clears_both_pieces() {
        let dir = tempdir().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let store = store_in(dir.path(), backend.clone());
        store.put("alice", &sample_token()).unwrap();

        store.remove("alice").unwrap();
        assert!(backend.is_empty());
        assert!(!store.path_for("alice").exists());

        // idempotent
        store.remove("alice").unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = store_in(&dir.path().join("nested"), Arc::new(MemoryBackend::new()));
        store.put("alice", &sample_token()).unwrap();

        let mode = std::fs::metadata(store.path_for("alice"))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
