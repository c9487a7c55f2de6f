//! Token stores
//!
//! - `TieredTokenStore`: keyring first, encrypted file when the keyring says "too big"
//! - `EncryptedFileStore`: sealed file + key in `<service>-keys`
//! - `filename`: deterministic, opaque token file names

pub mod crypto;
pub mod file_store;
pub mod filename;
pub mod tiered;

pub use crypto::{EntropySource, OsEntropy};
pub use file_store::EncryptedFileStore;
pub use filename::{token_file_name, token_path};
pub use tiered::TieredTokenStore;

/// Result of a put.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PutOutcome {
    /// The token is persisted and readable by a later get.
    Stored,
    /// The slot was cleared.
    Removed,
    /// Neither tier could hold the token; nothing was kept for the slot.
    NotPersisted,
}

impl PutOutcome {
    pub fn is_persisted(&self) -> bool {
        matches!(self, PutOutcome::Stored)
    }
}
