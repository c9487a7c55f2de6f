//! ringvault - tiered OAuth token storage
//!
//! Tokens go into the OS keyring. When the keyring rejects a token as too
//! large, it is sealed (XChaCha20-Poly1305) into a file and only the file key
//! is kept in the keyring. Plaintext never touches the disk.
//!
//! ```no_run
//! use ringvault::{OAuthToken, TieredTokenStore};
//!
//! # fn main() -> Result<(), ringvault::TokenStoreError> {
//! let store = TieredTokenStore::open_default("gsheets")?;
//! let token: Option<OAuthToken> = store.get("me@example.com")?;
//! # Ok(())
//! # }
//! ```

pub mod async_store;
pub mod config;
pub mod error;
pub mod ring;
pub mod store;
pub mod token;

pub use async_store::AsyncTokenStore;
pub use config::{ConfigError, ConfigProvider, StoreConfig};
pub use error::{StoreResult, TokenStoreError};
pub use ring::{BackendError, KeyringBackend, MemoryBackend, RingError, Secret, SecretBackend, SecretRing};
pub use store::{EncryptedFileStore, PutOutcome, TieredTokenStore};
pub use token::OAuthToken;
