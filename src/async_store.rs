//! Async facade over `TieredTokenStore`
//!
//! Keyring IPC and file I/O block, so every call runs on tokio's blocking
//! pool. Semantics are identical to the synchronous store.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{StoreResult, TokenStoreError};
use crate::store::{PutOutcome, TieredTokenStore};

#[derive(Clone)]
pub struct AsyncTokenStore {
    inner: Arc<TieredTokenStore>,
}

impl AsyncTokenStore {
    pub fn new(store: TieredTokenStore) -> Self {
        Self {
            inner: Arc::new(store),
        }
    }

    pub fn inner(&self) -> &TieredTokenStore {
        &self.inner
    }

    pub async fn get<T>(&self, name: impl Into<String>) -> StoreResult<Option<T>>
    where
        T: DeserializeOwned + Send + 'static,
    {
        let store = self.inner.clone();
        let name = name.into();
        tokio::task::spawn_blocking(move || store.get::<T>(&name))
            .await
            .map_err(|e| TokenStoreError::Task(e.to_string()))?
    }

    pub async fn put<T>(&self, name: impl Into<String>, token: Option<T>) -> StoreResult<PutOutcome>
    where
        T: Serialize + Send + 'static,
    {
        let store = self.inner.clone();
        let name = name.into();
        tokio::task::spawn_blocking(move || store.put(&name, token.as_ref()))
            .await
            .map_err(|e| TokenStoreError::Task(e.to_string()))?
    }

    pub async fn remove(&self, name: impl Into<String>) -> StoreResult<()> {
        let store = self.inner.clone();
        let name = name.into();
        tokio::task::spawn_blocking(move || store.remove(&name))
            .await
            .map_err(|e| TokenStoreError::Task(e.to_string()))?
    }
}
