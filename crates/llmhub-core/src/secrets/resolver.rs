//! Async secret resolution contract

use std::sync::Arc;

use async_trait::async_trait;

use super::chain_store::ChainSecretStore;
use super::env_store::EnvSecretStore;
use super::keychain_store::KeychainSecretStore;
use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Turns a secret reference into a plaintext credential
///
/// `Ok(None)` means the reference is unknown; `Err` means the backing store
/// could not be consulted.
#[async_trait]
pub trait SecretResolver: Send + Sync {
    async fn resolve(&self, secret_ref: &str) -> SecretStoreResult<Option<String>>;
}

/// Resolver backed by a synchronous [`SecretStore`]
///
/// Store reads run on tokio's blocking pool, since keychain access can block
/// on an OS daemon.
#[derive(Clone)]
pub struct StoreSecretResolver {
    store: Arc<dyn SecretStore>,
}

impl StoreSecretResolver {
    pub fn new(store: Arc<dyn SecretStore>) -> Self {
        Self { store }
    }

    /// Environment (`LLMHUB_` prefix first) then the system keychain
    pub fn system_default() -> SecretStoreResult<Self> {
        let chain = ChainSecretStore::with_write_store(
            vec![
                Arc::new(EnvSecretStore::with_prefix("LLMHUB_")),
                Arc::new(KeychainSecretStore::new()),
            ],
            1,
        )?;
        Ok(Self::new(Arc::new(chain)))
    }

    pub fn store(&self) -> &Arc<dyn SecretStore> {
        &self.store
    }
}

impl std::fmt::Debug for StoreSecretResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreSecretResolver")
            .field("store", &self.store.name())
            .finish()
    }
}

#[async_trait]
impl SecretResolver for StoreSecretResolver {
    async fn resolve(&self, secret_ref: &str) -> SecretStoreResult<Option<String>> {
        let store = Arc::clone(&self.store);
        let key = secret_ref.to_string();
        tokio::task::spawn_blocking(move || store.get(&key))
            .await
            .map_err(|e| SecretStoreError::Other(format!("secret lookup task failed: {}", e)))?
    }
}
