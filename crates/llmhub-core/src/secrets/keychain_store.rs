//! System keychain secret store
//!
//! Uses the OS keychain for secure secret storage:
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use std::sync::Arc;

use keyring::Entry;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};
use crate::logging::{Logger, NoOpLogger};

/// Secret store backed by the system keychain
///
/// Entries live under one service name (default `llmhub`), keyed by secret
/// reference. A missing entry is a miss; a keychain that cannot be reached is
/// an error, so callers can tell "no key" from "no keychain".
pub struct KeychainSecretStore {
    service_name: String,
    logger: Arc<dyn Logger>,
}

impl KeychainSecretStore {
    /// Create a new keychain store with the default service name "llmhub"
    pub fn new() -> Self {
        Self::with_service("llmhub")
    }

    /// Create a new keychain store with a custom service name
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
            logger: Arc::new(NoOpLogger),
        }
    }

    /// Attach a logger
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    fn entry(&self, key: &str) -> SecretStoreResult<Entry> {
        Entry::new(&self.service_name, key)
            .map_err(|e| SecretStoreError::NotAvailable(format!("keychain entry for '{}': {}", key, e)))
    }
}

impl Default for KeychainSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for KeychainSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeychainSecretStore")
            .field("service_name", &self.service_name)
            .finish()
    }
}

/// Translate a keyring failure, keeping platform outages distinct
fn keyring_error(action: &str, err: keyring::Error) -> SecretStoreError {
    match err {
        keyring::Error::PlatformFailure(e) => SecretStoreError::NotAvailable(format!("{}: {}", action, e)),
        keyring::Error::NoStorageAccess(e) => SecretStoreError::NotAvailable(format!("{}: {}", action, e)),
        other => SecretStoreError::Other(format!("{}: {}", action, other)),
    }
}

impl SecretStore for KeychainSecretStore {
    fn name(&self) -> &str {
        "keychain"
    }

    fn is_available(&self) -> bool {
        match Entry::new(&self.service_name, "__llmhub_availability_check__") {
            Ok(_) => true,
            Err(e) => {
                self.logger.warn(&format!("KeychainSecretStore: unavailable: {}", e));
                false
            }
        }
    }

    fn get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        self.logger.debug(&format!(
            "KeychainSecretStore: get key='{}', service='{}'",
            key, self.service_name
        ));
        match self.entry(key)?.get_password() {
            Ok(password) => Ok(Some(password)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => {
                self.logger.warn(&format!("KeychainSecretStore: get '{}' failed: {}", key, e));
                Err(keyring_error("read from keychain", e))
            }
        }
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.entry(key)?
            .set_password(value)
            .map_err(|e| keyring_error("store in keychain", e))?;

        // A fresh entry avoids reading back a cached credential
        match self.entry(key)?.get_password() {
            Ok(retrieved) if retrieved == value => Ok(()),
            Ok(_) => Err(SecretStoreError::Other(
                "keychain store verification failed: value mismatch".to_string(),
            )),
            Err(e) => Err(keyring_error("verify keychain store", e)),
        }
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(keyring_error("delete from keychain", e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // These tests require a running keychain service

    #[test]
    #[ignore] // Requires system keychain
    fn test_store_and_get() {
        let store = KeychainSecretStore::with_service("llmhub-test");
        let _ = store.delete("test_key");

        store.store("test_key", "test_value").unwrap();
        assert_eq!(store.get("test_key").unwrap().as_deref(), Some("test_value"));

        store.delete("test_key").unwrap();
        assert_eq!(store.get("test_key").unwrap(), None);
    }

    #[test]
    fn test_name_and_service() {
        let store = KeychainSecretStore::new();
        assert_eq!(store.name(), "keychain");
        assert_eq!(store.service_name(), "llmhub");
    }
}
