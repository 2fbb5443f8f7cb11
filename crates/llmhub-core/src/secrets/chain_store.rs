//! Chained secret store with fallback behavior

use std::sync::Arc;

use super::traits::{SecretInfo, SecretStore, SecretStoreError, SecretStoreResult};

/// A secret store that chains multiple stores together with fallback behavior
///
/// Reads try each available store in order and return the first hit. A store
/// that errors is skipped; if no store has the key and at least one errored,
/// the first error is returned instead of a miss. Writes go to the designated
/// write store (default: first store).
pub struct ChainSecretStore {
    stores: Vec<Arc<dyn SecretStore>>,
    write_store_index: usize,
}

impl ChainSecretStore {
    /// Create a new chain store; the first store receives writes
    pub fn new(stores: Vec<Arc<dyn SecretStore>>) -> SecretStoreResult<Self> {
        Self::with_write_store(stores, 0)
    }

    /// Create a chain store with a specific write store
    pub fn with_write_store(
        stores: Vec<Arc<dyn SecretStore>>,
        write_store_index: usize,
    ) -> SecretStoreResult<Self> {
        if stores.is_empty() {
            return Err(SecretStoreError::Other(
                "ChainSecretStore requires at least one store".to_string(),
            ));
        }
        if write_store_index >= stores.len() {
            return Err(SecretStoreError::Other(format!(
                "write store index {} out of bounds for {} stores",
                write_store_index,
                stores.len()
            )));
        }
        Ok(Self {
            stores,
            write_store_index,
        })
    }

    pub fn stores(&self) -> &[Arc<dyn SecretStore>] {
        &self.stores
    }

    /// Find which store has a key
    pub fn find_store(&self, key: &str) -> Option<&Arc<dyn SecretStore>> {
        self.stores
            .iter()
            .find(|store| store.is_available() && store.has(key))
    }
}

impl SecretStore for ChainSecretStore {
    fn name(&self) -> &str {
        "chain"
    }

    fn is_available(&self) -> bool {
        self.stores.iter().any(|s| s.is_available())
    }

    fn get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        let mut first_error = None;
        for store in self.stores.iter().filter(|s| s.is_available()) {
            match store.get(key) {
                Ok(Some(value)) => return Ok(Some(value)),
                Ok(None) => {}
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.stores[self.write_store_index].store(key, value)
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        // Read-only stores that hold the key are left alone
        for store in self.stores.iter().filter(|s| s.has(key)) {
            match store.delete(key) {
                Ok(()) | Err(SecretStoreError::ReadOnly) => {}
                Err(e) => return Err(e),
            }
        }
        Ok(())
    }

    fn get_info(&self, key: &str) -> SecretInfo {
        self.find_store(key)
            .map(|store| SecretInfo::found(key, store.name()))
            .unwrap_or_else(|| SecretInfo::missing(key))
    }
}

impl std::fmt::Debug for ChainSecretStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.stores.iter().map(|s| s.name()).collect();
        f.debug_struct("ChainSecretStore")
            .field("stores", &names)
            .field("write_store_index", &self.write_store_index)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::{EnvSecretStore, MemorySecretStore};

    struct Offline;

    impl SecretStore for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn get(&self, _key: &str) -> SecretStoreResult<Option<String>> {
            Err(SecretStoreError::NotAvailable("daemon not running".into()))
        }

        fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
            Err(SecretStoreError::NotAvailable("daemon not running".into()))
        }

        fn delete(&self, _key: &str) -> SecretStoreResult<()> {
            Err(SecretStoreError::NotAvailable("daemon not running".into()))
        }
    }

    fn pair() -> (Arc<MemorySecretStore>, Arc<MemorySecretStore>) {
        (Arc::new(MemorySecretStore::new()), Arc::new(MemorySecretStore::new()))
    }

    #[test]
    fn test_chain_store_fallback_and_priority() {
        let (store1, store2) = pair();
        store2.store("key", "from_store2").unwrap();
        store2.store("both", "from_store2").unwrap();
        store1.store("both", "from_store1").unwrap();

        let chain = ChainSecretStore::new(vec![store1, store2]).unwrap();
        assert_eq!(chain.get("key").unwrap().as_deref(), Some("from_store2"));
        assert_eq!(chain.get("both").unwrap().as_deref(), Some("from_store1"));
    }

    #[test]
    fn test_chain_store_write_targets() {
        let (store1, store2) = pair();
        let chain = ChainSecretStore::new(vec![store1.clone(), store2.clone()]).unwrap();
        chain.store("key", "value").unwrap();
        assert!(store1.has("key"));
        assert!(!store2.has("key"));

        let (store1, store2) = pair();
        let chain = ChainSecretStore::with_write_store(vec![store1.clone(), store2.clone()], 1).unwrap();
        chain.store("key", "value").unwrap();
        assert!(!store1.has("key"));
        assert!(store2.has("key"));
    }

    #[test]
    fn test_chain_store_delete_skips_read_only() {
        let (store1, store2) = pair();
        store1.store("key", "value1").unwrap();
        store2.store("key", "value2").unwrap();

        let chain = ChainSecretStore::new(vec![
            Arc::new(EnvSecretStore::new()),
            store1.clone(),
            store2.clone(),
        ])
        .unwrap();
        chain.delete("key").unwrap();
        assert!(!store1.has("key"));
        assert!(!store2.has("key"));
    }

    #[test]
    fn test_chain_store_error_only_when_nothing_found() {
        let memory = Arc::new(MemorySecretStore::from_pairs([("k1", "secret-abc")]));
        let chain = ChainSecretStore::new(vec![Arc::new(Offline), memory]).unwrap();

        assert_eq!(chain.get("k1").unwrap().as_deref(), Some("secret-abc"));
        assert!(matches!(chain.get("missing"), Err(SecretStoreError::NotAvailable(_))));
    }

    #[test]
    fn test_chain_store_get_info() {
        let (store1, store2) = pair();
        store2.store("key", "value").unwrap();
        let chain = ChainSecretStore::new(vec![store1, store2]).unwrap();

        let info = chain.get_info("key");
        assert!(info.is_available());
        assert_eq!(info.store.as_deref(), Some("memory"));
        assert!(!chain.get_info("nonexistent").is_available());
    }

    #[test]
    fn test_chain_store_construction_errors() {
        assert!(ChainSecretStore::new(vec![]).is_err());
        let store: Arc<dyn SecretStore> = Arc::new(MemorySecretStore::new());
        assert!(ChainSecretStore::with_write_store(vec![store], 5).is_err());
    }
}
