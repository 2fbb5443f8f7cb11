//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreResult};

/// In-memory secret store for tests and ephemeral use
///
/// ```
/// use llmhub_core::secrets::{SecretStore, MemorySecretStore};
///
/// let store = MemorySecretStore::from_pairs([("k1", "secret-abc")]);
/// assert_eq!(store.get("k1").unwrap(), Some("secret-abc".to_string()));
/// ```
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a memory store holding the given key/value pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let secrets = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            secrets: RwLock::new(secrets),
        }
    }

    pub fn clear(&self) {
        self.secrets.write().clear();
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        Ok(self.secrets.read().get(key).cloned())
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        self.secrets.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("test").unwrap(), None);

        store.store("test", "value").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.has("test"));

        store.store("test", "new_value").unwrap();
        assert_eq!(store.get("test").unwrap().as_deref(), Some("new_value"));

        store.delete("test").unwrap();
        assert!(!store.has("test"));
        assert!(store.is_empty());
    }

    #[test]
    fn test_from_pairs_and_info() {
        let store = MemorySecretStore::from_pairs([("a", "1"), ("b", "2")]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get_info("a").store.as_deref(), Some("memory"));
        assert!(!store.get_info("c").is_available());

        store.clear();
        assert!(store.is_empty());
    }
}
