//! Environment variable secret store

use std::collections::HashMap;
use std::env;

use once_cell::sync::Lazy;

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};

/// Well-known variables for each provider token and default secret reference
static ENV_VAR_MAP: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    let mut m: HashMap<&'static str, &'static [&'static str]> = HashMap::new();
    m.insert("gemini", &["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("gemini_api_key", &["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
    m.insert("google_api_key", &["GOOGLE_API_KEY", "GEMINI_API_KEY"]);
    m.insert("openai", &["OPENAI_API_KEY"]);
    m.insert("anthropic", &["ANTHROPIC_API_KEY"]);
    m.insert("ollama", &["OLLAMA_API_KEY"]);
    m
});

/// Read-only secret store backed by process environment variables
///
/// A key is resolved by trying, in order:
/// 1. `<prefix><KEY>` when a prefix is set (e.g. `LLMHUB_GEMINI_API_KEY`)
/// 2. the key verbatim, then upper-cased
/// 3. the well-known variables for provider tokens (`gemini` → `GEMINI_API_KEY`, `GOOGLE_API_KEY`)
/// 4. `<KEY>_API_KEY`
///
/// Empty variables count as unset.
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore {
    prefix: Option<String>,
}

impl EnvSecretStore {
    /// Create a store without a prefix
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that checks `<prefix><KEY>` before anything else
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
        }
    }

    /// Known environment variables for a provider token or secret reference
    pub fn known_vars(key: &str) -> &'static [&'static str] {
        ENV_VAR_MAP
            .get(key.to_lowercase().as_str())
            .copied()
            .unwrap_or(&[])
    }

    /// Candidate variable names for `key`, in lookup order
    fn candidates(&self, key: &str) -> Vec<String> {
        let upper = key.to_uppercase().replace(['-', '.'], "_");
        let mut names = Vec::new();
        if let Some(prefix) = &self.prefix {
            names.push(format!("{}{}", prefix, upper));
        }
        names.push(key.to_string());
        names.push(upper.clone());
        names.extend(Self::known_vars(key).iter().map(|v| v.to_string()));
        if !upper.ends_with("_API_KEY") {
            names.push(format!("{}_API_KEY", upper));
        }
        names.dedup();
        names
    }
}

impl SecretStore for EnvSecretStore {
    fn name(&self) -> &str {
        "env"
    }

    fn get(&self, key: &str) -> SecretStoreResult<Option<String>> {
        Ok(self
            .candidates(key)
            .iter()
            .filter_map(|name| env::var(name).ok())
            .find(|value| !value.is_empty()))
    }

    fn store(&self, _key: &str, _value: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }

    fn delete(&self, _key: &str) -> SecretStoreResult<()> {
        Err(SecretStoreError::ReadOnly)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_store_read_only() {
        let store = EnvSecretStore::new();
        assert_eq!(store.name(), "env");
        assert!(matches!(store.store("test", "value"), Err(SecretStoreError::ReadOnly)));
        assert!(matches!(store.delete("test"), Err(SecretStoreError::ReadOnly)));
    }

    #[test]
    fn test_env_store_get_direct() {
        env::set_var("LLMHUB_TEST_DIRECT_7781", "test_value");
        let store = EnvSecretStore::new();
        assert_eq!(
            store.get("LLMHUB_TEST_DIRECT_7781").unwrap().as_deref(),
            Some("test_value")
        );
        env::remove_var("LLMHUB_TEST_DIRECT_7781");
    }

    #[test]
    fn test_env_store_uppercases_secret_refs() {
        env::set_var("LLMHUB_TEST_REF_7782_API_KEY", "sk-ref");
        let store = EnvSecretStore::new();
        assert_eq!(
            store.get("llmhub_test_ref_7782").unwrap().as_deref(),
            Some("sk-ref")
        );
        assert_eq!(
            store.get("llmhub-test-ref-7782_api_key").unwrap().as_deref(),
            Some("sk-ref")
        );
        env::remove_var("LLMHUB_TEST_REF_7782_API_KEY");
    }

    #[test]
    fn test_env_store_prefix_wins() {
        env::set_var("PFX7783_SHARED_7783", "prefixed");
        env::set_var("SHARED_7783", "plain");
        let store = EnvSecretStore::with_prefix("PFX7783_");
        assert_eq!(store.get("shared_7783").unwrap().as_deref(), Some("prefixed"));
        env::remove_var("PFX7783_SHARED_7783");
        env::remove_var("SHARED_7783");
    }

    #[test]
    fn test_env_store_empty_is_unset() {
        env::set_var("LLMHUB_TEST_EMPTY_7784", "");
        let store = EnvSecretStore::new();
        assert_eq!(store.get("LLMHUB_TEST_EMPTY_7784").unwrap(), None);
        env::remove_var("LLMHUB_TEST_EMPTY_7784");
    }

    #[test]
    fn test_known_vars() {
        assert_eq!(EnvSecretStore::known_vars("Gemini"), &["GEMINI_API_KEY", "GOOGLE_API_KEY"]);
        assert!(EnvSecretStore::known_vars("nonexistent").is_empty());
    }
}
