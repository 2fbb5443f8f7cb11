//! Core traits and types for secret storage

use thiserror::Error;

/// Where a secret reference resolves, without exposing the value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretInfo {
    pub secret_ref: String,
    /// Name of the store holding it; `None` when no store has it
    pub store: Option<String>,
}

impl SecretInfo {
    pub fn found(secret_ref: impl Into<String>, store: impl Into<String>) -> Self {
        Self {
            secret_ref: secret_ref.into(),
            store: Some(store.into()),
        }
    }

    pub fn missing(secret_ref: impl Into<String>) -> Self {
        Self {
            secret_ref: secret_ref.into(),
            store: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.store.is_some()
    }
}

/// Failures of a secret store itself
///
/// A secret that is simply absent is not an error; `get` returns `Ok(None)`.
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("secret store is read-only")]
    ReadOnly,

    #[error("secret store unavailable: {0}")]
    NotAvailable(String),

    #[error("secret store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Synchronous key/value backend for credentials
///
/// Keys are the `secret_ref` values from provider configuration. `get`
/// separates a miss (`Ok(None)`) from a store that could not be consulted
/// (`Err`); the registry reports the two differently.
pub trait SecretStore: Send + Sync {
    fn name(&self) -> &str;

    /// Whether the backend can be reached at all (a keychain on a headless
    /// host often cannot)
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, secret_ref: &str) -> SecretStoreResult<Option<String>>;

    /// Fails with `ReadOnly` on stores that cannot be written
    fn store(&self, secret_ref: &str, value: &str) -> SecretStoreResult<()>;

    /// Fails with `ReadOnly` on stores that cannot be written
    fn delete(&self, secret_ref: &str) -> SecretStoreResult<()>;

    /// An erroring store counts as a miss
    fn has(&self, secret_ref: &str) -> bool {
        matches!(self.get(secret_ref), Ok(Some(_)))
    }

    fn get_info(&self, secret_ref: &str) -> SecretInfo {
        if self.has(secret_ref) {
            SecretInfo::found(secret_ref, self.name())
        } else {
            SecretInfo::missing(secret_ref)
        }
    }
}
