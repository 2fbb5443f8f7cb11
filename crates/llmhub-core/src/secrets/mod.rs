//! Secret storage and resolution
//!
//! Stores are synchronous key/value backends (`SecretStore`). The registry
//! only sees the async `SecretResolver` contract; `StoreSecretResolver` binds
//! the two.

mod traits;
mod env_store;
mod memory_store;
mod chain_store;
mod keychain_store;
mod resolver;

pub use traits::{SecretStore, SecretInfo, SecretStoreError, SecretStoreResult};
pub use env_store::EnvSecretStore;
pub use memory_store::MemorySecretStore;
pub use chain_store::ChainSecretStore;
pub use keychain_store::KeychainSecretStore;
pub use resolver::{SecretResolver, StoreSecretResolver};
