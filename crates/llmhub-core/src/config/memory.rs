//! In-memory configuration source

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{ProviderConfig, ProviderId};
use super::document::ProvidersFile;
use super::traits::{ConfigResult, ConfigSource};

/// In-memory configuration source for testing and embedding
#[derive(Debug, Default)]
pub struct MemoryConfigSource {
    file: RwLock<ProvidersFile>,
}

impl MemoryConfigSource {
    pub fn new(file: ProvidersFile) -> Self {
        Self {
            file: RwLock::new(file),
        }
    }

    /// Create a source with the given providers and no defaults
    pub fn with_providers(providers: Vec<ProviderConfig>) -> Self {
        Self::new(ProvidersFile::new(providers))
    }

    /// Insert or replace one provider entry
    pub fn upsert(&self, config: ProviderConfig) {
        self.file.write().upsert(config);
    }

    pub fn set_default_provider(&self, id: ProviderId) {
        let mut file = self.file.write();
        let current = std::mem::take(&mut *file);
        *file = current.with_default_provider(id);
    }
}

#[async_trait]
impl ConfigSource for MemoryConfigSource {
    async fn load(&self) -> ConfigResult<ProvidersFile> {
        let file = self.file.read().clone();
        file.validate()?;
        Ok(file)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}
