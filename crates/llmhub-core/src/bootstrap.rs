//! Wiring for the default stack
//!
//! ```no_run
//! # async fn run() -> llmhub_core::OrchestratorResult<()> {
//! use std::sync::Arc;
//! use llmhub_core::bootstrap::Orchestrator;
//! use llmhub_core::config::FileConfigSource;
//! use llmhub_core::logging::TracingLogger;
//! use llmhub_core::secrets::StoreSecretResolver;
//!
//! let secrets = StoreSecretResolver::system_default()
//!     .map_err(|e| llmhub_core::OrchestratorError::invalid_request(e.to_string()))?;
//! let orchestrator = Orchestrator::from_source(
//!     &FileConfigSource::user(),
//!     Arc::new(secrets),
//!     Arc::new(TracingLogger::new("llmhub")),
//! )
//! .await?;
//! let service = orchestrator.service();
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use crate::config::{ConfigSource, ProvidersFile};
use crate::error::OrchestratorResult;
use crate::log_info;
use crate::logging::Logger;
use crate::orchestration::OrchestrationService;
use crate::providers::default_strategies;
use crate::registry::ProviderRegistry;
use crate::secrets::SecretResolver;

/// A registry populated with every shipped strategy, plus the service in
/// front of it
#[derive(Debug, Clone)]
pub struct Orchestrator {
    registry: Arc<ProviderRegistry>,
    service: OrchestrationService,
}

impl Orchestrator {
    /// Build from an already-loaded configuration document
    ///
    /// The document's default provider, if any, becomes the active one.
    pub fn from_file(
        file: ProvidersFile,
        secrets: Arc<dyn SecretResolver>,
        logger: Arc<dyn Logger>,
    ) -> OrchestratorResult<Self> {
        file.validate()?;

        let registry = Arc::new(ProviderRegistry::new(secrets, Arc::clone(&logger)));
        for strategy in default_strategies(Arc::clone(&logger)) {
            registry.register(strategy);
        }

        let default_provider = file.default_provider();
        registry.load_configs(file.providers);
        if let Some(id) = default_provider {
            registry.set_active(id)?;
        }

        let service = OrchestrationService::new(Arc::clone(&registry), logger);
        Ok(Self { registry, service })
    }

    /// Load one configuration source and build
    pub async fn from_source(
        source: &dyn ConfigSource,
        secrets: Arc<dyn SecretResolver>,
        logger: Arc<dyn Logger>,
    ) -> OrchestratorResult<Self> {
        let file = source.load().await?;
        log_info!(logger, "[Bootstrap] loaded providers from {}", source.describe());
        Self::from_file(file, secrets, logger)
    }

    /// Load several sources, later ones overriding earlier ones per provider,
    /// and build
    pub async fn from_sources(
        sources: &[&dyn ConfigSource],
        secrets: Arc<dyn SecretResolver>,
        logger: Arc<dyn Logger>,
    ) -> OrchestratorResult<Self> {
        let mut merged = ProvidersFile::default();
        for source in sources {
            merged = merged.merge(source.load().await?);
            log_info!(logger, "[Bootstrap] loaded providers from {}", source.describe());
        }
        Self::from_file(merged, secrets, logger)
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn service(&self) -> &OrchestrationService {
        &self.service
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryConfigSource;
    use crate::logging::NoOpLogger;
    use crate::secrets::{MemorySecretStore, StoreSecretResolver};
    use crate::types::{ProviderConfig, ProviderId};

    fn secrets() -> Arc<dyn SecretResolver> {
        Arc::new(StoreSecretResolver::new(Arc::new(MemorySecretStore::from_pairs([(
            "k1",
            "secret-abc",
        )]))))
    }

    #[tokio::test]
    async fn test_registers_every_strategy_and_sets_default() {
        let source = MemoryConfigSource::new(
            ProvidersFile::new(vec![ProviderConfig::new(ProviderId::Mock, "k1", "mock-echo")])
                .with_default_provider(ProviderId::Mock),
        );
        let orchestrator = Orchestrator::from_source(&source, secrets(), Arc::new(NoOpLogger))
            .await
            .unwrap();

        let registry = orchestrator.registry();
        assert_eq!(registry.registered_ids(), ProviderId::ALL.to_vec());
        assert_eq!(registry.active_id(), Some(ProviderId::Mock));
        assert!(!registry.is_initialized(ProviderId::Mock));
        assert!(registry.get_active().await.is_ok());
    }

    #[tokio::test]
    async fn test_later_source_wins() {
        let user = MemoryConfigSource::with_providers(vec![ProviderConfig::new(
            ProviderId::Mock,
            "k1",
            "mock-echo",
        )]);
        let workspace = MemoryConfigSource::with_providers(vec![ProviderConfig::new(
            ProviderId::Mock,
            "k2",
            "mock-fixed",
        )]);

        let orchestrator =
            Orchestrator::from_sources(&[&user, &workspace], secrets(), Arc::new(NoOpLogger))
                .await
                .unwrap();
        let config = orchestrator.registry().config(ProviderId::Mock).unwrap();
        assert_eq!(config.secret_ref, "k2");
        assert_eq!(orchestrator.registry().active_id(), None);
    }

    #[tokio::test]
    async fn test_invalid_document_is_config_error() {
        let file = ProvidersFile::new(vec![]).with_default_provider(ProviderId::Gemini);
        let err = Orchestrator::from_file(file, secrets(), Arc::new(NoOpLogger)).unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Config);
    }
}
