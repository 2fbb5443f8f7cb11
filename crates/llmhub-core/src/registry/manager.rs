//! `ProviderRegistry`: registered strategies, their configs, the initialized
//! cache and the active selection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use parking_lot::{Mutex, RwLock};

use crate::error::{OrchestratorError, OrchestratorResult};
use crate::logging::Logger;
use crate::providers::ProviderStrategy;
use crate::secrets::SecretResolver;
use crate::types::{ModelInfo, ProviderConfig, ProviderId};
use crate::{log_debug, log_info, log_warn};

/// An initialization in progress, awaited by every concurrent caller
type InitFuture = Shared<BoxFuture<'static, OrchestratorResult<Arc<dyn ProviderStrategy>>>>;

/// In-flight entry; the generation tells a finishing attempt whether it is
/// still the current one for its id
struct Pending {
    generation: u64,
    init: InitFuture,
}

/// Registry of provider strategies with lazy, single-flight initialization.
///
/// Reads take short `parking_lot` locks that are never held across an await.
/// The first `get` for an id starts one initialization future; callers that
/// arrive while it runs await the same future and see the same outcome. A
/// success is cached for the life of the registry (or until [`evict`]); a
/// failure is not cached, so the next `get` starts over. Re-registering or
/// evicting an id while its initialization runs detaches that attempt: its
/// callers still see its outcome, but it is never cached.
///
/// [`evict`]: ProviderRegistry::evict
#[derive(Clone)]
pub struct ProviderRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    strategies: RwLock<HashMap<ProviderId, Arc<dyn ProviderStrategy>>>,
    configs: RwLock<HashMap<ProviderId, Arc<ProviderConfig>>>,
    initialized: RwLock<HashMap<ProviderId, Arc<dyn ProviderStrategy>>>,
    in_flight: Mutex<HashMap<ProviderId, Pending>>,
    generation: AtomicU64,
    active: RwLock<Option<ProviderId>>,
    secrets: Arc<dyn SecretResolver>,
    logger: Arc<dyn Logger>,
}

impl ProviderRegistry {
    /// Create an empty registry
    pub fn new(secrets: Arc<dyn SecretResolver>, logger: Arc<dyn Logger>) -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                strategies: RwLock::new(HashMap::new()),
                configs: RwLock::new(HashMap::new()),
                initialized: RwLock::new(HashMap::new()),
                in_flight: Mutex::new(HashMap::new()),
                generation: AtomicU64::new(0),
                active: RwLock::new(None),
                secrets,
                logger,
            }),
        }
    }

    /// Register a strategy under its own id
    ///
    /// Replacing an existing registration logs a warning and drops any
    /// initialized or initializing instance of the old strategy.
    pub fn register(&self, strategy: Arc<dyn ProviderStrategy>) {
        let id = strategy.id();
        let replaced = {
            let mut in_flight = self.inner.in_flight.lock();
            let previous = self.inner.strategies.write().insert(id, strategy);
            if previous.is_some() {
                in_flight.remove(&id);
                self.inner.initialized.write().remove(&id);
            }
            previous.is_some()
        };
        if replaced {
            log_warn!(
                self.inner.logger,
                "ProviderRegistry: provider '{}' re-registered, replacing the previous strategy",
                id
            );
        } else {
            log_debug!(self.inner.logger, "ProviderRegistry: registered '{}'", id);
        }
    }

    /// Insert or overwrite configurations; initialized strategies keep the
    /// configuration they were built with
    pub fn load_configs(&self, configs: impl IntoIterator<Item = ProviderConfig>) {
        let mut map = self.inner.configs.write();
        for config in configs {
            map.insert(config.id, Arc::new(config));
        }
        log_info!(self.inner.logger, "ProviderRegistry: {} provider configs loaded", map.len());
    }

    /// Select the provider used by [`get_active`](Self::get_active)
    ///
    /// No initialization happens here. On failure the previous selection is
    /// kept.
    pub fn set_active(&self, id: ProviderId) -> OrchestratorResult<()> {
        self.ensure_available(id)?;
        *self.inner.active.write() = Some(id);
        log_info!(self.inner.logger, "ProviderRegistry: active provider is now '{}'", id);
        Ok(())
    }

    /// Resolve the active provider, initializing it on first use
    pub async fn get_active(&self) -> OrchestratorResult<Arc<dyn ProviderStrategy>> {
        let id = self.active_id().ok_or(OrchestratorError::NoActiveProvider)?;
        self.get(id).await
    }

    /// Resolve a provider, initializing it on first use
    ///
    /// Registration is checked before configuration, so an unknown id is
    /// always `NotRegistered`.
    pub async fn get(&self, id: ProviderId) -> OrchestratorResult<Arc<dyn ProviderStrategy>> {
        if let Some(strategy) = self.cached(id) {
            return Ok(strategy);
        }

        let init = {
            let mut in_flight = self.inner.in_flight.lock();
            if let Some(strategy) = self.cached(id) {
                return Ok(strategy);
            }
            match in_flight.get(&id) {
                Some(pending) => {
                    log_debug!(self.inner.logger, "ProviderRegistry: joining initialization of '{}'", id);
                    pending.init.clone()
                }
                None => {
                    let (strategy, config) = self.ensure_available(id)?;
                    let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
                    let init = initialize(
                        Arc::downgrade(&self.inner),
                        Arc::clone(&self.inner.secrets),
                        Arc::clone(&self.inner.logger),
                        generation,
                        strategy,
                        config,
                    )
                    .boxed()
                    .shared();
                    in_flight.insert(
                        id,
                        Pending {
                            generation,
                            init: init.clone(),
                        },
                    );
                    init
                }
            }
        };

        init.await
    }

    /// Drop the initialized instance so the next `get` resolves the secret
    /// and initializes again
    ///
    /// An initialization still running for `id` is detached and will not be
    /// cached. Returns whether there was anything to drop.
    pub fn evict(&self, id: ProviderId) -> bool {
        let mut in_flight = self.inner.in_flight.lock();
        let detached = in_flight.remove(&id).is_some();
        let evicted = self.inner.initialized.write().remove(&id).is_some() || detached;
        drop(in_flight);
        if evicted {
            log_info!(self.inner.logger, "ProviderRegistry: evicted '{}'", id);
        }
        evicted
    }

    /// Configuration for `id`
    pub fn config(&self, id: ProviderId) -> Option<Arc<ProviderConfig>> {
        self.inner.configs.read().get(&id).cloned()
    }

    pub fn active_id(&self) -> Option<ProviderId> {
        *self.inner.active.read()
    }

    pub fn is_registered(&self, id: ProviderId) -> bool {
        self.inner.strategies.read().contains_key(&id)
    }

    pub fn is_configured(&self, id: ProviderId) -> bool {
        self.inner.configs.read().contains_key(&id)
    }

    pub fn is_initialized(&self, id: ProviderId) -> bool {
        self.inner.initialized.read().contains_key(&id)
    }

    /// Registered ids in `ProviderId` order
    pub fn registered_ids(&self) -> Vec<ProviderId> {
        let mut ids: Vec<ProviderId> = self.inner.strategies.read().keys().copied().collect();
        ids.sort();
        ids
    }

    /// Models for `id`: the configured list, or the strategy's own list when
    /// the configuration names none
    pub fn list_models(&self, id: ProviderId) -> OrchestratorResult<Vec<ModelInfo>> {
        let strategy = self
            .inner
            .strategies
            .read()
            .get(&id)
            .cloned()
            .ok_or(OrchestratorError::NotRegistered(id))?;

        match self.config(id) {
            Some(config) if !config.models.is_empty() => Ok(config.models.clone()),
            _ => Ok(strategy.list_models()),
        }
    }

    /// Metadata for one model of `id`, searching the configuration first
    pub fn model_info(&self, id: ProviderId, model: &str) -> Option<ModelInfo> {
        self.list_models(id)
            .ok()?
            .into_iter()
            .find(|m| m.id == model)
    }

    fn cached(&self, id: ProviderId) -> Option<Arc<dyn ProviderStrategy>> {
        self.inner.initialized.read().get(&id).cloned()
    }

    fn ensure_available(
        &self,
        id: ProviderId,
    ) -> OrchestratorResult<(Arc<dyn ProviderStrategy>, Arc<ProviderConfig>)> {
        let strategy = self
            .inner
            .strategies
            .read()
            .get(&id)
            .cloned()
            .ok_or(OrchestratorError::NotRegistered(id))?;
        let config = self.config(id).ok_or(OrchestratorError::NotConfigured(id))?;
        Ok((strategy, config))
    }
}

impl RegistryInner {
    /// Finish the attempt numbered `generation`: leave the in-flight table and
    /// cache `initialized`, unless a re-registration or eviction replaced the
    /// attempt meanwhile
    fn commit(&self, id: ProviderId, generation: u64, initialized: Option<&Arc<dyn ProviderStrategy>>) {
        let mut in_flight = self.in_flight.lock();
        if in_flight.get(&id).map(|p| p.generation) != Some(generation) {
            log_debug!(
                self.logger,
                "ProviderRegistry: '{}' was replaced or evicted while initializing, result not cached",
                id
            );
            return;
        }
        in_flight.remove(&id);
        if let Some(strategy) = initialized {
            self.initialized.write().insert(id, Arc::clone(strategy));
            log_info!(self.logger, "ProviderRegistry: '{}' initialized", id);
        }
    }
}

/// Resolve the secret, initialize, then commit through `registry` if it is
/// still alive
///
/// The future is stored in the registry's own in-flight table, so it holds the
/// registry weakly.
async fn initialize(
    registry: Weak<RegistryInner>,
    secrets: Arc<dyn SecretResolver>,
    logger: Arc<dyn Logger>,
    generation: u64,
    strategy: Arc<dyn ProviderStrategy>,
    config: Arc<ProviderConfig>,
) -> OrchestratorResult<Arc<dyn ProviderStrategy>> {
    let id = config.id;
    log_info!(logger, "ProviderRegistry: initializing '{}'", id);

    let result = resolve_and_initialize(secrets.as_ref(), &strategy, &config).await;
    if let Err(e) = &result {
        log_warn!(logger, "ProviderRegistry: initializing '{}' failed: {}", id, e);
    }
    if let Some(inner) = registry.upgrade() {
        inner.commit(id, generation, result.as_ref().ok().map(|_| &strategy));
    }

    result.map(|()| strategy)
}

async fn resolve_and_initialize(
    secrets: &dyn SecretResolver,
    strategy: &Arc<dyn ProviderStrategy>,
    config: &ProviderConfig,
) -> OrchestratorResult<()> {
    let id = config.id;
    let credential = match secrets.resolve(&config.secret_ref).await {
        Ok(Some(credential)) => credential,
        Ok(None) => {
            return Err(OrchestratorError::SecretNotFound {
                provider: id,
                secret_ref: config.secret_ref.clone(),
            })
        }
        Err(e) => {
            return Err(OrchestratorError::SecretUnavailable {
                provider: id,
                source: Arc::new(e),
            })
        }
    };

    strategy
        .initialize(config, &credential)
        .await
        .map_err(|e| OrchestratorError::InitializationFailed {
            provider: id,
            source: Arc::new(e),
        })
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let initialized: Vec<ProviderId> = self.inner.initialized.read().keys().copied().collect();
        f.debug_struct("ProviderRegistry")
            .field("registered", &self.registered_ids())
            .field("initialized", &initialized)
            .field("active", &self.active_id())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::logging::{LogLevel, MemoryLogger, NoOpLogger};
    use crate::providers::MockProvider;
    use crate::secrets::{MemorySecretStore, StoreSecretResolver};

    fn resolver() -> Arc<dyn SecretResolver> {
        Arc::new(StoreSecretResolver::new(Arc::new(MemorySecretStore::from_pairs([(
            "k1",
            "secret-abc",
        )]))))
    }

    fn mock_config() -> ProviderConfig {
        ProviderConfig::new(ProviderId::Mock, "k1", "mock-echo")
    }

    fn registry() -> ProviderRegistry {
        ProviderRegistry::new(resolver(), Arc::new(NoOpLogger))
    }

    #[tokio::test]
    async fn test_unregistered_is_not_registered() {
        let registry = registry();
        registry.load_configs([mock_config()]);
        let err = registry.get(ProviderId::Mock).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotRegistered);
    }

    #[tokio::test]
    async fn test_registered_without_config() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::echo(Arc::new(NoOpLogger))));
        let err = registry.get(ProviderId::Mock).await.err().unwrap();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
    }

    #[tokio::test]
    async fn test_get_initializes_once_and_caches() {
        let registry = registry();
        let mock = Arc::new(MockProvider::echo(Arc::new(NoOpLogger)));
        registry.register(mock.clone());
        registry.load_configs([mock_config()]);

        let first = registry.get(ProviderId::Mock).await.unwrap();
        let second = registry.get(ProviderId::Mock).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(mock.initialize_count(), 1);
        assert_eq!(mock.credentials(), vec!["secret-abc".to_string()]);
        assert!(registry.is_initialized(ProviderId::Mock));
    }

    #[tokio::test]
    async fn test_missing_secret() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::echo(Arc::new(NoOpLogger))));
        registry.load_configs([ProviderConfig::new(ProviderId::Mock, "absent", "mock-echo")]);

        let err = registry.get(ProviderId::Mock).await.err().unwrap();
        assert!(matches!(
            err,
            OrchestratorError::SecretNotFound { ref secret_ref, .. } if secret_ref == "absent"
        ));
        assert!(!registry.is_initialized(ProviderId::Mock));
    }

    #[tokio::test]
    async fn test_evict_forces_reinitialization() {
        let registry = registry();
        let mock = Arc::new(MockProvider::echo(Arc::new(NoOpLogger)));
        registry.register(mock.clone());
        registry.load_configs([mock_config()]);

        registry.get(ProviderId::Mock).await.unwrap();
        assert!(registry.evict(ProviderId::Mock));
        assert!(!registry.evict(ProviderId::Mock));
        registry.get(ProviderId::Mock).await.unwrap();
        assert_eq!(mock.initialize_count(), 2);
    }

    #[tokio::test]
    async fn test_active_selection() {
        let registry = registry();
        assert_eq!(
            registry.get_active().await.err().unwrap().kind(),
            ErrorKind::NoActiveProvider
        );

        registry.register(Arc::new(MockProvider::echo(Arc::new(NoOpLogger))));
        let err = registry.set_active(ProviderId::Mock).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConfigured);
        assert!(err.is_configuration_error());
        assert_eq!(registry.active_id(), None);

        registry.load_configs([mock_config()]);
        registry.set_active(ProviderId::Mock).unwrap();
        assert!(!registry.is_initialized(ProviderId::Mock));
        assert_eq!(registry.get_active().await.unwrap().id(), ProviderId::Mock);
    }

    #[test]
    fn test_reregister_warns() {
        let logger = Arc::new(MemoryLogger::new());
        let registry = ProviderRegistry::new(resolver(), logger.clone());
        registry.register(Arc::new(MockProvider::echo(Arc::new(NoOpLogger))));
        registry.register(Arc::new(MockProvider::fixed("x", Arc::new(NoOpLogger))));

        assert!(logger.contains(LogLevel::Warn, "re-registered"));
        assert_eq!(registry.registered_ids(), vec![ProviderId::Mock]);
    }

    #[test]
    fn test_list_models_falls_back_to_strategy() {
        let registry = registry();
        registry.register(Arc::new(MockProvider::echo(Arc::new(NoOpLogger))));
        assert_eq!(registry.list_models(ProviderId::Mock).unwrap().len(), 2);

        registry.load_configs([mock_config().with_models(vec![ModelInfo::new("mock-echo", 4096)])]);
        let models = registry.list_models(ProviderId::Mock).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].context_window, 4096);
        assert!(registry.model_info(ProviderId::Mock, "mock-fixed").is_none());

        assert_eq!(
            registry.list_models(ProviderId::Gemini).unwrap_err().kind(),
            ErrorKind::NotRegistered
        );
    }
}
