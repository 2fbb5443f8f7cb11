//! The providers document shared by every configuration source

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::types::{ProviderConfig, ProviderId};
use super::traits::{ConfigError, ConfigResult};

/// Top-level structure of a providers file
///
/// ```yaml
/// providers:
///   - id: gemini
///     secret_ref: gemini_api_key
///     default_model: gemini-2.0-flash
/// defaults:
///   provider: gemini
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProvidersFile {
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defaults: Option<DefaultSettings>,
}

/// Default settings for the config
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultSettings {
    /// Provider activated at startup
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<ProviderId>,
}

impl ProvidersFile {
    pub fn new(providers: Vec<ProviderConfig>) -> Self {
        Self {
            providers,
            defaults: None,
        }
    }

    /// Set the provider activated at startup
    pub fn with_default_provider(mut self, id: ProviderId) -> Self {
        self.defaults = Some(DefaultSettings { provider: Some(id) });
        self
    }

    pub fn default_provider(&self) -> Option<ProviderId> {
        self.defaults.as_ref().and_then(|d| d.provider)
    }

    pub fn provider(&self, id: ProviderId) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.id == id)
    }

    /// Insert or replace the entry for `config.id`
    pub fn upsert(&mut self, config: ProviderConfig) {
        match self.providers.iter_mut().find(|p| p.id == config.id) {
            Some(existing) => *existing = config,
            None => self.providers.push(config),
        }
    }

    /// Remove the entry for `id`
    pub fn remove(&mut self, id: ProviderId) -> ConfigResult<ProviderConfig> {
        let pos = self
            .providers
            .iter()
            .position(|p| p.id == id)
            .ok_or(ConfigError::ProviderNotFound(id))?;
        Ok(self.providers.remove(pos))
    }

    /// Layer `other` on top of `self`: its providers replace same-id entries
    /// and its defaults win when present
    pub fn merge(mut self, other: ProvidersFile) -> Self {
        let has_default = other.default_provider().is_some();
        for config in other.providers {
            self.upsert(config);
        }
        if has_default {
            self.defaults = other.defaults;
        }
        self
    }

    /// Check every provider entry and the cross-entry constraints
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for config in &self.providers {
            if !seen.insert(config.id) {
                return Err(ConfigError::Invalid(format!(
                    "provider '{}' is configured more than once",
                    config.id
                )));
            }
            config.validate().map_err(ConfigError::Invalid)?;
        }

        if let Some(id) = self.default_provider() {
            if !seen.contains(&id) {
                return Err(ConfigError::Invalid(format!(
                    "default provider '{}' has no configuration",
                    id
                )));
            }
        }
        Ok(())
    }
}
