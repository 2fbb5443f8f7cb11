//! File-based configuration source (YAML)
//!
//! Supports user-level (~/.config/llmhub/providers.yaml) and workspace-level
//! (.config/llmhub/providers.yaml) files.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::types::{ProviderConfig, ProviderId};
use super::document::ProvidersFile;
use super::traits::{ConfigError, ConfigResult, ConfigSource};

/// Config level (user or workspace)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigLevel {
    /// User-level config (~/.config/llmhub/providers.yaml)
    User,
    /// Workspace-level config (.config/llmhub/providers.yaml in workspace root)
    Workspace,
}

impl ConfigLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigLevel::User => "user",
            ConfigLevel::Workspace => "workspace",
        }
    }
}

/// File-based configuration source
///
/// A missing file reads as an empty configuration. The parsed document is
/// cached until [`reload`](Self::reload) or a write.
///
/// ```no_run
/// use llmhub_core::config::FileConfigSource;
///
/// let user = FileConfigSource::user();
/// let workspace = FileConfigSource::workspace("/path/to/workspace");
/// ```
pub struct FileConfigSource {
    path: PathBuf,
    level: ConfigLevel,
    cache: RwLock<Option<ProvidersFile>>,
}

impl FileConfigSource {
    /// Create a new file config source for a specific path
    pub fn new(path: impl Into<PathBuf>, level: ConfigLevel) -> Self {
        Self {
            path: path.into(),
            level,
            cache: RwLock::new(None),
        }
    }

    /// Create a user-level config source (~/.config/llmhub/providers.yaml)
    pub fn user() -> Self {
        // XDG config directory (~/.config on Linux, ~/Library/Application Support on macOS)
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        let path = config_dir.join("llmhub").join("providers.yaml");
        Self::new(path, ConfigLevel::User)
    }

    /// Create a workspace-level config source (.config/llmhub/providers.yaml)
    pub fn workspace(workspace_root: impl AsRef<Path>) -> Self {
        let path = workspace_root
            .as_ref()
            .join(".config")
            .join("llmhub")
            .join("providers.yaml");
        Self::new(path, ConfigLevel::Workspace)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn level(&self) -> ConfigLevel {
        self.level
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read(&self) -> ConfigResult<ProvidersFile> {
        if !self.path.exists() {
            return Ok(ProvidersFile::default());
        }

        let content = fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(ProvidersFile::default());
        }
        serde_yaml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: self.path.display().to_string(),
            message: e.to_string(),
        })
    }

    fn write(&self, file: &ProvidersFile) -> ConfigResult<()> {
        file.validate()?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(file)
            .map_err(|e| ConfigError::Other(format!("Failed to serialize YAML: {}", e)))?;
        fs::write(&self.path, content)?;

        *self.cache.write() = Some(file.clone());
        Ok(())
    }

    /// Cached document, reading the file on first use
    fn current(&self) -> ConfigResult<ProvidersFile> {
        if let Some(file) = self.cache.read().as_ref() {
            return Ok(file.clone());
        }

        let file = self.read()?;
        *self.cache.write() = Some(file.clone());
        Ok(file)
    }

    /// Reload config from disk (invalidate cache)
    pub fn reload(&self) -> ConfigResult<ProvidersFile> {
        let file = self.read()?;
        *self.cache.write() = Some(file.clone());
        Ok(file)
    }

    /// Insert or replace a provider entry and persist
    pub fn upsert_provider(&self, config: ProviderConfig) -> ConfigResult<()> {
        let mut file = self.current()?;
        file.upsert(config);
        self.write(&file)
    }

    /// Remove a provider entry and persist
    pub fn remove_provider(&self, id: ProviderId) -> ConfigResult<()> {
        let mut file = self.current()?;
        file.remove(id)?;
        if file.default_provider() == Some(id) {
            file.defaults = None;
        }
        self.write(&file)
    }

    /// Set the provider activated at startup and persist
    pub fn set_default_provider(&self, id: ProviderId) -> ConfigResult<()> {
        let file = self.current()?.with_default_provider(id);
        self.write(&file)
    }

    /// Create a backup of the current config file
    pub fn backup(&self) -> ConfigResult<Option<PathBuf>> {
        if !self.exists() {
            return Ok(None);
        }

        let backup_path = self.path.with_extension("yaml.backup");
        fs::copy(&self.path, &backup_path)?;
        Ok(Some(backup_path))
    }
}

impl std::fmt::Debug for FileConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigSource")
            .field("path", &self.path)
            .field("level", &self.level)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigSource for FileConfigSource {
    async fn load(&self) -> ConfigResult<ProvidersFile> {
        let file = self.current()?;
        file.validate()?;
        Ok(file)
    }

    fn describe(&self) -> String {
        format!("{} ({})", self.path.display(), self.level.as_str())
    }
}
