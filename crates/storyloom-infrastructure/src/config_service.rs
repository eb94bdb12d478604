//! Configuration service implementation.
//!
//! Loads the root configuration from `~/.config/storyloom/config.toml`,
//! writing a default file on first run.

use crate::paths::StoryloomPaths;
use anyhow::{Context, anyhow};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use storyloom_core::config::StoryloomConfig;
use storyloom_core::error::{Result, StoryError};

/// Configuration service that loads and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: Option<PathBuf>,
    /// Cached configuration, filled lazily on first access.
    config: Arc<RwLock<Option<StoryloomConfig>>>,
}

impl ConfigService {
    /// Creates a service reading the platform config file.
    pub fn new() -> Self {
        Self {
            path: StoryloomPaths::config_file().ok(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            config: Arc::new(RwLock::new(None)),
        }
    }

    /// Gets the configuration, loading from file if not cached.
    ///
    /// An unreadable or invalid file yields the defaults.
    pub fn get_config(&self) -> StoryloomConfig {
        {
            let read_lock = self.config.read().unwrap_or_else(|p| p.into_inner());
            if let Some(ref cached) = *read_lock {
                return cached.clone();
            }
        }

        let loaded = match self.load_config() {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(
                    error = %format!("{e:#}"),
                    "[ConfigService] Falling back to default configuration"
                );
                StoryloomConfig::default()
            }
        };

        {
            let mut write_lock = self.config.write().unwrap_or_else(|p| p.into_inner());
            *write_lock = Some(loaded.clone());
        }

        loaded
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        let mut write_lock = self.config.write().unwrap_or_else(|p| p.into_inner());
        *write_lock = None;
    }

    /// Resolves the Gemini API key from the configured environment variable.
    pub fn api_key(&self) -> Result<String> {
        let var = self.get_config().gemini.api_key_env;
        match std::env::var(&var) {
            Ok(key) if !key.trim().is_empty() => Ok(key),
            _ => Err(StoryError::config(format!(
                "environment variable {var} is not set"
            ))),
        }
    }

    fn load_config(&self) -> anyhow::Result<StoryloomConfig> {
        let path = self
            .path
            .as_deref()
            .ok_or_else(|| anyhow!("Cannot find config directory"))?;

        if !path.exists() {
            let default_config = StoryloomConfig::default();
            Self::write_default(path, &default_config)?;
            tracing::info!(path = %path.display(), "[ConfigService] Created default configuration");
            return Ok(default_config);
        }

        let source = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        StoryloomConfig::from_toml_str(&source)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn write_default(path: &Path, config: &StoryloomConfig) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let contents = config.to_toml_string()?;
        std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

impl Default for ConfigService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_created_with_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested").join("config.toml");
        let service = ConfigService::with_path(&path);

        assert_eq!(service.get_config(), StoryloomConfig::default());
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(
            StoryloomConfig::from_toml_str(&written).unwrap(),
            StoryloomConfig::default()
        );
    }

    #[test]
    fn test_cache_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session]\nautosave_delay_ms = 250\n").unwrap();
        let service = ConfigService::with_path(&path);

        assert_eq!(service.get_config().session.autosave_delay_ms, 250);

        std::fs::write(&path, "[session]\nautosave_delay_ms = 900\n").unwrap();
        assert_eq!(service.get_config().session.autosave_delay_ms, 250);

        service.invalidate_cache();
        assert_eq!(service.get_config().session.autosave_delay_ms, 900);
    }

    #[test]
    fn test_invalid_file_falls_back_to_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(&path, "[session\nbroken").unwrap();

        let service = ConfigService::with_path(&path);
        assert_eq!(service.get_config(), StoryloomConfig::default());
    }

    #[test]
    fn test_api_key_reads_configured_variable() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        std::fs::write(
            &path,
            "[gemini]\napi_key_env = \"STORYLOOM_TEST_KEY_UNSET_7F3A\"\n",
        )
        .unwrap();

        let service = ConfigService::with_path(&path);
        let err = service.api_key().unwrap_err();
        assert!(err.to_string().contains("STORYLOOM_TEST_KEY_UNSET_7F3A"));
    }
}
