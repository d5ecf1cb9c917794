use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

use arbiter_core::{ArbiterError, Result};

use crate::schema::{ArbiterConfig, StoreBackend};

/// Loads and reloads the Arbiter configuration.
pub struct ConfigLoader {
    config: Arc<RwLock<ArbiterConfig>>,
    config_path: PathBuf,
}

impl ConfigLoader {
    /// Resolve the config path: explicit path > ARBITER_CONFIG env > ~/.arbiter/arbiter.toml
    pub fn resolve_path(explicit: Option<&Path>) -> PathBuf {
        if let Some(p) = explicit {
            return p.to_path_buf();
        }
        if let Ok(p) = std::env::var("ARBITER_CONFIG") {
            return PathBuf::from(p);
        }
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".arbiter")
            .join("arbiter.toml")
    }

    /// Load the config from disk, falling back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = Self::resolve_path(path);
        let config = if config_path.exists() {
            info!(?config_path, "loading configuration");
            Self::read(&config_path)?
        } else {
            warn!(?config_path, "config file not found, using defaults");
            ArbiterConfig::default()
        };

        let config = Self::apply_env_overrides(config);

        // Validate config: log warnings, fail on errors
        match config.validate() {
            Ok(warnings) => {
                for w in &warnings {
                    warn!("{}", w);
                }
            }
            Err(e) => {
                return Err(ArbiterError::Config(e));
            }
        }

        Ok(Self {
            config: Arc::new(RwLock::new(config)),
            config_path,
        })
    }

    /// Get a snapshot of the current config.
    pub fn get(&self) -> ArbiterConfig {
        self.config.read().clone()
    }

    /// Path the config was (or would have been) read from.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Database path with relative paths resolved against the config directory.
    pub fn db_path(&self) -> PathBuf {
        let db_path = self.config.read().store.db_path.clone();
        if db_path.is_absolute() {
            return db_path;
        }
        self.config_path
            .parent()
            .map(|dir| dir.join(&db_path))
            .unwrap_or(db_path)
    }

    fn read(path: &Path) -> Result<ArbiterConfig> {
        let raw = std::fs::read_to_string(path)?;
        toml::from_str::<ArbiterConfig>(&raw).map_err(|e| {
            ArbiterError::Config(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// Apply env var overrides (ARBITER_DB_PATH, ARBITER_LOG_LEVEL, etc.)
    fn apply_env_overrides(mut config: ArbiterConfig) -> ArbiterConfig {
        if let Ok(v) = std::env::var("ARBITER_DB_PATH") {
            config.store.db_path = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("ARBITER_STORE_BACKEND") {
            match v.as_str() {
                "sqlite" => config.store.backend = StoreBackend::Sqlite,
                "memory" => config.store.backend = StoreBackend::Memory,
                other => warn!(backend = other, "ignoring unknown ARBITER_STORE_BACKEND"),
            }
        }
        if let Ok(v) = std::env::var("ARBITER_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Ok(v) = std::env::var("ARBITER_LOG_FORMAT") {
            config.logging.format = v;
        }
        if let Ok(v) = std::env::var("ARBITER_RESUME_OPERATORS") {
            config.engine.resume_operators = v
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }
        config
    }

    /// Reload the config from disk.
    pub fn reload(&self) -> Result<()> {
        if !self.config_path.exists() {
            return Err(ArbiterError::Config(format!(
                "config file not found: {}",
                self.config_path.display()
            )));
        }
        let new_config = Self::apply_env_overrides(Self::read(&self.config_path)?);
        new_config.validate().map_err(ArbiterError::Config)?;
        *self.config.write() = new_config;
        info!("configuration reloaded");
        Ok(())
    }
}
