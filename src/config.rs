use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::memory::{
    DUPLICATE_SCAN_LIMIT, DUPLICATE_THRESHOLD, EMBEDDING_CACHE_SIZE, LINK_BATCH_SIZE,
    LINK_SIMILARITY_THRESHOLD, MAX_LINKS_PER_MEMORY, PREFILTER_CAP, RELATED_LIMIT,
};

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RecollectConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub embedding: EmbeddingConfig,
    pub linking: LinkingConfig,
    pub retrieval: RetrievalConfig,
    pub maintenance: MaintenanceConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub log_level: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub provider: String,
    pub dimensions: usize,
    pub cache_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LinkingConfig {
    pub similarity_threshold: f32,
    pub max_links_per_memory: u32,
    pub batch_size: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct RetrievalConfig {
    pub default_top_k: usize,
    pub prefilter_multiplier: usize,
    pub prefilter_cap: usize,
    pub semantic_weight: f64,
    pub keyword_weight: f64,
    pub importance_divisor: f64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct MaintenanceConfig {
    pub duplicate_threshold: f32,
    pub duplicate_scan_limit: usize,
    pub related_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            log_level: "info".into(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_recollect_dir()
            .join("memory.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "hash".into(),
            dimensions: crate::embedding::DEFAULT_DIMENSIONS,
            cache_size: EMBEDDING_CACHE_SIZE,
        }
    }
}

impl Default for LinkingConfig {
    fn default() -> Self {
        Self {
            similarity_threshold: LINK_SIMILARITY_THRESHOLD,
            max_links_per_memory: MAX_LINKS_PER_MEMORY,
            batch_size: LINK_BATCH_SIZE,
        }
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            default_top_k: 10,
            prefilter_multiplier: 10,
            prefilter_cap: PREFILTER_CAP,
            semantic_weight: 0.7,
            keyword_weight: 0.3,
            importance_divisor: 20.0,
        }
    }
}

impl Default for MaintenanceConfig {
    fn default() -> Self {
        Self {
            duplicate_threshold: DUPLICATE_THRESHOLD,
            duplicate_scan_limit: DUPLICATE_SCAN_LIMIT,
            related_limit: RELATED_LIMIT,
        }
    }
}

/// Returns `~/.recollect/`, or `./.recollect/` when no home directory is known.
pub fn default_recollect_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".recollect")
}

/// Returns the default config file path: `~/.recollect/config.toml`
pub fn default_config_path() -> PathBuf {
    default_recollect_dir().join("config.toml")
}

impl RecollectConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            RecollectConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (RECOLLECT_DB, RECOLLECT_LOG_LEVEL, RECOLLECT_EMBEDDING_DIMENSIONS).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("RECOLLECT_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("RECOLLECT_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("RECOLLECT_EMBEDDING_DIMENSIONS") {
            match val.parse() {
                Ok(dims) => self.embedding.dimensions = dims,
                Err(_) => tracing::warn!(value = %val, "ignoring invalid RECOLLECT_EMBEDDING_DIMENSIONS"),
            }
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}
