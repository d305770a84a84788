//! Pipeline configuration
//!
//! Values come from the environment (a `.env` file is honored) and can be
//! overridden from the command line.

use movieshop_common::{Entity, EtlError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::bronze::DEFAULT_DATA_SOURCE;
use crate::status::MatchKey;
use crate::table::catalog::CATALOG_FILE;

// ============================================================================
// Configuration Constants
// ============================================================================

/// Default location of the raw movie JSON
pub const DEFAULT_RAW_PATH: &str = "./data/raw/movieshop";

/// Default root of the bronze tables
pub const DEFAULT_BRONZE_ROOT: &str = "./data/bronze";

/// Default root of the silver tables and the catalog
pub const DEFAULT_SILVER_ROOT: &str = "./data/silver";

pub const ENV_RAW_PATH: &str = "MOVIESHOP_RAW_PATH";
pub const ENV_BRONZE_ROOT: &str = "MOVIESHOP_BRONZE_ROOT";
pub const ENV_SILVER_ROOT: &str = "MOVIESHOP_SILVER_ROOT";
pub const ENV_DATA_SOURCE: &str = "MOVIESHOP_DATA_SOURCE";
pub const ENV_MATCH_KEY: &str = "MOVIESHOP_MATCH_KEY";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EtlConfig {
    /// File or directory of raw JSON
    pub raw_path: PathBuf,
    pub bronze_root: PathBuf,
    pub silver_root: PathBuf,
    /// Tag stamped into the `data_source` lineage column
    pub data_source: String,
    /// Key used to match silver rows back to bronze rows
    pub match_key: MatchKey,
}

impl Default for EtlConfig {
    fn default() -> Self {
        Self {
            raw_path: PathBuf::from(DEFAULT_RAW_PATH),
            bronze_root: PathBuf::from(DEFAULT_BRONZE_ROOT),
            silver_root: PathBuf::from(DEFAULT_SILVER_ROOT),
            data_source: DEFAULT_DATA_SOURCE.to_string(),
            match_key: MatchKey::default(),
        }
    }
}

impl EtlConfig {
    /// Load configuration from environment and defaults
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let config = Self {
            raw_path: std::env::var(ENV_RAW_PATH)
                .map(PathBuf::from)
                .unwrap_or(defaults.raw_path),
            bronze_root: std::env::var(ENV_BRONZE_ROOT)
                .map(PathBuf::from)
                .unwrap_or(defaults.bronze_root),
            silver_root: std::env::var(ENV_SILVER_ROOT)
                .map(PathBuf::from)
                .unwrap_or(defaults.silver_root),
            data_source: std::env::var(ENV_DATA_SOURCE).unwrap_or(defaults.data_source),
            match_key: match std::env::var(ENV_MATCH_KEY) {
                Ok(value) => value
                    .parse()
                    .map_err(|e| EtlError::config(format!("{}: {}", ENV_MATCH_KEY, e)))?,
                Err(_) => defaults.match_key,
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (name, path) in [
            ("raw path", &self.raw_path),
            ("bronze root", &self.bronze_root),
            ("silver root", &self.silver_root),
        ] {
            if path.as_os_str().is_empty() {
                return Err(EtlError::config(format!("{} must not be empty", name)));
            }
        }

        if self.bronze_root == self.silver_root {
            return Err(EtlError::config("bronze and silver roots must differ"));
        }

        if self.data_source.trim().is_empty() {
            return Err(EtlError::config("data source must not be empty"));
        }

        Ok(())
    }

    pub fn bronze_location(&self, entity: Entity) -> PathBuf {
        self.bronze_root.join(entity.folder_name())
    }

    pub fn silver_location(&self, entity: Entity) -> PathBuf {
        self.silver_root.join(entity.folder_name())
    }

    pub fn catalog_path(&self) -> PathBuf {
        self.silver_root.join(CATALOG_FILE)
    }

    pub fn with_raw_path(mut self, path: impl AsRef<Path>) -> Self {
        self.raw_path = path.as_ref().to_path_buf();
        self
    }

    pub fn with_bronze_root(mut self, path: impl AsRef<Path>) -> Self {
        self.bronze_root = path.as_ref().to_path_buf();
        self
    }

    pub fn with_silver_root(mut self, path: impl AsRef<Path>) -> Self {
        self.silver_root = path.as_ref().to_path_buf();
        self
    }

    pub fn with_data_source(mut self, source: impl Into<String>) -> Self {
        self.data_source = source.into();
        self
    }

    pub fn with_match_key(mut self, key: MatchKey) -> Self {
        self.match_key = key;
        self
    }
}
