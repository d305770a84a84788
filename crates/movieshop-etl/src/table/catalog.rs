//! Table catalog (`_catalog.json`)
//!
//! Maps table names such as `movies_delta` to their locations so tables can be
//! looked up by name.

use chrono::{DateTime, Utc};
use movieshop_common::{EtlError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::info;

use super::write_atomic;

/// File name of the catalog inside the silver root
pub const CATALOG_FILE: &str = "_catalog.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CatalogEntry {
    pub location: PathBuf,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct CatalogFile {
    tables: BTreeMap<String, CatalogEntry>,
}

/// Name-to-location registry persisted as a JSON file
#[derive(Debug, Clone)]
pub struct Catalog {
    path: PathBuf,
}

impl Catalog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<CatalogFile> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => serde_json::from_str(&content).map_err(|e| {
                EtlError::corrupt(self.path.display().to_string(), format!("unreadable catalog: {}", e))
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(CatalogFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, file: &CatalogFile) -> Result<()> {
        let content = serde_json::to_string_pretty(file)?;
        write_atomic(&self.path, content.as_bytes()).await?;
        Ok(())
    }

    /// Register `name` at `location`, replacing any previous registration
    pub async fn register(&self, name: &str, location: &Path) -> Result<CatalogEntry> {
        let mut file = self.load().await?;
        let entry = CatalogEntry {
            location: location.to_path_buf(),
            registered_at: Utc::now(),
        };
        let previous = file.tables.insert(name.to_lowercase(), entry.clone());
        self.save(&file).await?;

        info!(
            table = name,
            location = %location.display(),
            replaced = previous.is_some(),
            "Registered table"
        );
        Ok(entry)
    }

    /// Remove a registration; returns whether the name was registered
    pub async fn drop_table(&self, name: &str) -> Result<bool> {
        let mut file = self.load().await?;
        let removed = file.tables.remove(&name.to_lowercase()).is_some();
        if removed {
            self.save(&file).await?;
            info!(table = name, "Dropped table registration");
        }
        Ok(removed)
    }

    pub async fn resolve(&self, name: &str) -> Result<CatalogEntry> {
        self.load()
            .await?
            .tables
            .remove(&name.to_lowercase())
            .ok_or_else(|| EtlError::TableNotFound(name.to_string()))
    }

    /// All registrations, sorted by name
    pub async fn tables(&self) -> Result<Vec<(String, CatalogEntry)>> {
        Ok(self.load().await?.tables.into_iter().collect())
    }
}
