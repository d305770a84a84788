//! Medallion pipeline orchestration
//!
//! Per entity, a run:
//! 1. optionally removes the entity's bronze and silver tables
//! 2. reads raw JSON, stamps lineage and appends it to bronze
//! 3. transforms bronze rows with status `new` into silver records
//! 4. splits them into clean and quarantine partitions
//! 5. keeps one clean record per movie id, appends them to silver and drops
//!    duplicate silver rows
//! 6. marks bronze rows `quarantine` or `loaded`
//!
//! Every bronze row a pass reads leaves its source status. A row backing a
//! quarantined record is quarantined. All others are loaded, including rows
//! whose record was dropped as a duplicate and rows that yielded no record.
//!
//! Stages run one after another; the first failure aborts the run.

use movieshop_common::{Entity, RecordStatus, Result, WriteMode};
use std::collections::HashSet;
use std::path::Path;
use tracing::{info, instrument, warn};

use crate::bronze::{transform_raw, with_status, BronzeRecord, Lineage, PAYLOAD_COLUMN};
use crate::config::EtlConfig;
use crate::quarantine::split;
use crate::raw::RawReader;
use crate::silver::{
    dedup_rows, unique_movie_ids, Genres, Movies, OriginalLanguages, Processing, SilverEntity, SilverRecord,
};
use crate::status::StatusUpdater;
use crate::table::{read_table, Catalog, TableStore};
use crate::writer::BatchWriter;

/// Outcome of one entity run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityReport {
    pub entity: Entity,
    /// Raw records appended to bronze
    pub ingested: usize,
    /// Silver records produced from `new` bronze rows
    pub processed: usize,
    pub clean: usize,
    pub quarantined: usize,
    /// Rows in the silver table after the run
    pub silver_rows: usize,
}

/// Outcome of a quarantine repair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairReport {
    pub entity: Entity,
    pub reprocessed: usize,
    pub repaired: usize,
    pub still_quarantined: usize,
}

pub struct Pipeline<'a> {
    config: EtlConfig,
    store: &'a dyn TableStore,
    catalog: Catalog,
    reader: RawReader,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: EtlConfig, store: &'a dyn TableStore) -> Self {
        let catalog = Catalog::new(config.catalog_path());
        Self {
            config,
            store,
            catalog,
            reader: RawReader::new(),
        }
    }

    pub fn with_reader(mut self, reader: RawReader) -> Self {
        self.reader = reader;
        self
    }

    pub fn config(&self) -> &EtlConfig {
        &self.config
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// Delete the entity's bronze and silver tables and their registrations
    #[instrument(skip(self))]
    pub async fn reset(&self, entity: Entity) -> Result<()> {
        self.store.remove(&self.config.bronze_location(entity)).await?;
        self.store.remove(&self.config.silver_location(entity)).await?;
        self.catalog.drop_table(&entity.bronze_table()).await?;
        self.catalog.drop_table(&entity.silver_table()).await?;
        info!("Reset bronze and silver tables");
        Ok(())
    }

    /// Append the raw input to the entity's bronze table
    #[instrument(skip(self))]
    pub async fn ingest_bronze(&self, entity: Entity) -> Result<usize> {
        let raw = self.reader.read(&self.config.raw_path).await?;
        let bronze = transform_raw(raw, &Lineage::now(&self.config.data_source));

        let location = self.config.bronze_location(entity);
        BatchWriter::new().save(self.store, &location, &bronze).await?;
        self.catalog.register(&entity.bronze_table(), &location).await?;

        info!(rows = bronze.len(), "Ingested raw records into bronze");
        Ok(bronze.len())
    }

    /// Run the whole pipeline for the entity `E`
    #[instrument(skip(self), fields(entity = %E::ENTITY))]
    pub async fn run<E: SilverEntity>(&self, reset: bool) -> Result<EntityReport> {
        let entity = E::ENTITY;
        if reset {
            self.reset(entity).await?;
        }

        let ingested = self.ingest_bronze(entity).await?;

        let bronze_location = self.config.bronze_location(entity);
        let bronze: Vec<BronzeRecord> = read_table(self.store, &bronze_location).await?;
        let fresh = with_status(bronze, Processing::Standard.source_status());

        let silver = E::transform(&fresh, Processing::Standard);
        let processed = silver.len();
        let parts = split(silver);
        info!(
            bronze = fresh.len(),
            clean = parts.clean.len(),
            quarantine = parts.quarantine.len(),
            "Transformed bronze to silver"
        );

        let clean = parts.clean.len();
        let silver_rows = self.load_silver(entity, unique_movie_ids(parts.clean)).await?;
        self.settle_statuses(&bronze_location, &fresh, &parts.quarantine, Processing::Standard)
            .await?;

        if !parts.quarantine.is_empty() {
            warn!(rows = parts.quarantine.len(), "Records held in quarantine");
        }

        Ok(EntityReport {
            entity,
            ingested,
            processed,
            clean,
            quarantined: parts.quarantine.len(),
            silver_rows,
        })
    }

    pub async fn run_entity(&self, entity: Entity, reset: bool) -> Result<EntityReport> {
        match entity {
            Entity::Movies => self.run::<Movies>(reset).await,
            Entity::Genres => self.run::<Genres>(reset).await,
            Entity::OriginalLanguages => self.run::<OriginalLanguages>(reset).await,
        }
    }

    /// Reprocess quarantined bronze rows of `E` and load those that now pass
    #[instrument(skip(self), fields(entity = %E::ENTITY))]
    pub async fn repair_quarantine<E: SilverEntity>(&self) -> Result<RepairReport> {
        let entity = E::ENTITY;
        let bronze_location = self.config.bronze_location(entity);

        let bronze: Vec<BronzeRecord> = read_table(self.store, &bronze_location).await?;
        let held = with_status(bronze, Processing::QuarantineRepair.source_status());

        let parts = split(E::transform(&held, Processing::QuarantineRepair));
        let repaired = parts.clean.len();
        self.load_silver(entity, unique_movie_ids(parts.clean)).await?;
        self.settle_statuses(&bronze_location, &held, &parts.quarantine, Processing::QuarantineRepair)
            .await?;

        info!(
            repaired,
            remaining = parts.quarantine.len(),
            "Repaired quarantined records"
        );
        Ok(RepairReport {
            entity,
            reprocessed: held.len(),
            repaired,
            still_quarantined: parts.quarantine.len(),
        })
    }

    pub async fn repair_entity(&self, entity: Entity) -> Result<RepairReport> {
        match entity {
            Entity::Movies => self.repair_quarantine::<Movies>().await,
            Entity::Genres => self.repair_quarantine::<Genres>().await,
            Entity::OriginalLanguages => self.repair_quarantine::<OriginalLanguages>().await,
        }
    }

    /// Move the bronze rows read by a pass out of its source status
    ///
    /// Quarantine is merged first so a key shared with a quarantined record is
    /// never loaded.
    async fn settle_statuses<R: SilverRecord>(
        &self,
        location: &Path,
        consumed: &[BronzeRecord],
        quarantine: &[R],
        processing: Processing,
    ) -> Result<()> {
        let updater = StatusUpdater::new(self.store, self.config.match_key);
        let held = updater.keys(quarantine.iter().map(|record| record.payload()));
        let loaded: HashSet<String> = updater
            .keys(consumed.iter().map(|record| &record.movies))
            .difference(&held)
            .cloned()
            .collect();

        match processing {
            Processing::Standard => {
                updater
                    .update_keys(location, &held, RecordStatus::New, RecordStatus::Quarantine)
                    .await?;
                updater
                    .update_keys(location, &loaded, RecordStatus::New, RecordStatus::Clean)
                    .await?;
                updater
                    .update_keys(location, &loaded, RecordStatus::Clean, RecordStatus::Loaded)
                    .await?;
            },
            Processing::QuarantineRepair => {
                updater
                    .update_keys(location, &loaded, RecordStatus::Quarantine, RecordStatus::Loaded)
                    .await?;
            },
        }
        Ok(())
    }

    /// Append clean records to silver, deduplicate and register the table
    ///
    /// Returns the number of silver rows afterwards.
    async fn load_silver<T: serde::Serialize + Sync>(&self, entity: Entity, clean: Vec<T>) -> Result<usize> {
        let location = self.config.silver_location(entity);

        if clean.is_empty() {
            info!("No clean records to load");
            if !self.store.exists(&location).await? {
                return Ok(0);
            }
            return Ok(self.store.snapshot(&location).await?.rows.len());
        }

        BatchWriter::new()
            .exclude_columns([PAYLOAD_COLUMN])
            .mode(WriteMode::Append)
            .save(self.store, &location, &clean)
            .await?;
        let rows = self.drop_duplicate_rows(&location).await?;
        self.catalog.register(&entity.silver_table(), &location).await?;
        Ok(rows)
    }

    /// Remove duplicate rows left by repeated loads of the same records
    #[instrument(skip(self), fields(table = %location.display()))]
    async fn drop_duplicate_rows(&self, location: &Path) -> Result<usize> {
        let snapshot = self.store.snapshot(location).await?;
        let before = snapshot.rows.len();
        let rows = dedup_rows(snapshot.rows);

        if rows.len() < before {
            let removed = before - rows.len();
            let total = rows.len();
            self.store.replace(location, snapshot.version, rows).await?;
            info!(removed, total, "Removed duplicate silver rows");
            return Ok(total);
        }
        Ok(before)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::status::MatchKey;
    use crate::table::LocalTableStore;
    use serde_json::json;

    fn write_raw(dir: &Path, movies: serde_json::Value) -> EtlConfig {
        let raw = dir.join("raw");
        std::fs::create_dir_all(&raw).unwrap();
        std::fs::write(raw.join("movies.json"), json!({ "movie": movies }).to_string()).unwrap();

        EtlConfig::default()
            .with_raw_path(&raw)
            .with_bronze_root(dir.join("bronze"))
            .with_silver_root(dir.join("silver"))
    }

    #[tokio::test]
    async fn test_run_movies() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(
            dir.path(),
            json!([
                {"Id": "5", "Title": "X", "Budget": 500000, "RunTime": 90},
                {"Id": 8, "Title": "Y", "Budget": 2e6, "RunTime": -30}
            ]),
        );
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        let report = pipeline.run::<Movies>(false).await.unwrap();
        assert_eq!(report.ingested, 2);
        assert_eq!(report.clean, 1);
        assert_eq!(report.quarantined, 1);
        assert_eq!(report.silver_rows, 1);

        let bronze: Vec<BronzeRecord> = read_table(&store, &config.bronze_location(Entity::Movies))
            .await
            .unwrap();
        let statuses: Vec<_> = bronze.iter().map(|r| r.status).collect();
        assert_eq!(statuses, vec![RecordStatus::Loaded, RecordStatus::Quarantine]);

        let silver = store.snapshot(&config.silver_location(Entity::Movies)).await.unwrap();
        assert_eq!(silver.rows[0]["budget"], json!(1_000_000.0));
        assert!(!silver.rows[0].contains_key("movies"));
    }

    #[tokio::test]
    async fn test_repair_loads_quarantined_movie() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(dir.path(), json!([{"Id": 8, "Title": "Y", "RunTime": -30}]));
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        let report = pipeline.run::<Movies>(false).await.unwrap();
        assert_eq!(report.silver_rows, 0);
        assert!(!store.exists(&config.silver_location(Entity::Movies)).await.unwrap());

        let repair = pipeline.repair_quarantine::<Movies>().await.unwrap();
        assert_eq!(repair.reprocessed, 1);
        assert_eq!(repair.repaired, 1);

        let silver: Vec<serde_json::Value> = read_table(&store, &config.silver_location(Entity::Movies))
            .await
            .unwrap();
        assert_eq!(silver[0]["runtime"], json!(30));

        let bronze: Vec<BronzeRecord> = read_table(&store, &config.bronze_location(Entity::Movies))
            .await
            .unwrap();
        assert_eq!(bronze[0].status, RecordStatus::Loaded);

        // nothing left to repair
        let again = pipeline.repair_quarantine::<Movies>().await.unwrap();
        assert_eq!(again.reprocessed, 0);
    }

    #[tokio::test]
    async fn test_rerun_does_not_duplicate_silver() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(dir.path(), json!([{"Id": 1, "Title": "A", "RunTime": 100}]));
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        pipeline.run::<Movies>(false).await.unwrap();
        let second = pipeline.run::<Movies>(false).await.unwrap();

        assert_eq!(second.ingested, 1);
        assert_eq!(second.silver_rows, 1);

        let bronze: Vec<BronzeRecord> = read_table(&store, &config.bronze_location(Entity::Movies))
            .await
            .unwrap();
        assert_eq!(bronze.len(), 2);
        assert!(bronze.iter().all(|r| r.status == RecordStatus::Loaded));
    }

    #[tokio::test]
    async fn test_reset_starts_from_scratch() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(dir.path(), json!([{"Id": 1, "RunTime": 100}]));
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        pipeline.run::<Movies>(false).await.unwrap();
        pipeline.run::<Movies>(true).await.unwrap();

        let bronze = store.snapshot(&config.bronze_location(Entity::Movies)).await.unwrap();
        assert_eq!(bronze.rows.len(), 1);
    }

    async fn statuses(store: &LocalTableStore, config: &EtlConfig, entity: Entity) -> Vec<RecordStatus> {
        let bronze: Vec<BronzeRecord> = read_table(store, &config.bronze_location(entity)).await.unwrap();
        bronze.iter().map(|r| r.status).collect()
    }

    #[tokio::test]
    async fn test_genre_rows_without_surviving_genres_are_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(
            dir.path(),
            json!([
                {"Id": 1, "genres": [{"Id": 18, "Name": "Drama"}]},
                {"Id": 2, "genres": [{"Id": 18, "Name": "Drama"}]},
                {"Id": 3, "genres": []}
            ]),
        );
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        let report = pipeline.run::<Genres>(false).await.unwrap();
        assert_eq!(report.silver_rows, 1);
        assert_eq!(statuses(&store, &config, Entity::Genres).await, vec![RecordStatus::Loaded; 3]);

        let second = pipeline.run::<Genres>(false).await.unwrap();
        assert_eq!(second.processed, 1);
        assert!(statuses(&store, &config, Entity::Genres)
            .await
            .iter()
            .all(|status| *status == RecordStatus::Loaded));
    }

    #[tokio::test]
    async fn test_shared_movie_id_is_not_loaded_past_quarantine() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(
            dir.path(),
            json!([{"Id": 1, "RunTime": 90}, {"Id": 1, "RunTime": -30}]),
        )
        .with_match_key(MatchKey::MovieId);
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        let report = pipeline.run::<Movies>(false).await.unwrap();
        assert_eq!(report.clean, 1);
        assert_eq!(report.quarantined, 1);
        assert_eq!(
            statuses(&store, &config, Entity::Movies).await,
            vec![RecordStatus::Quarantine, RecordStatus::Quarantine]
        );

        let repair = pipeline.repair_quarantine::<Movies>().await.unwrap();
        assert_eq!(repair.reprocessed, 2);
        assert_eq!(statuses(&store, &config, Entity::Movies).await, vec![RecordStatus::Loaded; 2]);
    }

    #[tokio::test]
    async fn test_payload_key_splits_shared_movie_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(
            dir.path(),
            json!([{"Id": 1, "RunTime": 90}, {"Id": 1, "RunTime": -30}]),
        );
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        pipeline.run::<Movies>(false).await.unwrap();
        assert_eq!(
            statuses(&store, &config, Entity::Movies).await,
            vec![RecordStatus::Loaded, RecordStatus::Quarantine]
        );
    }

    #[tokio::test]
    async fn test_silver_batch_has_one_row_per_movie_id() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(
            dir.path(),
            json!([
                {"Id": 1, "Overview": "first cut", "RunTime": 90},
                {"Id": 1, "Overview": "director's cut", "RunTime": 120},
                {"Id": 2, "RunTime": 80}
            ]),
        );
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        let report = pipeline.run::<Movies>(false).await.unwrap();
        assert_eq!(report.clean, 3);
        assert_eq!(report.silver_rows, 2);

        let silver: Vec<serde_json::Value> = read_table(&store, &config.silver_location(Entity::Movies))
            .await
            .unwrap();
        assert_eq!(silver[0]["overview"], json!("first cut"));
        assert_eq!(silver[1]["movie_id"], json!(2));
        assert_eq!(statuses(&store, &config, Entity::Movies).await, vec![RecordStatus::Loaded; 3]);
    }

    #[tokio::test]
    async fn test_run_entity_registers_tables() {
        let dir = tempfile::tempdir().unwrap();
        let config = write_raw(
            dir.path(),
            json!([{"Id": 1, "RunTime": 95, "genres": [{"Id": 18, "Name": "Drama"}], "OriginalLanguage": "en"}]),
        );
        let store = LocalTableStore::new();
        let pipeline = Pipeline::new(config.clone(), &store);

        for entity in Entity::ALL {
            pipeline.run_entity(entity, false).await.unwrap();
        }

        let names: Vec<String> = pipeline
            .catalog()
            .tables()
            .await
            .unwrap()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        assert_eq!(
            names,
            vec![
                "genres_bronze",
                "genres_delta",
                "movies_bronze",
                "movies_delta",
                "originallanguages_bronze",
                "originallanguages_delta",
            ]
        );
    }
}
