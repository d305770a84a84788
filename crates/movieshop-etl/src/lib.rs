//! Movieshop ETL Library
//!
//! Batch pipeline that moves movie catalog JSON through a medallion layout:
//! raw JSON is stamped with lineage into bronze tables, then projected,
//! validated and deduplicated into silver tables per entity.
//!
//! # Overview
//!
//! - **Raw**: [`raw::RawReader`] flattens the `movie` array of the input files
//! - **Bronze**: [`bronze::transform_raw`] adds lineage and status `new`
//! - **Silver**: [`silver::SilverEntity`] implementations for movies, genres
//!   and original languages
//! - **Quarantine**: [`quarantine::split`] separates invalid records
//! - **Status**: [`status::StatusUpdater`] merges statuses back into bronze
//! - **Storage**: [`table::TableStore`] with a local JSON-lines implementation
//!
//! # Example
//!
//! ```no_run
//! use movieshop_etl::{config::EtlConfig, pipeline::Pipeline, table::LocalTableStore};
//! use movieshop_common::Entity;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = LocalTableStore::new();
//!     let pipeline = Pipeline::new(EtlConfig::from_env()?, &store);
//!     let report = pipeline.run_entity(Entity::Movies, false).await?;
//!     println!("{} clean, {} quarantined", report.clean, report.quarantined);
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod bronze;
pub mod canonical;
pub mod cast;
pub mod commands;
pub mod config;
pub mod pipeline;
pub mod quarantine;
pub mod raw;
pub mod silver;
pub mod status;
pub mod table;
pub mod writer;

// Re-export commonly used types
pub use config::EtlConfig;
pub use pipeline::{EntityReport, Pipeline, RepairReport};
pub use status::MatchKey;

use clap::{Args, Parser, Subcommand, ValueEnum};
use movieshop_common::{Entity, RecordStatus};
use std::path::PathBuf;

/// Movieshop medallion ETL
#[derive(Parser, Debug)]
#[command(name = "movieshop-etl")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub paths: PathArgs,

    /// Print the CLI reference as markdown and exit
    #[arg(long, hide = true)]
    pub markdown_help: bool,
}

/// Storage locations; each falls back to its environment variable
#[derive(Args, Debug, Clone, Default)]
pub struct PathArgs {
    /// Raw JSON file or directory
    #[arg(long, env = "MOVIESHOP_RAW_PATH", global = true)]
    pub raw_path: Option<PathBuf>,

    /// Root directory of the bronze tables
    #[arg(long, env = "MOVIESHOP_BRONZE_ROOT", global = true)]
    pub bronze_root: Option<PathBuf>,

    /// Root directory of the silver tables and the catalog
    #[arg(long, env = "MOVIESHOP_SILVER_ROOT", global = true)]
    pub silver_root: Option<PathBuf>,

    /// Source tag stamped on ingested records
    #[arg(long, env = "MOVIESHOP_DATA_SOURCE", global = true)]
    pub data_source: Option<String>,

    /// Key used to match silver records back to bronze
    #[arg(long, value_enum, env = "MOVIESHOP_MATCH_KEY", global = true)]
    pub match_key: Option<MatchKey>,
}

impl PathArgs {
    /// Apply the options that were given on top of `config`
    pub fn apply(&self, mut config: EtlConfig) -> EtlConfig {
        if let Some(path) = &self.raw_path {
            config.raw_path = path.clone();
        }
        if let Some(path) = &self.bronze_root {
            config.bronze_root = path.clone();
        }
        if let Some(path) = &self.silver_root {
            config.silver_root = path.clone();
        }
        if let Some(source) = &self.data_source {
            config.data_source = source.clone();
        }
        if let Some(key) = self.match_key {
            config.match_key = key;
        }
        config
    }
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run raw -> bronze -> silver for one or all entities
    Run {
        /// Entity to process
        #[arg(short, long, value_enum, default_value_t = EntityArg::All)]
        entity: EntityArg,

        /// Delete the entity's bronze and silver tables first
        #[arg(long)]
        reset: bool,
    },

    /// Reprocess quarantined records and load those that now pass
    RepairQuarantine {
        /// Entity to repair
        #[arg(short, long, value_enum, default_value_t = EntityArg::Movies)]
        entity: EntityArg,
    },

    /// Print rows of a registered table as JSON lines
    Show {
        /// Table name, e.g. movies_bronze or movies_delta
        table: String,

        /// Maximum number of rows to print
        #[arg(short, long, default_value_t = 20)]
        limit: usize,

        /// Only rows with this status (bronze tables)
        #[arg(short, long)]
        status: Option<RecordStatus>,
    },

    /// List registered tables
    Tables,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EntityArg {
    Movies,
    Genres,
    OriginalLanguages,
    All,
}

impl EntityArg {
    pub fn entities(&self) -> Vec<Entity> {
        match self {
            EntityArg::Movies => vec![Entity::Movies],
            EntityArg::Genres => vec![Entity::Genres],
            EntityArg::OriginalLanguages => vec![Entity::OriginalLanguages],
            EntityArg::All => Entity::ALL.to_vec(),
        }
    }
}
