//! Error types for the movieshop pipeline

use thiserror::Error;

use crate::types::RecordStatus;

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, EtlError>;

/// Main error type for the movieshop pipeline
///
/// Validation failures are not errors: rows that fail validation are routed to
/// the quarantine partition instead.
#[derive(Error, Debug)]
pub enum EtlError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Raw input is unreachable, empty or not parseable as JSON
    #[error("Ingestion failed for '{path}': {reason}")]
    Ingestion { path: String, reason: String },

    #[error("Schema mismatch writing '{table}': expected columns {expected:?}, got {actual:?}")]
    SchemaMismatch {
        table: String,
        expected: Vec<String>,
        actual: Vec<String>,
    },

    #[error("Write failed for '{table}': {reason}")]
    Write { table: String, reason: String },

    #[error("Table not found: {0}")]
    TableNotFound(String),

    #[error("Table '{table}' is corrupt: {reason}")]
    TableCorrupt { table: String, reason: String },

    #[error("Checksum mismatch for '{file}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        file: String,
        expected: String,
        actual: String,
    },

    /// Status merge against a bronze table failed; bronze is unchanged
    #[error("Status update failed for '{table}': {reason}")]
    Update { table: String, reason: String },

    #[error("Invalid status transition: {from} -> {to}")]
    InvalidTransition { from: RecordStatus, to: RecordStatus },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl EtlError {
    /// Create an ingestion error
    pub fn ingestion(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Ingestion {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a write error
    pub fn write(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Write {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create a corrupt table error
    pub fn corrupt(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TableCorrupt {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create a status update error
    pub fn update(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Update {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
