//! Common types used across the movieshop pipeline

use serde::{Deserialize, Serialize};

use crate::error::{EtlError, Result};

/// Lifecycle status of a bronze record
///
/// Transitions are one-directional:
/// `new -> {clean | quarantine}`, `clean -> loaded`, `quarantine -> loaded`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    /// Freshly ingested, not yet processed into silver
    #[default]
    New,
    /// Passed validation
    Clean,
    /// Failed validation, held for correction
    Quarantine,
    /// Materialized in the silver layer
    Loaded,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::New => "new",
            RecordStatus::Clean => "clean",
            RecordStatus::Quarantine => "quarantine",
            RecordStatus::Loaded => "loaded",
        }
    }

    /// Whether a record in this status may move to `next`.
    ///
    /// Re-applying the current status is allowed and is a no-op.
    pub fn can_transition_to(self, next: RecordStatus) -> bool {
        use RecordStatus::*;

        self == next
            || matches!(
                (self, next),
                (New, Clean) | (New, Quarantine) | (Clean, Loaded) | (Quarantine, Loaded)
            )
    }

    /// Validate and perform a transition
    pub fn transition_to(self, next: RecordStatus) -> Result<RecordStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(EtlError::InvalidTransition {
                from: self,
                to: next,
            })
        }
    }
}

impl std::str::FromStr for RecordStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "new" => Ok(RecordStatus::New),
            "clean" => Ok(RecordStatus::Clean),
            "quarantine" => Ok(RecordStatus::Quarantine),
            "loaded" => Ok(RecordStatus::Loaded),
            _ => Err(anyhow::anyhow!("Invalid record status: {}", s)),
        }
    }
}

impl std::fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a batch is persisted into a table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WriteMode {
    /// Add rows to the table; the schema must match
    #[default]
    Append,
    /// Replace all rows and the schema
    Overwrite,
}

impl std::str::FromStr for WriteMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "append" => Ok(WriteMode::Append),
            "overwrite" => Ok(WriteMode::Overwrite),
            _ => Err(anyhow::anyhow!("Invalid write mode: {}", s)),
        }
    }
}

impl std::fmt::Display for WriteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WriteMode::Append => write!(f, "append"),
            WriteMode::Overwrite => write!(f, "overwrite"),
        }
    }
}

/// Entity types the pipeline materializes, each with its own bronze and silver table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Entity {
    Movies,
    Genres,
    OriginalLanguages,
}

impl Entity {
    pub const ALL: [Entity; 3] = [Entity::Movies, Entity::Genres, Entity::OriginalLanguages];

    /// Folder name under the bronze and silver roots
    pub fn folder_name(&self) -> &'static str {
        match self {
            Entity::Movies => "movies",
            Entity::Genres => "genres",
            Entity::OriginalLanguages => "originallanguages",
        }
    }

    pub fn bronze_table(&self) -> String {
        format!("{}_bronze", self.folder_name())
    }

    pub fn silver_table(&self) -> String {
        format!("{}_delta", self.folder_name())
    }
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.folder_name())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(RecordStatus::New.can_transition_to(RecordStatus::Clean));
        assert!(RecordStatus::New.can_transition_to(RecordStatus::Quarantine));
        assert!(RecordStatus::Clean.can_transition_to(RecordStatus::Loaded));
        assert!(RecordStatus::Quarantine.can_transition_to(RecordStatus::Loaded));
    }

    #[test]
    fn test_nothing_returns_to_new() {
        for status in [RecordStatus::Clean, RecordStatus::Quarantine, RecordStatus::Loaded] {
            assert!(!status.can_transition_to(RecordStatus::New));
        }
        assert!(!RecordStatus::Loaded.can_transition_to(RecordStatus::Clean));
        assert!(!RecordStatus::Clean.can_transition_to(RecordStatus::Quarantine));
        assert!(!RecordStatus::New.can_transition_to(RecordStatus::Loaded));
    }

    #[test]
    fn test_same_status_is_noop() {
        assert_eq!(
            RecordStatus::Loaded.transition_to(RecordStatus::Loaded).unwrap(),
            RecordStatus::Loaded
        );
    }

    #[test]
    fn test_invalid_transition_error() {
        let err = RecordStatus::Loaded.transition_to(RecordStatus::New).unwrap_err();
        assert!(matches!(
            err,
            EtlError::InvalidTransition {
                from: RecordStatus::Loaded,
                to: RecordStatus::New
            }
        ));
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(serde_json::to_string(&RecordStatus::Quarantine).unwrap(), "\"quarantine\"");
        assert_eq!("LOADED".parse::<RecordStatus>().unwrap(), RecordStatus::Loaded);
        assert!("done".parse::<RecordStatus>().is_err());
    }

    #[test]
    fn test_entity_table_names() {
        assert_eq!(Entity::Movies.bronze_table(), "movies_bronze");
        assert_eq!(Entity::OriginalLanguages.silver_table(), "originallanguages_delta");
        assert_eq!(Entity::Genres.folder_name(), "genres");
    }
}
