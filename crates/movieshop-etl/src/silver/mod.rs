//! Bronze-to-silver transformations
//!
//! Each entity projects its fields out of the bronze payload, normalizes and
//! casts them, and removes duplicates. Silver records keep the originating
//! payload in memory so their bronze rows can be found again; the payload
//! column is excluded when silver tables are written.

pub mod genres;
pub mod movies;
pub mod original_languages;

pub use genres::{GenreSilver, Genres};
pub use movies::{MovieSilver, Movies, BUDGET_FLOOR};
pub use original_languages::{OriginalLanguageSilver, OriginalLanguages};

use movieshop_common::{Entity, RecordStatus};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use std::hash::Hash;

use crate::bronze::BronzeRecord;
use crate::canonical::canonical_string;

/// Which bronze rows a transformation runs over and how they are normalized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Processing {
    /// First pass over freshly ingested rows
    #[default]
    Standard,
    /// Reprocess quarantined rows, correcting sign errors
    QuarantineRepair,
}

impl Processing {
    /// Bronze status this pass consumes
    pub fn source_status(&self) -> RecordStatus {
        match self {
            Processing::Standard => RecordStatus::New,
            Processing::QuarantineRepair => RecordStatus::Quarantine,
        }
    }
}

/// A normalized silver row
pub trait SilverRecord: Serialize + DeserializeOwned + Clone + Send + Sync {
    /// The raw payload this row was derived from
    fn payload(&self) -> &Value;

    /// Validity predicate used by the quarantine splitter
    fn is_clean(&self) -> bool;

    /// Movie this row describes, for entities keyed by movie
    fn movie_id(&self) -> Option<i32> {
        None
    }
}

/// An entity with its own silver table
pub trait SilverEntity {
    const ENTITY: Entity;

    type Record: SilverRecord;

    /// Project, normalize, cast and deduplicate bronze rows
    fn transform(bronze: &[BronzeRecord], processing: Processing) -> Vec<Self::Record>;
}

/// Remove exact duplicate rows, keeping the first occurrence
pub fn dedup_rows<T: Serialize>(rows: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| match serde_json::to_value(row) {
            Ok(value) => seen.insert(canonical_string(&value)),
            Err(_) => true,
        })
        .collect()
}

/// Keep the first row for each key
pub fn dedup_by_key<T, K, F>(rows: Vec<T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    rows.into_iter().filter(|row| seen.insert(key(row))).collect()
}

/// Keep the first row per movie id
///
/// Rows without a movie id are all kept.
pub fn unique_movie_ids<T: SilverRecord>(rows: Vec<T>) -> Vec<T> {
    let mut seen = HashSet::new();
    rows.into_iter()
        .filter(|row| row.movie_id().is_none_or(|id| seen.insert(id)))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_dedup_rows_keeps_first_in_order() {
        let rows = vec![json!({"a": 1, "b": 2}), json!({"a": 3}), json!({"b": 2, "a": 1})];
        assert_eq!(dedup_rows(rows), vec![json!({"a": 1, "b": 2}), json!({"a": 3})]);
    }

    #[test]
    fn test_dedup_by_key() {
        let rows = vec![(1, "x"), (2, "y"), (1, "z")];
        assert_eq!(dedup_by_key(rows, |r| r.0), vec![(1, "x"), (2, "y")]);
    }

    #[test]
    fn test_unique_movie_ids_keeps_first_version() {
        let movie = |id: i32, overview: &str| MovieSilver {
            movie_id: Some(id),
            title: None,
            overview: Some(overview.to_string()),
            budget: BUDGET_FLOOR,
            runtime: Some(90),
            movies: json!({"Id": id, "Overview": overview}),
        };
        let rows = unique_movie_ids(vec![movie(1, "first"), movie(2, "other"), movie(1, "second")]);

        let kept: Vec<_> = rows.iter().map(|r| (r.movie_id, r.overview.as_deref())).collect();
        assert_eq!(kept, vec![(Some(1), Some("first")), (Some(2), Some("other"))]);
    }

    #[test]
    fn test_unique_movie_ids_ignores_unkeyed_rows() {
        let genre = |id: i32| GenreSilver {
            genre_id: id,
            genre_name: format!("g{}", id),
            movies: json!({"Id": 1}),
        };
        assert_eq!(unique_movie_ids(vec![genre(18), genre(35)]).len(), 2);
    }

    #[test]
    fn test_processing_source_status() {
        assert_eq!(Processing::Standard.source_status(), RecordStatus::New);
        assert_eq!(Processing::QuarantineRepair.source_status(), RecordStatus::Quarantine);
    }
}
