//! Genre silver records
//!
//! Every movie's `genres` array is exploded into one row per genre. Rows with a
//! missing or uncastable id or name are dropped first, then a single row is
//! kept per `genre_id`. Dropping after the id dedup would let a null-named row
//! shadow a valid row for the same genre.

use movieshop_common::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{dedup_by_key, Processing, SilverEntity, SilverRecord};
use crate::bronze::BronzeRecord;
use crate::cast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenreSilver {
    pub genre_id: i32,
    pub genre_name: String,
    pub movies: Value,
}

impl SilverRecord for GenreSilver {
    fn payload(&self) -> &Value {
        &self.movies
    }

    fn is_clean(&self) -> bool {
        true
    }
}

/// Genres entity: `genres_bronze` -> `genres_delta`
pub struct Genres;

impl SilverEntity for Genres {
    const ENTITY: Entity = Entity::Genres;

    type Record = GenreSilver;

    fn transform(bronze: &[BronzeRecord], _processing: Processing) -> Vec<GenreSilver> {
        let rows = bronze
            .iter()
            .flat_map(|record| explode(&record.movies))
            .collect();
        // One row per genre id subsumes exact-duplicate removal
        dedup_by_key(rows, |genre: &GenreSilver| genre.genre_id)
    }
}

fn explode(movie: &Value) -> Vec<GenreSilver> {
    let Some(Value::Array(genres)) = cast::field(movie, "genres") else {
        return Vec::new();
    };

    genres
        .iter()
        .filter_map(|genre| {
            Some(GenreSilver {
                genre_id: cast::to_int(cast::field(genre, "id"))?,
                genre_name: cast::to_string(cast::field(genre, "name"))?,
                movies: movie.clone(),
            })
        })
        .collect()
}
