//! Original-language silver records

use movieshop_common::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{dedup_rows, Processing, SilverEntity, SilverRecord};
use crate::bronze::BronzeRecord;
use crate::cast;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OriginalLanguageSilver {
    pub movie_id: Option<i32>,
    pub title: Option<String>,
    pub original_languages: Option<String>,
    pub movies: Value,
}

impl SilverRecord for OriginalLanguageSilver {
    fn payload(&self) -> &Value {
        &self.movies
    }

    fn is_clean(&self) -> bool {
        self.movie_id.is_some()
    }

    fn movie_id(&self) -> Option<i32> {
        self.movie_id
    }
}

/// Original languages entity: `originallanguages_bronze` -> `originallanguages_delta`
pub struct OriginalLanguages;

impl SilverEntity for OriginalLanguages {
    const ENTITY: Entity = Entity::OriginalLanguages;

    type Record = OriginalLanguageSilver;

    fn transform(bronze: &[BronzeRecord], _processing: Processing) -> Vec<OriginalLanguageSilver> {
        let rows = bronze
            .iter()
            .map(|record| {
                let movie = &record.movies;
                OriginalLanguageSilver {
                    movie_id: cast::to_int(cast::field(movie, "Id")),
                    title: cast::to_string(cast::field(movie, "Title")),
                    original_languages: cast::to_string(cast::field(movie, "OriginalLanguage")),
                    movies: movie.clone(),
                }
            })
            .collect();
        dedup_rows(rows)
    }
}
