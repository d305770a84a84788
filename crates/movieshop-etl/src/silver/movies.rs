//! Movie silver records

use movieshop_common::Entity;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{dedup_rows, Processing, SilverEntity, SilverRecord};
use crate::bronze::BronzeRecord;
use crate::cast;

/// Budgets at or below this value are raised to it
pub const BUDGET_FLOOR: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MovieSilver {
    pub movie_id: Option<i32>,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub budget: f64,
    pub runtime: Option<i32>,
    pub movies: Value,
}

impl SilverRecord for MovieSilver {
    fn payload(&self) -> &Value {
        &self.movies
    }

    /// Clean when the runtime is a non-negative integer and the id was castable
    fn is_clean(&self) -> bool {
        self.movie_id.is_some() && self.runtime.is_some_and(|runtime| runtime >= 0)
    }

    fn movie_id(&self) -> Option<i32> {
        self.movie_id
    }
}

/// Movies entity: `movies_bronze` -> `movies_delta`
pub struct Movies;

impl SilverEntity for Movies {
    const ENTITY: Entity = Entity::Movies;

    type Record = MovieSilver;

    fn transform(bronze: &[BronzeRecord], processing: Processing) -> Vec<MovieSilver> {
        let rows = bronze
            .iter()
            .map(|record| project(&record.movies, processing))
            .collect();
        dedup_rows(rows)
    }
}

/// Missing budgets are treated as below the floor
pub fn clamp_budget(budget: Option<f64>) -> f64 {
    match budget {
        Some(budget) if budget > BUDGET_FLOOR => budget,
        _ => BUDGET_FLOOR,
    }
}

fn project(movie: &Value, processing: Processing) -> MovieSilver {
    let runtime = cast::to_int(cast::field(movie, "RunTime"));
    let runtime = match processing {
        Processing::Standard => runtime,
        Processing::QuarantineRepair => runtime.and_then(i32::checked_abs),
    };

    MovieSilver {
        movie_id: cast::to_int(cast::field(movie, "Id")),
        title: cast::to_string(cast::field(movie, "Title")),
        overview: cast::to_string(cast::field(movie, "Overview")),
        budget: clamp_budget(cast::to_f64(cast::field(movie, "Budget"))),
        runtime,
        movies: movie.clone(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::bronze::{transform_raw, Lineage};
    use crate::raw::RawRecord;
    use proptest::prelude::*;
    use serde_json::json;

    fn bronze(movies: Vec<Value>) -> Vec<BronzeRecord> {
        transform_raw(
            movies.into_iter().map(RawRecord).collect(),
            &Lineage::now("test"),
        )
    }

    #[test]
    fn test_scenario_small_budget_is_clamped() {
        let rows = Movies::transform(
            &bronze(vec![json!({"Id": "5", "Title": "X", "Budget": 500000, "RunTime": 90})]),
            Processing::Standard,
        );

        assert_eq!(rows.len(), 1);
        let movie = &rows[0];
        assert_eq!(movie.movie_id, Some(5));
        assert_eq!(movie.title.as_deref(), Some("X"));
        assert_eq!(movie.budget, 1_000_000.0);
        assert_eq!(movie.runtime, Some(90));
        assert!(movie.is_clean());
    }

    #[test]
    fn test_large_budget_kept() {
        assert_eq!(clamp_budget(Some(63_000_000.0)), 63_000_000.0);
        assert_eq!(clamp_budget(Some(BUDGET_FLOOR)), BUDGET_FLOOR);
        assert_eq!(clamp_budget(None), BUDGET_FLOOR);
    }

    #[test]
    fn test_negative_runtime_is_quarantined_then_repaired() {
        let input = bronze(vec![json!({"Id": 8, "Title": "Y", "Budget": 2e6, "RunTime": -30})]);

        let standard = Movies::transform(&input, Processing::Standard);
        assert_eq!(standard[0].runtime, Some(-30));
        assert!(!standard[0].is_clean());

        let repaired = Movies::transform(&input, Processing::QuarantineRepair);
        assert_eq!(repaired[0].runtime, Some(30));
        assert!(repaired[0].is_clean());
    }

    #[test]
    fn test_repair_of_minus_120() {
        let repaired = Movies::transform(
            &bronze(vec![json!({"Id": 1, "RunTime": -120})]),
            Processing::QuarantineRepair,
        );
        assert_eq!(repaired[0].runtime, Some(120));
        assert!(repaired[0].is_clean());
    }

    #[test]
    fn test_uncastable_fields_become_null() {
        let rows = Movies::transform(
            &bronze(vec![json!({"Id": "abc", "RunTime": "long", "Budget": "lots"})]),
            Processing::Standard,
        );
        assert_eq!(rows[0].movie_id, None);
        assert_eq!(rows[0].runtime, None);
        assert_eq!(rows[0].budget, BUDGET_FLOOR);
        assert!(!rows[0].is_clean());
    }

    #[test]
    fn test_exact_duplicates_removed() {
        let movie = json!({"Id": 3, "Title": "Z", "Budget": 5e6, "RunTime": 100});
        let rows = Movies::transform(
            &bronze(vec![movie.clone(), movie, json!({"Id": 4, "RunTime": 1})]),
            Processing::Standard,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].movie_id, Some(3));
        assert_eq!(rows[1].movie_id, Some(4));
    }

    proptest! {
        #[test]
        fn prop_budget_never_below_floor(budget in proptest::num::f64::ANY, runtime in any::<i32>()) {
            let rows = Movies::transform(
                &bronze(vec![json!({"Id": 1, "Budget": budget, "RunTime": runtime})]),
                Processing::Standard,
            );
            prop_assert!(rows.iter().all(|m| m.budget >= BUDGET_FLOOR));
        }

        #[test]
        fn prop_dedup_is_idempotent(ids in proptest::collection::vec(0i32..5, 0..20)) {
            let input = bronze(ids.iter().map(|id| json!({"Id": id, "RunTime": id})).collect());
            let once = Movies::transform(&input, Processing::Standard);

            let deduplicated = bronze(once.iter().map(|m| m.movies.clone()).collect());
            let twice = Movies::transform(&deduplicated, Processing::Standard);

            prop_assert_eq!(&once, &twice);
            prop_assert_eq!(once.len(), ids.iter().collect::<std::collections::HashSet<_>>().len());
        }
    }
}
