//! Offline leave-one-out evaluation of the collaborative recommender

use crate::catalog::{Catalog, RatingTable};
use crate::collaborative::CollaborativeRecommender;
use crate::config::{CollaborativeConfig, EvaluationConfig};
use crate::types::Rating;
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvaluationReport {
    pub users_evaluated: usize,
    pub hits: usize,
    pub hit_rate: f64,
    /// Fraction of catalog titles that appeared in any evaluated list
    pub catalog_coverage: f64,
}

/// Hold out each eligible user's highest-rated item, retrain without it and
/// check whether it comes back in the user's top `n`.
#[instrument(skip_all, fields(n = n, ratings = ratings.len()))]
pub fn leave_one_out(
    catalog: Arc<Catalog>,
    ratings: &RatingTable,
    collaborative: &CollaborativeConfig,
    config: &EvaluationConfig,
    n: usize,
) -> EvaluationReport {
    let mut users_evaluated = 0;
    let mut hits = 0;
    let mut recommended: HashSet<String> = HashSet::new();

    for user_id in ratings.distinct_users() {
        if users_evaluated >= config.max_users {
            break;
        }
        if ratings.rating_count(user_id) < config.min_user_ratings {
            continue;
        }

        // Highest rating wins; the latest row wins ties
        let Some((held_out_row, held_out)) = ratings
            .ratings()
            .iter()
            .enumerate()
            .filter(|(_, r)| r.user_id == user_id)
            .fold(None::<(usize, &Rating)>, |best, (row, r)| match best {
                Some((_, b)) if b.rating > r.rating => best,
                _ => Some((row, r)),
            })
        else {
            continue;
        };

        let Some(held_out_title) = catalog.title_of_id(held_out.item_id) else {
            debug!(user_id, item_id = held_out.item_id, "Held-out item not in catalog");
            continue;
        };

        let training: Vec<Rating> = ratings
            .ratings()
            .iter()
            .enumerate()
            .filter(|(row, _)| *row != held_out_row)
            .map(|(_, r)| *r)
            .collect();
        let model = CollaborativeRecommender::train(
            Arc::clone(&catalog),
            Arc::new(RatingTable::new(training)),
            collaborative,
        );

        let recs = model.recommend(user_id, n);
        users_evaluated += 1;
        if recs.iter().any(|title| title == held_out_title) {
            hits += 1;
        }
        debug!(user_id, held_out = held_out_title, returned = recs.len(), "Evaluated user");
        recommended.extend(recs);
    }

    let hit_rate = if users_evaluated == 0 {
        0.0
    } else {
        hits as f64 / users_evaluated as f64
    };
    let catalog_coverage = if catalog.is_empty() {
        0.0
    } else {
        recommended.len() as f64 / catalog.len() as f64
    };

    info!(users_evaluated, hits, hit_rate, catalog_coverage, "Leave-one-out evaluation");
    EvaluationReport {
        users_evaluated,
        hits,
        hit_rate,
        catalog_coverage,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;

    fn snapshot() -> (Arc<Catalog>, RatingTable) {
        let catalog = Arc::new(Catalog::new(
            (1..=4)
                .map(|id| Item::new(id, format!("Movie {id}"), "Drama"))
                .collect(),
        ));
        let mut ratings = Vec::new();
        for user in 1..=3 {
            for item in 1..=4 {
                ratings.push(Rating::new(user, item, 3.0));
            }
        }
        // user 1 rated twice more, user 4 barely rated
        ratings.push(Rating::new(1, 2, 5.0));
        ratings.push(Rating::new(1, 3, 5.0));
        ratings.push(Rating::new(4, 1, 4.0));
        (catalog, RatingTable::new(ratings))
    }

    #[test]
    fn test_skips_users_below_minimum() {
        let (catalog, ratings) = snapshot();
        let config = EvaluationConfig {
            min_user_ratings: 5,
            max_users: 100,
        };
        let report = leave_one_out(catalog, &ratings, &CollaborativeConfig::default(), &config, 4);

        assert_eq!(report.users_evaluated, 1);
        assert!(report.hits <= 1);
        assert!((0.0..=1.0).contains(&report.catalog_coverage));
    }

    #[test]
    fn test_max_users_caps_evaluation() {
        let (catalog, ratings) = snapshot();
        let config = EvaluationConfig {
            min_user_ratings: 1,
            max_users: 2,
        };
        let report = leave_one_out(catalog, &ratings, &CollaborativeConfig::default(), &config, 3);
        assert_eq!(report.users_evaluated, 2);
    }

    #[test]
    fn test_empty_snapshot() {
        let report = leave_one_out(
            Arc::new(Catalog::default()),
            &RatingTable::default(),
            &CollaborativeConfig::default(),
            &EvaluationConfig::default(),
            10,
        );
        assert_eq!(report.users_evaluated, 0);
        assert_eq!(report.hit_rate, 0.0);
        assert_eq!(report.catalog_coverage, 0.0);
    }
}
