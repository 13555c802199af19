//! Item-item collaborative filtering in a latent rating space
//!
//! Training pivots the rating table into a dense item × user matrix
//! (missing = 0), reduces it with a truncated SVD to
//! `k = min(max_components, users - 1)` dimensions and keeps the Pearson
//! correlation between the reduced item rows. A user's query sums the
//! correlation rows of the items they rated highly.

use crate::catalog::{Catalog, RatingTable};
use crate::config::CollaborativeConfig;
use crate::linalg::{LatentCorrelation, TruncatedSvd};
use crate::types::{ItemId, Rating, UserId};
use ndarray::Array2;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Collaborative recommendation engine
pub struct CollaborativeRecommender {
    catalog: Arc<Catalog>,
    ratings: Arc<RatingTable>,
    /// Matrix row order, ascending item id
    item_ids: Vec<ItemId>,
    row_of: HashMap<ItemId, usize>,
    /// Item × user ratings, kept for the "also rated" neighbourhood
    rating_matrix: Array2<f64>,
    /// `None` when fewer than two users or no items were available
    correlation: Option<LatentCorrelation>,
    components: usize,
    high_rating_threshold: f32,
}

impl CollaborativeRecommender {
    #[instrument(skip_all, fields(ratings = ratings.len()))]
    pub fn train(
        catalog: Arc<Catalog>,
        ratings: Arc<RatingTable>,
        config: &CollaborativeConfig,
    ) -> Self {
        let item_ids = ratings.distinct_items();
        let user_ids = ratings.distinct_users();
        let rating_matrix = build_rating_matrix(&ratings, &item_ids, &user_ids);

        let components = config
            .max_components
            .min(user_ids.len().saturating_sub(1))
            .min(item_ids.len());

        let correlation = if components == 0 {
            None
        } else {
            let svd = TruncatedSvd {
                n_components: components,
                oversamples: config.oversamples,
                power_iterations: config.power_iterations,
                seed: config.seed,
            };
            let decomposition = svd.fit_transform(&rating_matrix);
            debug!(
                singular_values = ?decomposition.singular_values,
                "Reduced rating matrix"
            );
            Some(LatentCorrelation::from_latent(&decomposition.reduced))
        };

        info!(
            items = item_ids.len(),
            users = user_ids.len(),
            components,
            "Trained collaborative model"
        );

        let row_of = item_ids
            .iter()
            .enumerate()
            .map(|(row, &id)| (id, row))
            .collect();

        Self {
            catalog,
            ratings,
            item_ids,
            row_of,
            rating_matrix,
            correlation,
            components,
            high_rating_threshold: config.high_rating_threshold,
        }
    }

    /// Up to `n` titles ranked by latent affinity to the user's liked items
    pub fn recommend(&self, user_id: UserId, n: usize) -> Vec<String> {
        let titles = self.titles_for(self.rank_for_user(user_id), n);
        debug!(
            user_id,
            requested = n,
            returned = titles.len(),
            "Collaborative recommendations"
        );
        titles
    }

    /// Up to `n` titles for an explicit rating history, which may mention
    /// items the model was never trained on
    pub fn recommend_for_history(&self, history: &[Rating], n: usize) -> Vec<String> {
        self.titles_for(self.rank_history(history), n)
    }

    fn titles_for(&self, ranked: Vec<(usize, f64)>, n: usize) -> Vec<String> {
        ranked
            .into_iter()
            .filter_map(|(row, _)| self.catalog.title_of_id(self.item_ids[row]))
            .take(n)
            .map(str::to_string)
            .collect()
    }

    /// Seed items for a user: ratings at or above the threshold, or every
    /// rated item when none qualify. Input order, without duplicates.
    pub fn seed_items(&self, user_id: UserId) -> Vec<ItemId> {
        let history: Vec<Rating> = self.ratings.ratings_for(user_id).copied().collect();
        self.seeds_from(&history)
    }

    fn seeds_from(&self, history: &[Rating]) -> Vec<ItemId> {
        let mut seen = HashSet::new();
        let high: Vec<ItemId> = history
            .iter()
            .filter(|r| r.rating >= self.high_rating_threshold)
            .map(|r| r.item_id)
            .filter(|id| seen.insert(*id))
            .collect();
        if !high.is_empty() {
            return high;
        }

        seen.clear();
        history
            .iter()
            .map(|r| r.item_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// Accumulated correlation per candidate matrix row, highest first;
    /// ties keep ascending item id order
    pub fn rank_for_user(&self, user_id: UserId) -> Vec<(usize, f64)> {
        let history: Vec<Rating> = self.ratings.ratings_for(user_id).copied().collect();
        self.rank_history(&history)
    }

    fn rank_history(&self, history: &[Rating]) -> Vec<(usize, f64)> {
        let Some(correlation) = &self.correlation else {
            return Vec::new();
        };

        let seeds = self.seeds_from(history);
        if seeds.is_empty() {
            return Vec::new();
        }
        let seed_set: HashSet<ItemId> = seeds.iter().copied().collect();

        let mut scores: Vec<Option<f64>> = vec![None; self.item_ids.len()];
        for seed in &seeds {
            // Items unknown at training time contribute nothing
            let Some(&row) = self.row_of.get(seed) else {
                continue;
            };
            let corr = correlation.correlation_row(row);
            for (candidate, value) in corr.iter().enumerate() {
                if seed_set.contains(&self.item_ids[candidate]) {
                    continue;
                }
                *scores[candidate].get_or_insert(0.0) += value;
            }
        }

        let mut ranked: Vec<(usize, f64)> = scores
            .into_iter()
            .enumerate()
            .filter_map(|(row, score)| score.map(|s| (row, s)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        ranked
    }

    /// "Users who rated this also rated": cosine over raw rating rows
    pub fn similar_titles(&self, title: &str, n: usize) -> Vec<String> {
        let Some(row) = self
            .catalog
            .item_by_title(title)
            .and_then(|item| self.row_of.get(&item.id).copied())
        else {
            return Vec::new();
        };

        let target = self.rating_matrix.row(row);
        let target_norm = target.dot(&target).sqrt();
        if target_norm == 0.0 {
            return Vec::new();
        }

        let mut scored: Vec<(usize, f64)> = self
            .rating_matrix
            .rows()
            .into_iter()
            .enumerate()
            .filter(|(other, _)| *other != row)
            .map(|(other, ratings)| {
                let norm = ratings.dot(&ratings).sqrt();
                let similarity = if norm == 0.0 {
                    0.0
                } else {
                    ratings.dot(&target) / (norm * target_norm)
                };
                (other, similarity)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1));

        scored
            .into_iter()
            .filter_map(|(other, _)| self.catalog.title_of_id(self.item_ids[other]))
            .take(n)
            .map(str::to_string)
            .collect()
    }

    pub fn components(&self) -> usize {
        self.components
    }

    pub fn item_count(&self) -> usize {
        self.item_ids.len()
    }

    /// Correlation between two items in the latent space
    pub fn item_correlation(&self, a: ItemId, b: ItemId) -> Option<f64> {
        let correlation = self.correlation.as_ref()?;
        let (ra, rb) = (*self.row_of.get(&a)?, *self.row_of.get(&b)?);
        Some(correlation.correlation(ra, rb))
    }
}

/// Dense item × user matrix; repeated (user, item) ratings are averaged
fn build_rating_matrix(
    ratings: &RatingTable,
    item_ids: &[ItemId],
    user_ids: &[UserId],
) -> Array2<f64> {
    let item_row: HashMap<ItemId, usize> =
        item_ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();
    let user_col: HashMap<UserId, usize> =
        user_ids.iter().enumerate().map(|(j, &id)| (id, j)).collect();

    let mut sums: HashMap<(usize, usize), (f64, usize)> = HashMap::new();
    for rating in ratings.ratings() {
        let key = (item_row[&rating.item_id], user_col[&rating.user_id]);
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += f64::from(rating.rating);
        entry.1 += 1;
    }

    let mut matrix = Array2::<f64>::zeros((item_ids.len(), user_ids.len()));
    for ((row, col), (sum, count)) in sums {
        matrix[[row, col]] = sum / count as f64;
    }
    matrix
}
