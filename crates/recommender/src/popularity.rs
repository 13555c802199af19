//! Popularity ranking with Bayesian shrinkage
//!
//! score = (v / (v + m)) * R + (m / (v + m)) * C
//!
//! where v is the item's vote count, R its mean rating, C the mean rating
//! across rated catalog items and m the vote-count quantile (default p90).
//! Items with fewer than m votes never qualify.

use crate::catalog::{Catalog, RatingTable};
use crate::config::PopularityConfig;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Per-item popularity statistics for a qualified item
#[derive(Debug, Clone, PartialEq)]
pub struct PopularityEntry {
    /// Catalog row
    pub index: usize,
    pub vote_count: usize,
    pub vote_average: f64,
    pub score: f64,
}

/// Derived popularity table, sorted by score descending
#[derive(Debug, Clone, Default)]
pub struct PopularityTable {
    pub global_mean: f64,
    pub vote_threshold: f64,
    pub entries: Vec<PopularityEntry>,
}

pub struct PopularityRecommender {
    catalog: Arc<Catalog>,
    table: PopularityTable,
}

impl PopularityRecommender {
    #[instrument(skip_all, fields(items = catalog.len(), ratings = ratings.len()))]
    pub fn train(catalog: Arc<Catalog>, ratings: &RatingTable, config: &PopularityConfig) -> Self {
        let table = build_popularity_table(&catalog, ratings, config.vote_count_quantile);

        info!(
            qualified = table.entries.len(),
            global_mean = table.global_mean,
            vote_threshold = table.vote_threshold,
            "Trained popularity model"
        );

        Self { catalog, table }
    }

    /// Top `n` titles by credibility-weighted score
    pub fn recommend(&self, n: usize) -> Vec<String> {
        let titles: Vec<String> = self
            .table
            .entries
            .iter()
            .take(n)
            .filter_map(|entry| self.catalog.get(entry.index))
            .map(|item| item.title.clone())
            .collect();

        debug!(requested = n, returned = titles.len(), "Popularity recommendations");
        titles
    }

    pub fn table(&self) -> &PopularityTable {
        &self.table
    }
}

/// Build the popularity table over catalog items joined with their ratings
pub fn build_popularity_table(
    catalog: &Catalog,
    ratings: &RatingTable,
    quantile: f64,
) -> PopularityTable {
    let mut sums: HashMap<u32, (usize, f64)> = HashMap::new();
    for rating in ratings.ratings() {
        let entry = sums.entry(rating.item_id).or_insert((0, 0.0));
        entry.0 += 1;
        entry.1 += f64::from(rating.rating);
    }

    // Catalog rows that have at least one rating, in catalog order
    let stats: Vec<(usize, usize, f64)> = catalog
        .items()
        .iter()
        .enumerate()
        .filter_map(|(idx, item)| {
            sums.get(&item.id)
                .map(|&(count, sum)| (idx, count, sum / count as f64))
        })
        .collect();

    if stats.is_empty() {
        return PopularityTable::default();
    }

    let global_mean = stats.iter().map(|s| s.2).sum::<f64>() / stats.len() as f64;
    let counts: Vec<f64> = stats.iter().map(|s| s.1 as f64).collect();
    let m = quantile_linear(&counts, quantile);

    let mut entries: Vec<PopularityEntry> = stats
        .into_iter()
        .filter(|&(_, count, _)| count as f64 >= m)
        .map(|(index, count, average)| {
            let v = count as f64;
            PopularityEntry {
                index,
                vote_count: count,
                vote_average: average,
                score: weighted_rating(v, average, m, global_mean),
            }
        })
        .collect();

    // Stable: equal scores keep catalog order
    entries.sort_by(|a, b| b.score.total_cmp(&a.score));

    PopularityTable {
        global_mean,
        vote_threshold: m,
        entries,
    }
}

/// Bayesian weighted rating
pub fn weighted_rating(votes: f64, average: f64, threshold: f64, global_mean: f64) -> f64 {
    let total = votes + threshold;
    if total == 0.0 {
        return global_mean;
    }
    (votes / total) * average + (threshold / total) * global_mean
}

/// Quantile with linear interpolation between closest ranks
pub fn quantile_linear(values: &[f64], q: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let position = q.clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lower = position.floor() as usize;
    let upper = position.ceil() as usize;
    let fraction = position - lower as f64;

    sorted[lower] + (sorted[upper] - sorted[lower]) * fraction
}
