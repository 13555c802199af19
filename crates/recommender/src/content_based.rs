//! Content-based filtering over TF-IDF feature soups
//!
//! Each item gets a "soup" of its overview, its genre tokens repeated for
//! emphasis, and its keywords and director. Queries average the seed rows
//! and rank every other item by cosine similarity, computed per request so
//! memory stays linear in catalog size.

use crate::catalog::Catalog;
use crate::config::ContentConfig;
use crate::text::{cosine_similarity, TfidfMatrix, TfidfVectorizer, VectorizerParams};
use crate::types::{split_multi_value, Item};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Content-based recommendation engine
pub struct ContentBasedRecommender {
    catalog: Arc<Catalog>,
    vectorizer: TfidfVectorizer,
    matrix: TfidfMatrix,
}

impl ContentBasedRecommender {
    #[instrument(skip_all, fields(items = catalog.len()))]
    pub fn train(catalog: Arc<Catalog>, config: &ContentConfig) -> Self {
        let mut soups: Vec<String> = catalog
            .items()
            .iter()
            .map(|item| build_soup(item, config.genre_boost))
            .collect();

        if !soups.is_empty() && soups.iter().all(|soup| soup.trim().is_empty()) {
            warn!(
                placeholder = %config.placeholder_token,
                "Every feature soup is empty, using placeholder token"
            );
            soups = vec![config.placeholder_token.clone(); soups.len()];
        }

        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            min_df: config.min_df,
            max_features: config.max_features,
            ngram_max: config.ngram_max,
        });
        let matrix = vectorizer.fit_transform(&soups);

        info!(
            rows = matrix.n_rows(),
            vocabulary = matrix.n_features(),
            "Trained content model"
        );

        Self {
            catalog,
            vectorizer,
            matrix,
        }
    }

    /// Up to `n` titles most similar to the seed set, excluding the seeds
    pub fn recommend<S: AsRef<str>>(&self, seed_titles: &[S], n: usize) -> Vec<String> {
        let seeds: Vec<usize> = seed_titles
            .iter()
            .filter_map(|title| self.catalog.index_of_title(title.as_ref()))
            .collect();

        if seeds.is_empty() || n == 0 {
            debug!(seeds = seed_titles.len(), "No resolvable content seeds");
            return Vec::new();
        }

        let ranked = self.rank(&seeds);
        let titles: Vec<String> = ranked
            .into_iter()
            .take(n)
            .filter_map(|(idx, _)| self.catalog.get(idx))
            .map(|item| item.title.clone())
            .collect();

        debug!(
            seeds = seeds.len(),
            requested = n,
            returned = titles.len(),
            "Content recommendations"
        );
        titles
    }

    /// Every non-seed row scored against the mean of the seed rows,
    /// highest first; ties keep catalog order
    pub fn rank(&self, seeds: &[usize]) -> Vec<(usize, f64)> {
        let query = self.matrix.mean_of_rows(seeds);
        let excluded: HashSet<usize> = seeds.iter().copied().collect();

        let mut scored: Vec<(usize, f64)> = self
            .matrix
            .rows()
            .iter()
            .enumerate()
            .filter(|(idx, _)| !excluded.contains(idx))
            .map(|(idx, row)| (idx, cosine_similarity(&query, row)))
            .collect();

        scored.sort_by(|a, b| b.1.total_cmp(&a.1));
        scored
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vectorizer.vocabulary_size()
    }

    pub fn matrix(&self) -> &TfidfMatrix {
        &self.matrix
    }
}

/// Overview, boosted genres, then keywords and director
pub fn build_soup(item: &Item, genre_boost: usize) -> String {
    let mut parts: Vec<String> = Vec::new();

    if let Some(overview) = item.overview.as_deref().filter(|o| !o.trim().is_empty()) {
        parts.push(overview.to_string());
    }

    let genres = item.genre_tokens().join(" ");
    if !genres.is_empty() {
        parts.extend(std::iter::repeat(genres).take(genre_boost));
    }

    if let Some(keywords) = item.keywords.as_deref() {
        let keywords = split_multi_value(keywords).join(" ");
        if !keywords.is_empty() {
            parts.push(keywords);
        }
    }

    if let Some(director) = item.director.as_deref().filter(|d| !d.trim().is_empty()) {
        parts.push(director.to_string());
    }

    parts.join(" ").trim().to_string()
}
