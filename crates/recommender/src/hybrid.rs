//! Hybrid recommendation engine
//!
//! Combines content, collaborative and popularity rankings:
//!
//! 1. Pick fusion weights from the user's rating count
//! 2. Ask every source with a positive weight for `pool_multiplier * n` titles
//! 3. Weighted reciprocal-rank fusion: the item at rank i scores `weight / i`
//! 4. Genre-capped selection over the fused ranking, excluding seeds
//! 5. Uncapped backfill when the cap leaves slots empty

use crate::catalog::{Catalog, RatingTable};
use crate::collaborative::CollaborativeRecommender;
use crate::config::HybridConfig;
use crate::content_based::ContentBasedRecommender;
use crate::diversity::{genre_cap, select_diverse};
use crate::popularity::PopularityRecommender;
use crate::types::{FusionWeights, HybridOutcome, HybridRequest, RecommendationSource, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Ranked titles produced by one source
#[derive(Debug, Clone, PartialEq)]
pub struct RankedList {
    pub source: RecommendationSource,
    pub weight: f64,
    pub titles: Vec<String>,
}

/// A title with its fused score
#[derive(Debug, Clone, PartialEq)]
pub struct FusedCandidate {
    pub title: String,
    pub score: f64,
}

/// Candidate lists gathered for one request
#[derive(Debug, Clone)]
pub struct CandidatePool {
    pub weights: FusionWeights,
    pub lists: Vec<RankedList>,
}

impl CandidatePool {
    pub fn list(&self, source: RecommendationSource) -> Option<&RankedList> {
        self.lists.iter().find(|list| list.source == source)
    }
}

/// Weighted reciprocal-rank fusion.
///
/// Returns candidates by fused score, highest first. Equal scores keep the
/// order in which titles were first seen across the lists.
pub fn fuse(lists: &[RankedList]) -> Vec<FusedCandidate> {
    let mut position: HashMap<&str, usize> = HashMap::new();
    let mut fused: Vec<FusedCandidate> = Vec::new();

    for list in lists {
        for (rank, title) in list.titles.iter().enumerate() {
            let score = list.weight / (rank + 1) as f64;
            match position.get(title.as_str()) {
                Some(&idx) => fused[idx].score += score,
                None => {
                    position.insert(title.as_str(), fused.len());
                    fused.push(FusedCandidate {
                        title: title.clone(),
                        score,
                    });
                }
            }
        }
    }

    fused.sort_by(|a, b| b.score.total_cmp(&a.score));
    fused
}

/// Orchestrates the three sub-recommenders. A missing source is treated
/// as a zero-weight source.
pub struct HybridRecommender {
    catalog: Arc<Catalog>,
    ratings: Arc<RatingTable>,
    content: Option<Arc<ContentBasedRecommender>>,
    collaborative: Option<Arc<CollaborativeRecommender>>,
    popularity: Option<Arc<PopularityRecommender>>,
    config: HybridConfig,
}

impl HybridRecommender {
    pub fn new(catalog: Arc<Catalog>, ratings: Arc<RatingTable>, config: HybridConfig) -> Self {
        Self {
            catalog,
            ratings,
            content: None,
            collaborative: None,
            popularity: None,
            config,
        }
    }

    pub fn with_content(mut self, model: Arc<ContentBasedRecommender>) -> Self {
        self.content = Some(model);
        self
    }

    pub fn with_collaborative(mut self, model: Arc<CollaborativeRecommender>) -> Self {
        self.collaborative = Some(model);
        self
    }

    pub fn with_popularity(mut self, model: Arc<PopularityRecommender>) -> Self {
        self.popularity = Some(model);
        self
    }

    /// Up to `n` titles fused from all sources
    pub fn recommend<S: AsRef<str>>(
        &self,
        seed_titles: &[S],
        user_id: Option<UserId>,
        n: usize,
    ) -> Vec<String> {
        let request = HybridRequest::new(
            seed_titles.iter().map(|t| t.as_ref().to_string()).collect(),
            user_id,
            n,
        );
        self.recommend_detailed(&request).titles
    }

    #[instrument(skip_all, fields(seeds = request.seed_titles.len(), user_id = ?request.user_id, n = request.n))]
    pub fn recommend_detailed(&self, request: &HybridRequest) -> HybridOutcome {
        if request.n == 0 {
            return HybridOutcome::empty(self.effective_weights(request));
        }

        let pool = self.gather(request);
        let fused = fuse(&pool.lists);

        let excluded: HashSet<&str> = request.seed_titles.iter().map(String::as_str).collect();
        let ranked: Vec<&str> = fused.iter().map(|c| c.title.as_str()).collect();
        let cap = genre_cap(request.n, self.config.min_genre_cap);
        let selection = select_diverse(&ranked, &excluded, request.n, cap, &self.catalog);

        debug!(
            candidates = fused.len(),
            returned = selection.titles.len(),
            backfilled = selection.backfilled,
            genre_cap = cap,
            "Hybrid recommendations"
        );

        HybridOutcome {
            titles: selection.titles,
            weights: pool.weights,
            backfilled: selection.backfilled,
        }
    }

    /// Ratings contributed by the requesting user
    pub fn rating_count(&self, request: &HybridRequest) -> usize {
        request
            .rating_count
            .or_else(|| request.user_id.map(|user| self.ratings.rating_count(user)))
            .unwrap_or(0)
    }

    /// Policy weights with unavailable sources forced to zero
    pub fn effective_weights(&self, request: &HybridRequest) -> FusionWeights {
        let mut weights = self
            .config
            .weights
            .weights_for(self.rating_count(request));
        if self.content.is_none() {
            weights.content = 0.0;
        }
        if self.collaborative.is_none() || request.user_id.is_none() {
            weights.collaborative = 0.0;
        }
        if self.popularity.is_none() {
            weights.popularity = 0.0;
        }
        weights
    }

    /// Ranked lists from every source with a positive weight
    pub fn gather(&self, request: &HybridRequest) -> CandidatePool {
        let weights = self.effective_weights(request);
        let pool_size = request.n.saturating_mul(self.config.pool_multiplier);
        let mut lists = Vec::with_capacity(3);

        if weights.content > 0.0 {
            if let Some(model) = &self.content {
                lists.push(RankedList {
                    source: RecommendationSource::Content,
                    weight: weights.content,
                    titles: model.recommend(&request.seed_titles, pool_size),
                });
            }
        }

        if weights.collaborative > 0.0 {
            if let (Some(model), Some(user_id)) = (&self.collaborative, request.user_id) {
                lists.push(RankedList {
                    source: RecommendationSource::Collaborative,
                    weight: weights.collaborative,
                    titles: model.recommend(user_id, pool_size),
                });
            }
        }

        if weights.popularity > 0.0 {
            if let Some(model) = &self.popularity {
                lists.push(RankedList {
                    source: RecommendationSource::Popularity,
                    weight: weights.popularity,
                    titles: model.recommend(pool_size),
                });
            }
        }

        for list in &lists {
            debug!(
                source = %list.source,
                weight = list.weight,
                candidates = list.titles.len(),
                "Gathered candidates"
            );
        }

        CandidatePool { weights, lists }
    }
}
