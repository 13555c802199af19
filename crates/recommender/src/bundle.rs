//! Trained model bundle
//!
//! Built once at startup and shared by reference with request handlers.
//! Everything inside is read-only after training, so the bundle is
//! `Send + Sync` and needs no locking.

use crate::catalog::{load_catalog_csv, load_ratings_csv, Catalog, RatingTable};
use crate::collaborative::CollaborativeRecommender;
use crate::config::EngineConfig;
use crate::content_based::ContentBasedRecommender;
use crate::error::Result;
use crate::hybrid::HybridRecommender;
use crate::popularity::PopularityRecommender;
use crate::types::{HybridOutcome, HybridRequest};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument};

pub struct ModelBundle {
    catalog: Arc<Catalog>,
    ratings: Arc<RatingTable>,
    popularity: Arc<PopularityRecommender>,
    content: Arc<ContentBasedRecommender>,
    collaborative: Arc<CollaborativeRecommender>,
    hybrid: HybridRecommender,
}

impl ModelBundle {
    /// Train every recommender against one snapshot
    #[instrument(skip_all, fields(items = catalog.len(), ratings = ratings.len()))]
    pub fn train(catalog: Catalog, ratings: RatingTable, config: &EngineConfig) -> Self {
        let started = Instant::now();
        let catalog = Arc::new(catalog);
        let ratings = Arc::new(ratings);

        let popularity = Arc::new(PopularityRecommender::train(
            Arc::clone(&catalog),
            &ratings,
            &config.popularity,
        ));
        let content = Arc::new(ContentBasedRecommender::train(
            Arc::clone(&catalog),
            &config.content,
        ));
        let collaborative = Arc::new(CollaborativeRecommender::train(
            Arc::clone(&catalog),
            Arc::clone(&ratings),
            &config.collaborative,
        ));

        let hybrid = HybridRecommender::new(
            Arc::clone(&catalog),
            Arc::clone(&ratings),
            config.hybrid.clone(),
        )
        .with_content(Arc::clone(&content))
        .with_collaborative(Arc::clone(&collaborative))
        .with_popularity(Arc::clone(&popularity));

        info!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Model bundle trained"
        );

        Self {
            catalog,
            ratings,
            popularity,
            content,
            collaborative,
            hybrid,
        }
    }

    /// Load the CSV snapshots named in `config.data` and train
    pub fn load(config: &EngineConfig) -> Result<Self> {
        let catalog = load_catalog_csv(&config.data.movies_path)?;
        let ratings = load_ratings_csv(&config.data.ratings_path)?;
        Ok(Self::train(catalog, ratings, config))
    }

    pub fn recommend(&self, request: &HybridRequest) -> HybridOutcome {
        self.hybrid.recommend_detailed(request)
    }

    pub fn catalog(&self) -> &Arc<Catalog> {
        &self.catalog
    }

    pub fn ratings(&self) -> &Arc<RatingTable> {
        &self.ratings
    }

    pub fn popularity(&self) -> &PopularityRecommender {
        &self.popularity
    }

    pub fn content(&self) -> &ContentBasedRecommender {
        &self.content
    }

    pub fn collaborative(&self) -> &CollaborativeRecommender {
        &self.collaborative
    }

    pub fn hybrid(&self) -> &HybridRecommender {
        &self.hybrid
    }
}
