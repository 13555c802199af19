//! Engine configuration
//!
//! Values are layered: defaults < `config/recommender.{toml,yaml,json}` <
//! `MAVERICK__*` environment variables (after `.env` is loaded).
//!
//! ```bash
//! export MAVERICK__CONTENT__MIN_DF=1
//! export MAVERICK__HYBRID__POOL_MULTIPLIER=4
//! export MAVERICK__LOGGING__FORMAT=pretty
//! ```

use crate::error::{RecommenderError, Result};
use crate::types::FusionWeights;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level engine configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct EngineConfig {
    pub data: DataConfig,
    pub logging: LoggingConfig,
    pub popularity: PopularityConfig,
    pub content: ContentConfig,
    pub collaborative: CollaborativeConfig,
    pub hybrid: HybridConfig,
    pub evaluation: EvaluationConfig,
}

/// Snapshot locations
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DataConfig {
    pub movies_path: PathBuf,
    pub ratings_path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            movies_path: PathBuf::from("data/movies.csv"),
            ratings_path: PathBuf::from("data/ratings.csv"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Json,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct PopularityConfig {
    /// Vote-count quantile used as the qualification threshold `m`
    pub vote_count_quantile: f64,
}

impl Default for PopularityConfig {
    fn default() -> Self {
        Self {
            vote_count_quantile: 0.9,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ContentConfig {
    /// Repetitions of the genre tokens in the feature soup
    pub genre_boost: usize,
    pub min_df: usize,
    pub max_features: usize,
    /// Largest n-gram size (1 = unigrams only)
    pub ngram_max: usize,
    /// Token substituted for every soup when the whole corpus is empty
    pub placeholder_token: String,
}

impl Default for ContentConfig {
    fn default() -> Self {
        Self {
            genre_boost: 3,
            min_df: 2,
            max_features: 15_000,
            ngram_max: 2,
            placeholder_token: "movie".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CollaborativeConfig {
    /// Upper bound on latent dimensions; also clamped to `user_count - 1`
    pub max_components: usize,
    /// Ratings at or above this value seed the user's query
    pub high_rating_threshold: f32,
    pub oversamples: usize,
    pub power_iterations: usize,
    pub seed: u64,
}

impl Default for CollaborativeConfig {
    fn default() -> Self {
        Self {
            max_components: 20,
            high_rating_threshold: 4.0,
            oversamples: 10,
            power_iterations: 5,
            seed: 42,
        }
    }
}

/// Rating-count to fusion-weight table
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WeightPolicy {
    /// Minimum ratings for the seasoned regime
    pub seasoned_min_ratings: usize,
    pub seasoned: FusionWeights,
    /// Weights for users with at least one rating
    pub sparse: FusionWeights,
    pub cold_start: FusionWeights,
}

impl Default for WeightPolicy {
    fn default() -> Self {
        Self {
            seasoned_min_ratings: 10,
            seasoned: FusionWeights::new(1.2, 1.4, 0.3),
            sparse: FusionWeights::new(1.4, 0.8, 0.4),
            cold_start: FusionWeights::new(1.5, 0.0, 0.6),
        }
    }
}

impl WeightPolicy {
    /// Fusion weights for a user who has contributed `rating_count` ratings
    pub fn weights_for(&self, rating_count: usize) -> FusionWeights {
        if rating_count >= self.seasoned_min_ratings {
            self.seasoned
        } else if rating_count >= 1 {
            self.sparse
        } else {
            self.cold_start
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HybridConfig {
    /// Each enabled source is asked for `pool_multiplier * n` candidates
    pub pool_multiplier: usize,
    /// Genre cap floor; the cap is `max(min_genre_cap, n / 2)`
    pub min_genre_cap: usize,
    pub weights: WeightPolicy,
}

impl Default for HybridConfig {
    fn default() -> Self {
        Self {
            pool_multiplier: 3,
            min_genre_cap: 2,
            weights: WeightPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EvaluationConfig {
    pub min_user_ratings: usize,
    pub max_users: usize,
}

impl Default for EvaluationConfig {
    fn default() -> Self {
        Self {
            min_user_ratings: 5,
            max_users: 100,
        }
    }
}

impl EngineConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self> {
        Self::load_from("config/recommender")
    }

    pub fn load_from(file: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(file).required(false))
            .add_source(
                config::Environment::with_prefix("MAVERICK")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let quantile = self.popularity.vote_count_quantile;
        if !(0.0..=1.0).contains(&quantile) {
            return Err(RecommenderError::configuration(
                format!("vote_count_quantile must be within [0, 1], got {quantile}"),
                "popularity.vote_count_quantile",
            ));
        }

        if self.content.min_df == 0 {
            return Err(RecommenderError::configuration(
                "min_df must be greater than 0",
                "content.min_df",
            ));
        }

        if self.content.max_features == 0 {
            return Err(RecommenderError::configuration(
                "max_features must be greater than 0",
                "content.max_features",
            ));
        }

        if !(1..=3).contains(&self.content.ngram_max) {
            return Err(RecommenderError::configuration(
                format!("ngram_max must be 1, 2 or 3, got {}", self.content.ngram_max),
                "content.ngram_max",
            ));
        }

        if self.content.placeholder_token.trim().chars().count() < 2 {
            return Err(RecommenderError::configuration(
                "placeholder_token must contain at least two characters",
                "content.placeholder_token",
            ));
        }

        if self.collaborative.max_components == 0 {
            return Err(RecommenderError::configuration(
                "max_components must be greater than 0",
                "collaborative.max_components",
            ));
        }

        if self.hybrid.pool_multiplier == 0 {
            return Err(RecommenderError::configuration(
                "pool_multiplier must be greater than 0",
                "hybrid.pool_multiplier",
            ));
        }

        let policy = &self.hybrid.weights;
        for (name, weights) in [
            ("seasoned", policy.seasoned),
            ("sparse", policy.sparse),
            ("cold_start", policy.cold_start),
        ] {
            let all = [weights.content, weights.collaborative, weights.popularity];
            if all.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(RecommenderError::configuration(
                    format!("{name} weights must be finite and non-negative"),
                    format!("hybrid.weights.{name}"),
                ));
            }
        }

        if policy.seasoned_min_ratings == 0 {
            return Err(RecommenderError::configuration(
                "seasoned_min_ratings must be greater than 0",
                "hybrid.weights.seasoned_min_ratings",
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.content.max_features, 15_000);
        assert_eq!(config.collaborative.max_components, 20);
        assert_eq!(config.hybrid.pool_multiplier, 3);
    }

    #[test]
    fn test_weight_policy_regimes() {
        let policy = WeightPolicy::default();

        assert_eq!(policy.weights_for(0), FusionWeights::new(1.5, 0.0, 0.6));
        assert_eq!(policy.weights_for(1), FusionWeights::new(1.4, 0.8, 0.4));
        assert_eq!(policy.weights_for(9), FusionWeights::new(1.4, 0.8, 0.4));
        assert_eq!(policy.weights_for(10), FusionWeights::new(1.2, 1.4, 0.3));
        assert_eq!(policy.weights_for(500), FusionWeights::new(1.2, 1.4, 0.3));
    }

    #[test]
    fn test_invalid_quantile_rejected() {
        let mut config = EngineConfig::default();
        config.popularity.vote_count_quantile = 1.5;
        let err = config.validate().unwrap_err();
        match err {
            RecommenderError::Configuration { key, .. } => {
                assert_eq!(key.as_deref(), Some("popularity.vote_count_quantile"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_negative_weight_rejected() {
        let mut config = EngineConfig::default();
        config.hybrid.weights.sparse.popularity = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_min_df_rejected() {
        let mut config = EngineConfig::default();
        config.content.min_df = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_load_without_file_uses_defaults() {
        let config = EngineConfig::load_from("config/does-not-exist").unwrap();
        assert_eq!(config.popularity.vote_count_quantile, 0.9);
        assert_eq!(config.content.placeholder_token, "movie");
    }
}
