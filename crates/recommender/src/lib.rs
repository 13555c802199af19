//! Maverick Recommendation Engine
//!
//! Fuses popularity, content similarity and collaborative co-rating
//! signals into a single ranked list of movie titles. All models are
//! trained once from a catalog and rating snapshot and are read-only
//! afterwards.

pub mod bundle;
pub mod catalog;
pub mod collaborative;
pub mod config;
pub mod content_based;
pub mod diversity;
pub mod error;
pub mod evaluation;
pub mod hybrid;
pub mod linalg;
pub mod logging;
pub mod popularity;
pub mod text;
pub mod types;

// Re-export key types
pub use bundle::ModelBundle;
pub use catalog::{
    load_catalog_csv, load_ratings_csv, read_catalog, read_ratings, Catalog, RatingTable,
};
pub use collaborative::CollaborativeRecommender;
pub use config::{EngineConfig, WeightPolicy};
pub use content_based::ContentBasedRecommender;
pub use diversity::{genre_cap, select_diverse, DiverseSelection};
pub use error::{RecommenderError, Result};
pub use evaluation::{leave_one_out, EvaluationReport};
pub use hybrid::{fuse, CandidatePool, FusedCandidate, HybridRecommender, RankedList};
pub use logging::init_logging;
pub use popularity::{PopularityRecommender, PopularityTable};
pub use types::*;
