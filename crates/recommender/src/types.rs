//! Core types shared by the recommenders

use serde::{Deserialize, Serialize};
use std::fmt;

pub type ItemId = u32;
pub type UserId = u32;

/// Catalog item with static metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub title: String,
    /// Multi-value genre field, pipe- or comma-delimited
    pub genres: String,
    pub overview: Option<String>,
    pub keywords: Option<String>,
    pub director: Option<String>,
    pub year: Option<i32>,
    pub avg_rating: Option<f32>,
}

impl Item {
    pub fn new(id: ItemId, title: impl Into<String>, genres: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            genres: genres.into(),
            overview: None,
            keywords: None,
            director: None,
            year: None,
            avg_rating: None,
        }
    }

    pub fn with_overview(mut self, overview: impl Into<String>) -> Self {
        self.overview = Some(overview.into());
        self
    }

    pub fn with_keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn with_director(mut self, director: impl Into<String>) -> Self {
        self.director = Some(director.into());
        self
    }

    pub fn with_year(mut self, year: i32) -> Self {
        self.year = Some(year);
        self
    }

    /// Genre tokens split on `|` and `,`
    pub fn genre_tokens(&self) -> Vec<&str> {
        split_multi_value(&self.genres)
    }

    /// First genre token, or an empty string for items without genres
    pub fn primary_genre(&self) -> &str {
        self.genres
            .split('|')
            .next()
            .and_then(|g| g.split(',').next())
            .map(str::trim)
            .unwrap_or("")
    }
}

/// Split a pipe- or comma-delimited field into trimmed, non-empty tokens
pub fn split_multi_value(value: &str) -> Vec<&str> {
    value
        .split(|c| c == '|' || c == ',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect()
}

/// A single (user, item, rating) observation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub rating: f32,
}

impl Rating {
    pub fn new(user_id: UserId, item_id: ItemId, rating: f32) -> Self {
        Self {
            user_id,
            item_id,
            rating,
        }
    }
}

/// Signal source feeding the hybrid fusion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationSource {
    Content,
    Collaborative,
    Popularity,
}

impl fmt::Display for RecommendationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecommendationSource::Content => write!(f, "content"),
            RecommendationSource::Collaborative => write!(f, "collaborative"),
            RecommendationSource::Popularity => write!(f, "popularity"),
        }
    }
}

/// Per-source weights used by reciprocal-rank fusion
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FusionWeights {
    pub content: f64,
    pub collaborative: f64,
    pub popularity: f64,
}

impl FusionWeights {
    pub fn new(content: f64, collaborative: f64, popularity: f64) -> Self {
        Self {
            content,
            collaborative,
            popularity,
        }
    }

    pub fn weight_of(&self, source: RecommendationSource) -> f64 {
        match source {
            RecommendationSource::Content => self.content,
            RecommendationSource::Collaborative => self.collaborative,
            RecommendationSource::Popularity => self.popularity,
        }
    }
}

/// Input of a hybrid recommendation call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HybridRequest {
    pub seed_titles: Vec<String>,
    /// `None` denotes an anonymous user
    pub user_id: Option<UserId>,
    pub n: usize,
    /// Ratings the user has contributed, when the caller already knows it
    pub rating_count: Option<usize>,
}

impl HybridRequest {
    pub fn new(seed_titles: Vec<String>, user_id: Option<UserId>, n: usize) -> Self {
        Self {
            seed_titles,
            user_id,
            n,
            rating_count: None,
        }
    }

    pub fn with_rating_count(mut self, count: usize) -> Self {
        self.rating_count = Some(count);
        self
    }
}

/// Result of a hybrid recommendation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridOutcome {
    pub titles: Vec<String>,
    pub weights: FusionWeights,
    /// Set when the genre cap could not fill `n` slots and the
    /// uncapped fused ranking was used to backfill
    pub backfilled: bool,
}

impl HybridOutcome {
    pub fn empty(weights: FusionWeights) -> Self {
        Self {
            titles: Vec::new(),
            weights,
            backfilled: false,
        }
    }
}
