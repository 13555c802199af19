//! Catalog and rating snapshots
//!
//! Both tables are loaded once at startup and never mutated afterwards.
//! Row order is the load order and is what the recommenders index by.

use crate::error::{RecommenderError, Result};
use crate::types::{Item, ItemId, Rating, UserId};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;
use tracing::{debug, info, warn};

/// Immutable table of recommendable items
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: Vec<Item>,
    by_title: HashMap<String, usize>,
    by_id: HashMap<ItemId, usize>,
}

impl Catalog {
    pub fn new(items: Vec<Item>) -> Self {
        let mut by_title = HashMap::with_capacity(items.len());
        let mut by_id = HashMap::with_capacity(items.len());

        for (idx, item) in items.iter().enumerate() {
            if by_title.contains_key(&item.title) {
                warn!(title = %item.title, row = idx, "Duplicate catalog title, keeping first");
            } else {
                by_title.insert(item.title.clone(), idx);
            }
            by_id.entry(item.id).or_insert(idx);
        }

        Self {
            items,
            by_title,
            by_id,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn index_of_title(&self, title: &str) -> Option<usize> {
        self.by_title.get(title).copied()
    }

    pub fn index_of_id(&self, id: ItemId) -> Option<usize> {
        self.by_id.get(&id).copied()
    }

    pub fn item_by_title(&self, title: &str) -> Option<&Item> {
        self.index_of_title(title).map(|idx| &self.items[idx])
    }

    pub fn item_by_id(&self, id: ItemId) -> Option<&Item> {
        self.index_of_id(id).map(|idx| &self.items[idx])
    }

    pub fn title_of_id(&self, id: ItemId) -> Option<&str> {
        self.item_by_id(id).map(|item| item.title.as_str())
    }

    /// Primary genre for a title, empty when the title is unknown or has no genre
    pub fn primary_genre_of(&self, title: &str) -> &str {
        self.item_by_title(title)
            .map(Item::primary_genre)
            .unwrap_or("")
    }
}

/// Immutable sparse table of rating observations
#[derive(Debug, Clone, Default)]
pub struct RatingTable {
    ratings: Vec<Rating>,
    by_user: HashMap<UserId, Vec<usize>>,
}

impl RatingTable {
    pub fn new(ratings: Vec<Rating>) -> Self {
        let mut by_user: HashMap<UserId, Vec<usize>> = HashMap::new();
        for (idx, rating) in ratings.iter().enumerate() {
            by_user.entry(rating.user_id).or_default().push(idx);
        }

        Self { ratings, by_user }
    }

    pub fn len(&self) -> usize {
        self.ratings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ratings.is_empty()
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// Ratings of one user in input order
    pub fn ratings_for(&self, user_id: UserId) -> impl Iterator<Item = &Rating> + '_ {
        self.by_user
            .get(&user_id)
            .into_iter()
            .flatten()
            .map(move |&idx| &self.ratings[idx])
    }

    pub fn rating_count(&self, user_id: UserId) -> usize {
        self.by_user.get(&user_id).map_or(0, Vec::len)
    }

    /// Distinct user ids in ascending order
    pub fn distinct_users(&self) -> Vec<UserId> {
        let users: BTreeSet<UserId> = self.by_user.keys().copied().collect();
        users.into_iter().collect()
    }

    /// Distinct item ids in ascending order
    pub fn distinct_items(&self) -> Vec<ItemId> {
        let items: BTreeSet<ItemId> = self.ratings.iter().map(|r| r.item_id).collect();
        items.into_iter().collect()
    }
}

#[derive(Debug, Deserialize)]
struct MovieRecord {
    #[serde(rename = "movieId")]
    id: ItemId,
    title: String,
    #[serde(default, alias = "genre")]
    genres: Option<String>,
    #[serde(default)]
    overview: Option<String>,
    #[serde(default)]
    keywords: Option<String>,
    #[serde(default)]
    director: Option<String>,
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    avg_rating: Option<f32>,
}

impl From<MovieRecord> for Item {
    fn from(record: MovieRecord) -> Self {
        let year = record.year.or_else(|| year_from_title(&record.title));
        Item {
            id: record.id,
            genres: record.genres.unwrap_or_default(),
            overview: record.overview,
            keywords: record.keywords,
            director: record.director,
            year,
            avg_rating: record.avg_rating,
            title: record.title,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatingRecord {
    #[serde(rename = "userId")]
    user_id: UserId,
    #[serde(rename = "movieId")]
    item_id: ItemId,
    rating: f32,
}

/// Extract a trailing `(YYYY)` release year from a title
pub fn year_from_title(title: &str) -> Option<i32> {
    let trimmed = title.trim_end();
    let inner = trimmed.strip_suffix(')')?;
    let open = inner.rfind('(')?;
    let digits = &inner[open + 1..];
    if digits.len() == 4 && digits.bytes().all(|b| b.is_ascii_digit()) {
        digits.parse().ok()
    } else {
        None
    }
}

/// Read a catalog from CSV with a `movieId,title[,genres,...]` header
pub fn read_catalog<R: Read>(reader: R) -> Result<Catalog> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut items = Vec::new();
    for record in csv_reader.deserialize::<MovieRecord>() {
        items.push(Item::from(record?));
    }

    debug!(items = items.len(), "Parsed catalog records");
    Ok(Catalog::new(items))
}

/// Read ratings from CSV with a `userId,movieId,rating[,timestamp]` header
pub fn read_ratings<R: Read>(reader: R) -> Result<RatingTable> {
    let mut csv_reader = csv::Reader::from_reader(reader);
    let mut ratings = Vec::new();
    for (row, record) in csv_reader.deserialize::<RatingRecord>().enumerate() {
        let record = record?;
        if !record.rating.is_finite() {
            return Err(RecommenderError::invalid_data(format!(
                "non-finite rating on row {} (user {}, movie {})",
                row + 1,
                record.user_id,
                record.item_id
            )));
        }
        ratings.push(Rating::new(record.user_id, record.item_id, record.rating));
    }

    debug!(ratings = ratings.len(), "Parsed rating records");
    Ok(RatingTable::new(ratings))
}

pub fn load_catalog_csv(path: impl AsRef<Path>) -> Result<Catalog> {
    let path = path.as_ref();
    let catalog = read_catalog(std::fs::File::open(path)?)?;
    info!(path = %path.display(), items = catalog.len(), "Loaded catalog");
    Ok(catalog)
}

pub fn load_ratings_csv(path: impl AsRef<Path>) -> Result<RatingTable> {
    let path = path.as_ref();
    let ratings = read_ratings(std::fs::File::open(path)?)?;
    info!(path = %path.display(), ratings = ratings.len(), "Loaded ratings");
    Ok(ratings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_year_from_title() {
        assert_eq!(year_from_title("Toy Story (1995)"), Some(1995));
        assert_eq!(year_from_title("Heat (1995) "), Some(1995));
        assert_eq!(year_from_title("Babylon 5"), None);
        assert_eq!(year_from_title("Movie (Director's Cut)"), None);
    }

    #[test]
    fn test_read_catalog_movielens_format() {
        let data = "movieId,title,genres\n\
                    1,Toy Story (1995),Adventure|Animation|Children\n\
                    2,Jumanji (1995),Adventure|Children|Fantasy\n";
        let catalog = read_catalog(data.as_bytes()).unwrap();

        assert_eq!(catalog.len(), 2);
        let toy_story = catalog.item_by_id(1).unwrap();
        assert_eq!(toy_story.year, Some(1995));
        assert_eq!(toy_story.primary_genre(), "Adventure");
        assert!(toy_story.overview.is_none());
        assert_eq!(catalog.index_of_title("Jumanji (1995)"), Some(1));
    }

    #[test]
    fn test_read_catalog_enriched_columns() {
        let data = "movieId,title,genre,overview,director,year\n\
                    7,Inception,\"Sci-Fi,Action\",A thief in dreams,Christopher Nolan,2010\n\
                    8,Titanic,Romance,,,\n";
        let catalog = read_catalog(data.as_bytes()).unwrap();

        let inception = catalog.item_by_title("Inception").unwrap();
        assert_eq!(inception.genres, "Sci-Fi,Action");
        assert_eq!(inception.director.as_deref(), Some("Christopher Nolan"));
        assert_eq!(inception.year, Some(2010));

        let titanic = catalog.item_by_title("Titanic").unwrap();
        assert!(titanic.overview.is_none());
        assert!(titanic.year.is_none());
    }

    #[test]
    fn test_duplicate_title_keeps_first() {
        let catalog = Catalog::new(vec![
            Item::new(1, "Solaris", "Drama"),
            Item::new(2, "Solaris", "Sci-Fi"),
        ]);
        assert_eq!(catalog.index_of_title("Solaris"), Some(0));
        assert_eq!(catalog.index_of_id(2), Some(1));
    }

    #[test]
    fn test_read_ratings_ignores_timestamp() {
        let data = "userId,movieId,rating,timestamp\n\
                    1,10,4.0,964982703\n\
                    1,11,3.5,964981247\n\
                    2,10,5.0,964982224\n";
        let table = read_ratings(data.as_bytes()).unwrap();

        assert_eq!(table.len(), 3);
        assert_eq!(table.rating_count(1), 2);
        assert_eq!(table.rating_count(3), 0);
        assert_eq!(table.distinct_users(), vec![1, 2]);
        assert_eq!(table.distinct_items(), vec![10, 11]);

        let user1: Vec<ItemId> = table.ratings_for(1).map(|r| r.item_id).collect();
        assert_eq!(user1, vec![10, 11]);
    }

    #[test]
    fn test_read_ratings_rejects_nan() {
        let data = "userId,movieId,rating\n1,10,NaN\n";
        let err = read_ratings(data.as_bytes()).unwrap_err();
        assert!(matches!(err, RecommenderError::InvalidData { .. }));
    }

    #[test]
    fn test_read_ratings_malformed_row() {
        let data = "userId,movieId,rating\n1,ten,4.0\n";
        let err = read_ratings(data.as_bytes()).unwrap_err();
        assert!(matches!(err, RecommenderError::Csv(_)));
    }
}
