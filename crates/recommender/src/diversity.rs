//! Genre-capped selection over a fused ranking
//!
//! Walks candidates in score order and skips any whose primary genre has
//! already filled `max(min_cap, n / 2)` slots. When that cannot fill `n`
//! slots the uncapped ranking backfills the rest, and the outcome says so.

use crate::catalog::Catalog;
use std::collections::{HashMap, HashSet};

/// Result of a diversity pass
#[derive(Debug, Clone, PartialEq)]
pub struct DiverseSelection {
    pub titles: Vec<String>,
    /// Set when at least one title came from the uncapped backfill
    pub backfilled: bool,
}

/// Per-genre slot limit for a result of size `n`
pub fn genre_cap(n: usize, min_cap: usize) -> usize {
    min_cap.max(n / 2)
}

/// Select up to `n` titles from `ranked` (highest score first), skipping
/// `excluded` titles and honouring the per-genre cap. Items without a
/// genre are never capped.
pub fn select_diverse<S: AsRef<str>>(
    ranked: &[S],
    excluded: &HashSet<&str>,
    n: usize,
    cap: usize,
    catalog: &Catalog,
) -> DiverseSelection {
    let mut titles: Vec<String> = Vec::with_capacity(n.min(ranked.len()));
    let mut chosen: HashSet<&str> = HashSet::new();
    let mut genre_counts: HashMap<&str, usize> = HashMap::new();

    for title in ranked.iter().map(AsRef::as_ref) {
        if titles.len() >= n {
            break;
        }
        if excluded.contains(title) || chosen.contains(title) {
            continue;
        }

        let genre = catalog.primary_genre_of(title);
        let count = genre_counts.entry(genre).or_insert(0);
        if !genre.is_empty() && *count >= cap {
            continue;
        }
        *count += 1;

        chosen.insert(title);
        titles.push(title.to_string());
    }

    let mut backfilled = false;
    if titles.len() < n {
        for title in ranked.iter().map(AsRef::as_ref) {
            if titles.len() >= n {
                break;
            }
            if excluded.contains(title) || chosen.contains(title) {
                continue;
            }
            chosen.insert(title);
            titles.push(title.to_string());
            backfilled = true;
        }
    }

    DiverseSelection { titles, backfilled }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;

    fn catalog() -> Catalog {
        Catalog::new(vec![
            Item::new(1, "A1", "Action"),
            Item::new(2, "A2", "Action|Drama"),
            Item::new(3, "A3", "Action"),
            Item::new(4, "A4", "Action"),
            Item::new(5, "D1", "Drama"),
            Item::new(6, "C1", "Comedy"),
            Item::new(7, "X1", ""),
            Item::new(8, "X2", ""),
            Item::new(9, "X3", ""),
        ])
    }

    #[test]
    fn test_genre_cap() {
        assert_eq!(genre_cap(1, 2), 2);
        assert_eq!(genre_cap(4, 2), 2);
        assert_eq!(genre_cap(5, 2), 2);
        assert_eq!(genre_cap(10, 2), 5);
    }

    #[test]
    fn test_cap_skips_dominant_genre() {
        let ranked = ["A1", "A2", "A3", "D1", "A4", "C1"];
        let selection = select_diverse(&ranked, &HashSet::new(), 4, 2, &catalog());

        assert_eq!(selection.titles, vec!["A1", "A2", "D1", "C1"]);
        assert!(!selection.backfilled);
    }

    #[test]
    fn test_backfill_when_cap_starves_selection() {
        let ranked = ["A1", "A2", "A3", "A4", "D1"];
        let selection = select_diverse(&ranked, &HashSet::new(), 4, 2, &catalog());

        assert_eq!(selection.titles, vec!["A1", "A2", "D1", "A3"]);
        assert!(selection.backfilled);
    }

    #[test]
    fn test_excluded_and_duplicate_titles_skipped() {
        let ranked = ["A1", "D1", "A1", "C1", "A2"];
        let excluded = HashSet::from(["D1"]);
        let selection = select_diverse(&ranked, &excluded, 10, 2, &catalog());

        assert_eq!(selection.titles, vec!["A1", "C1", "A2"]);
        assert!(!selection.backfilled);
    }

    #[test]
    fn test_items_without_genre_are_uncapped() {
        let ranked = ["X1", "X2", "X3"];
        let selection = select_diverse(&ranked, &HashSet::new(), 3, 2, &catalog());

        assert_eq!(selection.titles, vec!["X1", "X2", "X3"]);
        assert!(!selection.backfilled);
    }

    #[test]
    fn test_huge_n_takes_every_candidate() {
        let ranked = ["A1", "A2", "D1"];
        let selection = select_diverse(
            &ranked,
            &HashSet::new(),
            usize::MAX,
            genre_cap(usize::MAX, 2),
            &catalog(),
        );

        assert_eq!(selection.titles, vec!["A1", "A2", "D1"]);
        assert!(!selection.backfilled);
    }

    #[test]
    fn test_zero_n() {
        let selection = select_diverse(&["A1"], &HashSet::new(), 0, 2, &catalog());
        assert!(selection.titles.is_empty());
        assert!(!selection.backfilled);
    }
}
