//! TF-IDF vectorization of item feature soups
//!
//! Tokens are lowercase runs of two or more word characters with English
//! stop words removed. N-grams are built from the filtered token stream.
//! Weights are raw counts times the smoothed idf `ln((1 + N) / (1 + df)) + 1`,
//! and every row is L2-normalized.

use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// Sparse row as `(column, weight)` pairs sorted by column
pub type SparseRow = Vec<(usize, f64)>;

/// English stop words (scikit-learn list)
const ENGLISH_STOP_WORDS: &[&str] = &[
    "a", "about", "above", "across", "after", "afterwards", "again", "against", "all", "almost",
    "alone", "along", "already", "also", "although", "always", "am", "among", "amongst",
    "amoungst", "amount", "an", "and", "another", "any", "anyhow", "anyone", "anything", "anyway",
    "anywhere", "are", "around", "as", "at", "back", "be", "became", "because", "become",
    "becomes", "becoming", "been", "before", "beforehand", "behind", "being", "below", "beside",
    "besides", "between", "beyond", "bill", "both", "bottom", "but", "by", "call", "can",
    "cannot", "cant", "co", "con", "could", "couldnt", "cry", "de", "describe", "detail", "do",
    "done", "down", "due", "during", "each", "eg", "eight", "either", "eleven", "else",
    "elsewhere", "empty", "enough", "etc", "even", "ever", "every", "everyone", "everything",
    "everywhere", "except", "few", "fifteen", "fifty", "fill", "find", "fire", "first", "five",
    "for", "former", "formerly", "forty", "found", "four", "from", "front", "full", "further",
    "get", "give", "go", "had", "has", "hasnt", "have", "he", "hence", "her", "here",
    "hereafter", "hereby", "herein", "hereupon", "hers", "herself", "him", "himself", "his",
    "how", "however", "hundred", "i", "ie", "if", "in", "inc", "indeed", "interest", "into",
    "is", "it", "its", "itself", "keep", "last", "latter", "latterly", "least", "less", "ltd",
    "made", "many", "may", "me", "meanwhile", "might", "mill", "mine", "more", "moreover",
    "most", "mostly", "move", "much", "must", "my", "myself", "name", "namely", "neither",
    "never", "nevertheless", "next", "nine", "no", "nobody", "none", "noone", "nor", "not",
    "nothing", "now", "nowhere", "of", "off", "often", "on", "once", "one", "only", "onto", "or",
    "other", "others", "otherwise", "our", "ours", "ourselves", "out", "over", "own", "part",
    "per", "perhaps", "please", "put", "rather", "re", "same", "see", "seem", "seemed",
    "seeming", "seems", "serious", "several", "she", "should", "show", "side", "since",
    "sincere", "six", "sixty", "so", "some", "somehow", "someone", "something", "sometime",
    "sometimes", "somewhere", "still", "such", "system", "take", "ten", "than", "that", "the",
    "their", "them", "themselves", "then", "thence", "there", "thereafter", "thereby",
    "therefore", "therein", "thereupon", "these", "they", "thick", "thin", "third", "this",
    "those", "though", "three", "through", "throughout", "thru", "thus", "to", "together", "too",
    "top", "toward", "towards", "twelve", "twenty", "two", "un", "under", "until", "up", "upon",
    "us", "very", "via", "was", "we", "well", "were", "what", "whatever", "when", "whence",
    "whenever", "where", "whereafter", "whereas", "whereby", "wherein", "whereupon", "wherever",
    "whether", "which", "while", "whither", "who", "whoever", "whole", "whom", "whose", "why",
    "will", "with", "within", "without", "would", "yet", "you", "your", "yours", "yourself",
    "yourselves",
];

/// Vectorizer parameters
#[derive(Debug, Clone)]
pub struct VectorizerParams {
    pub min_df: usize,
    pub max_features: usize,
    pub ngram_max: usize,
}

impl Default for VectorizerParams {
    fn default() -> Self {
        Self {
            min_df: 2,
            max_features: 15_000,
            ngram_max: 2,
        }
    }
}

/// Fitted TF-IDF vectorizer
#[derive(Debug, Clone, Default)]
pub struct TfidfVectorizer {
    params: VectorizerParams,
    vocabulary: HashMap<String, usize>,
    terms: Vec<String>,
    idf: Vec<f64>,
}

/// Row-per-document TF-IDF weights
#[derive(Debug, Clone, Default)]
pub struct TfidfMatrix {
    rows: Vec<SparseRow>,
    n_features: usize,
}

impl TfidfMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn row(&self, index: usize) -> Option<&SparseRow> {
        self.rows.get(index)
    }

    pub fn rows(&self) -> &[SparseRow] {
        &self.rows
    }

    /// Element-wise mean of the given rows as a dense vector
    pub fn mean_of_rows(&self, indices: &[usize]) -> Vec<f64> {
        let mut mean = vec![0.0; self.n_features];
        let mut used = 0usize;
        for row in indices.iter().filter_map(|&i| self.rows.get(i)) {
            for &(col, weight) in row {
                mean[col] += weight;
            }
            used += 1;
        }
        if used > 0 {
            let scale = used as f64;
            mean.iter_mut().for_each(|w| *w /= scale);
        }
        mean
    }
}

impl TfidfVectorizer {
    pub fn new(params: VectorizerParams) -> Self {
        Self {
            params,
            ..Default::default()
        }
    }

    pub fn vocabulary_size(&self) -> usize {
        self.terms.len()
    }

    /// Column of a term, if it survived pruning
    pub fn column_of(&self, term: &str) -> Option<usize> {
        self.vocabulary.get(term).copied()
    }

    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    /// Fit the vocabulary and idf over `documents` and return their weights
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> TfidfMatrix {
        let analyzed: Vec<Vec<String>> = documents
            .iter()
            .map(|doc| analyze(doc.as_ref(), self.params.ngram_max))
            .collect();

        let mut document_frequency: HashMap<&str, usize> = HashMap::new();
        for terms in &analyzed {
            let unique: HashSet<&str> = terms.iter().map(String::as_str).collect();
            for term in unique {
                *document_frequency.entry(term).or_insert(0) += 1;
            }
        }

        let mut kept = prune(&document_frequency, self.params.min_df, self.params.max_features);
        if kept.is_empty() && !document_frequency.is_empty() {
            warn!(
                min_df = self.params.min_df,
                distinct_terms = document_frequency.len(),
                "No term reached min_df, refitting with min_df = 1"
            );
            kept = prune(&document_frequency, 1, self.params.max_features);
        }

        kept.sort_unstable();
        let n_docs = documents.len() as f64;
        self.idf = kept
            .iter()
            .map(|term| {
                let df = document_frequency[term] as f64;
                ((1.0 + n_docs) / (1.0 + df)).ln() + 1.0
            })
            .collect();
        self.terms = kept.into_iter().map(str::to_string).collect();
        self.vocabulary = self
            .terms
            .iter()
            .enumerate()
            .map(|(col, term)| (term.clone(), col))
            .collect();

        debug!(
            documents = documents.len(),
            vocabulary = self.terms.len(),
            "Fitted TF-IDF vocabulary"
        );

        let rows = analyzed.iter().map(|terms| self.weigh(terms)).collect();
        TfidfMatrix {
            rows,
            n_features: self.terms.len(),
        }
    }

    /// Weights of an unseen document against the fitted vocabulary
    pub fn transform(&self, document: &str) -> SparseRow {
        self.weigh(&analyze(document, self.params.ngram_max))
    }

    fn weigh(&self, terms: &[String]) -> SparseRow {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for term in terms {
            if let Some(&col) = self.vocabulary.get(term) {
                *counts.entry(col).or_insert(0.0) += 1.0;
            }
        }

        let mut row: SparseRow = counts
            .into_iter()
            .map(|(col, count)| (col, count * self.idf[col]))
            .collect();
        row.sort_unstable_by_key(|&(col, _)| col);

        let norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();
        if norm > 0.0 {
            row.iter_mut().for_each(|(_, w)| *w /= norm);
        }
        row
    }
}

/// Terms with `df >= min_df`, capped to the `max_features` most frequent
fn prune<'a>(
    document_frequency: &HashMap<&'a str, usize>,
    min_df: usize,
    max_features: usize,
) -> Vec<&'a str> {
    let mut kept: Vec<(&str, usize)> = document_frequency
        .iter()
        .filter(|(_, &df)| df >= min_df)
        .map(|(&term, &df)| (term, df))
        .collect();

    if kept.len() > max_features {
        kept.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        kept.truncate(max_features);
    }
    kept.into_iter().map(|(term, _)| term).collect()
}

/// Lowercased word tokens of at least two characters, stop words removed
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|token| token.chars().count() >= 2)
        .filter(|token| !is_stop_word(token))
        .map(str::to_string)
        .collect()
}

pub fn is_stop_word(token: &str) -> bool {
    ENGLISH_STOP_WORDS.binary_search(&token).is_ok()
}

/// Unigrams through `ngram_max`-grams of the filtered token stream
fn analyze(text: &str, ngram_max: usize) -> Vec<String> {
    let tokens = tokenize(text);
    let mut terms = tokens.clone();
    for n in 2..=ngram_max.max(1) {
        terms.extend(tokens.windows(n).map(|window| window.join(" ")));
    }
    terms
}

/// Cosine similarity between a dense query and a sparse row
pub fn cosine_similarity(query: &[f64], row: &SparseRow) -> f64 {
    let dot: f64 = row
        .iter()
        .filter_map(|&(col, w)| query.get(col).map(|q| q * w))
        .sum();
    let query_norm = query.iter().map(|q| q * q).sum::<f64>().sqrt();
    let row_norm = row.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();

    if query_norm == 0.0 || row_norm == 0.0 {
        0.0
    } else {
        dot / (query_norm * row_norm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_word_list_is_sorted() {
        assert!(ENGLISH_STOP_WORDS.windows(2).all(|w| w[0] < w[1]));
        assert!(is_stop_word("the"));
        assert!(!is_stop_word("heist"));
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(
            tokenize("The Sci-Fi heist, in 2010: a dream_world!"),
            vec!["sci", "fi", "heist", "2010", "dream_world"]
        );
    }

    #[test]
    fn test_bigrams_skip_stop_words() {
        let terms = analyze("space and time travel", 2);
        assert!(terms.contains(&"space time".to_string()));
        assert!(terms.contains(&"time travel".to_string()));
        assert_eq!(terms.len(), 5);
    }

    #[test]
    fn test_min_df_prunes_rare_terms() {
        let docs = ["space opera", "space western", "courtroom drama"];
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams::default());
        let matrix = vectorizer.fit_transform(&docs);

        assert_eq!(vectorizer.terms(), &["space".to_string()]);
        assert_eq!(matrix.n_features(), 1);
        assert!(matrix.row(2).unwrap().is_empty());
        assert!((matrix.row(0).unwrap()[0].1 - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_refit_with_min_df_one_when_nothing_survives() {
        let docs = ["lonely document"];
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams::default());
        let matrix = vectorizer.fit_transform(&docs);

        assert_eq!(vectorizer.vocabulary_size(), 3);
        assert_eq!(matrix.row(0).unwrap().len(), 3);
    }

    #[test]
    fn test_transform_matches_fitted_row() {
        let docs = ["space opera", "space western", "courtroom drama"];
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams::default());
        let matrix = vectorizer.fit_transform(&docs);

        assert_eq!(&vectorizer.transform("space opera"), matrix.row(0).unwrap());
        assert!(vectorizer.transform("unrelated words").is_empty());
    }

    #[test]
    fn test_max_features_keeps_most_frequent() {
        let docs = ["alpha beta", "alpha beta", "alpha gamma", "gamma delta", "delta"];
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            min_df: 1,
            max_features: 2,
            ngram_max: 1,
        });
        vectorizer.fit_transform(&docs);

        // alpha: 3, beta/gamma/delta: 2, ties broken lexicographically
        assert_eq!(vectorizer.terms(), &["alpha".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_rows_are_normalized_and_idf_smoothed() {
        let docs = ["war war peace", "war story"];
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            min_df: 1,
            max_features: 100,
            ngram_max: 1,
        });
        let matrix = vectorizer.fit_transform(&docs);

        let war = vectorizer.column_of("war").unwrap();
        let peace = vectorizer.column_of("peace").unwrap();
        let row = matrix.row(0).unwrap();
        let weight = |col: usize| row.iter().find(|(c, _)| *c == col).unwrap().1;

        let idf_war = 1.0;
        let idf_peace = (3.0f64 / 2.0).ln() + 1.0;
        let ratio = weight(war) / weight(peace);
        assert!((ratio - 2.0 * idf_war / idf_peace).abs() < 1e-12);

        let norm: f64 = row.iter().map(|(_, w)| w * w).sum();
        assert!((norm - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cosine_similarity() {
        let row: SparseRow = vec![(0, 1.0), (2, 1.0)];
        assert!((cosine_similarity(&[1.0, 0.0, 1.0], &row) - 1.0).abs() < 1e-12);
        assert_eq!(cosine_similarity(&[0.0, 1.0, 0.0], &row), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0, 0.0], &row), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0, 0.0], &Vec::new()), 0.0);
    }

    #[test]
    fn test_mean_of_rows() {
        let docs = ["alpha beta", "alpha gamma"];
        let mut vectorizer = TfidfVectorizer::new(VectorizerParams {
            min_df: 1,
            max_features: 10,
            ngram_max: 1,
        });
        let matrix = vectorizer.fit_transform(&docs);
        let mean = matrix.mean_of_rows(&[0, 1, 99]);
        let alpha = vectorizer.column_of("alpha").unwrap();
        let beta = vectorizer.column_of("beta").unwrap();

        let row0 = matrix.row(0).unwrap();
        let beta_weight = row0.iter().find(|(c, _)| *c == beta).unwrap().1;
        assert!((mean[beta] - beta_weight / 2.0).abs() < 1e-12);
        assert!(mean[alpha] > 0.0);
    }
}
