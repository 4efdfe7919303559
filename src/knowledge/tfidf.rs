//! Sparse TF-IDF vector space over word unigrams and bigrams.
//!
//! Tokens are runs of two or more word characters after lower-casing. The
//! vocabulary keeps the `max_features` most frequent terms (ties resolved
//! alphabetically), idf is smoothed as `ln((1 + n) / (1 + df)) + 1` and every
//! vector is L2-normalized, so cosine similarity reduces to a dot product.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::OnceLock;

pub const DEFAULT_MAX_FEATURES: usize = 1000;

/// Sparse vector: `(term index, weight)` pairs sorted by index.
pub type SparseVector = Vec<(usize, f32)>;

fn token_regex() -> &'static Regex {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    TOKEN.get_or_init(|| Regex::new(r"\b\w\w+\b").expect("token pattern is valid"))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    #[serde(default = "default_ngram_range")]
    pub ngram_range: (usize, usize),
    #[serde(default)]
    pub max_features: Option<usize>,
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f32>,
}

fn default_ngram_range() -> (usize, usize) {
    (1, 2)
}

impl Default for TfidfVectorizer {
    fn default() -> Self {
        Self {
            ngram_range: default_ngram_range(),
            max_features: Some(DEFAULT_MAX_FEATURES),
            vocabulary: HashMap::new(),
            idf: Vec::new(),
        }
    }
}

impl TfidfVectorizer {
    pub fn new(ngram_range: (usize, usize), max_features: Option<usize>) -> Self {
        Self {
            ngram_range,
            max_features,
            ..Self::default()
        }
    }

    /// Split `text` into the n-gram terms this vectorizer counts.
    pub fn analyze(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let tokens: Vec<&str> = token_regex()
            .find_iter(&lowered)
            .map(|m| m.as_str())
            .collect();

        let (min_n, max_n) = self.ngram_range;
        let mut terms = Vec::new();
        for n in min_n.max(1)..=max_n {
            if tokens.len() < n {
                break;
            }
            for window in tokens.windows(n) {
                terms.push(window.join(" "));
            }
        }
        terms
    }

    /// Learn vocabulary and idf from `documents`, then return their vectors.
    pub fn fit_transform<S: AsRef<str>>(&mut self, documents: &[S]) -> Vec<SparseVector> {
        let analyzed: Vec<Vec<String>> =
            documents.iter().map(|d| self.analyze(d.as_ref())).collect();

        // BTreeMap keeps terms sorted, which is the tie order for feature limiting
        let mut corpus_freq: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
        for terms in &analyzed {
            let mut seen: Vec<&str> = Vec::with_capacity(terms.len());
            for term in terms {
                let entry = corpus_freq.entry(term.as_str()).or_insert((0, 0));
                entry.0 += 1;
                if !seen.contains(&term.as_str()) {
                    entry.1 += 1;
                    seen.push(term.as_str());
                }
            }
        }

        let mut kept: Vec<(&str, usize, usize)> = corpus_freq
            .into_iter()
            .map(|(term, (tf, df))| (term, tf, df))
            .collect();
        if let Some(limit) = self.max_features {
            if kept.len() > limit {
                // stable sort keeps alphabetical order among equal frequencies
                kept.sort_by(|a, b| b.1.cmp(&a.1));
                kept.truncate(limit);
                kept.sort_by(|a, b| a.0.cmp(b.0));
            }
        }

        let n_docs = documents.len() as f32;
        self.vocabulary = kept
            .iter()
            .enumerate()
            .map(|(idx, (term, _, _))| (term.to_string(), idx))
            .collect();
        self.idf = kept
            .iter()
            .map(|(_, _, df)| ((1.0 + n_docs) / (1.0 + *df as f32)).ln() + 1.0)
            .collect();

        analyzed.iter().map(|terms| self.weigh(terms)).collect()
    }

    pub fn transform(&self, text: &str) -> SparseVector {
        self.weigh(&self.analyze(text))
    }

    pub fn is_fitted(&self) -> bool {
        !self.vocabulary.is_empty() && self.vocabulary.len() == self.idf.len()
    }

    pub fn vocabulary_size(&self) -> usize {
        self.vocabulary.len()
    }

    fn weigh(&self, terms: &[String]) -> SparseVector {
        let mut counts: BTreeMap<usize, f32> = BTreeMap::new();
        for term in terms {
            if let Some(&idx) = self.vocabulary.get(term) {
                *counts.entry(idx).or_insert(0.0) += 1.0;
            }
        }

        let mut vector: SparseVector = counts
            .into_iter()
            .filter_map(|(idx, tf)| self.idf.get(idx).map(|idf| (idx, tf * idf)))
            .collect();

        let norm = vector.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
        if norm > 0.0 {
            for (_, w) in vector.iter_mut() {
                *w /= norm;
            }
        }
        vector
    }
}

/// Cosine similarity of two sparse vectors sorted by index.
pub fn cosine_similarity(a: &[(usize, f32)], b: &[(usize, f32)]) -> f32 {
    let (mut i, mut j) = (0, 0);
    let mut dot = 0.0;
    while i < a.len() && j < b.len() {
        match a[i].0.cmp(&b[j].0) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                dot += a[i].1 * b[j].1;
                i += 1;
                j += 1;
            }
        }
    }

    let norm_a: f32 = a.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|(_, w)| w * w).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_builds_unigrams_and_bigrams() {
        let vectorizer = TfidfVectorizer::default();
        let terms = vectorizer.analyze("Bom dia, a todos");
        // single-character tokens are dropped before bigrams are formed
        assert_eq!(terms, vec!["bom", "dia", "todos", "bom dia", "dia todos"]);
    }

    #[test]
    fn test_identical_text_scores_one() {
        let mut vectorizer = TfidfVectorizer::default();
        let matrix = vectorizer.fit_transform(&["bom dia", "boa noite", "tchau"]);
        let query = vectorizer.transform("BOM DIA");
        let score = cosine_similarity(&query, &matrix[0]);
        assert!((score - 1.0).abs() < 1e-5);
        assert_eq!(cosine_similarity(&query, &matrix[2]), 0.0);
    }

    #[test]
    fn test_unknown_terms_give_zero_vector() {
        let mut vectorizer = TfidfVectorizer::default();
        vectorizer.fit_transform(&["bom dia"]);
        assert!(vectorizer.transform("xyz qwe").is_empty());
    }

    #[test]
    fn test_max_features_keeps_most_frequent_terms() {
        let mut vectorizer = TfidfVectorizer::new((1, 1), Some(2));
        vectorizer.fit_transform(&["aa bb", "aa cc", "aa bb dd"]);
        assert_eq!(vectorizer.vocabulary_size(), 2);
        assert!(vectorizer.vocabulary.contains_key("aa"));
        assert!(vectorizer.vocabulary.contains_key("bb"));
    }

    #[test]
    fn test_rarer_terms_weigh_more() {
        let mut vectorizer = TfidfVectorizer::new((1, 1), None);
        vectorizer.fit_transform(&["comum raro", "comum", "comum"]);
        let common = vectorizer.idf[vectorizer.vocabulary["comum"]];
        let rare = vectorizer.idf[vectorizer.vocabulary["raro"]];
        assert!(rare > common);
        assert!((common - 1.0).abs() < 1e-6);
    }
}
