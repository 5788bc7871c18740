//! Inverted BM25 index: term -> posting list of (id, term frequency), plus
//! per-document length and corpus average length.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// BM25 tuning parameters. Defaults (k1=1.2, b=0.75) match the source
/// system's implicit constants.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bm25Params {
    pub k1: f64,
    pub b: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Bm25Params { k1: 1.2, b: 0.75 }
    }
}

#[derive(Debug, Default)]
pub struct InvertedIndex {
    postings: HashMap<String, HashMap<String, u32>>,
    doc_lengths: HashMap<String, u32>,
    total_length: u64,
    params: Bm25Params,
}

fn tokenize(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|t| t.chars().filter(|c| c.is_alphanumeric()).collect::<String>().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

impl InvertedIndex {
    pub fn new(params: Bm25Params) -> Self {
        InvertedIndex {
            params,
            ..Default::default()
        }
    }

    pub fn add_document(&mut self, id: &str, text: &str) {
        let tokens = tokenize(text);
        self.doc_lengths.insert(id.to_string(), tokens.len() as u32);
        self.total_length += tokens.len() as u64;

        let mut term_freqs: HashMap<String, u32> = HashMap::new();
        for token in tokens {
            *term_freqs.entry(token).or_insert(0) += 1;
        }
        for (term, freq) in term_freqs {
            self.postings.entry(term).or_default().insert(id.to_string(), freq);
        }
    }

    pub fn remove_document(&mut self, id: &str) {
        if let Some(length) = self.doc_lengths.remove(id) {
            self.total_length = self.total_length.saturating_sub(length as u64);
        }
        for postings in self.postings.values_mut() {
            postings.remove(id);
        }
        self.postings.retain(|_, postings| !postings.is_empty());
    }

    pub fn document_count(&self) -> usize {
        self.doc_lengths.len()
    }

    fn average_doc_length(&self) -> f64 {
        if self.doc_lengths.is_empty() {
            0.0
        } else {
            self.total_length as f64 / self.doc_lengths.len() as f64
        }
    }

    /// Inverse document frequency, Robertson/Sparck-Jones variant used by
    /// BM25 (can go slightly negative for terms in more than half the
    /// corpus, matching the standard formulation).
    fn idf(&self, term: &str) -> f64 {
        let n = self.doc_lengths.len() as f64;
        let df = self.postings.get(term).map(|p| p.len()).unwrap_or(0) as f64;
        if n == 0.0 {
            return 0.0;
        }
        (((n - df + 0.5) / (df + 0.5)) + 1.0).ln()
    }

    /// Score every document containing at least one query term, ranked
    /// descending by BM25 score.
    pub fn bm25_search(&self, query: &str) -> Vec<(String, f64)> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() || self.doc_lengths.is_empty() {
            return Vec::new();
        }

        let avgdl = self.average_doc_length();
        let mut scores: HashMap<String, f64> = HashMap::new();

        for term in &query_terms {
            let Some(postings) = self.postings.get(term) else {
                continue;
            };
            let idf = self.idf(term);
            for (id, &tf) in postings {
                let doc_len = *self.doc_lengths.get(id).unwrap_or(&0) as f64;
                let tf = tf as f64;
                let denom = tf + self.params.k1 * (1.0 - self.params.b + self.params.b * doc_len / avgdl.max(1e-9));
                let score = idf * (tf * (self.params.k1 + 1.0)) / denom.max(1e-9);
                *scores.entry(id.clone()).or_insert(0.0) += score;
            }
        }

        let mut ranked: Vec<(String, f64)> = scores.into_iter().collect();
        ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        ranked
    }

    pub fn clear(&mut self) {
        self.postings.clear();
        self.doc_lengths.clear();
        self.total_length = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_document_containing_term_is_returned() {
        let mut index = InvertedIndex::new(Bm25Params::default());
        index.add_document("v1", "deploying kubernetes clusters at scale");
        index.add_document("v2", "baking sourdough bread at home");
        index.add_document("v3", "writing poetry in the evening");

        let results = index.bm25_search("kubernetes");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].0, "v1");
        assert!(results[0].1 > 0.0);
    }

    #[test]
    fn remove_document_drops_it_from_postings() {
        let mut index = InvertedIndex::new(Bm25Params::default());
        index.add_document("v1", "rust programming language");
        index.remove_document("v1");
        assert!(index.bm25_search("rust").is_empty());
        assert_eq!(index.document_count(), 0);
    }

    #[test]
    fn scores_are_descending() {
        let mut index = InvertedIndex::new(Bm25Params::default());
        index.add_document("v1", "rust rust rust programming");
        index.add_document("v2", "rust programming in general");
        index.add_document("v3", "completely unrelated content");

        let results = index.bm25_search("rust programming");
        assert!(results.len() >= 2);
        for window in results.windows(2) {
            assert!(window[0].1 >= window[1].1);
        }
    }
}
