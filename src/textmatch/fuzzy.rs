//! Weighted fuzzy composite score: a substring short-circuit, else a
//! weighted blend of windowed Levenshtein, bigram similarity, and token
//! overlap.

use super::levenshtein::levenshtein_distance;
use super::ngram::ngram_similarity;
use super::token_overlap::token_overlap_score;

/// Weights for the three components of [`fuzzy_score`]. Defaults:
/// Levenshtein 0.4, bigram 0.3, token 0.3.
#[derive(Debug, Clone, Copy)]
pub struct FuzzyWeights {
    pub levenshtein: f64,
    pub bigram: f64,
    pub token: f64,
}

impl Default for FuzzyWeights {
    fn default() -> Self {
        FuzzyWeights {
            levenshtein: 0.4,
            bigram: 0.3,
            token: 0.3,
        }
    }
}

/// Best (lowest-distance) windowed Levenshtein similarity: slide a window
/// of length ~= |query| across `candidate` and keep the best match,
/// normalized to a [0,1] similarity.
fn windowed_levenshtein_similarity(query: &str, candidate: &str) -> f64 {
    let query_chars: Vec<char> = query.chars().collect();
    let candidate_chars: Vec<char> = candidate.chars().collect();
    let qlen = query_chars.len();

    if qlen == 0 {
        return if candidate_chars.is_empty() { 1.0 } else { 0.0 };
    }
    if candidate_chars.len() <= qlen {
        let dist = levenshtein_distance(query, candidate);
        let max_len = qlen.max(candidate_chars.len());
        return 1.0 - (dist as f64 / max_len as f64);
    }

    let mut best_similarity = 0.0f64;
    for start in 0..=(candidate_chars.len() - qlen) {
        let window: String = candidate_chars[start..start + qlen].iter().collect();
        let dist = levenshtein_distance(query, &window);
        let similarity = 1.0 - (dist as f64 / qlen as f64);
        if similarity > best_similarity {
            best_similarity = similarity;
        }
    }
    best_similarity
}

/// Fuzzy match score between `query` and `candidate` in `[0, 1]`.
///
/// Returns `1.0` immediately when `query` has at least 3 characters and is
/// a case-insensitive substring of `candidate`. Otherwise blends windowed
/// Levenshtein similarity, bigram (Sorensen-Dice) similarity, and token
/// (Jaccard) overlap by `weights`.
pub fn fuzzy_score(query: &str, candidate: &str, weights: FuzzyWeights) -> f64 {
    let query_lower = query.to_lowercase();
    let candidate_lower = candidate.to_lowercase();

    if query_lower.chars().count() >= 3 && candidate_lower.contains(&query_lower) {
        return 1.0;
    }

    let lev = windowed_levenshtein_similarity(&query_lower, &candidate_lower);
    let bigram = ngram_similarity(&query_lower, &candidate_lower, 2);
    let token = token_overlap_score(&query_lower, &candidate_lower);

    (weights.levenshtein * lev + weights.bigram * bigram + weights.token * token)
        .clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_short_circuits_to_one() {
        assert_eq!(fuzzy_score("react", "learning react hooks", FuzzyWeights::default()), 1.0);
    }

    #[test]
    fn short_query_does_not_short_circuit() {
        // "re" has < 3 chars so the substring rule must not fire even
        // though it is contained in "react".
        let score = fuzzy_score("re", "react", FuzzyWeights::default());
        assert!(score <= 1.0);
    }

    #[test]
    fn dissimilar_strings_score_low() {
        let score = fuzzy_score("kubernetes", "banana smoothie recipe", FuzzyWeights::default());
        assert!(score < 0.3);
    }

    #[test]
    fn score_is_bounded() {
        let score = fuzzy_score("anything", "something else entirely", FuzzyWeights::default());
        assert!((0.0..=1.0).contains(&score));
    }
}
