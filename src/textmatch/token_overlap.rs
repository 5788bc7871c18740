//! Jaccard overlap over word tokens.

use std::collections::HashSet;

fn tokenize(s: &str) -> HashSet<String> {
    s.to_lowercase()
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|t| !t.is_empty())
        .collect()
}

/// Jaccard similarity between the word-token sets of `a` and `b`:
/// `|intersection| / |union|`.
pub fn token_overlap_score(a: &str, b: &str) -> f64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);

    if tokens_a.is_empty() && tokens_b.is_empty() {
        return 1.0;
    }
    let intersection = tokens_a.intersection(&tokens_b).count();
    let union = tokens_a.union(&tokens_b).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_sentences_score_one() {
        assert_eq!(token_overlap_score("hello world", "hello world"), 1.0);
    }

    #[test]
    fn partial_overlap() {
        // {the, quick, brown, fox} vs {the, lazy, brown, dog}
        // intersection = {the, brown} = 2, union = 6
        let score = token_overlap_score("the quick brown fox", "the lazy brown dog");
        assert!((score - (2.0 / 6.0)).abs() < 1e-9);
    }

    #[test]
    fn disjoint_tokens_score_zero() {
        assert_eq!(token_overlap_score("apple", "orange"), 0.0);
    }
}
