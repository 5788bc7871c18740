//! Sorensen-Dice similarity over character n-grams.

use std::collections::HashMap;

fn ngrams(s: &str, n: usize) -> HashMap<String, usize> {
    let chars: Vec<char> = s.to_lowercase().chars().collect();
    let mut counts = HashMap::new();
    if chars.len() < n {
        if !chars.is_empty() {
            *counts.entry(chars.iter().collect::<String>()).or_insert(0) += 1;
        }
        return counts;
    }
    for window in chars.windows(n) {
        let gram: String = window.iter().collect();
        *counts.entry(gram).or_insert(0) += 1;
    }
    counts
}

/// Sorensen-Dice coefficient over character n-grams (default bigrams):
/// `2*|intersection| / (|grams(a)| + |grams(b)|)`, multiset-aware.
pub fn ngram_similarity(a: &str, b: &str, n: usize) -> f64 {
    let grams_a = ngrams(a, n);
    let grams_b = ngrams(b, n);

    let total_a: usize = grams_a.values().sum();
    let total_b: usize = grams_b.values().sum();
    if total_a == 0 || total_b == 0 {
        return if total_a == 0 && total_b == 0 { 1.0 } else { 0.0 };
    }

    let mut intersection = 0usize;
    for (gram, count_a) in &grams_a {
        if let Some(count_b) = grams_b.get(gram) {
            intersection += (*count_a).min(*count_b);
        }
    }

    (2.0 * intersection as f64) / (total_a + total_b) as f64
}
