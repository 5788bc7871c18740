//! The compact query DSL `Library::query` parses: free text plus
//! `key:value` metadata filters, `topic:foo/bar`, and `min-score:0.5`.

use crate::stacks::{AdvancedSearchOptions, TextMatchMode, TextSearchOptions};
use crate::textmatch::MetadataFilter;

/// Parse a DSL string into `AdvancedSearchOptions`. Unrecognized `key:value`
/// tokens become case-sensitive metadata equality filters; bare words are
/// joined (in order) into a single fuzzy text query.
pub fn parse_query(dsl: &str, max_results: usize) -> AdvancedSearchOptions {
    let mut free_words = Vec::new();
    let mut metadata = Vec::new();
    let mut topic_filter = None;
    let mut similarity_threshold = 0.0;

    for token in dsl.split_whitespace() {
        match token.split_once(':') {
            Some(("topic", value)) => topic_filter = Some(value.to_string()),
            Some(("min-score", value)) => similarity_threshold = value.parse().unwrap_or(0.0),
            Some((key, value)) => metadata.push((key.to_string(), MetadataFilter::Eq(value.to_string()))),
            None => free_words.push(token),
        }
    }

    let mut options = AdvancedSearchOptions {
        metadata,
        topic_filter,
        similarity_threshold,
        max_results,
        ..Default::default()
    };

    if !free_words.is_empty() {
        options.text = Some(TextSearchOptions {
            query: free_words.join(" "),
            mode: TextMatchMode::Fuzzy,
            threshold: 0.0,
            max_results,
        });
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_words_become_a_fuzzy_text_query() {
        let options = parse_query("rust async runtimes", 20);
        assert_eq!(options.text.unwrap().query, "rust async runtimes");
    }

    #[test]
    fn topic_and_min_score_are_recognized() {
        let options = parse_query("topic:code/rust min-score:0.5", 20);
        assert_eq!(options.topic_filter, Some("code/rust".to_string()));
        assert_eq!(options.similarity_threshold, 0.5);
    }

    #[test]
    fn other_key_value_pairs_become_metadata_filters() {
        let options = parse_query("shelf:journal async", 20);
        assert_eq!(options.metadata.len(), 1);
        assert_eq!(options.metadata[0].0, "shelf");
        assert_eq!(options.text.unwrap().query, "async");
    }
}
