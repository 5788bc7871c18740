//! Metadata predicate evaluation. All string comparisons are
//! case-insensitive except `eq`/`neq`.

use std::collections::HashMap;

use super::regex_cache::RegexCache;

/// A single metadata predicate, evaluated against a volume's metadata map
/// for a given key.
#[derive(Debug, Clone)]
pub enum MetadataFilter {
    Eq(String),
    Neq(String),
    Exists,
    NotExists,
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Regex(String),
    Gt(f64),
    Gte(f64),
    Lt(f64),
    Lte(f64),
    In(Vec<String>),
    NotIn(Vec<String>),
    Between(f64, f64),
}

/// Evaluate `filter` against `metadata[key]`. `regex_cache` backs the
/// `Regex` variant so repeated evaluations of the same pattern don't
/// recompile it.
pub fn matches_metadata_filter(
    metadata: &HashMap<String, String>,
    key: &str,
    filter: &MetadataFilter,
    regex_cache: &RegexCache,
) -> bool {
    let value = metadata.get(key);

    match filter {
        MetadataFilter::Exists => value.is_some(),
        MetadataFilter::NotExists => value.is_none(),
        MetadataFilter::Eq(expected) => value.map(|v| v == expected).unwrap_or(false),
        MetadataFilter::Neq(expected) => value.map(|v| v != expected).unwrap_or(true),
        MetadataFilter::Contains(needle) => value
            .map(|v| v.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
        MetadataFilter::StartsWith(prefix) => value
            .map(|v| v.to_lowercase().starts_with(&prefix.to_lowercase()))
            .unwrap_or(false),
        MetadataFilter::EndsWith(suffix) => value
            .map(|v| v.to_lowercase().ends_with(&suffix.to_lowercase()))
            .unwrap_or(false),
        MetadataFilter::Regex(pattern) => {
            let Some(value) = value else { return false };
            match regex_cache.get_or_compile(pattern) {
                Some(re) => re.is_match(value),
                None => false,
            }
        }
        MetadataFilter::Gt(threshold) => numeric(value).map(|v| v > *threshold).unwrap_or(false),
        MetadataFilter::Gte(threshold) => numeric(value).map(|v| v >= *threshold).unwrap_or(false),
        MetadataFilter::Lt(threshold) => numeric(value).map(|v| v < *threshold).unwrap_or(false),
        MetadataFilter::Lte(threshold) => numeric(value).map(|v| v <= *threshold).unwrap_or(false),
        MetadataFilter::In(candidates) => value
            .map(|v| {
                let lower = v.to_lowercase();
                candidates.iter().any(|c| c.to_lowercase() == lower)
            })
            .unwrap_or(false),
        MetadataFilter::NotIn(candidates) => !value
            .map(|v| {
                let lower = v.to_lowercase();
                candidates.iter().any(|c| c.to_lowercase() == lower)
            })
            .unwrap_or(false),
        MetadataFilter::Between(low, high) => numeric(value)
            .map(|v| v >= *low && v <= *high)
            .unwrap_or(false),
    }
}

fn numeric(value: Option<&String>) -> Option<f64> {
    value.and_then(|v| v.parse::<f64>().ok())
}
