//! Pure search/ranking functions consumed by `Stacks`. Kept free of any
//! mutable index state beyond the borrows they're handed, so the ranking
//! pipeline reads as a straight-line pipeline.

use std::collections::HashMap;

use crate::atoms::Volume;
use crate::cataloging::{InvertedIndex, MagnitudeCache};
use crate::dedup::cosine_similarity;
use crate::textmatch::{fuzzy_score, matches_metadata_filter, ngram_similarity, token_overlap_score, FuzzyWeights, RegexCache};

use super::types::{
    AdvancedScoredVolume, AdvancedSearchOptions, ComponentScores, RankBy, RankByOption, ScoredVolume, TextMatchMode,
    TextSearchOptions,
};

/// Half-life used by the `recency` component of weighted ranking: 30 days.
const RECENCY_HALF_LIFE_MS: f64 = 30.0 * 86_400_000.0;

/// Map an age in milliseconds to `(0, 1]` via exponential decay.
pub fn recency_score(now: i64, timestamp: i64) -> f64 {
    let age = (now - timestamp).max(0) as f64;
    (-(std::f64::consts::LN_2 / RECENCY_HALF_LIFE_MS) * age).exp()
}

/// Pure cosine search: sorted descending, scores clamped to `[-1, 1]`.
pub fn vector_search(
    volumes: &[&Volume],
    magnitudes: &mut MagnitudeCache,
    query_embedding: &[f32],
    max_results: usize,
    threshold: f64,
) -> Vec<ScoredVolume> {
    let query_magnitude = crate::cataloging::magnitude::l2_norm(query_embedding);
    let mut scored: Vec<ScoredVolume> = volumes
        .iter()
        .filter_map(|volume| {
            let magnitude = magnitudes.get_or_compute(&volume.id, &volume.embedding);
            let score = cosine_similarity(query_embedding, &volume.embedding, query_magnitude, magnitude);
            if score >= threshold {
                Some(ScoredVolume {
                    volume: (*volume).clone(),
                    score,
                })
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.volume.timestamp.cmp(&a.volume.timestamp))
            .then_with(|| a.volume.id.cmp(&b.volume.id))
    });
    scored.truncate(max_results);
    scored
}

fn text_score(volume: &Volume, options: &TextSearchOptions, regex_cache: &RegexCache, bm25_scores: Option<&HashMap<String, f64>>) -> Option<f64> {
    match options.mode {
        TextMatchMode::Exact => {
            if volume.text.to_lowercase() == options.query.to_lowercase() {
                Some(1.0)
            } else {
                None
            }
        }
        TextMatchMode::Substring => {
            if volume.text.to_lowercase().contains(&options.query.to_lowercase()) {
                Some(1.0)
            } else {
                None
            }
        }
        TextMatchMode::Fuzzy => Some(fuzzy_score(&options.query, &volume.text, FuzzyWeights::default())),
        TextMatchMode::Token => Some(token_overlap_score(&options.query, &volume.text)),
        TextMatchMode::Regex => {
            let re = regex_cache.get_or_compile(&options.query)?;
            if re.is_match(&volume.text) {
                Some(1.0)
            } else {
                None
            }
        }
        TextMatchMode::Bm25 => bm25_scores.and_then(|scores| scores.get(&volume.id).copied()),
    }
}

/// Normalize a set of BM25 scores against their maximum so the top result
/// scores 1.0.
fn normalize_bm25(raw: Vec<(String, f64)>) -> HashMap<String, f64> {
    let max = raw.iter().map(|(_, s)| *s).fold(0.0_f64, f64::max);
    if max <= 0.0 {
        return HashMap::new();
    }
    raw.into_iter().map(|(id, s)| (id, s / max)).collect()
}

/// `fuzzy`/`substring`/`exact`/`regex`/`token`/`bm25` text search.
pub fn text_search(
    volumes: &[&Volume],
    inverted_index: &InvertedIndex,
    regex_cache: &RegexCache,
    options: &TextSearchOptions,
) -> Vec<ScoredVolume> {
    let bm25_normalized = if options.mode == TextMatchMode::Bm25 {
        Some(normalize_bm25(inverted_index.bm25_search(&options.query)))
    } else {
        None
    };

    let mut scored: Vec<ScoredVolume> = volumes
        .iter()
        .filter_map(|volume| {
            let score = text_score(volume, options, regex_cache, bm25_normalized.as_ref())?;
            if score >= options.threshold {
                Some(ScoredVolume {
                    volume: (*volume).clone(),
                    score,
                })
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.volume.timestamp.cmp(&a.volume.timestamp))
            .then_with(|| a.volume.id.cmp(&b.volume.id))
    });
    scored.truncate(options.max_results);
    scored
}

/// The canonical ranking pipeline.
#[allow(clippy::too_many_arguments)]
pub fn advanced_search(
    volumes: &[&Volume],
    magnitudes: &mut MagnitudeCache,
    inverted_index: &InvertedIndex,
    regex_cache: &RegexCache,
    // Candidate narrowing from `MetadataIndex`: `true` when `volume.id`
    // survives every `Eq`/`Exists` filter in `options.metadata` (or there
    // are none to narrow by). Other filter kinds still need the full
    // per-volume evaluation below, so this only ever rejects candidates
    // earlier than that scan would.
    metadata_index_hit: impl Fn(&str) -> bool,
    topic_members: impl Fn(&str) -> bool,
    options: &AdvancedSearchOptions,
    now: i64,
) -> Vec<AdvancedScoredVolume> {
    let query_magnitude = options.query_embedding.as_deref().map(crate::cataloging::magnitude::l2_norm);

    let bm25_normalized = options
        .text
        .as_ref()
        .filter(|t| t.mode == TextMatchMode::Bm25)
        .map(|t| normalize_bm25(inverted_index.bm25_search(&t.query)));

    let rank_by = match options.rank_by {
        RankByOption::Explicit(r) => r,
        RankByOption::Auto => {
            if options.query_embedding.is_some() {
                RankBy::Vector
            } else {
                RankBy::Text
            }
        }
    };

    let mut results: Vec<AdvancedScoredVolume> = Vec::new();

    for volume in volumes {
        if let Some(range) = &options.date_range {
            if !range.contains(volume.timestamp) {
                continue;
            }
        }

        if !options.metadata.is_empty() && !metadata_index_hit(&volume.id) {
            continue;
        }

        let mut metadata_matched_all = true;
        for (key, filter) in &options.metadata {
            if !matches_metadata_filter(&volume.metadata, key, filter, regex_cache) {
                metadata_matched_all = false;
                break;
            }
        }
        if !options.metadata.is_empty() && !metadata_matched_all {
            continue;
        }

        let vector_score = match (&options.query_embedding, query_magnitude) {
            (Some(query_embedding), Some(qmag)) => {
                let magnitude = magnitudes.get_or_compute(&volume.id, &volume.embedding);
                let score = cosine_similarity(query_embedding, &volume.embedding, qmag, magnitude);
                if score < options.similarity_threshold {
                    continue;
                }
                Some(score)
            }
            _ => None,
        };

        let text_component_score = match &options.text {
            Some(text_options) => {
                let raw = text_score(volume, text_options, regex_cache, bm25_normalized.as_ref());
                match raw {
                    Some(score) if score >= text_options.threshold => Some(score * options.field_boosts.text),
                    Some(_) => continue,
                    None => continue,
                }
            }
            None => None,
        };

        let metadata_boost = if !options.metadata.is_empty() && metadata_matched_all {
            options.field_boosts.metadata
        } else {
            0.0
        };
        let topic_boost = match &options.topic_filter {
            Some(topic) if topic_members(topic) && matches_topic(volume, topic) => options.field_boosts.topic,
            _ => 0.0,
        };
        let combined = match rank_by {
            RankBy::Vector => vector_score.unwrap_or(0.0) + metadata_boost + topic_boost,
            RankBy::Text => text_component_score.unwrap_or(0.0) + metadata_boost + topic_boost,
            RankBy::Average => {
                let components: Vec<f64> = [vector_score, text_component_score].into_iter().flatten().collect();
                let avg = if components.is_empty() {
                    0.0
                } else {
                    components.iter().sum::<f64>() / components.len() as f64
                };
                avg + metadata_boost + topic_boost
            }
            RankBy::Multiply => {
                let components: Vec<f64> = [vector_score, text_component_score].into_iter().flatten().collect();
                let product = if components.is_empty() {
                    0.0
                } else {
                    components.iter().product()
                };
                product + metadata_boost + topic_boost
            }
            RankBy::Weighted => {
                let w = &options.rank_weights;
                w.vector * vector_score.unwrap_or(0.0)
                    + w.text * text_component_score.unwrap_or(0.0)
                    + w.metadata * metadata_boost
                    + w.recency * recency_score(now, volume.timestamp)
            }
        };

        results.push(AdvancedScoredVolume {
            volume: (*volume).clone(),
            score: combined,
            scores: ComponentScores {
                vector: vector_score,
                text: text_component_score,
            },
        });
    }

    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.volume.timestamp.cmp(&a.volume.timestamp))
            .then_with(|| a.volume.id.cmp(&b.volume.id))
    });
    results.truncate(options.max_results);
    results
}

fn matches_topic(volume: &Volume, topic: &str) -> bool {
    volume
        .metadata
        .get(crate::atoms::metadata_keys::TOPIC)
        .map(|t| t.split(',').any(|segment| segment.trim() == topic))
        .unwrap_or(false)
        || volume
            .metadata
            .get(crate::atoms::metadata_keys::TOPICS)
            .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok())
            .map(|topics| topics.iter().any(|t| t == topic))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stacks::types::{AdvancedSearchOptions, FieldBoosts, RankWeights};
    use std::collections::HashMap as Map;

    fn volume(id: &str, embedding: Vec<f32>) -> Volume {
        Volume::new(id.to_string(), format!("text for {id}"), embedding, Map::new(), 0)
    }

    #[test]
    fn vector_search_ordering_scenario() {
        let a = volume("A", vec![0.9, 0.1, 0.0, 0.05]);
        let b = volume("B", vec![0.1, 0.9, 0.0, 0.1]);
        let c = volume("C", vec![0.0, 0.1, 0.9, 0.0]);
        let volumes = vec![&a, &b, &c];
        let mut magnitudes = MagnitudeCache::new();

        let results = vector_search(&volumes, &mut magnitudes, &[0.85, 0.15, 0.0, 0.05], 2, 0.1);

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].volume.id, "A");
        assert_eq!(results[1].volume.id, "B");
        assert!(results[0].score >= 0.99 && results[0].score <= 1.0);
        assert!(results[1].score >= 0.2 && results[1].score <= 0.4);
    }

    #[test]
    fn bm25_advanced_search_scenario() {
        let mut v1 = volume("v1", vec![]);
        v1.text = "deploying kubernetes clusters".into();
        let mut v2 = volume("v2", vec![]);
        v2.text = "baking bread at home".into();
        let mut v3 = volume("v3", vec![]);
        v3.text = "writing poetry".into();

        let mut index = InvertedIndex::new(crate::cataloging::Bm25Params::default());
        index.add_document(&v1.id, &v1.text);
        index.add_document(&v2.id, &v2.text);
        index.add_document(&v3.id, &v3.text);

        let volumes = vec![&v1, &v2, &v3];
        let mut magnitudes = MagnitudeCache::new();
        let regex_cache = RegexCache::default();

        let options = AdvancedSearchOptions {
            text: Some(TextSearchOptions {
                query: "kubernetes".into(),
                mode: TextMatchMode::Bm25,
                threshold: 0.01,
                max_results: 10,
            }),
            field_boosts: FieldBoosts::default(),
            rank_weights: RankWeights::default(),
            max_results: 10,
            ..Default::default()
        };

        let results = advanced_search(
            &volumes,
            &mut magnitudes,
            &index,
            &regex_cache,
            |_| false,
            |_| false,
            &options,
            0,
        );

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].volume.id, "v1");
    }
}
