//! Layered, explicit configuration. No environment-variable or file-path
//! discovery happens implicitly — a `LibraryConfig` is a plain value the
//! caller constructs (directly, or via `serde_json::from_reader`) and
//! passes into `Library::new`/`Stacks::new`, per the "explicit dependency,
//! never ambient global" design note this crate follows throughout.

use serde::{Deserialize, Serialize};

use crate::cataloging::Bm25Params;
use crate::learning::LearningConfig;

/// Top-level configuration for a `Stacks`/`Library` instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LibraryConfig {
    pub bm25: Bm25Params,
    pub max_topics_per_entry: usize,
    pub regex_cache_capacity: usize,
    pub learning: LearningSettings,
    pub autosave_debounce_ms: u64,
    pub min_entries_for_compendium: usize,
    pub max_volumes_per_topic: usize,
    pub default_similarity_threshold: f64,
    pub default_max_results: usize,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        LibraryConfig {
            bm25: Bm25Params::default(),
            max_topics_per_entry: crate::cataloging::topic_index::DEFAULT_MAX_TOPICS_PER_ENTRY,
            regex_cache_capacity: crate::textmatch::regex_cache::DEFAULT_CAPACITY,
            learning: LearningSettings::default(),
            autosave_debounce_ms: 2_000,
            min_entries_for_compendium: 10,
            max_volumes_per_topic: 30,
            default_similarity_threshold: 0.0,
            default_max_results: 20,
        }
    }
}

/// Serde-friendly mirror of [`LearningConfig`] (kept separate so the
/// engine's internal type doesn't need to derive `Serialize`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LearningSettings {
    pub enabled: bool,
    pub adaptation_rate: f64,
    pub max_history: usize,
    pub diversity_sample_cap: usize,
    pub diversity_cosine_threshold: f64,
    pub interest_boost_weight: f64,
    pub min_topic_queries: u32,
}

impl Default for LearningSettings {
    fn default() -> Self {
        let defaults = LearningConfig::default();
        LearningSettings {
            enabled: true,
            adaptation_rate: defaults.adaptation_rate,
            max_history: defaults.max_history,
            diversity_sample_cap: defaults.diversity_sample_cap,
            diversity_cosine_threshold: defaults.diversity_cosine_threshold,
            interest_boost_weight: defaults.interest_boost_weight,
            min_topic_queries: defaults.min_topic_queries,
        }
    }
}

impl LearningSettings {
    pub fn to_engine_config(self) -> LearningConfig {
        LearningConfig {
            adaptation_rate: self.adaptation_rate,
            max_history: self.max_history,
            diversity_sample_cap: self.diversity_sample_cap,
            diversity_cosine_threshold: self.diversity_cosine_threshold,
            interest_boost_weight: self.interest_boost_weight,
            min_topic_queries: self.min_topic_queries,
        }
    }
}
