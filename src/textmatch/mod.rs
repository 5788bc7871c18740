//! Text-match primitives: Levenshtein distance, n-gram similarity, token
//! overlap, a weighted fuzzy composite score, and metadata predicate
//! evaluation backed by a bounded regex cache.

pub mod fuzzy;
pub mod levenshtein;
pub mod metadata_filter;
pub mod ngram;
pub mod regex_cache;
pub mod token_overlap;

pub use fuzzy::{fuzzy_score, FuzzyWeights};
pub use levenshtein::levenshtein_distance;
pub use metadata_filter::{matches_metadata_filter, MetadataFilter};
pub use ngram::ngram_similarity;
pub use regex_cache::RegexCache;
pub use token_overlap::token_overlap_score;
