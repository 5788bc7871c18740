use crate::atoms::Volume;

/// A volume paired with a single relevance score, as returned by
/// `search`/`text_search`/`recommend`.
#[derive(Debug, Clone)]
pub struct ScoredVolume {
    pub volume: Volume,
    pub score: f64,
}

/// Component scores behind an `advancedSearch` result.
#[derive(Debug, Clone, Default)]
pub struct ComponentScores {
    pub vector: Option<f64>,
    pub text: Option<f64>,
}

/// A volume with its combined score and the components that produced it.
#[derive(Debug, Clone)]
pub struct AdvancedScoredVolume {
    pub volume: Volume,
    pub score: f64,
    pub scores: ComponentScores,
}

/// Text-search matching mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatchMode {
    Exact,
    Substring,
    Fuzzy,
    Token,
    Regex,
    Bm25,
}

/// Options for `Stacks::text_search` and the `text` clause of
/// `advancedSearch`.
#[derive(Debug, Clone)]
pub struct TextSearchOptions {
    pub query: String,
    pub mode: TextMatchMode,
    pub threshold: f64,
    pub max_results: usize,
}

impl Default for TextSearchOptions {
    fn default() -> Self {
        TextSearchOptions {
            query: String::new(),
            mode: TextMatchMode::Fuzzy,
            threshold: 0.3,
            max_results: 20,
        }
    }
}

/// An inclusive millisecond timestamp range filter.
#[derive(Debug, Clone, Copy)]
pub struct DateRange {
    pub from: Option<i64>,
    pub to: Option<i64>,
}

impl DateRange {
    pub fn contains(&self, timestamp: i64) -> bool {
        self.from.map(|f| timestamp >= f).unwrap_or(true) && self.to.map(|t| timestamp <= t).unwrap_or(true)
    }
}

/// Combination mode for `advancedSearch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankBy {
    Vector,
    Text,
    Average,
    Multiply,
    Weighted,
}

/// Weights used when `rank_by = Weighted`.
#[derive(Debug, Clone, Copy)]
pub struct RankWeights {
    pub vector: f64,
    pub text: f64,
    pub metadata: f64,
    pub recency: f64,
}

impl Default for RankWeights {
    fn default() -> Self {
        RankWeights {
            vector: 0.5,
            text: 0.3,
            metadata: 0.1,
            recency: 0.1,
        }
    }
}

/// Per-field multipliers applied before combination.
#[derive(Debug, Clone, Copy)]
pub struct FieldBoosts {
    pub text: f64,
    pub metadata: f64,
    pub topic: f64,
}

impl Default for FieldBoosts {
    fn default() -> Self {
        FieldBoosts {
            text: 1.0,
            metadata: 0.1,
            topic: 0.1,
        }
    }
}

/// Options for `Stacks::advanced_search`.
#[derive(Debug, Clone, Default)]
pub struct AdvancedSearchOptions {
    pub query_embedding: Option<Vec<f32>>,
    pub text: Option<TextSearchOptions>,
    pub metadata: Vec<(String, crate::textmatch::MetadataFilter)>,
    pub date_range: Option<DateRange>,
    pub topic_filter: Option<String>,
    pub field_boosts: FieldBoosts,
    pub rank_by: RankByOption,
    pub rank_weights: RankWeights,
    pub max_results: usize,
    pub similarity_threshold: f64,
}

/// Options for `Stacks::recommend`.
#[derive(Debug, Clone, Default)]
pub struct RecommendOptions {
    pub query_embedding: Option<Vec<f32>>,
    pub topic: Option<String>,
    pub max_results: usize,
}

/// `rank_by` defaults to `Vector` when a query embedding is present, else
/// `Text`; `AdvancedSearchOptions::default()` leaves this unset so
/// `Stacks::advanced_search` can apply that rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RankByOption {
    #[default]
    Auto,
    Explicit(RankBy),
}
