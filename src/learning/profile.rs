use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Weights applied during `weighted` ranking and `recommend`. The source
/// system's implicit defaults are `{vector: 0.6, recency: 0.2,
/// frequency: 0.2}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct WeightProfile {
    pub vector: f64,
    pub recency: f64,
    pub frequency: f64,
}

impl Default for WeightProfile {
    fn default() -> Self {
        WeightProfile {
            vector: 0.6,
            recency: 0.2,
            frequency: 0.2,
        }
    }
}

impl WeightProfile {
    /// Clamp each weight into `[floor, ceiling]` then rescale so the three
    /// sum to 1.0.
    pub fn renormalize(mut self, floor: f64, ceiling: f64) -> Self {
        self.vector = self.vector.clamp(floor, ceiling);
        self.recency = self.recency.clamp(floor, ceiling);
        self.frequency = self.frequency.clamp(floor, ceiling);
        let sum = self.vector + self.recency + self.frequency;
        if sum > 0.0 {
            self.vector /= sum;
            self.recency /= sum;
            self.frequency /= sum;
        }
        self
    }
}

/// Per-id implicit feedback derived from observed queries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImplicitFeedback {
    /// Number of *diverse* queries that returned this id.
    pub query_count: u32,
    /// Total number of times this id was returned, including repeats.
    pub total_retrievals: u64,
    pub last_query_timestamp: i64,
    /// Embeddings of diverse queries that returned this id (cap 20). Not
    /// persisted across serialize/restore.
    #[serde(skip)]
    pub sampled_query_embeddings: VecDeque<Vec<f32>>,
}

/// Per-id explicit feedback recorded via `recordFeedback`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExplicitFeedback {
    pub positive: u32,
    pub negative: u32,
}

/// Per-topic learning state, consulted only once `query_count >= 10`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicProfile {
    pub weights: WeightProfile,
    pub interest_embedding: Vec<f32>,
    pub query_count: u32,
    #[serde(skip)]
    pub query_history: VecDeque<(i64, Vec<f32>)>,
}

impl TopicProfile {
    pub fn new(dimension: usize) -> Self {
        TopicProfile {
            weights: WeightProfile::default(),
            interest_embedding: vec![0.0; dimension],
            query_count: 0,
            query_history: VecDeque::new(),
        }
    }
}
