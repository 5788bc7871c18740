use std::collections::{HashMap, HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::codec::{decode_embedding, encode_embedding};

use super::profile::{ExplicitFeedback, ImplicitFeedback, TopicProfile, WeightProfile};

/// Half-life of seven days, expressed as a decay constant for
/// `exp(-decay * age_ms)`.
const DECAY_CONSTANT: f64 = std::f64::consts::LN_2 / (7.0 * 86_400.0 * 1000.0);

/// Separator used to join a canonical id pair into a single JSON object key.
const CORRELATION_KEY_SEP: char = '\u{1}';

#[derive(Debug, Clone, Copy)]
pub struct LearningConfig {
    pub adaptation_rate: f64,
    pub max_history: usize,
    pub diversity_sample_cap: usize,
    pub diversity_cosine_threshold: f64,
    pub interest_boost_weight: f64,
    pub min_topic_queries: u32,
}

impl Default for LearningConfig {
    fn default() -> Self {
        LearningConfig {
            adaptation_rate: 0.05,
            max_history: 50,
            diversity_sample_cap: 20,
            diversity_cosine_threshold: 0.9,
            interest_boost_weight: 0.2,
            min_topic_queries: 10,
        }
    }
}

/// Global + per-topic adaptive relevance state.
pub struct LearningEngine {
    dimension: usize,
    config: LearningConfig,
    global_weights: WeightProfile,
    global_interest: Vec<f32>,
    global_history: VecDeque<(i64, Vec<f32>)>,
    implicit: HashMap<String, ImplicitFeedback>,
    explicit: HashMap<String, ExplicitFeedback>,
    correlations: HashMap<(String, String), u64>,
    topics: HashMap<String, TopicProfile>,
}

impl LearningEngine {
    pub fn new(dimension: usize, config: LearningConfig) -> Self {
        LearningEngine {
            dimension,
            config,
            global_weights: WeightProfile::default(),
            global_interest: vec![0.0; dimension],
            global_history: VecDeque::new(),
            implicit: HashMap::new(),
            explicit: HashMap::new(),
            correlations: HashMap::new(),
            topics: HashMap::new(),
        }
    }

    /// Update protocol on `recordQuery`: update per-id implicit feedback
    /// with diversity gating and co-occurrence unconditionally, then adapt
    /// weights and recompute the interest embedding against the global
    /// profile for topic-less queries, or the named topic's own profile
    /// otherwise.
    pub fn record_query(&mut self, query_embedding: &[f32], result_ids: &[String], topic: Option<&str>, now: i64) {
        let prior_frequent = result_ids
            .iter()
            .filter(|id| self.implicit.get(*id).map(|f| f.total_retrievals > 3).unwrap_or(false))
            .count();

        for id in result_ids {
            let entry = self.implicit.entry(id.clone()).or_default();
            entry.total_retrievals += 1;
            entry.last_query_timestamp = now;

            let is_diverse = entry
                .sampled_query_embeddings
                .iter()
                .all(|sample| cosine(sample, query_embedding) < self.config.diversity_cosine_threshold);

            if is_diverse {
                entry.query_count += 1;
                entry.sampled_query_embeddings.push_back(query_embedding.to_vec());
                while entry.sampled_query_embeddings.len() > self.config.diversity_sample_cap {
                    entry.sampled_query_embeddings.pop_front();
                }
            }
        }

        bump_correlations(&mut self.correlations, result_ids);

        let frequent_fraction = if result_ids.is_empty() {
            0.0
        } else {
            prior_frequent as f64 / result_ids.len() as f64
        };

        // Steps 1/4/5 run against the global state for topic-less queries,
        // and against the topic's own state for topic-scoped queries — the
        // two buckets are independent learning tracks, so a topic with zero
        // queries keeps the untouched default global profile.
        match topic {
            None => {
                push_history(&mut self.global_history, now, query_embedding.to_vec(), self.config.max_history);
                self.global_weights = adapt_weights(self.global_weights, frequent_fraction, self.config.adaptation_rate);
                self.global_interest = recompute_interest(&self.global_history, now, self.dimension);
            }
            Some(topic) => {
                let profile = self
                    .topics
                    .entry(topic.to_string())
                    .or_insert_with(|| TopicProfile::new(self.dimension));
                push_history(&mut profile.query_history, now, query_embedding.to_vec(), self.config.max_history);
                profile.query_count += 1;
                profile.weights = adapt_weights(profile.weights, frequent_fraction, self.config.adaptation_rate);
                profile.interest_embedding = recompute_interest(&profile.query_history, now, self.dimension);
            }
        }
    }

    /// `clamp((queryCount + 5*positive - 3*negative) / maxHistory, 0, 1)`.
    pub fn relevance_score(&self, id: &str) -> f64 {
        let query_count = self.implicit.get(id).map(|f| f.query_count).unwrap_or(0) as f64;
        let (positive, negative) = self
            .explicit
            .get(id)
            .map(|f| (f.positive as f64, f.negative as f64))
            .unwrap_or((0.0, 0.0));
        ((query_count + 5.0 * positive - 3.0 * negative) / self.config.max_history as f64).clamp(0.0, 1.0)
    }

    /// The relevance + interest-cosine boost for `id`, clamped to `[0.8, 1.2]`.
    pub fn boost(&self, id: &str, embedding: &[f32], topic: Option<&str>) -> f64 {
        let effective_interest = topic
            .and_then(|t| self.topics.get(t))
            .filter(|p| p.query_count >= self.config.min_topic_queries)
            .map(|p| p.interest_embedding.as_slice())
            .unwrap_or(self.global_interest.as_slice());

        let mut boost = 1.0;
        boost += 0.1 * self.relevance_score(id);
        boost += self.config.interest_boost_weight * cosine(embedding, effective_interest).max(0.0);
        boost.clamp(0.8, 1.2)
    }

    /// The weights to use for ranking: the topic's adapted weights once it
    /// has seen `min_topic_queries` queries, else the global weights.
    pub fn adapted_weights(&self, topic: Option<&str>) -> WeightProfile {
        topic
            .and_then(|t| self.topics.get(t))
            .filter(|p| p.query_count >= self.config.min_topic_queries)
            .map(|p| p.weights)
            .unwrap_or(self.global_weights)
    }

    pub fn interest_embedding(&self, topic: Option<&str>) -> Vec<f32> {
        topic
            .and_then(|t| self.topics.get(t))
            .filter(|p| p.query_count >= self.config.min_topic_queries)
            .map(|p| p.interest_embedding.clone())
            .unwrap_or_else(|| self.global_interest.clone())
    }

    pub fn record_feedback(&mut self, id: &str, positive: bool) {
        let entry = self.explicit.entry(id.to_string()).or_default();
        if positive {
            entry.positive += 1;
        } else {
            entry.negative += 1;
        }
    }

    pub fn relevance_feedback(&self, id: &str) -> Option<&ImplicitFeedback> {
        self.implicit.get(id)
    }

    /// Total retrievals recorded for `id`, or 0 if it has never been
    /// returned by a query. Feeds `recommend`'s frequency component.
    pub fn total_retrievals(&self, id: &str) -> u64 {
        self.implicit.get(id).map(|f| f.total_retrievals).unwrap_or(0)
    }

    /// Drop every reference to `ids`: implicit/explicit feedback and any
    /// correlation entry keying or valuing one of them.
    pub fn prune(&mut self, ids: &[String]) {
        let doomed: HashSet<&str> = ids.iter().map(String::as_str).collect();
        for id in ids {
            self.implicit.remove(id);
            self.explicit.remove(id);
        }
        self.correlations
            .retain(|(a, b), _| !doomed.contains(a.as_str()) && !doomed.contains(b.as_str()));
    }

    pub fn global_weights(&self) -> WeightProfile {
        self.global_weights
    }

    pub fn global_interest(&self) -> &[f32] {
        &self.global_interest
    }

    pub fn to_snapshot(&self) -> LearningSnapshot {
        LearningSnapshot {
            global_weights: self.global_weights,
            global_interest_embedding: encode_embedding(&self.global_interest),
            implicit_feedback: self
                .implicit
                .iter()
                .map(|(id, f)| {
                    (
                        id.clone(),
                        ImplicitFeedbackSnapshot {
                            query_count: f.query_count,
                            total_retrievals: f.total_retrievals,
                            last_query_timestamp: f.last_query_timestamp,
                        },
                    )
                })
                .collect(),
            explicit_feedback: self.explicit.clone(),
            topics: self
                .topics
                .iter()
                .map(|(topic, profile)| {
                    (
                        topic.clone(),
                        TopicProfileSnapshot {
                            weights: profile.weights,
                            interest_embedding: encode_embedding(&profile.interest_embedding),
                            query_count: profile.query_count,
                        },
                    )
                })
                .collect(),
            correlations: self
                .correlations
                .iter()
                .map(|((a, b), count)| (format!("{a}{CORRELATION_KEY_SEP}{b}"), *count))
                .collect(),
        }
    }

    pub fn from_snapshot(dimension: usize, config: LearningConfig, snapshot: LearningSnapshot) -> Self {
        let global_interest = decode_embedding(&snapshot.global_interest_embedding).unwrap_or_else(|| vec![0.0; dimension]);
        let implicit = snapshot
            .implicit_feedback
            .into_iter()
            .map(|(id, f)| {
                (
                    id,
                    ImplicitFeedback {
                        query_count: f.query_count,
                        total_retrievals: f.total_retrievals,
                        last_query_timestamp: f.last_query_timestamp,
                        sampled_query_embeddings: VecDeque::new(),
                    },
                )
            })
            .collect();
        let topics = snapshot
            .topics
            .into_iter()
            .map(|(topic, p)| {
                let interest = decode_embedding(&p.interest_embedding).unwrap_or_else(|| vec![0.0; dimension]);
                (
                    topic,
                    TopicProfile {
                        weights: p.weights,
                        interest_embedding: interest,
                        query_count: p.query_count,
                        query_history: VecDeque::new(),
                    },
                )
            })
            .collect();
        let correlations = snapshot
            .correlations
            .into_iter()
            .filter_map(|(key, count)| {
                let (a, b) = key.split_once(CORRELATION_KEY_SEP)?;
                Some(((a.to_string(), b.to_string()), count))
            })
            .collect();

        LearningEngine {
            dimension,
            config,
            global_weights: snapshot.global_weights,
            global_interest,
            global_history: VecDeque::new(),
            implicit,
            explicit: snapshot.explicit_feedback,
            correlations,
            topics,
        }
    }
}

/// On-disk/serializable form of the learning engine. Query-embedding
/// diversity samples and raw query history are dropped; they are rebuilt
/// from future queries.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningSnapshot {
    pub global_weights: WeightProfile,
    pub global_interest_embedding: String,
    pub implicit_feedback: HashMap<String, ImplicitFeedbackSnapshot>,
    pub explicit_feedback: HashMap<String, ExplicitFeedback>,
    pub topics: HashMap<String, TopicProfileSnapshot>,
    pub correlations: HashMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImplicitFeedbackSnapshot {
    pub query_count: u32,
    pub total_retrievals: u64,
    pub last_query_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopicProfileSnapshot {
    pub weights: WeightProfile,
    pub interest_embedding: String,
    pub query_count: u32,
}

fn push_history(history: &mut VecDeque<(i64, Vec<f32>)>, now: i64, embedding: Vec<f32>, cap: usize) {
    history.push_back((now, embedding));
    while history.len() > cap {
        history.pop_front();
    }
}

fn bump_correlations(correlations: &mut HashMap<(String, String), u64>, ids: &[String]) {
    for i in 0..ids.len() {
        for j in (i + 1)..ids.len() {
            if ids[i] == ids[j] {
                continue;
            }
            let key = if ids[i] <= ids[j] {
                (ids[i].clone(), ids[j].clone())
            } else {
                (ids[j].clone(), ids[i].clone())
            };
            *correlations.entry(key).or_insert(0) += 1;
        }
    }
}

fn adapt_weights(current: WeightProfile, frequent_fraction: f64, adaptation_rate: f64) -> WeightProfile {
    let shift = 0.5 * adaptation_rate;
    let mut next = current;
    if frequent_fraction > 0.5 {
        next.vector -= shift;
        next.frequency += shift;
    } else {
        next.frequency -= shift;
        next.vector += shift;
    }
    next.renormalize(0.05, 0.9)
}

fn recompute_interest(history: &VecDeque<(i64, Vec<f32>)>, now: i64, dimension: usize) -> Vec<f32> {
    if history.is_empty() {
        return vec![0.0; dimension];
    }
    let mut accumulator = vec![0.0_f64; dimension];
    let mut weight_sum = 0.0_f64;
    for (timestamp, embedding) in history {
        let age = (now - timestamp).max(0) as f64;
        let weight = (-DECAY_CONSTANT * age).exp();
        for (slot, value) in accumulator.iter_mut().zip(embedding.iter()) {
            *slot += weight * *value as f64;
        }
        weight_sum += weight;
    }
    if weight_sum <= 0.0 {
        return vec![0.0; dimension];
    }
    let mean: Vec<f32> = accumulator.iter().map(|v| (*v / weight_sum) as f32).collect();
    l2_normalize(mean)
}

fn l2_normalize(vector: Vec<f32>) -> Vec<f32> {
    let norm: f64 = vector.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    if norm <= 1e-12 {
        return vector;
    }
    vector.into_iter().map(|v| (v as f64 / norm) as f32).collect()
}

fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(x, y)| *x as f64 * *y as f64).sum();
    let norm_a: f64 = a.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    let norm_b: f64 = b.iter().map(|v| (*v as f64).powi(2)).sum::<f64>().sqrt();
    if norm_a <= 1e-12 || norm_b <= 1e-12 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(-1.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_query_is_idempotent_for_diversity() {
        let mut engine = LearningEngine::new(4, LearningConfig::default());
        let embedding = vec![1.0, 0.0, 0.0, 0.0];
        let ids = vec!["v1".to_string()];

        engine.record_query(&embedding, &ids, None, 1_000);
        engine.record_query(&embedding, &ids, None, 2_000);

        let feedback = engine.relevance_feedback("v1").unwrap();
        assert_eq!(feedback.total_retrievals, 2);
        assert_eq!(feedback.query_count, 1);
    }

    #[test]
    fn prune_removes_feedback_and_correlations() {
        let mut engine = LearningEngine::new(4, LearningConfig::default());
        let embedding = vec![1.0, 0.0, 0.0, 0.0];
        let ids = vec!["v1".to_string(), "v2".to_string()];
        engine.record_query(&embedding, &ids, None, 1_000);

        engine.prune(&["v1".to_string()]);
        assert!(engine.relevance_feedback("v1").is_none());
        assert!(engine.correlations.is_empty());
    }

    #[test]
    fn learning_drift_scenario() {
        let mut engine = LearningEngine::new(4, LearningConfig::default());
        let baseline = WeightProfile::default();

        for i in 0..15 {
            let embedding = vec![1.0, 0.1, 0.0, 0.0];
            engine.record_query(&embedding, &["v1".to_string()], Some("science"), 1_000 * i);
        }

        let science_weights = engine.adapted_weights(Some("science"));
        assert_ne!(science_weights, baseline);

        let art_weights = engine.adapted_weights(Some("art"));
        assert_eq!(art_weights, baseline);
    }

    #[test]
    fn serialize_restore_round_trip_preserves_weights_and_interest() {
        let mut engine = LearningEngine::new(4, LearningConfig::default());
        engine.record_query(&[1.0, 0.0, 0.0, 0.0], &["v1".to_string()], Some("topic"), 0);
        engine.record_feedback("v1", true);

        let snapshot = engine.to_snapshot();
        let restored = LearningEngine::from_snapshot(4, LearningConfig::default(), snapshot);

        assert_eq!(restored.global_weights(), engine.global_weights());
        assert_eq!(restored.global_interest(), engine.global_interest());
        assert_eq!(
            restored.relevance_feedback("v1").unwrap().query_count,
            engine.relevance_feedback("v1").unwrap().query_count
        );
    }
}
