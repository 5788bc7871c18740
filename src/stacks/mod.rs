//! Stacks: the vector store. Owns the live volume collection and every
//! secondary index, and is the sole mutator of
//! both — a query never observes a volume present in one index but
//! missing from another, or vice versa.

pub mod persistence;
pub mod search;
pub mod types;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::atoms::{metadata_keys, Logger, Volume};
use crate::cataloging::{InvertedIndex, MagnitudeCache, MetadataIndex, TopicIndex};
use crate::config::LibraryConfig;
use crate::dedup::{self, DuplicateGroup};
use crate::learning::{LearningEngine, WeightProfile};
use crate::textmatch::{MetadataFilter, RegexCache};
use crate::{LibraryError, LibraryResult};

pub use types::{
    AdvancedScoredVolume, AdvancedSearchOptions, ComponentScores, DateRange, FieldBoosts, RankBy, RankByOption,
    RankWeights, RecommendOptions, ScoredVolume, TextMatchMode, TextSearchOptions,
};

/// The vector store: owns volumes, every secondary index, and (when
/// enabled) the learning engine. All mutations go through `&mut self`
/// methods, so index/volume-table consistency (invariant 3) never needs
/// external locking within a single process.
pub struct Stacks {
    config: LibraryConfig,
    logger: Arc<dyn Logger>,
    dimension: Option<usize>,
    volumes: HashMap<String, Volume>,
    magnitudes: MagnitudeCache,
    metadata_index: MetadataIndex,
    topic_index: TopicIndex,
    topics_by_id: HashMap<String, Vec<String>>,
    inverted_index: InvertedIndex,
    regex_cache: RegexCache,
    learning: Option<LearningEngine>,
    path: Option<PathBuf>,
    dirty: bool,
    autosave_generation: Arc<AtomicU64>,
}

impl Stacks {
    pub fn new(config: LibraryConfig, logger: Arc<dyn Logger>) -> Self {
        let learning = config
            .learning
            .enabled
            .then(|| LearningEngine::new(0, config.learning.to_engine_config()));
        Stacks {
            topic_index: TopicIndex::with_max_topics_per_entry(config.max_topics_per_entry),
            regex_cache: RegexCache::new(config.regex_cache_capacity),
            inverted_index: InvertedIndex::new(config.bm25),
            config,
            logger,
            dimension: None,
            volumes: HashMap::new(),
            magnitudes: MagnitudeCache::new(),
            metadata_index: MetadataIndex::new(),
            topics_by_id: HashMap::new(),
            learning,
            path: None,
            dirty: false,
            autosave_generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Load a persisted document from `path` into this (otherwise empty)
    /// store, rebuilding every index from the recovered volumes, and
    /// remember `path` for future autosaves/`dispose`.
    pub async fn load(&mut self, path: impl AsRef<Path>) -> LibraryResult<()> {
        let path = path.as_ref();
        if !tokio::fs::try_exists(path).await.unwrap_or(false) {
            self.path = Some(path.to_path_buf());
            return Ok(());
        }

        let document = persistence::load(path, self.logger.as_ref()).await?;
        self.dimension = Some(document.dimension);

        if self.config.learning.enabled {
            self.learning = Some(match document.learning {
                Some(snapshot) => LearningEngine::from_snapshot(document.dimension, self.config.learning.to_engine_config(), snapshot),
                None => LearningEngine::new(document.dimension, self.config.learning.to_engine_config()),
            });
        }

        for volume in document.volumes {
            self.magnitudes.set(&volume.id, &volume.embedding);
            self.metadata_index.insert(&volume.id, &volume.metadata);
            let topics = self.topic_index.add_entry(&volume);
            self.topics_by_id.insert(volume.id.clone(), topics);
            self.inverted_index.add_document(&volume.id, &volume.text);
            self.volumes.insert(volume.id.clone(), volume);
        }

        self.path = Some(path.to_path_buf());
        self.dirty = false;
        Ok(())
    }

    /// Flush synchronously (if dirty and a path is configured) and stop
    /// accepting further autosaves from superseded debounce tasks.
    pub async fn dispose(&mut self) -> LibraryResult<()> {
        self.autosave_generation.fetch_add(1, Ordering::SeqCst);
        if self.dirty {
            self.save_now().await?;
        }
        Ok(())
    }

    async fn save_now(&mut self) -> LibraryResult<()> {
        let Some(path) = self.path.clone() else {
            return Ok(());
        };
        let volumes: Vec<Volume> = self.volumes.values().cloned().collect();
        let learning_snapshot = self.learning.as_ref().map(|e| e.to_snapshot());
        persistence::save(&path, self.dimension.unwrap_or(0), &volumes, learning_snapshot.as_ref(), false).await?;
        self.dirty = false;
        Ok(())
    }

    /// Mark the store dirty and, if a path and non-zero debounce interval
    /// are configured, schedule a debounced background autosave: a
    /// generation counter lets a later mutation supersede an
    /// already-scheduled save rather than stacking up redundant writes.
    fn mark_dirty(&mut self) {
        self.dirty = true;
        let Some(path) = self.path.clone() else { return };
        if self.config.autosave_debounce_ms == 0 {
            return;
        }
        let generation = self.autosave_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let generation_flag = self.autosave_generation.clone();
        let debounce = Duration::from_millis(self.config.autosave_debounce_ms);
        let dimension = self.dimension.unwrap_or(0);
        let volumes: Vec<Volume> = self.volumes.values().cloned().collect();
        let learning_snapshot = self.learning.as_ref().map(|e| e.to_snapshot());
        let logger = self.logger.clone();
        tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if generation_flag.load(Ordering::SeqCst) != generation {
                return;
            }
            if let Err(e) = persistence::save(&path, dimension, &volumes, learning_snapshot.as_ref(), false).await {
                logger.error(&format!("autosave failed: {e}"));
            }
        });
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    fn validate_embedding(&mut self, embedding: &[f32]) -> LibraryResult<()> {
        let expected = *self.dimension.get_or_insert(embedding.len());
        if embedding.len() != expected {
            return Err(LibraryError::DimensionMismatch {
                expected,
                actual: embedding.len(),
            });
        }
        if crate::cataloging::magnitude::l2_norm(embedding) <= 0.0 {
            return Err(LibraryError::ZeroMagnitudeEmbedding);
        }
        Ok(())
    }

    fn insert_volume(&mut self, volume: Volume) {
        self.magnitudes.set(&volume.id, &volume.embedding);
        self.metadata_index.insert(&volume.id, &volume.metadata);
        let topics = self.topic_index.add_entry(&volume);
        self.topics_by_id.insert(volume.id.clone(), topics);
        self.inverted_index.add_document(&volume.id, &volume.text);
        self.volumes.insert(volume.id.clone(), volume);
    }

    /// Insert a new volume, generating an id. Fails with
    /// `DIMENSION_MISMATCH` when `embedding.len()` differs from the
    /// store-wide dimension (fixed on first insert), or
    /// `ZERO_MAGNITUDE_EMBEDDING` for a zero-magnitude vector.
    pub fn add(&mut self, text: String, embedding: Vec<f32>, metadata: HashMap<String, String>, now: i64) -> LibraryResult<String> {
        self.validate_embedding(&embedding)?;
        let id = Uuid::new_v4().to_string();
        let volume = Volume::new(id.clone(), text, embedding, metadata, now);
        self.insert_volume(volume);
        self.mark_dirty();
        Ok(id)
    }

    /// Insert many volumes atomically: either every entry is validated
    /// and inserted, or none are (the store is left unchanged on error).
    pub fn add_batch(&mut self, entries: Vec<(String, Vec<f32>, HashMap<String, String>)>, now: i64) -> LibraryResult<Vec<String>> {
        let expected_dimension = self.dimension;
        let mut probe = expected_dimension;
        for (_, embedding, _) in &entries {
            let expected = *probe.get_or_insert(embedding.len());
            if embedding.len() != expected {
                return Err(LibraryError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
            if crate::cataloging::magnitude::l2_norm(embedding) <= 0.0 {
                return Err(LibraryError::ZeroMagnitudeEmbedding);
            }
        }

        let mut ids = Vec::with_capacity(entries.len());
        for (text, embedding, metadata) in entries {
            self.dimension.get_or_insert(embedding.len());
            let id = Uuid::new_v4().to_string();
            let volume = Volume::new(id.clone(), text, embedding, metadata, now);
            self.insert_volume(volume);
            ids.push(id);
        }
        if !ids.is_empty() {
            self.mark_dirty();
        }
        Ok(ids)
    }

    fn remove_volume(&mut self, id: &str) -> Option<Volume> {
        let volume = self.volumes.remove(id)?;
        self.magnitudes.remove(id);
        self.metadata_index.remove(id, &volume.metadata);
        if let Some(topics) = self.topics_by_id.remove(id) {
            self.topic_index.remove_entry(id, &topics);
        }
        self.inverted_index.remove_document(id);
        if let Some(engine) = &mut self.learning {
            engine.prune(&[id.to_string()]);
        }
        Some(volume)
    }

    /// Remove `id` from the volume table and every index, pruning the
    /// learning engine's references to it.
    pub fn delete(&mut self, id: &str) -> LibraryResult<()> {
        self.remove_volume(id).ok_or_else(|| LibraryError::EntryNotFound(id.to_string()))?;
        self.mark_dirty();
        Ok(())
    }

    /// Remove every id in `ids`. Validates all ids exist before removing
    /// any, for the same all-or-nothing predictability as `add_batch`.
    pub fn delete_batch(&mut self, ids: &[String]) -> LibraryResult<()> {
        for id in ids {
            if !self.volumes.contains_key(id) {
                return Err(LibraryError::EntryNotFound(id.clone()));
            }
        }
        for id in ids {
            self.remove_volume(id);
        }
        if !ids.is_empty() {
            self.mark_dirty();
        }
        Ok(())
    }

    /// Remove every volume and reset every index.
    pub fn clear(&mut self) {
        let ids: Vec<String> = self.volumes.keys().cloned().collect();
        self.volumes.clear();
        self.magnitudes.clear();
        self.metadata_index.clear();
        self.topic_index.clear();
        self.topics_by_id.clear();
        self.inverted_index.clear();
        if let Some(engine) = &mut self.learning {
            engine.prune(&ids);
        }
        self.mark_dirty();
    }

    fn track_access(&mut self, ids: &[String], now: i64) {
        for id in ids {
            if let Some(volume) = self.volumes.get_mut(id) {
                volume.record_access(now);
            }
        }
    }

    /// Fetch a volume by id, recording access.
    pub fn get_by_id(&mut self, id: &str, now: i64) -> Option<Volume> {
        if self.volumes.contains_key(id) {
            self.track_access(&[id.to_string()], now);
        }
        self.volumes.get(id).cloned()
    }

    /// All live volumes, oldest first. A defensive copy: public getters
    /// never hand out references to mutable internal collections.
    pub fn get_all(&self) -> Vec<Volume> {
        let mut volumes: Vec<Volume> = self.volumes.values().cloned().collect();
        volumes.sort_by_key(|v| v.timestamp);
        volumes
    }

    pub fn get_topics(&self) -> Vec<String> {
        self.topic_index.all_topics()
    }

    pub fn filter_by_topic(&self, topic: &str) -> Vec<Volume> {
        let ids = self.topic_index.get_entries(topic);
        let mut volumes: Vec<Volume> = ids.iter().filter_map(|id| self.volumes.get(id).cloned()).collect();
        volumes.sort_by_key(|v| v.timestamp);
        volumes
    }

    pub fn get_related_topics(&self, topic: &str) -> Vec<(String, u64)> {
        self.topic_index.get_related_topics(topic)
    }

    /// Reassign every id directly under `from` to `to`, migrating
    /// co-occurrence counters along with it.
    pub fn merge_topic(&mut self, from: &str, to: &str) {
        self.topic_index.merge_topic(from, to);
        self.mark_dirty();
    }

    /// Reassign `id`'s topic to `new_topic`, updating `metadata.topic`
    /// and re-deriving its topic-index membership. Used by
    /// `CirculationDesk` reorganization jobs.
    pub fn relocate(&mut self, id: &str, new_topic: &str) -> LibraryResult<()> {
        if !self.volumes.contains_key(id) {
            return Err(LibraryError::EntryNotFound(id.to_string()));
        }
        if let Some(old_topics) = self.topics_by_id.remove(id) {
            self.topic_index.remove_entry(id, &old_topics);
        }
        let volume = self.volumes.get_mut(id).expect("checked above");
        volume.metadata.remove(metadata_keys::TOPICS);
        volume.metadata.insert(metadata_keys::TOPIC.to_string(), new_topic.to_string());
        let new_topics = self.topic_index.add_entry(volume);
        self.topics_by_id.insert(id.to_string(), new_topics);
        self.mark_dirty();
        Ok(())
    }

    /// Pure cosine search via the magnitude cache. Tracks access on every
    /// returned id and, when learning is enabled, records the query.
    pub fn search(&mut self, query_embedding: &[f32], max_results: usize, threshold: f64, now: i64) -> Vec<ScoredVolume> {
        let refs: Vec<&Volume> = self.volumes.values().collect();
        let mut results = search::vector_search(&refs, &mut self.magnitudes, query_embedding, max_results, threshold);

        let ids: Vec<String> = results.iter().map(|r| r.volume.id.clone()).collect();
        self.track_access(&ids, now);
        for result in &mut results {
            if let Some(live) = self.volumes.get(&result.volume.id) {
                result.volume = live.clone();
            }
        }

        if let Some(engine) = &mut self.learning {
            if !ids.is_empty() {
                engine.record_query(query_embedding, &ids, None, now);
            }
        }
        results
    }

    /// `fuzzy`/`substring`/`exact`/`regex`/`token`/`bm25` text search.
    pub fn text_search(&mut self, options: &TextSearchOptions, now: i64) -> Vec<ScoredVolume> {
        let refs: Vec<&Volume> = self.volumes.values().collect();
        let mut results = search::text_search(&refs, &self.inverted_index, &self.regex_cache, options);
        let ids: Vec<String> = results.iter().map(|r| r.volume.id.clone()).collect();
        self.track_access(&ids, now);
        for result in &mut results {
            if let Some(live) = self.volumes.get(&result.volume.id) {
                result.volume = live.clone();
            }
        }
        results
    }

    /// The canonical ranking pipeline. Records the query against the
    /// learning engine (scoped to `options.topic_filter`) whenever a query
    /// embedding was supplied.
    pub fn advanced_search(&mut self, options: &AdvancedSearchOptions, now: i64) -> Vec<AdvancedScoredVolume> {
        let refs: Vec<&Volume> = self.volumes.values().collect();
        let topic_index = &self.topic_index;

        // Intersect the metadata index's O(1) lookups across every `Eq`
        // (key,value -> ids) and `Exists` (key -> ids) filter in the
        // query; `None` means there was nothing to narrow by, in which
        // case every id passes through to the full per-filter scan below.
        let equality_candidates: Option<std::collections::HashSet<String>> = options
            .metadata
            .iter()
            .filter_map(|(key, filter)| match filter {
                MetadataFilter::Eq(value) => Some(self.metadata_index.ids_with_key_value(key, value)),
                MetadataFilter::Exists => Some(self.metadata_index.ids_with_key(key)),
                _ => None,
            })
            .fold(None, |acc: Option<std::collections::HashSet<String>>, hit| {
                Some(match acc {
                    Some(candidates) => candidates.intersection(&hit).cloned().collect(),
                    None => hit,
                })
            });

        let mut results = search::advanced_search(
            &refs,
            &mut self.magnitudes,
            &self.inverted_index,
            &self.regex_cache,
            |id| equality_candidates.as_ref().map(|c| c.contains(id)).unwrap_or(true),
            |topic| !topic_index.get_entries(topic).is_empty(),
            options,
            now,
        );

        let ids: Vec<String> = results.iter().map(|r| r.volume.id.clone()).collect();
        self.track_access(&ids, now);
        for result in &mut results {
            if let Some(live) = self.volumes.get(&result.volume.id) {
                result.volume = live.clone();
            }
        }

        if options.query_embedding.is_some() {
            if let Some(engine) = &mut self.learning {
                if !ids.is_empty() {
                    engine.record_query(options.query_embedding.as_deref().unwrap(), &ids, options.topic_filter.as_deref(), now);
                }
            }
        }
        results
    }

    /// Vector + recency + frequency, blended by the learning engine's
    /// adapted weights (global, or the topic's own once it has seen
    /// enough queries), then multiplied by the per-id relevance/interest
    /// boost. With learning disabled, the default weight profile and a
    /// boost of 1.0 apply.
    pub fn recommend(&mut self, options: &RecommendOptions, now: i64) -> Vec<AdvancedScoredVolume> {
        let weights = self
            .learning
            .as_ref()
            .map(|e| e.adapted_weights(options.topic.as_deref()))
            .unwrap_or_default();

        let query_magnitude = options.query_embedding.as_deref().map(crate::cataloging::magnitude::l2_norm);

        let mut results: Vec<AdvancedScoredVolume> = self
            .volumes
            .values()
            .map(|volume| {
                let vector_score = match (&options.query_embedding, query_magnitude) {
                    (Some(q), Some(qmag)) => {
                        let magnitude = self.magnitudes.get(&volume.id).unwrap_or_else(|| crate::cataloging::magnitude::l2_norm(&volume.embedding));
                        Some(dedup::cosine_similarity(q, &volume.embedding, qmag, magnitude))
                    }
                    _ => None,
                };
                let recency = search::recency_score(now, volume.timestamp);
                let frequency = self
                    .learning
                    .as_ref()
                    .map(|e| frequency_score(e.total_retrievals(&volume.id)))
                    .unwrap_or(0.0);

                let blended = weights.vector * vector_score.unwrap_or(0.0) + weights.recency * recency + weights.frequency * frequency;
                let boost = self
                    .learning
                    .as_ref()
                    .map(|e| e.boost(&volume.id, &volume.embedding, options.topic.as_deref()))
                    .unwrap_or(1.0);

                AdvancedScoredVolume {
                    volume: volume.clone(),
                    score: blended * boost,
                    scores: ComponentScores {
                        vector: vector_score,
                        text: None,
                    },
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.volume.timestamp.cmp(&a.volume.timestamp))
                .then_with(|| a.volume.id.cmp(&b.volume.id))
        });
        results.truncate(options.max_results);
        let ids: Vec<String> = results.iter().map(|r| r.volume.id.clone()).collect();
        self.track_access(&ids, now);
        for result in &mut results {
            if let Some(live) = self.volumes.get(&result.volume.id) {
                result.volume = live.clone();
            }
        }
        results
    }

    pub fn find_duplicates(&mut self, threshold: f64) -> Vec<DuplicateGroup> {
        let volumes: Vec<Volume> = self.volumes.values().cloned().collect();
        dedup::find_duplicates(&volumes, &mut self.magnitudes, threshold)
    }

    pub fn check_duplicate(&mut self, embedding: &[f32], threshold: f64) -> Option<String> {
        let volumes: Vec<Volume> = self.volumes.values().cloned().collect();
        dedup::check_duplicate(embedding, &volumes, &mut self.magnitudes, threshold)
    }

    pub fn is_learning_enabled(&self) -> bool {
        self.learning.is_some()
    }

    pub fn record_feedback(&mut self, id: &str, positive: bool) -> LibraryResult<()> {
        let engine = self.learning.as_mut().ok_or(LibraryError::LearningDisabled)?;
        engine.record_feedback(id, positive);
        self.mark_dirty();
        Ok(())
    }

    pub fn adapted_weights(&self, topic: Option<&str>) -> WeightProfile {
        self.learning.as_ref().map(|e| e.adapted_weights(topic)).unwrap_or_default()
    }
}

/// Saturating normalization of a raw retrieval count into `[0, 1)`: more
/// retrievals approach but never reach 1, so `recommend`'s frequency
/// component never fully dominates the other two.
fn frequency_score(total_retrievals: u64) -> f64 {
    let tr = total_retrievals as f64;
    tr / (tr + 10.0)
}
