//! The Library façade: wraps `Stacks`, adds embedding/generation
//! orchestration, event emission, the query DSL, compendium (summarize +
//! store), feedback forwarding, and shelf scoping.

pub mod dsl;

use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use async_trait::async_trait;

use crate::atoms::{metadata_keys, CancellationToken, EventBus, Logger, LibraryEvent, NullEventBus, NullLogger, Volume};
use crate::config::LibraryConfig;
use crate::stacks::{AdvancedScoredVolume, AdvancedSearchOptions, RecommendOptions, ScoredVolume, Stacks, TextMatchMode, TextSearchOptions};
use crate::{LibraryError, LibraryResult};

/// Produces embeddings for one or more texts. All vectors returned for a
/// single call must share the store's dimension and have non-zero
/// magnitude; implementations decide what "model" means.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, inputs: &[String]) -> LibraryResult<Vec<Vec<f32>>>;
}

/// Produces free text from a prompt (and optional system prompt), used by
/// `compendium` to synthesize a summary volume.
#[async_trait]
pub trait TextGenerationProvider: Send + Sync {
    async fn generate(&self, prompt: &str, system_prompt: Option<&str>) -> LibraryResult<String>;
}

/// Default summarization prompt prefix used when `compendium` is not
/// given an explicit `prompt`.
const DEFAULT_COMPENDIUM_PROMPT: &str = "Summarize the following notes into a single cohesive passage:\n\n";

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Wraps `Stacks` with the embedding/generation/event collaborators.
/// The text generator is held weakly and is swappable at runtime:
/// `compendium` upgrades it on each call and fails with
/// `NO_TEXT_GENERATOR` if it has been dropped or was never set.
pub struct Library {
    stacks: Stacks,
    embedder: Arc<dyn EmbeddingProvider>,
    generator: Option<Weak<dyn TextGenerationProvider>>,
    events: Arc<dyn EventBus>,
    logger: Arc<dyn Logger>,
    config: LibraryConfig,
}

impl Library {
    pub fn new(stacks: Stacks, embedder: Arc<dyn EmbeddingProvider>, config: LibraryConfig) -> Self {
        Library {
            stacks,
            embedder,
            generator: None,
            events: Arc::new(NullEventBus),
            logger: Arc::new(NullLogger),
            config,
        }
    }

    pub fn with_event_bus(mut self, events: Arc<dyn EventBus>) -> Self {
        self.events = events;
        self
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }

    /// Swap the configured text generator. Holding only a weak reference
    /// means dropping the caller's `Arc` silently disables `compendium`
    /// rather than keeping it alive past its owner's lifetime.
    pub fn set_text_generator(&mut self, generator: &Arc<dyn TextGenerationProvider>) {
        self.generator = Some(Arc::downgrade(generator));
    }

    pub fn stacks(&self) -> &Stacks {
        &self.stacks
    }

    pub fn stacks_mut(&mut self) -> &mut Stacks {
        &mut self.stacks
    }

    pub async fn load(&mut self, path: impl AsRef<std::path::Path>) -> LibraryResult<()> {
        self.stacks.load(path).await
    }

    pub async fn dispose(&mut self) -> LibraryResult<()> {
        self.stacks.dispose().await
    }

    async fn embed_one(&self, text: &str) -> LibraryResult<Vec<f32>> {
        let mut vectors = self.embedder.embed(std::slice::from_ref(&text.to_string())).await?;
        vectors.pop().ok_or_else(|| LibraryError::EmbeddingFailed("provider returned no vectors".to_string()))
    }

    /// Embed `text` and store it. Fails with `EMPTY_TEXT` for blank text
    /// and `EMBEDDING_FAILED` if the provider errors; no partial mutation
    /// occurs on either failure.
    pub async fn add(&mut self, text: String, metadata: HashMap<String, String>, cancel: Option<&CancellationToken>) -> LibraryResult<String> {
        if text.trim().is_empty() {
            return Err(LibraryError::EmptyText);
        }
        let embedding = self.embed_one(&text).await?;
        if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
            return Err(LibraryError::Cancelled);
        }
        let content_length = text.len();
        let id = self.stacks.add(text, embedding, metadata, now_millis())?;
        self.events.emit(LibraryEvent::Shelve { id: id.clone(), content_length });
        Ok(id)
    }

    /// Embed and store many texts in one batch call to the provider, then
    /// insert them atomically into `Stacks`.
    pub async fn add_batch(&mut self, entries: Vec<(String, HashMap<String, String>)>, cancel: Option<&CancellationToken>) -> LibraryResult<Vec<String>> {
        for (text, _) in &entries {
            if text.trim().is_empty() {
                return Err(LibraryError::EmptyText);
            }
        }
        if entries.is_empty() {
            return Ok(Vec::new());
        }
        let texts: Vec<String> = entries.iter().map(|(t, _)| t.clone()).collect();
        let embeddings = self.embedder.embed(&texts).await?;
        if embeddings.len() != entries.len() {
            return Err(LibraryError::EmbeddingFailed(format!(
                "provider returned {} vectors for {} inputs",
                embeddings.len(),
                entries.len()
            )));
        }
        if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
            return Err(LibraryError::Cancelled);
        }

        let lengths: Vec<usize> = texts.iter().map(|t| t.len()).collect();
        let indexed: Vec<(String, Vec<f32>, HashMap<String, String>)> = entries
            .into_iter()
            .zip(embeddings)
            .map(|((text, metadata), embedding)| (text, embedding, metadata))
            .collect();

        let ids = self.stacks.add_batch(indexed, now_millis())?;
        for (id, content_length) in ids.iter().zip(lengths) {
            self.events.emit(LibraryEvent::Shelve { id: id.clone(), content_length });
        }
        Ok(ids)
    }

    pub fn delete(&mut self, id: &str) -> LibraryResult<()> {
        self.stacks.delete(id)?;
        self.events.emit(LibraryEvent::Withdraw { id: id.to_string() });
        Ok(())
    }

    /// Embed `query` once and delegate to `Stacks::search`, emitting
    /// `library.search`.
    pub async fn search(&mut self, query: &str, max_results: Option<usize>, threshold: Option<f64>) -> LibraryResult<Vec<ScoredVolume>> {
        let started = Instant::now();
        let embedding = self.embed_one(query).await?;
        let results = self.stacks.search(
            &embedding,
            max_results.unwrap_or(self.config.default_max_results),
            threshold.unwrap_or(self.config.default_similarity_threshold),
            now_millis(),
        );
        self.events.emit(LibraryEvent::Search {
            query: query.to_string(),
            result_count: results.len(),
            duration_ms: started.elapsed().as_millis() as u64,
        });
        Ok(results)
    }

    /// Auto-embeds `options.text.query` when no `queryEmbedding` was
    /// supplied and a text query exists; on embedding failure, logs a
    /// warning and falls back to a text-only search rather than failing
    /// the whole call.
    pub async fn advanced_search(&mut self, mut options: AdvancedSearchOptions) -> LibraryResult<Vec<AdvancedScoredVolume>> {
        if options.query_embedding.is_none() {
            if let Some(text_options) = options.text.clone() {
                match self.embed_one(&text_options.query).await {
                    Ok(embedding) => options.query_embedding = Some(embedding),
                    Err(e) => self.logger.warn(&format!("advanced_search: auto-embed failed, falling back to text-only: {e}")),
                }
            }
        }
        Ok(self.stacks.advanced_search(&options, now_millis()))
    }

    /// Parse the compact query DSL and delegate to `advanced_search`.
    pub async fn query(&mut self, dsl: &str) -> LibraryResult<Vec<AdvancedScoredVolume>> {
        let options = dsl::parse_query(dsl, self.config.default_max_results);
        self.advanced_search(options).await
    }

    pub fn recommend(&mut self, options: &RecommendOptions) -> Vec<AdvancedScoredVolume> {
        self.stacks.recommend(options, now_millis())
    }

    /// Concatenate the source volumes, call the text generator, store the
    /// result with `summarizedFrom` metadata, and optionally delete the
    /// sources. Fails with `NO_TEXT_GENERATOR` when no generator is
    /// configured (or it has been dropped), `SUMMARIZE_TOO_FEW` for fewer
    /// than two ids, and `ENTRY_NOT_FOUND` for any missing id.
    pub async fn compendium(&mut self, options: CompendiumOptions) -> LibraryResult<String> {
        if options.ids.len() < 2 {
            return Err(LibraryError::SummarizeTooFew(options.ids.len()));
        }
        let generator = self
            .generator
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(LibraryError::NoTextGenerator)?;

        let now = now_millis();
        let mut sources = Vec::with_capacity(options.ids.len());
        for id in &options.ids {
            let volume = self
                .stacks
                .get_by_id(id, now)
                .ok_or_else(|| LibraryError::EntryNotFound(id.clone()))?;
            sources.push(volume);
        }

        let concatenated = sources.iter().map(|v: &Volume| v.text.as_str()).collect::<Vec<_>>().join("\n\n");
        let prompt = match &options.prompt {
            Some(custom) => format!("{custom}\n\n{concatenated}"),
            None => format!("{DEFAULT_COMPENDIUM_PROMPT}{concatenated}"),
        };

        let summary = generator.generate(&prompt, options.system_prompt.as_deref()).await?;

        let embedding = self.embed_one(&summary).await?;

        let mut metadata = options.metadata;
        metadata.insert(metadata_keys::SUMMARIZED_FROM.to_string(), options.ids.join(","));

        let content_length = summary.len();
        let id = self.stacks.add(summary, embedding, metadata, now)?;
        self.events.emit(LibraryEvent::Shelve { id: id.clone(), content_length });

        if options.delete_originals {
            self.stacks.delete_batch(&options.ids)?;
            for source_id in &options.ids {
                self.events.emit(LibraryEvent::Withdraw { id: source_id.clone() });
            }
        }

        Ok(id)
    }

    pub fn record_feedback(&mut self, id: &str, relevant: bool) -> LibraryResult<()> {
        self.stacks.record_feedback(id, relevant)
    }

    /// Scope subsequent operations to `metadata.shelf = name`.
    pub fn shelf<'a>(&'a mut self, name: &str) -> Shelf<'a> {
        Shelf {
            library: self,
            name: name.to_string(),
        }
    }
}

/// Arguments to `Library::compendium`.
#[derive(Debug, Clone, Default)]
pub struct CompendiumOptions {
    pub ids: Vec<String>,
    pub prompt: Option<String>,
    pub system_prompt: Option<String>,
    pub delete_originals: bool,
    pub metadata: HashMap<String, String>,
}

/// A façade scoping every operation to a single `metadata.shelf` value.
pub struct Shelf<'a> {
    library: &'a mut Library,
    name: String,
}

impl<'a> Shelf<'a> {
    pub async fn add(&mut self, text: String, mut metadata: HashMap<String, String>) -> LibraryResult<String> {
        metadata.insert(metadata_keys::SHELF.to_string(), self.name.clone());
        self.library.add(text, metadata, None).await
    }

    pub async fn search(&mut self, query: &str, max_results: Option<usize>, threshold: Option<f64>) -> LibraryResult<Vec<ScoredVolume>> {
        let max_results = max_results.unwrap_or(self.library.config.default_max_results);
        let mut options = AdvancedSearchOptions {
            text: Some(TextSearchOptions {
                query: query.to_string(),
                mode: TextMatchMode::Fuzzy,
                threshold: 0.0,
                max_results,
            }),
            max_results,
            similarity_threshold: threshold.unwrap_or(0.0),
            ..Default::default()
        };
        options.metadata.push((
            metadata_keys::SHELF.to_string(),
            crate::textmatch::MetadataFilter::Eq(self.name.clone()),
        ));

        let results = self.library.advanced_search(options).await?;
        Ok(results
            .into_iter()
            .map(|r| ScoredVolume {
                volume: r.volume,
                score: r.score,
            })
            .collect())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::NullLogger;

    struct FakeEmbedder {
        dimension: usize,
    }

    #[async_trait]
    impl EmbeddingProvider for FakeEmbedder {
        async fn embed(&self, inputs: &[String]) -> LibraryResult<Vec<Vec<f32>>> {
            Ok(inputs
                .iter()
                .map(|text| {
                    let mut vector = vec![0.0_f32; self.dimension];
                    for (i, byte) in text.bytes().enumerate() {
                        vector[i % self.dimension] += byte as f32;
                    }
                    vector[0] += 1.0;
                    vector
                })
                .collect())
        }
    }

    struct FakeGenerator {
        response: String,
    }

    #[async_trait]
    impl TextGenerationProvider for FakeGenerator {
        async fn generate(&self, _prompt: &str, _system_prompt: Option<&str>) -> LibraryResult<String> {
            Ok(self.response.clone())
        }
    }

    fn library() -> Library {
        let stacks = Stacks::new(LibraryConfig::default(), Arc::new(NullLogger));
        Library::new(stacks, Arc::new(FakeEmbedder { dimension: 4 }), LibraryConfig::default())
    }

    #[tokio::test]
    async fn add_then_search_round_trips() {
        let mut lib = library();
        lib.add("hello world".into(), HashMap::new(), None).await.unwrap();
        let results = lib.search("hello world", None, None).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn empty_text_is_rejected() {
        let mut lib = library();
        let err = lib.add("   ".into(), HashMap::new(), None).await.unwrap_err();
        assert!(matches!(err, LibraryError::EmptyText));
    }

    #[tokio::test]
    async fn compendium_flow_scenario() {
        let mut lib = library();
        let v1 = lib.add("first note".into(), HashMap::new(), None).await.unwrap();
        let v2 = lib.add("second note".into(), HashMap::new(), None).await.unwrap();

        let generator: Arc<dyn TextGenerationProvider> = Arc::new(FakeGenerator { response: "SUM".to_string() });
        lib.set_text_generator(&generator);

        let id = lib
            .compendium(CompendiumOptions {
                ids: vec![v1.clone(), v2.clone()],
                delete_originals: true,
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(lib.stacks().len(), 1);
        let stored = lib.stacks_mut().get_by_id(&id, 0).unwrap();
        assert_eq!(stored.text, "SUM");
        assert_eq!(
            stored.metadata.get(metadata_keys::SUMMARIZED_FROM).unwrap(),
            &format!("{v1},{v2}")
        );
    }

    #[tokio::test]
    async fn compendium_too_few_ids_fails() {
        let mut lib = library();
        let v1 = lib.add("only one".into(), HashMap::new(), None).await.unwrap();
        let generator: Arc<dyn TextGenerationProvider> = Arc::new(FakeGenerator { response: "SUM".to_string() });
        lib.set_text_generator(&generator);

        let err = lib
            .compendium(CompendiumOptions {
                ids: vec![v1],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::SummarizeTooFew(1)));
    }

    #[tokio::test]
    async fn compendium_without_generator_fails() {
        let mut lib = library();
        let v1 = lib.add("a".into(), HashMap::new(), None).await.unwrap();
        let v2 = lib.add("b".into(), HashMap::new(), None).await.unwrap();
        let err = lib
            .compendium(CompendiumOptions {
                ids: vec![v1, v2],
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LibraryError::NoTextGenerator));
    }

    #[tokio::test]
    async fn shelf_scopes_search_to_its_name() {
        let mut lib = library();
        lib.shelf("journal").add("private entry".into(), HashMap::new()).await.unwrap();
        lib.add("public note".into(), HashMap::new(), None).await.unwrap();

        let results = lib.shelf("journal").search("entry", None, None).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].volume.metadata.get(metadata_keys::SHELF).unwrap(), "journal");
    }
}
