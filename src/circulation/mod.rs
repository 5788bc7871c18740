//! Circulation desk: a single-consumer FIFO queue of curation jobs driven
//! by an injected `Librarian` collaborator. `enqueue*` returns
//! immediately; `drain` processes jobs sequentially and never surfaces a
//! single job's failure to the enqueuer — it logs and moves on.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;

use crate::atoms::{CancellationToken, Logger, Volume};
use crate::config::LibraryConfig;
use crate::stacks::Stacks;
use crate::LibraryResult;

/// Near-duplicate threshold applied before an extracted fact is shelved.
/// Deliberately stricter than the default `find_duplicates` threshold
/// (0.95 vs the dedup module's typical 0.9) since extraction runs
/// unattended and a false-positive skip silently loses a fact.
const EXTRACTION_DEDUP_THRESHOLD: f64 = 0.95;

/// A single conversational turn handed to `Librarian::propose_extraction`.
#[derive(Debug, Clone)]
pub struct TurnContext {
    pub id: String,
    pub utterances: Vec<String>,
    pub metadata: HashMap<String, String>,
}

/// A fact the Librarian extracted from a `TurnContext`, ready to shelve.
#[derive(Debug, Clone)]
pub struct ExtractedFact {
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

/// A proposed compendium: summary text plus its embedding, ready to store.
#[derive(Debug, Clone)]
pub struct CompendiumProposal {
    pub summary: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
}

/// A proposed topic reorganization: ids to relocate to a different topic,
/// plus topic paths to merge into another.
#[derive(Debug, Clone, Default)]
pub struct ReorganizationPlan {
    pub relocations: Vec<(String, String)>,
    pub merges: Vec<(String, String)>,
}

/// The external collaborator that proposes extractions, compendia, and
/// reorganizations. The circulation desk only ever consumes this trait —
/// it never decides content on its own.
#[async_trait]
pub trait Librarian: Send + Sync {
    async fn propose_extraction(&self, turn: &TurnContext) -> LibraryResult<Vec<ExtractedFact>>;
    async fn propose_compendium(&self, topic: &str, volumes: &[Volume]) -> LibraryResult<Option<CompendiumProposal>>;
    async fn propose_reorganization(&self, topic: &str, volumes: &[Volume]) -> LibraryResult<Option<ReorganizationPlan>>;
}

/// A queued unit of curation work.
#[derive(Debug, Clone)]
pub enum CirculationJob {
    Extraction(TurnContext),
    Compendium(String),
    Reorganization(String),
}

/// The FIFO queue itself. Owns no volumes; every job writes back through
/// the `Stacks` handle passed into `drain`.
pub struct CirculationDesk {
    jobs: VecDeque<CirculationJob>,
    librarian: Arc<dyn Librarian>,
    logger: Arc<dyn Logger>,
    min_entries_for_compendium: usize,
    max_volumes_per_topic: usize,
}

impl CirculationDesk {
    pub fn new(librarian: Arc<dyn Librarian>, logger: Arc<dyn Logger>, config: &LibraryConfig) -> Self {
        CirculationDesk {
            jobs: VecDeque::new(),
            librarian,
            logger,
            min_entries_for_compendium: config.min_entries_for_compendium,
            max_volumes_per_topic: config.max_volumes_per_topic,
        }
    }

    pub fn enqueue_extraction(&mut self, turn: TurnContext) {
        self.jobs.push_back(CirculationJob::Extraction(turn));
    }

    pub fn enqueue_compendium(&mut self, topic: String) {
        self.jobs.push_back(CirculationJob::Compendium(topic));
    }

    pub fn enqueue_reorganization(&mut self, topic: String) {
        self.jobs.push_back(CirculationJob::Reorganization(topic));
    }

    pub fn pending(&self) -> usize {
        self.jobs.len()
    }

    /// Drop every pending job without running it.
    pub fn dispose(&mut self) {
        self.jobs.clear();
    }

    /// Process every queued job in order against `stacks`, stopping
    /// between (never mid-) jobs if `cancel` fires. A job that errors is
    /// logged and dropped; it never aborts the drain or reaches the
    /// caller.
    pub async fn drain(&mut self, stacks: &mut Stacks, cancel: Option<&CancellationToken>) {
        while let Some(job) = self.jobs.pop_front() {
            if cancel.map(|c| c.is_cancelled()).unwrap_or(false) {
                self.jobs.push_front(job);
                return;
            }
            let result = match &job {
                CirculationJob::Extraction(turn) => self.run_extraction(stacks, turn).await,
                CirculationJob::Compendium(topic) => self.run_compendium(stacks, topic).await,
                CirculationJob::Reorganization(topic) => self.run_reorganization(stacks, topic).await,
            };
            if let Err(e) = result {
                self.logger.warn(&format!("circulation job failed, dropping: {e}"));
            }
        }
    }

    async fn run_extraction(&self, stacks: &mut Stacks, turn: &TurnContext) -> LibraryResult<()> {
        let facts = self.librarian.propose_extraction(turn).await?;
        let now = chrono::Utc::now().timestamp_millis();
        for fact in facts {
            if stacks.check_duplicate(&fact.embedding, EXTRACTION_DEDUP_THRESHOLD).is_some() {
                self.logger.debug("extraction: skipped near-duplicate fact");
                continue;
            }
            stacks.add(fact.text, fact.embedding, fact.metadata, now)?;
        }
        Ok(())
    }

    async fn run_compendium(&self, stacks: &mut Stacks, topic: &str) -> LibraryResult<()> {
        let volumes = stacks.filter_by_topic(topic);
        if volumes.len() < self.min_entries_for_compendium {
            return Ok(());
        }
        let Some(proposal) = self.librarian.propose_compendium(topic, &volumes).await? else {
            return Ok(());
        };
        let now = chrono::Utc::now().timestamp_millis();
        let mut metadata = proposal.metadata;
        metadata.insert(
            crate::atoms::metadata_keys::SUMMARIZED_FROM.to_string(),
            volumes.iter().map(|v| v.id.as_str()).collect::<Vec<_>>().join(","),
        );
        stacks.add(proposal.summary, proposal.embedding, metadata, now)?;
        Ok(())
    }

    async fn run_reorganization(&self, stacks: &mut Stacks, topic: &str) -> LibraryResult<()> {
        let volumes = stacks.filter_by_topic(topic);
        if volumes.len() < self.max_volumes_per_topic {
            return Ok(());
        }
        let Some(plan) = self.librarian.propose_reorganization(topic, &volumes).await? else {
            return Ok(());
        };
        for (id, new_topic) in plan.relocations {
            stacks.relocate(&id, &new_topic)?;
        }
        for (from, to) in plan.merges {
            stacks.merge_topic(&from, &to);
        }
        Ok(())
    }
}
