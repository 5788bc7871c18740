//! Library Core: a persistent, content-addressed store of embedded text
//! "volumes" supporting hybrid vector/text/metadata retrieval,
//! deduplication, topic hierarchy, per-topic adaptive relevance learning,
//! and asynchronous curation.
//!
//! The entry point is [`Library`], which wraps [`Stacks`] (the store and
//! its secondary indexes) with embedding/generation orchestration, a
//! compact query DSL, and an optional [`CirculationDesk`] for
//! unattended extraction/summarization/reorganization.

pub mod atoms;
pub mod cataloging;
pub mod circulation;
pub mod codec;
pub mod config;
pub mod dedup;
pub mod learning;
pub mod library;
pub mod stacks;
pub mod textmatch;

pub use atoms::{CancellationToken, EventBus, LibraryEvent, LibraryError, LibraryResult, Logger, NullEventBus, NullLogger, StdLogger, Volume};
pub use circulation::{CirculationDesk, CirculationJob, CompendiumProposal, ExtractedFact, Librarian, ReorganizationPlan, TurnContext};
pub use config::LibraryConfig;
pub use dedup::DuplicateGroup;
pub use library::dsl::parse_query;
pub use library::{CompendiumOptions, EmbeddingProvider, Library, Shelf, TextGenerationProvider};
pub use stacks::{
    AdvancedScoredVolume, AdvancedSearchOptions, ComponentScores, DateRange, FieldBoosts, RankBy, RankByOption, RankWeights,
    RecommendOptions, ScoredVolume, Stacks, TextMatchMode, TextSearchOptions,
};
