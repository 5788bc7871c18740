//! Error taxonomy exposed across the public API: a `thiserror`-derived
//! enum with a stable string `.code()` accessor, and a `Result` alias.

use thiserror::Error;

/// The crate's result alias.
pub type LibraryResult<T> = Result<T, LibraryError>;

/// Errors surfaced by the Library Core across every public entry point.
///
/// Internal helpers may use narrower error types, but anything that crosses
/// an API boundary is converted into one of these variants before it
/// reaches the caller.
#[derive(Debug, Error)]
pub enum LibraryError {
    /// An operation was attempted before `load()` completed.
    #[error("library not initialized: {0}")]
    NotInitialized(String),

    /// A text payload required for the operation was empty.
    #[error("text must not be empty")]
    EmptyText,

    /// An embedding's length did not match the store-wide dimension.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The `EmbeddingProvider` failed to produce a vector.
    #[error("embedding failed: {0}")]
    EmbeddingFailed(String),

    /// `compendium` was called without a configured `TextGenerationProvider`.
    #[error("no text generator configured")]
    NoTextGenerator,

    /// `compendium` was called with fewer than two source ids.
    #[error("at least two volumes are required to summarize, got {0}")]
    SummarizeTooFew(usize),

    /// A referenced volume id does not exist in the store.
    #[error("volume not found: {0}")]
    EntryNotFound(String),

    /// A learning-engine operation was attempted while learning is disabled.
    #[error("learning engine is disabled")]
    LearningDisabled,

    /// Any I/O failure encountered during persistence.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A corrupt document header aborted a load.
    #[error("corrupt persisted document: {0}")]
    CorruptDocument(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An embedding with zero L2 magnitude was rejected on insert (data
    /// invariant). Not one of this crate's originally named error codes,
    /// but a data-shape error in the same family as `DIMENSION_MISMATCH`.
    #[error("embedding has zero magnitude and cannot be inserted")]
    ZeroMagnitudeEmbedding,

    /// A caller-supplied cancellation token fired mid-operation; no
    /// partial volume was inserted and no index was left inconsistent.
    #[error("operation cancelled")]
    Cancelled,
}

impl LibraryError {
    /// The stable string code exposed to callers (`NOT_INITIALIZED`,
    /// `EMPTY_TEXT`, ...).
    pub fn code(&self) -> &'static str {
        match self {
            LibraryError::NotInitialized(_) => "NOT_INITIALIZED",
            LibraryError::EmptyText => "EMPTY_TEXT",
            LibraryError::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            LibraryError::EmbeddingFailed(_) => "EMBEDDING_FAILED",
            LibraryError::NoTextGenerator => "NO_TEXT_GENERATOR",
            LibraryError::SummarizeTooFew(_) => "SUMMARIZE_TOO_FEW",
            LibraryError::EntryNotFound(_) => "ENTRY_NOT_FOUND",
            LibraryError::LearningDisabled => "LEARNING_DISABLED",
            LibraryError::Io(_) => "IO_ERROR",
            LibraryError::CorruptDocument(_) => "CORRUPT_DOCUMENT",
            LibraryError::Serialization(_) => "SERIALIZATION_ERROR",
            LibraryError::ZeroMagnitudeEmbedding => "ZERO_MAGNITUDE_EMBEDDING",
            LibraryError::Cancelled => "CANCELLED",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_match_exposed_taxonomy() {
        assert_eq!(LibraryError::EmptyText.code(), "EMPTY_TEXT");
        assert_eq!(
            LibraryError::DimensionMismatch { expected: 3, actual: 4 }.code(),
            "DIMENSION_MISMATCH"
        );
        assert_eq!(LibraryError::LearningDisabled.code(), "LEARNING_DISABLED");
    }
}
