//! Secondary indexes maintained by `Stacks`: a magnitude cache for cosine
//! search, a metadata equality index, a hierarchical topic index, and an
//! inverted BM25 index.

pub mod inverted_index;
pub mod magnitude;
pub mod metadata_index;
pub mod topic_index;

pub use inverted_index::{Bm25Params, InvertedIndex};
pub use magnitude::MagnitudeCache;
pub use metadata_index::MetadataIndex;
pub use topic_index::TopicIndex;
