use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The atomic stored unit: text, its embedding, metadata, and access
/// bookkeeping. Text and embedding are immutable after insert; only
/// `lastAccessedAt`/`accessCount` mutate, and only through `Stacks`
/// accessors that record access.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Volume {
    pub id: String,
    pub text: String,
    pub embedding: Vec<f32>,
    pub metadata: HashMap<String, String>,
    /// Creation time, milliseconds since epoch.
    pub timestamp: i64,
    /// Milliseconds since epoch of the most recent read.
    pub last_accessed_at: i64,
    pub access_count: u64,
}

impl Volume {
    pub fn new(
        id: String,
        text: String,
        embedding: Vec<f32>,
        metadata: HashMap<String, String>,
        timestamp: i64,
    ) -> Self {
        Volume {
            id,
            text,
            embedding,
            metadata,
            timestamp,
            last_accessed_at: timestamp,
            access_count: 0,
        }
    }

    /// Record a read. A clock regression (`now < last_accessed_at`) leaves
    /// the stored value unchanged rather than moving it backward, per the
    /// deliberate choice: see DESIGN.md.
    pub fn record_access(&mut self, now: i64) {
        if now > self.last_accessed_at {
            self.last_accessed_at = now;
        }
        self.access_count += 1;
    }
}
