//! Reserved metadata keys, as plain string constants in one module per the
//! "dynamic metadata bag" design.

/// A single topic path assigned to a volume (comma-separated if more than one).
pub const TOPIC: &str = "topic";
/// A JSON-array-encoded string of topic paths, takes priority over `TOPIC`.
pub const TOPICS: &str = "topics";
/// The shelf (logical partition) a volume belongs to.
pub const SHELF: &str = "shelf";
/// A free-form classification of the volume's content.
pub const ENTRY_TYPE: &str = "entryType";
/// Comma-separated free-form tags.
pub const TAGS: &str = "tags";
/// Comma-separated source ids a compendium volume was summarized from.
pub const SUMMARIZED_FROM: &str = "summarizedFrom";
