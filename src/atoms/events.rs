//! Optional event bus, injected at construction like `Logger`. Three
//! emissions are named: `library.shelve`, `library.search`,
//! `library.withdraw`.

/// An event raised by the `Library` façade.
#[derive(Debug, Clone, PartialEq)]
pub enum LibraryEvent {
    /// A volume was added.
    Shelve { id: String, content_length: usize },
    /// A search completed.
    Search {
        query: String,
        result_count: usize,
        duration_ms: u64,
    },
    /// A volume was removed.
    Withdraw { id: String },
}

/// A sink for `LibraryEvent`s. Implementors decide whether to log, forward
/// to a channel, or ignore.
pub trait EventBus: Send + Sync {
    fn emit(&self, event: LibraryEvent);
}

/// An `EventBus` that discards every event. The default when callers don't
/// supply one.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventBus;

impl EventBus for NullEventBus {
    fn emit(&self, _event: LibraryEvent) {}
}
