//! Core data types shared across the crate: the `Volume` record, reserved
//! metadata keys, the injected `Logger`/`EventBus` traits, and the error
//! taxonomy.

pub mod cancellation;
pub mod error;
pub mod events;
pub mod logger;
pub mod metadata_keys;
pub mod volume;

pub use cancellation::CancellationToken;
pub use error::{LibraryError, LibraryResult};
pub use events::{EventBus, LibraryEvent, NullEventBus};
pub use logger::{Logger, NullLogger, StdLogger};
pub use volume::Volume;
