//! Injected logging: a `Logger` handle is passed in at construction and
//! threaded down explicitly rather than reached for as a module-global.

/// A logging sink injected into `Library`, `Stacks`, and `CirculationDesk`.
///
/// Each method takes an already-formatted message, at the same
/// debug/info/warn/error granularity as `log::debug!`/`info!`/`warn!`/
/// `error!`.
pub trait Logger: Send + Sync {
    fn debug(&self, message: &str);
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// Default `Logger` forwarding to the `log` crate facade, so a binary
/// wiring this crate with `env_logger`/`tracing-log` gets output for free.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdLogger;

impl Logger for StdLogger {
    fn debug(&self, message: &str) {
        log::debug!("{message}");
    }
    fn info(&self, message: &str) {
        log::info!("{message}");
    }
    fn warn(&self, message: &str) {
        log::warn!("{message}");
    }
    fn error(&self, message: &str) {
        log::error!("{message}");
    }
}

/// A `Logger` that discards everything. Useful as a test default.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullLogger;

impl Logger for NullLogger {
    fn debug(&self, _message: &str) {}
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
