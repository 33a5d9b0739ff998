//! Progress/logging injection point (ambient stack: no `tracing`/`log`
//! facade — the scheduler and preloader call through this trait and the
//! CLI supplies the concrete implementation).

/// Callers pass a `&dyn Reporter` down into the scheduler; a CLI front
/// end writes `[info]`/`[warn]`/`[error]` lines to stderr and drives an
/// `indicatif` progress bar from these calls, but the scheduler itself
/// knows nothing about either.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn error(&self, message: &str);
}

/// A reporter that discards everything, for tests and library callers
/// that don't care about progress output.
pub struct NullReporter;

impl Reporter for NullReporter {
    fn info(&self, _message: &str) {}
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}
