//! Progress reporting with TTY detection.
//!
//! Detects whether stderr is a TTY and drives an `indicatif` spinner when
//! it is; falls back to plain `[info]`/`[warn]`/`[error]` lines otherwise.
//! This is the CLI's concrete implementation of
//! `corpusflow_core::scheduler::Reporter`, the seam the scheduler and
//! preloader call through instead of a logging facade.

use std::sync::Mutex;

use atty::Stream;
use corpusflow_core::scheduler::Reporter;
use indicatif::{ProgressBar, ProgressStyle};

/// Detects whether stderr is connected to a TTY.
pub fn is_tty() -> bool {
    atty::is(Stream::Stderr)
}

/// Reporter that drives a spinner in TTY mode and falls back to plain
/// lines otherwise. The spinner's message tracks the most recent line;
/// every line is still printed so a redirected log keeps full history.
pub struct CliReporter {
    bar: Option<ProgressBar>,
    lines: Mutex<usize>,
}

impl CliReporter {
    pub fn new() -> Self {
        let bar = if is_tty() {
            let pb = ProgressBar::new_spinner();
            pb.set_style(ProgressStyle::default_spinner().template("{spinner} {msg}").unwrap_or_else(|_| ProgressStyle::default_spinner()));
            pb.enable_steady_tick(std::time::Duration::from_millis(120));
            Some(pb)
        } else {
            None
        };
        Self { bar, lines: Mutex::new(0) }
    }

    /// A reporter that discards everything, for non-interactive contexts
    /// (e.g. when a caller wants to disable progress output regardless of
    /// the surrounding terminal).
    #[allow(dead_code)]
    pub fn silent() -> Self {
        Self { bar: None, lines: Mutex::new(0) }
    }

    fn emit(&self, prefix: &str, message: &str) {
        *self.lines.lock().unwrap() += 1;
        match &self.bar {
            Some(pb) => pb.set_message(format!("{prefix} {message}")),
            None => eprintln!("{prefix} {message}"),
        }
    }
}

impl Default for CliReporter {
    fn default() -> Self {
        Self::new()
    }
}

impl Reporter for CliReporter {
    fn info(&self, message: &str) {
        self.emit("[info]", message);
    }

    fn warn(&self, message: &str) {
        self.emit("[warn]", message);
    }

    fn error(&self, message: &str) {
        self.emit("[error]", message);
    }
}

impl Drop for CliReporter {
    fn drop(&mut self) {
        if let Some(pb) = &self.bar {
            pb.finish_and_clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_tty_returns_bool() {
        let result = is_tty();
        assert!(matches!(result, true | false));
    }

    #[test]
    fn silent_reporter_has_no_bar() {
        let reporter = CliReporter::silent();
        assert!(reporter.bar.is_none());
    }

    #[test]
    fn emitting_lines_tracks_a_count() {
        let reporter = CliReporter::silent();
        reporter.info("a");
        reporter.warn("b");
        reporter.error("c");
        assert_eq!(*reporter.lines.lock().unwrap(), 3);
    }
}
