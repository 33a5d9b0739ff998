//! Scheduling-time error taxonomy (§7).

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("no producer for {0:?}")]
    NoProducer(String),
    #[error("rule {rule_id:?} failed: {reason}")]
    RuleFailed { rule_id: String, reason: String },
}

/// The outcome of one `run`: which jobs ran, which were skipped as
/// already fresh, and which failed (with everything downstream of a
/// failure tainted and skipped, per §4.E.7).
#[derive(Debug, Default)]
pub struct RunSummary {
    pub ran: Vec<String>,
    pub fresh: Vec<String>,
    pub failed: Vec<(String, String)>,
    pub tainted: Vec<String>,
}

impl RunSummary {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}
