//! Rule-compilation error taxonomy (§7).

use corpusflow_resolver::ResolverError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RulesError {
    #[error(transparent)]
    Reference(#[from] ResolverError),
    #[error("processor {0:?} declares a required config key {1:?} with no value anywhere in the hierarchy")]
    ConfigMissing(String, String),
    #[error("rules {a:?} and {b:?} both target {output:?} with the same `order` and no persisted decision")]
    ProducerConflict { output: String, a: String, b: String },
    #[error("no active producer for {0:?}")]
    NoProducer(String),
}
