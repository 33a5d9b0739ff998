//! The config-layer error taxonomy. `corpusflow-core::error::EngineError`
//! maps each variant here onto one of its own surfaced kinds.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("corpus config not found at {0}")]
    NotFound(PathBuf),
    #[error("parent config chain is cyclic: {0}")]
    Cycle(String),
    #[error("parent config {0:?} could not be found")]
    ParentNotFound(String),
    #[error("config at {path}: {source}")]
    Parse { path: PathBuf, #[source] source: serde_yaml::Error },
    #[error("config value invalid: {0}")]
    Invalid(String),
    #[error("required config key {0:?} has no value anywhere in the hierarchy")]
    Missing(String),
}
