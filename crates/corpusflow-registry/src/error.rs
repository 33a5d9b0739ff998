//! Discovery-time error taxonomy (§4.B "Contracts").

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("processor {0:?} is declared more than once")]
    DuplicateProcessor(String),
    #[error("processor {id:?} is invalid: {reason}")]
    InvalidProcessor { id: String, reason: String },
    #[error("config key {key:?} is redeclared incompatibly: {detail}")]
    ConfigKeyConflict { key: String, detail: String },
}
