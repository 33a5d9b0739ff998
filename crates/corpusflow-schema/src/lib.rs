//! # corpusflow-schema
//!
//! JSON Schema generation and validation for corpus configuration.
//!
//! The fixed outer sections (`metadata`, `import`, `export`, ...) are
//! ordinary Rust types whose schema comes from `schemars` derive
//! ([`envelope`]); the dynamic per-module config keys a registry collects
//! from discovered processors are assembled into a schema document at
//! runtime ([`build`]) and checked against with a small hand-rolled
//! validator ([`validate`]).

mod build;
mod envelope;
mod validate;

pub use build::{build_document, module_property_schema};
pub use envelope::{envelope_schema, CorpusEnvelope, CorpusMetadata, ExportSection, ImportSection};
pub use validate::{validate, ValidationError};
