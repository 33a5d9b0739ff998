//! Facade crate for the corpusflow pipeline engine.
//!
//! Every microcrate is re-exported under a short module alias so a
//! downstream binary (the `corpusflow-cli` crate, or an embedder) depends
//! on one crate instead of wiring up the whole workspace by hand. The
//! [`error`] module carries the user-facing error taxonomy each
//! microcrate's internal error type is mapped onto.

pub mod error;

pub use corpusflow_adapters as adapters;
pub use corpusflow_config as config;
pub use corpusflow_environment as environment;
pub use corpusflow_preloader as preloader;
pub use corpusflow_registry as registry;
pub use corpusflow_resolver as resolver;
pub use corpusflow_retry as retry;
pub use corpusflow_rules as rules;
pub use corpusflow_scheduler as scheduler;
pub use corpusflow_schema as schema;
pub use corpusflow_types as types;

pub use error::EngineError;
