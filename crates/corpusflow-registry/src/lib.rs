//! Processor discovery and metadata storage (§4.B).
//!
//! A [`Registry`] is built once per run by asking every configured
//! [`ProcessorSource`] for its processors, validating each descriptor's
//! shape, and indexing the result by id, kind, and config key. Nothing
//! downstream — the resolver, the rule compiler, the scheduler — ever
//! mutates a registry; they only read it.

mod error;
mod processor;
mod registry;
mod source;

pub use error::RegistryError;
pub use processor::{JobContext, ParamValue, Processor};
pub use registry::Registry;
pub use source::{CustomScriptProcessor, CustomScriptSource, PluginSource, ProcessorSource, StaticProcessorSource};
