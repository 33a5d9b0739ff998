//! # corpusflow-config
//!
//! Path & config store (§4.A): the identities of the four engine
//! directories (data, corpus, work, export), corpus configuration loading
//! with parent-chain merging, `import`/`export` section inheritance,
//! preset expansion, and schema validation.
//!
//! Configuration itself carries no pipeline logic — the resolver
//! (`corpusflow-resolver`) is what turns a looked-up value into a
//! resolved annotation reference.

mod dirs;
mod error;
mod model;
mod presets;
mod validate;

pub use dirs::EngineDirs;
pub use error::ConfigError;
pub use model::{Config, load_corpus_config};
pub use presets::{PresetEntry, PresetLibrary, apply_presets, load_preset_library};
pub use validate::validate_config;
