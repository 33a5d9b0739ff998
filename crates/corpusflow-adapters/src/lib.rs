//! External-tool adapters (subprocess, rsync) and the trivial example
//! processors (§1 Non-goals: "a handful of trivial example processors
//! ... sufficient to exercise the engine end-to-end") that give the rest
//! of the workspace something concrete to run through `run`, `install`
//! and `export` without implementing any real NLP component.

pub mod annotation_io;
pub mod processors;
pub mod rsync;
pub mod subprocess;

pub use processors::{SentenceSegmenter, WordTokenizer, XmlExporter, XmlImporter, example_source};
