//! The trivial example processors shipped with the engine: enough to
//! run an end-to-end corpus through import, annotation and export
//! without any processor body being a production NLP component.

mod segmenter;
mod tokenizer;
mod xml_export;
mod xml_import;

pub use segmenter::SentenceSegmenter;
pub use tokenizer::WordTokenizer;
pub use xml_export::XmlExporter;
pub use xml_import::XmlImporter;

use std::sync::Arc;

use corpusflow_registry::{Processor, StaticProcessorSource};

/// A `ProcessorSource` vending all four example processors, for a CLI or
/// test harness that wants a ready-to-go corpus without writing custom
/// processor manifests.
pub fn example_source() -> StaticProcessorSource {
    let processors: Vec<Arc<dyn Processor>> = vec![
        Arc::new(XmlImporter::default()),
        Arc::new(WordTokenizer::default()),
        Arc::new(SentenceSegmenter::default()),
        Arc::new(XmlExporter::default()),
    ];
    StaticProcessorSource::new(processors)
}
