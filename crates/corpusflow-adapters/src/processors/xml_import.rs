//! A minimal XML importer: strips tags, keeps the remaining text
//! content. Not an XML parser in any validating sense, per the
//! "importer parsers ... out of scope" non-goal — just enough shape to
//! exercise an importer's contract end-to-end.

use std::fs;

use anyhow::{Context, Result};
use corpusflow_registry::{JobContext, Processor};
use corpusflow_types::{AnnotationRef, ParamRole, ProcessorDescriptor, ProcessorKind};
use regex::Regex;

use crate::annotation_io::{self, Span};

pub struct XmlImporter {
    descriptor: ProcessorDescriptor,
    tag: Regex,
}

impl Default for XmlImporter {
    fn default() -> Self {
        let descriptor = ProcessorDescriptor::builder("xml_import:parse", ProcessorKind::Importer, "Strip XML markup and import the remaining text")
            .param("file", ParamRole::SourceFileHandle)
            .param("source_dir", ParamRole::Config { key: "import.source_dir".into() })
            .param(
                "text",
                ParamRole::AnnotationOutput { default: AnnotationRef::parse("text").unwrap(), cls: Some("text".into()) },
            )
            .importer_output(AnnotationRef::parse("text").unwrap())
            .build();
        Self { descriptor, tag: Regex::new(r"<[^>]+>").unwrap() }
    }
}

impl Processor for XmlImporter {
    fn descriptor(&self) -> &ProcessorDescriptor {
        &self.descriptor
    }

    fn run(&self, ctx: &JobContext) -> Result<()> {
        let file = ctx.value("file").and_then(|v| v.as_str()).context("xml_import:parse requires a bound source file")?;
        let source_dir = ctx.value("source_dir").and_then(|v| v.as_str()).context("xml_import:parse requires import.source_dir")?;

        let source_path = std::path::Path::new(source_dir).join(file);
        let raw = fs::read_to_string(&source_path).with_context(|| format!("reading source file {}", source_path.display()))?;
        let text = self.tag.replace_all(&raw, "").trim().to_string();

        let out = ctx.path("text").context("xml_import:parse requires a bound text output")?;
        annotation_io::write_spans(out, &[Span { start: 0, end: text.chars().count() }])?;
        annotation_io::write_text_content(out, &text)?;
        Ok(())
    }
}
