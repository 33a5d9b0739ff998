//! A line-based word tokenizer: the trivial annotator example named in
//! the Non-goals as sufficient to exercise the engine end-to-end, not a
//! production tokenizer.

use std::collections::BTreeMap;

use anyhow::{Context, Result};
use corpusflow_registry::{JobContext, Processor};
use corpusflow_types::{AnnotationRef, ParamRole, ProcessorDescriptor, ProcessorKind};
use regex::Regex;
use serde_json::Value;

use crate::annotation_io::{self, Span};

pub struct WordTokenizer {
    descriptor: ProcessorDescriptor,
    pattern: Regex,
}

impl Default for WordTokenizer {
    fn default() -> Self {
        let descriptor = ProcessorDescriptor::builder("segment:token", ProcessorKind::Annotator, "Split a document's text into word tokens")
            .param("text", ParamRole::AnnotationInput { default: AnnotationRef::parse("text").unwrap() })
            .param("file", ParamRole::SourceFileHandle)
            .param(
                "out",
                ParamRole::AnnotationOutput { default: AnnotationRef::parse("segment.token").unwrap(), cls: Some("token".into()) },
            )
            .param(
                "word",
                ParamRole::AnnotationOutput {
                    default: AnnotationRef::parse("segment.token:misc.word").unwrap(),
                    cls: None,
                },
            )
            .build();
        Self { descriptor, pattern: Regex::new(r"\w+|[^\s\w]").unwrap() }
    }
}

impl Processor for WordTokenizer {
    fn descriptor(&self) -> &ProcessorDescriptor {
        &self.descriptor
    }

    fn run(&self, ctx: &JobContext) -> Result<()> {
        let text_span = ctx.path("text").context("segment:token requires a bound text input")?;
        let text = annotation_io::read_text_content(text_span)?;

        let mut spans = Vec::new();
        let mut words = Vec::new();
        for m in self.pattern.find_iter(&text) {
            spans.push(Span { start: m.start(), end: m.end() });
            words.push(m.as_str().to_string());
        }

        let out = ctx.path("out").context("segment:token requires a bound output path")?;
        annotation_io::write_spans(out, &spans)?;
        let word_path = ctx.path("word").context("segment:token requires a bound word attribute path")?;
        annotation_io::write_attrs(word_path, &words)?;
        Ok(())
    }

    fn preload(&self, _params: &BTreeMap<String, Value>) -> Result<Box<dyn std::any::Any + Send>> {
        anyhow::bail!("segment:token declares no preloader hook")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusflow_registry::ParamValue;
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn tokenizes_words_and_punctuation_separately() {
        let dir = tempdir().unwrap();
        let text_span = dir.path().join("text/_span");
        annotation_io::write_text_content(&text_span, "ord, ord, ord.").unwrap();

        let out = dir.path().join("segment.token/_span");
        let word = dir.path().join("segment.token/misc.word");

        let mut params = BTreeMap::new();
        params.insert("text".to_string(), ParamValue::Path(text_span));
        params.insert("out".to_string(), ParamValue::Path(out.clone()));
        params.insert("word".to_string(), ParamValue::Path(word.clone()));
        let ctx = JobContext { source_file: Some("doc".into()), corpus_id: "mycorpus".into(), params };

        WordTokenizer::default().run(&ctx).unwrap();

        let words = annotation_io::read_attrs(&word).unwrap();
        assert_eq!(words, vec!["ord", ",", "ord", ",", "ord", "."]);
        let spans = annotation_io::read_spans(&out).unwrap();
        assert_eq!(spans.len(), 6);
        let _: PathBuf = dir.path().to_path_buf();
    }
}
