//! Groups word tokens into sentences on trailing `.`/`!`/`?` tokens. Kept
//! as simple as the tokenizer it consumes: a demonstration annotator, not
//! a sentence boundary detector.

use anyhow::{Context, Result};
use corpusflow_registry::{JobContext, Processor};
use corpusflow_types::{AnnotationRef, ParamRole, ProcessorDescriptor, ProcessorKind};

use crate::annotation_io::{self, Span};

const SENTENCE_ENDERS: [&str; 3] = [".", "!", "?"];

pub struct SentenceSegmenter {
    descriptor: ProcessorDescriptor,
}

impl Default for SentenceSegmenter {
    fn default() -> Self {
        let descriptor = ProcessorDescriptor::builder("segment:sentence", ProcessorKind::Annotator, "Group word tokens into sentences")
            .param("tokens", ParamRole::AnnotationInput { default: AnnotationRef::parse("segment.token").unwrap() })
            .param("words", ParamRole::AnnotationInput { default: AnnotationRef::parse("segment.token:misc.word").unwrap() })
            .param("file", ParamRole::SourceFileHandle)
            .param(
                "out",
                ParamRole::AnnotationOutput { default: AnnotationRef::parse("segment.sentence").unwrap(), cls: Some("sentence".into()) },
            )
            .build();
        Self { descriptor }
    }
}

impl Processor for SentenceSegmenter {
    fn descriptor(&self) -> &ProcessorDescriptor {
        &self.descriptor
    }

    fn run(&self, ctx: &JobContext) -> Result<()> {
        let tokens_path = ctx.path("tokens").context("segment:sentence requires bound token spans")?;
        let words_path = ctx.path("words").context("segment:sentence requires bound token words")?;
        let tokens = annotation_io::read_spans(tokens_path)?;
        let words = annotation_io::read_attrs(words_path)?;

        let mut sentences = Vec::new();
        let mut current_start: Option<usize> = None;
        for (token, word) in tokens.iter().zip(words.iter()) {
            if current_start.is_none() {
                current_start = Some(token.start);
            }
            if SENTENCE_ENDERS.contains(&word.as_str()) {
                sentences.push(Span { start: current_start.unwrap(), end: token.end });
                current_start = None;
            }
        }
        if let (Some(start), Some(last)) = (current_start, tokens.last()) {
            sentences.push(Span { start, end: last.end });
        }

        let out = ctx.path("out").context("segment:sentence requires a bound output path")?;
        annotation_io::write_spans(out, &sentences)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusflow_registry::ParamValue;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn splits_on_sentence_final_punctuation() {
        let dir = tempdir().unwrap();
        let tokens_path = dir.path().join("segment.token/_span");
        let words_path = dir.path().join("segment.token/misc.word");
        annotation_io::write_spans(
            &tokens_path,
            &[
                Span { start: 0, end: 3 },
                Span { start: 3, end: 4 },
                Span { start: 5, end: 8 },
                Span { start: 8, end: 9 },
            ],
        )
        .unwrap();
        annotation_io::write_attrs(&words_path, &["ord".into(), ",".into(), "ord".into(), ".".into()]).unwrap();

        let out = dir.path().join("segment.sentence/_span");
        let mut params = BTreeMap::new();
        params.insert("tokens".to_string(), ParamValue::Path(tokens_path));
        params.insert("words".to_string(), ParamValue::Path(words_path));
        params.insert("out".to_string(), ParamValue::Path(out.clone()));
        let ctx = JobContext { source_file: Some("doc".into()), corpus_id: "mycorpus".into(), params };

        SentenceSegmenter::default().run(&ctx).unwrap();

        let sentences = annotation_io::read_spans(&out).unwrap();
        assert_eq!(sentences, vec![Span { start: 0, end: 9 }]);
    }
}
