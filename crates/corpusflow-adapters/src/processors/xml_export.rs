//! A pretty-printing XML exporter: renders sentence/token spans back
//! over the document's plain text into nested `<sentence>`/`<w>` tags.
//! Not a round-trip-faithful XML serializer, per the "exporter
//! renderers ... out of scope" non-goal.

use anyhow::{Context, Result};
use corpusflow_registry::{JobContext, Processor};
use corpusflow_types::{AnnotationRef, ParamRole, ProcessorDescriptor, ProcessorKind};

use crate::annotation_io;

pub struct XmlExporter {
    descriptor: ProcessorDescriptor,
}

impl Default for XmlExporter {
    fn default() -> Self {
        let descriptor = ProcessorDescriptor::builder("xml_export:pretty", ProcessorKind::Exporter, "Pretty-print sentence and token annotations as XML")
            .param("text", ParamRole::AnnotationInput { default: AnnotationRef::parse("text").unwrap() })
            .param("sentences", ParamRole::AnnotationInput { default: AnnotationRef::parse("segment.sentence").unwrap() })
            .param("tokens", ParamRole::AnnotationInput { default: AnnotationRef::parse("segment.token").unwrap() })
            .param("file", ParamRole::SourceFileHandle)
            .param("out", ParamRole::ExportOutput { default: "{file}/export.xml".into() })
            .build();
        Self { descriptor }
    }
}

impl Processor for XmlExporter {
    fn descriptor(&self) -> &ProcessorDescriptor {
        &self.descriptor
    }

    fn run(&self, ctx: &JobContext) -> Result<()> {
        let text_path = ctx.path("text").context("xml_export:pretty requires a bound text input")?;
        let text: Vec<char> = annotation_io::read_text_content(text_path)?.chars().collect();
        let sentences = annotation_io::read_spans(ctx.path("sentences").context("missing sentence spans")?)?;
        let tokens = annotation_io::read_spans(ctx.path("tokens").context("missing token spans")?)?;

        let mut body = String::new();
        body.push_str("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<corpus>\n");
        for sentence in &sentences {
            body.push_str("  <sentence>\n");
            for token in tokens.iter().filter(|t| t.start >= sentence.start && t.end <= sentence.end) {
                let word: String = text[token.start..token.end].iter().collect();
                body.push_str(&format!("    <w>{}</w>\n", escape_xml(&word)));
            }
            body.push_str("  </sentence>\n");
        }
        body.push_str("</corpus>\n");

        let out = ctx.path("out").context("xml_export:pretty requires a bound export path")?;
        if let Some(parent) = out.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(out, body)?;
        Ok(())
    }
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use corpusflow_registry::ParamValue;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    #[test]
    fn renders_sentences_and_tokens_as_nested_xml() {
        let dir = tempdir().unwrap();
        let text_path = dir.path().join("text/_span");
        annotation_io::write_text_content(&text_path, "ord, ord, ord.").unwrap();
        let sentences_path = dir.path().join("segment.sentence/_span");
        annotation_io::write_spans(&sentences_path, &[annotation_io::Span { start: 0, end: 14 }]).unwrap();
        let tokens_path = dir.path().join("segment.token/_span");
        annotation_io::write_spans(
            &tokens_path,
            &[
                annotation_io::Span { start: 0, end: 3 },
                annotation_io::Span { start: 3, end: 4 },
                annotation_io::Span { start: 5, end: 8 },
            ],
        )
        .unwrap();

        let out = dir.path().join("export/doc/export.xml");
        let mut params = BTreeMap::new();
        params.insert("text".to_string(), ParamValue::Path(text_path));
        params.insert("sentences".to_string(), ParamValue::Path(sentences_path));
        params.insert("tokens".to_string(), ParamValue::Path(tokens_path));
        params.insert("out".to_string(), ParamValue::Path(out.clone()));
        let ctx = JobContext { source_file: Some("doc".into()), corpus_id: "mycorpus".into(), params };

        XmlExporter::default().run(&ctx).unwrap();

        let rendered = std::fs::read_to_string(&out).unwrap();
        assert!(rendered.contains("<w>ord</w>"));
        assert!(rendered.contains("<sentence>"));
    }
}
