//! Reading and writing the on-disk annotation file formats a processor
//! body actually touches.
//!
//! Span files (`_span`) hold one `start\tend` character-offset pair per
//! line; attribute files hold one value per line, index-aligned with the
//! span file they annotate. Neither format is mandated — a processor is
//! free to write whatever bytes it wants to a bound path — but every
//! example processor in this crate shares it, the way real annotators in
//! the same pipeline agree on a convention without the engine enforcing
//! one.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// A half-open character span, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

pub fn read_spans(path: &Path) -> Result<Vec<Span>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading span file {}", path.display()))?;
    content
        .lines()
        .map(|line| {
            let (start, end) = line
                .split_once('\t')
                .with_context(|| format!("malformed span line {line:?} in {}", path.display()))?;
            Ok(Span {
                start: start.parse().with_context(|| format!("span start {start:?}"))?,
                end: end.parse().with_context(|| format!("span end {end:?}"))?,
            })
        })
        .collect()
}

pub fn write_spans(path: &Path, spans: &[Span]) -> Result<()> {
    write_lines(path, spans.iter().map(|s| format!("{}\t{}", s.start, s.end)))
}

/// Reads one value per line from an attribute file, unescaping literal
/// newlines (`\n`) and backslashes a value may have contained.
pub fn read_attrs(path: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(path).with_context(|| format!("reading attribute file {}", path.display()))?;
    Ok(content.lines().map(unescape).collect())
}

pub fn write_attrs(path: &Path, values: &[String]) -> Result<()> {
    write_lines(path, values.iter().map(|v| escape(v)))
}

fn escape(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\n', "\\n")
}

fn unescape(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut chars = line.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => out.push('\n'),
                Some('\\') => out.push('\\'),
                Some(other) => {
                    out.push('\\');
                    out.push(other);
                }
                None => out.push('\\'),
            }
        } else {
            out.push(c);
        }
    }
    out
}

fn write_lines(path: &Path, lines: impl Iterator<Item = String>) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    let mut file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    for line in lines {
        writeln!(file, "{line}").with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

/// The sibling path a span file's raw text content lives at: `_span`
/// replaced with `_text` in the same annotation directory. Not part of
/// the reference grammar — a corpusflow-local convention the text
/// importer and every downstream annotator share so there is somewhere
/// to read the document's plain-text content from.
pub fn text_content_path(span_path: &Path) -> PathBuf {
    span_path.with_file_name("_text")
}

pub fn read_text_content(span_path: &Path) -> Result<String> {
    let path = text_content_path(span_path);
    fs::read_to_string(&path).with_context(|| format!("reading text content {}", path.display()))
}

pub fn write_text_content(span_path: &Path, text: &str) -> Result<()> {
    let path = text_content_path(span_path);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
    }
    fs::write(&path, text).with_context(|| format!("writing text content {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn spans_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment.token/_span");
        let spans = vec![Span { start: 0, end: 3 }, Span { start: 4, end: 7 }];
        write_spans(&path, &spans).unwrap();
        assert_eq!(read_spans(&path).unwrap(), spans);
    }

    #[test]
    fn attrs_escape_embedded_newlines() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("segment.token/word");
        let values = vec!["hello".to_string(), "a\\b".to_string(), "line\nbreak".to_string()];
        write_attrs(&path, &values).unwrap();
        assert_eq!(read_attrs(&path).unwrap(), values);
    }

    #[test]
    fn text_content_sits_alongside_its_span_file() {
        let dir = tempdir().unwrap();
        let span_path = dir.path().join("text/_span");
        write_text_content(&span_path, "ord, ord, ord.").unwrap();
        assert_eq!(read_text_content(&span_path).unwrap(), "ord, ord, ord.");
        assert_eq!(text_content_path(&span_path), dir.path().join("text/_text"));
    }
}
