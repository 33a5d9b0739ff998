//! File-path mapping (§4.C.4, §6 "Work directory layout").
//!
//! A span reference maps to `work/<file>/<base>/_span`; an attribute
//! reference maps to `work/<file>/<base>/<attr>`. Corpus-level data (no
//! `<file>` segment) follow the same shape with that segment omitted.

use std::path::{Path, PathBuf};

use corpusflow_types::AnnotationRef;

/// Maps a fully resolved reference to its path under `work_dir`. `file` is
/// `None` for corpus-level annotations.
pub fn resolve_path(work_dir: &Path, file: Option<&str>, reference: &AnnotationRef) -> PathBuf {
    let mut path = work_dir.to_path_buf();
    if let Some(file) = file {
        path.push(file);
    }
    path.push(&reference.span);
    match &reference.attr {
        Some(attr) => path.push(attr),
        None => path.push("_span"),
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_per_file_span_reference() {
        let reference = AnnotationRef::parse("segment.token").unwrap();
        let path = resolve_path(Path::new("work"), Some("doc"), &reference);
        assert_eq!(path, PathBuf::from("work/doc/segment.token/_span"));
    }

    #[test]
    fn maps_per_file_attribute_reference() {
        let reference = AnnotationRef::parse("segment.token:saldo.sense").unwrap();
        let path = resolve_path(Path::new("work"), Some("doc"), &reference);
        assert_eq!(path, PathBuf::from("work/doc/segment.token/saldo.sense"));
    }

    #[test]
    fn omits_file_segment_for_corpus_level_data() {
        let reference = AnnotationRef::parse("metadata.corpus_id").unwrap();
        let path = resolve_path(Path::new("work"), None, &reference);
        assert_eq!(path, PathBuf::from("work/metadata.corpus_id/_span"));
    }
}
