//! Owns the identities of the four directories the engine reads from and
//! writes to (§4.A): **data** (models, default configs), **corpus**
//! (current working corpus), **work** (intermediate artifacts), **export**.

use std::path::{Path, PathBuf};

/// The four canonical directory identities for one engine run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineDirs {
    pub data: PathBuf,
    pub corpus: PathBuf,
    pub work: PathBuf,
    pub export: PathBuf,
}

impl EngineDirs {
    /// Derives the standard `work/` and `export/` subdirectories from a
    /// corpus root, with a separately resolved data directory (callers
    /// should pass the result of `corpusflow_environment::resolve_data_dir`
    /// so `ENGINE_DATADIR` takes effect).
    pub fn for_corpus(corpus: impl Into<PathBuf>, data: impl Into<PathBuf>) -> Self {
        let corpus = corpus.into();
        let work = corpus.join("work");
        let export = corpus.join("export");
        Self { data: data.into(), corpus, work, export }
    }

    pub fn source_dir(&self) -> PathBuf {
        self.corpus.join("source")
    }

    pub fn content_key_store(&self) -> PathBuf {
        self.work.join(".content-keys")
    }

    /// The `.corpusflow/` subtree under the corpus directory, holding
    /// state that shouldn't round-trip through the corpus's own VCS the
    /// way source files do: remembered ambiguity decisions.
    pub fn state_dir(&self) -> PathBuf {
        self.corpus.join(".corpusflow")
    }

    pub fn decisions_file(&self) -> PathBuf {
        self.state_dir().join("decisions.json")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.state_dir().join("logs")
    }

    pub fn autocomplete_cache(&self) -> PathBuf {
        self.data.join("autocomplete-cache")
    }

    pub fn bin_dir(&self) -> PathBuf {
        self.data.join("bin")
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data.join("models")
    }

    /// The directory other corpora live under, for resolving a `parent:`
    /// reference that names a sibling corpus rather than a path.
    pub fn corpora_root(&self) -> Option<&Path> {
        self.corpus.parent()
    }
}
