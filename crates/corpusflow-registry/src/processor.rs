//! The execution contract a processor implements, and the context a job
//! is handed at run time.
//!
//! Everything about *what* a processor's body does (parse XML, tokenize,
//! render a PDF, call an external tagger) is out of scope per spec §1 —
//! this only defines the seam the scheduler calls through.

use std::collections::BTreeMap;
use std::path::PathBuf;

use corpusflow_types::ProcessorDescriptor;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything a processor's body needs for one job: its bound parameters,
/// resolved to either a concrete path or an immediate value, plus the
/// current source file (if the rule is per-file) and corpus id.
///
/// Derives `Serialize`/`Deserialize` so `corpusflow-preloader` can carry
/// one of these across its dispatch socket unchanged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobContext {
    pub source_file: Option<String>,
    pub corpus_id: String,
    /// Parameter name -> bound value, mirroring `Rule::bindings` after
    /// the scheduler has substituted `{file}` into any symbolic paths.
    pub params: BTreeMap<String, ParamValue>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ParamValue {
    Path(PathBuf),
    Value(Value),
}

impl JobContext {
    pub fn path(&self, name: &str) -> Option<&std::path::Path> {
        match self.params.get(name)? {
            ParamValue::Path(p) => Some(p.as_path()),
            ParamValue::Value(_) => None,
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        match self.params.get(name)? {
            ParamValue::Value(v) => Some(v),
            ParamValue::Path(_) => None,
        }
    }
}

/// A processor a registry has discovered: its descriptor, plus the
/// callable that executes one job.
pub trait Processor: Send + Sync {
    fn descriptor(&self) -> &ProcessorDescriptor;

    /// Runs one job. Implementations must write to temporary paths and
    /// leave final placement (the atomic rename) to the scheduler, per
    /// §3's "a rule's outputs are written atomically" invariant — a
    /// processor returning `Ok(())` promises its declared outputs are
    /// ready to be published, not that it already published them.
    fn run(&self, ctx: &JobContext) -> anyhow::Result<()>;

    /// Preload hook: called once per worker at preloader startup with the
    /// resolved `preloader_params`. Returns an opaque warm state the
    /// preloader stashes for this worker. Processors with no
    /// `ProcessorDescriptor::preloader` binding are never asked.
    fn preload(&self, _params: &BTreeMap<String, Value>) -> anyhow::Result<Box<dyn std::any::Any + Send>> {
        anyhow::bail!("{} declares no preloader hook", self.descriptor().id)
    }

    /// Cleanup hook: called after each preloaded job with the current
    /// warm state and bindings; its return value replaces the warm
    /// state. Default is identity (no periodic restart needed).
    fn preloader_cleanup(
        &self,
        warm_state: Box<dyn std::any::Any + Send>,
        _ctx: &JobContext,
    ) -> anyhow::Result<Box<dyn std::any::Any + Send>> {
        Ok(warm_state)
    }
}
