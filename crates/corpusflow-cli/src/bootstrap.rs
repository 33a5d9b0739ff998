//! Shared engine bootstrapping: every verb that touches a corpus needs
//! the same four things wired together (directories, loaded config, a
//! discovered registry, the corpus's declared language) before it can
//! call into the resolver, rule compiler or scheduler.

use std::path::{Path, PathBuf};

use corpusflow_core::config::{self, Config, EngineDirs};
use corpusflow_core::environment;
use corpusflow_core::registry::{CustomScriptSource, PluginSource, ProcessorSource, Registry};
use corpusflow_core::resolver::Resolver;
use corpusflow_core::EngineError;

/// Everything downstream components need for one invocation, loaded and
/// frozen once (§9 "Global state": config and registry are values, not
/// ambient globals).
pub struct EngineContext {
    pub dirs: EngineDirs,
    pub config: Config,
    pub registry: Registry,
    pub corpus_id: String,
    pub language: String,
    pub variety: Option<String>,
}

impl EngineContext {
    pub fn load(corpus_dir: &Path, data_dir: Option<&Path>) -> Result<Self, EngineError> {
        let dirs = resolve_dirs(corpus_dir, data_dir);

        let config = config::load_corpus_config(&dirs.corpus)?;

        let language = config
            .get_str("metadata.language")
            .ok_or_else(|| EngineError::ConfigMissing("metadata.language".into()))?
            .to_string();
        let variety = config.get_str("metadata.variety").map(str::to_string);
        let corpus_id = config
            .get_str("metadata.id")
            .map(str::to_string)
            .or_else(|| dirs.corpus.file_name().and_then(|n| n.to_str()).map(str::to_string))
            .unwrap_or_else(|| "corpus".to_string());

        let registry = discover_registry(&dirs)?;

        Ok(Self { dirs, config, registry, corpus_id, language, variety })
    }

    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(&self.config, &self.registry)
    }
}

/// Resolves the four engine directories for an invocation, without
/// touching the corpus's `config.yaml` — shared by [`EngineContext::load`]
/// and the lighter-weight introspection verbs (`modules`, `schema`,
/// `languages`, `plugins`) that run without a fully configured corpus.
pub fn resolve_dirs(corpus_dir: &Path, data_dir: Option<&Path>) -> EngineDirs {
    let default_data_dir = data_dir.map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("data"));
    let data_dir = environment::resolve_data_dir(&default_data_dir);
    EngineDirs::for_corpus(corpus_dir, data_dir)
}

/// Discovers the registry from the three channels §4.B declares: the
/// built-in example processors, installed plugins under the data
/// directory, and `custom.<file>` scripts under the corpus directory.
pub fn discover_registry(dirs: &EngineDirs) -> Result<Registry, EngineError> {
    let sources: Vec<Box<dyn ProcessorSource>> = vec![
        Box::new(corpusflow_core::adapters::example_source()),
        Box::new(PluginSource::new(&dirs.data)),
        Box::new(CustomScriptSource::new(&dirs.corpus)),
    ];
    Ok(Registry::discover(sources)?)
}

/// Lists the source files under `dirs.source_dir()` by their opaque,
/// extension-stripped name (§3 "Corpus": a tree of source files; the
/// engine names them without their on-disk extension since the importer
/// owns interpreting the bytes).
pub fn list_source_files(dirs: &EngineDirs) -> std::io::Result<Vec<String>> {
    let source_dir = dirs.source_dir();
    let mut names = match std::fs::read_dir(&source_dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .filter_map(|e| e.path().file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect::<Vec<_>>(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => return Err(e),
    };
    names.sort();
    names.dedup();
    Ok(names)
}
