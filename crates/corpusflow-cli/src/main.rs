//! The `corpusflow` CLI: parses the verbs in spec §6 and wires each one
//! into the engine crates fronted by `corpusflow-core`.
//!
//! Every verb that touches a corpus goes through [`bootstrap::EngineContext`]
//! (or the lighter-weight [`bootstrap::resolve_dirs`]/[`bootstrap::discover_registry`]
//! pair for introspection verbs that don't need a loaded config) so the
//! same four pieces of state — directories, config, registry, language —
//! are assembled the same way regardless of which verb is running.

mod bootstrap;
mod progress;

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use clap_complete::Shell;

use corpusflow_core::config::{self, Config};
use corpusflow_core::preloader::{self, PreloadTarget, PreloaderConfig, PreloaderServer};
use corpusflow_core::registry::Registry;
use corpusflow_core::rules::{self, CompileContext, DecisionStore};
use corpusflow_core::scheduler::{self, ContentKeyStore, JobGraph, RunOptions};
use corpusflow_core::types::{AnnotationRef, ConflictSet, ProcessorKind};
use corpusflow_core::EngineError;

use bootstrap::EngineContext;
use progress::CliReporter;

#[derive(Parser, Debug)]
#[command(name = "corpusflow", version)]
#[command(about = "Corpus-processing pipeline engine: annotate, export and preload a corpus.")]
struct Cli {
    /// Corpus directory (default: current directory).
    #[arg(short = 'C', long, default_value = ".")]
    corpus: PathBuf,

    /// Data directory (models, default configs, plugins). Overridden by
    /// the `ENGINE_DATADIR` environment variable.
    #[arg(long)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the pipeline, producing every requested target file.
    Run {
        targets: Vec<String>,
        #[arg(short = 'j', long, default_value_t = 1)]
        jobs: usize,
        #[arg(long)]
        socket: Option<PathBuf>,
        #[arg(long)]
        force_preloader: bool,
    },
    /// Run installer processors (or only those named by TARGETS).
    Install { targets: Vec<String> },
    /// Run uninstaller processors (or only those named by TARGETS).
    Uninstall { targets: Vec<String> },
    /// Remove cached intermediate/export/log state. Always destructive.
    Clean {
        #[arg(long)]
        all: bool,
        #[arg(long)]
        export: bool,
        #[arg(long)]
        logs: bool,
    },
    /// Print the effective value of KEY, or the whole config tree.
    Config { key: Option<String> },
    /// List the corpus's source files.
    Files,
    /// List discovered processors.
    Modules {
        #[arg(long)]
        annotators: bool,
        #[arg(long)]
        importers: bool,
        #[arg(long)]
        exporters: bool,
    },
    /// List the preset library and, where configured, its expansion.
    Presets,
    /// List class bindings: explicit, implicit, and ambiguous.
    Classes,
    /// List every language code any discovered processor declares.
    Languages,
    /// Scaffold a new corpus directory.
    Setup {
        #[arg(long)]
        dir: Option<PathBuf>,
        #[arg(long)]
        reset: bool,
    },
    /// Run modelbuilder processors.
    BuildModels {
        #[arg(long)]
        all: bool,
        #[arg(long)]
        language: Option<String>,
    },
    /// Manage installed plugins under the data directory.
    Plugins {
        #[command(subcommand)]
        action: PluginsAction,
    },
    /// Run a single rule directly, bypassing conflict preference.
    RunRule { targets: Vec<String> },
    /// Create an empty source file (for scaffolding/testing a corpus).
    CreateFile { files: Vec<String> },
    /// Start or stop the preloader daemon.
    Preload {
        #[command(subcommand)]
        action: PreloadAction,
    },
    /// Print a shell completion script.
    Autocomplete {
        #[arg(value_enum, default_value_t = Shell::Bash)]
        shell: Shell,
    },
    /// Print the corpus config JSON Schema.
    Schema,
}

#[derive(Subcommand, Debug)]
enum PluginsAction {
    Install { path: PathBuf },
    Uninstall { name: String },
    List,
}

#[derive(Subcommand, Debug)]
enum PreloadAction {
    Start {
        #[arg(long)]
        socket: Option<PathBuf>,
        #[arg(long, default_value_t = 1)]
        processes: usize,
    },
    Stop {
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::from(0),
        Err(err) => {
            if let Some(engine_err) = err.downcast_ref::<EngineError>() {
                eprintln!("[error] {engine_err}");
                ExitCode::from(engine_err.exit_code() as u8)
            } else {
                eprintln!("[error] {err:#}");
                ExitCode::from(2)
            }
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir.as_deref();
    match cli.cmd {
        Commands::Run { targets, jobs, socket, force_preloader } => {
            cmd_run(&cli.corpus, data_dir, &targets, jobs, socket.as_deref(), force_preloader)
        }
        Commands::Install { targets } => cmd_install_uninstall(&cli.corpus, data_dir, &targets, ProcessorKind::Installer),
        Commands::Uninstall { targets } => cmd_install_uninstall(&cli.corpus, data_dir, &targets, ProcessorKind::Uninstaller),
        Commands::Clean { all, export, logs } => cmd_clean(&cli.corpus, data_dir, all, export, logs),
        Commands::Config { key } => cmd_config(&cli.corpus, data_dir, key.as_deref()),
        Commands::Files => cmd_files(&cli.corpus, data_dir),
        Commands::Modules { annotators, importers, exporters } => {
            cmd_modules(&cli.corpus, data_dir, annotators, importers, exporters)
        }
        Commands::Presets => cmd_presets(&cli.corpus, data_dir),
        Commands::Classes => cmd_classes(&cli.corpus, data_dir),
        Commands::Languages => cmd_languages(&cli.corpus, data_dir),
        Commands::Setup { dir, reset } => cmd_setup(dir.as_deref().unwrap_or(&cli.corpus), reset),
        Commands::BuildModels { all, language } => cmd_build_models(&cli.corpus, data_dir, all, language.as_deref()),
        Commands::Plugins { action } => cmd_plugins(&cli.corpus, data_dir, action),
        Commands::RunRule { targets } => cmd_run_rule(&cli.corpus, data_dir, &targets),
        Commands::CreateFile { files } => cmd_create_file(&cli.corpus, data_dir, &files),
        Commands::Preload { action } => cmd_preload(&cli.corpus, data_dir, action),
        Commands::Autocomplete { shell } => cmd_autocomplete(&cli.corpus, data_dir, shell),
        Commands::Schema => cmd_schema(&cli.corpus, data_dir),
    }
}

// --- run / install / uninstall / build-models -------------------------

fn cmd_run(corpus: &Path, data_dir: Option<&Path>, targets: &[String], jobs: usize, socket: Option<&Path>, force_preloader: bool) -> Result<()> {
    let ctx = EngineContext::load(corpus, data_dir)?;
    let reporter = CliReporter::new();

    let compiled = compile(&ctx)?;
    let resolver = ctx.resolver();
    let resolved_targets = resolve_targets(&resolver, targets)?;
    if !targets.is_empty() {
        reporter.info(&format!("requested targets: {}", targets.join(", ")));
    }

    let source_files = bootstrap::list_source_files(&ctx.dirs).context("listing source files")?;
    let graph = JobGraph::build(&compiled.conflicts, &compiled.wildcard_patterns, &resolver, &ctx.dirs, &source_files, &resolved_targets);
    if graph.is_empty() {
        if !resolved_targets.is_empty() {
            return Err(EngineError::NoProducer(targets.join(", ")).into());
        }
        reporter.info("nothing to do: no rules produce any requested output");
        return Ok(());
    }

    let mut key_store = ContentKeyStore::load(&ctx.dirs.content_key_store());
    let fingerprint = ctx.registry.fingerprint();
    // A job only ever gets dispatched here if its own rule declares a
    // preloader target; jobs with none always run locally regardless of
    // whether a preloader happens to be listening on this socket.
    let socket_path = socket.map(Path::to_path_buf).unwrap_or_else(default_socket_path);
    let options = RunOptions { workers: jobs.max(1), socket: Some(socket_path), force_preloader };

    let summary = scheduler::execute(&graph, &ctx.registry, &ctx.config, &fingerprint, &mut key_store, &options, &reporter);
    key_store.save(&ctx.dirs.content_key_store()).context("saving content-key store")?;

    print_summary(&summary);
    if summary.is_success() {
        Ok(())
    } else {
        Err(EngineError::RuleFailed {
            rule_id: summary.failed[0].0.clone(),
            reason: format!("{} rule(s) failed", summary.failed.len()),
        }
        .into())
    }
}

fn cmd_install_uninstall(corpus: &Path, data_dir: Option<&Path>, targets: &[String], kind: ProcessorKind) -> Result<()> {
    let ctx = EngineContext::load(corpus, data_dir)?;
    let reporter = CliReporter::new();
    let compiled = compile(&ctx)?;

    let filtered = filter_conflicts_by_kind(&compiled.conflicts, &ctx.registry, kind, targets);
    let source_files = bootstrap::list_source_files(&ctx.dirs).context("listing source files")?;
    let resolver = ctx.resolver();
    let graph = JobGraph::build(&filtered, &[], &resolver, &ctx.dirs, &source_files, &[]);
    if graph.is_empty() {
        reporter.info(&format!("no {} processors matched", kind.as_str()));
        return Ok(());
    }

    let mut key_store = ContentKeyStore::load(&ctx.dirs.content_key_store());
    let fingerprint = ctx.registry.fingerprint();
    let summary = scheduler::execute(&graph, &ctx.registry, &ctx.config, &fingerprint, &mut key_store, &RunOptions::default(), &reporter);
    key_store.save(&ctx.dirs.content_key_store()).context("saving content-key store")?;

    print_summary(&summary);
    if summary.is_success() {
        Ok(())
    } else {
        Err(EngineError::RuleFailed { rule_id: summary.failed[0].0.clone(), reason: "1 or more rules failed".into() }.into())
    }
}

fn cmd_build_models(corpus: &Path, data_dir: Option<&Path>, all: bool, language: Option<&str>) -> Result<()> {
    let mut ctx = EngineContext::load(corpus, data_dir)?;
    if let Some(lang) = language {
        ctx.language = lang.to_string();
        ctx.variety = None;
    }
    let reporter = CliReporter::new();
    let compiled = compile(&ctx)?;

    let mut filtered = filter_conflicts_by_kind(&compiled.conflicts, &ctx.registry, ProcessorKind::Modelbuilder, &[]);
    if all {
        // §4.D: rules excluded by the language filter are kept around in
        // `inactive_by_language` precisely so a verb like this one can
        // still reach them explicitly.
        for rule in &compiled.inactive_by_language {
            if ctx.registry.get(&rule.processor_id).is_some_and(|p| p.descriptor().kind == ProcessorKind::Modelbuilder) {
                if let Ok(set) = ConflictSet::resolve(vec![rule.clone()], rules::output_key(rule)) {
                    filtered.push(set);
                }
            }
        }
    }

    let source_files = bootstrap::list_source_files(&ctx.dirs).context("listing source files")?;
    let resolver = ctx.resolver();
    let graph = JobGraph::build(&filtered, &[], &resolver, &ctx.dirs, &source_files, &[]);
    if graph.is_empty() {
        reporter.info("no modelbuilder processors matched");
        return Ok(());
    }

    let mut key_store = ContentKeyStore::load(&ctx.dirs.content_key_store());
    let fingerprint = ctx.registry.fingerprint();
    let summary = scheduler::execute(&graph, &ctx.registry, &ctx.config, &fingerprint, &mut key_store, &RunOptions::default(), &reporter);
    key_store.save(&ctx.dirs.content_key_store()).context("saving content-key store")?;
    print_summary(&summary);
    if summary.is_success() {
        Ok(())
    } else {
        Err(EngineError::RuleFailed { rule_id: summary.failed[0].0.clone(), reason: "1 or more model builds failed".into() }.into())
    }
}

fn cmd_run_rule(corpus: &Path, data_dir: Option<&Path>, targets: &[String]) -> Result<()> {
    anyhow::ensure!(!targets.is_empty(), EngineError::user_error("run-rule requires at least one TARGET (a rule id)"));
    let ctx = EngineContext::load(corpus, data_dir)?;
    let reporter = CliReporter::new();
    let compiled = compile(&ctx)?;

    let wanted: BTreeSet<&str> = targets.iter().map(String::as_str).collect();
    let mut matched = Vec::new();
    for set in &compiled.conflicts {
        for rule in &set.rules {
            if wanted.contains(rule.id.as_str()) {
                matched.push(rule.clone());
            }
        }
    }
    anyhow::ensure!(!matched.is_empty(), EngineError::NoProducer(targets.join(", ")));

    let source_files = bootstrap::list_source_files(&ctx.dirs).context("listing source files")?;
    let sets: Vec<_> = matched
        .into_iter()
        .filter_map(|r| ConflictSet::resolve(vec![r.clone()], rules::output_key(&r)).ok())
        .collect();
    let resolver = ctx.resolver();
    let graph = JobGraph::build(&sets, &[], &resolver, &ctx.dirs, &source_files, &[]);

    let mut key_store = ContentKeyStore::load(&ctx.dirs.content_key_store());
    let fingerprint = ctx.registry.fingerprint();
    let summary = scheduler::execute(&graph, &ctx.registry, &ctx.config, &fingerprint, &mut key_store, &RunOptions::default(), &reporter);
    key_store.save(&ctx.dirs.content_key_store()).context("saving content-key store")?;
    print_summary(&summary);
    if summary.is_success() {
        Ok(())
    } else {
        Err(EngineError::RuleFailed { rule_id: summary.failed[0].0.clone(), reason: "rule failed".into() }.into())
    }
}

/// Compiles the current registry/config pair into rules, loading and
/// persisting remembered ambiguity decisions around the call (§6
/// "Persisted state").
fn compile(ctx: &EngineContext) -> Result<rules::CompiledRuleSet> {
    let resolver = ctx.resolver();
    let decisions = DecisionStore::load(&ctx.dirs.decisions_file());
    let compile_ctx = CompileContext {
        registry: &ctx.registry,
        resolver: &resolver,
        config: &ctx.config,
        dirs: &ctx.dirs,
        corpus_id: &ctx.corpus_id,
        language: &ctx.language,
        variety: ctx.variety.as_deref(),
    };
    let compiled = rules::compile_rules(&compile_ctx, &decisions).map_err(EngineError::from)?;
    decisions.save(&ctx.dirs.decisions_file()).context("saving ambiguity decisions")?;
    Ok(compiled)
}

/// Parses and resolves each requested target string into a concrete
/// [`AnnotationRef`] (§4.C.1-2: config placeholders, then class
/// placeholders), leaving any `{wildcard}` token for the scheduler to bind
/// against a wildcard-pattern rule (§4.C.3). An explicitly requested target
/// that doesn't parse or resolve is a user error, not silent suppression.
fn resolve_targets(resolver: &corpusflow_core::resolver::Resolver<'_>, targets: &[String]) -> Result<Vec<AnnotationRef>> {
    let mut resolved = Vec::with_capacity(targets.len());
    for text in targets {
        let reference = AnnotationRef::parse(text).map_err(|e| EngineError::user_error(format!("invalid target {text:?}: {e}")))?;
        resolved.push(resolver.resolve_required(&reference).map_err(EngineError::from)?);
    }
    Ok(resolved)
}

fn filter_conflicts_by_kind(
    conflicts: &[ConflictSet],
    registry: &Registry,
    kind: ProcessorKind,
    targets: &[String],
) -> Vec<ConflictSet> {
    let wanted: BTreeSet<&str> = targets.iter().map(String::as_str).collect();
    conflicts
        .iter()
        .filter(|set| {
            let Some(preferred) = set.preferred() else { return false };
            let is_kind = registry.get(&preferred.processor_id).is_some_and(|p| p.descriptor().kind == kind);
            is_kind && (wanted.is_empty() || wanted.contains(preferred.processor_id.as_str()) || wanted.contains(preferred.id.as_str()))
        })
        .cloned()
        .collect()
}

fn print_summary(summary: &scheduler::RunSummary) {
    for id in &summary.ran {
        println!("ran:     {id}");
    }
    for id in &summary.fresh {
        println!("fresh:   {id}");
    }
    for (id, reason) in &summary.failed {
        println!("failed:  {id} ({reason})");
    }
    for id in &summary.tainted {
        println!("skipped: {id} (upstream failure)");
    }
    println!();
    println!(
        "{} ran, {} fresh, {} failed, {} skipped",
        summary.ran.len(),
        summary.fresh.len(),
        summary.failed.len(),
        summary.tainted.len()
    );
}

// --- clean --------------------------------------------------------------

fn cmd_clean(corpus: &Path, data_dir: Option<&Path>, all: bool, export: bool, logs: bool) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    remove_dir_contents(&dirs.work)?;
    println!("cleaned {}", dirs.work.display());

    if all || export {
        remove_dir_contents(&dirs.export)?;
        println!("cleaned {}", dirs.export.display());
    }
    if all || logs {
        remove_dir_contents(&dirs.log_dir())?;
        println!("cleaned {}", dirs.log_dir().display());
    }
    Ok(())
}

fn remove_dir_contents(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e).with_context(|| format!("removing {}", dir.display())),
    }
}

// --- introspection verbs --------------------------------------------------

fn cmd_config(corpus: &Path, data_dir: Option<&Path>, key: Option<&str>) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let cfg = config::load_corpus_config(&dirs.corpus).map_err(EngineError::from)?;
    match key {
        Some(key) => match cfg.get(key) {
            Some(value) => println!("{}", serde_json::to_string_pretty(value)?),
            None => println!("(unset)"),
        },
        None => println!("{}", serde_json::to_string_pretty(cfg.as_value())?),
    }
    Ok(())
}

fn cmd_files(corpus: &Path, data_dir: Option<&Path>) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    for file in bootstrap::list_source_files(&dirs)? {
        println!("{file}");
    }
    Ok(())
}

fn cmd_modules(corpus: &Path, data_dir: Option<&Path>, annotators: bool, importers: bool, exporters: bool) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let registry = bootstrap::discover_registry(&dirs)?;

    let kinds: Vec<ProcessorKind> = if !annotators && !importers && !exporters {
        vec![
            ProcessorKind::Importer,
            ProcessorKind::Annotator,
            ProcessorKind::Exporter,
            ProcessorKind::Installer,
            ProcessorKind::Uninstaller,
            ProcessorKind::Modelbuilder,
        ]
    } else {
        let mut kinds = Vec::new();
        if importers {
            kinds.push(ProcessorKind::Importer);
        }
        if annotators {
            kinds.push(ProcessorKind::Annotator);
        }
        if exporters {
            kinds.push(ProcessorKind::Exporter);
        }
        kinds
    };

    for kind in kinds {
        for processor in registry.of_kind(kind) {
            let desc = processor.descriptor();
            println!("{:<10} {:<32} {}", kind.as_str(), desc.id, desc.summary);
        }
    }
    Ok(())
}

fn cmd_presets(corpus: &Path, data_dir: Option<&Path>) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let library = config::load_preset_library(&dirs.data);
    let mut names: Vec<&str> = library.names().collect();
    names.sort_unstable();
    if names.is_empty() {
        println!("no presets found under {}", dirs.data.join("presets.yaml").display());
        return Ok(());
    }
    for name in names {
        let entries = library.entries(name).unwrap_or_default();
        println!("{name}:");
        for entry in entries {
            println!("  {entry}");
        }
    }
    Ok(())
}

fn cmd_classes(corpus: &Path, data_dir: Option<&Path>) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let registry = bootstrap::discover_registry(&dirs)?;
    let cfg = config::load_corpus_config(&dirs.corpus).unwrap_or_else(|_| Config::empty());

    let explicit: std::collections::BTreeMap<String, String> = match cfg.get("classes") {
        Some(serde_json::Value::Object(map)) => {
            map.iter().filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string()))).collect()
        }
        _ => Default::default(),
    };

    let mut candidates: std::collections::BTreeMap<String, Vec<(String, String)>> = Default::default();
    for (class, reference, processor_id) in registry.class_producers() {
        candidates.entry(class).or_default().push((reference.to_string(), processor_id));
    }

    let mut classes: BTreeSet<&str> = explicit.keys().map(String::as_str).collect();
    classes.extend(candidates.keys().map(String::as_str));

    for class in classes {
        if let Some(bound) = explicit.get(class) {
            println!("{class:<16} -> {bound} (explicit)");
        } else {
            match candidates.get(class).map(Vec::as_slice) {
                Some([(reference, _)]) => println!("{class:<16} -> {reference} (implicit)"),
                Some(many) => {
                    let names: Vec<&str> = many.iter().map(|(_, id)| id.as_str()).collect();
                    println!("{class:<16} -> AMBIGUOUS among {}", names.join(", "));
                }
                None => println!("{class:<16} -> (unbound)"),
            }
        }
    }
    Ok(())
}

fn cmd_languages(corpus: &Path, data_dir: Option<&Path>) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let registry = bootstrap::discover_registry(&dirs)?;
    for lang in registry.languages() {
        match lang.variety {
            Some(variety) => println!("{}-{variety}", lang.code),
            None => println!("{}", lang.code),
        }
    }
    Ok(())
}

fn cmd_schema(corpus: &Path, data_dir: Option<&Path>) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let registry = bootstrap::discover_registry(&dirs)?;
    let document = corpusflow_core::schema::build_document(registry.config_keys().clone());
    println!("{}", serde_json::to_string_pretty(&document)?);
    Ok(())
}

/// Generates a completion script and writes it under the data directory's
/// autocompletion cache (§6 "Persisted state") before printing it, so a
/// shell's `source <(corpusflow autocomplete …)` always reads freshly
/// generated output while the cache stays available for inspection or
/// reuse by a caller that doesn't want to re-invoke the CLI.
fn cmd_autocomplete(corpus: &Path, data_dir: Option<&Path>, shell: Shell) -> Result<()> {
    use clap::CommandFactory;
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();

    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, name, &mut buf);

    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let cache_dir = dirs.autocomplete_cache();
    std::fs::create_dir_all(&cache_dir).context("creating autocompletion cache directory")?;
    let cache_file = cache_dir.join(shell.to_string());
    std::fs::write(&cache_file, &buf).with_context(|| format!("writing {}", cache_file.display()))?;

    std::io::Write::write_all(&mut std::io::stdout(), &buf)?;
    Ok(())
}

// --- setup / plugins / create-file --------------------------------------

fn cmd_setup(corpus_dir: &Path, reset: bool) -> Result<()> {
    if reset {
        remove_dir_contents(corpus_dir)?;
    }
    std::fs::create_dir_all(corpus_dir.join("source")).context("creating source/")?;
    std::fs::create_dir_all(corpus_dir.join("work")).context("creating work/")?;
    std::fs::create_dir_all(corpus_dir.join("export")).context("creating export/")?;

    let config_path = corpus_dir.join("config.yaml");
    if !config_path.exists() {
        std::fs::write(
            &config_path,
            "metadata:\n  id: corpus\n  language: und\nimport:\n  importer: xml_import:parse\nexport:\n  exporters: [xml_export:pretty]\n",
        )
        .context("writing config.yaml")?;
    }
    println!("corpus scaffolded at {}", corpus_dir.display());
    Ok(())
}

fn cmd_plugins(corpus: &Path, data_dir: Option<&Path>, action: PluginsAction) -> Result<()> {
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let plugins_dir = dirs.data.join("plugins");
    std::fs::create_dir_all(&plugins_dir).context("creating plugins directory")?;

    match action {
        PluginsAction::Install { path } => {
            let name = path.file_name().context("plugin path has no file name")?;
            let dest = plugins_dir.join(name);
            std::fs::copy(&path, &dest).with_context(|| format!("copying {} to {}", path.display(), dest.display()))?;
            println!("installed plugin {}", dest.display());
        }
        PluginsAction::Uninstall { name } => {
            let manifest = plugins_dir.join(format!("{name}.manifest.json"));
            std::fs::remove_file(&manifest).with_context(|| format!("removing {}", manifest.display()))?;
            println!("uninstalled plugin {name}");
        }
        PluginsAction::List => {
            let mut names = Vec::new();
            if let Ok(entries) = std::fs::read_dir(&plugins_dir) {
                for entry in entries.flatten() {
                    if let Some(stem) = entry.path().file_name().and_then(|n| n.to_str()) {
                        if let Some(name) = stem.strip_suffix(".manifest.json") {
                            names.push(name.to_string());
                        }
                    }
                }
            }
            names.sort();
            for name in names {
                println!("{name}");
            }
        }
    }
    Ok(())
}

fn cmd_create_file(corpus: &Path, data_dir: Option<&Path>, files: &[String]) -> Result<()> {
    anyhow::ensure!(!files.is_empty(), EngineError::user_error("create-file requires at least one FILE"));
    let dirs = bootstrap::resolve_dirs(corpus, data_dir);
    let source_dir = dirs.source_dir();
    std::fs::create_dir_all(&source_dir).context("creating source/")?;
    for file in files {
        let path = source_dir.join(file);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, b"").with_context(|| format!("creating {}", path.display()))?;
        println!("created {}", path.display());
    }
    Ok(())
}

// --- preload --------------------------------------------------------------

fn cmd_preload(corpus: &Path, data_dir: Option<&Path>, action: PreloadAction) -> Result<()> {
    match action {
        PreloadAction::Start { socket, processes } => cmd_preload_start(corpus, data_dir, socket, processes),
        PreloadAction::Stop { socket } => {
            let socket = socket.unwrap_or_else(default_socket_path);
            preloader::shutdown(&socket).map_err(EngineError::from)?;
            println!("stopped preloader at {}", socket.display());
            Ok(())
        }
    }
}

fn cmd_preload_start(corpus: &Path, data_dir: Option<&Path>, socket: Option<PathBuf>, processes: usize) -> Result<()> {
    let ctx = EngineContext::load(corpus, data_dir)?;
    let socket_path = socket.unwrap_or_else(default_socket_path);

    let mut preload_config = PreloaderConfig::new(&socket_path);
    for processor in ctx.registry.all() {
        let desc = processor.descriptor();
        if let Some(preloader_spec) = &desc.preloader {
            preload_config = preload_config.with_target(PreloadTarget {
                processor_id: desc.id.clone(),
                preload_target: preloader_spec.preload_target.clone(),
                shared: preloader_spec.shared,
                processes,
            });
        }
    }

    anyhow::ensure!(
        !preload_config.targets.is_empty(),
        EngineError::user_error("no discovered processor declares a preloader binding")
    );

    let params: std::collections::BTreeMap<String, serde_json::Value> = ctx
        .config
        .as_value()
        .as_object()
        .into_iter()
        .flat_map(|m| m.iter())
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();

    let server = PreloaderServer::start(&preload_config, std::sync::Arc::new(ctx.registry), &params).context("starting preloader server")?;
    println!("preloader listening on {}", socket_path.display());
    server.serve().context("serving preloader connections")?;
    Ok(())
}

fn default_socket_path() -> PathBuf {
    std::env::temp_dir().join("corpusflow-preloader.sock")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn cli_parses_run_with_flags() {
        let cli = Cli::parse_from(["corpusflow", "run", "<token>", "-j", "4", "--force-preloader"]);
        match cli.cmd {
            Commands::Run { targets, jobs, force_preloader, .. } => {
                assert_eq!(targets, vec!["<token>".to_string()]);
                assert_eq!(jobs, 4);
                assert!(force_preloader);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn cli_parses_modules_filters() {
        let cli = Cli::parse_from(["corpusflow", "modules", "--exporters"]);
        match cli.cmd {
            Commands::Modules { annotators, importers, exporters } => {
                assert!(!annotators && !importers && exporters);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn setup_then_files_round_trips_empty_corpus() {
        let td = tempdir().unwrap();
        let corpus = td.path().join("mycorpus");
        cmd_setup(&corpus, false).unwrap();
        assert!(corpus.join("config.yaml").is_file());
        assert!(corpus.join("source").is_dir());

        let files = cmd_files(&corpus, None);
        assert!(files.is_ok());
    }

    #[test]
    fn create_file_writes_empty_source_file() {
        let td = tempdir().unwrap();
        let corpus = td.path().join("mycorpus");
        std::fs::create_dir_all(&corpus).unwrap();
        cmd_create_file(&corpus, None, &["doc1.xml".to_string()]).unwrap();
        assert!(corpus.join("source").join("doc1.xml").is_file());
    }

    #[test]
    fn create_file_rejects_empty_file_list() {
        let td = tempdir().unwrap();
        let err = cmd_create_file(td.path(), None, &[]).unwrap_err();
        assert!(err.to_string().contains("create-file requires"));
    }

    #[test]
    fn clean_tolerates_missing_directories() {
        let td = tempdir().unwrap();
        let corpus = td.path().join("mycorpus");
        std::fs::create_dir_all(&corpus).unwrap();
        assert!(cmd_clean(&corpus, None, true, false, false).is_ok());
    }

    #[test]
    fn plugins_list_is_empty_for_fresh_data_dir() {
        let td = tempdir().unwrap();
        let corpus = td.path().join("mycorpus");
        std::fs::create_dir_all(&corpus).unwrap();
        assert!(cmd_plugins(&corpus, Some(&td.path().join("data")), PluginsAction::List).is_ok());
    }
}
