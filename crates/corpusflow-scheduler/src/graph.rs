//! DAG construction (§4.E.1-2): expands compiled rules into concrete,
//! per-file or corpus-level jobs, substitutes the symbolic `{file}`
//! placeholder the rule compiler leaves in per-file paths, and indexes
//! jobs by output path so producer/consumer edges can be found by
//! comparing paths rather than re-running reference resolution.
//!
//! When the caller asks for specific `targets` (§4.E.1 "seed the frontier
//! with target files"), [`JobGraph::build`] also instantiates any
//! wildcard-pattern rule needed to produce one (§4.C.3, §4.D) and then
//! restricts the graph to the backward-reachable cone of those targets,
//! instead of returning every active rule's jobs.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use corpusflow_config::EngineDirs;
use corpusflow_resolver::Resolver;
use corpusflow_types::{AnnotationRef, ConflictSet, ParamBinding, Rule, RuleScope};

const FILE_TOKEN: &str = "{file}";

/// One concrete, schedulable unit of work: a rule instantiated against a
/// specific source file (or the corpus as a whole), with every `{file}`
/// placeholder substituted out of its paths and immediate values.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: String,
    pub rule_id: String,
    pub processor_id: String,
    pub source_file: Option<String>,
    pub bindings: Vec<(String, ParamBinding)>,
    pub inputs: Vec<PathBuf>,
    pub outputs: Vec<PathBuf>,
    pub priority: i64,
    pub max_threads: Option<usize>,
    pub config_sensitivity: BTreeSet<String>,
    /// Backoff rules sharing this job's outputs, tried in order if the
    /// preferred rule's job fails (§4.D "producer conflicts").
    pub backoffs: Vec<Rule>,
    /// The preloader target this job's processor declared, if any (§4.F).
    /// The scheduler tries dispatching to a warm worker under this name
    /// before falling back to running the processor locally.
    pub preloader_target: Option<String>,
}

/// The full set of jobs for one run, indexed by the output path each job
/// publishes so dependency edges can be resolved by path lookup.
pub struct JobGraph {
    pub jobs: Vec<Job>,
    output_index: BTreeMap<PathBuf, usize>,
}

impl JobGraph {
    /// Builds the job graph for `conflicts`' preferred rules. When `targets`
    /// is empty, returns every instantiated job (the full active rule set —
    /// what the install/uninstall/model-building verbs still want). When
    /// `targets` is non-empty, seeds the frontier with the job(s) producing
    /// each target (instantiating a matching `wildcard_patterns` entry on
    /// demand if no concrete rule already produces it, per §4.C.3/§4.D) and
    /// restricts the returned graph to their backward-reachable cone (§4.E.1
    /// "seed the frontier with target files... look up its producing rule").
    pub fn build(
        conflicts: &[ConflictSet],
        wildcard_patterns: &[Rule],
        resolver: &Resolver,
        dirs: &EngineDirs,
        source_files: &[String],
        targets: &[AnnotationRef],
    ) -> Self {
        let mut jobs = Vec::new();
        let mut output_index = BTreeMap::new();
        let mut rule_job_indices: BTreeMap<String, Vec<usize>> = BTreeMap::new();

        for conflict in conflicts {
            let Some(preferred) = conflict.preferred() else { continue };
            let backoffs = conflict.backoffs().to_vec();

            if preferred.scope == RuleScope::PerFile {
                for file in source_files {
                    let job = instantiate(preferred, Some(file.as_str()), backoffs.clone());
                    rule_job_indices.entry(preferred.id.clone()).or_default().push(jobs.len());
                    register(&mut jobs, &mut output_index, job);
                }
            } else {
                let job = instantiate(preferred, None, backoffs.clone());
                rule_job_indices.entry(preferred.id.clone()).or_default().push(jobs.len());
                register(&mut jobs, &mut output_index, job);
            }
        }

        if targets.is_empty() {
            return Self { jobs, output_index };
        }

        let mut seeds = BTreeSet::new();
        for target in targets {
            let concrete_producer = conflicts.iter().find(|c| c.preferred().is_some_and(|r| r.outputs.contains(target)));
            if let Some(conflict) = concrete_producer {
                let rule_id = &conflict.preferred().expect("checked above").id;
                seeds.extend(rule_job_indices.get(rule_id).into_iter().flatten().copied());
                continue;
            }

            let Some(pattern) = wildcard_patterns.iter().find(|p| p.outputs.first().is_some_and(|o| resolver.unify(o, target).is_some())) else {
                continue;
            };

            if pattern.scope == RuleScope::PerFile {
                for file in source_files {
                    if let Some(job) = Self::instantiate_wildcard(pattern, target, resolver, dirs, Some(file.as_str())) {
                        seeds.insert(jobs.len());
                        register(&mut jobs, &mut output_index, job);
                    }
                }
            } else if let Some(job) = Self::instantiate_wildcard(pattern, target, resolver, dirs, None) {
                seeds.insert(jobs.len());
                register(&mut jobs, &mut output_index, job);
            }
        }

        Self::restrict_to(jobs, output_index, seeds)
    }

    /// Keeps only the jobs backward-reachable from `seeds` through
    /// input/output path edges, renumbering the output index to match.
    fn restrict_to(jobs: Vec<Job>, output_index: BTreeMap<PathBuf, usize>, seeds: BTreeSet<usize>) -> Self {
        let mut keep = BTreeSet::new();
        let mut frontier: Vec<usize> = seeds.into_iter().collect();
        while let Some(idx) = frontier.pop() {
            if !keep.insert(idx) {
                continue;
            }
            for input in &jobs[idx].inputs {
                if let Some(&producer_idx) = output_index.get(input) {
                    if !keep.contains(&producer_idx) {
                        frontier.push(producer_idx);
                    }
                }
            }
        }

        let mut kept_jobs = Vec::new();
        let mut new_index = BTreeMap::new();
        for idx in keep {
            let job = jobs[idx].clone();
            let new_id = kept_jobs.len();
            for output in &job.outputs {
                new_index.insert(output.clone(), new_id);
            }
            kept_jobs.push(job);
        }
        Self { jobs: kept_jobs, output_index: new_index }
    }

    /// Instantiates a wildcard-pattern rule on demand against a concretely
    /// requested output (§4.C.3's unify/substitute dance, applied at
    /// scheduling time once a consumer names the exact annotation it
    /// needs, rather than at compile time when it is still unknown).
    pub fn instantiate_wildcard(
        pattern: &Rule,
        requested: &AnnotationRef,
        resolver: &Resolver,
        dirs: &EngineDirs,
        file: Option<&str>,
    ) -> Option<Job> {
        let produced = pattern.outputs.first()?;
        let wildcard_bindings = resolver.unify(produced, requested)?;

        let outputs: Vec<PathBuf> = pattern
            .outputs
            .iter()
            .filter_map(|o| resolver.substitute(o, &wildcard_bindings))
            .map(|resolved| resolver.file_path(&dirs.work, file, &resolved))
            .collect();
        let inputs: Vec<PathBuf> = pattern
            .inputs
            .iter()
            .filter_map(|i| resolver.substitute(i, &wildcard_bindings))
            .map(|resolved| resolver.file_path(&dirs.work, file, &resolved))
            .collect();

        let bindings = pattern.bindings.iter().map(|(name, binding)| (name.clone(), concretize_binding(binding, file))).collect();

        Some(Job {
            id: format!("{}@{}", pattern.id, requested),
            rule_id: pattern.id.clone(),
            processor_id: pattern.processor_id.clone(),
            source_file: file.map(str::to_string),
            bindings,
            inputs,
            outputs,
            priority: pattern.priority,
            max_threads: pattern.max_threads,
            config_sensitivity: pattern.config_sensitivity.clone(),
            backoffs: Vec::new(),
            preloader_target: pattern.preloader_target.clone(),
        })
    }

    pub fn producer_of(&self, output: &Path) -> Option<&Job> {
        self.output_index.get(output).map(|&i| &self.jobs[i])
    }

    /// Instantiates a single compiled rule against a file with no backoff
    /// chain of its own, for trying one backoff rule at a time when a
    /// conflict set's preferred job fails (§4.E.7).
    pub fn instantiate_rule(rule: &Rule, file: Option<&str>) -> Job {
        instantiate(rule, file, Vec::new())
    }

    /// Assembles a graph directly from hand-built jobs, indexing their
    /// outputs the same way `build` does. Exposed for the execution
    /// engine's own tests, which exercise dependency wiring without
    /// going through rule compilation.
    #[doc(hidden)]
    pub fn from_jobs(jobs: Vec<Job>) -> Self {
        let mut output_index = BTreeMap::new();
        for (i, job) in jobs.iter().enumerate() {
            for output in &job.outputs {
                output_index.insert(output.clone(), i);
            }
        }
        Self { jobs, output_index }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}

fn instantiate(rule: &Rule, file: Option<&str>, backoffs: Vec<Rule>) -> Job {
    let bindings: Vec<(String, ParamBinding)> = rule.bindings.iter().map(|(name, binding)| (name.clone(), concretize_binding(binding, file))).collect();

    let input_paths = paths_for(&bindings, &rule.inputs, file);
    let output_paths = paths_for(&bindings, &rule.outputs, file);

    Job {
        id: match file {
            Some(f) => format!("{}@{f}", rule.id),
            None => rule.id.clone(),
        },
        rule_id: rule.id.clone(),
        processor_id: rule.processor_id.clone(),
        source_file: file.map(str::to_string),
        bindings,
        inputs: input_paths,
        outputs: output_paths,
        priority: rule.priority,
        max_threads: rule.max_threads,
        config_sensitivity: rule.config_sensitivity.clone(),
        backoffs,
        preloader_target: rule.preloader_target.clone(),
    }
}

/// Annotation input/output paths are carried as concretized `Path`
/// bindings already (the rule compiler binds one path per annotation
/// param); this recomputes them straight from `rule.inputs`/`rule.outputs`
/// using the same substitution, since `Rule` keeps no name linking an
/// annotation ref back to its binding's parameter name.
fn paths_for(bindings: &[(String, ParamBinding)], refs: &[AnnotationRef], file: Option<&str>) -> Vec<PathBuf> {
    refs.iter()
        .filter_map(|reference| {
            bindings.iter().find_map(|(_, binding)| match binding {
                ParamBinding::Path(path) if path_matches_reference(path, reference, file) => Some(path.clone()),
                _ => None,
            })
        })
        .collect()
}

/// A concretized path matches a reference when its last two components
/// are `<base>/_span` or `<base>/<attr>`, mirroring
/// `corpusflow_resolver::paths::resolve_path`'s shape without recomputing
/// it (the resolver isn't threaded through `instantiate`, only through
/// wildcard instantiation, since ordinary rules already carry resolved
/// paths in their bindings).
fn path_matches_reference(path: &Path, reference: &AnnotationRef, _file: Option<&str>) -> bool {
    let attr_component = reference.attr.as_deref().unwrap_or("_span");
    path.file_name().and_then(|n| n.to_str()) == Some(attr_component)
        && path.parent().and_then(|p| p.file_name()).and_then(|n| n.to_str()) == Some(reference.span.as_str())
}

fn concretize_binding(binding: &ParamBinding, file: Option<&str>) -> ParamBinding {
    match (binding, file) {
        (ParamBinding::Path(path), Some(file)) => ParamBinding::Path(concretize_path(path, file)),
        (ParamBinding::Immediate(serde_json::Value::String(s)), Some(file)) if s == FILE_TOKEN => {
            ParamBinding::Immediate(serde_json::Value::String(file.to_string()))
        }
        (other, _) => other.clone(),
    }
}

/// Rebuilds `path`, replacing any component whose string form is exactly
/// `{file}` with the literal source file name. Other components are left
/// untouched.
fn concretize_path(path: &Path, file: &str) -> PathBuf {
    path.components()
        .map(|c| match c.as_os_str().to_str() {
            Some(s) if s == FILE_TOKEN => std::ffi::OsString::from(file),
            _ => c.as_os_str().to_os_string(),
        })
        .collect()
}

fn register(jobs: &mut Vec<Job>, index: &mut BTreeMap<PathBuf, usize>, job: Job) {
    let id = jobs.len();
    for output in &job.outputs {
        index.insert(output.clone(), id);
    }
    jobs.push(job);
}
