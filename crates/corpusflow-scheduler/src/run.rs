//! Parallel job execution (§4.E.4-7, §5 "Concurrency & Resource Model").
//!
//! A worker pool of plain OS threads drains a priority-ordered ready
//! queue built from the job graph's producer/consumer edges. Each worker
//! checks freshness before doing any real work, runs the job's processor
//! otherwise, publishes its outputs atomically, and releases whatever
//! that job was blocking. A failed job tries its backoff rules in order
//! before giving up; everything downstream of a final failure is left
//! undispatched and reported as tainted once the run settles.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::PathBuf;
use std::sync::{Condvar, Mutex};

use corpusflow_config::Config;
use corpusflow_preloader::{DispatchOutcome, PreloaderError};
use corpusflow_registry::{JobContext, ParamValue, Processor, Registry};
use corpusflow_types::ParamBinding;

use crate::atomic::{discard_temp_paths, publish, temp_path_for};
use crate::content_key::compute_content_key;
use crate::error::RunSummary;
use crate::freshness::ContentKeyStore;
use crate::graph::{Job, JobGraph};
use crate::reporter::Reporter;

/// Run-time knobs independent of the job graph itself.
pub struct RunOptions {
    /// Worker thread count (`-j`). A value of 0 is treated as 1.
    pub workers: usize,
    /// Preloader socket a job whose processor declares a preload target
    /// is dispatched to before falling back to local execution (§4.F).
    /// `None` means every job runs locally regardless of its declared
    /// preloader target.
    pub socket: Option<PathBuf>,
    /// §6 `--force-preloader`: block and retry while the preloader
    /// reports its worker pool busy instead of immediately falling back
    /// to a local run.
    pub force_preloader: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self { workers: 1, socket: None, force_preloader: false }
    }
}

/// One entry on the ready queue: the job's index into `graph.jobs`,
/// kept alongside its priority so workers can prefer higher-priority
/// jobs without re-reading the graph under the lock.
#[derive(Clone, Copy)]
struct Ready {
    idx: usize,
    priority: i64,
}

struct State {
    ready: VecDeque<Ready>,
    indegree: Vec<usize>,
    rule_running: BTreeMap<String, usize>,
    active_workers: usize,
}

impl State {
    /// Picks the highest-priority ready job whose rule isn't already at
    /// its `max_threads` cap, ties broken by job id for determinism.
    /// Capped-out jobs are left on the queue for another worker to try.
    fn pop_ready(&mut self, jobs: &[Job]) -> Option<usize> {
        let mut best: Option<(usize, i64, &str)> = None; // (queue position, priority, id)
        for (pos, entry) in self.ready.iter().enumerate() {
            let job = &jobs[entry.idx];
            if let Some(cap) = job.max_threads {
                let running = self.rule_running.get(&job.rule_id).copied().unwrap_or(0);
                if running >= cap {
                    continue;
                }
            }
            let better = match best {
                None => true,
                Some((_, p, id)) => entry.priority > p || (entry.priority == p && job.id.as_str() < id),
            };
            if better {
                best = Some((pos, entry.priority, job.id.as_str()));
            }
        }
        let (pos, ..) = best?;
        let entry = self.ready.remove(pos).expect("position came from iterating ready");
        *self.rule_running.entry(jobs[entry.idx].rule_id.clone()).or_insert(0) += 1;
        Some(entry.idx)
    }
}

/// Executes every job in `graph`, skipping ones [`ContentKeyStore`] says
/// are already fresh, and returns a summary of what ran, was skipped, or
/// failed. `key_store` is updated in place as jobs complete so a caller
/// can persist it once the run settles.
pub fn execute(
    graph: &JobGraph,
    registry: &Registry,
    config: &Config,
    registry_fingerprint: &str,
    key_store: &mut ContentKeyStore,
    options: &RunOptions,
    reporter: &dyn Reporter,
) -> RunSummary {
    let jobs = &graph.jobs;
    let n = jobs.len();
    if n == 0 {
        return RunSummary::default();
    }

    let mut path_to_idx: BTreeMap<PathBuf, usize> = BTreeMap::new();
    for (i, job) in jobs.iter().enumerate() {
        for output in &job.outputs {
            path_to_idx.insert(output.clone(), i);
        }
    }

    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    let mut indegree = vec![0usize; n];
    for (i, job) in jobs.iter().enumerate() {
        let mut seen = BTreeSet::new();
        for input in &job.inputs {
            if let Some(&producer) = path_to_idx.get(input) {
                if producer != i && seen.insert(producer) {
                    dependents[producer].push(i);
                    indegree[i] += 1;
                }
            }
        }
    }

    let initial_ready: VecDeque<Ready> =
        (0..n).filter(|&i| indegree[i] == 0).map(|i| Ready { idx: i, priority: jobs[i].priority }).collect();

    let state = Mutex::new(State { ready: initial_ready, indegree, rule_running: BTreeMap::new(), active_workers: 0 });
    let cvar = Condvar::new();
    let key_store = Mutex::new(key_store);
    let outcomes: Vec<Mutex<Outcome>> = (0..n).map(|_| Mutex::new(Outcome::Pending)).collect();

    let workers = options.workers.max(1);
    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| worker_loop(jobs, &dependents, &state, &cvar, registry, config, registry_fingerprint, options, &key_store, &outcomes, reporter));
        }
    });

    let mut summary = RunSummary::default();
    for (i, job) in jobs.iter().enumerate() {
        match std::mem::replace(&mut *outcomes[i].lock().unwrap(), Outcome::Pending) {
            Outcome::Ran => summary.ran.push(job.id.clone()),
            Outcome::Fresh => summary.fresh.push(job.id.clone()),
            Outcome::Failed(reason) => summary.failed.push((job.id.clone(), reason)),
            Outcome::Pending => summary.tainted.push(job.id.clone()),
        }
    }
    summary
}

#[derive(Clone)]
enum Outcome {
    Pending,
    Ran,
    Fresh,
    Failed(String),
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    jobs: &[Job],
    dependents: &[Vec<usize>],
    state: &Mutex<State>,
    cvar: &Condvar,
    registry: &Registry,
    config: &Config,
    registry_fingerprint: &str,
    options: &RunOptions,
    key_store: &Mutex<&mut ContentKeyStore>,
    outcomes: &[Mutex<Outcome>],
    reporter: &dyn Reporter,
) {
    loop {
        let idx = {
            let mut guard = state.lock().unwrap();
            loop {
                if let Some(idx) = guard.pop_ready(jobs) {
                    guard.active_workers += 1;
                    break Some(idx);
                }
                if guard.active_workers == 0 && guard.ready.is_empty() {
                    break None;
                }
                guard = cvar.wait(guard).unwrap();
            }
        };
        let Some(idx) = idx else { return };

        let job = &jobs[idx];
        let outcome = run_one_job(job, registry, config, registry_fingerprint, options, key_store, reporter);
        *outcomes[idx].lock().unwrap() = outcome.clone();

        let mut guard = state.lock().unwrap();
        *guard.rule_running.entry(job.rule_id.clone()).or_insert(1) -= 1;
        guard.active_workers -= 1;

        if !matches!(outcome, Outcome::Failed(_)) {
            for &dependent in &dependents[idx] {
                guard.indegree[dependent] -= 1;
                if guard.indegree[dependent] == 0 {
                    guard.ready.push_back(Ready { idx: dependent, priority: jobs[dependent].priority });
                }
            }
        }
        cvar.notify_all();
    }
}

fn run_one_job(job: &Job, registry: &Registry, config: &Config, registry_fingerprint: &str, options: &RunOptions, key_store: &Mutex<&mut ContentKeyStore>, reporter: &dyn Reporter) -> Outcome {
    let key = compute_content_key(&job.id, &job.bindings, &job.config_sensitivity, config, registry_fingerprint);
    let already_fresh = { key_store.lock().unwrap().is_fresh(&job.id, &key, &job.outputs) };
    if already_fresh {
        reporter.info(&format!("{} is up to date", job.id));
        return Outcome::Fresh;
    }

    match try_rule(job.processor_id.as_str(), job, registry, registry_fingerprint, options, reporter) {
        Ok(()) => {
            key_store.lock().unwrap().record(&job.id, key);
            reporter.info(&format!("{} done", job.id));
            Outcome::Ran
        }
        Err(primary_err) => run_backoffs(job, registry, config, registry_fingerprint, options, key_store, reporter, primary_err),
    }
}

/// Tries every backoff rule for `job` in order after its preferred job
/// failed (§4.D "producer conflicts", §4.E.7). The first backoff whose
/// processor succeeds publishes in the preferred job's place; if none
/// do, the job is reported failed with the preferred rule's error.
#[allow(clippy::too_many_arguments)]
fn run_backoffs(
    job: &Job,
    registry: &Registry,
    config: &Config,
    registry_fingerprint: &str,
    options: &RunOptions,
    key_store: &Mutex<&mut ContentKeyStore>,
    reporter: &dyn Reporter,
    primary_err: anyhow::Error,
) -> Outcome {
    for backoff in &job.backoffs {
        let backoff_job = JobGraph::instantiate_rule(backoff, job.source_file.as_deref());
        reporter.warn(&format!("{} failed ({primary_err:#}), trying backoff {}", job.id, backoff_job.rule_id));
        match try_rule(backoff_job.processor_id.as_str(), &backoff_job, registry, registry_fingerprint, options, reporter) {
            Ok(()) => {
                let key = compute_content_key(&job.id, &backoff_job.bindings, &job.config_sensitivity, config, registry_fingerprint);
                key_store.lock().unwrap().record(&job.id, key);
                reporter.info(&format!("{} done via backoff {}", job.id, backoff_job.rule_id));
                return Outcome::Ran;
            }
            Err(e) => reporter.warn(&format!("backoff {} also failed: {e:#}", backoff_job.rule_id)),
        }
    }
    reporter.error(&format!("{} failed: {primary_err:#}", job.id));
    Outcome::Failed(primary_err.to_string())
}

/// Runs one job's processor, writing to temp paths and publishing them
/// atomically on success; discards any leftover temp output on failure
/// so a later run never mistakes a partial write for a finished one.
///
/// If the job's rule declares a preloader target and a socket is
/// configured, the job is dispatched there first (§4.F). A busy pool or
/// a stale config fingerprint falls back to running the processor
/// locally, unless `force_preloader` is set, in which case a busy pool
/// is retried with backoff instead (§6 `--force-preloader`, §8
/// "Preloader fallback").
fn try_rule(processor_id: &str, job: &Job, registry: &Registry, registry_fingerprint: &str, options: &RunOptions, reporter: &dyn Reporter) -> anyhow::Result<()> {
    if let (Some(target), Some(socket)) = (&job.preloader_target, &options.socket) {
        let ctx = job_context(job);
        let dispatch =
            if options.force_preloader { corpusflow_preloader::dispatch_blocking(socket, target, registry_fingerprint, &ctx) } else { corpusflow_preloader::dispatch_once(socket, target, registry_fingerprint, &ctx) };

        match dispatch {
            Ok(DispatchOutcome::Ran) => {
                publish(&job.outputs)?;
                return Ok(());
            }
            Ok(DispatchOutcome::Failed(reason)) => {
                discard_temp_paths(&job.outputs);
                anyhow::bail!("preloaded run of {processor_id} via {target} failed: {reason}");
            }
            Err(PreloaderError::Busy(_)) | Err(PreloaderError::ConfigMismatch { .. }) => {
                reporter.warn(&format!("preloader target {target} unavailable for {}, falling back to local execution", job.id));
            }
            Err(e) => {
                reporter.warn(&format!("preloader dispatch for {target} errored ({e}), falling back to local execution"));
            }
        }
    }

    let processor = registry.get(processor_id).ok_or_else(|| anyhow::anyhow!("no processor registered for {processor_id:?}"))?;

    let ctx = job_context(job);
    let ran = processor.run(&ctx);
    match ran {
        Ok(()) => {
            publish(&job.outputs)?;
            Ok(())
        }
        Err(e) => {
            discard_temp_paths(&job.outputs);
            Err(e)
        }
    }
}

/// Builds the context handed to a processor, redirecting any binding
/// that names one of this job's declared outputs to its temp path so
/// the scheduler keeps sole ownership of the final rename.
fn job_context(job: &Job) -> JobContext {
    let outputs: BTreeSet<&PathBuf> = job.outputs.iter().collect();
    let params = job
        .bindings
        .iter()
        .map(|(name, binding)| {
            let value = match binding {
                ParamBinding::Path(path) if outputs.contains(path) => ParamValue::Path(temp_path_for(path)),
                ParamBinding::Path(path) => ParamValue::Path(path.clone()),
                ParamBinding::Immediate(value) => ParamValue::Value(value.clone()),
            };
            (name.clone(), value)
        })
        .collect();

    JobContext { source_file: job.source_file.clone(), corpus_id: job.source_file.clone().unwrap_or_default(), params }
}
