// Copyright 2025 Martin Pool

//! The top-level orchestrator: enumerate mutants, run a worker pool against
//! them in isolated overlays, and assemble the aggregated results.

use std::sync::mpsc;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, info, warn};

use crate::aggregator::{self, OverallScore};
use crate::build_dir::BuildDir;
use crate::cancellation::Cancellation;
use crate::cargo::{cargo_argv, run_cargo, CargoResult};
use crate::history::{HistoryStore, MutantRecord, MutationResultRecord};
use crate::ignore_file::IgnoreFile;
use crate::incremental::{analyze_file, related_test_files};
use crate::mutant::Mutant;
use crate::options::Options;
use crate::output::{self, OutputDir};
use crate::overlay::OverlayContext;
use crate::scenario::Scenario;
use crate::source_enumerator::SourceEnumerator;
use crate::timeouts::Timeout;
use crate::visit::walk_file;
use crate::Result;

/// The bottom-line classification of one scenario's run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutantStatus {
    /// Every test passed: the mutation slipped through.
    Survived,
    /// Some test failed: the mutation was caught.
    Killed,
    /// The mutated tree didn't even build.
    BuildFailed,
    /// The deadline was exceeded.
    TimedOut,
    /// No test exercised the mutated code. Reserved for a future
    /// coverage-aware mode; nothing constructs this variant yet.
    NotCovered,
    /// Something went wrong in scaffolding, not the mutated code itself.
    InternalError,
}

/// The recorded result of running one scenario.
#[derive(Debug, Clone, Serialize)]
pub struct ScenarioOutcome {
    pub scenario: Scenario,
    pub status: MutantStatus,
    pub duration: Duration,
    pub log_path: Utf8PathBuf,
}

/// Text fragments that mark a cargo failure as a build-stage (rather than
/// test-stage) failure, since a single `cargo test` invocation doesn't
/// otherwise distinguish the two.
const BUILD_FAILURE_MARKERS: &[&str] = &["error[E", "error: could not compile", "error: linking"];

fn classify_cargo_failure(log_content: &str) -> MutantStatus {
    if BUILD_FAILURE_MARKERS
        .iter()
        .any(|marker| log_content.contains(marker))
    {
        MutantStatus::BuildFailed
    } else {
        MutantStatus::Killed
    }
}

/// Summary returned once a run completes.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub outcomes: Vec<ScenarioOutcome>,
    pub overall: OverallScore,
}

/// Shared, read-only context every worker needs; cheap to clone since it's
/// all `Arc`s or `Copy` values.
#[derive(Clone)]
struct WorkerContext {
    tree_path: Arc<Utf8PathBuf>,
    options: Arc<Options>,
    output_dir: Arc<OutputDir>,
    cancellation: Cancellation,
    timeout: Timeout,
    scratch_root: Arc<Utf8PathBuf>,
}

/// Run one mutant scenario to completion, staged in its own overlay within
/// the worker's private build directory. The real project tree named by
/// `ctx.tree_path` is never written to.
fn run_mutant(ctx: &WorkerContext, build_dir: &BuildDir, mutant: Mutant) -> Result<ScenarioOutcome> {
    let scenario = Scenario::Mutant(mutant);
    let mutant = scenario.mutant();
    let mut log_file = ctx.output_dir.create_log(&scenario.log_file_name_base())?;

    let overlay = OverlayContext::prepare(build_dir.path(), &ctx.scratch_root, mutant)?;
    overlay.install()?;
    let start = Instant::now();
    let argv = cargo_argv(scenario.package_name(), &ctx.options);
    let outcome_result = run_cargo(
        &argv,
        build_dir.path(),
        &mut log_file,
        ctx.timeout.duration(),
        &ctx.cancellation,
    );
    let duration = start.elapsed();
    overlay.revert()?;

    let status = match outcome_result {
        Ok(CargoResult::Success) => MutantStatus::Survived,
        Ok(CargoResult::Timeout) => MutantStatus::TimedOut,
        Ok(CargoResult::Failure) => {
            classify_cargo_failure(&log_file.log_content().unwrap_or_default())
        }
        Err(err) => {
            warn!(?err, "scenario scaffolding failed");
            MutantStatus::InternalError
        }
    };
    Ok(ScenarioOutcome {
        scenario,
        status,
        duration,
        log_path: log_file.path().to_owned(),
    })
}

/// Orchestrates one end-to-end mutation-testing run over a tree.
pub struct Engine {
    tree_path: Utf8PathBuf,
    options: Options,
    output_dir: OutputDir,
    cancellation: Cancellation,
}

impl Engine {
    pub fn new(
        tree_path: Utf8PathBuf,
        options: Options,
        cancellation: Cancellation,
    ) -> Result<Engine> {
        let output_dir = OutputDir::new(&tree_path)?;
        Ok(Engine {
            tree_path,
            options,
            output_dir,
            cancellation,
        })
    }

    /// Discover mutants across the whole tree, restricted to files that the
    /// Incremental Analyzer says need testing again.
    fn discover_mutants(&self, history: &HistoryStore) -> Result<Vec<Mutant>> {
        let path_filter = self.options.path_filter()?;
        let ignore_file = IgnoreFile::load(&self.tree_path)?;
        let enumerator = SourceEnumerator::new(&self.tree_path);
        let source_files = enumerator.source_files(&path_filter, &ignore_file)?;

        let mut mutants = Vec::new();
        for source_file in source_files {
            let analysis =
                analyze_file(&self.tree_path, &source_file.tree_relative_path, history);
            if !analysis.needs_update {
                debug!(file = %analysis.tree_relative_path, reason = analysis.reason, "skip unchanged file");
                continue;
            }
            let _span =
                debug_span!("walk_file", file = %source_file.tree_relative_path).entered();
            match walk_file(&source_file, &[]) {
                Ok(file_mutants) => mutants.extend(file_mutants),
                Err(err) => {
                    warn!(file = %source_file.tree_relative_path, ?err, "failed to parse file for mutation")
                }
            }
        }
        mutants.sort_by(|a, b| {
            (a.span.start.line, a.span.start.column, a.genre_tag(), &a.replacement).cmp(&(
                b.span.start.line,
                b.span.start.column,
                b.genre_tag(),
                &b.replacement,
            ))
        });
        Ok(mutants)
    }

    /// Run the baseline (unmutated) scenario, to confirm the tree builds and
    /// tests cleanly, and to calibrate the deadline for every mutant. Runs in
    /// its own throwaway copy of the tree, same as every mutant scenario.
    fn run_baseline(&self) -> Result<(ScenarioOutcome, Duration)> {
        let build_dir = BuildDir::copy_from(&self.tree_path)?;
        let mut log_file = self.output_dir.create_log("baseline")?;
        let argv = cargo_argv(None, &self.options);
        let start = Instant::now();
        let result = run_cargo(
            &argv,
            build_dir.path(),
            &mut log_file,
            self.options.minimum_timeout,
            &self.cancellation,
        )?;
        let duration = start.elapsed();
        let status = match result {
            CargoResult::Success => MutantStatus::Survived,
            CargoResult::Timeout => MutantStatus::TimedOut,
            CargoResult::Failure => MutantStatus::InternalError,
        };
        Ok((
            ScenarioOutcome {
                scenario: Scenario::Baseline,
                status,
                duration,
                log_path: log_file.path().to_owned(),
            },
            duration,
        ))
    }

    /// Run the whole pipeline: baseline, then every mutant across a worker
    /// pool, then aggregate and persist history.
    pub fn run(self) -> Result<RunSummary> {
        let history = HistoryStore::load(&self.tree_path.join(&self.options.history_path))?;

        let (baseline_outcome, baseline_duration) = self.run_baseline()?;
        if baseline_outcome.status != MutantStatus::Survived {
            info!("baseline run did not pass; stopping before testing mutants");
            let overall = aggregator::overall_score(&[], baseline_duration);
            return Ok(RunSummary {
                outcomes: vec![baseline_outcome],
                overall,
            });
        }

        let mutants = self.discover_mutants(&history)?;
        info!(count = mutants.len(), "mutants discovered");
        let timeout = Timeout::for_scenario(&self.options, Some(baseline_duration));

        let scratch_root = self.output_dir.path().join("scratch");
        std::fs::create_dir_all(&scratch_root)?;

        let worker_count = self.options.workers.max(1);
        let ctx = WorkerContext {
            tree_path: Arc::new(self.tree_path.clone()),
            options: Arc::new(self.options),
            output_dir: Arc::new(self.output_dir),
            cancellation: self.cancellation.clone(),
            timeout,
            scratch_root: Arc::new(scratch_root),
        };

        let (job_tx, job_rx) = mpsc::sync_channel::<Mutant>(worker_count);
        let job_rx = Arc::new(Mutex::new(job_rx));
        let (result_tx, result_rx) = mpsc::channel::<ScenarioOutcome>();

        let mut workers = Vec::with_capacity(worker_count);
        for worker_id in 0..worker_count {
            let job_rx = Arc::clone(&job_rx);
            let result_tx = result_tx.clone();
            let ctx = ctx.clone();
            workers.push(thread::spawn(move || {
                let _span = debug_span!("worker", worker_id).entered();
                let build_dir = match BuildDir::copy_from(&ctx.tree_path) {
                    Ok(build_dir) => build_dir,
                    Err(err) => {
                        warn!(?err, worker_id, "failed to create worker build directory; worker exiting");
                        return;
                    }
                };
                loop {
                    if ctx.cancellation.is_cancelled() {
                        break;
                    }
                    let mutant = {
                        let rx = job_rx.lock().expect("job queue lock");
                        rx.recv()
                    };
                    let Ok(mutant) = mutant else {
                        break;
                    };
                    match run_mutant(&ctx, &build_dir, mutant) {
                        Ok(outcome) => {
                            if result_tx.send(outcome).is_err() {
                                break;
                            }
                        }
                        Err(err) => warn!(?err, "mutant scenario failed to run"),
                    }
                }
            }));
        }
        drop(result_tx);

        let dispatcher_cancellation = ctx.cancellation.clone();
        let dispatch = thread::spawn(move || {
            for mutant in mutants {
                if dispatcher_cancellation.is_cancelled() {
                    break;
                }
                if job_tx.send(mutant).is_err() {
                    break;
                }
            }
        });

        let mut outcomes = vec![baseline_outcome];
        for outcome in result_rx {
            outcomes.push(outcome);
        }

        let _ = dispatch.join();
        for worker in workers {
            let _ = worker.join();
        }

        update_history(&ctx, &history, &outcomes)?;
        history.save(&ctx.tree_path.join(&ctx.options.history_path))?;

        let total_duration = outcomes.iter().map(|o| o.duration).sum();
        let overall = aggregator::overall_score(&outcomes, total_duration);
        Ok(RunSummary { outcomes, overall })
    }
}

/// Record each mutated file's mutant/result sets into the history store,
/// once per file, after every worker has finished.
fn update_history(ctx: &WorkerContext, history: &HistoryStore, outcomes: &[ScenarioOutcome]) -> Result<()> {
    let mut seen = std::collections::BTreeSet::new();
    for outcome in outcomes {
        let Some(mutant) = outcome.scenario.as_mutant() else {
            continue;
        };
        let file = mutant.source_file.tree_relative_path.clone();
        if !seen.insert(file.clone()) {
            continue;
        }
        let file_outcomes: Vec<&ScenarioOutcome> = outcomes
            .iter()
            .filter(|o| {
                o.scenario
                    .as_mutant()
                    .is_some_and(|m| m.source_file.tree_relative_path == file)
            })
            .collect();
        let mutants: Vec<MutantRecord> = file_outcomes
            .iter()
            .map(|o| MutantRecord::from_mutant(o.scenario.as_mutant().expect("checked above")))
            .collect();
        let results: Vec<MutationResultRecord> = file_outcomes
            .iter()
            .map(|o| {
                let mutant = o.scenario.as_mutant().expect("checked above");
                let output =
                    output::read_truncated(&o.log_path, ctx.options.output_truncation_bytes)
                        .unwrap_or_default();
                MutationResultRecord {
                    mutant_id: mutant.id(),
                    status: o.status,
                    duration_secs: o.duration.as_secs_f64(),
                    output,
                }
            })
            .collect();
        let companions = related_test_files(&ctx.tree_path, &file);
        let test_hash = crate::hash::combine_hashes(
            &companions
                .iter()
                .filter_map(|p| crate::hash::hash_file(p.as_std_path()).ok())
                .collect::<Vec<_>>(),
        );
        let file_hash = file_outcomes[0]
            .scenario
            .as_mutant()
            .expect("checked above")
            .source_file
            .hash();
        history.update(file, mutants, results, file_hash, test_hash);
    }
    Ok(())
}
