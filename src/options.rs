// Copyright 2021-2025 Martin Pool

//! Runtime options for a mutation-testing run.
//!
//! [Options] is the merge of the on-disk [crate::config::Config] and whatever
//! an external CLI parser produced; it's the form every other module reads.
//! Building it from a `Config` alone (via [Options::from_config]) is enough
//! to run with all-default CLI behavior, which is what the test suite does.

use std::time::Duration;

use camino::Utf8PathBuf;

use crate::config::Config;
use crate::glob::PathFilter;
use crate::output::DEFAULT_OUTPUT_TRUNCATION_BYTES;
use crate::Result;

/// Default number of parallel workers when neither the config nor the
/// environment says otherwise.
const DEFAULT_WORKERS: usize = 4;

/// Multiplier applied to the baseline scenario's duration to get the deadline
/// for every mutant scenario.
const DEFAULT_TIMEOUT_MULTIPLIER: f64 = 5.0;

/// Floor under the calibrated deadline, so that a near-instant baseline
/// doesn't produce an unworkably short timeout.
const DEFAULT_MINIMUM_TIMEOUT: Duration = Duration::from_secs(30);

/// Options for a single run of the engine.
#[derive(Debug)]
pub struct Options {
    /// Don't run the tests, just see if each mutant builds.
    pub check_only: bool,

    /// Number of mutants to test concurrently.
    pub workers: usize,

    /// A fixed test timeout, overriding calibration from the baseline run.
    pub test_timeout: Option<Duration>,
    /// Multiplier applied to the baseline duration when `test_timeout` is unset.
    pub timeout_multiplier: f64,
    /// Floor under the calibrated timeout.
    pub minimum_timeout: Duration,

    /// Cap on how much of a scenario's log is retained for reporting.
    pub output_truncation_bytes: usize,

    /// Path to the history file, relative to the tree root.
    pub history_path: Utf8PathBuf,

    /// Only consider files matching these globs.
    pub examine_globs: Vec<String>,
    /// Never consider files matching these globs.
    pub exclude_globs: Vec<String>,

    /// Expressions usable as error values for `fn_value` mutants that return
    /// `Result`.
    pub error_values: Vec<String>,

    /// Extra arguments appended to every `cargo` invocation.
    pub additional_cargo_args: Vec<String>,
    /// Extra arguments appended only to `cargo test` invocations.
    pub additional_cargo_test_args: Vec<String>,

    /// Minimum overall mutation score required to pass; `None` disables the gate.
    pub min_score: Option<f64>,
}

impl Default for Options {
    fn default() -> Options {
        Options {
            check_only: false,
            workers: DEFAULT_WORKERS,
            test_timeout: None,
            timeout_multiplier: DEFAULT_TIMEOUT_MULTIPLIER,
            minimum_timeout: DEFAULT_MINIMUM_TIMEOUT,
            output_truncation_bytes: DEFAULT_OUTPUT_TRUNCATION_BYTES,
            history_path: Utf8PathBuf::from(".mutation-engine-history.json"),
            examine_globs: Vec::new(),
            exclude_globs: Vec::new(),
            error_values: Vec::new(),
            additional_cargo_args: Vec::new(),
            additional_cargo_test_args: Vec::new(),
            min_score: None,
        }
    }
}

impl Options {
    /// Build options from a parsed config file, leaving anything the config
    /// doesn't mention at its default.
    pub fn from_config(config: &Config) -> Options {
        let defaults = Options::default();
        Options {
            check_only: false,
            workers: config.workers.unwrap_or(defaults.workers),
            test_timeout: config.timeout.map(Duration::from_secs_f64),
            timeout_multiplier: config
                .timeout_multiplier
                .unwrap_or(defaults.timeout_multiplier),
            minimum_timeout: config
                .minimum_timeout
                .map(Duration::from_secs_f64)
                .unwrap_or(defaults.minimum_timeout),
            output_truncation_bytes: config
                .output_truncation_bytes
                .unwrap_or(defaults.output_truncation_bytes),
            history_path: config
                .history_path
                .clone()
                .map(Utf8PathBuf::from)
                .unwrap_or(defaults.history_path),
            examine_globs: config.examine_globs.clone(),
            exclude_globs: config.exclude_globs.clone(),
            error_values: config.error_values.clone(),
            additional_cargo_args: Vec::new(),
            additional_cargo_test_args: Vec::new(),
            min_score: config.min_score,
        }
    }

    /// Build the examine/exclude glob filter described by these options.
    pub fn path_filter(&self) -> Result<PathFilter> {
        PathFilter::new(&self.examine_globs, &self.exclude_globs)
    }
}
