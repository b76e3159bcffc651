// Copyright 2021-2025 Martin Pool

//! Build the `cargo` command line for a scenario and interpret its result.
//!
//! Source-file discovery lives in [crate::source_enumerator]; this module's
//! only job is running the test command once a mutant (or the baseline) is
//! staged in a worker's build directory.

use std::env;
use std::time::Duration;

use serde::Serialize;
use tracing::debug;

use crate::cancellation::Cancellation;
use crate::options::Options;
use crate::output::LogFile;
use crate::process::{Process, ProcessStatus};
use camino::Utf8Path;
use crate::Result;

/// The result of running the test command for one scenario.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
pub enum CargoResult {
    /// The command was killed because it exceeded the deadline.
    Timeout,
    /// The command exited successfully.
    Success,
    /// The command exited with a failure status.
    Failure,
}

impl CargoResult {
    pub fn success(&self) -> bool {
        matches!(self, CargoResult::Success)
    }
}

impl From<ProcessStatus> for CargoResult {
    fn from(status: ProcessStatus) -> CargoResult {
        match status {
            ProcessStatus::Success => CargoResult::Success,
            ProcessStatus::Failure => CargoResult::Failure,
            ProcessStatus::Timeout => CargoResult::Timeout,
        }
    }
}

/// Return the name of the cargo binary.
///
/// When run as a Cargo subcommand, `$CARGO` tells us the right way to call
/// back into it, so that we get the matching toolchain.
pub fn cargo_bin() -> String {
    env::var("CARGO").unwrap_or_else(|_| "cargo".to_owned())
}

/// Build the argv for the scenario's build/test command, including argv[0].
///
/// When `options.check_only` is set, this builds `cargo check --tests`
/// instead of `cargo test`, so a mutant is only required to compile, not to
/// be exercised by the test suite; `additional_cargo_test_args` (meaningful
/// only to `cargo test`) is omitted in that case.
pub fn cargo_argv(package_name: Option<&str>, options: &Options) -> Vec<String> {
    let mut argv = vec![cargo_bin()];
    if options.check_only {
        argv.push("check".to_string());
        argv.push("--tests".to_string());
    } else {
        argv.push("test".to_string());
    }
    if let Some(package_name) = package_name {
        argv.push("--package".to_owned());
        argv.push(package_name.to_owned());
    } else {
        argv.push("--workspace".to_string());
    }
    argv.extend(options.additional_cargo_args.iter().cloned());
    if !options.check_only {
        argv.extend(options.additional_cargo_test_args.iter().cloned());
    }
    argv
}

/// Run `cargo test` (or whatever `argv` says) in `in_dir`, polling until it
/// finishes, times out, or is cancelled.
pub fn run_cargo(
    argv: &[String],
    in_dir: &Utf8Path,
    log_file: &mut LogFile,
    timeout: Duration,
    cancellation: &Cancellation,
) -> Result<CargoResult> {
    // `--cap-lints=allow` keeps a mutated tree from failing to build merely
    // because it now trips a lint that was previously silenced.
    let env = [("RUSTFLAGS", "--cap-lints=allow")];
    debug!(?argv, %in_dir, "run cargo");
    let mut process = Process::start(argv, &env, in_dir, timeout, log_file, cancellation)?;
    let status = loop {
        if let Some(status) = process.poll()? {
            break status;
        }
        std::thread::sleep(Duration::from_millis(50));
    };
    Ok(status.into())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn generate_cargo_args_for_workspace() {
        let options = Options::default();
        assert_eq!(
            cargo_argv(None, &options)[1..],
            ["test", "--workspace"]
        );
    }

    #[test]
    fn check_only_runs_cargo_check_not_test() {
        let mut options = Options::default();
        options.check_only = true;
        options
            .additional_cargo_test_args
            .push("--no-fail-fast".to_owned());
        let argv = cargo_argv(Some("demo"), &options);
        assert_eq!(
            argv[1..],
            ["check", "--tests", "--package", "demo"]
        );
    }

    #[test]
    fn generate_cargo_args_with_package_and_extra_args() {
        let mut options = Options::default();
        options
            .additional_cargo_test_args
            .extend(["--lib", "--no-fail-fast"].iter().map(|s| s.to_string()));
        options
            .additional_cargo_args
            .push("--release".to_owned());
        assert_eq!(
            cargo_argv(Some("demo"), &options)[1..],
            [
                "test",
                "--package",
                "demo",
                "--release",
                "--lib",
                "--no-fail-fast",
            ]
        );
    }
}
