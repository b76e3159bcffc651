// Copyright 2021-2025 Martin Pool

//! `mutation-engine`: inject bugs into a Rust tree and see whether the test
//! suite notices.
//!
//! This binary is a thin CLI shell around the [mutation_engine] library: it
//! parses arguments, builds an [mutation_engine::options::Options], drives the
//! [mutation_engine::engine::Engine], and reports the result. Mutation
//! generation, execution, and scoring all live in the library.

use std::process::exit;

use anyhow::Result;
use camino::Utf8PathBuf;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mutation_engine::cancellation::Cancellation;
use mutation_engine::config::Config;
use mutation_engine::engine::Engine;
use mutation_engine::exit_code;
use mutation_engine::options::Options;

/// Find inadequately-tested code by inserting bugs and checking the test suite catches them.
#[derive(Parser, Debug)]
#[command(name = "mutation-engine")]
struct Args {
    /// Path to the crate or workspace to mutate.
    #[arg(long, short = 'd', default_value = ".")]
    dir: Utf8PathBuf,

    /// Only check that each mutant builds; don't run the test suite.
    #[arg(long)]
    check: bool,

    /// Number of mutants to test in parallel.
    #[arg(long)]
    jobs: Option<usize>,

    /// Fixed test timeout in seconds, overriding calibration from the baseline run.
    #[arg(long)]
    timeout: Option<f64>,

    /// Extra arguments passed to every `cargo` invocation.
    #[arg(long = "cargo-arg")]
    cargo_args: Vec<String>,

    /// Minimum overall mutation score (0..100) required to pass, overriding config.
    #[arg(long)]
    min_score: Option<f64>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_env("MUTATION_ENGINE_LOG"))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let cancellation = Cancellation::new();
    cancellation.install_handler();

    let config = Config::read_tree_config(&args.dir)?;
    let mut options = Options::from_config(&config);
    options.check_only = args.check;
    if let Some(jobs) = args.jobs {
        options.workers = jobs;
    }
    if let Some(timeout) = args.timeout {
        options.test_timeout = Some(std::time::Duration::from_secs_f64(timeout));
    }
    options.additional_cargo_args = args.cargo_args;
    if args.min_score.is_some() {
        options.min_score = args.min_score;
    }
    let min_score = options.min_score;

    let engine = Engine::new(args.dir, options, cancellation)?;
    let summary = engine.run()?;

    println!(
        "{} mutants tested, {} killed, {:.1}% score",
        summary.overall.total_mutants, summary.overall.killed, summary.overall.score
    );

    if let Some(min_score) = min_score {
        if summary.overall.score < min_score {
            eprintln!(
                "mutation score {:.1}% is below the configured minimum of {min_score:.1}%",
                summary.overall.score
            );
            exit(exit_code::QUALITY_GATE_FAILED);
        }
    }

    if summary.overall.total_mutants > summary.overall.killed {
        exit(exit_code::FOUND_PROBLEMS);
    }
    Ok(())
}
