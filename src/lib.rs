// Copyright 2021-2025 Martin Pool

//! `mutation-engine`: inject bugs into a Rust tree and see whether the test suite notices.
//!
//! This crate is the engine: given a source tree and a test command, it discovers
//! mutable sites, generates mutants, runs the test command against each mutant in an
//! isolated overlay, and aggregates the results into a mutation score. Command-line
//! parsing, report rendering, and CI integration are thin layers built on top of this
//! library and are not part of its public contract.

pub use anyhow::Result;

pub mod aggregator;
pub mod ast;
pub mod build_dir;
pub mod cancellation;
pub mod change_detector;
pub mod config;
pub mod engine;
pub mod exit_code;
pub mod fnvalue;
pub mod glob;
pub mod hash;
pub mod history;
pub mod ignore_file;
pub mod incremental;
pub mod mutant;
pub mod options;
pub mod output;
pub mod overlay;
pub mod path;
pub mod pretty;
pub mod process;
pub mod scenario;
pub mod source_enumerator;
pub mod source_file;
pub mod span;
pub mod tail_file;
pub mod timeouts;
pub mod visit;

/// The crate version, used in the history file and the output-directory lock file.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// A comment marker inserted next to generated mutations, so they're easy to spot
/// by eye in a diff or a mutated source dump.
pub const MUTATION_MARKER_COMMENT: &str = "/* ~ changed by mutation-engine ~ */";
