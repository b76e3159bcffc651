// Copyright 2025 Martin Pool

//! Combine per-scenario outcomes into per-file and overall mutation scores.

use std::collections::BTreeMap;
use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Serialize;

use crate::engine::{MutantStatus, ScenarioOutcome};

/// The score for a single file.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileScore {
    pub file_path: Utf8PathBuf,
    pub total: usize,
    pub killed: usize,
    pub score: f64,
}

/// The score across every file considered in a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverallScore {
    pub total_files: usize,
    pub total_mutants: usize,
    pub killed: usize,
    pub score: f64,
    pub duration: Duration,
}

pub(crate) fn is_killed(status: MutantStatus) -> bool {
    matches!(
        status,
        MutantStatus::Killed | MutantStatus::BuildFailed | MutantStatus::TimedOut
    )
}

fn percentage(killed: usize, total: usize) -> f64 {
    if total == 0 {
        100.0
    } else {
        100.0 * killed as f64 / total as f64
    }
}

/// Compute per-file scores, in deterministic file-path order.
///
/// Outcomes for the baseline scenario and any `InternalError` mutants are
/// excluded from scoring, per the Execution Engine's result mapping.
pub fn per_file_scores(outcomes: &[ScenarioOutcome]) -> Vec<FileScore> {
    let mut by_file: BTreeMap<Utf8PathBuf, (usize, usize)> = BTreeMap::new();
    for outcome in outcomes {
        if outcome.status == MutantStatus::InternalError {
            continue;
        }
        let Some(mutant) = outcome.scenario.as_mutant() else {
            continue;
        };
        let entry = by_file
            .entry(mutant.source_file.tree_relative_path.clone())
            .or_insert((0, 0));
        entry.0 += 1;
        if is_killed(outcome.status) {
            entry.1 += 1;
        }
    }
    by_file
        .into_iter()
        .map(|(file_path, (total, killed))| FileScore {
            file_path,
            total,
            killed,
            score: percentage(killed, total),
        })
        .collect()
}

/// Compute the overall score across every scenario, given the wall-clock time
/// the whole run took.
pub fn overall_score(outcomes: &[ScenarioOutcome], duration: Duration) -> OverallScore {
    let file_scores = per_file_scores(outcomes);
    let total_mutants: usize = file_scores.iter().map(|f| f.total).sum();
    let killed: usize = file_scores.iter().map(|f| f.killed).sum();
    OverallScore {
        total_files: file_scores.len(),
        total_mutants,
        killed,
        score: percentage(killed, total_mutants),
        duration,
    }
}
