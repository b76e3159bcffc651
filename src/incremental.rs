// Copyright 2025 Martin Pool

//! The Incremental Analyzer: decide which files need mutation testing again.

use camino::{Utf8Path, Utf8PathBuf};
use tracing::debug;

use crate::hash::hash_file;
use crate::history::HistoryStore;
use crate::Result;

#[cfg(test)]
use crate::engine::MutantStatus;
#[cfg(test)]
use crate::history::{MutantRecord, MutationResultRecord};

/// Why a file does or doesn't need to be tested again this run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisResult {
    pub tree_relative_path: Utf8PathBuf,
    pub needs_update: bool,
    pub reason: &'static str,
}

/// Decide whether `tree_relative_path` needs mutation testing, given the
/// history store and the tree it lives in.
pub fn analyze_file(
    tree_path: &Utf8Path,
    tree_relative_path: &Utf8Path,
    history: &HistoryStore,
) -> AnalysisResult {
    let full_path = tree_path.join(tree_relative_path);
    let result = |needs_update, reason| AnalysisResult {
        tree_relative_path: tree_relative_path.to_owned(),
        needs_update,
        reason,
    };

    if !full_path.is_file() {
        return result(false, "File does not exist");
    }
    let Ok(file_hash) = hash_file(full_path.as_std_path()) else {
        return result(true, "File content changed");
    };
    let Some(entry) = history.get(tree_relative_path) else {
        return result(true, "No previous history");
    };
    if entry.file_hash != file_hash {
        return result(true, "File content changed");
    }

    let companions = related_test_files(tree_path, tree_relative_path);
    let test_hash = crate::hash::combine_hashes(
        &companions
            .iter()
            .filter_map(|p| hash_file(p.as_std_path()).ok())
            .collect::<Vec<_>>(),
    );
    if entry.test_hash != test_hash {
        return result(true, "Related test files changed");
    }
    result(false, "No changes detected")
}

/// Find the conventional test companions of a source file: for `dir/name.rs`
/// that's a sibling `tests/name.rs` or `tests/test_name.rs` integration test.
/// A colocated `#[cfg(test)] mod tests` is not listed here because it's
/// already inside the file itself, and so already covered by `file_hash`.
pub fn related_test_files(tree_path: &Utf8Path, tree_relative_path: &Utf8Path) -> Vec<Utf8PathBuf> {
    let Some(stem) = tree_relative_path.file_stem() else {
        return Vec::new();
    };
    let mut candidates = Vec::new();
    if let Some(parent) = tree_relative_path.parent() {
        candidates.push(parent.join("tests").join(format!("{stem}.rs")));
        candidates.push(parent.join("tests").join(format!("test_{stem}.rs")));
    }
    candidates
        .into_iter()
        .map(|p| tree_path.join(&p))
        .filter(|full| full.is_file())
        .collect()
}

/// Filter a list of candidate source files down to those that need testing,
/// logging each decision.
pub fn files_needing_update(
    tree_path: &Utf8Path,
    candidates: &[Utf8PathBuf],
    history: &HistoryStore,
) -> Result<Vec<Utf8PathBuf>> {
    let mut needed = Vec::new();
    for path in candidates {
        let analysis = analyze_file(tree_path, path, history);
        debug!(path = %analysis.tree_relative_path, needs_update = analysis.needs_update, reason = analysis.reason);
        if analysis.needs_update {
            needed.push(path.clone());
        }
    }
    Ok(needed)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    fn tree() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let path: Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        (tmp, path)
    }

    /// A trivial mutant/result pair, enough to exercise `HistoryStore::update`
    /// without needing a real `Mutant`.
    fn fixture_mutants_and_results(killed: usize) -> (Vec<MutantRecord>, Vec<MutationResultRecord>) {
        let mutants = vec![MutantRecord {
            id: "m1".to_owned(),
            file_path: "src/lib.rs".into(),
            line: 1,
            column: 1,
            genre: "arithmetic_binary".to_owned(),
            original: "+".to_owned(),
            mutated: "-".to_owned(),
            description: "replace + with -".to_owned(),
        }];
        let status = if killed > 0 {
            MutantStatus::Killed
        } else {
            MutantStatus::Survived
        };
        let results = vec![MutationResultRecord {
            mutant_id: "m1".to_owned(),
            status,
            duration_secs: 0.1,
            output: String::new(),
        }];
        (mutants, results)
    }

    #[test]
    fn missing_file_does_not_need_update() {
        let (_tmp, tree_path) = tree();
        let history = HistoryStore::load(&tree_path.join("history.json")).unwrap();
        let analysis = analyze_file(&tree_path, Utf8Path::new("src/gone.rs"), &history);
        assert!(!analysis.needs_update);
        assert_eq!(analysis.reason, "File does not exist");
    }

    #[test]
    fn file_with_no_history_needs_update() {
        let (_tmp, tree_path) = tree();
        fs::create_dir_all(tree_path.join("src")).unwrap();
        fs::write(tree_path.join("src/lib.rs"), "fn f() {}\n").unwrap();
        let history = HistoryStore::load(&tree_path.join("history.json")).unwrap();
        let analysis = analyze_file(&tree_path, Utf8Path::new("src/lib.rs"), &history);
        assert!(analysis.needs_update);
        assert_eq!(analysis.reason, "No previous history");
    }

    #[test]
    fn unchanged_file_and_tests_do_not_need_update() {
        let (_tmp, tree_path) = tree();
        fs::create_dir_all(tree_path.join("src")).unwrap();
        fs::write(tree_path.join("src/lib.rs"), "fn f() {}\n").unwrap();
        let file_hash = hash_file(tree_path.join("src/lib.rs").as_std_path()).unwrap();
        let test_hash = crate::hash::combine_hashes(std::iter::empty());
        let history = HistoryStore::load(&tree_path.join("history.json")).unwrap();
        let (mutants, results) = fixture_mutants_and_results(1);
        history.update("src/lib.rs".into(), mutants, results, file_hash, test_hash);
        let analysis = analyze_file(&tree_path, Utf8Path::new("src/lib.rs"), &history);
        assert!(!analysis.needs_update);
        assert_eq!(analysis.reason, "No changes detected");
    }

    #[test]
    fn changed_file_needs_update() {
        let (_tmp, tree_path) = tree();
        fs::create_dir_all(tree_path.join("src")).unwrap();
        fs::write(tree_path.join("src/lib.rs"), "fn f() {}\n").unwrap();
        let history = HistoryStore::load(&tree_path.join("history.json")).unwrap();
        let (mutants, results) = fixture_mutants_and_results(1);
        history.update(
            "src/lib.rs".into(),
            mutants,
            results,
            "stale_hash".to_owned(),
            crate::hash::combine_hashes(std::iter::empty()),
        );
        let analysis = analyze_file(&tree_path, Utf8Path::new("src/lib.rs"), &history);
        assert!(analysis.needs_update);
        assert_eq!(analysis.reason, "File content changed");
    }

    #[test]
    fn changed_companion_test_needs_update() {
        let (_tmp, tree_path) = tree();
        fs::create_dir_all(tree_path.join("src")).unwrap();
        fs::create_dir_all(tree_path.join("tests")).unwrap();
        fs::write(tree_path.join("src/widget.rs"), "fn f() {}\n").unwrap();
        fs::write(tree_path.join("tests/widget.rs"), "// old\n").unwrap();
        let file_hash = hash_file(tree_path.join("src/widget.rs").as_std_path()).unwrap();
        let history = HistoryStore::load(&tree_path.join("history.json")).unwrap();
        let (mutants, results) = fixture_mutants_and_results(1);
        history.update(
            "src/widget.rs".into(),
            mutants,
            results,
            file_hash,
            "stale_test_hash".to_owned(),
        );
        let analysis = analyze_file(&tree_path, Utf8Path::new("src/widget.rs"), &history);
        assert!(analysis.needs_update);
        assert_eq!(analysis.reason, "Related test files changed");
    }
}
