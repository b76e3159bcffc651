// Copyright 2025 Martin Pool

//! The History Store: a persistent file-path → mutation-result map, used by
//! the Incremental Analyzer to decide which files need testing again.
//!
//! Saved as a single JSON document, written atomically (temp file + rename)
//! so a crash or concurrent reader never sees a partial file. Updates are
//! serialized behind a `Mutex`, matching `mutants.out`'s single-writer
//! locking idiom even though this store lives in one file rather than a
//! directory of logs.

use std::collections::HashMap;
use std::fs;
use std::sync::Mutex;

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::aggregator::is_killed;
use crate::engine::MutantStatus;
use crate::hash::Hash;
use crate::mutant::Mutant;
use crate::Result;

/// A durable, re-loadable snapshot of one mutant, as persisted in the
/// history store. Distinct from [Mutant] itself, which is never
/// reconstructed from history: mutants are produced fresh from the AST
/// every run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutantRecord {
    pub id: Hash,
    pub file_path: Utf8PathBuf,
    pub line: usize,
    pub column: usize,
    #[serde(rename = "type")]
    pub genre: String,
    pub original: String,
    pub mutated: String,
    pub description: String,
}

impl MutantRecord {
    pub fn from_mutant(mutant: &Mutant) -> MutantRecord {
        MutantRecord {
            id: mutant.id(),
            file_path: mutant.source_file.tree_relative_path.clone(),
            line: mutant.span.start.line,
            column: mutant.span.start.column,
            genre: mutant.genre_tag(),
            original: mutant.original_text(),
            mutated: mutant.replacement_text().to_owned(),
            description: mutant.describe_change(),
        }
    }
}

/// A durable snapshot of one mutation result, as persisted in the history store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationResultRecord {
    /// The id of the mutant this result belongs to.
    pub mutant_id: Hash,
    pub status: MutantStatus,
    pub duration_secs: f64,
    /// Captured stdout+stderr, bounded by the configured truncation limit.
    pub output: String,
}

/// What's known about the last time a file was mutation-tested.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    /// Hash of the source file's content at the time it was last tested.
    pub file_hash: Hash,
    /// Combined hash of its related test companions at that time.
    pub test_hash: Hash,
    pub mutants: Vec<MutantRecord>,
    pub results: Vec<MutationResultRecord>,
    /// Percentage of mutants killed, 0.0-100.0.
    pub mutation_score: f64,
    /// RFC3339 timestamp of when this entry was recorded.
    pub timestamp: String,
}

impl HistoryEntry {
    fn new(
        mutants: Vec<MutantRecord>,
        results: Vec<MutationResultRecord>,
        file_hash: Hash,
        test_hash: Hash,
        timestamp: String,
    ) -> Self {
        let total = mutants.len();
        let killed = results.iter().filter(|r| is_killed(r.status)).count();
        let mutation_score = if total == 0 {
            100.0
        } else {
            100.0 * killed as f64 / total as f64
        };
        HistoryEntry {
            file_hash,
            test_hash,
            mutants,
            results,
            mutation_score,
            timestamp,
        }
    }

    /// Total mutants recorded for this file.
    pub fn total_mutants(&self) -> usize {
        self.mutants.len()
    }

    /// Mutants counted as killed (`Killed`, `BuildFailed`, or `TimedOut`).
    pub fn killed_mutants(&self) -> usize {
        self.results.iter().filter(|r| is_killed(r.status)).count()
    }
}

/// Summary statistics across the whole store.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HistoryStats {
    pub total_files: usize,
    pub total_mutants: usize,
    pub total_killed: usize,
    pub average_score: f64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HistoryDocument {
    entries: HashMap<Utf8PathBuf, HistoryEntry>,
    saved_at: String,
    version: String,
}

/// A loaded history store, ready for lookups and updates.
pub struct HistoryStore {
    inner: Mutex<HistoryDocument>,
}

fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| String::new())
}

impl HistoryStore {
    /// Load from `path`. A missing file loads as an empty store, not an error.
    pub fn load(path: &Utf8Path) -> Result<HistoryStore> {
        let document = if path.is_file() {
            let text =
                fs::read_to_string(path).with_context(|| format!("read history file {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parse history file {path}"))?
        } else {
            HistoryDocument::default()
        };
        Ok(HistoryStore {
            inner: Mutex::new(document),
        })
    }

    /// The stored entry for `file`, if any.
    pub fn get(&self, file: &Utf8Path) -> Option<HistoryEntry> {
        self.inner.lock().unwrap().entries.get(file).cloned()
    }

    /// True if there's no entry for `file`, or its stored hash differs.
    pub fn has_changed(&self, file: &Utf8Path, file_hash: &Hash) -> bool {
        match self.get(file) {
            None => true,
            Some(entry) => &entry.file_hash != file_hash,
        }
    }

    /// Record the outcome of testing `file`: replaces any existing entry.
    pub fn update(
        &self,
        file: Utf8PathBuf,
        mutants: Vec<MutantRecord>,
        results: Vec<MutationResultRecord>,
        file_hash: Hash,
        test_hash: Hash,
    ) {
        let entry = HistoryEntry::new(mutants, results, file_hash, test_hash, now_rfc3339());
        self.inner.lock().unwrap().entries.insert(file, entry);
    }

    /// Write the store to `path` atomically.
    pub fn save(&self, path: &Utf8Path) -> Result<()> {
        let mut document = self.inner.lock().unwrap();
        document.version = crate::VERSION.to_owned();
        document.saved_at = now_rfc3339();
        let text = serde_json::to_string_pretty(&*document).context("serialize history store")?;
        drop(document);

        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, text).with_context(|| format!("write {tmp_path}"))?;
        fs::rename(&tmp_path, path).with_context(|| format!("rename {tmp_path} to {path}"))?;
        Ok(())
    }

    pub fn stats(&self) -> HistoryStats {
        let document = self.inner.lock().unwrap();
        let total_files = document.entries.len();
        let total_mutants: usize = document.entries.values().map(|e| e.total_mutants()).sum();
        let total_killed: usize = document.entries.values().map(|e| e.killed_mutants()).sum();
        let average_score = if total_files == 0 {
            100.0
        } else {
            document.entries.values().map(|e| e.mutation_score).sum::<f64>() / total_files as f64
        };
        HistoryStats {
            total_files,
            total_mutants,
            total_killed,
            average_score,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mutant_record(id: &str) -> MutantRecord {
        MutantRecord {
            id: id.to_owned(),
            file_path: "src/lib.rs".into(),
            line: 1,
            column: 1,
            genre: "arithmetic_binary".to_owned(),
            original: "+".to_owned(),
            mutated: "-".to_owned(),
            description: "replace + with -".to_owned(),
        }
    }

    fn result_record(mutant_id: &str, status: MutantStatus) -> MutationResultRecord {
        MutationResultRecord {
            mutant_id: mutant_id.to_owned(),
            status,
            duration_secs: 0.5,
            output: String::new(),
        }
    }

    #[test]
    fn missing_file_loads_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let path: Utf8PathBuf = tmp.path().join("history.json").try_into().unwrap();
        let store = HistoryStore::load(&path).unwrap();
        assert_eq!(store.stats().total_files, 0);
        assert!(store.has_changed(Utf8Path::new("src/lib.rs"), &"abc".to_owned()));
    }

    #[test]
    fn update_then_save_then_reload_round_trips() {
        let tmp = tempfile::tempdir().unwrap();
        let path: Utf8PathBuf = tmp.path().join("history.json").try_into().unwrap();
        let store = HistoryStore::load(&path).unwrap();
        let mutants = vec![mutant_record("m1"), mutant_record("m2")];
        let results = vec![
            result_record("m1", MutantStatus::Killed),
            result_record("m2", MutantStatus::Survived),
        ];
        store.update(
            "src/lib.rs".into(),
            mutants,
            results,
            "filehash".to_owned(),
            "testhash".to_owned(),
        );
        store.save(&path).unwrap();
        assert!(path.is_file());

        let reloaded = HistoryStore::load(&path).unwrap();
        let entry = reloaded.get(Utf8Path::new("src/lib.rs")).unwrap();
        assert_eq!(entry.total_mutants(), 2);
        assert_eq!(entry.killed_mutants(), 1);
        assert_eq!(entry.mutation_score, 50.0);
        assert!(!entry.timestamp.is_empty());
        assert!(!reloaded.has_changed(Utf8Path::new("src/lib.rs"), &"filehash".to_owned()));
        assert!(reloaded.has_changed(Utf8Path::new("src/lib.rs"), &"different".to_owned()));

        let raw = fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"fileHash\""));
        assert!(raw.contains("\"testHash\""));
        assert!(raw.contains("\"mutationScore\""));
        assert!(raw.contains("\"savedAt\""));
    }

    #[test]
    fn stats_average_across_files() {
        let tmp = tempfile::tempdir().unwrap();
        let path: Utf8PathBuf = tmp.path().join("history.json").try_into().unwrap();
        let store = HistoryStore::load(&path).unwrap();
        store.update(
            "a.rs".into(),
            vec![mutant_record("a1")],
            vec![result_record("a1", MutantStatus::Killed)],
            "h1".to_owned(),
            "t1".to_owned(),
        );
        store.update(
            "b.rs".into(),
            vec![mutant_record("b1")],
            vec![result_record("b1", MutantStatus::Survived)],
            "h2".to_owned(),
            "t2".to_owned(),
        );
        let stats = store.stats();
        assert_eq!(stats.total_files, 2);
        assert_eq!(stats.total_mutants, 2);
        assert_eq!(stats.total_killed, 1);
        assert_eq!(stats.average_score, 50.0);
    }
}
