// Copyright 2025 Martin Pool

//! The Overlay Mutator: stage one mutant's source text into a scratch
//! directory without ever touching the user's working tree.
//!
//! Each worker owns a private [crate::build_dir::BuildDir], a throwaway copy
//! of the whole tree created once per worker; an [OverlayContext] installs
//! one mutant's text into that copy for the duration of a single test run
//! and reverts it afterwards. Callers MUST pass a worker's `BuildDir` path
//! here, never the original `--dir` path: this module has no way to tell
//! the difference and will happily overwrite whatever `build_dir` it's
//! given. A manifest document is still written alongside the mutated file,
//! naming the original/mutated path pair the way a build tool with native
//! overlay support (e.g. Go's `-overlay=file`) would expect it, so that the
//! staged scratch data is self-describing even though `cargo` itself is
//! driven by installing the file directly.

use std::collections::BTreeMap;
use std::fs;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;
use tracing::{trace, warn};

use crate::mutant::Mutant;

/// The top-level key a build tool configured to honor the manifest would
/// look for, mirroring the shape of Go's `-overlay=file` JSON document.
#[derive(Serialize)]
struct OverlayManifest {
    #[serde(rename = "Replace")]
    replace: BTreeMap<Utf8PathBuf, Utf8PathBuf>,
}

/// Scratch state for testing exactly one mutant.
pub struct OverlayContext {
    /// Unique scratch directory for this mutant; removed on drop/cleanup.
    pub mutant_dir: Utf8PathBuf,
    /// Absolute path of the file being replaced, within the worker's build dir.
    pub original_path: Utf8PathBuf,
    /// Absolute path of the staged mutated file.
    pub mutated_path: Utf8PathBuf,
    /// Absolute path of the overlay manifest document.
    pub overlay_path: Utf8PathBuf,
    /// The original file's content, saved so it can be restored exactly.
    original_code: String,
}

impl OverlayContext {
    /// Stage `mutant`'s mutated source under `scratch_root`, ready to be
    /// installed into `build_dir`.
    pub fn prepare(
        build_dir: &Utf8Path,
        scratch_root: &Utf8Path,
        mutant: &Mutant,
    ) -> Result<OverlayContext> {
        let mutant_dir = scratch_root.join(format!("mutant_{}", mutant.id()));
        fs::create_dir_all(&mutant_dir)
            .with_context(|| format!("create overlay scratch dir {mutant_dir}"))?;

        let original_path = build_dir.join(&mutant.source_file.tree_relative_path);
        let basename = original_path
            .file_name()
            .context("mutated file has no basename")?;
        let mutated_path = mutant_dir.join(basename);
        mutant
            .write_mutated_code(&mutated_path)
            .with_context(|| format!("stage mutated source for mutant {}", mutant.id()))?;

        let overlay_path = mutant_dir.join("overlay.json");
        let manifest = OverlayManifest {
            replace: BTreeMap::from([(original_path.clone(), mutated_path.clone())]),
        };
        fs::write(
            &overlay_path,
            serde_json::to_string_pretty(&manifest).context("serialize overlay manifest")?,
        )
        .with_context(|| format!("write overlay manifest {overlay_path}"))?;

        Ok(OverlayContext {
            mutant_dir,
            original_path,
            mutated_path,
            overlay_path,
            original_code: mutant.source_file.code.as_str().to_owned(),
        })
    }

    /// Install the mutated file over the original, within the build dir.
    pub fn install(&self) -> Result<()> {
        trace!(path = %self.original_path, "install mutated source");
        let mutated = fs::read_to_string(&self.mutated_path)
            .with_context(|| format!("read staged mutated source {}", self.mutated_path))?;
        fs::write(&self.original_path, mutated)
            .with_context(|| format!("install mutated source over {}", self.original_path))
    }

    /// Restore the original file content.
    pub fn revert(&self) -> Result<()> {
        trace!(path = %self.original_path, "revert mutated source");
        fs::write(&self.original_path, &self.original_code)
            .with_context(|| format!("revert {}", self.original_path))
    }

    /// Remove the scratch directory. Tolerant of partial or already-missing
    /// state: failures are logged and swallowed, never propagated, per the
    /// cleanup contract.
    pub fn cleanup(&self) {
        if let Err(err) = fs::remove_dir_all(&self.mutant_dir) {
            if err.kind() != std::io::ErrorKind::NotFound {
                warn!(dir = %self.mutant_dir, ?err, "failed to clean up overlay scratch dir");
            }
        }
    }
}

impl Drop for OverlayContext {
    fn drop(&mut self) {
        self.cleanup();
    }
}
