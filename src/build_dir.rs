// Copyright 2025 Martin Pool

//! A private, disposable copy of the source tree that a worker can build and
//! test against, so that the overlay mechanism never touches the project
//! root the user pointed us at.
//!
//! Each worker owns exactly one [BuildDir] for its lifetime: it's created
//! once, reused for every mutant the worker processes, and removed when the
//! worker finishes (via the backing [tempfile::TempDir]'s `Drop`).

use anyhow::Context;
use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempDir;
use tracing::debug;

use crate::Result;

/// A scratch copy of the tree being mutated.
pub struct BuildDir {
    _tempdir: TempDir,
    path: Utf8PathBuf,
}

impl BuildDir {
    /// Copy `tree_path` into a fresh temporary directory.
    pub fn copy_from(tree_path: &Utf8Path) -> Result<BuildDir> {
        let tempdir = TempDir::new().context("create build directory")?;
        let path: Utf8PathBuf = tempdir
            .path()
            .to_owned()
            .try_into()
            .context("build directory path is not UTF-8")?;
        debug!(from = %tree_path, to = %path, "copying tree into build directory");
        cp_r::CopyOptions::new()
            .copy_tree(tree_path, &path)
            .with_context(|| format!("copy tree {tree_path} into build directory {path}"))?;
        Ok(BuildDir {
            _tempdir: tempdir,
            path,
        })
    }

    /// The root of the copied tree.
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn copies_tree_contents_into_a_new_directory() {
        let source = tempfile::tempdir().unwrap();
        let source_path: Utf8PathBuf = source.path().to_owned().try_into().unwrap();
        fs::create_dir(source_path.join("src")).unwrap();
        fs::write(source_path.join("Cargo.toml"), "[package]\nname = \"x\"\n").unwrap();
        fs::write(source_path.join("src").join("lib.rs"), "fn f() {}\n").unwrap();

        let build_dir = BuildDir::copy_from(&source_path).unwrap();
        assert_ne!(build_dir.path(), &source_path);
        assert!(build_dir.path().join("Cargo.toml").is_file());
        assert!(build_dir.path().join("src").join("lib.rs").is_file());
    }

    #[test]
    fn mutating_the_copy_does_not_touch_the_source() {
        let source = tempfile::tempdir().unwrap();
        let source_path: Utf8PathBuf = source.path().to_owned().try_into().unwrap();
        fs::write(source_path.join("lib.rs"), "original\n").unwrap();

        let build_dir = BuildDir::copy_from(&source_path).unwrap();
        fs::write(build_dir.path().join("lib.rs"), "mutated\n").unwrap();

        assert_eq!(
            fs::read_to_string(source_path.join("lib.rs")).unwrap(),
            "original\n"
        );
    }
}
