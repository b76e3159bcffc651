// Copyright 2025 Martin Pool

//! A single source file under test, and the package it belongs to.

use std::fmt;
use std::fs;
use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::hash::{hash_bytes, Hash};
use crate::path::Utf8PathSlashes;

/// A package (crate) that a source file belongs to, for reporting and for
/// building per-package test commands.
#[derive(Debug, Eq, PartialEq, Hash, Clone)]
pub struct Package {
    /// The short name of the package, like "mutation-engine".
    pub name: String,

    /// The path of the package's `Cargo.toml`, relative to the top of the tree.
    pub relative_manifest_path: Utf8PathBuf,
}

/// A source file discovered in the tree, with its content loaded once.
#[derive(Clone, Serialize)]
pub struct SourceFile {
    /// Path of this file relative to the top of the tree, used for reporting and
    /// for looking up related test files.
    pub tree_relative_path: Utf8PathBuf,

    /// The package this file was found in.
    pub package: Arc<Package>,

    /// Full text of the file.
    #[serde(skip)]
    pub code: Arc<String>,
}

impl SourceFile {
    /// Load a source file's content from `tree_path/tree_relative_path`.
    pub fn load(
        tree_path: &Utf8Path,
        tree_relative_path: Utf8PathBuf,
        package: Arc<Package>,
    ) -> Result<SourceFile> {
        let full_path = tree_path.join(&tree_relative_path);
        let code = fs::read_to_string(&full_path)
            .with_context(|| format!("read source file {full_path}"))?;
        Ok(SourceFile {
            tree_relative_path,
            package,
            code: Arc::new(code),
        })
    }

    /// Construct a `SourceFile` directly from in-memory text, for tests.
    #[cfg(test)]
    pub fn for_tests(tree_relative_path: &str, code: &str) -> SourceFile {
        SourceFile {
            tree_relative_path: Utf8PathBuf::from(tree_relative_path),
            package: Arc::new(Package {
                name: "test_package".to_owned(),
                relative_manifest_path: Utf8PathBuf::from("Cargo.toml"),
            }),
            code: Arc::new(code.to_owned()),
        }
    }

    /// Return the path within `dir` that this source file would occupy if the
    /// tree were copied or overlaid there.
    pub fn within_dir(&self, dir: &Utf8Path) -> Utf8PathBuf {
        dir.join(&self.tree_relative_path)
    }

    /// The tree-relative path, with forward slashes, for display and for JSON.
    pub fn tree_relative_slashes(&self) -> String {
        self.tree_relative_path.to_slash_path()
    }

    pub fn hash(&self) -> Hash {
        hash_bytes(self.code.as_bytes())
    }
}

impl fmt::Debug for SourceFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceFile")
            .field("tree_relative_path", &self.tree_relative_path)
            .field("package", &self.package.name)
            .finish_non_exhaustive()
    }
}

impl PartialEq for SourceFile {
    fn eq(&self, other: &Self) -> bool {
        self.tree_relative_path == other.tree_relative_path
    }
}

impl Eq for SourceFile {}
