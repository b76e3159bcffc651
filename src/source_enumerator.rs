// Copyright 2025 Martin Pool

//! Discover the set of source files to consider for mutation.
//!
//! This walks the Cargo workspace to find packages and their `lib`/`bin` targets,
//! then walks the filesystem under each target's top source file, following
//! `mod` statements is *not* attempted here (that's a syntactic detail the AST
//! Analyzer and Mutator Registry handle per-file); instead every `.rs` file
//! under each package's `src/` directory is a candidate, filtered by the
//! default exclusions and the caller's glob/ignore configuration.

use std::sync::Arc;

use anyhow::{Context, Result};
use camino::{Utf8Path, Utf8PathBuf};
use cargo_metadata::MetadataCommand;
use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::glob::PathFilter;
use crate::ignore_file::IgnoreFile;
use crate::source_file::{Package, SourceFile};

/// Directory/file names that are never candidates, regardless of configuration.
const DEFAULT_EXCLUDE: &[&str] = &[
    ".git", ".hg", ".bzr", ".svn", "target", "mutants.out", "mutants.out.old",
];

/// Enumerates the candidate source files of a workspace rooted at `tree_path`.
pub struct SourceEnumerator {
    tree_path: Utf8PathBuf,
}

impl SourceEnumerator {
    pub fn new(tree_path: &Utf8Path) -> SourceEnumerator {
        SourceEnumerator {
            tree_path: tree_path.to_owned(),
        }
    }

    /// Discover every package in the workspace.
    pub fn packages(&self) -> Result<Vec<Arc<Package>>> {
        let metadata = MetadataCommand::new()
            .manifest_path(self.tree_path.join("Cargo.toml"))
            .no_deps()
            .exec()
            .context("run `cargo metadata`")?;
        let mut packages: Vec<Arc<Package>> = metadata
            .workspace_packages()
            .into_iter()
            .map(|p| {
                let manifest_path: Utf8PathBuf = p.manifest_path.clone().into();
                let relative_manifest_path = manifest_path
                    .strip_prefix(&self.tree_path)
                    .unwrap_or(&manifest_path)
                    .to_owned();
                Arc::new(Package {
                    name: p.name.clone(),
                    relative_manifest_path,
                })
            })
            .collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(packages)
    }

    /// List every candidate source file across all packages, honoring the given
    /// glob-based examine/exclude sets and `.gomuignore`-style ignore file.
    pub fn source_files(
        &self,
        globs: &PathFilter,
        ignore_file: &IgnoreFile,
    ) -> Result<Vec<SourceFile>> {
        let mut files = Vec::new();
        for package in self.packages()? {
            let package_dir = self
                .tree_path
                .join(package.relative_manifest_path.parent().unwrap_or(Utf8Path::new(".")));
            let src_dir = package_dir.join("src");
            if !src_dir.is_dir() {
                continue;
            }
            let mut walker = WalkBuilder::new(&src_dir);
            walker.standard_filters(false).hidden(true);
            for entry in walker.build() {
                let entry = match entry {
                    Ok(e) => e,
                    Err(err) => {
                        warn!(?err, "error walking source tree");
                        continue;
                    }
                };
                let path: Utf8PathBuf = match Utf8PathBuf::try_from(entry.into_path()) {
                    Ok(p) => p,
                    Err(_) => continue, // non-UTF8 path, skip
                };
                if path.extension() != Some("rs") {
                    continue;
                }
                if path
                    .components()
                    .any(|c| DEFAULT_EXCLUDE.contains(&c.as_str()))
                {
                    continue;
                }
                let tree_relative = path.strip_prefix(&self.tree_path).unwrap_or(&path).to_owned();
                if !globs.is_examined(&tree_relative) || globs.is_excluded(&tree_relative) {
                    debug!(%tree_relative, "excluded by glob configuration");
                    continue;
                }
                if ignore_file.is_ignored(&tree_relative) {
                    debug!(%tree_relative, "excluded by ignore file");
                    continue;
                }
                match SourceFile::load(&self.tree_path, tree_relative.clone(), package.clone()) {
                    Ok(sf) => files.push(sf),
                    Err(err) => warn!(%tree_relative, ?err, "failed to read source file"),
                }
            }
        }
        files.sort_by(|a, b| a.tree_relative_path.cmp(&b.tree_relative_path));
        Ok(files)
    }
}
