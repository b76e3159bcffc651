// Copyright 2025 Martin Pool

//! Parse a `.gomuignore` file: gitignore-style path exclusions.
//!
//! This is specified only by its interface (`is_ignored`) at the engine boundary;
//! the concrete parser here uses the same gitignore grammar the teacher already
//! depends on through the `ignore` crate, so `#`-comments, blank lines, leading
//! `!` negation, and trailing `/` directory markers all behave exactly as they
//! would for a `.gitignore`.

use anyhow::{Context, Result};
use camino::Utf8Path;
use ignore::gitignore::{Gitignore, GitignoreBuilder};

/// A parsed `.gomuignore`, or an empty one if no such file exists.
pub struct IgnoreFile {
    matcher: Option<Gitignore>,
}

impl IgnoreFile {
    /// An ignore file that excludes nothing.
    pub fn empty() -> IgnoreFile {
        IgnoreFile { matcher: None }
    }

    /// Load `.gomuignore` from `tree_path`, if it exists.
    pub fn load(tree_path: &Utf8Path) -> Result<IgnoreFile> {
        let ignore_path = tree_path.join(".gomuignore");
        if !ignore_path.is_file() {
            return Ok(IgnoreFile::empty());
        }
        let mut builder = GitignoreBuilder::new(tree_path.as_std_path());
        if let Some(err) = builder.add(ignore_path.as_std_path()) {
            return Err(err).context("parse .gomuignore");
        }
        let matcher = builder.build().context("build .gomuignore matcher")?;
        Ok(IgnoreFile {
            matcher: Some(matcher),
        })
    }

    /// True if `tree_relative_path` should be excluded.
    ///
    /// `is_dir` should be true when the path names a directory, so that
    /// trailing-`/` patterns and directory pruning behave correctly.
    pub fn is_ignored_path(&self, tree_relative_path: &Utf8Path, is_dir: bool) -> bool {
        match &self.matcher {
            None => false,
            Some(m) => m
                .matched(tree_relative_path.as_std_path(), is_dir)
                .is_ignore(),
        }
    }

    /// True if this file path should be excluded.
    pub fn is_ignored(&self, tree_relative_path: &Utf8Path) -> bool {
        self.is_ignored_path(tree_relative_path, false)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::fs;

    #[test]
    fn empty_ignore_file_excludes_nothing() {
        let ignore = IgnoreFile::empty();
        assert!(!ignore.is_ignored(Utf8Path::new("generated/foo.rs")));
    }

    #[test]
    fn excludes_matching_directory() {
        let tmp = tempfile::tempdir().unwrap();
        let tree: camino::Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        fs::write(tree.join(".gomuignore"), "generated/\n").unwrap();
        let ignore = IgnoreFile::load(&tree).unwrap();
        assert!(ignore.is_ignored(Utf8Path::new("generated/foo.rs")));
        assert!(!ignore.is_ignored(Utf8Path::new("src/foo.rs")));
    }

    #[test]
    fn negation_un_ignores_a_path() {
        let tmp = tempfile::tempdir().unwrap();
        let tree: camino::Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        fs::write(
            tree.join(".gomuignore"),
            "generated/\n!generated/keep.rs\n",
        )
        .unwrap();
        let ignore = IgnoreFile::load(&tree).unwrap();
        assert!(ignore.is_ignored(Utf8Path::new("generated/foo.rs")));
        assert!(!ignore.is_ignored(Utf8Path::new("generated/keep.rs")));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let tree: camino::Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        fs::write(
            tree.join(".gomuignore"),
            "# comment\n\ngenerated/\n",
        )
        .unwrap();
        let ignore = IgnoreFile::load(&tree).unwrap();
        assert!(ignore.is_ignored(Utf8Path::new("generated/foo.rs")));
    }

    #[test]
    fn missing_ignore_file_is_not_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let tree: camino::Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        let ignore = IgnoreFile::load(&tree).unwrap();
        assert!(!ignore.is_ignored(Utf8Path::new("anything.rs")));
    }
}
