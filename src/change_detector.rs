// Copyright 2025 Martin Pool

//! Find which files changed since a base ref, so the Incremental Analyzer
//! can restrict a run to only those files.

use camino::{Utf8Path, Utf8PathBuf};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

use crate::process::get_command_output;
use crate::Result;

/// A ref name is safe to interpolate into a `git` command line if it matches
/// this shape: starts alphanumeric, then alphanumerics/`.`/`_`/`/`/`-`.
static SAFE_REF: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._/-]*$").unwrap());

/// Return the paths, relative to `tree_path`, of files that differ between
/// `base_ref` and `HEAD`.
///
/// Returns an error if `base_ref` doesn't look like a safe ref name. If the
/// tree isn't a git repository, or `git` can't be run, returns `Ok(None)` so
/// the caller can fall back to a full enumeration.
pub fn changed_files(tree_path: &Utf8Path, base_ref: &str) -> Result<Option<Vec<Utf8PathBuf>>> {
    if !SAFE_REF.is_match(base_ref) {
        anyhow::bail!("refusing to use unsafe-looking git ref {base_ref:?}");
    }
    let range = format!("{base_ref}...HEAD");
    let argv = ["git", "diff", "--name-only", &range];
    match get_command_output(&argv, tree_path) {
        Ok(output) => Ok(Some(
            output
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(Utf8PathBuf::from)
                .collect(),
        )),
        Err(err) => {
            warn!(%err, base_ref, "could not compute changed files; testing everything");
            Ok(None)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn rejects_unsafe_ref_names() {
        let tmp = tempfile::tempdir().unwrap();
        let tree: Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        assert!(changed_files(&tree, "main; rm -rf /").is_err());
        assert!(changed_files(&tree, "").is_err());
        assert!(changed_files(&tree, "-oops").is_err());
    }

    #[test]
    fn accepts_plausible_ref_names() {
        assert!(SAFE_REF.is_match("main"));
        assert!(SAFE_REF.is_match("origin/main"));
        assert!(SAFE_REF.is_match("release-1.2.3"));
        assert!(SAFE_REF.is_match("HEAD~1".replace('~', "-").as_str()));
    }

    #[test]
    fn falls_back_to_none_outside_a_repo() {
        let tmp = tempfile::tempdir().unwrap();
        let tree: Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        assert_eq!(changed_files(&tree, "main").unwrap(), None);
    }
}
