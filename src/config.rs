// Copyright 2022-2025 Martin Pool

//! `.cargo/mutants.toml` configuration file.
//!
//! Read after parsing command-line arguments, and after finding the source
//! tree, because these together determine its location. This is merged into
//! [crate::options::Options], which is the form the rest of the engine reads.

use std::fs::read_to_string;

use anyhow::Context;
use camino::Utf8Path;
use serde::Deserialize;

use crate::Result;

/// Configuration read from `.cargo/mutants.toml`.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Only consider files matching these globs.
    pub examine_globs: Vec<String>,
    /// Never consider files matching these globs.
    pub exclude_globs: Vec<String>,

    /// Number of parallel workers; `None` means choose automatically.
    pub workers: Option<usize>,

    /// Test timeout, in seconds; `None` means calibrate from the baseline run.
    pub timeout: Option<f64>,
    /// Multiplier applied to the baseline test duration to get the deadline.
    pub timeout_multiplier: Option<f64>,
    /// Floor under the calibrated timeout, in seconds.
    pub minimum_timeout: Option<f64>,

    /// Maximum bytes of captured stdout+stderr kept per scenario log.
    pub output_truncation_bytes: Option<usize>,

    /// Path to the history file, relative to the tree root.
    pub history_path: Option<String>,

    /// Expressions usable as error values for `fn_value` mutants that
    /// return `Result`, e.g. `"anyhow::anyhow!(\"mutated\")"`.
    pub error_values: Vec<String>,

    /// Minimum overall mutation score (0..100) required to pass; `None`
    /// disables the gate.
    pub min_score: Option<f64>,
}

impl Config {
    pub fn read_file(path: &Utf8Path) -> Result<Config> {
        let toml = read_to_string(path).with_context(|| format!("read config {path}"))?;
        toml::de::from_str(&toml).with_context(|| format!("parse toml from {path}"))
    }

    /// Read `<tree>/.cargo/mutants.toml`, or return the default (empty)
    /// config if it does not exist.
    pub fn read_tree_config(tree_path: &Utf8Path) -> Result<Config> {
        let path = tree_path.join(".cargo").join("mutants.toml");
        if path.is_file() {
            Config::read_file(&path)
        } else {
            Ok(Config::default())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn missing_config_file_is_default() {
        let tmp = tempfile::tempdir().unwrap();
        let tree: camino::Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        assert_eq!(Config::read_tree_config(&tree).unwrap(), Config::default());
    }

    #[test]
    fn parses_known_fields() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".cargo")).unwrap();
        std::fs::write(
            tmp.path().join(".cargo").join("mutants.toml"),
            "exclude_globs = [\"generated/**\"]\ntimeout_multiplier = 3.0\nworkers = 2\nmin_score = 80.0\n",
        )
        .unwrap();
        let tree: camino::Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        let config = Config::read_tree_config(&tree).unwrap();
        assert_eq!(config.min_score, Some(80.0));
        assert_eq!(config.exclude_globs, vec!["generated/**".to_owned()]);
        assert_eq!(config.timeout_multiplier, Some(3.0));
        assert_eq!(config.workers, Some(2));
    }

    #[test]
    fn rejects_unknown_fields() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir(tmp.path().join(".cargo")).unwrap();
        std::fs::write(
            tmp.path().join(".cargo").join("mutants.toml"),
            "bogus_field = true\n",
        )
        .unwrap();
        let tree: camino::Utf8PathBuf = tmp.path().to_owned().try_into().unwrap();
        assert!(Config::read_tree_config(&tree).is_err());
    }
}
