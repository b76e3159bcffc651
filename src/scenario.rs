// Copyright 2021-2025 Martin Pool

//! A scenario is one thing the Execution Engine can run: either the
//! unmutated baseline (used to calibrate timeouts and to confirm the tree
//! builds and tests cleanly before any mutant is tried) or one mutant.

use std::fmt;

use serde::Serialize;

use crate::mutant::Mutant;

#[derive(Clone, Eq, PartialEq, Debug, Serialize)]
pub enum Scenario {
    /// Build and test the tree with no mutation applied.
    Baseline,
    /// Build and test the tree with one mutation applied.
    Mutant(Mutant),
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scenario::Baseline => f.write_str("baseline"),
            Scenario::Mutant(mutant) => f.write_str(&mutant.describe_change()),
        }
    }
}

impl Scenario {
    pub fn is_mutant(&self) -> bool {
        matches!(self, Scenario::Mutant(_))
    }

    pub fn log_file_name_base(&self) -> String {
        match self {
            Scenario::Baseline => "baseline".into(),
            Scenario::Mutant(mutant) => mutant.log_file_name_base(),
        }
    }

    /// The package that should be tested for this scenario, or `None` to
    /// test every package (the baseline run).
    pub fn package_name(&self) -> Option<&str> {
        match self {
            Scenario::Mutant(mutant) => Some(&mutant.source_file.package.name),
            Scenario::Baseline => None,
        }
    }

    pub fn mutant(&self) -> &Mutant {
        match self {
            Scenario::Mutant(mutant) => mutant,
            Scenario::Baseline => panic!("not a mutant scenario"),
        }
    }

    pub fn as_mutant(&self) -> Option<&Mutant> {
        match self {
            Scenario::Mutant(mutant) => Some(mutant),
            Scenario::Baseline => None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::mutant::Genre;
    use crate::source_file::SourceFile;
    use crate::span::Span;

    fn sample_mutant() -> Mutant {
        Mutant {
            source_file: SourceFile::for_tests("src/lib.rs", "fn f() -> u32 { 1 }\n"),
            function: None,
            span: Span::quad(1, 16, 1, 17),
            short_replaced: None,
            replacement: "0".to_owned(),
            genre: Genre::FnValue,
        }
    }

    #[test]
    fn baseline_is_not_a_mutant() {
        assert!(!Scenario::Baseline.is_mutant());
        assert_eq!(Scenario::Baseline.log_file_name_base(), "baseline");
        assert_eq!(Scenario::Baseline.package_name(), None);
    }

    #[test]
    fn mutant_scenario_reports_its_package() {
        let scenario = Scenario::Mutant(sample_mutant());
        assert!(scenario.is_mutant());
        assert_eq!(scenario.package_name(), Some("test_package"));
    }
}
