// Copyright 2021-2025 Martin Pool

//! Mutations to source files: the data produced by the Mutator Registry and
//! consumed by the Overlay Mutator and Aggregator.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use console::{style, StyledObject};
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use similar::TextDiff;
use strum::Display;
use tracing::trace;

use crate::hash::{hash_bytes, Hash};
use crate::source_file::SourceFile;
use crate::span::Span;
use crate::MUTATION_MARKER_COMMENT;

/// The mutator family that produced a mutant, tagged with the `type` string
/// used in the mutant's stable id and in reports.
///
/// The required families (per the operator-replacement table) come first;
/// the supplemental, teacher-grounded families follow.
#[derive(Clone, Copy, Eq, PartialEq, Debug, Serialize, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Genre {
    ArithmeticBinary,
    ArithmeticAssign,
    ArithmeticIncDec,
    ConditionalBinary,
    LogicalBinary,
    NegateConditional,
    ReturnBoundary,
    FnValue,
    UnaryOperator,
    MatchArm,
    MatchArmGuard,
}

/// The function containing a mutant.
///
/// Used both for mutations of a whole function body, and for smaller
/// mutations nested within it.
#[derive(Eq, PartialEq, Debug, Serialize)]
pub struct Function {
    /// The function's name, including any containing namespaces.
    pub function_name: String,

    /// The return type, including a leading "-> ", as a fragment of Rust
    /// syntax. Empty if the function returns `()`.
    pub return_type: String,

    /// The span of the entire function.
    pub span: Span,
}

/// A single proposed code change.
#[derive(Clone, Eq, PartialEq)]
pub struct Mutant {
    /// The file being mutated.
    pub source_file: SourceFile,

    /// The nearest enclosing function, if any. Absent for mutants in, say,
    /// top-level const expressions.
    pub function: Option<Arc<Function>>,

    /// The location of the mutated textual region in the original source.
    /// This region is deleted and replaced by `replacement`.
    pub span: Span,

    /// A shorter version of the text being replaced, for genres (like
    /// `match_arm`) where the full replaced text would be noisy to print.
    pub short_replaced: Option<String>,

    /// The replacement text.
    pub replacement: String,

    /// Which mutator family produced this mutant.
    pub genre: Genre,
}

impl Mutant {
    /// A stable identifier for this mutant within one run of one file:
    /// derived from the file path, position, genre, and the replacement
    /// text, per the data model's uniqueness invariant.
    pub fn id(&self) -> Hash {
        hash_bytes(
            format!(
                "{}:{}:{}:{}:{}",
                self.source_file.tree_relative_slashes(),
                self.span.start.line,
                self.span.start.column,
                self.genre,
                self.replacement,
            )
            .as_bytes(),
        )
    }

    /// The mutator family's tag string, as used in reports and the stable id.
    pub fn genre_tag(&self) -> String {
        self.genre.to_string()
    }

    /// Return the text of the whole file with the mutation applied.
    pub fn mutated_code(&self) -> String {
        self.span.replace(
            &self.source_file.code,
            &format!("{} {}", &self.replacement, MUTATION_MARKER_COMMENT),
        )
    }

    /// Describe the mutant briefly, not including its location.
    ///
    /// The result looks like `replace factorial -> u32 with Default::default()`.
    pub fn describe_change(&self) -> String {
        self.styled_parts()
            .into_iter()
            .map(|x| x.force_styling(false).to_string())
            .collect::<String>()
    }

    pub fn name(&self, show_line_col: bool) -> String {
        let mut v = Vec::new();
        v.push(self.source_file.tree_relative_slashes());
        if show_line_col {
            v.push(format!(
                ":{}:{}: ",
                self.span.start.line, self.span.start.column
            ));
        } else {
            v.push(": ".to_owned());
        }
        v.extend(
            self.styled_parts()
                .into_iter()
                .map(|x| x.force_styling(false).to_string()),
        );
        v.join("")
    }

    /// A one-line description of this mutant, with coloring, including the
    /// file name and optionally the line and column.
    pub fn to_styled_string(&self, show_line_col: bool) -> String {
        let mut v = Vec::new();
        v.push(self.source_file.tree_relative_slashes());
        if show_line_col {
            v.push(format!(
                ":{}:{}",
                self.span.start.line, self.span.start.column
            ));
        }
        v.push(": ".to_owned());
        v.extend(self.styled_parts().into_iter().map(|x| x.to_string()));
        v.join("")
    }

    fn styled_parts(&self) -> Vec<StyledObject<String>> {
        fn s<S: ToString>(s: S) -> StyledObject<String> {
            style(s.to_string())
        }
        let mut v: Vec<StyledObject<String>> = Vec::new();
        match self.genre {
            Genre::FnValue => {
                v.push(s("replace "));
                let function = self
                    .function
                    .as_ref()
                    .expect("FnValue mutant should have a function");
                v.push(s(&function.function_name).bright().magenta());
                if !function.return_type.is_empty() {
                    v.push(s(" "));
                    v.push(s(&function.return_type).magenta());
                }
                v.push(s(" with "));
                v.push(s(self.replacement_text()).yellow());
            }
            Genre::MatchArmGuard => {
                v.push(s("replace match guard "));
                v.push(s(squash_lines(self.original_text().as_ref())).yellow());
                v.push(s(" with "));
                v.push(s(self.replacement_text()).yellow());
            }
            Genre::MatchArm => {
                v.push(s("delete match arm "));
                v.push(
                    s(squash_lines(
                        self.short_replaced
                            .as_ref()
                            .expect("short_replaced should be set on MatchArm"),
                    ))
                    .yellow(),
                );
            }
            _ => {
                if self.replacement.is_empty() {
                    v.push(s("delete "));
                } else {
                    v.push(s("replace "));
                }
                v.push(s(self.original_text()).yellow());
                if !self.replacement.is_empty() {
                    v.push(s(" with "));
                    v.push(s(&self.replacement).bright().yellow());
                }
            }
        }
        if !matches!(self.genre, Genre::FnValue) {
            if let Some(func) = &self.function {
                v.push(s(" in "));
                v.push(s(&func.function_name).bright().magenta());
            }
        }
        v
    }

    pub fn original_text(&self) -> String {
        self.span.extract(&self.source_file.code)
    }

    pub fn replacement_text(&self) -> &str {
        self.replacement.as_str()
    }

    /// Return a unified diff for the mutant.
    ///
    /// The mutated text is passed in because the caller has normally already
    /// computed it and we don't want to pointlessly recompute it here.
    pub fn diff(&self, mutated_code: &str) -> String {
        let old_label = self.source_file.tree_relative_slashes();
        let new_label = self.describe_change().replace('\n', " ");
        TextDiff::from_lines(self.source_file.code.as_str(), mutated_code)
            .unified_diff()
            .context_radius(8)
            .header(&old_label, &new_label)
            .to_string()
    }

    /// Write the mutated source into `dest_path`, which should be the
    /// mutant's overlay replacement path.
    pub fn write_mutated_code(&self, dest_path: &camino::Utf8Path) -> anyhow::Result<()> {
        use anyhow::Context;
        trace!(?self, ?dest_path, "write mutated source");
        std::fs::write(dest_path, self.mutated_code())
            .with_context(|| format!("write mutated source to {dest_path}"))
    }

    /// Return a string describing this mutant suitable for building a log
    /// file name; it may still contain slashes.
    pub fn log_file_name_base(&self) -> String {
        format!(
            "{filename}_line_{line}_col_{col}",
            filename = crate::output::clean_filename(&self.source_file.tree_relative_slashes()),
            line = self.span.start.line,
            col = self.span.start.column,
        )
    }
}

impl fmt::Debug for Mutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mutant")
            .field("function", &self.function)
            .field("replacement", &self.replacement)
            .field("genre", &self.genre)
            .field("span", &self.span)
            .field("short_replaced", &self.short_replaced)
            .field("package_name", &self.source_file.package.name)
            .finish()
    }
}

impl Serialize for Mutant {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut ss = serializer.serialize_struct("Mutant", 8)?;
        ss.serialize_field("id", &self.id())?;
        ss.serialize_field("package", &self.source_file.package.name)?;
        ss.serialize_field("file", &self.source_file.tree_relative_slashes())?;
        ss.serialize_field("function", &self.function.as_ref().map(Arc::as_ref))?;
        ss.serialize_field("span", &self.span)?;
        ss.serialize_field("replacement", &self.replacement)?;
        ss.serialize_field("genre", &self.genre_tag())?;
        ss.serialize_field("description", &self.describe_change())?;
        ss.end()
    }
}

/// Combine multiple lines into one, dropping indentation that follows a newline.
///
/// Newlines become a space, unless there's already a trailing space.
pub fn squash_lines(s: &str) -> Cow<'_, str> {
    if s.contains('\n') {
        let mut r = String::new();
        let mut in_indent = false;
        for c in s.chars() {
            match c {
                ' ' | '\t' | '\n' if in_indent => (),
                '\n' => {
                    if !r.ends_with(' ') {
                        r.push(' ');
                    }
                    in_indent = true;
                }
                c => {
                    in_indent = false;
                    r.push(c);
                }
            }
        }
        Cow::Owned(r)
    } else {
        Cow::Borrowed(s)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn mutant_for_test(genre: Genre, replacement: &str) -> Mutant {
        Mutant {
            source_file: SourceFile::for_tests("src/lib.rs", "fn f() -> u32 { 1 + 2 }\n"),
            function: None,
            span: Span::quad(1, 17, 1, 22),
            short_replaced: None,
            genre,
            replacement: replacement.to_owned(),
        }
    }

    #[test]
    fn squash_lines_collapses_indentation() {
        assert_eq!(squash_lines("squash_lines a b c"), "squash_lines a b c");
        assert_eq!(squash_lines("a\n    b c \n\nd  \n  e"), "a b c d  e");
    }

    #[test]
    fn id_is_stable_for_identical_mutants() {
        let a = mutant_for_test(Genre::ArithmeticBinary, "-");
        let b = mutant_for_test(Genre::ArithmeticBinary, "-");
        assert_eq!(a.id(), b.id());
    }

    #[test]
    fn id_differs_by_replacement() {
        let a = mutant_for_test(Genre::ArithmeticBinary, "-");
        let b = mutant_for_test(Genre::ArithmeticBinary, "*");
        assert_ne!(a.id(), b.id());
    }

    #[test]
    fn genre_tag_is_snake_case() {
        assert_eq!(Genre::ArithmeticBinary.to_string(), "arithmetic_binary");
        assert_eq!(Genre::MatchArmGuard.to_string(), "match_arm_guard");
    }
}
