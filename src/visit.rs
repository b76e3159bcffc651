// Copyright 2021-2025 Martin Pool

//! Walk the AST of a single source file to discover mutation opportunities.
//!
//! Which files to visit is decided by the source enumerator; this module's
//! job starts from one already-loaded [SourceFile] and produces every
//! [Mutant] the registered families can find in it.

use std::sync::Arc;

use proc_macro2::TokenStream;
use quote::{quote, ToTokens};
use syn::spanned::Spanned;
use syn::visit::Visit;
use syn::{BinOp, Block, Expr, ExprLit, Lit, ReturnType, Signature, UnOp};
use tracing::{debug, trace, trace_span};

use crate::ast::{attrs_excluded, block_is_empty};
use crate::fnvalue::return_type_replacements;
use crate::mutant::{Function, Genre, Mutant};
use crate::pretty::ToPrettyString;
use crate::source_file::SourceFile;
use crate::span::Span;

/// Find every mutant in one source file.
pub fn walk_file(source_file: &SourceFile, error_exprs: &[Expr]) -> anyhow::Result<Vec<Mutant>> {
    use anyhow::Context;
    let syn_file = syn::parse_str::<syn::File>(&source_file.code)
        .with_context(|| format!("parse {}", source_file.tree_relative_slashes()))?;
    let mut visitor = DiscoveryVisitor {
        error_exprs,
        mutants: Vec::new(),
        namespace_stack: Vec::new(),
        fn_stack: Vec::new(),
        source_file: source_file.clone(),
    };
    visitor.visit_file(&syn_file);
    visitor.mutants.sort_by(|a, b| {
        (a.span.start.line, a.span.start.column, a.genre_tag(), &a.replacement).cmp(&(
            b.span.start.line,
            b.span.start.column,
            b.genre_tag(),
            &b.replacement,
        ))
    });
    Ok(visitor.mutants)
}

/// For testing: parse and generate mutants from a source string, addressed
/// as `src/main.rs`.
#[cfg(test)]
pub fn mutate_source_str(code: &str) -> anyhow::Result<Vec<Mutant>> {
    let source_file = SourceFile::for_tests("src/main.rs", code);
    walk_file(&source_file, &[])
}

/// `syn` visitor that accumulates mutation opportunities found while walking
/// one file's AST.
struct DiscoveryVisitor<'o> {
    mutants: Vec<Mutant>,
    source_file: SourceFile,

    /// Names of the mods/impls/traits/fns we're currently nested inside,
    /// joined with `::` to build a fully qualified function name.
    namespace_stack: Vec<String>,

    /// The functions we're inside, innermost last.
    fn_stack: Vec<Arc<Function>>,

    /// Error expressions (from configuration) usable in `fn_value` mutants.
    error_exprs: &'o [Expr],
}

impl DiscoveryVisitor<'_> {
    fn enter_function(
        &mut self,
        function_name: &str,
        return_type: &ReturnType,
        span: proc_macro2::Span,
    ) -> Arc<Function> {
        self.namespace_stack.push(function_name.to_owned());
        let full_function_name = self.namespace_stack.join("::");
        let function = Arc::new(Function {
            function_name: full_function_name,
            return_type: return_type.to_pretty_string(),
            span: span.into(),
        });
        self.fn_stack.push(Arc::clone(&function));
        function
    }

    fn leave_function(&mut self, function: Arc<Function>) {
        self.namespace_stack
            .pop()
            .expect("namespace stack should not be empty");
        assert_eq!(self.fn_stack.pop(), Some(function), "function stack mismatch");
    }

    fn in_namespace<F, T>(&mut self, name: &str, f: F) -> T
    where
        F: FnOnce(&mut Self) -> T,
    {
        self.namespace_stack.push(name.to_owned());
        let r = f(self);
        assert_eq!(self.namespace_stack.pop().unwrap(), name);
        r
    }

    fn collect_mutant(&mut self, span: Span, replacement: &TokenStream, genre: Genre) {
        self.collect_mutant_with_short(span, None, replacement, genre);
    }

    fn collect_mutant_with_short(
        &mut self,
        span: Span,
        short_replaced: Option<String>,
        replacement: &TokenStream,
        genre: Genre,
    ) {
        self.mutants.push(Mutant {
            source_file: self.source_file.clone(),
            function: self.fn_stack.last().cloned(),
            span,
            short_replaced,
            replacement: replacement.to_pretty_string(),
            genre,
        });
    }

    fn collect_fn_mutants(&mut self, sig: &Signature, block: &Block) {
        let Some(function) = self.fn_stack.last().cloned() else {
            return;
        };
        let Some(body_span) = function_body_span(block) else {
            return;
        };
        let repls = return_type_replacements(&sig.output, self.error_exprs);
        if repls.is_empty() {
            debug!(
                function_name = function.function_name,
                return_type = function.return_type,
                "no fn_value mutants for this return type"
            );
            return;
        }
        let orig_block = block.to_token_stream().to_pretty_string();
        for rep in repls {
            let new_block = quote!( { #rep } ).to_token_stream().to_pretty_string();
            if orig_block == new_block {
                debug!("replacement is identical to the function body; skipping");
            } else {
                self.collect_mutant(body_span, &rep, Genre::FnValue);
            }
        }
    }
}

impl<'ast> Visit<'ast> for DiscoveryVisitor<'_> {
    fn visit_file(&mut self, i: &'ast syn::File) {
        if attrs_excluded(&i.attrs) {
            trace!("file excluded by attrs");
            return;
        }
        syn::visit::visit_file(self, i);
    }

    fn visit_item_fn(&mut self, i: &'ast syn::ItemFn) {
        let function_name = i.sig.ident.to_pretty_string();
        let _span = trace_span!("fn", name = function_name).entered();
        if fn_sig_excluded(&i.sig) || attrs_excluded(&i.attrs) || block_is_empty(&i.block) {
            return;
        }
        let function = self.enter_function(&function_name, &i.sig.output, i.span());
        self.collect_fn_mutants(&i.sig, &i.block);
        syn::visit::visit_item_fn(self, i);
        self.leave_function(function);
    }

    fn visit_impl_item_fn(&mut self, i: &'ast syn::ImplItemFn) {
        let function_name = i.sig.ident.to_pretty_string();
        let _span = trace_span!("fn", name = function_name).entered();
        if fn_sig_excluded(&i.sig)
            || attrs_excluded(&i.attrs)
            || i.sig.ident == "new"
            || block_is_empty(&i.block)
        {
            return;
        }
        let function = self.enter_function(&function_name, &i.sig.output, i.span());
        self.collect_fn_mutants(&i.sig, &i.block);
        syn::visit::visit_impl_item_fn(self, i);
        self.leave_function(function);
    }

    fn visit_trait_item_fn(&mut self, i: &'ast syn::TraitItemFn) {
        let function_name = i.sig.ident.to_pretty_string();
        let _span = trace_span!("fn", name = function_name).entered();
        if fn_sig_excluded(&i.sig) || attrs_excluded(&i.attrs) || i.sig.ident == "new" {
            return;
        }
        if let Some(block) = &i.default {
            if block_is_empty(block) {
                return;
            }
            let function = self.enter_function(&function_name, &i.sig.output, i.span());
            self.collect_fn_mutants(&i.sig, block);
            syn::visit::visit_trait_item_fn(self, i);
            self.leave_function(function);
        }
    }

    fn visit_item_impl(&mut self, i: &'ast syn::ItemImpl) {
        if attrs_excluded(&i.attrs) {
            return;
        }
        let type_name = i.self_ty.to_pretty_string();
        let name = if let Some((_, trait_path, _)) = &i.trait_ {
            if path_ends_with(trait_path, "Default") {
                // No viable alternative default to suggest.
                return;
            }
            format!(
                "<impl {trait} for {type_name}>",
                trait = trait_path.to_pretty_string()
            )
        } else {
            type_name
        };
        self.in_namespace(&name, |v| syn::visit::visit_item_impl(v, i));
    }

    fn visit_item_trait(&mut self, i: &'ast syn::ItemTrait) {
        if attrs_excluded(&i.attrs) {
            return;
        }
        let name = i.ident.to_pretty_string();
        self.in_namespace(&name, |v| syn::visit::visit_item_trait(v, i));
    }

    fn visit_item_mod(&mut self, node: &'ast syn::ItemMod) {
        if attrs_excluded(&node.attrs) {
            trace!("mod excluded by attrs");
            return;
        }
        let mod_name = node.ident.to_string();
        self.in_namespace(&mod_name, |v| syn::visit::visit_item_mod(v, node));
    }

    /// `a ⊕ b`: the arithmetic and conditional binary families, plus logical swap.
    fn visit_expr_binary(&mut self, i: &'ast syn::ExprBinary) {
        if attrs_excluded(&i.attrs) {
            return;
        }
        let op_span: Span = i.op.span().into();
        let (genre, replacements): (Genre, Vec<TokenStream>) = match i.op {
            BinOp::Add(_) => (
                Genre::ArithmeticBinary,
                vec![quote! {-}, quote! {*}, quote! {/}, quote! {%}],
            ),
            BinOp::Sub(_) => (
                Genre::ArithmeticBinary,
                vec![quote! {+}, quote! {*}, quote! {/}, quote! {%}],
            ),
            BinOp::Mul(_) => (
                Genre::ArithmeticBinary,
                vec![quote! {+}, quote! {-}, quote! {/}, quote! {%}],
            ),
            BinOp::Div(_) => (
                Genre::ArithmeticBinary,
                vec![quote! {+}, quote! {-}, quote! {*}, quote! {%}],
            ),
            BinOp::Rem(_) => (
                Genre::ArithmeticBinary,
                vec![quote! {+}, quote! {-}, quote! {*}, quote! {/}],
            ),
            BinOp::Lt(_) => (
                Genre::ConditionalBinary,
                vec![quote! {<=}, quote! {>}, quote! {>=}, quote! {==}, quote! {!=}],
            ),
            BinOp::Le(_) => (
                Genre::ConditionalBinary,
                vec![quote! {<}, quote! {>}, quote! {>=}, quote! {==}, quote! {!=}],
            ),
            BinOp::Gt(_) => (
                Genre::ConditionalBinary,
                vec![quote! {<}, quote! {<=}, quote! {>=}, quote! {==}, quote! {!=}],
            ),
            BinOp::Ge(_) => (
                Genre::ConditionalBinary,
                vec![quote! {<}, quote! {<=}, quote! {>}, quote! {==}, quote! {!=}],
            ),
            BinOp::Eq(_) => (
                Genre::ConditionalBinary,
                vec![quote! {<}, quote! {<=}, quote! {>}, quote! {>=}, quote! {!=}],
            ),
            BinOp::Ne(_) => (
                Genre::ConditionalBinary,
                vec![quote! {<}, quote! {<=}, quote! {>}, quote! {>=}, quote! {==}],
            ),
            BinOp::And(_) => (Genre::LogicalBinary, vec![quote! {||}]),
            BinOp::Or(_) => (Genre::LogicalBinary, vec![quote! {&&}]),
            BinOp::AddAssign(_) => {
                for m in self.arithmetic_incdec_mutants(op_span, &i.left, &i.right, "-=") {
                    self.mutants.push(m);
                }
                (
                    Genre::ArithmeticAssign,
                    vec![quote! {-=}, quote! {*=}, quote! {/=}],
                )
            }
            BinOp::SubAssign(_) => {
                for m in self.arithmetic_incdec_mutants(op_span, &i.left, &i.right, "+=") {
                    self.mutants.push(m);
                }
                (
                    Genre::ArithmeticAssign,
                    vec![quote! {+=}, quote! {*=}, quote! {/=}],
                )
            }
            BinOp::MulAssign(_) => (
                Genre::ArithmeticAssign,
                vec![quote! {+=}, quote! {-=}, quote! {/=}],
            ),
            BinOp::DivAssign(_) => (
                Genre::ArithmeticAssign,
                vec![quote! {+=}, quote! {-=}, quote! {*=}],
            ),
            _ => {
                trace!(op = i.op.to_pretty_string(), "no mutants for this operator");
                (Genre::ArithmeticBinary, Vec::new())
            }
        };
        for rep in &replacements {
            self.collect_mutant(op_span, rep, genre);
        }
        syn::visit::visit_expr_binary(self, i);
    }

    fn visit_expr_unary(&mut self, i: &'ast syn::ExprUnary) {
        if attrs_excluded(&i.attrs) {
            return;
        }
        match i.op {
            UnOp::Not(_) | UnOp::Neg(_) => {
                self.collect_mutant(i.op.span().into(), &quote! {}, Genre::UnaryOperator);
            }
            _ => trace!(op = i.op.to_pretty_string(), "no mutants for this unary op"),
        }
        syn::visit::visit_expr_unary(self, i);
    }

    /// `if cond { .. }` → `if !cond { .. }`.
    fn visit_expr_if(&mut self, i: &'ast syn::ExprIf) {
        if attrs_excluded(&i.attrs) {
            return;
        }
        let cond: &Expr = &i.cond;
        let cond_span: Span = cond.span().into();
        self.collect_mutant(cond_span, &quote! { !(#cond) }, Genre::NegateConditional);
        syn::visit::visit_expr_if(self, i);
    }

    /// `return N` for an integer literal N → `return N+1`, `return N-1`, `return 0`.
    fn visit_expr_return(&mut self, i: &'ast syn::ExprReturn) {
        if attrs_excluded(&i.attrs) {
            return;
        }
        if let Some(expr) = &i.expr {
            if let Expr::Lit(ExprLit {
                lit: Lit::Int(lit_int),
                ..
            }) = expr.as_ref()
            {
                if let Ok(n) = lit_int.base10_parse::<i128>() {
                    let span: Span = expr.span().into();
                    let suffix = lit_int.suffix();
                    let fmt = |v: i128| -> TokenStream {
                        let text = format!("{v}{suffix}");
                        text.parse().expect("format integer literal")
                    };
                    for v in [n + 1, n - 1, 0] {
                        if v != n {
                            self.collect_mutant(span, &fmt(v), Genre::ReturnBoundary);
                        }
                    }
                }
            }
        }
        syn::visit::visit_expr_return(self, i);
    }

    fn visit_expr_match(&mut self, i: &'ast syn::ExprMatch) {
        if attrs_excluded(&i.attrs) {
            trace!("match excluded by attrs");
            return;
        }
        let has_catchall = i
            .arms
            .iter()
            .any(|arm| matches!(arm.pat, syn::Pat::Wild(_)));
        if has_catchall {
            i.arms
                .iter()
                .filter(|arm| !matches!(arm.pat, syn::Pat::Wild(_)) && arm.guard.is_none())
                .for_each(|arm| {
                    let short = arm.pat.to_pretty_string();
                    self.collect_mutant_with_short(
                        arm.span().into(),
                        Some(short),
                        &quote! { unreachable!() },
                        Genre::MatchArm,
                    );
                });
        } else {
            trace!("match has no `_` pattern");
        }

        i.arms
            .iter()
            .flat_map(|arm| &arm.guard)
            .for_each(|(_if, guard_expr)| {
                let span: Span = guard_expr.span().into();
                self.collect_mutant(span, &quote! { true }, Genre::MatchArmGuard);
                self.collect_mutant(span, &quote! { false }, Genre::MatchArmGuard);
            });

        syn::visit::visit_expr_match(self, i);
    }
}

impl DiscoveryVisitor<'_> {
    /// `x += 1` / `x -= 1`: the narrower "counter" swap, distinct from the
    /// general `arithmetic_assign` permutation table.
    fn arithmetic_incdec_mutants(
        &self,
        op_span: Span,
        _left: &Expr,
        right: &Expr,
        replacement: &str,
    ) -> Vec<Mutant> {
        let is_one = matches!(
            right,
            Expr::Lit(ExprLit { lit: Lit::Int(n), .. }) if n.base10_digits() == "1"
        );
        if !is_one {
            return Vec::new();
        }
        let replacement_tokens: TokenStream = replacement.parse().expect("parse operator");
        vec![Mutant {
            source_file: self.source_file.clone(),
            function: self.fn_stack.last().cloned(),
            span: op_span,
            short_replaced: None,
            replacement: replacement_tokens.to_pretty_string(),
            genre: Genre::ArithmeticIncDec,
        }]
    }
}

/// The span of a block's contents, excluding the braces; `None` if empty.
fn function_body_span(block: &Block) -> Option<Span> {
    Some(Span {
        start: block.stmts.first()?.span().start().into(),
        end: block.stmts.last()?.span().end().into(),
    })
}

/// True if the function's signature means it should be excluded, e.g. `unsafe fn`.
fn fn_sig_excluded(sig: &syn::Signature) -> bool {
    if sig.unsafety.is_some() {
        trace!("skip unsafe fn");
        true
    } else {
        false
    }
}

/// True if the path ends with this identifier, ignoring which module or type it's in.
fn path_ends_with(path: &syn::Path, ident: &str) -> bool {
    path.segments.last().is_some_and(|s| s.ident == ident)
}

#[cfg(test)]
mod test {
    use indoc::indoc;
    use itertools::Itertools;

    use super::*;

    #[test]
    fn no_mutants_equivalent_to_source() {
        let code = indoc! { "
            fn always_true() -> bool { true }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let names = mutants.iter().map(|m| m.name(false)).collect_vec();
        assert_eq!(
            names,
            ["src/main.rs: replace always_true -> bool with false"]
        );
    }

    #[test]
    fn arithmetic_binary_is_full_permutation() {
        let code = indoc! {"
            fn f(a: i32, b: i32) -> i32 { a + b }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let arith = mutants
            .iter()
            .filter(|m| m.genre == Genre::ArithmeticBinary)
            .map(|m| m.replacement.clone())
            .collect_vec();
        assert_eq!(arith, ["-", "*", "/", "%"]);
    }

    #[test]
    fn conditional_binary_is_full_permutation() {
        let code = indoc! {"
            fn f(a: i32, b: i32) -> bool { a > b }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let cond = mutants
            .iter()
            .filter(|m| m.genre == Genre::ConditionalBinary)
            .map(|m| m.replacement.clone())
            .collect_vec();
        assert_eq!(cond, ["<", "<=", ">=", "==", "!="]);
    }

    #[test]
    fn logical_binary_swaps() {
        let code = indoc! {"
            fn f(a: bool, b: bool) -> bool { a && b }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let logical = mutants
            .iter()
            .filter(|m| m.genre == Genre::LogicalBinary)
            .map(|m| m.replacement.clone())
            .collect_vec();
        assert_eq!(logical, ["||"]);
    }

    #[test]
    fn negate_conditional_wraps_the_condition() {
        let code = indoc! {"
            fn f(a: bool) -> i32 {
                if a {
                    1
                } else {
                    2
                }
            }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let negate = mutants
            .iter()
            .find(|m| m.genre == Genre::NegateConditional)
            .unwrap();
        assert_eq!(negate.replacement, "!(a)");
    }

    #[test]
    fn return_boundary_on_integer_literal() {
        let code = indoc! {"
            fn f() -> i32 {
                return 5;
            }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let repls = mutants
            .iter()
            .filter(|m| m.genre == Genre::ReturnBoundary)
            .map(|m| m.replacement.clone())
            .collect_vec();
        assert_eq!(repls, ["6", "4", "0"]);
    }

    #[test]
    fn arithmetic_incdec_swaps_counter_step() {
        let code = indoc! {"
            fn f(x: &mut i32) {
                *x += 1;
            }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let incdec = mutants
            .iter()
            .filter(|m| m.genre == Genre::ArithmeticIncDec)
            .map(|m| m.replacement.clone())
            .collect_vec();
        assert_eq!(incdec, ["-="]);
    }

    #[test]
    fn mutate_match_arms_with_fallback() {
        let code = indoc! {"
            fn main() {
                match x {
                    X::A => {},
                    X::B => {},
                    _ => {},
                }
            }
        "};
        let mutants = mutate_source_str(code).unwrap();
        assert_eq!(
            mutants
                .iter()
                .filter(|m| m.genre == Genre::MatchArm)
                .map(|m| m.name(true))
                .collect_vec(),
            [
                "src/main.rs:3:9: delete match arm X::A",
                "src/main.rs:4:9: delete match arm X::B",
            ]
        );
    }

    #[test]
    fn skip_match_arms_without_fallback() {
        let code = indoc! {"
            fn main() {
                match x {
                    X::A => {},
                    X::B => {},
                }
            }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let empty: &[&str] = &[];
        assert_eq!(
            mutants
                .iter()
                .filter(|m| m.genre == Genre::MatchArm)
                .map(|m| m.name(true))
                .collect_vec(),
            empty
        );
    }

    #[test]
    fn mutate_match_guard() {
        let code = indoc! {"
            fn main() {
                match x {
                    X::A if foo() => {},
                    X::B => {},
                }
            }
        "};
        let mutants = mutate_source_str(code).unwrap();
        assert_eq!(
            mutants
                .iter()
                .filter(|m| m.genre == Genre::MatchArmGuard)
                .map(|m| m.name(true))
                .collect_vec(),
            [
                "src/main.rs:3:17: replace match guard with true",
                "src/main.rs:3:17: replace match guard with false",
            ]
        );
    }

    #[test]
    fn always_skip_constructors_called_new() {
        let code = indoc! { r"
            struct S {
                x: i32,
            }

            impl S {
                fn new(x: i32) -> Self {
                    Self { x }
                }
            }
        " };
        let mutants = mutate_source_str(code).unwrap();
        assert_eq!(mutants, []);
    }

    #[test]
    fn unary_operator_deletes_not_and_neg() {
        let code = indoc! {"
            fn f(a: bool, b: i32) -> (bool, i32) {
                (!a, -b)
            }
        "};
        let mutants = mutate_source_str(code).unwrap();
        let unary = mutants
            .iter()
            .filter(|m| m.genre == Genre::UnaryOperator)
            .count();
        assert_eq!(unary, 2);
    }
}
