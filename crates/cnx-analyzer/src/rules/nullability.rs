//! Null safety.
//!
//! NULL may only appear as a comparison operand, only against variables
//! whose name carries the `c_` pointer prefix, and the heap never opens:
//! `malloc`/`free`/`fopen` and their relatives do not exist in C-Next.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;
use rustc_hash::FxHashSet;

use crate::{AnalysisContext, Analyzer};

const HEAP_FUNCTIONS: &[&str] = &[
    "malloc", "calloc", "realloc", "free", "fopen", "fclose", "strdup", "alloca",
];

pub struct Nullability;

impl Analyzer for Nullability {
    fn name(&self) -> &'static str {
        "nullability"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |_, decl| {
            // First sweep: NULLs sanctioned by a comparison context, and
            // the name check on whatever they compare against.
            let mut sanctioned: FxHashSet<(u32, u32)> = FxHashSet::default();
            visit::for_each_expr_in_block(&decl.body, &mut |expr| {
                let Expr::Binary { op, lhs, rhs, span } = expr else {
                    return;
                };
                if !matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
                    return;
                }
                let (null_side, other) = match (lhs.unwrap_parens(), rhs.unwrap_parens()) {
                    (Expr::Null { span }, other) => (Some(*span), other),
                    (other, Expr::Null { span }) => (Some(*span), other),
                    _ => (None, lhs.unwrap_parens()),
                };
                let Some(null_span) = null_side else {
                    return;
                };
                sanctioned.insert((null_span.start, null_span.end));
                match other.root_ident() {
                    Some(name) if name.starts_with("c_") => {}
                    _ => {
                        diagnostics.push(ctx.diagnostic(
                            *span,
                            diagnostic_codes::NULL_COMPARE_NAME,
                            &[],
                        ));
                    }
                }
            });

            // Second sweep: NULLs outside any comparison, and heap calls.
            visit::for_each_expr_in_block(&decl.body, &mut |expr| {
                match expr {
                    Expr::Null { span } => {
                        if !sanctioned.contains(&(span.start, span.end)) {
                            diagnostics.push(ctx.diagnostic(
                                *span,
                                diagnostic_codes::NULL_OUTSIDE_COMPARISON,
                                &[],
                            ));
                        }
                    }
                    Expr::Call { callee, span, .. } => {
                        if let Some(path) = callee.as_path() {
                            if let Some(last) = path.last() {
                                if HEAP_FUNCTIONS.contains(last) {
                                    diagnostics.push(ctx.diagnostic(
                                        *span,
                                        diagnostic_codes::HEAP_FUNCTION_FORBIDDEN,
                                        &[last],
                                    ));
                                }
                            }
                        }
                    }
                    _ => {}
                }
            });
        });
        diagnostics
    }
}
