//! sizeof safety and variable-length arrays.
//!
//! `sizeof` on an array parameter measures a pointer (MISRA's classic
//! trap); side effects in the operand never run; and a local array whose
//! dimension is not a translation-time constant is a VLA.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;
use rustc_hash::FxHashSet;

use crate::{AnalysisContext, Analyzer};

pub struct SizeofSafety;

impl Analyzer for SizeofSafety {
    fn name(&self) -> &'static str {
        "sizeof_safety"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            let array_params: FxHashSet<&str> = decl
                .params
                .iter()
                .filter(|p| p.is_array)
                .map(|p| p.name.name.as_str())
                .collect();

            visit::for_each_expr_in_block(&decl.body, &mut |expr| {
                let Expr::Sizeof { arg, span } = expr else {
                    return;
                };
                let SizeofArg::Expr(operand) = arg else {
                    return;
                };
                if let Expr::Ident { name, .. } = operand.unwrap_parens() {
                    if array_params.contains(name.as_str()) {
                        diagnostics.push(ctx.diagnostic(
                            *span,
                            diagnostic_codes::SIZEOF_ARRAY_PARAMETER,
                            &[name],
                        ));
                        return;
                    }
                }
                let mut has_call = false;
                visit::for_each_expr(operand, &mut |inner| {
                    if matches!(inner, Expr::Call { .. }) {
                        has_call = true;
                    }
                });
                if has_call {
                    diagnostics.push(ctx.diagnostic(
                        *span,
                        diagnostic_codes::SIZEOF_SIDE_EFFECTS,
                        &[],
                    ));
                }
            });

            // VLA check on locals.
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                let Stmt::Var(var) = stmt else {
                    return;
                };
                for dim in &var.dims {
                    let constant = match dim {
                        Dimension::Literal(_) => true,
                        Dimension::Named(name) => match ctx.table.resolve(scope, name) {
                            Some((_, cnx_resolver::types::TSymbol::Variable(v))) => v.is_const,
                            _ => false,
                        },
                        Dimension::Scoped(segments) => match segments.as_slice() {
                            [enum_name, member] => {
                                match ctx.table.resolve(scope, enum_name) {
                                    Some((key, _)) => {
                                        ctx.table.enum_member(&key, member).is_some()
                                    }
                                    None => false,
                                }
                            }
                            _ => false,
                        },
                    };
                    if !constant {
                        diagnostics.push(ctx.diagnostic(
                            var.span,
                            diagnostic_codes::VARIABLE_LENGTH_ARRAY,
                            &[],
                        ));
                    }
                }
            });
        });
        diagnostics
    }
}
