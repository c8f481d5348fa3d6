//! Division safety: a divisor that is provably zero is rejected, and a
//! divisor that cannot be proven non-zero requires the opt-in
//! `safe_div` / `safe_mod` forms.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;

use crate::{AnalysisContext, Analyzer};

pub struct Division;

impl Analyzer for Division {
    fn name(&self) -> &'static str {
        "division"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            let mut env = ctx.env_for(scope, decl);
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                if let Stmt::Var(var) = stmt {
                    env.declare(var);
                }
                visit::exprs_of_stmt(stmt, &mut |expr| {
                    let Expr::Binary { op, rhs, span, .. } = expr else {
                        return;
                    };
                    let divides = matches!(
                        op,
                        BinaryOp::Div | BinaryOp::Mod | BinaryOp::SafeDiv | BinaryOp::SafeMod
                    );
                    if !divides {
                        return;
                    }
                    match env.const_value(rhs) {
                        Some(0) => {
                            diagnostics.push(ctx.diagnostic(
                                *span,
                                diagnostic_codes::DIVISION_BY_ZERO,
                                &[],
                            ));
                        }
                        Some(_) => {}
                        None => {
                            if matches!(op, BinaryOp::Div | BinaryOp::Mod) {
                                diagnostics.push(ctx.diagnostic(
                                    *span,
                                    diagnostic_codes::RUNTIME_DIVISOR,
                                    &[],
                                ));
                            }
                        }
                    }
                });
            });
        });

        // Divisions in global initializers.
        visit::for_each_item(ctx.unit, &mut |scope, item| {
            let Item::Variable(var) = item else {
                return;
            };
            let Some(init) = &var.init else {
                return;
            };
            let env = cnx_resolver::typing::TypeEnv::new(ctx.table, scope);
            visit::for_each_expr(init, &mut |expr| {
                if let Expr::Binary { op, rhs, span, .. } = expr {
                    if matches!(op, BinaryOp::Div | BinaryOp::Mod)
                        && env.const_value(rhs) == Some(0)
                    {
                        diagnostics.push(ctx.diagnostic(
                            *span,
                            diagnostic_codes::DIVISION_BY_ZERO,
                            &[],
                        ));
                    }
                }
            });
        });
        diagnostics
    }
}
