//! Conditions must be boolean-typed.
//!
//! `if`/`while`/`do-while`/ternary conditions must be comparisons,
//! logical expressions or `bool` values. A bare `=` between non-bool
//! operands is almost always a mistyped assignment and is rejected even
//! though its operands would compare; bools compare freely.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;
use cnx_resolver::typing::TypeEnv;

use crate::{AnalysisContext, Analyzer};

pub struct BooleanCondition;

impl Analyzer for BooleanCondition {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            let mut env = ctx.env_for(scope, decl);
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                if let Stmt::Var(var) = stmt {
                    env.declare(var);
                }
                let conds: Vec<&Expr> = match stmt {
                    Stmt::If(s) => visit::chain_conditions(s),
                    Stmt::While(s) => vec![&s.cond],
                    Stmt::DoWhile(s) => vec![&s.cond],
                    Stmt::For(s) => vec![&s.cond],
                    _ => Vec::new(),
                };
                for cond in conds {
                    check_condition(ctx, &env, cond, &mut diagnostics);
                }
                // Ternary conditions anywhere in the statement.
                visit::exprs_of_stmt(stmt, &mut |expr| {
                    if let Expr::Ternary { cond, .. } = expr {
                        check_condition(ctx, &env, cond, &mut diagnostics);
                    }
                });
            });
        });
        diagnostics
    }
}

fn check_condition(
    ctx: &AnalysisContext<'_>,
    env: &TypeEnv<'_>,
    cond: &Expr,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let stripped = cond.unwrap_parens();

    // `if (a = b)` with non-bool operands: suspected assignment intent.
    if let Expr::Binary {
        op: BinaryOp::Eq,
        lhs,
        rhs,
        span,
    } = stripped
    {
        let lhs_bool = env.type_of(lhs).is_some_and(|t| t.is_bool());
        let rhs_bool = env.type_of(rhs).is_some_and(|t| t.is_bool());
        let rhs_is_null = matches!(rhs.unwrap_parens(), Expr::Null { .. });
        let lhs_is_null = matches!(lhs.unwrap_parens(), Expr::Null { .. });
        if !lhs_bool && !rhs_bool && !rhs_is_null && !lhs_is_null {
            diagnostics.push(ctx.diagnostic(
                *span,
                diagnostic_codes::CONDITION_NOT_BOOLEAN,
                &[],
            ));
        }
        return;
    }

    match env.type_of(stripped) {
        Some(ty) if ty.is_bool() => {}
        _ => {
            diagnostics.push(ctx.diagnostic(
                stripped.span(),
                diagnostic_codes::CONDITION_NOT_BOOLEAN,
                &[],
            ));
        }
    }
}
