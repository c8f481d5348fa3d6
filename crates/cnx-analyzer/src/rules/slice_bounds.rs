//! Slice bounds.
//!
//! `a[offset, length]` requires translation-time constant operands, and
//! the range must fit inside the declared capacity: the array dimension,
//! the string capacity, or the scalar's bit width.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;
use cnx_resolver::types::{ArrayDimension, TType};
use cnx_resolver::typing::TypeEnv;

use crate::{AnalysisContext, Analyzer};

pub struct SliceBounds;

impl Analyzer for SliceBounds {
    fn name(&self) -> &'static str {
        "slice_bounds"
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
                    let Expr::Slice {
                        base,
                        offset,
                        length,
                        span,
                    } = expr
                    else {
                        return;
                    };
                    let (Some(off), Some(len)) =
                        (env.const_value(offset), env.const_value(length))
                    else {
                        diagnostics.push(ctx.diagnostic(
                            *span,
                            diagnostic_codes::SLICE_NOT_CONST,
                            &[],
                        ));
                        return;
                    };
                    if off < 0 || len < 0 {
                        diagnostics.push(ctx.diagnostic(
                            *span,
                            diagnostic_codes::SLICE_NOT_CONST,
                            &[],
                        ));
                        return;
                    }
                    let capacity: Option<u64> = match env.type_of(base) {
                        Some(TType::Array { dims, .. }) => match dims.first() {
                            Some(ArrayDimension::Fixed(n)) => Some(*n),
                            _ => None,
                        },
                        Some(TType::Str { capacity }) => Some(u64::from(capacity)),
                        Some(ref ty) if ty.is_integer() => {
                            ty.as_primitive().map(|p| u64::from(p.bit_width()))
                        }
                        _ => None,
                    };
                    if let Some(capacity) = capacity {
                        let end = off.unsigned_abs() + len.unsigned_abs();
                        if end > capacity {
                            let name = base.root_ident().unwrap_or("<expr>").to_string();
                            diagnostics.push(ctx.diagnostic(
                                *span,
                                diagnostic_codes::SLICE_OUT_OF_BOUNDS,
                                &[&off.to_string(), &len.to_string(), &name],
                            ));
                        }
                    }
                });
            });
        });
        diagnostics
    }
}
