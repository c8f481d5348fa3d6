//! String capacity arithmetic.
//!
//! Assignments into `string<N>` are checked against the worst case the
//! value expression can produce: literal lengths exactly, other strings
//! by their declared capacity, concatenation by summing.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;
use cnx_resolver::types::TType;
use cnx_resolver::typing::TypeEnv;

use crate::{AnalysisContext, Analyzer};

pub struct StringCapacity;

impl Analyzer for StringCapacity {
    fn name(&self) -> &'static str {
        "string_capacity"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            let mut env = ctx.env_for(scope, decl);
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                let (capacity, value, name, span) = match stmt {
                    Stmt::Var(var) => {
                        env.declare(var);
                        let TypeExpr::String { capacity } = var.ty else {
                            return;
                        };
                        let Some(init) = &var.init else { return };
                        (capacity, init, var.name.name.clone(), var.span)
                    }
                    Stmt::Assign(assign) if assign.op == AssignOp::Set => {
                        let Some(TType::Str { capacity }) = env.type_of(&assign.target) else {
                            return;
                        };
                        let name = assign
                            .target
                            .root_ident()
                            .unwrap_or("<string>")
                            .to_string();
                        (capacity, &assign.value, name, assign.span)
                    }
                    _ => return,
                };
                if let Some(needed) = worst_case_len(ctx, &env, value) {
                    if needed > u64::from(capacity) {
                        diagnostics.push(ctx.diagnostic(
                            span,
                            diagnostic_codes::STRING_CAPACITY_EXCEEDED,
                            &[&needed.to_string(), &name, &capacity.to_string()],
                        ));
                    }
                }
            });
        });
        diagnostics
    }
}

/// Worst-case byte length a string-valued expression can produce,
/// excluding the terminator.
fn worst_case_len(ctx: &AnalysisContext<'_>, env: &TypeEnv<'_>, expr: &Expr) -> Option<u64> {
    match expr.unwrap_parens() {
        Expr::Str { span } => Some(u64::from(literal_len(span.slice(ctx.source)))),
        Expr::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
            ..
        } => {
            let l = worst_case_len(ctx, env, lhs)?;
            let r = worst_case_len(ctx, env, rhs)?;
            Some(l + r)
        }
        Expr::Slice { length, .. } => env.const_value(length).map(|len| len.unsigned_abs()),
        other => match env.type_of(other) {
            Some(TType::Str { capacity }) => Some(u64::from(capacity)),
            _ => None,
        },
    }
}

/// Length of a string literal's content (the token includes its quotes;
/// escapes collapse to one byte).
fn literal_len(token_text: &str) -> u32 {
    let inner = token_text
        .strip_prefix('"')
        .and_then(|rest| rest.strip_suffix('"'))
        .unwrap_or(token_text);
    let mut len = 0u32;
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            chars.next();
        }
        len += 1;
    }
    len
}
