//! Narrowing and sign-conversion safety.
//!
//! Any assignment or initialization from a wider integer type to a
//! narrower one, or across signedness, is rejected unless routed through
//! bit-extraction syntax (`value[0, 8]`), which is untyped and fits any
//! destination. Literals are range-checked against the destination
//! instead.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;
use cnx_resolver::typing::TypeEnv;
use cnx_resolver::types::TType;

use crate::{AnalysisContext, Analyzer};

pub struct Narrowing;

impl Analyzer for Narrowing {
    fn name(&self) -> &'static str {
        "narrowing"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            let mut env = ctx.env_for(scope, decl);
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                match stmt {
                    Stmt::Var(var) => {
                        env.declare(var);
                        if let Some(init) = &var.init {
                            let target = env.resolve_type_expr(&var.ty);
                            check_assignment(ctx, &env, &target, init, var.span, &mut diagnostics);
                        }
                    }
                    Stmt::Assign(assign) if assign.op == AssignOp::Set => {
                        if let Some(target) = env.type_of(&assign.target) {
                            check_assignment(
                                ctx,
                                &env,
                                &target,
                                &assign.value,
                                assign.span,
                                &mut diagnostics,
                            );
                        }
                    }
                    _ => {}
                }
            });
        });
        diagnostics
    }
}

fn check_assignment(
    ctx: &AnalysisContext<'_>,
    env: &TypeEnv<'_>,
    target: &TType,
    value: &Expr,
    span: cnx_common::Span,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(target_prim) = target.as_primitive() else {
        return;
    };
    if !target_prim.is_integer() {
        return;
    }

    match env.type_of(value) {
        None => {
            // Untyped: literal, bit extraction, or slice. Range-check
            // literals; extractions are the sanctioned escape.
            if let Some(constant) = env.const_value(value) {
                if !literal_fits(constant, target_prim) {
                    diagnostics.push(ctx.diagnostic(
                        span,
                        diagnostic_codes::LITERAL_OUT_OF_RANGE,
                        &[&constant.to_string(), target_prim.cnx_name()],
                    ));
                }
            }
        }
        Some(value_ty) => {
            let Some(value_prim) = value_ty.as_primitive() else {
                return;
            };
            if !value_prim.is_integer() {
                return;
            }
            if value_prim.bit_width() > target_prim.bit_width() {
                diagnostics.push(ctx.diagnostic(
                    span,
                    diagnostic_codes::NARROWING,
                    &[value_prim.cnx_name(), target_prim.cnx_name()],
                ));
            } else if value_prim.is_signed() != target_prim.is_signed() {
                diagnostics.push(ctx.diagnostic(
                    span,
                    diagnostic_codes::SIGN_CONVERSION,
                    &[value_prim.cnx_name(), target_prim.cnx_name()],
                ));
            }
        }
    }
}

fn literal_fits(value: i64, target: Primitive) -> bool {
    match target {
        Primitive::U8 => (0..=0xFF).contains(&value),
        Primitive::U16 => (0..=0xFFFF).contains(&value),
        Primitive::U32 | Primitive::Usize => (0..=0xFFFF_FFFF).contains(&value),
        Primitive::U64 => value >= 0,
        Primitive::I8 => (-128..=127).contains(&value),
        Primitive::I16 => (-32768..=32767).contains(&value),
        Primitive::I32 | Primitive::Isize => {
            (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&value)
        }
        Primitive::I64 => true,
        _ => true,
    }
}
