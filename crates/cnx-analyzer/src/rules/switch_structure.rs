//! Switch exhaustiveness.
//!
//! Fallthrough is impossible by construction (every case ends in a brace
//! block; the parser enforces it). What remains to check: a switch over
//! an enum must cover every variant, either literally or through a
//! `default`. The counted `default(n)` form must name the exact number
//! of uncovered variants so coverage claims stay honest as enums grow.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;
use cnx_resolver::types::{TSymbol, TType};
use rustc_hash::FxHashSet;

use crate::{AnalysisContext, Analyzer};

pub struct SwitchStructure;

impl Analyzer for SwitchStructure {
    fn name(&self) -> &'static str {
        "switch_structure"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            let mut env = ctx.env_for(scope, decl);
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                if let Stmt::Var(var) = stmt {
                    env.declare(var);
                }
                let Stmt::Switch(switch) = stmt else {
                    return;
                };
                let Some(TType::Enum(enum_key)) = env.type_of(&switch.scrutinee) else {
                    return;
                };
                let Some(TSymbol::Enum(enum_symbol)) = ctx
                    .table
                    .get_cnx(&enum_key)
                    .or_else(|| ctx.table.get_foreign(&enum_key))
                else {
                    return;
                };

                let mut covered: FxHashSet<i64> = FxHashSet::default();
                for arm in &switch.arms {
                    for value in &arm.values {
                        if let Some(v) = env.const_value(value) {
                            covered.insert(v);
                        }
                    }
                }
                let uncovered = enum_symbol
                    .members
                    .values()
                    .filter(|v| !covered.contains(v))
                    .count();

                match &switch.default {
                    None if uncovered > 0 => {
                        diagnostics.push(ctx.diagnostic(
                            switch.span,
                            diagnostic_codes::SWITCH_NOT_EXHAUSTIVE,
                            &[&enum_key, &uncovered.to_string()],
                        ));
                    }
                    Some(default) => {
                        if let Some(allowed) = default.allowed_missing {
                            if uncovered != allowed as usize {
                                diagnostics.push(ctx.diagnostic(
                                    default.span,
                                    diagnostic_codes::DEFAULT_COUNT_MISMATCH,
                                    &[&allowed.to_string(), &uncovered.to_string()],
                                ));
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
