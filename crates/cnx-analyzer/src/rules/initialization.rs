//! Reads must be dominated by a declaration.
//!
//! Every local declaration zero-initializes (the generator emits `= 0`
//! for locals without an explicit initializer), so the only way to read
//! an indeterminate value is to reference a local textually above its
//! declaration while shadowing nothing that would resolve instead.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::*;
use cnx_parser::visit;
use rustc_hash::FxHashSet;

use crate::{AnalysisContext, Analyzer};

pub struct Initialization;

impl Analyzer for Initialization {
    fn name(&self) -> &'static str {
        "initialization"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            // Names this function will declare somewhere.
            let mut declared_anywhere = FxHashSet::default();
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                if let Stmt::Var(var) = stmt {
                    declared_anywhere.insert(var.name.name.clone());
                }
            });

            let mut live: FxHashSet<String> =
                decl.params.iter().map(|p| p.name.name.clone()).collect();

            visit::for_each_stmt(&decl.body, &mut |stmt| {
                // Check reads before recording this statement's own
                // declaration, so `u8 x <- x;` still trips.
                visit::exprs_of_stmt(stmt, &mut |expr| {
                    if let Expr::Ident { name, span } = expr {
                        let local_later = declared_anywhere.contains(name) && !live.contains(name);
                        let resolves_globally = ctx.table.resolve(scope, name).is_some();
                        if local_later && !resolves_globally {
                            diagnostics.push(ctx.diagnostic(
                                *span,
                                diagnostic_codes::READ_BEFORE_DECLARATION,
                                &[name],
                            ));
                        }
                    }
                });
                if let Stmt::Var(var) = stmt {
                    live.insert(var.name.name.clone());
                }
            });
        });
        diagnostics
    }
}
