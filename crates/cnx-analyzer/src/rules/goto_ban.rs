//! `goto` is not part of C-Next (MISRA 15.1).

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::Stmt;
use cnx_parser::visit;

use crate::{AnalysisContext, Analyzer};

pub struct GotoBan;

impl Analyzer for GotoBan {
    fn name(&self) -> &'static str {
        "goto_ban"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |_, decl| {
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                if let Stmt::Goto(goto) = stmt {
                    diagnostics.push(ctx.diagnostic(
                        goto.span,
                        diagnostic_codes::GOTO_FORBIDDEN,
                        &[],
                    ));
                }
            });
        });
        diagnostics
    }
}
