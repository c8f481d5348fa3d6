//! `return` inside a `critical { }` block would strand interrupts
//! disabled; the restore at the end of the block never runs.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::Stmt;
use cnx_parser::visit;

use crate::{AnalysisContext, Analyzer};

pub struct CriticalSection;

impl Analyzer for CriticalSection {
    fn name(&self) -> &'static str {
        "critical_section"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |_, decl| {
            visit::for_each_stmt(&decl.body, &mut |stmt| {
                let Stmt::Critical(block) = stmt else {
                    return;
                };
                visit::for_each_stmt(block, &mut |inner| {
                    if let Stmt::Return(ret) = inner {
                        diagnostics.push(ctx.diagnostic(
                            ret.span,
                            diagnostic_codes::RETURN_IN_CRITICAL,
                            &[],
                        ));
                    }
                });
            });
        });
        diagnostics
    }
}
