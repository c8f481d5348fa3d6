//! Define-before-use for calls: a call whose callee is declared below
//! the caller in the same file is rejected.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::Expr;
use cnx_parser::visit;
use cnx_resolver::types::TSymbol;
use cnx_resolver::typing::resolve_call_target;

use crate::{AnalysisContext, Analyzer};

pub struct CallOrder;

impl Analyzer for CallOrder {
    fn name(&self) -> &'static str {
        "call_order"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            let caller_line = ctx.line_map.line_of(decl.span.start);
            visit::for_each_expr_in_block(&decl.body, &mut |expr| {
                let Expr::Call { callee, span, .. } = expr else {
                    return;
                };
                let Some(target) = resolve_call_target(ctx.table, scope, callee) else {
                    return;
                };
                if let Some(TSymbol::Function(f)) = ctx.table.get_cnx(&target) {
                    if f.common.source_file == ctx.file && f.common.source_line > caller_line {
                        diagnostics.push(ctx.diagnostic(
                            *span,
                            diagnostic_codes::CALL_BEFORE_DECLARATION,
                            &[&target],
                        ));
                    }
                }
            });
        });
        diagnostics
    }
}
