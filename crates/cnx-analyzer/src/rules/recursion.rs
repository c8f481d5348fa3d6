//! Recursion is rejected, direct and mutual (MISRA 17.2). Stack depth on
//! the targets this translator serves is not negotiable.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::ast::Expr;
use cnx_parser::visit;
use cnx_resolver::types::mangle;
use cnx_resolver::typing::resolve_call_target;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::{AnalysisContext, Analyzer};

pub struct Recursion;

impl Analyzer for Recursion {
    fn name(&self) -> &'static str {
        "recursion"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        // Call graph restricted to this file's functions.
        let mut graph: FxHashMap<String, Vec<(String, cnx_common::Span)>> = FxHashMap::default();
        let mut order: Vec<String> = Vec::new();

        visit::for_each_function(ctx.unit, &mut |scope, decl| {
            let caller = mangle(scope, &decl.name.name);
            let mut edges = Vec::new();
            visit::for_each_expr_in_block(&decl.body, &mut |expr| {
                if let Expr::Call { callee, span, .. } = expr {
                    if let Some(target) = resolve_call_target(ctx.table, scope, callee) {
                        edges.push((target, *span));
                    }
                }
            });
            order.push(caller.clone());
            graph.insert(caller, edges);
        });

        for caller in &order {
            for (target, span) in &graph[caller] {
                if target == caller {
                    diagnostics.push(ctx.diagnostic(
                        *span,
                        diagnostic_codes::RECURSION,
                        &[caller],
                    ));
                } else if reaches(&graph, target, caller) {
                    diagnostics.push(ctx.diagnostic(
                        *span,
                        diagnostic_codes::MUTUAL_RECURSION,
                        &[caller, target],
                    ));
                }
            }
        }
        diagnostics
    }
}

/// Is `to` reachable from `from` along call edges?
fn reaches(graph: &FxHashMap<String, Vec<(String, cnx_common::Span)>>, from: &str, to: &str) -> bool {
    let mut seen = FxHashSet::default();
    let mut stack = vec![from.to_string()];
    while let Some(current) = stack.pop() {
        if current == to {
            return true;
        }
        if !seen.insert(current.clone()) {
            continue;
        }
        if let Some(edges) = graph.get(&current) {
            for (next, _) in edges {
                stack.push(next.clone());
            }
        }
    }
    false
}
