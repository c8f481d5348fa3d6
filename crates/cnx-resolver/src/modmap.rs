//! The cross-file parameter-modification map.
//!
//! Maps a fully-mangled function name to the set of its parameter names
//! the body mutates. Populated by an analysis-only scan over every file
//! (stage 3), then refined per file during codegen (stage 5). A parameter
//! in nobody's set is inferred `const` in the generated signature.
//!
//! Files are scanned in topological order, so a callee's set is already
//! final when a caller passes a parameter through to it.

use cnx_parser::ast::*;
use cnx_parser::visit;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::table::SymbolTable;
use crate::types::{TSymbol, mangle};
use crate::typing::resolve_call_target;

#[derive(Debug, Default, Clone)]
pub struct ModificationMap {
    map: FxHashMap<String, FxHashSet<String>>,
}

impl ModificationMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, function: &str, param: &str) {
        self.map
            .entry(function.to_string())
            .or_default()
            .insert(param.to_string());
    }

    pub fn is_modified(&self, function: &str, param: &str) -> bool {
        self.map
            .get(function)
            .is_some_and(|params| params.contains(param))
    }

    pub fn modified_params(&self, function: &str) -> Option<&FxHashSet<String>> {
        self.map.get(function)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

/// Scan one unit, recording every parameter its functions mutate. Also
/// follows call arguments: passing a parameter into a callee position
/// that the callee mutates counts as a mutation here too.
pub fn scan_unit(unit: &SourceUnit, table: &SymbolTable, map: &mut ModificationMap) {
    visit::for_each_function(unit, &mut |scope, decl| {
        let mangled = mangle(scope, &decl.name.name);
        let params: FxHashSet<&str> = decl.params.iter().map(|p| p.name.name.as_str()).collect();

        visit::for_each_stmt(&decl.body, &mut |stmt| match stmt {
            Stmt::Assign(assign) => {
                if let Some(root) = assign.target.root_ident() {
                    if params.contains(root) {
                        map.record(&mangled, root);
                    }
                }
            }
            Stmt::For(for_stmt) => {
                if let Some(root) = for_stmt.step.target.root_ident() {
                    if params.contains(root) {
                        map.record(&mangled, root);
                    }
                }
            }
            _ => {}
        });

        // Pass-through mutations via calls.
        visit::for_each_expr_in_block(&decl.body, &mut |expr| {
            let Expr::Call { callee, args, .. } = expr else {
                return;
            };
            let Some(target) = resolve_call_target(table, scope, callee) else {
                return;
            };
            let callee_params: Vec<String> = match table.get_cnx(&target) {
                Some(TSymbol::Function(f)) => {
                    f.params.iter().map(|p| p.name.clone()).collect()
                }
                _ => return,
            };
            for (arg, callee_param) in args.iter().zip(&callee_params) {
                let Some(root) = arg.root_ident() else {
                    continue;
                };
                if params.contains(root) && map.is_modified(&target, callee_param) {
                    map.record(&mangled, root);
                }
            }
        });
    });
}

#[cfg(test)]
#[path = "tests/modmap_tests.rs"]
mod tests;
