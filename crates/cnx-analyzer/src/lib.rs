//! The analyzer framework.
//!
//! Analyzers encode the dialect's safety rules. Each receives the parse
//! tree, the token stream and a view of the symbol table, and returns a
//! list of diagnostics. They are registered in a fixed list and run in
//! registration order; they do not communicate except through the shared
//! context. Any error aborts codegen for the file.

pub mod rules;

use cnx_common::LineMap;
use cnx_common::Span;
use cnx_common::diagnostics::{Diagnostic, get_category, message};
use cnx_parser::ast::SourceUnit;
use cnx_resolver::SymbolTable;
use cnx_resolver::typing::TypeEnv;
use cnx_scanner::Token;

/// Everything an analyzer may look at.
pub struct AnalysisContext<'a> {
    pub unit: &'a SourceUnit,
    pub tokens: &'a [Token],
    pub source: &'a str,
    pub file: &'a str,
    pub line_map: &'a LineMap,
    pub table: &'a SymbolTable,
}

impl<'a> AnalysisContext<'a> {
    pub fn new(
        unit: &'a SourceUnit,
        tokens: &'a [Token],
        source: &'a str,
        line_map: &'a LineMap,
        table: &'a SymbolTable,
    ) -> Self {
        AnalysisContext {
            unit,
            tokens,
            source,
            file: &unit.path,
            line_map,
            table,
        }
    }

    /// Build a diagnostic at a span, with the registered severity for the
    /// code.
    pub fn diagnostic(&self, span: Span, code: u32, args: &[&str]) -> Diagnostic {
        let pos = self.line_map.position(span.start);
        Diagnostic {
            category: get_category(code),
            code,
            file: self.file.to_string(),
            line: pos.line,
            column: pos.column,
            message: message(code, args),
        }
    }

    /// A typing environment seeded with a function's parameters.
    pub fn env_for(
        &self,
        scope: &[String],
        decl: &cnx_parser::ast::FunctionDecl,
    ) -> TypeEnv<'a> {
        TypeEnv::with_function(self.table, scope, decl)
    }
}

/// One safety rule.
pub trait Analyzer {
    fn name(&self) -> &'static str;
    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic>;
}

/// The registered rule set, in execution order.
pub fn analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(rules::comment_rules::CommentRules),
        Box::new(rules::goto_ban::GotoBan),
        Box::new(rules::initialization::Initialization),
        Box::new(rules::call_order::CallOrder),
        Box::new(rules::recursion::Recursion),
        Box::new(rules::division::Division),
        Box::new(rules::narrowing::Narrowing),
        Box::new(rules::sizeof_safety::SizeofSafety),
        Box::new(rules::condition::BooleanCondition),
        Box::new(rules::switch_structure::SwitchStructure),
        Box::new(rules::nullability::Nullability),
        Box::new(rules::critical_section::CriticalSection),
        Box::new(rules::parameter_naming::ParameterNaming),
        Box::new(rules::slice_bounds::SliceBounds),
        Box::new(rules::string_capacity::StringCapacity),
    ]
}

/// Run every registered analyzer; diagnostics come back in the order
/// they were produced.
pub fn run_analyzers(ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for analyzer in analyzers() {
        let found = analyzer.check(ctx);
        if !found.is_empty() {
            tracing::debug!(
                analyzer = analyzer.name(),
                count = found.len(),
                "analyzer reported diagnostics"
            );
        }
        diagnostics.extend(found);
    }
    diagnostics
}
