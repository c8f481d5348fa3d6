//! A parameter may not begin with the enclosing function's name; the
//! mangled output would shadow confusingly.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_parser::visit;

use crate::{AnalysisContext, Analyzer};

pub struct ParameterNaming;

impl Analyzer for ParameterNaming {
    fn name(&self) -> &'static str {
        "parameter_naming"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        visit::for_each_function(ctx.unit, &mut |_, decl| {
            for param in &decl.params {
                if param.name.name.starts_with(&decl.name.name) {
                    diagnostics.push(ctx.diagnostic(
                        param.name.span,
                        diagnostic_codes::PARAMETER_NAME_REPEATS_FUNCTION,
                        &[&param.name.name, &decl.name.name],
                    ));
                }
            }
        });
        diagnostics
    }
}
