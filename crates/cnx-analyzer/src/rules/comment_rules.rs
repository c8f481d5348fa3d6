//! Comment hygiene: nested block comments and `//` line continuations
//! are rejected (both change meaning silently under some toolchains).

use cnx_common::comments;
use cnx_common::diagnostics::{Diagnostic, diagnostic_codes};
use cnx_scanner::SyntaxKind;

use crate::{AnalysisContext, Analyzer};

pub struct CommentRules;

impl Analyzer for CommentRules {
    fn name(&self) -> &'static str {
        "comment_rules"
    }

    fn check(&self, ctx: &AnalysisContext<'_>) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        for token in ctx.tokens {
            let text = token.text(ctx.source);
            match token.kind {
                SyntaxKind::BlockComment if comments::has_nested_block(text) => {
                    diagnostics.push(ctx.diagnostic(
                        token.span,
                        diagnostic_codes::NESTED_BLOCK_COMMENT,
                        &[],
                    ));
                }
                SyntaxKind::LineComment | SyntaxKind::DocComment
                    if comments::has_line_continuation(text) =>
                {
                    diagnostics.push(ctx.diagnostic(
                        token.span,
                        diagnostic_codes::LINE_CONTINUATION_COMMENT,
                        &[],
                    ));
                }
                _ => {}
            }
        }
        diagnostics
    }
}
