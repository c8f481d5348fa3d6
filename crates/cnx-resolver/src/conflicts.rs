//! Stage 4: conflict detection.
//!
//! Groups collected symbols by mangled name and classifies collisions:
//!
//! - same file, same kind, different signature: duplicate definition
//! - different files with an `extern` declaration on one side: allowed
//! - two static / non-exported symbols in different files: allowed
//! - CNX vs C/C++ header symbol: error unless the CNX side is `extern`
//!
//! Any error aborts the pipeline before code generation. Diagnostics are
//! reported at the colliding declaration's actual location.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};

use crate::table::SymbolTable;
use crate::types::TSymbol;

pub fn detect_conflicts(table: &SymbolTable) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();

    for mangled in table.cnx_names() {
        let symbols = table.all_cnx(mangled);
        if symbols.len() > 1 {
            classify_group(mangled, symbols, &mut diagnostics);
        }
        if let Some(first) = symbols.first() {
            check_foreign(table, mangled, first, &mut diagnostics);
        }
    }
    diagnostics
}

fn classify_group(mangled: &str, symbols: &[TSymbol], diagnostics: &mut Vec<Diagnostic>) {
    let first = &symbols[0];
    for second in &symbols[1..] {
        if allowed_pair(first, second) {
            continue;
        }
        let previous = format!(
            "{}:{}",
            first.common().source_file,
            first.common().source_line
        );
        diagnostics.push(Diagnostic::error(
            second.common().source_file.clone(),
            second.common().source_line,
            1,
            message(diagnostic_codes::DUPLICATE_SYMBOL, &[mangled, &previous]),
            diagnostic_codes::DUPLICATE_SYMBOL,
        ));
    }
}

fn allowed_pair(first: &TSymbol, second: &TSymbol) -> bool {
    let same_file = first.common().source_file == second.common().source_file;
    match (first, second) {
        (TSymbol::Variable(a), TSymbol::Variable(b)) => {
            if same_file {
                return false;
            }
            // extern declaration against a definition, or two per-file
            // statics that never meet at link time.
            a.is_extern
                || b.is_extern
                || (is_internal(a) && is_internal(b))
        }
        (TSymbol::Function(a), TSymbol::Function(b)) => {
            !same_file && !a.common.is_exported && !b.common.is_exported
        }
        _ => false,
    }
}

fn is_internal(v: &crate::types::VariableSymbol) -> bool {
    v.is_static || !v.common.is_exported
}

fn check_foreign(
    table: &SymbolTable,
    mangled: &str,
    cnx_symbol: &TSymbol,
    diagnostics: &mut Vec<Diagnostic>,
) {
    let Some(foreign) = table.foreign_collision(mangled) else {
        return;
    };
    // Declaring the CNX side extern is the sanctioned way to share a
    // symbol with a C/C++ header.
    if let TSymbol::Variable(v) = cnx_symbol {
        if v.is_extern {
            return;
        }
    }
    diagnostics.push(Diagnostic::error(
        cnx_symbol.common().source_file.clone(),
        cnx_symbol.common().source_line,
        1,
        message(
            diagnostic_codes::CONFLICTS_WITH_HEADER,
            &[mangled, &foreign.common().source_file],
        ),
        diagnostic_codes::CONFLICTS_WITH_HEADER,
    ));
}

#[cfg(test)]
#[path = "tests/conflicts_tests.rs"]
mod tests;
