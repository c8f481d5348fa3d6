//! Stage 3b: external reference resolution.
//!
//! After every file's symbols are collected, walk each symbolic array
//! dimension. A dimension naming a CNX `const` from anywhere in the job
//! rewrites to its integer value; a dimension naming a C macro keeps the
//! macro name (pass-through). Anything else stays verbatim with a
//! warning, deferring the check to the downstream C compiler.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};

use crate::table::SymbolTable;
use crate::types::{ArrayDimension, SourceLanguage, TSymbol};

pub fn resolve_external_references(table: &mut SymbolTable) -> Vec<Diagnostic> {
    // Pass 1 (immutable): decide every rewrite.
    let mut rewrites: Vec<Rewrite> = Vec::new();
    let mut diagnostics = Vec::new();

    for symbol in table.cnx_symbols() {
        let scope = symbol.common().scope.clone();
        let file = symbol.common().source_file.clone();
        let line = symbol.common().source_line;
        let mut resolve_all = |dims: &[ArrayDimension],
                               diagnostics: &mut Vec<Diagnostic>|
         -> Vec<Option<ArrayDimension>> {
            dims.iter()
                .map(|dim| match dim {
                    ArrayDimension::Fixed(_) => None,
                    ArrayDimension::Symbolic(name) => {
                        resolve_dimension(table, &scope, name, &file, line, diagnostics)
                    }
                })
                .collect()
        };
        match symbol {
            TSymbol::Variable(v) => {
                let resolved = resolve_all(&v.dims, &mut diagnostics);
                if resolved.iter().any(Option::is_some) {
                    rewrites.push(Rewrite::Variable(symbol.mangled(), resolved));
                }
            }
            TSymbol::Struct(s) => {
                for (field_name, info) in &s.fields {
                    let resolved = resolve_all(&info.dims, &mut diagnostics);
                    if resolved.iter().any(Option::is_some) {
                        rewrites.push(Rewrite::StructField(
                            symbol.mangled(),
                            field_name.clone(),
                            resolved,
                        ));
                    }
                }
            }
            _ => {}
        }
    }

    // Pass 2: apply.
    for rewrite in rewrites {
        apply_rewrite(table, &rewrite);
    }
    diagnostics
}

enum Rewrite {
    Variable(String, Vec<Option<ArrayDimension>>),
    StructField(String, String, Vec<Option<ArrayDimension>>),
}

fn resolve_dimension(
    table: &SymbolTable,
    scope: &[String],
    name: &str,
    file: &str,
    line: u32,
    diagnostics: &mut Vec<Diagnostic>,
) -> Option<ArrayDimension> {
    // Qualified enum member already mangled at collection (EColor_COUNT):
    // verify it exists, keep the name.
    if let Some((enum_name, member)) = name.rsplit_once('_') {
        if table.enum_member(enum_name, member).is_some() {
            return Some(ArrayDimension::Symbolic(name.to_string()));
        }
    }
    match table.resolve(scope, name) {
        Some((key, TSymbol::Variable(v))) if v.is_const => {
            match v.common.language {
                SourceLanguage::Cnx => {
                    // A CNX const: rewrite to its value when known,
                    // otherwise its mangled name.
                    match v.const_value {
                        Some(value) if value >= 0 => {
                            Some(ArrayDimension::Fixed(value.unsigned_abs()))
                        }
                        _ => Some(ArrayDimension::Symbolic(key)),
                    }
                }
                // A C macro constant: pass the name through untouched.
                SourceLanguage::C | SourceLanguage::Cpp => {
                    Some(ArrayDimension::Symbolic(v.common.name.clone()))
                }
            }
        }
        _ => {
            diagnostics.push(Diagnostic::warning(
                file,
                line,
                1,
                message(diagnostic_codes::UNRESOLVED_DIMENSION, &[name]),
                diagnostic_codes::UNRESOLVED_DIMENSION,
            ));
            None
        }
    }
}

fn apply_dims(dims: &mut [ArrayDimension], resolved: &[Option<ArrayDimension>]) {
    for (dim, replacement) in dims.iter_mut().zip(resolved) {
        if let Some(new_dim) = replacement {
            *dim = new_dim.clone();
        }
    }
}

fn apply_rewrite(table: &mut SymbolTable, rewrite: &Rewrite) {
    match rewrite {
        Rewrite::Variable(mangled, resolved) => {
            table.for_each_cnx_mut(|symbol| {
                if symbol.mangled() != *mangled {
                    return;
                }
                if let TSymbol::Variable(v) = symbol {
                    apply_dims(&mut v.dims, resolved);
                }
            });
        }
        Rewrite::StructField(mangled, field, resolved) => {
            table.for_each_cnx_mut(|symbol| {
                if symbol.mangled() != *mangled {
                    return;
                }
                if let TSymbol::Struct(s) = symbol {
                    if let Some(info) = s.fields.get_mut(field) {
                        apply_dims(&mut info.dims, resolved);
                    }
                }
            });
            if let Some(fields) = table.struct_fields.get_mut(mangled) {
                if let Some(info) = fields.get_mut(field) {
                    apply_dims(&mut info.dims, resolved);
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/external_tests.rs"]
mod tests;
