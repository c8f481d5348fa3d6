//! Stage 6: companion header generation.
//!
//! One header per translated file: include guard, re-includes for every
//! external type referenced (verbatim, so the downstream toolchain finds
//! the same definitions), the file's type definitions, prototypes for
//! exported functions (auto-const applied), and extern declarations for
//! exported variables.

use cnx_common::common::GENERATED_HEADER_MARKER;
use cnx_parser::ast::*;
use cnx_resolver::table::SymbolTable;
use cnx_resolver::types::{TSymbol, TType, mangle};
use rustc_hash::FxHashMap;

use crate::codegen::{EmitOptions, c_type_name, dims_suffix, function_signature};
use crate::writer::CodeWriter;

pub fn generate_header(
    unit: &SourceUnit,
    table: &SymbolTable,
    type_headers: &FxHashMap<String, String>,
    options: &EmitOptions,
    stem: &str,
) -> String {
    let mut out = CodeWriter::new();
    let header_ext = options.language.header_extension();
    let guard = guard_name(stem, header_ext);

    out.line(GENERATED_HEADER_MARKER);
    out.line(&format!("#ifndef {guard}"));
    out.line(&format!("#define {guard}"));
    out.blank();
    out.line("#include <stdint.h>");
    out.line("#include <stdbool.h>");

    emit_reincludes(&mut out, unit, table, type_headers, options);
    out.blank();

    let mut scope = Vec::new();
    emit_items(&mut out, &unit.items, &mut scope, table, options);

    out.blank();
    out.line(&format!("#endif /* {guard} */"));
    out.finish()
}

fn guard_name(stem: &str, ext: &str) -> String {
    let mut guard: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    guard.push('_');
    guard.push_str(&ext.to_ascii_uppercase());
    guard
}

/// Includes carried over from the source: CNX includes become their
/// generated headers; C/C++ includes are re-emitted verbatim. External
/// types referenced through other files' headers pull in the directive
/// that defined them.
fn emit_reincludes(
    out: &mut CodeWriter,
    unit: &SourceUnit,
    table: &SymbolTable,
    type_headers: &FxHashMap<String, String>,
    options: &EmitOptions,
) {
    let mut emitted: Vec<String> = Vec::new();
    for include in &unit.includes {
        let line = if include.path.ends_with(".cnx") {
            let converted = include.path.trim_end_matches(".cnx");
            format!(
                "#include \"{converted}.{}\"",
                options.language.header_extension()
            )
        } else {
            include.literal.clone()
        };
        if !emitted.contains(&line) {
            emitted.push(line);
        }
    }

    // Externally-defined types referenced by this file's symbols.
    for symbol in table.cnx_symbols() {
        if symbol.common().source_file != unit.path {
            continue;
        }
        for external in external_types_of(symbol) {
            if let Some(directive) = type_headers.get(&external) {
                if !emitted.contains(directive) {
                    emitted.push(directive.clone());
                }
            }
        }
    }

    for line in emitted {
        out.line(&line);
    }
}

fn external_types_of(symbol: &TSymbol) -> Vec<String> {
    let mut found = Vec::new();
    let mut push = |ty: &TType| {
        if let TType::External(name) = ty {
            found.push(name.clone());
        }
    };
    match symbol {
        TSymbol::Variable(v) => push(&v.ty),
        TSymbol::Function(f) => {
            push(&f.return_type);
            for p in &f.params {
                push(&p.ty);
            }
        }
        TSymbol::Struct(s) => {
            for info in s.fields.values() {
                push(&info.ty);
            }
        }
        _ => {}
    }
    found
}

fn emit_items(
    out: &mut CodeWriter,
    items: &[Item],
    scope: &mut Vec<String>,
    table: &SymbolTable,
    options: &EmitOptions,
) {
    for item in items {
        match item {
            Item::Scope(decl) => {
                scope.push(decl.name.name.clone());
                emit_items(out, &decl.items, scope, table, options);
                scope.pop();
            }
            Item::Struct(decl) => emit_struct(out, decl, scope, table),
            Item::Enum(decl) => emit_enum(out, decl, scope, table),
            Item::Bitmap(decl) => {
                let mangled = mangle(scope, &decl.name.name);
                let backing = crate::codegen::bitmap_backing(decl.bit_width);
                out.line(&format!("typedef {backing} {mangled};"));
                out.blank();
            }
            Item::Register(decl) => emit_register(out, decl, scope),
            Item::Function(decl) => emit_function_decls(out, decl, scope, table, options),
            Item::Variable(decl) => emit_variable_decl(out, decl, scope, table),
        }
    }
}

fn emit_struct(out: &mut CodeWriter, decl: &StructDecl, scope: &[String], table: &SymbolTable) {
    let mangled = mangle(scope, &decl.name.name);
    let Some(fields) = table.struct_fields.get(&mangled) else {
        return;
    };
    out.line("typedef struct {");
    out.indent();
    for (name, info) in fields {
        let line = match &info.ty {
            TType::Str { capacity } => format!("char {name}[{}];", capacity + 1),
            ty => {
                let const_prefix = if info.is_const { "const " } else { "" };
                let dims = dims_suffix(&info.dims);
                format!("{const_prefix}{} {name}{dims};", c_type_name(ty, table))
            }
        };
        out.line(&line);
    }
    out.dedent();
    out.line(&format!("}} {mangled};"));
    out.blank();
}

fn emit_enum(out: &mut CodeWriter, decl: &EnumDecl, scope: &[String], table: &SymbolTable) {
    let mangled = mangle(scope, &decl.name.name);
    let Some(TSymbol::Enum(symbol)) = table.get_cnx(&mangled) else {
        return;
    };
    out.line("typedef enum {");
    out.indent();
    let count = symbol.members.len();
    for (idx, (name, value)) in symbol.members.iter().enumerate() {
        let comma = if idx + 1 < count { "," } else { "" };
        out.line(&format!("{mangled}_{name} = {value}{comma}"));
    }
    out.dedent();
    out.line(&format!("}} {mangled};"));
    out.blank();
}

fn emit_register(out: &mut CodeWriter, decl: &RegisterDecl, scope: &[String]) {
    let mangled = mangle(scope, &decl.name.name);
    for member in &decl.members {
        let ty = match &member.ty {
            TypeExpr::Primitive(p) => p.c_name(),
            _ => "uint32_t",
        };
        out.line(&format!(
            "#define {mangled}_{} (*(volatile {ty}*)({:#x}u + {:#x}u))",
            member.name.name, decl.base_address, member.offset
        ));
    }
    out.blank();
}

fn emit_function_decls(
    out: &mut CodeWriter,
    decl: &FunctionDecl,
    scope: &[String],
    table: &SymbolTable,
    options: &EmitOptions,
) {
    let mangled = mangle(scope, &decl.name.name);
    let Some(TSymbol::Function(symbol)) = table.get_cnx(&mangled) else {
        return;
    };
    // Function-as-type: the nominal function-pointer alias.
    if symbol.used_as_callback {
        let params = if symbol.params.is_empty() {
            "void".to_string()
        } else {
            symbol
                .params
                .iter()
                .map(|p| {
                    if p.is_array {
                        format!("{}[]", c_type_name(&p.ty, table))
                    } else {
                        c_type_name(&p.ty, table)
                    }
                })
                .collect::<Vec<_>>()
                .join(", ")
        };
        out.line(&format!(
            "typedef {} (*{mangled}_fp)({params});",
            c_type_name(&symbol.return_type, table)
        ));
    }
    if symbol.common.is_exported {
        let signature = function_signature(symbol, table, options, false);
        out.line(&format!("{signature};"));
    }
}

fn emit_variable_decl(
    out: &mut CodeWriter,
    decl: &VarDecl,
    scope: &[String],
    table: &SymbolTable,
) {
    if !decl.quals.is_exported {
        return;
    }
    let mangled = mangle(scope, &decl.name.name);
    let Some(TSymbol::Variable(symbol)) = table.get_cnx(&mangled) else {
        return;
    };
    let line = match &symbol.ty {
        TType::Str { capacity } => format!("extern char {mangled}[{}];", capacity + 1),
        ty => {
            let const_prefix = if symbol.is_const { "const " } else { "" };
            let volatile_prefix = if symbol.is_volatile { "volatile " } else { "" };
            let dims = dims_suffix(&symbol.dims);
            format!(
                "extern {volatile_prefix}{const_prefix}{} {mangled}{dims};",
                c_type_name(ty, table)
            )
        }
    };
    out.line(&line);
}
