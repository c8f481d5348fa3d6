//! Stage 2: header symbols into the C / C++ partitions.
//!
//! Takes the raw extraction from `cnx_parser::cheader` and converts it to
//! `TSymbol`s, filling the table's caches along the way. Each type symbol
//! remembers the literal `#include` directive that brought it in, so
//! generated headers can re-include the same definition instead of
//! forward-declaring a conflicting one.

use cnx_parser::ast::Primitive;
use cnx_parser::cheader::HeaderSymbols;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

use crate::table::SymbolTable;
use crate::types::*;

/// Convert one header's raw symbols into the table. `include_literal` is
/// the directive whose resolution produced this header (empty when the
/// header was found by discovery rather than a directive).
pub fn collect_header(
    syms: &HeaderSymbols,
    path: &str,
    include_literal: &str,
    table: &mut SymbolTable,
    type_headers: &mut FxHashMap<String, String>,
) {
    let language = if syms.is_cpp {
        SourceLanguage::Cpp
    } else {
        SourceLanguage::C
    };
    tracing::debug!(
        path,
        functions = syms.functions.len(),
        structs = syms.structs.len(),
        cpp = syms.is_cpp,
        "collecting header symbols"
    );

    let common = |name: &str, line: u32| SymbolCommon {
        name: name.to_string(),
        scope: Vec::new(),
        source_file: path.to_string(),
        source_line: line,
        language,
        is_exported: true,
    };

    let remember_header = |type_headers: &mut FxHashMap<String, String>, name: &str| {
        if !include_literal.is_empty() {
            type_headers
                .entry(name.to_string())
                .or_insert_with(|| include_literal.to_string());
        }
    };

    for s in &syms.structs {
        let mut fields = IndexMap::new();
        for (type_text, field_name) in &s.fields {
            fields.insert(
                field_name.clone(),
                FieldInfo {
                    ty: c_type_to_ttype(type_text, table),
                    is_const: type_text.contains("const"),
                    is_atomic: false,
                    dims: Vec::new(),
                },
            );
        }
        if s.needs_keyword {
            table.needs_struct_keyword.insert(s.name.clone());
        }
        table.struct_fields.insert(s.name.clone(), fields.clone());
        remember_header(type_headers, &s.name);
        table.insert(TSymbol::Struct(StructSymbol {
            common: common(&s.name, s.line),
            fields,
        }));
    }

    for e in &syms.enums {
        let mut members = IndexMap::new();
        for (name, value) in &e.members {
            members.insert(name.clone(), *value);
        }
        let bit_width = crate::collect::enum_bit_width(members.values().copied());
        table.enum_widths.insert(e.name.clone(), bit_width);
        remember_header(type_headers, &e.name);
        table.insert(TSymbol::Enum(EnumSymbol {
            common: common(&e.name, e.line),
            members,
            bit_width,
        }));
    }

    for t in &syms.typedefs {
        if let Some(tag) = &t.tag {
            table.typedef_tags.insert(t.name.clone(), tag.clone());
        }
        let aliased = c_type_to_ttype(&t.underlying, table);
        table.type_aliases.insert(t.name.clone(), aliased);
        remember_header(type_headers, &t.name);
    }

    for name in &syms.opaque_types {
        table.opaque_types.insert(name.clone());
        remember_header(type_headers, name);
    }

    for f in &syms.functions {
        let params = f
            .params
            .iter()
            .map(|(type_text, name)| ParamSymbol {
                name: name.clone(),
                ty: c_type_to_ttype(type_text, table),
                is_const: type_text.contains("const"),
                is_array: type_text.contains('*') || type_text.ends_with("[]"),
                is_auto_const: false,
            })
            .collect();
        table.insert(TSymbol::Function(FunctionSymbol {
            common: common(&f.name, f.line),
            params,
            return_type: c_type_to_ttype(&f.return_type, table),
            callback_of: None,
            used_as_callback: false,
            is_isr: false,
        }));
    }

    for v in &syms.variables {
        table.insert(TSymbol::Variable(VariableSymbol {
            common: common(&v.name, v.line),
            ty: c_type_to_ttype(&v.type_text, table),
            is_const: v.type_text.contains("const"),
            is_static: false,
            is_extern: true,
            is_atomic: false,
            is_volatile: v.type_text.contains("volatile"),
            overflow: Default::default(),
            dims: Vec::new(),
            const_value: None,
        }));
    }

    // Object-like numeric macros act as external constants so array
    // dimensions naming them pass through by name.
    for d in &syms.defines {
        let const_value = parse_macro_value(&d.value);
        table.insert(TSymbol::Variable(VariableSymbol {
            common: common(&d.name, d.line),
            ty: TType::Primitive(Primitive::I32),
            is_const: true,
            is_static: false,
            is_extern: true,
            is_atomic: false,
            is_volatile: false,
            overflow: Default::default(),
            dims: Vec::new(),
            const_value,
        }));
    }
}

fn parse_macro_value(text: &str) -> Option<i64> {
    let text = text.trim_end_matches(['u', 'U', 'l', 'L']);
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16).ok()
    } else {
        text.parse().ok()
    }
}

/// Map C type text onto the `TType` model. Pointer-bearing and otherwise
/// unrecognized types become opaque externals.
pub fn c_type_to_ttype(text: &str, table: &SymbolTable) -> TType {
    let trimmed = text
        .replace("const", " ")
        .replace("volatile", " ")
        .replace("struct", " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    let trimmed = trimmed.trim();

    if trimmed == "char*" || trimmed == "char *" || text.trim() == "const char*" {
        return TType::Primitive(Primitive::CString);
    }
    if trimmed.contains('*') || trimmed.contains('&') || trimmed.contains('<') {
        return TType::External(text.trim().to_string());
    }
    let primitive = match trimmed {
        "uint8_t" | "unsigned char" | "byte" => Some(Primitive::U8),
        "uint16_t" | "unsigned short" | "word" => Some(Primitive::U16),
        "uint32_t" | "unsigned int" | "unsigned" | "unsigned long" => Some(Primitive::U32),
        "uint64_t" | "unsigned long long" => Some(Primitive::U64),
        "int8_t" | "signed char" => Some(Primitive::I8),
        "int16_t" | "short" => Some(Primitive::I16),
        "int32_t" | "int" | "long" => Some(Primitive::I32),
        "int64_t" | "long long" => Some(Primitive::I64),
        "float" => Some(Primitive::F32),
        "double" => Some(Primitive::F64),
        "bool" | "_Bool" => Some(Primitive::Bool),
        "void" => Some(Primitive::Void),
        "size_t" => Some(Primitive::Usize),
        "ptrdiff_t" | "ssize_t" => Some(Primitive::Isize),
        "char" => Some(Primitive::I8),
        _ => None,
    };
    if let Some(p) = primitive {
        return TType::Primitive(p);
    }
    if table.struct_fields.contains_key(trimmed) {
        return TType::Struct(trimmed.to_string());
    }
    if table.enum_widths.contains_key(trimmed) {
        return TType::Enum(trimmed.to_string());
    }
    if let Some(aliased) = table.type_aliases.get(trimmed) {
        return aliased.clone();
    }
    TType::External(trimmed.to_string())
}

#[cfg(test)]
#[path = "tests/headers_tests.rs"]
mod tests;
