use super::*;
use crate::collect::collect_unit;
use crate::headers::collect_header;
use rustc_hash::{FxHashMap, FxHashSet};

fn table_from(sources: &[(&str, &str)]) -> SymbolTable {
    let mut table = SymbolTable::new();
    for (path, source) in sources {
        let result = cnx_parser::parse(source, path, &FxHashSet::default());
        let unit = result.unit.expect("parse");
        collect_unit(&unit, source, &mut table);
    }
    table
}

#[test]
fn duplicate_in_same_file_is_an_error() {
    let table = table_from(&[("a.cnx", "u8 x;\nu8 x;\n")]);
    let diags = detect_conflicts(&table);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, diagnostic_codes::DUPLICATE_SYMBOL);
    // Reported at the second declaration's real location, not 1:0.
    assert_eq!(diags[0].line, 2);
}

#[test]
fn extern_declaration_against_definition_is_allowed() {
    let table = table_from(&[
        ("a.cnx", "export u8 shared;"),
        ("b.cnx", "extern u8 shared;"),
    ]);
    let diags = detect_conflicts(&table);
    assert!(diags.is_empty(), "diags: {diags:?}");
}

#[test]
fn two_file_local_statics_are_allowed() {
    let table = table_from(&[
        ("a.cnx", "static u8 counter;"),
        ("b.cnx", "static u8 counter;"),
    ]);
    let diags = detect_conflicts(&table);
    assert!(diags.is_empty(), "diags: {diags:?}");
}

#[test]
fn cnx_vs_header_collision_is_an_error() {
    let mut table = table_from(&[("a.cnx", "void delay(u32 ms) { }")]);
    let syms = cnx_parser::cheader::parse_header("void delay(unsigned long ms);\n");
    let mut type_headers = FxHashMap::default();
    collect_header(&syms, "Arduino.h", "#include <Arduino.h>", &mut table, &mut type_headers);
    let diags = detect_conflicts(&table);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, diagnostic_codes::CONFLICTS_WITH_HEADER);
}

#[test]
fn extern_cnx_variable_may_share_header_name() {
    let mut table = table_from(&[("a.cnx", "extern u32 SystemCoreClock;")]);
    let syms = cnx_parser::cheader::parse_header("extern uint32_t SystemCoreClock;\n");
    let mut type_headers = FxHashMap::default();
    collect_header(&syms, "core.h", "", &mut table, &mut type_headers);
    let diags = detect_conflicts(&table);
    assert!(diags.is_empty(), "diags: {diags:?}");
}
