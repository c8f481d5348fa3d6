use super::*;
use crate::collect::collect_unit;
use crate::table::SymbolTable;
use rustc_hash::FxHashSet;

fn collect_files(sources: &[(&str, &str)]) -> SymbolTable {
    let mut table = SymbolTable::new();
    for (path, source) in sources {
        let result = cnx_parser::parse(source, path, &FxHashSet::default());
        let unit = result.unit.expect("parse");
        let diags = collect_unit(&unit, source, &mut table);
        assert!(diags.is_empty(), "collection diags: {diags:?}");
    }
    table
}

#[test]
fn cross_file_const_dimension_resolves_to_value() {
    let mut table = collect_files(&[
        ("consts.cnx", "export const u8 BUF_SIZE <- 16;"),
        ("main.cnx", "u8 buffer[BUF_SIZE];"),
    ]);
    let diags = resolve_external_references(&mut table);
    assert!(diags.is_empty(), "diags: {diags:?}");
    match table.get_cnx("buffer") {
        Some(TSymbol::Variable(v)) => assert_eq!(v.dims, vec![ArrayDimension::Fixed(16)]),
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn enum_member_dimension_keeps_mangled_name() {
    let mut table = collect_files(&[(
        "main.cnx",
        "enum EColor { RED, GREEN, COUNT }\nu8 counts[EColor.COUNT];",
    )]);
    let diags = resolve_external_references(&mut table);
    assert!(diags.is_empty());
    match table.get_cnx("counts") {
        Some(TSymbol::Variable(v)) => {
            assert_eq!(
                v.dims,
                vec![ArrayDimension::Symbolic("EColor_COUNT".to_string())]
            );
        }
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn unresolved_dimension_warns_and_stays_verbatim() {
    let mut table = collect_files(&[("main.cnx", "u8 buffer[MYSTERY_SIZE];")]);
    let diags = resolve_external_references(&mut table);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, diagnostic_codes::UNRESOLVED_DIMENSION);
    assert!(!diags[0].is_error());
    match table.get_cnx("buffer") {
        Some(TSymbol::Variable(v)) => {
            assert_eq!(
                v.dims,
                vec![ArrayDimension::Symbolic("MYSTERY_SIZE".to_string())]
            );
        }
        other => panic!("expected variable, got {other:?}"),
    }
}
