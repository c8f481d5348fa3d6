use super::*;
use rustc_hash::FxHashSet;

fn collect(source: &str) -> (crate::table::SymbolTable, Vec<Diagnostic>) {
    let result = cnx_parser::parse(source, "test.cnx", &FxHashSet::default());
    let unit = result.unit.expect("parse should succeed");
    let mut table = crate::table::SymbolTable::new();
    let diags = collect_unit(&unit, source, &mut table);
    (table, diags)
}

#[test]
fn collects_scoped_function_with_mangled_name() {
    let (table, diags) = collect("scope Motor { void setSpeed(u8 speed) { } }");
    assert!(diags.is_empty());
    let symbol = table.get_cnx("Motor_setSpeed").expect("function collected");
    match symbol {
        TSymbol::Function(f) => {
            assert_eq!(f.common.scope, vec!["Motor".to_string()]);
            assert_eq!(f.params.len(), 1);
            assert_eq!(f.params[0].ty, TType::Primitive(Primitive::U8));
        }
        other => panic!("expected function, got {other:?}"),
    }
    assert!(matches!(table.get_cnx("Motor"), Some(TSymbol::Scope(_))));
}

#[test]
fn const_value_is_evaluated() {
    let (table, _) = collect("const u8 SIZE <- 4 * 2;");
    match table.get_cnx("SIZE") {
        Some(TSymbol::Variable(v)) => assert_eq!(v.const_value, Some(8)),
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn const_chains_resolve() {
    let (table, _) = collect("const u8 A <- 3;\nconst u8 B <- A;\n");
    match table.get_cnx("B") {
        Some(TSymbol::Variable(v)) => assert_eq!(v.const_value, Some(3)),
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn enum_members_number_implicitly() {
    let (table, _) = collect("enum EColor { RED, GREEN <- 5, BLUE }");
    match table.get_cnx("EColor") {
        Some(TSymbol::Enum(e)) => {
            let values: Vec<i64> = e.members.values().copied().collect();
            assert_eq!(values, vec![0, 5, 6]);
            assert_eq!(e.bit_width, 8);
        }
        other => panic!("expected enum, got {other:?}"),
    }
}

#[test]
fn bitmap_offsets_are_lsb_first() {
    let (table, diags) = collect("bitmap8 BFlags { ready: 1; mode: 3; rest: 4; }");
    assert!(diags.is_empty());
    match table.get_cnx("BFlags") {
        Some(TSymbol::Bitmap(b)) => {
            assert_eq!(b.fields["ready"].offset, 0);
            assert_eq!(b.fields["mode"].offset, 1);
            assert_eq!(b.fields["rest"].offset, 4);
        }
        other => panic!("expected bitmap, got {other:?}"),
    }
}

#[test]
fn bitmap_width_mismatch_is_an_error() {
    let (_, diags) = collect("bitmap8 BBad { a: 3; b: 3; }");
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, diagnostic_codes::BITMAP_WIDTH_MISMATCH);
}

#[test]
fn struct_fields_are_cached() {
    let (table, _) = collect("struct SPoint { u8 x; u8 y; }");
    let fields = table.struct_fields.get("SPoint").expect("cached");
    assert_eq!(fields.len(), 2);
    assert!(fields.contains_key("x"));
}

#[test]
fn variable_of_struct_type_resolves() {
    let (table, _) = collect("struct SPoint { u8 x; }\nSPoint origin;");
    match table.get_cnx("origin") {
        Some(TSymbol::Variable(v)) => assert_eq!(v.ty, TType::Struct("SPoint".to_string())),
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn callback_conformance_marks_the_callback() {
    let (table, diags) = collect(
        "void on_tick(u8 count) { }\n\
         on_tick my_handler(u8 count) { }\n",
    );
    assert!(diags.is_empty(), "diags: {diags:?}");
    match table.get_cnx("on_tick") {
        Some(TSymbol::Function(f)) => assert!(f.used_as_callback),
        other => panic!("expected function, got {other:?}"),
    }
    match table.get_cnx("my_handler") {
        Some(TSymbol::Function(f)) => {
            assert_eq!(f.callback_of.as_deref(), Some("on_tick"));
            assert_eq!(f.return_type, TType::Primitive(Primitive::Void));
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn callback_signature_mismatch_is_an_error() {
    let (_, diags) = collect(
        "void on_tick(u8 count) { }\n\
         on_tick bad_handler(u16 count) { }\n",
    );
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].code, diagnostic_codes::CALLBACK_SIGNATURE_MISMATCH);
}

#[test]
fn struct_callback_field_marks_function() {
    let (table, _) = collect(
        "void on_press(u8 id) { }\n\
         struct SButton { on_press handler; }\n",
    );
    match table.get_cnx("on_press") {
        Some(TSymbol::Function(f)) => assert!(f.used_as_callback),
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn scoped_dimension_mangles() {
    let (table, _) = collect("enum EColor { RED, COUNT }\nu8 buckets[EColor.COUNT];");
    match table.get_cnx("buckets") {
        Some(TSymbol::Variable(v)) => {
            assert_eq!(
                v.dims,
                vec![ArrayDimension::Symbolic("EColor_COUNT".to_string())]
            );
        }
        other => panic!("expected variable, got {other:?}"),
    }
}
