use super::*;
use cnx_resolver::table::SymbolTable;

#[test]
fn c_type_names() {
    let table = SymbolTable::new();
    assert_eq!(
        c_type_name(&TType::Primitive(Primitive::U8), &table),
        "uint8_t"
    );
    assert_eq!(
        c_type_name(&TType::Struct("SPoint".to_string()), &table),
        "SPoint"
    );
    assert_eq!(
        c_type_name(
            &TType::Bitmap {
                name: "BFlags".to_string(),
                bit_width: 24
            },
            &table
        ),
        "uint32_t"
    );
    assert_eq!(
        c_type_name(&TType::Callback("on_tick".to_string()), &table),
        "on_tick_fp"
    );
}

#[test]
fn struct_keyword_is_applied_when_cached() {
    let mut table = SymbolTable::new();
    table.needs_struct_keyword.insert("Config".to_string());
    assert_eq!(
        c_type_name(&TType::Struct("Config".to_string()), &table),
        "struct Config"
    );
}

#[test]
fn dims_render_fixed_and_symbolic() {
    let dims = vec![
        ArrayDimension::Fixed(4),
        ArrayDimension::Symbolic("BUFFER_SIZE".to_string()),
    ];
    assert_eq!(dims_suffix(&dims), "[4][BUFFER_SIZE]");
}

#[test]
fn bitmap_backing_rounds_up() {
    assert_eq!(bitmap_backing(8), "uint8_t");
    assert_eq!(bitmap_backing(16), "uint16_t");
    assert_eq!(bitmap_backing(24), "uint32_t");
    assert_eq!(bitmap_backing(32), "uint32_t");
}

#[test]
fn file_stem_strips_path_and_extension() {
    assert_eq!(file_stem("src/motor.cnx"), "motor");
    assert_eq!(file_stem("main.cnx"), "main");
}
