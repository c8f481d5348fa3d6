use super::*;
use cnx_parser::cheader;

#[test]
fn header_functions_land_in_c_partition() {
    let syms = cheader::parse_header("void digitalWrite(uint8_t pin, uint8_t val);\n");
    let mut table = SymbolTable::new();
    let mut type_headers = FxHashMap::default();
    collect_header(&syms, "Arduino.h", "#include <Arduino.h>", &mut table, &mut type_headers);
    match table.get_foreign("digitalWrite") {
        Some(TSymbol::Function(f)) => {
            assert_eq!(f.common.language, SourceLanguage::C);
            assert_eq!(f.params[0].ty, TType::Primitive(Primitive::U8));
        }
        other => panic!("expected function, got {other:?}"),
    }
}

#[test]
fn cpp_header_lands_in_cpp_partition() {
    let syms = cheader::parse_header("class HardwareSerial { };\nvoid begin(unsigned long baud);\n");
    assert!(syms.is_cpp);
    let mut table = SymbolTable::new();
    let mut type_headers = FxHashMap::default();
    collect_header(&syms, "HardwareSerial.h", "#include <HardwareSerial.h>", &mut table, &mut type_headers);
    match table.get_foreign("HardwareSerial") {
        Some(symbol) => assert_eq!(symbol.common().language, SourceLanguage::Cpp),
        None => panic!("expected HardwareSerial"),
    }
    assert_eq!(
        type_headers.get("HardwareSerial").map(String::as_str),
        Some("#include <HardwareSerial.h>")
    );
}

#[test]
fn bare_struct_needs_keyword_cache() {
    let syms = cheader::parse_header("struct Config { int retries; };\n");
    let mut table = SymbolTable::new();
    let mut type_headers = FxHashMap::default();
    collect_header(&syms, "config.h", "#include \"config.h\"", &mut table, &mut type_headers);
    assert!(table.needs_struct_keyword.contains("Config"));
    assert!(table.struct_fields.contains_key("Config"));
}

#[test]
fn numeric_defines_become_const_variables() {
    let syms = cheader::parse_header("#define BUFFER_SIZE 64\n");
    let mut table = SymbolTable::new();
    let mut type_headers = FxHashMap::default();
    collect_header(&syms, "defs.h", "#include \"defs.h\"", &mut table, &mut type_headers);
    match table.get_foreign("BUFFER_SIZE") {
        Some(TSymbol::Variable(v)) => {
            assert!(v.is_const);
            assert_eq!(v.const_value, Some(64));
        }
        other => panic!("expected variable, got {other:?}"),
    }
}

#[test]
fn c_type_mapping() {
    let table = SymbolTable::new();
    assert_eq!(c_type_to_ttype("uint8_t", &table), TType::Primitive(Primitive::U8));
    assert_eq!(c_type_to_ttype("const char*", &table), TType::Primitive(Primitive::CString));
    assert_eq!(c_type_to_ttype("unsigned long", &table), TType::Primitive(Primitive::U32));
    assert_eq!(
        c_type_to_ttype("HardwareSerial*", &table),
        TType::External("HardwareSerial*".to_string())
    );
}

#[test]
fn typedef_alias_resolves() {
    let syms = cheader::parse_header("typedef unsigned char byte_t;\n");
    let mut table = SymbolTable::new();
    let mut type_headers = FxHashMap::default();
    collect_header(&syms, "t.h", "", &mut table, &mut type_headers);
    assert_eq!(
        table.type_aliases.get("byte_t"),
        Some(&TType::Primitive(Primitive::U8))
    );
}
