use super::*;

#[test]
fn preprocessing_heuristic() {
    assert!(!needs_preprocessing("#ifdef FOO\nint x;\n#endif\n"));
    assert!(!needs_preprocessing("#if defined(FOO)\n#endif\n"));
    assert!(!needs_preprocessing("#if 0\n#endif\n"));
    assert!(needs_preprocessing("#if FOO > 2\n#endif\n"));
    assert!(needs_preprocessing("#if defined(A) && defined(B)\n#endif\n"));
}

#[test]
fn cpp_detection() {
    assert!(detect_cpp("class HardwareSerial {};"));
    assert!(detect_cpp("namespace std { }"));
    assert!(detect_cpp("template <typename T> T max(T a, T b);"));
    assert!(detect_cpp("enum class Color : uint8_t { Red };"));
    assert!(!detect_cpp("struct Point { int x; int y; };"));
    // Markers inside comments do not count
    assert!(!detect_cpp("/* class in a comment */ int x;"));
}

#[test]
fn extracts_prototypes() {
    let syms = parse_header("void digitalWrite(uint8_t pin, uint8_t val);\n");
    assert_eq!(syms.functions.len(), 1);
    let f = &syms.functions[0];
    assert_eq!(f.name, "digitalWrite");
    assert_eq!(f.return_type, "void");
    assert_eq!(f.params.len(), 2);
    assert_eq!(f.params[0], ("uint8_t".to_string(), "pin".to_string()));
}

#[test]
fn extracts_typedef_struct() {
    let syms = parse_header("typedef struct { uint8_t x; uint8_t y; } Point;\n");
    assert_eq!(syms.structs.len(), 1);
    let s = &syms.structs[0];
    assert_eq!(s.name, "Point");
    assert!(!s.needs_keyword);
    assert_eq!(s.fields.len(), 2);
    assert_eq!(s.fields[0], ("uint8_t".to_string(), "x".to_string()));
}

#[test]
fn bare_struct_needs_keyword() {
    let syms = parse_header("struct Config { int retries; };\n");
    assert_eq!(syms.structs.len(), 1);
    assert!(syms.structs[0].needs_keyword);
}

#[test]
fn forward_declaration_is_opaque() {
    let syms = parse_header("struct Opaque;\nvoid use_it(struct Opaque* p);\n");
    assert_eq!(syms.opaque_types, vec!["Opaque".to_string()]);
}

#[test]
fn typedef_tag_alias() {
    let syms = parse_header("typedef struct tagPoint Point;\n");
    assert_eq!(syms.typedefs.len(), 1);
    assert_eq!(syms.typedefs[0].name, "Point");
    assert_eq!(syms.typedefs[0].tag.as_deref(), Some("tagPoint"));
}

#[test]
fn extracts_enums_with_values() {
    let syms = parse_header("enum Mode { OFF = 0, ON = 1, AUTO };\n");
    assert_eq!(syms.enums.len(), 1);
    assert_eq!(
        syms.enums[0].members,
        vec![
            ("OFF".to_string(), 0),
            ("ON".to_string(), 1),
            ("AUTO".to_string(), 2)
        ]
    );
}

#[test]
fn extracts_extern_variables() {
    let syms = parse_header("extern uint32_t SystemCoreClock;\n");
    assert_eq!(syms.variables.len(), 1);
    assert_eq!(syms.variables[0].name, "SystemCoreClock");
    assert_eq!(syms.variables[0].type_text, "uint32_t");
}

#[test]
fn extracts_numeric_defines() {
    let syms = parse_header("#define BUFFER_SIZE 64\n#define FLAG(x) (1 << x)\n");
    assert_eq!(syms.defines.len(), 1);
    assert_eq!(syms.defines[0].name, "BUFFER_SIZE");
    assert_eq!(syms.defines[0].value, "64");
}

#[test]
fn keyword_inside_identifier_is_not_a_struct() {
    let syms = parse_header("int my_struct_count;\ntypedef int mystruct;\n");
    assert!(syms.structs.is_empty());
}
