//! The shared overflow-helpers header.
//!
//! One `cnx_helpers.h` is emitted per output tree and included by every
//! generated source. It carries the clamp/wrap/panic arithmetic helpers
//! for every sized integer type plus the `safe_div`/`safe_mod` family.
//! Text generation is deterministic so repeated runs are byte-identical.

pub const HELPERS_FILE_NAME: &str = "cnx_helpers.h";

struct IntType {
    suffix: &'static str,
    c_name: &'static str,
    min: &'static str,
    max: &'static str,
    signed: bool,
}

const INT_TYPES: &[IntType] = &[
    IntType { suffix: "u8", c_name: "uint8_t", min: "0u", max: "UINT8_MAX", signed: false },
    IntType { suffix: "u16", c_name: "uint16_t", min: "0u", max: "UINT16_MAX", signed: false },
    IntType { suffix: "u32", c_name: "uint32_t", min: "0u", max: "UINT32_MAX", signed: false },
    IntType { suffix: "u64", c_name: "uint64_t", min: "0u", max: "UINT64_MAX", signed: false },
    IntType { suffix: "i8", c_name: "int8_t", min: "INT8_MIN", max: "INT8_MAX", signed: true },
    IntType { suffix: "i16", c_name: "int16_t", min: "INT16_MIN", max: "INT16_MAX", signed: true },
    IntType { suffix: "i32", c_name: "int32_t", min: "INT32_MIN", max: "INT32_MAX", signed: true },
    IntType { suffix: "i64", c_name: "int64_t", min: "INT64_MIN", max: "INT64_MAX", signed: true },
];

/// The complete helper header text.
pub fn helpers_header() -> String {
    let mut out = String::new();
    out.push_str("// Generated by C-Next Transpiler\n");
    out.push_str("#ifndef CNX_HELPERS_H\n");
    out.push_str("#define CNX_HELPERS_H\n\n");
    out.push_str("#include <stdint.h>\n");
    out.push_str("#include <stdbool.h>\n");
    out.push_str("#include <string.h>\n\n");
    out.push_str("#ifdef CNX_DEBUG\n");
    out.push_str("#include <stdio.h>\n");
    out.push_str("#include <stdlib.h>\n");
    out.push_str(
        "#define CNX_PANIC(op, ty) do { (void)fprintf(stderr, \"cnx: %s overflow in %s\\n\", op, ty); abort(); } while (0)\n",
    );
    out.push_str("#endif\n\n");

    for ty in INT_TYPES {
        emit_clamp(&mut out, ty);
        emit_wrap(&mut out, ty);
        emit_safe(&mut out, ty);
        out.push('\n');
    }

    out.push_str("#ifdef CNX_DEBUG\n");
    for ty in INT_TYPES {
        emit_panic(&mut out, ty);
    }
    out.push_str("#endif\n\n");
    out.push_str("#endif /* CNX_HELPERS_H */\n");
    out
}

fn emit_clamp(out: &mut String, ty: &IntType) {
    let (s, c, min, max) = (ty.suffix, ty.c_name, ty.min, ty.max);
    if ty.signed {
        out.push_str(&format!(
            "static inline {c} cnx_clamp_add_{s}({c} a, {c} b) {{\n    if ((b > 0) && (a > ({c})({max} - b))) {{ return {max}; }}\n    if ((b < 0) && (a < ({c})({min} - b))) {{ return {min}; }}\n    return ({c})(a + b);\n}}\n",
        ));
        out.push_str(&format!(
            "static inline {c} cnx_clamp_sub_{s}({c} a, {c} b) {{\n    if ((b < 0) && (a > ({c})({max} + b))) {{ return {max}; }}\n    if ((b > 0) && (a < ({c})({min} + b))) {{ return {min}; }}\n    return ({c})(a - b);\n}}\n",
        ));
        out.push_str(&format!(
            "static inline {c} cnx_clamp_mul_{s}({c} a, {c} b) {{\n    int64_t wide = (int64_t)a * (int64_t)b;\n    if (wide > (int64_t){max}) {{ return {max}; }}\n    if (wide < (int64_t){min}) {{ return {min}; }}\n    return ({c})wide;\n}}\n",
        ));
    } else {
        out.push_str(&format!(
            "static inline {c} cnx_clamp_add_{s}({c} a, {c} b) {{\n    return (a > ({c})({max} - b)) ? {max} : ({c})(a + b);\n}}\n",
        ));
        out.push_str(&format!(
            "static inline {c} cnx_clamp_sub_{s}({c} a, {c} b) {{\n    return (a < b) ? {min} : ({c})(a - b);\n}}\n",
        ));
        out.push_str(&format!(
            "static inline {c} cnx_clamp_mul_{s}({c} a, {c} b) {{\n    return ((b != {min}) && (a > ({c})({max} / b))) ? {max} : ({c})(a * b);\n}}\n",
        ));
    }
}

fn emit_wrap(out: &mut String, ty: &IntType) {
    let (s, c) = (ty.suffix, ty.c_name);
    for op in ["add", "sub", "mul"] {
        let operator = match op {
            "add" => "+",
            "sub" => "-",
            _ => "*",
        };
        if ty.signed {
            // Signed wrap goes through a wide unsigned intermediate so
            // the arithmetic itself never overflows.
            out.push_str(&format!(
                "static inline {c} cnx_wrap_{op}_{s}({c} a, {c} b) {{\n    return ({c})((uint64_t)a {operator} (uint64_t)b);\n}}\n",
            ));
        } else {
            out.push_str(&format!(
                "static inline {c} cnx_wrap_{op}_{s}({c} a, {c} b) {{\n    return ({c})(a {operator} b);\n}}\n",
            ));
        }
    }
}

fn emit_safe(out: &mut String, ty: &IntType) {
    let (s, c) = (ty.suffix, ty.c_name);
    out.push_str(&format!(
        "static inline {c} cnx_safe_div_{s}({c} a, {c} b) {{\n    return (b == 0) ? ({c})0 : ({c})(a / b);\n}}\n",
    ));
    out.push_str(&format!(
        "static inline {c} cnx_safe_mod_{s}({c} a, {c} b) {{\n    return (b == 0) ? ({c})0 : ({c})(a % b);\n}}\n",
    ));
}

fn emit_panic(out: &mut String, ty: &IntType) {
    let (s, c) = (ty.suffix, ty.c_name);
    for op in ["add", "sub", "mul"] {
        out.push_str(&format!(
            "static inline {c} cnx_panic_{op}_{s}({c} a, {c} b) {{\n    {c} clamped = cnx_clamp_{op}_{s}(a, b);\n    {c} wrapped = cnx_wrap_{op}_{s}(a, b);\n    if (clamped != wrapped) {{ CNX_PANIC(\"{op}\", \"{s}\"); }}\n    return clamped;\n}}\n",
        ));
    }
}

/// Helper call name for one arithmetic op on one CNX type.
pub fn helper_name(mode: &str, op: &str, suffix: &str) -> String {
    format!("cnx_{mode}_{op}_{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_contains_scenario_helper() {
        let text = helpers_header();
        assert!(text.contains(
            "static inline uint8_t cnx_clamp_add_u8(uint8_t a, uint8_t b) {\n    return (a > (uint8_t)(UINT8_MAX - b)) ? UINT8_MAX : (uint8_t)(a + b);\n}"
        ));
    }

    #[test]
    fn header_is_guarded_and_deterministic() {
        let a = helpers_header();
        let b = helpers_header();
        assert_eq!(a, b);
        assert!(a.starts_with("// Generated by C-Next Transpiler\n#ifndef CNX_HELPERS_H"));
        assert!(a.ends_with("#endif /* CNX_HELPERS_H */\n"));
    }

    #[test]
    fn panic_variants_are_debug_only() {
        let text = helpers_header();
        let debug_start = text.find("#ifdef CNX_DEBUG").expect("debug block");
        assert!(text.find("cnx_panic_add_u8").expect("panic helper") > debug_start);
    }

    #[test]
    fn safe_division_returns_zero_on_zero() {
        let text = helpers_header();
        assert!(text.contains("cnx_safe_div_u8"));
        assert!(text.contains("(b == 0) ? (uint8_t)0 : (uint8_t)(a / b)"));
    }
}
