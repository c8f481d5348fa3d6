use cnx_common::{OutputLanguage, TargetChip};
use cnx_emitter::{EmitOptions, GeneratedFile, generate_unit};
use cnx_resolver::TranslationContext;
use rustc_hash::FxHashSet;

fn generate_with(
    source: &str,
    language: OutputLanguage,
    target: TargetChip,
    debug: bool,
) -> GeneratedFile {
    let result = cnx_parser::parse(source, "test.cnx", &FxHashSet::default());
    let unit = result
        .unit
        .unwrap_or_else(|| panic!("parse failed: {:?}", result.diagnostics));
    let mut ctx = TranslationContext::new(target, debug);
    let diags = cnx_resolver::collect::collect_unit(&unit, source, &mut ctx.symbols);
    assert!(diags.is_empty(), "collect: {diags:?}");
    cnx_resolver::external::resolve_external_references(&mut ctx.symbols);
    cnx_resolver::modmap::scan_unit(&unit, &ctx.symbols, &mut ctx.modifications);
    let options = EmitOptions {
        language,
        target,
        debug,
    };
    generate_unit(&unit, source, &mut ctx, &options)
        .unwrap_or_else(|diags| panic!("generate failed: {diags:?}"))
}

fn generate(source: &str) -> GeneratedFile {
    generate_with(source, OutputLanguage::C, TargetChip::Generic, false)
}

// Assignment / equality translation.
#[test]
fn arrow_becomes_assignment_and_equals_becomes_equality() {
    let out = generate("void f(bool a, bool b) { u8 x <- 1; if (a = b) { x <- 2; } }");
    assert!(out.body.contains("uint8_t x = 1;"), "body:\n{}", out.body);
    assert!(out.body.contains("if (a == b) {"), "body:\n{}", out.body);
    assert!(out.body.contains("x = 2;"));
    assert!(!out.body.contains("<-"));
}

#[test]
fn compound_shift_arrows_translate() {
    let out = generate("void f() { u8 x <- 1; x <<<- 2; x >><- 1; }");
    assert!(out.body.contains("x <<= 2;"));
    assert!(out.body.contains("x >>= 1;"));
}

// Scenario: overflow helper.
#[test]
fn clamp_arithmetic_uses_helper() {
    let out = generate("clamp u8 x <- 200;\nvoid f() { x +<- 100; }");
    assert!(out.body.contains("uint8_t x = 200;"), "body:\n{}", out.body);
    assert!(
        out.body.contains("x = cnx_clamp_add_u8(x, 100);"),
        "body:\n{}",
        out.body
    );
}

#[test]
fn wrap_arithmetic_uses_wrap_helper() {
    let out = generate("wrap u8 x <- 0;\nvoid f() { x -<- 1; }");
    assert!(out.body.contains("x = cnx_wrap_sub_u8(x, 1);"));
}

#[test]
fn debug_mode_swaps_in_panic_helpers() {
    let out = generate_with(
        "clamp u8 x <- 0;\nvoid f() { x +<- 1; }",
        OutputLanguage::C,
        TargetChip::Generic,
        true,
    );
    assert!(out.body.contains("x = cnx_panic_add_u8(x, 1);"));
}

#[test]
fn clamp_is_the_default_mode() {
    let out = generate("u8 x <- 0;\nvoid f() { x *<- 2; }");
    assert!(out.body.contains("x = cnx_clamp_mul_u8(x, 2);"));
}

// Scenario: scope mangling.
#[test]
fn scope_mangling_and_register_set_bit() {
    let src = "register GPIO7 @ 0x42004000 { DR: u32 rw @ 0x0; DR_SET: u32 wo @ 0x84; }\n\
               scope LED {\n    void on() { GPIO7.DR_SET[3] <- true; }\n}\n\
               void loop_step() { LED.on(); }\n";
    let out = generate(src);
    assert!(out.body.contains("void LED_on(void) {"), "body:\n{}", out.body);
    assert!(
        out.body.contains("GPIO7_DR_SET = (1u << 3);"),
        "body:\n{}",
        out.body
    );
    assert!(out.body.contains("LED_on();"));
    assert!(
        out.header
            .contains("#define GPIO7_DR_SET (*(volatile uint32_t*)(0x42004000u + 0x84u))"),
        "header:\n{}",
        out.header
    );
}

#[test]
fn rw_register_bit_uses_read_modify_write() {
    let src = "register GPIO7 @ 0x42004000 { DR: u32 rw @ 0x0; }\n\
               void f() { GPIO7.DR[3] <- true; GPIO7.DR[3] <- false; }\n";
    let out = generate(src);
    assert!(out.body.contains("GPIO7_DR |= (1u << 3);"));
    assert!(out.body.contains("GPIO7_DR &= ~(1u << 3);"));
}

// Scenario: narrowing via bit extraction.
#[test]
fn bit_extraction_emits_masked_cast() {
    let out = generate("void f() { u32 big <- 1000; u8 small <- big[0, 8]; }");
    assert!(
        out.body.contains("uint8_t small = (uint8_t)(big & 0xFF);"),
        "body:\n{}",
        out.body
    );
}

#[test]
fn offset_bit_extraction_shifts_first() {
    let out = generate("void f() { u32 big <- 0; u8 hi <- big[8, 8]; }");
    assert!(
        out.body.contains("uint8_t hi = (uint8_t)((big >> 8) & 0xFF);"),
        "body:\n{}",
        out.body
    );
}

// Switch lowering.
#[test]
fn switch_cases_get_blocks_and_breaks() {
    let src = "enum EColor { RED, GREEN, BLUE }\n\
               void f(EColor c) { switch (c) { case EColor.RED || EColor.GREEN { } default(1) { } } }";
    let out = generate(src);
    assert!(
        out.body.contains("case EColor_RED: case EColor_GREEN: {"),
        "body:\n{}",
        out.body
    );
    assert!(out.body.contains("break;"));
    assert!(out.body.contains("default: {"));
    assert!(out.header.contains("EColor_RED = 0,"), "header:\n{}", out.header);
}

// Critical sections.
#[test]
fn critical_block_saves_and_restores_primask() {
    let out = generate("void f() { critical { u8 x <- 1; } }");
    assert!(out.body.contains("uint32_t cnx_primask = __get_PRIMASK();"));
    assert!(out.body.contains("__disable_irq();"));
    assert!(out.body.contains("__set_PRIMASK(cnx_primask);"));
}

// Atomics.
#[test]
fn atomic_on_m7_uses_exclusives() {
    let src = "atomic u8 counter <- 0;\nvoid tick() { counter +<- 1; }";
    let out = generate_with(src, OutputLanguage::C, TargetChip::CortexM7, false);
    assert!(out.body.contains("__LDREXB(&counter)"), "body:\n{}", out.body);
    assert!(out.body.contains("cnx_old = cnx_clamp_add_u8(cnx_old, 1);"));
    assert!(out.body.contains("} while (__STREXB(cnx_old, &counter) != 0u);"));
}

#[test]
fn atomic_on_m0_falls_back_to_primask() {
    let src = "atomic u8 counter <- 0;\nvoid tick() { counter +<- 1; }";
    let out = generate_with(src, OutputLanguage::C, TargetChip::CortexM0, false);
    assert!(out.body.contains("counter = cnx_clamp_add_u8(counter, 1);"));
    assert!(out.body.contains("__get_PRIMASK()"));
}

// Strings.
#[test]
fn string_declaration_and_assignment_lower_to_char_array() {
    let src = "void f() { string<31> name <- \"boot\"; name <- \"ready\"; }";
    let out = generate(src);
    assert!(out.body.contains("char name[32] = \"boot\";"), "body:\n{}", out.body);
    assert!(out.body.contains("strncpy(name, \"ready\", 31u);"));
    assert!(out.body.contains("name[31] = '\\0';"));
}

#[test]
fn string_concat_chains_strncat() {
    let src = "void f() { string<15> a <- \"x\"; string<15> b <- \"y\"; string<31> s; s <- a + b; }";
    let out = generate(src);
    assert!(out.body.contains("strncpy(s, a, 31u);"), "body:\n{}", out.body);
    assert!(out.body.contains("strncat(s, b, 31u - strlen(s));"));
}

#[test]
fn string_equality_becomes_strcmp() {
    let src = "void f() { string<7> a; string<7> b; if (a = b) { } }";
    let out = generate(src);
    assert!(
        out.body.contains("if ((strcmp(a, b) == 0)) {"),
        "body:\n{}",
        out.body
    );
}

// Array slices.
#[test]
fn array_slice_write_becomes_memcpy() {
    let src = "void f() { u8 buf[16]; u8 src[4]; buf[2, 4] <- src; }";
    let out = generate(src);
    assert!(
        out.body.contains("memcpy(&buf[2], &src, 4);"),
        "body:\n{}",
        out.body
    );
}

// Bitmaps.
#[test]
fn bitmap_field_access_is_shift_and_mask() {
    let src = "bitmap8 BFlags { ready: 1; mode: 3; rest: 4; }\n\
               void f() { BFlags flags <- 0; flags.mode <- 5; u8 m <- flags.mode; }";
    let out = generate(src);
    assert!(out.body.contains("uint8_t flags = 0;"), "body:\n{}", out.body);
    assert!(
        out.body
            .contains("flags = (uint8_t)((flags & ~0xE) | (((uint8_t)(5) << 1) & 0xE));")
            || out.body.contains("flags = (uint8_t)((flags & ~0xEu) | (((uint8_t)(5) << 1) & 0xEu));"),
        "body:\n{}",
        out.body
    );
    assert!(
        out.body.contains("uint8_t m = (uint8_t)((flags >> 1) & 0x7u);"),
        "body:\n{}",
        out.body
    );
    assert!(out.header.contains("typedef uint8_t BFlags;"));
}

// Callbacks.
#[test]
fn callback_typedef_and_default_initializer() {
    let src = "void on_press(u8 id) { }\n\
               struct SButton { on_press handler; }\n\
               SButton button;\n";
    let out = generate(src);
    assert!(
        out.header.contains("typedef void (*on_press_fp)(uint8_t);"),
        "header:\n{}",
        out.header
    );
    assert!(out.header.contains("on_press_fp handler;"), "header:\n{}", out.header);
    assert!(
        out.body.contains("SButton button = { .handler = on_press };"),
        "body:\n{}",
        out.body
    );
}

#[test]
fn callback_assignment_requires_nominal_match() {
    let src = "void on_press(u8 id) { }\n\
               void other(u8 id) { }\n\
               struct SButton { on_press handler; }\n\
               SButton button;\n\
               void f() { button.handler <- other; }\n";
    let result = cnx_parser::parse(src, "test.cnx", &FxHashSet::default());
    let unit = result.unit.expect("parse");
    let mut ctx = TranslationContext::new(TargetChip::Generic, false);
    cnx_resolver::collect::collect_unit(&unit, src, &mut ctx.symbols);
    let options = EmitOptions {
        language: OutputLanguage::C,
        target: TargetChip::Generic,
        debug: false,
    };
    let err = generate_unit(&unit, src, &mut ctx, &options).expect_err("nominal mismatch");
    assert_eq!(
        err[0].code,
        cnx_common::diagnostics::diagnostic_codes::CALLBACK_SIGNATURE_MISMATCH
    );
}

#[test]
fn conforming_callback_assignment_passes() {
    let src = "void on_press(u8 id) { }\n\
               on_press other(u8 id) { }\n\
               struct SButton { on_press handler; }\n\
               SButton button;\n\
               void f() { button.handler <- other; }\n";
    let out = generate(src);
    assert!(out.body.contains("button.handler = other;"), "body:\n{}", out.body);
}

// Comment preservation.
#[test]
fn comments_survive_in_relative_order() {
    let src = "// top note\nu8 x <- 1;\n/* keeps state */\nvoid f() { }\n";
    let out = generate(src);
    let top = out.body.find("// top note").expect("top comment");
    let x = out.body.find("uint8_t x = 1;").expect("decl");
    let block = out.body.find("/* keeps state */").expect("block comment");
    assert!(top < x && x < block, "body:\n{}", out.body);
}

#[test]
fn doc_comments_become_doxygen() {
    let src = "/// Sets the speed.\n/// Clamped to capacity.\nexport void setSpeed(u8 s) { }\n";
    let out = generate(src);
    assert!(out.body.contains("/**"), "body:\n{}", out.body);
    assert!(out.body.contains(" * Sets the speed."));
    assert!(out.body.contains(" * Clamped to capacity."));
    assert!(out.body.contains(" */"));
    assert!(!out.body.contains("///"));
}

// Self-include and headers.
#[test]
fn body_begins_with_self_include() {
    let out = generate("u8 x;");
    assert!(out.body.starts_with("#include \"test.h\"\n"), "body:\n{}", out.body);
    assert!(out.body.contains("#include \"cnx_helpers.h\""));
}

#[test]
fn header_has_guard_marker_and_prototypes() {
    let src = "export void ping(u8 n) { }\nexport u32 ticks;\n";
    let out = generate(src);
    assert!(out.header.starts_with("// Generated by C-Next Transpiler\n"));
    assert!(out.header.contains("#ifndef TEST_H"));
    assert!(out.header.contains("#define TEST_H"));
    assert!(out.header.contains("void ping(uint8_t n);"));
    assert!(out.header.contains("extern uint32_t ticks;"));
    assert!(out.header.trim_end().ends_with("#endif /* TEST_H */"));
}

#[test]
fn cnx_includes_become_generated_headers() {
    let src = "#include \"motor.cnx\"\n#include <Arduino.h>\nu8 x;\n";
    let out = generate(src);
    assert!(out.header.contains("#include \"motor.h\""), "header:\n{}", out.header);
    assert!(out.header.contains("#include <Arduino.h>"));
}

// Auto-const inference (scenario E, single-file half).
#[test]
fn auto_const_emits_in_cpp_mode_only() {
    let src = "void read_only(u8 data[]) { u8 first <- data[0]; }\n\
               void fill(u8 data[]) { data[0] <- 1; }\n";
    let cpp = generate_with(src, OutputLanguage::Cpp, TargetChip::Generic, false);
    assert!(
        cpp.body.contains("static void read_only(const uint8_t data[]) {"),
        "body:\n{}",
        cpp.body
    );
    assert!(
        cpp.body.contains("static void fill(uint8_t data[]) {"),
        "body:\n{}",
        cpp.body
    );
    let c = generate_with(src, OutputLanguage::C, TargetChip::Generic, false);
    assert!(
        c.body.contains("static void read_only(uint8_t data[]) {"),
        "body:\n{}",
        c.body
    );
}

// Non-exported linkage.
#[test]
fn non_exported_symbols_get_static_linkage() {
    let out = generate("void helper() { }\nexport void api() { helper(); }\n");
    assert!(out.body.contains("static void helper(void) {"));
    assert!(out.body.contains("void api(void) {"));
    assert!(!out.body.contains("static void api"));
    assert!(out.header.contains("void api(void);"));
    assert!(!out.header.contains("helper(void);"));
}

// Determinism.
#[test]
fn generation_is_deterministic() {
    let src = "enum E { A, B }\nexport void f(E e) { switch (e) { case E.A { } case E.B { } } }";
    let first = generate(src);
    let second = generate(src);
    assert_eq!(first.body, second.body);
    assert_eq!(first.header, second.header);
}

// For loops.
#[test]
fn for_loop_keeps_declaration_inline() {
    let out = generate("void f() { for (u8 i <- 0; i < 10; i +<- 1) { } }");
    assert!(
        out.body
            .contains("for (uint8_t i = 0; i < 10; i = cnx_clamp_add_u8(i, 1)) {"),
        "body:\n{}",
        out.body
    );
}
