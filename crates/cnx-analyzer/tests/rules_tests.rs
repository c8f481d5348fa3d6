use cnx_analyzer::{AnalysisContext, run_analyzers};
use cnx_common::LineMap;
use cnx_common::diagnostics::{Diagnostic, diagnostic_codes as c};
use cnx_resolver::SymbolTable;
use rustc_hash::FxHashSet;

fn analyze(source: &str) -> Vec<Diagnostic> {
    let result = cnx_parser::parse(source, "test.cnx", &FxHashSet::default());
    let unit = result
        .unit
        .unwrap_or_else(|| panic!("parse failed: {:?}", result.diagnostics));
    let mut table = SymbolTable::new();
    let collect_diags = cnx_resolver::collect::collect_unit(&unit, source, &mut table);
    assert!(collect_diags.is_empty(), "collect: {collect_diags:?}");
    let line_map = LineMap::build(source);
    let ctx = AnalysisContext::new(&unit, &result.tokens, source, &line_map, &table);
    run_analyzers(&ctx)
}

fn codes(source: &str) -> Vec<u32> {
    analyze(source).iter().map(|d| d.code).collect()
}

// Scenario: assignment-in-condition prevention.
#[test]
fn equality_on_non_bools_in_condition_is_rejected() {
    let src = "void f(u8 a, u8 b) { if (a = b) { } }";
    assert_eq!(codes(src), vec![c::CONDITION_NOT_BOOLEAN]);
}

#[test]
fn equality_on_bools_in_condition_is_fine() {
    let src = "void f(bool a, bool b) { if (a = b) { } }";
    assert!(codes(src).is_empty());
}

#[test]
fn comparison_condition_is_fine() {
    let src = "void f(u8 a) { while (a < 10) { a +<- 1; } }";
    assert!(codes(src).is_empty());
}

#[test]
fn non_boolean_condition_is_rejected() {
    let src = "void f(u8 a) { if (a) { } }";
    assert_eq!(codes(src), vec![c::CONDITION_NOT_BOOLEAN]);
}

// Scenario: narrowing cast.
#[test]
fn narrowing_assignment_is_rejected() {
    let src = "void f() { u32 big <- 1000; u8 small <- big; }";
    assert_eq!(codes(src), vec![c::NARROWING]);
}

#[test]
fn bit_extraction_narrows_legally() {
    let src = "void f() { u32 big <- 1000; u8 small <- big[0, 8]; }";
    assert!(codes(src).is_empty());
}

#[test]
fn literal_out_of_range_is_rejected() {
    let src = "void f() { u8 small <- 300; }";
    assert_eq!(codes(src), vec![c::LITERAL_OUT_OF_RANGE]);
}

#[test]
fn sign_conversion_is_rejected() {
    let src = "void f(i8 s) { u8 u <- s; }";
    assert_eq!(codes(src), vec![c::SIGN_CONVERSION]);
}

// Division.
#[test]
fn division_by_literal_zero_is_rejected() {
    let src = "void f(u8 a) { u8 x <- a / 0; }";
    assert!(codes(src).contains(&c::DIVISION_BY_ZERO));
}

#[test]
fn division_by_const_zero_is_rejected() {
    let src = "void f(u8 a) { const u8 Z <- 0; u8 x <- a / Z; }";
    assert!(codes(src).contains(&c::DIVISION_BY_ZERO));
}

#[test]
fn runtime_divisor_requires_safe_div() {
    let src = "void f(u8 a, u8 b) { u8 x <- a / b; }";
    assert_eq!(codes(src), vec![c::RUNTIME_DIVISOR]);
}

#[test]
fn safe_div_accepts_runtime_divisor() {
    let src = "void f(u8 a, u8 b) { u8 x <- a safe_div b; }";
    assert!(codes(src).is_empty());
}

// Recursion.
#[test]
fn self_recursion_is_rejected() {
    let src = "void spin(u8 n) { spin(n); }";
    assert!(codes(src).contains(&c::RECURSION));
}

#[test]
fn mutual_recursion_is_rejected() {
    let src = "void a(u8 n) { b(n); }\nvoid b(u8 n) { a(n); }\n";
    assert!(codes(src).contains(&c::MUTUAL_RECURSION));
}

#[test]
fn plain_call_chain_is_not_recursion() {
    let src = "void a(u8 n) { }\nvoid b(u8 n) { a(n); }\n";
    assert!(codes(src).is_empty());
}

// Call ordering.
#[test]
fn call_above_declaration_is_rejected() {
    let src = "void caller() { helper(); }\nvoid helper() { }\n";
    assert!(codes(src).contains(&c::CALL_BEFORE_DECLARATION));
}

#[test]
fn call_below_declaration_is_fine() {
    let src = "void helper() { }\nvoid caller() { helper(); }\n";
    assert!(codes(src).is_empty());
}

// Scenario: switch exhaustiveness.
#[test]
fn non_exhaustive_switch_is_rejected() {
    let src = "enum S { A, B, C }\n\
               void f(S s) { switch (s) { case S.A { } case S.B { } } }";
    assert_eq!(codes(src), vec![c::SWITCH_NOT_EXHAUSTIVE]);
}

#[test]
fn counted_default_matching_passes() {
    let src = "enum S { A, B, C }\n\
               void f(S s) { switch (s) { case S.A { } case S.B { } default(1) { } } }";
    assert!(codes(src).is_empty());
}

#[test]
fn counted_default_zero_with_uncovered_fails() {
    let src = "enum S { A, B, C }\n\
               void f(S s) { switch (s) { case S.A { } case S.B { } default(0) { } } }";
    assert_eq!(codes(src), vec![c::DEFAULT_COUNT_MISMATCH]);
}

#[test]
fn full_coverage_needs_no_default() {
    let src = "enum S { A, B }\n\
               void f(S s) { switch (s) { case S.A { } case S.B { } } }";
    assert!(codes(src).is_empty());
}

// Critical sections.
#[test]
fn return_inside_critical_is_rejected() {
    let src = "u8 f() { critical { return 1; } }";
    assert!(codes(src).contains(&c::RETURN_IN_CRITICAL));
}

// Parameter naming.
#[test]
fn parameter_repeating_function_name_is_rejected() {
    let src = "void setSpeed(u8 setSpeedValue) { }";
    assert_eq!(codes(src), vec![c::PARAMETER_NAME_REPEATS_FUNCTION]);
}

// goto.
#[test]
fn goto_is_rejected() {
    let src = "void f() { goto done; }";
    assert_eq!(codes(src), vec![c::GOTO_FORBIDDEN]);
}

// sizeof.
#[test]
fn sizeof_array_parameter_is_rejected() {
    let src = "void f(u8 data[]) { usize n <- sizeof(data); }";
    assert_eq!(codes(src), vec![c::SIZEOF_ARRAY_PARAMETER]);
}

#[test]
fn sizeof_with_call_operand_is_rejected() {
    let src = "u8 g() { return 1; }\nvoid f() { usize n <- sizeof(g()); }";
    assert_eq!(codes(src), vec![c::SIZEOF_SIDE_EFFECTS]);
}

#[test]
fn vla_is_rejected() {
    let src = "void f(u8 n) { u8 buf[n]; }";
    assert!(codes(src).contains(&c::VARIABLE_LENGTH_ARRAY));
}

#[test]
fn const_dimension_is_not_a_vla() {
    let src = "const u8 N <- 4;\nvoid f() { u8 buf[N]; }";
    assert!(codes(src).is_empty());
}

// Null safety.
#[test]
fn null_compare_requires_c_prefix() {
    let src = "void f(cstring name) { if (name = NULL) { } }";
    assert_eq!(codes(src), vec![c::NULL_COMPARE_NAME]);
}

#[test]
fn null_compare_on_c_prefixed_is_fine() {
    let src = "void f(cstring c_name) { if (c_name = NULL) { } }";
    assert!(codes(src).is_empty());
}

#[test]
fn null_outside_comparison_is_rejected() {
    let src = "void g(cstring c_s) { }\nvoid f() { g(NULL); }";
    assert!(codes(src).contains(&c::NULL_OUTSIDE_COMPARISON));
}

#[test]
fn heap_functions_are_rejected() {
    let src = "void f() { malloc(10); }";
    assert!(codes(src).contains(&c::HEAP_FUNCTION_FORBIDDEN));
}

// Slices.
#[test]
fn slice_with_runtime_bounds_is_rejected() {
    let src = "void f(u8 n) { u32 x <- 0; u8 b <- x[n, 8]; }";
    assert!(codes(src).contains(&c::SLICE_NOT_CONST));
}

#[test]
fn slice_beyond_capacity_is_rejected() {
    let src = "void f() { u8 buf[4]; buf[2, 4] <- buf; }";
    assert!(codes(src).contains(&c::SLICE_OUT_OF_BOUNDS));
}

// Strings.
#[test]
fn string_literal_over_capacity_is_rejected() {
    let src = "void f() { string<3> s <- \"hello\"; }";
    assert_eq!(codes(src), vec![c::STRING_CAPACITY_EXCEEDED]);
}

#[test]
fn string_concat_over_capacity_is_rejected() {
    let src = "void f() { string<8> a <- \"abcd\"; string<8> b <- \"efgh\"; string<8> s; s <- a + b; }";
    assert!(codes(src).contains(&c::STRING_CAPACITY_EXCEEDED));
}

// Comments.
#[test]
fn nested_block_comment_is_rejected() {
    let src = "/* outer /* inner */ u8 x;";
    assert_eq!(codes(src), vec![c::NESTED_BLOCK_COMMENT]);
}

#[test]
fn line_continuation_comment_is_rejected() {
    let src = "// trailing \\\nu8 x;";
    assert_eq!(codes(src), vec![c::LINE_CONTINUATION_COMMENT]);
}

// Initialization.
#[test]
fn read_before_declaration_is_rejected() {
    let src = "void f() { u8 a <- later; u8 later <- 1; }";
    assert!(codes(src).contains(&c::READ_BEFORE_DECLARATION));
}
