//! The diagnostic message registry.
//!
//! Codes are closed and versioned; new codes are added at the next free
//! number in the appropriate band. A code is never re-used for two
//! distinct conditions.

use super::DiagnosticCategory;
use super::DiagnosticMessage;

pub mod diagnostic_codes {
    // E02xx - naming
    pub const PARAMETER_NAME_REPEATS_FUNCTION: u32 = 201;
    pub const DUPLICATE_SYMBOL: u32 = 202;
    pub const CONFLICTS_WITH_HEADER: u32 = 203;

    // E03xx - struct fields & composite layout
    pub const UNKNOWN_FIELD: u32 = 301;
    pub const BITMAP_WIDTH_MISMATCH: u32 = 302;
    pub const REGISTER_ACCESS_VIOLATION: u32 = 303;
    pub const CALLBACK_SIGNATURE_MISMATCH: u32 = 304;

    // E04xx - resolution
    pub const UNDEFINED_SYMBOL: u32 = 401;
    pub const USE_BEFORE_DECLARATION: u32 = 402;
    pub const CALL_BEFORE_DECLARATION: u32 = 403;
    pub const UNRESOLVED_DIMENSION: u32 = 404;
    pub const CODEGEN_FAILED: u32 = 499;

    // E05xx - preprocessor, includes & comments
    pub const UNRESOLVED_INCLUDE: u32 = 501;
    pub const NESTED_BLOCK_COMMENT: u32 = 502;
    pub const LINE_CONTINUATION_COMMENT: u32 = 503;
    pub const PREPROCESSOR_FAILED: u32 = 504;
    pub const UNTERMINATED_COMMENT: u32 = 505;
    pub const DEPENDENCY_CYCLE: u32 = 506;
    pub const UNEXPECTED_CHARACTER: u32 = 507;
    pub const UNTERMINATED_STRING: u32 = 508;
    pub const PARSE_ERROR: u32 = 509;

    // E06xx - sizeof
    pub const SIZEOF_ARRAY_PARAMETER: u32 = 601;
    pub const SIZEOF_SIDE_EFFECTS: u32 = 602;
    pub const VARIABLE_LENGTH_ARRAY: u32 = 603;

    // E07xx - control flow
    pub const CONDITION_NOT_BOOLEAN: u32 = 701;
    pub const SWITCH_CASE_NEEDS_BLOCK: u32 = 702;
    pub const SWITCH_NOT_EXHAUSTIVE: u32 = 703;
    pub const DEFAULT_COUNT_MISMATCH: u32 = 704;
    pub const RETURN_IN_CRITICAL: u32 = 705;
    pub const RECURSION: u32 = 706;
    pub const MUTUAL_RECURSION: u32 = 707;
    pub const GOTO_FORBIDDEN: u32 = 708;
    pub const ASSIGNMENT_IN_CONDITION: u32 = 709;

    // E08xx - arithmetic & arrays
    pub const DIVISION_BY_ZERO: u32 = 801;
    pub const RUNTIME_DIVISOR: u32 = 802;
    pub const NARROWING: u32 = 803;
    pub const SIGN_CONVERSION: u32 = 804;
    pub const READ_BEFORE_DECLARATION: u32 = 805;
    pub const SLICE_OUT_OF_BOUNDS: u32 = 806;
    pub const SLICE_NOT_CONST: u32 = 807;
    pub const STRING_CAPACITY_EXCEEDED: u32 = 808;
    pub const LITERAL_OUT_OF_RANGE: u32 = 809;

    // E09xx - null safety
    pub const NULL_COMPARE_NAME: u32 = 901;
    pub const NULL_OUTSIDE_COMPARISON: u32 = 902;
    pub const HEAP_FUNCTION_FORBIDDEN: u32 = 903;
}

use diagnostic_codes as c;

/// Every diagnostic message the core can emit.
pub static DIAGNOSTIC_MESSAGES: &[DiagnosticMessage] = &[
    DiagnosticMessage {
        code: c::PARAMETER_NAME_REPEATS_FUNCTION,
        category: DiagnosticCategory::Error,
        message: "Parameter '{0}' may not begin with the name of its function '{1}'.",
    },
    DiagnosticMessage {
        code: c::DUPLICATE_SYMBOL,
        category: DiagnosticCategory::Error,
        message: "Duplicate definition of '{0}'; previously defined at {1}.",
    },
    DiagnosticMessage {
        code: c::CONFLICTS_WITH_HEADER,
        category: DiagnosticCategory::Error,
        message: "'{0}' conflicts with a declaration from '{1}'; declare the C-Next symbol 'extern' to share it.",
    },
    DiagnosticMessage {
        code: c::UNKNOWN_FIELD,
        category: DiagnosticCategory::Error,
        message: "'{0}' has no field named '{1}'.",
    },
    DiagnosticMessage {
        code: c::BITMAP_WIDTH_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "Bitmap '{0}' declares {1} bits but its fields cover {2}.",
    },
    DiagnosticMessage {
        code: c::REGISTER_ACCESS_VIOLATION,
        category: DiagnosticCategory::Error,
        message: "Register member '{0}' is {1}; this operation requires {2} access.",
    },
    DiagnosticMessage {
        code: c::CALLBACK_SIGNATURE_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "'{0}' cannot be assigned to a field of callback type '{1}'; callback types match by name, not shape.",
    },
    DiagnosticMessage {
        code: c::UNDEFINED_SYMBOL,
        category: DiagnosticCategory::Error,
        message: "Use of undefined symbol '{0}'.",
    },
    DiagnosticMessage {
        code: c::USE_BEFORE_DECLARATION,
        category: DiagnosticCategory::Error,
        message: "'{0}' is used before its declaration; C-Next requires declaration before use.",
    },
    DiagnosticMessage {
        code: c::CALL_BEFORE_DECLARATION,
        category: DiagnosticCategory::Error,
        message: "Call to '{0}' appears above its declaration in this file.",
    },
    DiagnosticMessage {
        code: c::UNRESOLVED_DIMENSION,
        category: DiagnosticCategory::Warning,
        message: "Array dimension '{0}' does not name a known constant; emitting it verbatim.",
    },
    DiagnosticMessage {
        code: c::CODEGEN_FAILED,
        category: DiagnosticCategory::Error,
        message: "Code generation failed",
    },
    DiagnosticMessage {
        code: c::UNRESOLVED_INCLUDE,
        category: DiagnosticCategory::Warning,
        message: "Unable to resolve #include {0}; leaving it to the downstream toolchain.",
    },
    DiagnosticMessage {
        code: c::NESTED_BLOCK_COMMENT,
        category: DiagnosticCategory::Error,
        message: "'/*' inside a block comment.",
    },
    DiagnosticMessage {
        code: c::LINE_CONTINUATION_COMMENT,
        category: DiagnosticCategory::Error,
        message: "Line continuation at the end of a '//' comment.",
    },
    DiagnosticMessage {
        code: c::PREPROCESSOR_FAILED,
        category: DiagnosticCategory::Warning,
        message: "Preprocessor invocation failed for '{0}'; using the raw header text.",
    },
    DiagnosticMessage {
        code: c::UNTERMINATED_COMMENT,
        category: DiagnosticCategory::Error,
        message: "Unterminated block comment.",
    },
    DiagnosticMessage {
        code: c::DEPENDENCY_CYCLE,
        category: DiagnosticCategory::Warning,
        message: "Include cycle involving '{0}'; processing order within the cycle is unspecified.",
    },
    DiagnosticMessage {
        code: c::UNEXPECTED_CHARACTER,
        category: DiagnosticCategory::Error,
        message: "Unexpected character '{0}'.",
    },
    DiagnosticMessage {
        code: c::UNTERMINATED_STRING,
        category: DiagnosticCategory::Error,
        message: "Unterminated string literal.",
    },
    DiagnosticMessage {
        code: c::PARSE_ERROR,
        category: DiagnosticCategory::Error,
        message: "Expected {0} but found '{1}'.",
    },
    DiagnosticMessage {
        code: c::SIZEOF_ARRAY_PARAMETER,
        category: DiagnosticCategory::Error,
        message: "sizeof on array parameter '{0}' would measure a pointer, not the array.",
    },
    DiagnosticMessage {
        code: c::SIZEOF_SIDE_EFFECTS,
        category: DiagnosticCategory::Error,
        message: "sizeof operand must not have side effects.",
    },
    DiagnosticMessage {
        code: c::VARIABLE_LENGTH_ARRAY,
        category: DiagnosticCategory::Error,
        message: "Array dimension must be a constant; variable-length arrays are not allowed.",
    },
    DiagnosticMessage {
        code: c::CONDITION_NOT_BOOLEAN,
        category: DiagnosticCategory::Error,
        message: "Condition must be a boolean expression.",
    },
    DiagnosticMessage {
        code: c::SWITCH_CASE_NEEDS_BLOCK,
        category: DiagnosticCategory::Error,
        message: "Each case must end in a brace block.",
    },
    DiagnosticMessage {
        code: c::SWITCH_NOT_EXHAUSTIVE,
        category: DiagnosticCategory::Error,
        message: "switch over enum '{0}' misses {1} variant(s) and has no default.",
    },
    DiagnosticMessage {
        code: c::DEFAULT_COUNT_MISMATCH,
        category: DiagnosticCategory::Error,
        message: "default({0}) allows {0} uncovered variant(s) but {1} are uncovered.",
    },
    DiagnosticMessage {
        code: c::RETURN_IN_CRITICAL,
        category: DiagnosticCategory::Error,
        message: "return inside a critical block would leave interrupts disabled.",
    },
    DiagnosticMessage {
        code: c::RECURSION,
        category: DiagnosticCategory::Error,
        message: "Function '{0}' calls itself.",
    },
    DiagnosticMessage {
        code: c::MUTUAL_RECURSION,
        category: DiagnosticCategory::Error,
        message: "Functions '{0}' and '{1}' are mutually recursive.",
    },
    DiagnosticMessage {
        code: c::GOTO_FORBIDDEN,
        category: DiagnosticCategory::Error,
        message: "goto is not part of C-Next.",
    },
    DiagnosticMessage {
        code: c::ASSIGNMENT_IN_CONDITION,
        category: DiagnosticCategory::Error,
        message: "'<-' is not allowed inside a condition.",
    },
    DiagnosticMessage {
        code: c::DIVISION_BY_ZERO,
        category: DiagnosticCategory::Error,
        message: "Division by zero.",
    },
    DiagnosticMessage {
        code: c::RUNTIME_DIVISOR,
        category: DiagnosticCategory::Error,
        message: "Divisor is not provably non-zero; use safe_div or safe_mod.",
    },
    DiagnosticMessage {
        code: c::NARROWING,
        category: DiagnosticCategory::Error,
        message: "Assigning {0} to {1} may lose information; extract bits explicitly (e.g. value[0, 8]).",
    },
    DiagnosticMessage {
        code: c::SIGN_CONVERSION,
        category: DiagnosticCategory::Error,
        message: "Implicit conversion between {0} and {1} changes signedness.",
    },
    DiagnosticMessage {
        code: c::READ_BEFORE_DECLARATION,
        category: DiagnosticCategory::Error,
        message: "'{0}' is read before it is declared in this block.",
    },
    DiagnosticMessage {
        code: c::SLICE_OUT_OF_BOUNDS,
        category: DiagnosticCategory::Error,
        message: "Slice [{0}, {1}] exceeds the capacity of '{2}'.",
    },
    DiagnosticMessage {
        code: c::SLICE_NOT_CONST,
        category: DiagnosticCategory::Error,
        message: "Slice offsets and lengths must be compile-time constants.",
    },
    DiagnosticMessage {
        code: c::STRING_CAPACITY_EXCEEDED,
        category: DiagnosticCategory::Error,
        message: "Result needs {0} bytes but '{1}' holds {2}.",
    },
    DiagnosticMessage {
        code: c::LITERAL_OUT_OF_RANGE,
        category: DiagnosticCategory::Error,
        message: "Literal {0} does not fit in {1}.",
    },
    DiagnosticMessage {
        code: c::NULL_COMPARE_NAME,
        category: DiagnosticCategory::Error,
        message: "Only pointer variables prefixed 'c_' may be compared to NULL.",
    },
    DiagnosticMessage {
        code: c::NULL_OUTSIDE_COMPARISON,
        category: DiagnosticCategory::Error,
        message: "NULL may only appear in a comparison.",
    },
    DiagnosticMessage {
        code: c::HEAP_FUNCTION_FORBIDDEN,
        category: DiagnosticCategory::Error,
        message: "'{0}' is not available; C-Next forbids dynamic allocation.",
    },
];
