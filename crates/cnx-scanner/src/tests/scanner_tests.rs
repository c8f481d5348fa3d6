use super::*;

fn kinds(source: &str) -> Vec<SyntaxKind> {
    let (tokens, diagnostics) = scan(source, "test.cnx");
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
    tokens.iter().map(|t| t.kind).collect()
}

#[test]
fn scans_assignment_arrows() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("x <- 1;"),
        vec![Identifier, LeftArrow, IntLiteral, Semicolon, Eof]
    );
    assert_eq!(
        kinds("x +<- y;"),
        vec![Identifier, PlusArrow, Identifier, Semicolon, Eof]
    );
}

#[test]
fn shift_arrows_win_over_shift() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("x <<<- 2;"),
        vec![Identifier, ShlArrow, IntLiteral, Semicolon, Eof]
    );
    assert_eq!(
        kinds("x >><- 2;"),
        vec![Identifier, ShrArrow, IntLiteral, Semicolon, Eof]
    );
    assert_eq!(
        kinds("a << b"),
        vec![Identifier, Shl, Identifier, Eof]
    );
}

#[test]
fn equals_is_a_single_token() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("a = b"),
        vec![Identifier, Equals, Identifier, Eof]
    );
    assert_eq!(
        kinds("a != b"),
        vec![Identifier, BangEquals, Identifier, Eof]
    );
}

#[test]
fn keywords_and_identifiers() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("clamp u8 speed"),
        vec![ClampKw, U8Kw, Identifier, Eof]
    );
    // ISR is case-sensitive
    assert_eq!(kinds("isr"), vec![Identifier, Eof]);
    assert_eq!(kinds("ISR"), vec![IsrKw, Eof]);
}

#[test]
fn comments_are_trivia_in_stream() {
    use SyntaxKind::*;
    let (tokens, diagnostics) = scan("// note\nu8 x; /* block */ /// doc\n", "t.cnx");
    assert!(diagnostics.is_empty());
    let got: Vec<SyntaxKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(
        got,
        vec![LineComment, U8Kw, Identifier, Semicolon, BlockComment, DocComment, Eof]
    );
}

#[test]
fn comment_text_is_preserved() {
    let src = "/* keep me */ u8 x;";
    let (tokens, _) = scan(src, "t.cnx");
    assert_eq!(tokens[0].text(src), "/* keep me */");
}

#[test]
fn directives_span_the_whole_line() {
    use SyntaxKind::*;
    let src = "#include \"motor.cnx\"\nu8 x;\n";
    let (tokens, diagnostics) = scan(src, "t.cnx");
    assert!(diagnostics.is_empty());
    assert_eq!(tokens[0].kind, HashInclude);
    assert_eq!(tokens[0].text(src), "#include \"motor.cnx\"");
    assert_eq!(tokens[1].kind, U8Kw);
}

#[test]
fn angle_include_directive() {
    let src = "#include <Arduino.h>\n";
    let (tokens, _) = scan(src, "t.cnx");
    assert_eq!(tokens[0].kind, SyntaxKind::HashInclude);
    assert_eq!(tokens[0].text(src), "#include <Arduino.h>");
}

#[test]
fn pragma_and_define() {
    use SyntaxKind::*;
    let src = "#pragma target cortex-m7\n#define FEATURE\n";
    let (tokens, _) = scan(src, "t.cnx");
    let got: Vec<SyntaxKind> = tokens.iter().map(|t| t.kind).collect();
    assert_eq!(got, vec![HashPragma, HashDefine, Eof]);
}

#[test]
fn numbers() {
    use SyntaxKind::*;
    assert_eq!(kinds("42 0xFF 0b101 3.25"), vec![
        IntLiteral,
        IntLiteral,
        IntLiteral,
        FloatLiteral,
        Eof
    ]);
}

#[test]
fn unterminated_comment_reports() {
    let (tokens, diagnostics) = scan("/* never closed", "t.cnx");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, cnx_common::diagnostics::diagnostic_codes::UNTERMINATED_COMMENT);
    assert_eq!(tokens[0].kind, SyntaxKind::BlockComment);
}

#[test]
fn unterminated_string_reports() {
    let (_, diagnostics) = scan("\"oops\n", "t.cnx");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].code, cnx_common::diagnostics::diagnostic_codes::UNTERMINATED_STRING);
}

#[test]
fn unexpected_character_reports_position() {
    let (_, diagnostics) = scan("u8 x;\n$\n", "t.cnx");
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].line, 2);
    assert_eq!(diagnostics[0].column, 1);
}

#[test]
fn register_declaration_tokens() {
    use SyntaxKind::*;
    assert_eq!(
        kinds("register GPIO7 @ 0x42004000 { DR: u32 rw @ 0x0; }"),
        vec![
            RegisterKw, Identifier, At, IntLiteral, LBrace, Identifier, Colon, U32Kw,
            Identifier, At, IntLiteral, Semicolon, RBrace, Eof
        ]
    );
}
