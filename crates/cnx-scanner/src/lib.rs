//! Scanner for the CNX dialect.
//!
//! Produces a flat token stream over the source text. Comments are scanned
//! as trivia tokens and kept in the stream so the emitter can replay them
//! into the generated C at their original relative positions. Preprocessor
//! directives are scanned as single whole-line tokens; the parser extracts
//! their arguments (and stage 6 re-emits the literal text verbatim).

pub mod token;

pub use token::{SyntaxKind, Token};

use cnx_common::LineMap;
use cnx_common::Span;
use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};

/// Scan `source` into tokens. Scan problems (unterminated comment or
/// string, stray bytes) are returned as diagnostics alongside an `Error`
/// token so the parser can keep going.
pub fn scan(source: &str, file: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    let mut scanner = Scanner::new(source, file);
    scanner.run();
    (scanner.tokens, scanner.diagnostics)
}

struct Scanner<'a> {
    src: &'a [u8],
    text: &'a str,
    file: &'a str,
    line_map: LineMap,
    pos: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    fn new(text: &'a str, file: &'a str) -> Self {
        Scanner {
            src: text.as_bytes(),
            text,
            file,
            line_map: LineMap::build(text),
            pos: 0,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn run(&mut self) {
        while self.pos < self.src.len() {
            let start = self.pos;
            let ch = self.src[self.pos];
            match ch {
                b' ' | b'\t' | b'\r' | b'\n' => {
                    self.pos += 1;
                }
                b'/' => self.scan_slash(start),
                b'#' => self.scan_directive(start),
                b'"' => self.scan_string(start),
                b'\'' => self.scan_char(start),
                b'0'..=b'9' => self.scan_number(start),
                b'a'..=b'z' | b'A'..=b'Z' | b'_' => self.scan_word(start),
                _ => self.scan_operator(start),
            }
        }
        let end = self.pos as u32;
        self.push(SyntaxKind::Eof, Span::new(end, end));
    }

    fn push(&mut self, kind: SyntaxKind, span: Span) {
        self.tokens.push(Token { kind, span });
    }

    fn error_at(&mut self, offset: usize, code: u32, args: &[&str]) {
        let pos = self.line_map.position(offset as u32);
        self.diagnostics.push(Diagnostic::error(
            self.file,
            pos.line,
            pos.column,
            message(code, args),
            code,
        ));
    }

    fn peek(&self, ahead: usize) -> u8 {
        self.src.get(self.pos + ahead).copied().unwrap_or(0)
    }

    /// Does the source at the cursor start with `s`?
    fn looking_at(&self, s: &str) -> bool {
        self.src[self.pos..].starts_with(s.as_bytes())
    }

    fn take(&mut self, kind: SyntaxKind, len: usize, start: usize) {
        self.pos += len;
        self.push(kind, Span::new(start as u32, self.pos as u32));
    }

    fn scan_slash(&mut self, start: usize) {
        if self.looking_at("///") {
            while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
                self.pos += 1;
            }
            self.push(SyntaxKind::DocComment, Span::new(start as u32, self.pos as u32));
        } else if self.looking_at("//") {
            while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
                self.pos += 1;
            }
            self.push(SyntaxKind::LineComment, Span::new(start as u32, self.pos as u32));
        } else if self.looking_at("/*") {
            self.pos += 2;
            let mut closed = false;
            while self.pos + 1 < self.src.len() {
                if self.src[self.pos] == b'*' && self.src[self.pos + 1] == b'/' {
                    self.pos += 2;
                    closed = true;
                    break;
                }
                self.pos += 1;
            }
            if !closed {
                self.pos = self.src.len();
                self.error_at(start, diagnostic_codes::UNTERMINATED_COMMENT, &[]);
            }
            self.push(SyntaxKind::BlockComment, Span::new(start as u32, self.pos as u32));
        } else if self.looking_at("/<-") {
            self.take(SyntaxKind::SlashArrow, 3, start);
        } else {
            self.take(SyntaxKind::Slash, 1, start);
        }
    }

    /// Directives are one token spanning the rest of the line; the parser
    /// pulls arguments (and the verbatim text) back out of the span.
    fn scan_directive(&mut self, start: usize) {
        self.pos += 1;
        let word_start = self.pos;
        while self.pos < self.src.len() && self.src[self.pos].is_ascii_alphabetic() {
            self.pos += 1;
        }
        let word = &self.text[word_start..self.pos];
        let kind = match word {
            "include" => SyntaxKind::HashInclude,
            "define" => SyntaxKind::HashDefine,
            "pragma" => SyntaxKind::HashPragma,
            "if" => SyntaxKind::HashIf,
            "ifdef" => SyntaxKind::HashIfdef,
            "ifndef" => SyntaxKind::HashIfndef,
            "else" => SyntaxKind::HashElse,
            "endif" => SyntaxKind::HashEndif,
            _ => SyntaxKind::Error,
        };
        if kind == SyntaxKind::Error {
            self.error_at(start, diagnostic_codes::UNEXPECTED_CHARACTER, &["#"]);
        }
        while self.pos < self.src.len() && self.src[self.pos] != b'\n' {
            self.pos += 1;
        }
        // Trim a trailing \r out of the span
        let mut end = self.pos;
        if end > start && self.src[end - 1] == b'\r' {
            end -= 1;
        }
        self.push(kind, Span::new(start as u32, end as u32));
    }

    fn scan_string(&mut self, start: usize) {
        self.pos += 1;
        loop {
            match self.src.get(self.pos) {
                None | Some(b'\n') => {
                    self.error_at(start, diagnostic_codes::UNTERMINATED_STRING, &[]);
                    break;
                }
                Some(b'"') => {
                    self.pos += 1;
                    break;
                }
                Some(b'\\') => {
                    self.pos += 2;
                }
                Some(_) => {
                    self.pos += 1;
                }
            }
        }
        self.pos = self.pos.min(self.src.len());
        self.push(SyntaxKind::StringLiteral, Span::new(start as u32, self.pos as u32));
    }

    fn scan_char(&mut self, start: usize) {
        self.pos += 1;
        if self.peek(0) == b'\\' {
            self.pos += 2;
        } else {
            self.pos += 1;
        }
        if self.peek(0) == b'\'' {
            self.pos += 1;
        } else {
            self.error_at(start, diagnostic_codes::UNTERMINATED_STRING, &[]);
        }
        self.pos = self.pos.min(self.src.len());
        self.push(SyntaxKind::CharLiteral, Span::new(start as u32, self.pos as u32));
    }

    fn scan_number(&mut self, start: usize) {
        let mut is_float = false;
        if self.looking_at("0x") || self.looking_at("0X") {
            self.pos += 2;
            while self.peek(0).is_ascii_hexdigit() {
                self.pos += 1;
            }
        } else if self.looking_at("0b") || self.looking_at("0B") {
            self.pos += 2;
            while matches!(self.peek(0), b'0' | b'1') {
                self.pos += 1;
            }
        } else {
            while self.peek(0).is_ascii_digit() {
                self.pos += 1;
            }
            if self.peek(0) == b'.' && self.peek(1).is_ascii_digit() {
                is_float = true;
                self.pos += 1;
                while self.peek(0).is_ascii_digit() {
                    self.pos += 1;
                }
            }
        }
        let kind = if is_float {
            SyntaxKind::FloatLiteral
        } else {
            SyntaxKind::IntLiteral
        };
        self.push(kind, Span::new(start as u32, self.pos as u32));
    }

    fn scan_word(&mut self, start: usize) {
        while matches!(self.peek(0), b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'_') {
            self.pos += 1;
        }
        let text = &self.text[start..self.pos];
        let kind = keyword_kind(text).unwrap_or(SyntaxKind::Identifier);
        self.push(kind, Span::new(start as u32, self.pos as u32));
    }

    fn scan_operator(&mut self, start: usize) {
        use SyntaxKind::*;
        // Longest match first; the arrow family nests inside shift tokens.
        let table: &[(&str, SyntaxKind)] = &[
            ("<<<-", ShlArrow),
            (">><-", ShrArrow),
            ("+<-", PlusArrow),
            ("-<-", MinusArrow),
            ("*<-", StarArrow),
            ("%<-", PercentArrow),
            ("&<-", AmpArrow),
            ("|<-", PipeArrow),
            ("^<-", CaretArrow),
            ("<-", LeftArrow),
            ("<<", Shl),
            (">>", Shr),
            ("<=", LessEquals),
            (">=", GreaterEquals),
            ("!=", BangEquals),
            ("&&", AmpAmp),
            ("||", PipePipe),
            ("<", Less),
            (">", Greater),
            ("=", Equals),
            ("+", Plus),
            ("-", Minus),
            ("*", Star),
            ("%", Percent),
            ("&", Amp),
            ("|", Pipe),
            ("^", Caret),
            ("~", Tilde),
            ("!", Bang),
            ("?", Question),
            (":", Colon),
            (";", Semicolon),
            (",", Comma),
            (".", Dot),
            ("@", At),
            ("(", LParen),
            (")", RParen),
            ("{", LBrace),
            ("}", RBrace),
            ("[", LBracket),
            ("]", RBracket),
        ];
        for (text, kind) in table {
            if self.looking_at(text) {
                self.take(*kind, text.len(), start);
                return;
            }
        }
        let ch = self.text[start..].chars().next().unwrap_or('\u{fffd}');
        self.error_at(start, diagnostic_codes::UNEXPECTED_CHARACTER, &[&ch.to_string()]);
        self.take(SyntaxKind::Error, ch.len_utf8(), start);
    }
}

/// Map an identifier-shaped word to its keyword kind, if any.
pub fn keyword_kind(text: &str) -> Option<SyntaxKind> {
    use SyntaxKind::*;
    let kind = match text {
        "u8" => U8Kw,
        "u16" => U16Kw,
        "u32" => U32Kw,
        "u64" => U64Kw,
        "i8" => I8Kw,
        "i16" => I16Kw,
        "i32" => I32Kw,
        "i64" => I64Kw,
        "f32" => F32Kw,
        "f64" => F64Kw,
        "bool" => BoolKw,
        "void" => VoidKw,
        "usize" => UsizeKw,
        "isize" => IsizeKw,
        "cstring" => CstringKw,
        "string" => StringKw,
        "const" => ConstKw,
        "static" => StaticKw,
        "extern" => ExternKw,
        "volatile" => VolatileKw,
        "atomic" => AtomicKw,
        "clamp" => ClampKw,
        "wrap" => WrapKw,
        "export" => ExportKw,
        "ISR" => IsrKw,
        "scope" => ScopeKw,
        "struct" => StructKw,
        "enum" => EnumKw,
        "register" => RegisterKw,
        "bitmap8" => Bitmap8Kw,
        "bitmap16" => Bitmap16Kw,
        "bitmap24" => Bitmap24Kw,
        "bitmap32" => Bitmap32Kw,
        "if" => IfKw,
        "else" => ElseKw,
        "while" => WhileKw,
        "do" => DoKw,
        "for" => ForKw,
        "switch" => SwitchKw,
        "case" => CaseKw,
        "default" => DefaultKw,
        "return" => ReturnKw,
        "critical" => CriticalKw,
        "goto" => GotoKw,
        "true" => TrueKw,
        "false" => FalseKw,
        "NULL" => NullKw,
        "sizeof" => SizeofKw,
        "this" => ThisKw,
        "global" => GlobalKw,
        "safe_div" => SafeDivKw,
        "safe_mod" => SafeModKw,
        _ => return None,
    };
    Some(kind)
}

#[cfg(test)]
#[path = "tests/scanner_tests.rs"]
mod tests;
