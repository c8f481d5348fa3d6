//! Token kinds and the token value.

use cnx_common::Span;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SyntaxKind {
    // Terminals
    Identifier,
    IntLiteral,
    FloatLiteral,
    StringLiteral,
    CharLiteral,

    // Trivia retained in the stream
    LineComment,
    BlockComment,
    DocComment,

    // Type keywords
    U8Kw,
    U16Kw,
    U32Kw,
    U64Kw,
    I8Kw,
    I16Kw,
    I32Kw,
    I64Kw,
    F32Kw,
    F64Kw,
    BoolKw,
    VoidKw,
    UsizeKw,
    IsizeKw,
    CstringKw,
    StringKw,

    // Declaration keywords
    ConstKw,
    StaticKw,
    ExternKw,
    VolatileKw,
    AtomicKw,
    ClampKw,
    WrapKw,
    ExportKw,
    IsrKw,
    ScopeKw,
    StructKw,
    EnumKw,
    RegisterKw,
    Bitmap8Kw,
    Bitmap16Kw,
    Bitmap24Kw,
    Bitmap32Kw,

    // Statement keywords
    IfKw,
    ElseKw,
    WhileKw,
    DoKw,
    ForKw,
    SwitchKw,
    CaseKw,
    DefaultKw,
    ReturnKw,
    CriticalKw,
    GotoKw,

    // Expression keywords
    TrueKw,
    FalseKw,
    NullKw,
    SizeofKw,
    ThisKw,
    GlobalKw,
    SafeDivKw,
    SafeModKw,

    // Directives; each token spans the whole directive line
    HashInclude,
    HashDefine,
    HashPragma,
    HashIf,
    HashIfdef,
    HashIfndef,
    HashElse,
    HashEndif,

    // Assignment operators
    LeftArrow,
    PlusArrow,
    MinusArrow,
    StarArrow,
    SlashArrow,
    PercentArrow,
    AmpArrow,
    PipeArrow,
    CaretArrow,
    ShlArrow,
    ShrArrow,

    // Operators & punctuation
    Equals,
    BangEquals,
    Less,
    LessEquals,
    Greater,
    GreaterEquals,
    Shl,
    Shr,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    Bang,
    Question,
    Colon,
    Semicolon,
    Comma,
    Dot,
    At,
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,

    Eof,
    Error,
}

impl SyntaxKind {
    /// Trivia is kept in the stream but skipped by the parser cursor.
    pub const fn is_trivia(self) -> bool {
        matches!(
            self,
            SyntaxKind::LineComment | SyntaxKind::BlockComment | SyntaxKind::DocComment
        )
    }

    pub const fn is_comment(self) -> bool {
        self.is_trivia()
    }

    pub const fn is_directive(self) -> bool {
        matches!(
            self,
            SyntaxKind::HashInclude
                | SyntaxKind::HashDefine
                | SyntaxKind::HashPragma
                | SyntaxKind::HashIf
                | SyntaxKind::HashIfdef
                | SyntaxKind::HashIfndef
                | SyntaxKind::HashElse
                | SyntaxKind::HashEndif
        )
    }

    /// Keywords that can begin a type expression.
    pub const fn is_type_start(self) -> bool {
        matches!(
            self,
            SyntaxKind::U8Kw
                | SyntaxKind::U16Kw
                | SyntaxKind::U32Kw
                | SyntaxKind::U64Kw
                | SyntaxKind::I8Kw
                | SyntaxKind::I16Kw
                | SyntaxKind::I32Kw
                | SyntaxKind::I64Kw
                | SyntaxKind::F32Kw
                | SyntaxKind::F64Kw
                | SyntaxKind::BoolKw
                | SyntaxKind::VoidKw
                | SyntaxKind::UsizeKw
                | SyntaxKind::IsizeKw
                | SyntaxKind::CstringKw
                | SyntaxKind::StringKw
        )
    }

    /// Variable qualifier keywords.
    pub const fn is_qualifier(self) -> bool {
        matches!(
            self,
            SyntaxKind::ConstKw
                | SyntaxKind::StaticKw
                | SyntaxKind::ExternKw
                | SyntaxKind::VolatileKw
                | SyntaxKind::AtomicKw
                | SyntaxKind::ClampKw
                | SyntaxKind::WrapKw
                | SyntaxKind::ExportKw
        )
    }

    /// Compound assignment arrows (everything except plain `<-`).
    pub const fn is_compound_arrow(self) -> bool {
        matches!(
            self,
            SyntaxKind::PlusArrow
                | SyntaxKind::MinusArrow
                | SyntaxKind::StarArrow
                | SyntaxKind::SlashArrow
                | SyntaxKind::PercentArrow
                | SyntaxKind::AmpArrow
                | SyntaxKind::PipeArrow
                | SyntaxKind::CaretArrow
                | SyntaxKind::ShlArrow
                | SyntaxKind::ShrArrow
        )
    }

    /// Human-readable name used in parse errors.
    pub const fn describe(self) -> &'static str {
        use SyntaxKind::*;
        match self {
            Identifier => "an identifier",
            IntLiteral => "an integer literal",
            FloatLiteral => "a float literal",
            StringLiteral => "a string literal",
            CharLiteral => "a character literal",
            LeftArrow => "'<-'",
            Equals => "'='",
            Semicolon => "';'",
            Colon => "':'",
            Comma => "','",
            Dot => "'.'",
            At => "'@'",
            LParen => "'('",
            RParen => "')'",
            LBrace => "'{'",
            RBrace => "'}'",
            LBracket => "'['",
            RBracket => "']'",
            Eof => "end of file",
            _ => "a token",
        }
    }
}

/// A scanned token: kind plus byte span. Text is recovered from the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: SyntaxKind,
    pub span: Span,
}

impl Token {
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        self.span.slice(source)
    }
}
