//! The CNX abstract syntax tree.
//!
//! Owned, spanned nodes. Cross-references (type names, call targets, array
//! dimensions naming constants) stay as strings; the resolver's symbol
//! table is the resolution oracle.

use cnx_common::Span;
use serde::{Deserialize, Serialize};

/// An identifier with its span.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

/// One parsed CNX file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SourceUnit {
    pub path: String,
    pub includes: Vec<IncludeDirective>,
    /// Flag-only `#define NAME` directives seen in this file.
    pub defines: Vec<String>,
    /// `#pragma target <chip>`, if present.
    pub pragma_target: Option<String>,
    pub items: Vec<Item>,
}

/// An `#include` directive with its literal text preserved for stage 6.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncludeDirective {
    /// The verbatim directive line, e.g. `#include "motor.cnx"`.
    pub literal: String,
    /// The bare path between the delimiters.
    pub path: String,
    /// Angle-bracket include (search only the include path).
    pub system: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Item {
    Scope(ScopeDecl),
    Function(FunctionDecl),
    Variable(VarDecl),
    Struct(StructDecl),
    Enum(EnumDecl),
    Bitmap(BitmapDecl),
    Register(RegisterDecl),
}

impl Item {
    pub fn span(&self) -> Span {
        match self {
            Item::Scope(d) => d.span,
            Item::Function(d) => d.span,
            Item::Variable(d) => d.span,
            Item::Struct(d) => d.span,
            Item::Enum(d) => d.span,
            Item::Bitmap(d) => d.span,
            Item::Register(d) => d.span,
        }
    }
}

/// `scope X { ... }` - a named naming-context contributing to mangling.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopeDecl {
    pub name: Ident,
    pub items: Vec<Item>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDecl {
    pub name: Ident,
    /// The type written in return position. When it names another function
    /// this declaration conforms to that callback type.
    pub return_type: TypeExpr,
    pub params: Vec<Param>,
    pub body: Block,
    pub is_exported: bool,
    pub is_isr: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: Ident,
    pub ty: TypeExpr,
    pub is_const: bool,
    /// Trailing `[]` - the parameter is an array.
    pub is_array: bool,
    pub span: Span,
}

/// Overflow behavior for arithmetic on a variable. Clamp is the default.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverflowMode {
    #[default]
    Clamp,
    Wrap,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifiers {
    pub is_const: bool,
    pub is_static: bool,
    pub is_extern: bool,
    pub is_volatile: bool,
    pub is_atomic: bool,
    pub is_exported: bool,
    /// Present only when the source spelled `clamp` or `wrap` explicitly.
    pub overflow: Option<OverflowMode>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VarDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub dims: Vec<Dimension>,
    pub init: Option<Expr>,
    pub quals: Qualifiers,
    pub span: Span,
}

/// An array dimension: a literal, or a name resolved in stage 3b.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Dimension {
    Literal(u64),
    /// `buf[SIZE]` - a constant declared elsewhere, or a C macro.
    Named(String),
    /// `buf[EColor.COUNT]` - qualified enum member.
    Scoped(Vec<String>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructDecl {
    pub name: Ident,
    pub fields: Vec<FieldDecl>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: Ident,
    pub ty: TypeExpr,
    pub dims: Vec<Dimension>,
    pub is_const: bool,
    pub is_atomic: bool,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub name: Ident,
    pub members: Vec<EnumMember>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumMember {
    pub name: Ident,
    pub value: Option<i64>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BitmapDecl {
    pub name: Ident,
    /// 8, 16, 24 or 32.
    pub bit_width: u8,
    pub fields: Vec<BitmapField>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BitmapField {
    pub name: Ident,
    pub width: u8,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterDecl {
    pub name: Ident,
    pub base_address: u64,
    pub members: Vec<RegisterMember>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterMember {
    pub name: Ident,
    pub ty: TypeExpr,
    pub access: cnx_common::Access,
    pub offset: u64,
    pub span: Span,
}

/// A type as written in source.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeExpr {
    Primitive(Primitive),
    /// struct/enum/bitmap/callback/external type by name.
    Named(String),
    /// `string<N>` - fixed-capacity string, compiles to `char[N+1]`.
    String { capacity: u32 },
}

impl TypeExpr {
    pub fn is_void(&self) -> bool {
        matches!(self, TypeExpr::Primitive(Primitive::Void))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Primitive {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
    Bool,
    Void,
    Usize,
    Isize,
    CString,
}

impl Primitive {
    /// The C spelling (stdint names).
    pub const fn c_name(self) -> &'static str {
        match self {
            Primitive::U8 => "uint8_t",
            Primitive::U16 => "uint16_t",
            Primitive::U32 => "uint32_t",
            Primitive::U64 => "uint64_t",
            Primitive::I8 => "int8_t",
            Primitive::I16 => "int16_t",
            Primitive::I32 => "int32_t",
            Primitive::I64 => "int64_t",
            Primitive::F32 => "float",
            Primitive::F64 => "double",
            Primitive::Bool => "bool",
            Primitive::Void => "void",
            Primitive::Usize => "size_t",
            Primitive::Isize => "ptrdiff_t",
            Primitive::CString => "const char*",
        }
    }

    /// The CNX spelling.
    pub const fn cnx_name(self) -> &'static str {
        match self {
            Primitive::U8 => "u8",
            Primitive::U16 => "u16",
            Primitive::U32 => "u32",
            Primitive::U64 => "u64",
            Primitive::I8 => "i8",
            Primitive::I16 => "i16",
            Primitive::I32 => "i32",
            Primitive::I64 => "i64",
            Primitive::F32 => "f32",
            Primitive::F64 => "f64",
            Primitive::Bool => "bool",
            Primitive::Void => "void",
            Primitive::Usize => "usize",
            Primitive::Isize => "isize",
            Primitive::CString => "cstring",
        }
    }

    pub const fn is_integer(self) -> bool {
        matches!(
            self,
            Primitive::U8
                | Primitive::U16
                | Primitive::U32
                | Primitive::U64
                | Primitive::I8
                | Primitive::I16
                | Primitive::I32
                | Primitive::I64
                | Primitive::Usize
                | Primitive::Isize
        )
    }

    pub const fn is_signed(self) -> bool {
        matches!(
            self,
            Primitive::I8 | Primitive::I16 | Primitive::I32 | Primitive::I64 | Primitive::Isize
        )
    }

    pub const fn is_float(self) -> bool {
        matches!(self, Primitive::F32 | Primitive::F64)
    }

    /// Bit width for sized integers; usize/isize count as 32 on the
    /// embedded targets this translator serves.
    pub const fn bit_width(self) -> u32 {
        match self {
            Primitive::U8 | Primitive::I8 => 8,
            Primitive::U16 | Primitive::I16 => 16,
            Primitive::U32 | Primitive::I32 | Primitive::Usize | Primitive::Isize => 32,
            Primitive::U64 | Primitive::I64 => 64,
            Primitive::F32 => 32,
            Primitive::F64 => 64,
            Primitive::Bool => 1,
            Primitive::Void | Primitive::CString => 0,
        }
    }
}

// =============================================================================
// Statements
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Var(VarDecl),
    Assign(AssignStmt),
    If(IfStmt),
    While(WhileStmt),
    DoWhile(DoWhileStmt),
    For(ForStmt),
    Switch(SwitchStmt),
    Return(ReturnStmt),
    Critical(Block),
    Block(Block),
    Expr(ExprStmt),
    /// Parsed so the analyzer can reject it with its own diagnostic.
    Goto(GotoStmt),
}

impl Stmt {
    pub fn span(&self) -> Span {
        match self {
            Stmt::Var(s) => s.span,
            Stmt::Assign(s) => s.span,
            Stmt::If(s) => s.span,
            Stmt::While(s) => s.span,
            Stmt::DoWhile(s) => s.span,
            Stmt::For(s) => s.span,
            Stmt::Switch(s) => s.span,
            Stmt::Return(s) => s.span,
            Stmt::Critical(b) => b.span,
            Stmt::Block(b) => b.span,
            Stmt::Expr(s) => s.span,
            Stmt::Goto(s) => s.span,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssignOp {
    /// `<-`
    Set,
    /// `+<-`
    Add,
    /// `-<-`
    Sub,
    /// `*<-`
    Mul,
    /// `/<-`
    Div,
    /// `%<-`
    Mod,
    /// `&<-`
    And,
    /// `|<-`
    Or,
    /// `^<-`
    Xor,
    /// `<<<-`
    Shl,
    /// `>><-`
    Shr,
}

impl AssignOp {
    /// The C compound-assignment spelling.
    pub const fn c_operator(self) -> &'static str {
        match self {
            AssignOp::Set => "=",
            AssignOp::Add => "+=",
            AssignOp::Sub => "-=",
            AssignOp::Mul => "*=",
            AssignOp::Div => "/=",
            AssignOp::Mod => "%=",
            AssignOp::And => "&=",
            AssignOp::Or => "|=",
            AssignOp::Xor => "^=",
            AssignOp::Shl => "<<=",
            AssignOp::Shr => ">>=",
        }
    }

    /// Whether arithmetic overflow helpers apply to this operator.
    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            AssignOp::Add | AssignOp::Sub | AssignOp::Mul | AssignOp::Div | AssignOp::Mod
        )
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AssignStmt {
    pub target: Expr,
    pub op: AssignOp,
    pub value: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IfStmt {
    pub cond: Expr,
    pub then_block: Block,
    pub else_branch: Option<ElseBranch>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ElseBranch {
    ElseIf(Box<IfStmt>),
    Else(Block),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WhileStmt {
    pub cond: Expr,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoWhileStmt {
    pub body: Block,
    pub cond: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ForStmt {
    pub init: Box<Stmt>,
    pub cond: Expr,
    pub step: Box<AssignStmt>,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SwitchStmt {
    pub scrutinee: Expr,
    pub arms: Vec<CaseArm>,
    pub default: Option<DefaultArm>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseArm {
    /// `case A || B { ... }` carries both values.
    pub values: Vec<Expr>,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DefaultArm {
    /// `default(n)` - the counted catch-all; `None` for a bare `default`.
    pub allowed_missing: Option<u32>,
    pub body: Block,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReturnStmt {
    pub value: Option<Expr>,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExprStmt {
    pub expr: Expr,
    pub span: Span,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GotoStmt {
    pub label: Ident,
    pub span: Span,
}

// =============================================================================
// Expressions
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    SafeDiv,
    SafeMod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    /// `=` in CNX is equality.
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    LogicalAnd,
    LogicalOr,
}

impl BinaryOp {
    pub const fn c_operator(self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div | BinaryOp::SafeDiv => "/",
            BinaryOp::Mod | BinaryOp::SafeMod => "%",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::LogicalAnd => "&&",
            BinaryOp::LogicalOr => "||",
        }
    }

    /// Operators whose result type is bool.
    pub const fn is_boolean(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq
                | BinaryOp::Ne
                | BinaryOp::Lt
                | BinaryOp::Gt
                | BinaryOp::Le
                | BinaryOp::Ge
                | BinaryOp::LogicalAnd
                | BinaryOp::LogicalOr
        )
    }

    pub const fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Gt | BinaryOp::Le | BinaryOp::Ge
        )
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

impl UnaryOp {
    pub const fn c_operator(self) -> &'static str {
        match self {
            UnaryOp::Not => "!",
            UnaryOp::Neg => "-",
            UnaryOp::BitNot => "~",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum SizeofArg {
    Type(TypeExpr),
    Expr(Box<Expr>),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Int {
        value: u64,
        span: Span,
    },
    Float {
        span: Span,
    },
    Str {
        span: Span,
    },
    Char {
        span: Span,
    },
    Bool {
        value: bool,
        span: Span,
    },
    Null {
        span: Span,
    },
    Ident {
        name: String,
        span: Span,
    },
    /// `this.x` - force scope-local resolution.
    This {
        span: Span,
    },
    /// `global.x` - force global resolution.
    Global {
        span: Span,
    },
    /// `base.name` - scope access, enum member, or struct field; the
    /// code generator resolves which through the symbol table.
    Field {
        base: Box<Expr>,
        name: Ident,
        span: Span,
    },
    /// `a[i]` - array element on arrays, single-bit access on scalars.
    Index {
        base: Box<Expr>,
        index: Box<Expr>,
        span: Span,
    },
    /// `a[off, len]` - byte slice on arrays/strings, bit range on scalars.
    Slice {
        base: Box<Expr>,
        offset: Box<Expr>,
        length: Box<Expr>,
        span: Span,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
        span: Span,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
        span: Span,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
        span: Span,
    },
    Ternary {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
        span: Span,
    },
    Sizeof {
        arg: SizeofArg,
        span: Span,
    },
    Paren {
        inner: Box<Expr>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Int { span, .. }
            | Expr::Float { span }
            | Expr::Str { span }
            | Expr::Char { span }
            | Expr::Bool { span, .. }
            | Expr::Null { span }
            | Expr::Ident { span, .. }
            | Expr::This { span }
            | Expr::Global { span }
            | Expr::Field { span, .. }
            | Expr::Index { span, .. }
            | Expr::Slice { span, .. }
            | Expr::Call { span, .. }
            | Expr::Unary { span, .. }
            | Expr::Binary { span, .. }
            | Expr::Ternary { span, .. }
            | Expr::Sizeof { span, .. }
            | Expr::Paren { span, .. } => *span,
        }
    }

    /// Strip parentheses.
    pub fn unwrap_parens(&self) -> &Expr {
        match self {
            Expr::Paren { inner, .. } => inner.unwrap_parens(),
            other => other,
        }
    }

    /// The root identifier of an lvalue chain (`a.b[0]` -> `a`), if any.
    pub fn root_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident { name, .. } => Some(name),
            Expr::Field { base, .. } => base.root_ident(),
            Expr::Index { base, .. } => base.root_ident(),
            Expr::Slice { base, .. } => base.root_ident(),
            Expr::Paren { inner, .. } => inner.root_ident(),
            _ => None,
        }
    }

    /// Flatten a plain `a.b.c` chain into segments, if the chain consists
    /// only of identifiers (no calls, indexing or slicing).
    pub fn as_path(&self) -> Option<Vec<&str>> {
        match self {
            Expr::Ident { name, .. } => Some(vec![name.as_str()]),
            Expr::Field { base, name, .. } => {
                let mut path = base.as_path()?;
                path.push(name.name.as_str());
                Some(path)
            }
            _ => None,
        }
    }
}
