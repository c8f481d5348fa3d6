//! Recursive descent parser for CNX.
//!
//! Single-token lookahead, precedence-climbing expressions. Parse errors
//! abort the file: the first error is reported and `unit` comes back
//! `None` (spec'd failure semantics; symbol collection never sees a
//! half-parsed tree).

use cnx_common::LineMap;
use cnx_common::Span;
use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};
use cnx_scanner::{SyntaxKind, Token};
use rustc_hash::FxHashSet;

use crate::ast::*;

/// Outcome of parsing one file. `tokens` is the full stream including
/// trivia; the emitter walks it to replay comments.
#[derive(Debug)]
pub struct ParseResult {
    pub unit: Option<SourceUnit>,
    pub tokens: Vec<Token>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParseResult {
    pub fn is_ok(&self) -> bool {
        self.unit.is_some() && self.diagnostics.iter().all(|d| !d.is_error())
    }
}

/// Parse a CNX source file. `defines` seeds the flag set consulted by
/// `#ifdef`/`#ifndef`/`#if defined(...)`.
pub fn parse(source: &str, file: &str, defines: &FxHashSet<String>) -> ParseResult {
    tracing::debug!(file, len = source.len(), "parsing CNX source");
    let (tokens, mut diagnostics) = cnx_scanner::scan(source, file);
    if diagnostics.iter().any(|d| d.is_error()) {
        return ParseResult {
            unit: None,
            tokens,
            diagnostics,
        };
    }
    let mut parser = Parser {
        source,
        file,
        line_map: LineMap::build(source),
        tokens: &tokens,
        pos: 0,
        defines: defines.clone(),
        unit: SourceUnit {
            path: file.to_string(),
            includes: Vec::new(),
            defines: Vec::new(),
            pragma_target: None,
            items: Vec::new(),
        },
    };
    match parser.parse_unit() {
        Ok(()) => ParseResult {
            unit: Some(parser.unit),
            tokens,
            diagnostics,
        },
        Err(diag) => {
            diagnostics.push(diag);
            ParseResult {
                unit: None,
                tokens,
                diagnostics,
            }
        }
    }
}

type PResult<T> = Result<T, Diagnostic>;

struct Parser<'a> {
    source: &'a str,
    file: &'a str,
    line_map: LineMap,
    tokens: &'a [Token],
    pos: usize,
    defines: FxHashSet<String>,
    unit: SourceUnit,
}

impl<'a> Parser<'a> {
    // ==================== Cursor ====================

    fn skip_trivia(&mut self) {
        while self
            .tokens
            .get(self.pos)
            .is_some_and(|t| t.kind.is_trivia())
        {
            self.pos += 1;
        }
    }

    fn peek(&mut self) -> Token {
        self.skip_trivia();
        self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    /// Lookahead past the current token, still skipping trivia.
    fn peek_ahead(&mut self) -> Token {
        self.skip_trivia();
        let mut idx = self.pos + 1;
        while self.tokens.get(idx).is_some_and(|t| t.kind.is_trivia()) {
            idx += 1;
        }
        self.tokens[idx.min(self.tokens.len() - 1)]
    }

    fn bump(&mut self) -> Token {
        let tok = self.peek();
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
        tok
    }

    fn at(&mut self, kind: SyntaxKind) -> bool {
        self.peek().kind == kind
    }

    fn eat(&mut self, kind: SyntaxKind) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn text(&self, token: Token) -> &'a str {
        token.span.slice(self.source)
    }

    fn error_at(&self, span: Span, expected: &str) -> Diagnostic {
        let pos = self.line_map.position(span.start);
        let found = span.slice(self.source);
        let found = if found.is_empty() { "end of file" } else { found };
        Diagnostic::error(
            self.file,
            pos.line,
            pos.column,
            message(diagnostic_codes::PARSE_ERROR, &[expected, found]),
            diagnostic_codes::PARSE_ERROR,
        )
    }

    fn expect(&mut self, kind: SyntaxKind) -> PResult<Token> {
        let tok = self.peek();
        if tok.kind == kind {
            Ok(self.bump())
        } else {
            Err(self.error_at(tok.span, kind.describe()))
        }
    }

    fn expect_ident(&mut self) -> PResult<Ident> {
        let tok = self.expect(SyntaxKind::Identifier)?;
        Ok(Ident {
            name: self.text(tok).to_string(),
            span: tok.span,
        })
    }

    // ==================== Directives ====================

    fn parse_unit(&mut self) -> PResult<()> {
        while !self.at(SyntaxKind::Eof) {
            if self.peek().kind.is_directive() {
                self.handle_directive()?;
            } else {
                let item = self.parse_item()?;
                self.unit.items.push(item);
            }
        }
        Ok(())
    }

    fn handle_directive(&mut self) -> PResult<()> {
        let tok = self.bump();
        let line = self.text(tok);
        match tok.kind {
            SyntaxKind::HashInclude => {
                if let Some(directive) = parse_include_line(line, tok.span) {
                    self.unit.includes.push(directive);
                } else {
                    return Err(self.error_at(tok.span, "an include path"));
                }
            }
            SyntaxKind::HashDefine => {
                if let Some(name) = line.split_whitespace().nth(1) {
                    self.unit.defines.push(name.to_string());
                    self.defines.insert(name.to_string());
                }
            }
            SyntaxKind::HashPragma => {
                let mut words = line.split_whitespace().skip(1);
                if words.next() == Some("target") {
                    if let Some(chip) = words.next() {
                        self.unit.pragma_target = Some(chip.to_string());
                    }
                }
            }
            SyntaxKind::HashIfdef | SyntaxKind::HashIfndef | SyntaxKind::HashIf => {
                let live = self.evaluate_condition(tok.kind, line);
                if !live {
                    self.skip_conditional_branch()?;
                }
            }
            SyntaxKind::HashElse => {
                // Reached from a live branch: skip to the matching #endif.
                self.skip_to_endif()?;
            }
            SyntaxKind::HashEndif => {}
            _ => {}
        }
        Ok(())
    }

    fn evaluate_condition(&self, kind: SyntaxKind, line: &str) -> bool {
        let arg = line
            .split_whitespace()
            .skip(1)
            .collect::<Vec<_>>()
            .join(" ");
        match kind {
            SyntaxKind::HashIfdef => self.defines.contains(arg.trim()),
            SyntaxKind::HashIfndef => !self.defines.contains(arg.trim()),
            SyntaxKind::HashIf => {
                let arg = arg.trim();
                if arg == "0" {
                    false
                } else if arg == "1" {
                    true
                } else if let Some(name) = arg
                    .strip_prefix("defined(")
                    .and_then(|rest| rest.strip_suffix(')'))
                {
                    self.defines.contains(name.trim())
                } else if let Some(name) = arg.strip_prefix("defined ") {
                    self.defines.contains(name.trim())
                } else {
                    // Anything richer belongs to the system preprocessor.
                    true
                }
            }
            _ => true,
        }
    }

    /// Skip a dead `#if`-family branch, honoring nesting. Stops after the
    /// matching `#endif`, or resumes parsing after a matching `#else`.
    fn skip_conditional_branch(&mut self) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            let tok = self.peek();
            match tok.kind {
                SyntaxKind::Eof => return Err(self.error_at(tok.span, "'#endif'")),
                SyntaxKind::HashIf | SyntaxKind::HashIfdef | SyntaxKind::HashIfndef => {
                    depth += 1;
                    self.bump();
                }
                SyntaxKind::HashEndif => {
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                SyntaxKind::HashElse if depth == 0 => {
                    self.bump();
                    return Ok(());
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    fn skip_to_endif(&mut self) -> PResult<()> {
        let mut depth = 0usize;
        loop {
            let tok = self.peek();
            match tok.kind {
                SyntaxKind::Eof => return Err(self.error_at(tok.span, "'#endif'")),
                SyntaxKind::HashIf | SyntaxKind::HashIfdef | SyntaxKind::HashIfndef => {
                    depth += 1;
                    self.bump();
                }
                SyntaxKind::HashEndif => {
                    self.bump();
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                _ => {
                    self.bump();
                }
            }
        }
    }

    // ==================== Items ====================

    fn parse_item(&mut self) -> PResult<Item> {
        match self.peek().kind {
            SyntaxKind::ScopeKw => self.parse_scope().map(Item::Scope),
            SyntaxKind::StructKw => self.parse_struct().map(Item::Struct),
            SyntaxKind::EnumKw => self.parse_enum().map(Item::Enum),
            SyntaxKind::Bitmap8Kw
            | SyntaxKind::Bitmap16Kw
            | SyntaxKind::Bitmap24Kw
            | SyntaxKind::Bitmap32Kw => self.parse_bitmap().map(Item::Bitmap),
            SyntaxKind::RegisterKw => self.parse_register().map(Item::Register),
            _ => self.parse_decl_or_function(),
        }
    }

    fn parse_scope(&mut self) -> PResult<ScopeDecl> {
        let start = self.expect(SyntaxKind::ScopeKw)?.span;
        let name = self.expect_ident()?;
        self.expect(SyntaxKind::LBrace)?;
        let mut items = Vec::new();
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            items.push(self.parse_item()?);
        }
        let end = self.expect(SyntaxKind::RBrace)?.span;
        Ok(ScopeDecl {
            name,
            items,
            span: start.merge(end),
        })
    }

    fn parse_struct(&mut self) -> PResult<StructDecl> {
        let start = self.expect(SyntaxKind::StructKw)?.span;
        let name = self.expect_ident()?;
        self.expect(SyntaxKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let field_start = self.peek().span;
            let mut is_const = false;
            let mut is_atomic = false;
            while self.peek().kind.is_qualifier() {
                match self.bump().kind {
                    SyntaxKind::ConstKw => is_const = true,
                    SyntaxKind::AtomicKw => is_atomic = true,
                    _ => {}
                }
            }
            let ty = self.parse_type()?;
            let fname = self.expect_ident()?;
            let dims = self.parse_dims()?;
            let end = self.expect(SyntaxKind::Semicolon)?.span;
            fields.push(FieldDecl {
                name: fname,
                ty,
                dims,
                is_const,
                is_atomic,
                span: field_start.merge(end),
            });
        }
        let end = self.expect(SyntaxKind::RBrace)?.span;
        Ok(StructDecl {
            name,
            fields,
            span: start.merge(end),
        })
    }

    fn parse_enum(&mut self) -> PResult<EnumDecl> {
        let start = self.expect(SyntaxKind::EnumKw)?.span;
        let name = self.expect_ident()?;
        self.expect(SyntaxKind::LBrace)?;
        let mut members = Vec::new();
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let mname = self.expect_ident()?;
            let mut value = None;
            if self.eat(SyntaxKind::LeftArrow) {
                let negative = self.eat(SyntaxKind::Minus);
                let tok = self.expect(SyntaxKind::IntLiteral)?;
                let raw = parse_int_text(self.text(tok))
                    .ok_or_else(|| self.error_at(tok.span, "an integer"))?;
                let signed = i64::try_from(raw)
                    .map_err(|_| self.error_at(tok.span, "a smaller integer"))?;
                value = Some(if negative { -signed } else { signed });
            }
            let span = mname.span;
            members.push(EnumMember {
                name: mname,
                value,
                span,
            });
            if !self.eat(SyntaxKind::Comma) {
                break;
            }
        }
        let end = self.expect(SyntaxKind::RBrace)?.span;
        Ok(EnumDecl {
            name,
            members,
            span: start.merge(end),
        })
    }

    fn parse_bitmap(&mut self) -> PResult<BitmapDecl> {
        let tok = self.bump();
        let bit_width = match tok.kind {
            SyntaxKind::Bitmap8Kw => 8,
            SyntaxKind::Bitmap16Kw => 16,
            SyntaxKind::Bitmap24Kw => 24,
            SyntaxKind::Bitmap32Kw => 32,
            _ => return Err(self.error_at(tok.span, "a bitmap keyword")),
        };
        let name = self.expect_ident()?;
        self.expect(SyntaxKind::LBrace)?;
        let mut fields = Vec::new();
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let fname = self.expect_ident()?;
            self.expect(SyntaxKind::Colon)?;
            let wtok = self.expect(SyntaxKind::IntLiteral)?;
            let width = parse_int_text(self.text(wtok))
                .and_then(|w| u8::try_from(w).ok())
                .ok_or_else(|| self.error_at(wtok.span, "a bit width"))?;
            let end = self.expect(SyntaxKind::Semicolon)?.span;
            let span = fname.span.merge(end);
            fields.push(BitmapField {
                name: fname,
                width,
                span,
            });
        }
        let end = self.expect(SyntaxKind::RBrace)?.span;
        Ok(BitmapDecl {
            name,
            bit_width,
            fields,
            span: tok.span.merge(end),
        })
    }

    fn parse_register(&mut self) -> PResult<RegisterDecl> {
        let start = self.expect(SyntaxKind::RegisterKw)?.span;
        let name = self.expect_ident()?;
        self.expect(SyntaxKind::At)?;
        let addr_tok = self.expect(SyntaxKind::IntLiteral)?;
        let base_address = parse_int_text(self.text(addr_tok))
            .ok_or_else(|| self.error_at(addr_tok.span, "an address"))?;
        self.expect(SyntaxKind::LBrace)?;
        let mut members = Vec::new();
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let mname = self.expect_ident()?;
            self.expect(SyntaxKind::Colon)?;
            let ty = self.parse_type()?;
            let access_tok = self.expect(SyntaxKind::Identifier)?;
            let access = match self.text(access_tok) {
                "rw" => cnx_common::Access::ReadWrite,
                "ro" => cnx_common::Access::ReadOnly,
                "wo" => cnx_common::Access::WriteOnly,
                _ => return Err(self.error_at(access_tok.span, "'rw', 'ro' or 'wo'")),
            };
            self.expect(SyntaxKind::At)?;
            let off_tok = self.expect(SyntaxKind::IntLiteral)?;
            let offset = parse_int_text(self.text(off_tok))
                .ok_or_else(|| self.error_at(off_tok.span, "an offset"))?;
            let end = self.expect(SyntaxKind::Semicolon)?.span;
            let span = mname.span.merge(end);
            members.push(RegisterMember {
                name: mname,
                ty,
                access,
                offset,
                span,
            });
        }
        let end = self.expect(SyntaxKind::RBrace)?.span;
        Ok(RegisterDecl {
            name,
            base_address,
            members,
            span: start.merge(end),
        })
    }

    /// Functions and variables share a prefix: qualifiers, type, name.
    fn parse_decl_or_function(&mut self) -> PResult<Item> {
        let start = self.peek().span;
        let quals = self.parse_qualifiers();
        let is_isr = self.eat(SyntaxKind::IsrKw);
        let ty = self.parse_type()?;
        let name = self.expect_ident()?;
        if self.at(SyntaxKind::LParen) {
            let decl = self.parse_function_rest(start, quals, is_isr, ty, name)?;
            Ok(Item::Function(decl))
        } else {
            let decl = self.parse_var_rest(start, quals, ty, name)?;
            Ok(Item::Variable(decl))
        }
    }

    fn parse_qualifiers(&mut self) -> Qualifiers {
        let mut quals = Qualifiers::default();
        while self.peek().kind.is_qualifier() {
            match self.bump().kind {
                SyntaxKind::ConstKw => quals.is_const = true,
                SyntaxKind::StaticKw => quals.is_static = true,
                SyntaxKind::ExternKw => quals.is_extern = true,
                SyntaxKind::VolatileKw => quals.is_volatile = true,
                SyntaxKind::AtomicKw => quals.is_atomic = true,
                SyntaxKind::ExportKw => quals.is_exported = true,
                SyntaxKind::ClampKw => quals.overflow = Some(OverflowMode::Clamp),
                SyntaxKind::WrapKw => quals.overflow = Some(OverflowMode::Wrap),
                _ => {}
            }
        }
        quals
    }

    fn parse_function_rest(
        &mut self,
        start: Span,
        quals: Qualifiers,
        is_isr: bool,
        return_type: TypeExpr,
        name: Ident,
    ) -> PResult<FunctionDecl> {
        self.expect(SyntaxKind::LParen)?;
        let mut params = Vec::new();
        if !self.at(SyntaxKind::RParen) {
            loop {
                let pstart = self.peek().span;
                let is_const = self.eat(SyntaxKind::ConstKw);
                let ty = self.parse_type()?;
                let pname = self.expect_ident()?;
                let mut is_array = false;
                if self.eat(SyntaxKind::LBracket) {
                    self.expect(SyntaxKind::RBracket)?;
                    is_array = true;
                }
                let span = pstart.merge(pname.span);
                params.push(Param {
                    name: pname,
                    ty,
                    is_const,
                    is_array,
                    span,
                });
                if !self.eat(SyntaxKind::Comma) {
                    break;
                }
            }
        }
        self.expect(SyntaxKind::RParen)?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(FunctionDecl {
            name,
            return_type,
            params,
            body,
            is_exported: quals.is_exported,
            is_isr,
            span,
        })
    }

    fn parse_var_rest(
        &mut self,
        start: Span,
        quals: Qualifiers,
        ty: TypeExpr,
        name: Ident,
    ) -> PResult<VarDecl> {
        let dims = self.parse_dims()?;
        let init = if self.eat(SyntaxKind::LeftArrow) {
            Some(self.parse_expr()?)
        } else {
            None
        };
        let end = self.expect(SyntaxKind::Semicolon)?.span;
        Ok(VarDecl {
            name,
            ty,
            dims,
            init,
            quals,
            span: start.merge(end),
        })
    }

    fn parse_dims(&mut self) -> PResult<Vec<Dimension>> {
        let mut dims = Vec::new();
        while self.at(SyntaxKind::LBracket) {
            self.bump();
            let tok = self.peek();
            let dim = match tok.kind {
                SyntaxKind::IntLiteral => {
                    self.bump();
                    let value = parse_int_text(self.text(tok))
                        .ok_or_else(|| self.error_at(tok.span, "an integer"))?;
                    Dimension::Literal(value)
                }
                SyntaxKind::Identifier => {
                    let first = self.expect_ident()?;
                    if self.at(SyntaxKind::Dot) {
                        let mut segments = vec![first.name];
                        while self.eat(SyntaxKind::Dot) {
                            segments.push(self.expect_ident()?.name);
                        }
                        Dimension::Scoped(segments)
                    } else {
                        Dimension::Named(first.name)
                    }
                }
                _ => return Err(self.error_at(tok.span, "an array dimension")),
            };
            self.expect(SyntaxKind::RBracket)?;
            dims.push(dim);
        }
        Ok(dims)
    }

    fn parse_type(&mut self) -> PResult<TypeExpr> {
        let tok = self.peek();
        let ty = match tok.kind {
            SyntaxKind::U8Kw => TypeExpr::Primitive(Primitive::U8),
            SyntaxKind::U16Kw => TypeExpr::Primitive(Primitive::U16),
            SyntaxKind::U32Kw => TypeExpr::Primitive(Primitive::U32),
            SyntaxKind::U64Kw => TypeExpr::Primitive(Primitive::U64),
            SyntaxKind::I8Kw => TypeExpr::Primitive(Primitive::I8),
            SyntaxKind::I16Kw => TypeExpr::Primitive(Primitive::I16),
            SyntaxKind::I32Kw => TypeExpr::Primitive(Primitive::I32),
            SyntaxKind::I64Kw => TypeExpr::Primitive(Primitive::I64),
            SyntaxKind::F32Kw => TypeExpr::Primitive(Primitive::F32),
            SyntaxKind::F64Kw => TypeExpr::Primitive(Primitive::F64),
            SyntaxKind::BoolKw => TypeExpr::Primitive(Primitive::Bool),
            SyntaxKind::VoidKw => TypeExpr::Primitive(Primitive::Void),
            SyntaxKind::UsizeKw => TypeExpr::Primitive(Primitive::Usize),
            SyntaxKind::IsizeKw => TypeExpr::Primitive(Primitive::Isize),
            SyntaxKind::CstringKw => TypeExpr::Primitive(Primitive::CString),
            SyntaxKind::StringKw => {
                self.bump();
                self.expect(SyntaxKind::Less)?;
                let cap_tok = self.expect(SyntaxKind::IntLiteral)?;
                let capacity = parse_int_text(self.text(cap_tok))
                    .and_then(|c| u32::try_from(c).ok())
                    .ok_or_else(|| self.error_at(cap_tok.span, "a string capacity"))?;
                self.expect(SyntaxKind::Greater)?;
                return Ok(TypeExpr::String { capacity });
            }
            SyntaxKind::Identifier => {
                let name = self.text(tok).to_string();
                self.bump();
                return Ok(TypeExpr::Named(name));
            }
            _ => return Err(self.error_at(tok.span, "a type")),
        };
        self.bump();
        Ok(ty)
    }

    // ==================== Statements ====================

    fn parse_block(&mut self) -> PResult<Block> {
        let start = self.expect(SyntaxKind::LBrace)?.span;
        let mut stmts = Vec::new();
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            stmts.push(self.parse_stmt()?);
        }
        let end = self.expect(SyntaxKind::RBrace)?.span;
        Ok(Block {
            stmts,
            span: start.merge(end),
        })
    }

    fn parse_stmt(&mut self) -> PResult<Stmt> {
        let tok = self.peek();
        match tok.kind {
            SyntaxKind::IfKw => self.parse_if().map(Stmt::If),
            SyntaxKind::WhileKw => self.parse_while().map(Stmt::While),
            SyntaxKind::DoKw => self.parse_do_while().map(Stmt::DoWhile),
            SyntaxKind::ForKw => self.parse_for().map(Stmt::For),
            SyntaxKind::SwitchKw => self.parse_switch().map(Stmt::Switch),
            SyntaxKind::ReturnKw => self.parse_return().map(Stmt::Return),
            SyntaxKind::CriticalKw => {
                self.bump();
                self.parse_block().map(Stmt::Critical)
            }
            SyntaxKind::LBrace => self.parse_block().map(Stmt::Block),
            SyntaxKind::GotoKw => {
                let start = self.bump().span;
                let label = self.expect_ident()?;
                let end = self.expect(SyntaxKind::Semicolon)?.span;
                Ok(Stmt::Goto(GotoStmt {
                    label,
                    span: start.merge(end),
                }))
            }
            kind if kind.is_qualifier() || kind.is_type_start() => {
                let start = tok.span;
                let quals = self.parse_qualifiers();
                let ty = self.parse_type()?;
                let name = self.expect_ident()?;
                self.parse_var_rest(start, quals, ty, name).map(Stmt::Var)
            }
            SyntaxKind::Identifier if self.peek_ahead().kind == SyntaxKind::Identifier => {
                // Named-type local: `SPoint p;` / `EColor c <- ...;`
                let start = tok.span;
                let ty = self.parse_type()?;
                let name = self.expect_ident()?;
                self.parse_var_rest(start, Qualifiers::default(), ty, name)
                    .map(Stmt::Var)
            }
            _ => {
                let expr = self.parse_expr()?;
                self.finish_expr_stmt(expr)
            }
        }
    }

    fn finish_expr_stmt(&mut self, target: Expr) -> PResult<Stmt> {
        let tok = self.peek();
        let op = assign_op_for(tok.kind);
        if let Some(op) = op {
            self.bump();
            let value = self.parse_expr()?;
            let end = self.expect(SyntaxKind::Semicolon)?.span;
            let span = target.span().merge(end);
            return Ok(Stmt::Assign(AssignStmt {
                target,
                op,
                value,
                span,
            }));
        }
        let end = self.expect(SyntaxKind::Semicolon)?.span;
        let span = target.span().merge(end);
        Ok(Stmt::Expr(ExprStmt { expr: target, span }))
    }

    /// A parenthesized condition. `<-` here is the bug class this
    /// dialect exists to kill, so it gets its own diagnostic instead of
    /// a generic parse error.
    fn parse_condition(&mut self) -> PResult<Expr> {
        let cond = self.parse_expr()?;
        if self.at(SyntaxKind::LeftArrow) {
            let tok = self.peek();
            let pos = self.line_map.position(tok.span.start);
            return Err(Diagnostic::error(
                self.file,
                pos.line,
                pos.column,
                message(diagnostic_codes::ASSIGNMENT_IN_CONDITION, &[]),
                diagnostic_codes::ASSIGNMENT_IN_CONDITION,
            ));
        }
        Ok(cond)
    }

    fn parse_if(&mut self) -> PResult<IfStmt> {
        let start = self.expect(SyntaxKind::IfKw)?.span;
        self.expect(SyntaxKind::LParen)?;
        let cond = self.parse_condition()?;
        self.expect(SyntaxKind::RParen)?;
        let then_block = self.parse_block()?;
        let mut span = start.merge(then_block.span);
        let else_branch = if self.eat(SyntaxKind::ElseKw) {
            if self.at(SyntaxKind::IfKw) {
                let nested = self.parse_if()?;
                span = span.merge(nested.span);
                Some(ElseBranch::ElseIf(Box::new(nested)))
            } else {
                let block = self.parse_block()?;
                span = span.merge(block.span);
                Some(ElseBranch::Else(block))
            }
        } else {
            None
        };
        Ok(IfStmt {
            cond,
            then_block,
            else_branch,
            span,
        })
    }

    fn parse_while(&mut self) -> PResult<WhileStmt> {
        let start = self.expect(SyntaxKind::WhileKw)?.span;
        self.expect(SyntaxKind::LParen)?;
        let cond = self.parse_condition()?;
        self.expect(SyntaxKind::RParen)?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(WhileStmt { cond, body, span })
    }

    fn parse_do_while(&mut self) -> PResult<DoWhileStmt> {
        let start = self.expect(SyntaxKind::DoKw)?.span;
        let body = self.parse_block()?;
        self.expect(SyntaxKind::WhileKw)?;
        self.expect(SyntaxKind::LParen)?;
        let cond = self.parse_condition()?;
        self.expect(SyntaxKind::RParen)?;
        let end = self.expect(SyntaxKind::Semicolon)?.span;
        Ok(DoWhileStmt {
            body,
            cond,
            span: start.merge(end),
        })
    }

    fn parse_for(&mut self) -> PResult<ForStmt> {
        let start = self.expect(SyntaxKind::ForKw)?.span;
        self.expect(SyntaxKind::LParen)?;
        let init_tok = self.peek();
        let init = if init_tok.kind.is_type_start() || init_tok.kind.is_qualifier() {
            let quals = self.parse_qualifiers();
            let ty = self.parse_type()?;
            let name = self.expect_ident()?;
            Stmt::Var(self.parse_var_rest(init_tok.span, quals, ty, name)?)
        } else {
            let target = self.parse_expr()?;
            self.finish_expr_stmt(target)?
        };
        let cond = self.parse_expr()?;
        self.expect(SyntaxKind::Semicolon)?;
        let step_target = self.parse_expr()?;
        let step_tok = self.peek();
        let op = assign_op_for(step_tok.kind)
            .ok_or_else(|| self.error_at(step_tok.span, "an assignment operator"))?;
        self.bump();
        let step_value = self.parse_expr()?;
        let step_span = step_target.span().merge(step_value.span());
        let step = AssignStmt {
            target: step_target,
            op,
            value: step_value,
            span: step_span,
        };
        self.expect(SyntaxKind::RParen)?;
        let body = self.parse_block()?;
        let span = start.merge(body.span);
        Ok(ForStmt {
            init: Box::new(init),
            cond,
            step: Box::new(step),
            body,
            span,
        })
    }

    fn parse_switch(&mut self) -> PResult<SwitchStmt> {
        let start = self.expect(SyntaxKind::SwitchKw)?.span;
        self.expect(SyntaxKind::LParen)?;
        let scrutinee = self.parse_expr()?;
        self.expect(SyntaxKind::RParen)?;
        self.expect(SyntaxKind::LBrace)?;
        let mut arms = Vec::new();
        let mut default = None;
        while !self.at(SyntaxKind::RBrace) && !self.at(SyntaxKind::Eof) {
            let tok = self.peek();
            match tok.kind {
                SyntaxKind::CaseKw => {
                    let case_start = self.bump().span;
                    // Parse below `||` so it stays the multi-value separator.
                    let mut values = vec![self.parse_logical_and()?];
                    while self.eat(SyntaxKind::PipePipe) {
                        values.push(self.parse_logical_and()?);
                    }
                    if !self.at(SyntaxKind::LBrace) {
                        let next = self.peek();
                        let pos = self.line_map.position(next.span.start);
                        return Err(Diagnostic::error(
                            self.file,
                            pos.line,
                            pos.column,
                            message(diagnostic_codes::SWITCH_CASE_NEEDS_BLOCK, &[]),
                            diagnostic_codes::SWITCH_CASE_NEEDS_BLOCK,
                        ));
                    }
                    let body = self.parse_block()?;
                    let span = case_start.merge(body.span);
                    arms.push(CaseArm { values, body, span });
                }
                SyntaxKind::DefaultKw => {
                    let default_start = self.bump().span;
                    let mut allowed_missing = None;
                    if self.eat(SyntaxKind::LParen) {
                        let count_tok = self.expect(SyntaxKind::IntLiteral)?;
                        let count = parse_int_text(self.text(count_tok))
                            .and_then(|c| u32::try_from(c).ok())
                            .ok_or_else(|| self.error_at(count_tok.span, "a count"))?;
                        allowed_missing = Some(count);
                        self.expect(SyntaxKind::RParen)?;
                    }
                    if !self.at(SyntaxKind::LBrace) {
                        let next = self.peek();
                        let pos = self.line_map.position(next.span.start);
                        return Err(Diagnostic::error(
                            self.file,
                            pos.line,
                            pos.column,
                            message(diagnostic_codes::SWITCH_CASE_NEEDS_BLOCK, &[]),
                            diagnostic_codes::SWITCH_CASE_NEEDS_BLOCK,
                        ));
                    }
                    let body = self.parse_block()?;
                    let span = default_start.merge(body.span);
                    default = Some(DefaultArm {
                        allowed_missing,
                        body,
                        span,
                    });
                }
                _ => return Err(self.error_at(tok.span, "'case' or 'default'")),
            }
        }
        let end = self.expect(SyntaxKind::RBrace)?.span;
        Ok(SwitchStmt {
            scrutinee,
            arms,
            default,
            span: start.merge(end),
        })
    }

    fn parse_return(&mut self) -> PResult<ReturnStmt> {
        let start = self.expect(SyntaxKind::ReturnKw)?.span;
        let value = if self.at(SyntaxKind::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        let end = self.expect(SyntaxKind::Semicolon)?.span;
        Ok(ReturnStmt {
            value,
            span: start.merge(end),
        })
    }

    // ==================== Expressions ====================

    fn parse_expr(&mut self) -> PResult<Expr> {
        let cond = self.parse_logical_or()?;
        if self.eat(SyntaxKind::Question) {
            let then_expr = self.parse_expr()?;
            self.expect(SyntaxKind::Colon)?;
            let else_expr = self.parse_expr()?;
            let span = cond.span().merge(else_expr.span());
            return Ok(Expr::Ternary {
                cond: Box::new(cond),
                then_expr: Box::new(then_expr),
                else_expr: Box::new(else_expr),
                span,
            });
        }
        Ok(cond)
    }

    fn binary_loop(
        &mut self,
        next: fn(&mut Self) -> PResult<Expr>,
        ops: &[(SyntaxKind, BinaryOp)],
    ) -> PResult<Expr> {
        let mut lhs = next(self)?;
        'outer: loop {
            let kind = self.peek().kind;
            for (tok_kind, op) in ops {
                if kind == *tok_kind {
                    self.bump();
                    let rhs = next(self)?;
                    let span = lhs.span().merge(rhs.span());
                    lhs = Expr::Binary {
                        op: *op,
                        lhs: Box::new(lhs),
                        rhs: Box::new(rhs),
                        span,
                    };
                    continue 'outer;
                }
            }
            return Ok(lhs);
        }
    }

    fn parse_logical_or(&mut self) -> PResult<Expr> {
        self.binary_loop(
            Self::parse_logical_and,
            &[(SyntaxKind::PipePipe, BinaryOp::LogicalOr)],
        )
    }

    fn parse_logical_and(&mut self) -> PResult<Expr> {
        self.binary_loop(
            Self::parse_bit_or,
            &[(SyntaxKind::AmpAmp, BinaryOp::LogicalAnd)],
        )
    }

    fn parse_bit_or(&mut self) -> PResult<Expr> {
        self.binary_loop(Self::parse_bit_xor, &[(SyntaxKind::Pipe, BinaryOp::BitOr)])
    }

    fn parse_bit_xor(&mut self) -> PResult<Expr> {
        self.binary_loop(Self::parse_bit_and, &[(SyntaxKind::Caret, BinaryOp::BitXor)])
    }

    fn parse_bit_and(&mut self) -> PResult<Expr> {
        self.binary_loop(Self::parse_equality, &[(SyntaxKind::Amp, BinaryOp::BitAnd)])
    }

    fn parse_equality(&mut self) -> PResult<Expr> {
        self.binary_loop(
            Self::parse_relational,
            &[
                (SyntaxKind::Equals, BinaryOp::Eq),
                (SyntaxKind::BangEquals, BinaryOp::Ne),
            ],
        )
    }

    fn parse_relational(&mut self) -> PResult<Expr> {
        self.binary_loop(
            Self::parse_shift,
            &[
                (SyntaxKind::Less, BinaryOp::Lt),
                (SyntaxKind::Greater, BinaryOp::Gt),
                (SyntaxKind::LessEquals, BinaryOp::Le),
                (SyntaxKind::GreaterEquals, BinaryOp::Ge),
            ],
        )
    }

    fn parse_shift(&mut self) -> PResult<Expr> {
        self.binary_loop(
            Self::parse_additive,
            &[
                (SyntaxKind::Shl, BinaryOp::Shl),
                (SyntaxKind::Shr, BinaryOp::Shr),
            ],
        )
    }

    fn parse_additive(&mut self) -> PResult<Expr> {
        self.binary_loop(
            Self::parse_multiplicative,
            &[
                (SyntaxKind::Plus, BinaryOp::Add),
                (SyntaxKind::Minus, BinaryOp::Sub),
            ],
        )
    }

    fn parse_multiplicative(&mut self) -> PResult<Expr> {
        self.binary_loop(
            Self::parse_unary,
            &[
                (SyntaxKind::Star, BinaryOp::Mul),
                (SyntaxKind::Slash, BinaryOp::Div),
                (SyntaxKind::Percent, BinaryOp::Mod),
                (SyntaxKind::SafeDivKw, BinaryOp::SafeDiv),
                (SyntaxKind::SafeModKw, BinaryOp::SafeMod),
            ],
        )
    }

    fn parse_unary(&mut self) -> PResult<Expr> {
        let tok = self.peek();
        let op = match tok.kind {
            SyntaxKind::Bang => Some(UnaryOp::Not),
            SyntaxKind::Minus => Some(UnaryOp::Neg),
            SyntaxKind::Tilde => Some(UnaryOp::BitNot),
            _ => None,
        };
        if let Some(op) = op {
            self.bump();
            let operand = self.parse_unary()?;
            let span = tok.span.merge(operand.span());
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
                span,
            });
        }
        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> PResult<Expr> {
        let mut expr = self.parse_primary()?;
        loop {
            let tok = self.peek();
            match tok.kind {
                SyntaxKind::Dot => {
                    self.bump();
                    let name = self.expect_ident()?;
                    let span = expr.span().merge(name.span);
                    expr = Expr::Field {
                        base: Box::new(expr),
                        name,
                        span,
                    };
                }
                SyntaxKind::LParen => {
                    self.bump();
                    let mut args = Vec::new();
                    if !self.at(SyntaxKind::RParen) {
                        loop {
                            args.push(self.parse_expr()?);
                            if !self.eat(SyntaxKind::Comma) {
                                break;
                            }
                        }
                    }
                    let end = self.expect(SyntaxKind::RParen)?.span;
                    let span = expr.span().merge(end);
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                        span,
                    };
                }
                SyntaxKind::LBracket => {
                    self.bump();
                    let first = self.parse_expr()?;
                    if self.eat(SyntaxKind::Comma) {
                        let length = self.parse_expr()?;
                        let end = self.expect(SyntaxKind::RBracket)?.span;
                        let span = expr.span().merge(end);
                        expr = Expr::Slice {
                            base: Box::new(expr),
                            offset: Box::new(first),
                            length: Box::new(length),
                            span,
                        };
                    } else {
                        let end = self.expect(SyntaxKind::RBracket)?.span;
                        let span = expr.span().merge(end);
                        expr = Expr::Index {
                            base: Box::new(expr),
                            index: Box::new(first),
                            span,
                        };
                    }
                }
                _ => return Ok(expr),
            }
        }
    }

    fn parse_primary(&mut self) -> PResult<Expr> {
        let tok = self.peek();
        match tok.kind {
            SyntaxKind::IntLiteral => {
                self.bump();
                let value = parse_int_text(self.text(tok))
                    .ok_or_else(|| self.error_at(tok.span, "an integer"))?;
                Ok(Expr::Int {
                    value,
                    span: tok.span,
                })
            }
            SyntaxKind::FloatLiteral => {
                self.bump();
                Ok(Expr::Float { span: tok.span })
            }
            SyntaxKind::StringLiteral => {
                self.bump();
                Ok(Expr::Str { span: tok.span })
            }
            SyntaxKind::CharLiteral => {
                self.bump();
                Ok(Expr::Char { span: tok.span })
            }
            SyntaxKind::TrueKw => {
                self.bump();
                Ok(Expr::Bool {
                    value: true,
                    span: tok.span,
                })
            }
            SyntaxKind::FalseKw => {
                self.bump();
                Ok(Expr::Bool {
                    value: false,
                    span: tok.span,
                })
            }
            SyntaxKind::NullKw => {
                self.bump();
                Ok(Expr::Null { span: tok.span })
            }
            SyntaxKind::ThisKw => {
                self.bump();
                Ok(Expr::This { span: tok.span })
            }
            SyntaxKind::GlobalKw => {
                self.bump();
                Ok(Expr::Global { span: tok.span })
            }
            SyntaxKind::SizeofKw => {
                self.bump();
                self.expect(SyntaxKind::LParen)?;
                let inner = self.peek();
                let arg = if inner.kind.is_type_start() {
                    SizeofArg::Type(self.parse_type()?)
                } else {
                    SizeofArg::Expr(Box::new(self.parse_expr()?))
                };
                let end = self.expect(SyntaxKind::RParen)?.span;
                Ok(Expr::Sizeof {
                    arg,
                    span: tok.span.merge(end),
                })
            }
            SyntaxKind::Identifier => {
                self.bump();
                Ok(Expr::Ident {
                    name: self.text(tok).to_string(),
                    span: tok.span,
                })
            }
            SyntaxKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                let end = self.expect(SyntaxKind::RParen)?.span;
                Ok(Expr::Paren {
                    inner: Box::new(inner),
                    span: tok.span.merge(end),
                })
            }
            _ => Err(self.error_at(tok.span, "an expression")),
        }
    }
}

fn assign_op_for(kind: SyntaxKind) -> Option<AssignOp> {
    match kind {
        SyntaxKind::LeftArrow => Some(AssignOp::Set),
        SyntaxKind::PlusArrow => Some(AssignOp::Add),
        SyntaxKind::MinusArrow => Some(AssignOp::Sub),
        SyntaxKind::StarArrow => Some(AssignOp::Mul),
        SyntaxKind::SlashArrow => Some(AssignOp::Div),
        SyntaxKind::PercentArrow => Some(AssignOp::Mod),
        SyntaxKind::AmpArrow => Some(AssignOp::And),
        SyntaxKind::PipeArrow => Some(AssignOp::Or),
        SyntaxKind::CaretArrow => Some(AssignOp::Xor),
        SyntaxKind::ShlArrow => Some(AssignOp::Shl),
        SyntaxKind::ShrArrow => Some(AssignOp::Shr),
        _ => None,
    }
}

/// Parse a decimal/hex/binary integer literal.
pub fn parse_int_text(text: &str) -> Option<u64> {
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16).ok()
    } else if let Some(bin) = text.strip_prefix("0b").or_else(|| text.strip_prefix("0B")) {
        u64::from_str_radix(bin, 2).ok()
    } else {
        text.parse().ok()
    }
}

/// Pull the path out of an `#include` line, keeping the literal text.
pub fn parse_include_line(line: &str, span: Span) -> Option<IncludeDirective> {
    let rest = line.strip_prefix("#include")?.trim();
    if let Some(path) = rest.strip_prefix('"').and_then(|r| r.split('"').next()) {
        Some(IncludeDirective {
            literal: line.trim_end().to_string(),
            path: path.to_string(),
            system: false,
            span,
        })
    } else if let Some(path) = rest.strip_prefix('<').and_then(|r| r.split('>').next()) {
        Some(IncludeDirective {
            literal: line.trim_end().to_string(),
            path: path.to_string(),
            system: true,
            span,
        })
    } else {
        None
    }
}
