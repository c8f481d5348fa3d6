//! The C / C++ code generator.
//!
//! Walks the parse tree with the token stream alongside, replaying
//! comments at their original relative positions, mangling scoped names,
//! translating the arrow operators, and lowering the dialect's constructs
//! (overflow helpers, atomics, criticals, strings, slices, bitmaps,
//! registers, switches, callbacks). Output is deterministic: same input,
//! byte-identical text.

use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};
use cnx_common::{Access, LineMap, OutputLanguage, Span, TargetChip, comments};
use cnx_parser::ast::*;
use cnx_resolver::TranslationContext;
use cnx_resolver::modmap;
use cnx_resolver::table::SymbolTable;
use cnx_resolver::types::{ArrayDimension, FunctionSymbol, TSymbol, TType};
use cnx_resolver::typing::{TypeEnv, resolve_path};
use cnx_scanner::{SyntaxKind, Token};
use rustc_hash::FxHashMap;

use crate::header;
use crate::writer::CodeWriter;

#[derive(Clone, Copy, Debug)]
pub struct EmitOptions {
    pub language: OutputLanguage,
    pub target: TargetChip,
    pub debug: bool,
}

#[derive(Clone, Debug)]
pub struct GeneratedFile {
    /// The `.c` / `.cpp` text.
    pub body: String,
    /// The companion `.h` / `.hpp` text.
    pub header: String,
    /// Input file stem, e.g. `motor` for `motor.cnx`.
    pub stem: String,
}

/// Generate one file's body and companion header.
///
/// Refines the modification map for this file first, then sets the
/// auto-const flag on every array parameter nobody mutates; the flag is
/// emitted only in C++ mode (C callers keep their legacy prototypes).
pub fn generate_unit(
    unit: &SourceUnit,
    source: &str,
    ctx: &mut TranslationContext,
    options: &EmitOptions,
) -> Result<GeneratedFile, Vec<Diagnostic>> {
    // Stage-5 refinement of the analysis-only scan.
    modmap::scan_unit(unit, &ctx.symbols, &mut ctx.modifications);
    let refinements: Vec<(String, Vec<String>)> = ctx
        .symbols
        .functions_in_file(&unit.path)
        .iter()
        .map(|f| {
            (
                f.common.mangled(),
                f.params
                    .iter()
                    .filter(|p| p.is_array && !p.is_const)
                    .map(|p| p.name.clone())
                    .collect(),
            )
        })
        .collect();
    for (mangled, params) in refinements {
        for param in params {
            let auto = !ctx.modifications.is_modified(&mangled, &param);
            ctx.symbols.set_auto_const(&mangled, &param, auto);
        }
    }

    let stem = file_stem(&unit.path);
    let tokens = collect_comment_tokens(source);
    let mut emitter = Emitter {
        source,
        table: &ctx.symbols,
        options,
        line_map: LineMap::build(source),
        file: unit.path.clone(),
        out: CodeWriter::new(),
        comments: tokens,
        comment_idx: 0,
        scope: Vec::new(),
        diagnostics: Vec::new(),
        local_traits: FxHashMap::default(),
        critical_depth: 0,
    };
    emitter.emit_unit(unit, &stem);
    if emitter.diagnostics.iter().any(|d| d.is_error()) {
        return Err(emitter.diagnostics);
    }
    let body = emitter.out.finish();
    let header = header::generate_header(unit, &ctx.symbols, &ctx.type_headers, options, &stem);
    tracing::debug!(file = %unit.path, bytes = body.len(), "generated body");
    Ok(GeneratedFile { body, header, stem })
}

pub(crate) fn file_stem(path: &str) -> String {
    std::path::Path::new(path)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string())
}

fn collect_comment_tokens(source: &str) -> Vec<Token> {
    let (tokens, _) = cnx_scanner::scan(source, "");
    tokens
        .into_iter()
        .filter(|t| t.kind.is_comment())
        .collect()
}

/// Per-local qualities the lowering needs: overflow mode and atomicity.
#[derive(Clone, Copy, Default)]
struct VarTraits {
    overflow: OverflowMode,
    is_atomic: bool,
}

struct Emitter<'a> {
    source: &'a str,
    table: &'a SymbolTable,
    options: &'a EmitOptions,
    line_map: LineMap,
    file: String,
    out: CodeWriter,
    comments: Vec<Token>,
    comment_idx: usize,
    scope: Vec<String>,
    diagnostics: Vec<Diagnostic>,
    local_traits: FxHashMap<String, VarTraits>,
    critical_depth: usize,
}

impl<'a> Emitter<'a> {
    // ==================== Entry ====================

    fn emit_unit(&mut self, unit: &SourceUnit, stem: &str) {
        let header_ext = self.options.language.header_extension();
        self.out.line(&format!("#include \"{stem}.{header_ext}\""));
        self.out.line(&format!(
            "#include \"{}\"",
            crate::helpers::HELPERS_FILE_NAME
        ));
        self.out.blank();
        self.emit_items(&unit.items);
        self.flush_comments(u32::MAX);
    }

    fn emit_items(&mut self, items: &[Item]) {
        for item in items {
            self.flush_comments(item.span().start);
            match item {
                Item::Scope(decl) => {
                    self.scope.push(decl.name.name.clone());
                    self.emit_items(&decl.items);
                    self.scope.pop();
                }
                Item::Function(decl) => self.emit_function(decl),
                Item::Variable(decl) => self.emit_global_var(decl),
                // Type declarations live in the companion header.
                Item::Struct(_) | Item::Enum(_) | Item::Bitmap(_) | Item::Register(_) => {}
            }
        }
    }

    // ==================== Comments ====================

    /// Replay comment tokens that start before `upto`, in order.
    /// Runs of `///` lines become one Doxygen block.
    fn flush_comments(&mut self, upto: u32) {
        while self.comment_idx < self.comments.len()
            && self.comments[self.comment_idx].span.start < upto
        {
            let token = self.comments[self.comment_idx];
            if token.kind == SyntaxKind::DocComment {
                let mut lines = Vec::new();
                while self.comment_idx < self.comments.len() {
                    let t = self.comments[self.comment_idx];
                    if t.kind != SyntaxKind::DocComment || t.span.start >= upto {
                        break;
                    }
                    lines.push(t.text(self.source));
                    self.comment_idx += 1;
                }
                let indent = self.out.current_indent();
                let block = comments::doxygen_block(&lines, &indent);
                self.out.raw_line(&block);
            } else {
                self.out.line(token.text(self.source));
                self.comment_idx += 1;
            }
        }
    }

    // ==================== Diagnostics ====================

    fn error(&mut self, span: Span, code: u32, args: &[&str]) {
        let pos = self.line_map.position(span.start);
        self.diagnostics.push(Diagnostic::error(
            self.file.clone(),
            pos.line,
            pos.column,
            message(code, args),
            code,
        ));
    }

    // ==================== Declarations ====================

    fn emit_function(&mut self, decl: &FunctionDecl) {
        let mangled = cnx_resolver::types::mangle(&self.scope, &decl.name.name);
        let Some(TSymbol::Function(symbol)) = self.table.get_cnx(&mangled) else {
            return;
        };
        let signature = function_signature(symbol, self.table, self.options, true);
        self.out.line(&format!("{signature} {{"));
        self.out.indent();

        let mut env = TypeEnv::with_function(self.table, &self.scope, decl);
        self.local_traits.clear();
        for stmt in &decl.body.stmts {
            self.emit_stmt(stmt, &mut env);
        }
        self.flush_comments(decl.body.span.end);

        self.out.dedent();
        self.out.line("}");
        self.out.blank();
    }

    fn emit_global_var(&mut self, decl: &VarDecl) {
        let mangled = cnx_resolver::types::mangle(&self.scope, &decl.name.name);
        let Some(TSymbol::Variable(symbol)) = self.table.get_cnx(&mangled) else {
            return;
        };
        if symbol.is_extern {
            // The defining translation unit owns it.
            return;
        }
        let env = TypeEnv::new(self.table, &self.scope);
        let mut prefix = String::new();
        if !symbol.common.is_exported || symbol.is_static {
            prefix.push_str("static ");
        }
        if symbol.is_volatile {
            prefix.push_str("volatile ");
        }
        if symbol.is_const {
            prefix.push_str("const ");
        }
        let line = match &symbol.ty {
            TType::Str { capacity } => {
                let init = decl
                    .init
                    .as_ref()
                    .map(|e| self.emit_expr(e, &env))
                    .unwrap_or_else(|| "\"\"".to_string());
                format!(
                    "{prefix}char {mangled}[{}] = {init};",
                    capacity + 1
                )
            }
            _ => {
                let ty = c_type_name(&symbol.ty, self.table);
                let dims = dims_suffix(&symbol.dims);
                match &decl.init {
                    Some(init) => {
                        let value = self.emit_expr(init, &env);
                        format!("{prefix}{ty} {mangled}{dims} = {value};")
                    }
                    None if !dims.is_empty() => {
                        format!("{prefix}{ty} {mangled}{dims} = {{0}};")
                    }
                    None => {
                        let init = self.default_init(&symbol.ty);
                        format!("{prefix}{ty} {mangled}{dims}{init};")
                    }
                }
            }
        };
        self.out.line(&line);
        self.out.blank();
    }

    fn default_init(&self, ty: &TType) -> String {
        match ty {
            TType::Struct(name) => {
                let designated = callback_field_inits(name, self.table);
                if designated.is_empty() {
                    " = {0}".to_string()
                } else {
                    format!(" = {{ {designated} }}")
                }
            }
            TType::Primitive(Primitive::F32 | Primitive::F64) => " = 0.0".to_string(),
            TType::External(_) => String::new(),
            _ => " = 0".to_string(),
        }
    }

    // ==================== Statements ====================

    fn emit_stmt(&mut self, stmt: &Stmt, env: &mut TypeEnv<'a>) {
        self.flush_comments(stmt.span().start);
        match stmt {
            Stmt::Var(decl) => self.emit_local_var(decl, env),
            Stmt::Assign(assign) => self.emit_assign(assign, env),
            Stmt::If(s) => self.emit_if(s, env),
            Stmt::While(s) => {
                let cond = self.emit_expr(&s.cond, env);
                self.out.line(&format!("while ({cond}) {{"));
                self.emit_nested(&s.body, env);
                self.out.line("}");
            }
            Stmt::DoWhile(s) => {
                self.out.line("do {");
                self.emit_nested(&s.body, env);
                let cond = self.emit_expr(&s.cond, env);
                self.out.line(&format!("}} while ({cond});"));
            }
            Stmt::For(s) => self.emit_for(s, env),
            Stmt::Switch(s) => self.emit_switch(s, env),
            Stmt::Return(s) => match &s.value {
                Some(value) => {
                    let text = self.emit_expr(value, env);
                    self.out.line(&format!("return {text};"));
                }
                None => self.out.line("return;"),
            },
            Stmt::Critical(block) => self.emit_critical(block, env),
            Stmt::Block(block) => {
                self.out.line("{");
                self.emit_nested(block, env);
                self.out.line("}");
            }
            Stmt::Expr(s) => {
                let text = self.emit_expr(&s.expr, env);
                self.out.line(&format!("{text};"));
            }
            // The goto analyzer rejects these before codegen runs.
            Stmt::Goto(_) => {}
        }
    }

    fn emit_nested(&mut self, block: &Block, env: &mut TypeEnv<'a>) {
        self.out.indent();
        for stmt in &block.stmts {
            self.emit_stmt(stmt, env);
        }
        self.flush_comments(block.span.end);
        self.out.dedent();
    }

    fn emit_local_var(&mut self, decl: &VarDecl, env: &mut TypeEnv<'a>) {
        let name = decl.name.name.clone();
        self.local_traits.insert(
            name.clone(),
            VarTraits {
                overflow: decl.quals.overflow.unwrap_or_default(),
                is_atomic: decl.quals.is_atomic,
            },
        );

        let mut prefix = String::new();
        if decl.quals.is_static {
            prefix.push_str("static ");
        }
        if decl.quals.is_volatile {
            prefix.push_str("volatile ");
        }
        if decl.quals.is_const {
            prefix.push_str("const ");
        }

        match &decl.ty {
            TypeExpr::String { capacity } => {
                match &decl.init {
                    Some(init @ Expr::Str { .. }) => {
                        let text = self.emit_expr(init, env);
                        self.out.line(&format!(
                            "{prefix}char {name}[{}] = {text};",
                            capacity + 1
                        ));
                    }
                    Some(init) => {
                        self.out
                            .line(&format!("{prefix}char {name}[{}] = \"\";", capacity + 1));
                        self.emit_string_assign(&name, *capacity, init, env);
                    }
                    None => {
                        self.out
                            .line(&format!("{prefix}char {name}[{}] = \"\";", capacity + 1));
                    }
                }
            }
            _ => {
                let resolved = env.resolve_type_expr(&decl.ty);
                let ty = c_type_name(&resolved, self.table);
                let dims: Vec<ArrayDimension> = decl
                    .dims
                    .iter()
                    .map(|d| dimension_to_array_dim(d, env))
                    .collect();
                let dims_text = dims_suffix(&dims);
                let line = match &decl.init {
                    Some(init) => {
                        let value = self.emit_value_for(&resolved, init, env);
                        format!("{prefix}{ty} {name}{dims_text} = {value};")
                    }
                    None if !dims_text.is_empty() => {
                        format!("{prefix}{ty} {name}{dims_text} = {{0}};")
                    }
                    None => {
                        let init = self.default_init(&resolved);
                        format!("{prefix}{ty} {name}{dims_text}{init};")
                    }
                };
                self.out.line(&line);
            }
        }
        env.declare(decl);
    }

    /// Emit a value expression destined for a known target type; bit
    /// extractions (scalar slices, bitmap field reads) pick up an
    /// explicit cast here.
    fn emit_value_for(&mut self, target: &TType, value: &Expr, env: &TypeEnv<'a>) -> String {
        let text = self.emit_expr(value, env);
        let extraction = match value.unwrap_parens() {
            Expr::Slice { base, .. } => env.type_of(base).is_some_and(|t| t.is_integer()),
            Expr::Field { base, .. } => {
                matches!(env.type_of(base), Some(TType::Bitmap { .. }))
            }
            _ => false,
        };
        if extraction {
            if let Some(prim) = target.as_primitive() {
                return format!("({})({text})", prim.c_name());
            }
        }
        text
    }

    fn emit_if(&mut self, stmt: &IfStmt, env: &mut TypeEnv<'a>) {
        let cond = self.emit_expr(&stmt.cond, env);
        self.out.line(&format!("if ({cond}) {{"));
        self.emit_nested(&stmt.then_block, env);
        let mut branch = stmt.else_branch.as_ref();
        loop {
            match branch {
                Some(ElseBranch::ElseIf(nested)) => {
                    let cond = self.emit_expr(&nested.cond, env);
                    self.out.line(&format!("}} else if ({cond}) {{"));
                    self.emit_nested(&nested.then_block, env);
                    branch = nested.else_branch.as_ref();
                }
                Some(ElseBranch::Else(block)) => {
                    self.out.line("} else {");
                    self.emit_nested(block, env);
                    branch = None;
                }
                None => break,
            }
        }
        self.out.line("}");
    }

    fn emit_for(&mut self, stmt: &ForStmt, env: &mut TypeEnv<'a>) {
        let init_text = match &*stmt.init {
            Stmt::Var(decl) => {
                let resolved = env.resolve_type_expr(&decl.ty);
                let ty = c_type_name(&resolved, self.table);
                let init = decl
                    .init
                    .as_ref()
                    .map(|e| self.emit_value_for(&resolved, e, env))
                    .unwrap_or_else(|| "0".to_string());
                self.local_traits.insert(
                    decl.name.name.clone(),
                    VarTraits {
                        overflow: decl.quals.overflow.unwrap_or_default(),
                        is_atomic: decl.quals.is_atomic,
                    },
                );
                env.declare(decl);
                format!("{ty} {} = {init}", decl.name.name)
            }
            Stmt::Assign(assign) => {
                let target = self.emit_expr(&assign.target, env);
                let value = self.emit_expr(&assign.value, env);
                format!("{target} = {value}")
            }
            _ => String::new(),
        };
        let cond = self.emit_expr(&stmt.cond, env);
        let step = self.step_expression(&stmt.step, env);
        self.out
            .line(&format!("for ({init_text}; {cond}; {step}) {{"));
        self.emit_nested(&stmt.body, env);
        self.out.line("}");
    }

    /// The step of a `for`, as a C expression.
    fn step_expression(&mut self, step: &AssignStmt, env: &TypeEnv<'a>) -> String {
        let target = self.emit_expr(&step.target, env);
        let value = self.emit_expr(&step.value, env);
        if step.op == AssignOp::Set {
            return format!("{target} = {value}");
        }
        if step.op.is_arithmetic() {
            if let Some(call) = self.overflow_call(&step.target, step.op, &value, env) {
                return format!("{target} = {call}");
            }
        }
        format!("{target} {} {value}", step.op.c_operator())
    }

    fn emit_switch(&mut self, stmt: &SwitchStmt, env: &mut TypeEnv<'a>) {
        let scrutinee = self.emit_expr(&stmt.scrutinee, env);
        self.out.line(&format!("switch ({scrutinee}) {{"));
        self.out.indent();
        for arm in &stmt.arms {
            let labels: Vec<String> = arm
                .values
                .iter()
                .map(|value| format!("case {}:", self.emit_expr(value, env)))
                .collect();
            self.out.line(&format!("{} {{", labels.join(" ")));
            self.emit_nested(&arm.body, env);
            self.out.indent();
            self.out.line("break;");
            self.out.dedent();
            self.out.line("}");
        }
        if let Some(default) = &stmt.default {
            self.out.line("default: {");
            self.emit_nested(&default.body, env);
            self.out.indent();
            self.out.line("break;");
            self.out.dedent();
            self.out.line("}");
        }
        self.out.dedent();
        self.out.line("}");
    }

    fn emit_critical(&mut self, block: &Block, env: &mut TypeEnv<'a>) {
        let mask = if self.critical_depth == 0 {
            "cnx_primask".to_string()
        } else {
            format!("cnx_primask{}", self.critical_depth + 1)
        };
        self.critical_depth += 1;
        self.out.line("{");
        self.out.indent();
        self.out
            .line(&format!("uint32_t {mask} = __get_PRIMASK();"));
        self.out.line("__disable_irq();");
        for stmt in &block.stmts {
            self.emit_stmt(stmt, env);
        }
        self.flush_comments(block.span.end);
        self.out.line(&format!("__set_PRIMASK({mask});"));
        self.out.dedent();
        self.out.line("}");
        self.critical_depth -= 1;
    }

    // ==================== Assignment lowering ====================

    fn emit_assign(&mut self, assign: &AssignStmt, env: &mut TypeEnv<'a>) {
        // Register member, whole or single bit.
        if let Some(lowered) = self.try_register_write(assign, env) {
            if let Some(line) = lowered {
                self.out.line(&line);
            }
            return;
        }
        // Bitmap field write.
        if let Some(line) = self.try_bitmap_write(assign, env) {
            self.out.line(&line);
            return;
        }
        // Single-bit write on an integer scalar.
        if let Some(line) = self.try_scalar_bit_write(assign, env) {
            self.out.line(&line);
            return;
        }
        // Slice writes: byte ranges on arrays, bit ranges on scalars.
        if let Expr::Slice {
            base,
            offset,
            length,
            ..
        } = assign.target.unwrap_parens()
        {
            self.emit_slice_write(base, offset, length, &assign.value, env);
            return;
        }
        // Whole-string assignment.
        if let Some(TType::Str { capacity }) = env.type_of(&assign.target) {
            let target = self.emit_expr(&assign.target, env);
            self.emit_string_assign(&target, capacity, &assign.value, env);
            return;
        }
        // Callback field: nominal type check before the plain store.
        self.check_callback_assign(assign, env);

        let target = self.emit_expr(&assign.target, env);
        let value = self.emit_expr(&assign.value, env);

        if assign.op == AssignOp::Set {
            let target_ty = env.type_of(&assign.target);
            let text = match target_ty {
                Some(ref ty) => self.emit_value_for(ty, &assign.value, env),
                None => value,
            };
            self.out.line(&format!("{target} = {text};"));
            return;
        }

        let traits = self.traits_of(&assign.target, env);
        if assign.op.is_arithmetic() {
            if let Some(call) = self.overflow_call(&assign.target, assign.op, &value, env) {
                if traits.is_atomic {
                    self.emit_atomic_rmw(&target, &assign.target, assign.op, &value, env);
                } else {
                    self.out.line(&format!("{target} = {call};"));
                }
                return;
            }
        }
        if traits.is_atomic {
            self.emit_atomic_rmw(&target, &assign.target, assign.op, &value, env);
        } else {
            self.out
                .line(&format!("{target} {} {value};", assign.op.c_operator()));
        }
    }

    /// The clamp/wrap/panic helper call for a compound arithmetic
    /// assignment, when the target is a sized integer.
    fn overflow_call(
        &mut self,
        target: &Expr,
        op: AssignOp,
        value_text: &str,
        env: &TypeEnv<'a>,
    ) -> Option<String> {
        let prim = env.type_of(target)?.as_primitive()?;
        if !prim.is_integer() {
            return None;
        }
        let op_name = match op {
            AssignOp::Add => "add",
            AssignOp::Sub => "sub",
            AssignOp::Mul => "mul",
            // Division cannot overflow; safe_div covers the zero case.
            _ => return None,
        };
        let traits = self.traits_of(target, env);
        let mode = if self.options.debug {
            "panic"
        } else {
            match traits.overflow {
                OverflowMode::Clamp => "clamp",
                OverflowMode::Wrap => "wrap",
            }
        };
        let target_text = self.emit_expr(target, env);
        Some(format!(
            "{}({target_text}, {value_text})",
            crate::helpers::helper_name(mode, op_name, prim.cnx_name())
        ))
    }

    fn traits_of(&self, target: &Expr, _env: &TypeEnv<'a>) -> VarTraits {
        let Some(root) = target.root_ident() else {
            return VarTraits::default();
        };
        if let Some(traits) = self.local_traits.get(root) {
            return *traits;
        }
        match self.table.resolve(&self.scope, root) {
            Some((_, TSymbol::Variable(v))) => VarTraits {
                overflow: v.overflow,
                is_atomic: v.is_atomic,
            },
            _ => VarTraits::default(),
        }
    }

    /// Atomic read-modify-write: LDREX/STREX retry loop on M3+ for
    /// 32-bit-or-narrower scalars, PRIMASK masking everywhere else.
    fn emit_atomic_rmw(
        &mut self,
        target_text: &str,
        target: &Expr,
        op: AssignOp,
        value_text: &str,
        env: &TypeEnv<'a>,
    ) {
        let prim = env
            .type_of(target)
            .and_then(|t| t.as_primitive())
            .unwrap_or(Primitive::U32);
        let width = prim.bit_width();
        let use_exclusive = self.options.target.has_exclusives() && width <= 32;

        let update = |operand: &str, emitter: &mut Self| -> String {
            if op.is_arithmetic() {
                let op_name = match op {
                    AssignOp::Add => "add",
                    AssignOp::Sub => "sub",
                    AssignOp::Mul => "mul",
                    _ => return format!("({operand} {} {value_text})", binary_of(op)),
                };
                let traits = emitter.traits_of(target, env);
                let mode = if emitter.options.debug {
                    "panic"
                } else {
                    match traits.overflow {
                        OverflowMode::Clamp => "clamp",
                        OverflowMode::Wrap => "wrap",
                    }
                };
                format!(
                    "{}({operand}, {value_text})",
                    crate::helpers::helper_name(mode, op_name, prim.cnx_name())
                )
            } else {
                format!(
                    "({})({operand} {} {value_text})",
                    prim.c_name(),
                    binary_of(op)
                )
            }
        };

        if use_exclusive {
            let (ldrex, strex) = match width {
                8 => ("__LDREXB", "__STREXB"),
                16 => ("__LDREXH", "__STREXH"),
                _ => ("__LDREXW", "__STREXW"),
            };
            let c_ty = prim.c_name();
            self.out.line("{");
            self.out.indent();
            self.out.line(&format!("{c_ty} cnx_old;"));
            self.out.line("do {");
            self.out.indent();
            self.out
                .line(&format!("cnx_old = ({c_ty}){ldrex}(&{target_text});"));
            let updated = update("cnx_old", self);
            self.out.line(&format!("cnx_old = {updated};"));
            self.out.dedent();
            self.out
                .line(&format!("}} while ({strex}(cnx_old, &{target_text}) != 0u);"));
            self.out.dedent();
            self.out.line("}");
        } else {
            let updated = update(target_text, self);
            self.out.line("{");
            self.out.indent();
            self.out.line("uint32_t cnx_primask = __get_PRIMASK();");
            self.out.line("__disable_irq();");
            self.out.line(&format!("{target_text} = {updated};"));
            self.out.line("__set_PRIMASK(cnx_primask);");
            self.out.dedent();
            self.out.line("}");
        }
    }

    /// `R.M <- v` and `R.M[bit] <- v`. Returns `Some(None)` when the
    /// write was rejected (diagnostic already recorded).
    fn try_register_write(
        &mut self,
        assign: &AssignStmt,
        env: &TypeEnv<'a>,
    ) -> Option<Option<String>> {
        let (member_expr, bit) = match assign.target.unwrap_parens() {
            Expr::Index { base, index, .. } => (base.as_ref(), Some(index.as_ref())),
            other => (other, None),
        };
        let resolution = resolve_path(self.table, &self.scope, member_expr)?;
        let TSymbol::Register(register) = resolution.symbol else {
            return None;
        };
        let member_name = resolution.rest.first()?.clone();
        let member = register.members.get(&member_name)?;
        let macro_name = format!("{}_{}", resolution.key, member_name);

        if !member.access.writable() {
            self.error(
                assign.span,
                diagnostic_codes::REGISTER_ACCESS_VIOLATION,
                &[&macro_name, member.access.keyword(), "write"],
            );
            return Some(None);
        }

        let value = &assign.value;
        let line = match bit {
            None => {
                let text = self.emit_expr(value, env);
                format!("{macro_name} {} {text};", assign.op.c_operator())
            }
            Some(bit_expr) => {
                let bit_text = self.emit_expr(bit_expr, env);
                match (member.access, env.const_value(value)) {
                    // Set/clear/toggle hardware: plain mask store, no RMW.
                    (Access::WriteOnly, Some(v)) if v != 0 => {
                        format!("{macro_name} = (1u << {bit_text});")
                    }
                    (Access::WriteOnly, Some(_)) => format!("{macro_name} = 0u;"),
                    (Access::WriteOnly, None) => {
                        let text = self.emit_expr(value, env);
                        format!("{macro_name} = ((uint32_t)({text}) << {bit_text});")
                    }
                    (_, Some(v)) if v != 0 => {
                        format!("{macro_name} |= (1u << {bit_text});")
                    }
                    (_, Some(_)) => format!("{macro_name} &= ~(1u << {bit_text});"),
                    (_, None) => {
                        let text = self.emit_expr(value, env);
                        format!(
                            "{macro_name} = ({macro_name} & ~(1u << {bit_text})) | ((uint32_t)({text}) << {bit_text});"
                        )
                    }
                }
            }
        };
        Some(Some(line))
    }

    /// `flags.ready <- v` where `flags` is bitmap-typed: masked RMW with
    /// guaranteed LSB-first layout.
    fn try_bitmap_write(&mut self, assign: &AssignStmt, env: &TypeEnv<'a>) -> Option<String> {
        let Expr::Field { base, name, .. } = assign.target.unwrap_parens() else {
            return None;
        };
        let TType::Bitmap {
            name: bitmap_key, ..
        } = env.type_of(base)?
        else {
            return None;
        };
        let Some(TSymbol::Bitmap(bitmap)) = self.table.get_cnx(&bitmap_key) else {
            return None;
        };
        let field = bitmap.fields.get(&name.name)?;
        let backing = bitmap_backing(bitmap.bit_width);
        let mask = ((1u64 << field.width) - 1) << field.offset;
        let base_text = self.emit_expr(base, env);
        let mut value_text = self.emit_expr(&assign.value, env);
        if assign.op != AssignOp::Set {
            let read = self.bitmap_read(&base_text, &bitmap_key, &name.name)?;
            value_text = format!("({read} {} {value_text})", binary_of(assign.op));
        }
        Some(format!(
            "{base_text} = ({backing})(({base_text} & ~{mask:#X}u) | ((({backing})({value_text}) << {offset}) & {mask:#X}u));",
            offset = field.offset,
        ))
    }

    /// `x[3] <- v` on an integer scalar.
    fn try_scalar_bit_write(&mut self, assign: &AssignStmt, env: &TypeEnv<'a>) -> Option<String> {
        let Expr::Index { base, index, .. } = assign.target.unwrap_parens() else {
            return None;
        };
        let base_ty = env.type_of(base)?;
        if !base_ty.is_integer() {
            return None;
        }
        let base_text = self.emit_expr(base, env);
        let index_text = self.emit_expr(index, env);
        let c_ty = base_ty.as_primitive().map(|p| p.c_name()).unwrap_or("uint32_t");
        if assign.op != AssignOp::Set {
            let read = format!("(({base_text} >> {index_text}) & 1u)");
            let value_text = self.emit_expr(&assign.value, env);
            let composed = format!("({read} {} {value_text})", binary_of(assign.op));
            return Some(format!(
                "{base_text} = ({c_ty})(({base_text} & ~(1u << {index_text})) | (({c_ty})({composed}) << {index_text}));"
            ));
        }
        Some(match env.const_value(&assign.value) {
            Some(v) if v != 0 => format!("{base_text} |= ({c_ty})(1u << {index_text});"),
            Some(_) => format!("{base_text} &= ({c_ty})~(1u << {index_text});"),
            None => {
                let value_text = self.emit_expr(&assign.value, env);
                format!(
                    "{base_text} = ({c_ty})(({base_text} & ~(1u << {index_text})) | (({c_ty})({value_text}) << {index_text}));"
                )
            }
        })
    }

    /// `buf[off, len] <- expr` on arrays, `x[start, width] <- v` on
    /// scalars, `s[a, b] <- src` on strings.
    fn emit_slice_write(
        &mut self,
        base: &Expr,
        offset: &Expr,
        length: &Expr,
        value: &Expr,
        env: &TypeEnv<'a>,
    ) {
        let base_text = self.emit_expr(base, env);
        let offset_text = self.emit_expr(offset, env);
        let length_text = self.emit_expr(length, env);
        match env.type_of(base) {
            Some(TType::Array { .. }) => {
                let src = match value.unwrap_parens() {
                    Expr::Slice {
                        base: src_base,
                        offset: src_off,
                        ..
                    } => {
                        let b = self.emit_expr(src_base, env);
                        let o = self.emit_expr(src_off, env);
                        format!("&{b}[{o}]")
                    }
                    other => {
                        let text = self.emit_expr(other, env);
                        format!("&{text}")
                    }
                };
                self.out.line(&format!(
                    "memcpy(&{base_text}[{offset_text}], {src}, {length_text});"
                ));
            }
            Some(TType::Str { .. }) => {
                let src = self.emit_expr(value, env);
                self.out.line(&format!(
                    "strncpy(&{base_text}[{offset_text}], {src}, {length_text});"
                ));
            }
            Some(ty) if ty.is_integer() => {
                let c_ty = ty.as_primitive().map(|p| p.c_name()).unwrap_or("uint32_t");
                let value_text = self.emit_expr(value, env);
                let mask = width_mask_text(env.const_value(length));
                self.out.line(&format!(
                    "{base_text} = ({c_ty})(({base_text} & ~({mask} << {offset_text})) | ((({c_ty})({value_text}) & {mask}) << {offset_text}));"
                ));
            }
            _ => {
                let value_text = self.emit_expr(value, env);
                self.out.line(&format!(
                    "memcpy(&{base_text}[{offset_text}], &{value_text}, {length_text});"
                ));
            }
        }
    }

    /// strncpy/strncat chain for `string<N>` assignment.
    fn emit_string_assign(
        &mut self,
        target: &str,
        capacity: u32,
        value: &Expr,
        env: &TypeEnv<'a>,
    ) {
        if let Expr::Slice {
            base,
            offset,
            length,
            ..
        } = value.unwrap_parens()
        {
            let b = self.emit_expr(base, env);
            let o = self.emit_expr(offset, env);
            let l = self.emit_expr(length, env);
            self.out
                .line(&format!("strncpy({target}, &{b}[{o}], {l});"));
            self.out.line(&format!("{target}[{l}] = '\\0';"));
            return;
        }
        let mut parts = Vec::new();
        flatten_concat(value, &mut parts);
        let mut first = true;
        for part in parts {
            let text = self.emit_expr(part, env);
            if first {
                self.out
                    .line(&format!("strncpy({target}, {text}, {capacity}u);"));
                first = false;
            } else {
                self.out.line(&format!(
                    "strncat({target}, {text}, {capacity}u - strlen({target}));"
                ));
            }
        }
        self.out.line(&format!("{target}[{capacity}] = '\\0';"));
    }

    fn check_callback_assign(&mut self, assign: &AssignStmt, env: &TypeEnv<'a>) {
        let Some(TType::Callback(expected)) = env.type_of(&assign.target) else {
            return;
        };
        let Some(resolution) = resolve_path(self.table, &self.scope, &assign.value) else {
            return;
        };
        if !resolution.rest.is_empty() {
            return;
        }
        if let TSymbol::Function(f) = resolution.symbol {
            let nominal_ok =
                resolution.key == expected || f.callback_of.as_deref() == Some(expected.as_str());
            if !nominal_ok {
                self.error(
                    assign.span,
                    diagnostic_codes::CALLBACK_SIGNATURE_MISMATCH,
                    &[&resolution.key, &expected],
                );
            }
        }
    }

    // ==================== Expressions ====================

    fn emit_expr(&mut self, expr: &Expr, env: &TypeEnv<'a>) -> String {
        match expr {
            Expr::Int { span, .. }
            | Expr::Float { span }
            | Expr::Str { span }
            | Expr::Char { span } => span.slice(self.source).to_string(),
            Expr::Bool { value, .. } => if *value { "true" } else { "false" }.to_string(),
            Expr::Null { .. } => "NULL".to_string(),
            Expr::Ident { name, .. } => {
                if env.local_type(name).is_some() {
                    name.clone()
                } else if let Some((key, _)) = self.table.resolve(&self.scope, name) {
                    key
                } else {
                    name.clone()
                }
            }
            Expr::This { .. } | Expr::Global { .. } => String::new(),
            Expr::Field { base, name, .. } => self.emit_field(expr, base, name, env),
            Expr::Index { base, index, .. } => {
                let base_text = self.emit_expr(base, env);
                let index_text = self.emit_expr(index, env);
                match env.type_of(base) {
                    Some(TType::Array { .. }) | Some(TType::Str { .. }) => {
                        format!("{base_text}[{index_text}]")
                    }
                    Some(ty) if ty.is_integer() => {
                        format!("(({base_text} >> {index_text}) & 1u)")
                    }
                    Some(TType::Bitmap { .. }) => {
                        format!("(({base_text} >> {index_text}) & 1u)")
                    }
                    _ => format!("{base_text}[{index_text}]"),
                }
            }
            Expr::Slice {
                base,
                offset,
                length,
                ..
            } => self.emit_slice_read(base, offset, length, env),
            Expr::Call { callee, args, .. } => {
                let callee_text = self.emit_expr(callee, env);
                let args_text: Vec<String> =
                    args.iter().map(|arg| self.emit_expr(arg, env)).collect();
                format!("{callee_text}({})", args_text.join(", "))
            }
            Expr::Unary { op, operand, .. } => {
                let text = self.emit_operand(operand, env);
                format!("{}{text}", op.c_operator())
            }
            Expr::Binary { op, lhs, rhs, .. } => self.emit_binary(*op, lhs, rhs, env),
            Expr::Ternary {
                cond,
                then_expr,
                else_expr,
                ..
            } => {
                let c = self.emit_expr(cond, env);
                let t = self.emit_expr(then_expr, env);
                let e = self.emit_expr(else_expr, env);
                format!("(({c}) ? ({t}) : ({e}))")
            }
            Expr::Sizeof { arg, .. } => match arg {
                SizeofArg::Type(ty) => {
                    let env_ty = env.resolve_type_expr(ty);
                    format!("sizeof({})", c_type_name(&env_ty, self.table))
                }
                SizeofArg::Expr(inner) => {
                    let text = self.emit_expr(inner, env);
                    format!("sizeof({text})")
                }
            },
            Expr::Paren { inner, .. } => {
                let text = self.emit_expr(inner, env);
                format!("({text})")
            }
        }
    }

    fn emit_field(&mut self, whole: &Expr, base: &Expr, name: &Ident, env: &TypeEnv<'a>) -> String {
        if let Some(resolution) = resolve_path(self.table, &self.scope, whole) {
            match resolution.symbol {
                TSymbol::Enum(_) if resolution.rest.len() == 1 => {
                    return format!("{}_{}", resolution.key, resolution.rest[0]);
                }
                TSymbol::Register(r) if resolution.rest.len() == 1 => {
                    let member_name = &resolution.rest[0];
                    if let Some(member) = r.members.get(member_name) {
                        if !member.access.readable() {
                            self.error(
                                whole.span(),
                                diagnostic_codes::REGISTER_ACCESS_VIOLATION,
                                &[
                                    &format!("{}_{}", resolution.key, member_name),
                                    member.access.keyword(),
                                    "read",
                                ],
                            );
                        }
                    }
                    return format!("{}_{}", resolution.key, member_name);
                }
                TSymbol::Variable(v) if !resolution.rest.is_empty() => {
                    // Bitmap field read through a scoped variable.
                    if let TType::Bitmap {
                        name: bitmap_key, ..
                    } = &v.ty
                    {
                        if let Some(text) =
                            self.bitmap_read(&resolution.key, bitmap_key, &resolution.rest[0])
                        {
                            return text;
                        }
                    }
                    return format!("{}.{}", resolution.key, resolution.rest.join("."));
                }
                _ if resolution.rest.is_empty() => return resolution.key,
                _ => {
                    let mut text = resolution.key;
                    for part in &resolution.rest {
                        text.push('_');
                        text.push_str(part);
                    }
                    return text;
                }
            }
        }
        // Locally-rooted access: struct field or bitmap extraction.
        let base_text = self.emit_expr(base, env);
        if let Some(TType::Bitmap {
            name: bitmap_key, ..
        }) = env.type_of(base)
        {
            if let Some(text) = self.bitmap_read(&base_text, &bitmap_key, &name.name) {
                return text;
            }
        }
        format!("{base_text}.{}", name.name)
    }

    fn bitmap_read(&self, base_text: &str, bitmap_key: &str, field: &str) -> Option<String> {
        let Some(TSymbol::Bitmap(bitmap)) = self.table.get_cnx(bitmap_key) else {
            return None;
        };
        let info = bitmap.fields.get(field)?;
        let mask = (1u64 << info.width) - 1;
        Some(if info.offset == 0 {
            format!("({base_text} & {mask:#X}u)")
        } else {
            format!("(({base_text} >> {}) & {mask:#X}u)", info.offset)
        })
    }

    fn emit_slice_read(
        &mut self,
        base: &Expr,
        offset: &Expr,
        length: &Expr,
        env: &TypeEnv<'a>,
    ) -> String {
        let base_text = self.emit_expr(base, env);
        let offset_text = self.emit_expr(offset, env);
        match env.type_of(base) {
            Some(ty) if ty.is_integer() => {
                let mask = width_mask_text(env.const_value(length));
                if env.const_value(offset) == Some(0) {
                    format!("({base_text} & {mask})")
                } else {
                    format!("(({base_text} >> {offset_text}) & {mask})")
                }
            }
            _ => format!("&{base_text}[{offset_text}]"),
        }
    }

    fn emit_binary(&mut self, op: BinaryOp, lhs: &Expr, rhs: &Expr, env: &TypeEnv<'a>) -> String {
        // String equality becomes strcmp.
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne) {
            let stringish = |e: &Expr| {
                matches!(
                    env.type_of(e),
                    Some(TType::Str { .. }) | Some(TType::Primitive(Primitive::CString))
                ) || matches!(e.unwrap_parens(), Expr::Str { .. })
            };
            if stringish(lhs) && stringish(rhs) {
                let l = self.emit_expr(lhs, env);
                let r = self.emit_expr(rhs, env);
                let cmp = if op == BinaryOp::Eq { "==" } else { "!=" };
                return format!("(strcmp({l}, {r}) {cmp} 0)");
            }
        }
        if matches!(op, BinaryOp::SafeDiv | BinaryOp::SafeMod) {
            let suffix = env
                .type_of(lhs)
                .and_then(|t| t.as_primitive())
                .filter(|p| p.is_integer())
                .map(|p| p.cnx_name().to_string())
                .unwrap_or_else(|| "i32".to_string());
            let name = if op == BinaryOp::SafeDiv {
                format!("cnx_safe_div_{suffix}")
            } else {
                format!("cnx_safe_mod_{suffix}")
            };
            let l = self.emit_expr(lhs, env);
            let r = self.emit_expr(rhs, env);
            return format!("{name}({l}, {r})");
        }
        let l = self.emit_operand(lhs, env);
        let r = self.emit_operand(rhs, env);
        format!("{l} {} {r}", op.c_operator())
    }

    /// Operand with parentheses when its own structure could rebind.
    fn emit_operand(&mut self, expr: &Expr, env: &TypeEnv<'a>) -> String {
        let text = self.emit_expr(expr, env);
        match expr {
            Expr::Binary { .. } | Expr::Ternary { .. } => format!("({text})"),
            _ => text,
        }
    }
}

fn binary_of(op: AssignOp) -> &'static str {
    match op {
        AssignOp::Add => "+",
        AssignOp::Sub => "-",
        AssignOp::Mul => "*",
        AssignOp::Div => "/",
        AssignOp::Mod => "%",
        AssignOp::And => "&",
        AssignOp::Or => "|",
        AssignOp::Xor => "^",
        AssignOp::Shl => "<<",
        AssignOp::Shr => ">>",
        AssignOp::Set => "",
    }
}

/// Flatten a `+` chain left-to-right.
fn flatten_concat<'e>(expr: &'e Expr, parts: &mut Vec<&'e Expr>) {
    match expr.unwrap_parens() {
        Expr::Binary {
            op: BinaryOp::Add,
            lhs,
            rhs,
            ..
        } => {
            flatten_concat(lhs, parts);
            flatten_concat(rhs, parts);
        }
        other => parts.push(other),
    }
}

fn width_mask_text(width: Option<i64>) -> String {
    match width {
        Some(w) if (1..=63).contains(&w) => {
            format!("{:#X}", (1u64 << w) - 1)
        }
        _ => "0xFF".to_string(),
    }
}

fn dimension_to_array_dim(dim: &Dimension, env: &TypeEnv<'_>) -> ArrayDimension {
    match dim {
        Dimension::Literal(n) => ArrayDimension::Fixed(*n),
        Dimension::Named(name) => match env.table.resolve(&env.scope, name) {
            Some((key, TSymbol::Variable(v))) if v.is_const => match v.const_value {
                Some(value) if value >= 0 => ArrayDimension::Fixed(value.unsigned_abs()),
                _ => ArrayDimension::Symbolic(key),
            },
            _ => ArrayDimension::Symbolic(name.clone()),
        },
        Dimension::Scoped(segments) => ArrayDimension::Symbolic(segments.join("_")),
    }
}

pub(crate) fn dims_suffix(dims: &[ArrayDimension]) -> String {
    dims.iter().map(|d| format!("[{}]", d.c_text())).collect()
}

/// Round a bitmap width up to its backing C type.
pub(crate) fn bitmap_backing(bit_width: u8) -> &'static str {
    match bit_width {
        8 => "uint8_t",
        16 => "uint16_t",
        _ => "uint32_t",
    }
}

/// The C spelling of a type value.
pub fn c_type_name(ty: &TType, table: &SymbolTable) -> String {
    match ty {
        TType::Primitive(p) => p.c_name().to_string(),
        TType::Struct(name) => {
            if table.needs_struct_keyword.contains(name) {
                format!("struct {name}")
            } else {
                name.clone()
            }
        }
        TType::Enum(name) => name.clone(),
        TType::Bitmap { bit_width, .. } => bitmap_backing(*bit_width).to_string(),
        TType::Array { element, .. } => c_type_name(element, table),
        TType::Str { capacity } => format!("char[{}]", capacity + 1),
        TType::Callback(name) => format!("{name}_fp"),
        TType::Register(name) | TType::External(name) => name.clone(),
    }
}

/// Initializers for a struct's callback fields: each defaults to the
/// callback declaration itself, so call sites can never be null.
pub(crate) fn callback_field_inits(struct_name: &str, table: &SymbolTable) -> String {
    let Some(fields) = table.struct_fields.get(struct_name) else {
        return String::new();
    };
    let inits: Vec<String> = fields
        .iter()
        .filter_map(|(name, info)| match &info.ty {
            TType::Callback(cb) => Some(format!(".{name} = {cb}")),
            _ => None,
        })
        .collect();
    inits.join(", ")
}

/// A function's C signature, shared by the definition and the prototype.
pub fn function_signature(
    symbol: &FunctionSymbol,
    table: &SymbolTable,
    options: &EmitOptions,
    for_definition: bool,
) -> String {
    let mut out = String::new();
    if for_definition && !symbol.common.is_exported {
        out.push_str("static ");
    }
    out.push_str(&c_type_name(&symbol.return_type, table));
    out.push(' ');
    out.push_str(&symbol.common.mangled());
    out.push('(');
    if symbol.params.is_empty() {
        out.push_str("void");
    } else {
        let params: Vec<String> = symbol
            .params
            .iter()
            .map(|p| param_text(p, table, options))
            .collect();
        out.push_str(&params.join(", "));
    }
    out.push(')');
    out
}

fn param_text(
    p: &cnx_resolver::types::ParamSymbol,
    table: &SymbolTable,
    options: &EmitOptions,
) -> String {
    // Auto-const surfaces only in C++ output, where const-ness
    // participates in overload resolution; C callers keep their
    // prototypes untouched.
    let auto = options.language.is_cpp() && p.is_auto_const;
    let constness = if p.is_const || auto { "const " } else { "" };
    match (&p.ty, p.is_array) {
        (TType::Str { .. }, _) => format!("{constness}char {}[]", p.name),
        (ty, true) => format!("{constness}{} {}[]", c_type_name(ty, table), p.name),
        (ty, false) => format!("{constness}{} {}", c_type_name(ty, table), p.name),
    }
}

#[cfg(test)]
#[path = "tests/codegen_unit_tests.rs"]
mod tests;
