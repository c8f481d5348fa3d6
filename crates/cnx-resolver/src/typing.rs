//! Expression typing and const evaluation over the symbol table.
//!
//! Shared by the analyzers (narrowing, boolean conditions, division) and
//! the code generator (lowering decisions). Literals are "untyped
//! constants": `type_of` returns `None` for them and callers consult
//! `const_value` to range-check against the destination type.

use cnx_parser::ast::*;
use rustc_hash::FxHashMap;

use crate::table::SymbolTable;
use crate::types::{TSymbol, TType, mangle};

/// How a dotted path anchors its lookup.
enum PathRoot {
    Plain,
    This,
    Global,
}

fn path_of(expr: &Expr) -> Option<(PathRoot, Vec<String>)> {
    match expr {
        Expr::This { .. } => Some((PathRoot::This, Vec::new())),
        Expr::Global { .. } => Some((PathRoot::Global, Vec::new())),
        Expr::Ident { name, .. } => Some((PathRoot::Plain, vec![name.clone()])),
        Expr::Field { base, name, .. } => {
            let (root, mut segments) = path_of(base)?;
            segments.push(name.name.clone());
            Some((root, segments))
        }
        Expr::Paren { inner, .. } => path_of(inner),
        _ => None,
    }
}

/// A resolved dotted path: the longest symbol prefix plus any remaining
/// member segments (struct fields, enum members, register members).
pub struct PathResolution<'a> {
    pub key: String,
    pub symbol: &'a TSymbol,
    pub rest: Vec<String>,
}

/// Resolve a plain `a.b.c` chain against the table. Locals are not the
/// table's business; callers check their own environment first.
pub fn resolve_path<'a>(
    table: &'a SymbolTable,
    scope: &[String],
    expr: &Expr,
) -> Option<PathResolution<'a>> {
    let (root, segments) = path_of(expr)?;
    if segments.is_empty() {
        return None;
    }
    let depths: Vec<usize> = match root {
        PathRoot::Plain => (0..=scope.len()).rev().collect(),
        PathRoot::This => vec![scope.len()],
        PathRoot::Global => vec![0],
    };
    for take in (1..=segments.len()).rev() {
        let joined = segments[..take].join("_");
        for &depth in &depths {
            let key = mangle(&scope[..depth], &joined);
            if let Some(symbol) = table.get_cnx(&key) {
                return Some(PathResolution {
                    key,
                    symbol,
                    rest: segments[take..].to_vec(),
                });
            }
            if depth == 0 {
                if let Some(symbol) = table.get_foreign(&joined) {
                    return Some(PathResolution {
                        key: joined.clone(),
                        symbol,
                        rest: segments[take..].to_vec(),
                    });
                }
            }
        }
    }
    None
}

/// The mangled name of a call target, when the callee resolves to a
/// function symbol.
pub fn resolve_call_target(table: &SymbolTable, scope: &[String], callee: &Expr) -> Option<String> {
    let resolution = resolve_path(table, scope, callee)?;
    match resolution.symbol {
        TSymbol::Function(_) if resolution.rest.is_empty() => Some(resolution.key),
        _ => None,
    }
}

/// Per-function typing environment: the table plus local bindings.
pub struct TypeEnv<'a> {
    pub table: &'a SymbolTable,
    pub scope: Vec<String>,
    locals: FxHashMap<String, TType>,
    local_consts: FxHashMap<String, i64>,
}

impl<'a> TypeEnv<'a> {
    pub fn new(table: &'a SymbolTable, scope: &[String]) -> Self {
        TypeEnv {
            table,
            scope: scope.to_vec(),
            locals: FxHashMap::default(),
            local_consts: FxHashMap::default(),
        }
    }

    /// Seed the environment with a function's parameters.
    pub fn with_function(table: &'a SymbolTable, scope: &[String], decl: &FunctionDecl) -> Self {
        let mut env = Self::new(table, scope);
        for param in &decl.params {
            let base = env.resolve_type_expr(&param.ty);
            let ty = if param.is_array {
                TType::Array {
                    element: Box::new(base),
                    dims: Vec::new(),
                }
            } else {
                base
            };
            env.bind(&param.name.name, ty);
        }
        env
    }

    pub fn bind(&mut self, name: &str, ty: TType) {
        self.locals.insert(name.to_string(), ty);
    }

    pub fn bind_const(&mut self, name: &str, value: i64) {
        self.local_consts.insert(name.to_string(), value);
    }

    /// Record a local declaration (type + const value when evaluable).
    pub fn declare(&mut self, decl: &VarDecl) {
        let base = self.resolve_type_expr(&decl.ty);
        let ty = if decl.dims.is_empty() {
            base
        } else {
            let dims = decl
                .dims
                .iter()
                .map(|dim| match dim {
                    Dimension::Literal(n) => crate::types::ArrayDimension::Fixed(*n),
                    Dimension::Named(name) => {
                        match self
                            .local_consts
                            .get(name)
                            .copied()
                            .or_else(|| self.table.resolve_const(&self.scope, name))
                        {
                            Some(value) if value >= 0 => {
                                crate::types::ArrayDimension::Fixed(value.unsigned_abs())
                            }
                            _ => crate::types::ArrayDimension::Symbolic(name.clone()),
                        }
                    }
                    Dimension::Scoped(segments) => {
                        crate::types::ArrayDimension::Symbolic(segments.join("_"))
                    }
                })
                .collect();
            TType::Array {
                element: Box::new(base),
                dims,
            }
        };
        self.bind(&decl.name.name, ty);
        if decl.quals.is_const {
            if let Some(value) = decl.init.as_ref().and_then(|init| self.const_value(init)) {
                self.bind_const(&decl.name.name, value);
            }
        }
    }

    pub fn local_type(&self, name: &str) -> Option<&TType> {
        self.locals.get(name)
    }

    pub fn resolve_type_expr(&self, ty: &TypeExpr) -> TType {
        match ty {
            TypeExpr::Primitive(p) => TType::Primitive(*p),
            TypeExpr::String { capacity } => TType::Str {
                capacity: *capacity,
            },
            TypeExpr::Named(name) => match self.table.resolve(&self.scope, name) {
                Some((key, TSymbol::Struct(_))) => TType::Struct(key),
                Some((key, TSymbol::Enum(_))) => TType::Enum(key),
                Some((key, TSymbol::Bitmap(b))) => TType::Bitmap {
                    name: key,
                    bit_width: b.bit_width,
                },
                Some((key, TSymbol::Register(_))) => TType::Register(key),
                Some((key, TSymbol::Function(_))) => TType::Callback(key),
                _ => self
                    .table
                    .type_aliases
                    .get(name)
                    .cloned()
                    .unwrap_or_else(|| TType::External(name.clone())),
            },
        }
    }

    /// The type of an expression, or `None` for untyped constants
    /// (integer/float/char literals, NULL, bit extractions).
    pub fn type_of(&self, expr: &Expr) -> Option<TType> {
        match expr {
            Expr::Int { .. } | Expr::Float { .. } | Expr::Char { .. } | Expr::Null { .. } => None,
            Expr::Bool { .. } => Some(TType::Primitive(Primitive::Bool)),
            Expr::Str { span } => Some(TType::Str {
                capacity: span.len().saturating_sub(2),
            }),
            Expr::Ident { name, .. } => {
                if let Some(ty) = self.locals.get(name) {
                    return Some(ty.clone());
                }
                let (_, symbol) = self.table.resolve(&self.scope, name)?;
                symbol.value_type()
            }
            Expr::This { .. } | Expr::Global { .. } => None,
            Expr::Field { base, name, .. } => self.type_of_field(expr, base, &name.name),
            Expr::Index { base, .. } => match self.type_of(base)? {
                TType::Array { element, .. } => Some(*element),
                TType::Str { .. } => Some(TType::Primitive(Primitive::U8)),
                ty if ty.is_integer() => Some(TType::Primitive(Primitive::Bool)),
                TType::Bitmap { .. } => Some(TType::Primitive(Primitive::Bool)),
                _ => None,
            },
            // Slices are the sanctioned narrowing escape; they fit any
            // destination wide enough, so they stay untyped.
            Expr::Slice { .. } => None,
            Expr::Call { callee, .. } => {
                let target = resolve_call_target(self.table, &self.scope, callee)?;
                match self.table.get_cnx(&target).or_else(|| self.table.get_foreign(&target)) {
                    Some(TSymbol::Function(f)) => Some(f.return_type.clone()),
                    _ => None,
                }
            }
            Expr::Unary { op, operand, .. } => match op {
                UnaryOp::Not => Some(TType::Primitive(Primitive::Bool)),
                UnaryOp::Neg | UnaryOp::BitNot => self.type_of(operand),
            },
            Expr::Binary { op, lhs, rhs, .. } => {
                if op.is_boolean() {
                    Some(TType::Primitive(Primitive::Bool))
                } else {
                    self.type_of(lhs).or_else(|| self.type_of(rhs))
                }
            }
            Expr::Ternary {
                then_expr,
                else_expr,
                ..
            } => self.type_of(then_expr).or_else(|| self.type_of(else_expr)),
            Expr::Sizeof { .. } => Some(TType::Primitive(Primitive::Usize)),
            Expr::Paren { inner, .. } => self.type_of(inner),
        }
    }

    fn type_of_field(&self, whole: &Expr, base: &Expr, field: &str) -> Option<TType> {
        // Scope members, enum members, register members.
        if let Some(resolution) = resolve_path(self.table, &self.scope, whole) {
            match resolution.symbol {
                TSymbol::Enum(_) if resolution.rest.len() == 1 => {
                    return Some(TType::Enum(resolution.key));
                }
                TSymbol::Register(r) if resolution.rest.len() == 1 => {
                    return r.members.get(&resolution.rest[0]).map(|m| m.ty.clone());
                }
                TSymbol::Variable(_) | TSymbol::Function(_) if resolution.rest.is_empty() => {
                    return resolution.symbol.value_type();
                }
                TSymbol::Variable(v) if !resolution.rest.is_empty() => {
                    return self.walk_fields(&v.ty, &resolution.rest);
                }
                _ => {}
            }
        }
        // Struct field / bitmap field on a locally-typed base.
        match self.type_of(base)? {
            TType::Struct(name) => self
                .table
                .struct_fields
                .get(&name)
                .and_then(|fields| fields.get(field))
                .map(|info| {
                    if info.dims.is_empty() {
                        info.ty.clone()
                    } else {
                        TType::Array {
                            element: Box::new(info.ty.clone()),
                            dims: info.dims.clone(),
                        }
                    }
                }),
            // Bitmap field reads are bit extractions.
            TType::Bitmap { .. } => None,
            _ => None,
        }
    }

    fn walk_fields(&self, start: &TType, rest: &[String]) -> Option<TType> {
        let mut current = start.clone();
        for segment in rest {
            match current {
                TType::Struct(name) => {
                    let info = self.table.struct_fields.get(&name)?.get(segment)?;
                    current = info.ty.clone();
                }
                _ => return None,
            }
        }
        Some(current)
    }

    /// Translation-time integer value of an expression, if known.
    pub fn const_value(&self, expr: &Expr) -> Option<i64> {
        match expr.unwrap_parens() {
            Expr::Int { value, .. } => i64::try_from(*value).ok(),
            Expr::Bool { value, .. } => Some(i64::from(*value)),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
                ..
            } => self.const_value(operand).map(|v| -v),
            Expr::Ident { name, .. } => {
                if let Some(value) = self.local_consts.get(name) {
                    return Some(*value);
                }
                if self.locals.contains_key(name) {
                    return None;
                }
                self.table.resolve_const(&self.scope, name)
            }
            expr @ Expr::Field { .. } => {
                let resolution = resolve_path(self.table, &self.scope, expr)?;
                match resolution.symbol {
                    TSymbol::Enum(e) if resolution.rest.len() == 1 => {
                        e.members.get(&resolution.rest[0]).copied()
                    }
                    TSymbol::Variable(v) if v.is_const && resolution.rest.is_empty() => {
                        v.const_value
                    }
                    _ => None,
                }
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let l = self.const_value(lhs)?;
                let r = self.const_value(rhs)?;
                match op {
                    BinaryOp::Add => l.checked_add(r),
                    BinaryOp::Sub => l.checked_sub(r),
                    BinaryOp::Mul => l.checked_mul(r),
                    BinaryOp::Div if r != 0 => Some(l / r),
                    BinaryOp::Mod if r != 0 => Some(l % r),
                    BinaryOp::Shl => Some(l << (r & 63)),
                    BinaryOp::Shr => Some(l >> (r & 63)),
                    BinaryOp::BitAnd => Some(l & r),
                    BinaryOp::BitOr => Some(l | r),
                    BinaryOp::BitXor => Some(l ^ r),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}
