//! Stage 3: CNX symbol collection.
//!
//! The resolver is a pipeline of collectors, one per symbol kind. They
//! share a `CollectCtx` that builds the `TSymbol`, anchors it to a scope
//! and hands it to the central registrar. New symbol kinds plug in by
//! adding a collector to the list, not by editing a switch.

use cnx_common::LineMap;
use cnx_common::Span;
use cnx_common::diagnostics::{Diagnostic, diagnostic_codes, message};
use cnx_parser::ast::*;
use indexmap::IndexMap;

use crate::table::SymbolTable;
use crate::types::*;

/// Collect every symbol of one parsed unit into the table. Returned
/// diagnostics with error severity abort the file before codegen.
pub fn collect_unit(
    unit: &SourceUnit,
    source: &str,
    table: &mut SymbolTable,
) -> Vec<Diagnostic> {
    let line_map = LineMap::build(source);
    let mut ctx = CollectCtx {
        table,
        file: &unit.path,
        line_map: &line_map,
        scope: Vec::new(),
        diagnostics: Vec::new(),
    };
    collect_items(&unit.items, &mut ctx);
    ctx.diagnostics
}

fn collect_items(items: &[Item], ctx: &mut CollectCtx<'_>) {
    let collectors: &[&dyn Collector] = &[
        &ScopeCollector,
        &FunctionCollector,
        &VariableCollector,
        &StructCollector,
        &EnumCollector,
        &BitmapCollector,
        &RegisterCollector,
    ];
    for item in items {
        for collector in collectors {
            if collector.collect(item, ctx) {
                break;
            }
        }
        if let Item::Scope(scope) = item {
            ctx.scope.push(scope.name.name.clone());
            collect_items(&scope.items, ctx);
            ctx.scope.pop();
        }
    }
}

/// One symbol kind's collector.
trait Collector {
    /// Claim and collect the item; return false to let the next collector
    /// look at it.
    fn collect(&self, item: &Item, ctx: &mut CollectCtx<'_>) -> bool;
}

/// Shared builder + registrar state.
pub struct CollectCtx<'a> {
    pub table: &'a mut SymbolTable,
    pub file: &'a str,
    pub line_map: &'a LineMap,
    pub scope: Vec<String>,
    pub diagnostics: Vec<Diagnostic>,
}

impl<'a> CollectCtx<'a> {
    fn line(&self, span: Span) -> u32 {
        self.line_map.line_of(span.start)
    }

    /// Builder: the common fields, anchored to the current scope.
    fn common(&self, name: &Ident, is_exported: bool) -> SymbolCommon {
        SymbolCommon {
            name: name.name.clone(),
            scope: self.scope.clone(),
            source_file: self.file.to_string(),
            source_line: self.line(name.span),
            language: SourceLanguage::Cnx,
            is_exported,
        }
    }

    /// Central registrar.
    fn register(&mut self, symbol: TSymbol) {
        self.table.insert(symbol);
    }

    fn error(&mut self, span: Span, code: u32, args: &[&str]) {
        let pos = self.line_map.position(span.start);
        self.diagnostics.push(Diagnostic::error(
            self.file,
            pos.line,
            pos.column,
            message(code, args),
            code,
        ));
    }

    /// Turn a written type into a `TType`, resolving names through the
    /// table. Unknown names become opaque externals (C++ templates and
    /// classes pass through untouched).
    pub fn resolve_type(&self, ty: &TypeExpr) -> TType {
        match ty {
            TypeExpr::Primitive(p) => TType::Primitive(*p),
            TypeExpr::String { capacity } => TType::Str {
                capacity: *capacity,
            },
            TypeExpr::Named(name) => self.resolve_named_type(name),
        }
    }

    fn resolve_named_type(&self, name: &str) -> TType {
        if let Some((key, symbol)) = self.table.resolve(&self.scope, name) {
            match symbol {
                TSymbol::Struct(_) => return TType::Struct(key),
                TSymbol::Enum(_) => return TType::Enum(key),
                TSymbol::Bitmap(b) => {
                    return TType::Bitmap {
                        name: key,
                        bit_width: b.bit_width,
                    };
                }
                TSymbol::Register(_) => return TType::Register(key),
                TSymbol::Function(_) => return TType::Callback(key),
                _ => {}
            }
        }
        if let Some(aliased) = self.table.type_aliases.get(name) {
            return aliased.clone();
        }
        TType::External(name.to_string())
    }

    fn resolve_dims(&self, dims: &[Dimension]) -> Vec<ArrayDimension> {
        dims.iter()
            .map(|dim| match dim {
                Dimension::Literal(n) => ArrayDimension::Fixed(*n),
                Dimension::Named(name) => ArrayDimension::Symbolic(name.clone()),
                Dimension::Scoped(segments) => ArrayDimension::Symbolic(segments.join("_")),
            })
            .collect()
    }

    /// Translation-time evaluation of const integer expressions.
    fn eval_const(&self, expr: &Expr) -> Option<i64> {
        match expr.unwrap_parens() {
            Expr::Int { value, .. } => i64::try_from(*value).ok(),
            Expr::Unary {
                op: UnaryOp::Neg,
                operand,
                ..
            } => self.eval_const(operand).map(|v| -v),
            Expr::Ident { name, .. } => self.table.resolve_const(&self.scope, name),
            Expr::Field { base, name, .. } => {
                let path = base.as_path()?;
                if path.len() == 1 {
                    let (key, _) = self.table.resolve(&self.scope, path[0])?;
                    self.table.enum_member(&key, &name.name)
                } else {
                    None
                }
            }
            Expr::Binary { op, lhs, rhs, .. } => {
                let l = self.eval_const(lhs)?;
                let r = self.eval_const(rhs)?;
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

struct ScopeCollector;

impl Collector for ScopeCollector {
    fn collect(&self, item: &Item, ctx: &mut CollectCtx<'_>) -> bool {
        let Item::Scope(decl) = item else {
            return false;
        };
        let members = decl
            .items
            .iter()
            .filter_map(|item| match item {
                Item::Scope(d) => Some(d.name.name.clone()),
                Item::Function(d) => Some(d.name.name.clone()),
                Item::Variable(d) => Some(d.name.name.clone()),
                Item::Struct(d) => Some(d.name.name.clone()),
                Item::Enum(d) => Some(d.name.name.clone()),
                Item::Bitmap(d) => Some(d.name.name.clone()),
                Item::Register(d) => Some(d.name.name.clone()),
            })
            .collect();
        let symbol = TSymbol::Scope(ScopeSymbol {
            common: ctx.common(&decl.name, true),
            members,
        });
        ctx.register(symbol);
        true
    }
}

struct FunctionCollector;

impl Collector for FunctionCollector {
    fn collect(&self, item: &Item, ctx: &mut CollectCtx<'_>) -> bool {
        let Item::Function(decl) = item else {
            return false;
        };
        let params: Vec<ParamSymbol> = decl
            .params
            .iter()
            .map(|p| ParamSymbol {
                name: p.name.name.clone(),
                ty: ctx.resolve_type(&p.ty),
                is_const: p.is_const,
                is_array: p.is_array,
                is_auto_const: false,
            })
            .collect();

        let mut return_type = ctx.resolve_type(&decl.return_type);
        let mut callback_of = None;
        if let TType::Callback(callback_key) = &return_type {
            // Conforming to another function's callback type: same
            // parameter list, and the callback's own return type.
            let callback_key = callback_key.clone();
            let callback_shape = match ctx.table.get_cnx(&callback_key) {
                Some(TSymbol::Function(cb)) => {
                    Some((cb.params.clone(), cb.return_type.clone()))
                }
                _ => None,
            };
            if let Some((cb_params, cb_return)) = callback_shape {
                let matches = cb_params.len() == params.len()
                    && cb_params
                        .iter()
                        .zip(&params)
                        .all(|(a, b)| a.ty == b.ty && a.is_array == b.is_array);
                if matches {
                    return_type = cb_return;
                    callback_of = Some(callback_key.clone());
                    ctx.table.mark_used_as_callback(&callback_key);
                } else {
                    let name = decl.name.name.clone();
                    ctx.error(
                        decl.name.span,
                        diagnostic_codes::CALLBACK_SIGNATURE_MISMATCH,
                        &[&name, &callback_key],
                    );
                }
            }
        }

        let symbol = TSymbol::Function(FunctionSymbol {
            common: ctx.common(&decl.name, decl.is_exported),
            params,
            return_type,
            callback_of,
            used_as_callback: false,
            is_isr: decl.is_isr,
        });
        ctx.register(symbol);
        true
    }
}

struct VariableCollector;

impl Collector for VariableCollector {
    fn collect(&self, item: &Item, ctx: &mut CollectCtx<'_>) -> bool {
        let Item::Variable(decl) = item else {
            return false;
        };
        let const_value = if decl.quals.is_const {
            decl.init.as_ref().and_then(|init| ctx.eval_const(init))
        } else {
            None
        };
        let symbol = TSymbol::Variable(VariableSymbol {
            common: ctx.common(&decl.name, decl.quals.is_exported),
            ty: ctx.resolve_type(&decl.ty),
            is_const: decl.quals.is_const,
            is_static: decl.quals.is_static,
            is_extern: decl.quals.is_extern,
            is_atomic: decl.quals.is_atomic,
            is_volatile: decl.quals.is_volatile,
            overflow: decl.quals.overflow.unwrap_or_default(),
            dims: ctx.resolve_dims(&decl.dims),
            const_value,
        });
        ctx.register(symbol);
        true
    }
}

struct StructCollector;

impl Collector for StructCollector {
    fn collect(&self, item: &Item, ctx: &mut CollectCtx<'_>) -> bool {
        let Item::Struct(decl) = item else {
            return false;
        };
        let mut fields = IndexMap::new();
        for field in &decl.fields {
            let ty = ctx.resolve_type(&field.ty);
            if let TType::Callback(callback_key) = &ty {
                let key = callback_key.clone();
                ctx.table.mark_used_as_callback(&key);
            }
            fields.insert(
                field.name.name.clone(),
                FieldInfo {
                    ty,
                    is_const: field.is_const,
                    is_atomic: field.is_atomic,
                    dims: ctx.resolve_dims(&field.dims),
                },
            );
        }
        let common = ctx.common(&decl.name, true);
        let mangled = common.mangled();
        ctx.table.struct_fields.insert(mangled, fields.clone());
        ctx.register(TSymbol::Struct(StructSymbol { common, fields }));
        true
    }
}

struct EnumCollector;

impl Collector for EnumCollector {
    fn collect(&self, item: &Item, ctx: &mut CollectCtx<'_>) -> bool {
        let Item::Enum(decl) = item else {
            return false;
        };
        let mut members = IndexMap::new();
        let mut next = 0i64;
        for member in &decl.members {
            let value = member.value.unwrap_or(next);
            members.insert(member.name.name.clone(), value);
            next = value + 1;
        }
        let bit_width = enum_bit_width(members.values().copied());
        let common = ctx.common(&decl.name, true);
        ctx.table.enum_widths.insert(common.mangled(), bit_width);
        ctx.register(TSymbol::Enum(EnumSymbol {
            common,
            members,
            bit_width,
        }));
        true
    }
}

/// The implicit width an enum's values require.
pub fn enum_bit_width(values: impl Iterator<Item = i64>) -> u8 {
    let max = values.map(i64::unsigned_abs).max().unwrap_or(0);
    if max <= 0xFF {
        8
    } else if max <= 0xFFFF {
        16
    } else {
        32
    }
}

struct BitmapCollector;

impl Collector for BitmapCollector {
    fn collect(&self, item: &Item, ctx: &mut CollectCtx<'_>) -> bool {
        let Item::Bitmap(decl) = item else {
            return false;
        };
        let mut fields = IndexMap::new();
        let mut offset: u32 = 0;
        for field in &decl.fields {
            fields.insert(
                field.name.name.clone(),
                BitmapFieldInfo {
                    offset: u8::try_from(offset.min(255)).unwrap_or(u8::MAX),
                    width: field.width,
                },
            );
            offset += u32::from(field.width);
        }
        if offset != u32::from(decl.bit_width) {
            let name = decl.name.name.clone();
            let declared = decl.bit_width.to_string();
            let covered = offset.to_string();
            ctx.error(
                decl.name.span,
                diagnostic_codes::BITMAP_WIDTH_MISMATCH,
                &[&name, &declared, &covered],
            );
        }
        ctx.register(TSymbol::Bitmap(BitmapSymbol {
            common: ctx.common(&decl.name, true),
            bit_width: decl.bit_width,
            fields,
        }));
        true
    }
}

struct RegisterCollector;

impl Collector for RegisterCollector {
    fn collect(&self, item: &Item, ctx: &mut CollectCtx<'_>) -> bool {
        let Item::Register(decl) = item else {
            return false;
        };
        let mut members = IndexMap::new();
        for member in &decl.members {
            members.insert(
                member.name.name.clone(),
                RegisterMemberInfo {
                    ty: ctx.resolve_type(&member.ty),
                    offset: member.offset,
                    access: member.access,
                },
            );
        }
        ctx.register(TSymbol::Register(RegisterSymbol {
            common: ctx.common(&decl.name, true),
            base_address: decl.base_address,
            members,
        }));
        true
    }
}

#[cfg(test)]
#[path = "tests/collect_tests.rs"]
mod tests;
