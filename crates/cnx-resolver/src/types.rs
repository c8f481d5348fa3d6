//! The `TType` / `TSymbol` data model.
//!
//! Tagged variants, one record per symbol kind. References between
//! symbols are owning names resolved through the symbol table, never
//! pointers; the symbol graph therefore cannot cycle.

use cnx_common::Access;
use cnx_parser::ast::{OverflowMode, Primitive};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceLanguage {
    Cnx,
    C,
    Cpp,
}

/// An array dimension after collection: a resolved integer, or a symbolic
/// name (unresolved constant or C macro passthrough).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArrayDimension {
    Fixed(u64),
    Symbolic(String),
}

impl ArrayDimension {
    /// The C spelling of the dimension.
    pub fn c_text(&self) -> String {
        match self {
            ArrayDimension::Fixed(n) => n.to_string(),
            ArrayDimension::Symbolic(name) => name.clone(),
        }
    }
}

/// A type value.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TType {
    Primitive(Primitive),
    Struct(String),
    Enum(String),
    Bitmap { name: String, bit_width: u8 },
    Array {
        element: Box<TType>,
        dims: Vec<ArrayDimension>,
    },
    /// `string<N>`; compiles to `char[N+1]`.
    Str { capacity: u32 },
    /// Nominal function-pointer alias introduced by a function declaration.
    Callback(String),
    Register(String),
    /// Opaque passthrough: C++ templates, external classes.
    External(String),
}

impl TType {
    pub fn is_bool(&self) -> bool {
        matches!(self, TType::Primitive(Primitive::Bool))
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            TType::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    pub fn is_integer(&self) -> bool {
        self.as_primitive().is_some_and(Primitive::is_integer)
    }

    /// Display name for diagnostics, in CNX spelling.
    pub fn describe(&self) -> String {
        match self {
            TType::Primitive(p) => p.cnx_name().to_string(),
            TType::Struct(name)
            | TType::Enum(name)
            | TType::Callback(name)
            | TType::Register(name)
            | TType::External(name) => name.clone(),
            TType::Bitmap { name, .. } => name.clone(),
            TType::Array { element, .. } => format!("{}[]", element.describe()),
            TType::Str { capacity } => format!("string<{capacity}>"),
        }
    }
}

/// Fields shared by every symbol kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SymbolCommon {
    pub name: String,
    /// Enclosing scope chain, outermost first; empty means global.
    pub scope: Vec<String>,
    pub source_file: String,
    pub source_line: u32,
    pub language: SourceLanguage,
    pub is_exported: bool,
}

impl SymbolCommon {
    /// Underscore-joined qualified name; the global scope contributes
    /// nothing.
    pub fn mangled(&self) -> String {
        mangle(&self.scope, &self.name)
    }
}

/// Join a scope chain and a local name into the emitted identifier.
pub fn mangle(scope: &[String], name: &str) -> String {
    if scope.is_empty() {
        name.to_string()
    } else {
        format!("{}_{}", scope.join("_"), name)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ParamSymbol {
    pub name: String,
    pub ty: TType,
    pub is_const: bool,
    pub is_array: bool,
    /// Inferred: the parameter appears in no modification set.
    pub is_auto_const: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionSymbol {
    pub common: SymbolCommon,
    pub params: Vec<ParamSymbol>,
    pub return_type: TType,
    /// Set when the declaration conforms to another function's callback
    /// type (that callback's mangled name).
    pub callback_of: Option<String>,
    /// Some struct field or conforming function names this function as a
    /// type, so its `_fp` typedef must be emitted.
    pub used_as_callback: bool,
    pub is_isr: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VariableSymbol {
    pub common: SymbolCommon,
    pub ty: TType,
    pub is_const: bool,
    pub is_static: bool,
    pub is_extern: bool,
    pub is_atomic: bool,
    pub is_volatile: bool,
    pub overflow: OverflowMode,
    pub dims: Vec<ArrayDimension>,
    /// Known at translation time for `const` integer initializers.
    pub const_value: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldInfo {
    pub ty: TType,
    pub is_const: bool,
    pub is_atomic: bool,
    pub dims: Vec<ArrayDimension>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StructSymbol {
    pub common: SymbolCommon,
    pub fields: IndexMap<String, FieldInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumSymbol {
    pub common: SymbolCommon,
    pub members: IndexMap<String, i64>,
    /// Implicit width from the largest member value.
    pub bit_width: u8,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BitmapFieldInfo {
    /// LSB-first offset.
    pub offset: u8,
    pub width: u8,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BitmapSymbol {
    pub common: SymbolCommon,
    pub bit_width: u8,
    pub fields: IndexMap<String, BitmapFieldInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterMemberInfo {
    pub ty: TType,
    pub offset: u64,
    pub access: Access,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RegisterSymbol {
    pub common: SymbolCommon,
    pub base_address: u64,
    pub members: IndexMap<String, RegisterMemberInfo>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ScopeSymbol {
    pub common: SymbolCommon,
    pub members: Vec<String>,
}

/// A symbol: one record per kind, no common base.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum TSymbol {
    Function(FunctionSymbol),
    Variable(VariableSymbol),
    Struct(StructSymbol),
    Enum(EnumSymbol),
    Bitmap(BitmapSymbol),
    Register(RegisterSymbol),
    Scope(ScopeSymbol),
}

impl TSymbol {
    pub fn common(&self) -> &SymbolCommon {
        match self {
            TSymbol::Function(s) => &s.common,
            TSymbol::Variable(s) => &s.common,
            TSymbol::Struct(s) => &s.common,
            TSymbol::Enum(s) => &s.common,
            TSymbol::Bitmap(s) => &s.common,
            TSymbol::Register(s) => &s.common,
            TSymbol::Scope(s) => &s.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut SymbolCommon {
        match self {
            TSymbol::Function(s) => &mut s.common,
            TSymbol::Variable(s) => &mut s.common,
            TSymbol::Struct(s) => &mut s.common,
            TSymbol::Enum(s) => &mut s.common,
            TSymbol::Bitmap(s) => &mut s.common,
            TSymbol::Register(s) => &mut s.common,
            TSymbol::Scope(s) => &mut s.common,
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            TSymbol::Function(_) => "function",
            TSymbol::Variable(_) => "variable",
            TSymbol::Struct(_) => "struct",
            TSymbol::Enum(_) => "enum",
            TSymbol::Bitmap(_) => "bitmap",
            TSymbol::Register(_) => "register",
            TSymbol::Scope(_) => "scope",
        }
    }

    pub fn mangled(&self) -> String {
        self.common().mangled()
    }

    /// The type a use of this symbol denotes, when that makes sense.
    pub fn value_type(&self) -> Option<TType> {
        match self {
            TSymbol::Variable(v) => {
                if v.dims.is_empty() {
                    Some(v.ty.clone())
                } else {
                    Some(TType::Array {
                        element: Box::new(v.ty.clone()),
                        dims: v.dims.clone(),
                    })
                }
            }
            TSymbol::Function(f) => Some(f.return_type.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mangling_joins_scopes_with_underscores() {
        assert_eq!(mangle(&[], "setSpeed"), "setSpeed");
        assert_eq!(mangle(&["Motor".to_string()], "setSpeed"), "Motor_setSpeed");
        assert_eq!(
            mangle(&["Motor".to_string(), "Inner".to_string()], "x"),
            "Motor_Inner_x"
        );
    }

    #[test]
    fn array_dimension_text() {
        assert_eq!(ArrayDimension::Fixed(8).c_text(), "8");
        assert_eq!(
            ArrayDimension::Symbolic("BUFFER_SIZE".to_string()).c_text(),
            "BUFFER_SIZE"
        );
    }
}
