//! The per-job symbol table.
//!
//! Three partitions (CNX, C, C++) keyed by mangled name, in insertion
//! order so every downstream walk is deterministic. A name may carry more
//! than one symbol; stage 4 classifies whether that is legal.
//!
//! The table also caches struct field maps, the "needs `struct` keyword"
//! predicate, enum bit widths, opaque type names and typedef-to-tag
//! aliases collected from headers.

use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::types::{
    FieldInfo, FunctionSymbol, SourceLanguage, TSymbol, TType, mangle,
};

#[derive(Debug, Default)]
pub struct SymbolTable {
    cnx: IndexMap<String, Vec<TSymbol>>,
    c: IndexMap<String, Vec<TSymbol>>,
    cpp: IndexMap<String, Vec<TSymbol>>,

    /// Struct field maps by struct name (CNX and header structs alike).
    pub struct_fields: FxHashMap<String, IndexMap<String, FieldInfo>>,
    /// C structs that need the `struct` keyword at use sites.
    pub needs_struct_keyword: FxHashSet<String>,
    /// Enum bit widths for sizing.
    pub enum_widths: FxHashMap<String, u8>,
    /// Forward-declared (opaque) struct names.
    pub opaque_types: FxHashSet<String>,
    /// typedef name -> underlying tag.
    pub typedef_tags: FxHashMap<String, String>,
    /// typedef name -> resolved type, when the underlying is understood.
    pub type_aliases: FxHashMap<String, TType>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    fn partition(&self, language: SourceLanguage) -> &IndexMap<String, Vec<TSymbol>> {
        match language {
            SourceLanguage::Cnx => &self.cnx,
            SourceLanguage::C => &self.c,
            SourceLanguage::Cpp => &self.cpp,
        }
    }

    pub fn insert(&mut self, symbol: TSymbol) {
        let key = symbol.mangled();
        let partition = match symbol.common().language {
            SourceLanguage::Cnx => &mut self.cnx,
            SourceLanguage::C => &mut self.c,
            SourceLanguage::Cpp => &mut self.cpp,
        };
        partition.entry(key).or_default().push(symbol);
    }

    /// First CNX symbol registered under a mangled name.
    pub fn get_cnx(&self, mangled: &str) -> Option<&TSymbol> {
        self.cnx.get(mangled).and_then(|v| v.first())
    }

    /// Every CNX symbol registered under a mangled name.
    pub fn all_cnx(&self, mangled: &str) -> &[TSymbol] {
        self.cnx.get(mangled).map_or(&[], |v| v.as_slice())
    }

    /// A header symbol by plain name; C wins over C++ on a tie.
    pub fn get_foreign(&self, name: &str) -> Option<&TSymbol> {
        self.c
            .get(name)
            .or_else(|| self.cpp.get(name))
            .and_then(|v| v.first())
    }

    pub fn cnx_names(&self) -> impl Iterator<Item = &String> {
        self.cnx.keys()
    }

    /// All CNX symbols in insertion order.
    pub fn cnx_symbols(&self) -> impl Iterator<Item = &TSymbol> {
        self.cnx.values().flatten()
    }

    pub fn foreign_symbols(&self) -> impl Iterator<Item = &TSymbol> {
        self.c.values().flatten().chain(self.cpp.values().flatten())
    }

    pub fn for_each_cnx_mut(&mut self, mut f: impl FnMut(&mut TSymbol)) {
        for symbols in self.cnx.values_mut() {
            for symbol in symbols {
                f(symbol);
            }
        }
    }

    /// Resolve an unqualified name from inside a scope chain:
    /// local -> enclosing scope(s) -> global, then the header partitions.
    /// Returns the winning mangled key and the symbol.
    pub fn resolve(&self, scope: &[String], name: &str) -> Option<(String, &TSymbol)> {
        for depth in (0..=scope.len()).rev() {
            let key = mangle(&scope[..depth], name);
            if let Some(symbol) = self.get_cnx(&key) {
                return Some((key, symbol));
            }
        }
        self.get_foreign(name)
            .map(|symbol| (name.to_string(), symbol))
    }

    /// Resolve and read a const integer value, if the name resolves to a
    /// const variable whose value is known.
    pub fn resolve_const(&self, scope: &[String], name: &str) -> Option<i64> {
        match self.resolve(scope, name)? {
            (_, TSymbol::Variable(v)) if v.is_const => v.const_value,
            _ => None,
        }
    }

    /// Look up a member of a resolved enum.
    pub fn enum_member(&self, enum_mangled: &str, member: &str) -> Option<i64> {
        match self.get_cnx(enum_mangled) {
            Some(TSymbol::Enum(e)) => e.members.get(member).copied(),
            _ => match self.get_foreign(enum_mangled) {
                Some(TSymbol::Enum(e)) => e.members.get(member).copied(),
                _ => None,
            },
        }
    }

    /// Functions declared in a given file, with their source lines.
    pub fn functions_in_file<'a>(&'a self, file: &str) -> Vec<&'a FunctionSymbol> {
        self.cnx
            .values()
            .flatten()
            .filter_map(|symbol| match symbol {
                TSymbol::Function(f) if f.common.source_file == file => Some(f),
                _ => None,
            })
            .collect()
    }

    /// Flip the `used_as_callback` flag on a function symbol.
    pub fn mark_used_as_callback(&mut self, mangled: &str) {
        if let Some(symbols) = self.cnx.get_mut(mangled) {
            for symbol in symbols {
                if let TSymbol::Function(f) = symbol {
                    f.used_as_callback = true;
                }
            }
        }
    }

    /// Stage 5 auto-const refinement: set the inferred flag on one
    /// parameter of one function.
    pub fn set_auto_const(&mut self, fn_mangled: &str, param: &str, value: bool) {
        if let Some(symbols) = self.cnx.get_mut(fn_mangled) {
            for symbol in symbols {
                if let TSymbol::Function(f) = symbol {
                    for p in &mut f.params {
                        if p.name == param {
                            p.is_auto_const = value;
                        }
                    }
                }
            }
        }
    }

    /// Whether a name is known in any partition (used by conflict
    /// detection and tests).
    pub fn contains(&self, name: &str) -> bool {
        self.cnx.contains_key(name) || self.c.contains_key(name) || self.cpp.contains_key(name)
    }

    /// Names in the C/C++ partitions that collide with a CNX mangled name.
    pub fn foreign_collision(&self, mangled: &str) -> Option<&TSymbol> {
        for language in [SourceLanguage::C, SourceLanguage::Cpp] {
            if let Some(symbol) = self.partition(language).get(mangled).and_then(|v| v.first()) {
                return Some(symbol);
            }
        }
        None
    }
}
