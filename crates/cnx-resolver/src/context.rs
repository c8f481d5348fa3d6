//! The per-job translation context.
//!
//! One value threaded through every stage: the symbol table, the
//! modification map, captured include directives, the external-type
//! header mapping, and the monotone C++-required flag. No process-wide
//! singletons; two jobs in one process never share state.

use cnx_common::{OutputLanguage, TargetChip};
use cnx_parser::ast::IncludeDirective;
use rustc_hash::FxHashMap;

use crate::modmap::ModificationMap;
use crate::table::SymbolTable;

#[derive(Debug, Default)]
pub struct TranslationContext {
    pub symbols: SymbolTable,
    pub modifications: ModificationMap,
    /// CNX file path -> the `#include` directives it carried, verbatim.
    pub include_directives: FxHashMap<String, Vec<IncludeDirective>>,
    /// External type name -> the literal `#include` that defines it.
    pub type_headers: FxHashMap<String, String>,
    pub target: TargetChip,
    pub debug: bool,
    cpp_required: bool,
}

impl TranslationContext {
    pub fn new(target: TargetChip, debug: bool) -> Self {
        TranslationContext {
            target,
            debug,
            ..Default::default()
        }
    }

    /// Raise the C++-required flag. Monotone: there is no way back.
    pub fn require_cpp(&mut self) {
        self.cpp_required = true;
    }

    pub fn cpp_required(&self) -> bool {
        self.cpp_required
    }

    pub fn output_language(&self) -> OutputLanguage {
        if self.cpp_required {
            OutputLanguage::Cpp
        } else {
            OutputLanguage::C
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpp_flag_is_monotone() {
        let mut ctx = TranslationContext::default();
        assert_eq!(ctx.output_language(), OutputLanguage::C);
        ctx.require_cpp();
        ctx.require_cpp();
        assert!(ctx.cpp_required());
        assert_eq!(ctx.output_language(), OutputLanguage::Cpp);
    }
}
