//! Symbol model and resolution stages for the cnext translator.
//!
//! - `types` - the `TType`/`TSymbol` tagged variants
//! - `table` - the three-partition per-job symbol table and its caches
//! - `collect` - stage 3: CNX symbol collection through per-kind collectors
//! - `headers` - stage 2: C/C++ header symbols into the table
//! - `external` - stage 3b: cross-file array-dimension resolution
//! - `conflicts` - stage 4: collision classification
//! - `modmap` - the cross-file parameter-modification map
//! - `typing` - expression typing and const evaluation
//! - `context` - the per-job translation context threading it all

pub mod collect;
pub mod conflicts;
pub mod context;
pub mod external;
pub mod headers;
pub mod modmap;
pub mod table;
pub mod typing;
pub mod types;

pub use context::TranslationContext;
pub use modmap::ModificationMap;
pub use table::SymbolTable;
pub use types::{ArrayDimension, SourceLanguage, TSymbol, TType};
