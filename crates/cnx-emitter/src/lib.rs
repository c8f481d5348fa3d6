//! C/C++ code generation for the cnext translator.
//!
//! - `codegen` - stage 5 body generation (comment replay, mangling,
//!   operator translation, the lowerings)
//! - `header` - stage 6 companion headers
//! - `helpers` - the shared `cnx_helpers.h` overflow-helper header
//! - `writer` - indent-aware text building

pub mod codegen;
pub mod header;
pub mod helpers;
pub mod writer;

pub use codegen::{EmitOptions, GeneratedFile, generate_unit};
pub use helpers::{HELPERS_FILE_NAME, helpers_header};
