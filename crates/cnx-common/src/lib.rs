//! Common types and utilities for the cnext translator.
//!
//! This crate provides foundational types used across all cnx crates:
//! - Shared enums (`OutputLanguage`, `TargetChip`, `Access`)
//! - Source spans (`Span`, `Spanned`)
//! - Position/LineMap types for line/column source locations
//! - Diagnostics and the E-code registry
//! - Comment range utilities

// Common types - shared constants to break circular dependencies
pub mod common;
pub use common::{Access, OutputLanguage, TargetChip};

// Span - source location tracking (byte offsets)
pub mod span;
pub use span::{Span, Spanned};

// Position/LineMap types for line/column source locations
pub mod position;
pub use position::{LineMap, Position};

// Diagnostics and the error-code registry
pub mod diagnostics;
pub use diagnostics::{Diagnostic, DiagnosticCategory};

// Comment range utilities
pub mod comments;
