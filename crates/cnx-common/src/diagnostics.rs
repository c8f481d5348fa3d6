//! Diagnostics and the closed E-code registry.
//!
//! Every diagnostic the core emits carries a code from the registry in
//! `data.rs`. Codes are grouped in bands: E02xx naming, E03xx struct
//! fields, E04xx resolution, E05xx preprocessor, E06xx sizeof, E07xx
//! control flow, E08xx arithmetic & arrays, E09xx null safety.

pub mod data;

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCategory {
    Warning,
    Error,
}

impl DiagnosticCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            DiagnosticCategory::Warning => "warning",
            DiagnosticCategory::Error => "error",
        }
    }
}

/// A registry entry binding a code to its message template.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticMessage {
    pub code: u32,
    pub category: DiagnosticCategory,
    pub message: &'static str,
}

pub mod diagnostic_codes {
    pub use super::data::diagnostic_codes::*;
}

/// A single diagnostic, positioned by 1-based line/column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub code: u32,
    pub file: String,
    pub line: u32,
    pub column: u32,
    pub message: String,
}

impl Diagnostic {
    pub fn error(
        file: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
        code: u32,
    ) -> Self {
        Self {
            category: DiagnosticCategory::Error,
            code,
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn warning(
        file: impl Into<String>,
        line: u32,
        column: u32,
        message: impl Into<String>,
        code: u32,
    ) -> Self {
        Self {
            category: DiagnosticCategory::Warning,
            code,
            file: file.into(),
            line,
            column,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.category == DiagnosticCategory::Error
    }

    /// The printed form of the code, e.g. `E0803`.
    pub fn code_str(&self) -> String {
        format!("E{:04}", self.code)
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}: {} [{}]",
            self.file,
            self.line,
            self.column,
            self.category.as_str(),
            self.message,
            self.code_str()
        )
    }
}

/// Look up a registered message template by code.
pub fn get_message_template(code: u32) -> Option<&'static str> {
    use self::data::DIAGNOSTIC_MESSAGES;
    DIAGNOSTIC_MESSAGES
        .iter()
        .find(|m| m.code == code)
        .map(|m| m.message)
}

/// The registered category for a code. Unregistered codes default to Error.
pub fn get_category(code: u32) -> DiagnosticCategory {
    use self::data::DIAGNOSTIC_MESSAGES;
    DIAGNOSTIC_MESSAGES
        .iter()
        .find(|m| m.code == code)
        .map_or(DiagnosticCategory::Error, |m| m.category)
}

/// Substitute `{0}`, `{1}`, ... placeholders in a message template.
pub fn format_message(message: &str, args: &[&str]) -> String {
    let mut result = message.to_string();
    for (i, arg) in args.iter().enumerate() {
        result = result.replace(&format!("{{{i}}}"), arg);
    }
    result
}

/// Format the registered template for `code` with `args`.
///
/// Falls back to the bare code if the template is missing, which would
/// indicate a registry gap.
pub fn message(code: u32, args: &[&str]) -> String {
    match get_message_template(code) {
        Some(template) => format_message(template, args),
        None => format!("E{code:04}"),
    }
}
