//! Comment ranges and Doxygen rewriting.
//!
//! Comments are not part of the AST; the scanner produces them as trivia
//! tokens and the emitter replays them into the output at their original
//! relative positions. `///` doc comments are rewritten to Doxygen
//! `/** ... */` blocks during emission.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommentKind {
    /// `// ...`
    Line,
    /// `/* ... */`
    Block,
    /// `/// ...`
    Doc,
}

/// A comment in the source text.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentRange {
    /// Start byte offset
    pub pos: u32,
    /// End byte offset (exclusive)
    pub end: u32,
    pub kind: CommentKind,
}

impl CommentRange {
    pub fn new(pos: u32, end: u32, kind: CommentKind) -> Self {
        CommentRange { pos, end, kind }
    }

    /// Get the comment text from source.
    pub fn get_text<'a>(&self, source: &'a str) -> &'a str {
        let start = self.pos as usize;
        let end = self.end as usize;
        if end <= source.len() && start < end {
            &source[start..end]
        } else {
            ""
        }
    }
}

/// Whether a block comment body contains a nested `/*`.
///
/// The opening delimiter itself is skipped; `/* a /* b */` reports true.
pub fn has_nested_block(text: &str) -> bool {
    if !text.starts_with("/*") {
        return false;
    }
    let inner = &text[2..];
    let inner = inner.strip_suffix("*/").unwrap_or(inner);
    inner.contains("/*")
}

/// Whether a line comment ends with a backslash line-continuation.
pub fn has_line_continuation(text: &str) -> bool {
    text.starts_with("//") && text.trim_end_matches(['\r', '\n']).ends_with('\\')
}

/// Strip the `///` prefix from a doc comment line.
pub fn doc_content(line: &str) -> &str {
    line.strip_prefix("///")
        .map(|rest| rest.strip_prefix(' ').unwrap_or(rest))
        .unwrap_or(line)
}

/// Render a run of `///` lines as one Doxygen block.
///
/// ```text
/// /// Sets the speed.     =>   /**
/// /// Clamped to 0..=255.  *    * Sets the speed.
///                               * Clamped to 0..=255.
///                               */
/// ```
pub fn doxygen_block(lines: &[&str], indent: &str) -> String {
    let mut out = String::new();
    out.push_str(indent);
    out.push_str("/**\n");
    for line in lines {
        out.push_str(indent);
        out.push_str(" * ");
        out.push_str(doc_content(line));
        out.push('\n');
    }
    out.push_str(indent);
    out.push_str(" */");
    out
}
