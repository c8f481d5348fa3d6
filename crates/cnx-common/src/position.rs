//! Position utilities.
//!
//! Diagnostics are reported as 1-based line/column pairs, while spans use
//! byte offsets. `LineMap` converts between the two.

use serde::{Deserialize, Serialize};

/// A 1-based position in a source file, as printed in diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 1-indexed line number
    pub line: u32,
    /// 1-indexed column (bytes from the start of the line)
    pub column: u32,
}

impl Position {
    #[must_use]
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Line map for efficient offset -> line/column conversion.
/// Stores the starting offset of each line.
#[derive(Debug, Clone)]
pub struct LineMap {
    /// Starting offset of each line (`line_starts[0]` is always 0)
    line_starts: Vec<u32>,
}

impl LineMap {
    /// Build a line map from source text.
    #[must_use]
    pub fn build(source: &str) -> Self {
        let mut line_starts = vec![0u32];
        for idx in memchr::memchr_iter(b'\n', source.as_bytes()) {
            line_starts.push(u32::try_from(idx + 1).unwrap_or(u32::MAX));
        }
        Self { line_starts }
    }

    /// Convert a byte offset to a 1-based Position.
    #[must_use]
    pub fn position(&self, offset: u32) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(exact) => exact,
            Err(insert_point) => insert_point.saturating_sub(1),
        };
        let line_start = self.line_starts.get(line).copied().unwrap_or(0);
        Position {
            line: u32::try_from(line + 1).unwrap_or(u32::MAX),
            column: offset.saturating_sub(line_start) + 1,
        }
    }

    /// The 1-based line containing a byte offset.
    #[must_use]
    pub fn line_of(&self, offset: u32) -> u32 {
        self.position(offset).line
    }

    /// Get the number of lines.
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Get the starting offset of a 0-based line index.
    #[must_use]
    pub fn line_start(&self, line: usize) -> Option<u32> {
        self.line_starts.get(line).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let map = LineMap::build("hello");
        assert_eq!(map.line_count(), 1);
        assert_eq!(map.position(0), Position::new(1, 1));
        assert_eq!(map.position(4), Position::new(1, 5));
    }

    #[test]
    fn multi_line() {
        let map = LineMap::build("ab\ncd\nef");
        assert_eq!(map.line_count(), 3);
        assert_eq!(map.position(0), Position::new(1, 1));
        assert_eq!(map.position(3), Position::new(2, 1));
        assert_eq!(map.position(4), Position::new(2, 2));
        assert_eq!(map.position(6), Position::new(3, 1));
    }

    #[test]
    fn offset_on_newline_belongs_to_its_line() {
        let map = LineMap::build("ab\ncd");
        assert_eq!(map.position(2), Position::new(1, 3));
    }
}
