//! Cursor and position tracking
//!
//! [`CursorState`] is the lexer's complete position: byte offset, line,
//! column and the offset where the current line starts. It is a plain `Copy`
//! value, so a snapshot taken before a speculative scan can always be
//! restored, independent of any other snapshot still held elsewhere.

use std::fmt;

use serde::Serialize;

/// A position in the input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SourcePosition {
    /// Byte offset from start of the lexer's buffer
    pub offset: usize,
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based, UTF-8 aware)
    pub column: usize,
}

impl SourcePosition {
    /// Create a new source position
    #[inline]
    pub fn new(offset: usize, line: usize, column: usize) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }

    /// Position at the start of input
    #[inline]
    pub fn start() -> Self {
        Self::new(0, 1, 1)
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

impl Default for SourcePosition {
    fn default() -> Self {
        Self::start()
    }
}

/// Snapshot of the lexer cursor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CursorState {
    /// Byte offset into the buffer
    pub offset: usize,
    /// Current line (1-based)
    pub line: usize,
    /// Current column (1-based, in chars)
    pub column: usize,
    /// Byte offset where the current line starts
    pub line_start: usize,
}

impl CursorState {
    /// Cursor at the start of a buffer whose first line is `line`
    #[inline]
    pub fn at_line(line: usize) -> Self {
        Self {
            offset: 0,
            line,
            column: 1,
            line_start: 0,
        }
    }

    /// The position this cursor points at
    #[inline]
    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.offset, self.line, self.column)
    }

    /// Whether the cursor sits in the first column of its line
    #[inline]
    pub fn at_line_start(&self) -> bool {
        self.offset == self.line_start
    }

    /// Advance over `bytes` of non-newline content holding `chars` characters
    #[inline]
    pub(crate) fn advance(&mut self, bytes: usize, chars: usize) {
        self.offset += bytes;
        self.column += chars;
    }

    /// Advance over a line terminator of `len` bytes
    #[inline]
    pub(crate) fn newline(&mut self, len: usize) {
        self.offset += len;
        self.line += 1;
        self.column = 1;
        self.line_start = self.offset;
    }
}

impl Default for CursorState {
    fn default() -> Self {
        Self::at_line(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cursor_newline_resets_column() {
        let mut cursor = CursorState::default();
        cursor.advance(3, 3);
        assert_eq!(cursor.column, 4);
        assert!(!cursor.at_line_start());
        cursor.newline(2);
        assert_eq!(cursor.offset, 5);
        assert_eq!(cursor.line, 2);
        assert_eq!(cursor.column, 1);
        assert!(cursor.at_line_start());
    }

    #[test]
    fn test_snapshot_is_independent() {
        let mut cursor = CursorState::at_line(10);
        let saved = cursor;
        cursor.advance(4, 4);
        cursor.newline(1);
        assert_eq!(saved.line, 10);
        assert_eq!(saved.offset, 0);
        assert_eq!(cursor.line, 11);
    }

    #[test]
    fn test_display() {
        assert_eq!(SourcePosition::new(5, 2, 3).to_string(), "line 2, column 3");
    }
}
