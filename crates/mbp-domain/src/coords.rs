//! Source coordinate mapping.
//!
//! Tree walks and AST libraries report `(line, column)` positions while the
//! chunk model carries byte offsets. [`SourceCoordinates`] precomputes, for
//! each line of an in-memory source, its cumulative character and byte
//! offsets so both conversions are cheap and correct on multi-byte UTF-8,
//! CR/LF endings and a final line without a newline.

use serde::{Deserialize, Serialize};

/// A 1-based line/column position in a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Position {
    /// 1-based line number
    pub line: u32,
    /// 1-based column number, in characters
    pub column: u32,
}

impl Position {
    /// Create a position
    pub fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

/// Precomputed line/offset table for one source string.
///
/// Out-of-range positions are clamped to the nearest valid line and column
/// rather than rejected; inverse lookups clamp to the last line.
#[derive(Debug, Clone)]
pub struct SourceCoordinates {
    /// Char offset of the first character of each line
    line_char_starts: Vec<usize>,
    /// Byte offset of the first character of each line
    line_byte_starts: Vec<usize>,
    /// Characters per line, excluding the line terminator (and a CR before LF)
    line_char_lens: Vec<usize>,
    /// Byte offset of every char index; last entry is the total byte size
    char_byte_offsets: Vec<usize>,
    total_chars: usize,
    total_bytes: usize,
}

impl SourceCoordinates {
    /// Build the table from a source string.
    pub fn new(source: &str) -> Self {
        let mut line_char_starts = vec![0];
        let mut line_byte_starts = vec![0];
        let mut line_char_lens = Vec::new();
        let mut char_byte_offsets = Vec::new();

        let mut chars_in_line = 0usize;
        let mut prev_was_cr = false;
        let mut char_count = 0usize;

        for (byte_idx, ch) in source.char_indices() {
            char_byte_offsets.push(byte_idx);
            char_count += 1;
            if ch == '\n' {
                // The CR of a CRLF pair is a terminator, not line content
                let visible = if prev_was_cr {
                    chars_in_line - 1
                } else {
                    chars_in_line
                };
                line_char_lens.push(visible);
                line_char_starts.push(char_count);
                line_byte_starts.push(byte_idx + 1);
                chars_in_line = 0;
            } else {
                chars_in_line += 1;
            }
            prev_was_cr = ch == '\r';
        }
        line_char_lens.push(chars_in_line);
        char_byte_offsets.push(source.len());

        Self {
            line_char_starts,
            line_byte_starts,
            line_char_lens,
            char_byte_offsets,
            total_chars: char_count,
            total_bytes: source.len(),
        }
    }

    /// Number of lines, counting a trailing line after a final newline.
    pub fn line_count(&self) -> usize {
        self.line_char_lens.len()
    }

    /// Total size of the source in bytes.
    pub fn byte_size(&self) -> usize {
        self.total_bytes
    }

    /// Clamp a 1-based position to a valid (line index, column index) pair.
    fn clamp(&self, line: u32, column: u32) -> (usize, usize) {
        let line_idx = (line.max(1) as usize - 1).min(self.line_count() - 1);
        let max_col = self.line_char_lens[line_idx] + 1;
        let col_idx = (column.max(1) as usize).min(max_col) - 1;
        (line_idx, col_idx)
    }

    /// 0-based character offset of a 1-based `(line, column)` position.
    pub fn to_char_offset(&self, line: u32, column: u32) -> usize {
        let (line_idx, col_idx) = self.clamp(line, column);
        (self.line_char_starts[line_idx] + col_idx).min(self.total_chars)
    }

    /// 0-based byte offset of a 1-based `(line, column)` position.
    pub fn to_byte_offset(&self, line: u32, column: u32) -> usize {
        self.char_byte_offsets[self.to_char_offset(line, column)]
    }

    /// 1-based line number containing `byte_offset`; clamps past-the-end
    /// offsets to the last line.
    pub fn to_line_number(&self, byte_offset: usize) -> u32 {
        let idx = match self.line_byte_starts.binary_search(&byte_offset) {
            Ok(i) => i,
            Err(i) => i - 1,
        };
        (idx + 1) as u32
    }

    /// Character substring covered by an inclusive position range, clipped to
    /// the source. Returns `""` when the clipped range is empty.
    pub fn slice(&self, start: Position, end: Position, source: &str) -> String {
        let start_char = self.to_char_offset(start.line, start.column);
        let end_char = (self.to_char_offset(end.line, end.column) + 1).min(self.total_chars);
        if start_char >= end_char {
            return String::new();
        }
        let start_byte = self.char_byte_offsets[start_char];
        let end_byte = self.char_byte_offsets[end_char];
        source[start_byte..end_byte].to_string()
    }
}
