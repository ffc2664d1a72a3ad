//! Position mapping between LSP (0-based, UTF-16) and Sketch spans
//! (1-based lines, columns in chars).

use ropey::Rope;
use sketch_core::ErrorLocation;
use sketch_core::Span;
use tower_lsp::lsp_types::{Position, Range};

pub struct SourceMap {
    rope: Rope,
}

impl SourceMap {
    pub fn new(text: &str) -> Self {
        Self {
            rope: Rope::from_str(text),
        }
    }

    /// Char index of the start of `line`, clamped to the last line.
    fn line_start(&self, line: usize) -> (usize, usize) {
        let line = line.min(self.rope.len_lines().saturating_sub(1));
        (line, self.rope.line_to_char(line))
    }

    /// Chars in `line`, not counting its line break.
    fn line_len(&self, line: usize) -> usize {
        let slice = self.rope.line(line);
        let mut len = slice.len_chars();
        while len > 0 && matches!(slice.char(len - 1), '\n' | '\r') {
            len -= 1;
        }
        len
    }

    /// Char offset of an LSP position, clamped to its line.
    pub fn char_offset(&self, pos: Position) -> usize {
        let (line, start) = self.line_start(pos.line as usize);
        let end = start + self.line_len(line);
        let start_cu = self.rope.char_to_utf16_cu(start);
        let end_cu = self.rope.char_to_utf16_cu(end);
        let target = (start_cu + pos.character as usize).min(end_cu);
        self.rope.utf16_cu_to_char(target)
    }

    /// Byte offset of an LSP position, clamped to its line.
    pub fn byte_offset(&self, pos: Position) -> usize {
        self.rope.char_to_byte(self.char_offset(pos))
    }

    /// Text of the cursor's line up to the cursor.
    pub fn line_prefix(&self, pos: Position) -> String {
        let (_, start) = self.line_start(pos.line as usize);
        self.rope.slice(start..self.char_offset(pos)).to_string()
    }

    /// LSP position of a 1-based line and char column.
    pub fn position(&self, line: u32, column: u32) -> Position {
        let (line, start) = self.line_start(line.saturating_sub(1) as usize);
        let column = (column.saturating_sub(1) as usize).min(self.line_len(line));
        let cu = self.rope.char_to_utf16_cu(start + column) - self.rope.char_to_utf16_cu(start);
        Position::new(line as u32, cu as u32)
    }

    /// LSP range of a span; the end position becomes exclusive.
    pub fn range(&self, span: Span) -> Range {
        Range::new(
            self.position(span.start_pos.line, span.start_pos.column),
            self.position(span.end_pos.line, span.end_pos.column + 1),
        )
    }

    pub fn location_range(&self, location: ErrorLocation) -> Range {
        Range::new(
            self.position(location.start_line, location.start_column),
            self.position(location.end_line, location.end_column + 1),
        )
    }

    /// Range covering the whole text.
    pub fn full_range(&self) -> Range {
        let last = self.rope.len_lines().saturating_sub(1);
        let end = self.line_len(last);
        let start = self.rope.line_to_char(last);
        let cu = self.rope.char_to_utf16_cu(start + end) - self.rope.char_to_utf16_cu(start);
        Range::new(Position::new(0, 0), Position::new(last as u32, cu as u32))
    }
}
