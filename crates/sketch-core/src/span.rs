//! Source locations for tokens, CST nodes, and diagnostics.
//!
//! Lines and columns are 1-based; columns count Unicode scalar values.
//! A span's end position names the *last* character it covers, so a
//! one-character token starts and ends on the same column.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A line/column position (both 1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A range of source text: byte offsets (end exclusive) plus the
/// line/column of its first and last character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub start_pos: Position,
    pub end_pos: Position,
}

impl Span {
    /// Source text covered by this span.
    pub fn text<'a>(&self, source: &'a str) -> &'a str {
        source.get(self.start..self.end).unwrap_or("")
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub fn merge(self, other: Span) -> Span {
        let (first, last) = if self.start <= other.start {
            (self, other)
        } else {
            (other, self)
        };
        Span {
            start: first.start,
            end: first.end.max(last.end),
            start_pos: first.start_pos,
            end_pos: if last.end >= first.end {
                last.end_pos
            } else {
                first.end_pos
            },
        }
    }
}

/// Byte offset → line/column lookup table for one source text.
#[derive(Debug, Clone)]
pub struct LineIndex<'src> {
    source: &'src str,
    line_starts: Vec<usize>,
}

impl<'src> LineIndex<'src> {
    pub fn new(source: &'src str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self {
            source,
            line_starts,
        }
    }

    /// Position of the character starting at byte `offset`.
    pub fn position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line_idx = self.line_starts.partition_point(|&s| s <= offset) - 1;
        let line_start = self.line_starts[line_idx];
        let column = self
            .source
            .get(line_start..offset)
            .map_or(0, |s| s.chars().count());
        Position {
            line: line_idx as u32 + 1,
            column: column as u32 + 1,
        }
    }

    /// Build a span over `start..end` (byte offsets, end exclusive).
    pub fn span(&self, start: usize, end: usize) -> Span {
        let last_char = self
            .source
            .get(start..end)
            .and_then(|s| s.char_indices().last())
            .map_or(start, |(i, _)| start + i);
        Span {
            start,
            end,
            start_pos: self.position(start),
            end_pos: self.position(last_char),
        }
    }

    /// A zero-width span at the end of the source (used for "unexpected end of input").
    pub fn eof_span(&self) -> Span {
        let len = self.source.len();
        let pos = self.position(len);
        Span {
            start: len,
            end: len,
            start_pos: pos,
            end_pos: pos,
        }
    }
}
