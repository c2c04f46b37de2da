//! Text utilities for position conversion.
//!
//! Provides byte offset <-> LSP position conversion with proper UTF-16 handling,
//! incremental edit application and a few position comparisons used when merging
//! results from several languages.

use std::ops::Range as Span;

use tower_lsp::lsp_types::{Position, Range, TextDocumentContentChangeEvent};

/// Pre-computed line index for efficient position lookups.
///
/// LSP positions use line/column where column is in UTF-16 code units.
/// This struct pre-computes line start offsets for O(log n) lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// Byte offset where each line starts.
    line_starts: Vec<usize>,
    /// Source text (needed for UTF-16 column calculation).
    source: String,
}

impl LineIndex {
    /// Build a line index from source text.
    ///
    /// `\n`, `\r\n` and a lone `\r` all terminate a line.
    pub fn new(source: String) -> Self {
        let mut line_starts = vec![0];
        let bytes = source.as_bytes();

        for (i, &b) in bytes.iter().enumerate() {
            match b {
                b'\n' => line_starts.push(i + 1),
                b'\r' if bytes.get(i + 1) != Some(&b'\n') => line_starts.push(i + 1),
                _ => {}
            }
        }

        Self {
            line_starts,
            source,
        }
    }

    /// Get the source text.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Number of lines (a trailing newline opens one more, empty line).
    pub fn line_count(&self) -> u32 {
        self.line_starts.len() as u32
    }

    /// Convert a byte offset to an LSP position.
    ///
    /// Offsets past the end clamp to the end of the document.
    pub fn offset_to_position(&self, offset: usize) -> Position {
        let offset = offset.min(self.source.len());
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };

        let line_start = self.line_starts[line];
        let mut col = 0u32;
        for (i, c) in self.source[line_start..].char_indices() {
            if line_start + i >= offset || c == '\n' || c == '\r' {
                break;
            }
            col += c.len_utf16() as u32;
        }

        Position::new(line as u32, col)
    }

    /// Convert an LSP position to a byte offset.
    ///
    /// Returns None if the line is out of bounds. Columns past the end of a
    /// line clamp to the line end.
    pub fn position_to_offset(&self, position: Position) -> Option<usize> {
        let line = position.line as usize;
        let line_start = *self.line_starts.get(line)?;
        let line_end = self.line_content_end(line);

        let mut utf16_col = 0u32;
        for (i, c) in self.source[line_start..line_end].char_indices() {
            if utf16_col >= position.character {
                return Some(line_start + i);
            }
            utf16_col += c.len_utf16() as u32;
        }

        Some(line_end)
    }

    /// Like [`position_to_offset`](Self::position_to_offset) but positions past
    /// the last line clamp to the end of the document.
    pub fn clamped_offset(&self, position: Position) -> usize {
        self.position_to_offset(position)
            .unwrap_or(self.source.len())
    }

    /// Convert a byte span to an LSP range.
    pub fn span_to_range(&self, span: &Span<usize>) -> Range {
        Range::new(
            self.offset_to_position(span.start),
            self.offset_to_position(span.end),
        )
    }

    /// Convert an LSP range to a byte span, clamping to the document.
    pub fn range_to_span(&self, range: &Range) -> Span<usize> {
        let start = self.clamped_offset(range.start);
        let end = self.clamped_offset(range.end).max(start);
        start..end
    }

    /// Range covering the whole document.
    pub fn full_range(&self) -> Range {
        Range::new(
            Position::new(0, 0),
            self.offset_to_position(self.source.len()),
        )
    }

    /// Byte offset where the content of `line` ends (before its terminator).
    fn line_content_end(&self, line: usize) -> usize {
        let next = self
            .line_starts
            .get(line + 1)
            .copied()
            .unwrap_or(self.source.len());
        let bytes = self.source.as_bytes();
        let mut end = next;
        if end > self.line_starts[line] && bytes.get(end - 1) == Some(&b'\n') {
            end -= 1;
        }
        if end > self.line_starts[line] && bytes.get(end - 1) == Some(&b'\r') {
            end -= 1;
        }
        end
    }
}

/// Apply content changes from `textDocument/didChange` in order.
///
/// A change without a range replaces the whole text.
pub fn apply_content_changes(text: &str, changes: &[TextDocumentContentChangeEvent]) -> String {
    let mut current = text.to_string();
    for change in changes {
        match change.range {
            Some(range) => {
                let index = LineIndex::new(current);
                let span = index.range_to_span(&range);
                let mut next = index.source;
                next.replace_range(span, &change.text);
                current = next;
            }
            None => current = change.text.clone(),
        }
    }
    current
}

/// `true` when `p1` is before or at `p2`.
pub fn before_or_same(p1: Position, p2: Position) -> bool {
    p1.line < p2.line || (p1.line == p2.line && p1.character <= p2.character)
}

/// `true` when `inner` lies within `outer` and differs from it.
pub fn inside_range_but_not_same(outer: &Range, inner: &Range) -> bool {
    before_or_same(outer.start, inner.start)
        && before_or_same(inner.end, outer.end)
        && outer != inner
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_line() {
        let idx = LineIndex::new("hello world".to_string());
        assert_eq!(idx.offset_to_position(0), Position::new(0, 0));
        assert_eq!(idx.offset_to_position(5), Position::new(0, 5));
        assert_eq!(idx.offset_to_position(11), Position::new(0, 11));
    }

    #[test]
    fn multi_line() {
        let idx = LineIndex::new("<p>\n  <b>\n</p>".to_string());
        assert_eq!(idx.offset_to_position(3), Position::new(0, 3));
        assert_eq!(idx.offset_to_position(4), Position::new(1, 0));
        assert_eq!(idx.offset_to_position(6), Position::new(1, 2));
        assert_eq!(idx.offset_to_position(10), Position::new(2, 0));
        assert_eq!(idx.line_count(), 3);
    }

    #[test]
    fn crlf_line_endings() {
        let idx = LineIndex::new("a\r\nb\rc".to_string());
        assert_eq!(idx.line_count(), 3);
        assert_eq!(idx.offset_to_position(3), Position::new(1, 0));
        assert_eq!(idx.offset_to_position(5), Position::new(2, 0));
        assert_eq!(idx.position_to_offset(Position::new(0, 9)), Some(1));
    }

    #[test]
    fn position_to_offset_clamps_columns() {
        let idx = LineIndex::new("hello\nworld".to_string());
        assert_eq!(idx.position_to_offset(Position::new(0, 5)), Some(5));
        assert_eq!(idx.position_to_offset(Position::new(0, 40)), Some(5));
        assert_eq!(idx.position_to_offset(Position::new(1, 5)), Some(11));
        assert_eq!(idx.position_to_offset(Position::new(2, 0)), None);
        assert_eq!(idx.clamped_offset(Position::new(2, 0)), 11);
    }

    #[test]
    fn utf16_handling() {
        // '😀' is 4 bytes in UTF-8 but 2 code units in UTF-16
        let idx = LineIndex::new("a😀b".to_string());
        assert_eq!(idx.offset_to_position(1), Position::new(0, 1));
        assert_eq!(idx.offset_to_position(5), Position::new(0, 3));
        assert_eq!(idx.position_to_offset(Position::new(0, 3)), Some(5));
    }

    #[test]
    fn incremental_changes_apply_in_order() {
        let changes = vec![
            TextDocumentContentChangeEvent {
                range: Some(Range::new(Position::new(0, 1), Position::new(0, 2))),
                range_length: None,
                text: "div".to_string(),
            },
            TextDocumentContentChangeEvent {
                range: Some(Range::new(Position::new(1, 2), Position::new(1, 3))),
                range_length: None,
                text: "div".to_string(),
            },
        ];
        let text = apply_content_changes("<p>\n</p>", &changes);
        assert_eq!(text, "<div>\n</div>");
    }

    #[test]
    fn full_change_replaces_text() {
        let changes = vec![TextDocumentContentChangeEvent {
            range: None,
            range_length: None,
            text: "<b></b>".to_string(),
        }];
        assert_eq!(apply_content_changes("<p></p>", &changes), "<b></b>");
    }

    #[test]
    fn range_containment() {
        let outer = Range::new(Position::new(0, 0), Position::new(3, 0));
        let inner = Range::new(Position::new(1, 0), Position::new(2, 4));
        assert!(inside_range_but_not_same(&outer, &inner));
        assert!(!inside_range_but_not_same(&outer, &outer));
        assert!(!inside_range_but_not_same(&inner, &outer));
    }
}
