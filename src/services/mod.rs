//! Built-in language services.
//!
//! These work on host snapshots and embedded documents and know nothing about
//! the protocol beyond `lsp_types` values. Language modes adapt them to the
//! [`LanguageMode`](crate::modes::LanguageMode) contract.

use std::ops::Range as Span;

use tower_lsp::lsp_types::{
    FoldingRange, FoldingRangeKind, FormattingOptions, Range, SelectionRange, TextEdit,
};

use crate::document::EmbeddedDocument;

pub mod css;
pub mod html;
pub mod script;

/// Match bracket pairs. `brackets` yields `(offset, byte)` for every bracket
/// outside strings and comments. Unmatched brackets are dropped.
pub(crate) fn bracket_pairs(
    brackets: impl IntoIterator<Item = (usize, u8)>,
) -> Vec<(usize, usize)> {
    let mut stack: Vec<(usize, u8)> = Vec::new();
    let mut pairs = Vec::new();
    for (offset, b) in brackets {
        match b {
            b'{' | b'[' | b'(' => stack.push((offset, b)),
            b'}' | b']' | b')' => {
                let open = matching_open(b);
                if let Some(idx) = stack.iter().rposition(|(_, o)| *o == open) {
                    let (start, _) = stack[idx];
                    stack.truncate(idx);
                    pairs.push((start, offset));
                }
            }
            _ => {}
        }
    }
    pairs.sort_unstable();
    pairs
}

pub(crate) fn matching_open(close: u8) -> u8 {
    match close {
        b'}' => b'{',
        b']' => b'[',
        _ => b'(',
    }
}

pub(crate) fn matching_close(open: u8) -> u8 {
    match open {
        b'{' => b'}',
        b'[' => b']',
        _ => b')',
    }
}

/// Folding ranges for bracket pairs and block comments spanning lines.
///
/// `line_of` maps an offset to its line. A bracket pair folds from the line
/// of the opener to the line before the closer. Comments fold to their last
/// line. `#region`/`#endregion` markers in `markers` (offset, is_start) pair
/// up into region folds.
pub(crate) fn folding_ranges(
    line_of: impl Fn(usize) -> u32,
    pairs: &[(usize, usize)],
    comments: &[Span<usize>],
    markers: &[(usize, bool)],
) -> Vec<FoldingRange> {
    let mut out = Vec::new();
    for &(open, close) in pairs {
        let start_line = line_of(open);
        let close_line = line_of(close);
        if close_line > start_line + 1 {
            out.push(fold(start_line, close_line - 1, None));
        }
    }
    for comment in comments {
        let start_line = line_of(comment.start);
        let end_line = line_of(comment.end);
        if end_line > start_line {
            out.push(fold(start_line, end_line, Some(FoldingRangeKind::Comment)));
        }
    }
    let mut open_regions = Vec::new();
    for &(offset, is_start) in markers {
        let line = line_of(offset);
        if is_start {
            open_regions.push(line);
        } else if let Some(start_line) = open_regions.pop() {
            if line > start_line {
                out.push(fold(start_line, line, Some(FoldingRangeKind::Region)));
            }
        }
    }
    out.sort_by_key(|r| (r.start_line, r.end_line));
    out
}

/// Classify a comment body as a region start (`true`) or end (`false`).
pub(crate) fn region_marker(body: &str) -> Option<bool> {
    let body = body.trim_start();
    if body.starts_with("#region") {
        Some(true)
    } else if body.starts_with("#endregion") {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn fold(start_line: u32, end_line: u32, kind: Option<FoldingRangeKind>) -> FoldingRange {
    FoldingRange {
        start_line,
        end_line,
        kind,
        ..Default::default()
    }
}

/// Indentation unit for the given options.
pub(crate) fn indent_unit(options: &FormattingOptions) -> String {
    if options.insert_spaces {
        " ".repeat(options.tab_size as usize)
    } else {
        "\t".to_string()
    }
}

/// Leading whitespace of the host line containing `offset`.
pub(crate) fn line_indent(text: &str, offset: usize) -> &str {
    let line_start = text[..offset.min(text.len())]
        .rfind(['\n', '\r'])
        .map_or(0, |i| i + 1);
    let rest = &text[line_start..];
    let len = rest.len() - rest.trim_start_matches([' ', '\t']).len();
    &rest[..len]
}

/// Re-indent every line starting inside `span` by bracket depth.
///
/// `brackets` are the brackets of the whole embedded document, outside
/// strings and comments. Depth is counted from `block_start`, where the
/// content has indentation `base`. Lines starting with a closer are outdented
/// one level. Blank lines are left alone.
pub(crate) fn reindent(
    doc: &EmbeddedDocument,
    span: Span<usize>,
    block_start: usize,
    brackets: &[(usize, u8)],
    base: &str,
    unit: &str,
) -> Vec<TextEdit> {
    let text = doc.text();
    let mut edits = Vec::new();
    let from = span.start.max(block_start).min(text.len());
    let mut line_start = if from == 0 || matches!(text.as_bytes()[from - 1], b'\n' | b'\r') {
        from
    } else {
        next_line_start(text, from)
    };

    while line_start < span.end && line_start < text.len() {
        let line_end = text[line_start..]
            .find(['\n', '\r'])
            .map_or(text.len(), |i| line_start + i);
        let line = &text[line_start..line_end];
        let content = line.trim_start_matches([' ', '\t']);
        let ws_len = line.len() - content.len();

        if !content.is_empty() {
            let depth = depth_at(brackets, block_start, line_start + ws_len);
            let outdent = matches!(content.as_bytes()[0], b'}' | b']' | b')');
            let level = if outdent { depth.saturating_sub(1) } else { depth };
            let wanted = format!("{base}{}", unit.repeat(level));
            if line[..ws_len] != wanted {
                edits.push(TextEdit {
                    range: doc.span_to_range(&(line_start..line_start + ws_len)),
                    new_text: wanted,
                });
            }
        }
        line_start = next_line_start(text, line_end);
    }
    edits
}

fn next_line_start(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() && bytes[i] != b'\n' && bytes[i] != b'\r' {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'\r' {
        i += 1;
    }
    if i < bytes.len() && bytes[i] == b'\n' {
        i += 1;
    }
    i
}

fn depth_at(brackets: &[(usize, u8)], from: usize, offset: usize) -> usize {
    let mut depth = 0usize;
    for &(_, b) in brackets.iter().filter(|(at, _)| *at >= from && *at < offset) {
        match b {
            b'{' | b'[' | b'(' => depth += 1,
            _ => depth = depth.saturating_sub(1),
        }
    }
    depth
}

/// Byte range of the identifier-like word touching `offset`.
pub(crate) fn word_at(
    text: &str,
    offset: usize,
    is_word: impl Fn(u8) -> bool,
) -> Option<Span<usize>> {
    let bytes = text.as_bytes();
    let offset = offset.min(bytes.len());
    let mut start = offset;
    while start > 0 && is_word(bytes[start - 1]) {
        start -= 1;
    }
    let mut end = offset;
    while end < bytes.len() && is_word(bytes[end]) {
        end += 1;
    }
    (start < end).then_some(start..end)
}

/// Nest `ranges` (innermost first) into a selection chain. Ranges that do not
/// strictly grow are skipped.
pub(crate) fn selection_chain(ranges: impl IntoIterator<Item = Range>) -> Option<SelectionRange> {
    let mut chain: Vec<Range> = Vec::new();
    for range in ranges {
        let grows = chain
            .last()
            .map_or(true, |inner| crate::document::inside_range_but_not_same(&range, inner));
        if grows {
            chain.push(range);
        }
    }
    let mut result: Option<SelectionRange> = None;
    for range in chain.into_iter().rev() {
        result = Some(SelectionRange {
            range,
            parent: result.map(Box::new),
        });
    }
    result
}
