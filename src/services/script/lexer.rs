//! JavaScript tokenizer.
//!
//! Splits source into identifiers, literals, comments and punctuation. It does
//! not build a syntax tree; `/` is read as a regular expression or a division
//! depending on the previous significant token.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsTokenKind {
    Ident,
    Number,
    String,
    Template,
    Regex,
    LineComment,
    BlockComment,
    Punct,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsToken {
    pub kind: JsTokenKind,
    pub span: Range<usize>,
    /// `false` for strings, templates, comments and regular expressions that
    /// run into a line break or the end of input.
    pub terminated: bool,
}

impl JsToken {
    pub fn is_trivia(&self) -> bool {
        matches!(
            self.kind,
            JsTokenKind::Whitespace | JsTokenKind::LineComment | JsTokenKind::BlockComment
        )
    }
}

pub const KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "export", "extends", "false", "finally", "for", "function", "if",
    "import", "in", "instanceof", "let", "new", "null", "of", "return", "static", "super", "switch",
    "this", "throw", "true", "try", "typeof", "undefined", "var", "void", "while", "yield",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.binary_search(&word).is_ok()
}

/// Keywords after which `/` starts a regular expression.
const REGEX_PRECEDING: &[&str] = &[
    "case", "delete", "do", "else", "in", "instanceof", "new", "of", "return", "throw", "typeof",
    "void", "yield",
];

/// Numeric literal: hex, binary, octal or decimal with exponent, optional
/// separators and `BigInt` suffix.
static NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)^(?:
            0[xX][0-9a-fA-F_]+
            | 0[bB][01_]+
            | 0[oO][0-7_]+
            | (?:[0-9][0-9_]*(?:\.[0-9_]*)? | \.[0-9][0-9_]*) (?:[eE][+-]?[0-9_]+)?
        )n?",
    )
    .unwrap()
});

/// Complete regular expression literal on one line, with its flags.
static REGEX_LITERAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^/(?:[^\\/\[\r\n]|\\[^\r\n]|\[(?:[^\]\\\r\n]|\\[^\r\n])*\])+/[A-Za-z]*").unwrap()
});

pub(crate) fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

pub fn tokenize(text: &str) -> Vec<JsToken> {
    let bytes = text.as_bytes();
    let mut tokens: Vec<JsToken> = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let mut terminated = true;
        let b = bytes[i];
        let kind = if b.is_ascii_whitespace() {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            JsTokenKind::Whitespace
        } else if text[i..].starts_with("//") {
            i = text[i..].find(['\n', '\r']).map_or(bytes.len(), |p| i + p);
            JsTokenKind::LineComment
        } else if text[i..].starts_with("/*") {
            match text[i + 2..].find("*/") {
                Some(p) => i += 2 + p + 2,
                None => {
                    i = bytes.len();
                    terminated = false;
                }
            }
            JsTokenKind::BlockComment
        } else if b == b'"' || b == b'\'' {
            (i, terminated) = scan_string(bytes, i, b);
            JsTokenKind::String
        } else if b == b'`' {
            (i, terminated) = scan_template(bytes, i);
            JsTokenKind::Template
        } else if let Some(number) = NUMBER.find(&text[i..]) {
            i += number.end();
            JsTokenKind::Number
        } else if b == b'/' && regex_allowed(text, &tokens) {
            match REGEX_LITERAL.find(&text[i..]) {
                Some(literal) => i += literal.end(),
                None => {
                    i = text[i..].find(['\n', '\r']).map_or(bytes.len(), |p| i + p);
                    terminated = false;
                }
            }
            JsTokenKind::Regex
        } else if text[i..].chars().next().is_some_and(is_ident_start) {
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += text[i..].chars().next().map_or(1, char::len_utf8);
            }
            JsTokenKind::Ident
        } else {
            i += text[i..].chars().next().map_or(1, char::len_utf8);
            JsTokenKind::Punct
        };
        tokens.push(JsToken {
            kind,
            span: start..i,
            terminated,
        });
    }
    tokens
}

fn scan_string(bytes: &[u8], start: usize, quote: u8) -> (usize, bool) {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' | b'\r' => return (i, false),
            c if c == quote => return (i + 1, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

fn scan_template(bytes: &[u8], start: usize) -> (usize, bool) {
    let mut i = start + 1;
    let mut depth = 0usize;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'$' if depth == 0 && bytes.get(i + 1) == Some(&b'{') => {
                depth = 1;
                i += 2;
            }
            b'{' if depth > 0 => {
                depth += 1;
                i += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                i += 1;
            }
            b'`' if depth == 0 => return (i + 1, true),
            _ => i += 1,
        }
    }
    (bytes.len(), false)
}

fn regex_allowed(text: &str, tokens: &[JsToken]) -> bool {
    let Some(previous) = tokens.iter().rev().find(|t| !t.is_trivia()) else {
        return true;
    };
    let word = &text[previous.span.clone()];
    match previous.kind {
        JsTokenKind::Punct => !matches!(word, ")" | "]" | "}"),
        JsTokenKind::Ident => REGEX_PRECEDING.contains(&word),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<(JsTokenKind, &str)> {
        tokenize(text)
            .into_iter()
            .filter(|t| t.kind != JsTokenKind::Whitespace)
            .map(|t| (t.kind, &text[t.span]))
            .collect()
    }

    #[test]
    fn keywords_are_sorted() {
        assert!(KEYWORDS.windows(2).all(|w| w[0] < w[1]));
        assert!(is_keyword("function"));
        assert!(!is_keyword("fn"));
    }

    #[test]
    fn distinguishes_regex_from_division() {
        assert_eq!(
            kinds("a = b / c; r = /x[/]y/g"),
            vec![
                (JsTokenKind::Ident, "a"),
                (JsTokenKind::Punct, "="),
                (JsTokenKind::Ident, "b"),
                (JsTokenKind::Punct, "/"),
                (JsTokenKind::Ident, "c"),
                (JsTokenKind::Punct, ";"),
                (JsTokenKind::Ident, "r"),
                (JsTokenKind::Punct, "="),
                (JsTokenKind::Regex, "/x[/]y/g"),
            ]
        );
        assert_eq!(kinds("return /a/")[1], (JsTokenKind::Regex, "/a/"));
        assert_eq!(kinds("(x) / 2")[3], (JsTokenKind::Punct, "/"));
    }

    #[test]
    fn literals_and_comments() {
        let tokens = tokenize("'a\\'b' `x ${ {a: `y`} } z` // c\n/* d */ 1.5e3");
        let kinds: Vec<_> = tokens
            .iter()
            .filter(|t| t.kind != JsTokenKind::Whitespace)
            .map(|t| t.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![
                JsTokenKind::String,
                JsTokenKind::Template,
                JsTokenKind::LineComment,
                JsTokenKind::BlockComment,
                JsTokenKind::Number,
            ]
        );
        assert!(tokens.iter().all(|t| t.terminated));
    }

    #[test]
    fn numeric_literals() {
        assert_eq!(
            kinds("0xFF_ff 0b1010 1_000n .5 3.e-2 2.5E+3"),
            vec![
                (JsTokenKind::Number, "0xFF_ff"),
                (JsTokenKind::Number, "0b1010"),
                (JsTokenKind::Number, "1_000n"),
                (JsTokenKind::Number, ".5"),
                (JsTokenKind::Number, "3.e-2"),
                (JsTokenKind::Number, "2.5E+3"),
            ]
        );
    }

    #[test]
    fn unterminated_regex_stops_at_line_end() {
        let tokens = tokenize("x = /ab[/\ny");
        let regex = tokens.iter().find(|t| t.kind == JsTokenKind::Regex).unwrap();
        assert_eq!(regex.span, 4..9);
        assert!(!regex.terminated);
    }

    #[test]
    fn unterminated_literals() {
        let tokens = tokenize("'abc\nx = `open");
        let unterminated: Vec<_> = tokens
            .iter()
            .filter(|t| !t.terminated)
            .map(|t| t.kind)
            .collect();
        assert_eq!(unterminated, vec![JsTokenKind::String, JsTokenKind::Template]);

        let comment = tokenize("/* never closed");
        assert!(!comment[0].terminated);
    }
}
