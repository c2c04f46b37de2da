//! CSS tokenizer and a tolerant stylesheet model.

use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssTokenKind {
    Ident,
    AtKeyword,
    Hash,
    String,
    /// A string cut short by a line break or the end of input.
    BadString,
    Number,
    Colon,
    Semicolon,
    LBrace,
    RBrace,
    LParen,
    RParen,
    LBracket,
    RBracket,
    Comma,
    Comment,
    Delim,
    Whitespace,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CssToken {
    pub kind: CssTokenKind,
    pub span: Range<usize>,
}

impl CssToken {
    fn significant(&self) -> bool {
        !matches!(self.kind, CssTokenKind::Whitespace | CssTokenKind::Comment)
    }
}

pub(crate) fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'-' || b == b'_' || b >= 0x80
}

fn is_ident_start(bytes: &[u8], i: usize) -> bool {
    match bytes.get(i) {
        Some(b) if b.is_ascii_alphabetic() || *b == b'_' || *b >= 0x80 => true,
        Some(b'-') => bytes
            .get(i + 1)
            .is_some_and(|b| b.is_ascii_alphabetic() || matches!(b, b'-' | b'_') || *b >= 0x80),
        _ => false,
    }
}

/// Split CSS source into tokens. Every byte belongs to exactly one token.
pub fn tokenize(text: &str) -> Vec<CssToken> {
    let bytes = text.as_bytes();
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let start = i;
        let b = bytes[i];
        let kind = if b.is_ascii_whitespace() {
            while i < bytes.len() && bytes[i].is_ascii_whitespace() {
                i += 1;
            }
            CssTokenKind::Whitespace
        } else if text[i..].starts_with("/*") {
            i = text[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
            CssTokenKind::Comment
        } else if b == b'"' || b == b'\'' {
            i += 1;
            let mut kind = CssTokenKind::BadString;
            while i < bytes.len() {
                match bytes[i] {
                    b'\\' => i += 2,
                    b'\n' | b'\r' => break,
                    c if c == b => {
                        i += 1;
                        kind = CssTokenKind::String;
                        break;
                    }
                    _ => i += 1,
                }
            }
            i = i.min(bytes.len());
            kind
        } else if b == b'@' && is_ident_start(bytes, i + 1) {
            i += 1;
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            CssTokenKind::AtKeyword
        } else if b == b'#' && bytes.get(i + 1).is_some_and(|b| is_ident_byte(*b)) {
            i += 1;
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            CssTokenKind::Hash
        } else if starts_number(bytes, i) {
            if matches!(b, b'+' | b'-') {
                i += 1;
            }
            while i < bytes.len() && (bytes[i].is_ascii_digit() || bytes[i] == b'.') {
                i += 1;
            }
            if i < bytes.len() && bytes[i] == b'%' {
                i += 1;
            } else if is_ident_start(bytes, i) {
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
            }
            CssTokenKind::Number
        } else if is_ident_start(bytes, i) {
            while i < bytes.len() && is_ident_byte(bytes[i]) {
                i += 1;
            }
            CssTokenKind::Ident
        } else {
            i += text[i..].chars().next().map_or(1, char::len_utf8);
            match b {
                b':' => CssTokenKind::Colon,
                b';' => CssTokenKind::Semicolon,
                b'{' => CssTokenKind::LBrace,
                b'}' => CssTokenKind::RBrace,
                b'(' => CssTokenKind::LParen,
                b')' => CssTokenKind::RParen,
                b'[' => CssTokenKind::LBracket,
                b']' => CssTokenKind::RBracket,
                b',' => CssTokenKind::Comma,
                _ => CssTokenKind::Delim,
            }
        };
        tokens.push(CssToken {
            kind,
            span: start..i,
        });
    }
    tokens
}

fn starts_number(bytes: &[u8], i: usize) -> bool {
    let digit_at = |j: usize| bytes.get(j).is_some_and(u8::is_ascii_digit);
    match bytes[i] {
        b'0'..=b'9' => true,
        b'.' => digit_at(i + 1),
        b'+' | b'-' => digit_at(i + 1) || (bytes.get(i + 1) == Some(&b'.') && digit_at(i + 2)),
        _ => false,
    }
}

/// A `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub property_span: Range<usize>,
    pub colon: Option<usize>,
    pub value_span: Range<usize>,
    /// Property through value, terminating `;` excluded.
    pub span: Range<usize>,
}

/// A rule or at-rule with a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rule {
    /// Prelude text with whitespace collapsed.
    pub prelude: String,
    pub prelude_span: Range<usize>,
    /// From `{` through `}` (or end of input when unclosed).
    pub body: Range<usize>,
    pub closed: bool,
    pub at_rule: bool,
    pub declarations: Vec<Declaration>,
    pub children: Vec<Rule>,
}

impl Rule {
    /// Whole rule, prelude through body.
    pub fn span(&self) -> Range<usize> {
        self.prelude_span.start..self.body.end
    }

    /// Inside of the braces.
    pub fn inner(&self) -> Range<usize> {
        let end = if self.closed { self.body.end - 1 } else { self.body.end };
        (self.body.start + 1).min(end)..end
    }

    /// `true` when the block holds declarations rather than nested rules.
    pub fn holds_declarations(&self) -> bool {
        !self.at_rule || !is_group_rule(&self.prelude)
    }
}

fn is_group_rule(prelude: &str) -> bool {
    let name = prelude
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("")
        .to_ascii_lowercase();
    matches!(
        name.as_str(),
        "@media" | "@supports" | "@document" | "@layer" | "@container" | "@scope"
    )
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    RBraceExpected,
    LBraceExpected,
    ColonExpected,
    UnexpectedRBrace,
    UnterminatedString,
}

impl ProblemKind {
    pub fn message(self) -> &'static str {
        match self {
            ProblemKind::RBraceExpected => "} expected",
            ProblemKind::LBraceExpected => "{ expected",
            ProblemKind::ColonExpected => "colon expected",
            ProblemKind::UnexpectedRBrace => "unexpected }",
            ProblemKind::UnterminatedString => "unterminated string",
        }
    }
}

/// A syntax problem found while parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Problem {
    pub kind: ProblemKind,
    pub span: Range<usize>,
}

/// Parsed stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Stylesheet {
    pub rules: Vec<Rule>,
    pub problems: Vec<Problem>,
}

impl Stylesheet {
    /// All rules, depth first, with their nesting depth.
    pub fn all_rules(&self) -> Vec<(&Rule, usize)> {
        fn visit<'a>(rules: &'a [Rule], depth: usize, out: &mut Vec<(&'a Rule, usize)>) {
            for rule in rules {
                out.push((rule, depth));
                visit(&rule.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        visit(&self.rules, 0, &mut out);
        out
    }

    /// Rules whose span contains `offset`, outermost first.
    pub fn rules_at(&self, offset: usize) -> Vec<&Rule> {
        let mut path = Vec::new();
        let mut rules = self.rules.as_slice();
        while let Some(rule) = rules
            .iter()
            .find(|r| r.span().start <= offset && offset <= r.span().end)
        {
            path.push(rule);
            rules = &rule.children;
        }
        path
    }

    /// Declaration whose span (extended to its terminator) contains `offset`.
    pub fn declaration_at(&self, offset: usize) -> Option<&Declaration> {
        self.rules_at(offset)
            .last()?
            .declarations
            .iter()
            .find(|d| d.span.start <= offset && offset <= d.span.end)
    }
}

/// Parse tokens into a stylesheet.
pub fn parse(text: &str, tokens: &[CssToken]) -> Stylesheet {
    let significant: Vec<&CssToken> = tokens.iter().filter(|t| t.significant()).collect();
    let mut parser = Parser {
        text,
        tokens: significant,
        pos: 0,
        problems: Vec::new(),
    };
    for token in tokens.iter().filter(|t| t.kind == CssTokenKind::BadString) {
        parser.problems.push(Problem {
            kind: ProblemKind::UnterminatedString,
            span: token.span.clone(),
        });
    }
    let rules = parser.rule_list(false);
    let mut problems = parser.problems;
    problems.sort_by_key(|p| p.span.start);
    Stylesheet { rules, problems }
}

struct Parser<'a> {
    text: &'a str,
    tokens: Vec<&'a CssToken>,
    pos: usize,
    problems: Vec<Problem>,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&CssToken> {
        self.tokens.get(self.pos).copied()
    }

    fn kind(&self) -> Option<CssTokenKind> {
        self.peek().map(|t| t.kind)
    }

    fn problem(&mut self, kind: ProblemKind, span: Range<usize>) {
        self.problems.push(Problem { kind, span });
    }

    fn end_offset(&self) -> usize {
        self.text.len()
    }

    /// Rules until `}` (nested) or end of input.
    fn rule_list(&mut self, nested: bool) -> Vec<Rule> {
        let mut rules = Vec::new();
        while let Some(token) = self.peek() {
            match token.kind {
                CssTokenKind::RBrace if nested => break,
                CssTokenKind::RBrace => {
                    let span = token.span.clone();
                    self.problem(ProblemKind::UnexpectedRBrace, span);
                    self.pos += 1;
                }
                CssTokenKind::Semicolon => self.pos += 1,
                _ => {
                    if let Some(rule) = self.rule() {
                        rules.push(rule);
                    }
                }
            }
        }
        rules
    }

    /// Prelude tokens up to `{`, `;` or `}`. Returns the stop kind.
    fn prelude(&mut self) -> (Range<usize>, Option<CssTokenKind>) {
        let start = self.peek().map_or(self.end_offset(), |t| t.span.start);
        let mut end = start;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                CssTokenKind::LParen | CssTokenKind::LBracket => depth += 1,
                CssTokenKind::RParen | CssTokenKind::RBracket => depth = depth.saturating_sub(1),
                CssTokenKind::LBrace | CssTokenKind::RBrace => {
                    return (start..end, Some(token.kind))
                }
                CssTokenKind::Semicolon if depth == 0 => return (start..end, Some(token.kind)),
                _ => {}
            }
            end = token.span.end;
            self.pos += 1;
        }
        (start..end, None)
    }

    fn collapse(&self, span: &Range<usize>) -> String {
        self.text[span.clone()].split_whitespace().collect::<Vec<_>>().join(" ")
    }

    fn rule(&mut self) -> Option<Rule> {
        let at_rule = self.kind() == Some(CssTokenKind::AtKeyword);
        let (prelude_span, stop) = self.prelude();
        match stop {
            Some(CssTokenKind::LBrace) => Some(self.block(prelude_span, at_rule)),
            Some(CssTokenKind::Semicolon) if at_rule => {
                self.pos += 1;
                None
            }
            Some(CssTokenKind::Semicolon) => {
                self.problem(ProblemKind::LBraceExpected, prelude_span);
                self.pos += 1;
                None
            }
            _ => {
                if !prelude_span.is_empty() && !at_rule {
                    self.problem(ProblemKind::LBraceExpected, prelude_span);
                }
                None
            }
        }
    }

    /// Parse a block; the current token is `{`.
    fn block(&mut self, prelude_span: Range<usize>, at_rule: bool) -> Rule {
        let open = self.peek().map_or(self.end_offset(), |t| t.span.start);
        self.pos += 1;
        let mut rule = Rule {
            prelude: self.collapse(&prelude_span),
            prelude_span,
            body: open..self.end_offset(),
            closed: false,
            at_rule,
            declarations: Vec::new(),
            children: Vec::new(),
        };
        if rule.holds_declarations() {
            self.declarations(&mut rule);
        } else {
            rule.children = self.rule_list(true);
        }
        let close = self
            .peek()
            .filter(|t| t.kind == CssTokenKind::RBrace)
            .map(|t| t.span.end);
        if let Some(end) = close {
            rule.body.end = end;
            rule.closed = true;
            self.pos += 1;
        } else {
            self.problem(ProblemKind::RBraceExpected, open..open + 1);
        }
        rule
    }

    /// Declarations (and nested rules) until `}` or end of input.
    fn declarations(&mut self, rule: &mut Rule) {
        while let Some(token) = self.peek() {
            match token.kind {
                CssTokenKind::RBrace => return,
                CssTokenKind::Semicolon => self.pos += 1,
                CssTokenKind::Ident if self.is_declaration() => {
                    if let Some(declaration) = self.declaration() {
                        rule.declarations.push(declaration);
                    }
                }
                _ => {
                    let at_rule = token.kind == CssTokenKind::AtKeyword;
                    let (prelude_span, stop) = self.prelude();
                    match stop {
                        Some(CssTokenKind::LBrace) => {
                            rule.children.push(self.block(prelude_span, at_rule))
                        }
                        Some(CssTokenKind::Semicolon) => self.pos += 1,
                        _ => {}
                    }
                }
            }
        }
    }

    /// Lookahead: an identifier starts a declaration unless a `{` comes
    /// before the next `;` or `}` (a nested rule such as `a:hover {}`).
    fn is_declaration(&self) -> bool {
        for token in &self.tokens[self.pos..] {
            match token.kind {
                CssTokenKind::LBrace => return false,
                CssTokenKind::Semicolon | CssTokenKind::RBrace => return true,
                _ => {}
            }
        }
        true
    }

    fn declaration(&mut self) -> Option<Declaration> {
        let property_token = self.peek()?.clone();
        self.pos += 1;
        let property = self.text[property_token.span.clone()].to_string();

        if self.kind() != Some(CssTokenKind::Colon) {
            self.problem(ProblemKind::ColonExpected, property_token.span.clone());
            let mut end = property_token.span.end;
            while let Some(token) = self.peek() {
                if matches!(token.kind, CssTokenKind::Semicolon | CssTokenKind::RBrace) {
                    break;
                }
                end = token.span.end;
                self.pos += 1;
            }
            return Some(Declaration {
                property,
                span: property_token.span.start..end,
                property_span: property_token.span,
                colon: None,
                value_span: end..end,
            });
        }

        let colon = self.peek().map(|t| t.span.start);
        let colon_end = self.peek().map_or(self.end_offset(), |t| t.span.end);
        self.pos += 1;
        let value_start = self.peek().map_or(colon_end, |t| t.span.start);
        let mut value_end = colon_end;
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                CssTokenKind::LParen => depth += 1,
                CssTokenKind::RParen => depth = depth.saturating_sub(1),
                CssTokenKind::Semicolon if depth == 0 => break,
                CssTokenKind::RBrace | CssTokenKind::LBrace => break,
                _ => {}
            }
            value_end = token.span.end;
            self.pos += 1;
        }
        let value_start = value_start.min(value_end);
        Some(Declaration {
            property,
            span: property_token.span.start..value_end,
            property_span: property_token.span,
            colon,
            value_span: value_start..value_end,
        })
    }
}
