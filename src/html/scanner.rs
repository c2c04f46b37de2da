//! Tokenizer for HTML markup.
//!
//! The scanner only splits text into tokens; it never allocates strings. Every
//! structural delimiter is ASCII, so token boundaries always fall on UTF-8
//! character boundaries.

/// Kind of a scanned token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// `<!--`
    StartCommentTag,
    /// Comment body.
    Comment,
    /// `-->`
    EndCommentTag,
    /// `<` opening a start tag.
    StartTagOpen,
    /// Element name in a start tag.
    StartTag,
    /// `>` closing a start tag.
    StartTagClose,
    /// `/>` closing a start tag.
    StartTagSelfClose,
    /// `</`
    EndTagOpen,
    /// Element name in an end tag.
    EndTag,
    /// `>` closing an end tag.
    EndTagClose,
    /// Attribute name.
    AttributeName,
    /// `=`
    DelimiterAssign,
    /// Attribute value, quotes included.
    AttributeValue,
    /// `<!DOCTYPE ...>` and other `<!` declarations.
    Doctype,
    /// Text between tags.
    Content,
    /// Raw text of a `<script>` element.
    Script,
    /// Raw text of a `<style>` element.
    Styles,
    /// Whitespace inside a tag.
    Whitespace,
    /// Anything the scanner could not classify.
    Unknown,
}

/// A token with its byte span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: usize,
    pub end: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    WithinContent,
    AfterOpeningStartTag,
    WithinTag,
    AfterAttributeName,
    BeforeAttributeValue,
    AfterOpeningEndTag,
    WithinEndTag,
    WithinComment,
    WithinScriptContent,
    WithinStyleContent,
}

/// Iterator over the tokens of an HTML document.
pub struct Scanner<'a> {
    text: &'a str,
    pos: usize,
    state: State,
    last_tag: RawTag,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RawTag {
    Script,
    Style,
    Other,
}

impl<'a> Scanner<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            text,
            pos: 0,
            state: State::WithinContent,
            last_tag: RawTag::Other,
        }
    }

    fn bytes(&self) -> &'a [u8] {
        self.text.as_bytes()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes().get(self.pos).copied()
    }

    fn starts_with(&self, prefix: &str) -> bool {
        self.bytes()[self.pos..].starts_with(prefix.as_bytes())
    }

    fn token(&mut self, kind: TokenKind, start: usize) -> Option<Token> {
        Some(Token {
            kind,
            start,
            end: self.pos,
        })
    }

    fn advance_char(&mut self) {
        self.pos += self.text[self.pos..]
            .chars()
            .next()
            .map_or(1, char::len_utf8);
    }

    fn skip_while(&mut self, pred: impl Fn(u8) -> bool) -> usize {
        let start = self.pos;
        while let Some(b) = self.peek() {
            if !pred(b) {
                break;
            }
            self.pos += 1;
        }
        self.pos - start
    }

    fn scan(&mut self) -> Option<Token> {
        loop {
            let start = self.pos;
            if start >= self.text.len() {
                return None;
            }
            let state = self.state;
            match state {
                State::WithinContent => {
                    if self.starts_with("<!--") {
                        self.pos += 4;
                        self.state = State::WithinComment;
                        return self.token(TokenKind::StartCommentTag, start);
                    }
                    if self.starts_with("<!") {
                        self.pos = find_byte(self.bytes(), self.pos, b'>')
                            .map(|i| i + 1)
                            .unwrap_or(self.text.len());
                        return self.token(TokenKind::Doctype, start);
                    }
                    if self.starts_with("</") {
                        self.pos += 2;
                        self.state = State::AfterOpeningEndTag;
                        return self.token(TokenKind::EndTagOpen, start);
                    }
                    if self.peek() == Some(b'<')
                        && self
                            .bytes()
                            .get(self.pos + 1)
                            .is_some_and(|b| b.is_ascii_alphabetic())
                    {
                        self.pos += 1;
                        self.state = State::AfterOpeningStartTag;
                        return self.token(TokenKind::StartTagOpen, start);
                    }
                    self.advance_char();
                    self.pos = find_byte(self.bytes(), self.pos, b'<').unwrap_or(self.text.len());
                    return self.token(TokenKind::Content, start);
                }
                State::AfterOpeningStartTag => {
                    if self.skip_while(is_name_byte) > 0 {
                        let name = &self.text[start..self.pos];
                        self.last_tag = if name.eq_ignore_ascii_case("script") {
                            RawTag::Script
                        } else if name.eq_ignore_ascii_case("style") {
                            RawTag::Style
                        } else {
                            RawTag::Other
                        };
                        self.state = State::WithinTag;
                        return self.token(TokenKind::StartTag, start);
                    }
                    self.state = State::WithinContent;
                }
                State::WithinTag | State::AfterAttributeName | State::BeforeAttributeValue
                    if self.skip_while(|b| b.is_ascii_whitespace()) > 0 =>
                {
                    return self.token(TokenKind::Whitespace, start);
                }
                State::WithinTag => {
                    if self.starts_with("/>") {
                        self.pos += 2;
                        self.state = State::WithinContent;
                        return self.token(TokenKind::StartTagSelfClose, start);
                    }
                    match self.peek() {
                        Some(b'>') => {
                            self.pos += 1;
                            self.state = match self.last_tag {
                                RawTag::Script => State::WithinScriptContent,
                                RawTag::Style => State::WithinStyleContent,
                                RawTag::Other => State::WithinContent,
                            };
                            return self.token(TokenKind::StartTagClose, start);
                        }
                        Some(b'<') => self.state = State::WithinContent,
                        _ => {
                            if self.skip_while(is_attribute_name_byte) > 0 {
                                self.state = State::AfterAttributeName;
                                return self.token(TokenKind::AttributeName, start);
                            }
                            self.advance_char();
                            return self.token(TokenKind::Unknown, start);
                        }
                    }
                }
                State::AfterAttributeName => {
                    if self.peek() == Some(b'=') {
                        self.pos += 1;
                        self.state = State::BeforeAttributeValue;
                        return self.token(TokenKind::DelimiterAssign, start);
                    }
                    self.state = State::WithinTag;
                }
                State::BeforeAttributeValue => {
                    self.state = State::WithinTag;
                    match self.peek() {
                        Some(quote @ (b'"' | b'\'')) => {
                            self.pos = find_byte(self.bytes(), self.pos + 1, quote)
                                .map(|i| i + 1)
                                .unwrap_or(self.text.len());
                            return self.token(TokenKind::AttributeValue, start);
                        }
                        _ => {
                            if self.skip_while(is_unquoted_value_byte) > 0 {
                                return self.token(TokenKind::AttributeValue, start);
                            }
                        }
                    }
                }
                State::AfterOpeningEndTag => {
                    if self.skip_while(is_name_byte) > 0 {
                        self.state = State::WithinEndTag;
                        return self.token(TokenKind::EndTag, start);
                    }
                    if self.skip_while(|b| b.is_ascii_whitespace()) > 0 {
                        return self.token(TokenKind::Whitespace, start);
                    }
                    self.state = State::WithinEndTag;
                }
                State::WithinEndTag => {
                    if self.skip_while(|b| b.is_ascii_whitespace()) > 0 {
                        return self.token(TokenKind::Whitespace, start);
                    }
                    match self.peek() {
                        Some(b'>') => {
                            self.pos += 1;
                            self.state = State::WithinContent;
                            return self.token(TokenKind::EndTagClose, start);
                        }
                        Some(b'<') => self.state = State::WithinContent,
                        _ => {
                            self.advance_char();
                            return self.token(TokenKind::Unknown, start);
                        }
                    }
                }
                State::WithinComment => {
                    if self.starts_with("-->") {
                        self.pos += 3;
                        self.state = State::WithinContent;
                        return self.token(TokenKind::EndCommentTag, start);
                    }
                    self.pos = find_str(self.bytes(), self.pos, b"-->").unwrap_or(self.text.len());
                    return self.token(TokenKind::Comment, start);
                }
                State::WithinScriptContent | State::WithinStyleContent => {
                    let (needle, kind): (&[u8], _) = if self.state == State::WithinScriptContent {
                        (b"</script", TokenKind::Script)
                    } else {
                        (b"</style", TokenKind::Styles)
                    };
                    self.state = State::WithinContent;
                    self.pos = find_ascii_ci(self.bytes(), self.pos, needle)
                        .unwrap_or(self.text.len());
                    if self.pos > start {
                        return self.token(kind, start);
                    }
                }
            }
        }
    }
}

impl Iterator for Scanner<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        self.scan()
    }
}

fn is_name_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b':' | b'.') || b >= 0x80
}

fn is_attribute_name_byte(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'/' | b'>' | b'<' | b'=' | b'"' | b'\'')
}

fn is_unquoted_value_byte(b: u8) -> bool {
    !b.is_ascii_whitespace() && !matches!(b, b'"' | b'\'' | b'`' | b'=' | b'<' | b'>')
}

fn find_byte(bytes: &[u8], from: usize, needle: u8) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(|&b| b == needle)
        .map(|i| from + i)
}

fn find_str(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w == needle)
        .map(|i| from + i)
}

/// Case-insensitive search for an ASCII needle.
fn find_ascii_ci(bytes: &[u8], from: usize, needle: &[u8]) -> Option<usize> {
    bytes
        .get(from..)?
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
        .map(|i| from + i)
}
