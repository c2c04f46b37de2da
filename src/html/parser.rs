//! Builds an element tree from scanner tokens.
//!
//! The parser is forgiving: unclosed elements end where their parent ends, and
//! an end tag without a matching open element is ignored.

use std::ops::Range;

use super::data::is_void_element;
use super::scanner::{Scanner, TokenKind};

/// An attribute as written in a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub name_range: Range<usize>,
    pub value: Option<AttributeValue>,
}

/// The value of an attribute, quotes included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeValue {
    pub raw: String,
    pub range: Range<usize>,
}

impl AttributeValue {
    /// Value text with surrounding quotes removed.
    pub fn unquoted(&self) -> &str {
        unquote(&self.raw)
    }

    /// Byte range of the value without its quotes.
    pub fn inner_range(&self) -> Range<usize> {
        let quoted = self.raw.len() >= 2
            && matches!(self.raw.as_bytes()[0], b'"' | b'\'')
            && self.raw.as_bytes()[self.raw.len() - 1] == self.raw.as_bytes()[0];
        if quoted {
            self.range.start + 1..self.range.end - 1
        } else if matches!(self.raw.as_bytes().first(), Some(b'"' | b'\'')) {
            self.range.start + 1..self.range.end
        } else {
            self.range.clone()
        }
    }
}

/// Strip matching quotes from an attribute value.
pub fn unquote(raw: &str) -> &str {
    let bytes = raw.as_bytes();
    match bytes.first() {
        Some(&q @ (b'"' | b'\'')) => {
            let inner = &raw[1..];
            inner.strip_suffix(q as char).unwrap_or(inner)
        }
        _ => raw,
    }
}

/// An element in the document tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    /// Element name as written.
    pub tag: String,
    /// Offset of the `<` opening the start tag.
    pub start: usize,
    /// Offset just past the end tag, or where the element implicitly ends.
    pub end: usize,
    /// Offset just past the `>` of the start tag, if the tag was closed.
    pub start_tag_end: Option<usize>,
    /// Offset of the `</` of the end tag, if one was found.
    pub end_tag_start: Option<usize>,
    /// `true` when the element has an end tag or is self-closing/void.
    pub closed: bool,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Node>,
}

impl Node {
    /// Byte range of the element name in the start tag.
    pub fn tag_name_range(&self) -> Range<usize> {
        self.start + 1..self.start + 1 + self.tag.len()
    }

    /// Byte range of the element name in the end tag.
    pub fn end_tag_name_range(&self) -> Option<Range<usize>> {
        self.end_tag_start
            .map(|s| s + 2..s + 2 + self.tag.len())
    }

    /// Look up an attribute by name, case-insensitively.
    pub fn attribute(&self, name: &str) -> Option<&Attribute> {
        self.attributes
            .iter()
            .find(|a| a.name.eq_ignore_ascii_case(name))
    }

    /// Unquoted value of an attribute.
    pub fn attribute_value(&self, name: &str) -> Option<&str> {
        self.attribute(name)?.value.as_ref().map(|v| v.unquoted())
    }

    /// Content range between the start and end tags.
    pub fn content_range(&self) -> Option<Range<usize>> {
        let start = self.start_tag_end?;
        Some(start..self.end_tag_start.unwrap_or(self.end))
    }

    pub fn is_same_tag(&self, name: &str) -> bool {
        self.tag.eq_ignore_ascii_case(name)
    }

    /// Deepest descendant (or self) whose span contains `offset`.
    ///
    /// Start is exclusive so that an offset on `<` belongs to the parent.
    pub fn find_node_at(&self, offset: usize) -> Option<&Node> {
        if offset <= self.start || offset > self.end {
            return None;
        }
        self.children
            .iter()
            .find_map(|c| c.find_node_at(offset))
            .or(Some(self))
    }
}

/// A parsed HTML document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HtmlDocument {
    pub roots: Vec<Node>,
    /// Byte ranges of comments, delimiters included.
    pub comments: Vec<Range<usize>>,
}

impl HtmlDocument {
    /// Deepest node containing `offset`.
    pub fn find_node_at(&self, offset: usize) -> Option<&Node> {
        self.roots.iter().find_map(|n| n.find_node_at(offset))
    }

    /// Innermost node that starts before `offset`.
    ///
    /// A node that has already ended before `offset` is returned as is
    /// unless its last child runs to its end (an implicitly closed child).
    pub fn find_node_before(&self, offset: usize) -> Option<&Node> {
        self.path_before(offset).pop()
    }

    /// Ancestors of [`find_node_before`](Self::find_node_before), outermost
    /// first, ending with the node itself.
    pub fn path_before(&self, offset: usize) -> Vec<&Node> {
        let mut path = Vec::new();
        let mut nodes = self.roots.as_slice();
        loop {
            let idx = nodes.partition_point(|c| c.start < offset);
            let Some(child) = idx.checked_sub(1).and_then(|i| nodes.get(i)) else {
                break;
            };
            path.push(child);
            let descend = offset < child.end
                || child.children.last().is_some_and(|last| last.end == child.end);
            if !descend {
                break;
            }
            nodes = &child.children;
        }
        path
    }

    /// All elements in document order.
    pub fn walk(&self) -> Vec<(&Node, usize)> {
        fn visit<'a>(nodes: &'a [Node], depth: usize, out: &mut Vec<(&'a Node, usize)>) {
            for node in nodes {
                out.push((node, depth));
                visit(&node.children, depth + 1, out);
            }
        }
        let mut out = Vec::new();
        visit(&self.roots, 0, &mut out);
        out
    }
}

/// Parse a document into its element tree.
pub fn parse(text: &str) -> HtmlDocument {
    let mut stack: Vec<Node> = Vec::new();
    let mut roots: Vec<Node> = Vec::new();
    let mut comments = Vec::new();
    let mut comment_start = None;
    let mut pending_attr: Option<usize> = None;
    let mut end_tag: Option<(String, usize)> = None;

    let pop_into_parent =
        |stack: &mut Vec<Node>, roots: &mut Vec<Node>, node: Node| match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        };

    for token in Scanner::new(text) {
        let slice = &text[token.start..token.end];
        match token.kind {
            TokenKind::StartTagOpen => {
                pending_attr = None;
                close_unfinished_start_tag(&mut stack, &mut roots, token.start);
                stack.push(Node {
                    tag: String::new(),
                    start: token.start,
                    end: text.len(),
                    start_tag_end: None,
                    end_tag_start: None,
                    closed: false,
                    attributes: Vec::new(),
                    children: Vec::new(),
                });
            }
            TokenKind::StartTag => {
                if let Some(node) = stack.last_mut() {
                    node.tag = slice.to_string();
                }
            }
            TokenKind::AttributeName => {
                if let Some(node) = stack.last_mut() {
                    node.attributes.push(Attribute {
                        name: slice.to_string(),
                        name_range: token.start..token.end,
                        value: None,
                    });
                    pending_attr = Some(node.attributes.len() - 1);
                }
            }
            TokenKind::AttributeValue => {
                if let (Some(node), Some(idx)) = (stack.last_mut(), pending_attr.take()) {
                    if let Some(attr) = node.attributes.get_mut(idx) {
                        attr.value = Some(AttributeValue {
                            raw: slice.to_string(),
                            range: token.start..token.end,
                        });
                    }
                }
            }
            TokenKind::StartTagClose => {
                pending_attr = None;
                if let Some(node) = stack.last_mut() {
                    node.start_tag_end = Some(token.end);
                    if is_void_element(&node.tag) {
                        node.closed = true;
                        node.end = token.end;
                        if let Some(node) = stack.pop() {
                            pop_into_parent(&mut stack, &mut roots, node);
                        }
                    }
                }
            }
            TokenKind::StartTagSelfClose => {
                pending_attr = None;
                if let Some(mut node) = stack.pop() {
                    node.start_tag_end = Some(token.end);
                    node.closed = true;
                    node.end = token.end;
                    pop_into_parent(&mut stack, &mut roots, node);
                }
            }
            TokenKind::EndTagOpen => {
                close_unfinished_start_tag(&mut stack, &mut roots, token.start);
                end_tag = Some((String::new(), token.start));
            }
            TokenKind::EndTag => {
                if let Some((name, _)) = end_tag.as_mut() {
                    *name = slice.to_string();
                }
            }
            TokenKind::EndTagClose => {
                if let Some((name, open)) = end_tag.take() {
                    close_element(&mut stack, &mut roots, &name, open, token.end);
                }
            }
            TokenKind::StartCommentTag => comment_start = Some(token.start),
            TokenKind::EndCommentTag => {
                if let Some(start) = comment_start.take() {
                    comments.push(start..token.end);
                }
            }
            TokenKind::Content | TokenKind::Doctype => {
                close_unfinished_start_tag(&mut stack, &mut roots, token.start);
            }
            _ => {}
        }
    }

    if let Some(start) = comment_start {
        comments.push(start..text.len());
    }
    while let Some(mut node) = stack.pop() {
        node.end = text.len();
        pop_into_parent(&mut stack, &mut roots, node);
    }

    HtmlDocument { roots, comments }
}

/// A start tag interrupted before `>` ends at `at`.
fn close_unfinished_start_tag(stack: &mut Vec<Node>, roots: &mut Vec<Node>, at: usize) {
    let unfinished = stack
        .last()
        .is_some_and(|n| n.start_tag_end.is_none());
    if !unfinished {
        return;
    }
    if let Some(mut node) = stack.pop() {
        node.end = at;
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}

fn close_element(
    stack: &mut Vec<Node>,
    roots: &mut Vec<Node>,
    name: &str,
    open: usize,
    close: usize,
) {
    let Some(depth) = stack.iter().rposition(|n| n.is_same_tag(name)) else {
        return;
    };
    while stack.len() > depth {
        let Some(mut node) = stack.pop() else {
            break;
        };
        if stack.len() == depth {
            node.end_tag_start = Some(open);
            node.end = close;
            node.closed = true;
        } else {
            node.end = open;
        }
        match stack.last_mut() {
            Some(parent) => parent.children.push(node),
            None => roots.push(node),
        }
    }
}
