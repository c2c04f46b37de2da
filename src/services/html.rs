//! HTML language service: works directly on the host document.

use std::collections::HashMap;
use std::ops::Range as Span;

use tower_lsp::lsp_types::{
    CompletionItem, CompletionItemKind, CompletionList, CompletionTextEdit, DocumentHighlight,
    DocumentHighlightKind, DocumentLink, Documentation, FoldingRange, Hover, HoverContents,
    InsertTextFormat, Location, MarkupContent, MarkupKind, Range, SelectionRange, SymbolInformation,
    SymbolKind, TextEdit, Url, WorkspaceEdit,
};

use crate::document::DocumentState;
use crate::html::data::{self, GLOBAL_ATTRIBUTES, TAGS};
use crate::html::{Attribute, HtmlDocument, Node, Scanner, Token, TokenKind};
use crate::modes::DocumentContext;
use crate::settings::HtmlSettings;

use super::{folding_ranges, region_marker, selection_chain};

/// Event handler attributes offered on every element.
const EVENT_HANDLERS: &[&str] = &[
    "onblur", "onchange", "onclick", "onfocus", "oninput", "onkeydown", "onkeyup", "onload",
    "onmouseout", "onmouseover", "onsubmit",
];

/// Attributes whose values are paths.
const PATH_ATTRIBUTES: &[&str] = &["href", "src"];

fn contains(span: &Span<usize>, offset: usize) -> bool {
    span.start <= offset && offset <= span.end
}

/// What the cursor is on, found by scanning up to it.
#[derive(Debug, PartialEq, Eq)]
enum CompletionContext {
    /// Element name after `<`.
    TagName { replace: Span<usize> },
    /// Element name after `</`.
    EndTagName { replace: Span<usize>, closed: bool },
    /// Attribute name inside a start tag.
    AttributeName { tag: String, replace: Span<usize>, has_value: bool },
    /// Attribute value.
    AttributeValue { attribute: String, value: Span<usize> },
    None,
}

fn completion_context(text: &str, offset: usize) -> CompletionContext {
    let mut tag = String::new();
    let mut attribute = String::new();
    let tokens: Vec<_> = Scanner::new(text).collect();
    for (i, token) in tokens.iter().enumerate() {
        if token.start > offset {
            break;
        }
        let slice = &text[token.start..token.end];
        let next = tokens.get(i + 1);
        match token.kind {
            TokenKind::StartTag => tag = slice.to_string(),
            TokenKind::AttributeName => attribute = slice.to_string(),
            _ => {}
        }
        let touches = token.start <= offset && offset <= token.end;
        match token.kind {
            TokenKind::StartTagOpen if token.end == offset => {
                let end = next
                    .filter(|n| n.kind == TokenKind::StartTag)
                    .map_or(offset, |n| n.end);
                return CompletionContext::TagName { replace: offset..end };
            }
            TokenKind::StartTag if touches => {
                return CompletionContext::TagName {
                    replace: token.start..token.end,
                };
            }
            TokenKind::Content if token.end == offset && slice.ends_with('<') => {
                return CompletionContext::TagName { replace: offset..offset };
            }
            TokenKind::EndTagOpen if token.end == offset => {
                let name = next.filter(|n| n.kind == TokenKind::EndTag);
                let end = name.map_or(offset, |n| n.end);
                let closed = tokens[i + 1..]
                    .iter()
                    .find(|t| t.kind != TokenKind::EndTag && t.kind != TokenKind::Whitespace)
                    .is_some_and(|t| t.kind == TokenKind::EndTagClose);
                return CompletionContext::EndTagName {
                    replace: offset..end,
                    closed,
                };
            }
            TokenKind::EndTag if touches => {
                let closed = next.is_some_and(|n| n.kind == TokenKind::EndTagClose);
                return CompletionContext::EndTagName {
                    replace: token.start..token.end,
                    closed,
                };
            }
            TokenKind::AttributeName if touches => {
                let has_value = next.is_some_and(|n| n.kind == TokenKind::DelimiterAssign);
                return CompletionContext::AttributeName {
                    tag,
                    replace: token.start..token.end,
                    has_value,
                };
            }
            TokenKind::Whitespace
                if touches && token.start < offset && !tag.is_empty() && in_start_tag(&tokens, i) =>
            {
                return CompletionContext::AttributeName {
                    tag,
                    replace: offset..offset,
                    has_value: false,
                };
            }
            TokenKind::DelimiterAssign if token.end == offset => {
                let value_end = next
                    .filter(|n| n.kind == TokenKind::AttributeValue)
                    .map_or(offset, |n| n.end);
                return CompletionContext::AttributeValue {
                    attribute,
                    value: offset..value_end,
                };
            }
            TokenKind::AttributeValue if touches && token.start < offset => {
                return CompletionContext::AttributeValue {
                    attribute,
                    value: token.start..token.end,
                };
            }
            TokenKind::StartTagClose | TokenKind::StartTagSelfClose | TokenKind::EndTagClose => {
                tag.clear();
            }
            _ => {}
        }
    }
    CompletionContext::None
}

/// `true` when token `i` lies between a start tag name and its closing `>`.
fn in_start_tag(tokens: &[Token], i: usize) -> bool {
    for token in tokens[..i].iter().rev() {
        match token.kind {
            TokenKind::StartTag => return true,
            TokenKind::StartTagClose
            | TokenKind::StartTagSelfClose
            | TokenKind::EndTagOpen
            | TokenKind::EndTag
            | TokenKind::Content => return false,
            _ => {}
        }
    }
    false
}

fn markdown(value: impl Into<String>) -> Documentation {
    Documentation::MarkupContent(MarkupContent {
        kind: MarkupKind::Markdown,
        value: value.into(),
    })
}

fn edit_item(
    label: &str,
    kind: CompletionItemKind,
    range: Range,
    new_text: String,
) -> CompletionItem {
    CompletionItem {
        label: label.to_string(),
        kind: Some(kind),
        text_edit: Some(CompletionTextEdit::Edit(TextEdit { range, new_text })),
        ..Default::default()
    }
}

/// Completion for element names, closing tags, attributes and path values.
pub async fn complete(
    doc: &DocumentState,
    offset: usize,
    context: &DocumentContext,
) -> CompletionList {
    let text = doc.text();
    let index = doc.line_index();
    let mut items = Vec::new();
    match completion_context(text, offset) {
        CompletionContext::TagName { replace } => {
            let range = index.span_to_range(&replace);
            for tag in TAGS {
                let new_text = tag.name.to_string();
                let mut item = edit_item(tag.name, CompletionItemKind::PROPERTY, range, new_text);
                item.documentation = Some(markdown(tag.description));
                items.push(item);
            }
        }
        CompletionContext::EndTagName { replace, closed } => {
            let open = doc
                .html_document()
                .path_before(replace.start)
                .into_iter()
                .rev()
                .find(|n| !n.closed && !n.tag.is_empty() && n.start < replace.start);
            if let Some(node) = open {
                let suffix = if closed { "" } else { ">" };
                let mut item = edit_item(
                    &format!("/{}", node.tag),
                    CompletionItemKind::PROPERTY,
                    index.span_to_range(&replace),
                    format!("{}{suffix}", node.tag),
                );
                item.filter_text = Some(node.tag.clone());
                items.push(item);
            }
        }
        CompletionContext::AttributeName { tag, replace, has_value } => {
            let range = index.span_to_range(&replace);
            let specific = data::tag(&tag).map_or(&[][..], |t| t.attributes);
            let mut seen = Vec::new();
            let candidates = specific
                .iter()
                .map(|name| (*name, None))
                .chain(
                    GLOBAL_ATTRIBUTES
                        .iter()
                        .map(|(name, description)| (*name, Some(*description))),
                )
                .chain(EVENT_HANDLERS.iter().map(|name| (*name, None)));
            for (name, description) in candidates {
                if seen.contains(&name) {
                    continue;
                }
                seen.push(name);
                let new_text = if has_value {
                    name.to_string()
                } else {
                    format!("{name}=\"$1\"")
                };
                let mut item = edit_item(name, CompletionItemKind::VALUE, range, new_text);
                if !has_value {
                    item.insert_text_format = Some(InsertTextFormat::SNIPPET);
                }
                item.documentation = description.map(markdown);
                items.push(item);
            }
        }
        CompletionContext::AttributeValue { attribute, value } => {
            if PATH_ATTRIBUTES.iter().any(|a| a.eq_ignore_ascii_case(&attribute)) {
                items = path_completion(doc, &value, offset, context).await;
            }
        }
        CompletionContext::None => {}
    }
    CompletionList {
        is_incomplete: false,
        items,
    }
}

/// Files and folders next to the path typed so far in an attribute value.
async fn path_completion(
    doc: &DocumentState,
    value: &Span<usize>,
    offset: usize,
    context: &DocumentContext,
) -> Vec<CompletionItem> {
    let text = doc.text();
    let raw = &text[value.clone()];
    let quote = matches!(raw.as_bytes().first(), Some(b'"' | b'\''));
    let inner_start = value.start + usize::from(quote);
    if offset < inner_start {
        return Vec::new();
    }
    let typed = &text[inner_start..offset];
    if typed.contains(':') && !typed.starts_with('/') {
        return Vec::new();
    }
    let directory = typed.rfind('/').map_or("", |i| &typed[..=i]);
    let reference = if directory.is_empty() { "./" } else { directory };
    let Some(folder) = context.resolve_reference(reference, None) else {
        return Vec::new();
    };
    let Ok(path) = folder.to_file_path() else {
        return Vec::new();
    };
    let mut entries = match tokio::fs::read_dir(&path).await {
        Ok(entries) => entries,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "path completion skipped");
            return Vec::new();
        }
    };

    let replace = doc
        .line_index()
        .span_to_range(&(inner_start + directory.len()..offset));
    let own_name = doc
        .uri()
        .path_segments()
        .and_then(|mut s| s.next_back())
        .unwrap_or("")
        .to_string();
    let mut items = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name.starts_with('.') || name == own_name {
            continue;
        }
        let is_dir = entry.file_type().await.is_ok_and(|t| t.is_dir());
        let (label, kind) = if is_dir {
            (format!("{name}/"), CompletionItemKind::FOLDER)
        } else {
            (name, CompletionItemKind::FILE)
        };
        items.push(edit_item(&label, kind, replace, label.clone()));
    }
    items.sort_by(|a, b| a.label.cmp(&b.label));
    items
}

fn hover_at(content: String, range: Range) -> Hover {
    Hover {
        contents: HoverContents::Markup(MarkupContent {
            kind: MarkupKind::Markdown,
            value: content,
        }),
        range: Some(range),
    }
}

/// Element or attribute documentation.
pub fn hover(doc: &DocumentState, offset: usize) -> Option<Hover> {
    let node = doc.html_document().find_node_at(offset)?;
    let index = doc.line_index();
    let in_start = contains(&node.tag_name_range(), offset) && start_tag_contains(node, offset);
    let end_range = node.end_tag_name_range().filter(|r| contains(r, offset));
    if in_start || end_range.is_some() {
        let tag = data::tag(&node.tag)?;
        let (open, range) = match end_range {
            Some(range) => ("</", range),
            None => ("<", node.tag_name_range()),
        };
        return Some(hover_at(
            format!("```html\n{open}{}>\n```\n{}", tag.name, tag.description),
            index.span_to_range(&range),
        ));
    }
    let attribute = node
        .attributes
        .iter()
        .find(|a| contains(&a.name_range, offset))?;
    let description = data::global_attribute(&attribute.name)?;
    Some(hover_at(
        format!("**{}**\n\n{description}", attribute.name.to_ascii_lowercase()),
        index.span_to_range(&attribute.name_range),
    ))
}

/// The start tag name range only counts before the tag is closed.
fn start_tag_contains(node: &Node, offset: usize) -> bool {
    node.start_tag_end.map_or(true, |end| offset < end)
}

/// Start and end tag name ranges of the element whose name is at `offset`.
fn tag_name_ranges(html: &HtmlDocument, offset: usize) -> Option<(&Node, Vec<Span<usize>>)> {
    let node = html.find_node_at(offset)?;
    let start = node.tag_name_range();
    let end = node.end_tag_name_range();
    let on_start = contains(&start, offset) && start_tag_contains(node, offset);
    let on_end = end.as_ref().is_some_and(|r| contains(r, offset));
    if node.tag.is_empty() || !(on_start || on_end) {
        return None;
    }
    Some((node, std::iter::once(start).chain(end).collect()))
}

/// Both tag names of the element under the cursor.
pub fn highlights(doc: &DocumentState, offset: usize) -> Vec<DocumentHighlight> {
    let Some((_, ranges)) = tag_name_ranges(doc.html_document(), offset) else {
        return Vec::new();
    };
    ranges
        .iter()
        .map(|span| DocumentHighlight {
            range: doc.line_index().span_to_range(span),
            kind: Some(DocumentHighlightKind::READ),
        })
        .collect()
}

fn symbol_name(node: &Node) -> String {
    let mut name = node.tag.clone();
    if let Some(id) = node.attribute_value("id").filter(|v| !v.is_empty()) {
        name.push('#');
        name.push_str(id);
    }
    if let Some(classes) = node.attribute_value("class") {
        for class in classes.split_whitespace() {
            name.push('.');
            name.push_str(class);
        }
    }
    name
}

/// One symbol per element, named `tag#id.class`.
#[allow(deprecated)]
pub fn symbols(doc: &DocumentState) -> Vec<SymbolInformation> {
    fn visit(
        doc: &DocumentState,
        nodes: &[Node],
        container: Option<&str>,
        out: &mut Vec<SymbolInformation>,
    ) {
        for node in nodes.iter().filter(|n| !n.tag.is_empty()) {
            let name = symbol_name(node);
            out.push(SymbolInformation {
                name: name.clone(),
                kind: SymbolKind::FIELD,
                tags: None,
                deprecated: None,
                location: Location::new(
                    doc.uri().clone(),
                    doc.line_index().span_to_range(&(node.start..node.end)),
                ),
                container_name: container.map(str::to_string),
            });
            visit(doc, &node.children, Some(&name), out);
        }
    }
    let mut out = Vec::new();
    visit(doc, &doc.html_document().roots, None, &mut out);
    out
}

fn link_attribute(node: &Node, attribute: &Attribute) -> bool {
    let name = attribute.name.to_ascii_lowercase();
    match name.as_str() {
        "src" => true,
        "href" => !node.is_same_tag("base"),
        _ => false,
    }
}

/// `href` and `src` values resolved against the document, `<base href>`
/// and the workspace folders.
pub fn links(doc: &DocumentState, context: &DocumentContext) -> Vec<DocumentLink> {
    let html = doc.html_document();
    let nodes = html.walk();
    let base = nodes
        .iter()
        .find(|(n, _)| n.is_same_tag("base"))
        .and_then(|(n, _)| n.attribute_value("href"))
        .and_then(|href| context.resolve_reference(href, None));

    let mut out = Vec::new();
    for (node, _) in nodes {
        for attribute in node.attributes.iter().filter(|a| link_attribute(node, a)) {
            let Some(value) = &attribute.value else {
                continue;
            };
            let target = value.unquoted().trim();
            if target.is_empty() || target.starts_with('#') || target.contains("{{") {
                continue;
            }
            let lower = target.to_ascii_lowercase();
            if lower.starts_with("data:") || lower.starts_with("javascript:") {
                continue;
            }
            let Some(url) = context.resolve_reference(target, base.as_ref()) else {
                continue;
            };
            out.push(DocumentLink {
                range: doc.line_index().span_to_range(&value.inner_range()),
                target: Some(url),
                tooltip: None,
                data: None,
            });
        }
    }
    out
}

/// Folds for elements spanning lines, multi-line comments and
/// `<!-- #region -->` markers.
pub fn folding(doc: &DocumentState) -> Vec<FoldingRange> {
    let html = doc.html_document();
    let pairs: Vec<(usize, usize)> = html
        .walk()
        .into_iter()
        .filter_map(|(node, _)| Some((node.start, node.end_tag_start?)))
        .collect();
    let text = doc.text();
    let mut comments = Vec::new();
    let mut markers = Vec::new();
    for comment in &html.comments {
        let body = text[comment.clone()].trim_start_matches("<!--");
        match region_marker(body) {
            Some(is_start) => markers.push((comment.start, is_start)),
            None => comments.push(comment.clone()),
        }
    }
    let line_of = |offset: usize| doc.position_at(offset).line;
    folding_ranges(line_of, &pairs, &comments, &markers)
}

/// Elements containing `offset`, outermost first.
fn nodes_at(html: &HtmlDocument, offset: usize) -> Vec<&Node> {
    let mut path = Vec::new();
    let mut nodes = html.roots.as_slice();
    while let Some(node) = nodes.iter().find(|n| n.start < offset && offset <= n.end) {
        path.push(node);
        nodes = &node.children;
    }
    path
}

/// Selection chains: attribute value, attribute, tag, element and parents.
pub fn selection_ranges(doc: &DocumentState, offsets: &[usize]) -> Vec<SelectionRange> {
    let html = doc.html_document();
    let index = doc.line_index();
    offsets
        .iter()
        .map(|&offset| {
            let mut spans: Vec<Span<usize>> = Vec::new();
            for node in nodes_at(html, offset).into_iter().rev() {
                if spans.is_empty() {
                    if let Some(start_tag_end) = node.start_tag_end.filter(|end| offset < *end) {
                        if let Some(attribute) = node.attributes.iter().find(|a| {
                            let end = a.value.as_ref().map_or(a.name_range.end, |v| v.range.end);
                            a.name_range.start <= offset && offset <= end
                        }) {
                            if let Some(value) =
                                attribute.value.as_ref().filter(|v| v.range.start <= offset)
                            {
                                spans.push(value.inner_range());
                                spans.push(value.range.clone());
                            }
                            let end = attribute
                                .value
                                .as_ref()
                                .map_or(attribute.name_range.end, |v| v.range.end);
                            spans.push(attribute.name_range.start..end);
                        } else if contains(&node.tag_name_range(), offset) {
                            spans.push(node.tag_name_range());
                        }
                        spans.push(node.start..start_tag_end);
                    } else if let Some(end_name) =
                        node.end_tag_name_range().filter(|r| contains(r, offset))
                    {
                        spans.push(end_name);
                    }
                }
                if let Some(content) = node.content_range().filter(|c| contains(c, offset)) {
                    spans.push(content);
                }
                spans.push(node.start..node.end);
            }
            spans.push(0..doc.text().len());
            selection_chain(spans.iter().map(|s| index.span_to_range(s))).unwrap_or_else(|| {
                let position = index.offset_to_position(offset);
                SelectionRange {
                    range: Range::new(position, position),
                    parent: None,
                }
            })
        })
        .collect()
}

/// Closing text for the character just typed before `offset`.
///
/// After `>` that closes a start tag this is `$0</tag>`; after `</` it is
/// `tag>` for the innermost element still open.
pub fn auto_close(doc: &DocumentState, offset: usize) -> Option<String> {
    let text = doc.text();
    let typed = *text.as_bytes().get(offset.checked_sub(1)?)?;
    let html = doc.html_document();
    match typed {
        b'>' => {
            let node = html.find_node_before(offset)?;
            let open = !node.tag.is_empty()
                && !data::is_void_element(&node.tag)
                && node.start < offset
                && node.end_tag_start.map_or(true, |end| end > offset);
            if !open {
                return None;
            }
            let closes_here = Scanner::new(&text[node.start..])
                .map(|t| (t.kind, node.start + t.end))
                .take_while(|(_, end)| *end <= offset)
                .any(|(kind, end)| kind == TokenKind::StartTagClose && end == offset);
            closes_here.then(|| format!("$0</{}>", node.tag))
        }
        b'/' => {
            let node = html
                .path_before(offset)
                .into_iter()
                .rev()
                .find(|n| !n.closed)?;
            if node.tag.is_empty() {
                return None;
            }
            let opens_here = Scanner::new(&text[node.start..])
                .map(|t| (t.kind, node.start + t.end))
                .take_while(|(_, end)| *end <= offset)
                .any(|(kind, end)| kind == TokenKind::EndTagOpen && end == offset);
            opens_here.then(|| format!("{}>", node.tag))
        }
        _ => None,
    }
}

/// Rename both tag names of the element under the cursor.
pub fn rename(doc: &DocumentState, offset: usize, new_name: &str) -> Option<WorkspaceEdit> {
    let (_, ranges) = tag_name_ranges(doc.html_document(), offset)?;
    let edits = ranges
        .iter()
        .map(|span| TextEdit {
            range: doc.line_index().span_to_range(span),
            new_text: new_name.to_string(),
        })
        .collect();
    let changes: HashMap<Url, Vec<TextEdit>> = HashMap::from([(doc.uri().clone(), edits)]);
    Some(WorkspaceEdit {
        changes: Some(changes),
        ..Default::default()
    })
}

/// Start and end tag names that must be edited together.
pub fn linked_editing(doc: &DocumentState, offset: usize) -> Option<Vec<Range>> {
    let (_, ranges) = tag_name_ranges(doc.html_document(), offset)?;
    (ranges.len() == 2).then(|| {
        ranges
            .iter()
            .map(|span| doc.line_index().span_to_range(span))
            .collect()
    })
}

/// Elements whose content keeps its whitespace.
const PRESERVED_CONTENT: &[&str] = &["pre", "textarea"];

/// Indentation level of a line whose first character is at `offset`.
///
/// Each element whose content holds `offset` adds a level. A line continuing
/// a start tag sits one level past the tag; an end tag line sits with its
/// start tag.
pub fn indent_level(html: &HtmlDocument, offset: usize) -> usize {
    let mut level = 0;
    let mut nodes = html.roots.as_slice();
    while let Some(node) = nodes.iter().find(|n| n.start < offset && offset < n.end) {
        let Some(content) = node.content_range() else {
            return level + 1;
        };
        if offset < content.start {
            return level + 1;
        }
        if offset >= content.end {
            return level;
        }
        level += 1;
        nodes = &node.children;
    }
    level
}

/// Lines starting at `offset` are left as written: comment bodies, embedded
/// blocks and the content of preserved or unformatted elements.
fn is_verbatim(doc: &DocumentState, offset: usize, settings: &HtmlSettings) -> bool {
    let html = doc.html_document();
    if html.comments.iter().any(|c| c.start < offset && offset < c.end) {
        return true;
    }
    let embedded = doc
        .regions()
        .regions()
        .iter()
        .any(|r| !r.attribute_value && r.start <= offset && offset < r.end);
    if embedded {
        return true;
    }
    nodes_at(html, offset).into_iter().any(|node| {
        let preserved = PRESERVED_CONTENT.iter().any(|tag| node.is_same_tag(tag))
            || settings.format.is_unformatted(&node.tag);
        preserved
            && node
                .content_range()
                .is_some_and(|content| content.start < offset && offset <= content.end)
    })
}

/// Re-indent markup lines whose first character lies in `span`.
///
/// `unit` is one indentation level. Blank lines are left alone.
pub fn format(
    doc: &DocumentState,
    span: Span<usize>,
    unit: &str,
    settings: &HtmlSettings,
) -> Vec<TextEdit> {
    let text = doc.text();
    let html = doc.html_document();
    let mut edits = Vec::new();
    let mut line_start = 0;
    for line in text.split_inclusive('\n') {
        let start = line_start;
        line_start += line.len();
        let content = line.trim_start_matches([' ', '\t']);
        let first = start + line.len() - content.len();
        if content.trim_end_matches(['\r', '\n']).is_empty()
            || !(span.start <= first && first < span.end)
            || is_verbatim(doc, first, settings)
        {
            continue;
        }
        let wanted = unit.repeat(indent_level(html, first));
        if text[start..first] != wanted {
            edits.push(TextEdit {
                range: doc.line_index().span_to_range(&(start..first)),
                new_text: wanted,
            });
        }
    }
    edits
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower_lsp::lsp_types::Position;

    fn state(text: &str) -> DocumentState {
        let uri = Url::parse("file:///site/index.html").unwrap();
        DocumentState::new(uri, "html", 1, text.to_string())
    }

    fn context() -> DocumentContext {
        DocumentContext::new(Url::parse("file:///site/index.html").unwrap(), vec![])
    }

    fn labels(list: &CompletionList) -> Vec<&str> {
        list.items.iter().map(|i| i.label.as_str()).collect()
    }

    fn edit_text(item: &CompletionItem) -> &str {
        match &item.text_edit {
            Some(CompletionTextEdit::Edit(edit)) => &edit.new_text,
            _ => "",
        }
    }

    #[tokio::test]
    async fn completes_tag_names() {
        let doc = state("<div><</div>");
        let list = complete(&doc, 6, &context()).await;
        assert!(labels(&list).contains(&"span"));

        let doc = state("<di");
        let list = complete(&doc, 3, &context()).await;
        let div = list.items.iter().find(|i| i.label == "div").unwrap();
        let Some(CompletionTextEdit::Edit(edit)) = &div.text_edit else {
            panic!("expected edit");
        };
        assert_eq!(edit.range, Range::new(Position::new(0, 1), Position::new(0, 3)));
    }

    #[tokio::test]
    async fn completes_closing_tag() {
        let doc = state("<div><p></p></");
        let list = complete(&doc, 14, &context()).await;
        assert_eq!(labels(&list), vec!["/div"]);
        assert_eq!(edit_text(&list.items[0]), "div>");
    }

    #[tokio::test]
    async fn completes_attributes() {
        let doc = state("<input >");
        let list = complete(&doc, 7, &context()).await;
        let names = labels(&list);
        assert!(names.contains(&"type"));
        assert!(names.contains(&"class"));
        assert!(names.contains(&"onclick"));
        let class = list.items.iter().find(|i| i.label == "class").unwrap();
        assert_eq!(edit_text(class), "class=\"$1\"");
        assert!(class.documentation.is_some());

        let doc = state("<a hr=\"x\">");
        let list = complete(&doc, 5, &context()).await;
        let href = list.items.iter().find(|i| i.label == "href").unwrap();
        assert_eq!(edit_text(href), "href");
    }

    #[tokio::test]
    async fn completes_paths_in_href() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("css")).unwrap();
        std::fs::write(dir.path().join("css").join("main.css"), "").unwrap();
        std::fs::write(dir.path().join("about.html"), "").unwrap();
        std::fs::write(dir.path().join("index.html"), "").unwrap();
        let uri = Url::from_file_path(dir.path().join("index.html")).unwrap();

        let text = "<a href=\"\"></a><link href=\"css/\">";
        let doc = DocumentState::new(uri.clone(), "html", 1, text.to_string());
        let context = DocumentContext::new(uri, vec![]);

        let list = complete(&doc, 9, &context).await;
        assert_eq!(labels(&list), vec!["about.html", "css/"]);

        let offset = text.find("css/").unwrap() + 4;
        let list = complete(&doc, offset, &context).await;
        assert_eq!(labels(&list), vec!["main.css"]);
    }

    #[test]
    fn hover_on_tag_and_attribute() {
        let doc = state("<div id=\"a\">x</div>");
        let value = |offset| match hover(&doc, offset).map(|h| h.contents) {
            Some(HoverContents::Markup(m)) => m.value,
            _ => String::new(),
        };
        assert!(value(2).starts_with("```html\n<div>"));
        assert!(value(16).starts_with("```html\n</div>"));
        assert!(value(5).starts_with("**id**"));
        assert_eq!(value(12), "");
    }

    #[test]
    fn highlights_and_linked_ranges() {
        let doc = state("<div>\n</div>");
        let ranges: Vec<_> = highlights(&doc, 2).into_iter().map(|h| h.range).collect();
        assert_eq!(
            ranges,
            vec![
                Range::new(Position::new(0, 1), Position::new(0, 4)),
                Range::new(Position::new(1, 2), Position::new(1, 5)),
            ]
        );
        assert_eq!(linked_editing(&doc, 9), Some(ranges));
        assert_eq!(linked_editing(&state("<br>"), 2), None);
    }

    #[test]
    fn rename_edits_both_tags() {
        let doc = state("<b>x</b>");
        let edit = rename(&doc, 1, "strong").unwrap();
        let changes = edit.changes.unwrap();
        let edits = &changes[doc.uri()];
        assert_eq!(edits.len(), 2);
        assert!(edits.iter().all(|e| e.new_text == "strong"));
        assert!(rename(&doc, 3, "i").is_none());
    }

    #[test]
    fn symbols_name_ids_and_classes() {
        let doc = state("<body><div id=\"main\" class=\"a b\"><p></p></div></body>");
        let names: Vec<_> = symbols(&doc)
            .into_iter()
            .map(|s| (s.name, s.container_name))
            .collect();
        assert_eq!(
            names,
            vec![
                ("body".to_string(), None),
                ("div#main.a.b".to_string(), Some("body".to_string())),
                ("p".to_string(), Some("div#main.a.b".to_string())),
            ]
        );
    }

    #[test]
    fn links_resolve_against_base() {
        let doc = state(
            "<a href=\"about.html\"></a><a href=\"#top\"></a><img src=\"/img/logo.png\">\
             <script src=\"https://cdn.example/x.js\"></script>",
        );
        let targets: Vec<_> = links(&doc, &context())
            .into_iter()
            .filter_map(|l| l.target.map(|t| t.to_string()))
            .collect();
        assert_eq!(
            targets,
            vec![
                "file:///site/about.html",
                "file:///img/logo.png",
                "https://cdn.example/x.js",
            ]
        );

        let doc = state("<base href=\"sub/\"><a href=\"page.html\"></a>");
        let targets: Vec<_> = links(&doc, &context())
            .into_iter()
            .filter_map(|l| l.target.map(|t| t.to_string()))
            .collect();
        assert_eq!(targets, vec!["file:///site/sub/page.html"]);
    }

    #[test]
    fn folds_elements_comments_and_regions() {
        let doc = state(
            "<div>\n<p>\n</p>\n<!-- a\n b -->\n<!-- #region -->\n<!-- #endregion -->\n</div>",
        );
        let folds: Vec<_> = folding(&doc)
            .into_iter()
            .map(|f| (f.start_line, f.end_line, f.kind))
            .collect();
        assert_eq!(
            folds,
            vec![
                (0, 6, None),
                (3, 4, Some(tower_lsp::lsp_types::FoldingRangeKind::Comment)),
                (5, 6, Some(tower_lsp::lsp_types::FoldingRangeKind::Region)),
            ]
        );
    }

    #[test]
    fn selection_walks_out_from_attribute_value() {
        let text = "<div><a href=\"x.html\">t</a></div>";
        let doc = state(text);
        let offset = text.find("x.html").unwrap() + 1;
        let chain = selection_ranges(&doc, &[offset]).remove(0);
        let mut spans = Vec::new();
        let mut current = Some(&chain);
        while let Some(range) = current {
            spans.push((range.range.start.character, range.range.end.character));
            current = range.parent.as_deref();
        }
        assert_eq!(spans, vec![(14, 20), (13, 21), (8, 21), (5, 22), (5, 27), (0, 33)]);
    }

    #[test]
    fn auto_close_after_start_tag() {
        assert_eq!(auto_close(&state("<div>"), 5), Some("$0</div>".to_string()));
        assert_eq!(auto_close(&state("<div id=\"a\">"), 12), Some("$0</div>".to_string()));
        assert_eq!(auto_close(&state("<br>"), 4), None);
        assert_eq!(auto_close(&state("<div></div>"), 5), None);
        assert_eq!(auto_close(&state("<div>x"), 6), None);
    }

    #[test]
    fn auto_close_after_end_tag_open() {
        assert_eq!(auto_close(&state("<div><p></p></"), 14), Some("div>".to_string()));
        assert_eq!(auto_close(&state("<div></div></"), 13), None);
        assert_eq!(auto_close(&state("a/"), 2), None);
    }

    fn reindent(text: &str, span: Span<usize>, settings: &HtmlSettings) -> Vec<(u32, String)> {
        format(&state(text), span, "  ", settings)
            .into_iter()
            .map(|e| (e.range.start.line, e.new_text))
            .collect()
    }

    const MARKUP: &str = "<div>\n<ul>\n<li>a</li>\n      <li\nclass=\"x\">b</li>\n</ul>\n\
                          <pre>\n  keep\n</pre>\n<!--\n   note\n-->\n</div>";

    #[test]
    fn reindents_by_element_depth() {
        let edits = reindent(MARKUP, 0..MARKUP.len(), &HtmlSettings::default());
        let expected = [
            (1, "  "),
            (2, "    "),
            (3, "    "),
            (4, "      "),
            (5, "  "),
            (6, "  "),
            (9, "  "),
        ];
        assert_eq!(
            edits,
            expected.map(|(line, indent)| (line, indent.to_string())).to_vec()
        );
    }

    #[test]
    fn unformatted_elements_keep_their_content() {
        let mut settings = HtmlSettings::default();
        settings.format.unformatted = Some("ul".to_string());
        let edits = reindent(MARKUP, 0..MARKUP.len(), &settings);
        let lines: Vec<u32> = edits.iter().map(|(line, _)| *line).collect();
        assert_eq!(lines, vec![1, 6, 9]);
    }

    #[test]
    fn only_lines_starting_in_span_are_touched() {
        let second_line = MARKUP.find("<ul>").unwrap();
        let edits = reindent(MARKUP, second_line..second_line + 5, &HtmlSettings::default());
        assert_eq!(edits, vec![(1, "  ".to_string())]);
    }

    #[test]
    fn embedded_blocks_are_left_to_their_modes() {
        let text = "<div>\n<style>\na {}\n</style>\n</div>";
        let edits = reindent(text, 0..text.len(), &HtmlSettings::default());
        assert_eq!(edits, vec![(1, "  ".to_string()), (3, "  ".to_string())]);
        let doc = state(text);
        assert_eq!(indent_level(doc.html_document(), text.find("a {").unwrap()), 2);
    }
}
