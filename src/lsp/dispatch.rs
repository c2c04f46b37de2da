//! Request routing: resolve the owning mode, then call it.
//!
//! Position-scoped requests go to the mode at the position. Whole-document
//! requests concatenate the answers of every mode present in the document,
//! in registration order. A mode without the capability yields the neutral
//! answer.

use std::str::FromStr;

use serde_json::{json, Value};
use tower_lsp::lsp_types::{
    Color, ColorInformation, ColorPresentation, CompletionItem, CompletionList, CompletionTextEdit,
    DocumentHighlight, DocumentLink, Hover, InsertTextFormat, Location, Position, Range,
    SignatureHelp, SymbolInformation, Url, WorkspaceEdit,
};

use crate::document::{DocumentState, DocumentStore, LanguageId};
use crate::error::{Error, Result};
use crate::modes::{empty_completion_list, Capability, DocumentContext, LanguageMode, LanguageModes};
use crate::settings::Settings;

use std::sync::Arc;

/// Positions on a line the document does not have are rejected. Columns
/// past a line's end are accepted and clamp to it.
fn check_position(doc: &DocumentState, position: Position) -> Result<()> {
    match doc.line_index().position_to_offset(position) {
        Some(_) => Ok(()),
        None => Err(Error::InvalidPosition {
            uri: doc.uri().clone(),
            position,
        }),
    }
}

/// Mode at `position` when it implements `capability`.
fn capable_mode_at(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
    capability: Capability,
) -> Result<Option<Arc<dyn LanguageMode>>> {
    check_position(doc, position)?;
    let Some(mode) = modes.mode_at_position(doc, position) else {
        return Ok(None);
    };
    if !mode.supports(capability) {
        tracing::debug!(language = %mode.id(), ?capability, "mode lacks capability");
        return Ok(None);
    }
    Ok(Some(mode))
}

/// The position one character to the left, used by requests triggered right
/// after typing.
fn before(position: Position) -> Option<Position> {
    (position.character > 0).then(|| Position::new(position.line, position.character - 1))
}

pub async fn completion(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
    context: &DocumentContext,
    settings: &Settings,
    snippet_support: bool,
) -> Result<CompletionList> {
    let Some(mode) = capable_mode_at(modes, doc, position, Capability::Completion)? else {
        return Ok(empty_completion_list());
    };
    if mode.id() != LanguageId::Html {
        tracing::debug!(language = %mode.id(), "embedded completion");
    }
    let mut list = mode.do_complete(doc, position, context, settings).await?;
    for item in &mut list.items {
        tag_item(item, mode.id(), doc.uri());
        if !snippet_support {
            strip_snippet(item);
        }
    }
    Ok(list)
}

/// Record the producing language and document so resolve can route back.
fn tag_item(item: &mut CompletionItem, language: LanguageId, uri: &Url) {
    let mut data = match item.data.take() {
        Some(Value::Object(map)) => map,
        _ => serde_json::Map::new(),
    };
    data.insert("languageId".to_string(), json!(language.as_str()));
    data.insert("uri".to_string(), json!(uri.as_str()));
    item.data = Some(Value::Object(data));
}

/// Route `item` back to the mode named in its data.
pub async fn resolve(
    modes: &LanguageModes,
    documents: &DocumentStore,
    item: CompletionItem,
) -> Result<CompletionItem> {
    let Some(data) = item.data.as_ref() else {
        return Ok(item);
    };
    let language = data
        .get("languageId")
        .and_then(Value::as_str)
        .and_then(|id| LanguageId::from_str(id).ok());
    let uri = data
        .get("uri")
        .and_then(Value::as_str)
        .and_then(|uri| Url::parse(uri).ok());
    let (Some(language), Some(uri)) = (language, uri) else {
        return Ok(item);
    };
    let mode = modes
        .mode(language)
        .filter(|m| m.supports(Capability::CompletionResolve));
    match (mode, documents.get(&uri)) {
        (Some(mode), Some(doc)) => mode.do_resolve(&doc, item).await,
        _ => Ok(item),
    }
}

/// Turn a snippet item into plain text: tab stops are dropped and
/// placeholders keep their default text.
fn strip_snippet(item: &mut CompletionItem) {
    if item.insert_text_format != Some(InsertTextFormat::SNIPPET) {
        return;
    }
    if let Some(text) = item.insert_text.as_mut() {
        *text = snippet_to_plain(text);
    }
    match item.text_edit.as_mut() {
        Some(CompletionTextEdit::Edit(edit)) => edit.new_text = snippet_to_plain(&edit.new_text),
        Some(CompletionTextEdit::InsertAndReplace(edit)) => {
            edit.new_text = snippet_to_plain(&edit.new_text)
        }
        None => {}
    }
    item.insert_text_format = Some(InsertTextFormat::PLAIN_TEXT);
}

fn snippet_to_plain(snippet: &str) -> String {
    let mut out = String::with_capacity(snippet.len());
    let mut chars = snippet.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '$' if chars.peek().is_some_and(|c| c.is_ascii_digit()) => {
                while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    chars.next();
                }
            }
            '$' if chars.peek() == Some(&'{') => {
                chars.next();
                while chars.peek().is_some_and(|c| c.is_ascii_digit()) {
                    chars.next();
                }
                if chars.peek() == Some(&':') {
                    chars.next();
                }
                let mut depth = 0;
                for c in chars.by_ref() {
                    match c {
                        '{' => depth += 1,
                        '}' if depth == 0 => break,
                        '}' => depth -= 1,
                        _ => {}
                    }
                    out.push(c);
                }
            }
            _ => out.push(c),
        }
    }
    out
}

pub async fn hover(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
) -> Result<Option<Hover>> {
    match capable_mode_at(modes, doc, position, Capability::Hover)? {
        Some(mode) => mode.do_hover(doc, position).await,
        None => Ok(None),
    }
}

pub async fn signature_help(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
) -> Result<Option<SignatureHelp>> {
    match capable_mode_at(modes, doc, position, Capability::SignatureHelp)? {
        Some(mode) => mode.do_signature_help(doc, position).await,
        None => Ok(None),
    }
}

pub async fn document_highlight(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
) -> Result<Vec<DocumentHighlight>> {
    match capable_mode_at(modes, doc, position, Capability::DocumentHighlight)? {
        Some(mode) => mode.find_document_highlight(doc, position).await,
        None => Ok(Vec::new()),
    }
}

pub async fn definition(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
) -> Result<Vec<Location>> {
    match capable_mode_at(modes, doc, position, Capability::Definition)? {
        Some(mode) => mode.find_definition(doc, position).await,
        None => Ok(Vec::new()),
    }
}

pub async fn references(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
) -> Result<Vec<Location>> {
    match capable_mode_at(modes, doc, position, Capability::References)? {
        Some(mode) => mode.find_references(doc, position).await,
        None => Ok(Vec::new()),
    }
}

pub async fn color_presentations(
    modes: &LanguageModes,
    doc: &DocumentState,
    color: Color,
    range: Range,
) -> Result<Vec<ColorPresentation>> {
    match capable_mode_at(modes, doc, range.start, Capability::ColorPresentations)? {
        Some(mode) => mode.get_color_presentations(doc, color, range).await,
        None => Ok(Vec::new()),
    }
}

/// Closing text for `html/tag`, looked up at the character just typed.
pub async fn auto_close(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
) -> Result<Option<String>> {
    let Some(typed) = before(position) else {
        return Ok(None);
    };
    match capable_mode_at(modes, doc, typed, Capability::AutoClose)? {
        Some(mode) => mode.do_auto_close(doc, position).await,
        None => Ok(None),
    }
}

/// Linked ranges for `html/onTypeRename` and linked editing.
pub async fn on_type_rename(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
) -> Result<Option<Vec<Range>>> {
    let Some(typed) = before(position) else {
        return Ok(None);
    };
    match capable_mode_at(modes, doc, typed, Capability::OnTypeRename)? {
        Some(mode) => mode.do_on_type_rename(doc, position).await,
        None => Ok(None),
    }
}

/// Rename is a host operation wherever the cursor is.
pub async fn rename(
    modes: &LanguageModes,
    doc: &DocumentState,
    position: Position,
    new_name: &str,
) -> Result<Option<WorkspaceEdit>> {
    check_position(doc, position)?;
    match modes
        .mode(LanguageId::Html)
        .filter(|m| m.supports(Capability::Rename))
    {
        Some(mode) => mode.do_rename(doc, position, new_name).await,
        None => Ok(None),
    }
}

pub async fn document_symbols(
    modes: &LanguageModes,
    doc: &DocumentState,
) -> Result<Vec<SymbolInformation>> {
    let mut symbols = Vec::new();
    for mode in modes.all_modes_in_document(doc) {
        if mode.supports(Capability::DocumentSymbols) {
            symbols.extend(mode.find_document_symbols(doc).await?);
        }
    }
    Ok(symbols)
}

pub async fn document_links(
    modes: &LanguageModes,
    doc: &DocumentState,
    context: &DocumentContext,
) -> Result<Vec<DocumentLink>> {
    let mut links = Vec::new();
    for mode in modes.all_modes_in_document(doc) {
        if mode.supports(Capability::DocumentLinks) {
            links.extend(mode.find_document_links(doc, context).await?);
        }
    }
    Ok(links)
}

pub async fn document_colors(
    modes: &LanguageModes,
    doc: &DocumentState,
) -> Result<Vec<ColorInformation>> {
    let mut colors = Vec::new();
    for mode in modes.all_modes_in_document(doc) {
        if mode.supports(Capability::DocumentColors) {
            colors.extend(mode.find_document_colors(doc).await?);
        }
    }
    Ok(colors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::EmbeddedLanguages;
    use tower_lsp::lsp_types::{HoverContents, TextEdit};

    fn modes() -> LanguageModes {
        LanguageModes::new(&EmbeddedLanguages {
            css: true,
            javascript: true,
        })
    }

    fn uri() -> Url {
        Url::parse("file:///d.html").unwrap()
    }

    fn doc(text: &str) -> DocumentState {
        DocumentState::new(uri(), "html", 1, text.to_string())
    }

    fn hover_text(hover: &Hover) -> String {
        match &hover.contents {
            HoverContents::Markup(markup) => markup.value.clone(),
            other => format!("{other:?}"),
        }
    }

    #[test]
    fn snippets_become_plain_text() {
        assert_eq!(snippet_to_plain("class=\"$1\""), "class=\"\"");
        assert_eq!(snippet_to_plain("$0</div>"), "</div>");
        assert_eq!(snippet_to_plain("color: ${1:red};"), "color: red;");
        assert_eq!(snippet_to_plain("a\\$b"), "a$b");
    }

    #[test]
    fn strip_snippet_rewrites_edit() {
        let mut item = CompletionItem {
            label: "id".to_string(),
            insert_text_format: Some(InsertTextFormat::SNIPPET),
            text_edit: Some(CompletionTextEdit::Edit(TextEdit {
                range: Range::default(),
                new_text: "id=\"$1\"".to_string(),
            })),
            ..Default::default()
        };
        strip_snippet(&mut item);
        assert_eq!(item.insert_text_format, Some(InsertTextFormat::PLAIN_TEXT));
        match item.text_edit {
            Some(CompletionTextEdit::Edit(edit)) => assert_eq!(edit.new_text, "id=\"\""),
            other => panic!("unexpected edit {other:?}"),
        }
    }

    #[tokio::test]
    async fn completion_items_carry_routing_data() {
        let modes = modes();
        let doc = doc("<style>a { col }</style>");
        let context = DocumentContext::new(uri(), vec![]);
        let settings = Settings::default();
        let position = Position::new(0, 14);
        let list = completion(&modes, &doc, position, &context, &settings, true)
            .await
            .unwrap();
        let item = list
            .items
            .iter()
            .find(|i| i.label == "color")
            .cloned()
            .unwrap();
        let data = item.data.clone().unwrap();
        assert_eq!(data["languageId"], "css");
        assert_eq!(data["uri"], uri().as_str());

        let documents = DocumentStore::new();
        documents.open(uri(), "html", 1, doc.text().to_string());
        let resolved = resolve(&modes, &documents, item).await.unwrap();
        assert!(resolved.documentation.is_some());
    }

    #[tokio::test]
    async fn resolve_without_data_is_identity() {
        let item = CompletionItem {
            label: "x".to_string(),
            ..Default::default()
        };
        let resolved = resolve(&modes(), &DocumentStore::new(), item.clone()).await.unwrap();
        assert_eq!(resolved, item);
    }

    #[tokio::test]
    async fn hover_goes_to_owning_mode() {
        let modes = modes();
        let doc = doc("<div><style>a { color: red }</style></div>");
        let css = hover(&modes, &doc, Position::new(0, 18)).await.unwrap().unwrap();
        assert!(hover_text(&css).contains("color"));
        let html = hover(&modes, &doc, Position::new(0, 2)).await.unwrap().unwrap();
        assert!(hover_text(&html).contains("div"));
    }

    #[tokio::test]
    async fn auto_close_looks_left_of_cursor() {
        let modes = modes();
        let doc = doc("<div>");
        assert_eq!(
            auto_close(&modes, &doc, Position::new(0, 5)).await.unwrap(),
            Some("$0</div>".to_string())
        );
        assert_eq!(auto_close(&modes, &doc, Position::new(0, 0)).await.unwrap(), None);
    }

    #[tokio::test]
    async fn whole_document_requests_concatenate() {
        let modes = modes();
        let doc = doc(
            "<div id=\"a\"><style>.b { color: #ff0000 }</style>\
             <script>function c() {}</script></div>",
        );
        let symbols = document_symbols(&modes, &doc).await.unwrap();
        let names: Vec<_> = symbols.iter().map(|s| s.name.as_str()).collect();
        assert!(names.contains(&".b"));
        assert!(names.contains(&"c"));
        assert!(names.iter().position(|n| *n == ".b") < names.iter().position(|n| *n == "c"));

        let colors = document_colors(&modes, &doc).await.unwrap();
        assert_eq!(colors.len(), 1);
        assert_eq!(colors[0].color.red, 1.0);
    }

    #[tokio::test]
    async fn rename_always_uses_host() {
        let modes = modes();
        let doc = doc("<div><style>a{}</style></div>");
        let edit = rename(&modes, &doc, Position::new(0, 2), "section").await.unwrap().unwrap();
        let changes = edit.changes.unwrap();
        assert_eq!(changes[&uri()].len(), 2);
    }

    #[tokio::test]
    async fn positions_past_the_last_line_are_rejected() {
        let modes = modes();
        let doc = doc("<div>\n</div>");
        let err = hover(&modes, &doc, Position::new(5, 0)).await.unwrap_err();
        assert!(matches!(
            err,
            Error::InvalidPosition { uri: ref at, position }
                if *at == uri() && position == Position::new(5, 0)
        ));
        let err = rename(&modes, &doc, Position::new(2, 0), "p").await.unwrap_err();
        assert!(matches!(err, Error::InvalidPosition { .. }));
        assert!(hover(&modes, &doc, Position::new(1, 40)).await.is_ok());
    }
}
