//! Language modes: one adapter per language behind a uniform contract.
//!
//! Every operation is optional. A mode lists what it implements in
//! [`LanguageMode::capabilities`]; callers check [`LanguageMode::supports`]
//! before dispatching, and the default bodies return the neutral value.

use std::ops::Range as Span;

use async_trait::async_trait;
use serde_json::Value;
use tower_lsp::lsp_types::{
    Color, ColorInformation, ColorPresentation, CompletionItem, CompletionList, Diagnostic,
    DocumentHighlight, DocumentLink, FoldingRange, FormattingOptions, Hover, Location, Position,
    Range, SelectionRange, SemanticTokensLegend, SignatureHelp, SymbolInformation, TextEdit, Url,
    WorkspaceEdit,
};

use crate::document::{DocumentState, EmbeddedDocument, LanguageId};
use crate::error::Result;
use crate::lsp::semantic_tokens::SemanticTokenData;
use crate::services::{self, indent_unit, line_indent};
use crate::settings::Settings;

mod css;
mod html;
mod javascript;
mod registry;

pub use css::CssMode;
pub use html::HtmlMode;
pub use javascript::JavaScriptMode;
pub use registry::{LanguageModeRange, LanguageModes};

/// Operations a mode may implement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    Validation,
    Completion,
    CompletionResolve,
    Hover,
    SignatureHelp,
    DocumentHighlight,
    DocumentSymbols,
    DocumentLinks,
    Definition,
    References,
    Format,
    DocumentColors,
    ColorPresentations,
    AutoClose,
    Rename,
    OnTypeRename,
    FoldingRanges,
    SelectionRanges,
    SemanticTokens,
}

/// Resolves references found in a document (links, paths).
#[derive(Debug, Clone)]
pub struct DocumentContext {
    document: Url,
    workspace_folders: Vec<Url>,
}

impl DocumentContext {
    pub fn new(document: Url, workspace_folders: Vec<Url>) -> Self {
        Self {
            document,
            workspace_folders,
        }
    }

    pub fn document(&self) -> &Url {
        &self.document
    }

    /// Workspace folder containing the document, if any.
    pub fn root_folder(&self) -> Option<Url> {
        let document = self.document.as_str();
        self.workspace_folders
            .iter()
            .map(with_trailing_slash)
            .find(|folder| document.starts_with(folder.as_str()))
    }

    /// Resolve `reference` against `base` (the document by default).
    ///
    /// References with a scheme are returned as is. `/`-rooted references
    /// resolve against the workspace folder holding the document, when there
    /// is one.
    pub fn resolve_reference(&self, reference: &str, base: Option<&Url>) -> Option<Url> {
        if has_scheme(reference) {
            return Url::parse(reference).ok();
        }
        if let Some(rest) = reference.strip_prefix('/') {
            if let Some(folder) = self.root_folder() {
                return folder.join(rest).ok();
            }
        }
        base.unwrap_or(&self.document).join(reference).ok()
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    if url.path().ends_with('/') {
        return url.clone();
    }
    let mut url = url.clone();
    let path = format!("{}/", url.path());
    url.set_path(&path);
    url
}

fn has_scheme(reference: &str) -> bool {
    let Some(colon) = reference.find(':') else {
        return false;
    };
    let scheme = &reference[..colon];
    scheme
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

/// The neutral completion answer.
pub fn empty_completion_list() -> CompletionList {
    CompletionList {
        is_incomplete: true,
        items: Vec::new(),
    }
}

/// A boolean under `section`, `true` unless set to `false`.
pub(crate) fn section_flag(settings: &Settings, section: &str, key: &str) -> bool {
    settings
        .section(section)
        .and_then(|value| value.get(key))
        .and_then(Value::as_bool)
        .unwrap_or(true)
}

/// Indentation of the host line holding `offset`: what the host formatter
/// gives it when that line is part of `requested`, else what is written.
fn tag_indent(doc: &DocumentState, offset: usize, requested: &Span<usize>, unit: &str) -> String {
    let written = line_indent(doc.text(), offset);
    let line_start = doc.text()[..offset]
        .rfind(['\n', '\r'])
        .map_or(0, |i| i + 1);
    let first = line_start + written.len();
    if requested.start <= first && first < requested.end {
        unit.repeat(services::html::indent_level(doc.html_document(), first))
    } else {
        written.to_string()
    }
}

/// Run `format` over each non-attribute region of `embedded`'s language that
/// intersects `range`.
///
/// `format` receives the embedded span to re-indent, the embedded offset where
/// the region starts, the indentation of its content (one unit past the host
/// line holding the opening tag, as formatted) and the indentation unit.
pub(crate) fn format_embedded(
    doc: &DocumentState,
    embedded: &EmbeddedDocument,
    range: Range,
    options: &FormattingOptions,
    format: impl Fn(Span<usize>, usize, &str, &str) -> Vec<TextEdit>,
) -> Vec<TextEdit> {
    let requested = doc.line_index().range_to_span(&range);
    let unit = indent_unit(options);
    let mapper = embedded.mapper();
    let mut edits = Vec::new();
    for region in doc.regions().regions() {
        if region.language != Some(embedded.language()) || region.attribute_value {
            continue;
        }
        let start = region.start.max(requested.start);
        let end = region.end.min(requested.end);
        if start >= end {
            continue;
        }
        let base = format!("{}{unit}", tag_indent(doc, region.start, &requested, &unit));
        edits.extend(format(
            mapper.to_embedded(start)..mapper.to_embedded(end),
            mapper.to_embedded(region.start),
            &base,
            &unit,
        ));
    }
    edits
}

/// Capability provider for one language.
#[async_trait]
pub trait LanguageMode: Send + Sync {
    fn id(&self) -> LanguageId;

    /// Operations this mode implements.
    fn capabilities(&self) -> &'static [Capability];

    fn supports(&self, capability: Capability) -> bool {
        self.capabilities().contains(&capability)
    }

    async fn do_validation(
        &self,
        _doc: &DocumentState,
        _settings: &Settings,
    ) -> Result<Vec<Diagnostic>> {
        Ok(Vec::new())
    }

    async fn do_complete(
        &self,
        _doc: &DocumentState,
        _position: Position,
        _context: &DocumentContext,
        _settings: &Settings,
    ) -> Result<CompletionList> {
        Ok(empty_completion_list())
    }

    async fn do_resolve(
        &self,
        _doc: &DocumentState,
        item: CompletionItem,
    ) -> Result<CompletionItem> {
        Ok(item)
    }

    async fn do_hover(&self, _doc: &DocumentState, _position: Position) -> Result<Option<Hover>> {
        Ok(None)
    }

    async fn do_signature_help(
        &self,
        _doc: &DocumentState,
        _position: Position,
    ) -> Result<Option<SignatureHelp>> {
        Ok(None)
    }

    async fn find_document_highlight(
        &self,
        _doc: &DocumentState,
        _position: Position,
    ) -> Result<Vec<DocumentHighlight>> {
        Ok(Vec::new())
    }

    async fn find_document_symbols(&self, _doc: &DocumentState) -> Result<Vec<SymbolInformation>> {
        Ok(Vec::new())
    }

    async fn find_document_links(
        &self,
        _doc: &DocumentState,
        _context: &DocumentContext,
    ) -> Result<Vec<DocumentLink>> {
        Ok(Vec::new())
    }

    async fn find_definition(
        &self,
        _doc: &DocumentState,
        _position: Position,
    ) -> Result<Vec<Location>> {
        Ok(Vec::new())
    }

    async fn find_references(
        &self,
        _doc: &DocumentState,
        _position: Position,
    ) -> Result<Vec<Location>> {
        Ok(Vec::new())
    }

    async fn format(
        &self,
        _doc: &DocumentState,
        _range: Range,
        _options: &FormattingOptions,
        _settings: &Settings,
    ) -> Result<Vec<TextEdit>> {
        Ok(Vec::new())
    }

    async fn find_document_colors(&self, _doc: &DocumentState) -> Result<Vec<ColorInformation>> {
        Ok(Vec::new())
    }

    async fn get_color_presentations(
        &self,
        _doc: &DocumentState,
        _color: Color,
        _range: Range,
    ) -> Result<Vec<ColorPresentation>> {
        Ok(Vec::new())
    }

    /// Text to insert after the user typed `>` or `/`.
    async fn do_auto_close(
        &self,
        _doc: &DocumentState,
        _position: Position,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn do_rename(
        &self,
        _doc: &DocumentState,
        _position: Position,
        _new_name: &str,
    ) -> Result<Option<WorkspaceEdit>> {
        Ok(None)
    }

    /// Ranges that must change together with the one at `position`.
    async fn do_on_type_rename(
        &self,
        _doc: &DocumentState,
        _position: Position,
    ) -> Result<Option<Vec<Range>>> {
        Ok(None)
    }

    async fn get_folding_ranges(&self, _doc: &DocumentState) -> Result<Vec<FoldingRange>> {
        Ok(Vec::new())
    }

    /// One selection chain per position, index aligned.
    async fn get_selection_ranges(
        &self,
        _doc: &DocumentState,
        _positions: &[Position],
    ) -> Result<Vec<SelectionRange>> {
        Ok(Vec::new())
    }

    /// Legend the mode's semantic tokens are expressed in.
    fn semantic_token_legend(&self) -> Option<SemanticTokensLegend> {
        None
    }

    /// Tokens for the whole document in host coordinates.
    async fn get_semantic_tokens(&self, _doc: &DocumentState) -> Result<Vec<SemanticTokenData>> {
        Ok(Vec::new())
    }

    /// Drop anything cached for `uri`.
    fn on_document_removed(&self, _uri: &Url) {}

    fn dispose(&self) {}
}
