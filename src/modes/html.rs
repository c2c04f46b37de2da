//! Host mode: the HTML service over the whole document.

use async_trait::async_trait;
use tower_lsp::lsp_types::{
    CompletionList, DocumentHighlight, DocumentLink, FoldingRange, FormattingOptions, Hover,
    Position, Range, SelectionRange, SymbolInformation, TextEdit, WorkspaceEdit,
};

use crate::document::{DocumentState, LanguageId};
use crate::error::Result;
use crate::services::{html, indent_unit};
use crate::settings::Settings;

use super::{Capability, DocumentContext, LanguageMode};

const CAPABILITIES: &[Capability] = &[
    Capability::Completion,
    Capability::Hover,
    Capability::DocumentHighlight,
    Capability::DocumentSymbols,
    Capability::DocumentLinks,
    Capability::Format,
    Capability::AutoClose,
    Capability::Rename,
    Capability::OnTypeRename,
    Capability::FoldingRanges,
    Capability::SelectionRanges,
];

#[derive(Debug, Default)]
pub struct HtmlMode;

impl HtmlMode {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageMode for HtmlMode {
    fn id(&self) -> LanguageId {
        LanguageId::Html
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn do_complete(
        &self,
        doc: &DocumentState,
        position: Position,
        context: &DocumentContext,
        _settings: &Settings,
    ) -> Result<CompletionList> {
        Ok(html::complete(doc, doc.offset_at(position), context).await)
    }

    async fn do_hover(&self, doc: &DocumentState, position: Position) -> Result<Option<Hover>> {
        Ok(html::hover(doc, doc.offset_at(position)))
    }

    async fn find_document_highlight(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Vec<DocumentHighlight>> {
        Ok(html::highlights(doc, doc.offset_at(position)))
    }

    async fn find_document_symbols(&self, doc: &DocumentState) -> Result<Vec<SymbolInformation>> {
        Ok(html::symbols(doc))
    }

    async fn find_document_links(
        &self,
        doc: &DocumentState,
        context: &DocumentContext,
    ) -> Result<Vec<DocumentLink>> {
        Ok(html::links(doc, context))
    }

    async fn format(
        &self,
        doc: &DocumentState,
        range: Range,
        options: &FormattingOptions,
        settings: &Settings,
    ) -> Result<Vec<TextEdit>> {
        let span = doc.line_index().range_to_span(&range);
        let unit = indent_unit(options);
        Ok(html::format(doc, span, &unit, &settings.html_or_default()))
    }

    async fn do_auto_close(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Option<String>> {
        Ok(html::auto_close(doc, doc.offset_at(position)))
    }

    async fn do_rename(
        &self,
        doc: &DocumentState,
        position: Position,
        new_name: &str,
    ) -> Result<Option<WorkspaceEdit>> {
        Ok(html::rename(doc, doc.offset_at(position), new_name))
    }

    async fn do_on_type_rename(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Option<Vec<Range>>> {
        Ok(html::linked_editing(doc, doc.offset_at(position)))
    }

    async fn get_folding_ranges(&self, doc: &DocumentState) -> Result<Vec<FoldingRange>> {
        Ok(html::folding(doc))
    }

    async fn get_selection_ranges(
        &self,
        doc: &DocumentState,
        positions: &[Position],
    ) -> Result<Vec<SelectionRange>> {
        let offsets: Vec<usize> = positions.iter().map(|p| doc.offset_at(*p)).collect();
        Ok(html::selection_ranges(doc, &offsets))
    }
}
