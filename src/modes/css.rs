//! CSS mode over `<style>` content and `style` attributes.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tower_lsp::lsp_types::{
    Color, ColorInformation, ColorPresentation, CompletionItem, CompletionList, Diagnostic,
    DocumentHighlight, FoldingRange, FormattingOptions, Hover, Location, Position, Range,
    SelectionRange, SemanticTokensLegend, SymbolInformation, TextEdit, Url,
};

use crate::document::{DocumentState, EmbeddedDocument, LanguageId};
use crate::error::Result;
use crate::lsp::semantic_tokens::SemanticTokenData;
use crate::services::css::{self, CssAnalysis};
use crate::settings::Settings;

use super::{format_embedded, section_flag, Capability, DocumentContext, LanguageMode};

const CAPABILITIES: &[Capability] = &[
    Capability::Validation,
    Capability::Completion,
    Capability::CompletionResolve,
    Capability::Hover,
    Capability::DocumentHighlight,
    Capability::DocumentSymbols,
    Capability::Definition,
    Capability::References,
    Capability::Format,
    Capability::DocumentColors,
    Capability::ColorPresentations,
    Capability::FoldingRanges,
    Capability::SelectionRanges,
    Capability::SemanticTokens,
];

/// Stylesheet analyses are cached per document and reused while the version
/// does not change.
#[derive(Debug, Default)]
pub struct CssMode {
    analyses: DashMap<Url, (i32, Arc<CssAnalysis>)>,
}

impl CssMode {
    pub fn new() -> Self {
        Self::default()
    }

    fn analyze(&self, doc: &DocumentState) -> (Arc<EmbeddedDocument>, Arc<CssAnalysis>) {
        let embedded = doc.embedded(LanguageId::Css, false);
        if let Some(entry) = self.analyses.get(doc.uri()) {
            if entry.0 == doc.version() {
                return (embedded, Arc::clone(&entry.1));
            }
        }
        let analysis = Arc::new(CssAnalysis::new(embedded.text()));
        self.analyses
            .insert(doc.uri().clone(), (doc.version(), Arc::clone(&analysis)));
        (embedded, analysis)
    }
}

#[async_trait]
impl LanguageMode for CssMode {
    fn id(&self) -> LanguageId {
        LanguageId::Css
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn do_validation(
        &self,
        doc: &DocumentState,
        settings: &Settings,
    ) -> Result<Vec<Diagnostic>> {
        if !section_flag(settings, "css", "validate") {
            return Ok(Vec::new());
        }
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::validate(&embedded, &analysis))
    }

    async fn do_complete(
        &self,
        doc: &DocumentState,
        position: Position,
        _context: &DocumentContext,
        _settings: &Settings,
    ) -> Result<CompletionList> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::complete(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn do_resolve(
        &self,
        _doc: &DocumentState,
        item: CompletionItem,
    ) -> Result<CompletionItem> {
        Ok(css::resolve(item))
    }

    async fn do_hover(&self, doc: &DocumentState, position: Position) -> Result<Option<Hover>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::hover(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn find_document_highlight(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Vec<DocumentHighlight>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::highlights(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn find_document_symbols(&self, doc: &DocumentState) -> Result<Vec<SymbolInformation>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::symbols(&embedded, &analysis))
    }

    async fn find_definition(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Vec<Location>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::definition(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn find_references(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Vec<Location>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::references(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn format(
        &self,
        doc: &DocumentState,
        range: Range,
        options: &FormattingOptions,
        _settings: &Settings,
    ) -> Result<Vec<TextEdit>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(format_embedded(doc, &embedded, range, options, |span, block_start, base, unit| {
            css::format(&embedded, &analysis, span, block_start, base, unit)
        }))
    }

    async fn find_document_colors(&self, doc: &DocumentState) -> Result<Vec<ColorInformation>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::colors(&embedded, &analysis))
    }

    async fn get_color_presentations(
        &self,
        _doc: &DocumentState,
        color: Color,
        range: Range,
    ) -> Result<Vec<ColorPresentation>> {
        Ok(css::color_presentations(color, range))
    }

    async fn get_folding_ranges(&self, doc: &DocumentState) -> Result<Vec<FoldingRange>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::folding(&embedded, &analysis))
    }

    async fn get_selection_ranges(
        &self,
        doc: &DocumentState,
        positions: &[Position],
    ) -> Result<Vec<SelectionRange>> {
        let (embedded, analysis) = self.analyze(doc);
        let offsets: Vec<usize> = positions.iter().map(|p| embedded.offset_at(*p)).collect();
        Ok(css::selection_ranges(&embedded, &analysis, &offsets))
    }

    fn semantic_token_legend(&self) -> Option<SemanticTokensLegend> {
        Some(css::legend())
    }

    async fn get_semantic_tokens(&self, doc: &DocumentState) -> Result<Vec<SemanticTokenData>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(css::semantic_tokens(&embedded, &analysis))
    }

    fn on_document_removed(&self, uri: &Url) {
        self.analyses.remove(uri);
    }

    fn dispose(&self) {
        self.analyses.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(version: i32, text: &str) -> DocumentState {
        DocumentState::new(Url::parse("file:///s.html").unwrap(), "html", version, text.to_string())
    }

    #[tokio::test]
    async fn analysis_is_reused_per_version() {
        let mode = CssMode::new();
        let first = doc(1, "<style>a{color:red}</style>");
        let (_, a) = mode.analyze(&first);
        let (_, b) = mode.analyze(&first);
        assert!(Arc::ptr_eq(&a, &b));

        let second = doc(2, "<style>a{color:blue}</style>");
        let (_, c) = mode.analyze(&second);
        assert!(!Arc::ptr_eq(&a, &c));

        mode.on_document_removed(second.uri());
        assert!(mode.analyses.is_empty());
    }

    #[tokio::test]
    async fn validation_can_be_switched_off() {
        let mode = CssMode::new();
        let doc = doc(1, "<style>a{colr:red}</style>");
        let on = mode.do_validation(&doc, &Settings::default()).await.unwrap();
        assert_eq!(on.len(), 1);

        let settings = Settings {
            css: Some(json!({ "validate": false })),
            ..Default::default()
        };
        let off = mode.do_validation(&doc, &settings).await.unwrap();
        assert!(off.is_empty());
    }

    #[tokio::test]
    async fn formats_style_block_relative_to_tag() {
        let mode = CssMode::new();
        let text = "<div>\n  <style>\na {\ncolor: red;\n}\n  </style>\n</div>";
        let doc = doc(1, text);
        let options = FormattingOptions {
            tab_size: 2,
            insert_spaces: true,
            ..Default::default()
        };
        let edits = mode
            .format(&doc, doc.line_index().full_range(), &options, &Settings::default())
            .await
            .unwrap();
        let summary: Vec<_> = edits
            .iter()
            .map(|e| (e.range.start.line, e.new_text.as_str()))
            .collect();
        assert_eq!(summary, vec![(2, "    "), (3, "      "), (4, "    ")]);
    }
}
