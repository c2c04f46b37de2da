//! Script mode over `<script>` content and event handler attributes.
//!
//! One instance serves `javascript` regions and a second one `text/typescript`
//! scripts; both run the same service.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use tower_lsp::lsp_types::{
    CompletionList, Diagnostic, DocumentHighlight, FoldingRange, FormattingOptions, Hover, Location,
    Position, Range, SelectionRange, SemanticTokensLegend, SignatureHelp, SymbolInformation,
    TextEdit, Url,
};

use crate::document::{DocumentState, EmbeddedDocument, LanguageId};
use crate::error::Result;
use crate::lsp::semantic_tokens::SemanticTokenData;
use crate::services::script::{self, ScriptAnalysis};
use crate::settings::Settings;

use super::{format_embedded, section_flag, Capability, DocumentContext, LanguageMode};

const CAPABILITIES: &[Capability] = &[
    Capability::Validation,
    Capability::Completion,
    Capability::Hover,
    Capability::SignatureHelp,
    Capability::DocumentHighlight,
    Capability::DocumentSymbols,
    Capability::Definition,
    Capability::References,
    Capability::Format,
    Capability::FoldingRanges,
    Capability::SelectionRanges,
    Capability::SemanticTokens,
];

#[derive(Debug)]
pub struct JavaScriptMode {
    language: LanguageId,
    analyses: DashMap<Url, (i32, Arc<ScriptAnalysis>)>,
}

impl JavaScriptMode {
    pub fn new(language: LanguageId) -> Self {
        Self {
            language,
            analyses: DashMap::new(),
        }
    }

    fn analyze(&self, doc: &DocumentState) -> (Arc<EmbeddedDocument>, Arc<ScriptAnalysis>) {
        let embedded = doc.embedded(self.language, false);
        if let Some(entry) = self.analyses.get(doc.uri()) {
            if entry.0 == doc.version() {
                return (embedded, Arc::clone(&entry.1));
            }
        }
        let analysis = Arc::new(ScriptAnalysis::new(embedded.text()));
        self.analyses
            .insert(doc.uri().clone(), (doc.version(), Arc::clone(&analysis)));
        (embedded, analysis)
    }
}

#[async_trait]
impl LanguageMode for JavaScriptMode {
    fn id(&self) -> LanguageId {
        self.language
    }

    fn capabilities(&self) -> &'static [Capability] {
        CAPABILITIES
    }

    async fn do_validation(
        &self,
        doc: &DocumentState,
        settings: &Settings,
    ) -> Result<Vec<Diagnostic>> {
        if !section_flag(settings, "javascript", "validate") {
            return Ok(Vec::new());
        }
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::validate(&embedded, &analysis))
    }

    async fn do_complete(
        &self,
        doc: &DocumentState,
        position: Position,
        _context: &DocumentContext,
        _settings: &Settings,
    ) -> Result<CompletionList> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::complete(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn do_hover(&self, doc: &DocumentState, position: Position) -> Result<Option<Hover>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::hover(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn do_signature_help(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Option<SignatureHelp>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::signature_help(&analysis, embedded.offset_at(position)))
    }

    async fn find_document_highlight(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Vec<DocumentHighlight>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::highlights(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn find_document_symbols(&self, doc: &DocumentState) -> Result<Vec<SymbolInformation>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::symbols(&embedded, &analysis))
    }

    async fn find_definition(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Vec<Location>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::definition(&embedded, &analysis, embedded.offset_at(position)))
    }

    async fn find_references(
        &self,
        doc: &DocumentState,
        position: Position,
    ) -> Result<Vec<Location>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::references(&embedded, &analysis, embedded.offset_at(position)))
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
            script::format(&embedded, &analysis, span, block_start, base, unit)
        }))
    }

    async fn get_folding_ranges(&self, doc: &DocumentState) -> Result<Vec<FoldingRange>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::folding(&embedded, &analysis))
    }

    async fn get_selection_ranges(
        &self,
        doc: &DocumentState,
        positions: &[Position],
    ) -> Result<Vec<SelectionRange>> {
        let (embedded, analysis) = self.analyze(doc);
        let offsets: Vec<usize> = positions.iter().map(|p| embedded.offset_at(*p)).collect();
        Ok(script::selection_ranges(&embedded, &analysis, &offsets))
    }

    fn semantic_token_legend(&self) -> Option<SemanticTokensLegend> {
        Some(script::legend())
    }

    async fn get_semantic_tokens(&self, doc: &DocumentState) -> Result<Vec<SemanticTokenData>> {
        let (embedded, analysis) = self.analyze(doc);
        Ok(script::semantic_tokens(&embedded, &analysis))
    }

    fn on_document_removed(&self, uri: &Url) {
        self.analyses.remove(uri);
    }

    fn dispose(&self) {
        self.analyses.clear();
    }
}
