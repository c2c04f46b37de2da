//! Document state management for the HTML LSP.

use std::sync::{Arc, OnceLock};

use dashmap::DashMap;
use tower_lsp::lsp_types::{Position, TextDocumentContentChangeEvent, Url};

use crate::html::{self, HtmlDocument};

use super::embedded::EmbeddedDocument;
use super::region::{DocumentRegions, LanguageId};
use super::text::{apply_content_changes, LineIndex};

/// Snapshot of one open document at one version.
///
/// The parse tree, regions and embedded documents are computed on first use
/// and live as long as the snapshot. An edit produces a fresh snapshot, so
/// nothing here ever needs invalidation.
#[derive(Debug)]
pub struct DocumentState {
    uri: Url,
    language_id: String,
    /// Document version from the client.
    version: i32,
    /// Pre-computed line index, shared with embedded documents.
    line_index: Arc<LineIndex>,
    html: OnceLock<HtmlDocument>,
    regions: OnceLock<DocumentRegions>,
    embedded: DashMap<(LanguageId, bool), Arc<EmbeddedDocument>>,
}

impl DocumentState {
    pub fn new(uri: Url, language_id: impl Into<String>, version: i32, text: String) -> Self {
        Self {
            uri,
            language_id: language_id.into(),
            version,
            line_index: Arc::new(LineIndex::new(text)),
            html: OnceLock::new(),
            regions: OnceLock::new(),
            embedded: DashMap::new(),
        }
    }

    pub fn uri(&self) -> &Url {
        &self.uri
    }

    pub fn language_id(&self) -> &str {
        &self.language_id
    }

    pub fn version(&self) -> i32 {
        self.version
    }

    pub fn text(&self) -> &str {
        self.line_index.source()
    }

    pub fn line_index(&self) -> &LineIndex {
        &self.line_index
    }

    /// Parsed element tree.
    pub fn html_document(&self) -> &HtmlDocument {
        self.html.get_or_init(|| html::parse(self.text()))
    }

    /// Language regions, sorted by start offset.
    pub fn regions(&self) -> &DocumentRegions {
        self.regions
            .get_or_init(|| DocumentRegions::new(self.html_document()))
    }

    /// Embedded document for `language`, built once per snapshot.
    pub fn embedded(
        &self,
        language: LanguageId,
        ignore_attribute_values: bool,
    ) -> Arc<EmbeddedDocument> {
        let key = (language, ignore_attribute_values);
        if let Some(doc) = self.embedded.get(&key) {
            return Arc::clone(&doc);
        }
        let doc = Arc::new(EmbeddedDocument::build(
            self.uri.clone(),
            self.version,
            Arc::clone(&self.line_index),
            self.regions(),
            language,
            ignore_attribute_values,
        ));
        Arc::clone(self.embedded.entry(key).or_insert(doc).value())
    }

    pub fn offset_at(&self, position: Position) -> usize {
        self.line_index.clamped_offset(position)
    }

    pub fn position_at(&self, offset: usize) -> Position {
        self.line_index.offset_to_position(offset)
    }
}

/// Thread-safe storage for open documents.
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: DashMap<Url, Arc<DocumentState>>,
}

impl DocumentStore {
    /// Create a new empty document store.
    pub fn new() -> Self {
        Self {
            documents: DashMap::new(),
        }
    }

    /// Open or replace a document.
    pub fn open(
        &self,
        uri: Url,
        language_id: &str,
        version: i32,
        text: String,
    ) -> Arc<DocumentState> {
        let state = Arc::new(DocumentState::new(uri.clone(), language_id, version, text));
        self.documents.insert(uri, Arc::clone(&state));
        state
    }

    /// Apply incremental changes, producing a new snapshot.
    ///
    /// Returns `None` when the document is not open.
    pub fn change(
        &self,
        uri: &Url,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) -> Option<Arc<DocumentState>> {
        let mut entry = self.documents.get_mut(uri)?;
        let text = apply_content_changes(entry.text(), changes);
        let state = Arc::new(DocumentState::new(
            uri.clone(),
            entry.language_id(),
            version,
            text,
        ));
        *entry = Arc::clone(&state);
        Some(state)
    }

    /// Close a document, returning its last snapshot.
    pub fn close(&self, uri: &Url) -> Option<Arc<DocumentState>> {
        self.documents.remove(uri).map(|(_, state)| state)
    }

    /// Get a document's state.
    pub fn get(&self, uri: &Url) -> Option<Arc<DocumentState>> {
        self.documents.get(uri).map(|r| Arc::clone(&r))
    }

    /// Snapshots of every open document.
    pub fn all(&self) -> Vec<Arc<DocumentState>> {
        self.documents.iter().map(|r| Arc::clone(r.value())).collect()
    }
}
