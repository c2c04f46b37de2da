//! Session state shared by every request handler.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use tokio::sync::watch;
use tower_lsp::lsp_types::{Diagnostic, TextDocumentContentChangeEvent, Url};

use crate::document::{DocumentState, DocumentStore};
use crate::error::Result;
use crate::lsp::SemanticTokenProvider;
use crate::modes::{Capability, DocumentContext, LanguageModes};
use crate::runner::{run_safe, CancellationToken};
use crate::settings::{EmbeddedLanguages, Settings, SettingsCache, SettingsSource};
use crate::validation::{
    is_validation_enabled, DiagnosticsSink, ValidationScheduler, VALIDATION_DELAY,
};

/// What `initialize` negotiated.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub embedded: EmbeddedLanguages,
    /// Defaults used until the client sends its configuration.
    pub global_settings: Settings,
    /// The client answers `workspace/configuration`.
    pub scoped_settings: bool,
    pub workspace_folders: Vec<Url>,
    /// Client `foldingRange.rangeLimit`.
    pub folding_limit: Option<usize>,
    pub validation_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            embedded: EmbeddedLanguages {
                css: true,
                javascript: true,
            },
            global_settings: Settings::default(),
            scoped_settings: false,
            workspace_folders: Vec::new(),
            folding_limit: None,
            validation_delay: VALIDATION_DELAY,
        }
    }
}

/// Documents, modes, settings and the validation pipeline of one session.
pub struct ServerContext {
    documents: DocumentStore,
    modes: LanguageModes,
    settings: SettingsCache,
    scheduler: ValidationScheduler,
    semantic_tokens: SemanticTokenProvider,
    source: Arc<dyn SettingsSource>,
    sink: Arc<dyn DiagnosticsSink>,
    workspace_folders: RwLock<Vec<Url>>,
    folding_limit: Option<usize>,
    shutdown: watch::Sender<bool>,
}

impl ServerContext {
    pub fn new(
        config: ServerConfig,
        source: Arc<dyn SettingsSource>,
        sink: Arc<dyn DiagnosticsSink>,
    ) -> Self {
        let modes = LanguageModes::new(&config.embedded);
        let semantic_tokens = SemanticTokenProvider::new(&modes);
        let settings = SettingsCache::new(config.global_settings);
        settings.set_scoped_support(config.scoped_settings);
        let (shutdown, _) = watch::channel(false);
        Self {
            documents: DocumentStore::new(),
            modes,
            settings,
            scheduler: ValidationScheduler::new(config.validation_delay),
            semantic_tokens,
            source,
            sink,
            workspace_folders: RwLock::new(config.workspace_folders),
            folding_limit: config.folding_limit,
            shutdown,
        }
    }

    pub fn documents(&self) -> &DocumentStore {
        &self.documents
    }

    pub fn modes(&self) -> &LanguageModes {
        &self.modes
    }

    pub fn semantic_tokens(&self) -> &SemanticTokenProvider {
        &self.semantic_tokens
    }

    pub fn folding_limit(&self) -> Option<usize> {
        self.folding_limit
    }

    pub fn global_settings(&self) -> Settings {
        self.settings.global()
    }

    /// Token that fires when the session shuts down.
    pub fn token(&self) -> CancellationToken {
        CancellationToken::new(self.shutdown.subscribe())
    }

    pub fn workspace_folders(&self) -> Vec<Url> {
        self.workspace_folders
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn document_context(&self, uri: &Url) -> DocumentContext {
        DocumentContext::new(uri.clone(), self.workspace_folders())
    }

    pub fn open(self: &Arc<Self>, uri: Url, language_id: &str, version: i32, text: String) {
        self.documents.open(uri.clone(), language_id, version, text);
        self.trigger_validation(uri);
    }

    pub fn change(
        self: &Arc<Self>,
        uri: Url,
        version: i32,
        changes: &[TextDocumentContentChangeEvent],
    ) {
        if self.documents.change(&uri, version, changes).is_none() {
            tracing::warn!(%uri, "change for a document that is not open");
            return;
        }
        self.trigger_validation(uri);
    }

    /// Forget `uri` everywhere and clear its diagnostics.
    pub async fn close(&self, uri: &Url) {
        self.scheduler.cancel(uri);
        self.documents.close(uri);
        self.settings.remove(uri);
        self.modes.on_document_removed(uri);
        self.sink.publish(uri.clone(), Vec::new(), None).await;
    }

    /// (Re)arm the debounce timer of `uri`.
    pub fn trigger_validation(self: &Arc<Self>, uri: Url) {
        let context = Arc::clone(self);
        let target = uri.clone();
        self.scheduler.schedule(uri, async move {
            context.validate(&target).await;
        });
    }

    pub fn revalidate_all(self: &Arc<Self>) {
        for doc in self.documents.all() {
            self.trigger_validation(doc.uri().clone());
        }
    }

    /// Replace the client configuration and re-validate everything.
    pub fn set_global_settings(self: &Arc<Self>, settings: Settings) {
        self.settings.set_global(settings);
        self.revalidate_all();
    }

    /// Apply a workspace folder change: removed and re-added folders are
    /// dropped from the current list, added ones appended.
    pub fn change_workspace_folders(self: &Arc<Self>, added: Vec<Url>, removed: &[Url]) {
        {
            let mut folders = self.workspace_folders.write().unwrap_or_else(|e| e.into_inner());
            folders.retain(|f| !removed.contains(f) && !added.contains(f));
            folders.extend(added);
        }
        self.revalidate_all();
    }

    /// Document-scoped settings, or the global ones when the client has none
    /// to offer or the fetch fails.
    pub async fn settings_for(&self, uri: &Url, needed: bool) -> Settings {
        match self
            .settings
            .document_settings(uri, self.source.as_ref(), needed)
            .await
        {
            Ok(Some(settings)) => settings,
            Ok(None) => self.settings.global(),
            Err(e) => {
                tracing::warn!(%uri, error = %e, "falling back to global settings");
                self.settings.global()
            }
        }
    }

    fn is_current(&self, uri: &Url, version: i32) -> bool {
        self.documents
            .get(uri)
            .is_some_and(|doc| doc.version() == version)
    }

    /// Validate `uri` now and publish, unless the document changed or closed
    /// meanwhile.
    pub async fn validate(&self, uri: &Url) {
        let token = self.token();
        if let Some((diagnostics, version)) =
            run_safe("validation", uri, &token, None, self.collect_diagnostics(uri)).await
        {
            self.sink.publish(uri.clone(), diagnostics, Some(version)).await;
        }
    }

    async fn collect_diagnostics(&self, uri: &Url) -> Result<Option<(Vec<Diagnostic>, i32)>> {
        let Some(doc) = self.documents.get(uri) else {
            return Ok(None);
        };
        if doc.language_id() != "html" {
            return Ok(None);
        }
        let version = doc.version();
        let modes = self.modes.all_modes_in_document(&doc);
        let needed = modes.iter().any(|m| m.supports(Capability::Validation));
        let settings = self
            .settings
            .document_settings(uri, self.source.as_ref(), needed)
            .await?
            .unwrap_or_else(|| self.settings.global());
        if !self.is_current(uri, version) {
            tracing::debug!(%uri, version, "document changed during settings fetch");
            return Ok(None);
        }

        let html = settings.html_or_default();
        let mut diagnostics = Vec::new();
        for mode in modes {
            if mode.supports(Capability::Validation) && is_validation_enabled(mode.id(), &html) {
                diagnostics.extend(mode.do_validation(&doc, &settings).await?);
            }
        }
        if !self.is_current(uri, version) {
            tracing::debug!(%uri, version, "document changed during validation");
            return Ok(None);
        }
        Ok(Some((diagnostics, version)))
    }

    /// Snapshot of an open document.
    pub fn document(&self, uri: &Url) -> Option<Arc<DocumentState>> {
        self.documents.get(uri)
    }

    /// Cancel in-flight work, drop pending validations and release mode
    /// caches.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.scheduler.cancel_all();
        self.modes.dispose();
        tracing::info!("session disposed");
    }
}
