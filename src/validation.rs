//! Debounced, cancellable re-validation.
//!
//! Each document has at most one pending validation. Scheduling again cancels
//! the previous one, so a burst of edits validates once, `delay` after the
//! last edit.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tower_lsp::lsp_types::{Diagnostic, Url};

use crate::document::LanguageId;
use crate::settings::HtmlSettings;

/// Time between the last edit and the validation run.
pub const VALIDATION_DELAY: Duration = Duration::from_millis(500);

/// Receiver of published diagnostics (the client's
/// `textDocument/publishDiagnostics`).
#[async_trait]
pub trait DiagnosticsSink: Send + Sync {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);
}

#[derive(Debug)]
struct PendingValidation {
    generation: u64,
    /// Dropping the sender cancels the timer.
    _cancel: oneshot::Sender<()>,
}

/// Per-document debounce timers.
#[derive(Debug)]
pub struct ValidationScheduler {
    delay: Duration,
    pending: Arc<DashMap<Url, PendingValidation>>,
    generation: AtomicU64,
}

impl Default for ValidationScheduler {
    fn default() -> Self {
        Self::new(VALIDATION_DELAY)
    }
}

impl ValidationScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(DashMap::new()),
            generation: AtomicU64::new(0),
        }
    }

    /// Arm the timer for `uri`, replacing any pending one. `run` is awaited
    /// when the timer fires.
    pub fn schedule<F>(&self, uri: Url, run: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let (cancel, cancelled) = oneshot::channel::<()>();
        if self
            .pending
            .insert(
                uri.clone(),
                PendingValidation {
                    generation,
                    _cancel: cancel,
                },
            )
            .is_some()
        {
            tracing::debug!(%uri, "replaced pending validation");
        }

        let pending = Arc::clone(&self.pending);
        let delay = self.delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled => {}
                _ = tokio::time::sleep(delay) => {
                    pending.remove_if(&uri, |_, p| p.generation == generation);
                    run.await;
                }
            }
        });
    }

    /// Drop the pending timer of `uri`, if any.
    pub fn cancel(&self, uri: &Url) {
        if self.pending.remove(uri).is_some() {
            tracing::debug!(%uri, "cancelled pending validation");
        }
    }

    /// Drop every pending timer.
    pub fn cancel_all(&self) {
        self.pending.clear();
    }

    pub fn is_pending(&self, uri: &Url) -> bool {
        self.pending.contains_key(uri)
    }
}

/// `html.validate.styles` / `html.validate.scripts` gate the embedded modes.
pub fn is_validation_enabled(language: LanguageId, settings: &HtmlSettings) -> bool {
    match language {
        LanguageId::Css => settings.validate.styles,
        LanguageId::JavaScript | LanguageId::TypeScript => settings.validate.scripts,
        LanguageId::Html => true,
    }
}
