//! Settings infrastructure for htmlsp.
//!
//! Settings come from three places, in increasing priority:
//! - built-in defaults
//! - an `htmlsp.toml` found by walking up from the workspace root
//! - the client, through `workspace/didChangeConfiguration` and scoped
//!   `workspace/configuration` requests
//!
//! Each section (`css`, `html`, `javascript`) is kept as raw JSON so that
//! language modes can read whatever they understand. The HTML section also
//! has a typed view of the keys the server itself acts on.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Deserialize;
use serde_json::Value;
use tower_lsp::lsp_types::Url;

use crate::error::{Error, Result};

/// Name of the server defaults file.
pub const SETTINGS_FILE: &str = "htmlsp.toml";

/// Configuration sections requested from the client, in this order.
pub const SECTIONS: [&str; 3] = ["css", "html", "javascript"];

/// Settings snapshot: one raw JSON value per section.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Settings {
    pub css: Option<Value>,
    pub html: Option<Value>,
    pub javascript: Option<Value>,
}

/// The part of the `html` section the server acts on.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct HtmlSettings {
    pub validate: ValidateSettings,
    pub format: FormatSettings,
}

/// `html.validate.*`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ValidateSettings {
    /// Validate embedded styles.
    pub styles: bool,
    /// Validate embedded scripts.
    pub scripts: bool,
}

impl Default for ValidateSettings {
    fn default() -> Self {
        Self {
            styles: true,
            scripts: true,
        }
    }
}

/// `html.format.*`
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct FormatSettings {
    /// Whether the range formatter should be registered.
    pub enable: bool,
    /// Comma separated list of tags whose content is left alone.
    pub unformatted: Option<String>,
}

impl Default for FormatSettings {
    fn default() -> Self {
        Self {
            enable: true,
            unformatted: None,
        }
    }
}

impl FormatSettings {
    /// `true` when `tag` is listed in `unformatted`.
    pub fn is_unformatted(&self, tag: &str) -> bool {
        self.unformatted.as_deref().is_some_and(|list| {
            list.split(',')
                .any(|t| t.trim().eq_ignore_ascii_case(tag))
        })
    }
}

impl Settings {
    /// Build a snapshot from values answered in [`SECTIONS`] order.
    pub fn from_sections(values: Vec<Value>) -> Self {
        let mut values = values.into_iter().map(|v| (!v.is_null()).then_some(v));
        Self {
            css: values.next().flatten(),
            html: values.next().flatten(),
            javascript: values.next().flatten(),
        }
    }

    /// Build a snapshot from a `didChangeConfiguration` payload, which holds
    /// all sections in one object.
    pub fn from_value(value: &Value) -> Self {
        let section = |name: &str| value.get(name).filter(|v| !v.is_null()).cloned();
        Self {
            css: section("css"),
            html: section("html"),
            javascript: section("javascript"),
        }
    }

    /// Raw value of a section.
    pub fn section(&self, name: &str) -> Option<&Value> {
        match name {
            "css" => self.css.as_ref(),
            "html" => self.html.as_ref(),
            "javascript" => self.javascript.as_ref(),
            _ => None,
        }
    }

    /// Typed view of the `html` section.
    pub fn html_settings(&self) -> Result<HtmlSettings> {
        match &self.html {
            Some(value) => HtmlSettings::deserialize(value).map_err(|source| Error::Settings {
                section: "html".to_string(),
                source,
            }),
            None => Ok(HtmlSettings::default()),
        }
    }

    /// Typed view of the `html` section, falling back to defaults when the
    /// section is malformed.
    pub fn html_or_default(&self) -> HtmlSettings {
        self.html_settings().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default html settings");
            HtmlSettings::default()
        })
    }
}

/// Options passed in `initialize`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InitializationOptions {
    /// Which embedded languages get a language mode.
    pub embedded_languages: Option<EmbeddedLanguages>,
    /// `true` or `false` pins the range formatter on or off. Any other value
    /// leaves it to dynamic registration.
    pub provide_formatter: Option<Value>,
}

/// `embeddedLanguages` initialization option.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct EmbeddedLanguages {
    pub css: bool,
    pub javascript: bool,
}

impl InitializationOptions {
    /// Decode the `initializationOptions` payload. A malformed payload is
    /// logged and treated as absent.
    pub fn from_value(value: Option<Value>) -> Self {
        let Some(value) = value else {
            return Self::default();
        };
        Self::deserialize(value).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "ignoring malformed initialization options");
            Self::default()
        })
    }

    /// Enabled embedded languages; both when the option is absent.
    pub fn embedded_languages(&self) -> EmbeddedLanguages {
        self.embedded_languages.clone().unwrap_or(EmbeddedLanguages {
            css: true,
            javascript: true,
        })
    }

    /// `Some` when the client pinned the range formatter with a boolean.
    pub fn provide_formatter(&self) -> Option<bool> {
        self.provide_formatter.as_ref().and_then(Value::as_bool)
    }
}

/// Source of document-scoped configuration (the client's
/// `workspace/configuration` request).
#[async_trait]
pub trait SettingsSource: Send + Sync {
    /// Fetch `sections` for `scope`, answered in request order.
    async fn fetch(&self, scope: &Url, sections: &[&str]) -> Result<Vec<Value>>;
}

/// Global and per-document settings.
#[derive(Debug, Default)]
pub struct SettingsCache {
    global: RwLock<Settings>,
    documents: DashMap<Url, Settings>,
    scoped: AtomicBool,
    /// Bumped on every invalidation; a fetch that saw a bump is not cached.
    generation: AtomicU64,
}

impl SettingsCache {
    pub fn new(global: Settings) -> Self {
        Self {
            global: RwLock::new(global),
            documents: DashMap::new(),
            scoped: AtomicBool::new(false),
            generation: AtomicU64::new(0),
        }
    }

    /// Enable per-document fetches once the client advertises
    /// `workspace.configuration`.
    pub fn set_scoped_support(&self, supported: bool) {
        self.scoped.store(supported, Ordering::Relaxed);
    }

    pub fn global(&self) -> Settings {
        self.global
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Replace the global settings and drop every per-document snapshot.
    pub fn set_global(&self, settings: Settings) {
        *self.global.write().unwrap_or_else(|e| e.into_inner()) = settings;
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.documents.clear();
    }

    /// Drop the snapshot of one document.
    pub fn remove(&self, uri: &Url) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.documents.remove(uri);
    }

    /// Settings for one document.
    ///
    /// Returns `None` when `needed` is false. Without scoped configuration
    /// support this is the global snapshot; otherwise the client is asked
    /// once per document and the answer cached until invalidated. An answer
    /// that arrives after an invalidation is returned but not cached.
    pub async fn document_settings(
        &self,
        uri: &Url,
        source: &dyn SettingsSource,
        needed: bool,
    ) -> Result<Option<Settings>> {
        if !needed {
            return Ok(None);
        }
        if !self.scoped.load(Ordering::Relaxed) {
            return Ok(Some(self.global()));
        }
        if let Some(cached) = self.documents.get(uri) {
            return Ok(Some(cached.clone()));
        }
        let generation = self.generation.load(Ordering::SeqCst);
        let values = source.fetch(uri, &SECTIONS).await?;
        let settings = Settings::from_sections(values);
        if let Entry::Vacant(entry) = self.documents.entry(uri.clone()) {
            if self.generation.load(Ordering::SeqCst) == generation {
                entry.insert(settings.clone());
            } else {
                tracing::debug!(%uri, "settings invalidated during fetch");
            }
        }
        Ok(Some(settings))
    }
}

/// Load settings from an `htmlsp.toml` file.
pub fn load_settings(path: &Path) -> Result<Settings> {
    let content = std::fs::read_to_string(path).map_err(|source| Error::SettingsFile {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&content).map_err(|source| Error::SettingsParse {
        path: path.to_path_buf(),
        source,
    })
}

/// Discover `htmlsp.toml` by walking up from `start_dir`.
///
/// Returns the settings and the file they came from. A missing file gives the
/// defaults; an unreadable or malformed one is logged and also gives the
/// defaults.
pub fn discover_settings(start_dir: &Path) -> (Settings, Option<PathBuf>) {
    let mut current = Some(start_dir);
    while let Some(dir) = current {
        let candidate = dir.join(SETTINGS_FILE);
        if candidate.is_file() {
            return match load_settings(&candidate) {
                Ok(settings) => (settings, Some(candidate)),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring settings file");
                    (Settings::default(), None)
                }
            };
        }
        current = dir.parent();
    }
    (Settings::default(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn html_settings_defaults() {
        let html = Settings::default().html_settings().unwrap();
        assert!(html.validate.styles);
        assert!(html.validate.scripts);
        assert!(html.format.enable);
        assert_eq!(html.format.unformatted, None);
    }

    #[test]
    fn html_settings_partial_section() {
        let settings = Settings::from_value(&json!({
            "html": { "validate": { "scripts": false }, "format": { "unformatted": "wbr, Style" } },
            "css": { "lint": { "zeroUnits": "warning" } }
        }));
        let html = settings.html_settings().unwrap();
        assert!(html.validate.styles);
        assert!(!html.validate.scripts);
        assert!(html.format.is_unformatted("style"));
        assert!(!html.format.is_unformatted("script"));
        assert_eq!(settings.section("css"), Some(&json!({ "lint": { "zeroUnits": "warning" } })));
        assert!(settings.javascript.is_none());
    }

    #[test]
    fn malformed_html_section_is_an_error() {
        let settings =
            Settings::from_value(&json!({ "html": { "validate": { "styles": "yes" } } }));
        let err = settings.html_settings().unwrap_err();
        assert!(matches!(err, Error::Settings { ref section, .. } if section.as_str() == "html"));
        assert!(settings.html_or_default().validate.styles);
    }

    #[test]
    fn from_sections_skips_nulls() {
        let settings =
            Settings::from_sections(vec![Value::Null, json!({ "format": { "enable": false } })]);
        assert!(settings.css.is_none());
        assert!(!settings.html_settings().unwrap().format.enable);
        assert!(settings.javascript.is_none());
    }

    #[test]
    fn initialization_options() {
        let options = InitializationOptions::from_value(None);
        assert_eq!(
            options.embedded_languages(),
            EmbeddedLanguages { css: true, javascript: true }
        );
        assert_eq!(options.provide_formatter(), None);

        let options = InitializationOptions::from_value(Some(json!({
            "embeddedLanguages": { "css": true },
            "provideFormatter": false
        })));
        assert_eq!(
            options.embedded_languages(),
            EmbeddedLanguages { css: true, javascript: false }
        );
        assert_eq!(options.provide_formatter(), Some(false));

        let options =
            InitializationOptions::from_value(Some(json!({ "provideFormatter": "auto" })));
        assert_eq!(options.provide_formatter(), None);
    }

    struct CountingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SettingsSource for CountingSource {
        async fn fetch(&self, _scope: &Url, sections: &[&str]) -> Result<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(sections, &SECTIONS);
            Ok(vec![Value::Null, json!({ "validate": { "styles": false } }), Value::Null])
        }
    }

    #[tokio::test]
    async fn document_settings_are_cached_per_uri() {
        let cache = SettingsCache::new(Settings::default());
        let source = Arc::new(CountingSource { calls: AtomicUsize::new(0) });
        let uri = Url::parse("file:///a.html").unwrap();

        assert_eq!(cache.document_settings(&uri, source.as_ref(), false).await.unwrap(), None);

        let global = cache.document_settings(&uri, source.as_ref(), true).await.unwrap();
        assert_eq!(global, Some(Settings::default()));
        assert_eq!(source.calls.load(Ordering::SeqCst), 0);

        cache.set_scoped_support(true);
        let scoped = cache
            .document_settings(&uri, source.as_ref(), true)
            .await
            .unwrap()
            .unwrap();
        assert!(!scoped.html_settings().unwrap().validate.styles);
        cache.document_settings(&uri, source.as_ref(), true).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 1);

        cache.remove(&uri);
        cache.document_settings(&uri, source.as_ref(), true).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        cache.set_global(Settings::default());
        cache.document_settings(&uri, source.as_ref(), true).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    struct SlowSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl SettingsSource for SlowSource {
        async fn fetch(&self, _scope: &Url, sections: &[&str]) -> Result<Vec<Value>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            Ok(vec![Value::Null; sections.len()])
        }
    }

    #[tokio::test(start_paused = true)]
    async fn answers_arriving_after_invalidation_are_not_cached() {
        let cache = SettingsCache::new(Settings::default());
        cache.set_scoped_support(true);
        let source = SlowSource { calls: AtomicUsize::new(0) };
        let uri = Url::parse("file:///a.html").unwrap();
        let later = || tokio::time::sleep(Duration::from_millis(50));

        let (fetched, ()) = tokio::join!(cache.document_settings(&uri, &source, true), async {
            later().await;
            cache.remove(&uri);
        });
        assert_eq!(fetched.unwrap(), Some(Settings::default()));
        assert!(cache.documents.is_empty());

        let disabled = Settings::from_value(&json!({ "html": { "format": { "enable": false } } }));
        let (fetched, ()) = tokio::join!(cache.document_settings(&uri, &source, true), async {
            later().await;
            cache.set_global(disabled.clone());
        });
        assert!(fetched.unwrap().is_some());
        assert!(cache.documents.is_empty());
        assert_eq!(cache.global(), disabled);
        assert_eq!(source.calls.load(Ordering::SeqCst), 2);

        cache.document_settings(&uri, &source, true).await.unwrap();
        cache.document_settings(&uri, &source, true).await.unwrap();
        assert_eq!(source.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn discover_settings_in_parent_dir() {
        let parent = tempfile::tempdir().unwrap();
        let child = parent.path().join("site").join("pages");
        std::fs::create_dir_all(&child).unwrap();
        std::fs::write(
            parent.path().join(SETTINGS_FILE),
            r#"
[html.validate]
scripts = false

[html.format]
unformatted = "pre"
"#,
        )
        .unwrap();

        let (settings, path) = discover_settings(&child);
        assert_eq!(path, Some(parent.path().join(SETTINGS_FILE)));
        let html = settings.html_settings().unwrap();
        assert!(!html.validate.scripts);
        assert!(html.format.is_unformatted("pre"));
    }

    #[test]
    fn discover_settings_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (settings, path) = discover_settings(dir.path());
        // A file further up the real tree would be picked up too; only check
        // that nothing inside the temp dir was invented.
        if path.is_none() {
            assert_eq!(settings, Settings::default());
        }
    }

    #[test]
    fn malformed_settings_file_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(SETTINGS_FILE);
        std::fs::write(&path, "[html\n").unwrap();
        let err = load_settings(&path).unwrap_err();
        assert!(matches!(err, Error::SettingsParse { .. }));
        assert!(err.to_string().contains(SETTINGS_FILE));
    }
}
