use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use expect_test::expect;
use htmlsp::error::Result;
use htmlsp::lsp::{dispatch, folding_ranges};
use htmlsp::modes::{Capability, LanguageMode};
use htmlsp::settings::{EmbeddedLanguages, SECTIONS};
use htmlsp::{
    discover_settings, DiagnosticsSink, DocumentContext, DocumentState, LanguageId, LanguageModes,
    ServerConfig, ServerContext, Settings, SettingsSource,
};
use serde_json::Value;
use tower_lsp::lsp_types::{
    CompletionItem, Diagnostic, DiagnosticSeverity, Hover, NumberOrString, Position, Range,
    TextDocumentContentChangeEvent, Url,
};

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format diagnostics into a deterministic, human-readable string.
///
/// Each diagnostic becomes one line:
///   <start_line>:<start_col>-<end_line>:<end_col> <severity> [<code>]: <message>
fn format_diagnostics(diagnostics: &[Diagnostic]) -> String {
    if diagnostics.is_empty() {
        return "OK (no diagnostics)".to_string();
    }

    let mut lines: Vec<String> = diagnostics
        .iter()
        .map(|d| {
            let range = &d.range;
            let severity = match d.severity {
                Some(DiagnosticSeverity::ERROR) => "error",
                Some(DiagnosticSeverity::WARNING) => "warning",
                Some(DiagnosticSeverity::INFORMATION) => "info",
                Some(DiagnosticSeverity::HINT) => "hint",
                _ => "unknown",
            };
            let code = match &d.code {
                Some(NumberOrString::String(s)) => format!(" [{}]", s),
                Some(NumberOrString::Number(n)) => format!(" [{}]", n),
                None => String::new(),
            };
            format!(
                "{}:{}-{}:{} {}{}: {}",
                range.start.line,
                range.start.character,
                range.end.line,
                range.end.character,
                severity,
                code,
                d.message,
            )
        })
        .collect();

    lines.sort();
    lines.join("\n")
}

fn uri() -> Url {
    Url::parse("file:///site/index.html").unwrap()
}

fn all_languages() -> EmbeddedLanguages {
    EmbeddedLanguages {
        css: true,
        javascript: true,
    }
}

/// Every publish, in order.
#[derive(Default)]
struct RecordingSink {
    published: Mutex<Vec<(Url, Vec<Diagnostic>, Option<i32>)>>,
}

impl RecordingSink {
    fn versions(&self) -> Vec<Option<i32>> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(_, _, version)| *version)
            .collect()
    }

    fn last(&self) -> Vec<Diagnostic> {
        self.published
            .lock()
            .unwrap()
            .last()
            .map(|(_, diagnostics, _)| diagnostics.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl DiagnosticsSink for RecordingSink {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.published.lock().unwrap().push((uri, diagnostics, version));
    }
}

/// Scoped configuration that takes `delay` to answer.
struct SlowSource {
    delay: Duration,
    calls: AtomicUsize,
}

#[async_trait]
impl SettingsSource for SlowSource {
    async fn fetch(&self, _scope: &Url, sections: &[&str]) -> Result<Vec<Value>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        Ok(vec![Value::Null; sections.len()])
    }
}

fn session(
    config: ServerConfig,
    delay: Duration) -> (Arc<ServerContext>, Arc<RecordingSink>, Arc<SlowSource>,
) {
    let sink = Arc::new(RecordingSink::default());
    let source = Arc::new(SlowSource {
        delay,
        calls: AtomicUsize::new(0),
    });
    let context = ServerContext::new(
        config,
        Arc::clone(&source) as Arc<dyn SettingsSource>,
        Arc::clone(&sink) as Arc<dyn DiagnosticsSink>,
    );
    (Arc::new(context), sink, source)
}

fn replace_all(text: &str) -> Vec<TextDocumentContentChangeEvent> {
    vec![TextDocumentContentChangeEvent {
        range: None,
        range_length: None,
        text: text.to_string(),
    }]
}

/// Validate `text` once and format what gets published.
async fn check_html(text: &str, settings: Settings) -> String {
    let config = ServerConfig {
        global_settings: settings,
        ..Default::default()
    };
    let (context, sink, _) = session(config, Duration::ZERO);
    context.documents().open(uri(), "html", 1, text.to_string());
    context.validate(&uri()).await;
    format_diagnostics(&sink.last())
}

// ---------------------------------------------------------------------------
// Tests: regions and dispatch
// ---------------------------------------------------------------------------

const STYLE_AND_SCRIPT: &str = "<html><style>.a{}</style><script>var x=1;</script></html>";

#[test]
fn style_and_script_get_their_own_embedded_documents() {
    let doc = DocumentState::new(uri(), "html", 1, STYLE_AND_SCRIPT.to_string());
    assert_eq!(
        doc.regions().languages_in_document(),
        vec![LanguageId::Html, LanguageId::Css, LanguageId::JavaScript]
    );

    let css = doc.embedded(LanguageId::Css, false);
    assert_eq!(css.text().len(), STYLE_AND_SCRIPT.len());
    assert_eq!(css.text().trim(), ".a{}");
    assert_eq!(css.text().find(".a{}"), STYLE_AND_SCRIPT.find(".a{}"));

    let javascript = doc.embedded(LanguageId::JavaScript, false);
    assert_eq!(javascript.text().trim(), "var x=1;");
    assert_eq!(javascript.text().find("var"), STYLE_AND_SCRIPT.find("var"));
}

#[test]
fn embedded_positions_round_trip() {
    let text = "<div style=\"color: red\">\n  <script>\n    let a = 1;\n  </script>\n</div>";
    let doc = DocumentState::new(uri(), "html", 1, text.to_string());
    for language in [LanguageId::Css, LanguageId::JavaScript] {
        let embedded = doc.embedded(language, false);
        for region in doc.regions().regions() {
            if region.language != Some(language) {
                continue;
            }
            for offset in region.start..=region.end {
                let position = doc.position_at(offset);
                let embedded_offset = embedded.offset_at(position);
                assert_eq!(
                    embedded.position_at(embedded_offset),
                    position,
                    "{language} at {offset}"
                );
            }
        }
    }
}

/// A mode that only counts hover calls.
struct HoverSpy {
    id: LanguageId,
    hovers: AtomicUsize,
}

impl HoverSpy {
    fn new(id: LanguageId) -> Arc<Self> {
        Arc::new(Self {
            id,
            hovers: AtomicUsize::new(0),
        })
    }

    fn count(&self) -> usize {
        self.hovers.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LanguageMode for HoverSpy {
    fn id(&self) -> LanguageId {
        self.id
    }

    fn capabilities(&self) -> &'static [Capability] {
        &[Capability::Hover]
    }

    async fn do_hover(&self, _doc: &DocumentState, _position: Position) -> Result<Option<Hover>> {
        self.hovers.fetch_add(1, Ordering::SeqCst);
        Ok(None)
    }
}

#[tokio::test]
async fn hover_dispatches_to_the_owning_mode_only() {
    let html = HoverSpy::new(LanguageId::Html);
    let css = HoverSpy::new(LanguageId::Css);
    let javascript = HoverSpy::new(LanguageId::JavaScript);
    let modes = LanguageModes::from_modes(vec![
        Arc::clone(&html) as Arc<dyn LanguageMode>,
        Arc::clone(&css) as Arc<dyn LanguageMode>,
        Arc::clone(&javascript) as Arc<dyn LanguageMode>,
    ]);
    let doc = DocumentState::new(uri(), "html", 1, STYLE_AND_SCRIPT.to_string());

    dispatch::hover(&modes, &doc, Position::new(0, 14)).await.unwrap();
    assert_eq!((html.count(), css.count(), javascript.count()), (0, 1, 0));

    dispatch::hover(&modes, &doc, Position::new(0, 36)).await.unwrap();
    assert_eq!((html.count(), css.count(), javascript.count()), (0, 1, 1));

    dispatch::hover(&modes, &doc, Position::new(0, 2)).await.unwrap();
    assert_eq!((html.count(), css.count(), javascript.count()), (1, 1, 1));
}

#[tokio::test]
async fn unknown_script_type_has_no_mode() {
    let modes = LanguageModes::new(&all_languages());
    let doc = DocumentState::new(
        uri(),
        "html",
        1,
        "<script type=\"text/template\"><b>{{x}}</b></script>".to_string(),
    );
    assert!(modes.mode_at_position(&doc, Position::new(0, 34)).is_none());
    assert_eq!(dispatch::hover(&modes, &doc, Position::new(0, 34)).await.unwrap(), None);
}

// ---------------------------------------------------------------------------
// Tests: diagnostics
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_rule_is_reported() {
    let actual = check_html(STYLE_AND_SCRIPT, Settings::default()).await;
    let expected = expect![[r#"0:13-0:15 warning [emptyRules]: Do not use empty rulesets"#]];
    expected.assert_eq(&actual);
}

#[tokio::test]
async fn style_and_script_problems_are_merged() {
    let text = "<style>\n  p { colr: red; }\n</style>\n<script>\n  let total = (1 + 2;\n</script>";
    let actual = check_html(text, Settings::default()).await;
    let expected = expect![[r#"
        1:6-1:10 warning [unknownProperties]: Unknown property: 'colr'
        4:14-4:15 error [1005]: ')' expected."#]];
    expected.assert_eq(&actual);
}

#[tokio::test]
async fn clean_document_has_no_diagnostics() {
    let text = "<div onclick=\"go(1)\">\n<style>p { color: red }</style>\n</div>";
    let actual = check_html(text, Settings::default()).await;
    let expected = expect![[r#"OK (no diagnostics)"#]];
    expected.assert_eq(&actual);
}

#[tokio::test]
async fn settings_file_disables_script_validation() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("htmlsp.toml"),
        "[html.validate]\nscripts = false\n",
    )
    .unwrap();
    let nested = dir.path().join("pages");
    std::fs::create_dir(&nested).unwrap();

    let (settings, path) = discover_settings(&nested);
    assert_eq!(path, Some(dir.path().join("htmlsp.toml")));

    let text = "<style>\n  p { colr: red; }\n</style>\n<script>\n  let total = (1 + 2;\n</script>";
    let actual = check_html(text, settings).await;
    let expected = expect![[r#"1:6-1:10 warning [unknownProperties]: Unknown property: 'colr'"#]];
    expected.assert_eq(&actual);
}

// ---------------------------------------------------------------------------
// Tests: validation scheduling
// ---------------------------------------------------------------------------

#[tokio::test(start_paused = true)]
async fn burst_of_changes_validates_once() {
    let (context, sink, _) = session(ServerConfig::default(), Duration::ZERO);
    context.open(uri(), "html", 1, "<style>a{}</style>".to_string());
    for version in 2..=5 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        context.change(uri(), version, &replace_all("<style>a{color:red}</style>"));
    }
    tokio::time::sleep(Duration::from_millis(450)).await;
    assert!(sink.versions().is_empty());

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(sink.versions(), vec![Some(5)]);
    assert!(sink.last().is_empty());
}

#[tokio::test(start_paused = true)]
async fn change_during_settings_fetch_discards_stale_result() {
    let config = ServerConfig {
        scoped_settings: true,
        ..Default::default()
    };
    let (context, sink, source) = session(config, Duration::from_millis(100));
    context.open(uri(), "html", 1, "<style>a{colr:red}</style>".to_string());

    // The first run is waiting on the client when the edit lands
    tokio::time::sleep(Duration::from_millis(520)).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    context.change(uri(), 2, &replace_all("<style>a{color:red}</style>"));

    tokio::time::sleep(Duration::from_millis(200)).await;
    assert!(sink.versions().is_empty());

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(sink.versions(), vec![Some(2)]);
    assert!(sink.last().is_empty());
}

#[tokio::test(start_paused = true)]
async fn close_during_validation_publishes_one_empty_set() {
    let config = ServerConfig {
        scoped_settings: true,
        ..Default::default()
    };
    let (context, sink, _) = session(config, Duration::from_millis(100));
    context.open(uri(), "html", 1, "<style>a{colr:red}</style>".to_string());

    tokio::time::sleep(Duration::from_millis(520)).await;
    context.close(&uri()).await;
    tokio::time::sleep(Duration::from_secs(2)).await;

    assert_eq!(sink.versions(), vec![None]);
    assert!(sink.last().is_empty());
}

#[tokio::test(start_paused = true)]
async fn configuration_change_revalidates_open_documents() {
    let (context, sink, _) = session(ServerConfig::default(), Duration::ZERO);
    context.open(uri(), "html", 1, "<style>a{colr:red}</style>".to_string());
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(sink.last().len(), 1);

    let settings =
        Settings::from_value(&serde_json::json!({ "html": { "validate": { "styles": false } } }));
    context.set_global_settings(settings);
    tokio::time::sleep(Duration::from_millis(600)).await;
    assert_eq!(sink.versions(), vec![Some(1), Some(1)]);
    assert!(sink.last().is_empty());
}

// ---------------------------------------------------------------------------
// Tests: aggregated requests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn folding_respects_client_limit() {
    let config = ServerConfig {
        folding_limit: Some(2),
        ..Default::default()
    };
    let (context, _, _) = session(config, Duration::ZERO);
    let text = [
        "<div>",
        "<style>",
        "a {",
        "  color: red;",
        "}",
        "</style>",
        "<script>",
        "function f() {",
        "  return 1;",
        "}",
        "</script>",
        "</div>",
    ]
    .join("\n");
    let doc = DocumentState::new(uri(), "html", 1, text);
    let ranges = folding_ranges(context.modes(), &doc, context.folding_limit())
        .await
        .unwrap();
    let lines: Vec<_> = ranges.iter().map(|r| (r.start_line, r.end_line)).collect();
    assert_eq!(lines, vec![(2, 3), (7, 8)]);
}

fn labels(items: &[CompletionItem]) -> Vec<&str> {
    items.iter().map(|i| i.label.as_str()).collect()
}

#[tokio::test]
async fn rooted_paths_complete_from_workspace_folder() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("css")).unwrap();
    std::fs::create_dir(dir.path().join("pages")).unwrap();
    std::fs::write(dir.path().join("logo.png"), "").unwrap();
    let page = dir.path().join("pages").join("index.html");
    std::fs::write(&page, "").unwrap();

    let folder = Url::from_directory_path(dir.path()).unwrap();
    let document = Url::from_file_path(&page).unwrap();
    let doc = DocumentState::new(document.clone(), "html", 1, "<img src=\"/\">".to_string());
    let context = DocumentContext::new(document, vec![folder]);
    let modes = LanguageModes::new(&all_languages());

    let settings = Settings::default();
    let position = Position::new(0, 11);
    let list = dispatch::completion(&modes, &doc, position, &context, &settings, false)
        .await
        .unwrap();
    assert_eq!(labels(&list.items), vec!["css/", "logo.png", "pages/"]);
    assert!(list.items.iter().all(|i| i.data.as_ref().is_some_and(|d| d["languageId"] == "html")));
}

#[tokio::test]
async fn scoped_settings_are_requested_per_document() {
    let config = ServerConfig {
        scoped_settings: true,
        ..Default::default()
    };
    let (context, _, source) = session(config, Duration::ZERO);
    context.documents().open(uri(), "html", 1, "<style>a{}</style>".to_string());
    context.validate(&uri()).await;
    context.validate(&uri()).await;
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);
    assert_eq!(SECTIONS, ["css", "html", "javascript"]);

    let settings = context.settings_for(&uri(), true).await;
    assert_eq!(settings, Settings::default());
    assert_eq!(source.calls.load(Ordering::SeqCst), 1);

    let range = Range::new(Position::new(0, 0), Position::new(0, 0));
    let edits = htmlsp::lsp::format_range(
        context.modes(),
        &context.document(&uri()).unwrap(),
        range,
        &Default::default(),
        &settings,
    )
    .await
    .unwrap();
    assert!(edits.is_empty());
}
