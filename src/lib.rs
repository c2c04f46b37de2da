//! HTML Language Server implementation.
//!
//! Requests are routed to a language mode (HTML, CSS or JavaScript) depending
//! on the region of the document they target.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Mutex;
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService};

pub mod context;
pub mod document;
pub mod error;
mod html;
pub mod logging;
pub mod lsp;
pub mod modes;
pub mod runner;
mod services;
pub mod settings;
pub mod validation;

pub use context::{ServerConfig, ServerContext};
pub use document::{DocumentState, DocumentStore, EmbeddedDocument, LanguageId, LineIndex};
pub use error::Error;
pub use modes::{DocumentContext, LanguageModes};
pub use settings::{
    discover_settings, load_settings, InitializationOptions, Settings, SettingsSource,
};
pub use validation::{DiagnosticsSink, VALIDATION_DELAY};

use lsp::{dispatch, LegendResponse};
use runner::run_safe;

/// Registration id of the dynamically registered range formatter.
const FORMATTER_REGISTRATION_ID: &str = "html-range-formatting";

/// The client as seen by the session: configuration source and diagnostics
/// sink.
struct ClientBridge {
    client: Client,
}

#[tower_lsp::async_trait]
impl SettingsSource for ClientBridge {
    async fn fetch(&self, scope: &Url, sections: &[&str]) -> error::Result<Vec<Value>> {
        let items = sections
            .iter()
            .map(|section| ConfigurationItem {
                scope_uri: Some(scope.clone()),
                section: Some(section.to_string()),
            })
            .collect();
        self.client
            .configuration(items)
            .await
            .map_err(|e| Error::Configuration {
                uri: scope.clone(),
                message: e.to_string(),
            })
    }
}

#[tower_lsp::async_trait]
impl DiagnosticsSink for ClientBridge {
    async fn publish(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.client.publish_diagnostics(uri, diagnostics, version).await;
    }
}

/// Parameters of `html/semanticTokens`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticTokenParams {
    pub text_document: TextDocumentIdentifier,
    pub ranges: Option<Vec<Range>>,
}

pub struct Backend {
    client: Client,
    context: OnceLock<Arc<ServerContext>>,
    snippet_support: AtomicBool,
    dynamic_formatter: AtomicBool,
    formatter_registered: Mutex<bool>,
}

impl Backend {
    pub(crate) fn new(client: Client) -> Self {
        Self {
            client,
            context: OnceLock::new(),
            snippet_support: AtomicBool::new(false),
            dynamic_formatter: AtomicBool::new(false),
            formatter_registered: Mutex::new(false),
        }
    }

    /// Session context and the current snapshot of `uri`.
    fn snapshot(&self, uri: &Url) -> Option<(Arc<ServerContext>, Arc<DocumentState>)> {
        let context = self.context.get()?;
        let doc = context.document(uri)?;
        Some((Arc::clone(context), doc))
    }

    /// Register or drop the range formatter to follow `html.format.enable`.
    async fn update_formatter_registration(&self, settings: &Settings) {
        if !self.dynamic_formatter.load(Ordering::Relaxed) {
            return;
        }
        let enable = settings.html_or_default().format.enable;
        let mut registered = self.formatter_registered.lock().await;
        if enable && !*registered {
            let selector = ["html", "handlebars"]
                .into_iter()
                .map(|language| DocumentFilter {
                    language: Some(language.to_string()),
                    scheme: None,
                    pattern: None,
                })
                .collect();
            let options = TextDocumentRegistrationOptions {
                document_selector: Some(selector),
            };
            let registration = Registration {
                id: FORMATTER_REGISTRATION_ID.to_string(),
                method: "textDocument/rangeFormatting".to_string(),
                register_options: serde_json::to_value(options).ok(),
            };
            match self.client.register_capability(vec![registration]).await {
                Ok(()) => *registered = true,
                Err(e) => tracing::warn!(error = %e, "range formatter registration failed"),
            }
        } else if !enable && *registered {
            let unregistration = Unregistration {
                id: FORMATTER_REGISTRATION_ID.to_string(),
                method: "textDocument/rangeFormatting".to_string(),
            };
            match self.client.unregister_capability(vec![unregistration]).await {
                Ok(()) => *registered = false,
                Err(e) => tracing::warn!(error = %e, "range formatter unregistration failed"),
            }
        }
    }

    /// `html/tag`: text to insert after `>` or `</`.
    async fn tag_close(&self, params: TextDocumentPositionParams) -> Result<Option<String>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe(
            "tag close",
            &uri,
            &context.token(),
            None,
            dispatch::auto_close(context.modes(), &doc, params.position),
        )
        .await)
    }

    /// `html/onTypeRename`: ranges edited together with the one typed in.
    async fn on_type_rename(
        &self,
        params: TextDocumentPositionParams,
    ) -> Result<Option<Vec<Range>>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe(
            "on type rename",
            &uri,
            &context.token(),
            None,
            dispatch::on_type_rename(context.modes(), &doc, params.position),
        )
        .await)
    }

    /// `html/semanticTokens`: encoded tokens as a flat number array.
    async fn semantic_tokens(&self, params: SemanticTokenParams) -> Result<Option<Vec<u32>>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe("semantic tokens", &uri, &context.token(), None, async {
            let tokens = context
                .semantic_tokens()
                .tokens(context.modes(), &doc, params.ranges.as_deref())
                .await?;
            Ok(Some(lsp::flatten(&tokens)))
        })
        .await)
    }

    /// `html/semanticTokenLegend`
    async fn semantic_token_legend(&self) -> Result<Option<LegendResponse>> {
        Ok(self
            .context
            .get()
            .map(|context| context.semantic_tokens().legend_response()))
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let options = InitializationOptions::from_value(params.initialization_options.clone());

        let mut workspace_folders: Vec<Url> = params
            .workspace_folders
            .as_ref()
            .map(|folders| folders.iter().map(|f| f.uri.clone()).collect())
            .unwrap_or_default();
        #[allow(deprecated)]
        let root_uri = params.root_uri.clone();
        if workspace_folders.is_empty() {
            workspace_folders.extend(root_uri);
        }

        // Server defaults come from the nearest htmlsp.toml above the workspace root
        let workspace_root: Option<PathBuf> =
            workspace_folders.first().and_then(|f| f.to_file_path().ok());
        let global_settings = match workspace_root {
            Some(root) => {
                let (settings, path) = discover_settings(&root);
                if let Some(path) = path {
                    tracing::info!(path = %path.display(), "loaded settings file");
                }
                settings
            }
            None => Settings::default(),
        };

        let capabilities = &params.capabilities;
        let text_document = capabilities.text_document.as_ref();
        let snippet_support = text_document
            .and_then(|t| t.completion.as_ref())
            .and_then(|c| c.completion_item.as_ref())
            .and_then(|i| i.snippet_support)
            .unwrap_or(false);
        let dynamic_formatter = text_document
            .and_then(|t| t.range_formatting.as_ref())
            .and_then(|f| f.dynamic_registration)
            .unwrap_or(false)
            && options.provide_formatter().is_none();
        let scoped_settings = capabilities
            .workspace
            .as_ref()
            .and_then(|w| w.configuration)
            .unwrap_or(false);
        let folding_limit = text_document
            .and_then(|t| t.folding_range.as_ref())
            .and_then(|f| f.range_limit)
            .map(|limit| limit as usize);
        self.snippet_support.store(snippet_support, Ordering::Relaxed);
        self.dynamic_formatter.store(dynamic_formatter, Ordering::Relaxed);

        let bridge = Arc::new(ClientBridge {
            client: self.client.clone(),
        });
        let config = ServerConfig {
            embedded: options.embedded_languages(),
            global_settings,
            scoped_settings,
            workspace_folders,
            folding_limit,
            ..Default::default()
        };
        let source: Arc<dyn SettingsSource> = Arc::clone(&bridge) as Arc<dyn SettingsSource>;
        let context = Arc::new(ServerContext::new(config, source, bridge));
        let legend = context.semantic_tokens().legend().clone();
        if self.context.set(context).is_err() {
            tracing::warn!("initialize received twice; keeping the first session");
        }

        let trigger_characters = [".", ":", "<", "\"", "=", "/"]
            .into_iter()
            .map(str::to_string)
            .collect();

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::INCREMENTAL,
                )),
                completion_provider: Some(CompletionOptions {
                    trigger_characters: Some(trigger_characters),
                    resolve_provider: Some(true),
                    ..Default::default()
                }),
                hover_provider: Some(HoverProviderCapability::Simple(true)),
                document_highlight_provider: Some(OneOf::Left(true)),
                document_range_formatting_provider: (options.provide_formatter() == Some(true))
                    .then_some(OneOf::Left(true)),
                document_link_provider: Some(DocumentLinkOptions {
                    resolve_provider: Some(false),
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                document_symbol_provider: Some(OneOf::Left(true)),
                definition_provider: Some(OneOf::Left(true)),
                signature_help_provider: Some(SignatureHelpOptions {
                    trigger_characters: Some(vec!["(".to_string()]),
                    retrigger_characters: None,
                    work_done_progress_options: WorkDoneProgressOptions::default(),
                }),
                references_provider: Some(OneOf::Left(true)),
                color_provider: Some(ColorProviderCapability::Simple(true)),
                folding_range_provider: Some(FoldingRangeProviderCapability::Simple(true)),
                selection_range_provider: Some(SelectionRangeProviderCapability::Simple(true)),
                rename_provider: Some(OneOf::Left(true)),
                linked_editing_range_provider: Some(
                    LinkedEditingRangeServerCapabilities::Simple(true),
                ),
                semantic_tokens_provider: Some(
                    SemanticTokensServerCapabilities::SemanticTokensOptions(
                        SemanticTokensOptions {
                            legend,
                            full: Some(SemanticTokensFullOptions::Bool(true)),
                            range: Some(true),
                            work_done_progress_options: WorkDoneProgressOptions::default(),
                        },
                    ),
                ),
                workspace: workspace_capabilities(capabilities),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "HTML language server initialized")
            .await;
        if let Some(context) = self.context.get() {
            self.update_formatter_registration(&context.global_settings())
                .await;
        }
    }

    async fn shutdown(&self) -> Result<()> {
        if let Some(context) = self.context.get() {
            context.shutdown();
        }
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let Some(context) = self.context.get() else {
            return;
        };
        let document = params.text_document;
        context.open(document.uri, &document.language_id, document.version, document.text);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let Some(context) = self.context.get() else {
            return;
        };
        context.change(
            params.text_document.uri,
            params.text_document.version,
            &params.content_changes,
        );
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        if let Some(context) = self.context.get() {
            context.close(&params.text_document.uri).await;
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        let Some(context) = self.context.get() else {
            return;
        };
        let settings = Settings::from_value(&params.settings);
        context.set_global_settings(settings.clone());
        self.update_formatter_registration(&settings).await;
    }

    async fn did_change_workspace_folders(&self, params: DidChangeWorkspaceFoldersParams) {
        let Some(context) = self.context.get() else {
            return;
        };
        let added = params.event.added.into_iter().map(|f| f.uri).collect();
        let removed: Vec<Url> = params.event.removed.into_iter().map(|f| f.uri).collect();
        context.change_workspace_folders(added, &removed);
    }

    async fn completion(&self, params: CompletionParams) -> Result<Option<CompletionResponse>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let snippet_support = self.snippet_support.load(Ordering::Relaxed);
        Ok(run_safe("completion", &uri, &context.token(), None, async {
            let settings = context.settings_for(&uri, true).await;
            let document_context = context.document_context(&uri);
            let list = dispatch::completion(
                context.modes(),
                &doc,
                position,
                &document_context,
                &settings,
                snippet_support,
            )
            .await?;
            Ok(Some(CompletionResponse::List(list)))
        })
        .await)
    }

    async fn completion_resolve(&self, item: CompletionItem) -> Result<CompletionItem> {
        let Some(context) = self.context.get() else {
            return Ok(item);
        };
        let uri = item
            .data
            .as_ref()
            .and_then(|data| data.get("uri"))
            .and_then(Value::as_str)
            .unwrap_or("<unknown>")
            .to_string();
        let neutral = item.clone();
        Ok(run_safe(
            "completion resolve",
            uri,
            &context.token(),
            neutral,
            dispatch::resolve(context.modes(), context.documents(), item),
        )
        .await)
    }

    async fn hover(&self, params: HoverParams) -> Result<Option<Hover>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe(
            "hover",
            &uri,
            &context.token(),
            None,
            dispatch::hover(context.modes(), &doc, position),
        )
        .await)
    }

    async fn document_highlight(
        &self,
        params: DocumentHighlightParams,
    ) -> Result<Option<Vec<DocumentHighlight>>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let highlights = run_safe(
            "document highlight",
            &uri,
            &context.token(),
            Vec::new(),
            dispatch::document_highlight(context.modes(), &doc, position),
        )
        .await;
        Ok(Some(highlights))
    }

    async fn goto_definition(
        &self,
        params: GotoDefinitionParams,
    ) -> Result<Option<GotoDefinitionResponse>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe("definition", &uri, &context.token(), None, async {
            let locations = dispatch::definition(context.modes(), &doc, position).await?;
            Ok(Some(GotoDefinitionResponse::Array(locations)))
        })
        .await)
    }

    async fn references(&self, params: ReferenceParams) -> Result<Option<Vec<Location>>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let locations = run_safe(
            "references",
            &uri,
            &context.token(),
            Vec::new(),
            dispatch::references(context.modes(), &doc, position),
        )
        .await;
        Ok(Some(locations))
    }

    async fn signature_help(&self, params: SignatureHelpParams) -> Result<Option<SignatureHelp>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe(
            "signature help",
            &uri,
            &context.token(),
            None,
            dispatch::signature_help(context.modes(), &doc, position),
        )
        .await)
    }

    async fn range_formatting(
        &self,
        params: DocumentRangeFormattingParams,
    ) -> Result<Option<Vec<TextEdit>>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let edits = run_safe("range formatting", &uri, &context.token(), Vec::new(), async {
            let settings = context.settings_for(&uri, true).await;
            lsp::format_range(context.modes(), &doc, params.range, &params.options, &settings).await
        })
        .await;
        Ok(Some(edits))
    }

    async fn document_link(&self, params: DocumentLinkParams) -> Result<Option<Vec<DocumentLink>>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let document_context = context.document_context(&uri);
        let links = run_safe(
            "document links",
            &uri,
            &context.token(),
            Vec::new(),
            dispatch::document_links(context.modes(), &doc, &document_context),
        )
        .await;
        Ok(Some(links))
    }

    async fn document_symbol(
        &self,
        params: DocumentSymbolParams,
    ) -> Result<Option<DocumentSymbolResponse>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let symbols = run_safe(
            "document symbols",
            &uri,
            &context.token(),
            Vec::new(),
            dispatch::document_symbols(context.modes(), &doc),
        )
        .await;
        Ok(Some(DocumentSymbolResponse::Flat(symbols)))
    }

    async fn document_color(&self, params: DocumentColorParams) -> Result<Vec<ColorInformation>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(Vec::new());
        };
        Ok(run_safe(
            "document colors",
            &uri,
            &context.token(),
            Vec::new(),
            dispatch::document_colors(context.modes(), &doc),
        )
        .await)
    }

    async fn color_presentation(
        &self,
        params: ColorPresentationParams,
    ) -> Result<Vec<ColorPresentation>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(Vec::new());
        };
        Ok(run_safe(
            "color presentations",
            &uri,
            &context.token(),
            Vec::new(),
            dispatch::color_presentations(context.modes(), &doc, params.color, params.range),
        )
        .await)
    }

    async fn folding_range(&self, params: FoldingRangeParams) -> Result<Option<Vec<FoldingRange>>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe("folding ranges", &uri, &context.token(), None, async {
            let ranges = lsp::folding_ranges(context.modes(), &doc, context.folding_limit()).await?;
            Ok(Some(ranges))
        })
        .await)
    }

    async fn selection_range(
        &self,
        params: SelectionRangeParams,
    ) -> Result<Option<Vec<SelectionRange>>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let ranges = run_safe(
            "selection ranges",
            &uri,
            &context.token(),
            Vec::new(),
            lsp::selection_ranges(context.modes(), &doc, &params.positions),
        )
        .await;
        Ok(Some(ranges))
    }

    async fn rename(&self, params: RenameParams) -> Result<Option<WorkspaceEdit>> {
        let uri = params.text_document_position.text_document.uri;
        let position = params.text_document_position.position;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe(
            "rename",
            &uri,
            &context.token(),
            None,
            dispatch::rename(context.modes(), &doc, position, &params.new_name),
        )
        .await)
    }

    async fn linked_editing_range(
        &self,
        params: LinkedEditingRangeParams,
    ) -> Result<Option<LinkedEditingRanges>> {
        let uri = params.text_document_position_params.text_document.uri;
        let position = params.text_document_position_params.position;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        let ranges = run_safe(
            "linked editing",
            &uri,
            &context.token(),
            None,
            dispatch::on_type_rename(context.modes(), &doc, position),
        )
        .await;
        Ok(ranges.map(|ranges| LinkedEditingRanges {
            ranges,
            word_pattern: None,
        }))
    }

    async fn semantic_tokens_full(
        &self,
        params: SemanticTokensParams,
    ) -> Result<Option<SemanticTokensResult>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe("semantic tokens", &uri, &context.token(), None, async {
            let data = context
                .semantic_tokens()
                .tokens(context.modes(), &doc, None)
                .await?;
            Ok(Some(SemanticTokensResult::Tokens(SemanticTokens {
                result_id: None,
                data,
            })))
        })
        .await)
    }

    async fn semantic_tokens_range(
        &self,
        params: SemanticTokensRangeParams,
    ) -> Result<Option<SemanticTokensRangeResult>> {
        let uri = params.text_document.uri;
        let Some((context, doc)) = self.snapshot(&uri) else {
            return Ok(None);
        };
        Ok(run_safe("semantic tokens", &uri, &context.token(), None, async {
            let data = context
                .semantic_tokens()
                .tokens(context.modes(), &doc, Some(std::slice::from_ref(&params.range)))
                .await?;
            Ok(Some(SemanticTokensRangeResult::Tokens(SemanticTokens {
                result_id: None,
                data,
            })))
        })
        .await)
    }
}

pub fn create_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::build(Backend::new)
        .custom_method("html/tag", Backend::tag_close)
        .custom_method("html/onTypeRename", Backend::on_type_rename)
        .custom_method("html/semanticTokens", Backend::semantic_tokens)
        .custom_method("html/semanticTokenLegend", Backend::semantic_token_legend)
        .finish()
}

/// Folder support is advertised only to clients that manage workspace folders.
fn workspace_capabilities(client: &ClientCapabilities) -> Option<WorkspaceServerCapabilities> {
    let folders = client
        .workspace
        .as_ref()
        .and_then(|w| w.workspace_folders)
        .unwrap_or(false);
    folders.then(|| WorkspaceServerCapabilities {
        workspace_folders: Some(WorkspaceFoldersServerCapabilities {
            supported: Some(true),
            change_notifications: Some(OneOf::Left(true)),
        }),
        file_operations: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_can_be_created() {
        let (_service, _socket) = create_service();
    }

    #[test]
    fn semantic_token_params_are_camel_case() {
        let params: SemanticTokenParams = serde_json::from_value(serde_json::json!({
            "textDocument": { "uri": "file:///a.html" },
            "ranges": [{
                "start": { "line": 0, "character": 0 },
                "end": { "line": 1, "character": 0 }
            }]
        }))
        .unwrap();
        assert_eq!(params.ranges.map(|r| r.len()), Some(1));
    }

    #[test]
    fn workspace_folders_follow_client_support() {
        let client = |folders: Option<bool>| ClientCapabilities {
            workspace: Some(WorkspaceClientCapabilities {
                workspace_folders: folders,
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(workspace_capabilities(&ClientCapabilities::default()).is_none());
        assert!(workspace_capabilities(&client(None)).is_none());
        assert!(workspace_capabilities(&client(Some(false))).is_none());

        let advertised = workspace_capabilities(&client(Some(true)))
            .and_then(|w| w.workspace_folders)
            .unwrap();
        assert_eq!(advertised.supported, Some(true));
        assert_eq!(advertised.change_notifications, Some(OneOf::Left(true)));
    }
}
