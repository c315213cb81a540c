//! Lintbridge Language Server Protocol implementation.
//!
//! Runs the external linter on open documents, publishes its findings as
//! diagnostics and offers the fix, fix-all and disable-rule code actions.

mod host;

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use lintbridge_core::{
    CommandLinter, DiagnosticCategory, Edit, FixAction, FixKind, LanguageService, LintEngine,
    LintService, LogLevel, NodeModulesResolver, PluginConfig, ResolutionCache, DIAGNOSTIC_CODE,
    DIAGNOSTIC_SOURCE,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, RwLock};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};

use crate::host::DocumentHost;

const SETTINGS_FILE: &str = "lintbridge.yml";

type Engine = Arc<dyn LintEngine + Send + Sync>;
type Service = LintService<Arc<DocumentHost>, Engine>;

/// Lintbridge Language Server backend.
struct Backend {
    client: Client,
    host: Arc<DocumentHost>,
    cache: Arc<ResolutionCache>,
    /// Replaces the configured command linter when set.
    engine: Option<Engine>,
    service: RwLock<Arc<Service>>,
    workspace_root: RwLock<Option<PathBuf>>,
    settings: RwLock<Option<PluginConfig>>,
}

fn message_type(level: LogLevel) -> MessageType {
    match level {
        LogLevel::Info => MessageType::INFO,
        LogLevel::Error => MessageType::ERROR,
    }
}

/// Per-diagnostic actions are distinct whenever their edits differ, while
/// the document-wide batches are offered once per request.
fn dedup_key(fix: &FixAction) -> (FixKind, String, Vec<Edit>) {
    let edits = match fix.kind {
        FixKind::FixAllAutoFixable | FixKind::FixAllOfRule => Vec::new(),
        _ => fix.edits().cloned().collect(),
    };
    (fix.kind, fix.description.clone(), edits)
}

impl Backend {
    fn new(client: Client) -> Self {
        Self::with_engine(client, None)
    }

    fn with_engine(client: Client, engine: Option<Engine>) -> Self {
        let (log_tx, mut log_rx) = mpsc::unbounded_channel::<(LogLevel, String)>();
        let forward = client.clone();
        tokio::spawn(async move {
            while let Some((level, message)) = log_rx.recv().await {
                forward.log_message(message_type(level), message).await;
            }
        });

        let host = Arc::new(DocumentHost::new(log_tx));
        let cache = Arc::new(ResolutionCache::new());
        let service =
            Self::build_service(&host, &cache, engine.as_ref(), PluginConfig::default(), None);
        Self {
            client,
            host,
            cache,
            engine,
            service: RwLock::new(Arc::new(service)),
            workspace_root: RwLock::new(None),
            settings: RwLock::new(None),
        }
    }

    fn build_service(
        host: &Arc<DocumentHost>,
        cache: &Arc<ResolutionCache>,
        engine: Option<&Engine>,
        config: PluginConfig,
        root: Option<PathBuf>,
    ) -> Service {
        let root = root
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_default();
        let engine = match engine {
            Some(engine) => engine.clone(),
            None => {
                let resolver = NodeModulesResolver::new(cache.clone());
                Arc::new(CommandLinter::new(config.linter.clone(), resolver))
            }
        };
        LintService::new(host.clone(), engine, config, root)
    }

    /// Client-provided settings win over the workspace settings file.
    async fn resolve_settings(&self) -> anyhow::Result<PluginConfig> {
        if let Some(settings) = self.settings.read().await.clone() {
            return Ok(settings);
        }
        let Some(root) = self.workspace_root.read().await.clone() else {
            return Ok(PluginConfig::default());
        };
        let path = root.join(SETTINGS_FILE);
        if !path.exists() {
            return Ok(PluginConfig::default());
        }
        PluginConfig::load(&path).with_context(|| format!("Failed to load {}", path.display()))
    }

    async fn reload_service(&self) -> anyhow::Result<()> {
        let config = self.resolve_settings().await?;
        let root = self.workspace_root.read().await.clone();
        let linter = config.linter.clone();
        let service =
            Self::build_service(&self.host, &self.cache, self.engine.as_ref(), config, root);
        *self.service.write().await = Arc::new(service);

        self.client
            .log_message(
                MessageType::INFO,
                format!("Lintbridge using linter '{linter}'"),
            )
            .await;
        Ok(())
    }

    fn apply_settings_value(value: Value) -> anyhow::Result<Option<PluginConfig>> {
        // Editors usually nest settings under the server's section name.
        let value = match value {
            Value::Object(mut map) if map.contains_key("lintbridge") => {
                map.remove("lintbridge").unwrap_or(Value::Null)
            }
            other => other,
        };
        match value {
            Value::Null => Ok(None),
            Value::Object(ref map) if map.is_empty() => Ok(None),
            other => PluginConfig::from_json(other)
                .map(Some)
                .context("Invalid lintbridge settings"),
        }
    }

    async fn store_settings(&self, value: Value) {
        match Self::apply_settings_value(value) {
            Ok(settings) => *self.settings.write().await = settings,
            Err(err) => {
                self.client
                    .log_message(MessageType::ERROR, format!("{err:#}"))
                    .await
            }
        }
    }

    fn to_lsp_diagnostic(
        &self,
        diag: &lintbridge_core::Diagnostic,
    ) -> Option<tower_lsp::lsp_types::Diagnostic> {
        let range = Range {
            start: self.host.to_position(&diag.file, diag.start)?,
            end: self.host.to_position(&diag.file, diag.end())?,
        };
        let severity = match diag.category {
            DiagnosticCategory::Error => DiagnosticSeverity::ERROR,
            DiagnosticCategory::Warning => DiagnosticSeverity::WARNING,
            DiagnosticCategory::Suggestion => DiagnosticSeverity::HINT,
            DiagnosticCategory::Message => DiagnosticSeverity::INFORMATION,
        };

        Some(tower_lsp::lsp_types::Diagnostic {
            range,
            severity: Some(severity),
            code: Some(NumberOrString::Number(diag.code as i32)),
            code_description: None,
            source: diag.source.clone(),
            message: diag.message.clone(),
            related_information: None,
            tags: None,
            // Exact offsets, so code actions hit the same index key.
            data: Some(json!({ "start": diag.start, "end": diag.end() })),
        })
    }

    /// Offsets of a lint diagnostic echoed back in a code-action request.
    fn diagnostic_offsets(
        &self,
        file: &str,
        diag: &tower_lsp::lsp_types::Diagnostic,
    ) -> Option<(usize, usize)> {
        let from_data = diag.data.as_ref().and_then(|data| {
            let start = data.get("start")?.as_u64()? as usize;
            let end = data.get("end")?.as_u64()? as usize;
            Some((start, end))
        });
        from_data.or_else(|| {
            Some((
                self.host.to_offset(file, diag.range.start)?,
                self.host.to_offset(file, diag.range.end)?,
            ))
        })
    }

    fn to_code_action(
        &self,
        uri: &Url,
        fix: &FixAction,
        diag: &tower_lsp::lsp_types::Diagnostic,
    ) -> Option<CodeAction> {
        let mut changes: HashMap<Url, Vec<TextEdit>> = HashMap::new();
        for change in &fix.changes {
            let edits = changes.entry(uri.clone()).or_default();
            for edit in &change.edits {
                edits.push(TextEdit {
                    range: Range {
                        start: self.host.to_position(&change.file, edit.start)?,
                        end: self.host.to_position(&change.file, edit.end)?,
                    },
                    new_text: edit.text.clone(),
                });
            }
        }

        let kind = match fix.kind {
            FixKind::FixAllAutoFixable => CodeActionKind::SOURCE_FIX_ALL,
            _ => CodeActionKind::QUICKFIX,
        };
        Some(CodeAction {
            title: fix.description.clone(),
            kind: Some(kind),
            diagnostics: Some(vec![diag.clone()]),
            edit: Some(WorkspaceEdit {
                changes: Some(changes),
                ..Default::default()
            }),
            command: None,
            is_preferred: Some(fix.kind == FixKind::Single),
            disabled: None,
            data: None,
        })
    }

    /// Lints an open document. `None` when the document is not open.
    async fn lsp_diagnostics(&self, file: &str) -> Option<Vec<tower_lsp::lsp_types::Diagnostic>> {
        if !self.host.contains(file) {
            return None;
        }
        let service = self.service.read().await.clone();
        Some(
            service
                .semantic_diagnostics(file)
                .iter()
                .filter_map(|d| self.to_lsp_diagnostic(d))
                .collect(),
        )
    }

    /// Publish diagnostics to the client.
    async fn publish_diagnostics(&self, uri: Url) {
        let file = DocumentHost::file_name(&uri);
        let Some(diagnostics) = self.lsp_diagnostics(&file).await else {
            return;
        };
        let version = self.host.version(&file);
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }

    async fn publish_all(&self) {
        for uri in self.host.uris() {
            self.publish_diagnostics(uri).await;
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        if let Some(root_uri) = params.root_uri.or_else(|| {
            params
                .workspace_folders
                .as_ref()
                .and_then(|folders| folders.first().map(|f| f.uri.clone()))
        }) {
            if let Ok(path) = root_uri.to_file_path() {
                *self.workspace_root.write().await = Some(path);
            }
        }

        if let Some(options) = params.initialization_options {
            self.store_settings(options).await;
        }

        if let Err(err) = self.reload_service().await {
            self.client
                .log_message(
                    MessageType::ERROR,
                    format!("Failed to load settings: {err:#}"),
                )
                .await;
        }

        Ok(InitializeResult {
            capabilities: ServerCapabilities {
                text_document_sync: Some(TextDocumentSyncCapability::Kind(
                    TextDocumentSyncKind::FULL,
                )),
                code_action_provider: Some(CodeActionProviderCapability::Options(
                    CodeActionOptions {
                        code_action_kinds: Some(vec![
                            CodeActionKind::QUICKFIX,
                            CodeActionKind::SOURCE_FIX_ALL,
                        ]),
                        work_done_progress_options: WorkDoneProgressOptions {
                            work_done_progress: None,
                        },
                        resolve_provider: Some(false),
                    },
                )),
                ..Default::default()
            },
            server_info: Some(ServerInfo {
                name: "Lintbridge Language Server".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
        })
    }

    async fn initialized(&self, _params: InitializedParams) {
        self.client
            .log_message(MessageType::INFO, "Lintbridge LSP initialized")
            .await;
    }

    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let doc = params.text_document;
        self.host.open(doc.uri.clone(), doc.text, doc.version);
        self.publish_diagnostics(doc.uri).await;
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        let uri = params.text_document.uri;
        let version = params.text_document.version;

        // With FULL sync, we get the complete new content
        if let Some(change) = params.content_changes.into_iter().last() {
            self.host.open(uri.clone(), change.text, version);
        }

        self.publish_diagnostics(uri).await;
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        let uri = params.text_document.uri;
        let is_settings = uri
            .to_file_path()
            .ok()
            .is_some_and(|path| path.ends_with(SETTINGS_FILE));

        if is_settings {
            if let Err(err) = self.reload_service().await {
                self.client
                    .log_message(
                        MessageType::ERROR,
                        format!("Failed to reload settings: {err:#}"),
                    )
                    .await;
            }
            self.publish_all().await;
        } else {
            self.publish_diagnostics(uri).await;
        }
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        self.store_settings(params.settings).await;
        if let Err(err) = self.reload_service().await {
            self.client
                .log_message(
                    MessageType::ERROR,
                    format!("Failed to reload settings: {err:#}"),
                )
                .await;
        }
        self.publish_all().await;
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let file = self.host.close(&params.text_document.uri);
        self.service.read().await.forget(&file);
        // Clear diagnostics
        self.client
            .publish_diagnostics(params.text_document.uri, vec![], None)
            .await;
    }

    async fn code_action(&self, params: CodeActionParams) -> Result<Option<CodeActionResponse>> {
        let uri = &params.text_document.uri;
        let file = DocumentHost::file_name(uri);
        if !self.host.contains(&file) {
            return Ok(None);
        }

        let service = self.service.read().await.clone();
        let mut seen = HashSet::new();
        let mut actions = Vec::new();

        for diag in &params.context.diagnostics {
            if diag.source.as_deref() != Some(DIAGNOSTIC_SOURCE) {
                continue;
            }
            let Some((start, end)) = self.diagnostic_offsets(&file, diag) else {
                continue;
            };
            for fix in service.code_fixes_at_position(&file, start, end, &[DIAGNOSTIC_CODE]) {
                if !seen.insert(dedup_key(&fix)) {
                    continue;
                }
                if let Some(action) = self.to_code_action(uri, &fix, diag) {
                    actions.push(CodeActionOrCommand::CodeAction(action));
                }
            }
        }

        if actions.is_empty() {
            Ok(None)
        } else {
            Ok(Some(actions))
        }
    }
}

#[tokio::main]
async fn main() {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(Backend::new);
    Server::new(stdin, stdout, socket).serve(service).await;
}
