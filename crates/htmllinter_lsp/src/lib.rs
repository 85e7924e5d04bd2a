//! htmllinter LSP Server
//!
//! Language Server Protocol implementation that runs the external HTML
//! linter on document events and publishes its findings as diagnostics.

mod adapter;
mod client;
mod config;
mod conversion;
mod handler;
mod sink;
mod state;

use std::path::PathBuf;
use std::sync::Arc;

use htmllinter_core::{CommandLinter, HTML_LANGUAGE_ID, Settings};
use tower_lsp::jsonrpc::Result;
use tower_lsp::lsp_types::*;
use tower_lsp::{Client, LanguageServer, LspService, Server};
use tracing::{debug, error, info};

pub use adapter::{DocumentSnapshot, IssuedPass, LintAdapter, PassOutcome};
pub use config::{ConfigCache, DocumentConfig, SettingsSource, StaticSettings, cache_key};
pub use conversion::{LineIndex, to_lsp_diagnostic, to_lsp_severity};
pub use handler::{DID_CHANGE_VISIBLE_DOCUMENTS, VisibleDocumentsParams};
pub use sink::{DiagnosticCollection, DiagnosticSink, LogSink, OutputChannel, timestamped};

use client::{ClientDiagnostics, ClientOutput, WorkspaceSettings};
use state::{BackendState, SharedState};

/// The LSP backend for htmllinter.
#[derive(Clone)]
pub struct Backend {
    /// LSP client for sending notifications.
    client: Client,
    /// Shared state
    state: SharedState,
    /// Event-to-diagnostics adapter.
    adapter: Arc<LintAdapter>,
}

impl Backend {
    /// Creates a new backend with the given client.
    pub fn new(client: Client) -> Self {
        Self::with_config_path(client, None)
    }

    /// Creates a backend that reads settings from `config_path` instead of
    /// discovering a config file in the workspace root.
    pub fn with_config_path(client: Client, config_path: Option<PathBuf>) -> Self {
        let state: SharedState = Arc::new(BackendState::with_config_path(config_path));
        let linter = Arc::new(CommandLinter::new(&Settings::default().linter_command()));

        let adapter = LintAdapter::new(
            linter,
            Arc::new(WorkspaceSettings::new(client.clone(), state.clone())),
            Arc::new(ClientDiagnostics::new(client.clone())),
            Arc::new(ClientOutput::new(client.clone())),
        );

        Self {
            client,
            state,
            adapter: Arc::new(adapter),
        }
    }

    /// Handles `htmllinter/didChangeVisibleDocuments`.
    ///
    /// Like [`Backend::spawn_relevant`], the passes are issued here so a
    /// change arriving before the task runs still supersedes them.
    pub async fn did_change_visible_documents(&self, params: VisibleDocumentsParams) {
        let documents = handler::handle_visible_documents(&self.state, params).await;
        if documents.is_empty() {
            return;
        }

        let passes = self.adapter.issue_all(documents);
        let adapter = self.adapter.clone();
        tokio::spawn(async move {
            adapter.run_passes(passes).await;
        });
    }

    /// Starts a pass for an HTML document without blocking the handler.
    ///
    /// The pass is issued before spawning so passes keep event order.
    fn spawn_relevant(&self, document: DocumentSnapshot) {
        if !document.is_html() {
            debug!(
                "Ignoring {} document: {}",
                document.language_id, document.uri
            );
            return;
        }

        let pass = self.adapter.issue(document);
        let adapter = self.adapter.clone();
        tokio::spawn(async move {
            adapter.run_pass(pass).await;
        });
    }

    /// Rebuilds the linter from the current settings.
    ///
    /// The linter command is workspace-wide, so it is read from the config
    /// file and pushed settings rather than per document.
    fn rebuild_linter(&self) {
        let file = match self.state.file_settings.read() {
            Ok(guard) => guard.clone().unwrap_or_default(),
            Err(e) => {
                error!("File settings lock poisoned: {}", e);
                return;
            }
        };
        let pushed = match self.state.pushed_settings.read() {
            Ok(guard) => Settings::from_value(guard.clone()).unwrap_or_default(),
            Err(e) => {
                error!("Pushed settings lock poisoned: {}", e);
                return;
            }
        };
        let root: Option<PathBuf> = match self.state.workspace_root.read() {
            Ok(guard) => guard.clone(),
            Err(e) => {
                error!("Workspace root lock poisoned: {}", e);
                return;
            }
        };

        let command = file.merged_with(pushed).linter_command();
        info!("Using linter: {} {:?}", command.command, command.args);

        let mut linter = CommandLinter::new(&command);
        if let Some(root) = root {
            linter = linter.with_working_dir(root);
        }
        self.adapter.set_linter(Arc::new(linter));
    }

    /// Drops cached configuration and relints every open HTML document.
    fn refresh(&self) {
        self.rebuild_linter();
        self.adapter.invalidate_configuration();

        for document in handler::open_documents(&self.state) {
            self.spawn_relevant(document);
        }
    }
}

#[tower_lsp::async_trait]
impl LanguageServer for Backend {
    async fn initialize(&self, params: InitializeParams) -> Result<InitializeResult> {
        let result = handler::handle_initialize(&self.state, params).await;
        self.rebuild_linter();
        result
    }

    async fn initialized(&self, _: InitializedParams) {
        handler::handle_initialized(&self.client).await;
    }

    async fn shutdown(&self) -> Result<()> {
        handler::handle_shutdown().await
    }

    async fn did_open(&self, params: DidOpenTextDocumentParams) {
        let document = handler::handle_did_open(&self.state, params).await;
        self.spawn_relevant(document);
    }

    async fn did_change(&self, params: DidChangeTextDocumentParams) {
        if let Some(document) = handler::handle_did_change(&self.state, params).await {
            self.spawn_relevant(document);
        }
    }

    async fn did_save(&self, params: DidSaveTextDocumentParams) {
        if let Some(document) = handler::handle_did_save(&self.state, params).await {
            self.spawn_relevant(document);
        }
    }

    async fn did_close(&self, params: DidCloseTextDocumentParams) {
        let uri = handler::handle_did_close(&self.state, params).await;
        self.adapter.on_close(&uri).await;
    }

    async fn did_change_configuration(&self, params: DidChangeConfigurationParams) {
        handler::handle_did_change_configuration(&self.state, params).await;
        self.refresh();
    }

    async fn did_change_watched_files(&self, params: DidChangeWatchedFilesParams) {
        if handler::handle_did_change_watched_files(&self.state, params).await {
            self.refresh();
        }
    }
}

/// Builds the service with the custom visible-documents notification.
pub fn build_service() -> (LspService<Backend>, tower_lsp::ClientSocket) {
    build_service_with_config(None)
}

/// Builds the service, reading settings from `config_path` when given.
pub fn build_service_with_config(
    config_path: Option<PathBuf>,
) -> (LspService<Backend>, tower_lsp::ClientSocket) {
    LspService::build(move |client| Backend::with_config_path(client, config_path))
        .custom_method(
            DID_CHANGE_VISIBLE_DOCUMENTS,
            Backend::did_change_visible_documents,
        )
        .finish()
}

/// Starts the LSP server.
///
/// This function does not return unless an error occurs or the server shuts down.
pub async fn run(config_path: Option<PathBuf>) {
    info!("htmllinter LSP server starting (language: {})...", HTML_LANGUAGE_ID);
    if let Some(path) = &config_path {
        info!("Using config: {}", path.display());
    }

    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = build_service_with_config(config_path);
    Server::new(stdin, stdout, socket).serve(service).await;
}
