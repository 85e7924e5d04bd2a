//! Sinks and settings backed by the LSP client.

use std::sync::atomic::Ordering;

use async_trait::async_trait;
use htmllinter_core::{SETTINGS_SECTION, Settings};
use tower_lsp::Client;
use tower_lsp::lsp_types::{ConfigurationItem, Diagnostic, MessageType, Url};
use tracing::{error, warn};

use crate::config::SettingsSource;
use crate::sink::{DiagnosticSink, LogSink};
use crate::state::SharedState;

/// Publishes diagnostics with `textDocument/publishDiagnostics`.
pub(crate) struct ClientDiagnostics {
    client: Client,
}

impl ClientDiagnostics {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl DiagnosticSink for ClientDiagnostics {
    async fn set(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>) {
        self.client
            .publish_diagnostics(uri, diagnostics, version)
            .await;
    }

    async fn delete(&self, uri: Url) {
        self.client.publish_diagnostics(uri, vec![], None).await;
    }
}

/// Writes log lines with `window/logMessage`.
pub(crate) struct ClientOutput {
    client: Client,
}

impl ClientOutput {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl LogSink for ClientOutput {
    async fn append_line(&self, line: &str) {
        self.client.log_message(MessageType::LOG, line).await;
    }

    async fn show(&self, line: &str) {
        self.client.show_message(MessageType::WARNING, line).await;
    }
}

/// Reads the `htmllinter` settings section for a document.
///
/// Pulls with `workspace/configuration` when the client supports it and
/// falls back to pushed settings otherwise. The workspace config file, if
/// any, provides the defaults underneath.
pub(crate) struct WorkspaceSettings {
    client: Client,
    state: SharedState,
}

impl WorkspaceSettings {
    pub fn new(client: Client, state: SharedState) -> Self {
        Self { client, state }
    }

    async fn host_value(&self, uri: &Url) -> serde_json::Value {
        if self.state.supports_configuration.load(Ordering::Acquire) {
            let item = ConfigurationItem {
                scope_uri: Some(uri.clone()),
                section: Some(SETTINGS_SECTION.to_string()),
            };
            match self.client.configuration(vec![item]).await {
                Ok(mut values) => return values.pop().unwrap_or(serde_json::Value::Null),
                Err(e) => warn!("workspace/configuration failed, using pushed settings: {}", e),
            }
        }

        match self.state.pushed_settings.read() {
            Ok(value) => value.clone(),
            Err(e) => {
                error!("Pushed settings lock poisoned: {}", e);
                serde_json::Value::Null
            }
        }
    }
}

#[async_trait]
impl SettingsSource for WorkspaceSettings {
    async fn settings_for(&self, uri: &Url) -> Settings {
        let host = match Settings::from_value(self.host_value(uri).await) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Ignoring editor settings: {}", e);
                Settings::default()
            }
        };

        let file = match self.state.file_settings.read() {
            Ok(guard) => guard.clone().unwrap_or_default(),
            Err(e) => {
                error!("File settings lock poisoned: {}", e);
                Settings::default()
            }
        };

        file.merged_with(host)
    }
}
