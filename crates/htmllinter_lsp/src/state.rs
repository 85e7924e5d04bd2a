//! LSP Backend state management.

use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, RwLock};

use htmllinter_core::Settings;
use tower_lsp::lsp_types::Url;

use crate::adapter::DocumentSnapshot;

/// Document content, version and language cache.
#[derive(Debug)]
pub(crate) struct DocumentData {
    pub text: String,
    pub version: i32,
    pub language_id: String,
}

impl DocumentData {
    /// Copies the document out for a lint pass.
    pub fn snapshot(&self, uri: &Url) -> DocumentSnapshot {
        DocumentSnapshot {
            uri: uri.clone(),
            text: self.text.clone(),
            language_id: self.language_id.clone(),
            version: Some(self.version),
        }
    }
}

/// Shared backend state.
pub(crate) struct BackendState {
    /// Open documents.
    pub documents: RwLock<HashMap<Url, DocumentData>>,
    /// Workspace root path.
    pub workspace_root: RwLock<Option<PathBuf>>,
    /// Config file given on the command line. Replaces discovery in the
    /// workspace root.
    pub config_path: Option<PathBuf>,
    /// Settings loaded from the workspace config file.
    pub file_settings: RwLock<Option<Settings>>,
    /// Settings pushed by the client through initialization options or
    /// `workspace/didChangeConfiguration`.
    pub pushed_settings: RwLock<serde_json::Value>,
    /// Whether the client answers `workspace/configuration` requests.
    pub supports_configuration: AtomicBool,
}

impl fmt::Debug for BackendState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendState")
            .field("documents", &"<HashMap<Url, DocumentData>>")
            .field("workspace_root", &self.workspace_root)
            .field("config_path", &self.config_path)
            .field("file_settings", &self.file_settings)
            .field("supports_configuration", &self.supports_configuration)
            .finish()
    }
}

impl BackendState {
    /// Creates a new empty state.
    pub fn new() -> Self {
        Self::with_config_path(None)
    }

    /// Creates a new empty state reading settings from `config_path`.
    pub fn with_config_path(config_path: Option<PathBuf>) -> Self {
        Self {
            documents: RwLock::new(HashMap::new()),
            workspace_root: RwLock::new(None),
            config_path,
            file_settings: RwLock::new(None),
            pushed_settings: RwLock::new(serde_json::Value::Null),
            supports_configuration: AtomicBool::new(false),
        }
    }
}

impl Default for BackendState {
    fn default() -> Self {
        Self::new()
    }
}

/// Type alias for shared state.
pub(crate) type SharedState = Arc<BackendState>;
