//! Outbound sinks for diagnostics and log lines.
//!
//! The adapter never talks to the editor directly. It writes to these
//! capabilities, which the server backs with the LSP client and tests back
//! with the in-memory collections below.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use chrono::Local;
use tower_lsp::lsp_types::{Diagnostic, Url};

/// Per-document diagnostic store rendered by the editor.
#[async_trait]
pub trait DiagnosticSink: Send + Sync {
    /// Replaces every diagnostic of `uri`.
    async fn set(&self, uri: Url, diagnostics: Vec<Diagnostic>, version: Option<i32>);

    /// Removes the diagnostics of `uri`.
    async fn delete(&self, uri: Url);
}

/// Append-only text channel.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Appends one line.
    async fn append_line(&self, line: &str);

    /// Brings the channel to the user's attention with `line`.
    async fn show(&self, line: &str);
}

/// Prefixes `message` with the local wall-clock time.
pub fn timestamped(message: &str) -> String {
    format!("[{}] {}", Local::now().format("%H:%M:%S"), message)
}

/// In-memory [`DiagnosticSink`].
#[derive(Debug, Default)]
pub struct DiagnosticCollection {
    sets: Mutex<HashMap<Url, Vec<Diagnostic>>>,
    updates: AtomicUsize,
}

impl DiagnosticCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Diagnostics currently stored for `uri`, or `None` if it has no set.
    pub fn get(&self, uri: &Url) -> Option<Vec<Diagnostic>> {
        self.sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(uri)
            .cloned()
    }

    /// Number of `set` and `delete` calls received.
    pub fn update_count(&self) -> usize {
        self.updates.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagnosticSink for DiagnosticCollection {
    async fn set(&self, uri: Url, diagnostics: Vec<Diagnostic>, _version: Option<i32>) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(uri, diagnostics);
    }

    async fn delete(&self, uri: Url) {
        self.updates.fetch_add(1, Ordering::SeqCst);
        self.sets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&uri);
    }
}

/// In-memory [`LogSink`].
#[derive(Debug, Default)]
pub struct OutputChannel {
    lines: Mutex<Vec<String>>,
    shown: Mutex<Vec<String>>,
}

impl OutputChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every appended line.
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Lines the channel was shown with.
    pub fn shown(&self) -> Vec<String> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl LogSink for OutputChannel {
    async fn append_line(&self, line: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }

    async fn show(&self, line: &str) {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line.to_string());
    }
}
