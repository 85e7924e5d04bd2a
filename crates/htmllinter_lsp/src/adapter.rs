//! The document lint adapter.
//!
//! Turns document events into lint passes: it filters by language, resolves
//! the rule configuration, calls the [`Linter`], converts findings into
//! diagnostics and replaces the document's diagnostic set.
//!
//! Passes for the same document may overlap. Each pass takes a sequence
//! number when it is issued and its result is only published while that
//! number is still the latest one issued for the document, so a slow older
//! pass can never overwrite a newer one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use htmllinter_core::{HTML_LANGUAGE_ID, Linter};
use tower_lsp::lsp_types::Url;
use tracing::{debug, error, info};

use crate::config::{ConfigCache, DocumentConfig, SettingsSource, cache_key};
use crate::conversion::{LineIndex, to_lsp_diagnostic};
use crate::sink::{DiagnosticSink, LogSink, timestamped};

/// A copy of a document taken when an event fires.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentSnapshot {
    pub uri: Url,
    pub text: String,
    pub language_id: String,
    pub version: Option<i32>,
}

impl DocumentSnapshot {
    pub fn new(uri: Url, text: impl Into<String>, language_id: impl Into<String>) -> Self {
        Self {
            uri,
            text: text.into(),
            language_id: language_id.into(),
            version: None,
        }
    }

    pub fn with_version(mut self, version: i32) -> Self {
        self.version = Some(version);
        self
    }

    /// Whether the document is in the language this adapter lints.
    pub fn is_html(&self) -> bool {
        self.language_id == HTML_LANGUAGE_ID
    }
}

/// A lint pass that has been issued but not yet run.
#[derive(Debug)]
pub struct IssuedPass {
    document: DocumentSnapshot,
    sequence: u64,
}

impl IssuedPass {
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn document(&self) -> &DocumentSnapshot {
        &self.document
    }
}

/// How a lint pass ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassOutcome {
    /// The diagnostic set was replaced with this many diagnostics.
    Published(usize),
    /// A newer pass was issued (or the document closed) before this one
    /// finished; its result was dropped.
    Stale,
    /// The document matches an exclusion pattern. Its diagnostic set was
    /// emptied.
    Excluded,
    /// The linter failed with this reason. Diagnostics were left untouched.
    Failed(String),
}

/// Issues sequence numbers and remembers the latest one per document.
#[derive(Debug, Default)]
struct PassTracker {
    next: AtomicU64,
    latest: Mutex<HashMap<Url, u64>>,
}

impl PassTracker {
    fn issue(&self, uri: &Url) -> u64 {
        let sequence = self.next.fetch_add(1, Ordering::SeqCst) + 1;
        self.lock().insert(uri.clone(), sequence);
        sequence
    }

    fn is_latest(&self, uri: &Url, sequence: u64) -> bool {
        self.lock().get(uri) == Some(&sequence)
    }

    fn forget(&self, uri: &Url) {
        self.lock().remove(uri);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Url, u64>> {
        self.latest.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Adapts document events to linter calls and diagnostic updates.
pub struct LintAdapter {
    linter: RwLock<Arc<dyn Linter>>,
    settings: Arc<dyn SettingsSource>,
    cache: ConfigCache,
    diagnostics: Arc<dyn DiagnosticSink>,
    output: Arc<dyn LogSink>,
    passes: PassTracker,
    /// Serializes the staleness check with the publish that follows it.
    publish: tokio::sync::Mutex<()>,
}

impl LintAdapter {
    /// Creates an adapter from its injected capabilities.
    pub fn new(
        linter: Arc<dyn Linter>,
        settings: Arc<dyn SettingsSource>,
        diagnostics: Arc<dyn DiagnosticSink>,
        output: Arc<dyn LogSink>,
    ) -> Self {
        Self {
            linter: RwLock::new(linter),
            settings,
            cache: ConfigCache::new(),
            diagnostics,
            output,
            passes: PassTracker::default(),
            publish: tokio::sync::Mutex::new(()),
        }
    }

    /// Replaces the linter used by passes started from now on.
    pub fn set_linter(&self, linter: Arc<dyn Linter>) {
        match self.linter.write() {
            Ok(mut guard) => *guard = linter,
            Err(e) => error!("Linter lock poisoned: {}", e),
        }
    }

    /// The configuration cache.
    pub fn config_cache(&self) -> &ConfigCache {
        &self.cache
    }

    /// Handles a save or change event. Only HTML documents are linted.
    pub async fn on_relevant_event(&self, document: DocumentSnapshot) -> Option<PassOutcome> {
        if !document.is_html() {
            debug!(
                "Ignoring {} document: {}",
                document.language_id, document.uri
            );
            return None;
        }
        Some(self.lint_pass(document).await)
    }

    /// Lints every document in the visible set, whatever its language.
    pub async fn on_visible_set_changed(
        &self,
        documents: Vec<DocumentSnapshot>,
    ) -> Vec<PassOutcome> {
        let passes = self.issue_all(documents);
        self.run_passes(passes).await
    }

    /// Issues one pass per document, in order.
    pub fn issue_all(&self, documents: Vec<DocumentSnapshot>) -> Vec<IssuedPass> {
        documents.into_iter().map(|d| self.issue(d)).collect()
    }

    /// Runs issued passes one after another.
    pub async fn run_passes(&self, passes: Vec<IssuedPass>) -> Vec<PassOutcome> {
        let mut outcomes = Vec::with_capacity(passes.len());
        for pass in passes {
            outcomes.push(self.run_pass(pass).await);
        }
        outcomes
    }

    /// Handles a close event: forgets in-flight passes and cached
    /// configuration, then deletes the document's diagnostic set.
    pub async fn on_close(&self, uri: &Url) {
        self.passes.forget(uri);
        self.cache.invalidate(&cache_key(uri));

        let _guard = self.publish.lock().await;
        self.diagnostics.delete(uri.clone()).await;
    }

    /// Drops every cached configuration.
    pub fn invalidate_configuration(&self) {
        self.cache.clear();
    }

    /// Issues and runs one lint pass.
    pub async fn lint_pass(&self, document: DocumentSnapshot) -> PassOutcome {
        let pass = self.issue(document);
        self.run_pass(pass).await
    }

    /// Takes the next sequence number for the document.
    ///
    /// Issuing is synchronous so callers that spawn passes can fix their
    /// order at event time.
    pub fn issue(&self, document: DocumentSnapshot) -> IssuedPass {
        let sequence = self.passes.issue(&document.uri);
        IssuedPass { document, sequence }
    }

    /// Runs an issued pass to completion.
    pub async fn run_pass(&self, pass: IssuedPass) -> PassOutcome {
        let IssuedPass { document, sequence } = pass;
        debug!("Validating document: {} (pass {})", document.uri, sequence);

        let config = self.resolve_configuration(&document.uri).await;
        if config.excluded {
            debug!("Skipping excluded document: {}", document.uri);
            let _guard = self.publish.lock().await;
            if !self.passes.is_latest(&document.uri, sequence) {
                return PassOutcome::Stale;
            }
            self.diagnostics
                .set(document.uri, Vec::new(), document.version)
                .await;
            return PassOutcome::Excluded;
        }

        let linter = match self.linter.read() {
            Ok(guard) => Arc::clone(&guard),
            Err(e) => {
                error!("Linter lock poisoned: {}", e);
                return PassOutcome::Failed(e.to_string());
            }
        };

        let findings = match linter.lint(&document.text, &config.rules).await {
            Ok(findings) => findings,
            Err(e) => {
                error!("Lint error for {}: {}", document.uri, e);
                // a newer pass will report on this document
                let show = self.passes.is_latest(&document.uri, sequence);
                self.output_line(
                    &format!("ERROR: Linting \"{}\" failed: {}", document.uri, e),
                    show,
                )
                .await;
                return PassOutcome::Failed(e.to_string());
            }
        };

        if !self.passes.is_latest(&document.uri, sequence) {
            debug!("Discarding stale pass {} for {}", sequence, document.uri);
            return PassOutcome::Stale;
        }

        let lines = LineIndex::new(&document.text);
        let mut diagnostics = Vec::with_capacity(findings.len());
        for finding in &findings {
            let diagnostic = to_lsp_diagnostic(finding, &lines);
            self.output_line(&diagnostic.message, false).await;
            diagnostics.push(diagnostic);
        }

        let _guard = self.publish.lock().await;
        if !self.passes.is_latest(&document.uri, sequence) {
            debug!("Discarding stale pass {} for {}", sequence, document.uri);
            return PassOutcome::Stale;
        }

        let count = diagnostics.len();
        self.diagnostics
            .set(document.uri, diagnostics, document.version)
            .await;
        PassOutcome::Published(count)
    }

    /// Returns the configuration for `uri`, reading settings on a cache miss.
    pub async fn resolve_configuration(&self, uri: &Url) -> DocumentConfig {
        let key = cache_key(uri);
        if let Some(config) = self.cache.get(&key) {
            return config;
        }

        let generation = self.cache.generation();
        let settings = self.settings.settings_for(uri).await;
        let config = DocumentConfig::resolve(&settings, uri);

        info!("Resolved configuration for {}", key);
        self.output_line(
            &format!(
                "INFO: Linting for \"{}\" will be run with {} rule overrides extending {}.",
                key,
                config.rules.rules.len(),
                config.rules.extend
            ),
            false,
        )
        .await;

        if !self.cache.insert_if_current(key, config.clone(), generation) {
            debug!("Configuration changed while resolving {}, not caching", uri);
        }
        config
    }

    async fn output_line(&self, message: &str, show: bool) {
        self.output.append_line(&timestamped(message)).await;
        if show {
            self.output.show(message).await;
        }
    }
}
