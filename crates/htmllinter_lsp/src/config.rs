//! Configuration sources and the per-document configuration cache.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use htmllinter_core::{RuleConfiguration, Settings};
use tower_lsp::lsp_types::Url;
use tracing::{error, info, warn};

use crate::state::BackendState;

/// Supplies the settings that apply to a document.
#[async_trait]
pub trait SettingsSource: Send + Sync {
    async fn settings_for(&self, uri: &Url) -> Settings;
}

/// A [`SettingsSource`] returning the same settings for every document.
#[derive(Debug, Default)]
pub struct StaticSettings {
    settings: RwLock<Settings>,
    reads: AtomicUsize,
}

impl StaticSettings {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings: RwLock::new(settings),
            reads: AtomicUsize::new(0),
        }
    }

    /// Swaps the settings returned from now on.
    pub fn replace(&self, settings: Settings) {
        *self.settings.write().unwrap_or_else(PoisonError::into_inner) = settings;
    }

    /// Number of times settings were read.
    pub fn read_count(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SettingsSource for StaticSettings {
    async fn settings_for(&self, _uri: &Url) -> Settings {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.settings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

/// Configuration resolved for one document.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentConfig {
    /// Rules handed to the linter.
    pub rules: RuleConfiguration,
    /// Whether the document matches an exclusion glob.
    pub excluded: bool,
}

impl DocumentConfig {
    /// Resolves `settings` for the document at `uri`.
    pub fn resolve(settings: &Settings, uri: &Url) -> Self {
        let excluded = match (settings.exclude_set(), uri.to_file_path()) {
            (Ok(Some(set)), Ok(path)) => set.is_match(path),
            (Err(e), _) => {
                warn!("Ignoring exclude patterns: {}", e);
                false
            }
            _ => false,
        };

        Self {
            rules: settings.rule_configuration(),
            excluded,
        }
    }
}

/// Identity a document's configuration is cached under: its file path, or
/// the URI itself for non-file documents.
pub fn cache_key(uri: &Url) -> String {
    uri.to_file_path()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|_| uri.to_string())
}

/// Per-document configuration cache with explicit invalidation.
///
/// Every invalidation bumps a generation counter. A configuration read
/// before an invalidation is refused by [`ConfigCache::insert_if_current`],
/// so a slow settings lookup cannot bring back settings that were dropped
/// while it was waiting.
#[derive(Debug, Default)]
pub struct ConfigCache {
    inner: Mutex<CacheEntries>,
}

#[derive(Debug, Default)]
struct CacheEntries {
    entries: HashMap<String, DocumentConfig>,
    generation: u64,
}

impl ConfigCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<DocumentConfig> {
        self.lock().entries.get(key).cloned()
    }

    /// Current generation. Take it before reading settings.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Stores `config` unless the cache was invalidated since `generation`
    /// was taken. Returns whether it was stored.
    pub fn insert_if_current(&self, key: String, config: DocumentConfig, generation: u64) -> bool {
        let mut inner = self.lock();
        if inner.generation != generation {
            return false;
        }
        inner.entries.insert(key, config);
        true
    }

    /// Drops the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &str) -> bool {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.entries.remove(key).is_some()
    }

    /// Drops every entry.
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.entries.clear();
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().entries.contains_key(key)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheEntries> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Reloads the config file: the explicit config path when one was given,
/// otherwise the file discovered in the workspace root.
///
/// Returns `true` when the stored file settings changed.
pub(crate) fn reload_config(state: &BackendState) -> bool {
    let found = match &state.config_path {
        Some(path) => Some(path.clone()),
        None => {
            let root = match state.workspace_root.read() {
                Ok(g) => g.clone(),
                Err(e) => {
                    error!("Workspace root lock poisoned: {}", e);
                    return false;
                }
            };

            match root {
                Some(root) => Settings::discover(&root),
                None => return false,
            }
        }
    };

    let loaded = match found {
        Some(config_path) => {
            info!("Found config file: {}", config_path.display());
            match Settings::from_file(&config_path) {
                Ok(settings) => {
                    info!("Loaded configuration from workspace");
                    Some(settings)
                }
                Err(e) => {
                    error!("Failed to load config: {}", e);
                    return false;
                }
            }
        }
        None => None,
    };

    match state.file_settings.write() {
        Ok(mut guard) => {
            let changed = *guard != loaded;
            *guard = loaded;
            changed
        }
        Err(e) => {
            error!("File settings lock poisoned: {}", e);
            false
        }
    }
}
