//! Watched files handler.

use htmllinter_core::Settings;
use tower_lsp::lsp_types::*;
use tracing::{debug, info};

use crate::config::reload_config;
use crate::state::BackendState;

/// Handles the `workspace/didChangeWatchedFiles` notification.
///
/// Returns `true` when a config file changed and was reloaded.
pub async fn handle_did_change_watched_files(
    state: &BackendState,
    params: DidChangeWatchedFilesParams,
) -> bool {
    debug!("Watched files changed: {:?}", params.changes);

    let config_changed = params.changes.iter().any(|change| match &state.config_path {
        Some(config_path) => change.uri.to_file_path().ok().as_ref() == Some(config_path),
        None => {
            let path = change.uri.path();
            Settings::CONFIG_FILES
                .iter()
                .any(|name| path.ends_with(name))
        }
    });

    if config_changed {
        info!("Configuration file changed, reloading...");
        reload_config(state);
    }

    config_changed
}
