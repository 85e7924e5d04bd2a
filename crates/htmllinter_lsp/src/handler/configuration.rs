//! Settings pushed by the client.

use htmllinter_core::SETTINGS_SECTION;
use tower_lsp::lsp_types::DidChangeConfigurationParams;
use tracing::{debug, error};

use crate::state::BackendState;

/// Handles the `workspace/didChangeConfiguration` notification.
pub async fn handle_did_change_configuration(
    state: &BackendState,
    params: DidChangeConfigurationParams,
) {
    debug!("Configuration changed");
    store_pushed_settings(state, params.settings);
}

/// Stores pushed settings, unwrapping the `htmllinter` section when the
/// client sends the whole settings tree.
pub(crate) fn store_pushed_settings(state: &BackendState, value: serde_json::Value) {
    let section = match value {
        serde_json::Value::Object(mut map) if map.contains_key(SETTINGS_SECTION) => map
            .remove(SETTINGS_SECTION)
            .unwrap_or(serde_json::Value::Null),
        other => other,
    };

    match state.pushed_settings.write() {
        Ok(mut guard) => *guard = section,
        Err(e) => error!("Pushed settings lock poisoned: {}", e),
    }
}
