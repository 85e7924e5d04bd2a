//! Visible document set notification.

use serde::{Deserialize, Serialize};
use tower_lsp::lsp_types::Url;
use tracing::{debug, error};

use crate::adapter::DocumentSnapshot;
use crate::state::SharedState;

/// Method name of the visible-documents notification.
pub const DID_CHANGE_VISIBLE_DOCUMENTS: &str = "htmllinter/didChangeVisibleDocuments";

/// Params of `htmllinter/didChangeVisibleDocuments`: the documents now
/// shown in editors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibleDocumentsParams {
    pub uris: Vec<Url>,
}

/// Resolves the visible URIs to open documents. Unknown URIs are skipped.
pub async fn handle_visible_documents(
    state: &SharedState,
    params: VisibleDocumentsParams,
) -> Vec<DocumentSnapshot> {
    debug!("Visible documents changed: {} editors", params.uris.len());

    let docs = match state.documents.read() {
        Ok(guard) => guard,
        Err(e) => {
            error!("Documents lock poisoned: {}", e);
            return Vec::new();
        }
    };

    params
        .uris
        .iter()
        .filter_map(|uri| match docs.get(uri) {
            Some(doc) => Some(doc.snapshot(uri)),
            None => {
                debug!("Visible document is not open: {}", uri);
                None
            }
        })
        .collect()
}
