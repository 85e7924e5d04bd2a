//! Document lifecycle handlers (open, change, save, close).

use tower_lsp::lsp_types::*;
use tracing::{debug, error};

use crate::adapter::DocumentSnapshot;
use crate::state::{DocumentData, SharedState};

/// Handles the `textDocument/didOpen` notification.
pub async fn handle_did_open(
    state: &SharedState,
    params: DidOpenTextDocumentParams,
) -> DocumentSnapshot {
    debug!("Document opened: {}", params.text_document.uri);

    let item = params.text_document;
    let data = DocumentData {
        text: item.text,
        version: item.version,
        language_id: item.language_id,
    };
    let snapshot = data.snapshot(&item.uri);

    match state.documents.write() {
        Ok(mut docs) => {
            docs.insert(item.uri, data);
        }
        Err(e) => error!("Documents lock poisoned: {}", e),
    }

    snapshot
}

/// Handles the `textDocument/didChange` notification.
///
/// Returns the updated document, or `None` if it was never opened.
pub async fn handle_did_change(
    state: &SharedState,
    params: DidChangeTextDocumentParams,
) -> Option<DocumentSnapshot> {
    debug!("Document changed: {}", params.text_document.uri);

    // FULL sync: the last change carries the whole text
    let change = params.content_changes.into_iter().last()?;
    let uri = params.text_document.uri;

    let mut docs = match state.documents.write() {
        Ok(guard) => guard,
        Err(e) => {
            error!("Documents lock poisoned: {}", e);
            return None;
        }
    };

    let Some(doc) = docs.get_mut(&uri) else {
        debug!("Change for unknown document: {}", uri);
        return None;
    };
    doc.text = change.text;
    doc.version = params.text_document.version;

    Some(doc.snapshot(&uri))
}

/// Handles the `textDocument/didSave` notification.
///
/// Stores the saved text when the client includes it.
pub async fn handle_did_save(
    state: &SharedState,
    params: DidSaveTextDocumentParams,
) -> Option<DocumentSnapshot> {
    debug!("Document saved: {}", params.text_document.uri);

    let uri = params.text_document.uri;
    let mut docs = match state.documents.write() {
        Ok(guard) => guard,
        Err(e) => {
            error!("Documents lock poisoned: {}", e);
            return None;
        }
    };

    let doc = docs.get_mut(&uri)?;
    if let Some(text) = params.text {
        doc.text = text;
    }

    Some(doc.snapshot(&uri))
}

/// Handles the `textDocument/didClose` notification.
pub async fn handle_did_close(state: &SharedState, params: DidCloseTextDocumentParams) -> Url {
    debug!("Document closed: {}", params.text_document.uri);

    match state.documents.write() {
        Ok(mut docs) => {
            docs.remove(&params.text_document.uri);
        }
        Err(e) => error!("Documents lock poisoned: {}", e),
    }

    params.text_document.uri
}

/// Snapshots of every open document.
pub fn open_documents(state: &SharedState) -> Vec<DocumentSnapshot> {
    match state.documents.read() {
        Ok(docs) => docs.iter().map(|(uri, doc)| doc.snapshot(uri)).collect(),
        Err(e) => {
            error!("Documents lock poisoned: {}", e);
            Vec::new()
        }
    }
}
