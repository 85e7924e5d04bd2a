//! LSP request/notification handlers.

mod configuration;
mod documents;
mod files;
mod initialize;
mod visible;

pub use configuration::handle_did_change_configuration;
pub use documents::{
    handle_did_change, handle_did_close, handle_did_open, handle_did_save, open_documents,
};
pub use files::handle_did_change_watched_files;
pub use initialize::{handle_initialize, handle_initialized, handle_shutdown};
pub use visible::{DID_CHANGE_VISIBLE_DOCUMENTS, VisibleDocumentsParams, handle_visible_documents};
