//! LSP command implementation

use std::path::PathBuf;

use miette::Result;

use crate::utils::create_tokio_runtime;

pub fn run_lsp(config: Option<PathBuf>) -> Result<()> {
    create_tokio_runtime()?.block_on(async {
        htmllinter_lsp::run(config).await;
    });
    Ok(())
}
