//! CLI argument definitions

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// htmllinter - HTML lint diagnostics for editors
#[derive(Parser)]
#[command(name = "htmllinter")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Lint HTML files once and print the findings
    Lint {
        /// Files to lint
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Start the LSP server on stdio
    Lsp,
}
