//! # htmllinter_core
//!
//! Shared building blocks for the htmllinter editor integration.
//!
//! This crate provides:
//! - The `Finding` type reported by the external HTML linter
//! - Rule configuration and settings loading
//! - The `Linter` contract and a process-backed implementation
//!
//! ## Example
//!
//! ```rust,ignore
//! use htmllinter_core::{CommandLinter, Linter, Settings};
//!
//! let settings = Settings::from_file(".htmllinterrc.json")?;
//! let linter = CommandLinter::new(&settings.linter_command());
//!
//! let findings = linter.lint("<div></div>", &settings.rule_configuration()).await?;
//! for finding in findings {
//!     println!("{}", finding.display_message());
//! }
//! ```

mod config;
mod error;
mod finding;
mod linter;

pub use config::{
    DEFAULT_BASE_CONFIG, LinterCommand, RuleConfiguration, RuleLevel, RuleSetting,
    SETTINGS_SECTION, Settings,
};
pub use error::LinterError;
pub use finding::{Finding, FindingKind, FindingNode, Location, PLUGIN_NAME};
pub use linter::{CommandLinter, DEFAULT_LINTER_PROGRAM, Linter, parse_findings};

/// Language identifier of the documents this linter handles.
pub const HTML_LANGUAGE_ID: &str = "html";
