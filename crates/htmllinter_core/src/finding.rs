//! Findings reported by the external linter.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name used as the diagnostic source and message prefix.
pub const PLUGIN_NAME: &str = "htmllinter";

/// Severity class of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingKind {
    /// A rule violation configured as an error.
    Error,
    /// A rule violation configured as a warning.
    #[serde(alias = "warning")]
    Warn,
}

impl fmt::Display for FindingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FindingKind::Error => write!(f, "error"),
            FindingKind::Warn => write!(f, "warn"),
        }
    }
}

/// Source location of a finding. Both fields are 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    pub line: u32,
    pub col: u32,
}

/// The node a finding is attached to. Only its location is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingNode {
    pub location: Location,
}

/// A single rule violation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    /// Rule that produced the finding.
    pub rule_name: String,
    /// Severity class.
    #[serde(rename = "type")]
    pub kind: FindingKind,
    /// Human readable message.
    pub message: String,
    /// Node carrying the source location.
    pub node: FindingNode,
}

impl Finding {
    /// Creates a finding at the given 1-indexed line and column.
    pub fn new(
        rule_name: impl Into<String>,
        kind: FindingKind,
        message: impl Into<String>,
        line: u32,
        col: u32,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            kind,
            message: message.into(),
            node: FindingNode {
                location: Location { line, col },
            },
        }
    }

    /// 1-indexed line.
    pub fn line(&self) -> u32 {
        self.node.location.line
    }

    /// 1-indexed column.
    pub fn col(&self) -> u32 {
        self.node.location.col
    }

    /// Returns `true` for error-class findings.
    pub fn is_error(&self) -> bool {
        self.kind == FindingKind::Error
    }

    /// Formats the finding as `htmllinter/<rule>: <message> [<line>:<col>]`.
    pub fn display_message(&self) -> String {
        format!(
            "{}/{}: {} [{}:{}]",
            PLUGIN_NAME,
            self.rule_name,
            self.message,
            self.line(),
            self.col()
        )
    }
}
