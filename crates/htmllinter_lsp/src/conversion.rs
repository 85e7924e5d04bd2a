//! LSP type conversion utilities.

use htmllinter_core::{Finding, FindingKind, PLUGIN_NAME};
use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, NumberOrString, Position, Range};

/// Converts a finding to an LSP diagnostic spanning the finding's whole line.
pub fn to_lsp_diagnostic(finding: &Finding, lines: &LineIndex<'_>) -> Diagnostic {
    Diagnostic {
        range: lines.line_range(finding.line().saturating_sub(1)),
        severity: Some(to_lsp_severity(finding.kind)),
        code: Some(NumberOrString::String(finding.rule_name.clone())),
        source: Some(PLUGIN_NAME.to_string()),
        message: finding.display_message(),
        ..Default::default()
    }
}

/// Maps a finding's severity class to the LSP severity.
pub fn to_lsp_severity(kind: FindingKind) -> DiagnosticSeverity {
    match kind {
        FindingKind::Error => DiagnosticSeverity::ERROR,
        FindingKind::Warn => DiagnosticSeverity::WARNING,
    }
}

/// The lines of a document, split once per lint pass.
#[derive(Debug, Clone)]
pub struct LineIndex<'a> {
    lines: Vec<&'a str>,
}

impl<'a> LineIndex<'a> {
    pub fn new(text: &'a str) -> Self {
        Self {
            lines: text.split('\n').collect(),
        }
    }

    /// Range covering the 0-indexed `line`, excluding the line break.
    ///
    /// Lines past the end of the document are clamped to the last line.
    pub fn line_range(&self, line: u32) -> Range {
        let index = (line as usize).min(self.lines.len().saturating_sub(1));
        let raw = self.lines.get(index).copied().unwrap_or_default();

        let content = raw.strip_suffix('\r').unwrap_or(raw);
        let width: u32 = content.chars().map(|ch| ch.len_utf16() as u32).sum();

        Range::new(
            Position::new(index as u32, 0),
            Position::new(index as u32, width),
        )
    }
}
