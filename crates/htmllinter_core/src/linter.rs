//! The external linter contract.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::{Finding, LinterCommand, LinterError, RuleConfiguration};

/// Program run when no linter command is configured.
pub const DEFAULT_LINTER_PROGRAM: &str = "htmllinter-run";

/// Lints HTML source text.
///
/// Implementations own the rule engine. Callers only see text in and
/// findings out.
#[async_trait]
pub trait Linter: Send + Sync {
    /// Lints `source` with the given rule configuration.
    async fn lint(
        &self,
        source: &str,
        config: &RuleConfiguration,
    ) -> Result<Vec<Finding>, LinterError>;
}

#[derive(Serialize)]
struct LintRequest<'a> {
    source: &'a str,
    config: &'a RuleConfiguration,
}

/// Runs an external program per lint call.
///
/// The program receives `{"source": ..., "config": ...}` on stdin and must
/// print a JSON array of findings on stdout.
#[derive(Debug, Clone)]
pub struct CommandLinter {
    program: String,
    args: Vec<String>,
    working_dir: Option<PathBuf>,
}

impl CommandLinter {
    /// Creates a linter for the given command.
    pub fn new(command: &LinterCommand) -> Self {
        Self {
            program: command.command.clone(),
            args: command.args.clone(),
            working_dir: None,
        }
    }

    /// Runs the program from `dir`.
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Program name or path.
    pub fn program(&self) -> &str {
        &self.program
    }
}

#[async_trait]
impl Linter for CommandLinter {
    async fn lint(
        &self,
        source: &str,
        config: &RuleConfiguration,
    ) -> Result<Vec<Finding>, LinterError> {
        let request = serde_json::to_vec(&LintRequest { source, config })?;

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.working_dir {
            command.current_dir(dir);
        }

        debug!("Running linter: {} {:?}", self.program, self.args);
        let mut child = command
            .spawn()
            .map_err(|e| LinterError::spawn(&self.program, e))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| LinterError::Internal("linter stdin was not captured".to_string()))?;

        // Feed stdin concurrently so a chatty child cannot fill its stdout pipe
        // while we are still writing.
        let writer = tokio::spawn(async move {
            stdin.write_all(&request).await?;
            stdin.shutdown().await
        });

        let output = child.wait_with_output().await?;

        match writer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => warn!("Failed to write linter input: {}", e),
            Err(e) => return Err(LinterError::Internal(format!("stdin writer failed: {}", e))),
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() && stdout.trim().is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(LinterError::process(format!(
                "{} ({})",
                stderr.trim(),
                output.status
            )));
        }

        parse_findings(&stdout)
    }
}

/// Parses the linter's stdout. Blank output means no findings.
pub fn parse_findings(stdout: &str) -> Result<Vec<Finding>, LinterError> {
    let trimmed = stdout.trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    serde_json::from_str(trimmed).map_err(|e| LinterError::output(e.to_string()))
}
