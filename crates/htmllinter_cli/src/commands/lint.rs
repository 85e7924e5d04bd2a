//! Lint command implementation

use std::path::PathBuf;

use htmllinter_core::{CommandLinter, Finding, Linter, Settings};
use miette::{IntoDiagnostic, Result, WrapErr};
use tracing::info;

use crate::cli::Cli;
use crate::utils::create_tokio_runtime;

/// Lints each file and prints one line per finding.
///
/// Returns `true` if any error-class finding was reported.
pub fn run_lint(cli: &Cli, files: &[PathBuf]) -> Result<bool> {
    let settings = match &cli.config {
        Some(path) => Settings::from_file(path).into_diagnostic()?,
        None => find_config()?,
    };

    let config = settings.rule_configuration();
    let excludes = settings.exclude_set().into_diagnostic()?;
    let linter = CommandLinter::new(&settings.linter_command());
    let runtime = create_tokio_runtime()?;

    let mut checked = 0;
    let mut total_issues = 0;
    let mut has_errors = false;

    for path in files {
        if excludes.as_ref().is_some_and(|set| set.is_match(path)) {
            info!("Skipping excluded file: {}", path.display());
            continue;
        }

        let text = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to read {}", path.display()))?;
        let findings = runtime
            .block_on(linter.lint(&text, &config))
            .into_diagnostic()
            .wrap_err_with(|| format!("Failed to lint {}", path.display()))?;

        for finding in &findings {
            println!(
                "{}:{}:{} {} {}",
                path.display(),
                finding.line(),
                finding.col(),
                finding.kind,
                finding.display_message()
            );
        }

        checked += 1;
        total_issues += findings.len();
        has_errors |= findings.iter().any(Finding::is_error);
    }

    println!();
    println!("Checked {} files, found {} issues", checked, total_issues);

    Ok(has_errors)
}

fn find_config() -> Result<Settings> {
    if let Some(path) = Settings::discover(".") {
        info!("Using config: {}", path.display());
        return Settings::from_file(&path).into_diagnostic();
    }

    info!("No config file found, using defaults");
    Ok(Settings::default())
}
