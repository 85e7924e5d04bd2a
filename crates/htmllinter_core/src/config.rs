//! Rule configuration and settings.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use globset::{Glob, GlobSet, GlobSetBuilder};
use jsonc_parser::ParseOptions;
use jsonschema::Validator;
use serde::{Deserialize, Serialize};

use crate::LinterError;
use crate::linter::DEFAULT_LINTER_PROGRAM;

// Embed the schema
const SCHEMA_JSON: &str = include_str!("../../../schemas/v1/config.json");
static CONFIG_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Base rule set extended when no other is configured.
pub const DEFAULT_BASE_CONFIG: &str = "@htmllinter/basic-config";

/// Settings namespace read from the editor.
pub const SETTINGS_SECTION: &str = "htmllinter";

/// Severity a rule is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleLevel {
    Off,
    #[serde(alias = "warning")]
    Warn,
    Error,
}

/// Configuration for a single rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RuleSetting {
    /// `"off"`, `"warn"` or `"error"`.
    Level(RuleLevel),
    /// `true` enables the rule as an error, `false` disables it.
    Enabled(bool),
    /// `[level, options]`.
    WithOptions(RuleLevel, serde_json::Value),
}

impl RuleSetting {
    /// Returns the effective level.
    pub fn level(&self) -> RuleLevel {
        match self {
            RuleSetting::Level(level) | RuleSetting::WithOptions(level, _) => *level,
            RuleSetting::Enabled(true) => RuleLevel::Error,
            RuleSetting::Enabled(false) => RuleLevel::Off,
        }
    }

    /// Returns whether the rule is enabled.
    pub fn is_enabled(&self) -> bool {
        self.level() != RuleLevel::Off
    }
}

/// The merged rule set handed to the linter for one document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleConfiguration {
    /// Name of the base rule set.
    pub extend: String,
    /// Per-rule overrides on top of the base set.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSetting>,
}

impl RuleConfiguration {
    /// Creates a configuration extending the default base set with no overrides.
    pub fn new() -> Self {
        Self {
            extend: DEFAULT_BASE_CONFIG.to_string(),
            rules: BTreeMap::new(),
        }
    }

    /// Returns the overridden rules that are enabled.
    pub fn enabled_rules(&self) -> Vec<(&str, &RuleSetting)> {
        self.rules
            .iter()
            .filter(|(_, setting)| setting.is_enabled())
            .map(|(name, setting)| (name.as_str(), setting))
            .collect()
    }
}

impl Default for RuleConfiguration {
    fn default() -> Self {
        Self::new()
    }
}

/// How to invoke the external linter process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinterCommand {
    /// Program to run.
    pub command: String,
    /// Extra arguments.
    #[serde(default)]
    pub args: Vec<String>,
}

impl Default for LinterCommand {
    fn default() -> Self {
        Self {
            command: DEFAULT_LINTER_PROGRAM.to_string(),
            args: Vec::new(),
        }
    }
}

/// Settings read from the editor or from a workspace config file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Base rule set name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extend: Option<String>,

    /// Rule overrides.
    #[serde(default)]
    pub rules: BTreeMap<String, RuleSetting>,

    /// External linter invocation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linter: Option<LinterCommand>,

    /// Glob patterns of files that are never linted.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Directory containing the config file, if loaded from one.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

impl Settings {
    /// Config file names looked up in the workspace root, in priority order.
    pub const CONFIG_FILES: &'static [&'static str] = &[".htmllinterrc.jsonc", ".htmllinterrc.json"];

    /// Finds a config file directly under `root`.
    pub fn discover(root: impl AsRef<Path>) -> Option<PathBuf> {
        let root = root.as_ref();
        Self::CONFIG_FILES
            .iter()
            .map(|name| root.join(name))
            .find(|path| path.is_file())
    }

    /// Loads settings from a config file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LinterError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| LinterError::config(format!("Failed to read config: {}", e)))?;

        let mut settings = Self::from_json(&content)?;
        if let Some(parent) = path.parent() {
            settings.base_dir = Some(parent.to_path_buf());
        }

        Ok(settings)
    }

    /// Parses settings from JSON with comments, with schema validation.
    pub fn from_json(json: &str) -> Result<Self, LinterError> {
        let value = jsonc_parser::parse_to_serde_value(json, &ParseOptions::default())
            .map_err(|e| LinterError::config(format!("Invalid JSON: {}", e)))?
            .unwrap_or_else(|| serde_json::Value::Object(serde_json::Map::new()));

        if let Err(e) = config_schema()?.validate(&value) {
            let error_msg = format!("{} at {}", e, e.instance_path());
            return Err(LinterError::config(format!(
                "Config validation failed: {}",
                error_msg
            )));
        }

        serde_json::from_value(value)
            .map_err(|e| LinterError::config(format!("Invalid config: {}", e)))
    }

    /// Parses settings pushed by the editor. `null` yields the defaults.
    pub fn from_value(value: serde_json::Value) -> Result<Self, LinterError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        serde_json::from_value(value)
            .map_err(|e| LinterError::config(format!("Invalid settings: {}", e)))
    }

    /// Layers `overrides` on top of these settings.
    ///
    /// Rules are merged key by key, exclusions are combined, everything else
    /// is taken from `overrides` when present.
    pub fn merged_with(mut self, overrides: Settings) -> Settings {
        self.rules.extend(overrides.rules);
        self.exclude.extend(overrides.exclude);
        Settings {
            extend: overrides.extend.or(self.extend),
            rules: self.rules,
            linter: overrides.linter.or(self.linter),
            exclude: self.exclude,
            base_dir: overrides.base_dir.or(self.base_dir),
        }
    }

    /// Builds the rule configuration passed to the linter.
    pub fn rule_configuration(&self) -> RuleConfiguration {
        RuleConfiguration {
            extend: self
                .extend
                .clone()
                .unwrap_or_else(|| DEFAULT_BASE_CONFIG.to_string()),
            rules: self.rules.clone(),
        }
    }

    /// Returns the linter command. Relative paths are resolved against the
    /// config file directory; bare program names are left for `PATH` lookup.
    pub fn linter_command(&self) -> LinterCommand {
        let mut command = self.linter.clone().unwrap_or_default();
        let program = Path::new(&command.command);
        if program.is_relative()
            && program.components().count() > 1
            && let Some(base) = &self.base_dir
        {
            command.command = base.join(program).to_string_lossy().into_owned();
        }
        command
    }

    /// Compiles the exclusion globs, or `None` when there are none.
    pub fn exclude_set(&self) -> Result<Option<GlobSet>, LinterError> {
        if self.exclude.is_empty() {
            return Ok(None);
        }

        let mut builder = GlobSetBuilder::new();
        for pattern in &self.exclude {
            let glob = Glob::new(pattern).map_err(|e| {
                LinterError::config(format!("Invalid pattern '{}': {}", pattern, e))
            })?;
            builder.add(glob);
        }

        builder
            .build()
            .map(Some)
            .map_err(|e| LinterError::config(format!("Invalid exclude patterns: {}", e)))
    }
}

fn config_schema() -> Result<&'static Validator, LinterError> {
    if let Some(validator) = CONFIG_SCHEMA.get() {
        return Ok(validator);
    }

    let schema_json: serde_json::Value = serde_json::from_str(SCHEMA_JSON)
        .map_err(|e| LinterError::Internal(format!("Invalid embedded config schema: {}", e)))?;
    let validator = Validator::new(&schema_json)
        .map_err(|e| LinterError::Internal(format!("Invalid config schema compilation: {}", e)))?;

    Ok(CONFIG_SCHEMA.get_or_init(|| validator))
}
