//! Plugin settings recognised by the lint integration.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::actions::RuleBatchPolicy;
use crate::error::{LintError, Result};
use crate::finding::Finding;

/// Rules the host compiler already reports when unused-symbol checks are on.
const UNUSED_VARIABLE_RULES: &[&str] = &["no-unused-vars", "no-unused-variable"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PluginConfig {
    pub always_show_rule_failures_as_warnings: bool,
    pub ignore_definition_files: bool,
    pub config_file: Option<PathBuf>,
    pub disable_no_unused_variable_rule: bool,
    // Spelling matches the established settings key.
    pub supress_while_type_errors_present: bool,
    pub rule_fix_all_policy: RuleBatchPolicy,
    /// Executable name of the linter.
    pub linter: String,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            always_show_rule_failures_as_warnings: false,
            ignore_definition_files: true,
            config_file: None,
            disable_no_unused_variable_rule: false,
            supress_while_type_errors_present: false,
            rule_fix_all_policy: RuleBatchPolicy::default(),
            linter: "eslint".to_string(),
        }
    }
}

impl PluginConfig {
    /// Reads settings from a YAML or JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
            .map_err(|err| LintError::Config(format!("{}: {err}", path.display())))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, serde_yaml::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }

    pub fn from_json(value: serde_json::Value) -> Result<Self> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// `configFile` made absolute against `project_root` when relative.
    pub fn resolved_config_file(&self, project_root: &Path) -> Option<PathBuf> {
        let configured = self.config_file.as_ref()?;
        if configured.as_os_str().is_empty() {
            return None;
        }
        if configured.is_absolute() {
            Some(configured.clone())
        } else {
            Some(project_root.join(configured))
        }
    }

    pub fn skips_file(&self, file: &str) -> bool {
        self.ignore_definition_files && file.ends_with(".d.ts")
    }

    pub fn keeps_finding(&self, finding: &Finding) -> bool {
        if !self.disable_no_unused_variable_rule {
            return true;
        }
        !finding
            .rule()
            .is_some_and(|rule| UNUSED_VARIABLE_RULES.contains(&rule))
    }
}
