//! Raw linter output as reported for a single document.

use serde::{Deserialize, Serialize};

use crate::error::{LintError, Result};

/// Severity ordinal the linter uses for warnings.
pub const SEVERITY_WARNING: u8 = 1;
/// Severity ordinal the linter uses for errors.
pub const SEVERITY_ERROR: u8 = 2;

/// Autofix attached to a finding: replace `range` with `text`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixSuggestion {
    pub range: (usize, usize),
    pub text: String,
}

/// One rule violation. Line and column are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Finding {
    pub line: i64,
    pub column: i64,
    #[serde(default)]
    pub end_line: Option<i64>,
    #[serde(default)]
    pub end_column: Option<i64>,
    #[serde(default)]
    pub severity: u8,
    #[serde(default)]
    pub rule_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub fix: Option<FixSuggestion>,
}

/// A candidate replacement over `[start, end)` in absolute offsets.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edit {
    pub start: usize,
    pub end: usize,
    pub text: String,
}

impl Edit {
    pub fn new(start: usize, end: usize, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    pub fn insert(at: usize, text: impl Into<String>) -> Self {
        Self::new(at, at, text)
    }

    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Finding {
    pub fn new(line: i64, column: i64, message: impl Into<String>) -> Self {
        Self {
            line,
            column,
            end_line: None,
            end_column: None,
            severity: SEVERITY_WARNING,
            rule_id: None,
            message: message.into(),
            fix: None,
        }
    }

    pub fn with_end(mut self, end_line: i64, end_column: i64) -> Self {
        self.end_line = Some(end_line);
        self.end_column = Some(end_column);
        self
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.rule_id = Some(rule_id.into());
        self
    }

    pub fn with_severity(mut self, severity: u8) -> Self {
        self.severity = severity;
        self
    }

    pub fn with_fix(mut self, start: usize, end: usize, text: impl Into<String>) -> Self {
        self.fix = Some(FixSuggestion {
            range: (start, end),
            text: text.into(),
        });
        self
    }

    pub fn start_line(&self) -> usize {
        clamp(self.line)
    }

    pub fn start_column(&self) -> usize {
        clamp(self.column)
    }

    pub fn end_line(&self) -> usize {
        clamp(self.end_line.unwrap_or(self.line))
    }

    pub fn end_column(&self) -> usize {
        clamp(self.end_column.unwrap_or(self.column))
    }

    pub fn rule(&self) -> Option<&str> {
        self.rule_id.as_deref()
    }

    pub fn edit(&self) -> Option<Edit> {
        self.fix
            .as_ref()
            .map(|fix| Edit::new(fix.range.0, fix.range.1, fix.text.clone()))
    }
}

fn clamp(value: i64) -> usize {
    value.max(1) as usize
}

/// Per-file section of a lint report.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintResult {
    #[serde(default)]
    pub file_path: String,
    #[serde(default)]
    pub messages: Vec<Finding>,
    #[serde(default)]
    pub error_count: usize,
    #[serde(default)]
    pub warning_count: usize,
}

/// Whole report returned by one linter invocation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LintReport {
    #[serde(default)]
    pub error_count: usize,
    #[serde(default)]
    pub warning_count: usize,
    #[serde(default)]
    pub results: Vec<LintResult>,
}

impl LintReport {
    /// Single-file invocations only ever consult the first result.
    pub fn into_first_result(self) -> Result<LintResult> {
        self.results
            .into_iter()
            .next()
            .ok_or_else(|| LintError::MalformedReport("report has no results".into()))
    }

    /// Parses the JSON formatter output. A bare array of results is accepted
    /// as well, which is what the stock `json` formatter prints.
    pub fn from_json(text: &str) -> Result<Self> {
        let value: serde_json::Value = serde_json::from_str(text)?;
        if value.is_array() {
            let results: Vec<LintResult> = serde_json::from_value(value)?;
            let error_count = results.iter().map(|r| r.error_count).sum();
            let warning_count = results.iter().map(|r| r.warning_count).sum();
            return Ok(Self {
                error_count,
                warning_count,
                results,
            });
        }
        Ok(serde_json::from_value(value)?)
    }
}
