//! Conversion of raw findings into host-facing diagnostics.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::finding::{Finding, SEVERITY_WARNING};
use crate::host::PositionMapper;

/// Source tag carried by every diagnostic this integration emits.
pub const DIAGNOSTIC_SOURCE: &str = "eslint";
/// Numeric code distinguishing lint diagnostics from the host's own.
pub const DIAGNOSTIC_CODE: u32 = 100000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticCategory {
    Warning,
    Error,
    Suggestion,
    Message,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub file: String,
    pub start: usize,
    pub length: usize,
    pub message: String,
    pub category: DiagnosticCategory,
    pub source: Option<String>,
    pub code: u32,
}

impl Diagnostic {
    pub fn end(&self) -> usize {
        self.start + self.length
    }

    pub fn is_lint(&self) -> bool {
        self.code == DIAGNOSTIC_CODE
    }
}

/// `"{message} ({rule})"`, or the bare message for rule-less findings.
pub fn display_message(finding: &Finding) -> String {
    match finding.rule() {
        Some(rule) => format!("{} ({rule})", finding.message),
        None => finding.message.clone(),
    }
}

pub fn category_for(finding: &Finding, force_warnings: bool) -> DiagnosticCategory {
    if force_warnings || finding.severity == SEVERITY_WARNING {
        DiagnosticCategory::Warning
    } else {
        DiagnosticCategory::Error
    }
}

/// Builds the diagnostic for `finding` and returns it together with the
/// absolute `(start, end)` pair the caller must index the finding under.
pub fn build_diagnostic(
    file: &str,
    finding: &Finding,
    positions: &dyn PositionMapper,
    force_warnings: bool,
) -> Result<(Diagnostic, usize, usize)> {
    let start = positions.position_of(
        file,
        finding.start_line() - 1,
        finding.start_column() - 1,
    )?;
    let end = positions
        .position_of(file, finding.end_line() - 1, finding.end_column() - 1)?
        .max(start);

    let diagnostic = Diagnostic {
        file: file.to_string(),
        start,
        length: end - start,
        message: display_message(finding),
        category: category_for(finding, force_warnings),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        code: DIAGNOSTIC_CODE,
    };
    Ok((diagnostic, start, end))
}
