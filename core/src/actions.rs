//! Remediation actions offered for a lint finding.

use serde::{Deserialize, Serialize};

use crate::diagnostic::DIAGNOSTIC_SOURCE;
use crate::error::Result;
use crate::finding::Edit;
use crate::host::PositionMapper;
use crate::index::{FindingIndex, IndexedFinding};
use crate::merge::non_overlapping;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FixKind {
    Single,
    FixAllOfRule,
    FixAllAutoFixable,
    DisableRule,
    /// Proposed by the host itself.
    Host,
}

/// Edits for one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileTextChanges {
    pub file: String,
    pub edits: Vec<Edit>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FixAction {
    pub fix_name: String,
    pub description: String,
    pub kind: FixKind,
    pub changes: Vec<FileTextChanges>,
}

impl FixAction {
    pub fn new(
        kind: FixKind,
        fix_name: impl Into<String>,
        description: impl Into<String>,
        file: &str,
        edits: Vec<Edit>,
    ) -> Self {
        Self {
            fix_name: fix_name.into(),
            description: description.into(),
            kind,
            changes: vec![FileTextChanges {
                file: file.to_string(),
                edits,
            }],
        }
    }

    pub fn edits(&self) -> impl Iterator<Item = &Edit> {
        self.changes.iter().flat_map(|change| change.edits.iter())
    }
}

/// How the edits of a fix-all-of-rule batch are chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum RuleBatchPolicy {
    /// Every edit reported for the rule, as reported.
    #[default]
    Unfiltered,
    /// Same selection as the fix-all-auto-fixable batch.
    NonOverlapping,
}

/// Builds the lint actions for a fix request at `[start, end)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixAssembler {
    pub rule_policy: RuleBatchPolicy,
}

impl FixAssembler {
    pub fn new(rule_policy: RuleBatchPolicy) -> Self {
        Self { rule_policy }
    }

    /// Actions for the finding indexed at exactly `[start, end)`. Returns an
    /// empty list when nothing was reported there.
    pub fn assemble(
        &self,
        file: &str,
        index: &FindingIndex,
        start: usize,
        end: usize,
        positions: &dyn PositionMapper,
    ) -> Result<Vec<FixAction>> {
        let Some(target) = index.lookup(start, end) else {
            return Ok(Vec::new());
        };

        let mut actions = Vec::new();
        if let Some(action) = single_fix(file, target) {
            actions.push(action);
        }
        if let Some(action) = self.fix_all_of_rule(file, index, target) {
            actions.push(action);
        }
        // Document-wide, but only offered next to a finding at the requested
        // range, and never with an empty batch.
        if let Some(action) = fix_all_auto_fixable(file, index) {
            actions.push(action);
        }
        if let Some(action) = disable_rule(file, target, positions)? {
            actions.push(action);
        }
        Ok(actions)
    }

    fn fix_all_of_rule(
        &self,
        file: &str,
        index: &FindingIndex,
        target: &IndexedFinding,
    ) -> Option<FixAction> {
        let rule = target.rule()?;
        let edits = index.edits_for_rule(rule);
        if edits.len() < 2 {
            return None;
        }
        let edits = match self.rule_policy {
            RuleBatchPolicy::Unfiltered => edits,
            RuleBatchPolicy::NonOverlapping => non_overlapping(edits),
        };
        Some(FixAction::new(
            FixKind::FixAllOfRule,
            format!("{DIAGNOSTIC_SOURCE}:fix-all-same"),
            format!("Fix all '{rule}'"),
            file,
            edits,
        ))
    }
}

fn single_fix(file: &str, target: &IndexedFinding) -> Option<FixAction> {
    let edit = target.edit()?;
    let rule = target.rule().unwrap_or("unknown");
    Some(FixAction::new(
        FixKind::Single,
        format!("{DIAGNOSTIC_SOURCE}:{rule}"),
        format!("Fix: {}", target.finding.message),
        file,
        vec![edit],
    ))
}

fn fix_all_auto_fixable(file: &str, index: &FindingIndex) -> Option<FixAction> {
    let edits = non_overlapping(index.edits());
    if edits.is_empty() {
        return None;
    }
    Some(FixAction::new(
        FixKind::FixAllAutoFixable,
        format!("{DIAGNOSTIC_SOURCE}:fix-all"),
        format!("Fix all auto-fixable {DIAGNOSTIC_SOURCE} failures"),
        file,
        edits,
    ))
}

fn disable_rule(
    file: &str,
    target: &IndexedFinding,
    positions: &dyn PositionMapper,
) -> Result<Option<FixAction>> {
    let Some(rule) = target.rule() else {
        return Ok(None);
    };
    let line = target.finding.start_line() - 1;
    let line_start = positions.position_of(file, line, 0)?;
    Ok(Some(FixAction::new(
        FixKind::DisableRule,
        format!("{DIAGNOSTIC_SOURCE}:disable-rule"),
        format!("Disable rule '{rule}'"),
        file,
        vec![Edit::insert(
            line_start,
            format!("// {DIAGNOSTIC_SOURCE}-disable-next-line {rule}\n"),
        )],
    )))
}
