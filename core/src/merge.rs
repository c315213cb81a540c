//! Selection and application of non-overlapping edit batches.

use crate::error::{LintError, Result};
use crate::finding::Edit;
use crate::host::LineIndex;

/// Picks the edits that can be applied together in one pass.
///
/// Edits are stably sorted by start offset, then accepted greedily: a
/// candidate is dropped when the last accepted edit ends at or after the
/// candidate's start. Touching ranges therefore never share a batch.
pub fn non_overlapping(mut edits: Vec<Edit>) -> Vec<Edit> {
    edits.sort_by_key(|edit| edit.start);

    let mut accepted: Vec<Edit> = Vec::with_capacity(edits.len());
    for edit in edits {
        if let Some(previous) = accepted.last() {
            if previous.end >= edit.start {
                continue;
            }
        }
        accepted.push(edit);
    }
    accepted
}

/// Applies a sorted, non-overlapping batch to `text` in a single scan.
///
/// Offsets are UTF-16 positions as produced by the linter.
pub fn apply_edits(text: &str, edits: &[Edit]) -> Result<String> {
    let lines = LineIndex::new(text);
    let mut out = String::with_capacity(text.len());
    let mut cursor = 0usize;

    for edit in edits {
        let invalid = || LintError::InvalidEdit {
            start: edit.start,
            end: edit.end,
        };
        if edit.end < edit.start {
            return Err(invalid());
        }
        let start = lines.byte_offset(edit.start).ok_or_else(invalid)?;
        let end = lines.byte_offset(edit.end).ok_or_else(invalid)?;
        if start < cursor {
            return Err(invalid());
        }
        out.push_str(&text[cursor..start]);
        out.push_str(&edit.text);
        cursor = end;
    }
    out.push_str(&text[cursor..]);
    Ok(out)
}
