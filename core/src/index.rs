//! Per-document record of which finding produced which diagnostic span.

use std::sync::Arc;

use dashmap::DashMap;
use indexmap::IndexMap;

use crate::finding::{Edit, Finding};
use crate::range_key::{key, RangeKey};

/// A finding together with the absolute span its diagnostic was given.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedFinding {
    pub finding: Finding,
    pub start: usize,
    pub end: usize,
}

impl IndexedFinding {
    pub fn edit(&self) -> Option<Edit> {
        self.finding.edit()
    }

    pub fn rule(&self) -> Option<&str> {
        self.finding.rule()
    }
}

/// Findings of one diagnostics pass, keyed by span, in report order.
#[derive(Debug, Clone, Default)]
pub struct FindingIndex {
    entries: IndexMap<RangeKey, IndexedFinding>,
}

impl FindingIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later findings with an identical span replace earlier ones.
    pub fn record(&mut self, finding: Finding, start: usize, end: usize) {
        self.entries
            .insert(key(start, end), IndexedFinding { finding, start, end });
    }

    pub fn lookup(&self, start: usize, end: usize) -> Option<&IndexedFinding> {
        self.entries.get(&key(start, end))
    }

    pub fn iter(&self) -> impl Iterator<Item = &IndexedFinding> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Edits of every fixable finding, in report order.
    pub fn edits(&self) -> Vec<Edit> {
        self.iter().filter_map(IndexedFinding::edit).collect()
    }

    /// Edits of fixable findings reported for `rule`, in report order.
    pub fn edits_for_rule(&self, rule: &str) -> Vec<Edit> {
        self.iter()
            .filter(|entry| entry.rule() == Some(rule))
            .filter_map(IndexedFinding::edit)
            .collect()
    }
}

/// Finding indexes of all open documents.
///
/// An index is only ever replaced as a whole, so readers see either the
/// previous pass or the new one.
#[derive(Debug, Default)]
pub struct FindingRegistry {
    documents: DashMap<String, Arc<FindingIndex>>,
}

impl FindingRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn replace(&self, document: &str, index: FindingIndex) {
        self.documents
            .insert(document.to_string(), Arc::new(index));
    }

    pub fn get(&self, document: &str) -> Option<Arc<FindingIndex>> {
        self.documents.get(document).map(|entry| entry.value().clone())
    }

    pub fn lookup(&self, document: &str, start: usize, end: usize) -> Option<IndexedFinding> {
        self.documents
            .get(document)
            .and_then(|index| index.lookup(start, end).cloned())
    }

    pub fn remove(&self, document: &str) {
        self.documents.remove(document);
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}
