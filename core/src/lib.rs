//! Lint integration core for language services.
//!
//! Converts an external linter's findings into host diagnostics, remembers
//! which finding sits behind which diagnostic span, and assembles fix
//! actions whose edit batches never overlap.

pub mod actions;
pub mod config;
pub mod diagnostic;
pub mod engine;
pub mod error;
pub mod finding;
pub mod host;
pub mod index;
pub mod merge;
pub mod range_key;
pub mod service;

pub use actions::{FileTextChanges, FixAction, FixAssembler, FixKind, RuleBatchPolicy};
pub use config::PluginConfig;
pub use diagnostic::{
    build_diagnostic, Diagnostic, DiagnosticCategory, DIAGNOSTIC_CODE, DIAGNOSTIC_SOURCE,
};
pub use engine::{
    CommandLinter, LintEngine, LintOptions, ModuleResolver, NodeModulesResolver, ResolutionCache,
};
pub use error::LintError;
pub use finding::{Edit, Finding, FixSuggestion, LintReport, LintResult};
pub use host::{LanguageService, LineIndex, LogLevel, PositionMapper};
pub use index::{FindingIndex, FindingRegistry, IndexedFinding};
pub use merge::{apply_edits, non_overlapping};
pub use range_key::{key, RangeKey};
pub use service::LintService;
