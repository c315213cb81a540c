//! The decorating language service.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::actions::{FixAction, FixAssembler};
use crate::config::PluginConfig;
use crate::diagnostic::{build_diagnostic, Diagnostic, DIAGNOSTIC_CODE, DIAGNOSTIC_SOURCE};
use crate::engine::{LintEngine, LintOptions};
use crate::error::{LintError, Result};
use crate::finding::Edit;
use crate::host::{LanguageService, LogLevel, PositionMapper};
use crate::index::{FindingIndex, FindingRegistry};
use crate::merge::non_overlapping;

/// Wraps a host language service, adding lint diagnostics and fixes.
///
/// Only semantic diagnostics, code fixes and the supported fix codes are
/// changed; every other call reaches the host untouched.
pub struct LintService<H, E> {
    host: H,
    engine: E,
    config: PluginConfig,
    project_root: PathBuf,
    assembler: FixAssembler,
    registry: FindingRegistry,
}

impl<H: LanguageService, E: LintEngine> LintService<H, E> {
    pub fn new(
        host: H,
        engine: E,
        config: PluginConfig,
        project_root: impl Into<PathBuf>,
    ) -> Self {
        let assembler = FixAssembler::new(config.rule_fix_all_policy);
        Self {
            host,
            engine,
            config,
            project_root: project_root.into(),
            assembler,
            registry: FindingRegistry::new(),
        }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Findings recorded by the last successful diagnostics pass.
    pub fn findings(&self, file: &str) -> Option<Arc<FindingIndex>> {
        self.registry.get(file)
    }

    /// The fix-all-auto-fixable batch for `file`, empty when nothing is fixable.
    pub fn fix_all_edits(&self, file: &str) -> Vec<Edit> {
        self.registry
            .get(file)
            .map(|index| non_overlapping(index.edits()))
            .unwrap_or_default()
    }

    /// Drops the recorded findings of a closed document.
    pub fn forget(&self, file: &str) {
        self.registry.remove(file);
    }

    fn lint_options(&self) -> LintOptions {
        LintOptions {
            cwd: self.project_root.clone(),
            config_file: self.config.resolved_config_file(&self.project_root),
        }
    }

    /// Lints `file` and swaps in its new finding index, returning only the
    /// lint diagnostics. On error the previous index is left in place, so a
    /// caller that edits the document must not reuse [`Self::fix_all_edits`]
    /// after a failed call.
    pub fn recompute(&self, file: &str) -> Result<Vec<Diagnostic>> {
        let text = self
            .host
            .source_text(file)
            .ok_or_else(|| LintError::UnknownFile(file.to_string()))?;
        let report = self.engine.lint_text(&text, file, &self.lint_options())?;
        let result = report.into_first_result()?;

        let force_warnings = self.config.always_show_rule_failures_as_warnings;
        let mut index = FindingIndex::new();
        let mut diagnostics = Vec::with_capacity(result.messages.len());
        for finding in result.messages {
            if !self.config.keeps_finding(&finding) {
                continue;
            }
            let (diagnostic, start, end) =
                build_diagnostic(file, &finding, &self.host, force_warnings)?;
            index.record(finding, start, end);
            diagnostics.push(diagnostic);
        }

        self.registry.replace(file, index);
        Ok(diagnostics)
    }

    fn report_failure(&self, file: &str, err: &LintError) {
        self.host.log(
            LogLevel::Error,
            &format!(
                "{DIAGNOSTIC_SOURCE} failed on {file} during {}: {err}",
                err.origin()
            ),
        );
    }
}

impl<H: LanguageService, E: LintEngine> PositionMapper for LintService<H, E> {
    fn position_of(&self, file: &str, line: usize, character: usize) -> Result<usize> {
        self.host.position_of(file, line, character)
    }

    fn line_and_character_of(&self, file: &str, offset: usize) -> Result<(usize, usize)> {
        self.host.line_and_character_of(file, offset)
    }
}

impl<H: LanguageService, E: LintEngine> LanguageService for LintService<H, E> {
    fn source_text(&self, file: &str) -> Option<String> {
        self.host.source_text(file)
    }

    fn semantic_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        let prior = self.host.semantic_diagnostics(file);
        if self.config.supress_while_type_errors_present && !prior.is_empty() {
            self.host.log(
                LogLevel::Info,
                &format!("{DIAGNOSTIC_SOURCE} skipped {file}: host reported type errors"),
            );
            return prior;
        }
        if self.config.skips_file(file) {
            return prior;
        }

        match self.recompute(file) {
            Ok(lint) => {
                let mut all = prior;
                all.extend(lint);
                all
            }
            Err(err) => {
                self.report_failure(file, &err);
                prior
            }
        }
    }

    fn syntactic_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        self.host.syntactic_diagnostics(file)
    }

    fn code_fixes_at_position(
        &self,
        file: &str,
        start: usize,
        end: usize,
        error_codes: &[u32],
    ) -> Vec<FixAction> {
        let mut fixes = self
            .host
            .code_fixes_at_position(file, start, end, error_codes);
        let Some(index) = self.registry.get(file) else {
            return fixes;
        };

        match self.assembler.assemble(file, &index, start, end, &self.host) {
            Ok(actions) => fixes.extend(actions),
            Err(err) => self.report_failure(file, &err),
        }
        fixes
    }

    fn supported_code_fixes(&self) -> Vec<u32> {
        let mut codes = self.host.supported_code_fixes();
        if !codes.contains(&DIAGNOSTIC_CODE) {
            codes.push(DIAGNOSTIC_CODE);
        }
        codes
    }

    fn log(&self, level: LogLevel, message: &str) {
        self.host.log(level, message);
    }
}
