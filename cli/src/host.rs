//! Files read from disk, served to the lint service as host documents.

use console::style;
use dashmap::DashMap;
use lintbridge_core::{
    Diagnostic, FixAction, LanguageService, LineIndex, LintError, LogLevel, PositionMapper,
};

#[derive(Default)]
pub struct FileHost {
    files: DashMap<String, LineIndex>,
}

impl FileHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, file: &str, text: String) {
        self.files.insert(file.to_string(), LineIndex::new(text));
    }

    pub fn text(&self, file: &str) -> Option<String> {
        self.files.get(file).map(|lines| lines.text().to_string())
    }

    /// 1-based line and column of an offset.
    pub fn location(&self, file: &str, offset: usize) -> Option<(usize, usize)> {
        let lines = self.files.get(file)?;
        let (line, character) = lines.position_at(offset);
        Some((line + 1, character + 1))
    }

    pub fn remove(&self, file: &str) {
        self.files.remove(file);
    }
}

impl PositionMapper for FileHost {
    fn position_of(&self, file: &str, line: usize, character: usize) -> Result<usize, LintError> {
        let lines = self
            .files
            .get(file)
            .ok_or_else(|| LintError::UnknownFile(file.to_string()))?;
        lines.position_of(file, line, character)
    }

    fn line_and_character_of(
        &self,
        file: &str,
        offset: usize,
    ) -> Result<(usize, usize), LintError> {
        let lines = self
            .files
            .get(file)
            .ok_or_else(|| LintError::UnknownFile(file.to_string()))?;
        Ok(lines.position_at(offset))
    }
}

impl LanguageService for FileHost {
    fn source_text(&self, file: &str) -> Option<String> {
        self.text(file)
    }

    fn semantic_diagnostics(&self, _file: &str) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn code_fixes_at_position(
        &self,
        _file: &str,
        _start: usize,
        _end: usize,
        _error_codes: &[u32],
    ) -> Vec<FixAction> {
        Vec::new()
    }

    fn log(&self, level: LogLevel, message: &str) {
        let label = match level {
            LogLevel::Info => style("note:").dim(),
            LogLevel::Error => style("warning:").yellow().bold(),
        };
        eprintln!("{label} {message}");
    }
}
