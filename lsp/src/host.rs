//! In-memory documents standing in for the host language service.

use dashmap::DashMap;
use lintbridge_core::{
    Diagnostic, FixAction, LanguageService, LineIndex, LintError, LogLevel, PositionMapper,
};
use tokio::sync::mpsc::UnboundedSender;
use tower_lsp::lsp_types::{Position, Url};

pub struct DocumentState {
    pub uri: Url,
    pub version: i32,
    pub lines: LineIndex,
}

/// Open documents keyed by file name, plus a sink forwarding log lines to
/// the client.
pub struct DocumentHost {
    documents: DashMap<String, DocumentState>,
    log_tx: UnboundedSender<(LogLevel, String)>,
}

impl DocumentHost {
    pub fn new(log_tx: UnboundedSender<(LogLevel, String)>) -> Self {
        Self {
            documents: DashMap::new(),
            log_tx,
        }
    }

    /// File name the linter sees for `uri`.
    pub fn file_name(uri: &Url) -> String {
        uri.to_file_path()
            .map(|path| path.to_string_lossy().into_owned())
            .unwrap_or_else(|_| uri.to_string())
    }

    pub fn open(&self, uri: Url, text: String, version: i32) -> String {
        let file = Self::file_name(&uri);
        self.documents.insert(
            file.clone(),
            DocumentState {
                uri,
                version,
                lines: LineIndex::new(text),
            },
        );
        file
    }

    pub fn close(&self, uri: &Url) -> String {
        let file = Self::file_name(uri);
        self.documents.remove(&file);
        file
    }

    pub fn contains(&self, file: &str) -> bool {
        self.documents.contains_key(file)
    }

    pub fn version(&self, file: &str) -> Option<i32> {
        self.documents.get(file).map(|doc| doc.version)
    }

    pub fn uris(&self) -> Vec<Url> {
        self.documents.iter().map(|doc| doc.uri.clone()).collect()
    }

    pub fn to_position(&self, file: &str, offset: usize) -> Option<Position> {
        let doc = self.documents.get(file)?;
        let (line, character) = doc.lines.position_at(offset);
        Some(Position {
            line: line as u32,
            character: character as u32,
        })
    }

    pub fn to_offset(&self, file: &str, position: Position) -> Option<usize> {
        let doc = self.documents.get(file)?;
        doc.lines
            .offset_at(position.line as usize, position.character as usize)
    }
}

impl PositionMapper for DocumentHost {
    fn position_of(&self, file: &str, line: usize, character: usize) -> Result<usize, LintError> {
        let doc = self
            .documents
            .get(file)
            .ok_or_else(|| LintError::UnknownFile(file.to_string()))?;
        doc.lines.position_of(file, line, character)
    }

    fn line_and_character_of(
        &self,
        file: &str,
        offset: usize,
    ) -> Result<(usize, usize), LintError> {
        let doc = self
            .documents
            .get(file)
            .ok_or_else(|| LintError::UnknownFile(file.to_string()))?;
        Ok(doc.lines.position_at(offset))
    }
}

impl LanguageService for DocumentHost {
    fn source_text(&self, file: &str) -> Option<String> {
        self.documents
            .get(file)
            .map(|doc| doc.lines.text().to_string())
    }

    // A standalone server has no compiler diagnostics of its own.
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
        let _ = self.log_tx.send((level, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn url() -> Url {
        Url::parse("file:///work/src/app.js").unwrap()
    }

    #[test]
    fn tracks_documents_by_file_name() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let host = DocumentHost::new(tx);
        let file = host.open(url(), "let a\nlet b\n".into(), 3);
        assert!(host.contains(&file));
        assert_eq!(host.version(&file), Some(3));
        assert_eq!(host.position_of(&file, 1, 4).unwrap(), 10);
        assert_eq!(
            host.to_position(&file, 10),
            Some(Position {
                line: 1,
                character: 4
            })
        );

        host.close(&url());
        assert!(matches!(
            host.position_of(&file, 0, 0),
            Err(LintError::UnknownFile(_))
        ));
    }

    #[test]
    fn log_lines_reach_the_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let host = DocumentHost::new(tx);
        host.log(LogLevel::Info, "skipped");
        host.log(LogLevel::Error, "boom");
        assert_eq!(rx.try_recv().unwrap(), (LogLevel::Info, "skipped".to_string()));
        assert_eq!(rx.try_recv().unwrap(), (LogLevel::Error, "boom".to_string()));
    }
}
