//! Contracts consumed from the host language service.
//!
//! The host owns document text and the translation between line/character
//! coordinates and absolute offsets. [`LintService`](crate::LintService) wraps
//! a host and overrides only the entry points it augments.

use std::sync::Arc;

use crate::actions::FixAction;
use crate::diagnostic::Diagnostic;
use crate::error::{LintError, Result};

/// Importance of a message sent to the host's logging sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogLevel {
    Info,
    Error,
}

/// Line/character to offset translation for documents known to the host.
///
/// Lines and characters are 0-based here; offsets are absolute positions in
/// the host's offset space (UTF-16 code units for the hosts in this
/// workspace).
pub trait PositionMapper {
    fn position_of(&self, file: &str, line: usize, character: usize) -> Result<usize>;

    fn line_and_character_of(&self, file: &str, offset: usize) -> Result<(usize, usize)>;
}

/// The capability surface of a host language service.
pub trait LanguageService: PositionMapper {
    fn source_text(&self, file: &str) -> Option<String>;

    fn semantic_diagnostics(&self, file: &str) -> Vec<Diagnostic>;

    fn syntactic_diagnostics(&self, _file: &str) -> Vec<Diagnostic> {
        Vec::new()
    }

    fn code_fixes_at_position(
        &self,
        file: &str,
        start: usize,
        end: usize,
        error_codes: &[u32],
    ) -> Vec<FixAction>;

    fn supported_code_fixes(&self) -> Vec<u32> {
        Vec::new()
    }

    /// Logging sink.
    fn log(&self, level: LogLevel, message: &str);
}

impl<T: PositionMapper + ?Sized> PositionMapper for Arc<T> {
    fn position_of(&self, file: &str, line: usize, character: usize) -> Result<usize> {
        (**self).position_of(file, line, character)
    }

    fn line_and_character_of(&self, file: &str, offset: usize) -> Result<(usize, usize)> {
        (**self).line_and_character_of(file, offset)
    }
}

impl<T: LanguageService + ?Sized> LanguageService for Arc<T> {
    fn source_text(&self, file: &str) -> Option<String> {
        (**self).source_text(file)
    }

    fn semantic_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        (**self).semantic_diagnostics(file)
    }

    fn syntactic_diagnostics(&self, file: &str) -> Vec<Diagnostic> {
        (**self).syntactic_diagnostics(file)
    }

    fn code_fixes_at_position(
        &self,
        file: &str,
        start: usize,
        end: usize,
        error_codes: &[u32],
    ) -> Vec<FixAction> {
        (**self).code_fixes_at_position(file, start, end, error_codes)
    }

    fn supported_code_fixes(&self) -> Vec<u32> {
        (**self).supported_code_fixes()
    }

    fn log(&self, level: LogLevel, message: &str) {
        (**self).log(level, message)
    }
}

/// Line start table over a document, measured in UTF-16 code units.
///
/// Lines end at `\n`, `\r\n`, a lone `\r`, U+2028 or U+2029, the same
/// terminators the linter counts when it reports line numbers.
#[derive(Debug, Clone)]
pub struct LineIndex {
    text: String,
    /// (utf16 offset, byte offset) of each line start.
    starts: Vec<(usize, usize)>,
    len_utf16: usize,
}

impl LineIndex {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let mut starts = vec![(0, 0)];
        let mut utf16 = 0usize;
        let mut chars = text.char_indices().peekable();
        while let Some((byte, ch)) = chars.next() {
            utf16 += ch.len_utf16();
            let ends_line = match ch {
                '\n' | '\u{2028}' | '\u{2029}' => true,
                '\r' => !matches!(chars.peek(), Some((_, '\n'))),
                _ => false,
            };
            if ends_line {
                starts.push((utf16, byte + ch.len_utf8()));
            }
        }
        Self {
            text,
            starts,
            len_utf16: utf16,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn line_count(&self) -> usize {
        self.starts.len()
    }

    pub fn len_utf16(&self) -> usize {
        self.len_utf16
    }

    /// Absolute offset of a 0-based line/character pair. The character may
    /// point one past the end of the line's content.
    pub fn offset_at(&self, line: usize, character: usize) -> Option<usize> {
        let (line_start, _) = *self.starts.get(line)?;
        let limit = self
            .starts
            .get(line + 1)
            .map(|(start, _)| *start)
            .unwrap_or(self.len_utf16);
        let offset = line_start + character;
        (offset <= limit).then_some(offset)
    }

    /// 0-based line/character of an absolute offset, clamped to the text.
    pub fn position_at(&self, offset: usize) -> (usize, usize) {
        let offset = offset.min(self.len_utf16);
        let line = match self.starts.binary_search_by(|(start, _)| start.cmp(&offset)) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        (line, offset - self.starts[line].0)
    }

    /// Converts a UTF-16 offset into a byte offset into [`Self::text`].
    pub fn byte_offset(&self, offset: usize) -> Option<usize> {
        if offset > self.len_utf16 {
            return None;
        }
        let (line, character) = self.position_at(offset);
        let (_, byte_start) = self.starts[line];
        let mut units = 0usize;
        for (idx, ch) in self.text[byte_start..].char_indices() {
            if units == character {
                return Some(byte_start + idx);
            }
            units += ch.len_utf16();
            if units > character {
                // Offset lands inside a surrogate pair.
                return None;
            }
        }
        (units == character).then_some(self.text.len())
    }

    /// Implements [`PositionMapper::position_of`] for a single document.
    pub fn position_of(&self, file: &str, line: usize, character: usize) -> Result<usize> {
        self.offset_at(line, character)
            .ok_or_else(|| LintError::PositionOutOfRange {
                file: file.to_string(),
                line,
                character,
            })
    }
}
