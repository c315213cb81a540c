use std::fmt;

/// Canonical identity of a half-open offset range `[start, end)`.
///
/// Diagnostics and fix requests both derive their key from the same offset
/// pair, so a code-fix request for a diagnostic's exact span resolves to the
/// finding that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RangeKey(String);

impl RangeKey {
    pub fn new(start: usize, end: usize) -> Self {
        RangeKey(format!("{start},{end}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RangeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn key(start: usize, end: usize) -> RangeKey {
    RangeKey::new(start, end)
}
