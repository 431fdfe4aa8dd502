//! Byte spans and line lookup for compile diagnostics.

use text_size::TextSize;

/// A half-open byte range `[start, end)` into template source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Start byte offset (inclusive).
    pub start: TextSize,
    /// End byte offset (exclusive).
    pub end: TextSize,
}

impl Span {
    /// Creates a span from byte offsets.
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: TextSize::from(start as u32),
            end: TextSize::from(end as u32),
        }
    }
}

/// Maps byte offsets to 1-based line numbers.
///
/// Compile errors report the line of the offending tag; the index stores
/// each line's starting offset for a binary-search lookup.
#[derive(Debug, Clone)]
pub struct LineIndex {
    line_starts: Vec<TextSize>,
}

impl LineIndex {
    /// Builds the index for a source string.
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![TextSize::from(0)];
        for (offset, c) in source.char_indices() {
            if c == '\n' {
                line_starts.push(TextSize::from((offset + 1) as u32));
            }
        }
        Self { line_starts }
    }

    /// Returns the 1-based line containing the given byte offset.
    pub fn line_of(&self, offset: TextSize) -> u32 {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(line) => line.saturating_sub(1),
        };
        line as u32 + 1
    }
}
