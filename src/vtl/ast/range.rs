//! Source positions for AST nodes and errors
//!
//! Every AST node carries a [Range]: the byte span it was parsed from plus the matching
//! 0-based line:column positions. [SourceLocation] does the byte-offset conversion with a
//! binary search over precomputed line starts.

use std::fmt;
use std::ops::Range as ByteRange;

/// A 0-based line and byte column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Position {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Byte span of a node together with its start and end positions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Range {
    pub span: ByteRange<usize>,
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(span: ByteRange<usize>, start: Position, end: Position) -> Self {
        Self { span, start, end }
    }

    /// Smallest range covering both `self` and `other`.
    pub fn to(&self, other: &Range) -> Range {
        let (start, span_start) = if other.start < self.start {
            (other.start, other.span.start)
        } else {
            (self.start, self.span.start)
        };
        let (end, span_end) = if other.end > self.end {
            (other.end, other.span.end)
        } else {
            (self.end, self.span.end)
        };
        Range::new(span_start..span_end, start, end)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

/// Converts byte offsets of one source text into positions.
#[derive(Debug, Clone)]
pub struct SourceLocation {
    /// Byte offsets where each line starts
    line_starts: Vec<usize>,
}

impl SourceLocation {
    pub fn new(source: &str) -> Self {
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(at, _)| at + 1))
            .collect();
        Self { line_starts }
    }

    pub fn byte_to_position(&self, offset: usize) -> Position {
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next.saturating_sub(1),
        };
        Position::new(line, offset - self.line_starts[line])
    }

    pub fn range(&self, span: &ByteRange<usize>) -> Range {
        Range::new(
            span.clone(),
            self.byte_to_position(span.start),
            self.byte_to_position(span.end),
        )
    }

    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }
}
