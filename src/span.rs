//! Span types for tracking source locations.

use core::fmt;

/// Position in the input (byte index)
pub type Pos = usize;

/// A span in the input, with a start position and length
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy)]
pub struct Span {
    /// Starting position of the span in bytes
    pub start: Pos,
    /// Length of the span in bytes
    pub len: usize,
}

impl Span {
    /// Creates a new span with the given start position and length
    pub fn new(start: Pos, len: usize) -> Self {
        Span { start, len }
    }

    /// Span covering `start..end`
    pub fn between(start: Pos, end: Pos) -> Self {
        Span {
            start,
            len: end.saturating_sub(start),
        }
    }

    /// Start position of the span
    pub fn start(&self) -> Pos {
        self.start
    }

    /// Length of the span
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if this span has zero length
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// End position (start + length)
    pub fn end(&self) -> Pos {
        self.start + self.len
    }
}

impl From<Span> for miette::SourceSpan {
    fn from(span: Span) -> Self {
        miette::SourceSpan::new(span.start.into(), span.len)
    }
}

/// A value of type `T` annotated with its `Span`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned<T> {
    /// The actual data/value being wrapped
    pub node: T,
    /// The span information indicating the position and length in the source
    pub span: Span,
}

impl<T> Spanned<T> {
    /// Wraps `node` with the span it was read from
    pub fn new(node: T, span: Span) -> Self {
        Spanned { node, span }
    }
}

impl<T: fmt::Display> fmt::Display for Spanned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} at {}-{}",
            self.node,
            self.span.start(),
            self.span.end()
        )
    }
}

/// Translate a 1-based `line`/`column` pair, as reported by `serde_json`,
/// into a byte offset within `input`.
///
/// Column 0 (used by `serde_json` for errors before the first byte of a line)
/// maps to the start of that line. Offsets are clamped to the input length.
pub(crate) fn offset_of(input: &[u8], line: usize, column: usize) -> Pos {
    let mut line_start = 0;
    for _ in 1..line {
        match input[line_start..].iter().position(|&b| b == b'\n') {
            Some(nl) => line_start += nl + 1,
            None => return input.len(),
        }
    }
    (line_start + column.saturating_sub(1)).min(input.len())
}
