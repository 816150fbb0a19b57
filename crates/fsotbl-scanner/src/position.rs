//! Source locations.

use std::fmt;

/// A location in the source text.
///
/// Lines are 1-based, columns are 0-based and counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    /// Line number, starting at 1.
    pub line: u32,
    /// Character offset within the line, starting at 0.
    pub column: u32,
}

impl Position {
    /// Create a new position.
    #[inline]
    pub fn new(line: u32, column: u32) -> Self {
        debug_assert!(line >= 1);
        Self { line, column }
    }

    /// The first position of a document.
    #[inline]
    pub fn start() -> Self {
        Self { line: 1, column: 0 }
    }

    /// Character offset of this position in `source`, clamped to the end of its line.
    pub fn char_offset(&self, source: &str) -> usize {
        let mut line = 1u32;
        let mut column = 0u32;
        for (idx, ch) in source.chars().enumerate() {
            if line == self.line && column == self.column {
                return idx;
            }
            if ch == '\n' {
                if line == self.line {
                    return idx;
                }
                line += 1;
                column = 0;
            } else {
                column += 1;
            }
        }
        source.chars().count()
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::start()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// A range between two positions (end exclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Range {
    /// Start of the range (inclusive)
    pub start: Position,
    /// End of the range (exclusive)
    pub end: Position,
}

impl Range {
    /// Create a new range.
    #[inline]
    pub fn new(start: Position, end: Position) -> Self {
        debug_assert!(start <= end);
        Self { start, end }
    }

    /// Create an empty range at a position.
    #[inline]
    pub fn empty(at: Position) -> Self {
        Self { start: at, end: at }
    }

    /// Create a range covering `text` when it starts at `start`.
    ///
    /// Embedded line breaks move the end onto later lines.
    pub fn from_text(start: Position, text: &str) -> Self {
        let mut end = start;
        for ch in text.chars() {
            if ch == '\n' {
                end.line += 1;
                end.column = 0;
            } else {
                end.column += 1;
            }
        }
        Self { start, end }
    }

    /// Whether this range is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Whether `position` falls inside this range (end inclusive, so a cursor
    /// placed right after a label still hits it).
    #[inline]
    pub fn contains(&self, position: Position) -> bool {
        self.start <= position && position <= self.end
    }

    /// Character offsets of this range in `source`.
    pub fn char_range(&self, source: &str) -> std::ops::Range<usize> {
        let start = self.start.char_offset(source);
        let end = self.end.char_offset(source).max(start);
        start..end
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_from_single_line_text() {
        let range = Range::from_text(Position::new(3, 4), "Laser");
        assert_eq!(range.end, Position::new(3, 9));
    }

    #[test]
    fn test_range_from_multiline_text() {
        let range = Range::from_text(Position::new(2, 10), "first\nsecond\nend");
        assert_eq!(range.start, Position::new(2, 10));
        assert_eq!(range.end, Position::new(4, 3));
    }

    #[test]
    fn test_char_offsets() {
        let source = "ab\ncdé\nf";
        assert_eq!(Position::new(1, 0).char_offset(source), 0);
        assert_eq!(Position::new(2, 1).char_offset(source), 4);
        assert_eq!(Position::new(3, 0).char_offset(source), 7);
        // Past the end of a line clamps to its newline.
        assert_eq!(Position::new(1, 40).char_offset(source), 2);
        assert_eq!(Range::new(Position::new(2, 0), Position::new(2, 3)).char_range(source), 3..6);
    }

    #[test]
    fn test_contains_is_end_inclusive() {
        let range = Range::new(Position::new(1, 0), Position::new(1, 5));
        assert!(range.contains(Position::new(1, 0)));
        assert!(range.contains(Position::new(1, 5)));
        assert!(!range.contains(Position::new(1, 6)));
        assert!(!range.contains(Position::new(2, 0)));
    }
}
