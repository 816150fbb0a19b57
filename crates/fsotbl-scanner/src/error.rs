//! Scanner errors.

use std::fmt;

use crate::{Cancelled, Range};

/// An error produced while scanning.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanError {
    /// The cancel signal fired; not a document defect.
    Cancelled,
    /// The source text is malformed.
    Syntax(SyntaxError),
}

impl ScanError {
    /// Create a syntax error.
    pub fn syntax(kind: SyntaxErrorKind, range: Range) -> Self {
        ScanError::Syntax(SyntaxError { kind, range })
    }

    /// Whether this is an end-of-input error.
    pub fn is_eof(&self) -> bool {
        matches!(
            self,
            ScanError::Syntax(SyntaxError {
                kind: SyntaxErrorKind::UnexpectedEof,
                ..
            })
        )
    }
}

impl From<Cancelled> for ScanError {
    fn from(_: Cancelled) -> Self {
        ScanError::Cancelled
    }
}

impl fmt::Display for ScanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScanError::Cancelled => write!(f, "{}", Cancelled),
            ScanError::Syntax(error) => write!(f, "{}", error),
        }
    }
}

impl std::error::Error for ScanError {}

/// A malformed-input error with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxError {
    /// What went wrong.
    pub kind: SyntaxErrorKind,
    /// Where it went wrong.
    pub range: Range,
}

impl fmt::Display for SyntaxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.kind, self.range.start)
    }
}

/// Kinds of scanner syntax errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxErrorKind {
    /// Input ended where a token was expected.
    UnexpectedEof,
    /// A character that cannot start any token.
    UnrecognisedCharacter(char),
    /// A `"` without its closing quote.
    UnterminatedString,
    /// A `/*` without its closing `*/`.
    UnterminatedComment,
    /// Multiline text without its terminator.
    UnterminatedText {
        /// The terminator that was never found.
        terminator: String,
    },
    /// A specific character was required.
    ExpectedCharacter {
        /// The required character.
        expected: char,
        /// What was there instead (`None` at end of input).
        found: Option<char>,
    },
    /// A number was required.
    ExpectedNumber {
        /// The text found instead.
        found: String,
    },
}

impl fmt::Display for SyntaxErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyntaxErrorKind::UnexpectedEof => write!(f, "Unexpected end of input"),
            SyntaxErrorKind::UnrecognisedCharacter(c) => write!(f, "Unrecognised token {}", c),
            SyntaxErrorKind::UnterminatedString => write!(f, "Unterminated string"),
            SyntaxErrorKind::UnterminatedComment => write!(f, "Unterminated block comment"),
            SyntaxErrorKind::UnterminatedText { terminator } => {
                write!(f, "Missing '{}' before end of input", terminator)
            }
            SyntaxErrorKind::ExpectedCharacter {
                expected,
                found: Some(found),
            } => write!(f, "Expected '{}' but found '{}'", expected, found.escape_default()),
            SyntaxErrorKind::ExpectedCharacter {
                expected,
                found: None,
            } => write!(f, "Expected '{}' but reached end of input", expected),
            SyntaxErrorKind::ExpectedNumber { found } if found.is_empty() => {
                write!(f, "Expected a number")
            }
            SyntaxErrorKind::ExpectedNumber { found } => {
                write!(f, "Expected a number but found '{}'", found)
            }
        }
    }
}
