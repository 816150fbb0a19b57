//! Token types for the table scanner.

use std::borrow::Cow;
use std::fmt;

use crate::Range;

/// The kind of a token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Labels
    /// `#Name`
    SectionLabel,
    /// `$Name`
    FieldLabel,
    /// `+Name`
    ModifierLabel,
    /// The reserved `#End` label.
    SectionEnd,

    // Values
    /// Everything up to the end of the line (forced mode only).
    RestOfLine,
    /// `"..."`, or a bare word read in forced word mode.
    StringLiteral,
    /// `-1.5`, `.25`, `42`
    Number,

    // Comments
    /// `; ...`
    LineComment,
    /// `/* ... */`
    BlockComment,
}

impl TokenKind {
    /// Whether this token is a comment (skipped by `next`/`peek`).
    pub fn is_comment(&self) -> bool {
        matches!(self, TokenKind::LineComment | TokenKind::BlockComment)
    }

    /// Whether this token is a sigil-prefixed label.
    pub fn is_label(&self) -> bool {
        matches!(
            self,
            TokenKind::SectionLabel
                | TokenKind::FieldLabel
                | TokenKind::ModifierLabel
                | TokenKind::SectionEnd
        )
    }

    /// The label kind introduced by `sigil`.
    pub fn for_sigil(sigil: char) -> Option<TokenKind> {
        match sigil {
            '#' => Some(TokenKind::SectionLabel),
            '$' => Some(TokenKind::FieldLabel),
            '+' => Some(TokenKind::ModifierLabel),
            _ => None,
        }
    }

    /// The sigil of a label kind.
    pub fn sigil(&self) -> Option<char> {
        match self {
            TokenKind::SectionLabel | TokenKind::SectionEnd => Some('#'),
            TokenKind::FieldLabel => Some('$'),
            TokenKind::ModifierLabel => Some('+'),
            _ => None,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::SectionLabel => "section label",
            TokenKind::FieldLabel => "field label",
            TokenKind::ModifierLabel => "modifier label",
            TokenKind::SectionEnd => "'#End'",
            TokenKind::RestOfLine => "line",
            TokenKind::StringLiteral => "string",
            TokenKind::Number => "number",
            TokenKind::LineComment => "line comment",
            TokenKind::BlockComment => "block comment",
        };
        f.write_str(name)
    }
}

/// A token with its kind, text and location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'src> {
    /// The kind of token.
    pub kind: TokenKind,
    /// Token text. Labels exclude their sigil and trailing `:`,
    /// string literals exclude their quotes.
    pub text: Cow<'src, str>,
    /// Where the token starts and ends in the source.
    pub range: Range,
}

impl<'src> Token<'src> {
    /// Create a new token.
    pub fn new(kind: TokenKind, text: impl Into<Cow<'src, str>>, range: Range) -> Self {
        Self {
            kind,
            text: text.into(),
            range,
        }
    }

    /// The label including its sigil (`$Name`), or `None` for non-labels.
    pub fn label(&self) -> Option<String> {
        self.kind.sigil().map(|sigil| format!("{}{}", sigil, self.text))
    }

    /// Whether this is a label of `kind` whose name equals `name` ignoring case.
    pub fn is_label(&self, kind: TokenKind, name: &str) -> bool {
        self.kind == kind && self.text.eq_ignore_ascii_case(name)
    }
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.label() {
            Some(label) => f.write_str(&label),
            None => write!(f, "{} '{}'", self.kind, self.text),
        }
    }
}
