//! Scanner for FreeSpace table files.

use std::borrow::Cow;

use tracing::trace;

use crate::{CancelSignal, Position, Range, ScanError, SyntaxErrorKind, Token, TokenKind};

/// Characters that end a label.
const LABEL_STOP: &str = "\r\t\n:;";
/// Characters that end a forced line read.
const LINE_STOP: &str = ";\r\n";
/// Characters that end a forced word read.
const WORD_STOP: &str = ",\r\n\t )";
/// Characters that make up a number.
const NUMBER_CHARS: &str = "0123456789.-";

/// A single-lookahead scanner with explicit backtracking.
///
/// Every speculative read is bracketed with [`push_mark`](Self::push_mark)
/// and either [`pop_mark`](Self::pop_mark) (rewind) or
/// [`drop_mark`](Self::drop_mark) (confirm).
#[derive(Clone)]
pub struct Scanner<'src> {
    /// The source text being scanned.
    source: &'src str,
    /// Current byte offset in `source`.
    offset: usize,
    /// Current line/column.
    position: Position,
    /// Token read by `peek` but not yet consumed.
    lookahead: Option<Lookahead<'src>>,
    /// Save-point stack.
    marks: Vec<SavePoint<'src>>,
    cancel: CancelSignal,
}

#[derive(Debug, Clone)]
struct Lookahead<'src> {
    token: Token<'src>,
    /// Stream state before the token (and any skipped whitespace) was read.
    offset: usize,
    position: Position,
}

#[derive(Debug, Clone)]
struct SavePoint<'src> {
    offset: usize,
    position: Position,
    lookahead: Option<Lookahead<'src>>,
}

impl<'src> Scanner<'src> {
    /// Create a scanner over `source` bound to `cancel`.
    pub fn new(source: &'src str, cancel: CancelSignal) -> Self {
        Self {
            source,
            offset: 0,
            position: Position::start(),
            lookahead: None,
            marks: Vec::new(),
            cancel,
        }
    }

    /// Current byte offset in the stream.
    #[inline]
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Current stream position.
    #[inline]
    pub fn position(&self) -> Position {
        self.position
    }

    /// Whether the whole input has been consumed.
    #[inline]
    pub fn is_eof(&self) -> bool {
        self.lookahead.is_none() && self.offset >= self.source.len()
    }

    /// Number of save-points currently on the stack.
    #[inline]
    pub fn mark_depth(&self) -> usize {
        self.marks.len()
    }

    /// Fail with [`ScanError::Cancelled`] once the cancel signal has fired.
    #[inline]
    pub fn check_cancelled(&self) -> Result<(), ScanError> {
        self.cancel.check().map_err(ScanError::from)
    }

    // ------------------------------------------------------------------
    // Backtracking
    // ------------------------------------------------------------------

    /// Save the current position (including any pending lookahead).
    pub fn push_mark(&mut self) {
        self.marks.push(SavePoint {
            offset: self.offset,
            position: self.position,
            lookahead: self.lookahead.clone(),
        });
    }

    /// Rewind to the most recent save-point and remove it.
    pub fn pop_mark(&mut self) {
        debug_assert!(!self.marks.is_empty(), "pop_mark without push_mark");
        if let Some(mark) = self.marks.pop() {
            trace!("Rewinding to {}", mark.position);
            self.offset = mark.offset;
            self.position = mark.position;
            self.lookahead = mark.lookahead;
        }
    }

    /// Remove the most recent save-point without rewinding.
    pub fn drop_mark(&mut self) {
        debug_assert!(!self.marks.is_empty(), "drop_mark without push_mark");
        self.marks.pop();
    }

    // ------------------------------------------------------------------
    // Default tokenizer
    // ------------------------------------------------------------------

    /// Peek at the next non-comment token without consuming it.
    pub fn peek(&mut self) -> Result<&Token<'src>, ScanError> {
        let lookahead = match self.lookahead.take() {
            Some(lookahead) => lookahead,
            None => {
                let offset = self.offset;
                let position = self.position;
                let token = self.read_significant_token()?;
                Lookahead {
                    token,
                    offset,
                    position,
                }
            }
        };
        Ok(&self.lookahead.insert(lookahead).token)
    }

    /// Consume and return the next non-comment token.
    pub fn next(&mut self) -> Result<Token<'src>, ScanError> {
        match self.lookahead.take() {
            Some(lookahead) => Ok(lookahead.token),
            None => self.read_significant_token(),
        }
    }

    fn read_significant_token(&mut self) -> Result<Token<'src>, ScanError> {
        loop {
            let token = self.read_token()?;
            if !token.kind.is_comment() {
                return Ok(token);
            }
        }
    }

    /// Read one token, comments included. On error the stream is left where it was.
    fn read_token(&mut self) -> Result<Token<'src>, ScanError> {
        self.check_cancelled()?;

        let before = (self.offset, self.position);
        self.skip_whitespace();

        let start = self.position;
        let Some(c) = self.peek_char() else {
            self.restore(before);
            return Err(ScanError::syntax(
                SyntaxErrorKind::UnexpectedEof,
                Range::empty(start),
            ));
        };

        let result = match c {
            '#' | '$' | '+' => match TokenKind::for_sigil(c) {
                Some(kind) => Ok(self.read_label(kind)),
                None => Err(self.unrecognised(c)),
            },
            '"' => self.read_string(),
            '-' | '.' | '0'..='9' => Ok(self.read_number_token()),
            ';' => Ok(self.read_line_comment()),
            '/' if self.peek_nth_char(1) == Some('*') => self.read_block_comment(),
            _ => Err(self.unrecognised(c)),
        };

        match result {
            Ok(token) => {
                trace!("Token {:?} at {}: {:?}", token.kind, token.range, token.text);
                Ok(token)
            }
            Err(error) => {
                self.restore(before);
                Err(error)
            }
        }
    }

    fn unrecognised(&self, c: char) -> ScanError {
        let mut end = self.position;
        end.column += 1;
        ScanError::syntax(
            SyntaxErrorKind::UnrecognisedCharacter(c),
            Range::new(self.position, end),
        )
    }

    /// Read `#Label`, `$Label` or `+Label`, consuming an optional trailing `:`.
    fn read_label(&mut self, kind: TokenKind) -> Token<'src> {
        let start = self.position;
        self.advance(); // sigil

        let text = self.read_until(LABEL_STOP).trim_matches(' ');
        let end = self.position;
        self.optional_char(':');

        let kind = if kind == TokenKind::SectionLabel && text.eq_ignore_ascii_case("End") {
            TokenKind::SectionEnd
        } else {
            kind
        };
        Token::new(kind, text, Range::new(start, end))
    }

    /// Read `"..."`.
    fn read_string(&mut self) -> Result<Token<'src>, ScanError> {
        let start = self.position;
        self.advance(); // opening quote

        let text = self.read_until("\"");
        if !self.optional_char('"') {
            return Err(ScanError::syntax(
                SyntaxErrorKind::UnterminatedString,
                Range::new(start, self.position),
            ));
        }
        Ok(Token::new(
            TokenKind::StringLiteral,
            text,
            Range::new(start, self.position),
        ))
    }

    /// Read raw digits, `.` and `-`. A leading `.` gets a `0` prefix.
    fn read_number_token(&mut self) -> Token<'src> {
        let start = self.position;
        let text = self.read_only(NUMBER_CHARS);
        let range = Range::new(start, self.position);
        let text: Cow<'src, str> = if text.starts_with('.') {
            Cow::Owned(format!("0{}", text))
        } else {
            Cow::Borrowed(text)
        };
        Token::new(TokenKind::Number, text, range)
    }

    /// Read `; ...` up to (not including) the line break.
    fn read_line_comment(&mut self) -> Token<'src> {
        let start = self.position;
        self.advance(); // ;
        let text = self.read_until("\n");
        Token::new(TokenKind::LineComment, text, Range::new(start, self.position))
    }

    /// Read `/* ... */`.
    fn read_block_comment(&mut self) -> Result<Token<'src>, ScanError> {
        let start = self.position;
        self.advance(); // /
        self.advance(); // *

        let content_start = self.offset;
        loop {
            match self.peek_char() {
                None => {
                    return Err(ScanError::syntax(
                        SyntaxErrorKind::UnterminatedComment,
                        Range::new(start, self.position),
                    ));
                }
                Some('*') if self.peek_nth_char(1) == Some('/') => {
                    let text = &self.source[content_start..self.offset];
                    self.advance();
                    self.advance();
                    return Ok(Token::new(
                        TokenKind::BlockComment,
                        text,
                        Range::new(start, self.position),
                    ));
                }
                Some(_) => {
                    self.advance();
                }
            }
        }
    }

    // ------------------------------------------------------------------
    // Forced reading modes
    // ------------------------------------------------------------------

    /// Read everything up to the end of the line (or a `;` comment), trimmed.
    pub fn force_read_line(&mut self) -> Result<Token<'src>, ScanError> {
        self.check_cancelled()?;
        self.discard_lookahead();
        self.skip_inline_whitespace();

        let start = self.position;
        let text = self.read_until(LINE_STOP).trim_end_matches([' ', '\t']);
        Ok(Token::new(
            TokenKind::RestOfLine,
            text,
            Range::from_text(start, text),
        ))
    }

    /// Read a whitespace- or comma-delimited word.
    pub fn force_read_word(&mut self) -> Result<Token<'src>, ScanError> {
        self.check_cancelled()?;
        self.discard_lookahead();
        self.skip_whitespace();

        let start = self.position;
        let text = self.read_until(WORD_STOP);
        Ok(Token::new(
            TokenKind::StringLiteral,
            text,
            Range::new(start, self.position),
        ))
    }

    /// Read a number, whatever the default tokenizer would have made of the input.
    pub fn force_read_number(&mut self) -> Result<Token<'src>, ScanError> {
        self.check_cancelled()?;
        self.discard_lookahead();
        self.skip_whitespace();

        if !matches!(self.peek_char(), Some(c) if NUMBER_CHARS.contains(c)) {
            let found = self.word_ahead();
            let range = Range::from_text(self.position, found);
            return Err(ScanError::syntax(
                SyntaxErrorKind::ExpectedNumber {
                    found: found.to_string(),
                },
                range,
            ));
        }
        Ok(self.read_number_token())
    }

    /// Read a `"..."` string.
    pub fn force_read_quoted(&mut self) -> Result<Token<'src>, ScanError> {
        self.check_cancelled()?;
        self.discard_lookahead();
        self.skip_whitespace();

        if self.peek_char() != Some('"') {
            return Err(self.expected_char('"'));
        }
        self.read_string()
    }

    /// Read raw text until `marker`, which is recognised anywhere in the input.
    ///
    /// A partial match that breaks off is kept as content. The marker itself
    /// is consumed but not returned.
    pub fn force_read_until_marker(&mut self, marker: &str) -> Result<Token<'src>, ScanError> {
        self.check_cancelled()?;
        self.discard_lookahead();
        self.optional_char(':');

        let start = self.position;
        let terminator: Vec<char> = marker.chars().collect();
        let Some(&first) = terminator.first() else {
            return Ok(Token::new(TokenKind::StringLiteral, "", Range::empty(start)));
        };

        let mut text = String::new();
        let mut matched = 0usize;
        loop {
            let Some(c) = self.advance() else {
                return Err(ScanError::syntax(
                    SyntaxErrorKind::UnterminatedText {
                        terminator: marker.to_string(),
                    },
                    Range::new(start, self.position),
                ));
            };
            if c == '\n' {
                self.check_cancelled()?;
            }

            if matched > 0 {
                if c == terminator[matched] {
                    matched += 1;
                    if matched == terminator.len() {
                        break;
                    }
                    continue;
                }
                text.extend(&terminator[..matched]);
                matched = 0;
            }

            if c == first {
                matched = 1;
                if terminator.len() == 1 {
                    break;
                }
            } else {
                text.push(c);
            }
        }

        Ok(Token::new(
            TokenKind::StringLiteral,
            text,
            Range::new(start, self.position),
        ))
    }

    /// Read a parenthesized list, calling `item` once per element.
    ///
    /// Elements may be separated by commas or simply adjacent.
    pub fn read_list<E, F>(&mut self, mut item: F) -> Result<(), E>
    where
        E: From<ScanError>,
        F: FnMut(&mut Self) -> Result<(), E>,
    {
        self.check_cancelled()?;
        self.discard_lookahead();
        self.skip_whitespace();
        self.require_char('(')?;

        loop {
            self.check_cancelled()?;
            self.skip_whitespace();
            match self.peek_char() {
                Some(')') => {
                    self.advance();
                    return Ok(());
                }
                Some(',') => {
                    self.advance();
                }
                Some(_) => {
                    let before = self.offset;
                    item(self)?;
                    if self.offset == before && self.lookahead.is_none() {
                        return Err(self.expected_char(')').into());
                    }
                }
                None => return Err(self.expected_char(')').into()),
            }
        }
    }

    // ------------------------------------------------------------------
    // Character-level helpers for decoders
    // ------------------------------------------------------------------

    /// Consume characters up to (not including) any of `stop` or end of input.
    pub fn read_until(&mut self, stop: &str) -> &'src str {
        let start = self.offset;
        while let Some(c) = self.peek_char() {
            if stop.contains(c) {
                break;
            }
            self.advance();
        }
        &self.source[start..self.offset]
    }

    /// Consume characters as long as they are in `allow`.
    pub fn read_only(&mut self, allow: &str) -> &'src str {
        let start = self.offset;
        while let Some(c) = self.peek_char() {
            if !allow.contains(c) {
                break;
            }
            self.advance();
        }
        &self.source[start..self.offset]
    }

    /// Skip spaces, tabs and line breaks.
    pub fn skip_whitespace(&mut self) {
        while let Some(' ' | '\t' | '\r' | '\n') = self.peek_char() {
            self.advance();
        }
    }

    /// Skip spaces and tabs only.
    pub fn skip_inline_whitespace(&mut self) {
        while let Some(' ' | '\t') = self.peek_char() {
            self.advance();
        }
    }

    /// Consume `c` if it is the next character.
    pub fn optional_char(&mut self, c: char) -> bool {
        if self.peek_char() == Some(c) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consume `c` or fail.
    pub fn require_char(&mut self, c: char) -> Result<(), ScanError> {
        if self.optional_char(c) {
            Ok(())
        } else {
            Err(self.expected_char(c))
        }
    }

    /// Forget any pending lookahead, rewinding to before it was read.
    pub fn discard_lookahead(&mut self) {
        if let Some(lookahead) = self.lookahead.take() {
            self.offset = lookahead.offset;
            self.position = lookahead.position;
        }
    }

    /// Skip input until the stream is past `line`.
    ///
    /// Does nothing if the stream already is on a later line.
    pub fn skip_past_line(&mut self, line: u32) {
        self.discard_lookahead();
        while self.position.line <= line {
            if self.advance().is_none() {
                break;
            }
        }
    }

    fn expected_char(&self, expected: char) -> ScanError {
        let found = self.peek_char();
        let mut end = self.position;
        if found.is_some() {
            end.column += 1;
        }
        ScanError::syntax(
            SyntaxErrorKind::ExpectedCharacter { expected, found },
            Range::new(self.position, end),
        )
    }

    /// The whitespace-delimited word at the current position, without consuming it.
    fn word_ahead(&self) -> &'src str {
        let rest = &self.source[self.offset..];
        let end = rest
            .find(|c: char| c.is_whitespace() || c == ',')
            .unwrap_or(rest.len());
        &rest[..end]
    }

    // ------------------------------------------------------------------
    // Raw stream access
    // ------------------------------------------------------------------

    /// Peek at the next character without consuming it.
    #[inline]
    fn peek_char(&self) -> Option<char> {
        self.source[self.offset..].chars().next()
    }

    /// Peek at the nth character (0-indexed) without consuming.
    #[inline]
    fn peek_nth_char(&self, n: usize) -> Option<char> {
        self.source[self.offset..].chars().nth(n)
    }

    /// Advance by one character and return it.
    #[inline]
    fn advance(&mut self) -> Option<char> {
        let c = self.peek_char()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.position.line += 1;
            self.position.column = 0;
        } else {
            self.position.column += 1;
        }
        Some(c)
    }

    #[inline]
    fn restore(&mut self, (offset, position): (usize, Position)) {
        self.offset = offset;
        self.position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::SyntaxError;
    use std::time::Duration;

    fn scanner(source: &str) -> Scanner<'_> {
        Scanner::new(source, CancelSignal::new())
    }

    /// All tokens, comments included.
    fn tokenize(source: &str) -> Vec<(TokenKind, String)> {
        let mut scanner = scanner(source);
        let mut tokens = Vec::new();
        loop {
            match scanner.read_token() {
                Ok(token) => tokens.push((token.kind, token.text.into_owned())),
                Err(error) if error.is_eof() => return tokens,
                Err(error) => panic!("unexpected error {error}"),
            }
        }
    }

    fn syntax_kind(error: ScanError) -> SyntaxErrorKind {
        match error {
            ScanError::Syntax(SyntaxError { kind, .. }) => kind,
            ScanError::Cancelled => panic!("expected a syntax error"),
        }
    }

    #[test]
    fn test_labels() {
        assert_eq!(
            tokenize("#Armor Type\n$Name:\n+Value:\n#End"),
            vec![
                (TokenKind::SectionLabel, "Armor Type".to_string()),
                (TokenKind::FieldLabel, "Name".to_string()),
                (TokenKind::ModifierLabel, "Value".to_string()),
                (TokenKind::SectionEnd, "End".to_string()),
            ]
        );
    }

    #[test]
    fn test_label_with_spaces_and_colon() {
        let mut scanner = scanner("  $Damage Type: Laser");
        let token = scanner.next().unwrap();
        assert_eq!(token.kind, TokenKind::FieldLabel);
        assert_eq!(token.text, "Damage Type");
        assert_eq!(token.range.start, Position::new(1, 2));
        assert_eq!(token.range.end, Position::new(1, 14));
        assert_eq!(token.label().as_deref(), Some("$Damage Type"));
        // The colon is consumed with the label.
        assert_eq!(scanner.force_read_line().unwrap().text, "Laser");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            tokenize("1.5 -3\n.25"),
            vec![
                (TokenKind::Number, "1.5".to_string()),
                (TokenKind::Number, "-3".to_string()),
                (TokenKind::Number, "0.25".to_string()),
            ]
        );
    }

    #[test]
    fn test_string_literal() {
        assert_eq!(
            tokenize(r#""hello world""#),
            vec![(TokenKind::StringLiteral, "hello world".to_string())]
        );
    }

    #[test]
    fn test_comments() {
        assert_eq!(
            tokenize("; comment\n/* block\n */ 1"),
            vec![
                (TokenKind::LineComment, " comment".to_string()),
                (TokenKind::BlockComment, " block\n ".to_string()),
                (TokenKind::Number, "1".to_string()),
            ]
        );
    }

    #[test]
    fn test_next_skips_comments() {
        let mut scanner = scanner("; leading\n/* block */ $Name: x");
        let token = scanner.peek().unwrap().clone();
        assert_eq!(token.kind, TokenKind::FieldLabel);
        assert_eq!(scanner.next().unwrap(), token);
    }

    #[test]
    fn test_multiline_token_range() {
        let mut scanner = scanner("/* one\ntwo */");
        let token = scanner.read_token().unwrap();
        assert_eq!(token.range.start, Position::new(1, 0));
        assert_eq!(token.range.end, Position::new(2, 6));
    }

    #[test]
    fn test_unterminated_string_leaves_stream_untouched() {
        let mut scanner = scanner("  \"hello");
        let error = scanner.next().unwrap_err();
        assert_eq!(syntax_kind(error), SyntaxErrorKind::UnterminatedString);
        assert_eq!(scanner.offset(), 0);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut scanner = scanner("/* never closed");
        let error = scanner.next().unwrap_err();
        assert_eq!(syntax_kind(error), SyntaxErrorKind::UnterminatedComment);
    }

    #[test]
    fn test_unrecognised_character() {
        let mut scanner = scanner("\n  Standard");
        match scanner.next().unwrap_err() {
            ScanError::Syntax(error) => {
                assert_eq!(error.kind, SyntaxErrorKind::UnrecognisedCharacter('S'));
                assert_eq!(error.range.start, Position::new(2, 2));
            }
            ScanError::Cancelled => panic!("not cancelled"),
        }
    }

    #[test]
    fn test_eof() {
        let mut scanner = scanner("   \n ; only a comment");
        assert!(scanner.next().unwrap_err().is_eof());
    }

    #[test]
    fn test_mark_pop_rewinds_including_lookahead() {
        let mut scanner = scanner("$Name: a\n$Other: b");
        scanner.next().unwrap();
        scanner.force_read_line().unwrap();
        let peeked = scanner.peek().unwrap().clone();
        let offset = scanner.offset();

        scanner.push_mark();
        assert_eq!(scanner.next().unwrap(), peeked);
        scanner.force_read_line().unwrap();
        assert!(scanner.is_eof());
        scanner.pop_mark();

        assert_eq!(scanner.offset(), offset);
        assert_eq!(scanner.mark_depth(), 0);
        assert_eq!(scanner.next().unwrap(), peeked);
    }

    #[test]
    fn test_mark_drop_keeps_position() {
        let mut scanner = scanner("$A $B");
        scanner.push_mark();
        scanner.next().unwrap();
        scanner.drop_mark();
        assert_eq!(scanner.mark_depth(), 0);
        assert_eq!(scanner.next().unwrap().text, "B");
    }

    #[test]
    fn test_force_read_line_stops_at_comment() {
        let mut scanner = scanner("$Name:   Standard Armor  ; trailing\n#End");
        scanner.next().unwrap();
        let token = scanner.force_read_line().unwrap();
        assert_eq!(token.kind, TokenKind::RestOfLine);
        assert_eq!(token.text, "Standard Armor");
        assert_eq!(token.range.start, Position::new(1, 9));
        assert_eq!(scanner.next().unwrap().kind, TokenKind::SectionEnd);
    }

    #[test]
    fn test_force_read_line_discards_lookahead() {
        let mut scanner = scanner("$Value: 1.5 units");
        scanner.next().unwrap();
        assert_eq!(scanner.peek().unwrap().kind, TokenKind::Number);
        assert_eq!(scanner.force_read_line().unwrap().text, "1.5 units");
    }

    #[test]
    fn test_force_read_word() {
        let mut scanner = scanner("  alpha,beta\n gamma)");
        assert_eq!(scanner.force_read_word().unwrap().text, "alpha");
        assert!(scanner.optional_char(','));
        assert_eq!(scanner.force_read_word().unwrap().text, "beta");
        assert_eq!(scanner.force_read_word().unwrap().text, "gamma");
        assert!(scanner.optional_char(')'));
    }

    #[test]
    fn test_force_read_number() {
        let mut scanner = scanner(" .5\n-12");
        assert_eq!(scanner.force_read_number().unwrap().text, "0.5");
        assert_eq!(scanner.force_read_number().unwrap().text, "-12");

        let mut scanner = self::scanner("  abc def");
        let error = scanner.force_read_number().unwrap_err();
        assert_eq!(
            syntax_kind(error),
            SyntaxErrorKind::ExpectedNumber {
                found: "abc".to_string()
            }
        );
    }

    #[test]
    fn test_force_read_quoted() {
        let mut scanner = scanner(r#"  "Subach HL-7" "#);
        assert_eq!(scanner.force_read_quoted().unwrap().text, "Subach HL-7");

        let mut scanner = self::scanner("bare");
        let error = scanner.force_read_quoted().unwrap_err();
        assert_eq!(
            syntax_kind(error),
            SyntaxErrorKind::ExpectedCharacter {
                expected: '"',
                found: Some('b')
            }
        );
    }

    #[test]
    fn test_read_until_marker() {
        let mut scanner = scanner("$Text: hello $world\n$$end_multi_text\n#End");
        scanner.next().unwrap();
        let token = scanner.force_read_until_marker("$end_multi_text").unwrap();
        assert_eq!(token.text, " hello $world\n$");
        assert_eq!(scanner.next().unwrap().kind, TokenKind::SectionEnd);
    }

    #[test]
    fn test_read_until_marker_mid_line() {
        let mut scanner = scanner("$Text: one line$end_multi_text");
        scanner.next().unwrap();
        let token = scanner.force_read_until_marker("$end_multi_text").unwrap();
        assert_eq!(token.text, " one line");
        assert!(scanner.is_eof());
    }

    #[test]
    fn test_read_until_marker_unterminated() {
        let mut scanner = scanner("$Text: never $end_multi_tex");
        scanner.next().unwrap();
        let error = scanner.force_read_until_marker("$end_multi_text").unwrap_err();
        assert_eq!(
            syntax_kind(error),
            SyntaxErrorKind::UnterminatedText {
                terminator: "$end_multi_text".to_string()
            }
        );
    }

    #[test]
    fn test_read_list() {
        let mut scanner = scanner(" ( 1, 2\n 3 ) rest");
        let mut items = Vec::new();
        scanner
            .read_list(|s| -> Result<(), ScanError> {
                items.push(s.force_read_number()?.text.into_owned());
                Ok(())
            })
            .unwrap();
        assert_eq!(items, vec!["1", "2", "3"]);
        assert_eq!(scanner.force_read_line().unwrap().text, "rest");
    }

    #[test]
    fn test_read_list_unclosed() {
        let mut scanner = scanner("(1 2");
        let result = scanner.read_list(|s| s.force_read_number().map(|_| ()));
        assert_eq!(
            syntax_kind(result.unwrap_err()),
            SyntaxErrorKind::ExpectedCharacter {
                expected: ')',
                found: None
            }
        );
    }

    #[test]
    fn test_skip_past_line() {
        let mut scanner = scanner("$A: bad value\n$B: ok");
        scanner.next().unwrap();
        scanner.skip_past_line(1);
        assert_eq!(scanner.position(), Position::new(2, 0));
        // Already past: no-op.
        scanner.skip_past_line(1);
        assert_eq!(scanner.next().unwrap().text, "B");
    }

    #[test]
    fn test_cancelled_before_token() {
        let mut scanner = Scanner::new("$Name: x", CancelSignal::with_timeout(Duration::ZERO));
        assert_eq!(scanner.next().unwrap_err(), ScanError::Cancelled);
        assert_eq!(scanner.force_read_line().unwrap_err(), ScanError::Cancelled);
    }

    proptest::proptest! {
        #[test]
        fn prop_failed_speculation_is_lossless(source in "[#$+;a-z0-9 .\n\"]{0,40}") {
            let mut scanner = scanner(&source);
            let _ = scanner.peek();
            let offset = scanner.offset();
            let position = scanner.position();
            let lookahead = scanner.peek().ok().cloned();

            scanner.push_mark();
            let _ = scanner.next();
            let _ = scanner.next();
            let _ = scanner.force_read_line();
            scanner.pop_mark();

            proptest::prop_assert_eq!(scanner.offset(), offset);
            proptest::prop_assert_eq!(scanner.position(), position);
            proptest::prop_assert_eq!(scanner.peek().ok().cloned(), lookahead);
            proptest::prop_assert_eq!(scanner.mark_depth(), 0);
        }
    }
}
