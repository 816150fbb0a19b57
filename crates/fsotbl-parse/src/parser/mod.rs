//! Schema-driven recursive-descent parser.
//!
//! The parser walks a schema against a [`Scanner`]. Optional matches are
//! speculative: a save-point is pushed before the label is read and popped
//! again on a miss, so an absent field never consumes input. Failures inside
//! a section are recorded and the section carries on with its next child.

use fsotbl_scanner::{
    CancelSignal, Cancelled, Position, Range, ScanError, Scanner, SyntaxErrorKind, Token, TokenKind,
};
use tracing::{debug, trace};

use crate::decoders::{self, Context};
use crate::diagnostic::{Diagnostic, DiagnosticCode, Failure};
use crate::schema::{Field, Node, NodeKind, ValueType};
use crate::scope::ScopeInfo;
use crate::value::{Attributes, Value};

/// Everything a parse produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseOutput {
    /// One entry per top-level schema node; `None` when it matched nothing
    /// or failed.
    pub values: Vec<Option<Value>>,
    pub errors: Vec<Diagnostic>,
    pub warnings: Vec<Diagnostic>,
    /// Hover records for every matched label, in source order.
    pub scopes: Vec<ScopeInfo>,
}

impl ParseOutput {
    /// Whether any error was recorded.
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The scope whose label range contains `position`.
    pub fn scope_at(&self, position: Position) -> Option<&ScopeInfo> {
        ScopeInfo::find(&self.scopes, position)
    }

    /// Top-level values keyed by label, skipping nodes that produced nothing.
    pub fn tree(&self, schema: &[Node]) -> Attributes {
        schema
            .iter()
            .zip(&self.values)
            .filter_map(|(node, value)| {
                let value = value.clone()?;
                let key = node.field().map(Field::key).unwrap_or_default();
                Some((key.to_string(), value))
            })
            .collect()
    }
}

/// Parse `source` against `schema`.
///
/// Document defects end up in [`ParseOutput::errors`]; only cancellation
/// makes the whole parse fail.
pub fn parse(schema: &[Node], source: &str, cancel: CancelSignal) -> Result<ParseOutput, Cancelled> {
    let mut parser = Parser::new(source, cancel);
    let mut values = Vec::with_capacity(schema.len());

    for node in schema {
        let value = match parser.parse_node(node, node.required) {
            Ok(Outcome::Matched { value, .. }) => value.filter(|value| !value.is_empty()),
            Ok(Outcome::Absent) => None,
            Err(Failure::Cancelled) => return Err(Cancelled),
            Err(Failure::Error(diagnostic)) => {
                debug!("Top-level node failed: {}", diagnostic);
                parser.errors.push(diagnostic);
                None
            }
        };
        values.push(value);
    }

    parser.check_trailing().map_err(|_| Cancelled)?;
    debug_assert_eq!(parser.scanner.mark_depth(), 0, "unbalanced save-points");

    Ok(ParseOutput {
        values,
        errors: parser.errors,
        warnings: parser.warnings,
        scopes: parser.scopes,
    })
}

/// Result of trying one schema node.
#[derive(Debug)]
enum Outcome<'n> {
    /// Nothing matched; no input was consumed.
    Absent,
    /// `node` matched. `value` is `None` when it produced nothing to keep,
    /// e.g. a disabled boolean section.
    Matched { node: &'n Node, value: Option<Value> },
}

/// Diagnostics recorded during a speculative attempt, plus where it stopped.
struct Attempt<'src> {
    scanner: Scanner<'src>,
    diagnostic: Diagnostic,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    scopes: Vec<ScopeInfo>,
}

/// Lengths of the diagnostic lists at a point in time.
#[derive(Clone, Copy)]
struct Checkpoint {
    errors: usize,
    warnings: usize,
    scopes: usize,
}

struct Parser<'src> {
    scanner: Scanner<'src>,
    errors: Vec<Diagnostic>,
    warnings: Vec<Diagnostic>,
    scopes: Vec<ScopeInfo>,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str, cancel: CancelSignal) -> Self {
        Self {
            scanner: Scanner::new(source, cancel),
            errors: Vec::new(),
            warnings: Vec::new(),
            scopes: Vec::new(),
        }
    }

    fn parse_node<'n>(&mut self, node: &'n Node, required: bool) -> Result<Outcome<'n>, Failure> {
        self.scanner.check_cancelled()?;
        if node.multi {
            self.parse_repeated(node, required)
        } else {
            self.parse_single(node, required)
        }
    }

    fn parse_single<'n>(&mut self, node: &'n Node, required: bool) -> Result<Outcome<'n>, Failure> {
        match &node.kind {
            NodeKind::Field(field) => self.parse_field(node, field, required),
            NodeKind::Either(children) => self.parse_either(node, children, required),
        }
    }

    /// Match `node` as often as possible. Only the first occurrence may be required.
    fn parse_repeated<'n>(&mut self, node: &'n Node, required: bool) -> Result<Outcome<'n>, Failure> {
        let mut required = required;
        let mut first: Option<&'n Node> = None;
        let mut items = Vec::new();

        loop {
            let before = self.scanner.offset();
            match self.parse_single(node, required) {
                Ok(Outcome::Absent) => break,
                Ok(Outcome::Matched { node: matched, value }) => {
                    first.get_or_insert(matched);
                    items.extend(value.filter(|value| !value.is_empty()));
                }
                Err(Failure::Error(diagnostic)) if first.is_some() => {
                    self.recover(diagnostic);
                }
                Err(failure) => return Err(failure),
            }
            required = false;

            // An anonymous leaf matches without a label; stop once no input is consumed.
            if self.scanner.offset() == before {
                break;
            }
        }

        trace!("Repeated node matched {} time(s)", items.len());
        Ok(match first {
            Some(matched) => Outcome::Matched {
                node: matched,
                value: Some(Value::List(items)),
            },
            None => Outcome::Absent,
        })
    }

    fn parse_field<'n>(
        &mut self,
        node: &'n Node,
        field: &'n Field,
        required: bool,
    ) -> Result<Outcome<'n>, Failure> {
        if field.name.is_empty() {
            let Some(value_type) = &field.value else {
                return Ok(Outcome::Absent);
            };
            let value = decoders::decode(value_type, &mut self.scanner, Context::Field)?;
            return Ok(Outcome::Matched {
                node,
                value: Some(value),
            });
        }

        let Some(kind) = field.label_kind() else {
            return Err(Diagnostic::new(
                DiagnosticCode::InvalidSchema,
                format!("Invalid field name '{}'", field.name),
                Range::empty(self.scanner.position()),
            )
            .into());
        };

        let Some(token) = self.match_label(field, kind, required)? else {
            return Ok(Outcome::Absent);
        };
        trace!("Matched {} at {}", token, token.range);

        self.record_scope(node, &token);
        if let Some(message) = &node.deprecated {
            self.warnings.push(deprecation(&field.name, message, token.range));
        }

        if let Some(value_type) = &field.value {
            let value = decoders::decode(value_type, &mut self.scanner, Context::Field)?;
            return Ok(Outcome::Matched {
                node,
                value: Some(value),
            });
        }

        if field.boolean_gated {
            let enabled = decoders::decode(&ValueType::Boolean, &mut self.scanner, Context::Field)?;
            if enabled != Value::Boolean(true) {
                debug!("Section {} is disabled", field.name);
                return Ok(Outcome::Matched { node, value: None });
            }
        }

        let attributes = self.parse_children(&field.children)?;
        if field.needs_end() {
            self.require_end(field, &token)?;
        }
        Ok(Outcome::Matched {
            node,
            value: Some(Value::Map(attributes)),
        })
    }

    /// Read the next label if it is `field`'s.
    ///
    /// A miss rewinds and returns `None`, or fails when `required`.
    fn match_label(
        &mut self,
        field: &Field,
        kind: TokenKind,
        required: bool,
    ) -> Result<Option<Token<'src>>, Failure> {
        self.scanner.push_mark();
        let token = match self.scanner.next() {
            Ok(token) => token,
            Err(ScanError::Cancelled) => {
                self.scanner.pop_mark();
                return Err(Failure::Cancelled);
            }
            Err(ScanError::Syntax(error)) => {
                self.scanner.pop_mark();
                if !required {
                    return Ok(None);
                }
                if error.kind == SyntaxErrorKind::UnexpectedEof {
                    return Err(Diagnostic::new(
                        DiagnosticCode::MissingField,
                        format!("Expected '{}' but reached end of input", field.name),
                        error.range,
                    )
                    .into());
                }
                return Err(Diagnostic::from(error).into());
            }
        };

        if token.is_label(kind, field.key()) {
            self.scanner.drop_mark();
            return Ok(Some(token));
        }

        self.scanner.pop_mark();
        if required {
            return Err(Diagnostic::new(
                DiagnosticCode::MissingField,
                format!("Expected '{}' but found {}", field.name, token),
                token.range,
            )
            .into());
        }
        Ok(None)
    }

    fn require_end(&mut self, field: &Field, opening: &Token<'_>) -> Result<(), Failure> {
        match self.scanner.next() {
            Ok(token) if token.kind == TokenKind::SectionEnd => Ok(()),
            Ok(token) => Err(Diagnostic::new(
                DiagnosticCode::MissingSectionEnd,
                format!("Expected '#End' but found {}", token),
                token.range,
            )
            .with_help(format!("close '{}' (line {}) with #End", field.name, opening.range.start.line))
            .into()),
            Err(ScanError::Syntax(error)) if error.kind == SyntaxErrorKind::UnexpectedEof => {
                Err(Diagnostic::new(
                    DiagnosticCode::MissingSectionEnd,
                    format!("Expected '#End' for '{}' but reached end of input", field.name),
                    opening.range,
                )
                .into())
            }
            Err(error) => Err(error.into()),
        }
    }

    /// Try each alternative in order; the first that matches wins.
    fn parse_either<'n>(
        &mut self,
        node: &'n Node,
        children: &'n [Node],
        required: bool,
    ) -> Result<Outcome<'n>, Failure> {
        let mut failed: Option<Attempt<'src>> = None;

        for child in children {
            self.scanner.check_cancelled()?;
            let checkpoint = self.checkpoint();
            self.scanner.push_mark();

            match self.parse_node(child, false) {
                Ok(Outcome::Matched { node: matched, value }) => {
                    self.scanner.drop_mark();
                    self.apply_either_modifiers(node, matched, checkpoint);
                    return Ok(Outcome::Matched { node: matched, value });
                }
                Ok(Outcome::Absent) => {
                    self.scanner.pop_mark();
                }
                Err(Failure::Cancelled) => {
                    self.scanner.pop_mark();
                    return Err(Failure::Cancelled);
                }
                Err(Failure::Error(diagnostic)) => {
                    trace!("Alternative failed: {}", diagnostic);
                    let scanner = self.scanner.clone();
                    self.scanner.pop_mark();
                    let (errors, warnings, scopes) = self.rollback(checkpoint);
                    failed = Some(Attempt {
                        scanner,
                        diagnostic,
                        errors,
                        warnings,
                        scopes,
                    });
                }
            }
        }

        if let Some(attempt) = failed {
            // Resume where the last failing alternative stopped.
            self.scanner = attempt.scanner;
            self.scanner.drop_mark();
            self.errors.extend(attempt.errors);
            self.warnings.extend(attempt.warnings);
            self.scopes.extend(attempt.scopes);
            return Err(attempt.diagnostic.into());
        }

        if required {
            let (found, range) = self.describe_next();
            let expected = node
                .labels()
                .iter()
                .map(|label| format!("'{}'", label))
                .collect::<Vec<_>>()
                .join(", ");
            return Err(Diagnostic::new(
                DiagnosticCode::NoAlternative,
                format!("Expected one of {} but found {}", expected, found),
                range,
            )
            .into());
        }
        Ok(Outcome::Absent)
    }

    fn apply_either_modifiers(&mut self, node: &Node, matched: &Node, checkpoint: Checkpoint) {
        let Some(scope) = self.scopes.get_mut(checkpoint.scopes) else {
            return;
        };
        let range = scope.range;
        if matched.doc.is_none()
            && let Some(doc) = &node.doc
        {
            scope.hover_text = ScopeInfo::hover_text_for(matched, Some(doc.as_str()));
        }
        if let Some(message) = &node.deprecated {
            let label = matched.labels().first().map(|l| l.to_string()).unwrap_or_default();
            self.warnings.push(deprecation(&label, message, range));
        }
    }

    /// Parse `children` in order into a map, recovering from per-child failures.
    fn parse_children<'n>(&mut self, children: &'n [Node]) -> Result<Attributes, Failure> {
        let mut attributes = Attributes::new();
        let mut seen: Vec<(&'n Node, bool)> = Vec::new();

        for child in children {
            self.scanner.check_cancelled()?;
            self.reject_duplicates(&seen)?;

            let before = self.scanner.offset();
            match self.parse_node(child, child.required) {
                Ok(Outcome::Absent) => {}
                Ok(Outcome::Matched { node, value }) => {
                    if node.field().is_some() {
                        seen.push((node, child.multi || node.multi));
                    }
                    let key = node.field().map(Field::key).unwrap_or_default();
                    match value {
                        Some(value) if !value.is_empty() => attributes.insert(key, value),
                        _ => trace!("Omitting empty value for '{}'", key),
                    }
                }
                Err(Failure::Cancelled) => return Err(Failure::Cancelled),
                Err(Failure::Error(diagnostic)) => {
                    // A failure after the label was read still counts as an occurrence.
                    if self.scanner.offset() != before && child.field().is_some() {
                        seen.push((child, child.multi));
                    }
                    self.recover(diagnostic);
                }
            }
        }

        self.reject_duplicates(&seen)?;
        Ok(attributes)
    }

    /// Report and skip every field already seen in this section that may not
    /// repeat. A duplicated section is skipped together with its body.
    fn reject_duplicates(&mut self, seen: &[(&Node, bool)]) -> Result<(), Failure> {
        loop {
            self.scanner.push_mark();
            let next = self.scanner.next();
            self.scanner.pop_mark();

            let token = match next {
                Ok(token) => token,
                Err(ScanError::Cancelled) => return Err(Failure::Cancelled),
                Err(ScanError::Syntax(_)) => return Ok(()),
            };
            let Some(label) = token.label() else {
                return Ok(());
            };
            if token.kind == TokenKind::SectionEnd {
                return Ok(());
            }
            let Some(node) = seen.iter().find_map(|(node, multi)| {
                let field = node.field()?;
                (!*multi && field.name.eq_ignore_ascii_case(&label)).then_some(*node)
            }) else {
                return Ok(());
            };

            debug!("Duplicate {} at {}", label, token.range);
            self.errors.push(
                Diagnostic::new(
                    DiagnosticCode::DuplicateField,
                    format!("Duplicate field '{}'", label),
                    token.range,
                )
                .with_help("this field may only appear once per section"),
            );

            let is_section = node.field().is_some_and(|field| field.value.is_none());
            if !is_section {
                self.scanner.skip_past_line(token.range.start.line);
                continue;
            }

            // Parse the body so its lines are not mistaken for siblings, then
            // drop everything it recorded.
            let checkpoint = self.checkpoint();
            let skipped = self.parse_single(node, false);
            let (discarded, _, _) = self.rollback(checkpoint);
            trace!("Skipped duplicate {} ({} error(s) inside)", label, discarded.len());
            match skipped {
                Ok(Outcome::Matched { .. }) => {}
                Ok(Outcome::Absent) => self.scanner.skip_past_line(token.range.start.line),
                Err(Failure::Cancelled) => return Err(Failure::Cancelled),
                Err(Failure::Error(_)) => self.skip_failed_line(),
            }
        }
    }

    /// Record `diagnostic` and move past the input that caused it.
    fn recover(&mut self, diagnostic: Diagnostic) {
        debug!("Recovering from: {}", diagnostic);
        self.errors.push(diagnostic);
        self.skip_failed_line();
    }

    /// Skip the rest of the current line unless the next token is a label
    /// opening a line of its own.
    ///
    /// A value such as `+5` reads as a label too, so a label that follows
    /// input already consumed on the same line is skipped with it.
    fn skip_failed_line(&mut self) {
        self.scanner.discard_lookahead();
        let here = self.scanner.position();
        let starts_field = matches!(
            self.scanner.peek(),
            Ok(token) if token.kind.is_label()
                && (token.range.start.line > here.line || here.column == 0)
        );
        if !starts_field {
            self.scanner.skip_past_line(here.line);
        }
    }

    /// Report input left over after the last top-level node.
    ///
    /// Skipped when errors were already reported, since leftovers are then expected.
    fn check_trailing(&mut self) -> Result<(), Failure> {
        if !self.errors.is_empty() {
            return Ok(());
        }
        match self.scanner.peek() {
            Ok(token) => {
                let diagnostic = Diagnostic::new(
                    DiagnosticCode::TrailingContent,
                    format!("Unexpected {} after the end of the table", token),
                    token.range,
                );
                self.errors.push(diagnostic);
                Ok(())
            }
            Err(ScanError::Cancelled) => Err(Failure::Cancelled),
            Err(error) if error.is_eof() => Ok(()),
            Err(ScanError::Syntax(error)) => {
                self.errors.push(error.into());
                Ok(())
            }
        }
    }

    fn describe_next(&mut self) -> (String, Range) {
        self.scanner.push_mark();
        let next = self.scanner.next();
        self.scanner.pop_mark();
        match next {
            Ok(token) => (token.to_string(), token.range),
            Err(_) => (
                "end of input".to_string(),
                Range::empty(self.scanner.position()),
            ),
        }
    }

    fn record_scope(&mut self, node: &Node, token: &Token<'_>) {
        self.scopes.push(ScopeInfo {
            range: token.range,
            hover_text: ScopeInfo::hover_text_for(node, node.doc.as_deref()),
        });
    }

    fn checkpoint(&self) -> Checkpoint {
        Checkpoint {
            errors: self.errors.len(),
            warnings: self.warnings.len(),
            scopes: self.scopes.len(),
        }
    }

    /// Undo everything recorded since `checkpoint`, returning it.
    fn rollback(&mut self, checkpoint: Checkpoint) -> (Vec<Diagnostic>, Vec<Diagnostic>, Vec<ScopeInfo>) {
        (
            self.errors.split_off(checkpoint.errors),
            self.warnings.split_off(checkpoint.warnings),
            self.scopes.split_off(checkpoint.scopes),
        )
    }
}

fn deprecation(label: &str, message: &str, range: Range) -> Diagnostic {
    Diagnostic::new(
        DiagnosticCode::Deprecated,
        format!("'{}' is deprecated: {}", label, message),
        range,
    )
}
