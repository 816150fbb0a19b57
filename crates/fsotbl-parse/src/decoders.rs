//! Leaf value decoders.
//!
//! Each decoder forces the scanner into the reading mode it needs and
//! converts the resulting text. Decoders never rewind past their entry
//! point; deciding whether a field is present at all is the parser's job.

use fsotbl_scanner::{Position, Range, Scanner, Token, TokenKind};
use tracing::trace;

use crate::diagnostic::{Diagnostic, DiagnosticCode, Failure};
use crate::schema::{END_MULTI_TEXT, ValueType};
use crate::value::{Attributes, Value};

/// Where a value is being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Context {
    /// Directly after a label.
    Field,
    /// Inside a list; line-oriented decoders read a single word instead.
    ListItem,
}

const TRUE_WORDS: &[&str] = &["yes", "true", "ja", "oui", "si", "ita vero", "hija'", "hislah"];
const FALSE_WORDS: &[&str] = &["no", "false", "nein", "non", "minime", "ghobe'"];

/// Decode one value of `value_type`.
pub(crate) fn decode(
    value_type: &ValueType,
    scanner: &mut Scanner<'_>,
    context: Context,
) -> Result<Value, Failure> {
    scanner.check_cancelled()?;
    trace!("Decoding {} at {}", value_type, scanner.position());

    match value_type {
        ValueType::String => {
            let token = match context {
                Context::Field => scanner.force_read_line()?,
                Context::ListItem => scanner.force_read_word()?,
            };
            Ok(Value::String(token.text.trim().to_string()))
        }
        ValueType::Word => Ok(Value::String(scanner.force_read_word()?.text.into_owned())),
        ValueType::Quoted => Ok(Value::String(scanner.force_read_quoted()?.text.into_owned())),
        ValueType::MultilineText => {
            let token = scanner.force_read_until_marker(END_MULTI_TEXT)?;
            Ok(Value::String(token.text.trim().to_string()))
        }
        ValueType::Boolean => {
            let token = match context {
                Context::Field => scanner.force_read_line()?,
                Context::ListItem => scanner.force_read_word()?,
            };
            Ok(Value::Boolean(classify_boolean(&token)?))
        }
        ValueType::Float => {
            let token = scanner.force_read_number()?;
            let value = token.text.parse::<f64>().map_err(|_| {
                Diagnostic::new(
                    DiagnosticCode::InvalidValue,
                    format!("Not a float: {}", token.text),
                    token.range,
                )
            })?;
            Ok(Value::Float(value))
        }
        ValueType::Integer => {
            let token = scanner.force_read_number()?;
            let value = token.text.parse::<i64>().map_err(|_| {
                Diagnostic::new(
                    DiagnosticCode::InvalidValue,
                    format!("Not an integer: {}", token.text),
                    token.range,
                )
            })?;
            Ok(Value::Integer(value))
        }
        ValueType::Flag => Ok(Value::Boolean(true)),
        ValueType::Vec3d => decode_vec3d(scanner, context),
        ValueType::Color => decode_color(scanner, context),
        ValueType::Subsystem => decode_subsystem(scanner),
        ValueType::BankList => decode_bank_list(scanner),
        ValueType::FlagList(allowed) => {
            let mut items = Vec::new();
            scanner.read_list(|scanner| -> Result<(), Failure> {
                let token = scanner.force_read_quoted()?;
                if !allowed.is_empty()
                    && !allowed.iter().any(|flag| flag.eq_ignore_ascii_case(&token.text))
                {
                    return Err(Diagnostic::new(
                        DiagnosticCode::InvalidValue,
                        format!("Unknown flag '{}'", token.text),
                        token.range,
                    )
                    .with_help(format!("known flags: {}", allowed.join(", ")))
                    .into());
                }
                items.push(Value::String(token.text.into_owned()));
                Ok(())
            })?;
            Ok(Value::List(items))
        }
        ValueType::List(item) => {
            let mut items = Vec::new();
            scanner.read_list(|scanner| -> Result<(), Failure> {
                items.push(decode(item, scanner, Context::ListItem)?);
                Ok(())
            })?;
            Ok(Value::List(items))
        }
        ValueType::FixedList(item, count) => {
            let mut items = Vec::with_capacity(*count);
            for _ in 0..*count {
                items.push(decode(item, scanner, Context::ListItem)?);
            }
            Ok(Value::List(items))
        }
    }
}

fn classify_boolean(token: &Token<'_>) -> Result<bool, Diagnostic> {
    let text = token.text.trim().to_lowercase();
    if TRUE_WORDS.contains(&text.as_str()) {
        Ok(true)
    } else if FALSE_WORDS.contains(&text.as_str()) {
        Ok(false)
    } else {
        Err(Diagnostic::new(
            DiagnosticCode::InvalidValue,
            format!("Expected boolean but found '{}'", token.text),
            token.range,
        )
        .with_help("use YES or NO"))
    }
}

/// Split a single-line token into its parts, each with its own range.
fn split_parts<'t>(token: &'t Token<'_>, separators: &[char]) -> Vec<(&'t str, Range)> {
    let mut parts = Vec::new();
    let mut column = token.range.start.column;
    let mut start: Option<(usize, u32)> = None;
    let text: &str = &token.text;

    let mut close = |from: usize, from_column: u32, to: usize, to_column: u32| {
        let line = token.range.start.line;
        parts.push((
            &text[from..to],
            Range::new(Position::new(line, from_column), Position::new(line, to_column)),
        ));
    };

    for (idx, ch) in text.char_indices() {
        if separators.contains(&ch) {
            if let Some((from, from_column)) = start.take() {
                close(from, from_column, idx, column);
            }
        } else if start.is_none() {
            start = Some((idx, column));
        }
        column += 1;
    }
    if let Some((from, from_column)) = start {
        close(from, from_column, text.len(), column);
    }
    parts
}

fn decode_vec3d(scanner: &mut Scanner<'_>, context: Context) -> Result<Value, Failure> {
    let mut result = [0.0; 3];

    if context == Context::ListItem {
        for (idx, slot) in result.iter_mut().enumerate() {
            scanner.skip_whitespace();
            if idx > 0 {
                scanner.optional_char(',');
            }
            let token = scanner.force_read_number()?;
            *slot = parse_float(&token.text, token.range)?;
        }
        return Ok(Value::FloatTriple(result));
    }

    let token = scanner.force_read_line()?;
    let parts = split_parts(&token, &[' ', '\t', ',']);
    if parts.len() != 3 {
        return Err(Diagnostic::new(
            DiagnosticCode::InvalidValue,
            format!("Expected vec3d but found {} parts", parts.len()),
            token.range,
        )
        .with_help("write three numbers such as 0.0, 1.5, -2")
        .into());
    }
    for (slot, (text, range)) in result.iter_mut().zip(parts) {
        *slot = parse_float(text, range)?;
    }
    Ok(Value::FloatTriple(result))
}

fn parse_float(text: &str, range: Range) -> Result<f64, Diagnostic> {
    let normalized = match text.strip_prefix('.') {
        Some(rest) => format!("0.{}", rest),
        None => text.to_string(),
    };
    normalized.parse::<f64>().map_err(|_| {
        Diagnostic::new(
            DiagnosticCode::InvalidValue,
            format!("Failed to parse float '{}'", text),
            range,
        )
    })
}

fn decode_color(scanner: &mut Scanner<'_>, context: Context) -> Result<Value, Failure> {
    let mut components = [0i64; 3];
    let range;

    if context == Context::ListItem {
        let start = scanner.position();
        for slot in components.iter_mut() {
            let token = scanner.force_read_number()?;
            *slot = parse_int(&token.text, token.range)?;
        }
        range = Range::new(start, scanner.position());
    } else {
        let token = scanner.force_read_line()?;
        let parts = split_parts(&token, &[' ', '\t']);
        if parts.len() != 3 {
            return Err(Diagnostic::new(
                DiagnosticCode::InvalidValue,
                format!("Expected 3 color components but found {} parts", parts.len()),
                token.range,
            )
            .with_help("write red, green and blue as integers, e.g. 255 128 0")
            .into());
        }
        for (slot, (text, range)) in components.iter_mut().zip(parts) {
            *slot = parse_int(text, range)?;
        }
        range = token.range;
    }

    if components.iter().any(|c| !(0..=255).contains(c)) {
        let [r, g, b] = components;
        return Err(Diagnostic::new(
            DiagnosticCode::OutOfRange,
            format!(
                "One of these values is outside the valid range of 0-255: {} {} {}",
                r, g, b
            ),
            range,
        )
        .into());
    }
    Ok(Value::IntTriple(components))
}

fn parse_int(text: &str, range: Range) -> Result<i64, Diagnostic> {
    text.parse::<i64>().map_err(|_| {
        Diagnostic::new(
            DiagnosticCode::InvalidValue,
            format!("Failed to parse int '{}'", text),
            range,
        )
    })
}

/// `name[, hit percent[, turn rate]]`; every trailing part is optional.
fn decode_subsystem(scanner: &mut Scanner<'_>) -> Result<Value, Failure> {
    scanner.discard_lookahead();
    scanner.skip_inline_whitespace();

    let name = scanner.read_until(",;\r\n").trim();
    let mut record = Attributes::new();
    record.insert("Name", Value::String(name.to_string()));

    for key in ["Hit Percent", "Turn Rate"] {
        scanner.skip_inline_whitespace();
        if !scanner.optional_char(',') {
            break;
        }
        match optional_number(scanner)? {
            Some(token) => {
                let value = token.text.parse::<f64>().map_err(|_| {
                    Diagnostic::new(
                        DiagnosticCode::InvalidValue,
                        format!("Failed to parse {} '{}'", key.to_lowercase(), token.text),
                        token.range,
                    )
                })?;
                record.insert(key, Value::Float(value));
            }
            None => break,
        }
    }

    Ok(Value::Map(record))
}

/// The next token if it is a number; otherwise rewinds and returns `None`.
fn optional_number<'src>(scanner: &mut Scanner<'src>) -> Result<Option<Token<'src>>, Failure> {
    scanner.push_mark();
    match scanner.next() {
        Ok(token) if token.kind == TokenKind::Number => {
            scanner.drop_mark();
            Ok(Some(token))
        }
        Ok(_) => {
            scanner.pop_mark();
            Ok(None)
        }
        Err(error) => {
            scanner.pop_mark();
            match Failure::from(error) {
                Failure::Cancelled => Err(Failure::Cancelled),
                Failure::Error(_) => Ok(None),
            }
        }
    }
}

/// `( "a" "b" ) ( "c" )`
fn decode_bank_list(scanner: &mut Scanner<'_>) -> Result<Value, Failure> {
    scanner.discard_lookahead();

    let mut banks = Vec::new();
    loop {
        scanner.check_cancelled()?;
        scanner.skip_whitespace();
        if !scanner.optional_char('(') {
            break;
        }

        let mut bank = Vec::new();
        loop {
            scanner.skip_whitespace();
            if scanner.optional_char(',') {
                continue;
            }
            if !scanner.optional_char('"') {
                break;
            }
            let name = scanner.read_until("\"");
            bank.push(Value::String(name.to_string()));
            scanner.require_char('"')?;
        }

        scanner.require_char(')')?;
        banks.push(Value::List(bank));
    }

    Ok(Value::List(banks))
}
