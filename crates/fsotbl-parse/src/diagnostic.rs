//! Diagnostics collected during a parse, and their rendering.

use std::fmt;

use ariadne::{Color, Label, Report, ReportKind, Source};
use fsotbl_scanner::{Cancelled, Range, ScanError, SyntaxError, SyntaxErrorKind};

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

/// Stable identifier of a diagnostic class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    /// Malformed input the scanner could not tokenize.
    Syntax,
    /// A required label was not where it had to be.
    MissingField,
    /// A `#` section was not closed by `#End`.
    MissingSectionEnd,
    /// A non-repeatable field occurred twice in one section.
    DuplicateField,
    /// A value could not be decoded.
    InvalidValue,
    /// A value was decoded but lies outside its valid range.
    OutOfRange,
    /// None of the alternatives of a required choice matched.
    NoAlternative,
    /// Input left over after the last top-level node.
    TrailingContent,
    /// A deprecated field was used.
    Deprecated,
    /// The schema itself is malformed.
    InvalidSchema,
}

impl DiagnosticCode {
    /// The code as sent to editors.
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagnosticCode::Syntax => "syntax-error",
            DiagnosticCode::MissingField => "missing-field",
            DiagnosticCode::MissingSectionEnd => "missing-section-end",
            DiagnosticCode::DuplicateField => "duplicate-field",
            DiagnosticCode::InvalidValue => "invalid-value",
            DiagnosticCode::OutOfRange => "out-of-range",
            DiagnosticCode::NoAlternative => "no-alternative",
            DiagnosticCode::TrailingContent => "trailing-content",
            DiagnosticCode::Deprecated => "deprecated",
            DiagnosticCode::InvalidSchema => "invalid-schema",
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error or warning with its location.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub message: String,
    pub range: Range,
    /// Optional hint on how to fix the problem.
    pub help: Option<String>,
}

impl Diagnostic {
    /// Create a new diagnostic.
    pub fn new(code: DiagnosticCode, message: impl Into<String>, range: Range) -> Self {
        Self {
            code,
            message: message.into(),
            range,
            help: None,
        }
    }

    /// Attach a help text.
    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }

    /// Render this diagnostic with ariadne.
    ///
    /// Returns a string containing the formatted message with source context.
    pub fn render(&self, filename: &str, source: &str, severity: Severity) -> String {
        let mut output = Vec::new();
        self.write_report(filename, source, severity, &mut output);
        String::from_utf8(output).unwrap_or_else(|_| format!("{}", self))
    }

    /// Write the report to a writer.
    pub fn write_report<W: std::io::Write>(
        &self,
        filename: &str,
        source: &str,
        severity: Severity,
        writer: W,
    ) {
        let mut range = self.range.char_range(source);
        if range.is_empty() && range.start < source.chars().count() {
            range.end = range.start + 1;
        }

        let (kind, color) = match severity {
            Severity::Error => (ReportKind::Error, Color::Red),
            Severity::Warning => (ReportKind::Warning, Color::Yellow),
        };

        let mut report = Report::build(kind, (filename, range.clone()))
            .with_code(self.code.as_str())
            .with_message(&self.message)
            .with_label(
                Label::new((filename, range))
                    .with_message(self.label_message())
                    .with_color(color),
            );
        if let Some(help) = &self.help {
            report = report.with_help(help);
        }

        let _ = report
            .finish()
            .write((filename, Source::from(source)), writer);
    }

    fn label_message(&self) -> &'static str {
        match self.code {
            DiagnosticCode::Syntax => "cannot be read",
            DiagnosticCode::MissingField => "expected here",
            DiagnosticCode::MissingSectionEnd => "section not closed",
            DiagnosticCode::DuplicateField => "duplicate",
            DiagnosticCode::InvalidValue => "invalid value",
            DiagnosticCode::OutOfRange => "out of range",
            DiagnosticCode::NoAlternative => "no alternative matches",
            DiagnosticCode::TrailingContent => "unexpected",
            DiagnosticCode::Deprecated => "deprecated",
            DiagnosticCode::InvalidSchema => "schema error",
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} at {}", self.message, self.range.start)
    }
}

impl std::error::Error for Diagnostic {}

impl From<SyntaxError> for Diagnostic {
    fn from(error: SyntaxError) -> Self {
        let code = match error.kind {
            SyntaxErrorKind::ExpectedNumber { .. } => DiagnosticCode::InvalidValue,
            _ => DiagnosticCode::Syntax,
        };
        Diagnostic::new(code, error.kind.to_string(), error.range)
    }
}

/// Why a parse step did not produce a value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Failure {
    /// The analysis was cancelled; unwinds the whole parse.
    Cancelled,
    /// A document defect, recorded by the enclosing section.
    Error(Diagnostic),
}

impl From<Diagnostic> for Failure {
    fn from(diagnostic: Diagnostic) -> Self {
        Failure::Error(diagnostic)
    }
}

impl From<ScanError> for Failure {
    fn from(error: ScanError) -> Self {
        match error {
            ScanError::Cancelled => Failure::Cancelled,
            ScanError::Syntax(error) => Failure::Error(error.into()),
        }
    }
}

impl From<Cancelled> for Failure {
    fn from(_: Cancelled) -> Self {
        Failure::Cancelled
    }
}
