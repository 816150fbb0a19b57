//! Conversions between parser locations and LSP locations.
//!
//! Parser positions have 1-based lines and count columns in characters. LSP
//! positions are 0-based and count columns in UTF-16 code units, so every
//! conversion needs the text of the line.

use fsotbl_parse::{Diagnostic, Severity};
use tower_lsp::lsp_types::{self, DiagnosticSeverity, NumberOrString, Position};

/// Text of the 0-based `line`, empty past the end of `content`.
fn line_text(content: &str, line: u32) -> &str {
    content.split('\n').nth(line as usize).unwrap_or("")
}

/// UTF-16 length of the first `column` characters of `line`. Columns past
/// the end count one unit per missing character.
fn utf16_column(line: &str, column: u32) -> u32 {
    let mut units = 0u32;
    let mut chars = 0u32;
    for ch in line.chars().take(column as usize) {
        units += ch.len_utf16() as u32;
        chars += 1;
    }
    units + (column - chars)
}

/// Number of characters of `line` covered by `character` UTF-16 units.
fn char_column(line: &str, character: u32) -> u32 {
    let mut units = 0u32;
    let mut chars = 0u32;
    for ch in line.chars() {
        if units >= character {
            return chars;
        }
        units += ch.len_utf16() as u32;
        chars += 1;
    }
    chars + character.saturating_sub(units)
}

pub(crate) fn to_lsp_position(content: &str, position: fsotbl_parse::Position) -> Position {
    let line = position.line.saturating_sub(1);
    Position::new(line, utf16_column(line_text(content, line), position.column))
}

pub(crate) fn from_lsp_position(content: &str, position: Position) -> fsotbl_parse::Position {
    let column = char_column(line_text(content, position.line), position.character);
    fsotbl_parse::Position::new(position.line + 1, column)
}

pub(crate) fn to_lsp_range(content: &str, range: fsotbl_parse::Range) -> lsp_types::Range {
    lsp_types::Range {
        start: to_lsp_position(content, range.start),
        end: to_lsp_position(content, range.end),
    }
}

/// Convert a parser diagnostic on `content` into a protocol diagnostic.
pub(crate) fn to_lsp_diagnostic(
    content: &str,
    diagnostic: &Diagnostic,
    severity: Severity,
) -> lsp_types::Diagnostic {
    let severity = match severity {
        Severity::Error => DiagnosticSeverity::ERROR,
        Severity::Warning => DiagnosticSeverity::WARNING,
    };
    let message = match &diagnostic.help {
        Some(help) => format!("{}\n\nhelp: {}", diagnostic.message, help),
        None => diagnostic.message.clone(),
    };
    lsp_types::Diagnostic {
        range: to_lsp_range(content, diagnostic.range),
        severity: Some(severity),
        code: Some(NumberOrString::String(diagnostic.code.as_str().to_string())),
        code_description: None,
        source: Some("fsotbl".to_string()),
        message,
        related_information: None,
        tags: None,
        data: None,
    }
}

/// Convert LSP Position to byte offset
pub(crate) fn position_to_offset(content: &str, position: Position) -> usize {
    let mut current_line = 0u32;
    let mut current_col = 0u32;

    for (i, ch) in content.char_indices() {
        if current_line == position.line && current_col >= position.character {
            return i;
        }
        if ch == '\n' {
            if current_line == position.line {
                // Past the end of the line
                return i;
            }
            current_line += 1;
            current_col = 0;
        } else {
            current_col += ch.len_utf16() as u32;
        }
    }

    content.len()
}

/// Apply one `didChange` content change: a range edit, or a full replacement
/// when no range is given.
pub(crate) fn apply_change(content: &mut String, change: lsp_types::TextDocumentContentChangeEvent) {
    match change.range {
        Some(range) => {
            let start = position_to_offset(content, range.start);
            let end = position_to_offset(content, range.end).max(start);
            content.replace_range(start..end, &change.text);
        }
        None => *content = change.text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fsotbl_parse::DiagnosticCode;
    use lsp_types::TextDocumentContentChangeEvent;

    fn edit(start: (u32, u32), end: (u32, u32), text: &str) -> TextDocumentContentChangeEvent {
        TextDocumentContentChangeEvent {
            range: Some(lsp_types::Range {
                start: Position::new(start.0, start.1),
                end: Position::new(end.0, end.1),
            }),
            range_length: None,
            text: text.to_string(),
        }
    }

    #[test]
    fn test_position_to_offset() {
        let content = "#Armor Type\n$Name: Ünïcode\n";
        assert_eq!(position_to_offset(content, Position::new(0, 0)), 0);
        assert_eq!(position_to_offset(content, Position::new(1, 0)), 12);
        assert_eq!(position_to_offset(content, Position::new(1, 8)), 21);
        // Columns past the end clamp to the line break.
        assert_eq!(position_to_offset(content, Position::new(0, 99)), 11);
        assert_eq!(position_to_offset(content, Position::new(9, 0)), content.len());
    }

    #[test]
    fn test_apply_changes_in_order() {
        let mut content = "$Name: Standard\n+Value: 1.5\n".to_string();
        apply_change(&mut content, edit((0, 7), (0, 15), "Heavy"));
        apply_change(&mut content, edit((1, 8), (1, 11), "2"));
        assert_eq!(content, "$Name: Heavy\n+Value: 2\n");

        apply_change(
            &mut content,
            TextDocumentContentChangeEvent {
                range: None,
                range_length: None,
                text: "#End\n".to_string(),
            },
        );
        assert_eq!(content, "#End\n");
    }

    #[test]
    fn test_insert_at_end() {
        let mut content = "#Armor Type\n".to_string();
        apply_change(&mut content, edit((1, 0), (1, 0), "#End\n"));
        assert_eq!(content, "#Armor Type\n#End\n");
    }

    #[test]
    fn test_position_to_offset_counts_utf16_units() {
        let content = "$Name: 🚀 Rocket\n";
        // The rocket takes two UTF-16 units and four bytes.
        assert_eq!(position_to_offset(content, Position::new(0, 7)), 7);
        assert_eq!(position_to_offset(content, Position::new(0, 9)), 11);
        assert_eq!(position_to_offset(content, Position::new(0, 10)), 12);
    }

    #[test]
    fn test_columns_round_trip_through_utf16() {
        let content = "#Armor Type\n$Name: 🚀 Rocket\n";
        let rocket_r = fsotbl_parse::Position::new(2, 9);
        assert_eq!(to_lsp_position(content, rocket_r), Position::new(1, 10));
        assert_eq!(from_lsp_position(content, Position::new(1, 10)), rocket_r);

        // Lines without wide characters are unchanged.
        let label = fsotbl_parse::Position::new(1, 6);
        assert_eq!(to_lsp_position(content, label), Position::new(0, 6));
        assert_eq!(from_lsp_position(content, Position::new(0, 6)), label);
    }

    #[test]
    fn test_to_lsp_diagnostic() {
        let content = "#Ship\n$Mass: 1\n+Speed: abc\n";
        let range = fsotbl_parse::Range::new(
            fsotbl_parse::Position::new(3, 2),
            fsotbl_parse::Position::new(3, 7),
        );
        let diagnostic = Diagnostic::new(DiagnosticCode::InvalidValue, "Not a float: abc", range);
        let converted = to_lsp_diagnostic(content, &diagnostic, Severity::Error);
        assert_eq!(converted.range.start, Position::new(2, 2));
        assert_eq!(converted.range.end, Position::new(2, 7));
        assert_eq!(converted.severity, Some(DiagnosticSeverity::ERROR));
        assert_eq!(converted.code, Some(NumberOrString::String("invalid-value".to_string())));
        assert_eq!(converted.source.as_deref(), Some("fsotbl"));
        assert_eq!(converted.message, "Not a float: abc");
        assert_eq!(from_lsp_position(content, converted.range.start), range.start);
    }
}
