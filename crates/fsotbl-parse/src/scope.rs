//! Hover information recorded for matched labels.

use fsotbl_scanner::{Position, Range};

use crate::schema::Node;

/// The range of a matched label and the text shown when hovering it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeInfo {
    pub range: Range,
    pub hover_text: String,
}

impl ScopeInfo {
    /// Markdown hover text for `node`: its label, value kind and `doc`, plus
    /// the deprecation notice if any.
    pub fn hover_text_for(node: &Node, doc: Option<&str>) -> String {
        let label = node.labels().first().copied().unwrap_or_default();
        let mut text = format!("**{}** ({})", label, node.describe());
        if let Some(doc) = doc {
            text.push_str("\n\n");
            text.push_str(doc);
        }
        if let Some(message) = &node.deprecated {
            text.push_str("\n\n*Deprecated:* ");
            text.push_str(message);
        }
        text
    }

    /// The first scope in `scopes` whose range contains `position`.
    pub fn find(scopes: &[ScopeInfo], position: Position) -> Option<&ScopeInfo> {
        scopes.iter().find(|scope| scope.range.contains(position))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::build::*;

    #[test]
    fn test_generated_hover_text() {
        let node = float("+Value");
        assert_eq!(ScopeInfo::hover_text_for(&node, None), "**+Value** (float)");
    }

    #[test]
    fn test_hover_text_with_doc_and_deprecation() {
        let node = string("$Name").required().deprecated("use $Title");
        assert_eq!(
            ScopeInfo::hover_text_for(&node, Some("Display name")),
            "**$Name** (string, required)\n\nDisplay name\n\n*Deprecated:* use $Title"
        );
    }
}
