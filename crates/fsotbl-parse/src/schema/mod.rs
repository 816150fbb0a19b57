//! Declarative table schemas.
//!
//! A schema is an ordered list of [`Node`]s built with the functions in
//! [`build`]. It is plain data: the parser walks it top-down against the
//! scanner.

pub mod build;

use std::fmt;

use fsotbl_scanner::TokenKind;

/// The terminator of multiline text values.
pub const END_MULTI_TEXT: &str = "$end_multi_text";

/// One grammar node plus the modifiers shared by every node kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// The node must match. For repeated nodes only the first occurrence is required.
    pub required: bool,
    /// The node may match any number of times.
    pub multi: bool,
    /// Matching the node produces a warning with this message.
    pub deprecated: Option<String>,
    /// Documentation shown on hover.
    pub doc: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// A named field or section, or an anonymous leaf value when `name` is empty.
    Field(Field),
    /// Ordered alternatives; the first child that matches wins.
    Either(Vec<Node>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    /// Sigil-qualified label (`#Armor Type`, `$Name`, `+Value`), or empty.
    pub name: String,
    /// Value decoded after the label. `None` makes this a section.
    pub value: Option<ValueType>,
    /// Children of a section.
    pub children: Vec<Node>,
    /// A boolean follows the label; `false` disables the section.
    pub boolean_gated: bool,
}

impl Node {
    pub(crate) fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            required: false,
            multi: false,
            deprecated: None,
            doc: None,
        }
    }

    /// Mark the node as required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Allow the node to repeat.
    pub fn multi(mut self) -> Self {
        self.multi = true;
        self
    }

    /// Mark the node as deprecated.
    pub fn deprecated(mut self, message: impl Into<String>) -> Self {
        self.deprecated = Some(message.into());
        self
    }

    /// Attach hover documentation.
    pub fn doc(mut self, text: impl Into<String>) -> Self {
        self.doc = Some(text.into());
        self
    }

    /// The field, if this is not an alternation.
    pub fn field(&self) -> Option<&Field> {
        match &self.kind {
            NodeKind::Field(field) => Some(field),
            NodeKind::Either(_) => None,
        }
    }

    /// Every label this node can match, sigil included.
    pub fn labels(&self) -> Vec<&str> {
        match &self.kind {
            NodeKind::Field(field) if field.name.is_empty() => Vec::new(),
            NodeKind::Field(field) => vec![field.name.as_str()],
            NodeKind::Either(children) => children.iter().flat_map(Node::labels).collect(),
        }
    }

    /// Human-readable summary used for generated hover text.
    pub fn describe(&self) -> String {
        let mut text = match &self.kind {
            NodeKind::Field(field) => match &field.value {
                Some(value) => value.to_string(),
                None if field.boolean_gated => "boolean section".to_string(),
                None => "section".to_string(),
            },
            NodeKind::Either(children) => format!("one of {}", quote_labels(&self.labels(), children.len())),
        };
        match (self.required, self.multi) {
            (true, true) => text.push_str(", required, repeatable"),
            (true, false) => text.push_str(", required"),
            (false, true) => text.push_str(", repeatable"),
            (false, false) => {}
        }
        text
    }
}

fn quote_labels(labels: &[&str], fallback: usize) -> String {
    if labels.is_empty() {
        return format!("{} alternatives", fallback);
    }
    labels
        .iter()
        .map(|label| format!("'{}'", label))
        .collect::<Vec<_>>()
        .join(", ")
}

impl Field {
    /// The token kind this field's label must have.
    ///
    /// `None` for anonymous fields and for names without a valid sigil.
    pub fn label_kind(&self) -> Option<TokenKind> {
        self.name.chars().next().and_then(TokenKind::for_sigil)
    }

    /// The label without its sigil; this is the key the value is stored under.
    pub fn key(&self) -> &str {
        match self.label_kind() {
            Some(_) => &self.name[1..],
            None => &self.name,
        }
    }

    /// Whether this section must be closed by `#End`.
    pub fn needs_end(&self) -> bool {
        self.value.is_none() && self.name.starts_with('#')
    }
}

/// The leaf decoders.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueType {
    /// Rest of the line, trimmed.
    String,
    /// One whitespace- or comma-delimited word.
    Word,
    /// A `"..."` string.
    Quoted,
    /// Raw text up to [`END_MULTI_TEXT`], trimmed.
    MultilineText,
    Boolean,
    Float,
    Integer,
    /// Presence only; always `true`.
    Flag,
    /// Three floats separated by whitespace or commas.
    Vec3d,
    /// Three integers in `0..=255`.
    Color,
    /// `name[, hit percent[, turn rate]]`.
    Subsystem,
    /// Zero or more `( "a" "b" )` groups.
    BankList,
    /// A parenthesized list of quoted strings, restricted to `allowed`
    /// unless that is empty.
    FlagList(Vec<String>),
    /// A parenthesized list.
    List(Box<ValueType>),
    /// Exactly N values without delimiters.
    FixedList(Box<ValueType>, usize),
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueType::String => f.write_str("string"),
            ValueType::Word => f.write_str("word"),
            ValueType::Quoted => f.write_str("quoted string"),
            ValueType::MultilineText => f.write_str("multiline text"),
            ValueType::Boolean => f.write_str("boolean"),
            ValueType::Float => f.write_str("float"),
            ValueType::Integer => f.write_str("integer"),
            ValueType::Flag => f.write_str("flag"),
            ValueType::Vec3d => f.write_str("vector of 3 floats"),
            ValueType::Color => f.write_str("RGB color"),
            ValueType::Subsystem => f.write_str("subsystem"),
            ValueType::BankList => f.write_str("weapon bank list"),
            ValueType::FlagList(allowed) if allowed.is_empty() => f.write_str("list of flags"),
            ValueType::FlagList(allowed) => write!(f, "list of flags ({})", allowed.join(", ")),
            ValueType::List(item) => write!(f, "list of {}", item),
            ValueType::FixedList(item, count) => write!(f, "{} x {}", count, item),
        }
    }
}
