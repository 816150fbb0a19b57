//! Builder functions for schemas.
//!
//! ```
//! use fsotbl_parse::schema::build::*;
//!
//! let armor = section(
//!     "#Armor Type",
//!     [
//!         string("$Name").required(),
//!         section(
//!             "$Damage Type",
//!             [string("").required(), string("+Calculation"), float("+Value")],
//!         )
//!         .multi(),
//!     ],
//! );
//! assert_eq!(armor.labels(), vec!["#Armor Type"]);
//! ```

use super::{Field, Node, NodeKind, ValueType};

fn field(name: &str, value: Option<ValueType>) -> Node {
    Node::new(NodeKind::Field(Field {
        name: name.to_string(),
        value,
        children: Vec::new(),
        boolean_gated: false,
    }))
}

fn value(name: &str, value: ValueType) -> Node {
    field(name, Some(value))
}

/// A section parsing `children` in order.
pub fn section(name: &str, children: impl IntoIterator<Item = Node>) -> Node {
    Node::new(NodeKind::Field(Field {
        name: name.to_string(),
        value: None,
        children: children.into_iter().collect(),
        boolean_gated: false,
    }))
}

/// A section whose label is followed by a boolean; `false` skips the children.
pub fn boolean_section(name: &str, children: impl IntoIterator<Item = Node>) -> Node {
    Node::new(NodeKind::Field(Field {
        name: name.to_string(),
        value: None,
        children: children.into_iter().collect(),
        boolean_gated: true,
    }))
}

pub fn string(name: &str) -> Node {
    value(name, ValueType::String)
}

pub fn word(name: &str) -> Node {
    value(name, ValueType::Word)
}

/// `( "a" "b" ... )`
pub fn quoted_list(name: &str) -> Node {
    value(name, ValueType::List(Box::new(ValueType::Quoted)))
}

/// `( "a" "b" ... )` restricted to `allowed` (any flag when empty).
pub fn flags<'a>(name: &str, allowed: impl IntoIterator<Item = &'a str>) -> Node {
    let allowed = allowed.into_iter().map(str::to_string).collect();
    value(name, ValueType::FlagList(allowed))
}

pub fn multiline(name: &str) -> Node {
    value(name, ValueType::MultilineText)
}

pub fn integer(name: &str) -> Node {
    value(name, ValueType::Integer)
}

pub fn float(name: &str) -> Node {
    value(name, ValueType::Float)
}

pub fn float_list(name: &str) -> Node {
    value(name, ValueType::List(Box::new(ValueType::Float)))
}

pub fn fixed_float_list(name: &str, count: usize) -> Node {
    value(name, ValueType::FixedList(Box::new(ValueType::Float), count))
}

pub fn integer_list(name: &str) -> Node {
    value(name, ValueType::List(Box::new(ValueType::Integer)))
}

pub fn fixed_integer_list(name: &str, count: usize) -> Node {
    value(name, ValueType::FixedList(Box::new(ValueType::Integer), count))
}

pub fn vec3d(name: &str) -> Node {
    value(name, ValueType::Vec3d)
}

pub fn color(name: &str) -> Node {
    value(name, ValueType::Color)
}

/// A label whose presence alone means `true`.
pub fn flag(name: &str) -> Node {
    value(name, ValueType::Flag)
}

pub fn boolean(name: &str) -> Node {
    value(name, ValueType::Boolean)
}

pub fn boolean_list(name: &str) -> Node {
    value(name, ValueType::List(Box::new(ValueType::Boolean)))
}

pub fn subsystem(name: &str) -> Node {
    value(name, ValueType::Subsystem)
}

pub fn bank_list(name: &str) -> Node {
    value(name, ValueType::BankList)
}

/// A label with no value.
pub fn void(name: &str) -> Node {
    field(name, None)
}

/// Ordered alternatives.
pub fn either(children: impl IntoIterator<Item = Node>) -> Node {
    Node::new(NodeKind::Either(children.into_iter().collect()))
}

/// The `+nocreate` flag of modular tables.
pub fn nocreate() -> Node {
    flag("+nocreate")
}

/// Concatenate node lists.
pub fn join(parts: impl IntoIterator<Item = Vec<Node>>) -> Vec<Node> {
    parts.into_iter().flatten().collect()
}
