//! The attribute tree produced by a parse.
//!
//! Every decoder produces one [`Value`]. Sections produce a [`Value::Map`]
//! keyed by the label of the node that matched (without its sigil);
//! anonymous leaf nodes use the empty key.

/// A decoded value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Text from a line, word, quoted string or multiline block.
    String(String),
    /// A whole number.
    Integer(i64),
    /// A floating point number.
    Float(f64),
    /// A boolean or presence flag.
    Boolean(bool),
    /// A 3D vector.
    FloatTriple([f64; 3]),
    /// An RGB color.
    IntTriple([i64; 3]),
    /// A section or structured record.
    Map(Attributes),
    /// A list or the occurrences of a repeated field.
    List(Vec<Value>),
}

impl Value {
    /// Whether this is an empty string or an empty list.
    ///
    /// Empty values are left out of section maps.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::String(text) => text.is_empty(),
            Value::List(items) => items.is_empty(),
            _ => false,
        }
    }

    /// Short name of the value's kind, for messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Boolean(_) => "boolean",
            Value::FloatTriple(_) => "vector",
            Value::IntTriple(_) => "color",
            Value::Map(_) => "map",
            Value::List(_) => "list",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(value) => Some(*value),
            _ => None,
        }
    }

    /// The value as a float. Integers are widened.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(value) => Some(*value),
            Value::Integer(value) => Some(*value as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Look up a key when this value is a map.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_map().and_then(|map| map.get(key))
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Boolean(value)
    }
}

impl From<Attributes> for Value {
    fn from(map: Attributes) -> Self {
        Value::Map(map)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

/// An ordered map from label to value.
///
/// Insertion order follows the source, so printing a tree reproduces the
/// order fields appeared in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Attributes {
    entries: Vec<(String, Value)>,
}

impl Attributes {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any existing value under the same key.
    pub fn insert(&mut self, key: impl Into<String>, value: Value) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Get the value stored under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, value)| value)
    }

    /// Whether `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    /// Iterate over keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(key, _)| key.as_str())
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for Attributes {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        let mut map = Attributes::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl IntoIterator for Attributes {
    type Item = (String, Value);
    type IntoIter = std::vec::IntoIter<(String, Value)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_values() {
        assert!(Value::from("").is_empty());
        assert!(Value::List(Vec::new()).is_empty());
        assert!(!Value::from("x").is_empty());
        assert!(!Value::Map(Attributes::new()).is_empty());
        assert!(!Value::Boolean(false).is_empty());
    }

    #[test]
    fn test_insert_keeps_order_and_replaces() {
        let mut map = Attributes::new();
        map.insert("b", Value::from(1i64));
        map.insert("a", Value::from(2i64));
        map.insert("b", Value::from(3i64));
        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["b", "a"]);
        assert_eq!(map.get("b"), Some(&Value::Integer(3)));
        assert_eq!(map.len(), 2);
    }

    #[test]
    fn test_nested_lookup() {
        let inner: Attributes = [("Value", Value::from(1.5))].into_iter().collect();
        let value = Value::Map([("Damage Type", Value::Map(inner))].into_iter().collect());
        assert_eq!(
            value.get("Damage Type").and_then(|v| v.get("Value")).and_then(Value::as_f64),
            Some(1.5)
        );
        assert_eq!(value.get("Missing"), None);
    }
}
