//! Items of array-valued fields.

use serde_json::Value;

use super::record::Record;

/// An element of an array field, seen through the two shapes this core compares.
///
/// Elements of any other shape have no `ArrayItem` view: they never match
/// anything, are never appended, and survive removals untouched.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ArrayItem<'a> {
    Scalar(&'a str),
    Structured(&'a Record),
}

impl<'a> ArrayItem<'a> {
    pub fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(ArrayItem::Scalar(s)),
            Value::Object(map) => Some(ArrayItem::Structured(map)),
            _ => None,
        }
    }

    /// Same-shape equality: case-sensitive for scalars, shallow for structured items.
    pub fn matches(&self, other: &ArrayItem<'_>) -> bool {
        match (self, other) {
            (ArrayItem::Scalar(a), ArrayItem::Scalar(b)) => a == b,
            (ArrayItem::Structured(a), ArrayItem::Structured(b)) => shallow_eq(a, b),
            _ => false,
        }
    }

    pub fn is_contained_in(&self, values: &[Value]) -> bool {
        values
            .iter()
            .filter_map(ArrayItem::from_value)
            .any(|candidate| self.matches(&candidate))
    }
}

/// Two maps are equal when they have the same keys and every value is equal
/// as a leaf. Nested objects and arrays are never equal to anything, since a
/// separately decoded container can never be the same value.
fn shallow_eq(a: &Record, b: &Record) -> bool {
    a.len() == b.len()
        && a.iter()
            .all(|(key, value)| b.get(key).is_some_and(|other| leaf_eq(value, other)))
}

fn leaf_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Object(_) | Value::Array(_), _) | (_, Value::Object(_) | Value::Array(_)) => false,
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}
