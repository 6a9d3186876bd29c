//! Runtime values stored in entry field maps and deal value maps.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A field-id keyed map of values.
pub type ValueMap = BTreeMap<String, Value>;

/// A loosely typed field value.
///
/// The JSON form is the natural JSON value, so persisted records stay
/// readable by anything that treats them as plain JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// No value.
    #[default]
    Null,
    /// Boolean value.
    Bool(bool),
    /// Numeric value.
    Number(f64),
    /// Text value. Reference fields store entry ids here.
    Text(String),
    /// Collection of values (multiselect, multi-reference).
    List(Vec<Value>),
}

impl Value {
    /// Create a text value.
    pub fn text(s: impl Into<String>) -> Self {
        Value::Text(s.into())
    }

    /// Create a list of text values.
    pub fn text_list<I, S>(items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Value::List(items.into_iter().map(|s| Value::Text(s.into())).collect())
    }

    /// Check if this value is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Null, `""`, and `[]` count as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::List(items) => items.is_empty(),
            Value::Bool(_) | Value::Number(_) => false,
        }
    }

    /// Check if this value is a collection.
    pub fn is_list(&self) -> bool {
        matches!(self, Value::List(_))
    }

    /// Try to get as string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    /// The value read as a collection: a scalar is a one-element collection,
    /// null is an empty one.
    pub fn elements(&self) -> Vec<&Value> {
        match self {
            Value::Null => Vec::new(),
            Value::List(items) => items.iter().collect(),
            other => vec![other],
        }
    }

    /// Entry ids held by this value, in stored order.
    ///
    /// Non-text elements and empty strings are skipped.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.elements()
            .into_iter()
            .filter_map(Value::as_str)
            .filter(|s| !s.is_empty())
    }

    /// Whether this value is, or contains, the given id.
    pub fn contains_id(&self, id: &str) -> bool {
        self.ids().any(|candidate| candidate == id)
    }

    /// Whether any id held by this value is in the given set.
    pub fn references_any<F>(&self, mut is_member: F) -> bool
    where
        F: FnMut(&str) -> bool,
    {
        self.ids().any(|candidate| is_member(candidate))
    }

    /// Equality with collection membership on either side.
    ///
    /// `"a"` matches `"a"`, `["a", "b"]` matches `"a"`, and two collections
    /// match when they share an element.
    pub fn matches(&self, other: &Value) -> bool {
        let ours = self.elements();
        let theirs = other.elements();
        ours.iter()
            .any(|a| theirs.iter().any(|b| scalar_eq(a, b)))
    }

    /// Remove the given id from this value.
    ///
    /// Returns `true` if anything was removed. A scalar holding the id
    /// becomes null.
    pub fn remove_id(&mut self, id: &str) -> bool {
        match self {
            Value::Text(s) if s == id => {
                *self = Value::Null;
                true
            }
            Value::List(items) => {
                let before = items.len();
                items.retain(|item| item.as_str() != Some(id));
                items.len() != before
            }
            _ => false,
        }
    }

    /// Human-readable rendering.
    pub fn display(&self) -> String {
        match self {
            Value::Null => String::new(),
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => format_number(*n),
            Value::Text(s) => s.clone(),
            Value::List(items) => items
                .iter()
                .map(Value::display)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    /// Lenient conversion from arbitrary JSON.
    ///
    /// Used for deal value maps, which are written by code that does not
    /// know about this type. Nested objects have no meaning here and
    /// become null.
    pub fn from_json(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map(Value::Number).unwrap_or(Value::Null),
            serde_json::Value::String(s) => Value::Text(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from_json).collect())
            }
            serde_json::Value::Object(_) => Value::Null,
        }
    }
}

fn scalar_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x == y,
        (Value::Number(n), Value::Text(s)) | (Value::Text(s), Value::Number(n)) => {
            s.trim().parse::<f64>().map(|parsed| parsed == *n).unwrap_or(false)
        }
        _ => a == b,
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Number(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Number(v as f64)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(v: Vec<T>) -> Self {
        Value::List(v.into_iter().map(Into::into).collect())
    }
}
