use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};

/// A value flowing through an expression: record fields, literals, and
/// intermediate results.
///
/// Records are usually built from JSON, so every JSON type has a variant. Two
/// variants have no JSON counterpart:
///
/// - [`Value::Date`] is produced by the `date()` builtin.
/// - [`Value::Absent`] is the result of a property lookup that could not be
///   resolved. It is distinct from [`Value::Null`], which is a real record value.
///
/// # Type Preservation
///
/// Integers and floats are kept apart the same way JSON numbers are parsed:
/// arithmetic keeps integer results when they are whole, and falls back to
/// floats otherwise.
///
/// # Examples
///
/// ```
/// use object_query::Value;
/// use serde_json::json;
///
/// let record = Value::from(json!({"id": 7, "tags": ["a", "b"]}));
/// assert!(matches!(record, Value::Object(_)));
///
/// assert_eq!(Value::from(3), Value::Integer(3));
/// assert_ne!(Value::Absent, Value::Null);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Result of an unresolved property lookup
    Absent,

    /// JSON null
    Null,

    /// JSON boolean (true/false)
    Boolean(bool),

    /// Integer number (preserved separately from floats)
    Integer(i64),

    /// Floating-point number
    Float(f64),

    /// UTF-8 string
    String(String),

    /// Calendar date and time
    Date(DateTime<Utc>),

    /// Array of values (homogeneous or heterogeneous)
    Array(Vec<Value>),

    /// Object with string keys
    Object(HashMap<String, Value>),
}

/// Largest integer a float can represent without losing precision.
const MAX_SAFE_INTEGER: f64 = 9_007_199_254_740_991.0;

impl Value {
    /// Builds a numeric value, preferring an integer when `n` is whole.
    pub fn from_f64(n: f64) -> Value {
        if n.is_finite() && n.fract() == 0.0 && n.abs() <= MAX_SAFE_INTEGER {
            Value::Integer(n as i64)
        } else {
            Value::Float(n)
        }
    }

    /// The `1`/`0` form of a boolean result.
    pub fn from_bool(b: bool) -> Value {
        Value::Integer(i64::from(b))
    }

    /// Returns a human-readable type name
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Absent => "absent",
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::String(_) => "string",
            Value::Date(_) => "date",
            Value::Array(_) => "array",
            Value::Object(_) => "object",
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Value::Absent)
    }

    /// Check if the value is truthy (for conditions)
    ///
    /// Zero, NaN, the empty string, null, false, and absent are falsy. Every
    /// array, object, and date is truthy, including empty ones.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Absent | Value::Null => false,
            Value::Boolean(b) => *b,
            Value::Integer(n) => *n != 0,
            Value::Float(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Date(_) | Value::Array(_) | Value::Object(_) => true,
        }
    }

    /// Numeric view of the value.
    ///
    /// Strings are parsed (blank text counts as zero), booleans count as
    /// `0`/`1`, dates as milliseconds since the epoch. Anything that has no
    /// numeric reading yields NaN.
    pub fn to_number(&self) -> f64 {
        match self {
            Value::Null => 0.0,
            Value::Boolean(b) => f64::from(u8::from(*b)),
            Value::Integer(n) => *n as f64,
            Value::Float(n) => *n,
            Value::String(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    0.0
                } else {
                    trimmed.parse::<f64>().unwrap_or(f64::NAN)
                }
            }
            Value::Date(d) => d.timestamp_millis() as f64,
            Value::Absent | Value::Array(_) | Value::Object(_) => f64::NAN,
        }
    }

    /// Get as float, only for numbers
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(n) => Some(*n),
            _ => None,
        }
    }

    /// Text form used for concatenation, regex matching, and substring tests.
    pub fn as_string(&self) -> String {
        match self {
            Value::Absent => "undefined".to_string(),
            Value::Null => "null".to_string(),
            Value::Boolean(b) => b.to_string(),
            Value::Integer(n) => n.to_string(),
            Value::Float(n) if n.is_infinite() => {
                if *n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
            }
            Value::Float(n) if n.is_nan() => "NaN".to_string(),
            Value::Float(n) => n.to_string(),
            Value::String(s) => s.clone(),
            Value::Date(d) => d.to_rfc3339_opts(SecondsFormat::Millis, true),
            Value::Array(items) => items
                .iter()
                .map(|v| match v {
                    Value::Absent | Value::Null => String::new(),
                    other => other.as_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Value::Object(_) => "[object Object]".to_string(),
        }
    }

    /// Loose equality used by `==`, `!=`, and `in`.
    ///
    /// Absent and null equal each other. Values of different primitive kinds
    /// are compared numerically. Arrays and objects compare structurally.
    pub fn loose_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Absent | Null, Absent | Null) => true,
            (Absent | Null, _) | (_, Absent | Null) => false,
            (String(a), String(b)) => a == b,
            (Array(_) | Object(_), _) | (_, Array(_) | Object(_)) => self.strict_eq(other),
            (Date(a), Date(b)) => a == b,
            (a, b) => a.to_number() == b.to_number(),
        }
    }

    /// Strict equality used for array membership: no conversion between kinds,
    /// integers and floats compare by value, and NaN equals NaN.
    pub fn strict_eq(&self, other: &Value) -> bool {
        use Value::*;
        match (self, other) {
            (Integer(_) | Float(_), Integer(_) | Float(_)) => {
                let (a, b) = (self.to_number(), other.to_number());
                a == b || (a.is_nan() && b.is_nan())
            }
            (Array(a), Array(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.strict_eq(y))
            }
            (Object(a), Object(b)) => {
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).is_some_and(|w| v.strict_eq(w)))
            }
            (a, b) => a == b,
        }
    }

    /// Ordering used by `<`, `<=`, `>`, `>=`.
    ///
    /// Two strings compare lexicographically; everything else compares
    /// numerically. `None` when either side has no numeric reading.
    pub fn loose_cmp(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => self.to_number().partial_cmp(&other.to_number()),
        }
    }

    /// Converts the value to JSON. Absent becomes `null`, dates become
    /// RFC 3339 strings, non-finite floats become `null`.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Absent | Value::Null => serde_json::Value::Null,
            Value::Boolean(b) => serde_json::Value::Bool(*b),
            Value::Integer(i) => serde_json::Value::Number((*i).into()),
            Value::Float(f) => serde_json::Number::from_f64(*f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Date(d) => {
                serde_json::Value::String(d.to_rfc3339_opts(SecondsFormat::Millis, true))
            }
            Value::Array(arr) => serde_json::Value::Array(arr.iter().map(Value::to_json).collect()),
            Value::Object(obj) => serde_json::Value::Object(
                obj.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Integer(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(arr) => Value::Array(arr.into_iter().map(Value::from).collect()),
            serde_json::Value::Object(obj) => {
                Value::Object(obj.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}

impl From<&Value> for serde_json::Value {
    fn from(v: &Value) -> Self {
        v.to_json()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}
