//! Chained queries over a record or an array of records.
//!
//! ```
//! use object_query::ObjectQuery;
//! use serde_json::json;
//!
//! let items = json!([
//!     {"id": 5, "type": "foo", "checked": false},
//!     {"id": 6, "type": "bar", "checked": true},
//!     {"id": 3, "type": "bar", "checked": true},
//! ]);
//!
//! let result = ObjectQuery::from(items)
//!     .filter("id >= 3 and checked")
//!     .unwrap()
//!     .select("id, type")
//!     .unwrap()
//!     .order_by("id")
//!     .unwrap()
//!     .collect();
//!
//! assert_eq!(
//!     result.to_json(),
//!     json!([{"id": 3, "type": "bar"}, {"id": 6, "type": "bar"}])
//! );
//! ```

use std::cmp::Ordering;
use std::collections::HashMap;

use thiserror::Error;
use tracing::debug;

use crate::{
    compiler::ExpressionCompiler,
    evaluator::EvalError,
    parser::ParseError,
    resolver::PropertyPath,
    value::Value,
};

/// Errors raised by [`ObjectQuery`] operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum QueryError {
    #[error("Compile error: {0}")]
    Compile(#[from] ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// The operation does not apply to the current value
    #[error("Unsupported operation: {0}")]
    Unsupported(String),
}

/// A value being queried, plus the compiler used for its expressions.
#[derive(Debug, Clone)]
pub struct ObjectQuery {
    source: Value,
    compiler: ExpressionCompiler,
}

impl Default for ObjectQuery {
    fn default() -> Self {
        ObjectQuery::from(Value::Object(HashMap::new()))
    }
}

impl From<Value> for ObjectQuery {
    fn from(source: Value) -> Self {
        ObjectQuery {
            source,
            compiler: ExpressionCompiler::new(),
        }
    }
}

impl From<serde_json::Value> for ObjectQuery {
    fn from(source: serde_json::Value) -> Self {
        ObjectQuery::from(Value::from(source))
    }
}

impl ObjectQuery {
    /// A query over an empty record, handy for evaluating constant
    /// expressions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles later expressions with `compiler` (extra functions, custom
    /// resolver).
    pub fn with_compiler(mut self, compiler: ExpressionCompiler) -> Self {
        self.compiler = compiler;
        self
    }

    /// On an array, keeps the items for which `expression` holds. On any
    /// other value, replaces it with the expression's result.
    pub fn filter(self, expression: &str) -> Result<Self, QueryError> {
        let compiled = self.compiler.compile(expression)?;

        let source = match self.source {
            Value::Array(items) => {
                let before = items.len();
                let mut kept = Vec::with_capacity(before);
                for item in items {
                    if selects(&compiled.evaluate(&item)?) {
                        kept.push(item);
                    }
                }
                debug!(expression, before, after = kept.len(), "filtered array");
                Value::Array(kept)
            }
            other => compiled.evaluate(&other)?,
        };

        Ok(ObjectQuery { source, ..self })
    }

    /// Keeps only the listed top-level fields, e.g. `"id, name"`. Fields the
    /// object lacks are left out.
    ///
    /// Applies to an object or an array of objects.
    pub fn select(self, names: &str) -> Result<Self, QueryError> {
        let names = split_names(names);

        let source = match self.source {
            Value::Array(items) if items.is_empty() => Value::Array(items),
            Value::Array(items) => Value::Array(
                items
                    .into_iter()
                    .map(|item| compose(item, &names))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            other @ Value::Object(_) => compose(other, &names)?,
            other => {
                return Err(QueryError::Unsupported(format!(
                    "select() needs an object or an array of objects, got {}",
                    other.type_name()
                )));
            }
        };

        Ok(ObjectQuery { source, ..self })
    }

    /// Sorts an array by comma-separated property paths, each optionally
    /// followed by `ASC` or `DESC`, e.g. `"type, id DESC"`. The sort is
    /// stable.
    pub fn order_by(self, order: &str) -> Result<Self, QueryError> {
        let mut items = match self.source {
            Value::Array(items) => items,
            other => {
                return Err(QueryError::Unsupported(format!(
                    "order_by() needs an array, got {}",
                    other.type_name()
                )));
            }
        };

        let keys = parse_order(order);
        items.sort_by(|a, b| {
            keys.iter()
                .map(|key| key.compare(a, b))
                .find(|ordering| ordering.is_ne())
                .unwrap_or(Ordering::Equal)
        });
        debug!(order, keys = keys.len(), "sorted array");

        Ok(ObjectQuery {
            source: Value::Array(items),
            ..self
        })
    }

    /// The current value.
    pub fn collect(self) -> Value {
        self.source
    }
}

/// Whether an expression result keeps an array item: `true`, a non-zero
/// number, or non-empty text.
fn selects(result: &Value) -> bool {
    match result {
        Value::Boolean(b) => *b,
        Value::Integer(n) => *n != 0,
        Value::Float(n) => *n != 0.0 && !n.is_nan(),
        Value::String(s) => !s.is_empty(),
        _ => false,
    }
}

fn split_names(names: &str) -> Vec<&str> {
    names
        .split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .collect()
}

fn compose(item: Value, names: &[&str]) -> Result<Value, QueryError> {
    match item {
        Value::Object(mut fields) => Ok(Value::Object(
            names
                .iter()
                .filter_map(|name| fields.remove_entry(*name))
                .collect(),
        )),
        other => Err(QueryError::Unsupported(format!(
            "select() needs objects, found {}",
            other.type_name()
        ))),
    }
}

#[derive(Debug)]
struct SortKey {
    path: PropertyPath,
    descending: bool,
}

impl SortKey {
    fn compare(&self, a: &Value, b: &Value) -> Ordering {
        let a = self.path.walk(a).unwrap_or(&Value::Absent);
        let b = self.path.walk(b).unwrap_or(&Value::Absent);
        let ordering = sort_order(a, b);
        if self.descending { ordering.reverse() } else { ordering }
    }
}

fn parse_order(order: &str) -> Vec<SortKey> {
    split_names(order)
        .into_iter()
        .map(|key| {
            let mut words = key.split_whitespace().collect::<Vec<_>>();
            let descending = match words.last() {
                Some(word) if word.eq_ignore_ascii_case("desc") => {
                    words.pop();
                    true
                }
                Some(word) if word.eq_ignore_ascii_case("asc") => {
                    words.pop();
                    false
                }
                _ => false,
            };
            SortKey {
                path: PropertyPath::parse(&words.join(" ")),
                descending,
            }
        })
        .collect()
}

/// Absent, then null, booleans, numbers and dates, strings, and finally
/// arrays and objects, which all tie.
fn sort_order(a: &Value, b: &Value) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Absent => 0,
            Value::Null => 1,
            Value::Boolean(_) => 2,
            Value::Integer(_) | Value::Float(_) | Value::Date(_) => 3,
            Value::String(_) => 4,
            Value::Array(_) | Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ if rank(a) == 3 && rank(b) == 3 => a
            .to_number()
            .partial_cmp(&b.to_number())
            .unwrap_or(Ordering::Equal),
        _ => rank(a).cmp(&rank(b)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn filter_on_a_record_yields_the_result() {
        let result = ObjectQuery::new().filter("1 + 2 * 3").unwrap().collect();
        assert_eq!(result, Value::Integer(7));
    }

    #[test]
    fn select_skips_missing_fields() {
        let result = ObjectQuery::from(json!({"id": 123, "name": "foo"}))
            .select("id, checked")
            .unwrap()
            .collect();
        assert_eq!(result.to_json(), json!({"id": 123}));
    }

    #[test]
    fn select_rejects_scalars() {
        let err = ObjectQuery::from(json!(3)).select("id").unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
    }

    #[test]
    fn order_by_rejects_non_arrays() {
        let err = ObjectQuery::from(json!({"id": 1})).order_by("id").unwrap_err();
        assert!(matches!(err, QueryError::Unsupported(_)));
    }

    #[test]
    fn missing_keys_sort_first() {
        let result = ObjectQuery::from(json!([{"n": "b"}, {"n": 1}, {}, {"n": null}, {"n": true}]))
            .order_by("n")
            .unwrap()
            .collect();
        assert_eq!(
            result.to_json(),
            json!([{}, {"n": null}, {"n": true}, {"n": 1}, {"n": "b"}])
        );
    }
}
