//! Property lookup: turning a symbol such as `user.addr.city` into a value of
//! the record.
//!
//! Lookups never fail. A path that cannot be followed yields
//! [`Value::Absent`], so an expression keeps working over records that are
//! only partially populated.

use std::fmt;
use std::sync::Arc;

use crate::value::Value;

/// A parsed property path.
///
/// Segments are separated by dots. A segment wrapped in single quotes may
/// contain any character, dots included; a doubled quote inside it stands for
/// one quote.
///
/// # Examples
/// - `user.addr.city` → `["user", "addr", "city"]`
/// - `'a.b'.c` → `["a.b", "c"]`
/// - `'it''s'` → `["it's"]`
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyPath {
    text: String,
    segments: Vec<String>,
}

impl PropertyPath {
    /// Splits symbol text into segments. Any text is accepted; an unclosed
    /// quote runs to the end of the input.
    pub fn parse(text: &str) -> PropertyPath {
        let mut segments = Vec::new();
        let mut current = String::new();
        let mut quoted = false;
        let mut chars = text.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '\'' if quoted => {
                    if chars.peek() == Some(&'\'') {
                        chars.next();
                        current.push('\'');
                    } else {
                        quoted = false;
                    }
                }
                '\'' if current.is_empty() => quoted = true,
                '.' if !quoted => segments.push(std::mem::take(&mut current)),
                c => current.push(c),
            }
        }
        segments.push(current);

        PropertyPath {
            text: text.to_string(),
            segments,
        }
    }

    /// The symbol text as written in the expression, quotes included.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Follows the path from `record` with the default rules.
    ///
    /// Objects are navigated by key, arrays by a segment that parses as an
    /// index. Anything else ends the walk.
    pub fn walk<'v>(&self, record: &'v Value) -> Option<&'v Value> {
        self.segments
            .iter()
            .try_fold(record, |current, segment| match current {
                Value::Object(map) => map.get(segment),
                Value::Array(items) => segment
                    .parse::<usize>()
                    .ok()
                    .and_then(|index| items.get(index)),
                _ => None,
            })
    }
}

impl fmt::Display for PropertyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Reads top-level fields of a record without failing.
///
/// Handed to custom resolvers so they can fall back to plain field access.
#[derive(Debug, Clone, Copy)]
pub struct FieldGetter<'a> {
    record: &'a Value,
}

impl<'a> FieldGetter<'a> {
    pub fn new(record: &'a Value) -> Self {
        FieldGetter { record }
    }

    /// The field `name` of the record, or absent when the record is not an
    /// object or has no such field.
    pub fn get(&self, name: &str) -> Value {
        match self.record {
            Value::Object(map) => map.get(name).cloned().unwrap_or(Value::Absent),
            _ => Value::Absent,
        }
    }
}

/// Signature of a caller-supplied resolver: the path text as written, a safe
/// getter over the record, and the record itself.
pub type ResolveFn = dyn Fn(&str, &FieldGetter<'_>, &Value) -> Value + Send + Sync;

/// Strategy used to resolve property paths.
#[derive(Clone, Default)]
pub enum Resolver {
    /// Walk nested objects and arrays segment by segment
    #[default]
    PathWalker,
    /// Hand every lookup to a caller-supplied function
    Custom(Arc<ResolveFn>),
}

impl Resolver {
    pub fn custom<F>(f: F) -> Self
    where
        F: Fn(&str, &FieldGetter<'_>, &Value) -> Value + Send + Sync + 'static,
    {
        Resolver::Custom(Arc::new(f))
    }

    /// Looks `path` up in `record`. Boolean results become `1`/`0` whichever
    /// strategy produced them.
    pub fn resolve(&self, path: &PropertyPath, record: &Value) -> Value {
        let value = match self {
            Resolver::PathWalker => path.walk(record).cloned().unwrap_or(Value::Absent),
            Resolver::Custom(f) => f(path.text(), &FieldGetter::new(record), record),
        };
        coerce_boolean(value)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::PathWalker => f.write_str("PathWalker"),
            Resolver::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

/// `true`/`false` become `1`/`0`; every other value passes through.
pub fn coerce_boolean(value: Value) -> Value {
    match value {
        Value::Boolean(b) => Value::from_bool(b),
        other => other,
    }
}
