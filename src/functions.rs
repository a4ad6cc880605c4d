//! Function table: the builtin functions and the ones a caller adds.
//!
//! Calls are resolved by name when they are evaluated, never when the
//! expression is compiled. Arity and operand types are checked by each call,
//! and a mismatch surfaces as an [`EvalError`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};

use crate::evaluator::EvalError;
use crate::value::Value;

/// A native function callable from expressions.
pub type NativeFn = dyn Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync;

/// Number of arguments a function accepts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Arity {
    /// Exactly `n` arguments.
    Fixed(usize),
    /// Between `min` and `max` arguments, inclusive.
    Range(usize, usize),
    /// Any number of arguments.
    Variadic,
}

impl Arity {
    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Fixed(n) => count == n,
            Arity::Range(min, max) => (min..=max).contains(&count),
            Arity::Variadic => true,
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Fixed(n) => write!(f, "{}", n),
            Arity::Range(min, max) => write!(f, "{} to {}", min, max),
            Arity::Variadic => f.write_str("any number of"),
        }
    }
}

/// A named entry of a [`FunctionTable`].
#[derive(Clone)]
pub struct Function {
    arity: Arity,
    body: Arc<NativeFn>,
}

impl Function {
    pub fn new<F>(arity: Arity, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Function {
            arity,
            body: Arc::new(body),
        }
    }

    /// A function taking exactly `n` arguments.
    pub fn fixed<F>(n: usize, body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Function::new(Arity::Fixed(n), body)
    }

    /// A function taking any number of arguments.
    pub fn variadic<F>(body: F) -> Self
    where
        F: Fn(&[Value]) -> Result<Value, EvalError> + Send + Sync + 'static,
    {
        Function::new(Arity::Variadic, body)
    }

    pub fn arity(&self) -> Arity {
        self.arity
    }

    /// Checks the argument count, then runs the function.
    pub fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        if !self.arity.accepts(args.len()) {
            return Err(EvalError::Arity {
                name: name.to_string(),
                expected: self.arity.to_string(),
                got: args.len(),
            });
        }
        (self.body)(args)
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Function").field("arity", &self.arity).finish()
    }
}

/// Map of function name -> definition.
#[derive(Debug, Clone, Default)]
pub struct FunctionTable {
    functions: HashMap<String, Function>,
}

impl FunctionTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The default functions every expression can call.
    pub fn builtins() -> Self {
        let mut table = FunctionTable::new();
        table.insert("abs", Function::fixed(1, abs));
        table.insert("ln", math(f64::ln));
        table.insert("exp", math(f64::exp));
        table.insert("log10", math(f64::log10));
        table.insert("sqrt", math(f64::sqrt));
        table.insert("round", math(round_half_up));
        table.insert("max", Function::variadic(|args| Ok(extremum(args, true))));
        table.insert("min", Function::variadic(|args| Ok(extremum(args, false))));
        table.insert("maxof", Function::fixed(1, |args| array_extremum("maxof", &args[0], true)));
        table.insert("minof", Function::fixed(1, |args| array_extremum("minof", &args[0], false)));
        table.insert("has", Function::fixed(2, |args| has(&args[0], &args[1]).map(Value::Boolean)));
        table.insert("count", Function::fixed(1, count));
        table.insert("date", Function::new(Arity::Range(0, 1), date));
        table.insert("days", Function::new(Arity::Range(0, 2), days));
        table
    }

    /// Adds or replaces a function, returning the one it replaced.
    pub fn insert(&mut self, name: impl Into<String>, function: Function) -> Option<Function> {
        self.functions.insert(name.into(), function)
    }

    pub fn get(&self, name: &str) -> Option<&Function> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// This table with every entry of `extra` added; `extra` wins on name
    /// clashes.
    pub fn merged(mut self, extra: &FunctionTable) -> Self {
        for (name, function) in &extra.functions {
            self.functions.insert(name.clone(), function.clone());
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.functions.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

fn math(f: fn(f64) -> f64) -> Function {
    Function::fixed(1, move |args| Ok(Value::from_f64(f(args[0].to_number()))))
}

fn abs(args: &[Value]) -> Result<Value, EvalError> {
    Ok(match &args[0] {
        Value::Integer(n) => n
            .checked_abs()
            .map(Value::Integer)
            .unwrap_or_else(|| Value::Float((*n as f64).abs())),
        other => Value::from_f64(other.to_number().abs()),
    })
}

/// Rounds to the nearest integer, halves toward positive infinity.
pub(crate) fn round_half_up(n: f64) -> f64 {
    (n + 0.5).floor()
}

fn extremum(values: &[Value], max: bool) -> Value {
    let mut best = if max { f64::NEG_INFINITY } else { f64::INFINITY };
    for value in values {
        let n = value.to_number();
        if n.is_nan() {
            return Value::Float(f64::NAN);
        }
        if (max && n > best) || (!max && n < best) {
            best = n;
        }
    }
    Value::from_f64(best)
}

fn array_extremum(name: &str, value: &Value, max: bool) -> Result<Value, EvalError> {
    match value {
        Value::Array(items) => Ok(extremum(items, max)),
        other => Err(EvalError::TypeError(format!(
            "{}() requires an array, got {}",
            name,
            other.type_name()
        ))),
    }
}

/// Membership test behind both `has()` and the `has` operator.
///
/// Arrays are searched with strict equality, strings for a substring. An
/// absent or null collection contains nothing.
pub fn has(collection: &Value, item: &Value) -> Result<bool, EvalError> {
    match collection {
        Value::Absent | Value::Null => Ok(false),
        Value::Array(items) => Ok(items.iter().any(|v| v.strict_eq(item))),
        Value::String(s) => Ok(s.contains(item.as_string().as_str())),
        other => Err(EvalError::TypeError(format!(
            "has() requires an array or string, got {}",
            other.type_name()
        ))),
    }
}

fn count(args: &[Value]) -> Result<Value, EvalError> {
    match &args[0] {
        Value::Absent => Ok(Value::Integer(0)),
        Value::Array(items) => Ok(Value::Integer(items.len() as i64)),
        Value::String(s) => Ok(Value::Integer(s.chars().count() as i64)),
        other => Err(EvalError::TypeError(format!(
            "count() requires an array or string, got {}",
            other.type_name()
        ))),
    }
}

fn date(args: &[Value]) -> Result<Value, EvalError> {
    to_date(args.first()).map(Value::Date)
}

fn days(args: &[Value]) -> Result<Value, EvalError> {
    let from = to_date(args.first())?;
    let to = to_date(args.get(1))?;
    let span = (to - from).num_milliseconds() as f64 / 86_400_000.0;
    Ok(Value::from_f64(round_half_up(span)))
}

/// Reads a date the way `date()` does: numbers are seconds since the epoch,
/// text is parsed, dates pass through, and anything else means now.
pub fn to_date(value: Option<&Value>) -> Result<DateTime<Utc>, EvalError> {
    match value {
        Some(Value::Date(d)) => Ok(*d),
        Some(Value::Integer(secs)) => secs
            .checked_mul(1000)
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .ok_or_else(|| EvalError::InvalidDate(secs.to_string())),
        Some(Value::Float(secs)) if secs.is_finite() => {
            DateTime::<Utc>::from_timestamp_millis((secs * 1000.0) as i64)
                .ok_or_else(|| EvalError::InvalidDate(secs.to_string()))
        }
        Some(Value::Float(secs)) => Err(EvalError::InvalidDate(secs.to_string())),
        Some(Value::String(text)) => {
            parse_date(text).ok_or_else(|| EvalError::InvalidDate(text.clone()))
        }
        _ => Ok(Utc::now()),
    }
}

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Parses RFC 3339 timestamps and the common `yyyy-M-d` family. Text without
/// an offset is read as UTC.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(text, fmt) {
            return Some(dt.and_utc());
        }
    }
    for fmt in DATE_FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(text, fmt) {
            return d.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
        }
    }
    None
}
