use regex::Regex;
use rust_decimal::{Decimal, prelude::FromPrimitive, prelude::ToPrimitive};
use thiserror::Error;
use tracing::trace;

use crate::{
    ast::{BinOp, Fragment, Pattern, UnaryOp},
    functions::FunctionTable,
    resolver::Resolver,
    value::Value,
};

/// Errors that can occur while evaluating a compiled expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EvalError {
    /// A call named a function missing from the table
    #[error("Unknown function: {0}()")]
    UnknownFunction(String),

    /// Type mismatch or invalid operation for the given type
    #[error("Type error: {0}")]
    TypeError(String),

    /// Wrong number of arguments
    #[error("{name}() takes {expected} arguments, got {got}")]
    Arity {
        name: String,
        expected: String,
        got: usize,
    },

    /// The right operand of `~=` is not a valid regular expression
    #[error("Invalid pattern {pattern:?}: {message}")]
    InvalidPattern { pattern: String, message: String },

    /// Text or number that cannot be read as a date
    #[error("Invalid date: {0}")]
    InvalidDate(String),

    /// Raised by a caller-supplied function
    #[error("{0}")]
    Custom(String),
}

/// Walks a compiled [`Fragment`] tree against one record.
///
/// The evaluator borrows everything it needs, so it is created per call and
/// costs nothing to build.
#[derive(Debug, Clone, Copy)]
pub struct Evaluator<'a> {
    functions: &'a FunctionTable,
    resolver: &'a Resolver,
}

impl<'a> Evaluator<'a> {
    pub fn new(functions: &'a FunctionTable, resolver: &'a Resolver) -> Self {
        Evaluator {
            functions,
            resolver,
        }
    }

    /// Evaluates `fragment` with `record` as the source of property lookups.
    pub fn evaluate(&self, fragment: &Fragment, record: &Value) -> Result<Value, EvalError> {
        let result = self.eval(fragment, record);
        trace!(?result, "evaluated expression");
        result
    }

    fn eval(&self, fragment: &Fragment, record: &Value) -> Result<Value, EvalError> {
        match fragment {
            Fragment::Integer(n) => Ok(Value::Integer(*n)),
            Fragment::Float(n) => Ok(Value::Float(*n)),
            Fragment::String(s) => Ok(Value::String(s.clone())),
            Fragment::Array(items) => items
                .iter()
                .map(|item| self.eval(item, record))
                .collect::<Result<Vec<_>, _>>()
                .map(Value::Array),
            Fragment::Property(path) => Ok(self.resolver.resolve(path, record)),

            Fragment::Unary { op, operand } => {
                let value = self.eval(operand, record)?;
                match op {
                    UnaryOp::Not => Ok(Value::from_bool(!value.is_truthy())),
                    UnaryOp::Negate => negate(&value),
                }
            }

            // `and`/`or` only look at the right operand when it decides the result
            Fragment::Binary {
                op: BinOp::And,
                left,
                right,
            } => {
                let result =
                    self.eval(left, record)?.is_truthy() && self.eval(right, record)?.is_truthy();
                Ok(Value::from_bool(result))
            }
            Fragment::Binary {
                op: BinOp::Or,
                left,
                right,
            } => {
                let result =
                    self.eval(left, record)?.is_truthy() || self.eval(right, record)?.is_truthy();
                Ok(Value::from_bool(result))
            }
            Fragment::Binary { op, left, right } => {
                let left = self.eval(left, record)?;
                let right = self.eval(right, record)?;
                apply_binop(*op, &left, &right)
            }

            Fragment::Match { subject, pattern } => {
                let text = self.eval(subject, record)?.as_string();
                let matched = match pattern {
                    Pattern::Compiled(regex) => regex.is_match(&text),
                    Pattern::Dynamic(source) => {
                        let source = self.eval(source, record)?.as_string();
                        let regex = Regex::new(&source).map_err(|e| EvalError::InvalidPattern {
                            pattern: source.clone(),
                            message: e.to_string(),
                        })?;
                        regex.is_match(&text)
                    }
                };
                Ok(Value::from_bool(matched))
            }

            Fragment::Has {
                collection,
                item,
                negated,
            } => {
                let args = [self.eval(collection, record)?, self.eval(item, record)?];
                let found = self.call("has", &args)?.is_truthy();
                Ok(Value::from_bool(found != *negated))
            }

            Fragment::InSet {
                needle,
                set,
                negated,
            } => {
                let needle = self.eval(needle, record)?;
                let mut found = false;
                for candidate in set {
                    if needle.loose_eq(&self.eval(candidate, record)?) {
                        found = true;
                        break;
                    }
                }
                Ok(Value::from_bool(found != *negated))
            }

            Fragment::Conditional {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, record)?.is_truthy() {
                    self.eval(then_branch, record)
                } else {
                    self.eval(else_branch, record)
                }
            }

            Fragment::Call { name, args } => {
                let args = args
                    .iter()
                    .map(|arg| self.eval(arg, record))
                    .collect::<Result<Vec<_>, _>>()?;
                self.call(name, &args)
            }
        }
    }

    /// Looks `name` up in the table at the moment of the call.
    fn call(&self, name: &str, args: &[Value]) -> Result<Value, EvalError> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| EvalError::UnknownFunction(name.to_string()))?;
        trace!(function = name, args = args.len(), "calling function");
        function.call(name, args)
    }
}

fn negate(value: &Value) -> Result<Value, EvalError> {
    match value {
        Value::Integer(n) => Ok(n
            .checked_neg()
            .map(Value::Integer)
            .unwrap_or_else(|| Value::Float(-(*n as f64)))),
        Value::Array(_) | Value::Object(_) => Err(EvalError::TypeError(format!(
            "Cannot negate {}",
            value.type_name()
        ))),
        other => Ok(Value::from_f64(-other.to_number())),
    }
}

fn apply_binop(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    match op {
        BinOp::Equal => Ok(Value::from_bool(left.loose_eq(right))),
        BinOp::NotEqual => Ok(Value::from_bool(!left.loose_eq(right))),
        BinOp::LessThan => Ok(Value::from_bool(left.loose_cmp(right).is_some_and(|o| o.is_lt()))),
        BinOp::LessEqual => Ok(Value::from_bool(left.loose_cmp(right).is_some_and(|o| o.is_le()))),
        BinOp::GreaterThan => {
            Ok(Value::from_bool(left.loose_cmp(right).is_some_and(|o| o.is_gt())))
        }
        BinOp::GreaterEqual => {
            Ok(Value::from_bool(left.loose_cmp(right).is_some_and(|o| o.is_ge())))
        }
        BinOp::And => Ok(Value::from_bool(left.is_truthy() && right.is_truthy())),
        BinOp::Or => Ok(Value::from_bool(left.is_truthy() || right.is_truthy())),
        BinOp::Add if is_text(left) || is_text(right) => Ok(Value::String(format!(
            "{}{}",
            left.as_string(),
            right.as_string()
        ))),
        BinOp::Add
        | BinOp::Subtract
        | BinOp::Multiply
        | BinOp::Divide
        | BinOp::Modulo
        | BinOp::Power => arithmetic(op, left, right),
    }
}

fn is_text(value: &Value) -> bool {
    matches!(value, Value::String(_))
}

/// Numeric operators.
///
/// Two integers stay integers while the result is exact. An integer mixed
/// with a float goes through `Decimal` so that a whole result comes back as
/// an integer. Everything else is plain `f64` arithmetic, where division by
/// zero gives an infinity and non-numeric operands give NaN.
fn arithmetic(op: BinOp, left: &Value, right: &Value) -> Result<Value, EvalError> {
    if let (Value::Array(_) | Value::Object(_), _) | (_, Value::Array(_) | Value::Object(_)) =
        (left, right)
    {
        return Err(EvalError::TypeError(format!(
            "Cannot apply {} to {} and {}",
            op.symbol(),
            left.type_name(),
            right.type_name()
        )));
    }

    match (left, right) {
        (Value::Integer(a), Value::Integer(b)) => {
            if let Some(r) = integer_op(op, *a, *b) {
                return Ok(Value::Integer(r));
            }
        }
        (Value::Integer(a), Value::Float(b)) => {
            if let Some(ad) = Decimal::from_i64(*a)
                && let Some(bd) = Decimal::from_f64(*b)
                && let Some(r) = decimal_op(op, ad, bd)
            {
                return Ok(r);
            }
        }
        (Value::Float(a), Value::Integer(b)) => {
            if let Some(ad) = Decimal::from_f64(*a)
                && let Some(bd) = Decimal::from_i64(*b)
                && let Some(r) = decimal_op(op, ad, bd)
            {
                return Ok(r);
            }
        }
        _ => {}
    }

    let (a, b) = (left.to_number(), right.to_number());
    let result = match op {
        BinOp::Add => a + b,
        BinOp::Subtract => a - b,
        BinOp::Multiply => a * b,
        BinOp::Divide => a / b,
        BinOp::Modulo => a % b,
        BinOp::Power => a.powf(b),
        _ => unreachable!("{:?} is not arithmetic", op),
    };
    Ok(Value::from_f64(result))
}

/// Exact integer result, or `None` when it overflows or is fractional.
fn integer_op(op: BinOp, a: i64, b: i64) -> Option<i64> {
    match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide if b != 0 && a.checked_rem(b) == Some(0) => a.checked_div(b),
        BinOp::Modulo if b != 0 => a.checked_rem(b),
        BinOp::Power => u32::try_from(b).ok().and_then(|exp| a.checked_pow(exp)),
        _ => None,
    }
}

/// Mixed integer/float result computed in decimal, `None` when decimal
/// arithmetic cannot represent it.
fn decimal_op(op: BinOp, a: Decimal, b: Decimal) -> Option<Value> {
    let rd = match op {
        BinOp::Add => a.checked_add(b),
        BinOp::Subtract => a.checked_sub(b),
        BinOp::Multiply => a.checked_mul(b),
        BinOp::Divide => a.checked_div(b),
        BinOp::Modulo => a.checked_rem(b),
        _ => None,
    }?;
    if rd.is_integer()
        && let Some(r) = rd.to_i64()
    {
        return Some(Value::Integer(r));
    }
    rd.to_f64().map(Value::Float)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use serde_json::json;

    fn eval(input: &str, record: serde_json::Value) -> Result<Value, EvalError> {
        let mut parser = Parser::new(Lexer::new(input)).unwrap();
        let program = parser.parse().unwrap();
        let functions = FunctionTable::builtins();
        let resolver = Resolver::default();
        Evaluator::new(&functions, &resolver).evaluate(&program, &Value::from(record))
    }

    #[test]
    fn integer_arithmetic_stays_integral() {
        assert_eq!(eval("7 / 2", json!({})).unwrap(), Value::Float(3.5));
        assert_eq!(eval("8 / 2", json!({})).unwrap(), Value::Integer(4));
        assert_eq!(eval("-7 % 3", json!({})).unwrap(), Value::Integer(-1));
        assert_eq!(eval("2 ^ 10", json!({})).unwrap(), Value::Integer(1024));
        assert_eq!(eval("2 ^ -1", json!({})).unwrap(), Value::Float(0.5));
    }

    #[test]
    fn mixed_arithmetic_is_exact_when_whole() {
        assert_eq!(eval("1.5 + 1.5", json!({})).unwrap(), Value::Integer(3));
        assert_eq!(eval("0.5 * 4", json!({})).unwrap(), Value::Integer(2));
        assert_eq!(eval("2 + 0.25", json!({})).unwrap(), Value::Float(2.25));
    }

    #[test]
    fn division_by_zero_is_not_an_error() {
        assert_eq!(eval("1 / 0", json!({})).unwrap(), Value::Float(f64::INFINITY));
        match eval("0 / 0", json!({})).unwrap() {
            Value::Float(n) => assert!(n.is_nan()),
            other => panic!("expected NaN, got {:?}", other),
        }
    }

    #[test]
    fn plus_concatenates_text() {
        assert_eq!(eval(r#""a" + 1"#, json!({})).unwrap(), Value::from("a1"));
        assert_eq!(eval(r#"1 + "a""#, json!({})).unwrap(), Value::from("1a"));
    }

    #[test]
    fn arithmetic_on_collections_is_a_type_error() {
        let err = eval("tags * 2", json!({"tags": [1, 2]})).unwrap_err();
        assert!(matches!(err, EvalError::TypeError(_)));
    }

    #[test]
    fn and_short_circuits() {
        assert_eq!(eval("0 and nope()", json!({})).unwrap(), Value::Integer(0));
        assert_eq!(eval("1 or nope()", json!({})).unwrap(), Value::Integer(1));
        assert!(eval("1 and nope()", json!({})).is_err());
    }

    #[test]
    fn dynamic_pattern_errors_surface_at_evaluation() {
        let err = eval("name ~= pat", json!({"name": "x", "pat": "("})).unwrap_err();
        assert!(matches!(err, EvalError::InvalidPattern { .. }));
        assert_eq!(
            eval("name ~= pat", json!({"name": "foo", "pat": "^f"})).unwrap(),
            Value::Integer(1)
        );
    }
}
