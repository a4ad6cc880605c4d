use regex::Regex;

use crate::ast::{BinOp, UnaryOp};
use crate::resolver::PropertyPath;

/// A compiled piece of an expression.
///
/// The parser assembles fragments directly while it reduces tokens, so the
/// top-level fragment it returns is the whole compiled program. Evaluation
/// walks this tree against a record.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    // Literals
    /// Integer literal
    ///
    /// # Example
    /// ```text
    /// 42
    /// ```
    Integer(i64),

    /// Number literal with a fractional part
    Float(f64),

    /// String literal
    ///
    /// # Example
    /// ```text
    /// "shenzhen"
    /// ```
    String(String),

    /// Array literal, two or more elements
    ///
    /// # Example
    /// ```text
    /// (2, 3, 4)
    /// ```
    Array(Vec<Fragment>),

    // Access
    /// Property lookup against the record
    ///
    /// # Examples
    /// ```text
    /// city
    /// user.addr.city
    /// 'hello-world'.count
    /// ```
    Property(PropertyPath),

    // Operations
    /// Prefix operation
    Unary {
        op: UnaryOp,
        operand: Box<Fragment>,
    },

    /// Binary operation (arithmetic, comparison, logical)
    Binary {
        op: BinOp,
        left: Box<Fragment>,
        right: Box<Fragment>,
    },

    /// Regex match (`~=`)
    ///
    /// # Example
    /// ```text
    /// name ~= "^fo+"
    /// ```
    Match {
        subject: Box<Fragment>,
        pattern: Pattern,
    },

    /// Membership through the `has` function (`has`, `not has`)
    ///
    /// # Examples
    /// ```text
    /// tags has "red"
    /// tags not has "blue"
    /// ```
    Has {
        collection: Box<Fragment>,
        item: Box<Fragment>,
        negated: bool,
    },

    /// Set membership (`in`, `not in`), a linear scan of loose equality tests
    ///
    /// # Examples
    /// ```text
    /// score in (60, 100)
    /// type not in ("foo", "bar")
    /// ```
    InSet {
        needle: Box<Fragment>,
        set: Vec<Fragment>,
        negated: bool,
    },

    /// Ternary selection
    ///
    /// # Example
    /// ```text
    /// checked ? 1 : 0
    /// ```
    Conditional {
        condition: Box<Fragment>,
        then_branch: Box<Fragment>,
        else_branch: Box<Fragment>,
    },

    /// Function call, resolved by name when evaluated
    ///
    /// # Examples
    /// ```text
    /// date()
    /// days(created, "2021-1-1")
    /// ```
    Call { name: String, args: Vec<Fragment> },
}

/// Right-hand side of `~=`.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// A string literal pattern, compiled once alongside the expression
    Compiled(Regex),
    /// Any other operand; its text is compiled each time it is evaluated
    Dynamic(Box<Fragment>),
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Pattern::Compiled(a), Pattern::Compiled(b)) => a.as_str() == b.as_str(),
            (Pattern::Dynamic(a), Pattern::Dynamic(b)) => a == b,
            _ => false,
        }
    }
}
