//! # Expression Language - Tokens and Fragments
//!
//! This module defines the lexical tokens and the compiled representation of
//! the expression language: a small language of arithmetic, comparison,
//! logical, ternary, set-membership, and property-path access over a record.
//!
//! ## Architecture Overview
//!
//! - **[tokens]** - Lexical tokens produced by the lexer
//! - **[fragment]** - Compiled fragments assembled by the parser
//! - **[operators]** - Binary and prefix operators
//!
//! ## Quick Start
//!
//! ```text
//! addr.city == "shenzhen" and score in (60, 100)
//! ```
//!
//! This expression evaluates to `1` for records living in Shenzhen whose score
//! is exactly 60 or 100, and to `0` otherwise.
//!
//! ## Core Concepts
//!
//! ### Property Paths
//!
//! A bare name reads a field of the record. Dots navigate into nested objects;
//! single quotes wrap a segment that contains characters the lexer would
//! otherwise split on:
//!
//! ```text
//! user.addr.city
//! 'Danube.Steamboat.Shipping.Company'.'the captain'.hat
//! ```
//!
//! A path that cannot be followed evaluates to absent instead of failing.
//!
//! ### Boolean Results
//!
//! Comparisons, `and`, `or`, `not`, `in`, `has`, and `~=` produce the numbers
//! `1` and `0` rather than booleans.
//!
//! ### Precedence
//!
//! From loosest to tightest, all left-associative:
//!
//! ```text
//! ?:   or   and   in   has   == != ~=   < <= > >=   + -   * / %   ^   not   unary -
//! ```
//!
//! ## Examples
//!
//! ```text
//! 1 + 2 * 3                  // 7
//! 3 not in (2, 3, 4)         // 0
//! numbers has 8              // 1 when the numbers array contains 8
//! days(created, date()) > 30 // older than a month
//! ```
pub mod fragment;
pub mod operators;
pub mod tokens;

pub use fragment::{Fragment, Pattern};
pub use operators::{BinOp, UnaryOp};
pub use tokens::Token;
