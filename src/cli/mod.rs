//! CLI support for object-query
//!
//! The command handlers live here rather than in the binary so that they can
//! be tested and embedded without going through argument parsing.

mod check;
mod query;

pub use check::{CheckOptions, CheckResult, execute_check};
pub use query::{QueryOptions, execute_query};

use std::io;

use thiserror::Error;

/// Errors that can occur during CLI operations
#[derive(Error, Debug)]
pub enum CliError {
    #[error("Parse error: {0}")]
    Parse(#[from] crate::ParseError),

    #[error("Evaluation error: {0}")]
    Eval(#[from] crate::EvalError),

    #[error("Query error: {0}")]
    Query(#[from] crate::QueryError),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Invalid log filter '{0}'")]
    LogFilter(String),
}

/// Parses the JSON input, or an empty record when there is none.
pub fn read_record(input: Option<&str>) -> Result<crate::Value, CliError> {
    let json = match input {
        Some(text) if !text.trim().is_empty() => serde_json::from_str(text)?,
        _ => serde_json::Value::Object(serde_json::Map::new()),
    };
    Ok(crate::Value::from(json))
}

/// Serializes a result for printing.
pub fn render(value: &crate::Value, pretty: bool) -> Result<String, CliError> {
    let json = value.to_json();
    let text = if pretty {
        serde_json::to_string_pretty(&json)?
    } else {
        serde_json::to_string(&json)?
    };
    Ok(text)
}
