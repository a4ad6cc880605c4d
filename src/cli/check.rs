//! Evaluate or syntax-check a single expression

use super::{CliError, read_record};
use crate::compile_expression;

/// Options for the `eval` and `check` commands
#[derive(Debug, Clone, Default)]
pub struct CheckOptions {
    /// The expression to compile
    pub expression: String,
    /// JSON record to evaluate against
    pub input: Option<String>,
    /// Only validate syntax, don't evaluate
    pub syntax_only: bool,
}

/// Result of a check operation
#[derive(Debug)]
pub enum CheckResult {
    /// The expression compiled
    SyntaxValid,
    /// The expression was evaluated against the record
    Success(crate::Value),
}

pub fn execute_check(options: &CheckOptions) -> Result<CheckResult, CliError> {
    let compiled = compile_expression(&options.expression)?;

    if options.syntax_only {
        return Ok(CheckResult::SyntaxValid);
    }

    let record = read_record(options.input.as_deref())?;
    let result = compiled.evaluate(&record)?;
    Ok(CheckResult::Success(result))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Value;

    #[test]
    fn evaluates_against_input() {
        let options = CheckOptions {
            expression: "user.age >= 18".to_string(),
            input: Some(r#"{"user": {"age": 21}}"#.to_string()),
            syntax_only: false,
        };
        match execute_check(&options).unwrap() {
            CheckResult::Success(value) => assert_eq!(value, Value::Integer(1)),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn syntax_only_skips_evaluation() {
        let options = CheckOptions {
            expression: "missing_function(1)".to_string(),
            input: None,
            syntax_only: true,
        };
        assert!(matches!(
            execute_check(&options).unwrap(),
            CheckResult::SyntaxValid
        ));
    }

    #[test]
    fn bad_json_is_reported() {
        let options = CheckOptions {
            expression: "1".to_string(),
            input: Some("{".to_string()),
            syntax_only: false,
        };
        assert!(matches!(execute_check(&options), Err(CliError::Json(_))));
    }
}
