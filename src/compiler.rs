//! Compiling expression text into reusable evaluators.
//!
//! ```
//! use object_query::{compile_expression, Value};
//! use serde_json::json;
//!
//! let expr = compile_expression("price * qty > 100").unwrap();
//! let record = Value::from(json!({"price": 30, "qty": 4}));
//! assert_eq!(expr.evaluate(&record).unwrap(), Value::Integer(1));
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::{
    ast::Fragment,
    evaluator::{EvalError, Evaluator},
    functions::{Function, FunctionTable},
    lexer::Lexer,
    parser::{ParseError, Parser},
    resolver::{FieldGetter, Resolver},
    value::Value,
};

/// Compiles `text` with the builtin functions and the default resolver.
pub fn compile_expression(text: &str) -> Result<CompiledExpression, ParseError> {
    ExpressionCompiler::new().compile(text)
}

/// Options applied to every expression compiled with it.
///
/// Extra functions are merged over the builtins; a name that is already
/// defined replaces the builtin, including `has`, which the `has` operator
/// calls too.
#[derive(Debug, Clone, Default)]
pub struct ExpressionCompiler {
    extra_functions: FunctionTable,
    resolver: Resolver,
}

impl ExpressionCompiler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_function(mut self, name: impl Into<String>, function: Function) -> Self {
        self.extra_functions.insert(name, function);
        self
    }

    pub fn with_functions(mut self, functions: FunctionTable) -> Self {
        self.extra_functions = self.extra_functions.merged(&functions);
        self
    }

    pub fn with_resolver(mut self, resolver: Resolver) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces property lookup with `f(path_text, getter, record)`.
    pub fn with_custom_resolver<F>(self, f: F) -> Self
    where
        F: Fn(&str, &FieldGetter<'_>, &Value) -> Value + Send + Sync + 'static,
    {
        self.with_resolver(Resolver::custom(f))
    }

    /// Parses `text` into a fresh evaluator. Nothing is shared with earlier
    /// compilations except the grammar.
    pub fn compile(&self, text: &str) -> Result<CompiledExpression, ParseError> {
        let functions = FunctionTable::builtins().merged(&self.extra_functions);
        let mut parser = Parser::new(Lexer::new(text))?;
        let program = parser.parse()?;

        debug!(
            expression = text,
            functions = functions.len(),
            "compiled expression"
        );

        Ok(CompiledExpression {
            program: Arc::new(program),
            functions: Arc::new(functions),
            resolver: self.resolver.clone(),
        })
    }
}

/// A compiled expression, ready to be evaluated against any number of
/// records. Cloning is cheap and clones share the compiled program.
#[derive(Debug, Clone)]
pub struct CompiledExpression {
    program: Arc<Fragment>,
    functions: Arc<FunctionTable>,
    resolver: Resolver,
}

impl CompiledExpression {
    /// Evaluates the expression against `record`.
    pub fn evaluate(&self, record: &Value) -> Result<Value, EvalError> {
        Evaluator::new(&self.functions, &self.resolver).evaluate(&self.program, record)
    }

    /// The compiled fragment tree.
    pub fn program(&self) -> &Fragment {
        &self.program
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    /// Turns the expression into a plain closure.
    pub fn into_fn(self) -> impl Fn(&Value) -> Result<Value, EvalError> + Send + Sync + 'static {
        move |record: &Value| self.evaluate(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiled_expressions_are_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledExpression>();
    }

    #[test]
    fn syntax_errors_fail_compilation() {
        assert!(compile_expression("1 +").is_err());
        assert!(compile_expression("(1, 2").is_err());
        assert!(compile_expression("a # b").is_err());
    }

    #[test]
    fn extra_functions_override_builtins() {
        let compiler = ExpressionCompiler::new()
            .with_function("abs", Function::fixed(1, |_| Ok(Value::Integer(42))));
        let expr = compiler.compile("abs(-1)").unwrap();
        assert_eq!(expr.evaluate(&Value::Null).unwrap(), Value::Integer(42));
        assert!(expr.functions().contains("sqrt"));
    }
}
