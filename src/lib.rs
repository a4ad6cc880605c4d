pub mod ast;
pub mod compiler;
pub mod evaluator;
pub mod functions;
pub mod grammar;
pub mod lexer;
pub mod parser;
pub mod query;
pub mod resolver;
pub mod value;

#[cfg(feature = "cli")]
pub mod cli;

pub use ast::{BinOp, Fragment, Pattern, Token, UnaryOp};
pub use compiler::{CompiledExpression, ExpressionCompiler, compile_expression};
pub use evaluator::{EvalError, Evaluator};
pub use functions::{Arity, Function, FunctionTable};
pub use grammar::Grammar;
pub use lexer::{LexError, Lexer};
pub use parser::{ParseError, Parser};
pub use query::{ObjectQuery, QueryError};
pub use resolver::{FieldGetter, PropertyPath, Resolver};
pub use value::Value;
