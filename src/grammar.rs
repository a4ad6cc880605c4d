//! The expression grammar: an ordered table of lexical rules plus the operator
//! precedence table.
//!
//! Compiling the rule patterns is the expensive part of getting a parser, so
//! the grammar is built once per process and shared by reference with every
//! lexer and parser. It holds no functions or resolvers, only syntax.

use std::sync::OnceLock;
use std::sync::atomic::{AtomicUsize, Ordering};

use regex::Regex;
use tracing::debug;

use crate::ast::Token;

/// What the lexer does with the text a rule matched.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Produce a fixed token
    Emit(Token),
    /// Drop the text (whitespace)
    Skip,
    /// Produce `Token::Integer` or `Token::Float`
    Number,
    /// Produce `Token::Symbol` with the literal text
    Symbol,
    /// Produce `Token::String` with the text between the quotes
    String,
    /// Produce `Token::Eof`
    End,
}

/// Lexical rules in the order they are tried. The first rule that matches at
/// the current offset wins, so keywords must come before symbols.
const RULES: &[(&str, Action)] = &[
    (r"\*", Action::Emit(Token::Star)),
    (r"/", Action::Emit(Token::Slash)),
    (r"-", Action::Emit(Token::Minus)),
    (r"\+", Action::Emit(Token::Plus)),
    (r"\^", Action::Emit(Token::Caret)),
    (r"%", Action::Emit(Token::Percent)),
    (r"\(", Action::Emit(Token::LParen)),
    (r"\)", Action::Emit(Token::RParen)),
    (r",", Action::Emit(Token::Comma)),
    (r"==", Action::Emit(Token::EqEq)),
    (r"!=", Action::Emit(Token::NotEq)),
    (r"~=", Action::Emit(Token::Match)),
    (r">=", Action::Emit(Token::GtEq)),
    (r"<=", Action::Emit(Token::LtEq)),
    (r"<", Action::Emit(Token::Lt)),
    (r">", Action::Emit(Token::Gt)),
    (r"\?", Action::Emit(Token::Question)),
    (r":", Action::Emit(Token::Colon)),
    (r"and\b", Action::Emit(Token::And)),
    (r"or\b", Action::Emit(Token::Or)),
    (r"not\b", Action::Emit(Token::Not)),
    (r"in\b", Action::Emit(Token::In)),
    (r"has\b", Action::Emit(Token::Has)),
    (r"\s+", Action::Skip),
    (r"[0-9]+(?:\.[0-9]+)?\b", Action::Number),
    (r"(?:'(?:''|[^'])*'|\w+)(?:\.(?:'(?:''|[^'])*'|\w+))*", Action::Symbol),
    (r#""[^"]*""#, Action::String),
    (r"$", Action::End),
];

/// A compiled lexical rule.
#[derive(Debug)]
pub struct LexRule {
    pattern: Regex,
    action: Action,
}

impl LexRule {
    /// Length of the match at the start of `input`, if the rule applies.
    pub fn match_len(&self, input: &str) -> Option<usize> {
        self.pattern.find(input).map(|m| m.end())
    }

    pub fn action(&self) -> &Action {
        &self.action
    }
}

/// Precedence levels, loosest first.
pub mod precedence {
    pub const TERNARY: u8 = 0;
    pub const OR: u8 = 1;
    pub const AND: u8 = 2;
    pub const IN: u8 = 3;
    pub const HAS: u8 = 4;
    pub const EQUALITY: u8 = 5;
    pub const RELATIONAL: u8 = 6;
    pub const ADDITIVE: u8 = 7;
    pub const MULTIPLICATIVE: u8 = 8;
    pub const POWER: u8 = 9;
    pub const NOT: u8 = 10;
    pub const UNARY_MINUS: u8 = 11;
}

static BUILDS: AtomicUsize = AtomicUsize::new(0);

/// The lexical rule table and precedence table of the language.
#[derive(Debug)]
pub struct Grammar {
    rules: Vec<LexRule>,
}

impl Grammar {
    /// The process-wide grammar, built on first use.
    pub fn shared() -> &'static Grammar {
        static GRAMMAR: OnceLock<Grammar> = OnceLock::new();
        GRAMMAR.get_or_init(Grammar::build)
    }

    /// Number of times a grammar has been built in this process.
    pub fn build_count() -> usize {
        BUILDS.load(Ordering::SeqCst)
    }

    fn build() -> Grammar {
        let rules = RULES
            .iter()
            .map(|(pattern, action)| LexRule {
                pattern: Regex::new(&format!("^(?:{pattern})")).unwrap(),
                action: action.clone(),
            })
            .collect::<Vec<_>>();

        BUILDS.fetch_add(1, Ordering::SeqCst);
        debug!(rules = rules.len(), "built expression grammar");

        Grammar { rules }
    }

    pub fn rules(&self) -> &[LexRule] {
        &self.rules
    }

    /// Binding precedence of a token in infix position.
    ///
    /// `not` only appears in infix position as the start of `not in` or
    /// `not has`, so it reports the precedence of the operator it introduces;
    /// the parser checks which one follows.
    pub fn infix_precedence(&self, token: &Token, next: Option<&Token>) -> Option<u8> {
        use precedence::*;
        let prec = match token {
            Token::Question => TERNARY,
            Token::Or => OR,
            Token::And => AND,
            Token::In => IN,
            Token::Has => HAS,
            Token::Not => match next {
                Some(Token::In) => IN,
                Some(Token::Has) => HAS,
                _ => return None,
            },
            Token::EqEq | Token::NotEq | Token::Match => EQUALITY,
            Token::Lt | Token::LtEq | Token::Gt | Token::GtEq => RELATIONAL,
            Token::Plus | Token::Minus => ADDITIVE,
            Token::Star | Token::Slash | Token::Percent => MULTIPLICATIVE,
            Token::Caret => POWER,
            _ => return None,
        };
        Some(prec)
    }
}
