use regex::Regex;
use thiserror::Error;

use crate::{
    ast::{BinOp, Fragment, Pattern, Token, UnaryOp},
    grammar::{Grammar, precedence},
    lexer::{LexError, Lexer},
    resolver::PropertyPath,
};

/// Errors raised while compiling an expression. No evaluator is produced.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    /// No lexical rule matched
    #[error(transparent)]
    Lex(#[from] LexError),

    /// The grammar admits no reduction with this token
    #[error("Unexpected {found} at position {position}, expected {expected}")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },
}

/// Operator-precedence parser that assembles [`Fragment`]s while it reads
/// tokens.
pub struct Parser<'a> {
    lexer: Lexer<'a>,
    grammar: &'a Grammar,
    current_token: Token,
    current_start: usize,
    peeked: Option<(Token, usize)>,
}

impl<'a> Parser<'a> {
    pub fn new(mut lexer: Lexer<'a>) -> Result<Self, ParseError> {
        let current_token = lexer.next_token()?;
        let current_start = lexer.token_start();
        let grammar = lexer.grammar();
        Ok(Parser {
            lexer,
            grammar,
            current_token,
            current_start,
            peeked: None,
        })
    }

    /// Moves to the next token and returns the one that was current.
    fn advance(&mut self) -> Result<Token, ParseError> {
        let (next, start) = match self.peeked.take() {
            Some(peeked) => peeked,
            None => {
                let token = self.lexer.next_token()?;
                (token, self.lexer.token_start())
            }
        };
        self.current_start = start;
        Ok(std::mem::replace(&mut self.current_token, next))
    }

    /// The token after the current one.
    fn peek(&mut self) -> Result<&Token, ParseError> {
        let peeked = match self.peeked.take() {
            Some(peeked) => peeked,
            None => {
                let token = self.lexer.next_token()?;
                (token, self.lexer.token_start())
            }
        };
        Ok(&self.peeked.insert(peeked).0)
    }

    fn check(&self, token: &Token) -> bool {
        std::mem::discriminant(&self.current_token) == std::mem::discriminant(token)
    }

    fn expect(&mut self, expected: Token) -> Result<(), ParseError> {
        if !self.check(&expected) {
            return Err(self.unexpected(&expected.describe()));
        }
        self.advance()?;
        Ok(())
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.to_string(),
            found: self.current_token.describe(),
            position: self.current_start,
        }
    }

    /// Parses a complete expression, which must span the whole input.
    pub fn parse(&mut self) -> Result<Fragment, ParseError> {
        let fragment = self.parse_expression(precedence::TERNARY)?;
        self.expect(Token::Eof)?;
        Ok(fragment)
    }

    /// Parses an expression whose infix operators all bind at least as
    /// tightly as `min_prec`.
    pub fn parse_expression(&mut self, min_prec: u8) -> Result<Fragment, ParseError> {
        let mut left = self.parse_prefix()?;

        loop {
            let next = if self.check(&Token::Not) {
                Some(self.peek()?.clone())
            } else {
                None
            };
            let Some(prec) = self.grammar.infix_precedence(&self.current_token, next.as_ref())
            else {
                break;
            };
            if prec < min_prec {
                break;
            }
            left = self.parse_infix(left, prec)?;
        }

        Ok(left)
    }

    /// Literals, property lookups, calls, parentheses, and prefix operators.
    fn parse_prefix(&mut self) -> Result<Fragment, ParseError> {
        if !self.starts_expression() {
            return Err(self.unexpected("an expression"));
        }

        match self.advance()? {
            Token::Integer(n) => Ok(Fragment::Integer(n)),
            Token::Float(n) => Ok(Fragment::Float(n)),
            Token::String(s) => Ok(Fragment::String(s)),

            Token::Symbol(name) if self.check(&Token::LParen) => {
                self.advance()?;
                let args = if self.check(&Token::RParen) {
                    self.advance()?;
                    Vec::new()
                } else {
                    self.parse_list()?
                };
                Ok(Fragment::Call { name, args })
            }
            Token::Symbol(path) => Ok(Fragment::Property(PropertyPath::parse(&path))),

            // `( e )` groups, `( e, e, ... )` is an array literal
            Token::LParen => {
                let mut items = self.parse_list()?;
                if items.len() == 1 {
                    Ok(items.remove(0))
                } else {
                    Ok(Fragment::Array(items))
                }
            }

            Token::Minus => {
                let operand = self.parse_expression(precedence::UNARY_MINUS)?;
                Ok(Fragment::Unary {
                    op: UnaryOp::Negate,
                    operand: Box::new(operand),
                })
            }
            Token::Not => {
                let operand = self.parse_expression(precedence::NOT)?;
                Ok(Fragment::Unary {
                    op: UnaryOp::Not,
                    operand: Box::new(operand),
                })
            }

            _ => unreachable!("starts_expression admitted a non-prefix token"),
        }
    }

    fn starts_expression(&self) -> bool {
        matches!(
            self.current_token,
            Token::Integer(_)
                | Token::Float(_)
                | Token::String(_)
                | Token::Symbol(_)
                | Token::LParen
                | Token::Minus
                | Token::Not
        )
    }

    /// Parses the operator at the current token with `left` as its left
    /// operand.
    fn parse_infix(&mut self, left: Fragment, prec: u8) -> Result<Fragment, ParseError> {
        let left = Box::new(left);

        let op = match self.advance()? {
            Token::Question => {
                let then_branch = self.parse_expression(precedence::TERNARY)?;
                self.expect(Token::Colon)?;
                let else_branch = self.parse_expression(prec + 1)?;
                return Ok(Fragment::Conditional {
                    condition: left,
                    then_branch: Box::new(then_branch),
                    else_branch: Box::new(else_branch),
                });
            }
            Token::In => return self.parse_in_set(left, false),
            Token::Has => return self.parse_has(left, prec, false),
            Token::Not => {
                return match self.advance()? {
                    Token::In => self.parse_in_set(left, true),
                    Token::Has => self.parse_has(left, prec, true),
                    _ => unreachable!("infix 'not' is always followed by 'in' or 'has'"),
                };
            }
            Token::Match => {
                let right = self.parse_expression(prec + 1)?;
                return Ok(Fragment::Match {
                    subject: left,
                    pattern: pattern_of(right),
                });
            }
            Token::Or => BinOp::Or,
            Token::And => BinOp::And,
            Token::EqEq => BinOp::Equal,
            Token::NotEq => BinOp::NotEqual,
            Token::Lt => BinOp::LessThan,
            Token::LtEq => BinOp::LessEqual,
            Token::Gt => BinOp::GreaterThan,
            Token::GtEq => BinOp::GreaterEqual,
            Token::Plus => BinOp::Add,
            Token::Minus => BinOp::Subtract,
            Token::Star => BinOp::Multiply,
            Token::Slash => BinOp::Divide,
            Token::Percent => BinOp::Modulo,
            Token::Caret => BinOp::Power,
            token => unreachable!("{:?} has no infix precedence", token),
        };

        let right = self.parse_expression(prec + 1)?;
        Ok(Fragment::Binary {
            op,
            left,
            right: Box::new(right),
        })
    }

    fn parse_in_set(&mut self, needle: Box<Fragment>, negated: bool) -> Result<Fragment, ParseError> {
        self.expect(Token::LParen)?;
        let set = self.parse_list()?;
        Ok(Fragment::InSet {
            needle,
            set,
            negated,
        })
    }

    fn parse_has(
        &mut self,
        collection: Box<Fragment>,
        prec: u8,
        negated: bool,
    ) -> Result<Fragment, ParseError> {
        let item = self.parse_expression(prec + 1)?;
        Ok(Fragment::Has {
            collection,
            item: Box::new(item),
            negated,
        })
    }

    /// Comma-separated expressions up to and including the closing `)`.
    /// The opening `(` has already been consumed.
    fn parse_list(&mut self) -> Result<Vec<Fragment>, ParseError> {
        let mut items = vec![self.parse_expression(precedence::TERNARY)?];

        while self.check(&Token::Comma) {
            self.advance()?;
            items.push(self.parse_expression(precedence::TERNARY)?);
        }

        self.expect(Token::RParen)?;
        Ok(items)
    }
}

/// A string literal pattern is compiled up front; an invalid one, like any
/// other operand, is left for evaluation to compile and report.
fn pattern_of(right: Fragment) -> Pattern {
    if let Fragment::String(source) = &right
        && let Ok(regex) = Regex::new(source)
    {
        return Pattern::Compiled(regex);
    }
    Pattern::Dynamic(Box::new(right))
}
