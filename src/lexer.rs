use thiserror::Error;

use crate::ast::Token;
use crate::grammar::{Action, Grammar};

/// No lexical rule matched the input at `position`.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Unexpected input at position {position}: {found:?}")]
pub struct LexError {
    /// Byte offset into the expression
    pub position: usize,
    /// The unmatched text, cut at a short prefix
    pub found: String,
}

pub struct Lexer<'a> {
    grammar: &'a Grammar,
    input: &'a str,
    position: usize,
    token_start: usize,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input` using the shared grammar.
    pub fn new(input: &'a str) -> Self {
        Lexer::with_grammar(Grammar::shared(), input)
    }

    pub fn with_grammar(grammar: &'a Grammar, input: &'a str) -> Self {
        Lexer {
            grammar,
            input,
            position: 0,
            token_start: 0,
        }
    }

    /// Byte offset of the next unread character.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Byte offset where the most recently scanned token starts.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    /// Scans the next token. Once the input is exhausted every call returns
    /// `Token::Eof`.
    pub fn next_token(&mut self) -> Result<Token, LexError> {
        let grammar = self.grammar;
        let input = self.input;

        loop {
            let rest = &input[self.position..];

            let (len, action) = grammar
                .rules()
                .iter()
                .find_map(|rule| rule.match_len(rest).map(|len| (len, rule.action())))
                .ok_or_else(|| LexError {
                    position: self.position,
                    found: rest.chars().take(16).collect(),
                })?;

            let text = &rest[..len];
            let start = self.position;
            self.position += len;
            self.token_start = start;

            return Ok(match action {
                Action::Skip => continue,
                Action::Emit(token) => token.clone(),
                Action::End => Token::Eof,
                Action::String => Token::String(text[1..text.len() - 1].to_string()),
                Action::Symbol => Token::Symbol(text.to_string()),
                Action::Number => read_number(text).ok_or_else(|| LexError {
                    position: start,
                    found: text.to_string(),
                })?,
            });
        }
    }

    /// Scans the whole input, `Token::Eof` included.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token == Token::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }
}

fn read_number(text: &str) -> Option<Token> {
    if text.contains('.') {
        text.parse::<f64>().ok().map(Token::Float)
    } else {
        match text.parse::<i64>() {
            Ok(n) => Some(Token::Integer(n)),
            // Too large for an integer, keep it as a float
            Err(_) => text.parse::<f64>().ok().map(Token::Float),
        }
    }
}

#[test]
fn test_keywords() {
    let mut lexer = Lexer::new("and or not in has");
    assert_eq!(lexer.next_token().unwrap(), Token::And);
    assert_eq!(lexer.next_token().unwrap(), Token::Or);
    assert_eq!(lexer.next_token().unwrap(), Token::Not);
    assert_eq!(lexer.next_token().unwrap(), Token::In);
    assert_eq!(lexer.next_token().unwrap(), Token::Has);
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}

#[test]
fn test_membership() {
    let mut lexer = Lexer::new("score not in (60,100)");
    assert_eq!(lexer.next_token().unwrap(), Token::Symbol("score".to_string()));
    assert_eq!(lexer.next_token().unwrap(), Token::Not);
    assert_eq!(lexer.next_token().unwrap(), Token::In);
    assert_eq!(lexer.next_token().unwrap(), Token::LParen);
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(60));
    assert_eq!(lexer.next_token().unwrap(), Token::Comma);
    assert_eq!(lexer.next_token().unwrap(), Token::Integer(100));
    assert_eq!(lexer.next_token().unwrap(), Token::RParen);
    assert_eq!(lexer.next_token().unwrap(), Token::Eof);
}
