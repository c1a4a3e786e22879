//! Shunting-yard conversion of infix boolean queries to postfix
//!
//! Precedence, highest first: `NOT`, `AND`, `OR`. `NOT` is a right
//! associative prefix operator, `AND` and `OR` are left associative, and
//! parentheses override precedence.
//!
//! `AND` only pops operators of higher or equal precedence (`NOT`, `AND`)
//! before it is pushed, and then stays on the stack until something of
//! lower or equal precedence, a `)`, or the end of input pops it. Popping
//! it straight back off would break precedence against a following `OR`.

use std::fmt;

use super::lexer::{Lexer, Token};
use crate::error::BlockdexError;
use crate::tokenizer::Normalizer;
use crate::Result;

/// Postfix query token
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryToken {
    /// A normalized term
    Term(String),
    And,
    Or,
    Not,
}

impl fmt::Display for QueryToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryToken::Term(term) => write!(f, "{}", term),
            QueryToken::And => write!(f, "AND"),
            QueryToken::Or => write!(f, "OR"),
            QueryToken::Not => write!(f, "NOT"),
        }
    }
}

/// Render a postfix sequence, space separated
pub fn format_postfix(tokens: &[QueryToken]) -> String {
    tokens
        .iter()
        .map(|t| t.to_string())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Operators held on the shunting-yard stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StackOp {
    And,
    Or,
    Not,
    LeftParen,
}

impl StackOp {
    fn into_token(self) -> Option<QueryToken> {
        match self {
            StackOp::And => Some(QueryToken::And),
            StackOp::Or => Some(QueryToken::Or),
            StackOp::Not => Some(QueryToken::Not),
            StackOp::LeftParen => None,
        }
    }
}

/// Parser for boolean query strings
pub struct QueryParser<'a> {
    normalizer: &'a dyn Normalizer,
}

impl<'a> QueryParser<'a> {
    /// Create a parser that normalizes terms with `normalizer`
    pub fn new(normalizer: &'a dyn Normalizer) -> Self {
        Self { normalizer }
    }

    /// Parse an infix query into postfix tokens
    pub fn parse(&self, query: &str) -> Result<Vec<QueryToken>> {
        let tokens = Lexer::new(query).tokenize()?;

        let mut output = Vec::with_capacity(tokens.len());
        let mut stack: Vec<StackOp> = Vec::new();
        // True when the next token must start an operand
        let mut expect_operand = true;

        for token in tokens {
            match token {
                Token::Term(word) => {
                    output.push(QueryToken::Term(self.normalize(&word)?));
                    expect_operand = false;
                }
                Token::LeftParen => {
                    stack.push(StackOp::LeftParen);
                    expect_operand = true;
                }
                Token::Not => {
                    stack.push(StackOp::Not);
                    expect_operand = true;
                }
                Token::RightParen => {
                    if expect_operand {
                        return Err(BlockdexError::QueryParse(
                            "expected an operand before ')'".to_string(),
                        ));
                    }
                    loop {
                        match stack.pop() {
                            Some(StackOp::LeftParen) => break,
                            Some(op) => output.extend(op.into_token()),
                            None => {
                                return Err(BlockdexError::QueryParse(
                                    "unbalanced parentheses: unmatched ')'".to_string(),
                                ))
                            }
                        }
                    }
                }
                Token::And => {
                    if expect_operand {
                        return Err(missing_operand("AND"));
                    }
                    pop_while(&mut stack, &mut output, |op| {
                        matches!(op, StackOp::Not | StackOp::And)
                    });
                    stack.push(StackOp::And);
                    expect_operand = true;
                }
                Token::Or => {
                    if expect_operand {
                        return Err(missing_operand("OR"));
                    }
                    pop_while(&mut stack, &mut output, |op| {
                        matches!(op, StackOp::Not | StackOp::And | StackOp::Or)
                    });
                    stack.push(StackOp::Or);
                    expect_operand = true;
                }
            }
        }

        if expect_operand && !(output.is_empty() && stack.is_empty()) {
            return Err(BlockdexError::QueryParse(
                "query ends where an operand was expected".to_string(),
            ));
        }

        while let Some(op) = stack.pop() {
            match op.into_token() {
                Some(token) => output.push(token),
                None => {
                    return Err(BlockdexError::QueryParse(
                        "unbalanced parentheses: unmatched '('".to_string(),
                    ))
                }
            }
        }

        Ok(output)
    }

    /// Query terms go through the single-token path of the normalizer.
    /// A word that yields no term (e.g. a number) is kept case-folded; it
    /// cannot be in the dictionary and so resolves to no documents. A word
    /// that documents would split into several terms (`e-mail`) is
    /// rejected, since no single dictionary entry can match it.
    fn normalize(&self, word: &str) -> Result<String> {
        let pieces = self.normalizer.normalize(word);
        if pieces.len() > 1 {
            return Err(BlockdexError::QueryParse(format!(
                "'{}' splits into the terms {}; join them with AND",
                word,
                pieces.join(", ")
            )));
        }
        Ok(self
            .normalizer
            .normalize_term(word)
            .unwrap_or_else(|| word.to_lowercase()))
    }
}

fn pop_while<F>(stack: &mut Vec<StackOp>, output: &mut Vec<QueryToken>, pred: F)
where
    F: Fn(StackOp) -> bool,
{
    while let Some(&top) = stack.last() {
        if !pred(top) {
            break;
        }
        stack.pop();
        output.extend(top.into_token());
    }
}

fn missing_operand(op: &str) -> BlockdexError {
    BlockdexError::QueryParse(format!("{} is missing its left operand", op))
}
