//! Lexer for boolean query strings
//!
//! Words are separated by whitespace. Parentheses are tokens of their own
//! even when attached to a word, so `(cats` lexes as `(` then `cats`.
//! Operators are the reserved uppercase words `AND`, `OR` and `NOT`; any
//! other casing is an ordinary term.

use crate::error::BlockdexError;
use crate::Result;

/// Token types for query string parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// A raw, not yet normalized word
    Term(String),
    /// AND operator
    And,
    /// OR operator
    Or,
    /// NOT operator
    Not,
    /// Left parenthesis (grouping)
    LeftParen,
    /// Right parenthesis (grouping)
    RightParen,
}

/// Lexer for tokenizing query strings
pub struct Lexer {
    input: Vec<char>,
    position: usize,
}

impl Lexer {
    /// Create a new lexer for the given input string
    pub fn new(input: &str) -> Self {
        Self {
            input: input.chars().collect(),
            position: 0,
        }
    }

    /// Get the next token, or `None` at end of input
    pub fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();

        if self.position >= self.input.len() {
            return Ok(None);
        }

        let ch = self.current_char();
        match ch {
            '(' => {
                self.advance();
                Ok(Some(Token::LeftParen))
            }
            ')' => {
                self.advance();
                Ok(Some(Token::RightParen))
            }
            _ if Self::is_term_char(ch) => Ok(Some(self.read_word())),
            _ => Err(BlockdexError::QueryParse(format!(
                "Unexpected character at position {}: '{}'",
                self.position, ch
            ))),
        }
    }

    /// Lex the whole input
    pub fn tokenize(mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn read_word(&mut self) -> Token {
        let mut word = String::new();

        while self.position < self.input.len() {
            let ch = self.current_char();
            if Self::is_term_char(ch) {
                word.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match word.as_str() {
            "AND" => Token::And,
            "OR" => Token::Or,
            "NOT" => Token::Not,
            _ => Token::Term(word),
        }
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while self.position < self.input.len() && self.current_char().is_whitespace() {
            self.advance();
        }
    }

    /// Check if a character can be part of a term
    fn is_term_char(ch: char) -> bool {
        ch.is_alphanumeric() || ch == '_' || ch == '-' || ch == '.' || ch == '\''
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex(input: &str) -> Vec<Token> {
        Lexer::new(input).tokenize().unwrap()
    }

    fn term(s: &str) -> Token {
        Token::Term(s.to_string())
    }

    #[test]
    fn test_simple_term() {
        let mut lexer = Lexer::new("hello");
        assert_eq!(lexer.next_token().unwrap(), Some(term("hello")));
        assert_eq!(lexer.next_token().unwrap(), None);
    }

    #[test]
    fn test_boolean_operators() {
        assert_eq!(
            lex("a AND b OR c NOT d"),
            vec![
                term("a"),
                Token::And,
                term("b"),
                Token::Or,
                term("c"),
                Token::Not,
                term("d"),
            ]
        );
    }

    #[test]
    fn test_lowercase_operators_are_terms() {
        assert_eq!(lex("a and b"), vec![term("a"), term("and"), term("b")]);
    }

    #[test]
    fn test_grouping_attached_to_words() {
        assert_eq!(
            lex("(a OR b) AND c"),
            vec![
                Token::LeftParen,
                term("a"),
                Token::Or,
                term("b"),
                Token::RightParen,
                Token::And,
                term("c"),
            ]
        );
        assert_eq!(
            lex("((x))"),
            vec![
                Token::LeftParen,
                Token::LeftParen,
                term("x"),
                Token::RightParen,
                Token::RightParen,
            ]
        );
    }

    #[test]
    fn test_whitespace_variants() {
        assert_eq!(lex("  a\tAND   b  "), vec![term("a"), Token::And, term("b")]);
        assert!(lex("   ").is_empty());
    }

    #[test]
    fn test_unrecognized_character() {
        assert!(Lexer::new("a & b").tokenize().is_err());
        assert!(Lexer::new("\"quoted\"").tokenize().is_err());
        assert!(Lexer::new("title:rust").tokenize().is_err());
    }

    #[test]
    fn test_word_punctuation_kept() {
        assert_eq!(lex("o'neil e-mail"), vec![term("o'neil"), term("e-mail")]);
    }
}
