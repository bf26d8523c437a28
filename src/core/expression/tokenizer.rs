//! Formula tokenizer
//!
//! Converts an expression like "premium * (1 + loading_percent / 100) ** 2"
//! into a flat token sequence for the parser. Only the arithmetic alphabet is
//! accepted; anything else is a tokenize error.

use std::iter::Peekable;
use std::str::Chars;

/// A token in a formula expression
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// A numeric literal (e.g., 123, 45.67, .5, 1.5e10)
    Number(f64),
    /// A variable, constant or function name
    Identifier(String),
    /// Arithmetic operators: + - * / **
    Operator(String),
    /// Opening parenthesis
    OpenParen,
    /// Closing parenthesis
    CloseParen,
    /// Comma separator for function arguments
    Comma,
}

/// Error during tokenization
#[derive(Debug, Clone, PartialEq)]
pub struct TokenizeError {
    pub message: String,
    pub position: usize,
}

impl TokenizeError {
    fn new(message: impl Into<String>, position: usize) -> Self {
        Self {
            message: message.into(),
            position,
        }
    }
}

impl std::fmt::Display for TokenizeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Tokenize error at position {}: {}",
            self.position, self.message
        )
    }
}

impl std::error::Error for TokenizeError {}

/// Tokenizer for formula expressions
pub struct Tokenizer<'a> {
    chars: Peekable<Chars<'a>>,
    position: usize,
}

impl<'a> Tokenizer<'a> {
    /// Create a new tokenizer for an already rewritten expression
    pub fn new(expression: &'a str) -> Self {
        Self {
            chars: expression.chars().peekable(),
            position: 0,
        }
    }

    /// Tokenize the entire expression into a vector of tokens
    pub fn tokenize(mut self) -> Result<Vec<Token>, TokenizeError> {
        let mut tokens = Vec::new();

        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }

        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Token>, TokenizeError> {
        self.skip_whitespace();

        let Some(c) = self.peek() else {
            return Ok(None);
        };

        let token = match c {
            '(' => {
                self.advance();
                Token::OpenParen
            }
            ')' => {
                self.advance();
                Token::CloseParen
            }
            ',' => {
                self.advance();
                Token::Comma
            }
            '+' | '-' | '/' => {
                self.advance();
                Token::Operator(c.to_string())
            }
            '*' => {
                self.advance();
                if self.peek() == Some('*') {
                    self.advance();
                    Token::Operator("**".to_string())
                } else {
                    Token::Operator("*".to_string())
                }
            }
            c if c.is_ascii_digit() => self.read_number()?,
            '.' if self.next_is_digit() => self.read_number()?,
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),
            c => {
                return Err(TokenizeError::new(
                    format!("Unexpected character: '{}'", c),
                    self.position,
                ));
            }
        };

        Ok(Some(token))
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    /// Look one character past the current one
    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn next_is_digit(&self) -> bool {
        self.peek_second().is_some_and(|c| c.is_ascii_digit())
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars.next();
        if c.is_some() {
            self.position += 1;
        }
        c
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn push_digits(&mut self, buf: &mut String) {
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                buf.push(c);
                self.advance();
            } else {
                break;
            }
        }
    }

    /// Read a number (integer, decimal, or scientific notation)
    fn read_number(&mut self) -> Result<Token, TokenizeError> {
        let start_pos = self.position;
        let mut num_str = String::new();

        self.push_digits(&mut num_str);

        if self.peek() == Some('.') {
            num_str.push('.');
            self.advance();
            self.push_digits(&mut num_str);
        }

        // Exponent only when digits follow, so "2*e" style input is untouched
        if matches!(self.peek(), Some('e' | 'E')) {
            let mut ahead = self.chars.clone();
            ahead.next();
            let has_exponent = match ahead.next() {
                Some(d) if d.is_ascii_digit() => true,
                Some('+' | '-') => ahead.next().is_some_and(|d| d.is_ascii_digit()),
                _ => false,
            };
            if has_exponent {
                num_str.push('e');
                self.advance();
                if let Some(sign @ ('+' | '-')) = self.peek() {
                    num_str.push(sign);
                    self.advance();
                }
                self.push_digits(&mut num_str);
            }
        }

        num_str
            .parse::<f64>()
            .map(Token::Number)
            .map_err(|_| TokenizeError::new(format!("Invalid number: {}", num_str), start_pos))
    }

    /// Read an identifier: ASCII letters, digits and underscores
    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                ident.push(c);
                self.advance();
            } else {
                break;
            }
        }

        Token::Identifier(ident)
    }
}

/// Convenience function to tokenize an expression string
pub fn tokenize(expression: &str) -> Result<Vec<Token>, TokenizeError> {
    Tokenizer::new(expression).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(s: &str) -> Token {
        Token::Identifier(s.to_string())
    }

    fn op(s: &str) -> Token {
        Token::Operator(s.to_string())
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(tokenize("42").unwrap(), vec![Token::Number(42.0)]);
        assert_eq!(tokenize("3.567").unwrap(), vec![Token::Number(3.567)]);
        assert_eq!(tokenize(".5").unwrap(), vec![Token::Number(0.5)]);
        assert_eq!(tokenize("1.5e10").unwrap(), vec![Token::Number(1.5e10)]);
        assert_eq!(tokenize("2E-5").unwrap(), vec![Token::Number(2e-5)]);
    }

    #[test]
    fn test_tokenize_number_followed_by_e_identifier() {
        // "2e" is not an exponent without digits
        assert_eq!(
            tokenize("2e").unwrap(),
            vec![Token::Number(2.0), ident("e")]
        );
    }

    #[test]
    fn test_tokenize_power_operator() {
        assert_eq!(
            tokenize("a ** 2 * b").unwrap(),
            vec![
                ident("a"),
                op("**"),
                Token::Number(2.0),
                op("*"),
                ident("b")
            ]
        );
    }

    #[test]
    fn test_tokenize_function_call() {
        assert_eq!(
            tokenize("max(premium, 0)").unwrap(),
            vec![
                ident("max"),
                Token::OpenParen,
                ident("premium"),
                Token::Comma,
                Token::Number(0.0),
                Token::CloseParen,
            ]
        );
    }

    #[test]
    fn test_tokenize_identifier_with_digits() {
        assert_eq!(tokenize("rate_2024").unwrap(), vec![ident("rate_2024")]);
        assert_eq!(tokenize("_tmp").unwrap(), vec![ident("_tmp")]);
    }

    #[test]
    fn test_tokenize_empty() {
        assert_eq!(tokenize("").unwrap(), vec![]);
        assert_eq!(tokenize("   ").unwrap(), vec![]);
    }

    #[test]
    fn test_tokenize_rejects_foreign_characters() {
        let err = tokenize("premium; drop").unwrap_err();
        assert!(err.message.contains("Unexpected"));
        assert_eq!(err.position, 7);

        assert!(tokenize("__import__('os')").is_err());
        assert!(tokenize("a[0]").is_err());
        assert!(tokenize("prämie").is_err());
    }
}
