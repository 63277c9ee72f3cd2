//! Lexical analysis for formula text.
//!
//! The [`TokenReader`] turns a formula string into an ordered sequence of
//! [`Token`]s. Numeric literals are read through a [`Culture`], which selects
//! the decimal separator and the argument-list separator, so the same engine
//! can accept `max(1.5, 2)` and `max(1,5; 2)` depending on configuration.
//!
//! The reader performs no structural validation; a token sequence such as
//! `) + (` lexes fine and is rejected later by the AST builder.

use crate::Real;
use crate::error::{CalcError, Result};

/// Numeric formatting conventions used while lexing literals.
///
/// A culture selects the decimal separator and the function-argument
/// separator. The two built-in cultures cover the common pairings:
///
/// | Culture | Decimal | Arguments |
/// |---|---|---|
/// | [`Culture::invariant`] | `.` | `,` |
/// | [`Culture::comma_decimal`] | `,` | `;` |
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Culture {
    decimal_separator: char,
    argument_separator: char,
}

impl Culture {
    /// The invariant culture: `.` as decimal separator, `,` between arguments.
    pub const fn invariant() -> Self {
        Self {
            decimal_separator: '.',
            argument_separator: ',',
        }
    }

    /// Comma-decimal culture: `,` as decimal separator, `;` between arguments.
    pub const fn comma_decimal() -> Self {
        Self {
            decimal_separator: ',',
            argument_separator: ';',
        }
    }

    /// Builds a culture from explicit separators.
    ///
    /// The separators must differ from each other and must not collide with
    /// digits, identifier characters, operators, or brackets.
    pub fn custom(decimal_separator: char, argument_separator: char) -> Result<Self> {
        for sep in [decimal_separator, argument_separator] {
            if sep.is_ascii_alphanumeric()
                || sep == '_'
                || sep == '('
                || sep == ')'
                || OPERATION_CHARS.contains(sep)
                || sep.is_whitespace()
            {
                return Err(CalcError::Config {
                    message: format!("'{}' cannot be used as a separator", sep),
                });
            }
        }
        if decimal_separator == argument_separator {
            return Err(CalcError::Config {
                message: format!(
                    "decimal separator and argument separator are both '{}'",
                    decimal_separator
                ),
            });
        }
        Ok(Self {
            decimal_separator,
            argument_separator,
        })
    }

    /// The character separating the integral and fractional parts of a literal.
    pub fn decimal_separator(&self) -> char {
        self.decimal_separator
    }

    /// The character separating function arguments.
    pub fn argument_separator(&self) -> char {
        self.argument_separator
    }
}

impl Default for Culture {
    fn default() -> Self {
        Self::invariant()
    }
}

/// Classifies a token produced by the reader.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum TokenKind {
    /// A run of decimal digits not followed by the decimal separator.
    Integer,
    /// A literal with a fractional part and/or an exponent.
    FloatingPoint,
    /// A variable, function, or constant name (lowercased).
    Identifier,
    /// One of `+ - * / % ^`.
    Operation,
    /// `(`
    LeftBracket,
    /// `)`
    RightBracket,
    /// The culture-defined separator between function arguments.
    ArgumentSeparator,
}

/// A token produced by the reader.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// The lexeme as it appeared in the source, except identifiers, which are
    /// lowercased here so every downstream comparison is single-case.
    pub text: String,
    /// 0-based character index of the lexeme in the source formula.
    pub position: usize,
    /// Parsed numeric value for `Integer` and `FloatingPoint` tokens.
    pub value: Option<Real>,
}

const OPERATION_CHARS: &str = "+-*/%^";

/// The token reader, which produces tokens from formula text.
#[derive(Debug, Clone, Copy)]
pub struct TokenReader {
    culture: Culture,
}

impl TokenReader {
    pub fn new(culture: Culture) -> Self {
        Self { culture }
    }

    /// Lexes the whole input into a token sequence.
    ///
    /// Fails with a parse error citing position and offending character on
    /// any lexeme the grammar does not recognize.
    pub fn read(&self, input: &str) -> Result<Vec<Token>> {
        let mut scanner = Scanner {
            input,
            pos: 0,
            culture: self.culture,
        };
        let mut tokens = Vec::new();
        while let Some(token) = scanner.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }
}

struct Scanner<'a> {
    input: &'a str,
    pos: usize,
    culture: Culture,
}

impl<'a> Scanner<'a> {
    /// Peek at the current character.
    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    /// Peek one character past the current one.
    fn peek_second(&self) -> Option<char> {
        let mut chars = self.input[self.pos..].chars();
        chars.next();
        chars.next()
    }

    /// Advance the position by one character.
    fn advance(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += c.len_utf8();
        }
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

    fn next_token(&mut self) -> Result<Option<Token>> {
        self.skip_whitespace();
        let start = self.pos;
        let Some(c) = self.peek() else {
            return Ok(None);
        };

        if c.is_ascii_digit() {
            return self.read_number(start).map(Some);
        }

        // Decimal literals may open with the separator, e.g. `.5`.
        if c == self.culture.decimal_separator()
            && self.peek_second().is_some_and(|d| d.is_ascii_digit())
        {
            return self.read_number(start).map(Some);
        }

        if c.is_ascii_alphabetic() || c == '_' {
            return self.read_identifier(start).map(Some);
        }

        if OPERATION_CHARS.contains(c) {
            self.advance();
            return Ok(Some(Token {
                kind: TokenKind::Operation,
                text: c.to_string(),
                position: start,
                value: None,
            }));
        }

        let kind = match c {
            '(' => TokenKind::LeftBracket,
            ')' => TokenKind::RightBracket,
            c if c == self.culture.argument_separator() => TokenKind::ArgumentSeparator,
            _ => {
                return Err(CalcError::parse(
                    start,
                    format!("unexpected character '{}'", c),
                ));
            }
        };
        self.advance();
        Ok(Some(Token {
            kind,
            text: c.to_string(),
            position: start,
            value: None,
        }))
    }

    /// Reads an integer or floating-point literal starting at `start`.
    ///
    /// Integers are maximal digit runs not followed by the decimal
    /// separator; a separator, or an exponent directly on the digit run,
    /// widens the literal to floating point.
    fn read_number(&mut self, start: usize) -> Result<Token> {
        // The literal normalized to '.'-separated form for f64 parsing.
        let mut normalized = String::new();
        let mut is_float = false;

        if self.peek() == Some(self.culture.decimal_separator()) {
            normalized.push('0');
        } else {
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    normalized.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if self.peek() == Some(self.culture.decimal_separator()) {
            is_float = true;
            normalized.push('.');
            self.advance();
            let mut fraction_digits = 0usize;
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    normalized.push(c);
                    fraction_digits += 1;
                    self.advance();
                } else {
                    break;
                }
            }
            if fraction_digits == 0 {
                return Err(CalcError::parse(
                    start,
                    format!("malformed number '{}'", &self.input[start..self.pos]),
                ));
            }
        }

        if matches!(self.peek(), Some('e') | Some('E')) {
            // Only commit to the exponent when digits (or a signed digit run)
            // actually follow; otherwise `2e` is the integer 2 and the
            // identifier `e`.
            let mut lookahead = self.input[self.pos..].chars();
            lookahead.next();
            let mut after = lookahead.next();
            let has_sign = matches!(after, Some('+') | Some('-'));
            if has_sign {
                after = lookahead.next();
            }
            if after.is_some_and(|d| d.is_ascii_digit()) {
                is_float = true;
                normalized.push('e');
                self.advance();
                if has_sign {
                    normalized.push(self.peek().unwrap_or('+'));
                    self.advance();
                }
                while let Some(c) = self.peek() {
                    if c.is_ascii_digit() {
                        normalized.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
            }
        }

        let value: Real = normalized.parse().map_err(|_| {
            CalcError::parse(
                start,
                format!("malformed number '{}'", &self.input[start..self.pos]),
            )
        })?;

        Ok(Token {
            kind: if is_float {
                TokenKind::FloatingPoint
            } else {
                TokenKind::Integer
            },
            text: self.input[start..self.pos].to_string(),
            position: start,
            value: Some(value),
        })
    }

    fn read_identifier(&mut self, start: usize) -> Result<Token> {
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' {
                self.advance();
            } else {
                break;
            }
        }
        Ok(Token {
            kind: TokenKind::Identifier,
            text: self.input[start..self.pos].to_ascii_lowercase(),
            position: start,
            value: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read(input: &str) -> Vec<Token> {
        TokenReader::new(Culture::invariant()).read(input).unwrap()
    }

    #[test]
    fn test_reader_all_token_kinds() {
        let tokens = read("1 + foo_bar * (2.5e-1) , -baz_123 / 4.2 ^ _x % 9");
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert!(kinds.contains(&TokenKind::Integer));
        assert!(kinds.contains(&TokenKind::FloatingPoint));
        assert!(kinds.contains(&TokenKind::Identifier));
        assert!(kinds.contains(&TokenKind::Operation));
        assert!(kinds.contains(&TokenKind::LeftBracket));
        assert!(kinds.contains(&TokenKind::RightBracket));
        assert!(kinds.contains(&TokenKind::ArgumentSeparator));
    }

    #[test]
    fn test_reader_integer_values() {
        let tokens = read("42");
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[0].value, Some(42.0));
    }

    #[test]
    fn test_reader_float_values_and_exponents() {
        let tokens = read("2.5 1e3 7.25e-2 .5");
        let values: Vec<Real> = tokens.iter().map(|t| t.value.unwrap()).collect();
        assert_eq!(values, vec![2.5, 1000.0, 0.0725, 0.5]);
        assert!(tokens.iter().all(|t| t.kind == TokenKind::FloatingPoint));
    }

    #[test]
    fn test_reader_exponent_needs_digits() {
        // `2e` is the integer 2 followed by the identifier `e`.
        let tokens = read("2e");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].kind, TokenKind::Integer);
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].text, "e");
    }

    #[test]
    fn test_reader_identifiers_are_lowercased() {
        let tokens = read("SIN(Pi)");
        assert_eq!(tokens[0].text, "sin");
        assert_eq!(tokens[2].text, "pi");
    }

    #[test]
    fn test_reader_positions() {
        let tokens = read("ab + 12");
        let positions: Vec<usize> = tokens.iter().map(|t| t.position).collect();
        assert_eq!(positions, vec![0, 3, 5]);
    }

    #[test]
    fn test_reader_rejects_unknown_characters() {
        let err = TokenReader::new(Culture::invariant())
            .read("1 $ 2")
            .unwrap_err();
        match err {
            CalcError::Parse { position, message } => {
                assert_eq!(position, 2);
                assert!(message.contains('$'));
            }
            other => panic!("expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_reader_rejects_dangling_decimal_separator() {
        let err = TokenReader::new(Culture::invariant())
            .read("1. + 2")
            .unwrap_err();
        assert!(matches!(err, CalcError::Parse { position: 0, .. }));
    }

    #[test]
    fn test_reader_comma_decimal_culture() {
        let reader = TokenReader::new(Culture::comma_decimal());
        let tokens = reader.read("max(1,5; 2)").unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Identifier,
                TokenKind::LeftBracket,
                TokenKind::FloatingPoint,
                TokenKind::ArgumentSeparator,
                TokenKind::Integer,
                TokenKind::RightBracket,
            ]
        );
        assert_eq!(tokens[2].value, Some(1.5));
    }

    #[test]
    fn test_culture_rejects_colliding_separators() {
        assert!(Culture::custom('.', '.').is_err());
        assert!(Culture::custom('x', ',').is_err());
        assert!(Culture::custom('.', '(').is_err());
        assert!(Culture::custom(',', ';').is_ok());
    }

    #[test]
    fn test_reader_unary_minus_is_plain_operation() {
        let tokens = read("-3");
        assert_eq!(tokens[0].kind, TokenKind::Operation);
        assert_eq!(tokens[0].text, "-");
        assert_eq!(tokens[1].kind, TokenKind::Integer);
    }
}
