//! Formula tokenizer
//!
//! Pure text-to-token pass. Offsets are byte positions into the formula
//! text and are carried into diagnostics. Unary `+`/`-` are classified
//! here, from the kind of the preceding token, so the parser never has to
//! re-disambiguate.

use crate::error::{EngineError, EngineResult};
use gridcalc_core::{CellAddress, ErrorKind};

/// One lexed token with its byte offset
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    Bool(bool),
    /// An error literal such as `#DIV/0!`
    Error(ErrorKind),
    /// A function or defined name
    Ident(String),
    /// Text that parses as a cell address (`A1`, `$B$2`); raw text kept
    /// because it may turn out to be a bare sheet name before `!`
    Reference(String),
    /// A quoted sheet name (`'My Sheet'`), without the quotes
    QuotedSheet(String),
    Plus,
    Minus,
    UnaryPlus,
    UnaryMinus,
    Star,
    Slash,
    Caret,
    Percent,
    Ampersand,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Colon,
    Bang,
    /// `,` or `;`; the parser decides whether it separates arguments or
    /// array elements
    Separator(char),
    LParen,
    RParen,
    LBrace,
    RBrace,
}

impl TokenKind {
    /// Whether this token can end an operand, which makes a following
    /// `+`/`-` binary rather than unary
    fn ends_operand(&self) -> bool {
        matches!(
            self,
            TokenKind::Number(_)
                | TokenKind::Str(_)
                | TokenKind::Bool(_)
                | TokenKind::Error(_)
                | TokenKind::Ident(_)
                | TokenKind::Reference(_)
                | TokenKind::Percent
                | TokenKind::RParen
                | TokenKind::RBrace
        )
    }
}

/// Error literals, longest first so prefix matching is unambiguous
const ERROR_LITERALS: &[(&str, ErrorKind)] = &[
    ("#GETTING_DATA", ErrorKind::GettingData),
    ("#SPILL!", ErrorKind::Spill),
    ("#VALUE!", ErrorKind::Value),
    ("#DIV/0!", ErrorKind::Div0),
    ("#CALC!", ErrorKind::Calc),
    ("#NAME?", ErrorKind::Name),
    ("#NULL!", ErrorKind::Null),
    ("#NUM!", ErrorKind::Num),
    ("#REF!", ErrorKind::Ref),
    ("#N/A", ErrorKind::Na),
];

/// Tokenize formula text (without a leading `=`)
pub fn tokenize(text: &str) -> EngineResult<Vec<Token>> {
    Lexer::new(text).run()
}

struct Lexer<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(text: &'a str) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
        }
    }

    fn run(mut self) -> EngineResult<Vec<Token>> {
        while let Some(c) = self.peek_char() {
            if c.is_whitespace() {
                self.pos += c.len_utf8();
                continue;
            }
            let offset = self.pos;
            let kind = match c {
                '0'..='9' => self.lex_number()?,
                '.' if self.peek_byte_at(1).is_some_and(|b| b.is_ascii_digit()) => {
                    self.lex_number()?
                }
                '"' => self.lex_string()?,
                '\'' => self.lex_quoted_sheet()?,
                '#' => self.lex_error_literal()?,
                c if c.is_alphabetic() || c == '_' || c == '$' => self.lex_word(),
                '+' => self.single(if self.prev_ends_operand() {
                    TokenKind::Plus
                } else {
                    TokenKind::UnaryPlus
                }),
                '-' => self.single(if self.prev_ends_operand() {
                    TokenKind::Minus
                } else {
                    TokenKind::UnaryMinus
                }),
                '*' => self.single(TokenKind::Star),
                '/' => self.single(TokenKind::Slash),
                '^' => self.single(TokenKind::Caret),
                '%' => self.single(TokenKind::Percent),
                '&' => self.single(TokenKind::Ampersand),
                '=' => self.single(TokenKind::Eq),
                '<' => match self.peek_byte_at(1) {
                    Some(b'>') => self.double(TokenKind::Ne),
                    Some(b'=') => self.double(TokenKind::Le),
                    _ => self.single(TokenKind::Lt),
                },
                '>' => match self.peek_byte_at(1) {
                    Some(b'=') => self.double(TokenKind::Ge),
                    _ => self.single(TokenKind::Gt),
                },
                ':' => self.single(TokenKind::Colon),
                '!' => self.single(TokenKind::Bang),
                ',' => self.single(TokenKind::Separator(',')),
                ';' => self.single(TokenKind::Separator(';')),
                '(' => self.single(TokenKind::LParen),
                ')' => self.single(TokenKind::RParen),
                '{' => self.single(TokenKind::LBrace),
                '}' => self.single(TokenKind::RBrace),
                other => {
                    return Err(EngineError::Lex {
                        message: format!("unexpected character '{other}'"),
                        offset,
                    })
                }
            };
            self.tokens.push(Token { kind, offset });
        }
        Ok(self.tokens)
    }

    fn peek_char(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_byte_at(&self, ahead: usize) -> Option<u8> {
        self.bytes.get(self.pos + ahead).copied()
    }

    fn prev_ends_operand(&self) -> bool {
        self.tokens.last().is_some_and(|t| t.kind.ends_operand())
    }

    fn single(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 1;
        kind
    }

    fn double(&mut self, kind: TokenKind) -> TokenKind {
        self.pos += 2;
        kind
    }

    fn lex_number(&mut self) -> EngineResult<TokenKind> {
        let start = self.pos;
        while self.peek_byte_at(0).is_some_and(|b| b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek_byte_at(0) == Some(b'.') {
            self.pos += 1;
            while self.peek_byte_at(0).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        // Exponent, only when a digit actually follows
        if matches!(self.peek_byte_at(0), Some(b'e' | b'E')) {
            let after_sign = match self.peek_byte_at(1) {
                Some(b'+' | b'-') => 2,
                _ => 1,
            };
            if self.peek_byte_at(after_sign).is_some_and(|b| b.is_ascii_digit()) {
                self.pos += after_sign;
                while self.peek_byte_at(0).is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }
        let slice = &self.text[start..self.pos];
        slice
            .parse()
            .map(TokenKind::Number)
            .map_err(|_| EngineError::Lex {
                message: format!("invalid number '{slice}'"),
                offset: start,
            })
    }

    fn lex_string(&mut self) -> EngineResult<TokenKind> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek_char() {
                Some('"') => {
                    if self.peek_byte_at(1) == Some(b'"') {
                        out.push('"');
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        return Ok(TokenKind::Str(out));
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.pos += c.len_utf8();
                }
                None => {
                    return Err(EngineError::Lex {
                        message: "unterminated string literal".to_string(),
                        offset: start,
                    })
                }
            }
        }
    }

    fn lex_quoted_sheet(&mut self) -> EngineResult<TokenKind> {
        let start = self.pos;
        self.pos += 1;
        let mut out = String::new();
        loop {
            match self.peek_char() {
                Some('\'') => {
                    if self.peek_byte_at(1) == Some(b'\'') {
                        out.push('\'');
                        self.pos += 2;
                    } else {
                        self.pos += 1;
                        return Ok(TokenKind::QuotedSheet(out));
                    }
                }
                Some(c) => {
                    out.push(c);
                    self.pos += c.len_utf8();
                }
                None => {
                    return Err(EngineError::Lex {
                        message: "unterminated sheet name".to_string(),
                        offset: start,
                    })
                }
            }
        }
    }

    fn lex_error_literal(&mut self) -> EngineResult<TokenKind> {
        // Byte comparison: a slice at literal.len() could split a
        // multibyte character in the input
        let rest = &self.text.as_bytes()[self.pos..];
        for (literal, kind) in ERROR_LITERALS {
            if rest
                .get(..literal.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(literal.as_bytes()))
            {
                self.pos += literal.len();
                return Ok(TokenKind::Error(*kind));
            }
        }
        Err(EngineError::Lex {
            message: "unknown error literal".to_string(),
            offset: self.pos,
        })
    }

    fn lex_word(&mut self) -> TokenKind {
        let start = self.pos;
        while let Some(c) = self.peek_char() {
            if c.is_alphanumeric() || c == '_' || c == '.' || c == '$' {
                self.pos += c.len_utf8();
            } else {
                break;
            }
        }
        let word = &self.text[start..self.pos];
        if CellAddress::parse(word).is_ok() {
            return TokenKind::Reference(word.to_string());
        }
        if word.eq_ignore_ascii_case("TRUE") || word.eq_ignore_ascii_case("FALSE") {
            // TRUE() / FALSE() stay function calls; a sheet named TRUE
            // keeps its identifier form before `!`
            let next = self.text[self.pos..].chars().find(|c| !c.is_whitespace());
            if next != Some('(') && next != Some('!') {
                return TokenKind::Bool(word.eq_ignore_ascii_case("TRUE"));
            }
        }
        TokenKind::Ident(word.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn kinds(text: &str) -> Vec<TokenKind> {
        tokenize(text).unwrap().into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn numbers() {
        assert_eq!(kinds("1"), vec![TokenKind::Number(1.0)]);
        assert_eq!(kinds("2.5"), vec![TokenKind::Number(2.5)]);
        assert_eq!(kinds(".5"), vec![TokenKind::Number(0.5)]);
        assert_eq!(kinds("1e3"), vec![TokenKind::Number(1000.0)]);
        assert_eq!(kinds("1.5E-2"), vec![TokenKind::Number(0.015)]);
    }

    #[test]
    fn strings_with_escaped_quotes() {
        assert_eq!(
            kinds(r#""say ""hi""""#),
            vec![TokenKind::Str(r#"say "hi""#.to_string())]
        );
    }

    #[test]
    fn unterminated_string_reports_offset() {
        let err = tokenize(r#"1+"oops"#).unwrap_err();
        assert_eq!(
            err,
            EngineError::Lex {
                message: "unterminated string literal".to_string(),
                offset: 2,
            }
        );
    }

    #[test]
    fn error_literals() {
        assert_eq!(kinds("#DIV/0!"), vec![TokenKind::Error(ErrorKind::Div0)]);
        assert_eq!(kinds("#N/A"), vec![TokenKind::Error(ErrorKind::Na)]);
        assert_eq!(kinds("#name?"), vec![TokenKind::Error(ErrorKind::Name)]);
        assert!(tokenize("#BOGUS!").is_err());
    }

    #[test]
    fn malformed_error_literal_with_multibyte_tail() {
        // A literal-length byte slice would land inside the 'é'
        let err = tokenize("#DIV/0é").unwrap_err();
        assert_eq!(
            err,
            EngineError::Lex {
                message: "unknown error literal".to_string(),
                offset: 0,
            }
        );
        assert_eq!(kinds("#N/Aé")[0], TokenKind::Error(ErrorKind::Na));
    }

    #[test]
    fn unary_vs_binary_sign() {
        assert_eq!(
            kinds("-1-2"),
            vec![
                TokenKind::UnaryMinus,
                TokenKind::Number(1.0),
                TokenKind::Minus,
                TokenKind::Number(2.0),
            ]
        );
        assert_eq!(
            kinds("2*-3"),
            vec![
                TokenKind::Number(2.0),
                TokenKind::Star,
                TokenKind::UnaryMinus,
                TokenKind::Number(3.0),
            ]
        );
        assert_eq!(
            kinds("(1)-2")[1..],
            [TokenKind::RParen, TokenKind::Minus, TokenKind::Number(2.0)]
        );
    }

    #[test]
    fn references_and_idents() {
        assert_eq!(
            kinds("A1"),
            vec![TokenKind::Reference("A1".to_string())]
        );
        assert_eq!(
            kinds("$B$2"),
            vec![TokenKind::Reference("$B$2".to_string())]
        );
        assert_eq!(kinds("SUM"), vec![TokenKind::Ident("SUM".to_string())]);
        assert_eq!(
            kinds("tax.rate"),
            vec![TokenKind::Ident("tax.rate".to_string())]
        );
    }

    #[test]
    fn booleans_but_not_boolean_functions() {
        assert_eq!(kinds("TRUE"), vec![TokenKind::Bool(true)]);
        assert_eq!(kinds("false"), vec![TokenKind::Bool(false)]);
        assert_eq!(
            kinds("TRUE()"),
            vec![
                TokenKind::Ident("TRUE".to_string()),
                TokenKind::LParen,
                TokenKind::RParen,
            ]
        );
    }

    #[test]
    fn sheet_qualifiers() {
        assert_eq!(
            kinds("'P&L 2024'!A1"),
            vec![
                TokenKind::QuotedSheet("P&L 2024".to_string()),
                TokenKind::Bang,
                TokenKind::Reference("A1".to_string()),
            ]
        );
        assert_eq!(
            kinds("Sheet1!A1")[..2],
            [
                TokenKind::Ident("Sheet1".to_string()),
                TokenKind::Bang,
            ]
        );
    }

    #[test]
    fn illegal_character_reports_offset() {
        let err = tokenize("1 + @").unwrap_err();
        assert!(matches!(err, EngineError::Lex { offset: 4, .. }));
    }
}
