//! Formula parser
//!
//! Recursive descent over the token stream, lowering directly to postfix
//! [`Instr`] code in [`ParsedFormula`]. Precedence, loosest to tightest:
//! comparison, `&`, `+ -`, `* /`, `^` (right-associative), unary sign,
//! postfix `%`, the range `:`, primaries. The range operator is folded
//! into reference parsing, so `:` between addresses never reaches the
//! operator ladder.

use crate::error::{EngineError, EngineResult};
use crate::program::{BinaryOp, CellRef, Instr, ParsedFormula, RangeRef, SheetSpan, UnaryOp};
use crate::tokenizer::{tokenize, Token, TokenKind};
use gridcalc_core::{CellAddress, CellRange};

/// Locale-dependent parse settings, supplied by the caller
///
/// Only the function argument separator varies; array literals always use
/// `,` between columns and `;` between rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dialect {
    pub arg_separator: char,
}

impl Default for Dialect {
    fn default() -> Self {
        Self { arg_separator: ',' }
    }
}

/// Parse formula text (without a leading `=`) into a postfix program
pub fn parse(text: &str, dialect: &Dialect) -> EngineResult<ParsedFormula> {
    let tokens = tokenize(text)?;
    Parser {
        tokens,
        pos: 0,
        dialect: dialect.clone(),
        code: Vec::new(),
    }
    .run()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    dialect: Dialect,
    code: Vec<Instr>,
}

impl Parser {
    fn run(mut self) -> EngineResult<ParsedFormula> {
        if self.tokens.is_empty() {
            return Err(EngineError::Syntax("empty formula".to_string()));
        }
        self.parse_expression()?;
        if let Some(tok) = self.tokens.get(self.pos) {
            return Err(EngineError::Syntax(format!(
                "unexpected token at offset {}",
                tok.offset
            )));
        }
        Ok(ParsedFormula::new(self.code))
    }

    fn peek(&self) -> Option<&TokenKind> {
        self.tokens.get(self.pos).map(|t| &t.kind)
    }

    fn peek_at(&self, ahead: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + ahead).map(|t| &t.kind)
    }

    fn advance(&mut self) -> Option<Token> {
        let tok = self.tokens.get(self.pos).cloned();
        if tok.is_some() {
            self.pos += 1;
        }
        tok
    }

    fn expect(&mut self, kind: &TokenKind, what: &str) -> EngineResult<()> {
        match self.advance() {
            Some(tok) if tok.kind == *kind => Ok(()),
            Some(tok) => Err(EngineError::Syntax(format!(
                "expected {what} at offset {}",
                tok.offset
            ))),
            None => Err(EngineError::Syntax(format!(
                "expected {what} at end of formula"
            ))),
        }
    }

    fn parse_expression(&mut self) -> EngineResult<()> {
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> EngineResult<()> {
        self.parse_concat()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Eq) => BinaryOp::Eq,
                Some(TokenKind::Ne) => BinaryOp::Ne,
                Some(TokenKind::Lt) => BinaryOp::Lt,
                Some(TokenKind::Le) => BinaryOp::Le,
                Some(TokenKind::Gt) => BinaryOp::Gt,
                Some(TokenKind::Ge) => BinaryOp::Ge,
                _ => return Ok(()),
            };
            self.pos += 1;
            self.parse_concat()?;
            self.code.push(Instr::Binary(op));
        }
    }

    fn parse_concat(&mut self) -> EngineResult<()> {
        self.parse_additive()?;
        while matches!(self.peek(), Some(TokenKind::Ampersand)) {
            self.pos += 1;
            self.parse_additive()?;
            self.code.push(Instr::Binary(BinaryOp::Concat));
        }
        Ok(())
    }

    fn parse_additive(&mut self) -> EngineResult<()> {
        self.parse_multiplicative()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Plus) => BinaryOp::Add,
                Some(TokenKind::Minus) => BinaryOp::Sub,
                _ => return Ok(()),
            };
            self.pos += 1;
            self.parse_multiplicative()?;
            self.code.push(Instr::Binary(op));
        }
    }

    fn parse_multiplicative(&mut self) -> EngineResult<()> {
        self.parse_power()?;
        loop {
            let op = match self.peek() {
                Some(TokenKind::Star) => BinaryOp::Mul,
                Some(TokenKind::Slash) => BinaryOp::Div,
                _ => return Ok(()),
            };
            self.pos += 1;
            self.parse_power()?;
            self.code.push(Instr::Binary(op));
        }
    }

    // Right-associative: the recursion makes 2^3^2 parse as 2^(3^2).
    // Unary sign binds tighter, so -2^2 is (-2)^2.
    fn parse_power(&mut self) -> EngineResult<()> {
        self.parse_unary()?;
        if matches!(self.peek(), Some(TokenKind::Caret)) {
            self.pos += 1;
            self.parse_power()?;
            self.code.push(Instr::Binary(BinaryOp::Pow));
        }
        Ok(())
    }

    fn parse_unary(&mut self) -> EngineResult<()> {
        match self.peek() {
            Some(TokenKind::UnaryMinus) => {
                self.pos += 1;
                self.parse_unary()?;
                self.code.push(Instr::Unary(UnaryOp::Neg));
                Ok(())
            }
            // Unary plus is the identity, including on text
            Some(TokenKind::UnaryPlus) => {
                self.pos += 1;
                self.parse_unary()
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> EngineResult<()> {
        self.parse_primary()?;
        while matches!(self.peek(), Some(TokenKind::Percent)) {
            self.pos += 1;
            self.code.push(Instr::Unary(UnaryOp::Percent));
        }
        Ok(())
    }

    fn parse_primary(&mut self) -> EngineResult<()> {
        let Some(kind) = self.peek().cloned() else {
            return Err(EngineError::Syntax(
                "unexpected end of formula".to_string(),
            ));
        };
        match kind {
            TokenKind::Number(n) => {
                self.pos += 1;
                self.code.push(Instr::PushNumber(n));
                Ok(())
            }
            TokenKind::Str(s) => {
                self.pos += 1;
                self.code.push(Instr::PushText(s));
                Ok(())
            }
            TokenKind::Bool(b) => {
                self.pos += 1;
                self.code.push(Instr::PushBool(b));
                Ok(())
            }
            TokenKind::Error(e) => {
                self.pos += 1;
                self.code.push(Instr::PushError(e));
                Ok(())
            }
            TokenKind::LParen => {
                self.pos += 1;
                self.parse_expression()?;
                self.expect(&TokenKind::RParen, "')'")
            }
            TokenKind::LBrace => self.parse_array(),
            TokenKind::QuotedSheet(_) => {
                let span = self.parse_sheet_prefix()?;
                self.parse_reference(Some(span))
            }
            TokenKind::Ident(name) => {
                if matches!(self.peek_at(1), Some(TokenKind::LParen)) {
                    self.pos += 1;
                    return self.parse_call(name);
                }
                if self.at_sheet_prefix() {
                    let span = self.parse_sheet_prefix()?;
                    return self.parse_reference(Some(span));
                }
                self.pos += 1;
                self.code.push(Instr::PushName(name));
                Ok(())
            }
            TokenKind::Reference(_) => {
                if self.at_sheet_prefix() {
                    let span = self.parse_sheet_prefix()?;
                    return self.parse_reference(Some(span));
                }
                self.parse_reference(None)
            }
            other => Err(EngineError::Syntax(format!(
                "unexpected token {other:?}"
            ))),
        }
    }

    /// Whether the tokens at the cursor form a sheet qualifier:
    /// `name!` or `first:last!`
    fn at_sheet_prefix(&self) -> bool {
        if matches!(self.peek_at(1), Some(TokenKind::Bang)) {
            return true;
        }
        matches!(self.peek_at(1), Some(TokenKind::Colon))
            && sheet_name_of(self.peek_at(2)).is_some()
            && matches!(self.peek_at(3), Some(TokenKind::Bang))
    }

    fn parse_sheet_prefix(&mut self) -> EngineResult<SheetSpan> {
        let first = self.take_sheet_name()?;
        if matches!(self.peek(), Some(TokenKind::Colon)) {
            self.pos += 1;
            let last = self.take_sheet_name()?;
            self.expect(&TokenKind::Bang, "'!'")?;
            Ok(SheetSpan::Span(first, last))
        } else {
            self.expect(&TokenKind::Bang, "'!'")?;
            Ok(SheetSpan::Single(first))
        }
    }

    fn take_sheet_name(&mut self) -> EngineResult<String> {
        match self.advance() {
            Some(tok) => sheet_name_of(Some(&tok.kind)).ok_or_else(|| {
                EngineError::Syntax(format!("expected sheet name at offset {}", tok.offset))
            }),
            None => Err(EngineError::Syntax(
                "expected sheet name at end of formula".to_string(),
            )),
        }
    }

    /// Parse `A1` or `A1:B2` after an optional sheet qualifier and emit
    /// the push instruction
    fn parse_reference(&mut self, sheets: Option<SheetSpan>) -> EngineResult<()> {
        let start = self.take_address()?;
        let end = if matches!(self.peek(), Some(TokenKind::Colon)) {
            self.pos += 1;
            Some(self.take_address()?)
        } else {
            None
        };
        match (end, sheets) {
            (None, None) => self.code.push(Instr::PushCell(CellRef {
                sheet: None,
                addr: start,
            })),
            (None, Some(SheetSpan::Single(name))) => self.code.push(Instr::PushCell(CellRef {
                sheet: Some(name),
                addr: start,
            })),
            (end, sheets) => self.code.push(Instr::PushRange(RangeRef {
                sheets,
                range: CellRange::new(start, end.unwrap_or(start)),
            })),
        }
        Ok(())
    }

    fn take_address(&mut self) -> EngineResult<CellAddress> {
        match self.advance() {
            Some(Token {
                kind: TokenKind::Reference(text),
                offset,
            }) => CellAddress::parse(&text).map_err(|_| {
                EngineError::Syntax(format!("invalid cell reference at offset {offset}"))
            }),
            Some(tok) => Err(EngineError::Syntax(format!(
                "expected cell reference at offset {}",
                tok.offset
            ))),
            None => Err(EngineError::Syntax(
                "expected cell reference at end of formula".to_string(),
            )),
        }
    }

    fn parse_call(&mut self, name: String) -> EngineResult<()> {
        self.expect(&TokenKind::LParen, "'('")?;
        let sep = TokenKind::Separator(self.dialect.arg_separator);
        let mut argc = 0usize;
        if matches!(self.peek(), Some(TokenKind::RParen)) {
            self.pos += 1;
            self.code.push(Instr::Call { name, argc });
            return Ok(());
        }
        loop {
            // An omitted argument position evaluates as Empty
            if self.peek() == Some(&sep) || matches!(self.peek(), Some(TokenKind::RParen)) {
                self.code.push(Instr::PushEmpty);
            } else {
                self.parse_expression()?;
            }
            argc += 1;
            match self.advance() {
                Some(tok) if tok.kind == sep => continue,
                Some(Token {
                    kind: TokenKind::RParen,
                    ..
                }) => break,
                Some(tok) => {
                    return Err(EngineError::Syntax(format!(
                        "expected argument separator or ')' at offset {}",
                        tok.offset
                    )))
                }
                None => {
                    return Err(EngineError::Syntax(
                        "unclosed function call".to_string(),
                    ))
                }
            }
        }
        self.code.push(Instr::Call { name, argc });
        Ok(())
    }

    // Array literals use fixed separators regardless of dialect: `,`
    // between columns, `;` between rows.
    fn parse_array(&mut self) -> EngineResult<()> {
        self.expect(&TokenKind::LBrace, "'{'")?;
        let mut rows = 0usize;
        let mut width: Option<usize> = None;
        let mut row_len = 0usize;
        loop {
            if matches!(
                self.peek(),
                Some(TokenKind::Separator(_)) | Some(TokenKind::RBrace) | None
            ) {
                return Err(EngineError::Syntax(
                    "empty array element".to_string(),
                ));
            }
            self.parse_expression()?;
            row_len += 1;
            match self.advance() {
                Some(Token {
                    kind: TokenKind::Separator(','),
                    ..
                }) => continue,
                Some(Token {
                    kind: TokenKind::Separator(';'),
                    ..
                }) => {
                    rows += 1;
                    if *width.get_or_insert(row_len) != row_len {
                        return Err(EngineError::Syntax(
                            "array rows have unequal lengths".to_string(),
                        ));
                    }
                    row_len = 0;
                }
                Some(Token {
                    kind: TokenKind::RBrace,
                    ..
                }) => {
                    rows += 1;
                    if *width.get_or_insert(row_len) != row_len {
                        return Err(EngineError::Syntax(
                            "array rows have unequal lengths".to_string(),
                        ));
                    }
                    break;
                }
                Some(tok) => {
                    return Err(EngineError::Syntax(format!(
                        "expected ',', ';' or '}}' at offset {}",
                        tok.offset
                    )))
                }
                None => {
                    return Err(EngineError::Syntax(
                        "unclosed array literal".to_string(),
                    ))
                }
            }
        }
        let cols = width.unwrap_or(0);
        self.code.push(Instr::BuildArray { rows, cols });
        Ok(())
    }
}

fn sheet_name_of(kind: Option<&TokenKind>) -> Option<String> {
    match kind {
        Some(TokenKind::Ident(s))
        | Some(TokenKind::Reference(s))
        | Some(TokenKind::QuotedSheet(s)) => Some(s.clone()),
        _ => None,
    }
}
