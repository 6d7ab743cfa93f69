//! Compiled formula programs
//!
//! Parsing lowers formula text to a flat postfix instruction sequence. A
//! [`ParsedFormula`] is immutable after construction, so one parse can be
//! evaluated any number of times against changing sheet state.

use gridcalc_core::{CellAddress, CellRange, ErrorKind};

/// Binary operators in evaluation form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Pow,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    /// Prefix `-`
    Neg,
    /// Postfix `%` (divide by 100)
    Percent,
}

/// A single-cell reference; `sheet` is `None` for unqualified references,
/// which resolve against the sheet being evaluated
#[derive(Debug, Clone, PartialEq)]
pub struct CellRef {
    pub sheet: Option<String>,
    pub addr: CellAddress,
}

/// The sheet qualifier of a range reference
#[derive(Debug, Clone, PartialEq)]
pub enum SheetSpan {
    Single(String),
    /// 3-D form `First:Last!...` spanning consecutive sheets
    Span(String, String),
}

/// A rectangular (possibly 3-D) range reference
#[derive(Debug, Clone, PartialEq)]
pub struct RangeRef {
    pub sheets: Option<SheetSpan>,
    pub range: CellRange,
}

/// One postfix instruction
#[derive(Debug, Clone, PartialEq)]
pub enum Instr {
    PushNumber(f64),
    PushText(String),
    PushBool(bool),
    PushError(ErrorKind),
    /// An omitted argument position, e.g. `IF(A1,,2)`
    PushEmpty,
    PushCell(CellRef),
    PushRange(RangeRef),
    /// A defined name, resolved at evaluation time
    PushName(String),
    /// Pop `rows * cols` values pushed in row-major order and build an array
    BuildArray { rows: usize, cols: usize },
    Unary(UnaryOp),
    Binary(BinaryOp),
    /// Pop `argc` arguments and dispatch the named function
    Call { name: String, argc: usize },
}

/// An immutable compiled formula
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedFormula {
    code: Vec<Instr>,
}

impl ParsedFormula {
    pub(crate) fn new(code: Vec<Instr>) -> Self {
        Self { code }
    }

    pub fn code(&self) -> &[Instr] {
        &self.code
    }

    /// Iterate the reference-pushing instructions, for precedent extraction
    pub fn reference_instrs(&self) -> impl Iterator<Item = &Instr> {
        self.code.iter().filter(|i| {
            matches!(
                i,
                Instr::PushCell(_) | Instr::PushRange(_) | Instr::PushName(_)
            )
        })
    }
}
