//! # gridcalc
//!
//! A spreadsheet formula engine for Rust.
//!
//! Gridcalc parses Excel-style formula text into a compact postfix
//! program, evaluates it against workbook data, and recalculates whole
//! workbooks in dependency order.
//!
//! ## Features
//!
//! - A1-style cell and range references, including `Sheet1!A1` and 3-D
//!   spans like `Sheet1:Sheet3!B2`
//! - Operator grammar with Excel precedence, unary sign, and postfix `%`
//! - Array literals with elementwise broadcasting
//! - Error values (`#DIV/0!`, `#VALUE!`, ...) that flow through
//!   expressions as data
//! - Workbook-level recalculation with topological ordering and
//!   circular-reference detection
//! - Configurable argument separator for locale support
//!
//! ## Example
//!
//! ```rust
//! use gridcalc::prelude::*;
//!
//! let mut wb = Workbook::new();
//! let sheet = wb.sheet_mut("Sheet1").unwrap();
//! sheet.set_value("A1".parse().unwrap(), 2.0).unwrap();
//! sheet.set_value("A2".parse().unwrap(), 3.0).unwrap();
//! sheet.set_formula("A3".parse().unwrap(), "SUM(A1:A2)*10").unwrap();
//!
//! wb.calculate().unwrap();
//! let a3 = "A3".parse().unwrap();
//! assert_eq!(*wb.sheet("Sheet1").unwrap().value(a3).effective(), CellValue::Number(50.0));
//! ```

pub mod calculation;
pub mod prelude;

// Re-export calculation types
pub use calculation::{CalculationOptions, CalculationStats, WorkbookCalculationExt};

// Re-export core types
pub use gridcalc_core::{
    CellAddress, CellRange, CellValue, Error, ErrorKind, NamedRange, Result, Workbook, Worksheet,
};

// Re-export formula engine types
pub use gridcalc_formula::{
    precedents, Array, CellId, DependencyGraph, Dialect, Engine, EngineError, EngineResult,
    ParsedFormula, Precedent, SheetAccess, Value,
};
