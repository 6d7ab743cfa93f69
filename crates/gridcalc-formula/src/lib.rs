//! # gridcalc-formula
//!
//! The formula engine: tokenizer, parser, and postfix evaluator with
//! spreadsheet semantics. Formulas compile once into an immutable
//! [`ParsedFormula`] and evaluate any number of times against sheet data
//! reached through the [`SheetAccess`] trait.
//!
//! Two failure channels stay strictly apart:
//!
//! - spreadsheet error codes (`#DIV/0!`, `#VALUE!`, ...) are ordinary
//!   [`Value`]s that flow through operators and function arguments;
//! - [`EngineError`] is an engine fault: unparseable text, an internal
//!   invariant break, or runaway recursion.
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{CellAddress, Workbook};
//! use gridcalc_formula::{CellId, Engine, Value};
//!
//! let mut wb = Workbook::new();
//! let sheet = wb.sheet_mut("Sheet1").unwrap();
//! sheet.set_value(CellAddress::parse("A1").unwrap(), 20.0).unwrap();
//!
//! let engine = Engine::new();
//! let result = engine
//!     .evaluate("A1*2+2", &wb, CellId::new("Sheet1", 0, 1))
//!     .unwrap();
//! assert_eq!(result, Value::Number(42.0));
//! ```

pub mod context;
pub mod deps;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod functions;
pub mod parser;
pub mod program;
pub mod resolver;
pub mod tokenizer;
pub mod value;

pub use context::{CellId, EvalContext, MAX_EVAL_DEPTH};
pub use deps::DependencyGraph;
pub use engine::Engine;
pub use error::{EngineError, EngineResult};
pub use parser::Dialect;
pub use program::{BinaryOp, CellRef, Instr, ParsedFormula, RangeRef, SheetSpan, UnaryOp};
pub use resolver::{precedents, Precedent, SheetAccess};
pub use value::{Array, Value};
