//! Per-request evaluation state
//!
//! An [`EvalContext`] lives for one top-level evaluation. It carries the
//! sheet accessor, the engine (for parsing formulas found in referenced
//! cells), and the in-progress cell stack used for circular-reference
//! detection.

use crate::engine::Engine;
use crate::error::{EngineError, EngineResult};
use crate::resolver::SheetAccess;
use gridcalc_core::CellAddress;
use std::cell::{Cell, RefCell};
use std::fmt;

/// Cap on formula nesting before evaluation aborts with
/// [`EngineError::RecursionLimit`]
pub const MAX_EVAL_DEPTH: usize = 256;

/// A fully qualified cell coordinate
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CellId {
    pub sheet: String,
    pub row: u32,
    pub col: u16,
}

impl CellId {
    pub fn new(sheet: impl Into<String>, row: u32, col: u16) -> Self {
        Self {
            sheet: sheet.into(),
            row,
            col,
        }
    }

    pub fn at(sheet: impl Into<String>, addr: CellAddress) -> Self {
        Self::new(sheet, addr.row, addr.col)
    }

    pub fn addr(&self) -> CellAddress {
        CellAddress::new(self.row, self.col)
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}!{}", self.sheet, self.addr())
    }
}

/// Outcome of entering a cell's formula for recursive evaluation
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Frame {
    Entered,
    /// The cell is already being evaluated higher up the stack
    Cycle,
}

/// State shared across one evaluation request
pub struct EvalContext<'a> {
    pub(crate) engine: &'a Engine,
    pub(crate) sheets: &'a dyn SheetAccess,
    in_progress: RefCell<Vec<CellId>>,
    depth: Cell<usize>,
}

impl<'a> EvalContext<'a> {
    pub fn new(engine: &'a Engine, sheets: &'a dyn SheetAccess, origin: CellId) -> Self {
        Self {
            engine,
            sheets,
            in_progress: RefCell::new(vec![origin]),
            depth: Cell::new(0),
        }
    }

    pub fn sheets(&self) -> &dyn SheetAccess {
        self.sheets
    }

    /// The sheet unqualified references resolve against: the sheet of the
    /// cell currently being evaluated
    pub fn current_sheet(&self) -> String {
        self.in_progress
            .borrow()
            .last()
            .map(|c| c.sheet.clone())
            .unwrap_or_default()
    }

    /// Mark a cell's formula as in progress; detects cycles and enforces
    /// the depth cap. A successful `Entered` must be paired with
    /// [`EvalContext::leave_cell`].
    pub(crate) fn enter_cell(&self, cell: &CellId) -> EngineResult<Frame> {
        let mut stack = self.in_progress.borrow_mut();
        if stack.len() >= MAX_EVAL_DEPTH {
            return Err(EngineError::RecursionLimit);
        }
        if stack.iter().any(|c| c == cell) {
            return Ok(Frame::Cycle);
        }
        stack.push(cell.clone());
        Ok(Frame::Entered)
    }

    pub(crate) fn leave_cell(&self) {
        self.in_progress.borrow_mut().pop();
    }

    /// Guard against unbounded recursion that does not go through cell
    /// frames (e.g. a defined name whose target refers back to itself)
    pub(crate) fn enter_eval(&self) -> EngineResult<()> {
        let d = self.depth.get() + 1;
        if d > MAX_EVAL_DEPTH {
            return Err(EngineError::RecursionLimit);
        }
        self.depth.set(d);
        Ok(())
    }

    pub(crate) fn leave_eval(&self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}
