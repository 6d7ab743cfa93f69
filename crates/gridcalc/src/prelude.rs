//! Prelude module - common imports for gridcalc users
//!
//! ```rust
//! use gridcalc::prelude::*;
//! ```

pub use crate::{
    // Calculation types
    CalculationOptions,
    CalculationStats,
    // Addressing types
    CellAddress,
    CellId,
    CellRange,
    // Cell types
    CellValue,
    // Parse settings
    Dialect,
    // Evaluation types
    Engine,
    EngineError,
    // Error types
    Error,
    ErrorKind,
    NamedRange,
    SheetAccess,
    Value,
    // Workbook types
    Workbook,
    WorkbookCalculationExt,
    Worksheet,
};
