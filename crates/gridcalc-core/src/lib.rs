//! # gridcalc-core
//!
//! The cell and workbook model the gridcalc formula engine evaluates
//! against. This crate owns the storage-side types:
//!
//! - [`CellValue`] and [`ErrorKind`] - typed cell contents, with spreadsheet
//!   error codes carried as ordinary data
//! - [`CellAddress`] and [`CellRange`] - A1-style addressing
//! - [`Worksheet`] and [`Workbook`] - a sparse, style-free sheet store
//! - [`NamedRange`] - the name -> refers-to table consulted by the engine
//!
//! File formats, styling, and persistence are deliberately absent; this is
//! the minimal document model the calculation engine and its tests need.
//!
//! ## Example
//!
//! ```rust
//! use gridcalc_core::{CellAddress, CellValue, Workbook};
//!
//! let mut workbook = Workbook::new();
//! let sheet = workbook.sheet_mut("Sheet1").unwrap();
//! let a1 = CellAddress::parse("A1").unwrap();
//! sheet.set_value(a1, 42.0).unwrap();
//! sheet.set_formula(CellAddress::parse("B1").unwrap(), "A1*2").unwrap();
//! assert_eq!(*sheet.value(a1), CellValue::Number(42.0));
//! ```

pub mod address;
pub mod error;
pub mod named_range;
pub mod range;
pub mod value;
pub mod workbook;
pub mod worksheet;

pub use address::CellAddress;
pub use error::{Error, Result};
pub use named_range::NamedRange;
pub use range::CellRange;
pub use value::{CellValue, ErrorKind};
pub use workbook::Workbook;
pub use worksheet::Worksheet;

/// Maximum number of rows in a worksheet (Excel limit)
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit)
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name
pub const MAX_SHEET_NAME_LEN: usize = 31;
