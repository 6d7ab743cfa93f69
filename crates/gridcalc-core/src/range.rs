//! Rectangular cell ranges

use crate::address::CellAddress;
use crate::error::{Error, Result};
use std::fmt;

/// A rectangular span of cells between two corner addresses
///
/// Corners are stored as given; [`CellRange::normalized`] reorders them so
/// `start` is the top-left corner. Iteration is always over the normalized
/// rectangle in row-major order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellRange {
    pub start: CellAddress,
    pub end: CellAddress,
}

impl CellRange {
    pub fn new(start: CellAddress, end: CellAddress) -> Self {
        Self { start, end }
    }

    /// A range covering a single cell
    pub fn single(addr: CellAddress) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    /// Parse `A1:B2` notation; a bare address parses as a single-cell range
    pub fn parse(s: &str) -> Result<Self> {
        match s.split_once(':') {
            Some((a, b)) => {
                let start = CellAddress::parse(a)?;
                let end = CellAddress::parse(b)?;
                Ok(Self { start, end })
            }
            None => Ok(Self::single(CellAddress::parse(s)?)),
        }
    }

    /// The same range with corners reordered top-left / bottom-right
    pub fn normalized(&self) -> Self {
        let (top, bottom) = if self.start.row <= self.end.row {
            (self.start.row, self.end.row)
        } else {
            (self.end.row, self.start.row)
        };
        let (left, right) = if self.start.col <= self.end.col {
            (self.start.col, self.end.col)
        } else {
            (self.end.col, self.start.col)
        };
        Self {
            start: CellAddress::new(top, left),
            end: CellAddress::new(bottom, right),
        }
    }

    /// Number of rows in the (normalized) rectangle
    pub fn height(&self) -> u32 {
        let n = self.normalized();
        n.end.row - n.start.row + 1
    }

    /// Number of columns in the (normalized) rectangle
    pub fn width(&self) -> u16 {
        let n = self.normalized();
        n.end.col - n.start.col + 1
    }

    pub fn cell_count(&self) -> u64 {
        self.height() as u64 * self.width() as u64
    }

    pub fn contains(&self, addr: &CellAddress) -> bool {
        let n = self.normalized();
        addr.row >= n.start.row
            && addr.row <= n.end.row
            && addr.col >= n.start.col
            && addr.col <= n.end.col
    }

    /// Iterate over cell coordinates in row-major order
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> {
        let n = self.normalized();
        (n.start.row..=n.end.row).flat_map(move |row| {
            (n.start.col..=n.end.col).map(move |col| CellAddress::new(row, col))
        })
    }

    /// Format as `A1:B2` notation; single-cell ranges format as a bare address
    pub fn to_a1(&self) -> String {
        if self.start == self.end {
            self.start.to_a1()
        } else {
            format!("{}:{}", self.start.to_a1(), self.end.to_a1())
        }
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl From<CellAddress> for CellRange {
    fn from(addr: CellAddress) -> Self {
        Self::single(addr)
    }
}
