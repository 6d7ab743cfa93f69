//! A1-style cell addressing

use crate::error::{Error, Result};
use crate::{MAX_COLS, MAX_ROWS};
use std::fmt;
use std::str::FromStr;

/// A single cell coordinate (e.g. `A1`, `$B$2`)
///
/// Rows and columns are 0-based internally; display is 1-based A1 notation.
/// The per-axis absolute flags record `$` markers from reference text. They
/// do not change which cell an address points at during one evaluation;
/// they exist so the formula layer can preserve the reference grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellAddress {
    /// Row index (0-based; row `1` in display)
    pub row: u32,
    /// Column index (0-based; `A` = 0, `XFD` = 16383)
    pub col: u16,
    /// Whether the row carries a `$` marker
    pub row_absolute: bool,
    /// Whether the column carries a `$` marker
    pub col_absolute: bool,
}

impl CellAddress {
    /// Create a relative address
    pub fn new(row: u32, col: u16) -> Self {
        Self {
            row,
            col,
            row_absolute: false,
            col_absolute: false,
        }
    }

    /// Create an address with explicit absolute flags
    pub fn with_flags(row: u32, col: u16, row_absolute: bool, col_absolute: bool) -> Self {
        Self {
            row,
            col,
            row_absolute,
            col_absolute,
        }
    }

    /// Parse A1-style notation, honoring `$` markers
    ///
    /// # Examples
    /// ```
    /// use gridcalc_core::CellAddress;
    ///
    /// let a1 = CellAddress::parse("A1").unwrap();
    /// assert_eq!((a1.row, a1.col), (0, 0));
    ///
    /// let b2 = CellAddress::parse("$B$2").unwrap();
    /// assert!(b2.row_absolute && b2.col_absolute);
    /// ```
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let mut chars = s.char_indices().peekable();

        let col_absolute = matches!(chars.peek(), Some((_, '$')));
        if col_absolute {
            chars.next();
        }

        let mut letters = String::new();
        while let Some((_, c)) = chars.peek() {
            if c.is_ascii_alphabetic() {
                letters.push(*c);
                chars.next();
            } else {
                break;
            }
        }
        if letters.is_empty() {
            return Err(Error::InvalidAddress(format!("no column letters in '{s}'")));
        }
        let col = Self::column_index(&letters)?;

        let row_absolute = matches!(chars.peek(), Some((_, '$')));
        if row_absolute {
            chars.next();
        }

        let digits: &str = match chars.peek() {
            Some((i, _)) => &s[*i..],
            None => return Err(Error::InvalidAddress(format!("no row number in '{s}'"))),
        };
        let row_1based: u32 = digits
            .parse()
            .map_err(|_| Error::InvalidAddress(format!("invalid row number in '{s}'")))?;
        if row_1based == 0 {
            return Err(Error::InvalidAddress(format!("row must be >= 1 in '{s}'")));
        }
        let row = row_1based - 1;
        if row >= MAX_ROWS {
            return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
        }

        Ok(Self {
            row,
            col,
            row_absolute,
            col_absolute,
        })
    }

    /// Convert a 0-based column index to letters (`0` -> `A`, `26` -> `AA`)
    pub fn column_label(col: u16) -> String {
        let mut letters = [0u8; 3];
        let mut len = 0;
        let mut n = col as u32 + 1;
        while n > 0 {
            n -= 1;
            letters[len] = b'A' + (n % 26) as u8;
            len += 1;
            n /= 26;
        }
        letters[..len].reverse();
        letters[..len].iter().map(|&b| b as char).collect()
    }

    /// Convert column letters to a 0-based index (`A` -> 0, `AA` -> 26)
    pub fn column_index(letters: &str) -> Result<u16> {
        if letters.is_empty() {
            return Err(Error::InvalidAddress("empty column letters".into()));
        }
        let mut col: u32 = 0;
        for c in letters.chars() {
            if !c.is_ascii_alphabetic() {
                return Err(Error::InvalidAddress(format!("bad column letter '{c}'")));
            }
            // Checked: 7+ letters overflow u32 before the bounds check below
            col = col
                .checked_mul(26)
                .and_then(|n| n.checked_add(c.to_ascii_uppercase() as u32 - 'A' as u32 + 1))
                .ok_or(Error::ColumnOutOfBounds(MAX_COLS, MAX_COLS - 1))?;
        }
        if col > MAX_COLS as u32 {
            return Err(Error::ColumnOutOfBounds(MAX_COLS, MAX_COLS - 1));
        }
        Ok((col - 1) as u16)
    }

    /// Format as A1 notation, including `$` markers
    pub fn to_a1(&self) -> String {
        let mut out = String::new();
        if self.col_absolute {
            out.push('$');
        }
        out.push_str(&Self::column_label(self.col));
        if self.row_absolute {
            out.push('$');
        }
        out.push_str(&(self.row + 1).to_string());
        out
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_a1())
    }
}

impl FromStr for CellAddress {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}
