//! A single sheet of sparsely stored cells

use crate::address::CellAddress;
use crate::error::{Error, Result};
use crate::value::CellValue;
use crate::{MAX_COLS, MAX_ROWS, MAX_SHEET_NAME_LEN};
use ahash::AHashMap;

/// A named grid of cells
///
/// Storage is sparse: only cells that have been written exist in the map.
/// Reading an unset cell yields [`CellValue::Empty`].
#[derive(Debug, Clone)]
pub struct Worksheet {
    name: String,
    cells: AHashMap<(u32, u16), CellValue>,
}

impl Worksheet {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_sheet_name(&name)?;
        Ok(Self {
            name,
            cells: AHashMap::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        validate_sheet_name(&name)?;
        self.name = name;
        Ok(())
    }

    /// The stored value at an address; `Empty` for unset cells
    pub fn value(&self, addr: CellAddress) -> &CellValue {
        self.value_at(addr.row, addr.col)
    }

    /// The stored value at raw coordinates; `Empty` for unset cells
    pub fn value_at(&self, row: u32, col: u16) -> &CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.cells.get(&(row, col)).unwrap_or(&EMPTY)
    }

    pub fn set_value(&mut self, addr: CellAddress, value: impl Into<CellValue>) -> Result<()> {
        self.set_value_at(addr.row, addr.col, value)
    }

    pub fn set_value_at(
        &mut self,
        row: u32,
        col: u16,
        value: impl Into<CellValue>,
    ) -> Result<()> {
        check_bounds(row, col)?;
        let value = value.into();
        if value.is_empty() {
            self.cells.remove(&(row, col));
        } else {
            self.cells.insert((row, col), value);
        }
        Ok(())
    }

    /// Store formula text (without the leading `=`) at an address
    pub fn set_formula(&mut self, addr: CellAddress, text: impl Into<String>) -> Result<()> {
        check_bounds(addr.row, addr.col)?;
        self.cells
            .insert((addr.row, addr.col), CellValue::formula(text));
        Ok(())
    }

    /// Record the calculated result of a formula cell
    ///
    /// Fails with [`Error::NotAFormula`] if the cell does not hold a formula.
    pub fn set_cached_result(&mut self, addr: CellAddress, result: CellValue) -> Result<()> {
        match self.cells.get_mut(&(addr.row, addr.col)) {
            Some(CellValue::Formula { cached, .. }) => {
                *cached = Some(Box::new(result));
                Ok(())
            }
            _ => Err(Error::NotAFormula(addr.to_a1())),
        }
    }

    pub fn clear_cell(&mut self, addr: CellAddress) {
        self.cells.remove(&(addr.row, addr.col));
    }

    /// Number of cells holding a non-empty value
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Iterate over all stored cells in unspecified order
    pub fn cells(&self) -> impl Iterator<Item = (CellAddress, &CellValue)> {
        self.cells
            .iter()
            .map(|(&(row, col), value)| (CellAddress::new(row, col), value))
    }

    /// Iterate over cells holding formulas, yielding address and formula text
    pub fn formula_cells(&self) -> impl Iterator<Item = (CellAddress, &str)> {
        self.cells.iter().filter_map(|(&(row, col), value)| {
            value
                .formula_text()
                .map(|text| (CellAddress::new(row, col), text))
        })
    }
}

fn check_bounds(row: u32, col: u16) -> Result<()> {
    if row >= MAX_ROWS {
        return Err(Error::RowOutOfBounds(row, MAX_ROWS - 1));
    }
    if col >= MAX_COLS {
        return Err(Error::ColumnOutOfBounds(col, MAX_COLS - 1));
    }
    Ok(())
}

/// Check that a sheet name is usable: non-empty, within the length cap, and
/// free of the reserved characters `: \ / ? * [ ]`
pub fn validate_sheet_name(name: &str) -> Result<()> {
    if name.is_empty() || name.chars().count() > MAX_SHEET_NAME_LEN {
        return Err(Error::InvalidSheetName(name.to_string()));
    }
    if name.chars().any(|c| matches!(c, ':' | '\\' | '/' | '?' | '*' | '[' | ']')) {
        return Err(Error::InvalidSheetName(name.to_string()));
    }
    if name.starts_with('\'') || name.ends_with('\'') {
        return Err(Error::InvalidSheetName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn addr(s: &str) -> CellAddress {
        CellAddress::parse(s).unwrap()
    }

    #[test]
    fn unset_cells_read_empty() {
        let sheet = Worksheet::new("Sheet1").unwrap();
        assert_eq!(*sheet.value(addr("A1")), CellValue::Empty);
        assert_eq!(sheet.cell_count(), 0);
    }

    #[test]
    fn set_and_get_values() {
        let mut sheet = Worksheet::new("Sheet1").unwrap();
        sheet.set_value(addr("A1"), 42.0).unwrap();
        sheet.set_value(addr("B2"), "hello").unwrap();
        assert_eq!(*sheet.value(addr("A1")), CellValue::Number(42.0));
        assert_eq!(*sheet.value(addr("B2")), CellValue::Text("hello".into()));
        assert_eq!(sheet.cell_count(), 2);
    }

    #[test]
    fn writing_empty_clears_storage() {
        let mut sheet = Worksheet::new("Sheet1").unwrap();
        sheet.set_value(addr("A1"), 1.0).unwrap();
        sheet.set_value(addr("A1"), CellValue::Empty).unwrap();
        assert_eq!(sheet.cell_count(), 0);
    }

    #[test]
    fn formula_cells_and_cached_results() {
        let mut sheet = Worksheet::new("Sheet1").unwrap();
        sheet.set_formula(addr("A1"), "1+2").unwrap();
        sheet.set_value(addr("A2"), 5.0).unwrap();

        let formulas: Vec<_> = sheet.formula_cells().collect();
        assert_eq!(formulas, vec![(addr("A1"), "1+2")]);

        sheet
            .set_cached_result(addr("A1"), CellValue::Number(3.0))
            .unwrap();
        assert_eq!(sheet.value(addr("A1")).effective(), &CellValue::Number(3.0));

        assert!(sheet
            .set_cached_result(addr("A2"), CellValue::Number(0.0))
            .is_err());
    }

    #[test]
    fn bounds_are_enforced() {
        let mut sheet = Worksheet::new("Sheet1").unwrap();
        assert!(sheet.set_value_at(MAX_ROWS, 0, 1.0).is_err());
        assert!(sheet.set_value_at(0, MAX_COLS, 1.0).is_err());
    }

    #[test]
    fn sheet_name_validation() {
        assert!(Worksheet::new("Data 2024").is_ok());
        assert!(Worksheet::new("").is_err());
        assert!(Worksheet::new("a:b").is_err());
        assert!(Worksheet::new("x".repeat(32)).is_err());
    }
}
