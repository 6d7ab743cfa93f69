//! A collection of worksheets and defined names

use crate::error::{Error, Result};
use crate::named_range::NamedRange;
use crate::worksheet::Worksheet;
use ahash::AHashMap;

/// An in-memory workbook
///
/// Sheet order is significant: 3-D references span sheets by index. Sheet
/// and defined-name lookups are case-insensitive.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Worksheet>,
    /// Defined names keyed by lowercased name
    names: AHashMap<String, NamedRange>,
}

impl Workbook {
    /// Create a workbook with a single empty sheet named `Sheet1`
    pub fn new() -> Self {
        let sheet = Worksheet::new("Sheet1").expect("default sheet name is valid");
        Self {
            sheets: vec![sheet],
            names: AHashMap::new(),
        }
    }

    /// Create a workbook with no sheets
    pub fn empty() -> Self {
        Self {
            sheets: Vec::new(),
            names: AHashMap::new(),
        }
    }

    /// Append a new empty sheet; name collisions are rejected case-insensitively
    pub fn add_worksheet(&mut self, name: impl Into<String>) -> Result<&mut Worksheet> {
        let name = name.into();
        if self.sheet_index(&name).is_some() {
            return Err(Error::DuplicateSheetName(name));
        }
        self.sheets.push(Worksheet::new(name)?);
        let last = self.sheets.len() - 1;
        Ok(&mut self.sheets[last])
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    /// Find a sheet's position by name, case-insensitively
    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets
            .iter()
            .position(|s| s.name().eq_ignore_ascii_case(name))
    }

    pub fn sheet(&self, name: &str) -> Option<&Worksheet> {
        self.sheet_index(name).map(|i| &self.sheets[i])
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Worksheet> {
        self.sheet_index(name).and_then(|i| self.sheets.get_mut(i))
    }

    pub fn sheet_at(&self, index: usize) -> Option<&Worksheet> {
        self.sheets.get(index)
    }

    pub fn sheet_at_mut(&mut self, index: usize) -> Option<&mut Worksheet> {
        self.sheets.get_mut(index)
    }

    /// Sheet names in workbook order
    pub fn sheet_names(&self) -> Vec<String> {
        self.sheets.iter().map(|s| s.name().to_string()).collect()
    }

    pub fn sheets(&self) -> impl Iterator<Item = &Worksheet> {
        self.sheets.iter()
    }

    pub fn sheets_mut(&mut self) -> impl Iterator<Item = &mut Worksheet> {
        self.sheets.iter_mut()
    }

    pub fn remove_sheet(&mut self, name: &str) -> Result<Worksheet> {
        let index = self
            .sheet_index(name)
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))?;
        Ok(self.sheets.remove(index))
    }

    /// Define a workbook-scoped name; redefining replaces the old target
    pub fn define_name(
        &mut self,
        name: impl Into<String>,
        refers_to: impl Into<String>,
    ) -> Result<()> {
        let named = NamedRange::new(name, refers_to)?;
        self.names.insert(named.name.to_lowercase(), named);
        Ok(())
    }

    /// Look up a defined name, case-insensitively
    pub fn defined_name(&self, name: &str) -> Option<&NamedRange> {
        self.names.get(&name.to_lowercase())
    }

    pub fn remove_name(&mut self, name: &str) -> Option<NamedRange> {
        self.names.remove(&name.to_lowercase())
    }

    pub fn defined_names(&self) -> impl Iterator<Item = &NamedRange> {
        self.names.values()
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn new_workbook_has_sheet1() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_names(), vec!["Sheet1"]);
        assert!(wb.sheet("sheet1").is_some());
    }

    #[test]
    fn add_and_remove_sheets() {
        let mut wb = Workbook::new();
        wb.add_worksheet("Data").unwrap();
        assert_eq!(wb.sheet_count(), 2);
        assert_eq!(wb.sheet_index("DATA"), Some(1));

        assert!(matches!(
            wb.add_worksheet("data"),
            Err(Error::DuplicateSheetName(_))
        ));

        let removed = wb.remove_sheet("Data").unwrap();
        assert_eq!(removed.name(), "Data");
        assert!(wb.remove_sheet("Data").is_err());
    }

    #[test]
    fn defined_names_are_case_insensitive() {
        let mut wb = Workbook::new();
        wb.define_name("Sales", "Sheet1!A1:A10").unwrap();
        assert_eq!(wb.defined_name("SALES").unwrap().refers_to, "Sheet1!A1:A10");

        wb.define_name("sales", "Sheet1!B1:B10").unwrap();
        assert_eq!(wb.defined_name("Sales").unwrap().refers_to, "Sheet1!B1:B10");

        assert!(wb.define_name("A1", "Sheet1!B2").is_err());
    }
}
