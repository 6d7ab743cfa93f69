//! Workbook-scoped defined names

use crate::error::{Error, Result};

/// A defined name mapping to a reference expression
///
/// `refers_to` holds reference text such as `Sheet1!A1:B2`; it is parsed by
/// the formula layer at resolution time, not here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedRange {
    pub name: String,
    pub refers_to: String,
}

impl NamedRange {
    pub fn new(name: impl Into<String>, refers_to: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self {
            name,
            refers_to: refers_to.into(),
        })
    }
}

/// Check that a defined name is well-formed: starts with a letter or `_`,
/// continues with letters, digits, `_` or `.`, and cannot be mistaken for
/// a cell address.
pub fn validate_name(name: &str) -> Result<()> {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => {}
        _ => return Err(Error::InvalidName(name.to_string())),
    }
    if !chars.all(|c| c.is_alphanumeric() || c == '_' || c == '.') {
        return Err(Error::InvalidName(name.to_string()));
    }
    if crate::address::CellAddress::parse(name).is_ok() {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_well_formed_names() {
        for name in ["Total", "_scratch", "tax.rate", "Q1_sales", "données"] {
            assert!(validate_name(name).is_ok(), "rejected {name:?}");
        }
    }

    #[test]
    fn rejects_malformed_names() {
        for name in ["", "1st", "has space", "a-b", "A1", "XFD1048576"] {
            assert!(validate_name(name).is_err(), "accepted {name:?}");
        }
    }

    #[test]
    fn constructor_validates() {
        assert!(NamedRange::new("Sales", "Sheet1!A1:A10").is_ok());
        assert!(NamedRange::new("B2", "Sheet1!A1").is_err());
    }
}
