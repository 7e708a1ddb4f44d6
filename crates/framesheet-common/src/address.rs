//! Sheet identity and address rendering options.

use std::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Sheet a region lives on, optionally qualified by its workbook.
///
/// Two regions are on the same sheet iff their `SheetRef`s compare equal.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SheetRef {
    name: String,
    workbook: Option<String>,
}

impl SheetRef {
    pub fn new(name: impl Into<String>) -> Self {
        SheetRef {
            name: name.into(),
            workbook: None,
        }
    }

    pub fn with_workbook(mut self, workbook: impl Into<String>) -> Self {
        self.workbook = Some(workbook.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn workbook(&self) -> Option<&str> {
        self.workbook.as_deref()
    }

    /// Whether a qualifier parsed from an address refers to this sheet.
    /// A qualifier without a workbook matches on the sheet name alone.
    pub fn accepts(&self, qualifier: &SheetRef) -> bool {
        self.name == qualifier.name
            && (qualifier.workbook.is_none() || qualifier.workbook == self.workbook)
    }
}

impl fmt::Display for SheetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::coord::qualifier(self, true))
    }
}

impl From<&str> for SheetRef {
    fn from(value: &str) -> Self {
        SheetRef::new(value)
    }
}

impl From<String> for SheetRef {
    fn from(value: String) -> Self {
        SheetRef::new(value)
    }
}

/// Options controlling how an address is rendered.
///
/// The default mirrors the host applications' own address getter:
/// fully absolute, no sheet qualifier, no `=` prefix.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AddressStyle {
    pub row_absolute: bool,
    pub column_absolute: bool,
    pub include_sheetname: bool,
    /// Qualify with the workbook name as well (implies nothing unless the
    /// sheet knows its workbook).
    pub external: bool,
    /// Prefix with `=` so the string can be written as a formula.
    pub formula: bool,
}

impl Default for AddressStyle {
    fn default() -> Self {
        Self::absolute()
    }
}

impl AddressStyle {
    pub const fn absolute() -> Self {
        AddressStyle {
            row_absolute: true,
            column_absolute: true,
            include_sheetname: false,
            external: false,
            formula: false,
        }
    }

    pub const fn relative() -> Self {
        AddressStyle {
            row_absolute: false,
            column_absolute: false,
            include_sheetname: false,
            external: false,
            formula: false,
        }
    }

    pub const fn with_sheetname(mut self) -> Self {
        self.include_sheetname = true;
        self
    }

    pub const fn with_external(mut self) -> Self {
        self.include_sheetname = true;
        self.external = true;
        self
    }

    pub const fn as_formula(mut self) -> Self {
        self.formula = true;
        self
    }

    pub const fn without_formula(mut self) -> Self {
        self.formula = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sheet_accepts_unqualified_book() {
        let sheet = SheetRef::new("Data").with_workbook("a.xlsx");
        assert!(sheet.accepts(&SheetRef::new("Data")));
        assert!(sheet.accepts(&SheetRef::new("Data").with_workbook("a.xlsx")));
        assert!(!sheet.accepts(&SheetRef::new("Data").with_workbook("b.xlsx")));
        assert!(!sheet.accepts(&SheetRef::new("Other")));
    }

    #[test]
    fn display_is_fully_qualified() {
        let sheet = SheetRef::new("My Data").with_workbook("a.xlsx");
        assert_eq!(sheet.to_string(), "'[a.xlsx]My Data'");
        assert_eq!(SheetRef::new("Data").to_string(), "Data");
    }

    #[test]
    fn style_builders() {
        let style = AddressStyle::relative().with_external().as_formula();
        assert!(style.include_sheetname && style.external && style.formula);
        assert!(!style.row_absolute && !style.column_absolute);
        assert_eq!(AddressStyle::default(), AddressStyle::absolute());
    }
}
