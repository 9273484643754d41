//! Workbook: an ordered, immutable collection of sheets.

use crate::cell::SheetName;
use crate::error::{Error, Result};
use crate::sheet::Sheet;

/// A workbook. Always holds at least one sheet; sheet names are unique
/// case-insensitively. Like [`Sheet`], every method that looks like a
/// mutation returns a new `Workbook`.
#[derive(Debug, Clone)]
pub struct Workbook {
    sheets: Vec<Sheet>,
    settings: WorkbookSettings,
    active_sheet: usize,
}

impl Workbook {
    /// A new workbook containing a single empty sheet named "Sheet1".
    pub fn new() -> Self {
        let sheet = Sheet::new(SheetName::new("Sheet1").expect("'Sheet1' is a valid sheet name"));
        Self { sheets: vec![sheet], settings: WorkbookSettings::default(), active_sheet: 0 }
    }

    /// Build a workbook from an already-validated, non-empty list of sheets
    /// with unique names. Returns [`Error::InvalidSheetName`] if `sheets` is
    /// empty, or [`Error::DuplicateSheetName`] on the first repeated name.
    pub fn from_sheets(sheets: Vec<Sheet>) -> Result<Self> {
        if sheets.is_empty() {
            return Err(Error::InvalidSheetName("a workbook must contain at least one sheet".into()));
        }
        Self::check_unique(&sheets)?;
        Ok(Self { sheets, settings: WorkbookSettings::default(), active_sheet: 0 })
    }

    fn check_unique(sheets: &[Sheet]) -> Result<()> {
        for (i, a) in sheets.iter().enumerate() {
            for b in sheets.iter().skip(i + 1) {
                if a.name().as_str().eq_ignore_ascii_case(b.name().as_str()) {
                    return Err(Error::DuplicateSheetName(b.name().as_str().to_string()));
                }
            }
        }
        Ok(())
    }

    pub fn sheet_count(&self) -> usize {
        self.sheets.len()
    }

    pub fn sheets(&self) -> &[Sheet] {
        &self.sheets
    }

    pub fn sheet(&self, index: usize) -> Result<&Sheet> {
        self.sheets.get(index).ok_or(Error::SheetOutOfBounds(index, self.sheets.len()))
    }

    pub fn sheet_by_name(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name().as_str().eq_ignore_ascii_case(name))
            .ok_or_else(|| Error::SheetNotFound(name.to_string()))
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name().as_str().eq_ignore_ascii_case(name))
    }

    /// Replace the sheet at `index`, e.g. with the result of a patch apply.
    pub fn with_sheet(&self, index: usize, sheet: Sheet) -> Result<Self> {
        if index >= self.sheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.sheets.len()));
        }
        let mut sheets = self.sheets.clone();
        sheets[index] = sheet;
        Self::check_unique(&sheets)?;
        Ok(Self { sheets, ..self.clone() })
    }

    /// Append `sheet` after the last one.
    pub fn with_added_sheet(&self, sheet: Sheet) -> Result<Self> {
        let mut sheets = self.sheets.clone();
        sheets.push(sheet);
        Self::check_unique(&sheets)?;
        Ok(Self { sheets, ..self.clone() })
    }

    /// Insert `sheet` at `index`, shifting subsequent sheets right.
    pub fn with_inserted_sheet(&self, index: usize, sheet: Sheet) -> Result<Self> {
        if index > self.sheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.sheets.len()));
        }
        let mut sheets = self.sheets.clone();
        sheets.insert(index, sheet);
        Self::check_unique(&sheets)?;
        let active_sheet =
            if self.active_sheet >= index { self.active_sheet.saturating_add(1) } else { self.active_sheet };
        Ok(Self { sheets, active_sheet, ..self.clone() })
    }

    /// Remove the sheet at `index`. Fails rather than produce an empty workbook.
    pub fn with_removed_sheet(&self, index: usize) -> Result<Self> {
        if index >= self.sheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.sheets.len()));
        }
        if self.sheets.len() == 1 {
            return Err(Error::InvalidSheetName("a workbook must contain at least one sheet".into()));
        }
        let mut sheets = self.sheets.clone();
        sheets.remove(index);
        let active_sheet = self.active_sheet.min(sheets.len() - 1);
        Ok(Self { sheets, active_sheet, ..self.clone() })
    }

    /// Move the sheet at `from` to position `to`.
    pub fn with_moved_sheet(&self, from: usize, to: usize) -> Result<Self> {
        if from >= self.sheets.len() {
            return Err(Error::SheetOutOfBounds(from, self.sheets.len()));
        }
        if to >= self.sheets.len() {
            return Err(Error::SheetOutOfBounds(to, self.sheets.len()));
        }
        let mut sheets = self.sheets.clone();
        let sheet = sheets.remove(from);
        sheets.insert(to, sheet);
        Ok(Self { sheets, ..self.clone() })
    }

    /// Rename the sheet at `index`.
    pub fn with_renamed_sheet(&self, index: usize, name: SheetName) -> Result<Self> {
        let sheet = self.sheet(index)?.with_name(name);
        self.with_sheet(index, sheet)
    }

    pub fn active_sheet(&self) -> usize {
        self.active_sheet
    }

    pub fn with_active_sheet(&self, index: usize) -> Result<Self> {
        if index >= self.sheets.len() {
            return Err(Error::SheetOutOfBounds(index, self.sheets.len()));
        }
        Ok(Self { active_sheet: index, ..self.clone() })
    }

    pub fn settings(&self) -> &WorkbookSettings {
        &self.settings
    }

    pub fn with_settings(&self, settings: WorkbookSettings) -> Self {
        Self { settings, ..self.clone() }
    }
}

impl Default for Workbook {
    fn default() -> Self {
        Self::new()
    }
}

/// Workbook-level settings that aren't per-sheet state.
#[derive(Debug, Clone)]
pub struct WorkbookSettings {
    /// Date system: false = 1900 (Windows), true = 1904 (Mac).
    pub date_1904: bool,
    pub protected: bool,
    pub calc_on_open: bool,
    pub theme: Option<String>,
}

impl Default for WorkbookSettings {
    fn default() -> Self {
        Self { date_1904: false, protected: false, calc_on_open: true, theme: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet(name: &str) -> Sheet {
        Sheet::new(SheetName::new(name).unwrap())
    }

    #[test]
    fn new_workbook_has_one_sheet() {
        let wb = Workbook::new();
        assert_eq!(wb.sheet_count(), 1);
        assert_eq!(wb.sheet(0).unwrap().name().as_str(), "Sheet1");
    }

    #[test]
    fn with_added_sheet_detects_duplicate() {
        let wb = Workbook::new();
        assert!(wb.with_added_sheet(sheet("SHEET1")).is_err());
        assert!(wb.with_added_sheet(sheet("Data")).is_ok());
    }

    #[test]
    fn with_removed_sheet_rejects_last_sheet() {
        let wb = Workbook::new();
        assert!(wb.with_removed_sheet(0).is_err());
    }

    #[test]
    fn with_moved_sheet_reorders() {
        let wb = Workbook::new()
            .with_added_sheet(sheet("A"))
            .unwrap()
            .with_added_sheet(sheet("B"))
            .unwrap()
            .with_added_sheet(sheet("C"))
            .unwrap();
        let wb = wb.with_moved_sheet(3, 1).unwrap();
        let names: Vec<&str> = wb.sheets().iter().map(|s| s.name().as_str()).collect();
        assert_eq!(names, vec!["Sheet1", "C", "A", "B"]);
    }

    #[test]
    fn original_workbook_unaffected_by_derived_update() {
        let wb0 = Workbook::new();
        let wb1 = wb0.with_added_sheet(sheet("Data")).unwrap();
        assert_eq!(wb0.sheet_count(), 1);
        assert_eq!(wb1.sheet_count(), 2);
    }

    #[test]
    fn sheet_by_name_is_case_insensitive() {
        let wb = Workbook::new();
        assert!(wb.sheet_by_name("sheet1").is_ok());
        assert!(wb.sheet_by_name("missing").is_err());
    }
}
