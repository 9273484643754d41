//! The immutable worksheet value: cells, merges, row/column properties, and
//! a per-sheet style registry, plus the bulk operations defined over them.

use crate::cell::{ARef, Cell, CellRange, CellValue, SheetName};
use crate::column::ColumnProperties;
use crate::comment::CellComment;
use crate::error::{Error, Result};
use crate::row::RowProperties;
use crate::style::{CellStyle, StyleId, StyleRegistry};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A table region (structured reference target). Kept minimal: the codec
/// and formula engine only need the name and the range it covers.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    pub name: String,
    pub range: CellRange,
    pub has_header_row: bool,
}

/// Print/page setup for a worksheet. Carries only the settings the codec
/// round-trips; most workbooks never customize these.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PageSetup {
    pub orientation_landscape: bool,
    pub fit_to_width: Option<u32>,
    pub fit_to_height: Option<u32>,
    pub paper_size: Option<u32>,
}

/// An immutable worksheet. All mutating-looking methods (`put`, `merge`,
/// `clear_in_range`, ...) return a new `Sheet`; none of them touch `self`.
///
/// `cells` and `merged_ranges` are `Arc`-wrapped so that an update shares
/// structure with the sheet it was derived from: [`Arc::make_mut`] clones the
/// pointee only when more than one owner is live.
#[derive(Debug, Clone)]
pub struct Sheet {
    name: SheetName,
    cells: Arc<BTreeMap<ARef, Cell>>,
    merged_ranges: Arc<Vec<CellRange>>,
    column_properties: Arc<Vec<ColumnProperties>>,
    row_properties: Arc<Vec<RowProperties>>,
    default_column_width: Option<f64>,
    default_row_height: Option<f64>,
    style_registry: StyleRegistry,
    tables: Arc<Vec<Table>>,
    page_setup: Option<PageSetup>,
}

impl Sheet {
    /// A new, empty sheet with the given name and a fresh default style registry.
    pub fn new(name: SheetName) -> Self {
        Self {
            name,
            cells: Arc::new(BTreeMap::new()),
            merged_ranges: Arc::new(Vec::new()),
            column_properties: Arc::new(Vec::new()),
            row_properties: Arc::new(Vec::new()),
            default_column_width: None,
            default_row_height: None,
            style_registry: StyleRegistry::new(),
            tables: Arc::new(Vec::new()),
            page_setup: None,
        }
    }

    pub fn name(&self) -> &SheetName {
        &self.name
    }

    pub fn with_name(&self, name: SheetName) -> Self {
        Self { name, ..self.clone() }
    }

    pub fn style_registry(&self) -> &StyleRegistry {
        &self.style_registry
    }

    pub fn merged_ranges(&self) -> &[CellRange] {
        &self.merged_ranges
    }

    pub fn column_properties(&self) -> &[ColumnProperties] {
        &self.column_properties
    }

    pub fn row_properties(&self) -> &[RowProperties] {
        &self.row_properties
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn page_setup(&self) -> Option<&PageSetup> {
        self.page_setup.as_ref()
    }

    pub fn with_page_setup(&self, page_setup: PageSetup) -> Self {
        Self { page_setup: Some(page_setup), ..self.clone() }
    }

    pub fn with_default_column_width(&self, width: f64) -> Self {
        Self { default_column_width: Some(width), ..self.clone() }
    }

    pub fn with_default_row_height(&self, height: f64) -> Self {
        Self { default_row_height: Some(height), ..self.clone() }
    }

    /// Number of populated cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Read never fails for a valid ref: absent cells yield `Cell::empty`.
    pub fn get(&self, reference: ARef) -> Cell {
        self.cells.get(&reference).cloned().unwrap_or_else(|| Cell::empty(reference))
    }

    /// A lazy iterator of the populated cells within `range`. Does not
    /// materialize the range itself, so full-column/full-row ranges are safe
    /// to pass.
    pub fn get_range(&self, range: CellRange) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.values().filter(move |c| range.contains(c.reference))
    }

    /// Replace the value at `reference`, preserving any existing style,
    /// comment, and hyperlink. A plain value write, with no codec-inferred
    /// style merge; see [`Sheet::put_styled`] for that.
    pub fn put(&self, reference: ARef, value: CellValue) -> Self {
        let mut cells = (*self.cells).clone();
        let cell = cells.get(&reference).cloned().unwrap_or_else(|| Cell::empty(reference));
        cells.insert(reference, cell.with_value(value));
        Self { cells: Arc::new(cells), ..self.clone() }
    }

    /// Write a value together with a codec-proposed style. If the cell
    /// already carries a style, the two are merged: explicit properties win,
    /// but if the existing style's number format is `General` and the codec
    /// proposes a non-`General` format, the codec's format is adopted. This
    /// lets a user-chosen Currency format survive a re-put while still
    /// giving a freshly-typed date cell a date format by default.
    pub fn put_styled(&self, reference: ARef, value: CellValue, proposed: CellStyle) -> Self {
        let mut cells = (*self.cells).clone();
        let existing = cells.get(&reference).cloned().unwrap_or_else(|| Cell::empty(reference));
        let merged_style = match existing.style_id.and_then(|id| self.style_registry.get(id).cloned()) {
            Some(mut current) => {
                if current.number_format.is_general() && !proposed.number_format.is_general() {
                    current.number_format = proposed.number_format.clone();
                }
                current
            }
            None => proposed,
        };
        let (registry, style_id) = self.style_registry.register(merged_style);
        cells.insert(reference, existing.with_value(value).with_style_id(style_id));
        Self { cells: Arc::new(cells), style_registry: registry, ..self.clone() }
    }

    /// Set only the style id of a cell, leaving its value untouched.
    pub fn set_style(&self, reference: ARef, style_id: StyleId) -> Self {
        let mut cells = (*self.cells).clone();
        let cell = cells.get(&reference).cloned().unwrap_or_else(|| Cell::empty(reference));
        cells.insert(reference, cell.with_style_id(style_id));
        Self { cells: Arc::new(cells), ..self.clone() }
    }

    /// Register `style` and set it on the cell in one step.
    pub fn set_cell_style(&self, reference: ARef, style: CellStyle) -> Self {
        let (registry, id) = self.style_registry.register(style);
        let mut cells = (*self.cells).clone();
        let cell = cells.get(&reference).cloned().unwrap_or_else(|| Cell::empty(reference));
        cells.insert(reference, cell.with_style_id(id));
        Self { cells: Arc::new(cells), style_registry: registry, ..self.clone() }
    }

    /// Remove any style from the cell, reverting it to the default style.
    pub fn clear_style(&self, reference: ARef) -> Self {
        let mut cells = (*self.cells).clone();
        if let Some(cell) = cells.get(&reference).cloned() {
            let mut cell = cell;
            cell.style_id = None;
            cells.insert(reference, cell);
        }
        Self { cells: Arc::new(cells), ..self.clone() }
    }

    /// Bulk put: a single pass over `values`, accumulated into a local
    /// buffer never observable outside this call, then committed as one
    /// structural update. Faster than folding single `put` calls because it
    /// clones the map once instead of once per item.
    pub fn bulk_put<I>(&self, values: I) -> Self
    where
        I: IntoIterator<Item = (ARef, CellValue)>,
    {
        let mut cells = (*self.cells).clone();
        for (reference, value) in values {
            let cell = cells.get(&reference).cloned().unwrap_or_else(|| Cell::empty(reference));
            cells.insert(reference, cell.with_value(value));
        }
        Self { cells: Arc::new(cells), ..self.clone() }
    }

    /// The bounding box of all non-empty cells, computed in a single pass.
    /// `None` for an empty sheet.
    pub fn used_range(&self) -> Option<CellRange> {
        let mut iter = self.cells.values().filter(|c| !c.is_empty());
        let first = iter.next()?;
        let (mut min_col, mut min_row, mut max_col, mut max_row) = (
            first.reference.col(),
            first.reference.row(),
            first.reference.col(),
            first.reference.row(),
        );
        for cell in iter {
            let (col, row) = (cell.reference.col(), cell.reference.row());
            min_col = min_col.min(col);
            min_row = min_row.min(row);
            max_col = max_col.max(col);
            max_row = max_row.max(row);
        }
        Some(CellRange::new(
            ARef::new(min_row, min_col),
            crate::cell::Anchor::Relative,
            ARef::new(max_row, max_col),
            crate::cell::Anchor::Relative,
        ))
    }

    /// Remove all cells whose reference lies in `range`, without
    /// materializing the range (a filter over the existing entries, not an
    /// iteration of the range itself).
    pub fn clear_in_range(&self, range: CellRange) -> Self {
        let cells: BTreeMap<ARef, Cell> =
            (*self.cells).clone().into_iter().filter(|(r, _)| !range.contains(*r)).collect();
        Self { cells: Arc::new(cells), ..self.clone() }
    }

    /// Strip style ids (not values) from every cell in `range`.
    pub fn clear_styles_in_range(&self, range: CellRange) -> Self {
        let mut cells = (*self.cells).clone();
        for (reference, cell) in cells.iter_mut() {
            if range.contains(*reference) {
                cell.style_id = None;
            }
        }
        Self { cells: Arc::new(cells), ..self.clone() }
    }

    /// Strip comments from every cell in `range`.
    pub fn clear_comments_in_range(&self, range: CellRange) -> Self {
        let mut cells = (*self.cells).clone();
        for (reference, cell) in cells.iter_mut() {
            if range.contains(*reference) {
                cell.comment = None;
            }
        }
        Self { cells: Arc::new(cells), ..self.clone() }
    }

    pub fn set_comment(&self, reference: ARef, comment: CellComment) -> Self {
        let mut cells = (*self.cells).clone();
        let mut cell = cells.get(&reference).cloned().unwrap_or_else(|| Cell::empty(reference));
        cell.comment = Some(comment);
        cells.insert(reference, cell);
        Self { cells: Arc::new(cells), ..self.clone() }
    }

    /// Add `range` to the merged-range set. Overlap with an existing merge
    /// is not checked here (the invariant is unchecked at construction per
    /// the data model) — it is surfaced as [`Error::MergeOverlap`] only when
    /// the codec writes the sheet.
    pub fn merge(&self, range: CellRange) -> Self {
        let mut ranges = (*self.merged_ranges).clone();
        ranges.push(range);
        Self { merged_ranges: Arc::new(ranges), ..self.clone() }
    }

    /// Remove an exact match from the merged-range set; a non-matching
    /// range leaves the sheet unchanged.
    pub fn unmerge(&self, range: CellRange) -> Self {
        let ranges: Vec<CellRange> =
            (*self.merged_ranges).iter().filter(|r| **r != range).cloned().collect();
        Self { merged_ranges: Arc::new(ranges), ..self.clone() }
    }

    /// Check the no-overlap invariant over the current merged-range set.
    /// Called by the codec before writing; not enforced at merge time.
    pub fn validate_merges(&self) -> Result<()> {
        for (i, a) in self.merged_ranges.iter().enumerate() {
            for b in self.merged_ranges.iter().skip(i + 1) {
                if a.overlaps(b) {
                    return Err(Error::MergeOverlap(a.to_a1(), b.to_a1()));
                }
            }
        }
        Ok(())
    }

    /// All formula cells, for dependency-graph construction.
    pub fn formula_cells(&self) -> impl Iterator<Item = &Cell> + '_ {
        self.cells.values().filter(|c| c.value.is_formula())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&ARef, &Cell)> + '_ {
        self.cells.iter()
    }
}

impl PartialEq for Sheet {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name && self.cells == other.cells && self.merged_ranges == other.merged_ranges
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{Anchor, Column, Row};

    fn sheet() -> Sheet {
        Sheet::new(SheetName::new("Sheet1").unwrap())
    }

    fn aref(row: u32, col: u32) -> ARef {
        ARef::new(Row::new(row).unwrap(), Column::new(col).unwrap())
    }

    #[test]
    fn put_preserves_other_keys() {
        let s = sheet().put(aref(0, 0), CellValue::from(1i64)).put(aref(0, 1), CellValue::from(2i64));
        let s2 = s.put(aref(0, 0), CellValue::from(99i64));
        assert_eq!(s2.get(aref(0, 0)).value, CellValue::from(99i64));
        assert_eq!(s2.get(aref(0, 1)).value, CellValue::from(2i64));
    }

    #[test]
    fn get_absent_is_empty() {
        let s = sheet();
        let c = s.get(aref(5, 5));
        assert!(c.is_empty());
    }

    #[test]
    fn put_styled_adopts_codec_format_when_general() {
        let s = sheet();
        let date_style = CellStyle::new().number_format(crate::style::NumberFormat::Date);
        let s = s.put_styled(aref(0, 0), CellValue::from(1i64), date_style.clone());
        let id = s.get(aref(0, 0)).style_id.unwrap();
        assert_eq!(s.style_registry().get(id), Some(&date_style));
    }

    #[test]
    fn put_styled_keeps_explicit_non_general_format() {
        let s = sheet();
        let currency = CellStyle::new().number_format(crate::style::NumberFormat::Currency);
        let s = s.set_cell_style(aref(0, 0), currency.clone());
        let s = s.put_styled(
            aref(0, 0),
            CellValue::from(1i64),
            CellStyle::new().number_format(crate::style::NumberFormat::Date),
        );
        let id = s.get(aref(0, 0)).style_id.unwrap();
        assert_eq!(s.style_registry().get(id).unwrap().number_format, crate::style::NumberFormat::Currency);
    }

    #[test]
    fn bulk_put_matches_fold_of_single_puts() {
        let values: Vec<(ARef, CellValue)> =
            (0..10).map(|i| (aref(0, i), CellValue::from(i as i64))).collect();
        let bulk = sheet().bulk_put(values.clone());
        let folded = values.into_iter().fold(sheet(), |s, (r, v)| s.put(r, v));
        assert_eq!(bulk, folded);
    }

    #[test]
    fn used_range_single_pass() {
        let s = sheet().put(aref(2, 1), CellValue::from(1i64)).put(aref(5, 4), CellValue::from(2i64));
        let r = s.used_range().unwrap();
        assert_eq!(r.start, aref(2, 1));
        assert_eq!(r.end, aref(5, 4));
    }

    #[test]
    fn used_range_empty_sheet_is_none() {
        assert!(sheet().used_range().is_none());
    }

    #[test]
    fn clear_in_range_uses_contains_filter() {
        let s = sheet().put(aref(0, 0), CellValue::from(1i64)).put(aref(10, 10), CellValue::from(2i64));
        let range = CellRange::new(aref(0, 0), Anchor::Relative, aref(1, 1), Anchor::Relative);
        let s2 = s.clear_in_range(range);
        assert!(s2.get(aref(0, 0)).is_empty());
        assert_eq!(s2.get(aref(10, 10)).value, CellValue::from(2i64));
    }

    #[test]
    fn merge_and_unmerge_round_trip() {
        let range = CellRange::new(aref(0, 0), Anchor::Relative, aref(0, 2), Anchor::Relative);
        let s = sheet().merge(range);
        assert_eq!(s.merged_ranges(), &[range]);
        let s = s.unmerge(range);
        assert!(s.merged_ranges().is_empty());
    }

    #[test]
    fn validate_merges_detects_overlap() {
        let a = CellRange::new(aref(0, 0), Anchor::Relative, aref(0, 2), Anchor::Relative);
        let b = CellRange::new(aref(0, 1), Anchor::Relative, aref(0, 3), Anchor::Relative);
        let s = sheet().merge(a).merge(b);
        assert!(s.validate_merges().is_err());
    }
}
