//! Row property metadata (height, hidden, outline). Distinct from the addressing `Row` type in `cell::address`.

use crate::cell::CellValue;
use std::collections::BTreeMap;

/// Per-row display properties.
#[derive(Debug, Clone)]
pub struct RowProperties {
    /// Row index (0-based)
    pub index: u32,
    /// Custom height (None = default)
    pub height: Option<f64>,
    /// Row is hidden
    pub hidden: bool,
    /// Outline/grouping level (0-7)
    pub outline_level: u8,
    /// Row-level style index (None = no row style)
    pub style_index: Option<u32>,
    /// Row is collapsed (in outline)
    pub collapsed: bool,
}

impl RowProperties {
    /// Create a new row with default settings
    pub fn new(index: u32) -> Self {
        Self {
            index,
            height: None,
            hidden: false,
            outline_level: 0,
            style_index: None,
            collapsed: false,
        }
    }

    /// Check if this row has any custom settings
    pub fn has_custom_settings(&self) -> bool {
        self.height.is_some()
            || self.hidden
            || self.outline_level > 0
            || self.style_index.is_some()
            || self.collapsed
    }
}

/// One row yielded by a streaming worksheet reader: 1-based row index plus
/// the non-empty cells found in it, keyed by 0-based column index. Absent
/// columns are empty cells; the map never carries an entry for them.
#[derive(Debug, Clone, Default)]
pub struct RowData {
    pub row_index: u32,
    pub cells: BTreeMap<u32, CellValue>,
}

impl RowData {
    pub fn new(row_index: u32, cells: BTreeMap<u32, CellValue>) -> Self {
        Self { row_index, cells }
    }

    pub fn cell(&self, col: u32) -> Option<&CellValue> {
        self.cells.get(&col)
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }
}
