//! Cell-related types: addressing, values, and the populated [`Cell`] record.

mod address;
mod cell_record;
mod value;

pub use address::{
    parse_anchored_cell, Anchor, ARef, CellRange, CellRangeIter, Column, RefType, Row, SheetName,
};
pub use cell_record::Cell;
pub use value::{CellError, CellValue, RichTextRun, SharedString, StringPool};

/// A hyperlink attached to a cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hyperlink {
    pub target: String,
    pub tooltip: Option<String>,
}

impl Hyperlink {
    pub fn new(target: impl Into<String>) -> Self {
        Self { target: target.into(), tooltip: None }
    }
}
