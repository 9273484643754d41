//! # xlforge-core
//!
//! Core, purely functional data model for the xlforge spreadsheet library:
//! addressing, cell values, the style registry, sheets, workbooks, and the
//! patch algebra used to edit them.
//!
//! - [`cell::ARef`], [`cell::CellRange`], [`cell::RefType`] — opaque, packed
//!   addressing and A1 parsing/formatting.
//! - [`cell::CellValue`], [`cell::Cell`] — the tagged cell value and the
//!   populated cell record.
//! - [`style::StyleRegistry`] — content-addressed interning of [`style::CellStyle`].
//! - [`sheet::Sheet`], [`workbook::Workbook`] — immutable document structures.
//! - [`patch::Patch`], [`patch::apply`] — the composable edit monoid.
//!
//! ## Example
//!
//! ```rust
//! use xlforge_core::{Workbook, Sheet, SheetName, ARef, Row, Column, CellValue};
//!
//! let wb = Workbook::new();
//! let sheet = wb.sheet(0).unwrap();
//! let a1 = ARef::new(Row::new(0).unwrap(), Column::new(0).unwrap());
//! let sheet = sheet.put(a1, CellValue::text("Hello"));
//! assert_eq!(sheet.get(a1).value, CellValue::text("Hello"));
//! ```

pub mod cell;
pub mod column;
pub mod comment;
pub mod error;
pub mod patch;
pub mod row;
pub mod sheet;
pub mod style;
pub mod workbook;

pub use cell::{
    parse_anchored_cell, Anchor, ARef, Cell, CellError, CellRange, CellRangeIter, CellValue,
    Column, Hyperlink, RefType, RichTextRun, Row, SharedString, SheetName, StringPool,
};
pub use column::{ColumnData, ColumnProperties};
pub use comment::CellComment;
pub use error::{Error, Result};
pub use patch::{apply, Patch};
pub use row::{RowData, RowProperties};
pub use sheet::{PageSetup, Sheet, Table};
pub use workbook::{Workbook, WorkbookSettings};

pub use style::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, CellStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, StyleId, StyleRegistry, VerticalAlignment,
};

/// Maximum number of rows in a worksheet (Excel limit).
pub const MAX_ROWS: u32 = 1_048_576;

/// Maximum number of columns in a worksheet (Excel limit).
pub const MAX_COLS: u16 = 16_384;

/// Maximum length of a sheet name.
pub const MAX_SHEET_NAME_LEN: usize = 31;

/// Maximum length of formula text in a cell, per the OOXML cell-content limit.
pub const MAX_FORMULA_LEN: usize = 32_767;
