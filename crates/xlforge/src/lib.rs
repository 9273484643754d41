//! # xlforge
//!
//! A Rust library for reading, writing, and calculating Excel workbooks.
//!
//! `xlforge` is a thin facade over three crates that each own one concern:
//!
//! - [`xlforge_core`] — the immutable `Workbook`/`Sheet` data model.
//! - [`xlforge_formula`] — formula parsing, evaluation, and dependency
//!   tracking.
//! - [`xlforge_xlsx`] — the streaming OOXML (.xlsx) codec.
//!
//! This crate re-exports their public surface through [`prelude`] and adds
//! two extension traits: [`WorkbookExt`] for `.xlsx` file I/O, and
//! [`calculation::WorkbookCalculationExt`] for eager recalculation after an
//! edit.
//!
//! ## Example
//!
//! ```rust,ignore
//! use xlforge::prelude::*;
//!
//! let workbook = Workbook::open("input.xlsx")?;
//! let sheet = workbook.sheet(0)?.put(a1, CellValue::text("Hello"));
//! let workbook = workbook.with_sheet(0, sheet)?;
//! workbook.save("output.xlsx")?;
//! ```

pub mod calculation;
pub mod prelude;

pub use calculation::{recalculate, CalculationStats, WorkbookCalculationExt};

pub use xlforge_core::{
    Alignment, Anchor, ARef, BorderEdge, BorderLineStyle, BorderStyle, Cell, CellComment, CellError, CellRange,
    CellStyle, CellValue, Color, Column, Error, FillStyle, FontStyle, HorizontalAlignment, Hyperlink, NumberFormat,
    PageSetup, Result, Row, Sheet, SheetName, StyleId, Table, VerticalAlignment, Workbook, WorkbookSettings,
};
pub use xlforge_formula::{evaluate, parse_formula, DependencyGraph, EvalContext, Expr, FormulaError, QualifiedRef, Value};
pub use xlforge_xlsx::{Compression, ReaderConfig, SstPolicy, WriterConfig, XlsxError, XlsxReader, XlsxWriter};

use std::path::Path;

/// Extension trait adding file I/O to [`Workbook`], dispatched by extension.
///
/// Only `.xlsx`/`.xlsm` are recognized; this crate carries no CSV, legacy
/// `.xls`, or chart-interop support, so the dispatch table has a single live
/// arm where the teacher this crate is modeled on had four. Codec failures
/// (`xlforge_xlsx::XlsxError`) are folded into [`Error::Other`] rather than
/// introducing a fourth error type of this crate's own.
pub trait WorkbookExt: Sized {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self>;
    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()>;
}

impl WorkbookExt for Workbook {
    fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        match extension_of(path).as_deref() {
            Some("xlsx") | Some("xlsm") => {
                XlsxReader::read_file(path, &ReaderConfig::default()).map_err(|e| Error::other(e.to_string()))
            }
            _ => Err(Error::other(format!("unsupported file format: {}", path.display()))),
        }
    }

    fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        match extension_of(path).as_deref() {
            Some("xlsx") | Some("xlsm") => {
                XlsxWriter::write_file(self, path, &WriterConfig::default()).map_err(|e| Error::other(e.to_string()))
            }
            _ => Err(Error::other(format!("unsupported file format: {}", path.display()))),
        }
    }
}

fn extension_of(path: &Path) -> Option<String> {
    path.extension().and_then(|e| e.to_str()).map(|e| e.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn open_rejects_unrecognized_extensions() {
        let err = Workbook::open("data.csv").unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn save_rejects_unrecognized_extensions() {
        let workbook = Workbook::new();
        let err = workbook.save("data.txt").unwrap_err();
        assert!(matches!(err, Error::Other(_)));
    }

    #[test]
    fn round_trips_through_a_temp_xlsx_file() {
        let sheet = xlforge_core::Sheet::new(SheetName::new("Sheet1").unwrap())
            .put(ARef::new(Row::new(0).unwrap(), Column::new(0).unwrap()), CellValue::text("hi"));
        let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("roundtrip.xlsx");
        workbook.save(&path).unwrap();

        let read_back = Workbook::open(&path).unwrap();
        let a1 = ARef::new(Row::new(0).unwrap(), Column::new(0).unwrap());
        assert_eq!(read_back.sheet(0).unwrap().get(a1).value, CellValue::text("hi"));
    }
}
