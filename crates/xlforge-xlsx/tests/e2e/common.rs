//! Shared helpers for end-to-end tests: build a small workbook, round-trip
//! it through an in-memory cursor.

use std::io::Cursor;

use xlforge_core::{ARef, CellValue, Column, Row, Sheet, SheetName, Workbook};
use xlforge_xlsx::{ReaderConfig, WriterConfig, XlsxReader, XlsxWriter};

pub fn a1(row: u32, col: u32) -> ARef {
    ARef::new(Row::new(row).unwrap(), Column::new(col).unwrap())
}

pub fn sheet_named(name: &str) -> Sheet {
    Sheet::new(SheetName::new(name).unwrap())
}

/// Write `workbook` to an in-memory buffer and read it straight back.
pub fn round_trip(workbook: &Workbook, config: &WriterConfig) -> Workbook {
    let mut buf = Vec::new();
    {
        let cursor = Cursor::new(&mut buf);
        XlsxWriter::write(workbook, cursor, config).expect("write workbook");
    }
    XlsxReader::read(Cursor::new(buf), &ReaderConfig::default()).expect("read workbook back")
}

pub fn write_to_bytes(workbook: &Workbook, config: &WriterConfig) -> Vec<u8> {
    let mut buf = Vec::new();
    XlsxWriter::write(workbook, Cursor::new(&mut buf), config).expect("write workbook");
    buf
}

#[allow(dead_code)]
pub fn cell_text(value: &CellValue) -> Option<&str> {
    value.as_str()
}
