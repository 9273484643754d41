//! Scenario: the low-level row-stream writer/reader pair, used when a sheet
//! is too large to materialize as a `Sheet`, round-trips bare values without
//! styles, comments, or tables.

use std::collections::BTreeMap;
use std::io::Cursor;

use xlforge_core::{CellValue, RowData};
use xlforge_xlsx::{ReaderConfig, WriterConfig, XlsxReader, XlsxWriter};

fn row(index: u32, values: &[(u32, CellValue)]) -> RowData {
    let mut cells = BTreeMap::new();
    for (col, value) in values {
        cells.insert(*col, value.clone());
    }
    RowData::new(index, cells)
}

#[test]
fn auto_detect_two_pass_round_trips_bare_rows() {
    let rows = vec![
        row(1, &[(0, CellValue::text("header"))]),
        row(2, &[(0, CellValue::text("a")), (1, CellValue::Number(1.into()))]),
        row(3, &[(1, CellValue::Number(2.into()))]),
    ];

    let mut buf = Vec::new();
    XlsxWriter::write_rows(Cursor::new(&mut buf), vec![("Sheet1".to_string(), rows)], &WriterConfig::default()).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(buf)).unwrap();
    let streamed: Vec<RowData> = XlsxReader::read_stream_by_index(&mut archive, 0, &ReaderConfig::default()).unwrap().collect();

    assert_eq!(streamed.len(), 3);
    assert_eq!(streamed[0].cell(0), Some(&CellValue::text("header")));
    assert_eq!(streamed[1].cell(1), Some(&CellValue::Number(1.into())));
    assert_eq!(streamed[2].cell(0), None);
}

#[test]
fn dimension_hinted_single_pass_round_trips() {
    let rows = vec![row(1, &[(0, CellValue::text("x"))]), row(2, &[(0, CellValue::text("y"))])];

    let config = WriterConfig { dimension: Some(xlforge_core::CellRange::parse("A1:A2").unwrap()), ..WriterConfig::default() };

    let mut buf = Vec::new();
    XlsxWriter::write_rows(Cursor::new(&mut buf), vec![("Sheet1".to_string(), rows)], &config).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(buf)).unwrap();
    let streamed = xlforge_xlsx::read_stream(&mut archive, &ReaderConfig::default()).unwrap();

    assert_eq!(streamed.len(), 1);
    let (name, rows) = &streamed[0];
    assert_eq!(name, "Sheet1");
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].cell(0), Some(&CellValue::text("x")));
}

#[test]
fn multiple_sheets_stream_independently() {
    let sheets = vec![
        ("One".to_string(), vec![row(1, &[(0, CellValue::text("1a"))])]),
        ("Two".to_string(), vec![row(1, &[(0, CellValue::text("2a"))])]),
    ];

    let mut buf = Vec::new();
    XlsxWriter::write_rows(Cursor::new(&mut buf), sheets, &WriterConfig::default()).unwrap();

    let mut archive = zip::ZipArchive::new(Cursor::new(buf)).unwrap();
    let second: Vec<RowData> = xlforge_xlsx::read_sheet_stream(&mut archive, "Two", &ReaderConfig::default()).unwrap().collect();
    assert_eq!(second[0].cell(0), Some(&CellValue::text("2a")));
}

#[test]
fn empty_sheet_list_is_rejected() {
    let mut buf = Vec::new();
    let sheets: Vec<(String, Vec<RowData>)> = vec![];
    let err = XlsxWriter::write_rows(Cursor::new(&mut buf), sheets, &WriterConfig::default()).unwrap_err();
    assert!(matches!(err, xlforge_xlsx::XlsxError::InvalidWorkbook(_)));
}
