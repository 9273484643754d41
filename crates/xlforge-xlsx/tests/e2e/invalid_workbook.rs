//! Scenario: malformed or hostile packages are rejected rather than
//! silently accepted: zero/duplicate sheet names on write, a missing
//! `[Content_Types].xml` or a `<!DOCTYPE` part on read.

use std::io::{Cursor, Write as _};

use xlforge_core::RowData;
use xlforge_xlsx::{ReaderConfig, WriterConfig, XlsxError, XlsxReader, XlsxWriter};
use zip::write::SimpleFileOptions;

#[test]
fn write_rows_rejects_empty_sheet_list() {
    let sheets: Vec<(String, Vec<RowData>)> = vec![];
    let mut buf = Vec::new();
    let err = XlsxWriter::write_rows(Cursor::new(&mut buf), sheets, &WriterConfig::default()).unwrap_err();
    assert!(matches!(err, XlsxError::InvalidWorkbook(_)));
}

#[test]
fn write_rows_rejects_case_insensitive_duplicate_names() {
    let sheets = vec![("Sheet1".to_string(), vec![RowData::default()]), ("sheet1".to_string(), vec![RowData::default()])];
    let mut buf = Vec::new();
    let err = XlsxWriter::write_rows(Cursor::new(&mut buf), sheets, &WriterConfig::default()).unwrap_err();
    assert!(matches!(err, XlsxError::InvalidWorkbook(_)));
}

#[test]
fn read_rejects_package_without_content_types() {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        zip.start_file("xl/workbook.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<workbook/>").unwrap();
        zip.finish().unwrap();
    }

    let err = XlsxReader::read(Cursor::new(buf), &ReaderConfig::default()).unwrap_err();
    assert!(matches!(err, XlsxError::InvalidFormat(_)));
}

#[test]
fn read_rejects_doctype_in_shared_strings() {
    let mut buf = Vec::new();
    {
        let mut zip = zip::ZipWriter::new(Cursor::new(&mut buf));
        zip.start_file("[Content_Types].xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(b"<Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\"/>").unwrap();

        zip.start_file("xl/sharedStrings.xml", SimpleFileOptions::default()).unwrap();
        zip.write_all(
            br#"<?xml version="1.0"?><!DOCTYPE sst [<!ENTITY xxe SYSTEM "file:///etc/passwd">]><sst><si><t>&xxe;</t></si></sst>"#,
        )
        .unwrap();

        zip.finish().unwrap();
    }

    let err = XlsxReader::read(Cursor::new(buf), &ReaderConfig::default()).unwrap_err();
    assert!(matches!(err, XlsxError::XxeRejected(_)));
}
