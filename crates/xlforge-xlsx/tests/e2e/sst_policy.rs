//! Scenario: the `Auto` shared-strings policy adopts `sharedStrings.xml`
//! only when repeated text makes it worthwhile, while `Always`/`Never`
//! force the decision regardless of content.

use std::io::Cursor;

use xlforge_core::{CellValue, Workbook};
use xlforge_xlsx::{SstPolicy, WriterConfig};

use crate::common::*;

const SST_PART: &str = "xl/sharedStrings.xml";

fn has_shared_strings(bytes: &[u8]) -> bool {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
    archive.by_name(SST_PART).is_ok()
}

#[test]
fn auto_skips_sst_for_mostly_unique_short_text() {
    let mut sheet = sheet_named("Sheet1");
    for row in 0..20 {
        sheet = sheet.put(a1(row, 0), CellValue::text(format!("id{row}")));
    }
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

    let config = WriterConfig { sst_policy: SstPolicy::Auto, ..WriterConfig::default() };
    let bytes = write_to_bytes(&workbook, &config);

    assert!(!has_shared_strings(&bytes), "mostly-unique short text should not adopt a shared-strings table");
}

#[test]
fn auto_adopts_sst_for_repeated_long_text() {
    let mut sheet = sheet_named("Sheet1");
    for row in 0..20 {
        sheet = sheet.put(a1(row, 0), CellValue::text("a repeated category label"));
    }
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

    let config = WriterConfig { sst_policy: SstPolicy::Auto, ..WriterConfig::default() };
    let bytes = write_to_bytes(&workbook, &config);

    assert!(has_shared_strings(&bytes), "heavily repeated long text should adopt a shared-strings table");
}

#[test]
fn always_forces_sst_even_for_unique_text() {
    let sheet = sheet_named("Sheet1").put(a1(0, 0), CellValue::text("only one cell"));
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

    let config = WriterConfig { sst_policy: SstPolicy::Always, ..WriterConfig::default() };
    let bytes = write_to_bytes(&workbook, &config);

    assert!(has_shared_strings(&bytes));
}

#[test]
fn never_omits_sst_even_for_repeated_text() {
    let mut sheet = sheet_named("Sheet1");
    for row in 0..20 {
        sheet = sheet.put(a1(row, 0), CellValue::text("a repeated category label"));
    }
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

    let config = WriterConfig { sst_policy: SstPolicy::Never, ..WriterConfig::default() };
    let bytes = write_to_bytes(&workbook, &config);

    assert!(!has_shared_strings(&bytes));

    let read_back = round_trip(&workbook, &config);
    assert_eq!(read_back.sheet(0).unwrap().get(a1(0, 0)).value, CellValue::text("a repeated category label"));
}
