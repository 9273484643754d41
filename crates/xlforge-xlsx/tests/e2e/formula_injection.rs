//! Scenario: `WriterConfig::secure` neutralizes text cells that start with a
//! formula-injection trigger character by prefixing a literal apostrophe,
//! leaving ordinary text and real formula cells untouched.

use xlforge_core::{CellValue, Workbook};
use xlforge_xlsx::WriterConfig;

use crate::common::*;

#[test]
fn secure_mode_escapes_leading_trigger_characters() {
    let sheet = sheet_named("Sheet1")
        .put(a1(0, 0), CellValue::text("=cmd|'/c calc'!A0"))
        .put(a1(1, 0), CellValue::text("+1+1"))
        .put(a1(2, 0), CellValue::text("-1"))
        .put(a1(3, 0), CellValue::text("@SUM(1,2)"))
        .put(a1(4, 0), CellValue::text("ordinary text"));
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

    let read_back = round_trip(&workbook, &WriterConfig::secure());
    let sheet = read_back.sheet(0).unwrap();

    assert_eq!(sheet.get(a1(0, 0)).value, CellValue::text("'=cmd|'/c calc'!A0"));
    assert_eq!(sheet.get(a1(1, 0)).value, CellValue::text("'+1+1"));
    assert_eq!(sheet.get(a1(2, 0)).value, CellValue::text("'-1"));
    assert_eq!(sheet.get(a1(3, 0)).value, CellValue::text("'@SUM(1,2)"));
    assert_eq!(sheet.get(a1(4, 0)).value, CellValue::text("ordinary text"));
}

#[test]
fn default_config_leaves_trigger_characters_unescaped() {
    let sheet = sheet_named("Sheet1").put(a1(0, 0), CellValue::text("=cmd|'/c calc'!A0"));
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

    let read_back = round_trip(&workbook, &WriterConfig::default());
    assert_eq!(read_back.sheet(0).unwrap().get(a1(0, 0)).value, CellValue::text("=cmd|'/c calc'!A0"));
}

#[test]
fn secure_mode_does_not_touch_real_formula_cells() {
    let sheet = sheet_named("Sheet1").put(a1(0, 0), CellValue::formula("SUM(A1:A2)"));
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();

    let read_back = round_trip(&workbook, &WriterConfig::secure());
    assert_eq!(read_back.sheet(0).unwrap().get(a1(0, 0)).value.formula_text(), Some("SUM(A1:A2)"));
}
