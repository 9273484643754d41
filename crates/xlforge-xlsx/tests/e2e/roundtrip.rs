//! Scenario: a small multi-sheet workbook with values, styles, a formula,
//! a merge, and a comment survives a write/read round trip.

use rust_decimal::Decimal;
use xlforge_core::{CellStyle, CellValue, Color, Workbook};
use xlforge_xlsx::WriterConfig;

use crate::common::*;

#[test]
fn values_styles_merges_and_comments_round_trip() {
    let bold_red = CellStyle::new().bold(true).fill_color(Color::RED);

    let sheet = sheet_named("Data")
        .put_styled(a1(0, 0), CellValue::text("Name"), bold_red)
        .put(a1(0, 1), CellValue::text("Amount"))
        .put(a1(1, 0), CellValue::text("Widgets"))
        .put(a1(1, 1), CellValue::Number(Decimal::new(1250, 2)))
        .put(a1(2, 0), CellValue::formula("SUM(B2:B2)"))
        .merge(xlforge_core::CellRange::parse("A1:B1").unwrap())
        .set_comment(a1(1, 0), xlforge_core::CellComment::new("auditor", "verify unit count"));

    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();
    let read_back = round_trip(&workbook, &WriterConfig::default());

    assert_eq!(read_back.sheet_count(), 1);
    let sheet = read_back.sheet(0).unwrap();
    assert_eq!(sheet.name().as_str(), "Data");
    assert_eq!(sheet.get(a1(0, 0)).value, CellValue::text("Name"));
    assert_eq!(sheet.get(a1(1, 1)).value, CellValue::Number(Decimal::new(1250, 2)));
    assert_eq!(sheet.get(a1(2, 0)).value.formula_text(), Some("SUM(B2:B2)"));
    assert_eq!(sheet.merged_ranges().len(), 1);

    let header_style = sheet.get(a1(0, 0)).style_id.and_then(|id| sheet.style_registry().get(id).cloned());
    assert_eq!(header_style.map(|s| s.font.bold), Some(true));

    let comment = sheet.get(a1(1, 0)).comment.clone().unwrap();
    assert_eq!(comment.author, "auditor");
    assert_eq!(comment.text, "verify unit count");
}

#[test]
fn multiple_sheets_preserve_order_and_names() {
    let workbook = Workbook::from_sheets(vec![
        sheet_named("First").put(a1(0, 0), CellValue::text("a")),
        sheet_named("Second").put(a1(0, 0), CellValue::text("b")),
    ])
    .unwrap();

    let read_back = round_trip(&workbook, &WriterConfig::default());
    let names: Vec<&str> = read_back.sheets().iter().map(|s| s.name().as_str()).collect();
    assert_eq!(names, vec!["First", "Second"]);
}

#[test]
fn error_value_round_trips() {
    let sheet = sheet_named("Sheet1").put(a1(0, 0), CellValue::from(xlforge_core::CellError::Div0));
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();
    let read_back = round_trip(&workbook, &WriterConfig::default());
    assert_eq!(read_back.sheet(0).unwrap().get(a1(0, 0)).value, CellValue::from(xlforge_core::CellError::Div0));
}

#[test]
fn bool_value_round_trips() {
    let sheet = sheet_named("Sheet1").put(a1(0, 0), CellValue::Bool(true)).put(a1(0, 1), CellValue::Bool(false));
    let workbook = Workbook::from_sheets(vec![sheet]).unwrap();
    let read_back = round_trip(&workbook, &WriterConfig::default());
    let sheet = read_back.sheet(0).unwrap();
    assert_eq!(sheet.get(a1(0, 0)).value, CellValue::Bool(true));
    assert_eq!(sheet.get(a1(0, 1)).value, CellValue::Bool(false));
}
