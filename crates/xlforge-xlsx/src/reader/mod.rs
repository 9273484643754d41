//! XLSX reader: parses an OOXML package back into a [`Workbook`], plus a
//! streaming row API for reading at scale without materializing a `Sheet`.
//!
//! Every XML part is scanned for a DOCTYPE declaration before it is handed
//! to `quick_xml` (see [`crate::xml_guard::reject_doctype`]); this is not a
//! configurable option.

use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::Event;
use quick_xml::reader::Reader;
use rust_decimal::Decimal;

use xlforge_core::{ARef, CellComment, CellError, CellRange, CellStyle, CellValue, RowData, Sheet, SheetName, Workbook, WorkbookSettings};

use crate::error::{XlsxError, XlsxResult};
use crate::styles::parse_styles_xml;
use crate::xml_guard::reject_doctype;

/// Reader configuration. DOCTYPE rejection always applies regardless of
/// these settings; there is no way to disable it.
#[derive(Debug, Clone, Default)]
pub struct ReaderConfig {
    /// Cap on the number of `<row>` elements read per sheet by the
    /// streaming API, `None` for no limit.
    pub max_rows: Option<u32>,
}

/// Decode Excel's `_xHHHH_` escape sequences in strings: `_x000d_` (CR),
/// `_x000a_` (LF), `_x0009_` (tab), `_x005f_` (escaped underscore), etc.
fn decode_excel_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '_' {
            let mut hex_chars = String::new();
            let mut is_escape = false;

            if chars.peek() == Some(&'x') {
                chars.next();
                for _ in 0..4 {
                    if let Some(&ch) = chars.peek() {
                        if ch.is_ascii_hexdigit() {
                            hex_chars.push(ch);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                if hex_chars.len() == 4 && chars.peek() == Some(&'_') {
                    chars.next();
                    if let Ok(code) = u32::from_str_radix(&hex_chars, 16) {
                        if let Some(decoded) = char::from_u32(code) {
                            result.push(decoded);
                            is_escape = true;
                        }
                    }
                }
            }

            if !is_escape {
                result.push('_');
                if !hex_chars.is_empty() {
                    result.push('x');
                    result.push_str(&hex_chars);
                }
            }
        } else {
            result.push(c);
        }
    }

    result
}

fn read_part<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, path: &str) -> XlsxResult<Option<Vec<u8>>> {
    let mut file = match archive.by_name(path) {
        Ok(f) => f,
        Err(_) => return Ok(None),
    };
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)?;
    reject_doctype(&bytes, path)?;
    Ok(Some(bytes))
}

fn require_part<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, path: &str) -> XlsxResult<Vec<u8>> {
    read_part(archive, path)?.ok_or_else(|| XlsxError::MissingPart(path.to_string()))
}

/// A cell value decoded straight off the wire, before it is placed at its
/// sheet coordinates.
struct ParsedCell {
    reference: ARef,
    style_index: Option<u32>,
    value: CellValue,
}

struct RawCell {
    cell_ref: String,
    type_attr: Option<String>,
    style_index: Option<u32>,
    formula: Option<String>,
    raw_value: Option<String>,
    inline_text: Option<String>,
}

/// Decode the scalar half of the `t` attribute table: `s` → shared string,
/// `inlineStr`/`str` → text, `b` → bool, `e` → error code, absent/`n` →
/// number. Shared by plain value cells and by a formula's cached result.
fn decode_scalar(type_attr: Option<&str>, raw_value: Option<&str>, inline_text: Option<&str>, shared_strings: &[String]) -> CellValue {
    match type_attr {
        Some("s") => {
            let idx: usize = raw_value.unwrap_or("0").parse().unwrap_or(0);
            CellValue::text(shared_strings.get(idx).cloned().unwrap_or_default())
        }
        Some("str") => CellValue::text(inline_text.or(raw_value).unwrap_or_default()),
        Some("inlineStr") => CellValue::text(inline_text.unwrap_or_default()),
        Some("b") => CellValue::Bool(raw_value == Some("1")),
        Some("e") => {
            let code = raw_value.unwrap_or("#N/A");
            CellValue::from(CellError::from_str(code).unwrap_or(CellError::Na))
        }
        _ => {
            let d: Decimal = raw_value.unwrap_or("0").parse().unwrap_or_default();
            CellValue::Number(d)
        }
    }
}

fn decode_cell(raw: RawCell, shared_strings: &[String]) -> Option<ParsedCell> {
    let reference = ARef::parse(&raw.cell_ref).ok()?;

    let value = match &raw.formula {
        Some(expr) => {
            if raw.raw_value.is_some() || raw.inline_text.is_some() {
                let cached = decode_scalar(raw.type_attr.as_deref(), raw.raw_value.as_deref(), raw.inline_text.as_deref(), shared_strings);
                CellValue::formula_with_cache(expr.clone(), cached)
            } else {
                CellValue::formula(expr.clone())
            }
        }
        None => decode_scalar(raw.type_attr.as_deref(), raw.raw_value.as_deref(), raw.inline_text.as_deref(), shared_strings),
    };

    Some(ParsedCell { reference, style_index: raw.style_index, value })
}

/// XLSX reader.
pub struct XlsxReader;

impl XlsxReader {
    pub fn read_file<P: AsRef<Path>>(path: P, config: &ReaderConfig) -> XlsxResult<Workbook> {
        let file = File::open(path)?;
        Self::read(file, config)
    }

    pub fn read<R: Read + Seek>(reader: R, config: &ReaderConfig) -> XlsxResult<Workbook> {
        let mut archive = zip::ZipArchive::new(reader)?;

        if archive.by_name("[Content_Types].xml").is_err() {
            return Err(XlsxError::InvalidFormat("missing [Content_Types].xml".into()));
        }

        let shared_strings = read_shared_strings(&mut archive)?;
        let cell_styles = read_styles(&mut archive)?;
        let (sheet_info, date_1904) = read_workbook_xml(&mut archive)?;
        let sheet_paths = read_workbook_rels(&mut archive)?;

        let mut sheets = Vec::with_capacity(sheet_info.len());
        for (name, r_id) in &sheet_info {
            let Some(path) = sheet_paths.get(r_id) else { continue };
            let sheet = read_worksheet(&mut archive, path, name, &shared_strings, &cell_styles, config)?;
            sheets.push(sheet);
        }

        if sheets.is_empty() {
            sheets.push(Sheet::new(SheetName::new("Sheet1").expect("valid sheet name")));
        }

        let workbook = Workbook::from_sheets(sheets)?;
        Ok(workbook.with_settings(WorkbookSettings { date_1904, ..WorkbookSettings::default() }))
    }
}

fn read_shared_strings<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<String>> {
    let Some(bytes) = read_part(archive, "xl/sharedStrings.xml")? else {
        return Ok(Vec::new());
    };

    let mut xml_reader = Reader::from_reader(bytes.as_slice());
    xml_reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut strings = Vec::new();
    let mut current = String::new();
    let mut in_si = false;
    let mut in_t = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"si" => {
                    in_si = true;
                    current.clear();
                }
                b"t" if in_si => in_t = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"si" => {
                    strings.push(decode_excel_escapes(&current));
                    in_si = false;
                }
                b"t" => in_t = false,
                _ => {}
            },
            Ok(Event::Text(e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::xml("xl/sharedStrings.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(strings)
}

fn read_styles<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<Vec<CellStyle>> {
    match read_part(archive, "xl/styles.xml")? {
        Some(bytes) => parse_styles_xml(&bytes),
        None => Ok(vec![CellStyle::default()]),
    }
}

fn read_workbook_xml<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<(Vec<(String, String)>, bool)> {
    let bytes = require_part(archive, "xl/workbook.xml")?;
    let mut xml_reader = Reader::from_reader(bytes.as_slice());
    xml_reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut sheets = Vec::new();
    let mut date_1904 = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) if e.name().as_ref() == b"workbookPr" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"date1904" {
                        let v = attr.unescape_value().unwrap_or_default();
                        date_1904 = v == "1" || v == "true";
                    }
                }
            }
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"sheet" => {
                let mut name = None;
                let mut r_id = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"name" => name = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"r:id" => r_id = attr.unescape_value().ok().map(|s| s.to_string()),
                        _ => {}
                    }
                }
                if let (Some(name), Some(r_id)) = (name, r_id) {
                    sheets.push((name, r_id));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::xml("xl/workbook.xml", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok((sheets, date_1904))
}

fn read_workbook_rels<R: Read + Seek>(archive: &mut zip::ZipArchive<R>) -> XlsxResult<HashMap<String, String>> {
    let bytes = require_part(archive, "xl/_rels/workbook.xml.rels")?;
    let mut xml_reader = Reader::from_reader(bytes.as_slice());
    xml_reader.config_mut().trim_text(true);

    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"Relationship" => {
                let mut id = None;
                let mut target = None;
                let mut rel_type = None;
                for attr in e.attributes().flatten() {
                    match attr.key.as_ref() {
                        b"Id" => id = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Target" => target = attr.unescape_value().ok().map(|s| s.to_string()),
                        b"Type" => rel_type = attr.unescape_value().ok().map(|s| s.to_string()),
                        _ => {}
                    }
                }
                if let (Some(id), Some(target), Some(rel_type)) = (id, target, rel_type) {
                    if rel_type.ends_with("/worksheet") {
                        let full = match target.strip_prefix('/') {
                            Some(stripped) => stripped.to_string(),
                            None => format!("xl/{target}"),
                        };
                        rels.insert(id, full);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::xml("xl/_rels/workbook.xml.rels", e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

fn read_worksheet<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    path: &str,
    name: &str,
    shared_strings: &[String],
    cell_styles: &[CellStyle],
    config: &ReaderConfig,
) -> XlsxResult<Sheet> {
    let bytes = require_part(archive, path)?;
    let mut sheet = Sheet::new(SheetName::new(name)?);

    for cell in parse_worksheet_cells(&bytes, path, shared_strings, config)? {
        sheet = apply_cell(sheet, cell, cell_styles);
    }

    for range in parse_merge_cells(&bytes, path)? {
        sheet = sheet.merge(range);
    }

    let comments_path = comments_path_for(path);
    if let Some(comment_bytes) = read_part(archive, &comments_path)? {
        for (reference, comment) in parse_comments(&comment_bytes, &comments_path)? {
            sheet = sheet.set_comment(reference, comment);
        }
    }

    if let Some(setup) = parse_page_setup(&bytes, path)? {
        sheet = sheet.with_page_setup(setup);
    }

    Ok(sheet)
}

fn apply_cell(sheet: Sheet, cell: ParsedCell, cell_styles: &[CellStyle]) -> Sheet {
    let sheet = sheet.put(cell.reference, cell.value);
    match cell.style_index {
        Some(idx) => {
            let style = cell_styles.get(idx as usize).cloned().unwrap_or_default();
            sheet.set_cell_style(cell.reference, style)
        }
        None => sheet,
    }
}

/// Every part this codec writes names a sheet's comments after its own
/// ordinal (`sheetN.xml` -> `commentsN.xml`); a workbook produced by another
/// writer that uses the proper per-sheet `.rels` indirection instead simply
/// yields no comments here.
fn comments_path_for(sheet_path: &str) -> String {
    let file_name = sheet_path.rsplit('/').next().unwrap_or(sheet_path);
    let digits: String = file_name.chars().filter(|c| c.is_ascii_digit()).collect();
    format!("xl/comments{digits}.xml")
}

fn parse_merge_cells(xml: &[u8], part: &str) -> XlsxResult<Vec<CellRange>> {
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut ranges = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"mergeCell" => {
                for attr in e.attributes().flatten() {
                    if attr.key.as_ref() == b"ref" {
                        if let Ok(value) = attr.unescape_value() {
                            if let Ok(range) = CellRange::parse(&value) {
                                ranges.push(range);
                            }
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(ranges)
}

fn parse_page_setup(xml: &[u8], part: &str) -> XlsxResult<Option<xlforge_core::PageSetup>> {
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.name().as_ref() == b"pageSetup" => {
                let mut setup = xlforge_core::PageSetup::default();
                for attr in e.attributes().flatten() {
                    let value = attr.unescape_value().unwrap_or_default();
                    match attr.key.as_ref() {
                        b"orientation" => setup.orientation_landscape = value == "landscape",
                        b"fitToWidth" => setup.fit_to_width = value.parse().ok(),
                        b"fitToHeight" => setup.fit_to_height = value.parse().ok(),
                        b"paperSize" => setup.paper_size = value.parse().ok(),
                        _ => {}
                    }
                }
                return Ok(Some(setup));
            }
            Ok(Event::Eof) => return Ok(None),
            Err(e) => return Err(XlsxError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }
}

fn parse_comments(xml: &[u8], part: &str) -> XlsxResult<Vec<(ARef, CellComment)>> {
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut authors = Vec::new();
    let mut in_author = false;
    let mut comments = Vec::new();

    let mut in_comment = false;
    let mut current_ref: Option<String> = None;
    let mut current_author_id: usize = 0;
    let mut current_text = String::new();
    let mut in_text = false;

    loop {
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"author" => in_author = true,
                b"comment" => {
                    in_comment = true;
                    current_text.clear();
                    current_author_id = 0;
                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value().unwrap_or_default();
                        match attr.key.as_ref() {
                            b"ref" => current_ref = Some(value.to_string()),
                            b"authorId" => current_author_id = value.parse().unwrap_or(0),
                            _ => {}
                        }
                    }
                }
                b"t" if in_comment => in_text = true,
                _ => {}
            },
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"author" => in_author = false,
                b"t" => in_text = false,
                b"comment" => {
                    if let Some(r) = current_ref.take() {
                        if let Ok(reference) = ARef::parse(&r) {
                            let author = authors.get(current_author_id).cloned().unwrap_or_default();
                            let comment = CellComment::new(author, decode_excel_escapes(current_text.trim()));
                            comments.push((reference, comment));
                        }
                    }
                    in_comment = false;
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Ok(text) = e.unescape() {
                    if in_author {
                        authors.push(text.to_string());
                    } else if in_text {
                        current_text.push_str(&text);
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(comments)
}

/// Shared worksheet-body cell scanner used by both the fidelity reader and
/// the streaming row API below.
fn parse_worksheet_cells(xml: &[u8], part: &str, shared_strings: &[String], config: &ReaderConfig) -> XlsxResult<Vec<ParsedCell>> {
    reject_doctype(xml, part)?;
    let mut xml_reader = Reader::from_reader(xml);
    xml_reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut cells = Vec::new();
    let mut rows_seen = 0u32;
    let mut stop = false;

    let mut current: Option<RawCell> = None;
    let mut in_value = false;
    let mut in_formula = false;
    let mut in_inline_str = false;
    let mut in_inline_text = false;
    let mut raw_value_buf = String::new();
    let mut formula_buf = String::new();
    let mut inline_text_buf = String::new();

    loop {
        if stop {
            break;
        }
        match xml_reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) if e.name().as_ref() == b"row" => {
                rows_seen += 1;
                if let Some(max) = config.max_rows {
                    if rows_seen > max {
                        stop = true;
                    }
                }
            }
            Ok(Event::Start(e)) => match e.name().as_ref() {
                b"c" => {
                    let mut raw = RawCell {
                        cell_ref: String::new(),
                        type_attr: None,
                        style_index: None,
                        formula: None,
                        raw_value: None,
                        inline_text: None,
                    };
                    for attr in e.attributes().flatten() {
                        let value = attr.unescape_value().unwrap_or_default();
                        match attr.key.as_ref() {
                            b"r" => raw.cell_ref = value.to_string(),
                            b"t" => raw.type_attr = Some(value.to_string()),
                            b"s" => raw.style_index = value.parse().ok(),
                            _ => {}
                        }
                    }
                    current = Some(raw);
                }
                b"v" => {
                    in_value = true;
                    raw_value_buf.clear();
                }
                b"f" => {
                    in_formula = true;
                    formula_buf.clear();
                }
                b"is" => in_inline_str = true,
                b"t" if in_inline_str => {
                    in_inline_text = true;
                    inline_text_buf.clear();
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                if let Ok(text) = e.unescape() {
                    if in_value {
                        raw_value_buf.push_str(&text);
                    } else if in_formula {
                        formula_buf.push_str(&text);
                    } else if in_inline_text {
                        inline_text_buf.push_str(&text);
                    }
                }
            }
            Ok(Event::End(e)) => match e.name().as_ref() {
                b"v" => {
                    in_value = false;
                    if let Some(raw) = current.as_mut() {
                        raw.raw_value = Some(raw_value_buf.clone());
                    }
                }
                b"f" => {
                    in_formula = false;
                    if let Some(raw) = current.as_mut() {
                        raw.formula = Some(formula_buf.clone());
                    }
                }
                b"t" => in_inline_text = false,
                b"is" => {
                    in_inline_str = false;
                    if let Some(raw) = current.as_mut() {
                        raw.inline_text = Some(decode_excel_escapes(&inline_text_buf));
                    }
                }
                b"c" => {
                    if let Some(raw) = current.take() {
                        if !raw.cell_ref.is_empty() {
                            if let Some(parsed) = decode_cell(raw, shared_strings) {
                                cells.push(parsed);
                            }
                        }
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(XlsxError::xml(part, e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(cells)
}

fn sheet_path_for(
    archive_sheet_info: &[(String, String)],
    sheet_paths: &HashMap<String, String>,
    index: usize,
) -> XlsxResult<String> {
    let (_, r_id) = archive_sheet_info
        .get(index)
        .ok_or_else(|| XlsxError::MissingPart(format!("sheet index {index}")))?;
    sheet_paths.get(r_id).cloned().ok_or_else(|| XlsxError::MissingPart(format!("sheet index {index}")))
}

fn rows_from_cells(cells: Vec<ParsedCell>) -> Vec<RowData> {
    let mut by_row: BTreeMap<u32, BTreeMap<u32, CellValue>> = BTreeMap::new();
    for cell in cells {
        let row = cell.reference.row().index1();
        let col = cell.reference.col().index0();
        by_row.entry(row).or_default().insert(col, cell.value);
    }
    by_row.into_iter().map(|(row_index, values)| RowData::new(row_index, values)).collect()
}

fn read_rows_at_path<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    path: &str,
    config: &ReaderConfig,
) -> XlsxResult<Vec<RowData>> {
    let shared_strings = read_shared_strings(archive)?;
    let bytes = require_part(archive, path)?;
    let cells = parse_worksheet_cells(&bytes, path, &shared_strings, config)?;
    Ok(rows_from_cells(cells))
}

/// Stream one sheet's rows, by sheet name, without materializing a `Sheet`.
pub fn read_sheet_stream<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    sheet_name: &str,
    config: &ReaderConfig,
) -> XlsxResult<impl Iterator<Item = RowData>> {
    let (sheet_info, _) = read_workbook_xml(archive)?;
    let sheet_paths = read_workbook_rels(archive)?;
    let index = sheet_info
        .iter()
        .position(|(name, _)| name.eq_ignore_ascii_case(sheet_name))
        .ok_or_else(|| XlsxError::MissingPart(format!("sheet '{sheet_name}'")))?;
    let path = sheet_path_for(&sheet_info, &sheet_paths, index)?;
    Ok(read_rows_at_path(archive, &path, config)?.into_iter())
}

/// Stream by zero-based sheet position instead of by name.
pub fn read_stream_by_index<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    index: usize,
    config: &ReaderConfig,
) -> XlsxResult<impl Iterator<Item = RowData>> {
    let (sheet_info, _) = read_workbook_xml(archive)?;
    let sheet_paths = read_workbook_rels(archive)?;
    let path = sheet_path_for(&sheet_info, &sheet_paths, index)?;
    Ok(read_rows_at_path(archive, &path, config)?.into_iter())
}

/// Stream only the rows intersecting `range`'s vertical bounds; column
/// filtering is left to the caller.
pub fn read_stream_range<R: Read + Seek>(
    archive: &mut zip::ZipArchive<R>,
    sheet_name: &str,
    range: CellRange,
    config: &ReaderConfig,
) -> XlsxResult<impl Iterator<Item = RowData>> {
    let min_row = range.start.row().index1();
    let max_row = range.end.row().index1();
    let rows = read_sheet_stream(archive, sheet_name, config)?;
    Ok(rows.filter(move |r| r.row_index >= min_row && r.row_index <= max_row))
}

/// Read every sheet in declaration order as `(name, rows)`, without
/// materializing styles, comments, merges, or page setup.
pub fn read_stream<R: Read + Seek>(archive: &mut zip::ZipArchive<R>, config: &ReaderConfig) -> XlsxResult<Vec<(String, Vec<RowData>)>> {
    let (sheet_info, _) = read_workbook_xml(archive)?;
    let sheet_paths = read_workbook_rels(archive)?;
    let mut out = Vec::with_capacity(sheet_info.len());
    for (name, r_id) in &sheet_info {
        let Some(path) = sheet_paths.get(r_id).cloned() else { continue };
        let rows = read_rows_at_path(archive, &path, config)?;
        out.push((name.clone(), rows));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_carriage_return() {
        assert_eq!(decode_excel_escapes("a_x000d_b"), "a\rb");
    }

    #[test]
    fn decodes_line_feed() {
        assert_eq!(decode_excel_escapes("a_x000a_b"), "a\nb");
    }

    #[test]
    fn decodes_tab() {
        assert_eq!(decode_excel_escapes("a_x0009_b"), "a\tb");
    }

    #[test]
    fn decodes_escaped_underscore() {
        assert_eq!(decode_excel_escapes("a_x005f_b"), "a_b");
    }

    #[test]
    fn leaves_plain_underscore_alone() {
        assert_eq!(decode_excel_escapes("a_b_c"), "a_b_c");
    }

    #[test]
    fn leaves_non_hex_sequence_alone() {
        assert_eq!(decode_excel_escapes("a_xZZZZ_b"), "a_xZZZZ_b");
    }

    #[test]
    fn leaves_unterminated_sequence_alone() {
        assert_eq!(decode_excel_escapes("a_x0041b"), "a_x0041b");
    }

    #[test]
    fn decodes_multiple_sequences() {
        assert_eq!(decode_excel_escapes("_x000d__x000a_"), "\r\n");
    }

    #[test]
    fn empty_string_is_unchanged() {
        assert_eq!(decode_excel_escapes(""), "");
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        assert_eq!(decode_excel_escapes("_x000D_"), "\r");
    }

    #[test]
    fn decode_cell_reads_shared_string() {
        let raw = RawCell {
            cell_ref: "A1".into(),
            type_attr: Some("s".into()),
            style_index: None,
            formula: None,
            raw_value: Some("0".into()),
            inline_text: None,
        };
        let strings = vec!["hello".to_string()];
        let cell = decode_cell(raw, &strings).unwrap();
        assert_eq!(cell.value, CellValue::text("hello"));
    }

    #[test]
    fn decode_cell_reads_number_with_no_type_attr() {
        let raw = RawCell {
            cell_ref: "B2".into(),
            type_attr: None,
            style_index: None,
            formula: None,
            raw_value: Some("42.5".into()),
            inline_text: None,
        };
        let cell = decode_cell(raw, &[]).unwrap();
        assert_eq!(cell.value.as_number(), Some(Decimal::new(425, 1)));
    }

    #[test]
    fn decode_cell_reads_bool() {
        let raw = RawCell {
            cell_ref: "C3".into(),
            type_attr: Some("b".into()),
            style_index: None,
            formula: None,
            raw_value: Some("1".into()),
            inline_text: None,
        };
        let cell = decode_cell(raw, &[]).unwrap();
        assert_eq!(cell.value, CellValue::Bool(true));
    }

    #[test]
    fn decode_cell_reads_error() {
        let raw = RawCell {
            cell_ref: "D4".into(),
            type_attr: Some("e".into()),
            style_index: None,
            formula: None,
            raw_value: Some("#DIV/0!".into()),
            inline_text: None,
        };
        let cell = decode_cell(raw, &[]).unwrap();
        assert_eq!(cell.value, CellValue::from(CellError::Div0));
    }

    #[test]
    fn decode_cell_reads_inline_string() {
        let raw = RawCell {
            cell_ref: "D5".into(),
            type_attr: Some("inlineStr".into()),
            style_index: None,
            formula: None,
            raw_value: None,
            inline_text: Some("inline text".into()),
        };
        let cell = decode_cell(raw, &[]).unwrap();
        assert_eq!(cell.value, CellValue::text("inline text"));
    }

    #[test]
    fn decode_cell_reads_formula_with_cached_number() {
        let raw = RawCell {
            cell_ref: "E5".into(),
            type_attr: None,
            style_index: None,
            formula: Some("A1+A2".into()),
            raw_value: Some("3".into()),
            inline_text: None,
        };
        let cell = decode_cell(raw, &[]).unwrap();
        assert_eq!(cell.value.formula_text(), Some("A1+A2"));
        assert_eq!(cell.value.effective_value().as_number(), Some(Decimal::new(3, 0)));
    }

    #[test]
    fn decode_cell_reads_formula_cached_string_type() {
        let raw = RawCell {
            cell_ref: "F6".into(),
            type_attr: Some("str".into()),
            style_index: None,
            formula: Some("CONCATENATE(A1,A2)".into()),
            raw_value: Some("ab".into()),
            inline_text: None,
        };
        let cell = decode_cell(raw, &[]).unwrap();
        assert_eq!(cell.value.effective_value(), &CellValue::text("ab"));
    }

    #[test]
    fn decode_cell_without_ref_is_rejected() {
        let raw =
            RawCell { cell_ref: "not-a-ref".into(), type_attr: None, style_index: None, formula: None, raw_value: Some("1".into()), inline_text: None };
        assert!(decode_cell(raw, &[]).is_none());
    }
}
