//! XLSX writer: assembles an OOXML package over the push-style `XmlWriter`.
//!
//! Two entry points cover the write pipelines: [`XlsxWriter::write`] renders a
//! fully materialized [`Workbook`] (styles, merges, comments, hyperlinks,
//! tables) and [`XlsxWriter::write_rows`] streams bare `(name, RowData)`
//! sequences through either the dimension-hinted single-pass path or the
//! auto-detect two-pass path with a spool file.

use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{Seek, SeekFrom, Write};
use std::path::Path;

use rust_decimal::Decimal;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use xlforge_core::cell::CellComment;
use xlforge_core::sheet::{PageSetup, Table};
use xlforge_core::{ARef, Anchor, CellError, CellRange, CellValue, Hyperlink, RowData, Sheet, Workbook};
use xlforge_formula::functions::date::datetime_to_serial;

use crate::error::{XlsxError, XlsxResult};
use crate::styles::GlobalStyleTable;
use crate::xml_writer::XmlWriter;

const SHEET_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";
const CT_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";

const WORKSHEET_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet";
const STYLES_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles";
const SST_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings";
const COMMENTS_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments";
const HYPERLINK_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/hyperlink";
const TABLE_REL_TYPE: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships/table";

/// Shared-string adoption policy (external interfaces: writer configuration).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SstPolicy {
    /// Adopt the shared-strings table when repetition makes it worthwhile.
    #[default]
    Auto,
    Always,
    Never,
}

/// ZIP compression method for non-worksheet parts; worksheet entries are
/// always written Deflated regardless of this setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Compression {
    #[default]
    Deflated,
    Stored,
}

impl Compression {
    fn method(self) -> CompressionMethod {
        match self {
            Compression::Deflated => CompressionMethod::Deflated,
            Compression::Stored => CompressionMethod::Stored,
        }
    }
}

/// Writer configuration.
#[derive(Debug, Clone)]
pub struct WriterConfig {
    pub sst_policy: SstPolicy,
    pub compression: Compression,
    pub pretty_print: bool,
    /// Prepend `'` to text cells whose content starts with `= + - @`, the
    /// characters a spreadsheet app reinterprets as a formula/command when a
    /// file is opened elsewhere. Off by default to preserve exact fidelity.
    pub secure: bool,
    /// Skip the auto-detect pass (only consulted by [`XlsxWriter::write_rows`]).
    pub dimension: Option<CellRange>,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            sst_policy: SstPolicy::default(),
            compression: Compression::default(),
            pretty_print: true,
            secure: false,
            dimension: None,
        }
    }
}

impl WriterConfig {
    /// Default configuration with formula-injection escaping turned on.
    pub fn secure() -> Self {
        Self { secure: true, ..Self::default() }
    }
}

fn sheet_file_options() -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(CompressionMethod::Deflated)
}

fn part_options(config: &WriterConfig) -> SimpleFileOptions {
    SimpleFileOptions::default().compression_method(config.compression.method())
}

/// Incrementally interned shared-strings table. Built while worksheet bodies
/// are serialized and written last, per the streaming contract.
struct SstBuilder {
    index: HashMap<String, u32>,
    order: Vec<String>,
    total: u32,
}

impl SstBuilder {
    fn new() -> Self {
        Self { index: HashMap::new(), order: Vec::new(), total: 0 }
    }

    fn intern(&mut self, s: &str) -> u32 {
        self.total += 1;
        if let Some(&id) = self.index.get(s) {
            return id;
        }
        let id = self.order.len() as u32;
        self.order.push(s.to_string());
        self.index.insert(s.to_string(), id);
        id
    }

    fn write_xml<W: Write>(&self, out: W) -> XlsxResult<W> {
        let mut xw = XmlWriter::new(out);
        xw.start_doc()?;
        xw.start_element("sst")?;
        xw.write_attribute("xmlns", SHEET_NS);
        xw.write_attribute("count", &self.total.to_string());
        xw.write_attribute("uniqueCount", &self.order.len().to_string());
        for s in &self.order {
            xw.start_element("si")?;
            write_text_element(&mut xw, s)?;
            xw.end_element()?;
        }
        xw.end_element()?;
        xw.end_doc()?;
        xw.into_inner()
    }
}

fn needs_preserve_space(s: &str) -> bool {
    s.starts_with([' ', '\t']) || s.ends_with([' ', '\t']) || s.contains('\n')
}

fn write_text_element<W: Write>(xw: &mut XmlWriter<W>, text: &str) -> XlsxResult<()> {
    xw.start_element("t")?;
    if needs_preserve_space(text) {
        xw.write_attribute("xml:space", "preserve");
    }
    xw.write_characters(text)?;
    xw.end_element()
}

/// Decides whether `Auto` adopts the shared-strings table for a fully
/// materialized workbook: total text-cell occurrences exceed 1.5x the
/// distinct-string count, and the average distinct string is longer than
/// about 4 characters. Only plain `Text` cells are counted; rich text and
/// cached formula results are always written inline (see module docs on
/// `write_cell`).
fn should_adopt_sst(sheets: &[&Sheet]) -> bool {
    let mut counts: HashMap<&str, u32> = HashMap::new();
    let mut total = 0u32;
    for sheet in sheets {
        for (_, cell) in sheet.iter() {
            if let CellValue::Text(s) = &cell.value {
                *counts.entry(s.as_str()).or_insert(0) += 1;
                total += 1;
            }
        }
    }
    if counts.is_empty() {
        return false;
    }
    let unique = counts.len() as f64;
    let avg_len: f64 = counts.keys().map(|s| s.len() as f64).sum::<f64>() / unique;
    (total as f64) > 1.5 * unique && avg_len > 4.0
}

fn secure_escape(text: &str, secure: bool) -> String {
    if secure && text.starts_with(['=', '+', '-', '@']) {
        format!("'{text}")
    } else {
        text.to_string()
    }
}

/// What a `<c>` element's value children look like, decided before any
/// attribute is written (the push writer needs attributes pushed first).
enum CellBody {
    None,
    Value(String),
    InlineStr(String),
}

struct CellXml {
    type_attr: Option<&'static str>,
    formula: Option<String>,
    body: CellBody,
}

fn scalar_body(value: &CellValue, secure: bool, sst: &mut Option<SstBuilder>) -> (Option<&'static str>, CellBody) {
    match value {
        CellValue::Empty => (None, CellBody::None),
        CellValue::Text(s) => {
            let text = secure_escape(s.as_str(), secure);
            match sst {
                Some(builder) => (Some("s"), CellBody::Value(builder.intern(&text).to_string())),
                None => (Some("inlineStr"), CellBody::InlineStr(text)),
            }
        }
        CellValue::RichText(runs) => {
            let flattened: String = runs.iter().map(|r| r.text.as_str()).collect();
            (Some("inlineStr"), CellBody::InlineStr(secure_escape(&flattened, secure)))
        }
        CellValue::Number(d) => (None, CellBody::Value(d.to_string())),
        CellValue::Bool(b) => (Some("b"), CellBody::Value(if *b { "1".into() } else { "0".into() })),
        CellValue::DateTime(dt) => (None, CellBody::Value(datetime_to_serial(*dt).to_string())),
        CellValue::Error(e) => (Some("e"), CellBody::Value(e.as_str().to_string())),
        CellValue::Formula { .. } => unreachable!("formula handled by resolve_cell_xml"),
    }
}

fn resolve_cell_xml(value: &CellValue, secure: bool, sst: &mut Option<SstBuilder>) -> CellXml {
    match value {
        CellValue::Formula { expr, cached } => {
            let (type_attr, body) = match cached.as_deref() {
                None => (None, CellBody::None),
                Some(CellValue::RichText(_)) | Some(CellValue::Formula { .. }) | Some(CellValue::Empty) => {
                    (None, CellBody::None)
                }
                Some(other) => scalar_body(other, secure, &mut None),
            };
            CellXml { type_attr, formula: Some(expr.clone()), body }
        }
        other => {
            let (type_attr, body) = scalar_body(other, secure, sst);
            CellXml { type_attr, formula: None, body }
        }
    }
}

/// Write one `<c>` element. `sst` is only consulted for plain `Text` values;
/// formula-cached text results always render as `t="str"` inline, matching
/// the read-side decode table.
fn write_cell<W: Write>(
    xw: &mut XmlWriter<W>,
    aref: ARef,
    style_idx: u32,
    value: &CellValue,
    secure: bool,
    sst: &mut Option<SstBuilder>,
) -> XlsxResult<()> {
    if value.is_empty() && style_idx == 0 {
        return Ok(());
    }
    let xml = resolve_cell_xml(value, secure, sst);
    xw.start_element("c")?;
    xw.write_attribute("r", &aref.to_a1());
    if style_idx != 0 {
        xw.write_attribute("s", &style_idx.to_string());
    }
    if let Some(t) = xml.type_attr {
        xw.write_attribute("t", t);
    }
    if let Some(expr) = &xml.formula {
        xw.start_element("f")?;
        xw.write_characters(expr)?;
        xw.end_element()?;
    }
    match xml.body {
        CellBody::None => {}
        CellBody::Value(text) => {
            xw.start_element("v")?;
            xw.write_characters(&text)?;
            xw.end_element()?;
        }
        CellBody::InlineStr(text) => {
            xw.start_element("is")?;
            write_text_element(xw, &text)?;
            xw.end_element()?;
        }
    }
    xw.end_element()
}

/// One already-serialized worksheet, plus everything the caller still has to
/// write alongside it.
struct SheetPart {
    xml: Vec<u8>,
    rels: Vec<RelEntry>,
    comments_xml: Option<Vec<u8>>,
    tables: Vec<(u32, Vec<u8>)>,
}

struct RelEntry {
    id: u32,
    rel_type: &'static str,
    target: String,
    external: bool,
}

/// XLSX writer.
pub struct XlsxWriter;

impl XlsxWriter {
    /// Write a fully materialized workbook to a file path.
    pub fn write_file<P: AsRef<Path>>(workbook: &Workbook, path: P, config: &WriterConfig) -> XlsxResult<()> {
        let file = File::create(path)?;
        Self::write(workbook, file, config)
    }

    /// Write a fully materialized workbook: styles, merges, comments,
    /// hyperlinks, and tables all round-trip.
    pub fn write<W: Write + Seek>(workbook: &Workbook, out: W, config: &WriterConfig) -> XlsxResult<()> {
        let sheets: Vec<&Sheet> = workbook.sheets().iter().collect();
        validate_sheets(&sheets)?;

        let style_table = GlobalStyleTable::build(&sheets);
        let mut sst = match config.sst_policy {
            SstPolicy::Never => None,
            SstPolicy::Always => Some(SstBuilder::new()),
            SstPolicy::Auto => should_adopt_sst(&sheets).then(SstBuilder::new),
        };

        let mut next_table_id = 1u32;
        let parts: Vec<SheetPart> = sheets
            .iter()
            .enumerate()
            .map(|(i, sheet)| build_sheet_part(sheet, &style_table, i, config, &mut sst, &mut next_table_id))
            .collect::<XlsxResult<_>>()?;

        let mut zip = ZipWriter::new(out);
        let opts = part_options(config);

        let comment_indices: Vec<usize> =
            parts.iter().enumerate().filter(|(_, p)| p.comments_xml.is_some()).map(|(i, _)| i).collect();
        let table_ids: Vec<u32> = parts.iter().flat_map(|p| p.tables.iter().map(|(id, _)| *id)).collect();

        write_content_types(&mut zip, sheets.len(), sst.is_some(), &comment_indices, &table_ids, opts)?;
        write_root_rels(&mut zip, opts)?;
        write_workbook_xml(&mut zip, workbook, opts)?;
        write_workbook_rels(&mut zip, sheets.len(), sst.is_some(), opts)?;

        zip.start_file("xl/styles.xml", opts)?;
        let styles_xml = style_table.write_xml(Vec::new())?;
        zip.write_all(&styles_xml)?;

        if let Some(sst) = &sst {
            zip.start_file("xl/sharedStrings.xml", opts)?;
            let sst_xml = sst.write_xml(Vec::new())?;
            zip.write_all(&sst_xml)?;
        }

        for (i, part) in parts.iter().enumerate() {
            zip.start_file(format!("xl/worksheets/sheet{}.xml", i + 1), sheet_file_options())?;
            zip.write_all(&part.xml)?;

            if !part.rels.is_empty() {
                zip.start_file(format!("xl/worksheets/_rels/sheet{}.xml.rels", i + 1), opts)?;
                write_rels_part(&mut zip, &part.rels)?;
            }
            if let Some(comments) = &part.comments_xml {
                zip.start_file(format!("xl/comments{}.xml", i + 1), opts)?;
                zip.write_all(comments)?;
            }
            for (table_id, table_xml) in &part.tables {
                zip.start_file(format!("xl/tables/table{table_id}.xml"), opts)?;
                zip.write_all(table_xml)?;
            }
        }

        zip.finish()?;
        Ok(())
    }

    /// Stream bare row sequences, one per named sheet, without styles,
    /// comments, or tables. Chooses the dimension-hinted single pass when
    /// `config.dimension` is set and exactly one sheet is given; otherwise
    /// spools each sheet to a temp file to discover its used range.
    pub fn write_rows<W, I>(out: W, sheets: Vec<(String, I)>, config: &WriterConfig) -> XlsxResult<()>
    where
        W: Write + Seek,
        I: IntoIterator<Item = RowData>,
    {
        if sheets.is_empty() {
            return Err(XlsxError::InvalidWorkbook("cannot write a workbook with zero sheets".into()));
        }
        let mut seen = HashSet::new();
        for (name, _) in &sheets {
            if !seen.insert(name.to_lowercase()) {
                return Err(XlsxError::InvalidWorkbook(format!("duplicate sheet name: {name}")));
            }
        }

        let mut zip = ZipWriter::new(out);
        let opts = part_options(config);
        let sheet_count = sheets.len();

        // `Auto` can't afford a pre-pass without buffering past one row of
        // memory here, so the row-only path treats it as `Always`; the
        // fidelity `write` path above computes the real heuristic because
        // its sheets are already fully resident.
        let mut sst = match config.sst_policy {
            SstPolicy::Never => None,
            SstPolicy::Always | SstPolicy::Auto => Some(SstBuilder::new()),
        };

        write_content_types(&mut zip, sheet_count, sst.is_some(), &[], &[], opts)?;
        write_root_rels(&mut zip, opts)?;

        let names: Vec<&str> = sheets.iter().map(|(n, _)| n.as_str()).collect();
        write_workbook_xml_from_names(&mut zip, &names, opts)?;
        write_workbook_rels(&mut zip, sheet_count, sst.is_some(), opts)?;

        zip.start_file("xl/styles.xml", opts)?;
        let empty: Vec<&Sheet> = Vec::new();
        let styles_xml = GlobalStyleTable::build(&empty).write_xml(Vec::new())?;
        zip.write_all(&styles_xml)?;

        for (i, (_, rows)) in sheets.into_iter().enumerate() {
            if sheet_count == 1 && config.dimension.is_some() {
                write_worksheet_single_pass(&mut zip, i, rows.into_iter(), config, &mut sst)?;
            } else {
                write_worksheet_auto_detect(&mut zip, i, rows.into_iter(), config, &mut sst)?;
            }
        }

        if let Some(sst) = &sst {
            zip.start_file("xl/sharedStrings.xml", opts)?;
            let sst_xml = sst.write_xml(Vec::new())?;
            zip.write_all(&sst_xml)?;
        }

        zip.finish()?;
        Ok(())
    }
}

fn validate_sheets(sheets: &[&Sheet]) -> XlsxResult<()> {
    if sheets.is_empty() {
        return Err(XlsxError::InvalidWorkbook("cannot write a workbook with zero sheets".into()));
    }
    let mut seen = HashSet::new();
    for sheet in sheets {
        if !seen.insert(sheet.name().as_str().to_lowercase()) {
            return Err(XlsxError::InvalidWorkbook(format!("duplicate sheet name: {}", sheet.name().as_str())));
        }
    }
    Ok(())
}

fn build_sheet_part(
    sheet: &Sheet,
    style_table: &GlobalStyleTable,
    sheet_index: usize,
    config: &WriterConfig,
    sst: &mut Option<SstBuilder>,
    next_table_id: &mut u32,
) -> XlsxResult<SheetPart> {
    let hyperlinks: Vec<(ARef, &Hyperlink)> =
        sheet.iter().filter_map(|(aref, cell)| cell.hyperlink.as_ref().map(|h| (*aref, h))).collect();
    let has_comments = sheet.iter().any(|(_, cell)| cell.comment.is_some());
    let tables = sheet.tables();

    let mut rels = Vec::new();
    let mut next_id = 1u32;

    let comments_rid = has_comments.then(|| {
        let id = next_id;
        next_id += 1;
        rels.push(RelEntry {
            id,
            rel_type: COMMENTS_REL_TYPE,
            target: format!("../comments{}.xml", sheet_index + 1),
            external: false,
        });
        id
    });

    let hyperlink_rids: Vec<u32> = hyperlinks
        .iter()
        .map(|(_, hl)| {
            let id = next_id;
            next_id += 1;
            rels.push(RelEntry { id, rel_type: HYPERLINK_REL_TYPE, target: hl.target.clone(), external: true });
            id
        })
        .collect();

    let table_rids: Vec<(u32, u32)> = tables
        .iter()
        .map(|_| {
            let id = next_id;
            next_id += 1;
            let table_id = *next_table_id;
            *next_table_id += 1;
            rels.push(RelEntry {
                id,
                rel_type: TABLE_REL_TYPE,
                target: format!("../tables/table{table_id}.xml"),
                external: false,
            });
            (id, table_id)
        })
        .collect();

    let mut xw = XmlWriter::new(Vec::new());
    xw.start_doc()?;
    xw.start_element("worksheet")?;
    xw.write_attribute("xmlns", SHEET_NS);
    if !hyperlink_rids.is_empty() || !table_rids.is_empty() {
        xw.write_attribute("xmlns:r", R_NS);
    }

    if let Some(used) = sheet.used_range() {
        xw.start_element("dimension")?;
        xw.write_attribute("ref", &used.to_a1());
        xw.end_element()?;
    }

    write_cols(&mut xw, sheet.column_properties())?;
    write_sheet_data(&mut xw, sheet, style_table, sheet_index, config.secure, sst)?;

    if !sheet.merged_ranges().is_empty() {
        sheet.validate_merges()?;
        xw.start_element("mergeCells")?;
        xw.write_attribute("count", &sheet.merged_ranges().len().to_string());
        for range in sheet.merged_ranges() {
            xw.start_element("mergeCell")?;
            xw.write_attribute("ref", &range.to_a1());
            xw.end_element()?;
        }
        xw.end_element()?;
    }

    if !hyperlinks.is_empty() {
        xw.start_element("hyperlinks")?;
        for ((aref, hl), rid) in hyperlinks.iter().zip(hyperlink_rids.iter()) {
            xw.start_element("hyperlink")?;
            xw.write_attribute("ref", &aref.to_a1());
            xw.write_attribute("r:id", &format!("rId{rid}"));
            if let Some(tooltip) = &hl.tooltip {
                xw.write_attribute("tooltip", tooltip);
            }
            xw.end_element()?;
        }
        xw.end_element()?;
    }

    if let Some(setup) = sheet.page_setup() {
        write_page_setup(&mut xw, setup)?;
    }

    if !table_rids.is_empty() {
        xw.start_element("tableParts")?;
        xw.write_attribute("count", &table_rids.len().to_string());
        for (rid, _) in &table_rids {
            xw.start_element("tablePart")?;
            xw.write_attribute("r:id", &format!("rId{rid}"));
            xw.end_element()?;
        }
        xw.end_element()?;
    }

    xw.end_element()?; // worksheet
    xw.end_doc()?;
    let xml = xw.into_inner()?;

    let comments_xml = has_comments.then(|| build_comments_xml(sheet)).transpose()?.flatten();
    let _ = comments_rid; // referenced only via the shared per-sheet rels file

    let tables_xml: XlsxResult<Vec<(u32, Vec<u8>)>> = tables
        .iter()
        .zip(table_rids.iter())
        .map(|(table, (_, table_id))| Ok((*table_id, build_table_xml(sheet, table)?)))
        .collect();

    Ok(SheetPart { xml, rels, comments_xml, tables: tables_xml? })
}

fn write_cols<W: Write>(xw: &mut XmlWriter<W>, columns: &[xlforge_core::ColumnProperties]) -> XlsxResult<()> {
    let custom: Vec<_> = columns.iter().filter(|c| c.has_custom_settings()).collect();
    if custom.is_empty() {
        return Ok(());
    }
    xw.start_element("cols")?;
    for col in custom {
        xw.start_element("col")?;
        let one_based = (col.index as u32 + 1).to_string();
        xw.write_attribute("min", &one_based);
        xw.write_attribute("max", &one_based);
        if let Some(w) = col.width {
            xw.write_attribute("width", &w.to_string());
            xw.write_attribute("customWidth", "1");
        }
        if col.hidden {
            xw.write_attribute("hidden", "1");
        }
        if col.outline_level > 0 {
            xw.write_attribute("outlineLevel", &col.outline_level.to_string());
        }
        if col.best_fit {
            xw.write_attribute("bestFit", "1");
        }
        if col.collapsed {
            xw.write_attribute("collapsed", "1");
        }
        if let Some(s) = col.style_index {
            xw.write_attribute("style", &s.to_string());
        }
        xw.end_element()?;
    }
    xw.end_element()
}

fn write_row_attrs<W: Write>(xw: &mut XmlWriter<W>, props: &xlforge_core::RowProperties) {
    if let Some(h) = props.height {
        xw.write_attribute("ht", &h.to_string());
        xw.write_attribute("customHeight", "1");
    }
    if props.hidden {
        xw.write_attribute("hidden", "1");
    }
    if props.outline_level > 0 {
        xw.write_attribute("outlineLevel", &props.outline_level.to_string());
    }
    if props.collapsed {
        xw.write_attribute("collapsed", "1");
    }
}

fn write_sheet_data<W: Write>(
    xw: &mut XmlWriter<W>,
    sheet: &Sheet,
    style_table: &GlobalStyleTable,
    sheet_index: usize,
    secure: bool,
    sst: &mut Option<SstBuilder>,
) -> XlsxResult<()> {
    use std::collections::BTreeMap;

    let mut rows: BTreeMap<u32, Vec<(ARef, &xlforge_core::Cell)>> = BTreeMap::new();
    for (aref, cell) in sheet.iter() {
        rows.entry(aref.row().index1()).or_default().push((*aref, cell));
    }
    let row_props: HashMap<u32, &xlforge_core::RowProperties> =
        sheet.row_properties().iter().map(|p| (p.index + 1, p)).collect();
    let mut all_rows: std::collections::BTreeSet<u32> = rows.keys().copied().collect();
    all_rows.extend(row_props.keys().copied());

    xw.start_element("sheetData")?;
    for row_idx in all_rows {
        xw.start_element("row")?;
        xw.write_attribute("r", &row_idx.to_string());
        if let Some(props) = row_props.get(&row_idx) {
            write_row_attrs(xw, props);
        }
        if let Some(cells) = rows.get(&row_idx) {
            for (aref, cell) in cells {
                let style_idx = style_table.resolve(sheet_index, cell.style_id);
                write_cell(xw, *aref, style_idx, &cell.value, secure, sst)?;
            }
        }
        xw.end_element()?;
    }
    xw.end_element()
}

fn write_page_setup<W: Write>(xw: &mut XmlWriter<W>, setup: &PageSetup) -> XlsxResult<()> {
    xw.start_element("pageSetup")?;
    xw.write_attribute("orientation", if setup.orientation_landscape { "landscape" } else { "portrait" });
    if let Some(w) = setup.fit_to_width {
        xw.write_attribute("fitToWidth", &w.to_string());
    }
    if let Some(h) = setup.fit_to_height {
        xw.write_attribute("fitToHeight", &h.to_string());
    }
    if let Some(p) = setup.paper_size {
        xw.write_attribute("paperSize", &p.to_string());
    }
    xw.end_element()
}

fn build_comments_xml(sheet: &Sheet) -> XlsxResult<Vec<u8>> {
    let mut authors: Vec<String> = Vec::new();
    let mut entries: Vec<(ARef, &CellComment)> = Vec::new();
    for (aref, cell) in sheet.iter() {
        if let Some(comment) = &cell.comment {
            if !authors.iter().any(|a| a == &comment.author) {
                authors.push(comment.author.clone());
            }
            entries.push((*aref, comment));
        }
    }

    let mut xw = XmlWriter::new(Vec::new());
    xw.start_doc()?;
    xw.start_element("comments")?;
    xw.write_attribute("xmlns", SHEET_NS);
    xw.start_element("authors")?;
    for author in &authors {
        xw.start_element("author")?;
        xw.write_characters(author)?;
        xw.end_element()?;
    }
    xw.end_element()?;

    xw.start_element("commentList")?;
    for (aref, comment) in &entries {
        xw.start_element("comment")?;
        xw.write_attribute("ref", &aref.to_a1());
        let author_id = authors.iter().position(|a| a == &comment.author).unwrap_or(0);
        xw.write_attribute("authorId", &author_id.to_string());
        xw.start_element("text")?;
        xw.start_element("r")?;
        write_text_element(&mut xw, &comment.text)?;
        xw.end_element()?; // r
        xw.end_element()?; // text
        xw.end_element()?; // comment
    }
    xw.end_element()?; // commentList
    xw.end_element()?; // comments
    xw.end_doc()?;
    xw.into_inner()
}

fn build_table_xml(sheet: &Sheet, table: &Table) -> XlsxResult<Vec<u8>> {
    let col_count = table.range.col_count();
    let header_names: Vec<String> = (0..col_count)
        .map(|offset| {
            if table.has_header_row {
                let col = table.range.start.col().index0() + offset;
                let header_ref = ARef::new(table.range.start.row(), xlforge_core::Column::new(col).unwrap());
                sheet.get(header_ref).value.as_str().map(str::to_string)
            } else {
                None
            }
            .unwrap_or_else(|| format!("Column{}", offset + 1))
        })
        .collect();

    let mut xw = XmlWriter::new(Vec::new());
    xw.start_doc()?;
    xw.start_element("table")?;
    xw.write_attribute("xmlns", SHEET_NS);
    xw.write_attribute("name", &table.name);
    xw.write_attribute("displayName", &table.name);
    xw.write_attribute("ref", &table.range.to_a1());
    xw.write_attribute("totalsRowShown", "0");
    if !table.has_header_row {
        xw.write_attribute("headerRowCount", "0");
    }

    xw.start_element("autoFilter")?;
    xw.write_attribute("ref", &table.range.to_a1());
    xw.end_element()?;

    xw.start_element("tableColumns")?;
    xw.write_attribute("count", &header_names.len().to_string());
    for (i, name) in header_names.iter().enumerate() {
        xw.start_element("tableColumn")?;
        xw.write_attribute("id", &(i + 1).to_string());
        xw.write_attribute("name", name);
        xw.end_element()?;
    }
    xw.end_element()?;

    xw.end_element()?; // table
    xw.end_doc()?;
    xw.into_inner()
}

fn write_rels_part<W: Write>(zip: &mut W, rels: &[RelEntry]) -> XlsxResult<()> {
    let mut xw = XmlWriter::new(zip);
    xw.start_doc()?;
    xw.start_element("Relationships")?;
    xw.write_attribute("xmlns", REL_NS);
    for rel in rels {
        xw.start_element("Relationship")?;
        xw.write_attribute("Id", &format!("rId{}", rel.id));
        xw.write_attribute("Type", rel.rel_type);
        xw.write_attribute("Target", &rel.target);
        if rel.external {
            xw.write_attribute("TargetMode", "External");
        }
        xw.end_element()?;
    }
    xw.end_element()?;
    xw.end_doc()?;
    xw.flush()
}

fn write_content_types<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    sheet_count: usize,
    has_sst: bool,
    comment_sheet_indices: &[usize],
    table_ids: &[u32],
    opts: SimpleFileOptions,
) -> XlsxResult<()> {
    zip.start_file("[Content_Types].xml", opts)?;
    let mut xw = XmlWriter::new(zip);
    xw.start_doc()?;
    xw.start_element("Types")?;
    xw.write_attribute("xmlns", CT_NS);

    xw.start_element("Default")?;
    xw.write_attribute("Extension", "rels");
    xw.write_attribute("ContentType", "application/vnd.openxmlformats-package.relationships+xml");
    xw.end_element()?;

    xw.start_element("Default")?;
    xw.write_attribute("Extension", "xml");
    xw.write_attribute("ContentType", "application/xml");
    xw.end_element()?;

    write_override(&mut xw, "/xl/workbook.xml", "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml")?;
    write_override(&mut xw, "/xl/styles.xml", "application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml")?;

    if has_sst {
        write_override(
            &mut xw,
            "/xl/sharedStrings.xml",
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml",
        )?;
    }

    for i in 0..sheet_count {
        write_override(
            &mut xw,
            &format!("/xl/worksheets/sheet{}.xml", i + 1),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml",
        )?;
    }

    for &i in comment_sheet_indices {
        write_override(
            &mut xw,
            &format!("/xl/comments{}.xml", i + 1),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml",
        )?;
    }

    for id in table_ids {
        write_override(
            &mut xw,
            &format!("/xl/tables/table{id}.xml"),
            "application/vnd.openxmlformats-officedocument.spreadsheetml.table+xml",
        )?;
    }

    xw.end_element()?; // Types
    xw.end_doc()?;
    xw.flush()
}

fn write_override<W: Write>(xw: &mut XmlWriter<W>, part_name: &str, content_type: &str) -> XlsxResult<()> {
    xw.start_element("Override")?;
    xw.write_attribute("PartName", part_name);
    xw.write_attribute("ContentType", content_type);
    xw.end_element()
}

fn write_root_rels<W: Write + Seek>(zip: &mut ZipWriter<W>, opts: SimpleFileOptions) -> XlsxResult<()> {
    zip.start_file("_rels/.rels", opts)?;
    let mut xw = XmlWriter::new(zip);
    xw.start_doc()?;
    xw.start_element("Relationships")?;
    xw.write_attribute("xmlns", REL_NS);
    xw.start_element("Relationship")?;
    xw.write_attribute("Id", "rId1");
    xw.write_attribute("Type", "http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument");
    xw.write_attribute("Target", "xl/workbook.xml");
    xw.end_element()?;
    xw.end_element()?;
    xw.end_doc()?;
    xw.flush()
}

fn write_workbook_xml<W: Write + Seek>(zip: &mut ZipWriter<W>, workbook: &Workbook, opts: SimpleFileOptions) -> XlsxResult<()> {
    zip.start_file("xl/workbook.xml", opts)?;
    let mut xw = XmlWriter::new(zip);
    xw.start_doc()?;
    xw.start_element("workbook")?;
    xw.write_attribute("xmlns", SHEET_NS);
    xw.write_attribute("xmlns:r", R_NS);

    let settings = workbook.settings();
    if settings.date_1904 {
        xw.start_element("workbookPr")?;
        xw.write_attribute("date1904", "1");
        xw.end_element()?;
    }

    xw.start_element("sheets")?;
    for (i, sheet) in workbook.sheets().iter().enumerate() {
        xw.start_element("sheet")?;
        xw.write_attribute("name", sheet.name().as_str());
        xw.write_attribute("sheetId", &(i + 1).to_string());
        xw.write_attribute("r:id", &format!("rId{}", i + 1));
        xw.end_element()?;
    }
    xw.end_element()?; // sheets

    xw.start_element("calcPr")?;
    xw.write_attribute("fullCalcOnLoad", if settings.calc_on_open { "1" } else { "0" });
    xw.end_element()?;

    xw.end_element()?; // workbook
    xw.end_doc()?;
    xw.flush()
}

fn write_workbook_xml_from_names<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    names: &[&str],
    opts: SimpleFileOptions,
) -> XlsxResult<()> {
    zip.start_file("xl/workbook.xml", opts)?;
    let mut xw = XmlWriter::new(zip);
    xw.start_doc()?;
    xw.start_element("workbook")?;
    xw.write_attribute("xmlns", SHEET_NS);
    xw.write_attribute("xmlns:r", R_NS);
    xw.start_element("sheets")?;
    for (i, name) in names.iter().enumerate() {
        xw.start_element("sheet")?;
        xw.write_attribute("name", name);
        xw.write_attribute("sheetId", &(i + 1).to_string());
        xw.write_attribute("r:id", &format!("rId{}", i + 1));
        xw.end_element()?;
    }
    xw.end_element()?;
    xw.end_element()?;
    xw.end_doc()?;
    xw.flush()
}

fn write_workbook_rels<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    sheet_count: usize,
    has_sst: bool,
    opts: SimpleFileOptions,
) -> XlsxResult<()> {
    zip.start_file("xl/_rels/workbook.xml.rels", opts)?;
    let mut xw = XmlWriter::new(zip);
    xw.start_doc()?;
    xw.start_element("Relationships")?;
    xw.write_attribute("xmlns", REL_NS);
    for i in 0..sheet_count {
        xw.start_element("Relationship")?;
        xw.write_attribute("Id", &format!("rId{}", i + 1));
        xw.write_attribute("Type", WORKSHEET_REL_TYPE);
        xw.write_attribute("Target", &format!("worksheets/sheet{}.xml", i + 1));
        xw.end_element()?;
    }
    let mut next_id = sheet_count + 1;
    xw.start_element("Relationship")?;
    xw.write_attribute("Id", &format!("rId{next_id}"));
    xw.write_attribute("Type", STYLES_REL_TYPE);
    xw.write_attribute("Target", "styles.xml");
    xw.end_element()?;
    next_id += 1;

    if has_sst {
        xw.start_element("Relationship")?;
        xw.write_attribute("Id", &format!("rId{next_id}"));
        xw.write_attribute("Type", SST_REL_TYPE);
        xw.write_attribute("Target", "sharedStrings.xml");
        xw.end_element()?;
    }

    xw.end_element()?; // Relationships
    xw.end_doc()?;
    xw.flush()
}

/// Writes `<row>` fragments (no enclosing `<sheetData>`) for the row-stream
/// path, tracking `(min_row, max_row, min_col, max_col)` as it goes.
fn write_row_fragments<W: Write>(
    out: W,
    rows: impl Iterator<Item = RowData>,
    secure: bool,
    sst: &mut Option<SstBuilder>,
) -> XlsxResult<(W, Option<(u32, u32, u32, u32)>)> {
    let mut bounds: Option<(u32, u32, u32, u32)> = None;
    let mut xw = XmlWriter::new(out);
    for row in rows {
        let entry = bounds.get_or_insert((row.row_index, row.row_index, u32::MAX, 0));
        entry.0 = entry.0.min(row.row_index);
        entry.1 = entry.1.max(row.row_index);

        xw.start_element("row")?;
        xw.write_attribute("r", &row.row_index.to_string());
        for (col, value) in &row.cells {
            let entry = bounds.get_or_insert((row.row_index, row.row_index, *col, *col));
            entry.2 = entry.2.min(*col);
            entry.3 = entry.3.max(*col);
            let aref = ARef::from_indices(row.row_index - 1, *col)?;
            write_cell(&mut xw, aref, 0, value, secure, sst)?;
        }
        xw.end_element()?;
    }
    xw.flush()?;
    Ok((xw.into_inner()?, bounds))
}

fn dimension_from_bounds(bounds: (u32, u32, u32, u32)) -> XlsxResult<CellRange> {
    let (min_row, max_row, min_col, max_col) = bounds;
    let start = ARef::from_indices(min_row - 1, min_col)?;
    let end = ARef::from_indices(max_row - 1, max_col)?;
    Ok(CellRange::new(start, Anchor::Relative, end, Anchor::Relative))
}

fn write_worksheet_single_pass<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    sheet_index: usize,
    rows: impl Iterator<Item = RowData>,
    config: &WriterConfig,
    sst: &mut Option<SstBuilder>,
) -> XlsxResult<()> {
    zip.start_file(format!("xl/worksheets/sheet{}.xml", sheet_index + 1), sheet_file_options())?;
    write!(zip, "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")?;
    write!(zip, "<worksheet xmlns=\"{SHEET_NS}\">")?;
    if let Some(dim) = &config.dimension {
        write!(zip, "<dimension ref=\"{}\"/>", dim.to_a1())?;
    }
    write!(zip, "<sheetData>")?;
    let (zip, _bounds) = write_row_fragments(zip, rows, config.secure, sst)?;
    write!(zip, "</sheetData></worksheet>")?;
    Ok(())
}

fn write_worksheet_auto_detect<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    sheet_index: usize,
    rows: impl Iterator<Item = RowData>,
    config: &WriterConfig,
    sst: &mut Option<SstBuilder>,
) -> XlsxResult<()> {
    // An anonymous temp file: the OS reclaims it on close even if a later
    // step in this function returns early via `?`.
    let spool = tempfile::tempfile()?;
    let (mut spool, bounds) = write_row_fragments(spool, rows, config.secure, sst)?;
    spool.seek(SeekFrom::Start(0))?;

    zip.start_file(format!("xl/worksheets/sheet{}.xml", sheet_index + 1), sheet_file_options())?;
    write!(zip, "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n")?;
    write!(zip, "<worksheet xmlns=\"{SHEET_NS}\">")?;
    if let Some(bounds) = bounds {
        let dim = dimension_from_bounds(bounds)?;
        write!(zip, "<dimension ref=\"{}\"/>", dim.to_a1())?;
    }
    write!(zip, "<sheetData>")?;
    std::io::copy(&mut spool, zip)?;
    write!(zip, "</sheetData></worksheet>")?;
    Ok(())
}
