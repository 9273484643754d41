//! `xl/styles.xml`: unifies every sheet's local [`StyleRegistry`] into one
//! global table keyed by xf index, writes it, and reads it back.

use std::collections::HashMap;
use std::io::Write;

use xlforge_core::style::{
    DiagonalDirection, FontVerticalAlign, GradientStop, GradientType, PatternType, Protection,
    ReadingOrder, Underline,
};
use xlforge_core::{
    Alignment, BorderEdge, BorderLineStyle, BorderStyle, CellStyle, Color, FillStyle, FontStyle,
    HorizontalAlignment, NumberFormat, Sheet, StyleId, StyleRegistry, VerticalAlignment,
};

use crate::error::{XlsxError, XlsxResult};
use crate::xml_guard::reject_doctype;
use crate::xml_writer::XmlWriter;

/// First custom number format id; 0-163 are reserved for Excel's built-ins.
const FIRST_CUSTOM_NUM_FMT_ID: u32 = 164;

/// The global style table a write pass builds once up front: every sheet's
/// local [`StyleId`] resolves to one shared xf index, so `xl/styles.xml`
/// only has to describe each distinct style once across the whole workbook.
pub struct GlobalStyleTable {
    /// Styles in xf emission order; index 0 is always the default style.
    styles: Vec<CellStyle>,
    /// One local-to-global map per sheet, indexed the same as `sheets` was
    /// passed to [`GlobalStyleTable::build`].
    sheet_maps: Vec<HashMap<StyleId, u32>>,
}

impl GlobalStyleTable {
    pub fn build(sheets: &[&Sheet]) -> Self {
        let mut global = StyleRegistry::new();
        let mut sheet_maps = Vec::with_capacity(sheets.len());
        for sheet in sheets {
            let mut map = HashMap::new();
            for (local_id, style) in sheet.style_registry().iter() {
                let (next, global_id) = global.register(style.clone());
                global = next;
                map.insert(local_id, global_id.index());
            }
            sheet_maps.push(map);
        }
        let styles = global.iter().map(|(_, style)| style.clone()).collect();
        Self { styles, sheet_maps }
    }

    /// The global xf index for a cell's local style id on sheet `sheet_index`.
    /// `None` (no style set) maps to the default style, xf 0.
    pub fn resolve(&self, sheet_index: usize, local: Option<StyleId>) -> u32 {
        match local {
            None => 0,
            Some(id) => self.sheet_maps[sheet_index].get(&id).copied().unwrap_or(0),
        }
    }

    pub fn write_xml<W: Write>(&self, out: W) -> XlsxResult<W> {
        let mut fonts: Interned<FontStyle> = Interned::new();
        let mut fills: Interned<FillStyle> = Interned::new();
        let mut borders: Interned<BorderStyle> = Interned::new();
        let mut num_fmts: Vec<(u32, String)> = Vec::new();
        let mut xf_ids: Vec<(u32, u32, u32, u32)> = Vec::with_capacity(self.styles.len());

        for style in &self.styles {
            let num_fmt_id = resolve_num_fmt_id(&style.number_format, &mut num_fmts);
            let font_id = fonts.intern(style.font.clone());
            let fill_id = fills.intern(style.fill.clone());
            let border_id = borders.intern(style.border.clone());
            xf_ids.push((num_fmt_id, font_id, fill_id, border_id));
        }

        let mut xw = XmlWriter::new(out);
        xw.start_doc()?;
        xw.start_element("styleSheet")?;
        xw.write_attribute("xmlns", "http://schemas.openxmlformats.org/spreadsheetml/2006/main");

        if !num_fmts.is_empty() {
            xw.start_element("numFmts")?;
            xw.write_attribute("count", &num_fmts.len().to_string());
            for (id, code) in &num_fmts {
                xw.start_element("numFmt")?;
                xw.write_attribute("numFmtId", &id.to_string());
                xw.write_attribute("formatCode", code);
                xw.end_element()?;
            }
            xw.end_element()?;
        }

        xw.start_element("fonts")?;
        xw.write_attribute("count", &fonts.items.len().to_string());
        for font in &fonts.items {
            write_font(&mut xw, font)?;
        }
        xw.end_element()?;

        xw.start_element("fills")?;
        xw.write_attribute("count", &fills.items.len().to_string());
        for fill in &fills.items {
            write_fill(&mut xw, fill)?;
        }
        xw.end_element()?;

        xw.start_element("borders")?;
        xw.write_attribute("count", &borders.items.len().to_string());
        for border in &borders.items {
            write_border(&mut xw, border)?;
        }
        xw.end_element()?;

        xw.start_element("cellStyleXfs")?;
        xw.write_attribute("count", "1");
        xw.start_element("xf")?;
        xw.write_attribute("numFmtId", "0");
        xw.write_attribute("fontId", "0");
        xw.write_attribute("fillId", "0");
        xw.write_attribute("borderId", "0");
        xw.end_element()?;
        xw.end_element()?;

        xw.start_element("cellXfs")?;
        xw.write_attribute("count", &self.styles.len().to_string());
        for (style, (num_fmt_id, font_id, fill_id, border_id)) in self.styles.iter().zip(xf_ids.iter()) {
            xw.start_element("xf")?;
            xw.write_attribute("numFmtId", &num_fmt_id.to_string());
            xw.write_attribute("fontId", &font_id.to_string());
            xw.write_attribute("fillId", &fill_id.to_string());
            xw.write_attribute("borderId", &border_id.to_string());
            xw.write_attribute("xfId", "0");
            if *num_fmt_id > 0 {
                xw.write_attribute("applyNumberFormat", "1");
            }
            if *font_id > 0 {
                xw.write_attribute("applyFont", "1");
            }
            if *fill_id > 0 {
                xw.write_attribute("applyFill", "1");
            }
            if *border_id > 0 {
                xw.write_attribute("applyBorder", "1");
            }
            if style.alignment != Alignment::default() {
                xw.write_attribute("applyAlignment", "1");
            }
            if style.protection != Protection::default() {
                xw.write_attribute("applyProtection", "1");
            }
            if style.alignment != Alignment::default() {
                write_alignment(&mut xw, &style.alignment)?;
            }
            write_protection(&mut xw, &style.protection)?;
            xw.end_element()?;
        }
        xw.end_element()?;

        xw.start_element("cellStyles")?;
        xw.write_attribute("count", "1");
        xw.start_element("cellStyle")?;
        xw.write_attribute("name", "Normal");
        xw.write_attribute("xfId", "0");
        xw.write_attribute("builtinId", "0");
        xw.end_element()?;
        xw.end_element()?;

        xw.end_element()?; // styleSheet
        xw.end_doc()?;
        xw.into_inner()
    }
}

/// A simple linear-scan intern table: the distinct font/fill/border count
/// in a real workbook is small, so equality scans stay cheap. Seeded with
/// the type's default value at index 0, matching the default cell style.
struct Interned<T> {
    items: Vec<T>,
}

impl<T: PartialEq + Default> Interned<T> {
    fn new() -> Self {
        Self { items: vec![T::default()] }
    }

    fn intern(&mut self, item: T) -> u32 {
        if let Some(pos) = self.items.iter().position(|existing| existing == &item) {
            return pos as u32;
        }
        self.items.push(item);
        (self.items.len() - 1) as u32
    }
}

fn resolve_num_fmt_id(format: &NumberFormat, custom: &mut Vec<(u32, String)>) -> u32 {
    match format {
        NumberFormat::Custom(code) => {
            if let Some((id, _)) = custom.iter().find(|(_, existing)| existing == code) {
                *id
            } else {
                let id = FIRST_CUSTOM_NUM_FMT_ID + custom.len() as u32;
                custom.push((id, code.clone()));
                id
            }
        }
        NumberFormat::General => 0,
        NumberFormat::Integer => NumberFormat::ID_NUMBER_INT,
        NumberFormat::Decimal => NumberFormat::ID_NUMBER_DEC2,
        NumberFormat::Currency => NumberFormat::ID_ACCOUNTING_DEC2,
        NumberFormat::Percent => NumberFormat::ID_PERCENT_DEC2,
        NumberFormat::Date => NumberFormat::ID_DATE_SHORT,
        NumberFormat::BuiltIn(id) => *id,
    }
}

fn write_color<W: Write>(xw: &mut XmlWriter<W>, tag: &str, color: &Color) -> XlsxResult<()> {
    xw.start_element(tag)?;
    match color {
        Color::Theme { index, tint } => {
            xw.write_attribute("theme", &index.to_string());
            if *tint != 0 {
                xw.write_attribute("tint", &(*tint as f64 / 100.0).to_string());
            }
        }
        Color::Indexed(i) => xw.write_attribute("indexed", &i.to_string()),
        Color::Auto | Color::Rgb { .. } | Color::Argb { .. } => {
            xw.write_attribute("rgb", &color.to_argb_hex());
        }
    }
    xw.end_element()
}

fn parse_color(node: &Node) -> Color {
    if let Some(theme) = node.attr("theme").and_then(|s| s.parse::<u8>().ok()) {
        let tint = node
            .attr("tint")
            .and_then(|s| s.parse::<f64>().ok())
            .map(|t| (t * 100.0).round() as i8)
            .unwrap_or(0);
        return Color::Theme { index: theme, tint };
    }
    if let Some(indexed) = node.attr("indexed").and_then(|s| s.parse::<u8>().ok()) {
        return Color::Indexed(indexed);
    }
    if let Some(rgb) = node.attr("rgb") {
        return Color::from_hex(rgb).unwrap_or(Color::Auto);
    }
    Color::Auto
}

fn write_font<W: Write>(xw: &mut XmlWriter<W>, font: &FontStyle) -> XlsxResult<()> {
    xw.start_element("font")?;
    xw.start_element("sz")?;
    xw.write_attribute("val", &font.size.to_string());
    xw.end_element()?;
    write_color(xw, "color", &font.color)?;
    xw.start_element("name")?;
    xw.write_attribute("val", &font.name);
    xw.end_element()?;
    if font.bold {
        xw.start_element("b")?;
        xw.end_element()?;
    }
    if font.italic {
        xw.start_element("i")?;
        xw.end_element()?;
    }
    if font.strikethrough {
        xw.start_element("strike")?;
        xw.end_element()?;
    }
    match font.underline {
        Underline::None => {}
        Underline::Single => {
            xw.start_element("u")?;
            xw.end_element()?;
        }
        other => {
            xw.start_element("u")?;
            xw.write_attribute("val", underline_value(other));
            xw.end_element()?;
        }
    }
    match font.vertical_align {
        FontVerticalAlign::Baseline => {}
        FontVerticalAlign::Superscript => {
            xw.start_element("vertAlign")?;
            xw.write_attribute("val", "superscript");
            xw.end_element()?;
        }
        FontVerticalAlign::Subscript => {
            xw.start_element("vertAlign")?;
            xw.write_attribute("val", "subscript");
            xw.end_element()?;
        }
    }
    xw.end_element() // font
}

fn underline_value(u: Underline) -> &'static str {
    match u {
        Underline::None | Underline::Single => "single",
        Underline::Double => "double",
        Underline::SingleAccounting => "singleAccounting",
        Underline::DoubleAccounting => "doubleAccounting",
    }
}

fn parse_font(node: &Node) -> FontStyle {
    let mut font = FontStyle { name: String::new(), ..FontStyle::default() };
    if let Some(sz) = node.child("sz") {
        if let Some(v) = sz.attr("val").and_then(|s| s.parse().ok()) {
            font.size = v;
        }
    }
    font.name = node
        .child("name")
        .and_then(|n| n.attr("val"))
        .unwrap_or("Calibri")
        .to_string();
    if let Some(color) = node.child("color") {
        font.color = parse_color(color);
    }
    font.bold = node.has_child("b");
    font.italic = node.has_child("i");
    font.strikethrough = node.has_child("strike");
    if let Some(u) = node.child("u") {
        font.underline = match u.attr("val") {
            Some("double") => Underline::Double,
            Some("singleAccounting") => Underline::SingleAccounting,
            Some("doubleAccounting") => Underline::DoubleAccounting,
            _ => Underline::Single,
        };
    }
    if let Some(va) = node.child("vertAlign") {
        font.vertical_align = match va.attr("val") {
            Some("superscript") => FontVerticalAlign::Superscript,
            Some("subscript") => FontVerticalAlign::Subscript,
            _ => FontVerticalAlign::Baseline,
        };
    }
    font
}

fn write_fill<W: Write>(xw: &mut XmlWriter<W>, fill: &FillStyle) -> XlsxResult<()> {
    xw.start_element("fill")?;
    match fill {
        FillStyle::None => {
            xw.start_element("patternFill")?;
            xw.write_attribute("patternType", "none");
            xw.end_element()?;
        }
        FillStyle::Solid { color } => {
            xw.start_element("patternFill")?;
            xw.write_attribute("patternType", "solid");
            write_color(xw, "fgColor", color)?;
            xw.end_element()?;
        }
        FillStyle::Pattern { pattern, foreground, background } => {
            xw.start_element("patternFill")?;
            xw.write_attribute("patternType", pattern_type_value(*pattern));
            write_color(xw, "fgColor", foreground)?;
            write_color(xw, "bgColor", background)?;
            xw.end_element()?;
        }
        FillStyle::Gradient { gradient_type, angle, stops } => {
            xw.start_element("gradientFill")?;
            xw.write_attribute(
                "type",
                match gradient_type {
                    GradientType::Linear => "linear",
                    GradientType::Path => "path",
                },
            );
            if *gradient_type == GradientType::Linear {
                xw.write_attribute("degree", &angle.to_string());
            }
            for stop in stops {
                xw.start_element("stop")?;
                xw.write_attribute("position", &stop.position.to_string());
                write_color(xw, "color", &stop.color)?;
                xw.end_element()?;
            }
            xw.end_element()?;
        }
    }
    xw.end_element() // fill
}

fn pattern_type_value(pattern: PatternType) -> &'static str {
    match pattern {
        PatternType::None => "none",
        PatternType::Solid => "solid",
        PatternType::MediumGray => "mediumGray",
        PatternType::DarkGray => "darkGray",
        PatternType::LightGray => "lightGray",
        PatternType::DarkHorizontal => "darkHorizontal",
        PatternType::DarkVertical => "darkVertical",
        PatternType::DarkDown => "darkDown",
        PatternType::DarkUp => "darkUp",
        PatternType::DarkGrid => "darkGrid",
        PatternType::DarkTrellis => "darkTrellis",
        PatternType::LightHorizontal => "lightHorizontal",
        PatternType::LightVertical => "lightVertical",
        PatternType::LightDown => "lightDown",
        PatternType::LightUp => "lightUp",
        PatternType::LightGrid => "lightGrid",
        PatternType::LightTrellis => "lightTrellis",
        PatternType::Gray125 => "gray125",
        PatternType::Gray0625 => "gray0625",
    }
}

fn pattern_type_from_str(s: &str) -> PatternType {
    match s {
        "solid" => PatternType::Solid,
        "mediumGray" => PatternType::MediumGray,
        "darkGray" => PatternType::DarkGray,
        "lightGray" => PatternType::LightGray,
        "darkHorizontal" => PatternType::DarkHorizontal,
        "darkVertical" => PatternType::DarkVertical,
        "darkDown" => PatternType::DarkDown,
        "darkUp" => PatternType::DarkUp,
        "darkGrid" => PatternType::DarkGrid,
        "darkTrellis" => PatternType::DarkTrellis,
        "lightHorizontal" => PatternType::LightHorizontal,
        "lightVertical" => PatternType::LightVertical,
        "lightDown" => PatternType::LightDown,
        "lightUp" => PatternType::LightUp,
        "lightGrid" => PatternType::LightGrid,
        "lightTrellis" => PatternType::LightTrellis,
        "gray125" => PatternType::Gray125,
        "gray0625" => PatternType::Gray0625,
        _ => PatternType::None,
    }
}

fn parse_fill(node: &Node) -> FillStyle {
    if let Some(pf) = node.child("patternFill") {
        let pattern_type = pf.attr("patternType").unwrap_or("none");
        let fg = pf.child("fgColor").map(parse_color);
        let bg = pf.child("bgColor").map(parse_color);
        return match pattern_type {
            "none" => FillStyle::None,
            "solid" => FillStyle::Solid { color: fg.unwrap_or(Color::Auto) },
            other => FillStyle::Pattern {
                pattern: pattern_type_from_str(other),
                foreground: fg.unwrap_or(Color::Auto),
                background: bg.unwrap_or(Color::Auto),
            },
        };
    }
    if let Some(gf) = node.child("gradientFill") {
        let gradient_type = match gf.attr("type") {
            Some("path") => GradientType::Path,
            _ => GradientType::Linear,
        };
        let angle = gf.attr("degree").and_then(|s| s.parse().ok()).unwrap_or(0.0);
        let stops = gf
            .children("stop")
            .map(|stop| GradientStop {
                position: stop.attr("position").and_then(|s| s.parse().ok()).unwrap_or(0.0),
                color: stop.child("color").map(parse_color).unwrap_or(Color::Auto),
            })
            .collect();
        return FillStyle::Gradient { gradient_type, angle, stops };
    }
    FillStyle::None
}

fn write_border<W: Write>(xw: &mut XmlWriter<W>, border: &BorderStyle) -> XlsxResult<()> {
    xw.start_element("border")?;
    if matches!(border.diagonal_direction, DiagonalDirection::Down | DiagonalDirection::Both) {
        xw.write_attribute("diagonalDown", "1");
    }
    if matches!(border.diagonal_direction, DiagonalDirection::Up | DiagonalDirection::Both) {
        xw.write_attribute("diagonalUp", "1");
    }
    write_border_edge(xw, "left", border.left.as_ref())?;
    write_border_edge(xw, "right", border.right.as_ref())?;
    write_border_edge(xw, "top", border.top.as_ref())?;
    write_border_edge(xw, "bottom", border.bottom.as_ref())?;
    write_border_edge(xw, "diagonal", border.diagonal.as_ref())?;
    xw.end_element() // border
}

fn write_border_edge<W: Write>(
    xw: &mut XmlWriter<W>,
    tag: &str,
    edge: Option<&BorderEdge>,
) -> XlsxResult<()> {
    xw.start_element(tag)?;
    if let Some(edge) = edge {
        if edge.style != BorderLineStyle::None {
            xw.write_attribute("style", border_line_style_value(edge.style));
            write_color(xw, "color", &edge.color)?;
        }
    }
    xw.end_element()
}

fn border_line_style_value(style: BorderLineStyle) -> &'static str {
    match style {
        BorderLineStyle::None => "none",
        BorderLineStyle::Thin => "thin",
        BorderLineStyle::Medium => "medium",
        BorderLineStyle::Thick => "thick",
        BorderLineStyle::Dashed => "dashed",
        BorderLineStyle::Dotted => "dotted",
        BorderLineStyle::Double => "double",
        BorderLineStyle::Hair => "hair",
        BorderLineStyle::MediumDashed => "mediumDashed",
        BorderLineStyle::DashDot => "dashDot",
        BorderLineStyle::MediumDashDot => "mediumDashDot",
        BorderLineStyle::DashDotDot => "dashDotDot",
        BorderLineStyle::MediumDashDotDot => "mediumDashDotDot",
        BorderLineStyle::SlantDashDot => "slantDashDot",
    }
}

fn border_line_style_from_str(s: &str) -> BorderLineStyle {
    match s {
        "thin" => BorderLineStyle::Thin,
        "medium" => BorderLineStyle::Medium,
        "thick" => BorderLineStyle::Thick,
        "dashed" => BorderLineStyle::Dashed,
        "dotted" => BorderLineStyle::Dotted,
        "double" => BorderLineStyle::Double,
        "hair" => BorderLineStyle::Hair,
        "mediumDashed" => BorderLineStyle::MediumDashed,
        "dashDot" => BorderLineStyle::DashDot,
        "mediumDashDot" => BorderLineStyle::MediumDashDot,
        "dashDotDot" => BorderLineStyle::DashDotDot,
        "mediumDashDotDot" => BorderLineStyle::MediumDashDotDot,
        "slantDashDot" => BorderLineStyle::SlantDashDot,
        _ => BorderLineStyle::None,
    }
}

fn parse_border(node: &Node) -> BorderStyle {
    let direction = match (node.attr("diagonalUp") == Some("1"), node.attr("diagonalDown") == Some("1")) {
        (true, true) => DiagonalDirection::Both,
        (true, false) => DiagonalDirection::Up,
        (false, true) => DiagonalDirection::Down,
        (false, false) => DiagonalDirection::None,
    };
    BorderStyle {
        left: node.child("left").and_then(parse_border_edge),
        right: node.child("right").and_then(parse_border_edge),
        top: node.child("top").and_then(parse_border_edge),
        bottom: node.child("bottom").and_then(parse_border_edge),
        diagonal: node.child("diagonal").and_then(parse_border_edge),
        diagonal_direction: direction,
    }
}

fn parse_border_edge(node: &Node) -> Option<BorderEdge> {
    let style = border_line_style_from_str(node.attr("style")?);
    if style == BorderLineStyle::None {
        return None;
    }
    let color = node.child("color").map(parse_color).unwrap_or(Color::BLACK);
    Some(BorderEdge { style, color })
}

fn write_alignment<W: Write>(xw: &mut XmlWriter<W>, alignment: &Alignment) -> XlsxResult<()> {
    xw.start_element("alignment")?;
    if alignment.horizontal != HorizontalAlignment::General {
        xw.write_attribute("horizontal", horizontal_value(alignment.horizontal));
    }
    if alignment.vertical != VerticalAlignment::Bottom {
        xw.write_attribute("vertical", vertical_value(alignment.vertical));
    }
    if alignment.wrap_text {
        xw.write_attribute("wrapText", "1");
    }
    if alignment.shrink_to_fit {
        xw.write_attribute("shrinkToFit", "1");
    }
    if alignment.indent > 0 {
        xw.write_attribute("indent", &alignment.indent.to_string());
    }
    if alignment.rotation != 0 {
        xw.write_attribute("textRotation", &alignment.rotation.to_string());
    }
    if alignment.reading_order != ReadingOrder::ContextDependent {
        let order = match alignment.reading_order {
            ReadingOrder::ContextDependent => 0,
            ReadingOrder::LeftToRight => 1,
            ReadingOrder::RightToLeft => 2,
        };
        xw.write_attribute("readingOrder", &order.to_string());
    }
    xw.end_element()
}

fn horizontal_value(h: HorizontalAlignment) -> &'static str {
    match h {
        HorizontalAlignment::General => "general",
        HorizontalAlignment::Left => "left",
        HorizontalAlignment::Center => "center",
        HorizontalAlignment::Right => "right",
        HorizontalAlignment::Fill => "fill",
        HorizontalAlignment::Justify => "justify",
        HorizontalAlignment::CenterContinuous => "centerContinuous",
        HorizontalAlignment::Distributed => "distributed",
    }
}

fn vertical_value(v: VerticalAlignment) -> &'static str {
    match v {
        VerticalAlignment::Top => "top",
        VerticalAlignment::Center => "center",
        VerticalAlignment::Bottom => "bottom",
        VerticalAlignment::Justify => "justify",
        VerticalAlignment::Distributed => "distributed",
    }
}

fn parse_alignment(node: &Node) -> Alignment {
    Alignment {
        horizontal: match node.attr("horizontal") {
            Some("left") => HorizontalAlignment::Left,
            Some("center") => HorizontalAlignment::Center,
            Some("right") => HorizontalAlignment::Right,
            Some("fill") => HorizontalAlignment::Fill,
            Some("justify") => HorizontalAlignment::Justify,
            Some("centerContinuous") => HorizontalAlignment::CenterContinuous,
            Some("distributed") => HorizontalAlignment::Distributed,
            _ => HorizontalAlignment::General,
        },
        vertical: match node.attr("vertical") {
            Some("top") => VerticalAlignment::Top,
            Some("center") => VerticalAlignment::Center,
            Some("justify") => VerticalAlignment::Justify,
            Some("distributed") => VerticalAlignment::Distributed,
            _ => VerticalAlignment::Bottom,
        },
        wrap_text: node.attr("wrapText") == Some("1"),
        shrink_to_fit: node.attr("shrinkToFit") == Some("1"),
        indent: node.attr("indent").and_then(|s| s.parse().ok()).unwrap_or(0),
        rotation: node.attr("textRotation").and_then(|s| s.parse().ok()).unwrap_or(0),
        reading_order: match node.attr("readingOrder") {
            Some("1") => ReadingOrder::LeftToRight,
            Some("2") => ReadingOrder::RightToLeft,
            _ => ReadingOrder::ContextDependent,
        },
    }
}

fn write_protection<W: Write>(xw: &mut XmlWriter<W>, protection: &Protection) -> XlsxResult<()> {
    if *protection == Protection::default() {
        return Ok(());
    }
    xw.start_element("protection")?;
    xw.write_attribute("locked", if protection.locked { "1" } else { "0" });
    xw.write_attribute("hidden", if protection.hidden { "1" } else { "0" });
    xw.end_element()
}

fn parse_protection(node: &Node) -> Protection {
    Protection {
        locked: node.attr("locked").map(|v| v != "0").unwrap_or(false),
        hidden: node.attr("hidden") == Some("1"),
    }
}

/// Parse an existing `xl/styles.xml` back into a flat xf-index-ordered list
/// of [`CellStyle`] (the form the reader consumes directly: a cell's
/// `s="N"` attribute indexes straight into this vector).
///
/// `styles.xml` is always small (tens to a few hundred distinct styles), so
/// unlike worksheet data it's read into an in-memory tree rather than
/// streamed.
pub fn parse_styles_xml(xml: &[u8]) -> XlsxResult<Vec<CellStyle>> {
    reject_doctype(xml, "xl/styles.xml")?;
    let root = parse_tree(xml)?;

    let mut num_fmts: HashMap<u32, String> = HashMap::new();
    if let Some(section) = root.child("numFmts") {
        for nf in section.children("numFmt") {
            let id: u32 = nf.attr("numFmtId").and_then(|s| s.parse().ok()).unwrap_or(0);
            let code = nf.attr("formatCode").unwrap_or_default().to_string();
            num_fmts.insert(id, code);
        }
    }

    let fonts: Vec<FontStyle> = root
        .child("fonts")
        .map(|section| section.children("font").map(parse_font).collect())
        .unwrap_or_default();

    let fills: Vec<FillStyle> = root
        .child("fills")
        .map(|section| section.children("fill").map(parse_fill).collect())
        .unwrap_or_default();

    let borders: Vec<BorderStyle> = root
        .child("borders")
        .map(|section| section.children("border").map(parse_border).collect())
        .unwrap_or_default();

    let xfs = root
        .child("cellXfs")
        .map(|section| {
            section
                .children("xf")
                .map(|xf| parse_xf(xf, &num_fmts, &fonts, &fills, &borders))
                .collect()
        })
        .unwrap_or_else(|| vec![CellStyle::default()]);

    Ok(xfs)
}

fn parse_xf(
    node: &Node,
    num_fmts: &HashMap<u32, String>,
    fonts: &[FontStyle],
    fills: &[FillStyle],
    borders: &[BorderStyle],
) -> CellStyle {
    let num_fmt_id: u32 = node.attr("numFmtId").and_then(|s| s.parse().ok()).unwrap_or(0);
    let font_id: usize = node.attr("fontId").and_then(|s| s.parse().ok()).unwrap_or(0);
    let fill_id: usize = node.attr("fillId").and_then(|s| s.parse().ok()).unwrap_or(0);
    let border_id: usize = node.attr("borderId").and_then(|s| s.parse().ok()).unwrap_or(0);

    let number_format = match num_fmts.get(&num_fmt_id) {
        Some(code) => NumberFormat::Custom(code.clone()),
        None => NumberFormat::BuiltIn(num_fmt_id),
    };

    CellStyle {
        font: fonts.get(font_id).cloned().unwrap_or_default(),
        fill: fills.get(fill_id).cloned().unwrap_or_default(),
        border: borders.get(border_id).cloned().unwrap_or_default(),
        alignment: node.child("alignment").map(parse_alignment).unwrap_or_default(),
        number_format,
        protection: node.child("protection").map(parse_protection).unwrap_or_default(),
    }
}

/// A minimal generic XML element tree, used only for the small `styles.xml`
/// part where building a full DOM is cheaper than hand-rolling a
/// stateful SAX walk over a handful of flat sections.
struct Node {
    name: String,
    attrs: HashMap<String, String>,
    children: Vec<Node>,
}

impl Node {
    fn child(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Node> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn has_child(&self, name: &str) -> bool {
        self.children.iter().any(|c| c.name == name)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }
}

fn parse_tree(xml: &[u8]) -> XlsxResult<Node> {
    use quick_xml::events::Event;
    use quick_xml::reader::Reader;

    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Node> = None;

    loop {
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| XlsxError::xml("xl/styles.xml", e))?;
        match event {
            Event::Eof => break,
            Event::Start(tag) => {
                stack.push(Node { name: local_name(&tag), attrs: tag_attrs(&tag), children: Vec::new() });
            }
            Event::Empty(tag) => {
                let node = Node { name: local_name(&tag), attrs: tag_attrs(&tag), children: Vec::new() };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(node),
                    None => root = Some(node),
                }
            }
            Event::End(_) => {
                if let Some(node) = stack.pop() {
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
            }
            _ => {}
        }
        buf.clear();
    }

    root.ok_or_else(|| XlsxError::InvalidFormat("xl/styles.xml has no root element".into()))
}

fn local_name(tag: &quick_xml::events::BytesStart) -> String {
    String::from_utf8_lossy(tag.local_name().as_ref()).into_owned()
}

fn tag_attrs(tag: &quick_xml::events::BytesStart) -> HashMap<String, String> {
    tag.attributes()
        .flatten()
        .map(|a| {
            let key = String::from_utf8_lossy(a.key.local_name().as_ref()).into_owned();
            let value = a.unescape_value().unwrap_or_default().into_owned();
            (key, value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlforge_core::{ARef, CellValue, Column, Row, SheetName};

    fn sheet_named(name: &str) -> Sheet {
        Sheet::new(SheetName::new(name).unwrap())
    }

    #[test]
    fn two_sheets_sharing_a_style_share_one_global_xf() {
        let style = CellStyle::new().bold(true);
        let a1 = ARef::new(Row::new(0).unwrap(), Column::new(0).unwrap());

        let sheet_a = sheet_named("A").put_styled(a1, CellValue::text("x"), style.clone());
        let sheet_b = sheet_named("B").put_styled(a1, CellValue::text("y"), style);

        let table = GlobalStyleTable::build(&[&sheet_a, &sheet_b]);
        let id_a = sheet_a.get(a1).style_id;
        let id_b = sheet_b.get(a1).style_id;
        assert_eq!(table.resolve(0, id_a), table.resolve(1, id_b));
        assert_ne!(table.resolve(0, id_a), 0);
    }

    #[test]
    fn no_style_resolves_to_the_default_xf() {
        let sheet = sheet_named("A");
        let table = GlobalStyleTable::build(&[&sheet]);
        assert_eq!(table.resolve(0, None), 0);
    }

    #[test]
    fn custom_number_format_gets_an_id_at_or_above_164() {
        let mut custom = Vec::new();
        let id = resolve_num_fmt_id(&NumberFormat::Custom("0.000%".into()), &mut custom);
        assert!(id >= FIRST_CUSTOM_NUM_FMT_ID);
        let id_again = resolve_num_fmt_id(&NumberFormat::Custom("0.000%".into()), &mut custom);
        assert_eq!(id, id_again);
    }

    #[test]
    fn styles_xml_round_trips_a_bold_red_fill_style() {
        let style = CellStyle::new().bold(true).fill_color(Color::RED);
        let a1 = ARef::new(Row::new(0).unwrap(), Column::new(0).unwrap());
        let sheet = sheet_named("A").put_styled(a1, CellValue::text("x"), style.clone());

        let table = GlobalStyleTable::build(&[&sheet]);
        let xml = table.write_xml(Vec::new()).unwrap();
        let parsed = parse_styles_xml(&xml).unwrap();

        let id = sheet.get(a1).style_id.unwrap();
        let global_id = table.resolve(0, Some(id)) as usize;
        assert_eq!(parsed[global_id].font.bold, true);
        assert_eq!(parsed[global_id].fill, FillStyle::Solid { color: Color::RED });
    }
}
