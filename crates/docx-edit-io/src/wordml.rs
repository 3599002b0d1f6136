//! Model -> WordprocessingML markup.
//!
//! Elements carry their source properties verbatim. An interpreted property
//! (bold, style, alignment...) is written from its source element when the
//! model still holds the value that element decodes to, and regenerated
//! otherwise, so untouched runs and paragraphs come out as they went in.

use std::borrow::Cow;

use docx_edit_core::{Alignment, Block, Container, Markup, Paragraph, Run, RunFormat, Table};

use crate::reader::{read_run_format, W_NS};

/// Child order of `w:pPr`.
const PARAGRAPH_PROPERTY_ORDER: [&str; 35] = [
    "pStyle",
    "keepNext",
    "keepLines",
    "pageBreakBefore",
    "framePr",
    "widowControl",
    "numPr",
    "suppressLineNumbers",
    "pBdr",
    "shd",
    "tabs",
    "suppressAutoHyphens",
    "kinsoku",
    "wordWrap",
    "overflowPunct",
    "topLinePunct",
    "autoSpaceDE",
    "autoSpaceDN",
    "bidi",
    "adjustRightInd",
    "snapToGrid",
    "spacing",
    "ind",
    "contextualSpacing",
    "mirrorIndents",
    "suppressOverlap",
    "jc",
    "textDirection",
    "textAlignment",
    "textboxTightWrap",
    "outlineLvl",
    "divId",
    "cnfStyle",
    "rPr",
    "sectPr",
];

/// Child order of `w:rPr`.
const RUN_PROPERTY_ORDER: [&str; 39] = [
    "rStyle",
    "rFonts",
    "b",
    "bCs",
    "i",
    "iCs",
    "caps",
    "smallCaps",
    "strike",
    "dstrike",
    "outline",
    "shadow",
    "emboss",
    "imprint",
    "noProof",
    "snapToGrid",
    "vanish",
    "webHidden",
    "color",
    "spacing",
    "w",
    "kern",
    "position",
    "sz",
    "szCs",
    "highlight",
    "u",
    "effect",
    "bdr",
    "shd",
    "fitText",
    "vertAlign",
    "rtl",
    "cs",
    "em",
    "lang",
    "eastAsianLayout",
    "specVanish",
    "oMath",
];

/// `w:rPr` children the model reads into [`RunFormat`].
const RUN_FORMAT_ELEMENTS: [&str; 7] = ["rFonts", "b", "i", "color", "sz", "highlight", "u"];

/// Blocks of a container. With `trailing_paragraph`, an empty paragraph is
/// appended unless the last block already is one (cells, headers, footers).
pub(crate) fn container_xml(container: &Container, trailing_paragraph: bool) -> String {
    let mut out = String::new();
    write_container(&mut out, container, trailing_paragraph);
    out
}

fn write_container(out: &mut String, container: &Container, trailing_paragraph: bool) {
    for block in &container.blocks {
        match block {
            Block::Paragraph(paragraph) => write_paragraph(out, paragraph),
            Block::Table(table) => write_table(out, table),
        }
    }
    if trailing_paragraph && !matches!(container.blocks.last(), Some(Block::Paragraph(_))) {
        out.push_str("<w:p/>");
    }
}

fn write_table(out: &mut String, table: &Table) {
    out.push_str("<w:tbl>");
    if !table.properties.contains("tblPr") {
        out.push_str(r#"<w:tblPr><w:tblW w:w="0" w:type="auto"/></w:tblPr>"#);
    }
    write_markup(out, &table.properties);
    if !table.properties.contains("tblGrid") {
        out.push_str("<w:tblGrid>");
        for _ in 0..table.column_count() {
            out.push_str("<w:gridCol/>");
        }
        out.push_str("</w:tblGrid>");
    }
    for row in &table.rows {
        out.push_str("<w:tr>");
        write_markup(out, &row.properties);
        for cell in &row.cells {
            out.push_str("<w:tc>");
            write_markup(out, &cell.properties);
            write_container(out, &cell.content, true);
            out.push_str("</w:tc>");
        }
        out.push_str("</w:tr>");
    }
    out.push_str("</w:tbl>");
}

fn write_markup(out: &mut String, markup: &Markup) {
    for element in markup.iter() {
        out.push_str(&element.xml);
    }
}

fn write_paragraph(out: &mut String, paragraph: &Paragraph) {
    let properties = paragraph_properties(paragraph);
    if properties.is_empty() && paragraph.runs.is_empty() {
        out.push_str("<w:p/>");
        return;
    }
    out.push_str("<w:p>");
    if !properties.is_empty() {
        out.push_str("<w:pPr>");
        out.push_str(&properties);
        out.push_str("</w:pPr>");
    }
    for run in &paragraph.runs {
        write_run(out, run);
    }
    out.push_str("</w:p>");
}

fn paragraph_properties(paragraph: &Paragraph) -> String {
    let source = &paragraph.properties;
    let stored_style = source.get("pStyle").and_then(|e| decode(&e.xml, |node| attribute(node, "val")));
    let stored_alignment = source
        .get("jc")
        .and_then(|e| decode(&e.xml, |node| attribute(node, "val")))
        .and_then(|val| val.parse::<Alignment>().ok());

    let mut elements: Vec<(&str, Cow<'_, str>)> = source
        .iter()
        .filter(|e| e.name != "pStyle" && e.name != "jc")
        .map(|e| (e.name.as_str(), Cow::Borrowed(e.xml.as_str())))
        .collect();
    elements.extend(keep_or_generate(source, "pStyle", stored_style == paragraph.style, || {
        paragraph
            .style
            .as_ref()
            .map(|style| format!(r#"<w:pStyle w:val="{}"/>"#, escape(style)))
    }));
    elements.extend(keep_or_generate(source, "jc", stored_alignment == paragraph.alignment, || {
        paragraph
            .alignment
            .map(|alignment| format!(r#"<w:jc w:val="{}"/>"#, alignment_value(alignment)))
    }));
    in_schema_order(elements, &PARAGRAPH_PROPERTY_ORDER)
}

fn alignment_value(alignment: Alignment) -> &'static str {
    match alignment {
        Alignment::Left => "left",
        Alignment::Center => "center",
        Alignment::Right => "right",
        Alignment::Justify => "both",
        Alignment::Distribute => "distribute",
    }
}

fn write_run(out: &mut String, run: &Run) {
    if !run.text.is_empty() || run.inline.is_none() {
        let properties = run_properties(run);
        out.push_str("<w:r>");
        if !properties.is_empty() {
            out.push_str("<w:rPr>");
            out.push_str(&properties);
            out.push_str("</w:rPr>");
        }
        write_run_text(out, &run.text);
        out.push_str("</w:r>");
    }
    if let Some(inline) = &run.inline {
        out.push_str(&inline.xml);
    }
}

fn write_run_text(out: &mut String, text: &str) {
    for (line_index, line) in text.split('\n').enumerate() {
        if line_index > 0 {
            out.push_str("<w:br/>");
        }
        for (tab_index, chunk) in line.split('\t').enumerate() {
            if tab_index > 0 {
                out.push_str("<w:tab/>");
            }
            if !chunk.is_empty() {
                out.push_str(r#"<w:t xml:space="preserve">"#);
                out.push_str(&escape(chunk));
                out.push_str("</w:t>");
            }
        }
    }
}

fn run_properties(run: &Run) -> String {
    let source = &run.properties;
    let stored = stored_run_format(source);
    let format = &run.format;

    let mut elements: Vec<(&str, Cow<'_, str>)> = source
        .iter()
        .filter(|e| !RUN_FORMAT_ELEMENTS.contains(&e.name.as_str()))
        .map(|e| (e.name.as_str(), Cow::Borrowed(e.xml.as_str())))
        .collect();
    elements.extend(keep_or_generate(source, "rFonts", stored.font_name == format.font_name, || {
        format.font_name.as_ref().map(|name| {
            let name = escape(name);
            format!(r#"<w:rFonts w:ascii="{name}" w:hAnsi="{name}" w:eastAsia="{name}" w:cs="{name}"/>"#)
        })
    }));
    elements.extend(keep_or_generate(source, "b", stored.bold == format.bold, || toggle("b", format.bold)));
    elements.extend(keep_or_generate(source, "i", stored.italic == format.italic, || toggle("i", format.italic)));
    elements.extend(keep_or_generate(source, "color", stored.color == format.color, || {
        format.color.as_ref().map(|color| format!(r#"<w:color w:val="{}"/>"#, escape(color)))
    }));
    elements.extend(keep_or_generate(source, "sz", stored.font_size == format.font_size, || {
        // Half-points.
        format.font_size.map(|size| format!(r#"<w:sz w:val="{}"/>"#, (size * 2.0).round() as u32))
    }));
    elements.extend(keep_or_generate(source, "highlight", stored.highlight == format.highlight, || {
        format
            .highlight
            .map(|color| format!(r#"<w:highlight w:val="{}"/>"#, color.word_value()))
    }));
    elements.extend(keep_or_generate(source, "u", stored.underline == format.underline, || {
        format.underline.map(|on| {
            let val = if on { "single" } else { "none" };
            format!(r#"<w:u w:val="{val}"/>"#)
        })
    }));
    in_schema_order(elements, &RUN_PROPERTY_ORDER)
}

/// An explicit `false` is written as `w:val="0"` so it overrides the style.
fn toggle(name: &str, value: Option<bool>) -> Option<String> {
    value.map(|on| match on {
        true => format!("<w:{name}/>"),
        false => format!(r#"<w:{name} w:val="0"/>"#),
    })
}

/// The source element when `unchanged`, else the generated one (if any).
fn keep_or_generate<'a, F>(source: &'a Markup, name: &'a str, unchanged: bool, generate: F) -> Option<(&'a str, Cow<'a, str>)>
where
    F: FnOnce() -> Option<String>,
{
    match (unchanged, source.get(name)) {
        (true, Some(element)) => Some((name, Cow::Borrowed(element.xml.as_str()))),
        (true, None) => None,
        (false, _) => generate().map(|xml| (name, Cow::Owned(xml))),
    }
}

/// Format the source run properties decode to.
fn stored_run_format(source: &Markup) -> RunFormat {
    let xml: String = source
        .iter()
        .filter(|e| RUN_FORMAT_ELEMENTS.contains(&e.name.as_str()))
        .map(|e| e.xml.as_str())
        .collect();
    if xml.is_empty() {
        return RunFormat::default();
    }
    decode(&format!("<w:rPr>{xml}</w:rPr>"), |properties| Some(read_run_format(properties))).unwrap_or_default()
}

/// Parse a fragment of source markup with the main namespace bound to `w`
/// and read its root element.
fn decode<T, F>(fragment: &str, read: F) -> Option<T>
where
    F: FnOnce(roxmltree::Node<'_, '_>) -> Option<T>,
{
    let wrapped = format!(r#"<fragment xmlns:w="{W_NS}">{fragment}</fragment>"#);
    let tree = roxmltree::Document::parse(&wrapped).ok()?;
    let root = tree.root_element().first_element_child()?;
    read(root)
}

fn attribute(node: roxmltree::Node<'_, '_>, name: &str) -> Option<String> {
    node.attribute((W_NS, name)).map(str::to_string)
}

fn in_schema_order(mut elements: Vec<(&str, Cow<'_, str>)>, order: &[&str]) -> String {
    let rank = |name: &str| order.iter().position(|known| *known == name).unwrap_or(order.len());
    elements.sort_by_key(|element| rank(element.0));
    elements.into_iter().map(|(_, xml)| xml).collect()
}

/// Escape text for element content and double-quoted attributes.
pub(crate) fn escape(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"']) {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 8);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    Cow::Owned(escaped)
}
