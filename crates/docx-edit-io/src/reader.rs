use std::collections::HashMap;
use std::io::{Cursor, Read, Seek};

use docx_edit_core::{
    Alignment, Container, Document, HighlightColor, Markup, MarkupElement, Paragraph, Run, RunFormat, Section, Table,
    TableCell, TableRow,
};
use roxmltree::Node;
use tracing::{debug, warn};
use zip::result::ZipError;
use zip::ZipArchive;

use crate::error::{DocxIoError, Result};

pub(crate) const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

pub(crate) const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS_PART: &str = "word/_rels/document.xml.rels";

/// Elements that wrap runs without being runs themselves. Their runs are
/// read as if they sat directly in the paragraph.
const RUN_WRAPPERS: [&str; 6] = ["hyperlink", "ins", "smartTag", "fldSimple", "customXml", "sdtContent"];

/// Parse a `.docx` package into a document.
pub fn read_docx(bytes: &[u8]) -> Result<Document> {
    let mut package = ZipArchive::new(Cursor::new(bytes))?;

    let xml = read_part(&mut package, DOCUMENT_PART)?
        .ok_or_else(|| DocxIoError::MissingPart(DOCUMENT_PART.to_string()))?;
    let tree = parse_xml(&xml, DOCUMENT_PART)?;
    let body = tree
        .descendants()
        .find(|node| is_w(node, "body"))
        .ok_or_else(|| DocxIoError::MissingElement {
            part: DOCUMENT_PART.to_string(),
            element: "body",
        })?;

    let mut document = Document::with_body(read_container(body));
    for parts in section_parts(&mut package, &tree)? {
        let section = Section {
            header: read_story(&mut package, parts.header.as_deref())?,
            footer: read_story(&mut package, parts.footer.as_deref())?,
        };
        document.sections.push(section);
    }

    debug!(
        "Read {} body blocks, {} sections",
        document.body.blocks.len(),
        document.sections.len()
    );
    Ok(document)
}

pub(crate) fn read_part<R: Read + Seek>(package: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    match package.by_name(name) {
        Ok(mut file) => {
            let mut xml = String::new();
            file.read_to_string(&mut xml)?;
            Ok(Some(xml))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

pub(crate) fn parse_xml<'input>(xml: &'input str, part: &str) -> Result<roxmltree::Document<'input>> {
    roxmltree::Document::parse(xml).map_err(|source| DocxIoError::Xml {
        part: part.to_string(),
        source,
    })
}

/// Relationship id -> package part name.
fn parse_relationships(xml: &str) -> Result<HashMap<String, String>> {
    let tree = parse_xml(xml, DOCUMENT_RELS_PART)?;
    Ok(tree
        .descendants()
        .filter(|node| node.tag_name().name() == "Relationship")
        .filter_map(|node| {
            let id = node.attribute("Id")?;
            let target = node.attribute("Target")?;
            let part = match target.strip_prefix('/') {
                Some(absolute) => absolute.to_string(),
                None => format!("word/{target}"),
            };
            Some((id.to_string(), part))
        })
        .collect())
}

/// Package parts holding one section's default header and footer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SectionParts {
    pub header: Option<String>,
    pub footer: Option<String>,
}

/// Header/footer parts of every `w:sectPr` in `document`, in document order.
pub(crate) fn section_parts<R: Read + Seek>(
    package: &mut ZipArchive<R>,
    document: &roxmltree::Document<'_>,
) -> Result<Vec<SectionParts>> {
    let relationships = match read_part(package, DOCUMENT_RELS_PART)? {
        Some(rels) => parse_relationships(&rels)?,
        None => HashMap::new(),
    };
    Ok(document
        .descendants()
        .filter(|node| is_w(node, "sectPr"))
        .map(|section_properties| default_references(section_properties, &relationships))
        .collect())
}

fn default_references(section_properties: Node<'_, '_>, relationships: &HashMap<String, String>) -> SectionParts {
    let mut parts = SectionParts::default();
    for reference in section_properties.children() {
        let is_header = is_w(&reference, "headerReference");
        if !is_header && !is_w(&reference, "footerReference") {
            continue;
        }
        if reference.attribute((W_NS, "type")).unwrap_or("default") != "default" {
            continue;
        }
        let Some(part) = reference
            .attribute((R_NS, "id"))
            .and_then(|id| relationships.get(id))
        else {
            warn!("Unresolved header/footer reference in section properties");
            continue;
        };
        if is_header {
            parts.header = Some(part.clone());
        } else {
            parts.footer = Some(part.clone());
        }
    }
    parts
}

/// Blocks of a header or footer part. A missing part reads as empty.
fn read_story<R: Read + Seek>(package: &mut ZipArchive<R>, part: Option<&str>) -> Result<Container> {
    let Some(part) = part else {
        return Ok(Container::new());
    };
    let Some(xml) = read_part(package, part)? else {
        warn!("Referenced part {} is missing from the package", part);
        return Ok(Container::new());
    };
    let tree = parse_xml(&xml, part)?;
    Ok(read_container(tree.root_element()))
}

pub(crate) fn is_w(node: &Node<'_, '_>, name: &str) -> bool {
    node.is_element() && node.tag_name().name() == name && node.tag_name().namespace() == Some(W_NS)
}

pub(crate) fn w_child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children().find(|child| is_w(child, name))
}

fn w_val<'a, 'input>(node: Node<'a, 'input>, child: &str) -> Option<&'a str> {
    w_child(node, child).and_then(|child| child.attribute((W_NS, "val")))
}

/// On/off property: present without a value, or with anything but a false
/// spelling, means on.
fn w_toggle(properties: Node<'_, '_>, name: &str) -> Option<bool> {
    w_child(properties, name).map(|node| {
        node.attribute((W_NS, "val"))
            .is_none_or(|val| !matches!(val, "0" | "false" | "off"))
    })
}

/// Paragraphs and tables of a body, cell, header or footer element.
fn read_container(node: Node<'_, '_>) -> Container {
    let mut container = Container::new();
    read_blocks(node, &mut container);
    container
}

fn read_blocks(node: Node<'_, '_>, container: &mut Container) {
    for child in node.children().filter(Node::is_element) {
        if is_w(&child, "p") {
            container.push_paragraph(read_paragraph(child));
        } else if is_w(&child, "tbl") {
            container.push_table(read_table(child));
        } else if is_w(&child, "sdt") {
            if let Some(content) = w_child(child, "sdtContent") {
                read_blocks(content, container);
            }
        }
    }
}

/// Exact source text of an element.
pub(crate) fn source<'input>(node: Node<'_, 'input>) -> &'input str {
    &node.document().input_text()[node.range()]
}

/// Markup key of an element: its local name in the main namespace,
/// `{namespace}name` elsewhere.
fn markup_name(node: Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace() {
        Some(W_NS) => tag.name().to_string(),
        Some(namespace) => format!("{{{namespace}}}{}", tag.name()),
        None => tag.name().to_string(),
    }
}

fn markup_element(node: Node<'_, '_>) -> MarkupElement {
    MarkupElement::new(markup_name(node), source(node))
}

/// Every child element of a properties element, verbatim.
fn read_markup(properties: Node<'_, '_>) -> Markup {
    properties.children().filter(Node::is_element).map(markup_element).collect()
}

fn read_paragraph(node: Node<'_, '_>) -> Paragraph {
    let mut paragraph = Paragraph::new();
    if let Some(properties) = w_child(node, "pPr") {
        paragraph.style = w_val(properties, "pStyle").map(str::to_string);
        paragraph.alignment = w_val(properties, "jc").and_then(|val| val.parse::<Alignment>().ok());
        paragraph.properties = read_markup(properties);
    }
    collect_runs(node, &mut paragraph.runs);
    paragraph
}

fn collect_runs(node: Node<'_, '_>, runs: &mut Vec<Run>) {
    for child in node.children().filter(Node::is_element) {
        let in_w = child.tag_name().namespace() == Some(W_NS);
        match child.tag_name().name() {
            "pPr" if in_w => {}
            "r" if in_w => read_run(child, runs),
            "sdt" if in_w => {
                if let Some(content) = w_child(child, "sdtContent") {
                    collect_runs(content, runs);
                }
            }
            name if in_w && RUN_WRAPPERS.contains(&name) => {
                debug!("Reading runs of <w:{}> in place", name);
                collect_runs(child, runs);
            }
            // Bookmarks, comment ranges, tracked deletions, math...
            _ => runs.push(Run::inline(markup_element(child))),
        }
    }
}

/// Run content the model reads as text.
fn run_text<'a>(node: Node<'a, '_>) -> Option<&'a str> {
    if node.tag_name().namespace() != Some(W_NS) {
        return None;
    }
    match node.tag_name().name() {
        "t" => Some(node.text().unwrap_or_default()),
        "tab" => Some("\t"),
        "cr" => Some("\n"),
        "br" => match node.attribute((W_NS, "type")) {
            None | Some("textWrapping") => Some("\n"),
            Some(_) => None,
        },
        _ => None,
    }
}

/// One `w:r` becomes a text run, plus one inline run per object it holds
/// (drawings, field characters, page breaks...).
fn read_run(node: Node<'_, '_>, runs: &mut Vec<Run>) {
    let properties = w_child(node, "rPr");
    let format = properties.map(read_run_format).unwrap_or_default();
    let markup = properties.map(read_markup).unwrap_or_default();
    let text_run = |text: String| Run {
        text,
        format: format.clone(),
        properties: markup.clone(),
        inline: None,
    };

    let mut text = String::new();
    let mut pushed = false;
    for child in node.children().filter(Node::is_element) {
        if properties == Some(child) {
            continue;
        }
        if let Some(piece) = run_text(child) {
            text.push_str(piece);
            continue;
        }
        if !text.is_empty() {
            runs.push(text_run(std::mem::take(&mut text)));
        }
        let xml = format!("<w:r>{}{}</w:r>", properties.map(source).unwrap_or_default(), source(child));
        let mut object = Run::inline(MarkupElement::new("r", xml));
        object.format = format.clone();
        runs.push(object);
        pushed = true;
    }
    if !text.is_empty() || !pushed {
        runs.push(text_run(text));
    }
}

pub(crate) fn read_run_format(properties: Node<'_, '_>) -> RunFormat {
    RunFormat {
        bold: w_toggle(properties, "b"),
        italic: w_toggle(properties, "i"),
        underline: w_child(properties, "u")
            .map(|node| node.attribute((W_NS, "val")).is_none_or(|val| val != "none")),
        font_name: w_child(properties, "rFonts")
            .and_then(|fonts| fonts.attribute((W_NS, "ascii")).or(fonts.attribute((W_NS, "hAnsi"))))
            .map(str::to_string),
        font_size: w_val(properties, "sz")
            .and_then(|val| val.parse::<f32>().ok())
            .map(|half_points| half_points / 2.0),
        color: w_val(properties, "color")
            .filter(|val| *val != "auto")
            .map(str::to_ascii_uppercase),
        highlight: w_val(properties, "highlight").and_then(HighlightColor::from_word_value),
    }
}

fn read_table(node: Node<'_, '_>) -> Table {
    let mut table = Table::new(Vec::new());
    for child in node.children().filter(Node::is_element) {
        if is_w(&child, "tblPr") || is_w(&child, "tblGrid") {
            table.properties.push(markup_element(child));
        } else if is_w(&child, "tr") {
            table.rows.push(read_row(child));
        }
    }
    table
}

fn read_row(node: Node<'_, '_>) -> TableRow {
    let mut row = TableRow::new(Vec::new());
    for child in node.children().filter(Node::is_element) {
        if is_w(&child, "tblPrEx") || is_w(&child, "trPr") {
            row.properties.push(markup_element(child));
        } else if is_w(&child, "tc") {
            let mut cell = TableCell::new(read_container(child));
            if let Some(properties) = w_child(child, "tcPr") {
                cell.properties.push(markup_element(properties));
            }
            row.cells.push(cell);
        }
    }
    row
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paragraph(xml: &str) -> Paragraph {
        let wrapped = format!(r#"<w:document xmlns:w="{W_NS}">{xml}</w:document>"#);
        let tree = roxmltree::Document::parse(&wrapped).unwrap();
        let node = tree.root_element().first_element_child().unwrap();
        read_paragraph(node)
    }

    #[test]
    fn test_run_properties() {
        let p = paragraph(
            r#"<w:p>
                <w:pPr><w:pStyle w:val="Heading1"/><w:jc w:val="center"/></w:pPr>
                <w:r>
                    <w:rPr>
                        <w:b/><w:i w:val="0"/><w:u w:val="single"/>
                        <w:rFonts w:ascii="Arial"/><w:sz w:val="28"/>
                        <w:color w:val="ff0000"/><w:highlight w:val="yellow"/>
                    </w:rPr>
                    <w:t>Заголовок</w:t>
                </w:r>
            </w:p>"#,
        );
        assert_eq!(p.style.as_deref(), Some("Heading1"));
        assert_eq!(p.alignment, Some(Alignment::Center));
        assert_eq!(
            p.runs[0].format,
            RunFormat {
                bold: Some(true),
                italic: Some(false),
                underline: Some(true),
                font_name: Some("Arial".into()),
                font_size: Some(14.0),
                color: Some("FF0000".into()),
                highlight: Some(HighlightColor::Yellow),
            }
        );
    }

    #[test]
    fn test_runs_inside_wrappers_and_special_characters() {
        let p = paragraph(
            r#"<w:p>
                <w:r><w:t xml:space="preserve">a </w:t><w:tab/><w:t>b</w:t></w:r>
                <w:hyperlink><w:r><w:t>link</w:t></w:r></w:hyperlink>
                <w:del><w:r><w:delText>gone</w:delText></w:r></w:del>
                <w:ins><w:r><w:br/><w:t>new</w:t></w:r></w:ins>
            </w:p>"#,
        );
        assert_eq!(p.text(), "a \tblink\nnew");
        assert_eq!(p.runs.len(), 4);
        assert_eq!(p.runs[2].inline.as_ref().map(|e| e.name.as_str()), Some("del"));
    }

    #[test]
    fn test_objects_inside_runs_become_inline_runs() {
        let p = paragraph(
            r#"<w:p>
                <w:pPr><w:numPr><w:ilvl w:val="0"/><w:numId w:val="3"/></w:numPr></w:pPr>
                <w:bookmarkStart w:id="0" w:name="price"/>
                <w:r><w:rPr><w:b/></w:rPr><w:t>Схема</w:t><w:drawing><wp:inline xmlns:wp="urn:wp"/></w:drawing><w:t>ниже</w:t></w:r>
                <w:r><w:br w:type="page"/></w:r>
            </w:p>"#,
        );
        assert_eq!(p.text(), "Схеманиже");
        assert_eq!(p.properties.get("numPr").map(|e| e.xml.contains(r#"w:numId w:val="3""#)), Some(true));

        let kinds: Vec<(&str, bool)> = p.runs.iter().map(|run| (run.text.as_str(), run.is_inline())).collect();
        assert_eq!(kinds, vec![("", true), ("Схема", false), ("", true), ("ниже", false), ("", true)]);

        let drawing = p.runs[2].inline.as_ref().unwrap();
        assert!(drawing.xml.starts_with("<w:r><w:rPr><w:b/></w:rPr><w:drawing>"));
        assert_eq!(p.runs[2].format.bold, Some(true));
        assert!(p.runs[4].inline.as_ref().unwrap().xml.contains(r#"w:type="page""#));
    }

    #[test]
    fn test_table_markup_is_kept() {
        let wrapped = format!(
            r#"<w:document xmlns:w="{W_NS}"><w:tbl>
                <w:tblPr><w:tblStyle w:val="TableGrid"/></w:tblPr>
                <w:tblGrid><w:gridCol w:w="4000"/></w:tblGrid>
                <w:tr><w:trPr><w:tblHeader/></w:trPr>
                    <w:tc><w:tcPr><w:tcW w:w="4000" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>A</w:t></w:r></w:p></w:tc>
                </w:tr>
            </w:tbl></w:document>"#
        );
        let tree = roxmltree::Document::parse(&wrapped).unwrap();
        let table = read_table(tree.root_element().first_element_child().unwrap());

        let names: Vec<&str> = table.properties.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["tblPr", "tblGrid"]);
        assert!(table.rows[0].properties.contains("trPr"));
        assert_eq!(table.rows[0].cells[0].properties.get("tcPr").map(|e| e.xml.contains("4000")), Some(true));
        assert_eq!(table.cell(0, 0).unwrap().text(), "A");
    }

    #[test]
    fn test_relationship_targets_resolve_to_part_names() {
        let rels = r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
            <Relationship Id="rId1" Type="header" Target="header1.xml"/>
            <Relationship Id="rId2" Type="footer" Target="/word/footer1.xml"/>
        </Relationships>"#;
        let map = parse_relationships(rels).unwrap();
        assert_eq!(map["rId1"], "word/header1.xml");
        assert_eq!(map["rId2"], "word/footer1.xml");
    }
}
