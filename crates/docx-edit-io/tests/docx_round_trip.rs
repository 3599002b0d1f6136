use std::io::{Cursor, Read, Write};

use docx_edit_core::{
    apply_all, extract_text, Alignment, Container, Document, HighlightColor, Instruction, OperationKind, Paragraph,
    Run, RunFormat, Section, Table,
};
use docx_edit_io::{load, patch_docx, read_docx, save, save_edited, write_docx, DocxIoError};
use pretty_assertions::assert_eq;
use serde_json::json;
use tempfile::TempDir;
use zip::write::FileOptions;
use zip::{ZipArchive, ZipWriter};

const DOCUMENT_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
            xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:body>
    <w:p>
      <w:r><w:t xml:space="preserve">Цена: </w:t></w:r>
      <w:r><w:rPr><w:b/></w:rPr><w:t>1</w:t></w:r>
      <w:r><w:rPr><w:b/></w:rPr><w:t>00</w:t></w:r>
      <w:r><w:t xml:space="preserve"> руб.</w:t></w:r>
    </w:p>
    <w:tbl>
      <w:tr><w:tc><w:p><w:r><w:t>Товар</w:t></w:r></w:p></w:tc><w:tc><w:p><w:r><w:t>Цена</w:t></w:r></w:p></w:tc></w:tr>
    </w:tbl>
    <w:sectPr>
      <w:headerReference w:type="default" r:id="rId7"/>
      <w:headerReference w:type="first" r:id="rId8"/>
    </w:sectPr>
  </w:body>
</w:document>"#;

const RELS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId7" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>
  <Relationship Id="rId8" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header2.xml"/>
</Relationships>"#;

const HEADER_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:p><w:r><w:t>ООО «Поставщик»</w:t></w:r></w:p>
</w:hdr>"#;

fn package(parts: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in parts {
        zip.start_file(*name, FileOptions::default()).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

fn fixture() -> Vec<u8> {
    package(&[
        ("word/document.xml", DOCUMENT_XML),
        ("word/_rels/document.xml.rels", RELS_XML),
        ("word/header1.xml", HEADER_XML),
    ])
}

#[test]
fn test_read_hand_built_package() {
    let document = read_docx(&fixture()).unwrap();

    assert_eq!(extract_text(&document), "Цена: 100 руб.\nТовар\nЦена\nООО «Поставщик»");
    let price = document.paragraphs()[0];
    assert_eq!(price.runs.len(), 4);
    assert_eq!(price.runs[1].format.bold, Some(true));
    assert_eq!(document.sections.len(), 1);
    assert!(document.sections[0].footer.is_empty());
}

#[test]
fn test_edit_across_runs_from_package() {
    let mut document = read_docx(&fixture()).unwrap();
    let instructions = vec![Instruction::new(
        OperationKind::ReplaceText,
        json!({}),
        json!({"old_text": "100", "new_text": "250"}),
    )];

    assert!(apply_all(&mut document, &instructions));

    let price = document.paragraphs()[0];
    assert_eq!(price.text(), "Цена: 250 руб.");
    assert_eq!(price.runs[1].text, "250");
    assert_eq!(price.runs[1].format, RunFormat::bold());
    assert_eq!(price.runs[2].text, "");
}

#[test]
fn test_missing_document_part() {
    let bytes = package(&[("word/styles.xml", "<styles/>")]);
    assert!(matches!(read_docx(&bytes), Err(DocxIoError::MissingPart(_))));
}

#[test]
fn test_malformed_xml_names_the_part() {
    let bytes = package(&[("word/document.xml", "<w:document><w:body>")]);
    match read_docx(&bytes) {
        Err(DocxIoError::Xml { part, .. }) => assert_eq!(part, "word/document.xml"),
        other => panic!("expected an XML error, got {other:?}"),
    }
}

#[test]
fn test_not_a_zip() {
    assert!(matches!(read_docx(b"plain text"), Err(DocxIoError::Zip(_))));
}

#[test]
fn test_write_then_read_keeps_model() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("contract.docx");

    let mut body = Container::new();
    body.push_paragraph(
        Paragraph::new()
            .with_style("Heading1")
            .with_alignment(Alignment::Center)
            .with_runs(vec![Run::new("Договор").with_format(RunFormat {
                bold: Some(true),
                font_name: Some("Arial".into()),
                font_size: Some(14.0),
                color: Some("FF0000".into()),
                highlight: Some(HighlightColor::Yellow),
                ..RunFormat::default()
            })]),
    );
    body.push_paragraph(Paragraph::new().with_runs(vec![
        Run::new("Итого:\t"),
        Run::new("5").with_format(RunFormat::italic()),
    ]));
    body.push_table(Table::from_texts(&[vec!["A", "B"], vec!["C", "D"]]));
    let original = Document::with_body(body).with_section(Section {
        header: Container::from_paragraphs(vec![Paragraph::from_text("Шапка")]),
        footer: Container::new(),
    });

    save(&original, &path).unwrap();
    let loaded = load(&path).unwrap();

    assert_eq!(extract_text(&loaded), extract_text(&original));
    let heading = loaded.paragraphs()[0];
    assert_eq!(heading.style.as_deref(), Some("Heading1"));
    assert_eq!(heading.alignment, Some(Alignment::Center));
    assert_eq!(heading.runs[0].format, original.paragraphs()[0].runs[0].format);
    assert_eq!(loaded.paragraphs()[1].runs[1].format.italic, Some(true));
    assert_eq!(loaded.tables().next().unwrap().cell(1, 1).unwrap().text(), "D");
}

#[test]
fn test_write_produces_readable_bytes() {
    let document = Document::with_body(Container::from_paragraphs(vec![Paragraph::from_text("x")]));
    let bytes = write_docx(&document).unwrap();
    assert_eq!(read_docx(&bytes).unwrap().paragraphs()[0].text(), "x");
}

const STYLES_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:styles xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main">
  <w:style w:type="paragraph" w:styleId="ContractTitle"><w:name w:val="Contract Title"/><w:rPr><w:b/></w:rPr></w:style>
</w:styles>"#;

const TWO_SECTIONS_XML: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"
            xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
  <w:body>
    <w:p>
      <w:pPr><w:pStyle w:val="ContractTitle"/><w:numPr><w:ilvl w:val="0"/><w:numId w:val="7"/></w:numPr></w:pPr>
      <w:r><w:t>Договор поставки № 12</w:t></w:r>
    </w:p>
    <w:p>
      <w:pPr><w:sectPr><w:headerReference w:type="default" r:id="rId1"/><w:pgSz w:w="11906" w:h="16838"/></w:sectPr></w:pPr>
      <w:r><w:rPr><w:lang w:val="ru-RU"/></w:rPr><w:t>Конец раздела</w:t></w:r>
      <w:r><w:drawing><wp:inline xmlns:wp="http://schemas.openxmlformats.org/drawingml/2006/wordprocessingDrawing"/></w:drawing></w:r>
    </w:p>
    <w:tbl>
      <w:tblPr><w:tblStyle w:val="TableGrid"/></w:tblPr>
      <w:tblGrid><w:gridCol w:w="3000"/><w:gridCol w:w="2000"/></w:tblGrid>
      <w:tr>
        <w:tc><w:tcPr><w:tcW w:w="3000" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>Товар</w:t></w:r></w:p></w:tc>
        <w:tc><w:tcPr><w:tcW w:w="2000" w:type="dxa"/></w:tcPr><w:p><w:r><w:t>Цена</w:t></w:r></w:p></w:tc>
      </w:tr>
    </w:tbl>
    <w:sectPr>
      <w:headerReference w:type="default" r:id="rId2"/>
      <w:pgSz w:w="16838" w:h="11906" w:orient="landscape"/>
    </w:sectPr>
  </w:body>
</w:document>"#;

const TWO_SECTIONS_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">
  <Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header1.xml"/>
  <Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/header" Target="header2.xml"/>
</Relationships>"#;

fn header(text: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><w:hdr xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:p><w:r><w:t>{text}</w:t></w:r></w:p></w:hdr>"#
    )
}

fn two_section_package() -> Vec<u8> {
    let first = header("Раздел один: ООО «Поставщик»");
    let second = header("Раздел два: ООО «Поставщик»");
    package(&[
        ("word/document.xml", TWO_SECTIONS_XML),
        ("word/_rels/document.xml.rels", TWO_SECTIONS_RELS),
        ("word/styles.xml", STYLES_XML),
        ("word/header1.xml", first.as_str()),
        ("word/header2.xml", second.as_str()),
        ("word/media/image1.png", "not really a png"),
    ])
}

fn part(bytes: &[u8], name: &str) -> String {
    let mut archive = ZipArchive::new(Cursor::new(bytes)).unwrap();
    let mut file = archive.by_name(name).unwrap();
    let mut content = String::new();
    file.read_to_string(&mut content).unwrap();
    content
}

fn replace(old: &str, new: &str) -> Instruction {
    Instruction::new(
        OperationKind::ReplaceText,
        json!({}),
        json!({"old_text": old, "new_text": new}),
    )
}

#[test]
fn test_patch_keeps_parts_the_model_does_not_carry() {
    let original = two_section_package();
    let mut document = read_docx(&original).unwrap();
    assert!(apply_all(&mut document, &[replace("№ 12", "№ 15")]));

    let patched = patch_docx(&original, &document).unwrap();

    assert_eq!(part(&patched, "word/styles.xml"), STYLES_XML);
    assert_eq!(part(&patched, "word/media/image1.png"), "not really a png");
    let body = part(&patched, "word/document.xml");
    assert!(body.contains(r#"<w:numPr><w:ilvl w:val="0"/><w:numId w:val="7"/></w:numPr>"#));
    assert!(body.contains(r#"<w:pStyle w:val="ContractTitle"/>"#));
    assert!(body.contains(r#"<w:pgSz w:w="11906" w:h="16838"/>"#));
    assert!(body.contains(r#"w:orient="landscape""#));
    assert!(body.contains("<wp:inline"));
    assert!(body.contains(r#"<w:tcW w:w="3000" w:type="dxa"/>"#));
    assert!(body.contains(r#"<w:lang w:val="ru-RU"/>"#));

    let reread = read_docx(&patched).unwrap();
    assert_eq!(reread.paragraphs()[0].text(), "Договор поставки № 15");
    assert_eq!(reread.paragraphs()[0].style.as_deref(), Some("ContractTitle"));
    assert_eq!(reread.body.blocks, document.body.blocks);
}

#[test]
fn test_patch_writes_every_section_header() {
    let original = two_section_package();
    let mut document = read_docx(&original).unwrap();
    assert_eq!(document.sections.len(), 2);
    assert!(apply_all(&mut document, &[replace("Поставщик", "Продавец")]));

    let reread = read_docx(&patch_docx(&original, &document).unwrap()).unwrap();
    let headers: Vec<String> = reread.sections.iter().map(|section| section.header.text()).collect();
    assert_eq!(
        headers,
        vec!["Раздел один: ООО «Продавец»", "Раздел два: ООО «Продавец»"]
    );
}

#[test]
fn test_patch_writes_explicit_false_formatting() {
    let original = package(&[(
        "word/document.xml",
        r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body>
            <w:p><w:pPr><w:pStyle w:val="Heading1"/></w:pPr>
                <w:r><w:rPr><w:b/><w:i/><w:u w:val="single"/></w:rPr><w:t>Итоговая сумма</w:t></w:r></w:p>
        </w:body></w:document>"#,
    )]);
    let mut document = read_docx(&original).unwrap();
    let unformat = Instruction::new(
        OperationKind::ApplyTextFormatting,
        json!({}),
        json!({
            "apply_to_text_segment": "сумма",
            "formatting_rules": [
                {"style": "bold", "value": false},
                {"style": "italic", "value": false},
                {"style": "underline", "value": false}
            ]
        }),
    );
    assert!(apply_all(&mut document, &[unformat]));

    let reread = read_docx(&patch_docx(&original, &document).unwrap()).unwrap();
    let runs: Vec<(String, Option<bool>, Option<bool>, Option<bool>)> = reread.paragraphs()[0]
        .runs
        .iter()
        .map(|run| (run.text.clone(), run.format.bold, run.format.italic, run.format.underline))
        .collect();
    assert_eq!(
        runs,
        vec![
            ("Итоговая ".to_string(), Some(true), Some(true), Some(true)),
            ("сумма".to_string(), Some(false), Some(false), Some(false)),
        ]
    );
}

#[test]
fn test_fresh_package_writes_explicit_false_formatting() {
    let off = RunFormat {
        bold: Some(false),
        italic: Some(false),
        underline: Some(false),
        ..RunFormat::default()
    };
    let document = Document::with_body(Container::from_paragraphs(vec![Paragraph::new()
        .with_style("Heading1")
        .with_runs(vec![Run::new("сумма").with_format(off.clone())])]));

    let reread = read_docx(&write_docx(&document).unwrap()).unwrap();
    assert_eq!(reread.paragraphs()[0].runs[0].format, off);
}

#[test]
fn test_save_edited_patches_in_place() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("contract.docx");
    std::fs::write(&path, two_section_package()).unwrap();

    let mut document = load(&path).unwrap();
    assert!(apply_all(&mut document, &[replace("Товар", "Наименование")]));
    save_edited(&path, &document, &path).unwrap();

    let bytes = std::fs::read(&path).unwrap();
    assert_eq!(part(&bytes, "word/styles.xml"), STYLES_XML);
    let reread = read_docx(&bytes).unwrap();
    assert_eq!(reread.tables().next().unwrap().cell(0, 0).unwrap().text(), "Наименование");
}
