//! Writing an edited document back into the package it was read from.
//!
//! Only `word/document.xml` and the header/footer parts the model carries
//! are rewritten; every other entry (styles, numbering, media, settings) is
//! copied through unchanged. Inside a rewritten part only the content of the
//! body or story element is replaced: the root element, its namespace
//! declarations and the body's final `w:sectPr` stay as they were.

use std::collections::HashMap;
use std::io::{Cursor, Read, Seek, Write};

use docx_edit_core::{Container, Document};
use roxmltree::Node;
use tracing::{debug, instrument, warn};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::error::{DocxIoError, Result};
use crate::reader::{is_w, parse_xml, read_part, section_parts, source, w_child, DOCUMENT_PART, W_NS};
use crate::wordml::container_xml;

/// Rewrite `original` so it holds `document`.
#[instrument(skip(original, document), level = "debug")]
pub fn patch_docx(original: &[u8], document: &Document) -> Result<Vec<u8>> {
    let mut package = ZipArchive::new(Cursor::new(original))?;
    let mut rewritten = HashMap::new();

    let xml = read_part(&mut package, DOCUMENT_PART)?.ok_or_else(|| DocxIoError::MissingPart(DOCUMENT_PART.to_string()))?;
    let tree = parse_xml(&xml, DOCUMENT_PART)?;
    let body = tree
        .descendants()
        .find(|node| is_w(node, "body"))
        .ok_or_else(|| DocxIoError::MissingElement {
            part: DOCUMENT_PART.to_string(),
            element: "body",
        })?;
    check_prefix(body, DOCUMENT_PART)?;

    let mut body_xml = container_xml(&document.body, false);
    if let Some(section_properties) = w_child(body, "sectPr") {
        body_xml.push_str(source(section_properties));
    }
    rewritten.insert(DOCUMENT_PART.to_string(), replace_content(&xml, body, &body_xml, DOCUMENT_PART)?);

    let parts = section_parts(&mut package, &tree)?;
    if parts.len() != document.sections.len() {
        warn!(
            "Package has {} sections but the document has {}, extra sections are not written",
            parts.len(),
            document.sections.len()
        );
    }
    for (section, parts) in document.sections.iter().zip(&parts) {
        for (part, story) in [(&parts.header, &section.header), (&parts.footer, &section.footer)] {
            let Some(part) = part else {
                continue;
            };
            // A part shared by several sections is written once, from the first.
            if rewritten.contains_key(part) {
                continue;
            }
            if let Some(patched) = patch_story(&mut package, part, story)? {
                rewritten.insert(part.clone(), patched);
            }
        }
    }

    let bytes = repack(&mut package, &rewritten)?;
    debug!("Patched {} part(s), {} bytes", rewritten.len(), bytes.len());
    Ok(bytes)
}

fn patch_story<R: Read + Seek>(package: &mut ZipArchive<R>, part: &str, story: &Container) -> Result<Option<String>> {
    let Some(xml) = read_part(package, part)? else {
        warn!("Referenced part {} is missing from the package", part);
        return Ok(None);
    };
    let tree = parse_xml(&xml, part)?;
    let root = tree.root_element();
    check_prefix(root, part)?;
    replace_content(&xml, root, &container_xml(story, true), part).map(Some)
}

/// Generated markup uses the `w` prefix for the main namespace.
fn check_prefix(node: Node<'_, '_>, part: &str) -> Result<()> {
    match node.lookup_prefix(W_NS) {
        Some("w") => Ok(()),
        other => Err(DocxIoError::Unsupported {
            part: part.to_string(),
            reason: format!("main namespace is bound to prefix {other:?}, expected \"w\""),
        }),
    }
}

/// `input` with the content of `node` replaced by `content`. The element's
/// own start and end tags are kept.
fn replace_content(input: &str, node: Node<'_, '_>, content: &str, part: &str) -> Result<String> {
    let range = node.range();
    let malformed = || DocxIoError::Unsupported {
        part: part.to_string(),
        reason: format!("cannot locate the tags of <{}>", node.tag_name().name()),
    };
    let open_end = start_tag_end(input, range.start).ok_or_else(malformed)?;

    let (open, close) = if input[..open_end].ends_with('/') {
        // Self-closing: `<w:body/>` becomes `<w:body>...</w:body>`.
        let qualified = input[range.start + 1..open_end - 1]
            .split(|c: char| c.is_whitespace())
            .next()
            .ok_or_else(malformed)?;
        (format!("{}>", &input[range.start..open_end - 1]), format!("</{qualified}>"))
    } else {
        let close_start = input[..range.end].rfind("</").filter(|&at| at > open_end).ok_or_else(malformed)?;
        (input[range.start..=open_end].to_string(), input[close_start..range.end].to_string())
    };

    let mut out = String::with_capacity(input.len() + content.len());
    out.push_str(&input[..range.start]);
    out.push_str(&open);
    out.push_str(content);
    out.push_str(&close);
    out.push_str(&input[range.end..]);
    Ok(out)
}

/// Byte offset of the `>` closing the start tag at `start`.
fn start_tag_end(input: &str, start: usize) -> Option<usize> {
    let mut quote = None;
    for (offset, byte) in input.as_bytes().get(start..)?.iter().enumerate() {
        match (quote, *byte) {
            (Some(open), byte) if byte == open => quote = None,
            (Some(_), _) => {}
            (None, b'"' | b'\'') => quote = Some(*byte),
            (None, b'>') => return Some(start + offset),
            (None, _) => {}
        }
    }
    None
}

/// Copy every entry of `package`, substituting the rewritten parts.
fn repack<R: Read + Seek>(package: &mut ZipArchive<R>, rewritten: &HashMap<String, String>) -> Result<Vec<u8>> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

    for index in 0..package.len() {
        let mut file = package.by_index(index)?;
        let name = file.name().to_string();
        if file.is_dir() {
            writer.add_directory(name, options)?;
            continue;
        }
        writer.start_file(name.as_str(), options)?;
        match rewritten.get(&name) {
            Some(xml) => writer.write_all(xml.as_bytes())?,
            None => {
                let mut buffer = Vec::new();
                file.read_to_end(&mut buffer)?;
                writer.write_all(&buffer)?;
            }
        }
    }

    Ok(writer.finish()?.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn with_body(body: &str) -> String {
        format!(r#"<?xml version="1.0"?><w:document xmlns:w="{W_NS}" xmlns:x="urn:x">{body}</w:document>"#)
    }

    fn replace_body(xml: &str, content: &str) -> String {
        let tree = roxmltree::Document::parse(xml).unwrap();
        let body = tree.descendants().find(|node| is_w(node, "body")).unwrap();
        replace_content(xml, body, content, "test").unwrap()
    }

    #[test]
    fn test_replace_content_keeps_surrounding_markup() {
        let xml = with_body(r#"<w:body x:a="1>2"><w:p/></w:body><x:after/>"#);
        assert_eq!(
            replace_body(&xml, "<w:p><w:r/></w:p>"),
            with_body(r#"<w:body x:a="1>2"><w:p><w:r/></w:p></w:body><x:after/>"#)
        );
    }

    #[test]
    fn test_replace_content_opens_self_closing_element() {
        let xml = with_body("<w:body />");
        assert_eq!(replace_body(&xml, "<w:p/>"), with_body("<w:body ><w:p/></w:body>"));
    }

    #[test]
    fn test_other_prefix_is_rejected() {
        let xml = r#"<doc:document xmlns:doc="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><doc:body/></doc:document>"#;
        let tree = roxmltree::Document::parse(xml).unwrap();
        assert!(matches!(
            check_prefix(tree.root_element(), "word/document.xml"),
            Err(DocxIoError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_start_tag_end_skips_quoted_brackets() {
        let input = r#"<a b='>' c=">">text</a>"#;
        assert_eq!(start_tag_end(input, 0), Some(input.find("text").unwrap() - 1));
        assert_eq!(start_tag_end("<a", 0), None);
    }
}
