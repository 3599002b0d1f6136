use crate::model::Document;

/// Flatten the document's text in document order: body paragraphs, body
/// table cells, then each section's header and footer. One line per
/// paragraph.
pub fn extract_text(document: &Document) -> String {
    document
        .paragraphs()
        .iter()
        .map(|paragraph| paragraph.text())
        .collect::<Vec<_>>()
        .join("\n")
}
