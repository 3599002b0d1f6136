use std::io::Cursor;

use docx_edit_core::{Alignment, Block, Container, Document, Paragraph, Run, Table};
use docx_rs::{AlignmentType, BreakType, Docx, Footer, Header, RunFonts};
use tracing::{debug, warn};

use crate::error::{DocxIoError, Result};

/// Serialize a document into a new `.docx` package.
///
/// Only the first section's header and footer are written; tables inside
/// headers and footers are flattened to their cell paragraphs. Source markup
/// carried by the model is not written: use [`crate::patch_docx`] to keep it.
pub fn write_docx(document: &Document) -> Result<Vec<u8>> {
    let mut docx = Docx::new();
    for block in &document.body.blocks {
        docx = match block {
            Block::Paragraph(paragraph) => docx.add_paragraph(to_docx_paragraph(paragraph)),
            Block::Table(table) => docx.add_table(to_docx_table(table)),
        };
    }

    if document.sections.len() > 1 {
        warn!(
            "Document has {} sections, only the first header/footer is written",
            document.sections.len()
        );
    }
    if let Some(section) = document.sections.first() {
        if !section.header.is_empty() {
            let header = flatten(&section.header)
                .into_iter()
                .fold(Header::new(), |header, paragraph| {
                    header.add_paragraph(to_docx_paragraph(paragraph))
                });
            docx = docx.header(header);
        }
        if !section.footer.is_empty() {
            let footer = flatten(&section.footer)
                .into_iter()
                .fold(Footer::new(), |footer, paragraph| {
                    footer.add_paragraph(to_docx_paragraph(paragraph))
                });
            docx = docx.footer(footer);
        }
    }

    let mut buffer = Cursor::new(Vec::new());
    docx.build()
        .pack(&mut buffer)
        .map_err(|e| DocxIoError::Write(e.to_string()))?;
    let bytes = buffer.into_inner();
    debug!("Packed {} bytes", bytes.len());
    Ok(bytes)
}

fn flatten(container: &Container) -> Vec<&Paragraph> {
    let mut paragraphs: Vec<&Paragraph> = container.paragraphs().collect();
    for table in container.tables() {
        warn!("Flattening a header/footer table into paragraphs");
        for cell in table.cells() {
            paragraphs.extend(flatten(&cell.content));
        }
    }
    paragraphs
}

fn to_alignment_type(alignment: Alignment) -> AlignmentType {
    match alignment {
        Alignment::Left => AlignmentType::Left,
        Alignment::Center => AlignmentType::Center,
        Alignment::Right => AlignmentType::Right,
        Alignment::Justify => AlignmentType::Both,
        Alignment::Distribute => AlignmentType::Distribute,
    }
}

fn to_docx_paragraph(paragraph: &Paragraph) -> docx_rs::Paragraph {
    let mut out = docx_rs::Paragraph::new();
    for run in &paragraph.runs {
        out = out.add_run(to_docx_run(run));
    }
    if let Some(style) = &paragraph.style {
        out = out.style(style);
    }
    if let Some(alignment) = paragraph.alignment {
        out = out.align(to_alignment_type(alignment));
    }
    out
}

fn to_docx_run(source: &Run) -> docx_rs::Run {
    let mut run = docx_rs::Run::new();
    for (line_index, line) in source.text.split('\n').enumerate() {
        if line_index > 0 {
            run = run.add_break(BreakType::TextWrapping);
        }
        for (tab_index, chunk) in line.split('\t').enumerate() {
            if tab_index > 0 {
                run = run.add_tab();
            }
            if !chunk.is_empty() {
                run = run.add_text(chunk);
            }
        }
    }

    // An explicit `false` overrides what the paragraph style would give.
    let format = &source.format;
    match format.bold {
        Some(true) => run = run.bold(),
        Some(false) => run = run.disable_bold(),
        None => {}
    }
    match format.italic {
        Some(true) => run = run.italic(),
        Some(false) => run = run.disable_italic(),
        None => {}
    }
    match format.underline {
        Some(true) => run = run.underline("single"),
        Some(false) => run = run.underline("none"),
        None => {}
    }
    if let Some(size) = format.font_size {
        // Half-points.
        run = run.size((size * 2.0).round() as usize);
    }
    if let Some(name) = &format.font_name {
        run = run.fonts(
            RunFonts::new()
                .ascii(name)
                .hi_ansi(name)
                .east_asia(name)
                .cs(name),
        );
    }
    if let Some(color) = &format.color {
        run = run.color(color);
    }
    if let Some(highlight) = format.highlight {
        run = run.highlight(highlight.word_value());
    }
    run
}

fn to_docx_table(table: &Table) -> docx_rs::Table {
    let rows = table
        .rows
        .iter()
        .map(|row| docx_rs::TableRow::new(row.cells.iter().map(|cell| to_docx_cell(&cell.content)).collect()))
        .collect();
    docx_rs::Table::new(rows)
}

fn to_docx_cell(content: &Container) -> docx_rs::TableCell {
    let mut cell = docx_rs::TableCell::new();
    for block in &content.blocks {
        cell = match block {
            Block::Paragraph(paragraph) => cell.add_paragraph(to_docx_paragraph(paragraph)),
            Block::Table(table) => cell.add_table(to_docx_table(table)),
        };
    }
    // A cell must end with a paragraph.
    if !matches!(content.blocks.last(), Some(Block::Paragraph(_))) {
        cell = cell.add_paragraph(docx_rs::Paragraph::new());
    }
    cell
}
