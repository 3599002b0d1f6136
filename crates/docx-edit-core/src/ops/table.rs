use tracing::{info, instrument, warn};

use crate::error::{EditError, EditResult};
use crate::instruction::{TableAddRow, TableModifyCell, TableSelector};
use crate::model::{Block, Container, Document, Paragraph, Run, Table, TableCell, TableRow};

/// What to do when a text selector matches several tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Resolution {
    FirstMatch,
    Unique,
}

/// Ordinal of the selected top-level body table.
fn resolve_table(body: &Container, selector: &TableSelector, resolution: Resolution) -> EditResult<usize> {
    if let Some(index) = selector.index {
        let count = body.tables().count();
        if index >= count {
            return Err(EditError::not_found(format!(
                "table index {index} (document has {count} tables)"
            )));
        }
        return Ok(index);
    }

    let needle = selector.text.as_deref().unwrap_or_default();
    let candidates: Vec<usize> = body
        .tables()
        .enumerate()
        .filter(|(_, table)| table.contains_text(needle))
        .map(|(ordinal, _)| ordinal)
        .collect();

    match (candidates.as_slice(), resolution) {
        ([], _) => Err(EditError::not_found(selector.to_string())),
        ([only], _) => Ok(*only),
        ([first, ..], Resolution::FirstMatch) => {
            warn!("{} matched {} tables, using table #{}", selector, candidates.len(), first);
            Ok(*first)
        }
        (_, Resolution::Unique) => Err(EditError::Ambiguous {
            target: selector.to_string(),
            count: candidates.len(),
        }),
    }
}

fn table_mut<'a>(document: &'a mut Document, ordinal: usize) -> EditResult<&'a mut Table> {
    document
        .body
        .tables_mut()
        .nth(ordinal)
        .ok_or_else(EditError::stale_span)
}

#[instrument(skip(document), level = "debug")]
pub(super) fn delete_table(document: &mut Document, selector: &TableSelector) -> EditResult<usize> {
    let ordinal = resolve_table(&document.body, selector, Resolution::Unique)?;
    let block_index = document
        .body
        .table_block_index(ordinal)
        .ok_or_else(EditError::stale_span)?;
    document.body.blocks.remove(block_index);
    info!("Deleted {}", selector);
    Ok(1)
}

#[instrument(skip(document, op), level = "debug")]
pub(super) fn table_modify_cell(document: &mut Document, op: &TableModifyCell) -> EditResult<usize> {
    let ordinal = resolve_table(&document.body, &op.table, Resolution::FirstMatch)?;
    let (row, col) = (op.coords.row, op.coords.col);
    let table = table_mut(document, ordinal)?;
    let (rows, cols) = (table.rows.len(), table.column_count());
    let cell = table.cell_mut(row, col).ok_or_else(|| {
        EditError::not_found(format!("cell ({row}, {col}) in a {rows}x{cols} table"))
    })?;

    set_cell_text(cell, &op.text);
    info!("Set cell ({}, {}) of {}", row, col, op.table);
    Ok(1)
}

/// Keep only the cell's first paragraph and give it `text`.
fn set_cell_text(cell: &mut TableCell, text: &str) {
    let first = cell.content.blocks.iter().position(|block| matches!(block, Block::Paragraph(_)));
    let mut paragraph = match first {
        Some(index) => match cell.content.blocks.swap_remove(index) {
            Block::Paragraph(paragraph) => paragraph,
            Block::Table(_) => Paragraph::new(),
        },
        None => Paragraph::new(),
    };
    paragraph.set_text(text);
    cell.content.blocks = vec![Block::Paragraph(paragraph)];
}

#[instrument(skip(document, op), level = "debug")]
pub(super) fn table_add_row(document: &mut Document, op: &TableAddRow) -> EditResult<usize> {
    let ordinal = resolve_table(&document.body, &op.table, Resolution::FirstMatch)?;
    let table = table_mut(document, ordinal)?;

    let columns = table.column_count();
    if op.row_data.len() != columns {
        return Err(EditError::malformed(format!(
            "row_data has {} values but the table has {} columns",
            op.row_data.len(),
            columns
        )));
    }
    if let Some(index) = op.insert_at_index {
        warn!("insert_at_index {} is not supported, appending the row instead", index);
    }

    let template = table.rows.last();
    let cells = op
        .row_data
        .iter()
        .enumerate()
        .map(|(col, text)| {
            let model = template
                .and_then(|row| row.cells.get(col))
                .and_then(|cell| cell.content.paragraphs().next());
            let paragraph = match model {
                Some(model) => {
                    let format = model.runs.first().map(|run| run.format.clone()).unwrap_or_default();
                    model.sibling().with_runs(vec![Run::new(text.as_str()).with_format(format)])
                }
                None => Paragraph::from_text(text.as_str()),
            };
            let mut cell = TableCell::new(Container::from_paragraphs(vec![paragraph]));
            if let Some(model) = template.and_then(|row| row.cells.get(col)) {
                cell.properties = model.properties.clone();
            }
            cell
        })
        .collect();
    let mut row = TableRow::new(cells);
    if let Some(template) = template {
        row.properties = template.properties.clone();
    }
    table.rows.push(row);

    info!("Appended row #{} to {}", table.rows.len() - 1, op.table);
    Ok(1)
}
