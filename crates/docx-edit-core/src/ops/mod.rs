//! Operation handlers.
//!
//! Every handler returns the number of edits it made. Zero edits is never
//! reported as success: a handler that changes nothing returns an error
//! explaining why.

mod element;
mod table;
mod text;

use std::ops::ControlFlow;

use crate::error::EditResult;
use crate::instruction::{DeleteTarget, Operation};
use crate::model::{Block, Container, Document};

/// Run one operation against the document.
pub(crate) fn execute(document: &mut Document, operation: &Operation) -> EditResult<usize> {
    match operation {
        Operation::ReplaceText(op) => text::replace_text(document, op),
        Operation::InsertText(op) => text::insert_text(document, op),
        Operation::ApplyTextFormatting(op) => text::apply_text_formatting(document, op),
        Operation::ApplyParagraphFormatting(op) => element::apply_paragraph_formatting(document, op),
        Operation::DeleteElement(op) => match &op.target {
            DeleteTarget::Paragraph(text) => element::delete_paragraphs(document, text),
            DeleteTarget::Table(selector) => table::delete_table(document, selector),
        },
        Operation::TableModifyCell(op) => table::table_modify_cell(document, op),
        Operation::TableAddRow(op) => table::table_add_row(document, op),
    }
}

/// Find the container holding the `ordinal`-th paragraph in document order
/// and hand it to `edit` along with that paragraph's block index. Returns
/// false when the document has fewer paragraphs.
fn with_paragraph_slot<F>(document: &mut Document, ordinal: usize, edit: F) -> bool
where
    F: FnOnce(&mut Container, usize),
{
    let mut seen = 0;
    let mut edit = Some(edit);
    let flow = document.visit_containers_mut(&mut |container| {
        let Some(local) = ordinal.checked_sub(seen) else {
            return ControlFlow::Break(());
        };
        let slot = container
            .blocks
            .iter()
            .enumerate()
            .filter(|(_, block)| matches!(block, Block::Paragraph(_)))
            .map(|(index, _)| index)
            .nth(local);
        match (slot, edit.take()) {
            (Some(block_index), Some(edit)) => {
                edit(container, block_index);
                ControlFlow::Break(())
            }
            (_, pending) => {
                edit = pending;
                seen += container.paragraphs().count();
                ControlFlow::Continue(())
            }
        }
    });
    flow.is_break() && edit.is_none()
}
