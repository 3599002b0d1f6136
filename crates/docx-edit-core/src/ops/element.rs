use std::ops::ControlFlow;

use tracing::{info, instrument, warn};

use crate::error::{EditError, EditResult};
use crate::instruction::ParagraphFormatting;
use crate::locate::{find_paragraph_ordinals, paragraph_matches, MatchMode};
use crate::model::{Block, Document};

/// Delete paragraphs matching `text`.
///
/// Every exact match is removed. Without an exact match, a partial match is
/// accepted only when it is unique.
#[instrument(skip(document), level = "debug")]
pub(super) fn delete_paragraphs(document: &mut Document, text: &str) -> EditResult<usize> {
    let count = |mode| find_paragraph_ordinals(document, text, mode).len();

    let mode = match (count(MatchMode::Exact), count(MatchMode::Partial)) {
        (0, 0) => return Err(EditError::not_found(format!("paragraph '{text}'"))),
        (0, 1) => MatchMode::Partial,
        (0, partial) => {
            warn!("Refusing to delete: '{}' partially matches {} paragraphs", text, partial);
            return Err(EditError::Ambiguous {
                target: text.to_string(),
                count: partial,
            });
        }
        _ => MatchMode::Exact,
    };

    let mut removed = 0;
    let _ = document.visit_containers_mut(&mut |container| {
        let before = container.blocks.len();
        container.blocks.retain(|block| match block {
            Block::Paragraph(paragraph) => !paragraph_matches(&paragraph.text(), text, mode),
            Block::Table(_) => true,
        });
        removed += before - container.blocks.len();
        ControlFlow::Continue(())
    });

    info!("Deleted {} paragraph(s) matching '{}' ({:?})", removed, text, mode);
    Ok(removed)
}

#[instrument(skip(document, op), level = "debug")]
pub(super) fn apply_paragraph_formatting(document: &mut Document, op: &ParagraphFormatting) -> EditResult<usize> {
    let hits = find_paragraph_ordinals(document, &op.text, MatchMode::Partial);
    let mut formatted = 0;
    for (ordinal, paragraph) in document.paragraphs_mut().into_iter().enumerate() {
        if !hits.contains(&ordinal) {
            continue;
        }
        let mut changed = false;
        for rule in &op.rules {
            changed |= rule.apply_to_paragraph(paragraph);
        }
        formatted += usize::from(changed);
    }

    if formatted == 0 {
        return Err(EditError::not_found(format!("paragraph '{}'", op.text)));
    }
    info!("Formatted {} paragraph(s) matching '{}'", formatted, op.text);
    Ok(formatted)
}
