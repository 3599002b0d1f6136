use tracing::{debug, info, instrument, warn};

use crate::error::{EditError, EditResult};
use crate::instruction::{InsertPosition, InsertText, ReplaceText, TextFormatting};
use crate::locate::{find_paragraph_ordinals, locate_run_span_from, MatchMode, RunSpan};
use crate::model::{Block, Document, Paragraph, Run, RunFormat};
use crate::splice::splice_with;

use super::with_paragraph_slot;

/// Splice `replacement` over every occurrence of `needle`, re-locating after
/// each edit and resuming after the inserted text.
fn rewrite_occurrences<F>(paragraph: &mut Paragraph, needle: &str, replacement: &str, mut restyle: F) -> EditResult<usize>
where
    F: FnMut(&RunFormat) -> Option<RunFormat>,
{
    let mut count = 0;
    let mut from = 0;
    while let Some(located) = locate_run_span_from(paragraph, needle, from) {
        splice_with(paragraph, located.span, replacement, &mut restyle).ok_or_else(EditError::stale_span)?;
        from = located.start + replacement.len();
        count += 1;
    }
    Ok(count)
}

#[instrument(skip(document, op), level = "debug")]
pub(super) fn replace_text(document: &mut Document, op: &ReplaceText) -> EditResult<usize> {
    let mut scope = None;
    if let Some(needle) = op.context.as_deref() {
        let hits = find_paragraph_ordinals(document, needle, MatchMode::Partial);
        if hits.is_empty() {
            warn!("Context '{}' matched no paragraph, searching the whole document", needle);
        } else {
            scope = Some(hits);
        }
    }

    let mut replaced = 0;
    for (ordinal, paragraph) in document.paragraphs_mut().into_iter().enumerate() {
        if scope.as_ref().is_some_and(|hits| !hits.contains(&ordinal)) {
            continue;
        }
        replaced += rewrite_occurrences(paragraph, &op.old_text, &op.new_text, |_| None)?;
    }

    if replaced == 0 {
        return Err(EditError::not_found(format!("text '{}'", op.old_text)));
    }
    info!("Replaced {} occurrence(s) of '{}'", replaced, op.old_text);
    Ok(replaced)
}

#[instrument(skip(document, op), level = "debug")]
pub(super) fn apply_text_formatting(document: &mut Document, op: &TextFormatting) -> EditResult<usize> {
    let restyle = |seed: &RunFormat| {
        let mut format = seed.clone();
        for rule in &op.rules {
            rule.apply_to_run(&mut format);
        }
        Some(format)
    };

    let hits = find_paragraph_ordinals(document, &op.segment, MatchMode::Partial);
    let mut formatted = 0;
    for (ordinal, paragraph) in document.paragraphs_mut().into_iter().enumerate() {
        if hits.contains(&ordinal) {
            formatted += rewrite_occurrences(paragraph, &op.segment, &op.segment, restyle)?;
        }
    }

    if formatted == 0 {
        return Err(EditError::not_found(format!("segment '{}'", op.segment)));
    }
    info!("Formatted {} occurrence(s) of '{}'", formatted, op.segment);
    Ok(formatted)
}

/// Ordinal, in document order, of the paragraph anchoring an insertion.
fn resolve_anchor(document: &Document, anchor: &str) -> EditResult<usize> {
    for mode in [MatchMode::Exact, MatchMode::Partial] {
        let hits = find_paragraph_ordinals(document, anchor, mode);
        if let Some(&first) = hits.first() {
            if hits.len() > 1 {
                warn!("Anchor '{}' matched {} paragraphs ({:?}), using the first", anchor, hits.len(), mode);
            }
            return Ok(first);
        }
    }
    Err(EditError::not_found(format!("anchor paragraph '{anchor}'")))
}

#[instrument(skip(document, op), level = "debug")]
pub(super) fn insert_text(document: &mut Document, op: &InsertText) -> EditResult<usize> {
    let ordinal = resolve_anchor(document, &op.anchor)?;
    debug!("Anchor '{}' resolved to paragraph #{}", op.anchor, ordinal);

    match op.position {
        InsertPosition::BeforeParagraph | InsertPosition::AfterParagraph => {
            let after = op.position == InsertPosition::AfterParagraph;
            let inserted = with_paragraph_slot(document, ordinal, |container, index| {
                let Block::Paragraph(anchor) = &container.blocks[index] else {
                    return;
                };
                let seed = if after { anchor.runs.last() } else { anchor.runs.first() };
                let format = seed.map(|run| run.format.clone()).unwrap_or_default();
                let paragraph = anchor
                    .sibling()
                    .with_runs(vec![Run::new(op.text.as_str()).with_format(format)]);
                container.blocks.insert(index + usize::from(after), Block::Paragraph(paragraph));
            });
            if !inserted {
                return Err(EditError::stale_span());
            }
        }
        InsertPosition::StartOfParagraph | InsertPosition::EndOfParagraph => {
            let paragraph = document
                .paragraphs_mut()
                .into_iter()
                .nth(ordinal)
                .ok_or_else(EditError::stale_span)?;
            insert_run(paragraph, &op.text, op.position == InsertPosition::EndOfParagraph)?;
        }
    }

    info!("Inserted text {:?} relative to '{}'", op.position, op.anchor);
    Ok(1)
}

/// Add `text` as its own run at the start or end of the paragraph, styled
/// like the run it touches and separated from it by a space.
/// Inline objects are skipped when picking that run.
fn insert_run(paragraph: &mut Paragraph, text: &str, at_end: bool) -> EditResult<()> {
    let runs = &paragraph.runs;
    let target = if at_end {
        runs.iter().rposition(|run| !run.is_inline())
    } else {
        runs.iter().position(|run| !run.is_inline())
    };
    let Some(run) = target else {
        let index = if at_end { paragraph.runs.len() } else { 0 };
        paragraph.runs.insert(index, Run::new(text));
        return Ok(());
    };
    let (span, padded) = if at_end {
        let offset = runs[run].text.len();
        (RunSpan::Single { run, offset, len: 0 }, format!(" {text}"))
    } else {
        (RunSpan::Single { run, offset: 0, len: 0 }, format!("{text} "))
    };
    splice_with(paragraph, span, &padded, |seed| Some(seed.clone()))
        .map(|_| ())
        .ok_or_else(EditError::stale_span)
}
