//! Before/after snippets for replacements, built from a word window around
//! the match. Read-only and best-effort: whitespace is normalized to single
//! spaces.

use serde::{Deserialize, Serialize};

use crate::error::{EditError, EditResult};
use crate::extract::extract_text;
use crate::instruction::{Instruction, Operation};
use crate::locate::find_word_span;
use crate::model::Document;

const ELLIPSIS: &str = "...";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditPreview {
    pub before: String,
    pub after: String,
}

/// Preview replacing `old_text` with `new_text` inside `full_text`, keeping
/// at most `window` words of context on each side.
pub fn preview_replacement(full_text: &str, old_text: &str, new_text: &str, window: usize) -> Option<EditPreview> {
    let span = find_word_span(full_text, old_text)?;
    let words: Vec<&str> = full_text.split_whitespace().collect();
    let start = span.start.saturating_sub(window);
    let end = span.end.saturating_add(window).min(words.len());

    let lead = if start > 0 { ELLIPSIS } else { "" };
    let trail = if end < words.len() { ELLIPSIS } else { "" };
    let prefix = &words[start..span.start];
    let suffix = &words[span.end..end];
    let replacement: Vec<&str> = new_text.split_whitespace().collect();

    Some(EditPreview {
        before: join_words(lead, &[prefix, &words[span.clone()], suffix], trail),
        after: join_words(lead, &[prefix, &replacement, suffix], trail),
    })
}

fn join_words(lead: &str, pieces: &[&[&str]], trail: &str) -> String {
    let words: Vec<&str> = pieces.iter().flat_map(|piece| piece.iter().copied()).collect();
    format!("{lead}{}{trail}", words.join(" "))
}

/// Preview a REPLACE_TEXT instruction against the document's flattened text.
/// Other operation kinds have no preview and yield `None`.
pub fn preview_instruction(document: &Document, instruction: &Instruction, window: usize) -> EditResult<Option<EditPreview>> {
    let Operation::ReplaceText(op) = instruction.parse()? else {
        return Ok(None);
    };
    preview_replacement(&extract_text(document), &op.old_text, &op.new_text, window)
        .map(Some)
        .ok_or_else(|| EditError::not_found(format!("text '{}'", op.old_text)))
}
