//! Run-preserving mutation engine for word-processing documents.
//!
//! This crate applies structured edit instructions to an in-memory document tree:
//! - `model`: paragraphs, runs, tables, sections
//! - `locate`: paragraph search and text-to-run span resolution
//! - `splice`: minimal run rewrites that keep surrounding formatting intact
//! - `rules`: typed formatting rules (`{style, value}` pairs)
//! - `instruction`: the wire form of an instruction and its typed operation
//! - `ops`: one handler per operation kind
//! - `dispatch`: batch application with per-instruction outcomes
//! - `extract`: flattened document text
//! - `preview`: word-window before/after previews

mod digest;
mod dispatch;
mod error;
mod extract;
mod instruction;
mod locate;
mod model;
mod ops;
mod preview;
mod rules;
mod splice;

pub use digest::fingerprint;
pub use dispatch::{apply_all, apply_batch, apply_instruction, BatchReport, InstructionOutcome, OutcomeError};
pub use error::{EditError, EditResult};
pub use extract::extract_text;
pub use instruction::{
    DeleteElement, DeleteTarget, InsertPosition, InsertText, Instruction, Operation, OperationKind,
    ParagraphFormatting, ReplaceText, TableAddRow, TableCoords, TableModifyCell, TableSelector,
    TargetDescription, TextFormatting,
};
pub use locate::{
    find_paragraph_ordinals, find_paragraphs, find_word_span, locate_run_span, locate_run_span_from, paragraph_matches,
    LocatedSpan, MatchMode, RunSpan,
};
pub use model::{
    Alignment, Block, Container, Document, HighlightColor, Markup, MarkupElement, Paragraph, Run,
    RunFormat, Section, Table, TableCell, TableRow,
};
pub use preview::{preview_instruction, preview_replacement, EditPreview};
pub use rules::{FormattingRule, StyleChange};
pub use splice::{splice, splice_with};
