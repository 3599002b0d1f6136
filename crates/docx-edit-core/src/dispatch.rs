//! Batch application.
//!
//! Instructions run strictly in order against the same document. A failed
//! instruction leaves the document as it found it and never stops the batch.

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::error::{EditError, EditResult};
use crate::instruction::Instruction;
use crate::model::Document;
use crate::ops;

/// Error details recorded for a failed instruction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeError {
    pub code: String,
    pub message: String,
}

impl From<&EditError> for OutcomeError {
    fn from(err: &EditError) -> Self {
        Self {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}

/// What happened to one instruction of a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionOutcome {
    pub index: usize,
    pub operation_type: String,
    pub applied: bool,
    /// Number of individual edits (occurrences, paragraphs, rows) made.
    #[serde(default)]
    pub edits: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<OutcomeError>,
}

/// Per-instruction outcomes of a batch, in instruction order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<InstructionOutcome>,
}

impl BatchReport {
    pub fn any_applied(&self) -> bool {
        self.outcomes.iter().any(|outcome| outcome.applied)
    }

    pub fn applied_count(&self) -> usize {
        self.outcomes.iter().filter(|outcome| outcome.applied).count()
    }

    pub fn failures(&self) -> impl Iterator<Item = &InstructionOutcome> {
        self.outcomes.iter().filter(|outcome| !outcome.applied)
    }
}

/// Parse and run a single instruction, returning the number of edits.
pub fn apply_instruction(document: &mut Document, instruction: &Instruction) -> EditResult<usize> {
    let operation = instruction.parse()?;
    ops::execute(document, &operation)
}

/// Apply every instruction in order and report each outcome.
#[instrument(skip_all, fields(instructions = instructions.len()), level = "debug")]
pub fn apply_batch(document: &mut Document, instructions: &[Instruction]) -> BatchReport {
    let outcomes = instructions
        .iter()
        .enumerate()
        .map(|(index, instruction)| {
            let result = apply_instruction(document, instruction);
            match &result {
                Ok(edits) => info!(
                    "Instruction #{} ({}) applied: {} edit(s)",
                    index, instruction.operation_type, edits
                ),
                Err(e) => warn!(
                    "Instruction #{} ({}) not applied [{}]: {}",
                    index,
                    instruction.operation_type,
                    e.code(),
                    e
                ),
            }
            InstructionOutcome {
                index,
                operation_type: instruction.operation_type.clone(),
                applied: result.is_ok(),
                edits: result.as_ref().copied().unwrap_or(0),
                error: result.as_ref().err().map(OutcomeError::from),
            }
        })
        .collect();

    let report = BatchReport { outcomes };
    info!(
        "Batch finished: {}/{} instruction(s) applied",
        report.applied_count(),
        instructions.len()
    );
    report
}

/// Apply every instruction in order. True iff at least one was applied.
pub fn apply_all(document: &mut Document, instructions: &[Instruction]) -> bool {
    if instructions.is_empty() {
        warn!("No instructions to apply");
        return false;
    }
    apply_batch(document, instructions).any_applied()
}
