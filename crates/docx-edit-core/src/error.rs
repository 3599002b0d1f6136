//! Error taxonomy for instruction handling.

/// Why an instruction did not change the document.
///
/// None of these cross the dispatch boundary: the dispatcher logs them and
/// records the instruction as not applied.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EditError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Ambiguous target '{target}': {count} candidates")]
    Ambiguous { target: String, count: usize },

    #[error("Malformed instruction: {0}")]
    MalformedInstruction(String),

    #[error("Unknown operation type: '{0}'")]
    UnknownOperation(String),

    #[error("Unexpected failure: {0}")]
    Unexpected(String),
}

impl EditError {
    /// Stable machine-readable code, used in batch reports.
    pub fn code(&self) -> &'static str {
        match self {
            EditError::NotFound(_) => "NOT_FOUND",
            EditError::Ambiguous { .. } => "AMBIGUOUS",
            EditError::MalformedInstruction(_) => "MALFORMED_INSTRUCTION",
            EditError::UnknownOperation(_) => "UNKNOWN_OPERATION",
            EditError::Unexpected(_) => "UNEXPECTED",
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        EditError::MalformedInstruction(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        EditError::NotFound(message.into())
    }

    pub(crate) fn stale_span() -> Self {
        EditError::Unexpected("resolved span no longer matches the paragraph runs".to_string())
    }
}

pub type EditResult<T> = std::result::Result<T, EditError>;
