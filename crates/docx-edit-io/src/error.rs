//! Error types for .docx packaging.

#[derive(Debug, thiserror::Error)]
pub enum DocxIoError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid package: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid XML in {part}: {source}")]
    Xml {
        part: String,
        #[source]
        source: roxmltree::Error,
    },

    #[error("Missing package part: {0}")]
    MissingPart(String),

    #[error("Missing element <w:{element}> in {part}")]
    MissingElement { part: String, element: &'static str },

    #[error("Failed to write package: {0}")]
    Write(String),

    #[error("Cannot patch {part}: {reason}")]
    Unsupported { part: String, reason: String },
}

pub type Result<T> = std::result::Result<T, DocxIoError>;
