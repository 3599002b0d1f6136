//! `.docx` packaging for the docx-edit document model.
//!
//! [`read_docx`] builds a [`docx_edit_core::Document`] from a package.
//! [`patch_docx`] writes an edited document back into the package it came
//! from, leaving styles, numbering, media and every other part untouched.
//! [`write_docx`] builds a fresh package from a model alone; it keeps only
//! what the model interprets (paragraph style and alignment, run text and
//! character formatting, tables, the first section's header and footer).

mod error;
mod patch;
mod reader;
mod wordml;
mod writer;

use std::fs;
use std::path::Path;

use docx_edit_core::Document;
use tracing::info;

pub use error::{DocxIoError, Result};
pub use patch::patch_docx;
pub use reader::read_docx;
pub use writer::write_docx;

/// Read a `.docx` file from disk.
pub fn load(path: &Path) -> Result<Document> {
    let bytes = fs::read(path)?;
    let document = read_docx(&bytes)?;
    info!(
        "Loaded {} ({} bytes, {} paragraphs)",
        path.display(),
        bytes.len(),
        document.paragraphs().len()
    );
    Ok(document)
}

/// Write a document to disk as a new `.docx` package.
pub fn save(document: &Document, path: &Path) -> Result<()> {
    let bytes = write_docx(document)?;
    fs::write(path, &bytes)?;
    info!("Saved {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

/// Write a document read from `source` to `destination`, patching the
/// source package. `source` and `destination` may be the same file.
pub fn save_edited(source: &Path, document: &Document, destination: &Path) -> Result<()> {
    let original = fs::read(source)?;
    let bytes = patch_docx(&original, document)?;
    fs::write(destination, &bytes)?;
    info!(
        "Saved {} ({} bytes, patched from {})",
        destination.display(),
        bytes.len(),
        source.display()
    );
    Ok(())
}
