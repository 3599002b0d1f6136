mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use docx_edit_core::{
    apply_batch, extract_text, fingerprint, preview_instruction, BatchReport, Document, EditPreview, Instruction,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use config::{Command, Config};

/// Printed on stdout after `apply`.
#[derive(Debug, Serialize)]
struct ApplyReport {
    generated_at: DateTime<Utc>,
    input: PathBuf,
    output: PathBuf,
    fingerprint_before: String,
    fingerprint_after: String,
    changed: bool,
    batch: BatchReport,
}

#[derive(Debug, Serialize)]
struct PreviewEntry {
    index: usize,
    #[serde(flatten)]
    preview: EditPreview,
}

/// An instruction file holds either one instruction or a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InstructionFile {
    Batch(Vec<Instruction>),
    Single(Instruction),
}

fn main() -> Result<()> {
    let config = Config::parse();

    // Logs go to stderr, stdout carries the command output.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match config.command {
        Command::Extract { input } => {
            let document = load_document(&input)?;
            println!("{}", extract_text(&document));
        }
        Command::Apply {
            input,
            instructions,
            output,
        } => {
            let instructions = load_instructions(&instructions)?;
            let mut document = load_document(&input)?;
            let report = apply(&mut document, &instructions, input, output)?;
            println!("{}", serde_json::to_string_pretty(&report)?);

            if !report.batch.any_applied() {
                bail!("No instruction was applied, {} not written", report.output.display());
            }
            save_document(&document, &report.input, &report.output)?;
        }
        Command::Preview {
            input,
            instructions,
            window,
        } => {
            let instructions = load_instructions(&instructions)?;
            let document = load_document(&input)?;
            let previews = preview(&document, &instructions, window);
            println!("{}", serde_json::to_string_pretty(&previews)?);
        }
    }

    Ok(())
}

fn apply(document: &mut Document, instructions: &[Instruction], input: PathBuf, output: PathBuf) -> Result<ApplyReport> {
    let fingerprint_before = fingerprint(document).context("Failed to fingerprint document")?;
    let batch = apply_batch(document, instructions);
    let fingerprint_after = fingerprint(document).context("Failed to fingerprint document")?;

    info!(
        "Applied {}/{} instruction(s) to {}",
        batch.applied_count(),
        instructions.len(),
        input.display()
    );
    Ok(ApplyReport {
        generated_at: Utc::now(),
        input,
        output,
        changed: fingerprint_before != fingerprint_after,
        fingerprint_before,
        fingerprint_after,
        batch,
    })
}

fn preview(document: &Document, instructions: &[Instruction], window: usize) -> Vec<PreviewEntry> {
    instructions
        .iter()
        .enumerate()
        .filter_map(|(index, instruction)| match preview_instruction(document, instruction, window) {
            Ok(Some(preview)) => Some(PreviewEntry { index, preview }),
            Ok(None) => {
                debug!("Instruction #{} ({}) has no preview", index, instruction.operation_type);
                None
            }
            Err(e) => {
                warn!("Instruction #{} cannot be previewed: {}", index, e);
                None
            }
        })
        .collect()
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .is_some_and(|extension| extension.eq_ignore_ascii_case("json"))
}

fn load_document(path: &Path) -> Result<Document> {
    if is_json(path) {
        let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
        return serde_json::from_str(&raw).with_context(|| format!("Invalid document model in {}", path.display()));
    }
    docx_edit_io::load(path).with_context(|| format!("Failed to load {}", path.display()))
}

/// A document read from a `.docx` is written by patching that package, so
/// everything the model does not carry survives the edit.
fn save_document(document: &Document, source: &Path, path: &Path) -> Result<()> {
    if is_json(path) {
        let raw = serde_json::to_string_pretty(document)?;
        return fs::write(path, raw).with_context(|| format!("Failed to write {}", path.display()));
    }
    if is_json(source) {
        return docx_edit_io::save(document, path).with_context(|| format!("Failed to save {}", path.display()));
    }
    docx_edit_io::save_edited(source, document, path)
        .with_context(|| format!("Failed to save {} from {}", path.display(), source.display()))
}

fn load_instructions(path: &Path) -> Result<Vec<Instruction>> {
    let raw = fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?;
    let file: InstructionFile =
        serde_json::from_str(&raw).with_context(|| format!("Invalid instructions in {}", path.display()))?;
    let instructions = match file {
        InstructionFile::Batch(instructions) => instructions,
        InstructionFile::Single(instruction) => vec![instruction],
    };
    info!("Loaded {} instruction(s) from {}", instructions.len(), path.display());
    Ok(instructions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use docx_edit_core::{Container, Paragraph};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    fn sample() -> Document {
        Document::with_body(Container::from_paragraphs(vec![Paragraph::from_text("Срок поставки 10 дней")]))
    }

    #[test]
    fn test_instruction_file_accepts_single_or_list() {
        let dir = TempDir::new().unwrap();
        let single = write(
            &dir,
            "one.json",
            r#"{"operation_type": "REPLACE_TEXT", "target_description": {}, "parameters": {"old_text": "a"}}"#,
        );
        let list = write(
            &dir,
            "many.json",
            r#"[{"operation_type": "REPLACE_TEXT", "parameters": {"old_text": "a"}},
                {"operation_type": "TABLE_ADD_ROW", "target_description": {"table_index": 0}}]"#,
        );
        assert_eq!(load_instructions(&single).unwrap().len(), 1);
        assert_eq!(load_instructions(&list).unwrap().len(), 2);
        assert!(load_instructions(&write(&dir, "bad.json", "42")).is_err());
    }

    #[test]
    fn test_apply_report_tracks_changes() {
        let mut document = sample();
        let instructions = vec![serde_json::from_str::<Instruction>(
            r#"{"operation_type": "REPLACE_TEXT", "parameters": {"old_text": "10", "new_text": "15"}}"#,
        )
        .unwrap()];

        let report = apply(&mut document, &instructions, "in.json".into(), "out.json".into()).unwrap();
        assert!(report.changed);
        assert_eq!(report.batch.applied_count(), 1);
        assert_eq!(document.paragraphs()[0].text(), "Срок поставки 15 дней");

        let report = apply(&mut document, &instructions, "in.json".into(), "out.json".into()).unwrap();
        assert!(!report.changed);
        assert_eq!(report.fingerprint_before, report.fingerprint_after);
    }

    #[test]
    fn test_json_model_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("model.JSON");
        save_document(&sample(), &path, &path).unwrap();
        assert_eq!(load_document(&path).unwrap(), sample());
    }

    #[test]
    fn test_docx_output_patches_the_input_package() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("contract.docx");
        let output = dir.path().join("edited.docx");
        docx_edit_io::save(&sample(), &input).unwrap();

        let mut document = load_document(&input).unwrap();
        let instructions = vec![serde_json::from_str::<Instruction>(
            r#"{"operation_type": "REPLACE_TEXT", "parameters": {"old_text": "10", "new_text": "15"}}"#,
        )
        .unwrap()];
        apply(&mut document, &instructions, input.clone(), output.clone()).unwrap();
        save_document(&document, &input, &output).unwrap();

        assert_eq!(extract_text(&load_document(&output).unwrap()), "Срок поставки 15 дней");
        assert_eq!(extract_text(&load_document(&input).unwrap()), "Срок поставки 10 дней");
    }

    #[test]
    fn test_preview_skips_non_replacements() {
        let instructions: Vec<Instruction> = serde_json::from_str(
            r#"[{"operation_type": "DELETE_ELEMENT", "target_description": {"element_type": "paragraph", "text_to_find": "Срок"}},
                {"operation_type": "REPLACE_TEXT", "parameters": {"old_text": "10", "new_text": "15"}}]"#,
        )
        .unwrap();
        let previews = preview(&sample(), &instructions, 1);
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].index, 1);
        assert_eq!(previews[0].preview.after, "...поставки 15 дней");
    }
}
