use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Configuration for the docx-edit command line.
#[derive(Parser, Debug, Clone)]
#[command(name = "docx-edit")]
#[command(about = "Apply structured edit instructions to .docx documents, preserving run formatting")]
pub struct Config {
    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info", env = "DOCX_EDIT_LOG")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Print the document text in document order, one paragraph per line
    Extract {
        /// Input document (.docx, or .json for a model snapshot)
        #[arg(env = "DOCX_EDIT_INPUT")]
        input: PathBuf,
    },

    /// Apply a batch of instructions and print the JSON report
    Apply {
        /// Input document (.docx, or .json for a model snapshot)
        #[arg(env = "DOCX_EDIT_INPUT")]
        input: PathBuf,

        /// JSON file holding one instruction or an array of them
        #[arg(long, short)]
        instructions: PathBuf,

        /// Where to write the edited document
        #[arg(long, short, env = "DOCX_EDIT_OUTPUT")]
        output: PathBuf,
    },

    /// Show before/after snippets for the batch's REPLACE_TEXT instructions
    Preview {
        /// Input document (.docx, or .json for a model snapshot)
        #[arg(env = "DOCX_EDIT_INPUT")]
        input: PathBuf,

        /// JSON file holding one instruction or an array of them
        #[arg(long, short)]
        instructions: PathBuf,

        /// Words of context on each side of the match
        #[arg(long, default_value = "5", env = "DOCX_EDIT_PREVIEW_WINDOW")]
        window: usize,
    },
}
