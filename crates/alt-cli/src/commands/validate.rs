//! Structural validation with a pass/fail exit code.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use alt_format::{Catalog, MagicFile, Mode, scan_stream};
use alt_models::AltModel;
use anyhow::Result;
use clap::Args;
use tracing::warn;

use crate::exit::{EXIT_FAILURE, EXIT_SUCCESS};

#[derive(Args, Debug)]
pub struct ValidateCommand {
    /// Container file path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Also decode every section payload, not just the framing
    #[arg(long)]
    pub full: bool,
}

impl ValidateCommand {
    /// Prints one line and returns `EXIT_SUCCESS` or `EXIT_FAILURE`.
    pub fn execute<W: Write>(&self, out: &mut W) -> Result<i32> {
        let outcome = if self.full { check_model(&self.file) } else { check_framing(&self.file) };

        match outcome {
            Ok(summary) => {
                writeln!(out, "{}: ok ({summary})", self.file.display())?;
                Ok(EXIT_SUCCESS)
            }
            Err(reason) => {
                warn!(file = %self.file.display(), %reason, "validation failed");
                writeln!(out, "{}: invalid: {reason}", self.file.display())?;
                Ok(EXIT_FAILURE)
            }
        }
    }
}

fn check_framing(path: &Path) -> std::result::Result<String, String> {
    let walk = || -> alt_format::Result<Catalog> {
        let mut magic = MagicFile::<File>::open(path, Mode::Read)?;
        magic.validate()?;
        let catalog = scan_stream(&mut magic)?;
        magic.close()?;
        Ok(catalog)
    };
    walk()
        .map(|c| format!("{} sections, {} bytes", c.sections.len(), c.file_len()))
        .map_err(|e| format!("{:?}: {e}", e.kind()))
}

fn check_model(path: &Path) -> std::result::Result<String, String> {
    AltModel::load(path)
        .map(|m| {
            format!("{} tensors, vocabulary of {}", m.tensors.len(), m.tokenizer.vocab_size())
        })
        .map_err(|e| e.to_string())
}
