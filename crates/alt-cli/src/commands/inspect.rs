//! Section listing

use std::io::Write;
use std::path::PathBuf;

use alt_format::constants::END_MARKER_LEN;
use alt_format::{Catalog, scan};
use anyhow::{Context, Result};
use clap::Args;
use tracing::debug;

/// Inspect command arguments
#[derive(Args, Debug)]
pub struct InspectCommand {
    /// Container file path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output format as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

impl InspectCommand {
    pub fn execute<W: Write>(&self, out: &mut W) -> Result<()> {
        let catalog =
            scan(&self.file).with_context(|| format!("failed to scan {}", self.file.display()))?;
        debug!(sections = catalog.sections.len(), "catalogue ready");

        if self.json {
            serde_json::to_writer_pretty(&mut *out, &catalog)?;
            writeln!(out)?;
        } else {
            write_table(&catalog, out)?;
        }
        Ok(())
    }
}

fn write_table<W: Write>(catalog: &Catalog, out: &mut W) -> Result<()> {
    writeln!(out, "version    {}", catalog.version)?;
    writeln!(out, "alignment  {}", catalog.alignment)?;
    writeln!(out)?;
    writeln!(out, "{:<12} {:>12} {:>12}", "SECTION", "OFFSET", "LENGTH")?;
    for s in &catalog.sections {
        writeln!(out, "{:<12} {:>12} {:>12}", s.kind.name(), s.offset, s.length)?;
    }
    writeln!(out, "{:<12} {:>12} {:>12}", "end", catalog.end_offset, END_MARKER_LEN)?;
    writeln!(out)?;
    writeln!(out, "{} bytes", catalog.file_len())?;
    Ok(())
}
