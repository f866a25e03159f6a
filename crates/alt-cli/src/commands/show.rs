//! Full model summary.

use std::io::Write;
use std::path::PathBuf;

use alt_models::AltModel;
use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};

#[derive(Args, Debug)]
pub struct ShowCommand {
    /// Container file path
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Output format as JSON
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Also list every token
    #[arg(long)]
    pub tokens: bool,
}

impl ShowCommand {
    pub fn execute<W: Write>(&self, out: &mut W) -> Result<()> {
        let model = AltModel::load(&self.file)
            .with_context(|| format!("failed to load {}", self.file.display()))?;

        if self.json {
            serde_json::to_writer_pretty(&mut *out, &self.summary(&model))?;
            writeln!(out)?;
            return Ok(());
        }

        writeln!(out, "format     v{} (alignment {})", model.version, model.alignment)?;

        writeln!(out, "\n[general]")?;
        for (key, value) in model.general.fields() {
            writeln!(out, "{key:<24} {value}")?;
        }

        writeln!(out, "\n[parameters]")?;
        if let Value::Object(params) = serde_json::to_value(&model.parameters)? {
            for (key, value) in params {
                writeln!(out, "{key:<24} {value}")?;
            }
        }

        let special = model.tokenizer.special();
        writeln!(out, "\n[tokenizer]")?;
        writeln!(out, "{:<24} {}", "vocab_size", model.tokenizer.vocab_size())?;
        writeln!(
            out,
            "{:<24} bos={} eos={} pad={} unk={}",
            "special_ids", special.bos, special.eos, special.pad, special.unk
        )?;
        if self.tokens {
            for (id, token) in model.tokenizer.tokens().iter().enumerate() {
                writeln!(
                    out,
                    "{id:>8} {:<12} {:>10.4} {:?}",
                    token.token_type.to_string(),
                    token.score,
                    token.data
                )?;
            }
        }

        writeln!(out, "\n[tensors] {}", model.tensors.len())?;
        writeln!(out, "{:<40} {:<8} {:>6} {:<16} {:>12}", "NAME", "TYPE", "BLOCK", "SHAPE", "BYTES")?;
        for info in model.tensors.infos() {
            writeln!(
                out,
                "{:<40} {:<8} {:>6} {:<16} {:>12}",
                info.name,
                info.data_type.name(),
                info.block_size,
                format!("{:?}", info.shape),
                info.payload_len
            )?;
        }
        Ok(())
    }

    fn summary(&self, model: &AltModel) -> Value {
        let mut summary = json!({
            "version": model.version,
            "alignment": model.alignment,
            "general": model.general,
            "parameters": model.parameters,
            "tokenizer": {
                "vocab_size": model.tokenizer.vocab_size(),
                "special": model.tokenizer.special(),
            },
            "tensors": model.tensors.infos(),
        });
        if self.tokens {
            summary["tokenizer"]["tokens"] = json!(model.tokenizer.tokens());
        }
        summary
    }
}
