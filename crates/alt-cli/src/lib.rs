//! ALT command-line tools
//!
//! The binary is a thin shell around this library so that argument parsing
//! and every command can be exercised from tests without spawning a process.

pub mod commands;
pub mod exit;

use std::io::Write;
use std::path::PathBuf;

use alt_common::AltConfig;
use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};

use commands::{InspectCommand, QuantizeCommand, ShowCommand, ValidateCommand};

/// Inspect, validate and experiment with ALT model containers
#[derive(Parser, Debug)]
#[command(name = "alt")]
#[command(about = "Tools for ALT model container files")]
#[command(long_about = r#"
Tools for ALT model container files.

Examples:
  # List the sections of a file
  alt inspect model.alt

  # Check a file's framing; exits 1 if it is damaged
  alt validate model.alt

  # Decode the whole model and print a summary
  alt show model.alt

  # Measure quantization error on a random row
  alt quantize --data-type qint4 --block-size 32 --count 4096
"#)]
#[command(version)]
pub struct Cli {
    /// Configuration file (.toml or .json)
    #[arg(short, long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG says otherwise
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the sections of a container without decoding them
    Inspect(InspectCommand),

    /// Check a container's markers and framing
    #[command(alias = "check")]
    Validate(ValidateCommand),

    /// Load a model and print its metadata and tensor list
    Show(ShowCommand),

    /// Quantize a pseudo-random row and report the error
    #[command(alias = "quant")]
    Quantize(QuantizeCommand),

    /// Print the effective configuration as TOML
    Config,
}

impl Commands {
    /// Run the command, writing its report to `out`. Returns the process exit
    /// code; `Err` is reserved for failures the command could not report.
    pub fn run<W: Write>(&self, config: &AltConfig, out: &mut W) -> Result<i32> {
        match self {
            Self::Inspect(cmd) => cmd.execute(out).map(|()| exit::EXIT_SUCCESS),
            Self::Validate(cmd) => cmd.execute(out),
            Self::Show(cmd) => cmd.execute(out).map(|()| exit::EXIT_SUCCESS),
            Self::Quantize(cmd) => cmd.execute(config, out).map(|()| exit::EXIT_SUCCESS),
            Self::Config => {
                out.write_all(config.to_toml()?.as_bytes())?;
                Ok(exit::EXIT_SUCCESS)
            }
        }
    }
}

/// The clap command tree, for help-text and argument tests.
pub fn build_cli() -> clap::Command {
    Cli::command()
}
