//! `alt` binary entry point
//!
//! ```bash
//! alt inspect model.alt --json
//! alt validate model.alt
//! RUST_LOG=alt_format=debug alt show model.alt
//! ```

use std::io;

use alt_cli::{Cli, exit};
use alt_common::{AltConfig, LogLevel};
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let config = match AltConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: failed to load configuration: {e}");
            std::process::exit(exit::EXIT_CONFIG);
        }
    };

    setup_logging(&config, cli.verbose);

    let stdout = io::stdout();
    let code = match cli.command.run(&config, &mut stdout.lock()) {
        Ok(code) => code,
        Err(e) => {
            error!("command failed: {e}");
            for cause in e.chain().skip(1) {
                error!("  caused by: {cause}");
            }
            eprintln!("error: {e:#}");
            exit::EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

/// Diagnostics go to stderr so command output on stdout stays parseable.
fn setup_logging(config: &AltConfig, verbose: bool) {
    let level = if verbose { LogLevel::Debug } else { config.logging.level };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}
