//! Binary entry point for docvault.
//!
//! docvault: durable local file store backed by `SQLite`.

#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::Parser;
use docvault::cli::output::{OutputFormat, format_error};
use docvault::cli::{Cli, execute};
use std::io::{self, Write};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let format = OutputFormat::parse(&cli.format);
    init_tracing(cli.verbose);

    match execute(&cli).await {
        Ok(output) => {
            if !output.is_empty() {
                // Handle broken pipe gracefully (e.g., when piped to `head` or `jq`)
                if let Err(e) = write!(io::stdout(), "{output}")
                    && e.kind() != io::ErrorKind::BrokenPipe
                {
                    eprintln!("Error writing to stdout: {e}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            let error_output = format_error(&e, format);
            match format {
                OutputFormat::Json => {
                    // JSON errors go to stdout for programmatic parsing
                    println!("{error_output}");
                }
                OutputFormat::Text => {
                    eprintln!("Error: {error_output}");
                }
            }
            ExitCode::FAILURE
        }
    }
}

/// Logs go to stderr; `RUST_LOG` wins over `--verbose`.
fn init_tracing(verbose: bool) {
    let default = if verbose { "docvault=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
