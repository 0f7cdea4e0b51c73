//! CLI module for thicket
//!
//! This module provides the command-line interface around the bundled grammars.
//!
//! ## Commands
//!
//! - `parse <file>` - Parse a file and print its syntax tree
//! - `grammar` - Print the rules of a bundled grammar
//! - `eval <file>` - Parse a file and print what it binds
//!
//! ## Design
//!
//! The CLI uses clap for argument parsing with derive macros.
//! Command functions return `CliResult<T>` instead of calling `process::exit`.
//! Only the top-level `run()` function handles errors and exits.

// Enforce explicit error handling - no panicking in production code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub mod commands;

use std::fmt;
use std::path::PathBuf;
use std::process;

use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::grammars::GrammarKind;

// ============================================================================
// CLI Error handling
// ============================================================================

/// Exit code for CLI operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(pub i32);

impl ExitCode {
    pub const SUCCESS: ExitCode = ExitCode(0);
    pub const FAILURE: ExitCode = ExitCode(1);
}

/// Error type for CLI operations.
///
/// Contains a user-facing message and an exit code. The CLI entry point
/// catches these errors, prints the message, and exits with the code.
#[derive(Debug)]
pub struct CliError {
    /// User-facing error message (already formatted for display)
    pub message: String,
    /// Exit code to return to the shell
    pub exit_code: ExitCode,
}

impl CliError {
    pub fn new(message: impl Into<String>, exit_code: ExitCode) -> Self {
        Self {
            message: message.into(),
            exit_code,
        }
    }

    /// Create a failure error (exit code 1).
    pub fn failure(message: impl Into<String>) -> Self {
        Self::new(message, ExitCode::FAILURE)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

/// Result type for CLI operations.
pub type CliResult<T> = Result<T, CliError>;

const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// Clap CLI definition
// ============================================================================

/// Grammar-driven incremental parser
#[derive(Parser, Debug)]
#[command(name = "thicket")]
#[command(version = VERSION)]
#[command(about = "Grammar-driven incremental parser", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Log filter (overrides RUST_LOG), e.g. `debug` or `thicket_core=trace`
    #[arg(long, global = true, value_name = "FILTER")]
    pub log_level: Option<String>,
}

/// Parser options shared by the commands that parse a file.
#[derive(Args, Debug, Clone)]
pub struct ParseArgs {
    /// Input file
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
    /// Bundled grammar to parse with
    #[arg(short, long, value_enum, default_value_t = GrammarKind::Statements)]
    pub grammar: GrammarKind,
    /// Report and skip unexpected characters instead of stopping
    #[arg(long)]
    pub recover: bool,
    /// Build the tree only once the whole input is read
    #[arg(long = "no-eager-commit")]
    pub no_eager_commit: bool,
    /// Stop recovering after this many errors
    #[arg(long, value_name = "N", default_value_t = 100)]
    pub max_errors: usize,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Parse a file and print its syntax tree
    Parse {
        #[command(flatten)]
        args: ParseArgs,
        /// Print the tree as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the rules of a bundled grammar
    Grammar {
        #[arg(short, long, value_enum, default_value_t = GrammarKind::Statements)]
        grammar: GrammarKind,
    },

    /// Parse a file and print the values it binds
    Eval {
        #[command(flatten)]
        args: ParseArgs,
    },
}

// ============================================================================
// CLI entry point
// ============================================================================

/// Main CLI entry point.
///
/// This is the only place where `process::exit` is called. All command
/// implementations return `CliResult` and errors are handled here.
pub fn run() {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());

    match execute(cli) {
        Ok(exit_code) => {
            if exit_code.0 != 0 {
                process::exit(exit_code.0);
            }
        }
        Err(e) => {
            if !e.message.is_empty() {
                eprintln!("{}", e.message);
            }
            process::exit(e.exit_code.0);
        }
    }
}

/// Install structured logging with an env-based filter, defaulting to info.
fn init_tracing(log_level: Option<&str>) {
    let filter = match log_level {
        Some(level) => EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info")),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Execute the CLI command and return result.
fn execute(cli: Cli) -> CliResult<ExitCode> {
    match cli.command {
        Command::Parse { args, json } => commands::parse_file(&args, json),
        Command::Grammar { grammar } => commands::print_grammar(grammar),
        Command::Eval { args } => commands::eval_file(&args),
    }
}

// ============================================================================
// Tests
// ============================================================================
