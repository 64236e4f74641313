//! Wisp CLI
//!
//! Command-line interface for running Wisp scripts and starting an
//! interactive REPL.

use std::path::PathBuf;
use std::process;

use clap::{Parser as ClapParser, Subcommand};
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tracing::info;
use wisp_vm::{InterpretError, Vm, VmConfig};

#[derive(ClapParser)]
#[command(name = "wisp")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Wisp - a small bytecode-interpreted scripting language", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a Wisp source file
    Run {
        /// Input .wisp source file
        path: PathBuf,
    },
    /// Start an interactive REPL
    Repl,
}

/// Exit codes follow the `sysexits.h` convention: 65 for a compile-time
/// (data) error, 70 for a runtime (software) fault. 74 is added for I/O
/// errors, which this host surface otherwise has no way to distinguish
/// from a compile error.
const EX_DATAERR: i32 = 65;
const EX_SOFTWARE: i32 = 70;
const EX_IOERR: i32 = 74;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive("wisp=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let command = cli.command.unwrap_or(Commands::Repl);

    let code = match command {
        Commands::Run { path } => run_file(&path),
        Commands::Repl => run_repl(),
    };
    process::exit(code);
}

fn run_file(path: &PathBuf) -> i32 {
    let source = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Could not read file '{}': {e}", path.display());
            return EX_IOERR;
        }
    };

    info!(path = %path.display(), "running script");
    let mut vm = Vm::new(VmConfig::from_env());
    match vm.interpret(&source) {
        Ok(()) => 0,
        Err(InterpretError::Compile(_)) => EX_DATAERR,
        Err(InterpretError::Runtime(_)) => EX_SOFTWARE,
    }
}

fn run_repl() -> i32 {
    println!("wisp {} - interactive mode, Ctrl-D to exit", env!("CARGO_PKG_VERSION"));
    let mut vm = Vm::new(VmConfig::from_env());
    let mut editor = match DefaultEditor::new() {
        Ok(e) => e,
        Err(e) => {
            eprintln!("Failed to start line editor: {e}");
            return EX_IOERR;
        }
    };

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                // Each line is its own compile unit: a failed line never
                // poisons the session, matching the C original's REPL loop
                // in `main()`, which calls `interpret()` fresh per line.
                if let Err(err) = vm.interpret(&line) {
                    eprintln!("{err}");
                }
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("Readline error: {e}");
                return EX_IOERR;
            }
        }
    }
    0
}
