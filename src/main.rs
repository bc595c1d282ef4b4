//! sessiondb - SQL-backed session storage
//!
//! CLI entry point.

use std::io::Read;
use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sessiondb::cli::gc::{GcCommand, GcOptions};
use sessiondb::cli::init::{InitCommand, InitOptions};
use sessiondb::cli::session::{SessionCommand, SessionOptions, SessionOutput};
use sessiondb::config::Config;
use sessiondb::core::SessionStore;
use sessiondb::error::{exit_code_for, exit_codes, SessionError};
use sessiondb::storage::SqliteDatastore;

// =============================================================================
// CLI Definition
// =============================================================================

/// sessiondb - SQL-backed session storage with advisory locking
#[derive(Parser)]
#[command(name = "sessiondb")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the project config and create the session table
    Init {
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
        /// Overwrite an existing project config
        #[arg(long, short)]
        force: bool,
    },

    /// Read a session (takes its lock until the next write)
    Read {
        /// Session ID
        id: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Write a session payload and release its lock
    Write {
        /// Session ID
        id: String,
        /// Payload; read from stdin when omitted
        data: Option<String>,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Delete a session
    Destroy {
        /// Session ID
        id: String,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },

    /// Delete sessions older than the maximum lifetime
    Gc {
        /// Maximum lifetime in seconds
        #[arg(long, allow_negative_numbers = true)]
        max_lifetime: i64,
        /// Output as JSON
        #[arg(long, short)]
        json: bool,
        /// Suppress output
        #[arg(long, short)]
        quiet: bool,
    },
}

// =============================================================================
// Main Entry Point
// =============================================================================

fn main() -> ExitCode {
    init_tracing();

    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("sessiondb error: {}", e);
            to_exit_code(exit_code_for(&e))
        }
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default `warn`).
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the CLI and return the exit code.
fn run() -> Result<ExitCode, SessionError> {
    let cli = Cli::parse();
    let cwd = std::env::current_dir()?;

    match cli.command {
        Commands::Init { json, quiet, force } => Ok(run_init(json, quiet, force, &cwd)),
        Commands::Read { id, json, quiet } => {
            let cmd = session_command(&cwd)?;
            let output = cmd.read(&id);
            Ok(print_session(&cmd, &output, json, quiet))
        }
        Commands::Write {
            id,
            data,
            json,
            quiet,
        } => {
            let payload = match data {
                Some(data) => data.into_bytes(),
                None => read_stdin()?,
            };
            let cmd = session_command(&cwd)?;
            let output = cmd.write(&id, &payload);
            Ok(print_session(&cmd, &output, json, quiet))
        }
        Commands::Destroy { id, json, quiet } => {
            let cmd = session_command(&cwd)?;
            let output = cmd.destroy(&id);
            Ok(print_session(&cmd, &output, json, quiet))
        }
        Commands::Gc {
            max_lifetime,
            json,
            quiet,
        } => run_gc(max_lifetime, json, quiet, &cwd),
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn to_exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(exit_codes::FAILURE as u8))
}

fn print_output(formatted: &str) {
    if !formatted.is_empty() {
        println!("{}", formatted.trim_end_matches('\n'));
    }
}

fn open_store(cwd: &Path) -> Result<SessionStore<SqliteDatastore>, SessionError> {
    let config = Config::load_from_cwd(cwd)?;
    Ok(SessionStore::sqlite(Arc::new(config)))
}

fn session_command(cwd: &Path) -> Result<SessionCommand<SessionStore<SqliteDatastore>>, SessionError> {
    Ok(SessionCommand::new(open_store(cwd)?))
}

fn read_stdin() -> Result<Vec<u8>, SessionError> {
    let mut buf = Vec::new();
    std::io::stdin().read_to_end(&mut buf)?;
    Ok(buf)
}

fn print_session(
    cmd: &SessionCommand<SessionStore<SqliteDatastore>>,
    output: &SessionOutput,
    json: bool,
    quiet: bool,
) -> ExitCode {
    let options = SessionOptions { json, quiet };
    print_output(&cmd.format_output(output, &options));
    to_exit_code(output.exit_code)
}

fn run_init(json: bool, quiet: bool, force: bool, cwd: &Path) -> ExitCode {
    let cmd = InitCommand::new(cwd);
    let options = InitOptions { json, quiet, force };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    to_exit_code(output.exit_code)
}

fn run_gc(max_lifetime: i64, json: bool, quiet: bool, cwd: &Path) -> Result<ExitCode, SessionError> {
    let cmd = GcCommand::new(open_store(cwd)?);
    let options = GcOptions {
        json,
        quiet,
        max_lifetime,
    };

    let output = cmd.run(&options);
    print_output(&cmd.format_output(&output, &options));

    Ok(to_exit_code(output.exit_code))
}

// =============================================================================
// Tests
// =============================================================================
