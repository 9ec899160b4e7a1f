//! moviesdb binary
//!
//! Parses arguments, loads configuration, sets up logging and runs the shell.

use moviesdb::config::{resolve_config, Config};
use moviesdb::core::{MoviesError, Result};
use moviesdb::repl::{run_shell, Alert, MoviesShell};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Command-line arguments: `moviesdb [--config <path>] [database-url]`
#[derive(Debug, Default)]
struct Args {
    config: Option<PathBuf>,
    database_url: Option<String>,
}

fn parse_args(mut args: impl Iterator<Item = String>) -> Result<Args> {
    let mut parsed = Args::default();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let path = args
                    .next()
                    .ok_or_else(|| MoviesError::Config("--config needs a path".to_string()))?;
                parsed.config = Some(PathBuf::from(path));
            }
            _ if parsed.database_url.is_none() => parsed.database_url = Some(arg),
            _ => {
                return Err(MoviesError::Config(format!("Unexpected argument '{}'", arg)));
            }
        }
    }
    Ok(parsed)
}

fn init_logging(config: &Config) -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level()?)
        .with_writer(io::stderr)
        .init();
    Ok(())
}

fn run() -> Result<()> {
    let args = parse_args(std::env::args().skip(1))?;
    let config = resolve_config(args.config.as_deref())?;
    init_logging(&config)?;

    let url = match args.database_url {
        Some(url) => url,
        None => config.database_url()?,
    };
    info!("Starting moviesdb against {}", url);

    let mut shell = MoviesShell::open(&url, config.default_query())
        .map_err(|e| {
            // No point continuing if the database can't be initialized.
            eprintln!("{}", Alert::database(e));
            MoviesError::Ui("Startup failed".to_string())
        })?
        .with_row_count(config.show_row_count());

    println!("Welcome to moviesdb! Type :help for commands, :quit to exit.");
    let stdin = io::stdin();
    let result = run_shell(&mut shell, stdin.lock(), io::stdout().lock());
    shell.close();
    result
}

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(MoviesError::Ui(msg)) => {
            error!("{}", msg);
            ExitCode::FAILURE
        }
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}
