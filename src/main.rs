mod repl;

use std::{
    fs,
    path::{Path, PathBuf},
    process::ExitCode,
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use noocrush::{Config, Interpreter};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Exit status for scripts rejected by the lexer or parser.
const EXIT_STATIC_ERROR: u8 = 65;
/// Exit status for scripts that failed while running.
const EXIT_RUNTIME_ERROR: u8 = 70;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// maximum depth of nested function calls
    #[arg(long = "max-depth", value_name = "N", global = true)]
    max_depth: Option<usize>,

    /// log interpreter activity to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// run a file
    Run {
        #[arg(name = "FILE")]
        file: PathBuf,
    },
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

fn run_file(file: &Path, config: Config) -> Result<ExitCode> {
    let source = fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;

    let mut interpreter = Interpreter::with_config(config);
    match interpreter.run(&source) {
        Ok(_) => Ok(ExitCode::SUCCESS),
        Err(errors) => {
            for error in errors.iter() {
                eprintln!("{}", error);
            }
            let status = if errors.is_static() {
                EXIT_STATIC_ERROR
            } else {
                EXIT_RUNTIME_ERROR
            };
            Ok(ExitCode::from(status))
        }
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::default();
    if let Some(max_depth) = cli.max_depth {
        config = config.with_max_call_depth(max_depth);
    }

    match cli.command {
        Some(Commands::Run { file }) => run_file(&file, config),
        None => {
            repl::start(config)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
