use std::{fs, path::PathBuf, process::ExitCode};

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use popcorn::{ErrorPolicy, ExecutionConfig, Interpreter, PopcornError, Repl, RunReport};

#[derive(Parser)]
#[command(author, version, about = "Popcorn stack language interpreter")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Stop at the first failing line instead of running the rest
    #[arg(long, global = true)]
    halt_on_error: bool,

    /// Abort a line after processing this many tokens
    #[arg(long, global = true, value_name = "N")]
    step_limit: Option<usize>,

    /// Log evaluation details to stderr (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Run a Popcorn script file
    Run { script: PathBuf },
    /// Start an interactive REPL session
    Repl,
    /// Evaluate a snippet of Popcorn code
    Eval { source: String },
}

fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.verbose);

    let config = ExecutionConfig {
        error_policy: if args.halt_on_error {
            ErrorPolicy::Halt
        } else {
            ErrorPolicy::Continue
        },
        step_limit: args.step_limit,
    };

    let outcome = match args.command.unwrap_or(Command::Repl) {
        Command::Run { script } => run_script(script, config),
        Command::Repl => Repl::new(Interpreter::with_config(config))
            .run()
            .map(|()| RunReport::default()),
        Command::Eval { source } => Interpreter::with_config(config).eval_source(&source),
    };

    match outcome {
        Ok(report) if report.is_success() => ExitCode::SUCCESS,
        Ok(report) => {
            tracing::info!(failed = report.failures.len(), "program finished with failures");
            ExitCode::FAILURE
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run_script(path: PathBuf, config: ExecutionConfig) -> Result<RunReport, PopcornError> {
    let source = fs::read_to_string(&path)?;
    tracing::debug!(script = %path.display(), "loaded script");
    Interpreter::with_config(config).eval_source(&source)
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "error",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
