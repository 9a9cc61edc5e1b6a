use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::Parser;

use rill::repl::Repl;
use rill::{run_source, DebugOptions, ErrorCode, Interpreter, RunOutcome};

#[derive(Parser, Debug)]
#[command(name = "rill", version, about = "Interpreter for the Rill scripting language")]
struct Cli {
    /// Dump the token stream before parsing
    #[arg(short = 's', long = "scanner-debug")]
    scanner_debug: bool,

    /// Dump the parsed tree before evaluation
    #[arg(short = 'p', long = "parser-debug")]
    parser_debug: bool,

    /// Script to run; omit for an interactive prompt
    script: Option<PathBuf>,
}

fn main() -> ExitCode {
    // Tree-walking recursion is proportional to program nesting; a roomy
    // stack keeps deeply nested scripts from faulting.
    let worker = match std::thread::Builder::new()
        .stack_size(16 * 1024 * 1024)
        .spawn(run)
    {
        Ok(worker) => worker,
        Err(error) => {
            eprintln!("failed to start interpreter thread: {error}");
            return ErrorCode::RuntimeError.as_exit_code();
        }
    };

    worker
        .join()
        .unwrap_or(ErrorCode::RuntimeError.as_exit_code())
}

fn run() -> ExitCode {
    tracing_subscriber::fmt::init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(error) => {
            use clap::error::ErrorKind;
            let ok = matches!(
                error.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            );
            let _ = error.print();
            if ok {
                return ErrorCode::NoError.as_exit_code();
            }
            return ErrorCode::BadUsage.as_exit_code();
        }
    };

    let options = DebugOptions {
        tokens: cli.scanner_debug,
        ast: cli.parser_debug,
    };

    match cli.script {
        Some(path) => run_file(&path, options),
        None => {
            let mut repl = Repl::new(options);
            match repl.run() {
                Ok(()) => ErrorCode::NoError.as_exit_code(),
                Err(error) => {
                    eprintln!("{error}");
                    ErrorCode::RuntimeError.as_exit_code()
                }
            }
        }
    }
}

fn run_file(path: &Path, options: DebugOptions) -> ExitCode {
    let source = match fs::read_to_string(path) {
        Ok(source) => source,
        Err(error) => {
            eprintln!("could not read {}: {error}", path.display());
            return ErrorCode::BadUsage.as_exit_code();
        }
    };

    let mut interpreter = Interpreter::new();
    match run_source(&mut interpreter, &source, options) {
        RunOutcome::Completed(code) => code.as_exit_code(),
        RunOutcome::TopLevelReturn(value) => {
            println!("{value}");
            ErrorCode::NoError.as_exit_code()
        }
    }
}
