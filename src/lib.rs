pub mod ast;
pub mod env;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod native;
pub mod parser;
pub mod printer;
pub mod repl;
pub mod resolver;
pub mod value;

pub use error::{ErrorCode, ErrorReporter, Result, RillError};
pub use interpreter::Interpreter;
pub use value::Value;

/// Which intermediate representations to dump while running.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugOptions {
    /// Dump the token stream before parsing.
    pub tokens: bool,
    /// Dump the parsed tree before evaluation.
    pub ast: bool,
}

/// How one source ran to completion.
#[derive(Debug)]
pub enum RunOutcome {
    /// The run finished; the code reflects the last error reported, if any.
    Completed(ErrorCode),
    /// A top-level `return` unwound out of the program with this value.
    TopLevelReturn(Value),
}

/// Drive one source through the whole pipeline against a persistent
/// interpreter. Scan and parse errors are reported as they occur and skip
/// evaluation; a runtime error stops the run and is reported here.
pub fn run_source(
    interpreter: &mut Interpreter,
    source: &str,
    options: DebugOptions,
) -> RunOutcome {
    let mut reporter = ErrorReporter::new();

    let tokens = lexer::scan(source, &mut reporter);
    if options.tokens {
        for token in &tokens {
            println!("{token}");
        }
    }

    let program = parser::parse(tokens, &mut reporter);
    if reporter.had_error() {
        return RunOutcome::Completed(reporter.code());
    }

    if options.ast {
        println!("{}", printer::render(&program));
    }

    resolver::resolve(&program, interpreter.locations_mut());

    match interpreter.interpret(&program) {
        Ok(Some(value)) => RunOutcome::TopLevelReturn(value),
        Ok(None) => RunOutcome::Completed(reporter.code()),
        Err(error) => {
            reporter.report(&error);
            RunOutcome::Completed(reporter.code())
        }
    }
}
