use colored::Colorize;
use reedline::{DefaultPrompt, DefaultPromptSegment, Reedline, Signal};

use crate::interpreter::Interpreter;
use crate::{run_source, DebugOptions, RunOutcome};

/// Interactive prompt. The interpreter persists across inputs, so bindings
/// made on one line are visible on the next; error state does not carry
/// over between lines.
pub struct Repl {
    interpreter: Interpreter,
    options: DebugOptions,
}

impl Repl {
    pub fn new(options: DebugOptions) -> Self {
        Repl {
            interpreter: Interpreter::new(),
            options,
        }
    }

    pub fn run(&mut self) -> anyhow::Result<()> {
        let mut editor = Reedline::create();
        let prompt = DefaultPrompt::new(
            DefaultPromptSegment::Basic("rill".to_string()),
            DefaultPromptSegment::Empty,
        );

        println!("{}", "Rill interactive interpreter".bright_blue());
        println!("{}", "Press Ctrl-D to exit.".bright_yellow());

        loop {
            let line = match editor.read_line(&prompt) {
                Ok(Signal::Success(line)) => line,
                Ok(Signal::CtrlC) | Ok(Signal::CtrlD) => break,
                Err(error) => {
                    println!("Input error: {error}");
                    continue;
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            match run_source(&mut self.interpreter, &line, self.options) {
                // A top-level return ends the session with its value.
                RunOutcome::TopLevelReturn(value) => {
                    println!("{value}");
                    return Ok(());
                }
                RunOutcome::Completed(_) => {}
            }
        }

        println!("Goodbye!");
        Ok(())
    }
}
