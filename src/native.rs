use std::io::BufRead;
use std::rc::Rc;

use crate::ast::Inputs;
use crate::env::Env;
use crate::error::Result;
use crate::interpreter::Interpreter;
use crate::value::Value;

/// Signature of a built-in function: the interpreter (for the output sink
/// and the start-time clock), the evaluated arguments, and the call line.
pub type NativeFn = fn(&mut Interpreter, Inputs<Value>, u32) -> Result<Value>;

#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub call: NativeFn,
}

static CLOCK: Builtin = Builtin {
    name: "clock",
    call: clock,
};

static READ: Builtin = Builtin {
    name: "read",
    call: read,
};

static PRINT: Builtin = Builtin {
    name: "print",
    call: print,
};

/// Populate the global frame with the built-in functions. Runs once at
/// interpreter construction; the bindings survive for the whole session.
pub fn install(globals: &Env) {
    let span = tracing::span!(tracing::Level::DEBUG, "install_builtins");
    let _enter = span.enter();

    let mut frame = globals.borrow_mut();
    frame.define(CLOCK.name, Value::Builtin(&CLOCK));
    frame.define(READ.name, Value::Builtin(&READ));
    frame.define(PRINT.name, Value::Builtin(&PRINT));
}

/// Milliseconds since the interpreter started.
fn clock(interpreter: &mut Interpreter, _args: Inputs<Value>, _line: u32) -> Result<Value> {
    Ok(Value::Number(interpreter.uptime_millis()))
}

/// With no argument, one line from standard input. With a string argument,
/// the entire contents of that file (empty when unreadable). Any other
/// argument yields nil.
fn read(_interpreter: &mut Interpreter, args: Inputs<Value>, _line: u32) -> Result<Value> {
    match args.get(0) {
        None => {
            let mut line = String::new();
            let _ = std::io::stdin().lock().read_line(&mut line);
            while line.ends_with('\n') || line.ends_with('\r') {
                line.pop();
            }
            Ok(Value::Str(Rc::new(line)))
        }
        Some(Value::Str(path)) => {
            let text = std::fs::read_to_string(path.as_str()).unwrap_or_default();
            Ok(Value::Str(Rc::new(text)))
        }
        Some(_) => Ok(Value::Nil),
    }
}

/// One line of output: the argument's display form, or a bare newline when
/// called with no argument.
fn print(interpreter: &mut Interpreter, args: Inputs<Value>, _line: u32) -> Result<Value> {
    match args.get(0) {
        None => interpreter.write_line(""),
        Some(value) => interpreter.write_line(&value.to_string()),
    }
    Ok(Value::Nil)
}
