use std::io::Write;
use std::rc::Rc;
use std::time::Instant;

use crate::ast::{BinaryOp, Block, Expr, Inputs, LogicalOp, Pattern, Stmt, UnaryOp, Variable};
use crate::env::{Env, Environment};
use crate::error::{Result, RillError};
use crate::native;
use crate::resolver::Locations;
use crate::value::{Closure, Value};

/// How a statement finished: fell through, or an early `return` is
/// unwinding. The unwind is caught exactly at the user-function call
/// boundary (or by the driver, for a top-level return).
enum Flow {
    Normal,
    Return(Value),
}

pub struct Interpreter {
    globals: Env,
    locations: Locations,
    started: Instant,
    output: Box<dyn Write>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_output(Box::new(std::io::stdout()))
    }

    /// Build an interpreter writing to the given sink instead of stdout.
    pub fn with_output(output: Box<dyn Write>) -> Self {
        let globals = Environment::global();
        native::install(&globals);
        Interpreter {
            globals,
            locations: Locations::new(),
            started: Instant::now(),
            output,
        }
    }

    /// The resolver appends here before each run; entries persist across
    /// interactive inputs.
    pub fn locations_mut(&mut self) -> &mut Locations {
        &mut self.locations
    }

    pub fn globals(&self) -> &Env {
        &self.globals
    }

    pub fn uptime_millis(&self) -> f64 {
        self.started.elapsed().as_millis() as f64
    }

    pub fn write_line(&mut self, text: &str) {
        let _ = writeln!(self.output, "{text}");
        let _ = self.output.flush();
    }

    /// Run a resolved program against the globals. `Ok(Some(value))` means a
    /// top-level `return` unwound out of the program.
    pub fn interpret(&mut self, program: &[Stmt]) -> Result<Option<Value>> {
        let span = tracing::span!(tracing::Level::TRACE, "interpret");
        let _enter = span.enter();

        let globals = Rc::clone(&self.globals);
        for statement in program {
            if let Flow::Return(value) = self.exec_stmt(statement, &globals)? {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }

    fn exec_stmt(&mut self, statement: &Stmt, env: &Env) -> Result<Flow> {
        match statement {
            Stmt::Block(block) => {
                let child = Environment::with_enclosing(env);
                if let Flow::Return(value) = self.exec_block_statements(block, &child)? {
                    return Ok(Flow::Return(value));
                }
                if let Some(tail) = &block.tail {
                    self.eval(tail, &child)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::Expression(expression) => {
                if let Some(expression) = expression {
                    self.eval(expression, env)?;
                }
                Ok(Flow::Normal)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.eval(condition, env)?.is_truthy() {
                    self.exec_stmt(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.exec_stmt(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body } => {
                while self.eval(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.exec_stmt(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expression) => self.eval(expression, env)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Declaration {
                target,
                line,
                initializer,
            } => {
                match initializer {
                    None => define_nil(target, env),
                    Some(initializer) => {
                        let value = self.eval(initializer, env)?;
                        let mut set = |variable: &Variable, value: Value| -> Result<()> {
                            env.borrow_mut().define(variable.name.clone(), value);
                            Ok(())
                        };
                        bind_pattern(target, value, *line, &mut set)?;
                    }
                }
                Ok(Flow::Normal)
            }
        }
    }

    /// Run a block's statement list in `env`, leaving any tail expression to
    /// the caller (a function body yields it, a block statement discards it).
    fn exec_block_statements(&mut self, block: &Block, env: &Env) -> Result<Flow> {
        for statement in &block.statements {
            if let Flow::Return(value) = self.exec_stmt(statement, env)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn eval(&mut self, expression: &Expr, env: &Env) -> Result<Value> {
        match expression {
            Expr::Literal(value) => Ok(value.clone()),
            Expr::Variable(variable) => self.read_variable(variable, env),
            Expr::Grouping(inner) => self.eval(inner, env),
            Expr::Tuple(elements) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval(element, env)?);
                }
                Ok(Value::Tuple(Rc::new(values)))
            }
            Expr::Unary { op, line, right } => {
                let right = self.eval(right, env)?;
                match op {
                    UnaryOp::Negate => match right {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(RillError::runtime(*line, "bad operand type")),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!right.is_truthy())),
                }
            }
            Expr::Binary {
                left,
                op,
                line,
                right,
            } => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                binary_op(*op, *line, left, right)
            }
            Expr::Logical {
                left, op, right, ..
            } => {
                let left = self.eval(left, env)?;
                match op {
                    // The short-circuit branch collapses to a boolean; the
                    // other branch passes the right value through as is.
                    LogicalOp::Or if left.is_truthy() => Ok(Value::Bool(true)),
                    LogicalOp::And if !left.is_truthy() => Ok(Value::Bool(false)),
                    _ => self.eval(right, env),
                }
            }
            Expr::Assign {
                target,
                line,
                value,
            } => {
                let value = self.eval(value, env)?;
                let result = value.clone();
                let locations = &self.locations;
                let globals = &self.globals;
                let mut set = |variable: &Variable, value: Value| -> Result<()> {
                    match locations.get(&variable.id) {
                        Some(&depth) => Environment::assign_at(
                            env,
                            depth,
                            &variable.name,
                            value,
                            variable.line,
                        ),
                        None => Environment::assign_global(
                            globals,
                            &variable.name,
                            value,
                            variable.line,
                        ),
                    }
                };
                bind_pattern(target, value, *line, &mut set)?;
                Ok(result)
            }
            Expr::Function(function) => Ok(Value::Function(Rc::new(Closure {
                params: function.params.clone(),
                body: Rc::clone(&function.body),
                env: Rc::clone(env),
            }))),
            Expr::Call { callee, line, args } => {
                let callee = self.eval(callee, env)?;

                let args = match args {
                    Inputs::None => Inputs::None,
                    Inputs::One(first) => Inputs::One(self.eval(first, env)?),
                    Inputs::Two(first, second) => {
                        let first = self.eval(first, env)?;
                        let second = self.eval(second, env)?;
                        Inputs::Two(first, second)
                    }
                };

                match callee {
                    Value::Function(closure) => self.call_function(&closure, args, *line),
                    Value::Builtin(builtin) => (builtin.call)(self, args, *line),
                    _ => Err(RillError::runtime(*line, "can only call functions")),
                }
            }
        }
    }

    fn read_variable(&mut self, variable: &Variable, env: &Env) -> Result<Value> {
        match self.locations.get(&variable.id) {
            Some(&depth) => Environment::get_at(env, depth, &variable.name, variable.line),
            None => Environment::get_global(&self.globals, &variable.name, variable.line),
        }
    }

    fn call_function(
        &mut self,
        closure: &Rc<Closure>,
        args: Inputs<Value>,
        line: u32,
    ) -> Result<Value> {
        if args.len() > closure.params.len() {
            return Err(RillError::runtime(
                line,
                format!(
                    "function expects {} inputs, but receieved {}",
                    closure.params.len(),
                    args.len()
                ),
            ));
        }

        // The call frame itself is the lexical frame of the parameters; the
        // body runs directly in it with no extra block frame.
        let env = Environment::with_enclosing(&closure.env);

        for (index, param) in closure.params.iter().enumerate() {
            match args.get(index) {
                Some(value) => {
                    let mut set = |variable: &Variable, value: Value| -> Result<()> {
                        env.borrow_mut().define(variable.name.clone(), value);
                        Ok(())
                    };
                    bind_pattern(param, value.clone(), line, &mut set)?;
                }
                None => define_nil(param, &env),
            }
        }

        match self.exec_block_statements(&closure.body, &env)? {
            Flow::Return(value) => Ok(value),
            Flow::Normal => match &closure.body.tail {
                Some(tail) => self.eval(tail, &env),
                None => Ok(Value::Nil),
            },
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Interpreter::new()
    }
}

fn binary_op(op: BinaryOp, line: u32, left: Value, right: Value) -> Result<Value> {
    let number = |value: &Value| -> Result<f64> {
        match value {
            Value::Number(n) => Ok(*n),
            _ => Err(RillError::runtime(line, "bad operand type")),
        }
    };

    match op {
        BinaryOp::Subtract => Ok(Value::Number(number(&left)? - number(&right)?)),
        BinaryOp::Multiply => Ok(Value::Number(number(&left)? * number(&right)?)),
        BinaryOp::Divide => Ok(Value::Number(number(&left)? / number(&right)?)),
        BinaryOp::Add => match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::Str(a), Value::Str(b)) => Ok(Value::string(format!("{a}{b}"))),
            _ => Err(RillError::runtime(line, "bad operand type")),
        },
        BinaryOp::Greater => Ok(Value::Bool(number(&left)? > number(&right)?)),
        BinaryOp::GreaterEqual => Ok(Value::Bool(number(&left)? >= number(&right)?)),
        BinaryOp::Less => Ok(Value::Bool(number(&left)? < number(&right)?)),
        BinaryOp::LessEqual => Ok(Value::Bool(number(&left)? <= number(&right)?)),
        BinaryOp::Equal => Ok(Value::Bool(left == right)),
        BinaryOp::NotEqual => Ok(Value::Bool(left != right)),
    }
}

/// Destructure `value` against `pattern`, applying `set` at each leaf. The
/// same routine backs declarations (`define`), assignments (`assign`), and
/// parameter binding at function entry.
fn bind_pattern(
    pattern: &Pattern,
    value: Value,
    line: u32,
    set: &mut dyn FnMut(&Variable, Value) -> Result<()>,
) -> Result<()> {
    match pattern {
        Pattern::Name(variable) => set(variable, value),
        Pattern::Tuple(patterns) => {
            let elements = match value {
                Value::Tuple(elements) => elements,
                _ => return Err(RillError::runtime(line, "can only decompose tuples")),
            };
            if elements.len() > patterns.len() {
                return Err(RillError::runtime(line, "too many arguments to bind"));
            }
            for (index, pattern) in patterns.iter().enumerate() {
                let element = elements.get(index).cloned().unwrap_or(Value::Nil);
                bind_pattern(pattern, element, line, set)?;
            }
            Ok(())
        }
    }
}

/// Bind every leaf name of `pattern` to nil in `env`. Used for declarations
/// without an initializer and for unsupplied parameters.
fn define_nil(pattern: &Pattern, env: &Env) {
    pattern.for_each_variable(&mut |variable| {
        env.borrow_mut().define(variable.name.clone(), Value::Nil);
    });
}
