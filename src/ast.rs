use std::fmt::Display;
use std::rc::Rc;
use std::sync::atomic::{AtomicU32, Ordering};

use crate::value::Value;

/// Identity of a variable reference node. Keys the resolver's depth map, so
/// it must stay unique for the lifetime of the process (the map is appended
/// to across interactive inputs, never rebuilt).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn new() -> Self {
        static COUNTER: AtomicU32 = AtomicU32::new(0);
        NodeId(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for NodeId {
    fn default() -> Self {
        NodeId::new()
    }
}

#[derive(Debug, Clone)]
pub struct Variable {
    pub name: String,
    pub line: u32,
    pub id: NodeId,
}

impl Variable {
    pub fn new(name: impl Into<String>, line: u32) -> Self {
        Variable {
            name: name.into(),
            line,
            id: NodeId::new(),
        }
    }
}

/// Binding target of a declaration, an assignment, or a parameter slot.
/// Never evaluated as a value.
#[derive(Debug, Clone)]
pub enum Pattern {
    Name(Variable),
    Tuple(Vec<Pattern>),
}

impl Pattern {
    /// Visit every leaf variable, depth first, left to right.
    pub fn for_each_variable<F: FnMut(&Variable)>(&self, f: &mut F) {
        match self {
            Pattern::Name(variable) => f(variable),
            Pattern::Tuple(patterns) => {
                for pattern in patterns {
                    pattern.for_each_variable(f);
                }
            }
        }
    }
}

/// Inline slots for call arguments and parameter patterns. Functions take at
/// most two positional operands, so two slots always suffice and the common
/// case stays off the heap.
#[derive(Debug, Clone)]
pub enum Inputs<T> {
    None,
    One(T),
    Two(T, T),
}

impl<T> Inputs<T> {
    pub fn len(&self) -> usize {
        match self {
            Inputs::None => 0,
            Inputs::One(_) => 1,
            Inputs::Two(_, _) => 2,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Inputs::None)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        match (self, index) {
            (Inputs::One(first), 0) => Some(first),
            (Inputs::Two(first, _), 0) => Some(first),
            (Inputs::Two(_, second), 1) => Some(second),
            _ => None,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        let (first, second) = match self {
            Inputs::None => (None, None),
            Inputs::One(first) => (Some(first), None),
            Inputs::Two(first, second) => (Some(first), Some(second)),
        };
        first.into_iter().chain(second)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Greater,
    GreaterEqual,
    Less,
    LessEqual,
    Equal,
    NotEqual,
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinaryOp::Add => "+",
            BinaryOp::Subtract => "-",
            BinaryOp::Multiply => "*",
            BinaryOp::Divide => "/",
            BinaryOp::Greater => ">",
            BinaryOp::GreaterEqual => ">=",
            BinaryOp::Less => "<",
            BinaryOp::LessEqual => "<=",
            BinaryOp::Equal => "==",
            BinaryOp::NotEqual => "!=",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

impl Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOp::And => write!(f, "and"),
            LogicalOp::Or => write!(f, "or"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Negate => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Function expressions are shared: the body lives behind an `Rc` so a
/// closure value can carry the same block the tree holds. That shared
/// pointer is also the function's identity for equality.
#[derive(Debug, Clone)]
pub struct FunctionExpr {
    pub params: Inputs<Rc<Pattern>>,
    pub body: Rc<Block>,
}

#[derive(Debug, Clone)]
pub enum Expr {
    Literal(Value),
    Variable(Variable),
    Assign {
        target: Pattern,
        line: u32,
        value: Box<Expr>,
    },
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        line: u32,
        right: Box<Expr>,
    },
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        line: u32,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        line: u32,
        right: Box<Expr>,
    },
    Grouping(Box<Expr>),
    Tuple(Vec<Expr>),
    Call {
        callee: Box<Expr>,
        line: u32,
        args: Inputs<Box<Expr>>,
    },
    Function(FunctionExpr),
}

/// A brace-delimited statement list. The final expression of a block may
/// omit its semicolon; it is kept aside as `tail` and becomes the block's
/// value when the block is a function body.
#[derive(Debug, Clone)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub tail: Option<Expr>,
}

#[derive(Debug, Clone)]
pub enum Stmt {
    Block(Block),
    Expression(Option<Expr>),
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
    },
    While {
        condition: Expr,
        body: Box<Stmt>,
    },
    Return {
        line: u32,
        value: Option<Expr>,
    },
    Declaration {
        target: Pattern,
        line: u32,
        initializer: Option<Expr>,
    },
}
