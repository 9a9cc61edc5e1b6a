use std::collections::{HashMap, HashSet};

use crate::ast::{Block, Expr, NodeId, Pattern, Stmt, Variable};

/// Lexical distance from each variable reference to the frame holding its
/// binding. References with no entry fall through to the globals.
pub type Locations = HashMap<NodeId, usize>;

/// Annotate every variable reference in `program` with its binding depth.
/// Purely static: nothing is evaluated, and only lexical order of
/// declaration (not textual position) determines visibility.
pub fn resolve(program: &[Stmt], locations: &mut Locations) {
    let span = tracing::span!(tracing::Level::TRACE, "resolve");
    let _enter = span.enter();

    let mut resolver = Resolver {
        scopes: Vec::new(),
        locations,
    };
    for statement in program {
        resolver.resolve_stmt(statement);
    }
}

struct Resolver<'a> {
    scopes: Vec<HashSet<String>>,
    locations: &'a mut Locations,
}

impl Resolver<'_> {
    fn declare(&mut self, pattern: &Pattern) {
        // Top-level declarations land in the global frame at run time; only
        // nested scopes are tracked here.
        if let Some(scope) = self.scopes.last_mut() {
            pattern.for_each_variable(&mut |variable| {
                scope.insert(variable.name.clone());
            });
        }
    }

    fn resolve_variable(&mut self, variable: &Variable) {
        for (depth, scope) in self.scopes.iter().rev().enumerate() {
            if scope.contains(&variable.name) {
                self.locations.insert(variable.id, depth);
                return;
            }
        }
        // Unrecorded: the evaluator reads the global frame instead.
    }

    fn resolve_stmt(&mut self, statement: &Stmt) {
        match statement {
            Stmt::Block(block) => {
                self.scopes.push(HashSet::new());
                self.resolve_block_contents(block);
                self.scopes.pop();
            }
            Stmt::Expression(expression) => {
                if let Some(expression) = expression {
                    self.resolve_expr(expression);
                }
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body } => {
                self.resolve_expr(condition);
                self.resolve_stmt(body);
            }
            Stmt::Return { value, .. } => {
                if let Some(value) = value {
                    self.resolve_expr(value);
                }
            }
            Stmt::Declaration {
                target, initializer, ..
            } => {
                if let Some(initializer) = initializer {
                    self.resolve_expr(initializer);
                }
                self.declare(target);
            }
        }
    }

    fn resolve_block_contents(&mut self, block: &Block) {
        for statement in &block.statements {
            self.resolve_stmt(statement);
        }
        if let Some(tail) = &block.tail {
            self.resolve_expr(tail);
        }
    }

    fn resolve_expr(&mut self, expression: &Expr) {
        match expression {
            Expr::Literal(_) => {}
            Expr::Variable(variable) => self.resolve_variable(variable),
            Expr::Assign { target, value, .. } => {
                self.resolve_expr(value);
                target.for_each_variable(&mut |variable| self.resolve_variable(variable));
            }
            Expr::Binary { left, right, .. } | Expr::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            Expr::Unary { right, .. } => self.resolve_expr(right),
            Expr::Grouping(inner) => self.resolve_expr(inner),
            Expr::Tuple(elements) => {
                for element in elements {
                    self.resolve_expr(element);
                }
            }
            Expr::Call { callee, args, .. } => {
                self.resolve_expr(callee);
                for arg in args.iter() {
                    self.resolve_expr(arg);
                }
            }
            Expr::Function(function) => {
                // One scope serves both the parameters and the body; the
                // evaluator's call frame works the same way.
                self.scopes.push(HashSet::new());
                for param in function.params.iter() {
                    self.declare(param);
                }
                self.resolve_block_contents(&function.body);
                self.scopes.pop();
            }
        }
    }
}
