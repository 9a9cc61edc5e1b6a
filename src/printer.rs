//! Parenthesized dump of a parsed program, one s-expression per node. Only
//! used by the `--parser-debug` flag and by parser tests.

use crate::ast::{Block, Expr, Pattern, Stmt};
use crate::value::Value;

pub fn render(program: &[Stmt]) -> String {
    let mut out = String::new();
    for statement in program {
        render_stmt(statement, &mut out);
    }
    out
}

fn render_stmt(statement: &Stmt, out: &mut String) {
    match statement {
        Stmt::Block(block) => render_block(block, out),
        Stmt::Expression(expression) => {
            out.push_str("(; ");
            if let Some(expression) = expression {
                render_expr(expression, out);
            }
            out.push_str(") ");
        }
        Stmt::If {
            condition,
            then_branch,
            else_branch,
        } => {
            out.push_str("(if ");
            render_expr(condition, out);
            render_stmt(then_branch, out);
            if let Some(else_branch) = else_branch {
                render_stmt(else_branch, out);
            }
            out.push_str(") ");
        }
        Stmt::While { condition, body } => {
            out.push_str("(while ");
            render_expr(condition, out);
            render_stmt(body, out);
            out.push_str(") ");
        }
        Stmt::Return { value, .. } => {
            out.push_str("(return ");
            if let Some(value) = value {
                render_expr(value, out);
            }
            out.push_str(") ");
        }
        Stmt::Declaration {
            target,
            initializer,
            ..
        } => {
            out.push_str("(var ");
            render_pattern(target, out);
            if let Some(initializer) = initializer {
                render_expr(initializer, out);
            }
            out.push_str(") ");
        }
    }
}

fn render_block(block: &Block, out: &mut String) {
    out.push_str("(block ");
    for statement in &block.statements {
        render_stmt(statement, out);
    }
    if let Some(tail) = &block.tail {
        render_expr(tail, out);
    }
    out.push_str(") ");
}

fn render_expr(expression: &Expr, out: &mut String) {
    match expression {
        Expr::Literal(value) => {
            if let Value::Str(_) = value {
                out.push('"');
                out.push_str(&value.to_string());
                out.push('"');
            } else {
                out.push_str(&value.to_string());
            }
            out.push(' ');
        }
        Expr::Variable(variable) => {
            out.push_str(&variable.name);
            out.push(' ');
        }
        Expr::Assign { target, value, .. } => {
            out.push_str("(assign ");
            render_pattern(target, out);
            render_expr(value, out);
            out.push_str(") ");
        }
        Expr::Binary {
            left, op, right, ..
        } => {
            out.push('(');
            out.push_str(&op.to_string());
            out.push(' ');
            render_expr(left, out);
            render_expr(right, out);
            out.push_str(") ");
        }
        Expr::Logical {
            left, op, right, ..
        } => {
            out.push('(');
            out.push_str(&op.to_string());
            out.push(' ');
            render_expr(left, out);
            render_expr(right, out);
            out.push_str(") ");
        }
        Expr::Unary { op, right, .. } => {
            out.push('(');
            out.push_str(&op.to_string());
            out.push(' ');
            render_expr(right, out);
            out.push_str(") ");
        }
        Expr::Grouping(inner) => {
            out.push_str("(group ");
            render_expr(inner, out);
            out.push_str(") ");
        }
        Expr::Tuple(elements) => {
            out.push_str("(tuple ");
            for element in elements {
                render_expr(element, out);
            }
            out.push_str(") ");
        }
        Expr::Call { callee, args, .. } => {
            out.push_str("(call ");
            render_expr(callee, out);
            for arg in args.iter() {
                render_expr(arg, out);
            }
            out.push_str(") ");
        }
        Expr::Function(function) => {
            out.push_str("(fun ");
            for param in function.params.iter() {
                render_pattern(param, out);
            }
            render_block(&function.body, out);
            out.push_str(") ");
        }
    }
}

fn render_pattern(pattern: &Pattern, out: &mut String) {
    match pattern {
        Pattern::Name(variable) => {
            out.push_str(&variable.name);
            out.push(' ');
        }
        Pattern::Tuple(patterns) => {
            out.push('(');
            for pattern in patterns {
                render_pattern(pattern, out);
            }
            out.push_str(") ");
        }
    }
}
