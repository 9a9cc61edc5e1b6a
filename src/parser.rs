use std::rc::Rc;

use crate::ast::{
    BinaryOp, Block, Expr, FunctionExpr, Inputs, LogicalOp, Pattern, Stmt, UnaryOp, Variable,
};
use crate::error::{ErrorReporter, Result, RillError};
use crate::lexer::{Token, TokenKind};
use crate::value::Value;

/// Parse a token stream into statements. Each parse error is reported to the
/// sink, the parser synchronizes to the next statement boundary, and parsing
/// continues, so one bad statement does not hide the rest.
pub fn parse(tokens: Vec<Token>, reporter: &mut ErrorReporter) -> Vec<Stmt> {
    let span = tracing::span!(tracing::Level::TRACE, "parse");
    let _enter = span.enter();

    let mut parser = Parser::new(tokens);
    let mut statements = Vec::new();

    while !parser.is_at_end() {
        match parser.declaration() {
            Ok(statement) => statements.push(statement),
            Err(error) => {
                reporter.report(&error);
                parser.synchronize();
            }
        }
    }

    statements
}

struct Parser {
    tokens: Vec<Token>,
    current: usize,
    saved: usize,
}

impl Parser {
    /// `tokens` must be scanner output: non-empty and `Eof`-terminated.
    fn new(tokens: Vec<Token>) -> Self {
        Parser {
            tokens,
            current: 0,
            saved: 0,
        }
    }

    // Token plumbing ------------------------------------------------------

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> &Token {
        if self.is_at_end() {
            self.peek()
        } else {
            &self.tokens[self.current + 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current == self.tokens.len() - 1
    }

    fn advance(&mut self) -> Token {
        let token = self.tokens[self.current].clone();
        if !self.is_at_end() {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn check_any(&self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|kind| &self.peek().kind == kind)
    }

    fn check_identifier(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Identifier(_))
    }

    fn match_advance(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> Result<Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(message))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> Result<(String, u32)> {
        if let TokenKind::Identifier(name) = &self.peek().kind {
            let name = name.clone();
            let line = self.peek().line;
            self.advance();
            Ok((name, line))
        } else {
            Err(self.error_here(message))
        }
    }

    fn error_here(&self, message: &str) -> RillError {
        RillError::parse(self.peek().line, message)
    }

    fn save_position(&mut self) {
        self.saved = self.current;
    }

    fn rewind(&mut self) {
        self.current = self.saved;
    }

    /// Skip to the next statement boundary after a parse error: past the
    /// next `;`, or up to (not past) a keyword that begins a statement.
    fn synchronize(&mut self) {
        loop {
            if self.check(TokenKind::Semicolon) {
                self.advance();
                return;
            }
            if self.is_at_end() {
                return;
            }
            self.current += 1;
            if self.check_any(&[
                TokenKind::Class,
                TokenKind::Fun,
                TokenKind::Var,
                TokenKind::For,
                TokenKind::If,
                TokenKind::While,
                TokenKind::Return,
            ]) {
                return;
            }
        }
    }

    // Declarations and statements -----------------------------------------

    fn declaration(&mut self) -> Result<Stmt> {
        if self.match_advance(TokenKind::Var) {
            return self.var_declaration();
        }
        // `fun` followed by a name declares; anonymous functions in
        // statement position go through the expression grammar.
        if self.check(TokenKind::Fun) && matches!(self.peek_next().kind, TokenKind::Identifier(_))
        {
            return self.function_declaration();
        }
        self.statement()
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let target = self.pattern()?;

        let initializer = if self.match_advance(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        let token = self.expect(TokenKind::Semicolon, "expect ';' after variable declaration")?;

        Ok(Stmt::Declaration {
            target,
            line: token.line,
            initializer,
        })
    }

    /// `fun NAME pattern.. { .. }` is sugar for a variable declaration whose
    /// initializer is the function expression. No trailing semicolon.
    fn function_declaration(&mut self) -> Result<Stmt> {
        self.advance(); // fun
        let (name, line) = self.expect_identifier("expect function name after 'fun'")?;
        let function = self.function_body()?;

        Ok(Stmt::Declaration {
            target: Pattern::Name(Variable::new(name, line)),
            line,
            initializer: Some(Expr::Function(function)),
        })
    }

    /// Parameters are read greedily until the body's `{`; at most two slots.
    fn function_body(&mut self) -> Result<FunctionExpr> {
        let params = if !self.check(TokenKind::LeftBrace) {
            let first = Rc::new(self.pattern()?);
            if !self.check(TokenKind::LeftBrace) {
                let second = Rc::new(self.pattern()?);
                Inputs::Two(first, second)
            } else {
                Inputs::One(first)
            }
        } else {
            Inputs::None
        };

        let body = self.block()?;

        Ok(FunctionExpr {
            params,
            body: Rc::new(body),
        })
    }

    fn statement(&mut self) -> Result<Stmt> {
        if self.match_advance(TokenKind::For) {
            return self.for_statement();
        }
        if self.match_advance(TokenKind::If) {
            return self.if_statement();
        }
        if self.check(TokenKind::Return) {
            return self.return_statement();
        }
        if self.match_advance(TokenKind::While) {
            return self.while_statement();
        }
        if self.check(TokenKind::LeftBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        if self.at_print_statement() {
            return self.print_statement();
        }
        self.expression_statement()
    }

    /// `print expr? ;` is statement-position shorthand for calling the
    /// global `print`. The builtin stays an ordinary value everywhere else,
    /// so `5 -> print` and `print(x)` keep working.
    fn at_print_statement(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Identifier(name) if name == "print" => !matches!(
                self.peek_next().kind,
                TokenKind::Equal | TokenKind::Send | TokenKind::RightBrace
            ),
            _ => false,
        }
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let token = self.advance();
        let line = token.line;
        let callee = Box::new(Expr::Variable(Variable::new("print", line)));

        if self.match_advance(TokenKind::Semicolon) {
            return Ok(Stmt::Expression(Some(Expr::Call {
                callee,
                line,
                args: Inputs::None,
            })));
        }

        let value = self.expression()?;
        self.expect(TokenKind::Semicolon, "expect ';' after expression")?;
        Ok(Stmt::Expression(Some(Expr::Call {
            callee,
            line,
            args: Inputs::One(Box::new(value)),
        })))
    }

    fn block(&mut self) -> Result<Block> {
        self.expect(TokenKind::LeftBrace, "expect '{' to start block")?;

        let mut statements = Vec::new();
        let mut tail = None;

        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if self.starts_statement() {
                statements.push(self.declaration()?);
            } else if self.match_advance(TokenKind::Semicolon) {
                statements.push(Stmt::Expression(None));
            } else {
                let expression = self.expression()?;
                if self.match_advance(TokenKind::Semicolon) {
                    statements.push(Stmt::Expression(Some(expression)));
                } else {
                    // Final expression without ';': the block's value.
                    tail = Some(expression);
                    break;
                }
            }
        }

        self.expect(TokenKind::RightBrace, "expect '}' after block")?;

        Ok(Block { statements, tail })
    }

    fn starts_statement(&self) -> bool {
        match &self.peek().kind {
            TokenKind::Var
            | TokenKind::For
            | TokenKind::If
            | TokenKind::While
            | TokenKind::Return
            | TokenKind::LeftBrace => true,
            TokenKind::Fun => matches!(self.peek_next().kind, TokenKind::Identifier(_)),
            TokenKind::Identifier(_) => self.at_print_statement(),
            _ => false,
        }
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::LeftParen, "expect '(' after 'if'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "expect ')' after if condition")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_advance(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::LeftParen, "expect '(' after 'while'")?;
        let condition = self.expression()?;
        self.expect(TokenKind::RightParen, "expect ')' after condition")?;

        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// `for` is rewritten during parsing into a block holding the
    /// initializer and a while loop; a missing condition becomes `true`.
    fn for_statement(&mut self) -> Result<Stmt> {
        self.expect(TokenKind::LeftParen, "expect '(' after 'for'")?;

        let initializer = if self.match_advance(TokenKind::Var) {
            self.var_declaration()?
        } else {
            self.expression_statement()?
        };

        let condition = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(TokenKind::Semicolon, "expect ';' after loop condition")?;

        let increment = if !self.check(TokenKind::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.expect(TokenKind::RightParen, "expect ')' after for clauses")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block(Block {
                statements: vec![body, Stmt::Expression(Some(increment))],
                tail: None,
            });
        }

        let condition = condition.unwrap_or(Expr::Literal(Value::Bool(true)));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };

        Ok(Stmt::Block(Block {
            statements: vec![initializer, body],
            tail: None,
        }))
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let keyword = self.advance();

        let value = if !self.check(TokenKind::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.expect(TokenKind::Semicolon, "expect ';' after return value")?;
        Ok(Stmt::Return {
            line: keyword.line,
            value,
        })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        if self.match_advance(TokenKind::Semicolon) {
            return Ok(Stmt::Expression(None));
        }

        let expression = self.expression()?;
        self.expect(TokenKind::Semicolon, "expect ';' after expression")?;
        Ok(Stmt::Expression(Some(expression)))
    }

    // Expressions ----------------------------------------------------------

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    /// Assignment is disambiguated by rewinding: parse a full expression
    /// first, and if `=` follows, return to the saved position and re-parse
    /// the left side as a binding pattern.
    fn assignment(&mut self) -> Result<Expr> {
        self.save_position();

        let expression = self.send_call()?;

        if self.check(TokenKind::Equal) {
            self.rewind();

            let target = self.pattern()?;
            let equals = self.expect(TokenKind::Equal, "error parsing assignment")?;
            let value = self.assignment()?;

            return Ok(Expr::Assign {
                target,
                line: equals.line,
                value: Box::new(value),
            });
        }

        Ok(expression)
    }

    fn send_call(&mut self) -> Result<Expr> {
        let mut expression = self.tuple()?;

        while self.check(TokenKind::Send) {
            let token = self.advance();
            let callee = self.unary_call()?;
            expression = self.finish_call_with_receiver(callee, token.line, expression)?;
        }

        Ok(expression)
    }

    fn tuple(&mut self) -> Result<Expr> {
        let leading_comma = self.match_advance(TokenKind::Comma);

        let expression = self.or()?;

        if self.match_advance(TokenKind::Comma) {
            let mut elements = vec![expression];
            loop {
                elements.push(self.or()?);
                if !self.match_advance(TokenKind::Comma) {
                    break;
                }
            }
            return Ok(Expr::Tuple(elements));
        }

        // A lone leading comma still forces a one-element tuple.
        if leading_comma {
            return Ok(Expr::Tuple(vec![expression]));
        }

        Ok(expression)
    }

    fn or(&mut self) -> Result<Expr> {
        let mut expression = self.and()?;

        while self.check(TokenKind::Or) {
            let token = self.advance();
            let right = self.and()?;
            expression = Expr::Logical {
                left: Box::new(expression),
                op: LogicalOp::Or,
                line: token.line,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn and(&mut self) -> Result<Expr> {
        let mut expression = self.equality()?;

        while self.check(TokenKind::And) {
            let token = self.advance();
            let right = self.equality()?;
            expression = Expr::Logical {
                left: Box::new(expression),
                op: LogicalOp::And,
                line: token.line,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut expression = self.comparison()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::BangEqual => BinaryOp::NotEqual,
                TokenKind::EqualEqual => BinaryOp::Equal,
                _ => break,
            };
            let token = self.advance();
            let right = self.comparison()?;
            expression = Expr::Binary {
                left: Box::new(expression),
                op,
                line: token.line,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut expression = self.term()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Greater => BinaryOp::Greater,
                TokenKind::GreaterEqual => BinaryOp::GreaterEqual,
                TokenKind::Less => BinaryOp::Less,
                TokenKind::LessEqual => BinaryOp::LessEqual,
                _ => break,
            };
            let token = self.advance();
            let right = self.term()?;
            expression = Expr::Binary {
                left: Box::new(expression),
                op,
                line: token.line,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut expression = self.factor()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Minus => BinaryOp::Subtract,
                TokenKind::Plus => BinaryOp::Add,
                _ => break,
            };
            let token = self.advance();
            let right = self.factor()?;
            expression = Expr::Binary {
                left: Box::new(expression),
                op,
                line: token.line,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut expression = self.unary()?;

        loop {
            let op = match self.peek().kind {
                TokenKind::Slash => BinaryOp::Divide,
                TokenKind::Star => BinaryOp::Multiply,
                _ => break,
            };
            let token = self.advance();
            let right = self.unary()?;
            expression = Expr::Binary {
                left: Box::new(expression),
                op,
                line: token.line,
                right: Box::new(right),
            };
        }

        Ok(expression)
    }

    fn unary(&mut self) -> Result<Expr> {
        let op = match self.peek().kind {
            TokenKind::Bang => Some(UnaryOp::Not),
            TokenKind::Minus => Some(UnaryOp::Negate),
            _ => None,
        };

        if let Some(op) = op {
            let token = self.advance();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                op,
                line: token.line,
                right: Box::new(right),
            });
        }

        self.n_ary_call()
    }

    /// Dot calls with a receiver, and plain postfix calls, left to right:
    /// `e.f` passes `e` as the sole argument, `e.f(a)` adds a second, `f()`
    /// and `f(a)` call with zero or one.
    fn n_ary_call(&mut self) -> Result<Expr> {
        let mut expression = self.unary_call()?;

        loop {
            if self.check(TokenKind::Dot) {
                let token = self.advance();
                let callee = self.unary_call()?;
                expression = self.finish_call_with_receiver(callee, token.line, expression)?;
            } else if self.check(TokenKind::LeftParen) {
                let token = self.advance();
                expression = self.finish_paren_call(expression, token.line)?;
            } else {
                break;
            }
        }

        Ok(expression)
    }

    /// Shared tail of the receiver-first call forms (`.` and `->`): an
    /// immediately following `( … )` is the second argument, parsed as a
    /// single primary.
    fn finish_call_with_receiver(
        &mut self,
        callee: Expr,
        line: u32,
        receiver: Expr,
    ) -> Result<Expr> {
        if self.check(TokenKind::LeftParen) {
            let second = self.primary()?;
            Ok(Expr::Call {
                callee: Box::new(callee),
                line,
                args: Inputs::Two(Box::new(receiver), Box::new(second)),
            })
        } else {
            Ok(Expr::Call {
                callee: Box::new(callee),
                line,
                args: Inputs::One(Box::new(receiver)),
            })
        }
    }

    fn finish_paren_call(&mut self, callee: Expr, line: u32) -> Result<Expr> {
        if self.match_advance(TokenKind::RightParen) {
            return Ok(Expr::Call {
                callee: Box::new(callee),
                line,
                args: Inputs::None,
            });
        }

        let argument = self.expression()?;
        self.expect(TokenKind::RightParen, "expect ')' after argument")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            line,
            args: Inputs::One(Box::new(argument)),
        })
    }

    /// Prefix dot: `.f` is a call of `f` with no arguments.
    fn unary_call(&mut self) -> Result<Expr> {
        if self.check(TokenKind::Dot) {
            let token = self.advance();
            let callee = self.unary_call()?;
            return Ok(Expr::Call {
                callee: Box::new(callee),
                line: token.line,
                args: Inputs::None,
            });
        }

        self.primary()
    }

    fn primary(&mut self) -> Result<Expr> {
        if self.check(TokenKind::Fun) {
            self.advance();
            return Ok(Expr::Function(self.function_body()?));
        }
        if self.match_advance(TokenKind::False) {
            return Ok(Expr::Literal(Value::Bool(false)));
        }
        if self.match_advance(TokenKind::True) {
            return Ok(Expr::Literal(Value::Bool(true)));
        }
        if self.match_advance(TokenKind::Nil) {
            return Ok(Expr::Literal(Value::Nil));
        }

        match &self.peek().kind {
            TokenKind::Number(n) => {
                let n = *n;
                self.advance();
                return Ok(Expr::Literal(Value::Number(n)));
            }
            TokenKind::Str(s) => {
                let s = s.clone();
                self.advance();
                return Ok(Expr::Literal(Value::string(s)));
            }
            TokenKind::Identifier(name) => {
                let name = name.clone();
                let line = self.peek().line;
                self.advance();
                return Ok(Expr::Variable(Variable::new(name, line)));
            }
            _ => {}
        }

        if self.match_advance(TokenKind::LeftParen) {
            let expression = self.expression()?;
            if !self.match_advance(TokenKind::RightParen) {
                return Err(self.error_here("expected ')' after expression"));
            }
            return Ok(Expr::Grouping(Box::new(expression)));
        }

        Err(self.error_here("expect expression"))
    }

    // Binding patterns -----------------------------------------------------

    /// A binding pattern: a bare name, or a comma list (possibly with
    /// parenthesized sub-patterns) which forces a tuple. A leading comma
    /// also forces a tuple, even with a single element.
    fn pattern(&mut self) -> Result<Pattern> {
        let leading_comma = self.match_advance(TokenKind::Comma);

        let first = self.pattern_element()?;

        if self.match_advance(TokenKind::Comma) {
            let mut patterns = vec![first];
            loop {
                patterns.push(self.pattern_element()?);
                if !self.match_advance(TokenKind::Comma) {
                    break;
                }
            }
            return Ok(Pattern::Tuple(patterns));
        }

        if leading_comma {
            return Ok(Pattern::Tuple(vec![first]));
        }

        Ok(first)
    }

    fn pattern_element(&mut self) -> Result<Pattern> {
        if self.match_advance(TokenKind::LeftParen) {
            let inner = self.pattern()?;
            self.expect(TokenKind::RightParen, "expect ')'")?;
            return Ok(inner);
        }

        if self.check_identifier() {
            let (name, line) = self.expect_identifier("expected identifier(s)")?;
            return Ok(Pattern::Name(Variable::new(name, line)));
        }

        Err(self.error_here("expected identifier(s)"))
    }
}
