use std::fmt::Display;

use logos::{Lexer as LogosLexer, Logos, Skip};

use crate::error::{ErrorReporter, RillError};

/// Bump the line counter for every newline outside of a string literal.
fn newline_callback(lex: &mut LogosLexer<TokenKind>) -> Skip {
    lex.extras += 1;
    Skip
}

/// Strings may span lines; count the newlines so later tokens keep accurate
/// line numbers, then strip the surrounding quotes.
fn string_callback(lex: &mut LogosLexer<TokenKind>) -> String {
    let slice = lex.slice();
    lex.extras += slice.bytes().filter(|&b| b == b'\n').count() as u32;
    slice[1..slice.len() - 1].to_string()
}

fn unterminated_string_callback(lex: &mut LogosLexer<TokenKind>) {
    let slice = lex.slice();
    lex.extras += slice.bytes().filter(|&b| b == b'\n').count() as u32;
}

fn number_callback(lex: &mut LogosLexer<TokenKind>) -> Option<f64> {
    lex.slice().parse().ok()
}

fn identifier_callback(lex: &mut LogosLexer<TokenKind>) -> String {
    lex.slice().to_string()
}

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(extras = u32)]
#[logos(skip r"[ \t\r]+")]
#[logos(skip r"//[^\n]*")]
pub enum TokenKind {
    #[regex(r"\n", newline_callback)]
    Newline,

    // Single character tokens
    #[token("(")]
    LeftParen,
    #[token(")")]
    RightParen,
    #[token("{")]
    LeftBrace,
    #[token("}")]
    RightBrace,
    #[token(",")]
    Comma,
    #[token(".")]
    Dot,
    #[token("-")]
    Minus,
    #[token("+")]
    Plus,
    #[token(";")]
    Semicolon,
    #[token("/")]
    Slash,
    #[token("*")]
    Star,

    // One or two character tokens
    #[token("!")]
    Bang,
    #[token("!=")]
    BangEqual,
    #[token("=")]
    Equal,
    #[token("==")]
    EqualEqual,
    #[token(">")]
    Greater,
    #[token(">=")]
    GreaterEqual,
    #[token("<")]
    Less,
    #[token("<=")]
    LessEqual,
    #[token("->")]
    Send,

    // Literals and identifiers
    #[regex("[A-Za-z][A-Za-z0-9]*", identifier_callback)]
    Identifier(String),
    #[regex(r#""[^"]*""#, string_callback)]
    Str(String),
    #[regex(r"[0-9]+(\.[0-9]+)?", number_callback)]
    Number(f64),

    // A quote that never closes before the end of input.
    #[regex(r#""[^"]*"#, unterminated_string_callback)]
    UnterminatedStr,

    // Keywords
    #[token("and")]
    And,
    #[token("class")]
    Class,
    #[token("else")]
    Else,
    #[token("false")]
    False,
    #[token("fun")]
    Fun,
    #[token("for")]
    For,
    #[token("if")]
    If,
    #[token("nil")]
    Nil,
    #[token("or")]
    Or,
    #[token("return")]
    Return,
    #[token("super")]
    Super,
    #[token("this")]
    This,
    #[token("true")]
    True,
    #[token("var")]
    Var,
    #[token("while")]
    While,
    #[token("import")]
    Import,
    #[token("as")]
    As,

    // Appended by the scanner once the input is exhausted. The NUL pattern
    // keeps the variant out of ordinary source text; a literal NUL byte is
    // reported as a stray character like any other.
    #[token("\u{0}")]
    Eof,
}

impl TokenKind {
    /// The source text this kind stands for, as far as it can be
    /// reconstructed from the kind alone.
    pub fn lexeme(&self) -> String {
        match self {
            TokenKind::Newline => "\n".into(),
            TokenKind::LeftParen => "(".into(),
            TokenKind::RightParen => ")".into(),
            TokenKind::LeftBrace => "{".into(),
            TokenKind::RightBrace => "}".into(),
            TokenKind::Comma => ",".into(),
            TokenKind::Dot => ".".into(),
            TokenKind::Minus => "-".into(),
            TokenKind::Plus => "+".into(),
            TokenKind::Semicolon => ";".into(),
            TokenKind::Slash => "/".into(),
            TokenKind::Star => "*".into(),
            TokenKind::Bang => "!".into(),
            TokenKind::BangEqual => "!=".into(),
            TokenKind::Equal => "=".into(),
            TokenKind::EqualEqual => "==".into(),
            TokenKind::Greater => ">".into(),
            TokenKind::GreaterEqual => ">=".into(),
            TokenKind::Less => "<".into(),
            TokenKind::LessEqual => "<=".into(),
            TokenKind::Send => "->".into(),
            TokenKind::Identifier(name) => name.clone(),
            TokenKind::Str(text) => format!("\"{text}\""),
            TokenKind::Number(n) => format!("{n}"),
            TokenKind::UnterminatedStr => "\"".into(),
            TokenKind::And => "and".into(),
            TokenKind::Class => "class".into(),
            TokenKind::Else => "else".into(),
            TokenKind::False => "false".into(),
            TokenKind::Fun => "fun".into(),
            TokenKind::For => "for".into(),
            TokenKind::If => "if".into(),
            TokenKind::Nil => "nil".into(),
            TokenKind::Or => "or".into(),
            TokenKind::Return => "return".into(),
            TokenKind::Super => "super".into(),
            TokenKind::This => "this".into(),
            TokenKind::True => "true".into(),
            TokenKind::Var => "var".into(),
            TokenKind::While => "while".into(),
            TokenKind::Import => "import".into(),
            TokenKind::As => "as".into(),
            TokenKind::Eof => "".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: u32,
}

impl Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            TokenKind::Eof => write!(f, "eof"),
            TokenKind::Identifier(name) => {
                write!(f, "identifier {} (line {})", name, self.line)
            }
            TokenKind::Str(text) => write!(f, "string \"{}\" (line {})", text, self.line),
            TokenKind::Number(n) => write!(f, "number {} (line {})", n, self.line),
            kind => write!(f, "{} (line {})", kind.lexeme(), self.line),
        }
    }
}

/// Tokenize `source`, reporting per-token errors to the sink and resuming
/// after each one. The returned sequence always ends with a single `Eof`.
pub fn scan(source: &str, reporter: &mut ErrorReporter) -> Vec<Token> {
    let span = tracing::span!(tracing::Level::TRACE, "scan");
    let _enter = span.enter();

    let mut lexer = TokenKind::lexer_with_extras(source, 1);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        match result {
            Ok(TokenKind::UnterminatedStr) => {
                reporter.report(&RillError::scan(lexer.extras, "unterminated string"));
            }
            Ok(TokenKind::Eof) => {
                // A literal NUL byte in the source.
                reporter.report(&RillError::scan(lexer.extras, "unexpected character"));
            }
            Ok(kind) => tokens.push(Token {
                kind,
                line: lexer.extras,
            }),
            Err(()) => {
                reporter.report(&RillError::scan(lexer.extras, "unexpected character"));
            }
        }
    }

    tokens.push(Token {
        kind: TokenKind::Eof,
        line: lexer.extras,
    });

    tracing::debug!(count = tokens.len(), "tokens collected");
    tokens
}
