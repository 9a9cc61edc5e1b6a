use thiserror::Error;

/// Process exit codes, one per failure category. When several errors are
/// reported during a run, the last one reported decides the exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    NoError = 0,
    BadUsage = 1,
    ScanError = 2,
    ParseError = 3,
    RuntimeError = 4,
}

impl ErrorCode {
    pub fn as_exit_code(self) -> std::process::ExitCode {
        std::process::ExitCode::from(self as u8)
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RillError {
    #[error("[line {line}] Scan error: {message}")]
    Scan { line: u32, message: String },

    #[error("[line {line}] Parse error: {message}")]
    Parse { line: u32, message: String },

    #[error("[line {line}] Runtime error: {message}")]
    Runtime { line: u32, message: String },
}

impl RillError {
    pub fn scan(line: u32, message: impl Into<String>) -> Self {
        RillError::Scan {
            line,
            message: message.into(),
        }
    }

    pub fn parse(line: u32, message: impl Into<String>) -> Self {
        RillError::Parse {
            line,
            message: message.into(),
        }
    }

    pub fn runtime(line: u32, message: impl Into<String>) -> Self {
        RillError::Runtime {
            line,
            message: message.into(),
        }
    }

    pub fn code(&self) -> ErrorCode {
        match self {
            RillError::Scan { .. } => ErrorCode::ScanError,
            RillError::Parse { .. } => ErrorCode::ParseError,
            RillError::Runtime { .. } => ErrorCode::RuntimeError,
        }
    }
}

pub type Result<T> = std::result::Result<T, RillError>;

/// Sink the scanner and parser report into. Each error goes to stderr as it
/// arrives so that scanning and parsing can keep going after reporting.
#[derive(Debug, Default)]
pub struct ErrorReporter {
    code: Option<ErrorCode>,
}

impl ErrorReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn report(&mut self, error: &RillError) {
        tracing::debug!(?error, "reported");
        eprintln!("{error}");
        self.code = Some(error.code());
    }

    pub fn had_error(&self) -> bool {
        self.code.is_some()
    }

    pub fn code(&self) -> ErrorCode {
        self.code.unwrap_or(ErrorCode::NoError)
    }

    pub fn clear(&mut self) {
        self.code = None;
    }
}
