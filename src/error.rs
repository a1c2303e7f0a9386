//! Error types and reporting for the shell.
//!
//! Every fallible step of line handling returns a `ShellError`: a kind, a
//! message, and optionally a hint and the byte offset in the line that
//! triggered it. The kind decides the line status and whether the shell
//! can keep going.

use std::fmt;
use std::io;

/// Failures of the alias table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AliasError {
    AlreadyExists,
    NotFound,
}

/// Structural problems found before any stage of a line is launched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    WrongPipeCount,
    MisplacedRedirection,
    DuplicateRedirection,
    ConflictingRedirection,
    EmptyStage,
}

/// Failures while creating, wiring or reaping processes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessError {
    ForkFailed,
    PipeCreateFailed,
    ExecFailed,
    WaitFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Syntax error during tokenization or redirection parsing
    Parse,
    Alias(AliasError),
    Pipeline(PipelineError),
    Process(ProcessError),
    /// Missing script file, missing redirection target, unwritable output
    File,
    /// Wrong arguments to a builtin
    Usage,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ErrorKind::Parse => write!(f, "Parse error"),
            ErrorKind::Alias(_) => write!(f, "Alias error"),
            ErrorKind::Pipeline(_) => write!(f, "Invalid pipeline"),
            ErrorKind::Process(_) => write!(f, "Process error"),
            ErrorKind::File => write!(f, "File error"),
            ErrorKind::Usage => write!(f, "Usage error"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ShellError {
    pub kind: ErrorKind,
    pub message: String,
    /// Hint shown after the message
    pub context: Option<String>,
    /// Byte position in the input line where the error occurred
    pub position: Option<usize>,
}

impl ShellError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        ShellError {
            kind,
            message: message.into(),
            context: None,
            position: None,
        }
    }

    pub fn with_context(mut self, context: impl Into<String>) -> Self {
        self.context = Some(context.into());
        self
    }

    pub fn with_position(mut self, pos: usize) -> Self {
        self.position = Some(pos);
        self
    }

    /// Fork and pipe-creation failures take the whole shell down.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Process(ProcessError::ForkFailed | ProcessError::PipeCreateFailed)
        )
    }

    /// Status value recorded as the line's result when this error ends it.
    pub fn status(&self) -> i32 {
        match self.kind {
            ErrorKind::Parse | ErrorKind::Usage | ErrorKind::Pipeline(_) => 2,
            ErrorKind::Process(ProcessError::ExecFailed) => 127,
            _ => 1,
        }
    }

    /// Render the error with a short excerpt of `input` and a caret under
    /// the offending byte. Falls back to the hint when there is no position.
    pub fn display_with_input(&self, input: &str) -> String {
        let mut out = self.headline();
        match self.position {
            Some(pos) if pos < input.len() && input.is_char_boundary(pos) => {
                let start = floor_boundary(input, pos.saturating_sub(15));
                let end = floor_boundary(input, (pos + 15).min(input.len()));
                let column = input[start..pos].chars().count();
                out += &format!("\n  near: '{}'", &input[start..end]);
                out += &format!("\n  {:>width$}", "^", width = column + 10);
            }
            Some(pos) => out += &format!("\n  at position {pos} (end of input)"),
            None => self.push_hint(&mut out),
        }
        out
    }

    /// One-line message plus the hint, if any.
    pub fn display_simple(&self) -> String {
        let mut out = self.headline();
        self.push_hint(&mut out);
        out
    }

    fn headline(&self) -> String {
        format!("{}: {}", self.kind, self.message)
    }

    fn push_hint(&self, out: &mut String) {
        if let Some(hint) = &self.context {
            out.push_str("\n  hint: ");
            out.push_str(hint);
        }
    }
}

fn floor_boundary(input: &str, mut idx: usize) -> usize {
    while idx > 0 && !input.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}

impl fmt::Display for ShellError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.display_simple())
    }
}

impl std::error::Error for ShellError {}

impl From<io::Error> for ShellError {
    fn from(err: io::Error) -> Self {
        ShellError::new(ErrorKind::File, err.to_string())
    }
}

pub type ShellResult<T> = Result<T, ShellError>;
