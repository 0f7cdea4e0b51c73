//! Diagnostics summary.
//!
//! The parser and the tag factories report into a [`Summary`]: a flat, ordered list of records keyed by
//! input position and integer code. The summary never formats or prints anything by itself besides its
//! `Display` implementation; rendering with source context is left to the caller.

use std::fmt;

use crate::position::InputPosition;

/// Codes below this value belong to the engine, codes from this value up to grammar tag factories.
pub const CUSTOM_CODE_START: u32 = 1000;

/// Error codes reported by the parsing engine itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum ErrorCode {
    /// No parse branch could consume a character.
    ParsingFailed = 1,
    /// Input ended while a node was still unterminated.
    IncompleteNode = 2,
    /// Input ended with more than one complete parse.
    AmbiguousSyntax = 3,
}

impl ErrorCode {
    pub fn code(self) -> u32 {
        self as u32
    }
}

impl From<ErrorCode> for u32 {
    fn from(code: ErrorCode) -> u32 {
        code.code()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Error,
    Warning,
    Info,
    Verbose,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
            Severity::Info => write!(f, "info"),
            Severity::Verbose => write!(f, "verbose"),
        }
    }
}

/// A single diagnostic entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub severity: Severity,
    pub code: Option<u32>,
    /// `None` when the record is not bound to an input location.
    pub position: Option<InputPosition>,
    pub message: String,
}

impl Record {
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }

    /// Whether this record carries the given engine error code.
    pub fn has_code(&self, code: impl Into<u32>) -> bool {
        self.code == Some(code.into())
    }
}

impl fmt::Display for Record {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(position) = self.position {
            write!(f, "{position}: ")?;
        }
        match self.severity {
            Severity::Error => write!(f, "Error")?,
            Severity::Warning => write!(f, "Warning")?,
            Severity::Info | Severity::Verbose => {}
        }
        match (self.code, self.severity) {
            (Some(code), Severity::Error) => write!(f, " E{code}: ")?,
            (Some(code), Severity::Warning) => write!(f, " W{code}: ")?,
            (Some(code), Severity::Info) => write!(f, "I{code}: ")?,
            (Some(code), Severity::Verbose) => write!(f, "V{code}: ")?,
            (None, Severity::Error | Severity::Warning) => write!(f, ": ")?,
            (None, _) => {}
        }
        write!(f, "{}", self.message)
    }
}

/// Ordered collection of diagnostics produced by one parse.
#[derive(Debug, Clone, Default)]
pub struct Summary {
    records: Vec<Record>,
    errors: usize,
    warnings: usize,
}

impl Summary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, record: Record) {
        match record.severity {
            Severity::Error => self.errors += 1,
            Severity::Warning => self.warnings += 1,
            Severity::Info | Severity::Verbose => {}
        }
        tracing::debug!(%record, "diagnostic");
        self.records.push(record);
    }

    pub fn error(&mut self, position: Option<InputPosition>, code: Option<u32>, message: impl Into<String>) {
        self.record(Severity::Error, position, code, message);
    }

    pub fn warning(&mut self, position: Option<InputPosition>, code: Option<u32>, message: impl Into<String>) {
        self.record(Severity::Warning, position, code, message);
    }

    pub fn info(&mut self, position: Option<InputPosition>, code: Option<u32>, message: impl Into<String>) {
        self.record(Severity::Info, position, code, message);
    }

    pub fn verbose(&mut self, position: Option<InputPosition>, message: impl Into<String>) {
        self.record(Severity::Verbose, position, None, message);
    }

    fn record(
        &mut self,
        severity: Severity,
        position: Option<InputPosition>,
        code: Option<u32>,
        message: impl Into<String>,
    ) {
        self.push(Record {
            severity,
            code,
            position,
            message: message.into(),
        });
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn errors(&self) -> impl Iterator<Item = &Record> {
        self.records.iter().filter(|r| r.is_error())
    }

    /// First record carrying `code`, if any.
    pub fn find(&self, code: impl Into<u32>) -> Option<&Record> {
        let code = code.into();
        self.records.iter().find(|r| r.code == Some(code))
    }

    pub fn error_count(&self) -> usize {
        self.errors
    }

    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            writeln!(f, "{record}")?;
        }
        writeln!(f, "===========================================================")?;
        write!(f, "{} errors, {} warnings", self.errors, self.warnings)
    }
}
