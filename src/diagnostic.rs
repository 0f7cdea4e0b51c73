//! Diagnostics rendering using miette.
//!
//! Converts the records of a parse [`Summary`] into miette diagnostics with:
//! - Source code context around the reported position
//! - A label pointing at the offending character
//! - Stable diagnostic codes (`thicket::incomplete_node`, `E1003`, ...)

use std::fmt;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceCode, SourceSpan};
use thicket_core::summary::{ErrorCode, Record, Severity, Summary};

/// One summary record, ready to be rendered against its source text.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct InputDiagnostic {
    pub severity: Severity,
    pub code: Option<u32>,
    pub message: String,
    pub src: NamedSource<String>,
    /// Byte span of the reported character; `None` for records without a position.
    pub span: Option<SourceSpan>,
}

impl InputDiagnostic {
    pub fn from_record(record: &Record, source_path: &str, source: &str) -> Self {
        let span = record.position.map(|position| char_span(source, position.offset));
        Self {
            severity: record.severity,
            code: record.code,
            message: record.message.clone(),
            src: NamedSource::new(source_path, source.to_string()),
            span,
        }
    }

    fn label(&self) -> &'static str {
        match self.code {
            Some(c) if c == ErrorCode::IncompleteNode.code() => "starts here",
            Some(c) if c == ErrorCode::AmbiguousSyntax.code() => "ambiguous from here",
            _ => match self.severity {
                Severity::Error => "error here",
                Severity::Warning => "warning here",
                Severity::Info | Severity::Verbose => "here",
            },
        }
    }
}

impl Diagnostic for InputDiagnostic {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        let code = self.code?;
        let name = match code {
            1 => "thicket::parsing_failed".to_string(),
            2 => "thicket::incomplete_node".to_string(),
            3 => "thicket::ambiguous_syntax".to_string(),
            other => format!("E{other}"),
        };
        Some(Box::new(name))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(match self.severity {
            Severity::Error => miette::Severity::Error,
            Severity::Warning => miette::Severity::Warning,
            Severity::Info | Severity::Verbose => miette::Severity::Advice,
        })
    }

    fn source_code(&self) -> Option<&dyn SourceCode> {
        Some(&self.src)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let span = self.span?;
        Some(Box::new(std::iter::once(LabeledSpan::new_with_span(
            Some(self.label().to_string()),
            span,
        ))))
    }
}

/// Byte span of the character at code point `offset`; empty at end of input.
fn char_span(source: &str, offset: usize) -> SourceSpan {
    match source.char_indices().nth(offset) {
        Some((start, c)) => (start, c.len_utf8()).into(),
        None => (source.len(), 0).into(),
    }
}

/// Diagnostics for every record of `summary`, in reporting order.
pub fn from_summary(summary: &Summary, source_path: &str, source: &str) -> Vec<InputDiagnostic> {
    summary
        .records()
        .iter()
        .map(|record| InputDiagnostic::from_record(record, source_path, source))
        .collect()
}
