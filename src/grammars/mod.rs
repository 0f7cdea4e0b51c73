//! Grammars bundled with the `thicket` binary.
//!
//! - `statements` - `name = "string";` / `name = 123;` assignments with comments
//! - `arithmetic` - `name = expression;` assignments evaluated in order
//!
//! Both are built with the `thicket_core` builder DSL and tag their syntax tree with typed values, so the
//! CLI can print what a file binds without walking the tree itself.

pub mod arithmetic;
pub mod statements;

use std::fmt;

use clap::ValueEnum;
use thicket_core::{CompiledGrammar, GrammarError};

/// Application error codes reported by the bundled grammars' tag factories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum GrammarCode {
    /// Unknown escape sequence in a string literal.
    InvalidEscape = 1000,
    /// Number literal out of the `i64` range.
    NumberOverflow = 1001,
    /// The same identifier is bound twice in one file.
    DuplicateIdentifier = 1002,
    /// Expression refers to an identifier that is not bound (yet).
    UnknownVariable = 1003,
    /// Expression value out of the `i64` range.
    ArithmeticOverflow = 1004,
}

impl From<GrammarCode> for u32 {
    fn from(code: GrammarCode) -> u32 {
        code as u32
    }
}

/// Selects one of the bundled grammars on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum GrammarKind {
    #[default]
    Statements,
    Arithmetic,
}

impl GrammarKind {
    pub fn compile(self) -> Result<CompiledGrammar, Vec<GrammarError>> {
        match self {
            GrammarKind::Statements => statements::grammar(),
            GrammarKind::Arithmetic => arithmetic::grammar(),
        }
    }

    /// Name of the entry rule.
    pub fn root(self) -> &'static str {
        match self {
            GrammarKind::Statements => statements::ROOT,
            GrammarKind::Arithmetic => arithmetic::ROOT,
        }
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarKind::Statements => write!(f, "statements"),
            GrammarKind::Arithmetic => write!(f, "arithmetic"),
        }
    }
}
