#![forbid(unsafe_code)]
//! Grammar-driven incremental parser.
//!
//! A grammar is declared with the builder DSL in [`grammar`], compiled into a resolved node graph with
//! validated recursion, and run by [`parser::Parser`] over any [`source::CharSource`] one code point at a
//! time. The parser keeps every live interpretation of the input in a parse forest and folds the
//! unambiguous history into an [`ast::Ast`] as soon as a single branch survives.
//!
//! ## Panic Policy
//!
//! Library code returns `Result` or reports into the [`summary::Summary`]. `.expect("INVARIANT: ...")` is
//! reserved for conditions that would mean an engine bug. Tests may unwrap freely.

pub mod ast;
pub mod config;
pub mod error;
pub mod grammar;
pub mod parser;
pub mod position;
pub mod source;
pub mod summary;

pub use ast::{Ast, AstId, AstNode, Tag, TagContext};
pub use config::ParserConfig;
pub use error::{GrammarError, SourceError};
pub use grammar::{CompiledGrammar, Grammar, Node, NodeId};
pub use parser::{ParseOutcome, Parser};
pub use position::InputPosition;
pub use source::{CharSource, ReaderSource, StrSource};
pub use summary::{ErrorCode, Record, Severity, Summary, CUSTOM_CODE_START};

/// Everything needed to define a grammar and run it.
pub mod prelude {
    pub use crate::ast::{Tag, TagContext};
    pub use crate::grammar::{tag_factory, CompiledGrammar, Grammar, Modifiers, Node, NodeId, UNBOUNDED};
    pub use crate::parser::{ParseOutcome, Parser};
    pub use crate::summary::Summary;
}

/// Parse in-memory text with the default configuration.
pub fn parse_str(grammar: &CompiledGrammar, root: NodeId, text: &str) -> ParseOutcome {
    Parser::new(grammar, root, StrSource::new(text))
        .parse()
        .expect("INVARIANT: in-memory sources never fail")
}
