//! Error types.
//!
//! Two tiers exist. [`GrammarError`]s are mistakes in the grammar definition: they are fatal and returned
//! from [`Grammar::compile`](crate::grammar::Grammar::compile). Problems in the parsed *input* are not
//! errors in the Rust sense; they are reported as records in the [`Summary`](crate::summary::Summary).
//! [`SourceError`] covers failures of the character source itself.

use miette::Diagnostic;
use thiserror::Error;

/// A grammar definition error. The grammar is unusable until it is fixed.
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum GrammarError {
    #[error("node name `{name}` is defined more than once")]
    #[diagnostic(code(thicket::grammar::duplicate_name), help("every named grammar node needs a unique name"))]
    DuplicateName { name: String },

    #[error("invalid configuration of node {node}: {reason}")]
    #[diagnostic(code(thicket::grammar::invalid_node_configuration))]
    InvalidNodeConfiguration { node: String, reason: String },

    #[error("reference to undefined node `{name}`")]
    #[diagnostic(code(thicket::grammar::unresolved_reference))]
    UnresolvedReference { name: String },

    #[error("node `{rule}` can re-enter itself without consuming any character")]
    #[diagnostic(
        code(thicket::grammar::instant_recursion),
        help("match at least one character before the recursive reference, or guard it with a precedence")
    )]
    InstantRecursion { rule: String },

    #[error("recursion through `{rule}` may repeat more than once per level, parse branches would grow exponentially")]
    #[diagnostic(
        code(thicket::grammar::exponential_recursion),
        help("bound the repetition on the recursive path to at most one, or guard it with a precedence")
    )]
    ExponentialRecursion { rule: String },
}

/// Failure to read the next character from a [`CharSource`](crate::source::CharSource).
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read input: {0}")]
    Io(#[from] std::io::Error),

    #[error("input is not valid UTF-8 (line {line})")]
    InvalidUtf8 { line: usize },
}
