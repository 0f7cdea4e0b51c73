#![forbid(unsafe_code)]
//! thicket command-line driver
//!
//! Bundles two demo grammars built on [`thicket_core`], renders parse diagnostics with miette and dumps
//! syntax trees as outlines or JSON.
//!
//! ## Panic Policy
//!
//! This codebase follows explicit error handling:
//!
//! - **Production code**: Use `Result` or `Option` with `?` / `ok_or` / `map_err`. The `cli` module enforces
//!   `#![deny(clippy::unwrap_used)]`.
//!
//! - **Test code**: `.unwrap()` and `.expect()` are acceptable in tests.
//!
//! - **True invariants**: If a panic represents an engine bug (logic error), use `.expect("INVARIANT: reason")`
//!   with a clear explanation.

pub mod cli;
pub mod diagnostic;
pub mod grammars;
pub mod json;

pub use grammars::GrammarKind;
