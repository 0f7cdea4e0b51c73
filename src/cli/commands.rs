//! CLI command implementations
//!
//! All command functions return `CliResult<ExitCode>` instead of calling
//! `process::exit`. Error handling and exits happen in the top-level `run()`.

use std::fs;
use std::path::Path;

use thicket_core::{CompiledGrammar, ParseOutcome, Parser, ParserConfig, StrSource};

use super::{CliError, CliResult, ExitCode, ParseArgs};
use crate::diagnostic;
use crate::grammars::{GrammarKind, arithmetic, statements};
use crate::json;

/// Maximum source file size (100 MB)
///
/// The whole file is kept in memory to render diagnostics with source context.
const MAX_SOURCE_SIZE: u64 = 100 * 1024 * 1024;

/// Read source file contents.
///
/// ## Errors
///
/// Returns an error if:
/// - The file cannot be read (I/O error)
/// - The file exceeds `MAX_SOURCE_SIZE` (100 MB)
pub fn read_source(path: &Path) -> CliResult<String> {
    let metadata = fs::metadata(path)
        .map_err(|e| CliError::failure(format!("Cannot access file '{}': {}", path.display(), e)))?;

    if metadata.len() > MAX_SOURCE_SIZE {
        return Err(CliError::failure(format!(
            "Source file '{}' is too large ({} bytes, max {} bytes)",
            path.display(),
            metadata.len(),
            MAX_SOURCE_SIZE
        )));
    }

    fs::read_to_string(path).map_err(|e| CliError::failure(format!("Error reading file '{}': {}", path.display(), e)))
}

/// Compile a bundled grammar, rendering definition errors through miette.
pub fn compile_grammar(kind: GrammarKind) -> CliResult<CompiledGrammar> {
    kind.compile().map_err(|errors| {
        let rendered: Vec<String> = errors
            .into_iter()
            .map(|err| format!("{:?}", miette::Report::new(err)))
            .collect();
        CliError::failure(format!("Grammar `{kind}` is invalid:\n{}", rendered.join("\n")))
    })
}

impl ParseArgs {
    pub fn config(&self) -> ParserConfig {
        ParserConfig::new()
            .with_recover(self.recover)
            .with_eager_commit(!self.no_eager_commit)
            .with_max_errors(self.max_errors)
    }
}

/// A parsed input file together with its text, for rendering diagnostics.
pub struct ParsedFile {
    pub source: String,
    pub outcome: ParseOutcome,
}

/// Parse `text` with a compiled grammar.
pub fn parse_source(grammar: &CompiledGrammar, kind: GrammarKind, text: &str, config: ParserConfig) -> CliResult<ParseOutcome> {
    let root = grammar
        .root(kind.root())
        .map_err(|e| CliError::failure(format!("{:?}", miette::Report::new(e))))?;
    Parser::new(grammar, root, StrSource::new(text))
        .with_config(config)
        .parse()
        .map_err(|e| CliError::failure(format!("Error reading input: {e}")))
}

fn parse_args(args: &ParseArgs, grammar: &CompiledGrammar) -> CliResult<ParsedFile> {
    let source = read_source(&args.file)?;
    let outcome = parse_source(grammar, args.grammar, &source, args.config())?;
    tracing::info!(
        file = %args.file.display(),
        grammar = %args.grammar,
        nodes = outcome.ast.len(),
        errors = outcome.summary.error_count(),
        "parsed"
    );
    Ok(ParsedFile { source, outcome })
}

/// Print every diagnostic of a parse to stderr and derive the exit code.
fn report(args: &ParseArgs, parsed: &ParsedFile) -> ExitCode {
    let path = args.file.to_string_lossy();
    for diag in diagnostic::from_summary(&parsed.outcome.summary, &path, &parsed.source) {
        eprintln!("{:?}", miette::Report::new(diag));
    }
    if parsed.outcome.summary.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

/// `thicket parse`: print the syntax tree as an outline or as JSON.
pub fn parse_file(args: &ParseArgs, as_json: bool) -> CliResult<ExitCode> {
    let grammar = compile_grammar(args.grammar)?;
    let parsed = parse_args(args, &grammar)?;

    if as_json {
        let value = json::ast_to_json(&parsed.outcome.ast);
        let text = serde_json::to_string_pretty(&value)
            .map_err(|e| CliError::failure(format!("Error serializing tree: {e}")))?;
        println!("{text}");
    } else {
        print!("{}", parsed.outcome.ast.dump());
    }
    Ok(report(args, &parsed))
}

/// `thicket grammar`: print the rules reachable from the grammar's root.
pub fn print_grammar(kind: GrammarKind) -> CliResult<ExitCode> {
    let grammar = compile_grammar(kind)?;
    let root = grammar
        .root(kind.root())
        .map_err(|e| CliError::failure(format!("{:?}", miette::Report::new(e))))?;
    print!("{}", grammar.dump(root));
    Ok(ExitCode::SUCCESS)
}

/// Render the bindings a parsed file produced, one `name = value` per line.
pub fn bindings(kind: GrammarKind, outcome: &ParseOutcome) -> Vec<String> {
    let Some(root) = outcome.ast.root() else {
        return Vec::new();
    };
    let node = &outcome.ast[root];
    match kind {
        GrammarKind::Statements => node
            .tag::<statements::Bindings>()
            .map(|b| b.0.iter().map(|b| format!("{} = {}", b.name, b.value)).collect())
            .unwrap_or_default(),
        GrammarKind::Arithmetic => node
            .tag::<arithmetic::Evaluation>()
            .map(|e| e.values.iter().map(|(name, value)| format!("{name} = {value}")).collect())
            .unwrap_or_default(),
    }
}

/// `thicket eval`: print what the file binds.
pub fn eval_file(args: &ParseArgs) -> CliResult<ExitCode> {
    let grammar = compile_grammar(args.grammar)?;
    let parsed = parse_args(args, &grammar)?;
    for line in bindings(args.grammar, &parsed.outcome) {
        println!("{line}");
    }
    Ok(report(args, &parsed))
}
