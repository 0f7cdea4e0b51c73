//! The incremental parser.
//!
//! [`Parser`] reads one code point at a time from a [`CharSource`], advances the parse forest, and
//! commits the match history into the syntax tree whenever a single branch survives. Syntax problems in
//! the input are reported into the [`Summary`]; only a failing character source is a Rust error.

mod commit;
mod forest;
mod pool;

use std::collections::BTreeMap;

use commit::Assembler;
use forest::Forest;
use pool::{NodePool, ParseRef};

use crate::ast::Ast;
use crate::config::ParserConfig;
use crate::error::SourceError;
use crate::grammar::{CompiledGrammar, GrammarNodeKind, NodeId};
use crate::position::{InputPosition, PositionTracker};
use crate::source::CharSource;
use crate::summary::{ErrorCode, Summary};

/// Result of a parse: the (possibly partial) syntax tree and every diagnostic reported.
#[derive(Debug)]
pub struct ParseOutcome {
    pub ast: Ast,
    pub summary: Summary,
}

impl ParseOutcome {
    pub fn is_ok(&self) -> bool {
        !self.summary.has_errors()
    }
}

pub struct Parser<'g, S> {
    grammar: &'g CompiledGrammar,
    root: NodeId,
    source: S,
    config: ParserConfig,
}

impl<'g, S: CharSource> Parser<'g, S> {
    pub fn new(grammar: &'g CompiledGrammar, root: NodeId, source: S) -> Self {
        Self {
            grammar,
            root,
            source,
            config: ParserConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ParserConfig) -> Self {
        self.config = config;
        self
    }

    /// Parse the whole source with a fresh diagnostics summary.
    ///
    /// ## Errors
    /// Only failures of the character source. Syntax errors end up in [`ParseOutcome::summary`].
    pub fn parse(self) -> Result<ParseOutcome, SourceError> {
        self.parse_with(Summary::new())
    }

    /// Parse the whole source, appending diagnostics to `summary`.
    #[tracing::instrument(skip_all, fields(root = %self.grammar.describe(self.root)))]
    pub fn parse_with(mut self, mut summary: Summary) -> Result<ParseOutcome, SourceError> {
        let mut run = Run {
            grammar: self.grammar,
            root: self.root,
            config: &self.config,
            forest: Forest::new(self.grammar, self.root),
            assembler: Assembler::new(self.grammar),
            engine_errors: 0,
        };
        let mut tracker = PositionTracker::new();
        let mut failing = false;
        let mut stopped = false;

        while let Some(c) = self.source.next_char()? {
            let position = tracker.current();
            tracker.advance(c);
            let survivors = run.forest.step(c, position);
            tracing::trace!(%position, ?c, survivors, live = run.forest.pool.live(), "step");

            if survivors == 0 {
                run.forest.reject_step();
                if !failing {
                    run.report(&mut summary, position, ErrorCode::ParsingFailed, format!("unexpected character {c:?}"));
                }
                failing = true;
                if !run.config.recover || run.engine_errors >= run.config.max_errors {
                    stopped = true;
                    break;
                }
                tracing::debug!(%position, "dropped character, recovering");
                continue;
            }

            failing = false;
            run.forest.accept_step();
            if survivors == 1 && run.config.eager_commit {
                let last = run.forest.terminals()[0];
                run.assembler.commit_sequence(&mut run.forest.pool, last, &mut summary);
            }
        }

        if !stopped {
            run.finish(tracker.current(), &mut summary);
        }
        run.forest.clear();
        tracing::debug!(
            errors = summary.error_count(),
            pool_slots = run.forest.pool.capacity(),
            "parse finished"
        );
        Ok(ParseOutcome {
            ast: run.assembler.into_ast(),
            summary,
        })
    }
}

/// State of one parse run.
struct Run<'g, 'c> {
    grammar: &'g CompiledGrammar,
    root: NodeId,
    config: &'c ParserConfig,
    forest: Forest<'g>,
    assembler: Assembler<'g>,
    engine_errors: usize,
}

impl Run<'_, '_> {
    fn report(&mut self, summary: &mut Summary, position: InputPosition, code: ErrorCode, message: String) {
        self.engine_errors += 1;
        summary.error(Some(position), Some(code.code()), message);
    }

    /// Resolve the end of input: commit the single complete parse, or report why there is none.
    fn finish(&mut self, eof: InputPosition, summary: &mut Summary) {
        let accepted = self.forest.finish(eof).to_vec();
        match accepted.as_slice() {
            [single] => {
                if let Some(last) = *single {
                    self.assembler.commit_sequence(&mut self.forest.pool, last, summary);
                }
                self.assembler.finish(eof, summary);
            }
            [] => self.report_incomplete(eof, summary),
            [first, ..] => {
                let position = first
                    .map(|last| first_uncommitted(&self.forest.pool, last))
                    .unwrap_or(eof);
                let message = format!("ambiguous syntax, {} complete parses", accepted.len());
                self.report(summary, position, ErrorCode::AmbiguousSyntax, message);
            }
        }
    }

    fn report_incomplete(&mut self, eof: InputPosition, summary: &mut Summary) {
        let candidates = self.incomplete_candidates();
        let (position, message) = match candidates.as_slice() {
            [] => (eof, format!("incomplete node `{}`", self.grammar.describe(self.root))),
            [(position, name)] => (*position, format!("incomplete node `{name}`")),
            [(position, _), ..] => {
                let listing: Vec<String> = candidates.iter().map(|(p, name)| format!("`{name}` ({p})")).collect();
                (*position, format!("incomplete node, one of: {}", listing.join(", ")))
            }
        };
        self.report(summary, position, ErrorCode::IncompleteNode, message);
    }

    /// For every live branch, the nearest named node around the first unfinished node, deduplicated
    /// and ordered by position then name.
    fn incomplete_candidates(&self) -> Vec<(InputPosition, String)> {
        let mut found: BTreeMap<(usize, String, NodeId), InputPosition> = BTreeMap::new();
        for &terminal in self.forest.terminals() {
            if let Some(r) = self.unfinished_named(terminal) {
                let node = self.forest.pool.get(r);
                let key = (node.start.offset, self.grammar.describe(node.grammar), node.grammar);
                found.entry(key).or_insert(node.start);
            }
        }
        if found.is_empty() && !self.forest.is_started() {
            return Vec::new();
        }
        found.into_iter().map(|((_, name, _), position)| (position, name)).collect()
    }

    /// Walk up from `terminal` to the first node that cannot complete without more input, then on to
    /// the nearest named node; the topmost frame when nothing on the way is named.
    fn unfinished_named(&self, terminal: ParseRef) -> Option<ParseRef> {
        let pool = &self.forest.pool;
        let mut current = terminal;
        let mut unfinished = false;
        loop {
            let node = pool.get(current);
            let grammar_node = &self.grammar[node.grammar];
            unfinished |= node.count + 1 < grammar_node.quantity.min;
            if unfinished && grammar_node.name.is_some() {
                return Some(current);
            }
            let Some(parent) = node.parent else {
                return Some(current);
            };
            if let GrammarNodeKind::Sequence(children) = &self.grammar[pool.get(parent).grammar].kind {
                let rest = &children[node.slot as usize + 1..];
                unfinished |= !rest.iter().all(|&c| self.grammar.is_nullable(c));
            }
            current = parent;
        }
    }
}

/// Position of the oldest character of the chain ending in `last` that was not committed yet.
fn first_uncommitted(pool: &NodePool, last: ParseRef) -> InputPosition {
    let mut position = pool.get(last).start;
    let mut current = Some(last);
    while let Some(r) = current {
        let node = pool.get(r);
        if node.committed {
            break;
        }
        position = node.start;
        current = node.prev;
    }
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{tag_factory, Grammar, Modifiers, Node};
    use crate::source::StrSource;
    use crate::summary::Severity;

    fn words() -> CompiledGrammar {
        let mut g = Grammar::new();
        g.node("word").def(Node::range('a', 'z').one_or_many()).val_text();
        g.node("space").def(Node::char(' ').one_or_many());
        g.node("line")
            .sequence([
                Node::reference("word"),
                Node::sequence([Node::reference("space"), Node::reference("word")]).none_or_many(),
            ])
            .val();
        g.compile().unwrap()
    }

    fn parse(grammar: &CompiledGrammar, root: &str, input: &str, config: ParserConfig) -> ParseOutcome {
        Parser::new(grammar, grammar.root(root).unwrap(), StrSource::new(input))
            .with_config(config)
            .parse()
            .unwrap()
    }

    #[test]
    fn test_tree_and_positions() {
        let grammar = words();
        let outcome = parse(&grammar, "line", "ab  cd", ParserConfig::new());
        assert!(outcome.is_ok(), "{}", outcome.summary);
        let ast = &outcome.ast;
        assert_eq!(ast.dump(), "line\n  word \"ab\"\n  word \"cd\"\n");

        let line = ast.root().unwrap();
        let second = ast[line].children()[1];
        assert_eq!(ast[second].start(), InputPosition::new(1, 5, 4));
        assert_eq!(ast[second].end(), Some(InputPosition::new(1, 7, 6)));
        assert_eq!(ast[ast[line].children()[0]].end(), Some(InputPosition::new(1, 3, 2)));
    }

    #[test]
    fn test_eager_and_deferred_commit_agree() {
        let grammar = words();
        let eager = parse(&grammar, "line", "one two three", ParserConfig::new());
        let deferred = parse(&grammar, "line", "one two three", ParserConfig::new().with_eager_commit(false));
        assert_eq!(eager.ast.dump(), deferred.ast.dump());
    }

    #[test]
    fn test_parsing_failed_stops() {
        let grammar = words();
        let outcome = parse(&grammar, "line", "ab 1 cd", ParserConfig::new());
        let errors: Vec<_> = outcome.summary.errors().collect();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].has_code(ErrorCode::ParsingFailed));
        assert_eq!(errors[0].position, Some(InputPosition::new(1, 4, 3)));
        // the committed part stays available, unfinished
        let word = outcome.ast[outcome.ast.root().unwrap()].children()[0];
        assert_eq!(outcome.ast[word].text(), Some("ab"));
    }

    #[test]
    fn test_recovery_drops_failing_characters() {
        let grammar = words();
        let outcome = parse(&grammar, "line", "ab 12 cd", ParserConfig::new().with_recover(true));
        // one error for the whole run of failing characters
        assert_eq!(outcome.summary.error_count(), 1);
        assert_eq!(outcome.ast.dump(), "line\n  word \"ab\"\n  word \"cd\"\n");
    }

    #[test]
    fn test_recovery_respects_max_errors() {
        let grammar = words();
        let config = ParserConfig::new().with_recover(true).with_max_errors(2);
        let outcome = parse(&grammar, "line", "a 1 b 2 c 3 d", config);
        assert_eq!(outcome.summary.error_count(), 2);
    }

    #[test]
    fn test_incomplete_reports_unfinished_node() {
        let mut g = Grammar::new();
        g.node("pair").sequence([Node::char('('), Node::range('a', 'z').one_or_many(), Node::char(')')]);
        g.node("list").def(Node::reference("pair").one_or_many());
        let grammar = g.compile().unwrap();

        let outcome = parse(&grammar, "list", "(ab)(cd", ParserConfig::new());
        let record = outcome.summary.find(ErrorCode::IncompleteNode).unwrap();
        assert_eq!(record.message, "incomplete node `pair`");
        assert_eq!(record.position, Some(InputPosition::new(1, 5, 4)));
    }

    #[test]
    fn test_incomplete_without_inner_names_reports_the_rule() {
        let mut g = Grammar::new();
        g.node("pair").sequence([Node::char('('), Node::char(')')]);
        let grammar = g.compile().unwrap();

        let outcome = parse(&grammar, "pair", "(", ParserConfig::new());
        let record = outcome.summary.find(ErrorCode::IncompleteNode).unwrap();
        assert_eq!(record.message, "incomplete node `pair`");
        assert_eq!(record.position, Some(InputPosition::START));
    }

    #[test]
    fn test_incomplete_lists_all_candidates() {
        let mut g = Grammar::new();
        g.node("ab").sequence([Node::char('x'), Node::char('a')]);
        g.node("cd").sequence([Node::char('x'), Node::char('c')]);
        g.node("root").any([Node::reference("cd"), Node::reference("ab")]);
        let grammar = g.compile().unwrap();

        let outcome = parse(&grammar, "root", "x", ParserConfig::new());
        let record = outcome.summary.find(ErrorCode::IncompleteNode).unwrap();
        assert_eq!(record.message, "incomplete node, one of: `ab` (1:1), `cd` (1:1)");
        assert_eq!(record.position, Some(InputPosition::START));
    }

    #[test]
    fn test_ambiguous_syntax() {
        let mut g = Grammar::new();
        g.node("root").any([Node::string("ab"), Node::sequence([Node::char('a'), Node::one_of("bc")])]);
        let grammar = g.compile().unwrap();

        let outcome = parse(&grammar, "root", "ab", ParserConfig::new());
        let record = outcome.summary.find(ErrorCode::AmbiguousSyntax).unwrap();
        assert_eq!(record.position, Some(InputPosition::START));
        assert_eq!(outcome.summary.error_count(), 1);
        assert!(parse(&grammar, "root", "ac", ParserConfig::new()).is_ok());
    }

    #[test]
    fn test_tag_factory_runs_once_node_is_complete() {
        let mut g = Grammar::new();
        let length = tag_factory(|cx, summary| {
            let text = cx.take_text()?;
            if text.len() > 3 {
                summary.warning(Some(cx.start()), Some(1000), "long word");
            }
            Some(Box::new(text.len()))
        });
        g.node("word").def(Node::range('a', 'z').one_or_many()).val_with(length, true);
        g.node("words")
            .sequence([Node::reference("word"), Node::sequence([Node::char(','), Node::reference("word")]).none_or_many()])
            .val();
        let grammar = g.compile().unwrap();

        let outcome = parse(&grammar, "words", "ab,cdef,g", ParserConfig::new());
        let ast = &outcome.ast;
        let lengths: Vec<usize> = ast
            .children(ast.root().unwrap())
            .map(|w| *w.tag::<usize>().unwrap())
            .collect();
        assert_eq!(lengths, vec![2, 4, 1]);
        assert_eq!(outcome.summary.warning_count(), 1);
        assert_eq!(outcome.summary.records()[0].severity, Severity::Warning);
        assert_eq!(outcome.summary.records()[0].position, Some(InputPosition::new(1, 4, 3)));
    }
}
