//! End-to-end parser scenarios through the public API.

use thicket_core::prelude::*;
use thicket_core::{ErrorCode, GrammarError, InputPosition, ParserConfig, ReaderSource, StrSource};

fn parse(grammar: &CompiledGrammar, root: &str, input: &str) -> ParseOutcome {
    let root = grammar.root(root).unwrap();
    Parser::new(grammar, root, StrSource::new(input)).parse().unwrap()
}

fn first_error(outcome: &ParseOutcome) -> (u32, InputPosition) {
    let record = outcome.summary.errors().next().expect("an error record");
    (record.code.unwrap(), record.position.unwrap())
}

// =============================================================================
// Quantities
// =============================================================================

fn three_or_five() -> CompiledGrammar {
    let mut g = Grammar::new();
    g.node("root").any([Node::char('a').quantity(3), Node::char('a').quantity(5)]);
    g.compile().unwrap()
}

#[test]
fn exact_repetition_counts() {
    let grammar = three_or_five();
    assert!(parse(&grammar, "root", "aaa").is_ok());
    assert!(parse(&grammar, "root", "aaaaa").is_ok());

    let four = parse(&grammar, "root", "aaaa");
    assert_eq!(first_error(&four), (ErrorCode::IncompleteNode.code(), InputPosition::START));
    assert_eq!(four.summary.error_count(), 1);

    let six = parse(&grammar, "root", "aaaaaa");
    assert_eq!(first_error(&six), (ErrorCode::ParsingFailed.code(), InputPosition::new(1, 6, 5)));
}

#[test]
fn empty_input_depends_on_nullability() {
    let mut g = Grammar::new();
    g.node("maybe").def(Node::char('x').none_or_many());
    g.node("some").def(Node::char('x').one_or_many());
    let grammar = g.compile().unwrap();

    assert!(parse(&grammar, "maybe", "").is_ok());

    let outcome = parse(&grammar, "some", "");
    let record = outcome.summary.find(ErrorCode::IncompleteNode).unwrap();
    assert_eq!(record.position, Some(InputPosition::START));
    assert_eq!(record.message, "incomplete node `some`");
}

#[test]
fn long_input_does_not_exhaust_the_stack() {
    let mut g = Grammar::new();
    g.node("spaces").def(Node::char(' ').one_or_many()).val_text();
    let grammar = g.compile().unwrap();

    let input = " ".repeat(1000);
    let outcome = parse(&grammar, "spaces", &input);
    assert!(outcome.is_ok(), "{}", outcome.summary);
    let root = outcome.ast.root().unwrap();
    assert_eq!(outcome.ast[root].text().map(str::len), Some(1000));
    assert_eq!(outcome.ast[root].end(), Some(InputPosition::new(1, 1001, 1000)));
}

// =============================================================================
// Grammar validation
// =============================================================================

#[test]
fn nullable_gap_recursion_is_rejected() {
    let mut g = Grammar::new();
    g.node("gap").sequence([
        Node::any([Node::char('q').none_or_many(), Node::char('w').none_or_many()]),
        Node::reference("gap").none_or_many(),
    ]);
    let errors = g.compile().unwrap_err();
    assert_eq!(errors, vec![GrammarError::InstantRecursion { rule: "gap".into() }]);
}

#[test]
fn repeated_recursion_needs_a_precedence() {
    let mut g = Grammar::new();
    g.node("list").sequence([Node::char('('), Node::reference("list").none_or_many(), Node::char(')')]);
    let errors = g.compile().unwrap_err();
    assert_eq!(errors, vec![GrammarError::ExponentialRecursion { rule: "list".into() }]);

    let mut g = Grammar::new();
    g.node("list")
        .sequence([Node::char('('), Node::reference("list").none_or_many(), Node::char(')')])
        .precedence("nesting", 1);
    let grammar = g.compile().unwrap();
    assert!(parse(&grammar, "list", "(()(()))").is_ok());
}

#[test]
fn unknown_root_is_reported() {
    let mut g = Grammar::new();
    g.node("a").def(Node::char('a'));
    let grammar = g.compile().unwrap();
    assert_eq!(grammar.root("b"), Err(GrammarError::UnresolvedReference { name: "b".into() }));
}

// =============================================================================
// Tags
// =============================================================================

fn calculator() -> CompiledGrammar {
    let number = tag_factory(|cx, _| cx.text()?.parse::<i64>().ok().map(|n| Box::new(n) as Tag));
    let sum = tag_factory(|cx, _| {
        let (a, b) = (cx.take_child_tag::<i64>(0)?, cx.take_child_tag::<i64>(1)?);
        Some(Box::new(*a + *b))
    });
    let product = tag_factory(|cx, _| {
        let (a, b) = (cx.take_child_tag::<i64>(0)?, cx.take_child_tag::<i64>(1)?);
        Some(Box::new(*a * *b))
    });

    let mut g = Grammar::new();
    g.node("number").def(Node::range('0', '9').one_or_many()).val_with(number, true);
    g.node("expr").any([
        Node::reference("number"),
        Node::sequence([Node::reference("expr"), Node::char('+'), Node::reference("expr")])
            .name("sum")
            .precedence("arith", 1)
            .val_with(sum, false),
        Node::sequence([Node::reference("expr"), Node::char('*'), Node::reference("expr")])
            .name("product")
            .precedence("arith", 2)
            .val_with(product, false),
    ]);
    g.compile().unwrap()
}

#[test]
fn precedence_shapes_the_tree() {
    let grammar = calculator();
    let cases = [("7", 7), ("2*3+4", 10), ("1+2*3", 7), ("1*2*3+4*5", 26), ("12+30", 42)];
    for (input, expected) in cases {
        let outcome = parse(&grammar, "expr", input);
        assert!(outcome.is_ok(), "{input}: {}", outcome.summary);
        let root = outcome.ast.root().unwrap();
        assert_eq!(outcome.ast[root].tag::<i64>(), Some(&expected), "{input}");
    }

    let outcome = parse(&grammar, "expr", "1+2*3");
    assert_eq!(
        outcome.ast.dump(),
        "sum\n  number \"1\"\n  product\n    number \"2\"\n    number \"3\"\n"
    );
}

#[test]
fn long_flat_sum_parses_without_recursion() {
    let grammar = calculator();
    let terms = 20_000;
    let input = format!("{}1", "1+".repeat(terms - 1));
    let outcome = parse(&grammar, "expr", &input);
    assert!(outcome.is_ok(), "{}", outcome.summary);

    let root = outcome.ast.root().unwrap();
    assert_eq!(outcome.ast[root].tag::<i64>(), Some(&20_000));
    assert_eq!(outcome.ast[root].end(), Some(InputPosition::new(1, 40_000, 39_999)));
    assert_eq!(outcome.ast.captured_text(root), "1".repeat(terms));
    // one line per number and per sum
    assert_eq!(outcome.ast.dump().lines().count(), 2 * terms - 1);
}

// =============================================================================
// Sources and configuration
// =============================================================================

#[test]
fn streamed_input_matches_in_memory_input() {
    let grammar = calculator();
    let root = grammar.root("expr").unwrap();
    let streamed = Parser::new(&grammar, root, ReaderSource::from_read("1*2*3+4*5".as_bytes()))
        .parse()
        .unwrap();
    let in_memory = parse(&grammar, "expr", "1*2*3+4*5");
    assert_eq!(streamed.ast.dump(), in_memory.ast.dump());
}

#[test]
fn deferred_commit_builds_the_same_tree() {
    let grammar = calculator();
    let root = grammar.root("expr").unwrap();
    let deferred = Parser::new(&grammar, root, StrSource::new("2*3+4"))
        .with_config(ParserConfig::new().with_eager_commit(false))
        .parse()
        .unwrap();
    let eager = parse(&grammar, "expr", "2*3+4");
    assert_eq!(deferred.ast.dump(), eager.ast.dump());
    let top = deferred.ast.root().unwrap();
    assert_eq!(deferred.ast[top].tag::<i64>(), Some(&10));
}

#[test]
fn positions_track_lines() {
    let mut g = Grammar::new();
    g.node("word").def(Node::range('a', 'z').one_or_many()).val_text();
    g.node("text").sequence([
        Node::reference("word"),
        Node::sequence([Node::one_of(" \r\n").one_or_many(), Node::reference("word")]).none_or_many(),
    ]);
    let grammar = g.compile().unwrap();

    let outcome = parse(&grammar, "text", "ab\r\ncd\nef");
    assert!(outcome.is_ok(), "{}", outcome.summary);
    let starts: Vec<InputPosition> = outcome.ast.roots().iter().map(|&id| outcome.ast[id].start()).collect();
    assert_eq!(
        starts,
        vec![InputPosition::new(1, 1, 0), InputPosition::new(2, 1, 4), InputPosition::new(3, 1, 7)]
    );
}
