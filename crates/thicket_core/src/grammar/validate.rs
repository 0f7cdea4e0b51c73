//! Static soundness check of recursive rules.
//!
//! For every named node the graph is searched for paths leading back to it. Each path state tracks
//! whether no character is necessarily consumed yet (`zero`) and whether some node on the path may repeat
//! more than once (`multiple`). Nodes carrying a precedence are not entered: the engine resolves the
//! recursion through them at parse time.

use std::collections::HashSet;

use super::compile::{CompiledGrammar, GrammarNodeKind, NodeId};
use crate::error::GrammarError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct PathState {
    node: NodeId,
    zero: bool,
    multiple: bool,
}

/// Reject cycles that can return to their entry without consuming a character, and cycles whose
/// repetition multiplier exceeds one.
///
/// ## Errors
/// The first unsound recursion, in rule definition order. A rule that is instantly recursive is reported
/// as such even if it is also exponentially recursive.
pub(super) fn validate_recursion(grammar: &CompiledGrammar) -> Result<(), GrammarError> {
    for (name, entry) in grammar.named() {
        if grammar[entry].precedence.is_some() {
            continue;
        }
        match check_entry(grammar, entry) {
            Verdict::Sound => {}
            Verdict::Instant => return Err(GrammarError::InstantRecursion { rule: name.to_string() }),
            Verdict::Exponential => return Err(GrammarError::ExponentialRecursion { rule: name.to_string() }),
        }
    }
    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Verdict {
    Sound,
    Instant,
    Exponential,
}

fn check_entry(grammar: &CompiledGrammar, entry: NodeId) -> Verdict {
    let mut seen = HashSet::new();
    let mut work = vec![PathState {
        node: entry,
        zero: true,
        multiple: grammar[entry].quantity.max > 1,
    }];
    let mut exponential = false;

    while let Some(state) = work.pop() {
        let node = &grammar[state.node];
        let (children, is_sequence) = match &node.kind {
            GrammarNodeKind::Char(_) => continue,
            GrammarNodeKind::Sequence(children) => (children, true),
            GrammarNodeKind::Alternative(children) => (children, false),
        };

        let mut zero = state.zero;
        for &child in children.iter() {
            let multiple = state.multiple || grammar[child].quantity.max > 1;
            if child == entry {
                if zero {
                    return Verdict::Instant;
                }
                exponential |= multiple;
            } else if grammar[child].precedence.is_none() {
                let next = PathState { node: child, zero, multiple };
                if seen.insert(next) {
                    work.push(next);
                }
            }
            // later siblings of a sequence start after this child consumed its minimum
            if is_sequence && !grammar.is_nullable(child) {
                zero = false;
            }
        }
    }

    if exponential { Verdict::Exponential } else { Verdict::Sound }
}

#[cfg(test)]
mod tests {
    use crate::error::GrammarError;
    use crate::grammar::{Grammar, Modifiers, Node};

    fn compile_err(g: Grammar) -> GrammarError {
        let mut errors = g.compile().expect_err("grammar should be rejected");
        assert_eq!(errors.len(), 1);
        errors.remove(0)
    }

    #[test]
    fn test_direct_left_recursion_is_instant() {
        let mut g = Grammar::new();
        g.node("expr").any([Node::char('x'), Node::sequence([Node::reference("expr"), Node::char('+')])]);
        assert_eq!(compile_err(g), GrammarError::InstantRecursion { rule: "expr".into() });
    }

    #[test]
    fn test_recursion_behind_nullable_prefix_is_instant() {
        let mut g = Grammar::new();
        g.node("ws").def(Node::char(' ').none_or_many());
        g.node("gap").any([
            Node::reference("ws"),
            Node::sequence([Node::reference("ws"), Node::reference("gap"), Node::char(';')]),
        ]);
        assert_eq!(compile_err(g), GrammarError::InstantRecursion { rule: "gap".into() });
    }

    #[test]
    fn test_guarded_recursion_is_sound() {
        let mut g = Grammar::new();
        g.node("list").sequence([Node::char('('), Node::reference("list").optional(), Node::char(')')]);
        assert!(g.compile().is_ok());
    }

    #[test]
    fn test_unbounded_recursion_is_exponential() {
        let mut g = Grammar::new();
        g.node("list").sequence([Node::char('('), Node::reference("list").none_or_many(), Node::char(')')]);
        assert_eq!(compile_err(g), GrammarError::ExponentialRecursion { rule: "list".into() });
    }

    #[test]
    fn test_precedence_breaks_the_cycle() {
        let mut g = Grammar::new();
        g.node("list")
            .sequence([Node::char('('), Node::reference("list").none_or_many(), Node::char(')')])
            .precedence("list", 1);
        assert!(g.compile().is_ok());
    }

    #[test]
    fn test_left_recursive_operators_with_precedence() {
        let mut g = Grammar::new();
        g.node("expr").any([
            Node::range('0', '9'),
            Node::sequence([Node::reference("expr"), Node::char('+'), Node::reference("expr")]).precedence("op", 1),
            Node::sequence([Node::reference("expr"), Node::char('*'), Node::reference("expr")]).precedence("op", 2),
        ]);
        assert!(g.compile().is_ok());
    }

    #[test]
    fn test_repeated_non_recursive_rules_are_fine() {
        let mut g = Grammar::new();
        g.node("digit").def(Node::range('0', '9'));
        g.node("number").def(Node::reference("digit").one_or_many());
        g.node("numbers").sequence([Node::reference("number"), Node::sequence([Node::char(','), Node::reference("number")]).none_or_many()]);
        assert!(g.compile().is_ok());
    }
}
