//! Grammar node model and builder DSL.
//!
//! A grammar is described with plain [`Node`] values: character matchers, sequences, alternatives and
//! by-name references, refined with chainable modifiers from [`Modifiers`]. Named rules are registered on a
//! [`Grammar`], which [`compile`](Grammar::compile)s them into an immutable, possibly cyclic
//! [`CompiledGrammar`] graph.
//!
//! ## Examples
//! ```rust,no_run
//! use thicket_core::prelude::*;
//!
//! let mut g = Grammar::new();
//! g.node("digit").def(Node::range('0', '9'));
//! g.node("number").def(Node::reference("digit").one_or_many()).val_text();
//! let grammar = g.compile().unwrap();
//! let root = grammar.root("number").unwrap();
//! let outcome = thicket_core::parse_str(&grammar, root, "42");
//! assert!(!outcome.summary.has_errors());
//! ```

mod charset;
mod compile;
mod dump;
mod validate;

use std::fmt;
use std::sync::Arc;

pub use charset::CharMatcher;
pub use compile::{CompiledGrammar, GrammarNode, GrammarNodeKind, NodeId};

use crate::ast::{Tag, TagContext};
use crate::error::GrammarError;
use crate::summary::Summary;

/// Maximum repetition meaning "no upper bound".
pub const UNBOUNDED: u32 = u32::MAX;

/// Repetition range of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Quantity {
    pub min: u32,
    pub max: u32,
}

impl Quantity {
    pub const ONCE: Quantity = Quantity { min: 1, max: 1 };

    pub fn new(min: u32, max: u32) -> Self {
        Self { min, max }
    }

    pub fn is_unbounded(self) -> bool {
        self.max == UNBOUNDED
    }

    /// Whether another repetition may follow `done` completed ones.
    pub fn allows_more(self, done: u32) -> bool {
        self.is_unbounded() || done < self.max
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONCE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (1, 1) => Ok(()),
            (0, 1) => write!(f, "?"),
            (0, UNBOUNDED) => write!(f, "*"),
            (1, UNBOUNDED) => write!(f, "+"),
            (min, UNBOUNDED) => write!(f, "{{{min},}}"),
            (min, max) if min == max => write!(f, "{{{min}}}"),
            (min, max) => write!(f, "{{{min},{max}}}"),
        }
    }
}

/// Produces the tag of a syntax tree node once all its characters and children were added.
///
/// The factory may rewrite the node through the [`TagContext`] (replace its text, drop children) and report
/// application errors into the summary. Returning `None` leaves the node untagged.
pub type TagFactory = Arc<dyn Fn(&mut TagContext<'_>, &mut Summary) -> Option<Tag> + Send + Sync>;

/// Wrap a closure as a [`TagFactory`].
pub fn tag_factory<F>(f: F) -> TagFactory
where
    F: Fn(&mut TagContext<'_>, &mut Summary) -> Option<Tag> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Marks a node as worth a syntax tree node.
#[derive(Clone)]
pub struct Val {
    pub factory: Option<TagFactory>,
    pub capture_text: bool,
}

impl fmt::Debug for Val {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Val")
            .field("factory", &self.factory.as_ref().map(|_| ".."))
            .field("capture_text", &self.capture_text)
            .finish()
    }
}

/// Precedence metadata used to disambiguate self-recursive alternatives.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Precedence {
    pub group: Arc<str>,
    pub value: u32,
}

#[derive(Debug, Clone)]
pub(crate) enum NodeKind {
    Char(CharMatcher),
    Sequence(Vec<Node>),
    Any(Vec<Node>),
    Reference(String),
}

/// Grammar node under construction.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) kind: NodeKind,
    pub(crate) name: Option<String>,
    pub(crate) quantity: Option<Quantity>,
    pub(crate) val: Option<Val>,
    pub(crate) precedence: Option<Precedence>,
    /// First configuration mistake made while chaining modifiers; reported by `compile`.
    pub(crate) config_error: Option<String>,
}

/// The mapped char when a case mapping yields exactly one.
fn single_char(mut mapping: impl Iterator<Item = char>) -> Option<char> {
    let c = mapping.next()?;
    mapping.next().is_none().then_some(c)
}

impl Node {
    fn new(kind: NodeKind) -> Self {
        Self {
            kind,
            name: None,
            quantity: None,
            val: None,
            precedence: None,
            config_error: None,
        }
    }

    /// Matches exactly `c`.
    pub fn char(c: char) -> Self {
        Self::new(NodeKind::Char(CharMatcher::single(c)))
    }

    /// Matches any character in `lo..=hi`.
    pub fn range(lo: char, hi: char) -> Self {
        Self::new(NodeKind::Char(CharMatcher::range(lo, hi)))
    }

    /// Matches any character. Exclusions can be added with [`Modifiers::exclude`].
    pub fn any_char() -> Self {
        Self::new(NodeKind::Char(CharMatcher::any()))
    }

    /// Matches any character from `chars`.
    pub fn one_of(chars: &str) -> Self {
        Self::new(NodeKind::Char(CharMatcher::one_of(chars)))
    }

    /// Case sensitive character sequence.
    pub fn string(s: &str) -> Self {
        Self::string_case(s, true)
    }

    /// Character sequence, matched case insensitively when `case_sensitive` is false.
    pub fn string_case(s: &str, case_sensitive: bool) -> Self {
        let mut chars: Vec<Node> = s
            .chars()
            .map(|c| {
                let mut matcher = CharMatcher::single(c);
                if !case_sensitive {
                    // mappings to several chars (`İ` lowers to `i̇`) have no single-char counterpart
                    let lower = single_char(c.to_lowercase());
                    let upper = single_char(c.to_uppercase());
                    for other in lower.into_iter().chain(upper).filter(|&o| o != c) {
                        matcher.include_range(other, other);
                    }
                }
                Self::new(NodeKind::Char(matcher))
            })
            .collect();
        if chars.len() == 1 {
            chars.remove(0)
        } else {
            Self::sequence(chars)
        }
    }

    /// Reference to a named node, resolved at compile time. Forward references are allowed.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::new(NodeKind::Reference(name.into()))
    }

    pub fn sequence(children: impl IntoIterator<Item = Node>) -> Self {
        Self::new(NodeKind::Sequence(children.into_iter().collect()))
    }

    /// Alternatives, all attempted independently.
    pub fn any(children: impl IntoIterator<Item = Node>) -> Self {
        Self::new(NodeKind::Any(children.into_iter().collect()))
    }

    pub fn get_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether the node carries anything besides its kind.
    pub(crate) fn has_attributes(&self) -> bool {
        self.name.is_some() || self.quantity.is_some() || self.val.is_some() || self.precedence.is_some()
    }

    pub(crate) fn describe(&self) -> String {
        if let Some(name) = &self.name {
            return format!("`{name}`");
        }
        match &self.kind {
            NodeKind::Char(m) => m.to_string(),
            NodeKind::Sequence(_) => "<sequence>".to_string(),
            NodeKind::Any(_) => "<any>".to_string(),
            NodeKind::Reference(name) => format!("<ref {name}>"),
        }
    }

    fn fail(&mut self, reason: impl Into<String>) {
        if self.config_error.is_none() {
            self.config_error = Some(reason.into());
        }
    }

    fn set_quantity(&mut self, min: u32, max: u32) {
        if self.quantity.is_some() {
            self.fail("quantity is already set");
        } else if max == 0 {
            self.fail("maximal quantity must be at least one");
        } else if min > max {
            self.fail(format!("minimal quantity {min} exceeds maximal quantity {max}"));
        } else {
            self.quantity = Some(Quantity::new(min, max));
        }
    }

    fn set_name(&mut self, name: String) {
        if self.name.is_some() {
            self.fail(format!("node is already named, cannot rename to `{name}`"));
        } else {
            self.name = Some(name);
        }
    }

    fn set_val(&mut self, factory: Option<TagFactory>, capture_text: bool) {
        if self.val.is_some() {
            self.fail("value is already set");
        } else {
            self.val = Some(Val { factory, capture_text });
        }
    }

    fn set_precedence(&mut self, group: &str, value: u32) {
        if self.precedence.is_some() {
            self.fail("precedence is already set");
        } else {
            self.precedence = Some(Precedence {
                group: Arc::from(group),
                value,
            });
        }
    }

    fn matcher_mut(&mut self, op: &str) -> Option<&mut CharMatcher> {
        if !matches!(self.kind, NodeKind::Char(_)) {
            self.fail(format!("`{op}` applies to character nodes only"));
            return None;
        }
        match &mut self.kind {
            NodeKind::Char(m) => Some(m),
            _ => None,
        }
    }
}

/// Chainable node modifiers, available on owned [`Node`]s and on registered rules ([`NodeMut`]).
pub trait Modifiers: Sized {
    #[doc(hidden)]
    fn node_mut(&mut self) -> &mut Node;

    /// Exactly `n` repetitions.
    fn quantity(self, n: u32) -> Self {
        self.quantity_range(n, n)
    }

    /// Between `min` and `max` repetitions, `max` may be [`UNBOUNDED`]. Can be set only once.
    fn quantity_range(mut self, min: u32, max: u32) -> Self {
        self.node_mut().set_quantity(min, max);
        self
    }

    fn optional(self) -> Self {
        self.quantity_range(0, 1)
    }

    fn one_or_many(self) -> Self {
        self.quantity_range(1, UNBOUNDED)
    }

    fn none_or_many(self) -> Self {
        self.quantity_range(0, UNBOUNDED)
    }

    fn name(mut self, name: impl Into<String>) -> Self {
        self.node_mut().set_name(name.into());
        self
    }

    /// Keep the node in the syntax tree, without tag factory and without captured text.
    fn val(mut self) -> Self {
        self.node_mut().set_val(None, false);
        self
    }

    /// Keep the node in the syntax tree and capture its matched text.
    fn val_text(mut self) -> Self {
        self.node_mut().set_val(None, true);
        self
    }

    /// Keep the node in the syntax tree and tag it with `factory` once complete.
    fn val_with(mut self, factory: TagFactory, capture_text: bool) -> Self {
        self.node_mut().set_val(Some(factory), capture_text);
        self
    }

    /// Precedence inside `group`, higher values bind tighter.
    fn precedence(mut self, group: &str, value: u32) -> Self {
        self.node_mut().set_precedence(group, value);
        self
    }

    fn include(mut self, chars: &str) -> Self {
        if let Some(m) = self.node_mut().matcher_mut("include") {
            m.include(chars);
        }
        self
    }

    fn exclude(mut self, chars: &str) -> Self {
        if let Some(m) = self.node_mut().matcher_mut("exclude") {
            m.exclude(chars);
        }
        self
    }

    fn include_range(mut self, lo: char, hi: char) -> Self {
        if let Some(m) = self.node_mut().matcher_mut("include_range") {
            m.include_range(lo, hi);
        }
        self
    }

    fn exclude_range(mut self, lo: char, hi: char) -> Self {
        if let Some(m) = self.node_mut().matcher_mut("exclude_range") {
            m.exclude_range(lo, hi);
        }
        self
    }
}

impl Modifiers for Node {
    fn node_mut(&mut self) -> &mut Node {
        self
    }
}

/// Mutable handle to a rule registered on a [`Grammar`].
pub struct NodeMut<'g>(&'g mut Node);

impl Modifiers for NodeMut<'_> {
    fn node_mut(&mut self) -> &mut Node {
        self.0
    }
}

/// Defines a named rule, see [`Grammar::node`].
pub struct NodeBuilder<'g> {
    grammar: &'g mut Grammar,
    name: String,
}

impl<'g> NodeBuilder<'g> {
    pub fn def(self, mut node: Node) -> NodeMut<'g> {
        let NodeBuilder { grammar, name } = self;
        node.set_name(name);
        grammar.add(node)
    }

    pub fn sequence(self, children: impl IntoIterator<Item = Node>) -> NodeMut<'g> {
        self.def(Node::sequence(children))
    }

    pub fn any(self, children: impl IntoIterator<Item = Node>) -> NodeMut<'g> {
        self.def(Node::any(children))
    }
}

/// Grammar under construction.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    pub(crate) rules: Vec<Node>,
}

impl Grammar {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start defining the rule `name`.
    pub fn node(&mut self, name: impl Into<String>) -> NodeBuilder<'_> {
        NodeBuilder {
            grammar: self,
            name: name.into(),
        }
    }

    /// Register a node tree. Every named node inside it becomes addressable by name.
    pub fn add(&mut self, node: Node) -> NodeMut<'_> {
        self.rules.push(node);
        let last = self.rules.len() - 1;
        NodeMut(&mut self.rules[last])
    }

    /// Registered rule by name (top-level rules only).
    pub fn find(&self, name: &str) -> Option<&Node> {
        self.rules.iter().find(|n| n.name.as_deref() == Some(name))
    }

    /// Resolve references, validate recursion and produce the immutable grammar graph.
    ///
    /// ## Errors
    /// Returns every naming, configuration and reference error found; recursion soundness is checked only
    /// once those are fixed, and reports the first unsound cycle.
    #[tracing::instrument(skip_all, fields(rules = self.rules.len()))]
    pub fn compile(self) -> Result<CompiledGrammar, Vec<GrammarError>> {
        let grammar = compile::lower(&self.rules)?;
        validate::validate_recursion(&grammar).map_err(|e| vec![e])?;
        tracing::debug!(nodes = grammar.len(), "grammar compiled");
        Ok(grammar)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantity_display() {
        assert_eq!(Quantity::ONCE.to_string(), "");
        assert_eq!(Quantity::new(0, 1).to_string(), "?");
        assert_eq!(Quantity::new(0, UNBOUNDED).to_string(), "*");
        assert_eq!(Quantity::new(1, UNBOUNDED).to_string(), "+");
        assert_eq!(Quantity::new(2, UNBOUNDED).to_string(), "{2,}");
        assert_eq!(Quantity::new(3, 3).to_string(), "{3}");
        assert_eq!(Quantity::new(3, 5).to_string(), "{3,5}");
    }

    #[test]
    fn test_modifiers_chain() {
        let node = Node::char('a').quantity_range(2, 4).name("a").val_text().precedence("g", 3);
        assert_eq!(node.quantity, Some(Quantity::new(2, 4)));
        assert_eq!(node.get_name(), Some("a"));
        assert!(node.val.as_ref().is_some_and(|v| v.capture_text && v.factory.is_none()));
        assert_eq!(node.precedence.as_ref().map(|p| p.value), Some(3));
        assert!(node.config_error.is_none());
    }

    #[test]
    fn test_quantity_set_twice_is_recorded() {
        let node = Node::char('a').optional().one_or_many();
        assert_eq!(node.config_error.as_deref(), Some("quantity is already set"));
        // the first setting is kept
        assert_eq!(node.quantity, Some(Quantity::new(0, 1)));
    }

    #[test]
    fn test_invalid_quantities_are_recorded() {
        assert!(Node::char('a').quantity(0).config_error.is_some());
        assert!(Node::char('a').quantity_range(3, 2).config_error.is_some());
    }

    #[test]
    fn test_char_refinement_on_sequence_is_recorded() {
        let node = Node::sequence([Node::char('a')]).exclude("b");
        assert!(node.config_error.unwrap().contains("character nodes only"));
    }

    #[test]
    fn test_string_builds_sequence() {
        let node = Node::string("/*");
        match &node.kind {
            NodeKind::Sequence(children) => assert_eq!(children.len(), 2),
            other => panic!("expected sequence, got {other:?}"),
        }
        assert!(matches!(Node::string("x").kind, NodeKind::Char(_)));
    }

    #[test]
    fn test_case_insensitive_string() {
        let node = Node::string_case("k", false);
        let NodeKind::Char(m) = &node.kind else {
            panic!("expected char node");
        };
        assert!(m.matches('k'));
        assert!(m.matches('K'));
        assert!(!m.matches('x'));
    }

    #[test]
    fn test_case_insensitive_string_skips_multi_char_mappings() {
        // `İ` lowers to `i` plus a combining dot, which must not become a match on its own
        let node = Node::string_case("İ", false);
        let NodeKind::Char(m) = &node.kind else {
            panic!("expected char node");
        };
        assert!(m.matches('İ'));
        assert!(!m.matches('\u{307}'));
        assert!(!m.matches('i'));

        let node = Node::string_case("ß", false);
        let NodeKind::Char(m) = &node.kind else {
            panic!("expected char node");
        };
        assert!(m.matches('ß'));
        assert!(!m.matches('S'));
    }

    #[test]
    fn test_char_refinement_on_char_node_applies() {
        let node = Node::range('a', 'z').exclude("q");
        assert!(node.config_error.is_none());
        let NodeKind::Char(m) = &node.kind else {
            panic!("expected char node");
        };
        assert!(m.matches('p'));
        assert!(!m.matches('q'));
    }

    #[test]
    fn test_node_builder_registers_named_rule() {
        let mut g = Grammar::new();
        g.node("digits").def(Node::range('0', '9')).one_or_many().val_text();
        let rule = g.find("digits").expect("rule registered");
        assert_eq!(rule.quantity, Some(Quantity::new(1, UNBOUNDED)));
        assert!(rule.val.is_some());
    }

    #[test]
    fn test_naming_twice_is_recorded() {
        let mut g = Grammar::new();
        g.node("outer").def(Node::char('x').name("inner"));
        assert!(g.find("outer").is_none());
        assert!(g.rules[0].config_error.as_deref().unwrap().contains("already named"));
    }
}
