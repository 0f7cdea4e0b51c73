//! Lowering of builder nodes into the resolved grammar graph.
//!
//! Every named node gets its [`NodeId`] reserved up front so references, including forward and
//! self references, resolve to a stable handle and recursive rules become cycles in the graph.

use std::collections::HashMap;
use std::ops::Index;
use std::sync::Arc;

use cranelift_entity::{entity_impl, PrimaryMap, SecondaryMap};

use super::{CharMatcher, Node, NodeKind, Precedence, Quantity, Val};
use crate::error::GrammarError;

/// Handle of a node in a [`CompiledGrammar`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct NodeId(u32);

entity_impl! { NodeId }

#[derive(Debug, Clone)]
pub enum GrammarNodeKind {
    Char(CharMatcher),
    /// Children in match order; the next sibling of child `i` is child `i + 1`.
    Sequence(Box<[NodeId]>),
    Alternative(Box<[NodeId]>),
}

/// A resolved grammar node. References never survive compilation.
#[derive(Debug, Clone)]
pub struct GrammarNode {
    pub kind: GrammarNodeKind,
    pub name: Option<Arc<str>>,
    pub quantity: Quantity,
    pub val: Option<Val>,
    pub precedence: Option<Precedence>,
}

impl GrammarNode {
    /// Children of a sequence or alternative, empty for character nodes.
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            GrammarNodeKind::Char(_) => &[],
            GrammarNodeKind::Sequence(children) | GrammarNodeKind::Alternative(children) => children,
        }
    }

    pub fn is_char(&self) -> bool {
        matches!(self.kind, GrammarNodeKind::Char(_))
    }

    pub fn captures_text(&self) -> bool {
        self.val.as_ref().is_some_and(|v| v.capture_text)
    }
}

/// Immutable grammar graph produced by [`Grammar::compile`](super::Grammar::compile).
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    nodes: PrimaryMap<NodeId, GrammarNode>,
    names: HashMap<Arc<str>, NodeId>,
    /// Named nodes in definition order.
    order: Vec<NodeId>,
    nullable: SecondaryMap<NodeId, bool>,
}

impl CompiledGrammar {
    /// Entry node for parsing, selected by name.
    ///
    /// ## Errors
    /// `UnresolvedReference` if no node carries that name.
    pub fn root(&self, name: &str) -> Result<NodeId, GrammarError> {
        self.find(name).ok_or_else(|| GrammarError::UnresolvedReference { name: name.to_string() })
    }

    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.names.get(name).copied()
    }

    pub fn get(&self, id: NodeId) -> Option<&GrammarNode> {
        self.nodes.get(id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Named nodes in definition order.
    pub fn named(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.order
            .iter()
            .filter_map(|&id| self.nodes[id].name.as_deref().map(|name| (name, id)))
    }

    /// Whether the node can complete without consuming a character.
    pub fn is_nullable(&self, id: NodeId) -> bool {
        self.nullable[id]
    }

    /// Child following `slot` in a sequence, `None` when `slot` is the last child or `parent` is no sequence.
    pub fn next_sibling(&self, parent: NodeId, slot: usize) -> Option<NodeId> {
        match &self.nodes[parent].kind {
            GrammarNodeKind::Sequence(children) => children.get(slot + 1).copied(),
            _ => None,
        }
    }

    /// Short human readable label: the name, or the shape of an anonymous node.
    pub fn describe(&self, id: NodeId) -> String {
        let node = &self.nodes[id];
        if let Some(name) = &node.name {
            return name.to_string();
        }
        match &node.kind {
            GrammarNodeKind::Char(m) => m.to_string(),
            GrammarNodeKind::Sequence(_) => format!("<sequence #{}>", id.as_u32()),
            GrammarNodeKind::Alternative(_) => format!("<alternative #{}>", id.as_u32()),
        }
    }
}

impl Index<NodeId> for CompiledGrammar {
    type Output = GrammarNode;

    fn index(&self, id: NodeId) -> &GrammarNode {
        &self.nodes[id]
    }
}

/// Resolve and lower registered rules.
pub(super) fn lower(rules: &[Node]) -> Result<CompiledGrammar, Vec<GrammarError>> {
    let mut cx = LowerCx::default();
    for rule in rules {
        cx.reserve(rule);
    }
    for rule in rules {
        cx.lower(rule);
    }
    if !cx.errors.is_empty() {
        return Err(cx.errors);
    }

    let nullable = compute_nullable(&cx.nodes);
    Ok(CompiledGrammar {
        nodes: cx.nodes,
        names: cx.names,
        order: cx.order,
        nullable,
    })
}

#[derive(Default)]
struct LowerCx {
    nodes: PrimaryMap<NodeId, GrammarNode>,
    names: HashMap<Arc<str>, NodeId>,
    order: Vec<NodeId>,
    interned: HashMap<CharMatcher, NodeId>,
    errors: Vec<GrammarError>,
}

impl LowerCx {
    /// Collect configuration errors and reserve an id for every named node.
    fn reserve(&mut self, node: &Node) {
        if let Some(reason) = &node.config_error {
            self.errors.push(GrammarError::InvalidNodeConfiguration {
                node: node.describe(),
                reason: reason.clone(),
            });
        }
        if let Some(name) = &node.name {
            if self.names.contains_key(name.as_str()) {
                self.errors.push(GrammarError::DuplicateName { name: name.clone() });
            } else {
                let id = self.nodes.push(placeholder());
                self.names.insert(Arc::from(name.as_str()), id);
                self.order.push(id);
            }
        }
        match &node.kind {
            NodeKind::Sequence(children) | NodeKind::Any(children) => {
                if children.is_empty() {
                    self.errors.push(GrammarError::InvalidNodeConfiguration {
                        node: node.describe(),
                        reason: "node needs at least one child".to_string(),
                    });
                }
                for child in children {
                    self.reserve(child);
                }
            }
            NodeKind::Char(_) | NodeKind::Reference(_) => {}
        }
    }

    fn lower(&mut self, node: &Node) -> Option<NodeId> {
        let kind = match &node.kind {
            NodeKind::Reference(name) => {
                let Some(&target) = self.names.get(name.as_str()) else {
                    self.errors.push(GrammarError::UnresolvedReference { name: name.clone() });
                    return None;
                };
                if !node.has_attributes() {
                    return Some(target);
                }
                // attributes of the reference itself live on a single-child wrapper
                GrammarNodeKind::Sequence(Box::new([target]))
            }
            NodeKind::Char(matcher) => {
                if !node.has_attributes() {
                    return Some(self.intern(matcher));
                }
                GrammarNodeKind::Char(matcher.clone())
            }
            NodeKind::Sequence(children) => GrammarNodeKind::Sequence(self.lower_children(children)?),
            NodeKind::Any(children) => GrammarNodeKind::Alternative(self.lower_children(children)?),
        };

        let lowered = GrammarNode {
            kind,
            name: None,
            quantity: node.quantity.unwrap_or_default(),
            val: node.val.clone(),
            precedence: node.precedence.clone(),
        };
        Some(self.define(node.name.as_deref(), lowered))
    }

    fn lower_children(&mut self, children: &[Node]) -> Option<Box<[NodeId]>> {
        let lowered: Vec<Option<NodeId>> = children.iter().map(|c| self.lower(c)).collect();
        if children.is_empty() {
            return None;
        }
        lowered.into_iter().collect()
    }

    /// Store a lowered node, into its reserved slot when it is named.
    fn define(&mut self, name: Option<&str>, mut node: GrammarNode) -> NodeId {
        match name.and_then(|name| self.names.get_key_value(name)) {
            Some((key, &id)) => {
                node.name = Some(key.clone());
                self.nodes[id] = node;
                id
            }
            None => self.nodes.push(node),
        }
    }

    fn intern(&mut self, matcher: &CharMatcher) -> NodeId {
        if let Some(&id) = self.interned.get(matcher) {
            return id;
        }
        let id = self.nodes.push(GrammarNode {
            kind: GrammarNodeKind::Char(matcher.clone()),
            name: None,
            quantity: Quantity::ONCE,
            val: None,
            precedence: None,
        });
        self.interned.insert(matcher.clone(), id);
        id
    }
}

fn placeholder() -> GrammarNode {
    GrammarNode {
        kind: GrammarNodeKind::Sequence(Box::default()),
        name: None,
        quantity: Quantity::ONCE,
        val: None,
        precedence: None,
    }
}

/// Least fixpoint of "can match the empty string".
fn compute_nullable(nodes: &PrimaryMap<NodeId, GrammarNode>) -> SecondaryMap<NodeId, bool> {
    let mut nullable: SecondaryMap<NodeId, bool> = SecondaryMap::with_capacity(nodes.len());
    let mut changed = true;
    while changed {
        changed = false;
        for (id, node) in nodes.iter() {
            if nullable[id] {
                continue;
            }
            let value = node.quantity.min == 0
                || match &node.kind {
                    GrammarNodeKind::Char(_) => false,
                    GrammarNodeKind::Sequence(children) => children.iter().all(|&c| nullable[c]),
                    GrammarNodeKind::Alternative(children) => children.iter().any(|&c| nullable[c]),
                };
            if value {
                nullable[id] = true;
                changed = true;
            }
        }
    }
    nullable
}
