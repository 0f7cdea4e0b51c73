//! Syntax tree produced by a parse.
//!
//! Only grammar nodes marked tree-worthy (`val`) get a syntax node. Nodes live in an arena owned by the
//! [`Ast`]; children are kept in match order.

use std::any::Any;
use std::fmt::{self, Write};
use std::ops::Index;
use std::sync::Arc;

use cranelift_entity::{entity_impl, PrimaryMap};

use crate::grammar::NodeId;
use crate::position::InputPosition;

/// Application-defined value attached to a syntax node by its tag factory.
pub type Tag = Box<dyn Any>;

/// Handle of a node in an [`Ast`].
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct AstId(u32);

entity_impl! { AstId }

pub struct AstNode {
    grammar: NodeId,
    name: Option<Arc<str>>,
    /// `Some` when the grammar node captures text, even before the first character arrives.
    text: Option<String>,
    children: Vec<AstId>,
    parent: Option<AstId>,
    start: InputPosition,
    end: Option<InputPosition>,
    tag: Option<Tag>,
}

impl AstNode {
    pub(crate) fn new(grammar: NodeId, name: Option<Arc<str>>, start: InputPosition, capture_text: bool) -> Self {
        Self {
            grammar,
            name,
            text: capture_text.then(String::new),
            children: Vec::new(),
            parent: None,
            start,
            end: None,
            tag: None,
        }
    }

    /// The grammar node this syntax node was created for.
    pub fn grammar(&self) -> NodeId {
        self.grammar
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn children(&self) -> &[AstId] {
        &self.children
    }

    pub fn parent(&self) -> Option<AstId> {
        self.parent
    }

    /// Position of the first character.
    pub fn start(&self) -> InputPosition {
        self.start
    }

    /// Position right after the last character; `None` until the node is complete.
    pub fn end(&self) -> Option<InputPosition> {
        self.end
    }

    pub fn is_complete(&self) -> bool {
        self.end.is_some()
    }

    /// The tag, if present and of type `T`.
    pub fn tag<T: Any>(&self) -> Option<&T> {
        self.tag.as_ref().and_then(|tag| tag.downcast_ref::<T>())
    }

    pub fn has_tag(&self) -> bool {
        self.tag.is_some()
    }
}

impl fmt::Debug for AstNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AstNode")
            .field("grammar", &self.grammar)
            .field("name", &self.name)
            .field("text", &self.text)
            .field("children", &self.children)
            .field("start", &self.start)
            .field("end", &self.end)
            .field("tag", &self.tag.as_ref().map(|_| ".."))
            .finish()
    }
}

/// Arena of syntax nodes plus the list of top-level nodes.
#[derive(Debug, Default)]
pub struct Ast {
    nodes: PrimaryMap<AstId, AstNode>,
    roots: Vec<AstId>,
}

impl Ast {
    pub fn new() -> Self {
        Self::default()
    }

    /// First top-level node. When the grammar root is tree-worthy this is the whole tree.
    pub fn root(&self) -> Option<AstId> {
        self.roots.first().copied()
    }

    /// Top-level nodes in match order.
    pub fn roots(&self) -> &[AstId] {
        &self.roots
    }

    pub fn get(&self, id: AstId) -> Option<&AstNode> {
        self.nodes.get(id)
    }

    /// Number of nodes in the arena, including nodes detached by tag factories.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: AstId) -> impl Iterator<Item = &AstNode> + '_ {
        self.nodes[id].children.iter().map(|&c| &self.nodes[c])
    }

    /// First child created for the named grammar node.
    pub fn child_named(&self, id: AstId, name: &str) -> Option<AstId> {
        self.nodes[id]
            .children
            .iter()
            .copied()
            .find(|&c| self.nodes[c].name() == Some(name))
    }

    pub fn is_ancestor_or_self(&self, ancestor: AstId, mut node: AstId) -> bool {
        loop {
            if node == ancestor {
                return true;
            }
            match self.nodes[node].parent {
                Some(parent) => node = parent,
                None => return false,
            }
        }
    }

    /// Captured text of `id` and its descendants in document order.
    ///
    /// A node's own text is emitted before the text of its children, so the result equals the matched
    /// input exactly when only leaves capture text.
    pub fn captured_text(&self, id: AstId) -> String {
        let mut out = String::new();
        for id in self.preorder(id) {
            if let Some(text) = &self.nodes[id].text {
                out.push_str(text);
            }
        }
        out
    }

    /// `id` and its descendants in document order.
    pub fn preorder(&self, id: AstId) -> impl Iterator<Item = AstId> + '_ {
        self.preorder_with_depth(id).map(|(id, _)| id)
    }

    /// Like [`Ast::preorder`], with the depth below `id` of every node.
    pub fn preorder_with_depth(&self, id: AstId) -> impl Iterator<Item = (AstId, usize)> + '_ {
        let mut pending = vec![(id, 0)];
        std::iter::from_fn(move || {
            let (id, depth) = pending.pop()?;
            pending.extend(self.nodes[id].children.iter().rev().map(|&c| (c, depth + 1)));
            Some((id, depth))
        })
    }

    /// Indented outline: one line per node with its name and captured text.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        for &root in &self.roots {
            for (id, depth) in self.preorder_with_depth(root) {
                self.dump_line(id, depth, &mut out);
            }
        }
        out
    }

    fn dump_line(&self, id: AstId, depth: usize, out: &mut String) {
        let node = &self.nodes[id];
        let _ = write!(out, "{:indent$}", "", indent = depth * 2);
        match &node.name {
            Some(name) => out.push_str(name),
            None => {
                let _ = write!(out, "#{}", node.grammar.as_u32());
            }
        }
        if let Some(text) = node.text.as_deref().filter(|t| !t.is_empty()) {
            let _ = write!(out, " {text:?}");
        }
        out.push('\n');
    }

    pub(crate) fn push(&mut self, node: AstNode) -> AstId {
        self.nodes.push(node)
    }

    pub(crate) fn push_root(&mut self, id: AstId) {
        self.roots.push(id);
    }

    pub(crate) fn append_child(&mut self, parent: AstId, child: AstId) {
        self.nodes[child].parent = Some(parent);
        self.nodes[parent].children.push(child);
    }

    pub(crate) fn push_text(&mut self, id: AstId, c: char) {
        if let Some(text) = &mut self.nodes[id].text {
            text.push(c);
        }
    }

    pub(crate) fn set_end(&mut self, id: AstId, end: InputPosition) {
        self.nodes[id].end = Some(end);
    }

    pub(crate) fn set_tag(&mut self, id: AstId, tag: Option<Tag>) {
        self.nodes[id].tag = tag;
    }
}

impl Index<AstId> for Ast {
    type Output = AstNode;

    fn index(&self, id: AstId) -> &AstNode {
        &self.nodes[id]
    }
}

/// View of a completed syntax node handed to its tag factory.
pub struct TagContext<'a> {
    ast: &'a mut Ast,
    id: AstId,
}

impl<'a> TagContext<'a> {
    pub(crate) fn new(ast: &'a mut Ast, id: AstId) -> Self {
        Self { ast, id }
    }

    pub fn id(&self) -> AstId {
        self.id
    }

    pub fn node(&self) -> &AstNode {
        &self.ast[self.id]
    }

    pub fn ast(&self) -> &Ast {
        self.ast
    }

    pub fn name(&self) -> Option<&str> {
        self.node().name()
    }

    pub fn text(&self) -> Option<&str> {
        self.node().text()
    }

    /// Take the captured text out of the node, leaving no text behind.
    pub fn take_text(&mut self) -> Option<String> {
        self.ast.nodes[self.id].text.take()
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.ast.nodes[self.id].text = Some(text.into());
    }

    pub fn start(&self) -> InputPosition {
        self.node().start
    }

    pub fn end(&self) -> Option<InputPosition> {
        self.node().end
    }

    pub fn children(&self) -> &[AstId] {
        &self.ast[self.id].children
    }

    pub fn child(&self, index: usize) -> Option<&AstNode> {
        self.children().get(index).map(|&c| &self.ast[c])
    }

    /// Tags of all children, `None` for children without a tag of type `T`.
    pub fn child_tags<T: Any>(&self) -> impl Iterator<Item = Option<&T>> + '_ {
        self.children().iter().map(|&c| self.ast[c].tag::<T>())
    }

    /// Move the tag out of child `index` if it has type `T`.
    pub fn take_child_tag<T: Any>(&mut self, index: usize) -> Option<Box<T>> {
        let child = *self.ast[self.id].children.get(index)?;
        let tag = self.ast.nodes[child].tag.take()?;
        match tag.downcast::<T>() {
            Ok(value) => Some(value),
            Err(tag) => {
                self.ast.nodes[child].tag = Some(tag);
                None
            }
        }
    }

    /// Detach all children; they stay in the arena but are no longer reachable from this node.
    pub fn clear_children(&mut self) {
        let children = std::mem::take(&mut self.ast.nodes[self.id].children);
        for child in children {
            self.ast.nodes[child].parent = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cranelift_entity::EntityRef;

    fn grammar_id(n: usize) -> NodeId {
        NodeId::new(n)
    }

    fn sample() -> (Ast, AstId, AstId, AstId) {
        let mut ast = Ast::new();
        let root = ast.push(AstNode::new(grammar_id(0), Some("file".into()), InputPosition::START, false));
        let a = ast.push(AstNode::new(grammar_id(1), Some("word".into()), InputPosition::START, true));
        let b = ast.push(AstNode::new(grammar_id(1), Some("word".into()), InputPosition::new(1, 3, 2), true));
        ast.push_root(root);
        ast.append_child(root, a);
        ast.append_child(root, b);
        for c in "ab".chars() {
            ast.push_text(a, c);
        }
        ast.push_text(b, 'c');
        (ast, root, a, b)
    }

    #[test]
    fn test_dump_and_text() {
        let (ast, root, a, _) = sample();
        assert_eq!(ast.dump(), "file\n  word \"ab\"\n  word \"c\"\n");
        assert_eq!(ast.captured_text(root), "abc");
        assert_eq!(ast.root(), Some(root));
        assert!(ast.is_ancestor_or_self(root, a));
        assert!(!ast.is_ancestor_or_self(a, root));
        assert_eq!(ast.child_named(root, "word"), Some(a));
    }

    #[test]
    fn test_deep_tree_walks_iteratively() {
        let mut ast = Ast::new();
        let mut parent = ast.push(AstNode::new(grammar_id(0), Some("n".into()), InputPosition::START, true));
        ast.push_root(parent);
        for _ in 0..100_000 {
            let child = ast.push(AstNode::new(grammar_id(0), Some("n".into()), InputPosition::START, true));
            ast.append_child(parent, child);
            ast.push_text(child, 'x');
            parent = child;
        }
        let root = ast.root().unwrap();
        assert_eq!(ast.captured_text(root).len(), 100_000);
        assert_eq!(ast.preorder_with_depth(root).last(), Some((parent, 100_000)));
        assert_eq!(ast.dump().lines().count(), 100_001);
    }

    #[test]
    fn test_text_only_when_captured() {
        let (mut ast, root, ..) = sample();
        ast.push_text(root, 'x');
        assert_eq!(ast[root].text(), None);
    }

    #[test]
    fn test_tag_context_rewrites_node() {
        let (mut ast, root, a, b) = sample();
        ast.set_tag(a, Some(Box::new(1u8)));
        ast.set_tag(b, Some(Box::new("two")));

        let mut cx = TagContext::new(&mut ast, root);
        let tags: Vec<Option<&u8>> = cx.child_tags::<u8>().collect();
        assert_eq!(tags, vec![Some(&1u8), None]);

        // wrong type leaves the tag in place
        assert!(cx.take_child_tag::<u8>(1).is_none());
        assert_eq!(cx.take_child_tag::<&str>(1).as_deref(), Some(&"two"));
        cx.set_text("rewritten");
        cx.clear_children();

        assert_eq!(ast[root].text(), Some("rewritten"));
        assert!(ast[root].children().is_empty());
        assert_eq!(ast[a].parent(), None);
        assert_eq!(ast[a].tag::<u8>(), Some(&1));
        assert_eq!(ast[b].tag::<&str>(), None);
    }
}
