//! Folding unambiguous match history into the syntax tree.

use super::pool::{NodePool, ParseRef};
use crate::ast::{Ast, AstId, AstNode, TagContext};
use crate::grammar::CompiledGrammar;
use crate::position::InputPosition;
use crate::summary::Summary;

pub(crate) struct Assembler<'g> {
    grammar: &'g CompiledGrammar,
    ast: Ast,
    /// Open syntax nodes from the outermost to the innermost node of the last committed character.
    open: Vec<AstId>,
}

impl<'g> Assembler<'g> {
    pub fn new(grammar: &'g CompiledGrammar) -> Self {
        Self {
            grammar,
            ast: Ast::new(),
            open: Vec::new(),
        }
    }

    pub fn into_ast(self) -> Ast {
        self.ast
    }

    /// Commit every not yet committed character ending in `last`, in input order, then cut the history
    /// behind `last`.
    pub fn commit_sequence(&mut self, pool: &mut NodePool, last: ParseRef, summary: &mut Summary) {
        let mut chain = Vec::new();
        let mut current = Some(last);
        while let Some(r) = current {
            let node = pool.get(r);
            if node.committed {
                break;
            }
            chain.push(r);
            current = node.prev;
        }
        tracing::trace!(chars = chain.len(), "commit");

        for &r in chain.iter().rev() {
            self.commit_node(pool, r, summary);
            pool.get_mut(r).committed = true;
        }
        if let Some(prev) = pool.take_prev(last) {
            pool.release(prev);
        }
    }

    /// Attach one character to the tree, creating syntax nodes for its tree-worthy ancestors that have
    /// none yet.
    fn commit_node(&mut self, pool: &mut NodePool, r: ParseRef, summary: &mut Summary) {
        let grammar = self.grammar;
        let terminal = *pool.get(r);
        let Some(c) = terminal.ch else {
            debug_assert!(false, "committed parse node is no character node");
            return;
        };
        let position = terminal.start;

        let mut innermost = None;
        let mut created: Option<AstId> = None;
        let mut opened = Vec::new();
        let mut attached = None;
        let mut current = Some(r);
        while let Some(pr) = current {
            let node = *pool.get(pr);
            current = node.parent;
            let grammar_node = &grammar[node.grammar];
            if grammar_node.val.is_none() {
                continue;
            }
            let existing = node.ast.or_else(|| {
                let previous = pool.take_repeat_of(pr)?;
                let ast = pool.get(previous).ast;
                pool.release(previous);
                ast
            });
            if let Some(existing) = existing {
                pool.get_mut(pr).ast = Some(existing);
                innermost.get_or_insert(existing);
                if let Some(child) = created {
                    self.ast.append_child(existing, child);
                }
                attached = Some(existing);
                break;
            }
            let id = self.ast.push(AstNode::new(
                node.grammar,
                grammar_node.name.clone(),
                position,
                grammar_node.captures_text(),
            ));
            pool.get_mut(pr).ast = Some(id);
            if let Some(child) = created {
                self.ast.append_child(id, child);
            }
            innermost.get_or_insert(id);
            created = Some(id);
            opened.push(id);
        }
        if attached.is_none() {
            if let Some(top) = created {
                self.ast.push_root(top);
            }
        }

        self.close_until(attached, position, summary);
        if let Some(id) = innermost {
            self.ast.push_text(id, c);
        }
        self.open.extend(opened.into_iter().rev());
    }

    /// Finalize open nodes from the innermost outwards until reaching `boundary`, which stays open; all
    /// of them when `boundary` is `None`.
    fn close_until(&mut self, boundary: Option<AstId>, end: InputPosition, summary: &mut Summary) {
        while let Some(&id) = self.open.last() {
            if Some(id) == boundary {
                break;
            }
            self.open.pop();
            self.finalize(id, end, summary);
        }
    }

    /// Close every open node at end of input.
    pub fn finish(&mut self, end: InputPosition, summary: &mut Summary) {
        self.close_until(None, end, summary);
    }

    fn finalize(&mut self, id: AstId, end: InputPosition, summary: &mut Summary) {
        self.ast.set_end(id, end);
        let factory = self.grammar[self.ast[id].grammar()]
            .val
            .as_ref()
            .and_then(|val| val.factory.clone());
        if let Some(factory) = factory {
            let tag = factory(&mut TagContext::new(&mut self.ast, id), summary);
            self.ast.set_tag(id, tag);
        }
    }
}
