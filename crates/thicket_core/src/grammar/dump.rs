//! Text rendering of compiled rule graphs.

use std::collections::HashSet;
use std::fmt::Write;

use super::compile::{CompiledGrammar, GrammarNodeKind, NodeId};
use super::Quantity;

impl CompiledGrammar {
    /// Render the rules reachable from `root`, one line per named node.
    ///
    /// Named nodes inside a rule body are printed by name, which is how cycles show up. Anonymous
    /// compound nodes are printed inline in parentheses. Suffixes follow the usual repetition notation
    /// (`?`, `*`, `+`, `{n}`, `{min,max}`), followed by `@group:value` for precedence and `{val}` /
    /// `{text}` for tree-worthy nodes.
    pub fn dump(&self, root: NodeId) -> String {
        let mut out = String::new();
        let mut queued = HashSet::from([root]);
        let mut queue = vec![root];
        let mut index = 0;
        while index < queue.len() {
            let id = queue[index];
            index += 1;
            let mut body = String::new();
            self.render(id, true, &mut body, &mut |child| {
                if queued.insert(child) {
                    queue.push(child);
                }
            });
            let _ = writeln!(out, "{} = {}", self.describe(id), body);
        }
        out
    }

    fn render(&self, id: NodeId, top: bool, out: &mut String, reached: &mut dyn FnMut(NodeId)) {
        let node = &self[id];
        if !top && node.name.is_some() {
            out.push_str(&self.describe(id));
            reached(id);
            return;
        }

        let bare = node.quantity == Quantity::ONCE;
        match &node.kind {
            GrammarNodeKind::Char(m) => {
                let _ = write!(out, "{m}");
            }
            GrammarNodeKind::Sequence(children) | GrammarNodeKind::Alternative(children) => {
                let separator = if matches!(node.kind, GrammarNodeKind::Sequence(_)) { " " } else { " | " };
                let wrap = !(top && bare) && !(children.len() == 1 && bare);
                if wrap {
                    out.push('(');
                }
                for (i, &child) in children.iter().enumerate() {
                    if i > 0 {
                        out.push_str(separator);
                    }
                    self.render(child, false, out, reached);
                }
                if wrap {
                    out.push(')');
                }
            }
        }
        let _ = write!(out, "{}", node.quantity);
        if let Some(precedence) = &node.precedence {
            let _ = write!(out, " @{}:{}", precedence.group, precedence.value);
        }
        match &node.val {
            Some(val) if val.capture_text => out.push_str(" {text}"),
            Some(_) => out.push_str(" {val}"),
            None => {}
        }
    }
}
