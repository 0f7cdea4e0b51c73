//! JSON rendering of syntax trees.
//!
//! Nodes are written as a flat list in document order, children referring to node ids, so the output
//! nests the same for a tree of any depth.

use serde_json::{Value, json};
use thicket_core::{Ast, AstId, InputPosition};

fn position(p: InputPosition) -> Value {
    json!({ "line": p.line, "column": p.column, "offset": p.offset })
}

/// One node: id, name, captured text, positions and child ids. Unnamed nodes get a `null` name.
pub fn node_to_json(ast: &Ast, id: AstId) -> Value {
    let node = &ast[id];
    let children: Vec<u32> = node.children().iter().map(|c| c.as_u32()).collect();
    json!({
        "id": id.as_u32(),
        "name": node.name(),
        "text": node.text(),
        "start": position(node.start()),
        "end": node.end().map(position),
        "children": children,
    })
}

/// Root ids plus every node reachable from them.
pub fn ast_to_json(ast: &Ast) -> Value {
    let roots: Vec<u32> = ast.roots().iter().map(|r| r.as_u32()).collect();
    let nodes: Vec<Value> = ast
        .roots()
        .iter()
        .flat_map(|&root| ast.preorder(root))
        .map(|id| node_to_json(ast, id))
        .collect();
    json!({ "roots": roots, "nodes": nodes })
}

#[cfg(test)]
mod tests {
    use super::*;
    use thicket_core::prelude::*;
    use thicket_core::parse_str;

    fn node<'v>(value: &'v Value, id: &Value) -> &'v Value {
        value["nodes"].as_array().unwrap().iter().find(|n| &n["id"] == id).unwrap()
    }

    #[test]
    fn test_tree_as_json() {
        let mut g = Grammar::new();
        g.node("word").def(Node::range('a', 'z').one_or_many()).val_text();
        g.node("pair")
            .sequence([Node::reference("word"), Node::char(' '), Node::reference("word")])
            .val();
        let grammar = g.compile().unwrap();
        let outcome = parse_str(&grammar, grammar.root("pair").unwrap(), "ab c");

        let value = ast_to_json(&outcome.ast);
        assert_eq!(value["nodes"].as_array().map(Vec::len), Some(3));
        let pair = node(&value, &value["roots"][0]);
        assert_eq!(pair["name"], "pair");
        assert_eq!(pair["text"], Value::Null);
        assert_eq!(pair["end"]["offset"], 4);

        let second = node(&value, &pair["children"][1]);
        assert_eq!(second["text"], "c");
        assert_eq!(second["start"]["column"], 4);
        // document order
        assert_eq!(value["nodes"][0]["id"], pair["id"]);
        assert_eq!(value["nodes"][2]["id"], second["id"]);
    }
}
