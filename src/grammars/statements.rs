//! Assignments of string and number literals.
//!
//! ```text
//! file      = gap? (statement gap?)*
//! statement = identifier gap? '=' gap? (string-literal | number-literal) gap? ';'
//! gap       = (whitespace | multiline-comment)+
//! ```
//!
//! The `file` node is tagged with the [`Bindings`] of the whole input.

use std::collections::HashSet;
use std::fmt;

use thicket_core::prelude::*;
use thicket_core::{GrammarError, InputPosition};

use super::GrammarCode;

pub const ROOT: &str = "file";

/// Value of a literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    Str(String),
    Number(i64),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Binding {
    pub name: String,
    pub value: Value,
    pub position: InputPosition,
}

/// Bindings of a file in input order, without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bindings(pub Vec<Binding>);

impl Bindings {
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.iter().find(|b| b.name == name).map(|b| &b.value)
    }
}

/// Resolve the escapes of a quoted string literal.
fn decode_string(literal: &str) -> Result<String, char> {
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);
    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('"') => out.push('"'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => return Err(other),
            None => return Err('\\'),
        }
    }
    Ok(out)
}

pub fn grammar() -> Result<CompiledGrammar, Vec<GrammarError>> {
    let string_literal = tag_factory(|cx, summary| {
        let literal = cx.text()?;
        match decode_string(literal) {
            Ok(value) => Some(Box::new(Value::Str(value))),
            Err(c) => {
                summary.error(
                    Some(cx.start()),
                    Some(GrammarCode::InvalidEscape.into()),
                    format!("invalid escape sequence `\\{c}`"),
                );
                None
            }
        }
    });
    let number_literal = tag_factory(|cx, summary| {
        let text = cx.text()?;
        match text.parse::<i64>() {
            Ok(n) => Some(Box::new(Value::Number(n))),
            Err(_) => {
                summary.error(
                    Some(cx.start()),
                    Some(GrammarCode::NumberOverflow.into()),
                    format!("number `{text}` does not fit into 64 bits"),
                );
                None
            }
        }
    });
    let statement = tag_factory(|cx, _| {
        let name = cx.child(0)?.text()?.to_string();
        let position = cx.start();
        let value = cx.take_child_tag::<Value>(1)?;
        Some(Box::new(Binding {
            name,
            value: *value,
            position,
        }))
    });
    let file = tag_factory(|cx, summary| {
        let mut seen = HashSet::new();
        let mut bindings = Vec::new();
        for index in 0..cx.children().len() {
            let Some(binding) = cx.take_child_tag::<Binding>(index) else {
                continue;
            };
            if !seen.insert(binding.name.clone()) {
                summary.error(
                    Some(binding.position),
                    Some(GrammarCode::DuplicateIdentifier.into()),
                    format!("identifier `{}` is already bound", binding.name),
                );
                continue;
            }
            bindings.push(*binding);
        }
        Some(Box::new(Bindings(bindings)))
    });

    let mut g = Grammar::new();
    g.node("decimal-digit").def(Node::range('0', '9'));
    g.node("alphabetic").def(Node::range('a', 'z').include_range('A', 'Z'));
    g.node("whitespace").def(Node::one_of(" \t\r\n"));
    g.node("multiline-comment").sequence([
        Node::string("/*"),
        Node::any([
            Node::any_char().exclude("*"),
            Node::sequence([Node::char('*'), Node::any_char().exclude("/")]),
        ])
        .none_or_many(),
        Node::string("*/"),
    ]);
    g.node("gap").def(
        Node::any([Node::reference("whitespace"), Node::reference("multiline-comment")]).one_or_many(),
    );

    g.node("string-literal")
        .sequence([
            Node::char('"'),
            Node::any([
                Node::any_char().exclude("\"\\"),
                Node::sequence([Node::char('\\'), Node::any_char()]),
            ])
            .none_or_many(),
            Node::char('"'),
        ])
        .val_with(string_literal, true);
    g.node("number-literal")
        .sequence([Node::reference("decimal-digit").one_or_many()])
        .val_with(number_literal, true);

    g.node("identifier-first-char").any([Node::reference("alphabetic"), Node::char('_')]);
    g.node("identifier-char").any([Node::reference("identifier-first-char"), Node::reference("decimal-digit")]);
    g.node("identifier")
        .sequence([
            Node::reference("identifier-first-char"),
            Node::reference("identifier-char").none_or_many(),
        ])
        .val_text();

    g.node("statement")
        .sequence([
            Node::reference("identifier"),
            Node::reference("gap").optional(),
            Node::char('='),
            Node::reference("gap").optional(),
            Node::any([Node::reference("string-literal"), Node::reference("number-literal")]),
            Node::reference("gap").optional(),
            Node::char(';'),
        ])
        .val_with(statement, false);
    g.node(ROOT)
        .sequence([
            Node::reference("gap").optional(),
            Node::sequence([Node::reference("statement"), Node::reference("gap").optional()]).none_or_many(),
        ])
        .val_with(file, false);

    g.compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use thicket_core::{ErrorCode, parse_str};

    fn bindings(outcome: &ParseOutcome) -> &Bindings {
        let root = outcome.ast.root().unwrap();
        outcome.ast[root].tag::<Bindings>().unwrap()
    }

    #[test]
    fn test_decode_string() {
        assert_eq!(decode_string(r#""a\\b\"c""#), Ok(r#"a\b"c"#.to_string()));
        assert_eq!(decode_string(r#""tab\there""#), Ok("tab\there".to_string()));
        assert_eq!(decode_string(r#""bad\q""#), Err('q'));
    }

    #[test]
    fn test_simple_assignments() {
        let grammar = grammar().unwrap();
        let outcome = parse_str(&grammar, grammar.root(ROOT).unwrap(), "a=1;b=2;");
        assert!(outcome.is_ok(), "{}", outcome.summary);
        let bindings = bindings(&outcome);
        assert_eq!(bindings.get("a"), Some(&Value::Number(1)));
        assert_eq!(bindings.get("b"), Some(&Value::Number(2)));
    }

    #[test]
    fn test_comments_and_string_escapes() {
        let grammar = grammar().unwrap();
        let input = "/* lead */ greeting = \"say \\\"hi\\\"\" ;\n/* a*b */ n=42;";
        let outcome = parse_str(&grammar, grammar.root(ROOT).unwrap(), input);
        assert!(outcome.is_ok(), "{}", outcome.summary);
        let bindings = bindings(&outcome);
        assert_eq!(bindings.get("greeting"), Some(&Value::Str("say \"hi\"".into())));
        assert_eq!(bindings.get("n"), Some(&Value::Number(42)));
    }

    #[test]
    fn test_unterminated_string_is_incomplete() {
        let grammar = grammar().unwrap();
        let outcome = parse_str(&grammar, grammar.root(ROOT).unwrap(), "a = \"some value");
        let record = outcome.summary.find(ErrorCode::IncompleteNode).unwrap();
        assert_eq!(record.position, Some(InputPosition::new(1, 5, 4)));
        assert_eq!(record.message, "incomplete node `string-literal`");
    }

    #[test]
    fn test_application_errors() {
        let grammar = grammar().unwrap();
        let root = grammar.root(ROOT).unwrap();

        let outcome = parse_str(&grammar, root, "a = \"x\\qy\";");
        let record = outcome.summary.find(GrammarCode::InvalidEscape).unwrap();
        assert_eq!(record.position, Some(InputPosition::new(1, 5, 4)));

        let outcome = parse_str(&grammar, root, "big = 99999999999999999999;");
        assert!(outcome.summary.find(GrammarCode::NumberOverflow).is_some());
        assert_eq!(bindings(&outcome).get("big"), None);

        let outcome = parse_str(&grammar, root, "a = 1;\na = 2;");
        let record = outcome.summary.find(GrammarCode::DuplicateIdentifier).unwrap();
        assert_eq!(record.position, Some(InputPosition::new(2, 1, 7)));
        assert_eq!(bindings(&outcome).get("a"), Some(&Value::Number(1)));
    }
}
