//! Assignments of integer expressions, evaluated top to bottom.
//!
//! ```text
//! file       = gap? (statement gap?)*
//! statement  = identifier gap? '=' gap? expression gap? ';'
//! expression = identifier | number-literal
//!            | (expression gap? '+' gap? expression) @arith:1
//!            | (expression gap? '*' gap? expression) @arith:2
//! ```
//!
//! Multiplication binds tighter than addition through the `arith` precedence group, so the grammar stays
//! left-recursive without ambiguity. The `file` node is tagged with the [`Evaluation`] of all statements.

use std::collections::HashMap;

use thicket_core::grammar::TagFactory;
use thicket_core::prelude::*;
use thicket_core::{GrammarError, InputPosition};
use thiserror::Error;

use super::GrammarCode;

pub const ROOT: &str = "file";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Number(i64),
    Variable { name: String, position: InputPosition },
    Sum(Box<Expr>, Box<Expr>),
    Product(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("unknown variable `{name}`")]
    UnknownVariable { name: String, position: InputPosition },
    #[error("arithmetic overflow")]
    Overflow,
}

impl EvalError {
    fn code(&self) -> GrammarCode {
        match self {
            EvalError::UnknownVariable { .. } => GrammarCode::UnknownVariable,
            EvalError::Overflow => GrammarCode::ArithmeticOverflow,
        }
    }
}

enum Step<'a> {
    Visit(&'a Expr),
    Add,
    Multiply,
}

impl Expr {
    /// Evaluate left to right, stopping at the first error. Operands are kept on explicit stacks, so
    /// chains of any length evaluate.
    pub fn eval(&self, env: &HashMap<String, i64>) -> Result<i64, EvalError> {
        let mut steps = vec![Step::Visit(self)];
        let mut values: Vec<i64> = Vec::new();
        while let Some(step) = steps.pop() {
            let value = match step {
                Step::Visit(Expr::Number(n)) => *n,
                Step::Visit(Expr::Variable { name, position }) => {
                    env.get(name).copied().ok_or_else(|| EvalError::UnknownVariable {
                        name: name.clone(),
                        position: *position,
                    })?
                }
                Step::Visit(Expr::Sum(a, b)) => {
                    steps.extend([Step::Add, Step::Visit(&**b), Step::Visit(&**a)]);
                    continue;
                }
                Step::Visit(Expr::Product(a, b)) => {
                    steps.extend([Step::Multiply, Step::Visit(&**b), Step::Visit(&**a)]);
                    continue;
                }
                Step::Add | Step::Multiply => {
                    let rhs = values.pop().expect("INVARIANT: operator follows both operands");
                    let lhs = values.pop().expect("INVARIANT: operator follows both operands");
                    let result = match step {
                        Step::Add => lhs.checked_add(rhs),
                        _ => lhs.checked_mul(rhs),
                    };
                    result.ok_or(EvalError::Overflow)?
                }
            };
            values.push(value);
        }
        Ok(values.pop().expect("INVARIANT: evaluation leaves one value"))
    }

    fn take_operands(&mut self, out: &mut Vec<Expr>) {
        if let Expr::Sum(a, b) | Expr::Product(a, b) = self {
            out.push(std::mem::replace(&mut **a, Expr::Number(0)));
            out.push(std::mem::replace(&mut **b, Expr::Number(0)));
        }
    }
}

impl Drop for Expr {
    fn drop(&mut self) {
        let mut pending = Vec::new();
        self.take_operands(&mut pending);
        while let Some(mut expr) = pending.pop() {
            expr.take_operands(&mut pending);
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assignment {
    pub name: String,
    pub expr: Expr,
    pub position: InputPosition,
}

/// Values of all successfully evaluated assignments, in input order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Evaluation {
    pub values: Vec<(String, i64)>,
}

impl Evaluation {
    pub fn get(&self, name: &str) -> Option<i64> {
        self.values.iter().rev().find(|(n, _)| n == name).map(|(_, v)| *v)
    }
}

fn binary(make: fn(Box<Expr>, Box<Expr>) -> Expr) -> TagFactory {
    tag_factory(move |cx, _| {
        let lhs = cx.take_child_tag::<Expr>(0)?;
        let rhs = cx.take_child_tag::<Expr>(1)?;
        Some(Box::new(make(lhs, rhs)))
    })
}

pub fn grammar() -> Result<CompiledGrammar, Vec<GrammarError>> {
    let identifier = tag_factory(|cx, _| {
        let name = cx.text()?.to_string();
        Some(Box::new(Expr::Variable {
            name,
            position: cx.start(),
        }))
    });
    let number_literal = tag_factory(|cx, summary| {
        let text = cx.text()?;
        match text.parse::<i64>() {
            Ok(n) => Some(Box::new(Expr::Number(n))),
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
        let expr = cx.take_child_tag::<Expr>(1)?;
        Some(Box::new(Assignment {
            name,
            expr: *expr,
            position,
        }))
    });
    let file = tag_factory(|cx, summary| {
        let mut env = HashMap::new();
        let mut evaluation = Evaluation::default();
        for index in 0..cx.children().len() {
            let Some(assignment) = cx.take_child_tag::<Assignment>(index) else {
                continue;
            };
            match assignment.expr.eval(&env) {
                Ok(value) => {
                    env.insert(assignment.name.clone(), value);
                    evaluation.values.push((assignment.name, value));
                }
                Err(err) => {
                    let position = match &err {
                        EvalError::UnknownVariable { position, .. } => *position,
                        EvalError::Overflow => assignment.position,
                    };
                    summary.error(Some(position), Some(err.code().into()), err.to_string());
                }
            }
        }
        Some(Box::new(evaluation))
    });

    let mut g = Grammar::new();
    g.node("digit").def(Node::range('0', '9'));
    g.node("alphabetic").def(Node::range('a', 'z').include_range('A', 'Z'));
    g.node("gap").def(Node::one_of(" \t\r\n").one_or_many());

    g.node("identifier")
        .sequence([
            Node::any([Node::reference("alphabetic"), Node::char('_')]),
            Node::any([Node::reference("alphabetic"), Node::char('_'), Node::reference("digit")]).none_or_many(),
        ])
        .val_with(identifier, true);
    g.node("number-literal")
        .sequence([Node::char('-').optional(), Node::reference("digit").one_or_many()])
        .val_with(number_literal, true);

    let operator = |op: char| {
        Node::sequence([
            Node::reference("expression"),
            Node::reference("gap").optional(),
            Node::char(op),
            Node::reference("gap").optional(),
            Node::reference("expression"),
        ])
    };
    g.node("expression").any([
        Node::reference("identifier"),
        Node::reference("number-literal"),
        operator('+').name("sum").precedence("arith", 1).val_with(binary(Expr::Sum), false),
        operator('*').name("product").precedence("arith", 2).val_with(binary(Expr::Product), false),
    ]);

    g.node("statement")
        .sequence([
            Node::reference("identifier"),
            Node::reference("gap").optional(),
            Node::char('='),
            Node::reference("gap").optional(),
            Node::reference("expression"),
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
