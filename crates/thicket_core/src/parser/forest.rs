//! The parse forest: every live branch advanced one character at a time.
//!
//! A branch is represented by its terminal, the character node that matched the last input character.
//! Its parent chain describes the grammar frames it is nested in, its `prev` chain the characters matched
//! before it. Advancing a terminal first completes it, which either repeats it, opens the next sibling
//! of its sequence or completes the parent, and so on up the chain; every path that ends in a character
//! node matching the input becomes a terminal of the next step.

use super::pool::{NodePool, ParseNode, ParseRef};
use crate::grammar::{CompiledGrammar, GrammarNodeKind, NodeId, Quantity};
use crate::position::InputPosition;

pub(crate) struct Forest<'g> {
    grammar: &'g CompiledGrammar,
    root: NodeId,
    pub(crate) pool: NodePool,
    /// Terminals of the last accepted step.
    terminals: Vec<ParseRef>,
    /// Terminals being collected for the current step.
    next: Vec<ParseRef>,
    /// Complete parses found at end of input, identified by their last character node.
    accepted: Vec<Option<ParseRef>>,
    started: bool,
    /// Character being processed, `None` at end of input.
    input: Option<char>,
    position: InputPosition,
    /// Terminal currently being advanced; becomes the `prev` of every new terminal.
    prev: Option<ParseRef>,
    /// Pending work of the current walk.
    tasks: Vec<Task>,
}

/// One step of the depth-first walk over grammar frames.
///
/// Tasks run last in first out, so a handler pushes its follow-ups in reverse order. A frame's
/// `Release` sits below everything scheduled under it and keeps the frame alive until its subtree is
/// done. Parent chains grow with the input, so the walk keeps this stack on the heap.
#[derive(Debug, Clone, Copy)]
enum Task {
    Enter {
        id: NodeId,
        parent: Option<ParseRef>,
        slot: usize,
        count: u32,
        previous: Option<ParseRef>,
    },
    EnterChild {
        parent: ParseRef,
        slot: usize,
    },
    EnterSlot {
        sequence: ParseRef,
        slot: usize,
    },
    ChildDone {
        parent: ParseRef,
        slot: usize,
    },
    Complete(ParseRef),
    Release(ParseRef),
    Accept,
}

impl<'g> Forest<'g> {
    pub fn new(grammar: &'g CompiledGrammar, root: NodeId) -> Self {
        Self {
            grammar,
            root,
            pool: NodePool::new(),
            terminals: Vec::new(),
            next: Vec::new(),
            accepted: Vec::new(),
            started: false,
            input: None,
            position: InputPosition::START,
            prev: None,
            tasks: Vec::new(),
        }
    }

    pub fn terminals(&self) -> &[ParseRef] {
        &self.terminals
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Advance every branch over `c`. Returns the number of surviving branches; the caller then either
    /// accepts or rejects the step.
    pub fn step(&mut self, c: char, position: InputPosition) -> usize {
        self.advance(Some(c), position);
        self.next.len()
    }

    /// Make the terminals of the current step the live branch set.
    pub fn accept_step(&mut self) {
        std::mem::swap(&mut self.terminals, &mut self.next);
        for r in self.next.drain(..) {
            self.pool.release(r);
        }
        self.started = true;
    }

    /// Discard the terminals of the current step, keeping the previous branch set.
    pub fn reject_step(&mut self) {
        for r in self.next.drain(..) {
            self.pool.release(r);
        }
    }

    /// Complete every branch at end of input. Returns the complete parses, each identified by its last
    /// character node (`None` for a parse of the empty input).
    pub fn finish(&mut self, position: InputPosition) -> &[Option<ParseRef>] {
        self.advance(None, position);
        debug_assert!(self.next.is_empty());
        &self.accepted
    }

    /// Release every node still held by the forest.
    pub fn clear(&mut self) {
        for r in self.terminals.drain(..).chain(self.next.drain(..)) {
            self.pool.release(r);
        }
        for r in self.accepted.drain(..).flatten() {
            self.pool.release(r);
        }
        self.prev = None;
    }

    fn advance(&mut self, input: Option<char>, position: InputPosition) {
        self.input = input;
        self.position = position;
        if self.started {
            let terminals = std::mem::take(&mut self.terminals);
            for &t in &terminals {
                self.prev = Some(t);
                self.run(Task::Complete(t));
            }
            self.terminals = terminals;
        } else {
            self.prev = None;
            self.run(Task::Enter {
                id: self.root,
                parent: None,
                slot: 0,
                count: 0,
                previous: None,
            });
            if self.grammar[self.root].quantity.min == 0 {
                self.accept();
            }
        }
        self.prev = None;
    }

    /// Process `task` and everything it schedules.
    fn run(&mut self, task: Task) {
        self.tasks.push(task);
        while let Some(task) = self.tasks.pop() {
            match task {
                Task::Enter {
                    id,
                    parent,
                    slot,
                    count,
                    previous,
                } => self.enter(id, parent, slot, count, previous),
                Task::EnterChild { parent, slot } => self.enter_child(parent, slot),
                Task::EnterSlot { sequence, slot } => self.enter_slot(sequence, slot),
                Task::ChildDone { parent, slot } => self.child_done(parent, slot),
                Task::Complete(r) => self.complete(r),
                Task::Release(r) => self.pool.release(r),
                Task::Accept => self.accept(),
            }
        }
    }

    /// Start one repetition of grammar node `id` as child `slot` of `parent`, `count` repetitions done.
    /// `previous` is the repetition before this one, if any.
    fn enter(&mut self, id: NodeId, parent: Option<ParseRef>, slot: usize, count: u32, previous: Option<ParseRef>) {
        let grammar = self.grammar;
        let node = &grammar[id];
        if let Some(precedence) = &node.precedence {
            if !self.precedence_allows(&precedence.group, precedence.value, parent, slot) {
                return;
            }
        }

        let slot32 = u32::try_from(slot).expect("INVARIANT: child slot fits in u32");
        let mut parse_node = ParseNode::new(id, parent, slot32, count, self.position);
        if let Some(parent) = parent.filter(|&p| node.quantity == Quantity::ONCE && self.is_last_slot(p, slot)) {
            parse_node.through = Some(self.pool.get(parent).through.unwrap_or(parent));
        }
        // all repetitions of a tree-worthy node share one syntax node
        if let Some(previous) = previous.filter(|_| node.val.is_some()) {
            match self.pool.get(previous).ast {
                Some(ast) => parse_node.ast = Some(ast),
                None => parse_node.repeat_of = Some(previous),
            }
        }
        match &node.kind {
            GrammarNodeKind::Char(matcher) => {
                let Some(c) = self.input.filter(|&c| matcher.matches(c)) else {
                    return;
                };
                parse_node.ch = Some(c);
                parse_node.prev = self.prev;
                let r = self.pool.alloc(parse_node);
                self.next.push(r);
            }
            GrammarNodeKind::Sequence(_) => {
                let r = self.pool.alloc(parse_node);
                self.tasks.push(Task::Release(r));
                self.tasks.push(Task::EnterSlot { sequence: r, slot: 0 });
            }
            GrammarNodeKind::Alternative(children) => {
                let r = self.pool.alloc(parse_node);
                self.tasks.push(Task::Release(r));
                for slot in (0..children.len()).rev() {
                    self.tasks.push(Task::EnterChild { parent: r, slot });
                }
            }
        }
    }

    fn enter_child(&mut self, parent: ParseRef, slot: usize) {
        let grammar = self.grammar;
        let child = grammar[self.pool.get(parent).grammar].children()[slot];
        if grammar[child].quantity.min == 0 {
            self.tasks.push(Task::ChildDone { parent, slot });
        }
        self.tasks.push(Task::Enter {
            id: child,
            parent: Some(parent),
            slot,
            count: 0,
            previous: None,
        });
    }

    fn enter_slot(&mut self, sequence: ParseRef, slot: usize) {
        let len = self.grammar[self.pool.get(sequence).grammar].children().len();
        if slot == len {
            self.tasks.push(Task::Complete(sequence));
        } else {
            self.tasks.push(Task::EnterChild { parent: sequence, slot });
        }
    }

    /// Child `slot` of `parent` finished a valid number of repetitions.
    fn child_done(&mut self, parent: ParseRef, slot: usize) {
        let grammar = self.grammar;
        match grammar[self.pool.get(parent).grammar].kind {
            GrammarNodeKind::Sequence(_) => self.tasks.push(Task::EnterSlot {
                sequence: parent,
                slot: slot + 1,
            }),
            GrammarNodeKind::Alternative(_) => self.tasks.push(Task::Complete(parent)),
            GrammarNodeKind::Char(_) => debug_assert!(false, "character node used as a parent"),
        }
    }

    /// Whether finishing child `slot` of `parent` finishes `parent`'s repetition.
    fn is_last_slot(&self, parent: ParseRef, slot: usize) -> bool {
        match &self.grammar[self.pool.get(parent).grammar].kind {
            GrammarNodeKind::Sequence(children) => slot + 1 == children.len(),
            GrammarNodeKind::Alternative(_) => true,
            GrammarNodeKind::Char(_) => false,
        }
    }

    /// `r` finished one repetition.
    fn complete(&mut self, r: ParseRef) {
        // a node occurring exactly once in the last slot completes together with its parent
        let r = self.pool.get(r).through.unwrap_or(r);
        let node = *self.pool.get(r);
        let grammar_node = &self.grammar[node.grammar];
        let quantity = grammar_node.quantity;
        let done = node.count + 1;
        let empty = !grammar_node.is_char() && node.start.offset == self.position.offset;

        // an empty repetition only counts when it is needed to reach the minimum
        if empty && node.count >= quantity.min {
            return;
        }
        if done >= quantity.min || empty {
            match node.parent {
                Some(parent) => self.tasks.push(Task::ChildDone {
                    parent,
                    slot: node.slot as usize,
                }),
                None => self.tasks.push(Task::Accept),
            }
        }
        if !empty && quantity.allows_more(done) {
            self.tasks.push(Task::Enter {
                id: node.grammar,
                parent: node.parent,
                slot: node.slot as usize,
                count: done,
                previous: Some(r),
            });
        }
    }

    fn accept(&mut self) {
        if self.input.is_some() {
            return;
        }
        if let Some(prev) = self.prev {
            self.pool.retain(prev);
        }
        self.accepted.push(self.prev);
    }

    /// Decide whether a node of precedence `value` in `group` may open under `parent`.
    ///
    /// Walking up the ancestors, the new node is either still in the leftmost position created at the
    /// same character (a left-recursive re-entry) or in the tail position of the ancestors seen so far
    /// (a right operand). The first ancestor of the same group then decides: a left re-entry needs a
    /// strictly higher precedence, a right operand at least the same. Anything else is unrelated to the
    /// ancestor and allowed.
    fn precedence_allows(&self, group: &str, value: u32, parent: Option<ParseRef>, slot: usize) -> bool {
        let mut same_generation = true;
        let mut tail = true;
        let mut slot = slot;
        let mut current = parent;
        while let Some(r) = current {
            let ancestor = self.pool.get(r);
            let grammar_node = &self.grammar[ancestor.grammar];
            if let GrammarNodeKind::Sequence(children) = &grammar_node.kind {
                tail &= slot + 1 == children.len();
            }
            same_generation &= ancestor.generation() == self.position.offset;
            if !same_generation && !tail {
                return true;
            }
            if let Some(precedence) = grammar_node.precedence.as_ref().filter(|p| &*p.group == group) {
                return if same_generation {
                    value > precedence.value
                } else {
                    value >= precedence.value
                };
            }
            slot = ancestor.slot as usize;
            current = ancestor.parent;
        }
        true
    }
}
