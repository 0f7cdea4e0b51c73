//! Reference-counted pool of parse nodes.
//!
//! Parse nodes form a graph through owning edges: `parent` (the enclosing grammar frame), `prev` (the
//! previously matched character) and, for tree-worthy nodes, `repeat_of` (the previous repetition, until
//! it got its syntax node). Every edge holds one reference. A node whose count drops to zero releases its
//! edges and its slot goes back to the free list; slots are reused on the next allocation.
//! Handles carry the slot version so a stale handle is caught in debug builds.

use crate::ast::AstId;
use crate::grammar::NodeId;
use crate::position::InputPosition;

/// Handle of a live parse node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct ParseRef {
    index: u32,
    version: u32,
}

/// One attempt to match one grammar node at one position.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ParseNode {
    pub grammar: NodeId,
    pub parent: Option<ParseRef>,
    pub prev: Option<ParseRef>,
    /// Previous repetition of the same tree-worthy node, whose syntax node this one continues.
    pub repeat_of: Option<ParseRef>,
    /// Ancestor whose completion this node's completion amounts to, when every frame in between only
    /// passes completion on. Not an owning edge: ancestors outlive the node through `parent`.
    pub through: Option<ParseRef>,
    /// Index of the grammar node among its parent's children.
    pub slot: u32,
    /// Repetitions completed before this one.
    pub count: u32,
    /// Position of the matched character, or of the character being processed when the frame was
    /// created. Its offset doubles as the generation stamp.
    pub start: InputPosition,
    pub ch: Option<char>,
    pub ast: Option<AstId>,
    pub committed: bool,
}

impl ParseNode {
    pub fn new(grammar: NodeId, parent: Option<ParseRef>, slot: u32, count: u32, start: InputPosition) -> Self {
        Self {
            grammar,
            parent,
            prev: None,
            repeat_of: None,
            through: None,
            slot,
            count,
            start,
            ch: None,
            ast: None,
            committed: false,
        }
    }

    pub fn generation(&self) -> usize {
        self.start.offset
    }
}

#[derive(Debug)]
struct Slot {
    version: u32,
    refs: u32,
    node: ParseNode,
}

#[derive(Debug, Default)]
pub(crate) struct NodePool {
    slots: Vec<Slot>,
    free: Vec<u32>,
    live: usize,
}

impl NodePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `node` with one reference held by the caller. Its edges are retained.
    pub fn alloc(&mut self, node: ParseNode) -> ParseRef {
        if let Some(parent) = node.parent {
            self.retain(parent);
        }
        if let Some(prev) = node.prev {
            self.retain(prev);
        }
        if let Some(previous) = node.repeat_of {
            self.retain(previous);
        }
        self.live += 1;
        match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.refs = 1;
                slot.node = node;
                ParseRef {
                    index,
                    version: slot.version,
                }
            }
            None => {
                let index = u32::try_from(self.slots.len()).expect("INVARIANT: parse node pool exceeds u32 slots");
                self.slots.push(Slot {
                    version: 0,
                    refs: 1,
                    node,
                });
                ParseRef { index, version: 0 }
            }
        }
    }

    fn slot(&self, r: ParseRef) -> &Slot {
        let slot = &self.slots[r.index as usize];
        debug_assert!(slot.version == r.version && slot.refs > 0, "stale parse node handle {r:?}");
        slot
    }

    fn slot_mut(&mut self, r: ParseRef) -> &mut Slot {
        let slot = &mut self.slots[r.index as usize];
        debug_assert!(slot.version == r.version && slot.refs > 0, "stale parse node handle {r:?}");
        slot
    }

    pub fn get(&self, r: ParseRef) -> &ParseNode {
        &self.slot(r).node
    }

    pub fn get_mut(&mut self, r: ParseRef) -> &mut ParseNode {
        &mut self.slot_mut(r).node
    }

    pub fn retain(&mut self, r: ParseRef) {
        self.slot_mut(r).refs += 1;
    }

    /// Drop one reference; nodes reaching zero release their own edges.
    pub fn release(&mut self, r: ParseRef) {
        let mut pending = vec![r];
        while let Some(r) = pending.pop() {
            let slot = self.slot_mut(r);
            slot.refs -= 1;
            if slot.refs > 0 {
                continue;
            }
            slot.version = slot.version.wrapping_add(1);
            let node = slot.node;
            pending.extend(node.parent);
            pending.extend(node.prev);
            pending.extend(node.repeat_of);
            self.free.push(r.index);
            self.live -= 1;
        }
    }

    /// Detach the `prev` edge of `r`, handing its reference to the caller.
    pub fn take_prev(&mut self, r: ParseRef) -> Option<ParseRef> {
        self.get_mut(r).prev.take()
    }

    /// Detach the `repeat_of` edge of `r`, handing its reference to the caller.
    pub fn take_repeat_of(&mut self, r: ParseRef) -> Option<ParseRef> {
        self.get_mut(r).repeat_of.take()
    }

    /// Number of live nodes.
    pub fn live(&self) -> usize {
        self.live
    }

    /// Number of slots ever allocated.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
}
