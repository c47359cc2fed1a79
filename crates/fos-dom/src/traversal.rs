//! NodeIterator
//!
//! Iterators are owned by the document registry so removals can fix up
//! their reference nodes. Only a bounded number stay working at once:
//! creating one more retires the oldest.

use std::collections::{HashMap, VecDeque};

use crate::{DomError, DomTree, NodeId};

/// `NodeFilter.SHOW_*` bitmask
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WhatToShow(pub u32);

impl WhatToShow {
    pub const ALL: Self = Self(0xFFFF_FFFF);
    pub const ELEMENT: Self = Self(0x1);
    pub const TEXT: Self = Self(0x4);
    pub const PROCESSING_INSTRUCTION: Self = Self(0x40);
    pub const COMMENT: Self = Self(0x80);
    pub const DOCUMENT: Self = Self(0x100);
    pub const DOCUMENT_TYPE: Self = Self(0x200);

    fn accepts(self, tree: &DomTree, id: NodeId) -> bool {
        tree.get(id).is_some_and(|node| {
            let bit = 1u32 << (node.node_type() as u16 - 1);
            self.0 & bit != 0
        })
    }
}

impl std::ops::BitOr for WhatToShow {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

/// Handle of a registered iterator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeIteratorId(u64);

#[derive(Debug, Clone)]
struct NodeIteratorState {
    root: NodeId,
    reference: NodeId,
    pointer_before_reference: bool,
    what_to_show: WhatToShow,
    working: bool,
}

/// Next node in preorder within `root`
fn following(tree: &DomTree, node: NodeId, root: NodeId) -> Option<NodeId> {
    tree.first_child(node)
        .or_else(|| following_skipping_children(tree, node, root))
}

/// Next node in preorder within `root`, not descending into `node`
fn following_skipping_children(tree: &DomTree, node: NodeId, root: NodeId) -> Option<NodeId> {
    let mut cursor = node;
    loop {
        if cursor == root {
            return None;
        }
        if let Some(sibling) = tree.next_sibling(cursor) {
            return Some(sibling);
        }
        cursor = tree.parent(cursor)?;
    }
}

/// Last inclusive descendant of `node` in preorder
fn last_inclusive_descendant(tree: &DomTree, node: NodeId) -> NodeId {
    let mut cursor = node;
    while let Some(last) = tree.last_child(cursor) {
        cursor = last;
    }
    cursor
}

/// Previous node in preorder within `root`
fn preceding(tree: &DomTree, node: NodeId, root: NodeId) -> Option<NodeId> {
    if node == root {
        return None;
    }
    match tree.previous_sibling(node) {
        Some(prev) => Some(last_inclusive_descendant(tree, prev)),
        None => tree.parent(node),
    }
}

/// Registry of iterators for one document
#[derive(Debug)]
pub struct NodeIterators {
    states: HashMap<NodeIteratorId, NodeIteratorState>,
    working: VecDeque<NodeIteratorId>,
    limit: usize,
    next_id: u64,
}

impl NodeIterators {
    pub fn new(limit: usize) -> Self {
        Self {
            states: HashMap::new(),
            working: VecDeque::new(),
            limit: limit.max(1),
            next_id: 0,
        }
    }

    /// Register a new iterator, retiring the oldest when over the limit
    pub fn create(&mut self, root: NodeId, what_to_show: WhatToShow) -> NodeIteratorId {
        self.next_id += 1;
        let id = NodeIteratorId(self.next_id);
        self.states.insert(
            id,
            NodeIteratorState {
                root,
                reference: root,
                pointer_before_reference: true,
                what_to_show,
                working: true,
            },
        );
        self.working.push_back(id);

        while self.working.len() > self.limit {
            if let Some(oldest) = self.working.pop_front() {
                tracing::trace!(iterator = oldest.0, "Retiring node iterator");
                if let Some(state) = self.states.get_mut(&oldest) {
                    state.working = false;
                }
            }
        }
        id
    }

    fn state_mut(&mut self, id: NodeIteratorId) -> Result<&mut NodeIteratorState, DomError> {
        let limit = self.limit;
        let state = self
            .states
            .get_mut(&id)
            .ok_or_else(|| DomError::InvalidState("Unknown NodeIterator".into()))?;
        if !state.working {
            return Err(DomError::InvalidState(format!(
                "This NodeIterator is no longer working. More than {limit} iterators are being \
                 used concurrently. Increase the concurrent node iterator limit to avoid this."
            )));
        }
        Ok(state)
    }

    /// `nextNode()`
    pub fn next_node(&mut self, tree: &DomTree, id: NodeIteratorId) -> Result<Option<NodeId>, DomError> {
        self.traverse(tree, id, true)
    }

    /// `previousNode()`
    pub fn previous_node(
        &mut self,
        tree: &DomTree,
        id: NodeIteratorId,
    ) -> Result<Option<NodeId>, DomError> {
        self.traverse(tree, id, false)
    }

    fn traverse(
        &mut self,
        tree: &DomTree,
        id: NodeIteratorId,
        forward: bool,
    ) -> Result<Option<NodeId>, DomError> {
        let state = self.state_mut(id)?;
        let mut node = state.reference;
        let mut before = state.pointer_before_reference;

        loop {
            if forward {
                if before {
                    before = false;
                } else {
                    match following(tree, node, state.root) {
                        Some(next) => node = next,
                        None => return Ok(None),
                    }
                }
            } else if before {
                match preceding(tree, node, state.root) {
                    Some(prev) => node = prev,
                    None => return Ok(None),
                }
            } else {
                before = true;
            }

            if state.what_to_show.accepts(tree, node) {
                break;
            }
        }

        state.reference = node;
        state.pointer_before_reference = before;
        Ok(Some(node))
    }

    /// Reference node and pointer flag of an iterator
    pub fn position(&self, id: NodeIteratorId) -> Option<(NodeId, bool)> {
        self.states
            .get(&id)
            .map(|s| (s.reference, s.pointer_before_reference))
    }

    /// Number of iterators still working
    pub fn working_len(&self) -> usize {
        self.working.len()
    }

    /// DOM "pre-removing steps": run before `to_be_removed` is detached
    pub fn pre_remove(&mut self, tree: &DomTree, to_be_removed: NodeId) {
        for state in self.states.values_mut().filter(|s| s.working) {
            if to_be_removed == state.root || !tree.is_inclusive_ancestor(to_be_removed, state.reference) {
                continue;
            }

            if state.pointer_before_reference {
                if let Some(next) = following_skipping_children(tree, to_be_removed, state.root) {
                    state.reference = next;
                    continue;
                }
                state.pointer_before_reference = false;
            }

            state.reference = match tree.previous_sibling(to_be_removed) {
                Some(prev) => last_inclusive_descendant(tree, prev),
                None => tree.parent(to_be_removed).unwrap_or(state.root),
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ns, ElementData, ElementInterface};

    fn build() -> (DomTree, NodeId, Vec<NodeId>) {
        let mut tree = DomTree::new();
        let root = tree.create_element(ElementData::new(Some(ns::HTML), None, "div", ElementInterface::HtmlDiv));
        let mut kids = Vec::new();
        for text in ["a", "b", "c"] {
            let t = tree.create_text(text);
            tree.append_child(root, t).unwrap();
            kids.push(t);
        }
        (tree, root, kids)
    }

    #[test]
    fn test_forward_and_backward() {
        let (tree, root, kids) = build();
        let mut iters = NodeIterators::new(10);
        let it = iters.create(root, WhatToShow::ALL);

        assert_eq!(iters.next_node(&tree, it).unwrap(), Some(root));
        assert_eq!(iters.next_node(&tree, it).unwrap(), Some(kids[0]));
        assert_eq!(iters.next_node(&tree, it).unwrap(), Some(kids[1]));
        assert_eq!(iters.previous_node(&tree, it).unwrap(), Some(kids[1]));
        assert_eq!(iters.previous_node(&tree, it).unwrap(), Some(kids[0]));
    }

    #[test]
    fn test_what_to_show_filters() {
        let (tree, root, kids) = build();
        let mut iters = NodeIterators::new(10);
        let it = iters.create(root, WhatToShow::TEXT);
        let seen: Vec<_> = std::iter::from_fn(|| iters.next_node(&tree, it).unwrap()).collect();
        assert_eq!(seen, kids);
    }

    #[test]
    fn test_removal_updates_reference() {
        let (mut tree, root, kids) = build();
        let mut iters = NodeIterators::new(10);
        let it = iters.create(root, WhatToShow::TEXT);
        assert_eq!(iters.next_node(&tree, it).unwrap(), Some(kids[0]));
        assert_eq!(iters.next_node(&tree, it).unwrap(), Some(kids[1]));

        iters.pre_remove(&tree, kids[1]);
        tree.remove_child(root, kids[1]).unwrap();
        assert_eq!(iters.position(it), Some((kids[0], false)));
        assert_eq!(iters.next_node(&tree, it).unwrap(), Some(kids[2]));
    }

    #[test]
    fn test_oldest_iterator_retired() {
        let (tree, root, _) = build();
        let mut iters = NodeIterators::new(2);
        let first = iters.create(root, WhatToShow::ALL);
        let _second = iters.create(root, WhatToShow::ALL);
        let third = iters.create(root, WhatToShow::ALL);

        assert_eq!(iters.working_len(), 2);
        assert_eq!(iters.next_node(&tree, first).unwrap_err().name(), "InvalidStateError");
        assert!(iters.next_node(&tree, third).is_ok());
    }
}
