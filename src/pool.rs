//! Node pool: recycles row and cell nodes between render passes.
//!
//! Nodes live in a generational slab and are addressed by [`NodeId`]. The pool
//! exclusively owns free nodes; a renderer owns in-use nodes for the duration
//! of a pass and hands them back with [`NodePool::release`]. Allocation is
//! bounded by the high-water mark of simultaneously visible nodes.

use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Row,
    Cell,
    Tile,
}

/// Handle to a pooled node. A handle goes stale when its node is released;
/// the slot's next occupant gets a new handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId {
    index: u32,
    generation: u32,
}

/// A headless element: text, attributes, children.
#[derive(Debug, Clone, PartialEq)]
pub struct RowNode {
    kind: NodeKind,
    pub text: String,
    pub attributes: BTreeMap<String, String>,
    children: Vec<NodeId>,
    parent: Option<NodeId>,
    attached: bool,
}

impl RowNode {
    fn empty(kind: NodeKind) -> Self {
        Self {
            kind,
            text: String::new(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            parent: None,
            attached: false,
        }
    }

    fn reset(&mut self) {
        self.text.clear();
        self.attributes.clear();
        self.children.clear();
        self.parent = None;
        self.attached = false;
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        self.attributes.insert(name.to_string(), value.into());
    }
}

enum SlotState {
    InUse(RowNode),
    Free(RowNode),
    Vacant,
}

struct Slot {
    generation: u32,
    state: SlotState,
}

pub struct NodePool {
    slots: Vec<Slot>,
    /// Free slot indices per kind
    free: HashMap<NodeKind, Vec<u32>>,
    /// Discarded slot indices available for new nodes
    vacant: Vec<u32>,
    in_use: usize,
    high_water_mark: usize,
    created: usize,
}

impl NodePool {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: HashMap::new(),
            vacant: Vec::new(),
            in_use: 0,
            high_water_mark: 0,
            created: 0,
        }
    }

    /// Returns a free node of `kind`, constructing one if none is available.
    /// The node comes back empty and detached.
    pub fn acquire(&mut self, kind: NodeKind) -> NodeId {
        let reused = self.free.get_mut(&kind).and_then(Vec::pop);

        let id = match reused {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                let state = std::mem::replace(&mut slot.state, SlotState::Vacant);
                slot.state = match state {
                    SlotState::Free(node) => SlotState::InUse(node),
                    // Free lists only ever hold free slots.
                    _ => SlotState::InUse(RowNode::empty(kind)),
                };
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => self.construct(kind),
        };

        self.in_use += 1;
        self.high_water_mark = self.high_water_mark.max(self.in_use);
        id
    }

    fn construct(&mut self, kind: NodeKind) -> NodeId {
        self.created += 1;
        match self.vacant.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.state = SlotState::InUse(RowNode::empty(kind));
                NodeId {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = self.slots.len() as u32;
                self.slots.push(Slot {
                    generation: 0,
                    state: SlotState::InUse(RowNode::empty(kind)),
                });
                NodeId { index, generation: 0 }
            }
        }
    }

    /// Detaches a node (and its children), clears it, and marks it free.
    ///
    /// Releasing a node that is already free, discarded, or unknown is a no-op.
    pub fn release(&mut self, id: NodeId) {
        let (kind, children, parent) = match self.node_mut(id) {
            Some(node) => (
                node.kind,
                std::mem::take(&mut node.children),
                node.parent.take(),
            ),
            None => return,
        };

        if let Some(parent_id) = parent {
            if let Some(parent_node) = self.node_mut(parent_id) {
                parent_node.children.retain(|child| *child != id);
            }
        }

        for child in children {
            if let Some(child_node) = self.node_mut(child) {
                child_node.parent = None;
            }
            self.release(child);
        }

        let slot = &mut self.slots[id.index as usize];
        match std::mem::replace(&mut slot.state, SlotState::Vacant) {
            SlotState::InUse(mut node) => {
                node.reset();
                slot.state = SlotState::Free(node);
                slot.generation = slot.generation.wrapping_add(1);
                self.free.entry(kind).or_default().push(id.index);
                self.in_use -= 1;
            }
            other => slot.state = other,
        }
    }

    /// Discards every free node. In-use nodes are unaffected.
    pub fn clear(&mut self) {
        for indices in self.free.values_mut() {
            for index in indices.drain(..) {
                let slot = &mut self.slots[index as usize];
                slot.state = SlotState::Vacant;
                slot.generation = slot.generation.wrapping_add(1);
                self.vacant.push(index);
            }
        }
    }

    /// Appends `child` to `parent`, detaching it from any previous parent.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        if parent == child || self.node(parent).is_none() {
            return;
        }
        let previous = match self.node_mut(child) {
            Some(node) => node.parent.replace(parent),
            None => return,
        };
        if let Some(previous) = previous {
            if let Some(node) = self.node_mut(previous) {
                node.children.retain(|c| *c != child);
            }
        }
        if let Some(node) = self.node_mut(child) {
            node.attached = true;
        }
        if let Some(node) = self.node_mut(parent) {
            node.children.push(child);
        }
    }

    pub fn set_attached(&mut self, id: NodeId, attached: bool) {
        if let Some(node) = self.node_mut(id) {
            node.attached = attached;
        }
    }

    /// Borrow an in-use node.
    pub fn node(&self, id: NodeId) -> Option<&RowNode> {
        let slot = self.slots.get(id.index as usize)?;
        match &slot.state {
            SlotState::InUse(node) if slot.generation == id.generation => Some(node),
            _ => None,
        }
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut RowNode> {
        let slot = self.slots.get_mut(id.index as usize)?;
        match &mut slot.state {
            SlotState::InUse(node) if slot.generation == id.generation => Some(node),
            _ => None,
        }
    }

    pub fn is_in_use(&self, id: NodeId) -> bool {
        self.node(id).is_some()
    }

    pub fn free_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    pub fn free_count_of(&self, kind: NodeKind) -> usize {
        self.free.get(&kind).map_or(0, Vec::len)
    }

    pub fn in_use_count(&self) -> usize {
        self.in_use
    }

    pub fn high_water_mark(&self) -> usize {
        self.high_water_mark
    }

    /// Total nodes ever constructed.
    pub fn created_count(&self) -> usize {
        self.created
    }
}

impl Default for NodePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_release_twice_is_idempotent() {
        let mut pool = NodePool::new();
        let row = pool.acquire(NodeKind::Row);

        pool.release(row);
        let after_first = pool.free_count();
        pool.release(row);

        assert_eq!(after_first, 1);
        assert_eq!(pool.free_count(), 1);
        assert_eq!(pool.in_use_count(), 0);
    }

    #[test]
    fn test_acquire_reuses_released_node_cleared() {
        let mut pool = NodePool::new();
        let row = pool.acquire(NodeKind::Row);
        if let Some(node) = pool.node_mut(row) {
            node.text = "Floor plan".into();
            node.set_attr("data-id", "42");
        }
        pool.release(row);

        let again = pool.acquire(NodeKind::Row);
        let node = pool.node(again).unwrap();

        assert_eq!(again.index, row.index);
        assert!(node.text.is_empty());
        assert!(node.attributes.is_empty());
        assert_eq!(pool.created_count(), 1);
    }

    #[test]
    fn test_released_handle_does_not_alias_next_occupant() {
        let mut pool = NodePool::new();
        let row = pool.acquire(NodeKind::Row);
        pool.release(row);
        let again = pool.acquire(NodeKind::Row);

        assert_ne!(again, row);
        assert!(pool.node(row).is_none());
        pool.release(row);
        assert!(pool.is_in_use(again));
        assert_eq!(pool.in_use_count(), 1);
    }

    #[test]
    fn test_kinds_are_pooled_separately() {
        let mut pool = NodePool::new();
        let cell = pool.acquire(NodeKind::Cell);
        pool.release(cell);

        let row = pool.acquire(NodeKind::Row);

        assert_ne!(row, cell);
        assert_eq!(pool.free_count_of(NodeKind::Cell), 1);
    }

    #[test]
    fn test_release_row_releases_children() {
        let mut pool = NodePool::new();
        let row = pool.acquire(NodeKind::Row);
        let a = pool.acquire(NodeKind::Cell);
        let b = pool.acquire(NodeKind::Cell);
        pool.append_child(row, a);
        pool.append_child(row, b);
        assert_eq!(pool.node(row).unwrap().children().len(), 2);

        pool.release(row);

        assert_eq!(pool.in_use_count(), 0);
        assert_eq!(pool.free_count_of(NodeKind::Cell), 2);
        assert_eq!(pool.free_count_of(NodeKind::Row), 1);
    }

    #[test]
    fn test_release_child_detaches_from_parent() {
        let mut pool = NodePool::new();
        let row = pool.acquire(NodeKind::Row);
        let cell = pool.acquire(NodeKind::Cell);
        pool.append_child(row, cell);

        pool.release(cell);

        assert!(pool.node(row).unwrap().children().is_empty());
    }

    #[test]
    fn test_clear_discards_free_nodes_only() {
        let mut pool = NodePool::new();
        let kept = pool.acquire(NodeKind::Row);
        let dropped = pool.acquire(NodeKind::Row);
        pool.release(dropped);

        pool.clear();

        assert_eq!(pool.free_count(), 0);
        assert!(pool.is_in_use(kept));
        // A discarded handle never aliases a new node.
        let fresh = pool.acquire(NodeKind::Row);
        assert_ne!(fresh, dropped);
        assert!(pool.node(dropped).is_none());
    }

    #[test]
    fn test_high_water_mark_tracks_peak() {
        let mut pool = NodePool::new();
        let ids: Vec<NodeId> = (0..4).map(|_| pool.acquire(NodeKind::Row)).collect();
        for id in &ids {
            pool.release(*id);
        }
        for _ in 0..2 {
            pool.acquire(NodeKind::Row);
        }

        assert_eq!(pool.high_water_mark(), 4);
        assert_eq!(pool.created_count(), 4);
    }
}
