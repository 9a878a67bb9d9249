//! Content-addressed store of search nodes.
//!
//! The registry is an arena: nodes live in a `Vec` addressed by [`NodeId`],
//! and a hash map from the full structural [`NodeKey`] to the id guarantees
//! at most one node per key. Keys are compared structurally, so there is no
//! digest whose collisions could silently merge distinct states.
//!
//! Construction happens in two steps: [`NodeRegistry::reserve`] claims an id
//! for a key as soon as the state is discovered, and [`NodeRegistry::commit`]
//! stores the finished node once its derived sets are known. Ids are
//! committed in reservation order.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use crate::item::{ItemId, StructuralKey};

/// Index of a node inside its registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }

    #[cfg(test)]
    pub(crate) fn from_index(index: usize) -> Self {
        Self(index)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// Canonical identity of a search state.
///
/// Remaining items are keyed by content and sorted, so two branches that
/// leave the same multiset of items behind merge. The committed path is
/// stably sorted by content and then keyed by instance: adding distinct items
/// in either order reaches one node, while taking two identical items in
/// opposite orders reaches two.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NodeKey {
    remaining: Vec<StructuralKey>,
    capacity: u64,
    standing_value: u64,
    committed: Vec<ItemId>,
    root: Option<NodeId>,
}

impl NodeKey {
    pub fn new(
        mut remaining: Vec<StructuralKey>,
        capacity: u64,
        standing_value: u64,
        mut committed: Vec<(StructuralKey, ItemId)>,
        root: Option<NodeId>,
    ) -> Self {
        remaining.sort_unstable();
        committed.sort_by_key(|&(key, _)| key);
        Self {
            remaining,
            capacity,
            standing_value,
            committed: committed.into_iter().map(|(_, id)| id).collect(),
            root,
        }
    }
}

/// Sets derived bottom-up for every node at construction time.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSummary {
    /// Terminal nodes reachable below this node. Empty for a terminal node.
    pub terminal_nodes: BTreeSet<NodeId>,
    /// Highest accumulated value over reachable terminals.
    pub optimal_value: u64,
    /// Reachable terminals achieving `optimal_value`.
    pub optimal_terminal_nodes: BTreeSet<NodeId>,
    /// Remaining items not dominated by another remaining item.
    pub non_dominated_items: BTreeSet<ItemId>,
    /// Committed items dominated by an item that is still remaining.
    pub included_dominated_items: Vec<ItemId>,
    /// Terminals that add no new dominated item on the way down from here.
    pub non_dominated_terminal_nodes: BTreeSet<NodeId>,
    pub non_dominated_optimal_terminal_nodes: BTreeSet<NodeId>,
}

impl NodeSummary {
    pub fn is_dominated(&self) -> bool {
        !self.included_dominated_items.is_empty()
    }
}

/// An immutable search state.
#[derive(Debug, Clone)]
pub struct SearchNode {
    pub(crate) id: NodeId,
    pub(crate) remaining: Vec<ItemId>,
    pub(crate) capacity: u64,
    pub(crate) standing_value: u64,
    pub(crate) committed: Vec<ItemId>,
    pub(crate) root: Option<NodeId>,
    pub(crate) children: Vec<(ItemId, NodeId)>,
    pub(crate) summary: NodeSummary,
}

impl SearchNode {
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// Items still eligible for addition, in supplied order.
    pub fn remaining(&self) -> &[ItemId] {
        &self.remaining
    }

    /// Remaining capacity.
    pub fn capacity(&self) -> u64 {
        self.capacity
    }

    /// Accumulated value of the committed items.
    pub fn standing_value(&self) -> u64 {
        self.standing_value
    }

    /// Items committed so far, in the order they were added on the path that
    /// first discovered this node.
    pub fn committed(&self) -> &[ItemId] {
        &self.committed
    }

    /// The root this node was grown from, `None` for a root.
    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    /// Number of committed items.
    pub fn depth(&self) -> usize {
        self.committed.len()
    }

    /// Feasible children, each tagged with the item whose addition leads there.
    pub fn children(&self) -> &[(ItemId, NodeId)] {
        &self.children
    }

    pub fn is_terminal(&self) -> bool {
        self.children.is_empty()
    }

    pub fn summary(&self) -> &NodeSummary {
        &self.summary
    }

    pub fn optimal_value(&self) -> u64 {
        self.summary.optimal_value
    }

    pub fn is_dominated(&self) -> bool {
        self.summary.is_dominated()
    }
}

/// Arena of search nodes with structural deduplication.
#[derive(Debug, Default)]
pub struct NodeRegistry {
    nodes: Vec<SearchNode>,
    by_key: HashMap<NodeKey, NodeId>,
    next: usize,
}

impl NodeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id for `key` if it has been reserved or committed.
    pub fn lookup(&self, key: &NodeKey) -> Option<NodeId> {
        self.by_key.get(key).copied()
    }

    /// Claim the next id for `key`. Returns the existing id if the key is
    /// already known, together with `false`.
    pub fn reserve(&mut self, key: NodeKey) -> (NodeId, bool) {
        if let Some(&id) = self.by_key.get(&key) {
            return (id, false);
        }
        let id = NodeId(self.next);
        self.next += 1;
        self.by_key.insert(key, id);
        (id, true)
    }

    /// Store a finished node.
    ///
    /// # Panics
    /// Panics if `node` is not the next reserved id awaiting commit.
    pub fn commit(&mut self, node: SearchNode) {
        assert_eq!(
            node.id.0,
            self.nodes.len(),
            "nodes must be committed in reservation order"
        );
        self.nodes.push(node);
    }

    /// A committed node.
    pub fn get(&self, id: NodeId) -> Option<&SearchNode> {
        self.nodes.get(id.0)
    }

    /// Whether `id` has been reserved but not yet committed.
    pub fn is_pending(&self, id: NodeId) -> bool {
        id.0 >= self.nodes.len() && id.0 < self.next
    }

    /// Number of committed nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SearchNode> {
        self.nodes.iter()
    }
}
