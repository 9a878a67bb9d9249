//! State graph construction.
//!
//! [`SearchGraph::create_or_get`] is the single construction entry point. It
//! grows the search space below a node in two passes:
//! 1. Discovery: an explicit worklist expands every new state into one child
//!    per fitting item, reserving a registry id for each new key so that
//!    convergent paths share a node.
//! 2. Classification: pending nodes are visited in decreasing depth, so all
//!    children of a node are classified before the node itself.
//!
//! Neither pass recurses, so stack usage does not grow with the item count.

use std::collections::{HashMap, HashSet};

use crate::dominance::{self, ClassifiedView};
use crate::error::{ModelError, Result};
use crate::item::{Item, ItemId, ItemTable};
use crate::registry::{NodeId, NodeKey, NodeRegistry, NodeSummary, SearchNode};

/// Arguments for [`SearchGraph::create_or_get`].
#[derive(Debug, Clone, Default)]
pub struct NodeSpec {
    /// Items still eligible for addition, in order.
    pub items: Vec<ItemId>,
    /// Remaining capacity.
    pub capacity: u64,
    /// Accumulated value of `standing_items`.
    pub standing_value: u64,
    /// Items committed so far.
    pub standing_items: Vec<ItemId>,
    /// Root of the search this node belongs to; `None` makes it a root.
    pub root: Option<NodeId>,
}

impl NodeSpec {
    pub fn root(items: Vec<ItemId>, capacity: u64) -> Self {
        Self {
            items,
            capacity,
            ..Self::default()
        }
    }
}

/// A state discovered in the current build and not yet committed.
struct PendingNode {
    id: NodeId,
    remaining: Vec<ItemId>,
    capacity: u64,
    standing_value: u64,
    committed: Vec<ItemId>,
    root: Option<NodeId>,
    children: Vec<(ItemId, NodeId)>,
    summary: Option<NodeSummary>,
}

/// Items plus the deduplicated DAG of search states grown from them.
#[derive(Debug, Default)]
pub struct SearchGraph {
    items: ItemTable,
    registry: NodeRegistry,
}

impl SearchGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take ownership of `items`, returning their ids in order.
    pub fn insert_items<I>(&mut self, items: I) -> Vec<ItemId>
    where
        I: IntoIterator<Item = Item>,
    {
        items
            .into_iter()
            .map(|item| self.items.insert(item))
            .collect()
    }

    /// Insert `items` and build the full search graph rooted at them.
    ///
    /// Roots are identified by content. If a root with the same items and
    /// capacity already exists it is returned and `items` are dropped, so the
    /// ids to use are the ones in that root's [`SearchNode::remaining`].
    pub fn build_root(&mut self, items: Vec<Item>, capacity: u64) -> Result<NodeId> {
        let content = items.iter().map(Item::structural_key).collect();
        if let Some(existing) = self
            .registry
            .lookup(&NodeKey::new(content, capacity, 0, Vec::new(), None))
        {
            return Ok(existing);
        }
        let ids = self.insert_items(items);
        self.create_or_get(NodeSpec::root(ids, capacity))
    }

    /// Return the node for `spec`, building it and everything below it if the
    /// structural key is new.
    ///
    /// Building a root (no `root` reference) establishes dominance for every
    /// item against all other items of the spec. This is the only place
    /// dominance is set.
    pub fn create_or_get(&mut self, spec: NodeSpec) -> Result<NodeId> {
        for &id in spec.items.iter().chain(&spec.standing_items) {
            self.items.get(id)?;
        }
        if let Some(root) = spec.root {
            if self.registry.get(root).is_none() {
                return Err(ModelError::UnknownNode(root));
            }
            for &id in spec.items.iter().chain(&spec.standing_items) {
                if !self.items.get(id)?.is_dominance_set() {
                    return Err(ModelError::DominanceNotSet(id));
                }
            }
        }

        let mut reachable = spec.standing_value;
        for &id in &spec.items {
            reachable = reachable
                .checked_add(self.items.get(id)?.value())
                .ok_or(ModelError::ValueOverflow)?;
        }

        let key = self.key_for(&spec.items, spec.capacity, spec.standing_value, &spec.standing_items, spec.root)?;
        if let Some(existing) = self.registry.lookup(&key) {
            #[cfg(feature = "tracing")]
            tracing::debug!(node = %existing, "node already registered");
            return Ok(existing);
        }

        if spec.root.is_none() {
            self.items.set_dominance_among(&spec.items)?;
        }

        #[cfg(feature = "tracing")]
        let span = tracing::info_span!(
            "build_graph",
            items = spec.items.len(),
            capacity = spec.capacity
        );
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let (start, _) = self.registry.reserve(key);
        let mut pending = vec![PendingNode {
            id: start,
            remaining: spec.items,
            capacity: spec.capacity,
            standing_value: spec.standing_value,
            committed: spec.standing_items,
            root: spec.root,
            children: Vec::new(),
            summary: None,
        }];

        self.discover(&mut pending)?;
        self.classify(&mut pending)?;

        #[cfg(feature = "tracing")]
        tracing::debug!(new_nodes = pending.len(), total_nodes = self.registry.len() + pending.len(), "graph built");

        pending.sort_by_key(|node| node.id);
        for node in pending {
            let summary = node.summary.unwrap_or_default();
            self.registry.commit(SearchNode {
                id: node.id,
                remaining: node.remaining,
                capacity: node.capacity,
                standing_value: node.standing_value,
                committed: node.committed,
                root: node.root,
                children: node.children,
                summary,
            });
        }
        Ok(start)
    }

    fn key_for(
        &self,
        remaining: &[ItemId],
        capacity: u64,
        standing_value: u64,
        committed: &[ItemId],
        root: Option<NodeId>,
    ) -> Result<NodeKey> {
        let remaining = remaining
            .iter()
            .map(|&id| self.items.get(id).map(Item::structural_key))
            .collect::<Result<Vec<_>>>()?;
        let committed = committed
            .iter()
            .map(|&id| self.items.get(id).map(|item| (item.structural_key(), id)))
            .collect::<Result<Vec<_>>>()?;
        Ok(NodeKey::new(remaining, capacity, standing_value, committed, root))
    }

    /// Expand pending nodes until no new state appears.
    fn discover(&mut self, pending: &mut Vec<PendingNode>) -> Result<()> {
        let mut worklist = vec![0usize];
        while let Some(idx) = worklist.pop() {
            if pending[idx].remaining.len() <= 1 {
                continue;
            }
            let parent_root = pending[idx].root.unwrap_or(pending[idx].id);
            let mut children = Vec::new();
            for position in 0..pending[idx].remaining.len() {
                let parent = &pending[idx];
                let item = self.items.get(parent.remaining[position])?;
                let Some(capacity) = parent.capacity.checked_sub(item.weight()) else {
                    continue;
                };
                let item_id = item.id();
                // Bounded by the total checked in `create_or_get`.
                let standing_value = parent.standing_value + item.value();
                let mut remaining = parent.remaining.clone();
                remaining.remove(position);
                let mut committed = parent.committed.clone();
                committed.push(item_id);

                let key = self.key_for(&remaining, capacity, standing_value, &committed, Some(parent_root))?;
                let (child, fresh) = self.registry.reserve(key);
                if fresh {
                    pending.push(PendingNode {
                        id: child,
                        remaining,
                        capacity,
                        standing_value,
                        committed,
                        root: Some(parent_root),
                        children: Vec::new(),
                        summary: None,
                    });
                    worklist.push(pending.len() - 1);
                }
                children.push((item_id, child));
            }
            pending[idx].children = children;
        }
        Ok(())
    }

    /// Derive summaries for pending nodes, deepest first.
    fn classify(&self, pending: &mut [PendingNode]) -> Result<()> {
        #[cfg(feature = "tracing")]
        let span = tracing::trace_span!("classify", nodes = pending.len());
        #[cfg(feature = "tracing")]
        let _enter = span.enter();

        let slot: HashMap<NodeId, usize> = pending
            .iter()
            .enumerate()
            .map(|(idx, node)| (node.id, idx))
            .collect();
        let mut order: Vec<usize> = (0..pending.len()).collect();
        order.sort_by_key(|&idx| std::cmp::Reverse(pending[idx].committed.len()));

        for idx in order {
            let summary = {
                let snapshot: &[PendingNode] = &*pending;
                let node = &snapshot[idx];
                let children: Vec<ClassifiedView<'_>> = node
                    .children
                    .iter()
                    .map(|&(_, child)| self.view(snapshot, &slot, child))
                    .collect();
                dominance::classify(
                    &self.items,
                    &node.remaining,
                    &node.committed,
                    node.standing_value,
                    &children,
                    |terminal| {
                        self.view(snapshot, &slot, terminal)
                            .summary
                            .included_dominated_items
                            .as_slice()
                    },
                )?
            };
            pending[idx].summary = Some(summary);
        }
        Ok(())
    }

    /// Classification view of `id`, which is either pending in this build
    /// and already classified, or committed by an earlier build.
    ///
    /// # Panics
    /// Panics if `id` is pending but not yet classified, which would mean the
    /// depth ordering was violated.
    fn view<'a>(
        &'a self,
        pending: &'a [PendingNode],
        slot: &HashMap<NodeId, usize>,
        id: NodeId,
    ) -> ClassifiedView<'a> {
        match slot.get(&id) {
            Some(&idx) => {
                let node = &pending[idx];
                ClassifiedView {
                    id,
                    is_terminal: node.children.is_empty(),
                    standing_value: node.standing_value,
                    summary: node
                        .summary
                        .as_ref()
                        .unwrap_or_else(|| panic!("node {id} classified before its children")),
                }
            }
            None => {
                let node = self
                    .registry
                    .get(id)
                    .unwrap_or_else(|| panic!("node {id} reserved but never built"));
                ClassifiedView {
                    id,
                    is_terminal: node.is_terminal(),
                    standing_value: node.standing_value,
                    summary: &node.summary,
                }
            }
        }
    }

    pub fn items(&self) -> &ItemTable {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Result<&Item> {
        self.items.get(id)
    }

    pub fn node(&self, id: NodeId) -> Result<&SearchNode> {
        self.registry.get(id).ok_or(ModelError::UnknownNode(id))
    }

    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Number of nodes in the graph.
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    /// Non-terminal nodes reachable from `start` (inclusive), deepest first.
    ///
    /// Every node appears after all of its non-terminal descendants, which is
    /// the evaluation order the distribution engine relies on.
    pub fn post_order(&self, start: NodeId) -> Result<Vec<NodeId>> {
        let mut seen = HashSet::new();
        let mut stack = vec![start];
        let mut out = Vec::new();
        while let Some(id) = stack.pop() {
            if !seen.insert(id) {
                continue;
            }
            let node = self.node(id)?;
            if node.is_terminal() {
                continue;
            }
            out.push((node.depth(), id));
            stack.extend(node.children.iter().map(|&(_, child)| child));
        }
        out.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        Ok(out.into_iter().map(|(_, id)| id).collect())
    }
}
