//! Per-node dominance classification and bottom-up aggregation.
//!
//! A node is classified once its children are final: the terminal sets,
//! optimal value and optimal terminals are folded over the children, and the
//! dominance-based subsets are filtered relative to the node itself.

use std::collections::BTreeSet;

use crate::error::Result;
use crate::item::{ItemId, ItemTable};
use crate::registry::{NodeId, NodeSummary};

/// What the classifier needs to know about an already classified node.
#[derive(Debug, Clone, Copy)]
pub struct ClassifiedView<'a> {
    pub id: NodeId,
    pub is_terminal: bool,
    pub standing_value: u64,
    pub summary: &'a NodeSummary,
}

/// Remaining items that no other remaining item dominates.
pub fn non_dominated_items(items: &ItemTable, remaining: &[ItemId]) -> Result<BTreeSet<ItemId>> {
    let mut out = BTreeSet::new();
    for (i, &id) in remaining.iter().enumerate() {
        let others = remaining
            .iter()
            .enumerate()
            .filter(|&(j, _)| j != i)
            .map(|(_, &other)| other);
        if !items.get(id)?.check_dominance(others)? {
            out.insert(id);
        }
    }
    Ok(out)
}

/// Committed items that a still-remaining item dominates.
pub fn included_dominated_items(
    items: &ItemTable,
    committed: &[ItemId],
    remaining: &[ItemId],
) -> Result<Vec<ItemId>> {
    let mut out = Vec::new();
    for &id in committed {
        if items.get(id)?.check_dominance(remaining.iter().copied())? {
            out.push(id);
        }
    }
    Ok(out)
}

/// Terminal sets aggregated over a node's children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Aggregate {
    pub terminal_nodes: BTreeSet<NodeId>,
    pub optimal_value: u64,
    pub optimal_terminal_nodes: BTreeSet<NodeId>,
}

/// Fold terminal and optimal-terminal sets over `children`.
///
/// A childless node is its own optimum with value `standing_value` and an
/// empty terminal set.
///
/// # Panics
/// Panics if a child's optimal value exceeds the aggregated optimum.
pub fn aggregate(standing_value: u64, children: &[ClassifiedView<'_>]) -> Aggregate {
    if children.is_empty() {
        return Aggregate {
            optimal_value: standing_value,
            ..Aggregate::default()
        };
    }

    let child_optimum = |child: &ClassifiedView<'_>| {
        if child.is_terminal {
            child.standing_value
        } else {
            child.summary.optimal_value
        }
    };

    let mut terminal_nodes = BTreeSet::new();
    for child in children {
        if child.is_terminal {
            terminal_nodes.insert(child.id);
        } else {
            terminal_nodes.extend(child.summary.terminal_nodes.iter().copied());
        }
    }

    let optimal_value = children.iter().map(child_optimum).max().unwrap_or(standing_value);

    let mut optimal_terminal_nodes = BTreeSet::new();
    for child in children {
        let value = child_optimum(child);
        if value > optimal_value {
            panic!(
                "child {} has optimal value {value} above its parent's {optimal_value}",
                child.id
            );
        }
        if value == optimal_value {
            if child.is_terminal {
                optimal_terminal_nodes.insert(child.id);
            } else {
                optimal_terminal_nodes.extend(child.summary.optimal_terminal_nodes.iter().copied());
            }
        }
    }

    Aggregate {
        terminal_nodes,
        optimal_value,
        optimal_terminal_nodes,
    }
}

/// Members of `candidates` that introduce no dominated commitment beyond the
/// ones `ancestor_included` already holds.
///
/// `included_of` returns the included dominated items of a terminal.
pub fn non_dominated_subset<'a, F>(
    candidates: &BTreeSet<NodeId>,
    ancestor_included: &[ItemId],
    included_of: F,
) -> BTreeSet<NodeId>
where
    F: Fn(NodeId) -> &'a [ItemId],
{
    candidates
        .iter()
        .copied()
        .filter(|&terminal| {
            included_of(terminal)
                .iter()
                .all(|item| ancestor_included.contains(item))
        })
        .collect()
}

/// Classify one node given its already classified children.
pub fn classify<'a, F>(
    items: &ItemTable,
    remaining: &[ItemId],
    committed: &[ItemId],
    standing_value: u64,
    children: &[ClassifiedView<'a>],
    included_of: F,
) -> Result<NodeSummary>
where
    F: Fn(NodeId) -> &'a [ItemId],
{
    let non_dominated_items = non_dominated_items(items, remaining)?;
    let included_dominated_items = included_dominated_items(items, committed, remaining)?;
    let Aggregate {
        terminal_nodes,
        optimal_value,
        optimal_terminal_nodes,
    } = aggregate(standing_value, children);

    let non_dominated_terminal_nodes =
        non_dominated_subset(&terminal_nodes, &included_dominated_items, &included_of);
    let non_dominated_optimal_terminal_nodes =
        non_dominated_subset(&optimal_terminal_nodes, &included_dominated_items, &included_of);

    Ok(NodeSummary {
        terminal_nodes,
        optimal_value,
        optimal_terminal_nodes,
        non_dominated_items,
        included_dominated_items,
        non_dominated_terminal_nodes,
        non_dominated_optimal_terminal_nodes,
    })
}
